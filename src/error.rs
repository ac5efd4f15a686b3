// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::atomic::{AtomicBool, Ordering};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::onboarding::OnboardError;

const GENERIC_INTERNAL_MESSAGE: &str = "Internal server error";

static VERBOSE_ERRORS: AtomicBool = AtomicBool::new(false);

/// Show internal error messages to callers. Enabled for `APP_ENV=development`.
pub fn set_verbose_errors(enabled: bool) {
    VERBOSE_ERRORS.store(enabled, Ordering::Relaxed);
}

fn verbose_errors() -> bool {
    VERBOSE_ERRORS.load(Ordering::Relaxed)
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

/// Error body returned by every endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Human-readable message.
    pub error: String,
    /// Stable machine-readable code.
    pub code: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    fn from_onboard(e: OnboardError, verbose: bool) -> Self {
        let status = e.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %e, code = e.code(), "Request failed");
            let message = if verbose {
                e.to_string()
            } else {
                GENERIC_INTERNAL_MESSAGE.to_string()
            };
            return Self::new(status, e.code(), message);
        }
        tracing::debug!(error = %e, code = e.code(), "Request rejected");
        Self::new(status, e.code(), e.to_string())
    }
}

impl From<OnboardError> for ApiError {
    fn from(e: OnboardError) -> Self {
        Self::from_onboard(e, verbose_errors())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
            code: self.code.to_string(),
        });
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    use crate::custody::CustodyError;

    #[tokio::test]
    async fn into_response_returns_json_body() {
        let response = ApiError::from(OnboardError::NonceLimitExceeded { nonce: 3, limit: 2 }).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert_eq!(body, r#"{"error":"Nonce limit exceeded","code":"nonce_limit_exceeded"}"#);
    }

    #[test]
    fn internal_messages_are_generic_outside_development() {
        let custody = || OnboardError::from(CustodyError::KeyNotFound { version: 7 });

        let err = ApiError::from_onboard(custody(), false);
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code, "key_custody_error");
        assert_eq!(err.message, GENERIC_INTERNAL_MESSAGE);

        let err = ApiError::from_onboard(custody(), true);
        assert!(err.message.contains('7'));
    }

    #[test]
    fn client_errors_always_carry_their_message() {
        let err = ApiError::from_onboard(OnboardError::MissingParam("transaction"), false);
        assert_eq!(err.message, "Missing transaction param");
        assert_eq!(err.code, "missing_param");
    }
}

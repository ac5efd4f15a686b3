// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Legacy vs. new-ledger signing domain selection.
//!
//! The domain is the new ledger when `ENABLE_SOLANA` is set, or when the
//! migration-status endpoint reports anything other than `not_started`.
//! The status response is cached for a short TTL; on fetch failure a stale
//! entry is used if one exists.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::sync::RwLock;

/// Default status cache TTL.
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30);

const NOT_STARTED: &str = "not_started";

/// Which ledger the maker co-signs for on this request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningDomain {
    /// Device transaction envelope with a payer signature.
    Legacy,
    /// Compiled ledger transactions, partially signed.
    Ledger,
}

#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("failed to fetch migration status: {0}")]
    StatusFetch(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MigrationStatus {
    migration_status: String,
}

struct CacheEntry {
    domain: SigningDomain,
    fetched_at: Instant,
}

#[derive(Clone)]
pub struct DomainResolver {
    force_ledger: bool,
    status_url: Option<String>,
    cache_ttl: Duration,
    cache: Arc<RwLock<Option<CacheEntry>>>,
    client: reqwest::Client,
}

impl DomainResolver {
    pub fn new(force_ledger: bool, status_url: Option<String>, client: reqwest::Client) -> Self {
        Self {
            force_ledger,
            status_url,
            cache_ttl: DEFAULT_CACHE_TTL,
            cache: Arc::new(RwLock::new(None)),
            client,
        }
    }

    /// Resolver that always answers `domain`.
    pub fn fixed(domain: SigningDomain) -> Self {
        Self::new(domain == SigningDomain::Ledger, None, reqwest::Client::new())
    }

    pub async fn resolve(&self) -> Result<SigningDomain, DomainError> {
        if self.force_ledger {
            return Ok(SigningDomain::Ledger);
        }
        let Some(url) = &self.status_url else {
            return Ok(SigningDomain::Legacy);
        };

        {
            let cache = self.cache.read().await;
            if let Some(entry) = &*cache {
                if entry.fetched_at.elapsed() < self.cache_ttl {
                    return Ok(entry.domain);
                }
            }
        }

        let domain = match self.fetch(url).await {
            Ok(domain) => domain,
            Err(e) => {
                let cache = self.cache.read().await;
                return match &*cache {
                    Some(stale) => {
                        tracing::warn!(error = %e, "Using stale migration status");
                        Ok(stale.domain)
                    }
                    None => Err(e),
                };
            }
        };

        *self.cache.write().await = Some(CacheEntry {
            domain,
            fetched_at: Instant::now(),
        });
        Ok(domain)
    }

    async fn fetch(&self, url: &str) -> Result<SigningDomain, DomainError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DomainError::StatusFetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DomainError::StatusFetch(format!(
                "HTTP {} from status endpoint",
                response.status()
            )));
        }

        let status: MigrationStatus = response
            .json()
            .await
            .map_err(|e| DomainError::StatusFetch(e.to_string()))?;
        Ok(domain_for(&status.migration_status))
    }
}

fn domain_for(migration_status: &str) -> SigningDomain {
    if migration_status == NOT_STARTED {
        SigningDomain::Legacy
    } else {
        SigningDomain::Ledger
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn forced_flag_wins() {
        let resolver = DomainResolver::new(true, Some("http://127.0.0.1:1".into()), reqwest::Client::new());
        assert_eq!(resolver.resolve().await.unwrap(), SigningDomain::Ledger);
    }

    #[tokio::test]
    async fn no_status_source_means_legacy() {
        let resolver = DomainResolver::new(false, None, reqwest::Client::new());
        assert_eq!(resolver.resolve().await.unwrap(), SigningDomain::Legacy);
    }

    #[tokio::test]
    async fn unreachable_status_without_cache_is_an_error() {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(200))
            .build()
            .unwrap();
        let resolver = DomainResolver::new(false, Some("http://127.0.0.1:1/status".into()), client);
        assert!(resolver.resolve().await.is_err());
    }

    #[test]
    fn status_values() {
        assert_eq!(domain_for("not_started"), SigningDomain::Legacy);
        assert_eq!(domain_for("in_progress"), SigningDomain::Ledger);
        assert_eq!(domain_for("complete"), SigningDomain::Ledger);

        let parsed: MigrationStatus = serde_json::from_str(r#"{"migrationStatus":"not_started"}"#).unwrap();
        assert_eq!(parsed.migration_status, "not_started");
    }

    #[tokio::test]
    async fn fixed_resolvers() {
        assert_eq!(
            DomainResolver::fixed(SigningDomain::Legacy).resolve().await.unwrap(),
            SigningDomain::Legacy
        );
        assert_eq!(
            DomainResolver::fixed(SigningDomain::Ledger).resolve().await.unwrap(),
            SigningDomain::Ledger
        );
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Maker Signing
//!
//! Device signature verification and maker co-signing.
//!
//! The active signing domain is resolved once per request into a
//! [`SigningDomain`] and carried through the flow; nothing below the
//! resolver consults the migration flag again.

pub mod cosigner;
pub mod domain;
pub mod verifier;

pub use cosigner::{MakerSigner, SignedArtifact};
pub use domain::{DomainError, DomainResolver, SigningDomain};
pub use verifier::{verify_gateway_signature, EccVerifierClient, VerifyError};

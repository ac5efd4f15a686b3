// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Onboarding Transaction Authority
//!
//! Ties the custodian, validator, verifier, co-signer, capacity manager and
//! binding store into the request flows exposed over HTTP.
//!
//! Every flow follows the same shape: look the record up, run the checks
//! that need no I/O, unseal the maker key only once those pass, sign, and
//! bind the resulting address last. A rejected request never mutates state.

pub mod capacity;
pub mod error;
pub mod ledger;
pub mod mint;
pub mod registry;
pub mod subnetwork;
pub mod validation;

use std::str::FromStr;
use std::sync::Arc;

use crate::blockchain::Pubkey;
use crate::custody::{Entropy, KeyCustodian};
use crate::helium::TxnKind;
use crate::signing::{DomainResolver, MakerSigner, SignedArtifact, SigningDomain};
use crate::storage::{
    BindOutcome, DbError, Hotspot, HotspotRepository, Maker, MakerRepository, MakerWithSecret, NewMaker,
    OnboardingDb,
};

pub use capacity::CapacityManager;
pub use error::OnboardError;
pub use ledger::Ledger;
pub use subnetwork::{IotDetails, MobileDetails, NetworkDetails};
pub use validation::{classify_and_validate, ValidatedTxn, ValidationContext};

/// Tunables for the validation and capacity rules.
#[derive(Debug, Clone, Copy)]
pub struct OnboardingPolicy {
    /// Records with an id above this must present the lookup key as gateway.
    pub address_gate_min_hotspot_id: u64,
    /// Free leaves to keep in the maker's tree before a mint.
    pub tree_headroom: u64,
}

impl Default for OnboardingPolicy {
    fn default() -> Self {
        Self {
            address_gate_min_hotspot_id: 32951,
            tree_headroom: 2,
        }
    }
}

pub struct OnboardingService {
    db: Arc<OnboardingDb>,
    custodian: Arc<KeyCustodian>,
    domain: DomainResolver,
    ledger: Option<Ledger>,
    capacity: CapacityManager,
    policy: OnboardingPolicy,
}

impl OnboardingService {
    pub fn new(
        db: Arc<OnboardingDb>,
        custodian: Arc<KeyCustodian>,
        domain: DomainResolver,
        ledger: Option<Ledger>,
        policy: OnboardingPolicy,
    ) -> Self {
        Self {
            db,
            custodian,
            domain,
            ledger,
            capacity: CapacityManager::new(policy.tree_headroom),
            policy,
        }
    }

    pub fn db(&self) -> &OnboardingDb {
        &self.db
    }

    pub fn custodian(&self) -> &KeyCustodian {
        &self.custodian
    }

    pub fn ledger_configured(&self) -> bool {
        self.ledger.is_some()
    }

    pub(crate) fn ledger(&self) -> Result<&Ledger, OnboardError> {
        self.ledger
            .as_ref()
            .ok_or_else(|| OnboardError::LedgerUnavailable("new ledger is not configured".to_string()))
    }

    // =========================================================================
    // Makers
    // =========================================================================

    /// Create a maker with fresh (or supplied) entropy sealed under the
    /// current key-ring entry.
    pub fn provision_maker(
        &self,
        name: &str,
        location_nonce_limit: u32,
        entropy: Option<Entropy>,
    ) -> Result<Maker, OnboardError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(OnboardError::MissingParam("name"));
        }

        let entropy = entropy.unwrap_or_else(Entropy::generate);
        let signer = MakerSigner::from_entropy(&entropy);
        let sealed = self.custodian.encrypt(&entropy)?;
        drop(entropy);

        let maker = MakerRepository::new(&self.db).create(NewMaker {
            name: name.to_string(),
            address: signer.helium_address().to_b58(),
            solana_address: signer.pubkey().to_string(),
            location_nonce_limit,
            sealed,
        })?;

        tracing::info!(
            maker_id = maker.id,
            name = %maker.name,
            key_version = self.custodian.current_version(),
            "Maker provisioned"
        );
        Ok(maker)
    }

    pub fn update_location_nonce_limit(&self, maker_id: u64, limit: u32) -> Result<Maker, OnboardError> {
        let maker = MakerRepository::new(&self.db)
            .update_location_nonce_limit(maker_id, limit)
            .map_err(|e| match e {
                DbError::NotFound(_) => OnboardError::MakerNotFound,
                other => other.into(),
            })?;
        tracing::info!(maker_id, limit, "Location nonce limit updated");
        Ok(maker)
    }

    pub fn maker(&self, maker_id: u64) -> Result<Maker, OnboardError> {
        MakerRepository::new(&self.db)
            .get(maker_id)?
            .ok_or(OnboardError::MakerNotFound)
    }

    pub fn makers(&self) -> Result<Vec<Maker>, OnboardError> {
        Ok(MakerRepository::new(&self.db).list()?)
    }

    pub(crate) fn maker_with_secret(&self, maker_id: u64) -> Result<MakerWithSecret, OnboardError> {
        MakerRepository::new(&self.db)
            .get_with_secret(maker_id)?
            .ok_or(OnboardError::MakerNotFound)
    }

    /// Derive the maker's signer. The unsealed entropy is dropped before
    /// this returns.
    pub(crate) fn unseal(&self, maker: &MakerWithSecret) -> Result<MakerSigner, OnboardError> {
        let entropy = self.custodian.decrypt(&maker.sealed)?;
        Ok(MakerSigner::from_entropy(&entropy))
    }

    // =========================================================================
    // Binding
    // =========================================================================

    pub(crate) fn find_hotspot(&self, key: &str) -> Result<Hotspot, OnboardError> {
        HotspotRepository::new(&self.db)
            .find_by_key_or_address(key)?
            .ok_or(OnboardError::HotspotNotFound)
    }

    pub(crate) fn bind(&self, hotspot: &Hotspot, address: &str) -> Result<Hotspot, OnboardError> {
        match HotspotRepository::new(&self.db).bind(hotspot.id, address)? {
            BindOutcome::Bound(bound) => {
                tracing::info!(hotspot_id = bound.id, address, "Public address bound");
                Ok(bound)
            }
            BindOutcome::Unchanged(bound) => Ok(bound),
        }
    }

    // =========================================================================
    // Pay
    // =========================================================================

    /// Co-sign a device transaction for the record found under
    /// `lookup_key` (an onboarding key or a bound address).
    ///
    /// The signing domain is resolved once. In the legacy domain the payer
    /// signature is added to the device transaction. In the new-ledger
    /// domain an AddGateway takes the mint path and a location assertion
    /// becomes a maker-paid IoT metadata update.
    pub async fn pay(&self, lookup_key: &str, wire: &str) -> Result<SignedArtifact, OnboardError> {
        if lookup_key.trim().is_empty() {
            return Err(OnboardError::MissingParam("onboardingKey"));
        }
        if wire.trim().is_empty() {
            return Err(OnboardError::MissingParam("transaction"));
        }

        let hotspot = self.find_hotspot(lookup_key)?;
        let maker = self.maker_with_secret(hotspot.maker_id)?;
        let validated = classify_and_validate(
            wire,
            &ValidationContext {
                maker: &maker.maker,
                hotspot: &hotspot,
                lookup_key,
                address_gate_min_hotspot_id: self.policy.address_gate_min_hotspot_id,
            },
        )?;

        match self.domain.resolve().await? {
            SigningDomain::Legacy => self.pay_legacy(&hotspot, &maker, validated),
            SigningDomain::Ledger => {
                let transactions = match validated.txn.kind() {
                    TxnKind::AddGateway => self.mint(&hotspot, &maker, validated, None).await?,
                    _ => self.assert_location_as_update(&hotspot, &maker, validated).await?,
                };
                Ok(SignedArtifact::Ledger(transactions))
            }
        }
    }

    fn pay_legacy(
        &self,
        hotspot: &Hotspot,
        maker: &MakerWithSecret,
        validated: ValidatedTxn,
    ) -> Result<SignedArtifact, OnboardError> {
        let signer = self.unseal(maker)?;
        let gateway = validated.gateway_b58();
        let mut txn = validated.txn;
        signer.sign_legacy(&mut txn);
        drop(signer);

        self.bind(hotspot, &gateway)?;
        tracing::info!(
            hotspot_id = hotspot.id,
            maker_id = maker.maker.id,
            kind = txn.kind().as_str(),
            "Transaction co-signed"
        );
        Ok(SignedArtifact::Legacy(txn.to_wire()))
    }
}

/// Parse a caller-supplied ledger address.
pub(crate) fn parse_pubkey(field: &'static str, value: &str) -> Result<Pubkey, OnboardError> {
    Pubkey::from_str(value.trim()).map_err(|_| OnboardError::InvalidInput(format!("{field} is not a valid address")))
}

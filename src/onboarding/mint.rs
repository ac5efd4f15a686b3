// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Mint path: issue the compressed entity for a verified AddGateway.

use crate::blockchain::instructions::{issue_entity, transfer, IssueEntity};
use crate::blockchain::programs::entity_key_bytes;
use crate::blockchain::{Instruction, LedgerTransaction, Pubkey};
use crate::helium::{HeliumTxn, TxnKind};
use crate::signing::{verify_gateway_signature, MakerSigner};
use crate::storage::{Hotspot, MakerWithSecret};

use super::error::OnboardError;
use super::ledger::{Ledger, ONBOARD_COMPUTE_UNITS};
use super::validation::{validate, ValidatedTxn, ValidationContext};
use super::{parse_pubkey, OnboardingService};

impl OnboardingService {
    /// Build the issuance transaction for an AddGateway submitted directly
    /// on the mint route. The record is looked up by the gateway address.
    pub async fn create_hotspot(&self, wire: &str, payer: Option<&str>) -> Result<Vec<Vec<u8>>, OnboardError> {
        if wire.trim().is_empty() {
            return Err(OnboardError::MissingParam("transaction"));
        }
        let payer = payer
            .filter(|p| !p.trim().is_empty())
            .map(|p| parse_pubkey("payer", p))
            .transpose()?;

        let txn = HeliumTxn::classify(wire)?;
        if txn.kind() != TxnKind::AddGateway {
            return Err(OnboardError::UnsupportedTransactionType);
        }
        let gateway_b58 = txn.gateway()?.to_b58();

        let hotspot = self.find_hotspot(&gateway_b58)?;
        let maker = self.maker_with_secret(hotspot.maker_id)?;
        let validated = validate(
            txn,
            &ValidationContext {
                maker: &maker.maker,
                hotspot: &hotspot,
                lookup_key: &gateway_b58,
                address_gate_min_hotspot_id: self.policy.address_gate_min_hotspot_id,
            },
        )?;

        self.mint(&hotspot, &maker, validated, payer).await
    }

    /// Verify the device signature, make room in the maker's tree and build
    /// the maker-signed issuance. Returns no transaction when the entity
    /// already exists; the binding is committed either way.
    pub(crate) async fn mint(
        &self,
        hotspot: &Hotspot,
        maker: &MakerWithSecret,
        validated: ValidatedTxn,
        payer: Option<Pubkey>,
    ) -> Result<Vec<Vec<u8>>, OnboardError> {
        let verified = verify_gateway_signature(&validated.txn)?;
        if verified != validated.gateway {
            return Err(OnboardError::InvalidGatewaySigner);
        }

        let ledger = self.ledger()?;
        let gateway_b58 = validated.gateway_b58();
        let entity_key = entity_key_bytes(&gateway_b58)?;
        let maker_account = ledger.ctx.maker(&maker.maker.name)?;
        if ledger.reader.maker(&maker_account).await?.is_none() {
            return Err(OnboardError::MakerAccountMissing);
        }

        let key_to_asset = ledger.ctx.key_to_asset(&entity_key)?;
        let transactions = if ledger.reader.exists(&key_to_asset).await? {
            tracing::info!(hotspot_id = hotspot.id, gateway = %gateway_b58, "Entity already issued");
            Vec::new()
        } else {
            let signer = self.unseal(maker)?;
            let tx = self
                .issue(ledger, &signer, &maker_account, &validated.txn, &entity_key, payer)
                .await?;
            vec![tx.serialize()]
        };

        self.bind(hotspot, &gateway_b58)?;
        Ok(transactions)
    }

    async fn issue(
        &self,
        ledger: &Ledger,
        signer: &MakerSigner,
        maker_account: &Pubkey,
        txn: &HeliumTxn,
        entity_key: &[u8],
        payer: Option<Pubkey>,
    ) -> Result<LedgerTransaction, OnboardError> {
        let maker_state = self.capacity.ensure_capacity(ledger, maker_account, signer).await?;
        let maker_key = signer.pubkey();
        let owner = Pubkey::new(txn.owner()?.public_key_bytes());

        let mut instructions = vec![issue_entity(
            &ledger.ctx,
            IssueEntity {
                payer: payer.as_ref().unwrap_or(&maker_key),
                issuing_authority: &maker_key,
                maker: maker_account,
                collection: &maker_state.collection,
                merkle_tree: &maker_state.merkle_tree,
                recipient: &owner,
                entity_key,
            },
        )?];
        if payer.is_none() {
            if let Some(funding) = self.owner_funding(ledger, &maker_key, &owner).await? {
                instructions.push(funding);
            }
        }

        let mut tx = ledger.compile(instructions, ONBOARD_COMPUTE_UNITS, &maker_key).await?;
        signer.sign_ledger(&mut tx)?;

        if let Some(ecc) = &ledger.ecc_verifier {
            tx = ecc.cosign(&tx, txn).await?;
        }
        Ok(tx)
    }

    /// Top the owner up to the rent-exempt minimum plus the configured
    /// initial balance.
    async fn owner_funding(
        &self,
        ledger: &Ledger,
        maker_key: &Pubkey,
        owner: &Pubkey,
    ) -> Result<Option<Instruction>, OnboardError> {
        let Some(initial) = ledger.initial_lamports else {
            return Ok(None);
        };
        let target = ledger.reader.rent_exempt_minimum(0).await?.saturating_add(initial);
        let balance = ledger.reader.account(owner).await?.map_or(0, |a| a.lamports);
        if balance >= target {
            return Ok(None);
        }
        Ok(Some(transfer(&ledger.ctx, maker_key, owner, target - balance)))
    }
}

#[cfg(test)]
mod tests {
    use ed25519_dalek::SigningKey;

    use super::*;
    use crate::blockchain::accounts::fixtures::key_to_asset_data;
    use crate::helium::txn::fixtures::*;
    use crate::onboarding::capacity::fixtures::TREE;
    use crate::onboarding::fixtures::*;
    use crate::signing::SigningDomain;

    fn owner() -> SigningKey {
        SigningKey::from_bytes(&[1; 32])
    }

    fn gateway() -> SigningKey {
        SigningKey::from_bytes(&[2; 32])
    }

    fn setup(minted: u64) -> (Harness, String) {
        let h = harness(SigningDomain::Ledger, minted);
        h.register(&address_of(&gateway()).to_b58());
        let wire = add_gateway(&owner(), &gateway(), &address_of(&h.maker_key())).to_wire();
        (h, wire)
    }

    #[tokio::test]
    async fn builds_maker_signed_issuance() {
        let (h, wire) = setup(0);
        let txs = h.service.create_hotspot(&wire, None).await.unwrap();
        assert_eq!(txs.len(), 1);

        let tx = LedgerTransaction::deserialize(&txs[0]).unwrap();
        let maker_key = Pubkey::from(h.maker_key().verifying_key());
        assert_eq!(tx.message.account_keys[0], maker_key);
        assert!(tx.is_signed_by(&maker_key));
        // only the ECC verifier slot is left for the counterparty
        let ctx = crate::blockchain::programs::fixtures::context();
        assert_eq!(tx.missing_signers(), vec![ctx.ecc_verifier]);
        assert!(h.chain.sent().is_empty());
    }

    #[tokio::test]
    async fn binds_gateway_address() {
        let (h, wire) = setup(0);
        h.service.create_hotspot(&wire, None).await.unwrap();
        let record = h.service.find_hotspot(&address_of(&gateway()).to_b58()).unwrap();
        assert_eq!(record.public_address, Some(address_of(&gateway()).to_b58()));
    }

    #[tokio::test]
    async fn tampered_signature_never_reaches_signing() {
        let (h, _) = setup(15);
        let mut txn = add_gateway(&owner(), &gateway(), &address_of(&h.maker_key()));
        if let HeliumTxn::AddGateway(inner) = &mut txn {
            inner.gateway_signature[0] ^= 1;
        }
        let err = h.service.create_hotspot(&txn.to_wire(), None).await.unwrap_err();
        assert!(matches!(err, OnboardError::InvalidGatewaySigner));
        // no resize was submitted and nothing was bound
        assert!(h.chain.sent().is_empty());
        let record = h.service.find_hotspot(&address_of(&gateway()).to_b58()).unwrap();
        assert_eq!(record.public_address, None);
    }

    #[tokio::test]
    async fn full_tree_is_resized_once_before_issuance() {
        let (h, wire) = setup(15);
        let txs = h.service.create_hotspot(&wire, None).await.unwrap();
        assert_eq!(h.chain.sent().len(), 1);

        let tx = LedgerTransaction::deserialize(&txs[0]).unwrap();
        assert!(!tx.message.account_keys.contains(&TREE));
    }

    #[tokio::test]
    async fn existing_entity_returns_nothing_but_binds() {
        let (h, wire) = setup(0);
        let ctx = crate::blockchain::programs::fixtures::context();
        let entity_key = entity_key_bytes(&address_of(&gateway()).to_b58()).unwrap();
        h.chain.set_account(
            ctx.key_to_asset(&entity_key).unwrap(),
            key_to_asset_data(Pubkey::new([30; 32]), &entity_key),
        );

        assert!(h.service.create_hotspot(&wire, None).await.unwrap().is_empty());
        let record = h.service.find_hotspot(&address_of(&gateway()).to_b58()).unwrap();
        assert!(record.public_address.is_some());
    }

    #[tokio::test]
    async fn payer_override_leaves_its_slot_open() {
        let (h, wire) = setup(0);
        let payer = Pubkey::new([77; 32]);
        let txs = h.service.create_hotspot(&wire, Some(&payer.to_string())).await.unwrap();
        let tx = LedgerTransaction::deserialize(&txs[0]).unwrap();
        assert!(tx.missing_signers().contains(&payer));
    }

    #[tokio::test]
    async fn missing_maker_account_is_not_found() {
        let (h, wire) = setup(0);
        h.chain.remove_account(&h.maker_account);
        assert!(matches!(
            h.service.create_hotspot(&wire, None).await,
            Err(OnboardError::MakerAccountMissing)
        ));
    }

    #[tokio::test]
    async fn only_add_gateway_is_accepted() {
        let (h, _) = setup(0);
        let wire = assert_location_v2(&owner(), &address_of(&gateway()), &address_of(&h.maker_key()), 1).to_wire();
        assert!(matches!(
            h.service.create_hotspot(&wire, None).await,
            Err(OnboardError::UnsupportedTransactionType)
        ));
    }

    #[tokio::test]
    async fn foreign_payer_is_rejected() {
        let (h, _) = setup(0);
        let stranger = address_of(&SigningKey::from_bytes(&[99; 32]));
        let wire = add_gateway(&owner(), &gateway(), &stranger).to_wire();

        assert!(matches!(
            h.service.create_hotspot(&wire, None).await,
            Err(OnboardError::InvalidPayer)
        ));
        assert!(h.chain.sent().is_empty());
        let record = h.service.find_hotspot(&address_of(&gateway()).to_b58()).unwrap();
        assert_eq!(record.public_address, None);
    }

    #[tokio::test]
    async fn record_bound_elsewhere_is_rejected() {
        let (h, wire) = setup(0);
        let record = h.service.find_hotspot(&address_of(&gateway()).to_b58()).unwrap();
        crate::storage::HotspotRepository::new(h.service.db())
            .bind(record.id, "11111111111111111111111111111111")
            .unwrap();
        // the record is still found by its onboarding key
        assert!(matches!(
            h.service.create_hotspot(&wire, None).await,
            Err(OnboardError::OnboardingKeyAlreadyUsed)
        ));
    }
}

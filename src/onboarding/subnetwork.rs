// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Sub-network onboarding and metadata updates for issued entities.

use crate::blockchain::accounts::AssetProof;
use crate::blockchain::instructions::{
    onboard_hotspot, update_hotspot_info, DeploymentInfo, HotspotAccounts, HotspotSettings, MobileDeviceType,
};
use crate::blockchain::programs::entity_key_bytes;
use crate::blockchain::{LedgerError, Pubkey, SubNetwork};
use crate::signing::MakerSigner;
use crate::storage::{Hotspot, MakerWithSecret};

use super::error::OnboardError;
use super::ledger::{Ledger, ONBOARD_COMPUTE_UNITS};
use super::validation::ValidatedTxn;
use super::{parse_pubkey, OnboardingService};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IotDetails {
    pub location: Option<u64>,
    pub elevation: Option<i32>,
    pub gain: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MobileDetails {
    pub location: Option<u64>,
    pub deployment_info: Option<DeploymentInfo>,
}

/// Caller-supplied hotspot details, by sub-network.
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkDetails {
    Iot(IotDetails),
    Mobile(MobileDetails),
}

impl NetworkDetails {
    pub fn network(&self) -> SubNetwork {
        match self {
            NetworkDetails::Iot(_) => SubNetwork::Iot,
            NetworkDetails::Mobile(_) => SubNetwork::Mobile,
        }
    }

    pub fn location(&self) -> Option<u64> {
        match self {
            NetworkDetails::Iot(d) => d.location,
            NetworkDetails::Mobile(d) => d.location,
        }
    }

    /// Instruction settings; mobile radios take their class from the
    /// registered device type.
    fn into_settings(self, device_type: Option<&str>) -> Result<HotspotSettings, OnboardError> {
        Ok(match self {
            NetworkDetails::Iot(d) => HotspotSettings::Iot {
                location: d.location,
                elevation: d.elevation,
                gain: d.gain,
            },
            NetworkDetails::Mobile(d) => HotspotSettings::Mobile {
                location: d.location,
                device_type: MobileDeviceType::from_stored(device_type).map_err(|e| match e {
                    LedgerError::UnknownDeviceType(raw) => {
                        OnboardError::InvalidInput(format!("unknown device type `{raw}`"))
                    }
                    other => other.into(),
                })?,
                deployment_info: d.deployment_info,
            },
        })
    }
}

/// Accounts that locate an issued entity in its tree.
struct IssuedAsset {
    entity_key: Vec<u8>,
    proof: AssetProof,
    canopy_depth: u32,
}

impl IssuedAsset {
    fn accounts<'a>(&'a self, payer: &'a Pubkey, maker: &'a Pubkey, issuing_authority: &'a Pubkey) -> HotspotAccounts<'a> {
        HotspotAccounts {
            payer,
            dc_fee_payer: payer,
            maker,
            issuing_authority,
            entity_key: &self.entity_key,
            proof: &self.proof,
            canopy_depth: self.canopy_depth,
        }
    }
}

impl OnboardingService {
    /// Register an issued entity with the IoT or Mobile sub-network. The
    /// maker is fee payer and signs; an overriding payer keeps its slot
    /// open.
    pub async fn onboard(
        &self,
        entity_key: &str,
        payer: Option<&str>,
        details: NetworkDetails,
    ) -> Result<Vec<Vec<u8>>, OnboardError> {
        if entity_key.trim().is_empty() {
            return Err(OnboardError::MissingParam("entityKey"));
        }
        let payer = optional_pubkey("payer", payer)?;
        let ledger = self.ledger()?;

        let asset = self.issued_asset(ledger, entity_key).await?;
        let hotspot = self.bound_hotspot(entity_key)?.ok_or(OnboardError::HotspotNotFound)?;
        let maker = self.maker_with_secret(hotspot.maker_id)?;
        let signer = self.unseal(&maker)?;
        let maker_key = signer.pubkey();
        let maker_account = ledger.ctx.maker(&maker.maker.name)?;
        let payer = payer.unwrap_or(maker_key);

        let network = details.network();
        let settings = details.into_settings(hotspot.device_type.as_deref())?;
        let ix = onboard_hotspot(
            &ledger.ctx,
            asset.accounts(&payer, &maker_account, &maker_key),
            &settings,
        )?;

        let mut tx = ledger.compile(vec![ix], ONBOARD_COMPUTE_UNITS, &maker_key).await?;
        signer.sign_ledger(&mut tx)?;
        tracing::info!(
            hotspot_id = hotspot.id,
            network = network.symbol(),
            "Onboard transaction built"
        );
        Ok(vec![tx.serialize()])
    }

    /// Change the location or radio details of an onboarded hotspot.
    ///
    /// Payer: the explicit payer, else the maker while it still sponsors
    /// location assertions for this hotspot, else the owner's wallet. The
    /// maker only signs when it pays.
    pub async fn update_metadata(
        &self,
        entity_key: &str,
        wallet: &str,
        payer: Option<&str>,
        details: NetworkDetails,
    ) -> Result<Vec<Vec<u8>>, OnboardError> {
        if entity_key.trim().is_empty() {
            return Err(OnboardError::MissingParam("entityKey"));
        }
        if wallet.trim().is_empty() {
            return Err(OnboardError::MissingParam("wallet"));
        }
        let wallet = parse_pubkey("wallet", wallet)?;
        let passed_payer = optional_pubkey("payer", payer)?;
        let ledger = self.ledger()?;

        let asset = self.issued_asset(ledger, entity_key).await?;
        let hotspot = self.bound_hotspot(entity_key)?;
        let sponsor = match &hotspot {
            Some(h) => {
                let maker = self.maker_with_secret(h.maker_id)?;
                let signer = self.unseal(&maker)?;
                Some((maker, signer))
            }
            None => None,
        };

        if let (Some((_, signer)), Some(passed)) = (&sponsor, &passed_payer) {
            if signer.pubkey() == *passed {
                return Err(OnboardError::PayerCannotBeMaker);
            }
        }

        let network = details.network();
        let info_key = ledger.ctx.hotspot_info(network, &asset.entity_key)?;
        let info = ledger
            .reader
            .hotspot_info(network, &info_key)
            .await?
            .ok_or(OnboardError::HotspotInfoMissing)?;

        let payer = match (passed_payer, &sponsor) {
            (Some(passed), _) => passed,
            (None, Some((maker, signer)))
                if details.location().is_some()
                    && u32::from(info.num_location_asserts) < maker.maker.location_nonce_limit =>
            {
                signer.pubkey()
            }
            _ => wallet,
        };

        let device_type = hotspot.as_ref().and_then(|h| h.device_type.as_deref());
        let settings = details.into_settings(device_type)?;
        let signer = sponsor.as_ref().map(|(_, s)| s);
        self.build_update(ledger, &asset, &payer, signer, &settings).await
    }

    /// Ledger-domain rendition of a validated location assertion: an IoT
    /// metadata update paid by the maker.
    pub(crate) async fn assert_location_as_update(
        &self,
        hotspot: &Hotspot,
        maker: &MakerWithSecret,
        validated: ValidatedTxn,
    ) -> Result<Vec<Vec<u8>>, OnboardError> {
        let ledger = self.ledger()?;
        let gateway_b58 = validated.gateway_b58();
        let asset = self.issued_asset(ledger, &gateway_b58).await?;

        let info_key = ledger.ctx.hotspot_info(SubNetwork::Iot, &asset.entity_key)?;
        if ledger.reader.hotspot_info(SubNetwork::Iot, &info_key).await?.is_none() {
            return Err(OnboardError::HotspotInfoMissing);
        }

        let settings = HotspotSettings::Iot {
            location: validated.txn.location()?,
            elevation: validated.txn.elevation(),
            gain: validated.txn.gain(),
        };
        let signer = self.unseal(maker)?;
        let maker_key = signer.pubkey();
        let transactions = self
            .build_update(ledger, &asset, &maker_key, Some(&signer), &settings)
            .await?;

        self.bind(hotspot, &gateway_b58)?;
        Ok(transactions)
    }

    async fn build_update(
        &self,
        ledger: &Ledger,
        asset: &IssuedAsset,
        payer: &Pubkey,
        maker: Option<&MakerSigner>,
        settings: &HotspotSettings,
    ) -> Result<Vec<Vec<u8>>, OnboardError> {
        // maker and issuing authority are not part of the update accounts
        let ix = update_hotspot_info(&ledger.ctx, asset.accounts(payer, payer, payer), settings)?;
        let mut tx = ledger.compile(vec![ix], ONBOARD_COMPUTE_UNITS, payer).await?;
        if let Some(signer) = maker.filter(|s| s.pubkey() == *payer) {
            signer.sign_ledger(&mut tx)?;
        }
        Ok(vec![tx.serialize()])
    }

    async fn issued_asset(&self, ledger: &Ledger, entity_key: &str) -> Result<IssuedAsset, OnboardError> {
        let entity_key = entity_key_bytes(entity_key)
            .map_err(|_| OnboardError::InvalidInput("entityKey is not valid base58".to_string()))?;
        let key_to_asset = ledger.ctx.key_to_asset(&entity_key)?;
        let asset = ledger
            .reader
            .asset_for(&key_to_asset)
            .await?
            .ok_or(OnboardError::KeyToAssetMissing)?;
        let proof = ledger.reader.asset_proof(&asset).await?;
        let canopy_depth = ledger.reader.tree_shape(&proof.tree).await?.canopy_depth;
        Ok(IssuedAsset {
            entity_key,
            proof,
            canopy_depth,
        })
    }

    /// The record bound to `address`, ignoring onboarding-key matches.
    fn bound_hotspot(&self, address: &str) -> Result<Option<Hotspot>, OnboardError> {
        Ok(crate::storage::HotspotRepository::new(self.db())
            .find_by_key_or_address(address)?
            .filter(|h| h.public_address.as_deref() == Some(address)))
    }
}

fn optional_pubkey(field: &'static str, value: Option<&str>) -> Result<Option<Pubkey>, OnboardError> {
    value
        .filter(|v| !v.trim().is_empty())
        .map(|v| parse_pubkey(field, v))
        .transpose()
}

#[cfg(test)]
mod tests {
    use ed25519_dalek::SigningKey;

    use super::*;
    use crate::blockchain::accounts::fixtures::{iot_info_data, key_to_asset_data, mobile_info_data};
    use crate::blockchain::borsh::discriminator;
    use crate::blockchain::programs::fixtures::context;
    use crate::blockchain::LedgerTransaction;
    use crate::helium::txn::fixtures::*;
    use crate::onboarding::capacity::fixtures::TREE;
    use crate::onboarding::fixtures::*;
    use crate::signing::{SignedArtifact, SigningDomain};
    use crate::storage::{HotspotRepository, NewHotspot};

    const OWNER: Pubkey = Pubkey::new([60; 32]);
    const WALLET: Pubkey = Pubkey::new([61; 32]);

    fn gateway() -> SigningKey {
        SigningKey::from_bytes(&[2; 32])
    }

    fn gateway_b58() -> String {
        address_of(&gateway()).to_b58()
    }

    /// Bind a record to the gateway and issue its entity on the mock chain,
    /// with `asserts` location assertions on its IoT info.
    fn onboarded(h: &Harness, device_type: Option<&str>, asserts: u16) {
        let record = HotspotRepository::new(h.service.db())
            .create(
                h.maker.id,
                NewHotspot {
                    onboarding_key: "onboarding-1".into(),
                    device_type: device_type.map(str::to_string),
                    ..Default::default()
                },
            )
            .unwrap();
        h.service.bind(&record, &gateway_b58()).unwrap();

        let ctx = context();
        let entity_key = entity_key_bytes(&gateway_b58()).unwrap();
        let asset = Pubkey::new([30; 32]);
        h.chain.set_account(ctx.key_to_asset(&entity_key).unwrap(), key_to_asset_data(asset, &entity_key));
        h.chain.set_asset_proof(AssetProof {
            asset,
            owner: OWNER,
            tree: TREE,
            leaf_index: 3,
            root: Pubkey::new([31; 32]),
            data_hash: Pubkey::new([32; 32]),
            creator_hash: Pubkey::new([33; 32]),
            proof: (40..44).map(|b| Pubkey::new([b; 32])).collect(),
        });
        h.chain.set_account(
            ctx.hotspot_info(SubNetwork::Iot, &entity_key).unwrap(),
            iot_info_data(asset, Some(0x8c2836152804dff), asserts),
        );
        h.chain.set_account(
            ctx.hotspot_info(SubNetwork::Mobile, &entity_key).unwrap(),
            mobile_info_data(asset, asserts),
        );
    }

    fn decode(txs: &[Vec<u8>]) -> LedgerTransaction {
        assert_eq!(txs.len(), 1);
        LedgerTransaction::deserialize(&txs[0]).unwrap()
    }

    fn maker_pubkey(h: &Harness) -> Pubkey {
        Pubkey::from(h.maker_key().verifying_key())
    }

    fn iot(location: Option<u64>) -> NetworkDetails {
        NetworkDetails::Iot(IotDetails {
            location,
            elevation: Some(5),
            gain: Some(12),
        })
    }

    #[tokio::test]
    async fn iot_onboard_is_fully_signed_by_maker() {
        let h = harness(SigningDomain::Ledger, 0);
        onboarded(&h, None, 0);

        let tx = decode(&h.service.onboard(&gateway_b58(), None, iot(None)).await.unwrap());
        assert_eq!(tx.message.account_keys[0], maker_pubkey(&h));
        assert!(tx.missing_signers().is_empty());
        let ix = tx.message.instructions.last().unwrap();
        assert_eq!(ix.data[..8], discriminator("global", "onboard_iot_hotspot_v0"));
    }

    #[tokio::test]
    async fn onboard_payer_override_keeps_slot_open() {
        let h = harness(SigningDomain::Ledger, 0);
        onboarded(&h, None, 0);

        let tx = decode(
            &h.service
                .onboard(&gateway_b58(), Some(&WALLET.to_string()), iot(None))
                .await
                .unwrap(),
        );
        assert!(tx.is_signed_by(&maker_pubkey(&h)));
        assert_eq!(tx.missing_signers(), vec![WALLET]);
    }

    #[tokio::test]
    async fn mobile_onboard_uses_registered_device_type() {
        let h = harness(SigningDomain::Ledger, 0);
        onboarded(&h, Some("WifiIndoor"), 0);

        let details = NetworkDetails::Mobile(MobileDetails::default());
        let tx = decode(&h.service.onboard(&gateway_b58(), None, details).await.unwrap());
        let ix = tx.message.instructions.last().unwrap();
        assert_eq!(ix.data[..8], discriminator("global", "onboard_mobile_hotspot_v0"));
        // proof args (3 hashes + leaf index), absent location, then the radio class
        assert_eq!(ix.data[8 + 96 + 4 + 1], 1);
    }

    #[tokio::test]
    async fn unknown_device_type_is_rejected() {
        let h = harness(SigningDomain::Ledger, 0);
        onboarded(&h, Some("satellite"), 0);
        let details = NetworkDetails::Mobile(MobileDetails::default());
        assert!(matches!(
            h.service.onboard(&gateway_b58(), None, details).await,
            Err(OnboardError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn onboard_requires_issued_entity_and_bound_record() {
        let h = harness(SigningDomain::Ledger, 0);
        assert!(matches!(
            h.service.onboard("", None, iot(None)).await,
            Err(OnboardError::MissingParam("entityKey"))
        ));
        assert!(matches!(
            h.service.onboard(&gateway_b58(), None, iot(None)).await,
            Err(OnboardError::KeyToAssetMissing)
        ));

        onboarded(&h, None, 0);
        let other = address_of(&SigningKey::from_bytes(&[3; 32])).to_b58();
        let ctx = context();
        let entity_key = entity_key_bytes(&other).unwrap();
        h.chain.set_account(
            ctx.key_to_asset(&entity_key).unwrap(),
            key_to_asset_data(Pubkey::new([30; 32]), &entity_key),
        );
        assert!(matches!(
            h.service.onboard(&other, None, iot(None)).await,
            Err(OnboardError::HotspotNotFound)
        ));
    }

    #[tokio::test]
    async fn maker_pays_location_updates_within_limit() {
        let h = harness(SigningDomain::Ledger, 0);
        onboarded(&h, None, 1);

        let txs = h
            .service
            .update_metadata(&gateway_b58(), &WALLET.to_string(), None, iot(Some(0x8c2836152804dff)))
            .await
            .unwrap();
        let tx = decode(&txs);
        assert_eq!(tx.message.account_keys[0], maker_pubkey(&h));
        assert!(tx.is_signed_by(&maker_pubkey(&h)));
        assert_eq!(tx.missing_signers(), vec![OWNER]);
    }

    #[tokio::test]
    async fn wallet_pays_once_limit_is_reached() {
        let h = harness(SigningDomain::Ledger, 0);
        onboarded(&h, None, 2);

        let tx = decode(
            &h.service
                .update_metadata(&gateway_b58(), &WALLET.to_string(), None, iot(Some(0x8c2836152804dff)))
                .await
                .unwrap(),
        );
        assert_eq!(tx.message.account_keys[0], WALLET);
        assert!(!tx.is_signed_by(&maker_pubkey(&h)));
        assert!(!tx.message.account_keys.contains(&maker_pubkey(&h)));
    }

    #[tokio::test]
    async fn wallet_pays_when_no_location_is_asserted() {
        let h = harness(SigningDomain::Ledger, 0);
        onboarded(&h, None, 0);

        let tx = decode(
            &h.service
                .update_metadata(&gateway_b58(), &WALLET.to_string(), None, iot(None))
                .await
                .unwrap(),
        );
        assert_eq!(tx.message.account_keys[0], WALLET);
    }

    #[tokio::test]
    async fn maker_cannot_be_passed_as_payer() {
        let h = harness(SigningDomain::Ledger, 0);
        onboarded(&h, None, 0);

        let maker = maker_pubkey(&h).to_string();
        assert!(matches!(
            h.service
                .update_metadata(&gateway_b58(), &WALLET.to_string(), Some(&maker), iot(None))
                .await,
            Err(OnboardError::PayerCannotBeMaker)
        ));
    }

    #[tokio::test]
    async fn update_requires_wallet_and_onboarded_info() {
        let h = harness(SigningDomain::Ledger, 0);
        assert!(matches!(
            h.service.update_metadata(&gateway_b58(), "", None, iot(None)).await,
            Err(OnboardError::MissingParam("wallet"))
        ));

        onboarded(&h, None, 0);
        let entity_key = entity_key_bytes(&gateway_b58()).unwrap();
        h.chain
            .remove_account(&context().hotspot_info(SubNetwork::Iot, &entity_key).unwrap());
        assert!(matches!(
            h.service
                .update_metadata(&gateway_b58(), &WALLET.to_string(), None, iot(None))
                .await,
            Err(OnboardError::HotspotInfoMissing)
        ));
    }

    #[tokio::test]
    async fn ledger_pay_turns_assertion_into_maker_paid_update() {
        let h = harness(SigningDomain::Ledger, 0);
        onboarded(&h, None, 0);
        let owner = SigningKey::from_bytes(&[1; 32]);
        let wire = assert_location_v2(&owner, &address_of(&gateway()), &address_of(&h.maker_key()), 1).to_wire();

        let SignedArtifact::Ledger(txs) = h.service.pay("onboarding-1", &wire).await.unwrap() else {
            panic!("expected ledger transactions");
        };
        let tx = decode(&txs);
        assert_eq!(tx.message.account_keys[0], maker_pubkey(&h));
        assert!(tx.is_signed_by(&maker_pubkey(&h)));
        let ix = tx.message.instructions.last().unwrap();
        assert_eq!(ix.data[..8], discriminator("global", "update_iot_info_v0"));
    }
}

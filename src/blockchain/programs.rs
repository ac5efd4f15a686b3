// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Program identifiers and derived network accounts.
//!
//! [`LedgerContext`] is built once at startup from the configured mints and
//! holds every address that does not depend on the request. Request-scoped
//! addresses (maker, key-to-asset, hotspot info) are derived through its
//! methods.

use sha2::{Digest, Sha256};

use super::types::{LedgerError, Pubkey};

pub const SYSTEM_PROGRAM: &str = "11111111111111111111111111111111";
pub const COMPUTE_BUDGET_PROGRAM: &str = "ComputeBudget111111111111111111111111111111";
pub const ENTITY_MANAGER_PROGRAM: &str = "hemjuPXBpNvggtaUnN1MwT3wrdhttKEfosTcc2P9Pg8";
pub const SUB_DAOS_PROGRAM: &str = "hdaoVTCqhfHHo75XdAMxBKdUqvq1i5bF23sisBqVgGR";
pub const DATA_CREDITS_PROGRAM: &str = "credMBJhYFzfn7NxBMdU4aUqFggAjgztaCcv2Fo6fPT";
pub const BUBBLEGUM_PROGRAM: &str = "BGUMAp9Gq7iTEuizy4pqaxsTyUCBK68MDfK752saRPUY";
pub const ACCOUNT_COMPRESSION_PROGRAM: &str = "cmtDvXumGCrqC1Age74AVPhSRVXJMd8PJS91L8KbNCK";
pub const NOOP_PROGRAM: &str = "noopb9bkMVfRPU8AsbpTUg8AQkHtKwMYZiFUjNRtMmV";
pub const TOKEN_METADATA_PROGRAM: &str = "metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bmock7NK";
pub const TOKEN_PROGRAM: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
pub const ASSOCIATED_TOKEN_PROGRAM: &str = "ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL";

#[derive(Debug, Clone)]
pub struct ProgramIds {
    pub system: Pubkey,
    pub compute_budget: Pubkey,
    pub entity_manager: Pubkey,
    pub sub_daos: Pubkey,
    pub data_credits: Pubkey,
    pub bubblegum: Pubkey,
    pub account_compression: Pubkey,
    pub noop: Pubkey,
    pub token_metadata: Pubkey,
    pub token: Pubkey,
    pub associated_token: Pubkey,
}

impl ProgramIds {
    pub fn mainnet() -> Result<Self, LedgerError> {
        Ok(Self {
            system: SYSTEM_PROGRAM.parse()?,
            compute_budget: COMPUTE_BUDGET_PROGRAM.parse()?,
            entity_manager: ENTITY_MANAGER_PROGRAM.parse()?,
            sub_daos: SUB_DAOS_PROGRAM.parse()?,
            data_credits: DATA_CREDITS_PROGRAM.parse()?,
            bubblegum: BUBBLEGUM_PROGRAM.parse()?,
            account_compression: ACCOUNT_COMPRESSION_PROGRAM.parse()?,
            noop: NOOP_PROGRAM.parse()?,
            token_metadata: TOKEN_METADATA_PROGRAM.parse()?,
            token: TOKEN_PROGRAM.parse()?,
            associated_token: ASSOCIATED_TOKEN_PROGRAM.parse()?,
        })
    }
}

/// Sub-network a hotspot is onboarded to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubNetwork {
    Iot,
    Mobile,
}

impl SubNetwork {
    pub fn symbol(&self) -> &'static str {
        match self {
            SubNetwork::Iot => "IOT",
            SubNetwork::Mobile => "MOBILE",
        }
    }

    fn info_seed(&self) -> &'static [u8] {
        match self {
            SubNetwork::Iot => b"iot_info",
            SubNetwork::Mobile => b"mobile_info",
        }
    }
}

/// Network-wide addresses derived from configuration.
#[derive(Debug, Clone)]
pub struct LedgerContext {
    pub programs: ProgramIds,
    pub hnt_mint: Pubkey,
    pub dc_mint: Pubkey,
    pub ecc_verifier: Pubkey,
    pub dao: Pubkey,
    pub iot_sub_dao: Pubkey,
    pub mobile_sub_dao: Pubkey,
    pub iot_config: Pubkey,
    pub mobile_config: Pubkey,
    pub entity_creator: Pubkey,
    pub dc: Pubkey,
    pub bubblegum_signer: Pubkey,
}

impl LedgerContext {
    pub fn derive(
        programs: ProgramIds,
        hnt_mint: Pubkey,
        iot_mint: Pubkey,
        mobile_mint: Pubkey,
        dc_mint: Pubkey,
        ecc_verifier: Pubkey,
    ) -> Result<Self, LedgerError> {
        let dao = pda(&[b"dao", hnt_mint.as_bytes()], &programs.sub_daos)?;
        let iot_sub_dao = pda(&[b"sub_dao", iot_mint.as_bytes()], &programs.sub_daos)?;
        let mobile_sub_dao = pda(&[b"sub_dao", mobile_mint.as_bytes()], &programs.sub_daos)?;
        let iot_config = pda(
            &[b"rewardable_entity_config", iot_sub_dao.as_bytes(), b"IOT"],
            &programs.entity_manager,
        )?;
        let mobile_config = pda(
            &[b"rewardable_entity_config", mobile_sub_dao.as_bytes(), b"MOBILE"],
            &programs.entity_manager,
        )?;
        let entity_creator = pda(&[b"entity_creator", dao.as_bytes()], &programs.entity_manager)?;
        let dc = pda(&[b"dc", dc_mint.as_bytes()], &programs.data_credits)?;
        let bubblegum_signer = pda(&[b"collection_cpi"], &programs.bubblegum)?;

        Ok(Self {
            programs,
            hnt_mint,
            dc_mint,
            ecc_verifier,
            dao,
            iot_sub_dao,
            mobile_sub_dao,
            iot_config,
            mobile_config,
            entity_creator,
            dc,
            bubblegum_signer,
        })
    }

    pub fn sub_dao(&self, network: SubNetwork) -> Pubkey {
        match network {
            SubNetwork::Iot => self.iot_sub_dao,
            SubNetwork::Mobile => self.mobile_sub_dao,
        }
    }

    pub fn rewardable_config(&self, network: SubNetwork) -> Pubkey {
        match network {
            SubNetwork::Iot => self.iot_config,
            SubNetwork::Mobile => self.mobile_config,
        }
    }

    /// The maker's on-chain account, keyed by its registered name.
    pub fn maker(&self, name: &str) -> Result<Pubkey, LedgerError> {
        pda(&[b"maker", self.dao.as_bytes(), name.as_bytes()], &self.programs.entity_manager)
    }

    pub fn maker_approval(&self, network: SubNetwork, maker: &Pubkey) -> Result<Pubkey, LedgerError> {
        pda(
            &[b"maker_approval", self.rewardable_config(network).as_bytes(), maker.as_bytes()],
            &self.programs.entity_manager,
        )
    }

    pub fn key_to_asset(&self, entity_key: &[u8]) -> Result<Pubkey, LedgerError> {
        let hashed = Sha256::digest(entity_key);
        pda(
            &[b"key_to_asset", self.dao.as_bytes(), hashed.as_slice()],
            &self.programs.entity_manager,
        )
    }

    pub fn hotspot_info(&self, network: SubNetwork, entity_key: &[u8]) -> Result<Pubkey, LedgerError> {
        let hashed = Sha256::digest(entity_key);
        pda(
            &[
                network.info_seed(),
                self.rewardable_config(network).as_bytes(),
                hashed.as_slice(),
            ],
            &self.programs.entity_manager,
        )
    }

    pub fn tree_authority(&self, merkle_tree: &Pubkey) -> Result<Pubkey, LedgerError> {
        pda(&[merkle_tree.as_bytes()], &self.programs.bubblegum)
    }

    pub fn collection_metadata(&self, collection: &Pubkey) -> Result<Pubkey, LedgerError> {
        let program = &self.programs.token_metadata;
        pda(&[b"metadata", program.as_bytes(), collection.as_bytes()], program)
    }

    pub fn collection_master_edition(&self, collection: &Pubkey) -> Result<Pubkey, LedgerError> {
        let program = &self.programs.token_metadata;
        pda(
            &[b"metadata", program.as_bytes(), collection.as_bytes(), b"edition"],
            program,
        )
    }

    /// Associated DC token account for `owner`.
    pub fn dc_account(&self, owner: &Pubkey) -> Result<Pubkey, LedgerError> {
        pda(
            &[owner.as_bytes(), self.programs.token.as_bytes(), self.dc_mint.as_bytes()],
            &self.programs.associated_token,
        )
    }
}

/// Entity key bytes for a legacy base58 address, as used in account seeds.
pub fn entity_key_bytes(b58: &str) -> Result<Vec<u8>, LedgerError> {
    bs58::decode(b58.trim())
        .into_vec()
        .map_err(|e| LedgerError::InvalidPubkey(format!("entity key: {e}")))
}

fn pda(seeds: &[&[u8]], program: &Pubkey) -> Result<Pubkey, LedgerError> {
    Pubkey::find_program_address(seeds, program).map(|(key, _)| key)
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Instruction builders for the programs the onboarding flow calls.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::accounts::AssetProof;
use super::borsh::Writer;
use super::programs::{LedgerContext, SubNetwork};
use super::types::{AccountMeta, Instruction, LedgerError, Pubkey};

// =============================================================================
// Compute budget and system program
// =============================================================================

pub fn set_compute_unit_limit(ctx: &LedgerContext, units: u32) -> Instruction {
    Instruction {
        program_id: ctx.programs.compute_budget,
        accounts: vec![],
        data: Writer::default().u8(2).u32(units).finish(),
    }
}

pub fn set_compute_unit_price(ctx: &LedgerContext, micro_lamports: u64) -> Instruction {
    Instruction {
        program_id: ctx.programs.compute_budget,
        accounts: vec![],
        data: Writer::default().u8(3).u64(micro_lamports).finish(),
    }
}

/// Prepend the compute budget to `instructions`.
pub fn with_compute_budget(
    ctx: &LedgerContext,
    units: u32,
    micro_lamports: u64,
    instructions: Vec<Instruction>,
) -> Vec<Instruction> {
    let mut out = Vec::with_capacity(instructions.len() + 2);
    out.push(set_compute_unit_limit(ctx, units));
    out.push(set_compute_unit_price(ctx, micro_lamports));
    out.extend(instructions);
    out
}

pub fn create_account(
    ctx: &LedgerContext,
    from: &Pubkey,
    new_account: &Pubkey,
    lamports: u64,
    space: u64,
    owner: &Pubkey,
) -> Instruction {
    Instruction {
        program_id: ctx.programs.system,
        accounts: vec![
            AccountMeta::writable(*from, true),
            AccountMeta::writable(*new_account, true),
        ],
        data: Writer::default()
            .u32(0)
            .u64(lamports)
            .u64(space)
            .fixed(owner.as_bytes())
            .finish(),
    }
}

pub fn transfer(ctx: &LedgerContext, from: &Pubkey, to: &Pubkey, lamports: u64) -> Instruction {
    Instruction {
        program_id: ctx.programs.system,
        accounts: vec![AccountMeta::writable(*from, true), AccountMeta::writable(*to, false)],
        data: Writer::default().u32(2).u64(lamports).finish(),
    }
}

// =============================================================================
// Entity manager
// =============================================================================

/// Point the maker at a freshly allocated tree.
pub struct UpdateMakerTree<'a> {
    pub payer: &'a Pubkey,
    pub maker: &'a Pubkey,
    pub current_tree: &'a Pubkey,
    pub new_tree: &'a Pubkey,
    pub max_depth: u32,
    pub max_buffer_size: u32,
}

pub fn update_maker_tree(ctx: &LedgerContext, args: UpdateMakerTree<'_>) -> Result<Instruction, LedgerError> {
    let p = &ctx.programs;
    Ok(Instruction {
        program_id: p.entity_manager,
        accounts: vec![
            AccountMeta::writable(*args.payer, true),
            AccountMeta::writable(*args.maker, false),
            AccountMeta::writable(ctx.tree_authority(args.current_tree)?, false),
            AccountMeta::writable(ctx.tree_authority(args.new_tree)?, false),
            AccountMeta::writable(*args.new_tree, false),
            AccountMeta::readonly(p.noop, false),
            AccountMeta::readonly(p.system, false),
            AccountMeta::readonly(p.bubblegum, false),
            AccountMeta::readonly(p.account_compression, false),
        ],
        data: Writer::instruction("update_maker_tree_v0")
            .u32(args.max_depth)
            .u32(args.max_buffer_size)
            .finish(),
    })
}

/// Mint the compressed entity for a hotspot.
pub struct IssueEntity<'a> {
    pub payer: &'a Pubkey,
    pub issuing_authority: &'a Pubkey,
    pub maker: &'a Pubkey,
    pub collection: &'a Pubkey,
    pub merkle_tree: &'a Pubkey,
    pub recipient: &'a Pubkey,
    pub entity_key: &'a [u8],
}

pub fn issue_entity(ctx: &LedgerContext, args: IssueEntity<'_>) -> Result<Instruction, LedgerError> {
    let p = &ctx.programs;
    Ok(Instruction {
        program_id: p.entity_manager,
        accounts: vec![
            AccountMeta::writable(*args.payer, true),
            AccountMeta::readonly(ctx.ecc_verifier, true),
            AccountMeta::readonly(*args.issuing_authority, true),
            AccountMeta::readonly(*args.collection, false),
            AccountMeta::writable(ctx.collection_metadata(args.collection)?, false),
            AccountMeta::readonly(ctx.collection_master_edition(args.collection)?, false),
            AccountMeta::readonly(*args.maker, false),
            AccountMeta::writable(ctx.tree_authority(args.merkle_tree)?, false),
            AccountMeta::readonly(*args.recipient, false),
            AccountMeta::writable(*args.merkle_tree, false),
            AccountMeta::readonly(ctx.bubblegum_signer, false),
            AccountMeta::readonly(p.token_metadata, false),
            AccountMeta::readonly(p.noop, false),
            AccountMeta::readonly(p.bubblegum, false),
            AccountMeta::readonly(p.account_compression, false),
            AccountMeta::readonly(p.system, false),
            AccountMeta::writable(ctx.key_to_asset(args.entity_key)?, false),
            AccountMeta::readonly(ctx.dao, false),
            AccountMeta::readonly(ctx.entity_creator, false),
        ],
        data: Writer::instruction("issue_entity_v0")
            .bytes(args.entity_key)
            .finish(),
    })
}

/// Mobile radio class; serialized as its enum index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum MobileDeviceType {
    Cbrs,
    WifiIndoor,
    WifiOutdoor,
    WifiDataOnly,
}

impl MobileDeviceType {
    /// Parse a stored device type, lower-casing the first letter so both
    /// `WifiIndoor` and `wifiIndoor` are accepted. Missing means `cbrs`.
    pub fn from_stored(raw: Option<&str>) -> Result<Self, LedgerError> {
        let Some(raw) = raw.filter(|s| !s.is_empty()) else {
            return Ok(Self::Cbrs);
        };
        let mut chars = raw.chars();
        let normalized: String = chars
            .next()
            .map(|c| c.to_ascii_lowercase())
            .into_iter()
            .chain(chars)
            .collect();
        match normalized.as_str() {
            "cbrs" => Ok(Self::Cbrs),
            "wifiIndoor" => Ok(Self::WifiIndoor),
            "wifiOutdoor" => Ok(Self::WifiOutdoor),
            "wifiDataOnly" => Ok(Self::WifiDataOnly),
            _ => Err(LedgerError::UnknownDeviceType(raw.to_string())),
        }
    }

    fn index(&self) -> u8 {
        match self {
            Self::Cbrs => 0,
            Self::WifiIndoor => 1,
            Self::WifiOutdoor => 2,
            Self::WifiDataOnly => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RadioInfo {
    pub radio_id: String,
    pub elevation: i32,
}

/// Deployment details reported for a mobile hotspot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum DeploymentInfo {
    #[serde(rename_all = "camelCase")]
    WifiInfoV0 {
        antenna: u32,
        elevation: i32,
        azimuth: u16,
        mechanical_down_tilt: u16,
        electrical_down_tilt: u16,
    },
    #[serde(rename_all = "camelCase")]
    CbrsInfoV0 { radio_infos: Vec<RadioInfo> },
}

impl DeploymentInfo {
    fn write(&self, w: Writer) -> Writer {
        match self {
            DeploymentInfo::WifiInfoV0 {
                antenna,
                elevation,
                azimuth,
                mechanical_down_tilt,
                electrical_down_tilt,
            } => w
                .u8(0)
                .u32(*antenna)
                .i32(*elevation)
                .u16(*azimuth)
                .u16(*mechanical_down_tilt)
                .u16(*electrical_down_tilt),
            DeploymentInfo::CbrsInfoV0 { radio_infos } => {
                let mut w = w.u8(1).u32(radio_infos.len() as u32);
                for radio in radio_infos {
                    w = w.string(&radio.radio_id).i32(radio.elevation);
                }
                w
            }
        }
    }
}

/// Sub-network specific arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum HotspotSettings {
    Iot {
        location: Option<u64>,
        elevation: Option<i32>,
        gain: Option<i32>,
    },
    Mobile {
        location: Option<u64>,
        device_type: MobileDeviceType,
        deployment_info: Option<DeploymentInfo>,
    },
}

impl HotspotSettings {
    pub fn network(&self) -> SubNetwork {
        match self {
            HotspotSettings::Iot { .. } => SubNetwork::Iot,
            HotspotSettings::Mobile { .. } => SubNetwork::Mobile,
        }
    }
}

/// Accounts shared by onboard and update instructions.
pub struct HotspotAccounts<'a> {
    pub payer: &'a Pubkey,
    pub dc_fee_payer: &'a Pubkey,
    pub maker: &'a Pubkey,
    pub issuing_authority: &'a Pubkey,
    pub entity_key: &'a [u8],
    pub proof: &'a AssetProof,
    pub canopy_depth: u32,
}

fn write_proof_args(w: Writer, proof: &AssetProof) -> Writer {
    w.fixed(proof.data_hash.as_bytes())
        .fixed(proof.creator_hash.as_bytes())
        .fixed(proof.root.as_bytes())
        .u32(proof.leaf_index)
}

fn common_dc_accounts(ctx: &LedgerContext, network: SubNetwork, dc_fee_payer: &Pubkey) -> Result<Vec<AccountMeta>, LedgerError> {
    let p = &ctx.programs;
    Ok(vec![
        AccountMeta::readonly(ctx.rewardable_config(network), false),
        AccountMeta::writable(ctx.sub_dao(network), false),
        AccountMeta::readonly(ctx.dao, false),
        AccountMeta::writable(ctx.dc_mint, false),
        AccountMeta::readonly(ctx.dc, false),
        AccountMeta::writable(ctx.dc_account(dc_fee_payer)?, false),
        AccountMeta::readonly(p.account_compression, false),
        AccountMeta::readonly(p.data_credits, false),
        AccountMeta::readonly(p.token, false),
        AccountMeta::readonly(p.associated_token, false),
        AccountMeta::readonly(p.system, false),
    ])
}

/// Register a minted hotspot with a sub-network.
pub fn onboard_hotspot(
    ctx: &LedgerContext,
    accounts: HotspotAccounts<'_>,
    settings: &HotspotSettings,
) -> Result<Instruction, LedgerError> {
    let network = settings.network();
    let mut metas = vec![
        AccountMeta::writable(*accounts.payer, true),
        AccountMeta::writable(*accounts.dc_fee_payer, true),
        AccountMeta::readonly(*accounts.issuing_authority, true),
        AccountMeta::readonly(accounts.proof.owner, false),
        AccountMeta::writable(ctx.hotspot_info(network, accounts.entity_key)?, false),
        AccountMeta::readonly(*accounts.maker, false),
        AccountMeta::readonly(ctx.maker_approval(network, accounts.maker)?, false),
        AccountMeta::readonly(ctx.key_to_asset(accounts.entity_key)?, false),
        AccountMeta::readonly(accounts.proof.tree, false),
    ];
    metas.extend(common_dc_accounts(ctx, network, accounts.dc_fee_payer)?);
    metas.extend(
        accounts
            .proof
            .proof_accounts(accounts.canopy_depth)
            .iter()
            .map(|node| AccountMeta::readonly(*node, false)),
    );

    let data = match settings {
        HotspotSettings::Iot {
            location,
            elevation,
            gain,
        } => write_proof_args(Writer::instruction("onboard_iot_hotspot_v0"), accounts.proof)
            .option(*location, Writer::u64)
            .option(*elevation, Writer::i32)
            .option(*gain, Writer::i32),
        HotspotSettings::Mobile {
            location,
            device_type,
            deployment_info,
        } => write_proof_args(Writer::instruction("onboard_mobile_hotspot_v0"), accounts.proof)
            .option(*location, Writer::u64)
            .u8(device_type.index())
            .option(deployment_info.as_ref(), |w, info| info.write(w)),
    };

    Ok(Instruction {
        program_id: ctx.programs.entity_manager,
        accounts: metas,
        data: data.finish(),
    })
}

/// Change the asserted location or radio details of an onboarded hotspot.
///
/// The asset owner is a required signer; its slot is left for the caller.
pub fn update_hotspot_info(
    ctx: &LedgerContext,
    accounts: HotspotAccounts<'_>,
    settings: &HotspotSettings,
) -> Result<Instruction, LedgerError> {
    let network = settings.network();
    let mut metas = vec![
        AccountMeta::writable(*accounts.payer, true),
        AccountMeta::writable(*accounts.dc_fee_payer, true),
        AccountMeta::readonly(accounts.proof.owner, true),
        AccountMeta::writable(ctx.hotspot_info(network, accounts.entity_key)?, false),
        AccountMeta::readonly(accounts.proof.tree, false),
    ];
    metas.extend(common_dc_accounts(ctx, network, accounts.dc_fee_payer)?);
    metas.extend(
        accounts
            .proof
            .proof_accounts(accounts.canopy_depth)
            .iter()
            .map(|node| AccountMeta::readonly(*node, false)),
    );

    let data = match settings {
        HotspotSettings::Iot {
            location,
            elevation,
            gain,
        } => write_proof_args(
            Writer::instruction("update_iot_info_v0")
                .option(*location, Writer::u64)
                .option(*elevation, Writer::i32)
                .option(*gain, Writer::i32),
            accounts.proof,
        ),
        HotspotSettings::Mobile {
            location,
            deployment_info,
            ..
        } => write_proof_args(
            Writer::instruction("update_mobile_info_v0").option(*location, Writer::u64),
            accounts.proof,
        )
        .option(deployment_info.as_ref(), |w, info| info.write(w)),
    };

    Ok(Instruction {
        program_id: ctx.programs.entity_manager,
        accounts: metas,
        data: data.finish(),
    })
}

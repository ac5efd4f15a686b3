// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Decoders for the on-chain accounts the onboarding flow reads.

use super::borsh::Reader;
use super::types::{LedgerError, Pubkey};

/// Raw account as returned by the RPC node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    pub lamports: u64,
    pub owner: Pubkey,
    pub data: Vec<u8>,
}

/// Maker registration in the entity manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MakerAccount {
    pub update_authority: Pubkey,
    pub issuing_authority: Pubkey,
    pub name: String,
    pub collection: Pubkey,
    pub merkle_tree: Pubkey,
    pub dao: Pubkey,
}

impl MakerAccount {
    pub fn decode(data: &[u8]) -> Result<Self, LedgerError> {
        let mut r = Reader::account("MakerV0", data)?;
        let update_authority = r.pubkey()?;
        let issuing_authority = r.pubkey()?;
        let name = r.string()?;
        let _bump = r.u8()?;
        let collection = r.pubkey()?;
        let merkle_tree = r.pubkey()?;
        let _collection_bump = r.u8()?;
        let dao = r.pubkey()?;
        Ok(Self {
            update_authority,
            issuing_authority,
            name,
            collection,
            merkle_tree,
            dao,
        })
    }
}

/// Compression tree fill level, kept by the tree authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeConfigAccount {
    pub tree_creator: Pubkey,
    pub tree_delegate: Pubkey,
    pub total_mint_capacity: u64,
    pub num_minted: u64,
}

impl TreeConfigAccount {
    pub fn decode(data: &[u8]) -> Result<Self, LedgerError> {
        let mut r = Reader::account("TreeConfig", data)?;
        Ok(Self {
            tree_creator: r.pubkey()?,
            tree_delegate: r.pubkey()?,
            total_mint_capacity: r.u64()?,
            num_minted: r.u64()?,
        })
    }

    pub fn remaining(&self) -> u64 {
        self.total_mint_capacity.saturating_sub(self.num_minted)
    }
}

// ===== Concurrent Merkle tree =====

const COMPRESSION_ACCOUNT_TREE: u8 = 1;
const TREE_HEADER_V1: u8 = 0;
/// Account type and version bytes plus the 54-byte V1 header body.
pub const MERKLE_HEADER_LEN: usize = 2 + 54;
const NODE_LEN: u64 = 32;

/// Shape parameters of an account-compression tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MerkleTreeShape {
    pub max_depth: u32,
    pub max_buffer_size: u32,
    pub canopy_depth: u32,
}

impl MerkleTreeShape {
    /// Read the shape from a tree account; the canopy depth is recovered
    /// from the space left over after the header and tree body.
    pub fn decode(data: &[u8]) -> Result<Self, LedgerError> {
        let mut r = Reader::raw("ConcurrentMerkleTree", data);
        if r.u8()? != COMPRESSION_ACCOUNT_TREE {
            return Err(r.error("not a merkle tree account"));
        }
        if r.u8()? != TREE_HEADER_V1 {
            return Err(r.error("unsupported header version"));
        }
        let max_buffer_size = r.u32()?;
        let max_depth = r.u32()?;

        let body = tree_body_len(max_depth, max_buffer_size);
        let used = MERKLE_HEADER_LEN as u64 + body;
        let total = data.len() as u64;
        if total < used {
            return Err(r.error("account smaller than its tree"));
        }
        let canopy_nodes = (total - used) / NODE_LEN;
        // canopy of depth d holds 2^(d+1) - 2 nodes
        let canopy_depth = (canopy_nodes + 2).ilog2().saturating_sub(1);

        Ok(Self {
            max_depth,
            max_buffer_size,
            canopy_depth,
        })
    }

    /// Total bytes for an account holding a tree of this shape.
    pub fn account_size(&self) -> u64 {
        MERKLE_HEADER_LEN as u64
            + tree_body_len(self.max_depth, self.max_buffer_size)
            + canopy_len(self.canopy_depth)
    }

    pub fn capacity(&self) -> u64 {
        1u64 << self.max_depth
    }
}

fn tree_body_len(max_depth: u32, max_buffer_size: u32) -> u64 {
    let depth = max_depth as u64;
    // sequence number, active index, buffer size
    let counters = 3 * 8;
    // root, path, index, padding
    let change_log = NODE_LEN + NODE_LEN * depth + 8;
    // proof, leaf, index, padding
    let rightmost_proof = NODE_LEN * depth + NODE_LEN + 8;
    counters + max_buffer_size as u64 * change_log + rightmost_proof
}

fn canopy_len(canopy_depth: u32) -> u64 {
    if canopy_depth == 0 {
        return 0;
    }
    ((1u64 << (canopy_depth + 1)) - 2) * NODE_LEN
}

// ===== Entity manager =====

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyToAssetAccount {
    pub dao: Pubkey,
    pub asset: Pubkey,
    pub entity_key: Vec<u8>,
}

impl KeyToAssetAccount {
    pub fn decode(data: &[u8]) -> Result<Self, LedgerError> {
        let mut r = Reader::account("KeyToAssetV0", data)?;
        Ok(Self {
            dao: r.pubkey()?,
            asset: r.pubkey()?,
            entity_key: r.bytes()?,
        })
    }
}

/// Sub-network hotspot info; only the fields the flow needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotspotInfoAccount {
    pub asset: Pubkey,
    pub location: Option<u64>,
    pub num_location_asserts: u16,
}

impl HotspotInfoAccount {
    pub fn decode_iot(data: &[u8]) -> Result<Self, LedgerError> {
        let mut r = Reader::account("IotHotspotInfoV0", data)?;
        let asset = r.pubkey()?;
        let _bump = r.u8()?;
        let location = r.option(Reader::u64)?;
        let _elevation = r.option(Reader::i32)?;
        let _gain = r.option(Reader::i32)?;
        let _is_full_hotspot = r.bool()?;
        let num_location_asserts = r.u16()?;
        Ok(Self {
            asset,
            location,
            num_location_asserts,
        })
    }

    pub fn decode_mobile(data: &[u8]) -> Result<Self, LedgerError> {
        let mut r = Reader::account("MobileHotspotInfoV0", data)?;
        let asset = r.pubkey()?;
        let _bump = r.u8()?;
        let location = r.option(Reader::u64)?;
        let _is_full_hotspot = r.bool()?;
        let num_location_asserts = r.u16()?;
        Ok(Self {
            asset,
            location,
            num_location_asserts,
        })
    }
}

// ===== Compressed asset proofs =====

/// Leaf data and inclusion proof for a compressed asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetProof {
    pub asset: Pubkey,
    pub owner: Pubkey,
    pub tree: Pubkey,
    pub leaf_index: u32,
    pub root: Pubkey,
    pub data_hash: Pubkey,
    pub creator_hash: Pubkey,
    pub proof: Vec<Pubkey>,
}

impl AssetProof {
    /// Proof nodes to pass as trailing accounts, trimmed by the canopy.
    pub fn proof_accounts(&self, canopy_depth: u32) -> &[Pubkey] {
        let keep = self.proof.len().saturating_sub(canopy_depth as usize);
        &self.proof[..keep]
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn decodes_maker() {
        let tree = Pubkey::new([8; 32]);
        let collection = Pubkey::new([9; 32]);
        let maker = MakerAccount::decode(&maker_data("acme", tree, collection)).unwrap();
        assert_eq!(maker.name, "acme");
        assert_eq!(maker.merkle_tree, tree);
        assert_eq!(maker.collection, collection);
        assert_eq!(maker.issuing_authority, Pubkey::new([2; 32]));
    }

    #[test]
    fn decodes_tree_config() {
        let config = TreeConfigAccount::decode(&tree_config_data(16384, 16383)).unwrap();
        assert_eq!(config.total_mint_capacity, 16384);
        assert_eq!(config.remaining(), 1);
    }

    #[test]
    fn tree_size_matches_known_layout() {
        let shape = MerkleTreeShape {
            max_depth: 14,
            max_buffer_size: 64,
            canopy_depth: 0,
        };
        // 56 header + 24 counters + 64 * (40 + 448) + (448 + 40)
        assert_eq!(shape.account_size(), 56 + 24 + 64 * 488 + 488);
        assert_eq!(shape.capacity(), 16384);
    }

    #[test]
    fn canopy_depth_is_recovered_from_account_length() {
        for canopy_depth in [0, 1, 5, 10] {
            let shape = MerkleTreeShape {
                max_depth: 14,
                max_buffer_size: 64,
                canopy_depth,
            };
            assert_eq!(MerkleTreeShape::decode(&merkle_tree_data(shape)).unwrap(), shape);
        }
    }

    #[test]
    fn rejects_foreign_tree_account() {
        let mut data = merkle_tree_data(MerkleTreeShape {
            max_depth: 3,
            max_buffer_size: 8,
            canopy_depth: 0,
        });
        data[0] = 2;
        assert!(MerkleTreeShape::decode(&data).is_err());
    }

    #[test]
    fn decodes_hotspot_info() {
        let asset = Pubkey::new([7; 32]);
        let iot = HotspotInfoAccount::decode_iot(&iot_info_data(asset, Some(0x8c2836152804dff), 2)).unwrap();
        assert_eq!(iot.asset, asset);
        assert_eq!(iot.location, Some(0x8c2836152804dff));
        assert_eq!(iot.num_location_asserts, 2);

        let mobile = HotspotInfoAccount::decode_mobile(&mobile_info_data(asset, 1)).unwrap();
        assert_eq!(mobile.num_location_asserts, 1);
        assert!(HotspotInfoAccount::decode_iot(&mobile_info_data(asset, 1)).is_err());
    }

    #[test]
    fn proof_accounts_skip_canopy_levels() {
        let proof = AssetProof {
            asset: Pubkey::new([1; 32]),
            owner: Pubkey::new([2; 32]),
            tree: Pubkey::new([3; 32]),
            leaf_index: 4,
            root: Pubkey::new([5; 32]),
            data_hash: Pubkey::new([6; 32]),
            creator_hash: Pubkey::new([7; 32]),
            proof: (0..14).map(|i| Pubkey::new([i; 32])).collect(),
        };
        assert_eq!(proof.proof_accounts(0).len(), 14);
        assert_eq!(proof.proof_accounts(10).len(), 4);
    }
}

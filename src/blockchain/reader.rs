// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Typed account reads on top of [`ChainRpc`].

use std::sync::Arc;
use std::time::Duration;

use super::account_cache::AccountCache;
use super::accounts::{
    AccountInfo, AssetProof, HotspotInfoAccount, KeyToAssetAccount, MakerAccount, MerkleTreeShape,
    TreeConfigAccount,
};
use super::client::{ChainRpc, RpcError};
use super::programs::SubNetwork;
use super::types::{Hash, Instruction, Pubkey};
use super::transaction::LedgerTransaction;

const CACHE_CAPACITY: usize = 4096;
const CACHE_TTL: Duration = Duration::from_secs(300);

pub struct ChainReader {
    rpc: Arc<dyn ChainRpc>,
    cache: AccountCache,
}

impl ChainReader {
    pub fn new(rpc: Arc<dyn ChainRpc>) -> Self {
        Self {
            rpc,
            cache: AccountCache::new(CACHE_CAPACITY, CACHE_TTL),
        }
    }

    pub async fn account(&self, key: &Pubkey) -> Result<Option<AccountInfo>, RpcError> {
        self.rpc.get_account(key).await
    }

    pub async fn exists(&self, key: &Pubkey) -> Result<bool, RpcError> {
        Ok(self.account(key).await?.is_some())
    }

    pub async fn maker(&self, key: &Pubkey) -> Result<Option<MakerAccount>, RpcError> {
        match self.account(key).await? {
            Some(info) => Ok(Some(MakerAccount::decode(&info.data)?)),
            None => Ok(None),
        }
    }

    pub async fn tree_config(&self, tree_authority: &Pubkey) -> Result<TreeConfigAccount, RpcError> {
        let info = self
            .account(tree_authority)
            .await?
            .ok_or_else(|| RpcError::NotFound(format!("tree config {tree_authority}")))?;
        Ok(TreeConfigAccount::decode(&info.data)?)
    }

    pub async fn tree_shape(&self, merkle_tree: &Pubkey) -> Result<MerkleTreeShape, RpcError> {
        let info = self
            .account(merkle_tree)
            .await?
            .ok_or_else(|| RpcError::NotFound(format!("merkle tree {merkle_tree}")))?;
        Ok(MerkleTreeShape::decode(&info.data)?)
    }

    /// Asset minted for an entity, if any. Hits are cached.
    pub async fn asset_for(&self, key_to_asset: &Pubkey) -> Result<Option<Pubkey>, RpcError> {
        if let Some(asset) = self.cache.asset(key_to_asset) {
            return Ok(Some(asset));
        }
        let Some(info) = self.account(key_to_asset).await? else {
            return Ok(None);
        };
        let asset = KeyToAssetAccount::decode(&info.data)?.asset;
        self.cache.put_asset(key_to_asset, asset);
        Ok(Some(asset))
    }

    pub async fn hotspot_info(
        &self,
        network: SubNetwork,
        key: &Pubkey,
    ) -> Result<Option<HotspotInfoAccount>, RpcError> {
        let Some(info) = self.account(key).await? else {
            return Ok(None);
        };
        let decoded = match network {
            SubNetwork::Iot => HotspotInfoAccount::decode_iot(&info.data)?,
            SubNetwork::Mobile => HotspotInfoAccount::decode_mobile(&info.data)?,
        };
        Ok(Some(decoded))
    }

    pub async fn rent_exempt_minimum(&self, space: u64) -> Result<u64, RpcError> {
        if let Some(lamports) = self.cache.rent(space) {
            return Ok(lamports);
        }
        let lamports = self.rpc.minimum_balance_for_rent_exemption(space).await?;
        self.cache.put_rent(space, lamports);
        Ok(lamports)
    }

    pub async fn latest_blockhash(&self) -> Result<Hash, RpcError> {
        self.rpc.latest_blockhash().await
    }

    /// Compute-unit price for `instructions`: the median recent fee paid
    /// for their writable accounts, never below `base`.
    pub async fn priority_fee(&self, instructions: &[Instruction], base: u64) -> Result<u64, RpcError> {
        let mut writable: Vec<Pubkey> = instructions
            .iter()
            .flat_map(|ix| ix.accounts.iter())
            .filter(|meta| meta.is_writable)
            .map(|meta| meta.pubkey)
            .collect();
        writable.sort();
        writable.dedup();

        let mut fees = self.rpc.recent_prioritization_fees(&writable).await?;
        if fees.is_empty() {
            return Ok(base);
        }
        fees.sort_unstable();
        Ok(fees[fees.len() / 2].max(base))
    }

    pub async fn asset_proof(&self, asset: &Pubkey) -> Result<AssetProof, RpcError> {
        self.rpc.asset_proof(asset).await
    }

    pub async fn send_and_confirm(&self, tx: &LedgerTransaction) -> Result<String, RpcError> {
        self.rpc.send_and_confirm(tx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::accounts::fixtures::*;
    use crate::blockchain::testing::MockChain;
    use crate::blockchain::types::AccountMeta;

    #[tokio::test]
    async fn key_to_asset_hits_are_cached() {
        let chain = Arc::new(MockChain::default());
        let key = Pubkey::new([1; 32]);
        let asset = Pubkey::new([2; 32]);
        chain.set_account(key, key_to_asset_data(asset, b"entity"));

        let reader = ChainReader::new(chain.clone());
        assert_eq!(reader.asset_for(&key).await.unwrap(), Some(asset));

        chain.remove_account(&key);
        assert_eq!(reader.asset_for(&key).await.unwrap(), Some(asset));
    }

    #[tokio::test]
    async fn absence_is_not_cached() {
        let chain = Arc::new(MockChain::default());
        let key = Pubkey::new([1; 32]);
        let reader = ChainReader::new(chain.clone());
        assert_eq!(reader.asset_for(&key).await.unwrap(), None);

        chain.set_account(key, key_to_asset_data(Pubkey::new([3; 32]), b"entity"));
        assert!(reader.asset_for(&key).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn priority_fee_takes_median_with_floor() {
        let chain = Arc::new(MockChain::default());
        chain.set_priority_fees(vec![1, 500, 20, 7, 3]);
        let reader = ChainReader::new(chain.clone());
        let ix = Instruction {
            program_id: Pubkey::new([9; 32]),
            accounts: vec![AccountMeta::writable(Pubkey::new([1; 32]), false)],
            data: vec![],
        };
        assert_eq!(reader.priority_fee(&[ix.clone()], 1).await.unwrap(), 7);
        assert_eq!(reader.priority_fee(&[ix], 100).await.unwrap(), 100);
    }

    #[tokio::test]
    async fn missing_tree_config_is_not_found() {
        let reader = ChainReader::new(Arc::new(MockChain::default()));
        let err = reader.tree_config(&Pubkey::new([4; 32])).await.unwrap_err();
        assert!(matches!(err, RpcError::NotFound(_)));
    }
}

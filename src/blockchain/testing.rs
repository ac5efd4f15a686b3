// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory ledger used by unit tests.
//!
//! Submitted transactions are recorded. A submitted `update_maker_tree_v0`
//! is applied to the stored accounts so callers observe the resize on their
//! next read.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::accounts::fixtures::{maker_data, merkle_tree_data, tree_config_data};
use super::accounts::{AccountInfo, AssetProof, MakerAccount, MerkleTreeShape};
use super::borsh::discriminator;
use super::client::{ChainRpc, RpcError};
use super::programs::ENTITY_MANAGER_PROGRAM;
use super::transaction::LedgerTransaction;
use super::types::{Hash, Pubkey};

pub struct MockChain {
    accounts: Mutex<HashMap<Pubkey, AccountInfo>>,
    proofs: Mutex<HashMap<Pubkey, AssetProof>>,
    fees: Mutex<Vec<u64>>,
    sent: Mutex<Vec<LedgerTransaction>>,
    failing_sends: AtomicUsize,
    unconfirmed_sends: AtomicUsize,
    entity_manager: Pubkey,
}

impl Default for MockChain {
    fn default() -> Self {
        Self {
            accounts: Mutex::default(),
            proofs: Mutex::default(),
            fees: Mutex::default(),
            sent: Mutex::default(),
            failing_sends: AtomicUsize::new(0),
            unconfirmed_sends: AtomicUsize::new(0),
            entity_manager: ENTITY_MANAGER_PROGRAM.parse().unwrap(),
        }
    }
}

impl MockChain {
    pub fn set_account(&self, key: Pubkey, data: Vec<u8>) {
        self.accounts.lock().unwrap().insert(
            key,
            AccountInfo {
                lamports: 1_000_000,
                owner: self.entity_manager,
                data,
            },
        );
    }

    pub fn remove_account(&self, key: &Pubkey) {
        self.accounts.lock().unwrap().remove(key);
    }

    pub fn account_data(&self, key: &Pubkey) -> Option<Vec<u8>> {
        self.accounts.lock().unwrap().get(key).map(|a| a.data.clone())
    }

    pub fn set_priority_fees(&self, fees: Vec<u64>) {
        *self.fees.lock().unwrap() = fees;
    }

    pub fn set_asset_proof(&self, proof: AssetProof) {
        self.proofs.lock().unwrap().insert(proof.asset, proof);
    }

    /// Reject the next `n` submissions.
    pub fn fail_next_sends(&self, n: usize) {
        self.failing_sends.store(n, Ordering::SeqCst);
    }

    /// Apply the next `n` submissions but report them unconfirmed, as when
    /// a transaction lands after the confirmation window.
    pub fn unconfirm_next_sends(&self, n: usize) {
        self.unconfirmed_sends.store(n, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<LedgerTransaction> {
        self.sent.lock().unwrap().clone()
    }

    fn apply_maker_tree_updates(&self, tx: &LedgerTransaction) {
        let message = &tx.message;
        let tag = discriminator("global", "update_maker_tree_v0");
        for ix in &message.instructions {
            let program = message.account_keys[ix.program_id_index as usize];
            if program != self.entity_manager || ix.data.get(..8) != Some(&tag[..]) {
                continue;
            }
            let key = |i: usize| message.account_keys[ix.accounts[i] as usize];
            let (maker_key, new_authority, new_tree) = (key(1), key(3), key(4));
            let max_depth = u32::from_le_bytes(ix.data[8..12].try_into().unwrap());
            let max_buffer_size = u32::from_le_bytes(ix.data[12..16].try_into().unwrap());

            let maker = MakerAccount::decode(&self.account_data(&maker_key).unwrap()).unwrap();
            self.set_account(maker_key, maker_data(&maker.name, new_tree, maker.collection));
            self.set_account(new_authority, tree_config_data(1 << max_depth, 0));
            self.set_account(
                new_tree,
                merkle_tree_data(MerkleTreeShape {
                    max_depth,
                    max_buffer_size,
                    canopy_depth: 0,
                }),
            );
        }
    }
}

#[async_trait]
impl ChainRpc for MockChain {
    async fn get_account(&self, key: &Pubkey) -> Result<Option<AccountInfo>, RpcError> {
        Ok(self.accounts.lock().unwrap().get(key).cloned())
    }

    async fn minimum_balance_for_rent_exemption(&self, space: u64) -> Result<u64, RpcError> {
        Ok((space + 128) * 6_960)
    }

    async fn latest_blockhash(&self) -> Result<Hash, RpcError> {
        Ok(Hash::new([7; 32]))
    }

    async fn recent_prioritization_fees(&self, _accounts: &[Pubkey]) -> Result<Vec<u64>, RpcError> {
        Ok(self.fees.lock().unwrap().clone())
    }

    async fn send_and_confirm(&self, tx: &LedgerTransaction) -> Result<String, RpcError> {
        let signature = bs58::encode(tx.signatures[0]).into_string();
        let failing = self.failing_sends.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_sends.store(failing - 1, Ordering::SeqCst);
            return Err(RpcError::TransactionFailed {
                signature,
                reason: "simulated failure".to_string(),
            });
        }
        self.sent.lock().unwrap().push(tx.clone());
        self.apply_maker_tree_updates(tx);
        let unconfirmed = self.unconfirmed_sends.load(Ordering::SeqCst);
        if unconfirmed > 0 {
            self.unconfirmed_sends.store(unconfirmed - 1, Ordering::SeqCst);
            return Err(RpcError::Unconfirmed(signature));
        }
        Ok(signature)
    }

    async fn asset_proof(&self, asset: &Pubkey) -> Result<AssetProof, RpcError> {
        self.proofs
            .lock()
            .unwrap()
            .get(asset)
            .cloned()
            .ok_or_else(|| RpcError::NotFound(format!("asset {asset}")))
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Merkle tree capacity management for compressed issuance.
//!
//! Before a mint the maker's tree must keep `headroom` free leaves. When it
//! does not, a new tree with the current tree's shape is allocated and the
//! maker is repointed to it in one submitted transaction.
//!
//! Concurrent requests for the same tree serialize on a per-tree lock and
//! re-read the maker after acquiring it, so only the first performs the
//! resize. Across processes, a resize whose submission fails is accepted if
//! a re-read shows the maker already moved to another tree.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;

use crate::blockchain::accounts::{MakerAccount, TreeConfigAccount};
use crate::blockchain::instructions::{create_account, update_maker_tree, UpdateMakerTree};
use crate::blockchain::Pubkey;
use crate::signing::MakerSigner;

use super::error::OnboardError;
use super::ledger::{Ledger, RESIZE_COMPUTE_UNITS};

pub struct CapacityManager {
    headroom: u64,
    locks: Mutex<HashMap<Pubkey, Arc<tokio::sync::Mutex<()>>>>,
}

impl CapacityManager {
    pub fn new(headroom: u64) -> Self {
        Self {
            headroom,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn needs_resize(&self, config: &TreeConfigAccount) -> bool {
        config.num_minted >= config.total_mint_capacity.saturating_sub(self.headroom)
    }

    /// Return the maker account once its tree has room for another mint,
    /// resizing first if needed.
    pub async fn ensure_capacity(
        &self,
        ledger: &Ledger,
        maker_key: &Pubkey,
        signer: &MakerSigner,
    ) -> Result<MakerAccount, OnboardError> {
        let observed = self.maker(ledger, maker_key).await?;
        let lock = self.lock_for(&observed.merkle_tree);
        let _guard = lock.lock().await;

        // another request may have resized while we waited
        let maker = self.maker(ledger, maker_key).await?;
        if maker.merkle_tree != observed.merkle_tree {
            self.retire_lock(&observed.merkle_tree);
        }
        let authority = ledger.ctx.tree_authority(&maker.merkle_tree)?;
        let config = ledger.reader.tree_config(&authority).await?;
        if !self.needs_resize(&config) {
            return Ok(maker);
        }

        tracing::info!(
            tree = %maker.merkle_tree,
            minted = config.num_minted,
            capacity = config.total_mint_capacity,
            "Tree is full, creating a new tree"
        );

        if let Err(e) = self.resize(ledger, maker_key, &maker, signer).await {
            let current = self.maker(ledger, maker_key).await?;
            if current.merkle_tree != maker.merkle_tree {
                tracing::info!(
                    error = %e,
                    tree = %current.merkle_tree,
                    "Resize submission failed but maker already moved to a new tree"
                );
                self.retire_lock(&maker.merkle_tree);
                return Ok(current);
            }
            tracing::error!(error = %e, tree = %maker.merkle_tree, "Tree resize failed");
            return Err(e);
        }

        self.retire_lock(&maker.merkle_tree);
        self.maker(ledger, maker_key).await
    }

    async fn resize(
        &self,
        ledger: &Ledger,
        maker_key: &Pubkey,
        maker: &MakerAccount,
        signer: &MakerSigner,
    ) -> Result<(), OnboardError> {
        let shape = ledger.reader.tree_shape(&maker.merkle_tree).await?;
        let space = shape.account_size();
        let lamports = ledger.reader.rent_exempt_minimum(space).await?;

        let new_tree_key = SigningKey::generate(&mut OsRng);
        let new_tree = Pubkey::from(new_tree_key.verifying_key());
        let payer = signer.pubkey();
        let ctx = &ledger.ctx;

        let instructions = vec![
            create_account(
                ctx,
                &payer,
                &new_tree,
                lamports,
                space,
                &ctx.programs.account_compression,
            ),
            update_maker_tree(
                ctx,
                UpdateMakerTree {
                    payer: &payer,
                    maker: maker_key,
                    current_tree: &maker.merkle_tree,
                    new_tree: &new_tree,
                    max_depth: shape.max_depth,
                    max_buffer_size: shape.max_buffer_size,
                },
            )?,
        ];

        let mut tx = ledger.compile(instructions, RESIZE_COMPUTE_UNITS, &payer).await?;
        signer.sign_ledger(&mut tx)?;
        tx.partial_sign(&new_tree_key)?;

        let signature = ledger.reader.send_and_confirm(&tx).await?;
        tracing::info!(%signature, new_tree = %new_tree, "Maker tree resized");
        Ok(())
    }

    async fn maker(&self, ledger: &Ledger, maker_key: &Pubkey) -> Result<MakerAccount, OnboardError> {
        ledger
            .reader
            .maker(maker_key)
            .await?
            .ok_or(OnboardError::MakerAccountMissing)
    }

    fn lock_for(&self, tree: &Pubkey) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.entry(*tree).or_default().clone()
    }

    /// Drop the lock of a tree the maker has moved away from. Requests
    /// already waiting on it keep their handle.
    fn retire_lock(&self, tree: &Pubkey) {
        let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.remove(tree);
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::sync::Arc;

    use crate::blockchain::accounts::fixtures::{maker_data, merkle_tree_data, tree_config_data};
    use crate::blockchain::accounts::MerkleTreeShape;
    use crate::blockchain::programs::fixtures::context;
    use crate::blockchain::testing::MockChain;
    use crate::blockchain::{ChainReader, Pubkey};

    use super::Ledger;

    pub const TREE: Pubkey = Pubkey::new([50; 32]);
    pub const COLLECTION: Pubkey = Pubkey::new([51; 32]);

    pub fn ledger(chain: Arc<MockChain>) -> Ledger {
        Ledger {
            reader: ChainReader::new(chain),
            ctx: context(),
            base_priority_fee: 1,
            ecc_verifier: None,
            initial_lamports: None,
        }
    }

    /// Register maker `name` on the mock chain with a depth-4 tree holding
    /// `minted` of its 16 leaves. Returns the maker account key.
    pub fn seed_maker(chain: &MockChain, ledger: &Ledger, name: &str, minted: u64) -> Pubkey {
        let maker_key = ledger.ctx.maker(name).unwrap();
        chain.set_account(maker_key, maker_data(name, TREE, COLLECTION));
        chain.set_account(
            ledger.ctx.tree_authority(&TREE).unwrap(),
            tree_config_data(16, minted),
        );
        chain.set_account(
            TREE,
            merkle_tree_data(MerkleTreeShape {
                max_depth: 4,
                max_buffer_size: 8,
                canopy_depth: 2,
            }),
        );
        maker_key
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::blockchain::accounts::MerkleTreeShape;
    use crate::blockchain::testing::MockChain;
    use crate::custody::Entropy;

    fn signer() -> MakerSigner {
        MakerSigner::from_entropy(&Entropy::from_bytes(vec![42; 32]).unwrap())
    }

    #[tokio::test]
    async fn resizes_once_when_one_leaf_left() {
        let chain = Arc::new(MockChain::default());
        let ledger = ledger(chain.clone());
        let maker_key = seed_maker(&chain, &ledger, "acme", 15);

        let manager = CapacityManager::new(2);
        let maker = manager.ensure_capacity(&ledger, &maker_key, &signer()).await.unwrap();

        let sent = chain.sent();
        assert_eq!(sent.len(), 1);
        assert_ne!(maker.merkle_tree, TREE);
        assert!(sent[0].is_signed_by(&signer().pubkey()));
        assert!(sent[0].is_signed_by(&maker.merkle_tree));
        assert!(sent[0].missing_signers().is_empty());
    }

    #[tokio::test]
    async fn no_resize_with_three_leaves_left() {
        let chain = Arc::new(MockChain::default());
        let ledger = ledger(chain.clone());
        let maker_key = seed_maker(&chain, &ledger, "acme", 13);

        let maker = CapacityManager::new(2)
            .ensure_capacity(&ledger, &maker_key, &signer())
            .await
            .unwrap();

        assert!(chain.sent().is_empty());
        assert_eq!(maker.merkle_tree, TREE);
    }

    #[tokio::test]
    async fn boundary_at_headroom() {
        let manager = CapacityManager::new(2);
        let config = |minted| TreeConfigAccount {
            tree_creator: Pubkey::default(),
            tree_delegate: Pubkey::default(),
            total_mint_capacity: 16,
            num_minted: minted,
        };
        assert!(!manager.needs_resize(&config(13)));
        assert!(manager.needs_resize(&config(14)));
        assert!(manager.needs_resize(&config(16)));
    }

    #[tokio::test]
    async fn new_tree_keeps_current_shape() {
        let chain = Arc::new(MockChain::default());
        let ledger = ledger(chain.clone());
        let maker_key = seed_maker(&chain, &ledger, "acme", 16);

        CapacityManager::new(2)
            .ensure_capacity(&ledger, &maker_key, &signer())
            .await
            .unwrap();

        let tx = &chain.sent()[0];
        let create = &tx.message.instructions[2];
        let space = u64::from_le_bytes(create.data[12..20].try_into().unwrap());
        let expected = MerkleTreeShape {
            max_depth: 4,
            max_buffer_size: 8,
            canopy_depth: 2,
        };
        assert_eq!(space, expected.account_size());
    }

    #[tokio::test]
    async fn concurrent_requests_resize_once() {
        let chain = Arc::new(MockChain::default());
        let ledger = ledger(chain.clone());
        let maker_key = seed_maker(&chain, &ledger, "acme", 15);
        let manager = CapacityManager::new(2);
        let signer = signer();

        let (a, b) = tokio::join!(
            manager.ensure_capacity(&ledger, &maker_key, &signer),
            manager.ensure_capacity(&ledger, &maker_key, &signer),
        );

        assert_eq!(chain.sent().len(), 1);
        assert_eq!(a.unwrap().merkle_tree, b.unwrap().merkle_tree);
    }

    #[tokio::test]
    async fn resize_retires_the_old_tree_lock() {
        let chain = Arc::new(MockChain::default());
        let ledger = ledger(chain.clone());
        let maker_key = seed_maker(&chain, &ledger, "acme", 15);
        let manager = CapacityManager::new(2);

        let maker = manager.ensure_capacity(&ledger, &maker_key, &signer()).await.unwrap();
        manager.ensure_capacity(&ledger, &maker_key, &signer()).await.unwrap();

        let locks = manager.locks.lock().unwrap();
        assert!(!locks.contains_key(&TREE));
        assert_eq!(locks.keys().collect::<Vec<_>>(), vec![&maker.merkle_tree]);
    }

    #[tokio::test]
    async fn unconfirmed_resize_that_landed_is_accepted() {
        let chain = Arc::new(MockChain::default());
        let ledger = ledger(chain.clone());
        let maker_key = seed_maker(&chain, &ledger, "acme", 15);
        chain.unconfirm_next_sends(1);

        let maker = CapacityManager::new(2)
            .ensure_capacity(&ledger, &maker_key, &signer())
            .await
            .unwrap();
        assert_ne!(maker.merkle_tree, TREE);
    }

    #[tokio::test]
    async fn failed_resize_is_reported() {
        let chain = Arc::new(MockChain::default());
        let ledger = ledger(chain.clone());
        let maker_key = seed_maker(&chain, &ledger, "acme", 15);
        chain.fail_next_sends(1);

        let err = CapacityManager::new(2)
            .ensure_capacity(&ledger, &maker_key, &signer())
            .await
            .unwrap_err();
        assert!(matches!(err, OnboardError::Upstream(_)));
    }

    #[tokio::test]
    async fn missing_maker_account_is_not_found() {
        let chain = Arc::new(MockChain::default());
        let ledger = ledger(chain.clone());
        let err = CapacityManager::new(2)
            .ensure_capacity(&ledger, &Pubkey::new([1; 32]), &signer())
            .await
            .unwrap_err();
        assert!(matches!(err, OnboardError::MakerAccountMissing));
    }
}

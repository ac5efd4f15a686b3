// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Maker co-signing.
//!
//! The maker keypair is derived from unsealed entropy for the duration of a
//! single request. The entropy bytes are the ed25519 seed, so the same
//! entropy always yields the same keypair in both signing domains.

use ed25519_dalek::SigningKey;

use crate::blockchain::{LedgerError, LedgerTransaction, Pubkey};
use crate::custody::Entropy;
use crate::helium::{HeliumAddress, HeliumTxn};

/// Ephemeral maker keypair. The secret half is zeroized on drop.
pub struct MakerSigner {
    key: SigningKey,
}

impl MakerSigner {
    pub fn from_entropy(entropy: &Entropy) -> Self {
        Self {
            key: SigningKey::from_bytes(entropy.expose()),
        }
    }

    /// Legacy-ledger address of the maker.
    pub fn helium_address(&self) -> HeliumAddress {
        HeliumAddress::from_public_key(&self.key.verifying_key())
    }

    /// New-ledger address of the maker.
    pub fn pubkey(&self) -> Pubkey {
        Pubkey::from(self.key.verifying_key())
    }

    /// Add the maker's payer signature to a device transaction.
    pub fn sign_legacy(&self, txn: &mut HeliumTxn) {
        txn.sign_as_payer(&self.key);
    }

    /// Fill the maker's slot; every other signer slot stays empty for the
    /// caller or a counterparty.
    pub fn sign_ledger(&self, tx: &mut LedgerTransaction) -> Result<(), LedgerError> {
        tx.partial_sign(&self.key)
    }
}

impl std::fmt::Debug for MakerSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MakerSigner")
            .field("pubkey", &self.pubkey())
            .finish_non_exhaustive()
    }
}

/// What a co-signing request produces, by domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignedArtifact {
    /// Base64 device transaction carrying the payer signature.
    Legacy(String),
    /// Serialized, possibly partially signed, ledger transactions.
    Ledger(Vec<Vec<u8>>),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::instructions::transfer;
    use crate::blockchain::programs::fixtures::context;
    use crate::blockchain::Hash;
    use crate::helium::txn::fixtures::*;
    use ed25519_dalek::{Signature, Verifier};

    fn entropy() -> Entropy {
        Entropy::from_bytes(vec![42; 32]).unwrap()
    }

    #[test]
    fn derivation_is_deterministic() {
        let a = MakerSigner::from_entropy(&entropy());
        let b = MakerSigner::from_entropy(&entropy());
        assert_eq!(a.pubkey(), b.pubkey());
        assert_eq!(a.helium_address(), b.helium_address());
        assert_eq!(a.helium_address().public_key_bytes(), a.pubkey().to_bytes());
    }

    #[test]
    fn legacy_signature_verifies_against_maker_key() {
        let signer = MakerSigner::from_entropy(&entropy());
        let owner = SigningKey::from_bytes(&[1; 32]);
        let gateway = SigningKey::from_bytes(&[2; 32]);
        let mut txn = add_gateway(&owner, &gateway, &signer.helium_address());

        signer.sign_legacy(&mut txn);

        let raw = txn.payer_signature().unwrap();
        let signature = Signature::from_slice(raw).unwrap();
        let key = signer.helium_address().verifying_key().unwrap();
        assert!(key.verify(&txn.signing_bytes(), &signature).is_ok());
    }

    #[test]
    fn ledger_signing_leaves_counterparty_slot_empty() {
        let ctx = context();
        let signer = MakerSigner::from_entropy(&entropy());
        let owner = Pubkey::new([9; 32]);
        let mut ix = transfer(&ctx, &signer.pubkey(), &owner, 10);
        ix.accounts[1].is_signer = true;
        let mut tx = LedgerTransaction::new(&[ix], &signer.pubkey(), Hash::new([1; 32])).unwrap();

        signer.sign_ledger(&mut tx).unwrap();

        assert!(tx.is_signed_by(&signer.pubkey()));
        assert_eq!(tx.missing_signers(), vec![owner]);
    }

    #[test]
    fn debug_hides_secret() {
        let signer = MakerSigner::from_entropy(&entropy());
        let rendered = format!("{signer:?}");
        assert!(!rendered.contains(&hex::encode([42u8; 32])));
        assert!(rendered.contains("MakerSigner"));
    }
}

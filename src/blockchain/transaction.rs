// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Legacy-format ledger transactions with partial signing.
//!
//! ## Wire Layout
//!
//! ```text
//! shortvec(signature count) || signature[64]...
//! message:
//!   header: required signatures | readonly signed | readonly unsigned
//!   shortvec(account count) || account[32]...
//!   recent blockhash[32]
//!   shortvec(instruction count) ||
//!     program index | shortvec(n) account indexes | shortvec(n) data
//! ```
//!
//! Signature slots that have not been filled are all zeros, so a
//! transaction can travel to the next signer without losing its layout.

use ed25519_dalek::{Signer, SigningKey};

use super::types::{Hash, Instruction, LedgerError, Pubkey};

const SIGNATURE_LEN: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MessageHeader {
    pub num_required_signatures: u8,
    pub num_readonly_signed_accounts: u8,
    pub num_readonly_unsigned_accounts: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledInstruction {
    pub program_id_index: u8,
    pub accounts: Vec<u8>,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub header: MessageHeader,
    pub account_keys: Vec<Pubkey>,
    pub recent_blockhash: Hash,
    pub instructions: Vec<CompiledInstruction>,
}

struct KeyEntry {
    pubkey: Pubkey,
    is_signer: bool,
    is_writable: bool,
}

impl Message {
    /// Compile instructions into a message with `fee_payer` in slot zero.
    ///
    /// Accounts are ordered writable signers, readonly signers, writable
    /// non-signers, readonly non-signers; privileges are merged per key.
    pub fn compile(
        instructions: &[Instruction],
        fee_payer: &Pubkey,
        recent_blockhash: Hash,
    ) -> Result<Self, LedgerError> {
        let mut entries: Vec<KeyEntry> = vec![KeyEntry {
            pubkey: *fee_payer,
            is_signer: true,
            is_writable: true,
        }];

        let mut upsert = |pubkey: Pubkey, is_signer: bool, is_writable: bool| {
            if let Some(entry) = entries.iter_mut().find(|e| e.pubkey == pubkey) {
                entry.is_signer |= is_signer;
                entry.is_writable |= is_writable;
            } else {
                entries.push(KeyEntry {
                    pubkey,
                    is_signer,
                    is_writable,
                });
            }
        };

        for ix in instructions {
            for meta in &ix.accounts {
                upsert(meta.pubkey, meta.is_signer, meta.is_writable);
            }
            upsert(ix.program_id, false, false);
        }

        let rank = |e: &KeyEntry| match (e.is_signer, e.is_writable) {
            (true, true) => 0,
            (true, false) => 1,
            (false, true) => 2,
            (false, false) => 3,
        };
        // stable sort keeps the fee payer first among writable signers
        entries.sort_by_key(rank);

        if entries.len() > u8::MAX as usize {
            return Err(LedgerError::TooManyAccounts);
        }

        let header = MessageHeader {
            num_required_signatures: entries.iter().filter(|e| e.is_signer).count() as u8,
            num_readonly_signed_accounts: entries
                .iter()
                .filter(|e| e.is_signer && !e.is_writable)
                .count() as u8,
            num_readonly_unsigned_accounts: entries
                .iter()
                .filter(|e| !e.is_signer && !e.is_writable)
                .count() as u8,
        };
        let account_keys: Vec<Pubkey> = entries.into_iter().map(|e| e.pubkey).collect();

        let index_of = |key: &Pubkey| -> Result<u8, LedgerError> {
            account_keys
                .iter()
                .position(|k| k == key)
                .map(|i| i as u8)
                .ok_or(LedgerError::TooManyAccounts)
        };

        let compiled = instructions
            .iter()
            .map(|ix| {
                Ok(CompiledInstruction {
                    program_id_index: index_of(&ix.program_id)?,
                    accounts: ix
                        .accounts
                        .iter()
                        .map(|meta| index_of(&meta.pubkey))
                        .collect::<Result<_, _>>()?,
                    data: ix.data.clone(),
                })
            })
            .collect::<Result<Vec<_>, LedgerError>>()?;

        Ok(Self {
            header,
            account_keys,
            recent_blockhash,
            instructions: compiled,
        })
    }

    pub fn signer_keys(&self) -> &[Pubkey] {
        &self.account_keys[..self.header.num_required_signatures as usize]
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(256);
        out.push(self.header.num_required_signatures);
        out.push(self.header.num_readonly_signed_accounts);
        out.push(self.header.num_readonly_unsigned_accounts);

        encode_len(&mut out, self.account_keys.len());
        for key in &self.account_keys {
            out.extend_from_slice(key.as_bytes());
        }
        out.extend_from_slice(self.recent_blockhash.as_bytes());

        encode_len(&mut out, self.instructions.len());
        for ix in &self.instructions {
            out.push(ix.program_id_index);
            encode_len(&mut out, ix.accounts.len());
            out.extend_from_slice(&ix.accounts);
            encode_len(&mut out, ix.data.len());
            out.extend_from_slice(&ix.data);
        }
        out
    }

    fn deserialize(reader: &mut Reader<'_>) -> Result<Self, LedgerError> {
        let header = MessageHeader {
            num_required_signatures: reader.byte()?,
            num_readonly_signed_accounts: reader.byte()?,
            num_readonly_unsigned_accounts: reader.byte()?,
        };

        let key_count = reader.len()?;
        let account_keys = (0..key_count)
            .map(|_| reader.take(32).and_then(Pubkey::from_slice))
            .collect::<Result<Vec<_>, _>>()?;
        let recent_blockhash = Hash::new(reader.array()?);

        let ix_count = reader.len()?;
        let mut instructions = Vec::with_capacity(ix_count);
        for _ in 0..ix_count {
            let program_id_index = reader.byte()?;
            let n = reader.len()?;
            let accounts = reader.take(n)?.to_vec();
            let n = reader.len()?;
            let data = reader.take(n)?.to_vec();
            instructions.push(CompiledInstruction {
                program_id_index,
                accounts,
                data,
            });
        }

        let signers = header.num_required_signatures as usize;
        if signers > account_keys.len()
            || header.num_readonly_signed_accounts as usize > signers
            || header.num_readonly_unsigned_accounts as usize > account_keys.len() - signers
        {
            return Err(LedgerError::MalformedTransaction);
        }

        Ok(Self {
            header,
            account_keys,
            recent_blockhash,
            instructions,
        })
    }
}

/// A transaction whose signature slots may be partially filled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerTransaction {
    pub signatures: Vec<[u8; SIGNATURE_LEN]>,
    pub message: Message,
}

impl LedgerTransaction {
    pub fn new(
        instructions: &[Instruction],
        fee_payer: &Pubkey,
        recent_blockhash: Hash,
    ) -> Result<Self, LedgerError> {
        let message = Message::compile(instructions, fee_payer, recent_blockhash)?;
        let signatures = vec![[0u8; SIGNATURE_LEN]; message.header.num_required_signatures as usize];
        Ok(Self {
            signatures,
            message,
        })
    }

    /// Fill the slot belonging to `key`; other slots are left untouched.
    pub fn partial_sign(&mut self, key: &SigningKey) -> Result<(), LedgerError> {
        let pubkey = Pubkey::from(key.verifying_key());
        let slot = self
            .message
            .signer_keys()
            .iter()
            .position(|k| *k == pubkey)
            .ok_or(LedgerError::UnknownSigner(pubkey))?;
        let signature = key.sign(&self.message.serialize());
        self.signatures[slot] = signature.to_bytes();
        Ok(())
    }

    pub fn is_signed_by(&self, key: &Pubkey) -> bool {
        self.message
            .signer_keys()
            .iter()
            .position(|k| k == key)
            .is_some_and(|slot| self.signatures[slot] != [0u8; SIGNATURE_LEN])
    }

    /// Signers whose slots are still empty.
    pub fn missing_signers(&self) -> Vec<Pubkey> {
        self.message
            .signer_keys()
            .iter()
            .zip(&self.signatures)
            .filter(|(_, sig)| **sig == [0u8; SIGNATURE_LEN])
            .map(|(key, _)| *key)
            .collect()
    }

    pub fn serialize(&self) -> Vec<u8> {
        let message = self.message.serialize();
        let mut out = Vec::with_capacity(1 + self.signatures.len() * SIGNATURE_LEN + message.len());
        encode_len(&mut out, self.signatures.len());
        for sig in &self.signatures {
            out.extend_from_slice(sig);
        }
        out.extend_from_slice(&message);
        out
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, LedgerError> {
        let mut reader = Reader { bytes, pos: 0 };
        let count = reader.len()?;
        let signatures = (0..count)
            .map(|_| reader.array::<SIGNATURE_LEN>())
            .collect::<Result<Vec<_>, _>>()?;
        let message = Message::deserialize(&mut reader)?;
        if reader.pos != bytes.len() || signatures.len() != message.header.num_required_signatures as usize {
            return Err(LedgerError::MalformedTransaction);
        }
        Ok(Self {
            signatures,
            message,
        })
    }
}

// ===== compact-u16 =====

fn encode_len(out: &mut Vec<u8>, len: usize) {
    let mut rem = len as u16;
    loop {
        let mut byte = (rem & 0x7f) as u8;
        rem >>= 7;
        if rem == 0 {
            out.push(byte);
            break;
        }
        byte |= 0x80;
        out.push(byte);
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn byte(&mut self) -> Result<u8, LedgerError> {
        let b = *self.bytes.get(self.pos).ok_or(LedgerError::MalformedTransaction)?;
        self.pos += 1;
        Ok(b)
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], LedgerError> {
        let end = self.pos.checked_add(n).ok_or(LedgerError::MalformedTransaction)?;
        let slice = self
            .bytes
            .get(self.pos..end)
            .ok_or(LedgerError::MalformedTransaction)?;
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], LedgerError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn len(&mut self) -> Result<usize, LedgerError> {
        let mut value: usize = 0;
        for shift in [0, 7, 14] {
            let byte = self.byte()?;
            value |= ((byte & 0x7f) as usize) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(LedgerError::MalformedTransaction)
    }
}

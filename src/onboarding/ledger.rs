// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! New-ledger handle shared by the flows that build ledger transactions.

use crate::blockchain::instructions::with_compute_budget;
use crate::blockchain::{ChainReader, Instruction, LedgerContext, LedgerTransaction, Pubkey};
use crate::signing::EccVerifierClient;

use super::error::OnboardError;

/// Compute units requested for single-instruction onboarding transactions.
pub const ONBOARD_COMPUTE_UNITS: u32 = 300_000;

/// Compute units requested for the tree resize batch.
pub const RESIZE_COMPUTE_UNITS: u32 = 500_000;

pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

pub struct Ledger {
    pub reader: ChainReader,
    pub ctx: LedgerContext,
    /// Floor for the compute-unit price, in micro-lamports.
    pub base_priority_fee: u64,
    /// Remote verifier that adds the ECC verifier signature to mints.
    pub ecc_verifier: Option<EccVerifierClient>,
    /// Balance top-up for new hotspot owners, in lamports.
    pub initial_lamports: Option<u64>,
}

impl Ledger {
    /// Compile `instructions` behind a compute budget priced from recent
    /// fees, with `fee_payer` in the first signer slot. No slot is signed.
    pub async fn compile(
        &self,
        instructions: Vec<Instruction>,
        compute_units: u32,
        fee_payer: &Pubkey,
    ) -> Result<LedgerTransaction, OnboardError> {
        let price = self
            .reader
            .priority_fee(&instructions, self.base_priority_fee)
            .await?;
        let instructions = with_compute_budget(&self.ctx, compute_units, price, instructions);
        let blockhash = self.reader.latest_blockhash().await?;
        Ok(LedgerTransaction::new(&instructions, fee_payer, blockhash)?)
    }
}

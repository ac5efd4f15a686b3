// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded onboarding database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `makers`: maker id → serialized maker record (sealed entropy included)
//! - `maker_names`: maker name → maker id (unique)
//! - `hotspots`: hotspot id → serialized hotspot record
//! - `onboarding_keys`: onboarding key → hotspot id (unique)
//! - `public_addresses`: bound public address → hotspot id (unique)
//! - `mac_wlan0`, `mac_eth0`, `rpi_serials`, `helium_serials`: device
//!   identifier → hotspot id (unique when present)
//! - `sequences`: table name → last issued id
//!
//! redb admits one write transaction at a time, so a read-check-write done
//! inside a single write transaction is a compare-and-set.

use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};

pub(super) const MAKERS: TableDefinition<u64, &[u8]> = TableDefinition::new("makers");
pub(super) const MAKER_NAMES: TableDefinition<&str, u64> = TableDefinition::new("maker_names");
pub(super) const HOTSPOTS: TableDefinition<u64, &[u8]> = TableDefinition::new("hotspots");
pub(super) const ONBOARDING_KEYS: TableDefinition<&str, u64> = TableDefinition::new("onboarding_keys");
pub(super) const PUBLIC_ADDRESSES: TableDefinition<&str, u64> = TableDefinition::new("public_addresses");
pub(super) const MAC_WLAN0: TableDefinition<&str, u64> = TableDefinition::new("mac_wlan0");
pub(super) const MAC_ETH0: TableDefinition<&str, u64> = TableDefinition::new("mac_eth0");
pub(super) const RPI_SERIALS: TableDefinition<&str, u64> = TableDefinition::new("rpi_serials");
pub(super) const HELIUM_SERIALS: TableDefinition<&str, u64> = TableDefinition::new("helium_serials");
const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    Conflict(String),

    #[error("{0} is bound to a public address and can no longer change")]
    Immutable(String),

    #[error("record is already bound to {bound}")]
    AlreadyBound { bound: String },

    #[error("public address {address} is bound to another record")]
    AddressTaken { address: String },
}

pub type DbResult<T> = Result<T, DbError>;

/// Embedded ACID store for makers and hotspots.
pub struct OnboardingDb {
    db: Database,
}

impl OnboardingDb {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> DbResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(MAKERS)?;
            let _ = write_txn.open_table(MAKER_NAMES)?;
            let _ = write_txn.open_table(HOTSPOTS)?;
            let _ = write_txn.open_table(ONBOARDING_KEYS)?;
            let _ = write_txn.open_table(PUBLIC_ADDRESSES)?;
            let _ = write_txn.open_table(MAC_WLAN0)?;
            let _ = write_txn.open_table(MAC_ETH0)?;
            let _ = write_txn.open_table(RPI_SERIALS)?;
            let _ = write_txn.open_table(HELIUM_SERIALS)?;
            let _ = write_txn.open_table(SEQUENCES)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    pub(super) fn inner(&self) -> &Database {
        &self.db
    }

    /// Cheap read used by the readiness probe.
    pub fn ping(&self) -> DbResult<()> {
        let read_txn = self.db.begin_read()?;
        let _ = read_txn.open_table(SEQUENCES)?;
        Ok(())
    }
}

/// Allocate the next id of `sequence` inside an open write transaction.
pub(super) fn next_id(txn: &WriteTransaction, sequence: &str) -> DbResult<u64> {
    let mut table = txn.open_table(SEQUENCES)?;
    let current = table.get(sequence)?.map(|v| v.value()).unwrap_or(0);
    let next = current + 1;
    table.insert(sequence, next)?;
    Ok(next)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// A database in a fresh temporary directory. Keep the guard alive for
    /// the duration of the test.
    pub fn temp_db() -> (OnboardingDb, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = OnboardingDb::open(&dir.path().join("onboarding.redb")).unwrap();
        (db, dir)
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::temp_db;
    use super::*;

    #[test]
    fn sequences_are_monotonic_per_name() {
        let (db, _dir) = temp_db();
        let txn = db.inner().begin_write().unwrap();
        assert_eq!(next_id(&txn, "makers").unwrap(), 1);
        assert_eq!(next_id(&txn, "makers").unwrap(), 2);
        assert_eq!(next_id(&txn, "hotspots").unwrap(), 1);
        txn.commit().unwrap();

        let txn = db.inner().begin_write().unwrap();
        assert_eq!(next_id(&txn, "makers").unwrap(), 3);
    }

    #[test]
    fn reopen_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("onboarding.redb");
        {
            let db = OnboardingDb::open(&path).unwrap();
            let txn = db.inner().begin_write().unwrap();
            next_id(&txn, "makers").unwrap();
            txn.commit().unwrap();
        }
        let db = OnboardingDb::open(&path).unwrap();
        db.ping().unwrap();
        let txn = db.inner().begin_write().unwrap();
        assert_eq!(next_id(&txn, "makers").unwrap(), 2);
    }
}

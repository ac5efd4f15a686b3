// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Maker repository.
//!
//! Two read shapes exist. [`Maker`] is the public projection returned by
//! every default path. [`MakerWithSecret`] additionally carries the sealed
//! entropy and is only produced by [`MakerRepository::get_with_secret`].
//! The repository never encrypts or decrypts; callers hand it already
//! sealed entropy.

use chrono::{DateTime, Utc};
use redb::{ReadableDatabase, ReadableTable};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::custody::SealedEntropy;
use crate::storage::database::{next_id, DbError, DbResult, OnboardingDb, MAKERS, MAKER_NAMES};

/// Public maker projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Maker {
    pub id: u64,
    pub name: String,
    /// Legacy-ledger address (base58), the declared payer of co-signed
    /// device transactions.
    pub address: String,
    /// New-ledger address of the same keypair.
    pub solana_address: String,
    pub location_nonce_limit: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Maker plus its sealed signing entropy.
#[derive(Debug, Clone)]
pub struct MakerWithSecret {
    pub maker: Maker,
    pub sealed: SealedEntropy,
}

/// Persisted form.
#[derive(Serialize, Deserialize)]
struct StoredMaker {
    #[serde(flatten)]
    maker: Maker,
    sealed: SealedEntropy,
}

/// Fields of a maker being provisioned.
pub struct NewMaker {
    pub name: String,
    pub address: String,
    pub solana_address: String,
    pub location_nonce_limit: u32,
    pub sealed: SealedEntropy,
}

pub struct MakerRepository<'a> {
    db: &'a OnboardingDb,
}

impl<'a> MakerRepository<'a> {
    pub fn new(db: &'a OnboardingDb) -> Self {
        Self { db }
    }

    /// Insert a maker. Names are unique.
    pub fn create(&self, new: NewMaker) -> DbResult<Maker> {
        let write_txn = self.db.inner().begin_write()?;
        let maker = {
            let mut names = write_txn.open_table(MAKER_NAMES)?;
            if names.get(new.name.as_str())?.is_some() {
                return Err(DbError::Conflict(format!("Maker {}", new.name)));
            }

            let id = next_id(&write_txn, "makers")?;
            let now = Utc::now();
            let stored = StoredMaker {
                maker: Maker {
                    id,
                    name: new.name,
                    address: new.address,
                    solana_address: new.solana_address,
                    location_nonce_limit: new.location_nonce_limit,
                    created_at: now,
                    updated_at: now,
                },
                sealed: new.sealed,
            };
            let json = serde_json::to_vec(&stored)?;

            let mut makers = write_txn.open_table(MAKERS)?;
            makers.insert(id, json.as_slice())?;
            names.insert(stored.maker.name.as_str(), id)?;
            stored.maker
        };
        write_txn.commit()?;
        Ok(maker)
    }

    pub fn get(&self, id: u64) -> DbResult<Option<Maker>> {
        Ok(self.load(id)?.map(|stored| stored.maker))
    }

    /// Explicit secret-bearing read for signing paths.
    pub fn get_with_secret(&self, id: u64) -> DbResult<Option<MakerWithSecret>> {
        Ok(self.load(id)?.map(|stored| MakerWithSecret {
            maker: stored.maker,
            sealed: stored.sealed,
        }))
    }

    pub fn list(&self) -> DbResult<Vec<Maker>> {
        let read_txn = self.db.inner().begin_read()?;
        let table = read_txn.open_table(MAKERS)?;
        let mut makers = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            let stored: StoredMaker = serde_json::from_slice(value.value())?;
            makers.push(stored.maker);
        }
        Ok(makers)
    }

    pub fn update_location_nonce_limit(&self, id: u64, limit: u32) -> DbResult<Maker> {
        let write_txn = self.db.inner().begin_write()?;
        let maker = {
            let mut table = write_txn.open_table(MAKERS)?;
            let existing = {
                let value = table
                    .get(id)?
                    .ok_or_else(|| DbError::NotFound(format!("Maker {id}")))?;
                value.value().to_vec()
            };
            let mut stored: StoredMaker = serde_json::from_slice(&existing)?;
            stored.maker.location_nonce_limit = limit;
            stored.maker.updated_at = Utc::now();

            let json = serde_json::to_vec(&stored)?;
            table.insert(id, json.as_slice())?;
            stored.maker
        };
        write_txn.commit()?;
        Ok(maker)
    }

    fn load(&self, id: u64) -> DbResult<Option<StoredMaker>> {
        let read_txn = self.db.inner().begin_read()?;
        let table = read_txn.open_table(MAKERS)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::database::fixtures::temp_db;

    fn sealed() -> SealedEntropy {
        SealedEntropy {
            ciphertext: vec![9; 72],
            key_version: 3,
        }
    }

    fn new_maker(name: &str) -> NewMaker {
        NewMaker {
            name: name.to_string(),
            address: format!("{name}-address"),
            solana_address: format!("{name}-solana"),
            location_nonce_limit: 2,
            sealed: sealed(),
        }
    }

    #[test]
    fn create_and_read_both_projections() {
        let (db, _dir) = temp_db();
        let repo = MakerRepository::new(&db);

        let maker = repo.create(new_maker("acme")).unwrap();
        assert_eq!(maker.id, 1);
        assert_eq!(repo.get(1).unwrap().unwrap(), maker);

        let with_secret = repo.get_with_secret(1).unwrap().unwrap();
        assert_eq!(with_secret.maker, maker);
        assert_eq!(with_secret.sealed.key_version, 3);
        assert_eq!(with_secret.sealed.ciphertext, vec![9; 72]);
    }

    #[test]
    fn public_projection_serializes_without_secret() {
        let (db, _dir) = temp_db();
        let repo = MakerRepository::new(&db);
        let maker = repo.create(new_maker("acme")).unwrap();

        let json = serde_json::to_value(&maker).unwrap();
        assert!(json.get("sealed").is_none());
        assert!(json.get("ciphertext").is_none());
        assert_eq!(json["locationNonceLimit"], 2);
    }

    #[test]
    fn names_are_unique() {
        let (db, _dir) = temp_db();
        let repo = MakerRepository::new(&db);
        repo.create(new_maker("acme")).unwrap();
        assert!(matches!(repo.create(new_maker("acme")), Err(DbError::Conflict(_))));
        assert_eq!(repo.list().unwrap().len(), 1);
        repo.create(new_maker("other")).unwrap();
    }

    #[test]
    fn nonce_limit_update_keeps_secret() {
        let (db, _dir) = temp_db();
        let repo = MakerRepository::new(&db);
        repo.create(new_maker("acme")).unwrap();

        let updated = repo.update_location_nonce_limit(1, 7).unwrap();
        assert_eq!(updated.location_nonce_limit, 7);
        assert_eq!(repo.get_with_secret(1).unwrap().unwrap().sealed.key_version, 3);
        assert!(matches!(
            repo.update_location_nonce_limit(99, 1),
            Err(DbError::NotFound(_))
        ));
    }

    #[test]
    fn lists_in_id_order() {
        let (db, _dir) = temp_db();
        let repo = MakerRepository::new(&db);
        repo.create(new_maker("a")).unwrap();
        repo.create(new_maker("b")).unwrap();
        let names: Vec<_> = repo.list().unwrap().into_iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}

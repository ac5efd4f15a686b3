// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Hotspot (onboarding record) repository.
//!
//! A record belongs to one maker through `maker_id`. Its `public_address`
//! is written once by [`HotspotRepository::bind`]; after that the record can
//! no longer be updated or deleted.

use chrono::{DateTime, Utc};
use redb::{ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::storage::database::{
    next_id, DbError, DbResult, OnboardingDb, HELIUM_SERIALS, HOTSPOTS, MAC_ETH0, MAC_WLAN0, ONBOARDING_KEYS,
    PUBLIC_ADDRESSES, RPI_SERIALS,
};

type DeviceIndex = TableDefinition<'static, &'static str, u64>;

/// Default and maximum page size for listings.
pub const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Hotspot {
    pub id: u64,
    pub onboarding_key: String,
    pub public_address: Option<String>,
    pub maker_id: u64,
    pub mac_wlan0: Option<String>,
    pub mac_eth0: Option<String>,
    pub rpi_serial: Option<String>,
    pub helium_serial: Option<String>,
    pub batch: Option<String>,
    pub device_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when a maker registers a device.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewHotspot {
    pub onboarding_key: String,
    pub mac_wlan0: Option<String>,
    pub mac_eth0: Option<String>,
    pub rpi_serial: Option<String>,
    pub helium_serial: Option<String>,
    pub batch: Option<String>,
    pub device_type: Option<String>,
}

/// Mutable fields of an unbound record; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HotspotUpdate {
    pub mac_wlan0: Option<String>,
    pub mac_eth0: Option<String>,
    pub rpi_serial: Option<String>,
    pub helium_serial: Option<String>,
    pub batch: Option<String>,
    pub device_type: Option<String>,
}

/// Exact-match search; every present field must match.
#[derive(Debug, Clone, Default, Deserialize, ToSchema, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct HotspotFilter {
    pub onboarding_key: Option<String>,
    pub public_address: Option<String>,
    pub mac_wlan0: Option<String>,
    pub mac_eth0: Option<String>,
    pub rpi_serial: Option<String>,
    pub helium_serial: Option<String>,
    pub batch: Option<String>,
}

impl HotspotFilter {
    fn matches(&self, hotspot: &Hotspot) -> bool {
        fn eq(want: &Option<String>, have: &Option<String>) -> bool {
            want.as_ref().map_or(true, |w| have.as_deref() == Some(w.as_str()))
        }
        self.onboarding_key
            .as_ref()
            .map_or(true, |k| *k == hotspot.onboarding_key)
            && eq(&self.public_address, &hotspot.public_address)
            && eq(&self.mac_wlan0, &hotspot.mac_wlan0)
            && eq(&self.mac_eth0, &hotspot.mac_eth0)
            && eq(&self.rpi_serial, &hotspot.rpi_serial)
            && eq(&self.helium_serial, &hotspot.helium_serial)
            && eq(&self.batch, &hotspot.batch)
    }
}

/// Result of a successful [`HotspotRepository::bind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindOutcome {
    /// The address was written by this call.
    Bound(Hotspot),
    /// The record already carried this exact address.
    Unchanged(Hotspot),
}

impl BindOutcome {
    pub fn into_hotspot(self) -> Hotspot {
        match self {
            BindOutcome::Bound(h) | BindOutcome::Unchanged(h) => h,
        }
    }
}

pub struct HotspotRepository<'a> {
    db: &'a OnboardingDb,
}

impl<'a> HotspotRepository<'a> {
    pub fn new(db: &'a OnboardingDb) -> Self {
        Self { db }
    }

    /// Register a device for `maker_id`. Onboarding keys are unique, as are
    /// the MAC addresses and serial numbers that are present.
    pub fn create(&self, maker_id: u64, new: NewHotspot) -> DbResult<Hotspot> {
        let write_txn = self.db.inner().begin_write()?;
        let hotspot = {
            let mut keys = write_txn.open_table(ONBOARDING_KEYS)?;
            if keys.get(new.onboarding_key.as_str())?.is_some() {
                return Err(DbError::Conflict(format!("Onboarding key {}", new.onboarding_key)));
            }

            let id = next_id(&write_txn, "hotspots")?;
            let now = Utc::now();
            let hotspot = Hotspot {
                id,
                onboarding_key: new.onboarding_key,
                public_address: None,
                maker_id,
                mac_wlan0: new.mac_wlan0,
                mac_eth0: new.mac_eth0,
                rpi_serial: new.rpi_serial,
                helium_serial: new.helium_serial,
                batch: new.batch,
                device_type: new.device_type,
                created_at: now,
                updated_at: now,
            };
            keys.insert(hotspot.onboarding_key.as_str(), id)?;
            claim_device_ids(&write_txn, &hotspot)?;
            put(&write_txn, &hotspot)?;
            hotspot
        };
        write_txn.commit()?;
        Ok(hotspot)
    }

    pub fn get(&self, id: u64) -> DbResult<Option<Hotspot>> {
        let read_txn = self.db.inner().begin_read()?;
        let table = read_txn.open_table(HOTSPOTS)?;
        match table.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Record `id` if it belongs to `maker_id`.
    pub fn get_for_maker(&self, maker_id: u64, id: u64) -> DbResult<Option<Hotspot>> {
        Ok(self.get(id)?.filter(|h| h.maker_id == maker_id))
    }

    /// Look a record up by onboarding key, falling back to its bound
    /// public address.
    pub fn find_by_key_or_address(&self, key: &str) -> DbResult<Option<Hotspot>> {
        let id = {
            let read_txn = self.db.inner().begin_read()?;
            let keys = read_txn.open_table(ONBOARDING_KEYS)?;
            let addresses = read_txn.open_table(PUBLIC_ADDRESSES)?;
            let by_key = keys.get(key)?.map(|v| v.value());
            match by_key {
                Some(id) => Some(id),
                None => addresses.get(key)?.map(|v| v.value()),
            }
        };
        match id {
            Some(id) => self.get(id),
            None => Ok(None),
        }
    }

    pub fn list_for_maker(&self, maker_id: u64, page: usize, page_size: usize) -> DbResult<Vec<Hotspot>> {
        let page_size = page_size.clamp(1, DEFAULT_PAGE_SIZE);
        Ok(self
            .scan(|h| h.maker_id == maker_id)?
            .into_iter()
            .skip(page.saturating_mul(page_size))
            .take(page_size)
            .collect())
    }

    pub fn search(&self, maker_id: u64, filter: &HotspotFilter) -> DbResult<Vec<Hotspot>> {
        self.scan(|h| h.maker_id == maker_id && filter.matches(h))
    }

    /// Change descriptive fields of an unbound record.
    pub fn update(&self, maker_id: u64, id: u64, update: HotspotUpdate) -> DbResult<Hotspot> {
        let write_txn = self.db.inner().begin_write()?;
        let hotspot = {
            let mut hotspot = load_owned(&write_txn, maker_id, id)?;
            if hotspot.public_address.is_some() {
                return Err(DbError::Immutable(format!("Hotspot {id}")));
            }
            let HotspotUpdate {
                mac_wlan0,
                mac_eth0,
                rpi_serial,
                helium_serial,
                batch,
                device_type,
            } = update;
            release_device_ids(&write_txn, &hotspot)?;
            hotspot.mac_wlan0 = mac_wlan0.or(hotspot.mac_wlan0);
            hotspot.mac_eth0 = mac_eth0.or(hotspot.mac_eth0);
            hotspot.rpi_serial = rpi_serial.or(hotspot.rpi_serial);
            hotspot.helium_serial = helium_serial.or(hotspot.helium_serial);
            hotspot.batch = batch.or(hotspot.batch);
            hotspot.device_type = device_type.or(hotspot.device_type);
            hotspot.updated_at = Utc::now();
            claim_device_ids(&write_txn, &hotspot)?;
            put(&write_txn, &hotspot)?;
            hotspot
        };
        write_txn.commit()?;
        Ok(hotspot)
    }

    /// Remove an unbound record.
    pub fn delete(&self, maker_id: u64, id: u64) -> DbResult<Hotspot> {
        let write_txn = self.db.inner().begin_write()?;
        let hotspot = {
            let hotspot = load_owned(&write_txn, maker_id, id)?;
            if hotspot.public_address.is_some() {
                return Err(DbError::Immutable(format!("Hotspot {id}")));
            }
            let mut hotspots = write_txn.open_table(HOTSPOTS)?;
            hotspots.remove(id)?;
            let mut keys = write_txn.open_table(ONBOARDING_KEYS)?;
            keys.remove(hotspot.onboarding_key.as_str())?;
            release_device_ids(&write_txn, &hotspot)?;
            hotspot
        };
        write_txn.commit()?;
        Ok(hotspot)
    }

    /// Write-once binding of `address` to record `id`.
    ///
    /// Runs as a single write transaction: the record's current address and
    /// the address index are checked and updated together. Binding the
    /// address a record already carries succeeds without a write.
    pub fn bind(&self, id: u64, address: &str) -> DbResult<BindOutcome> {
        let write_txn = self.db.inner().begin_write()?;
        let outcome = {
            let mut hotspot = {
                let table = write_txn.open_table(HOTSPOTS)?;
                let value = table
                    .get(id)?
                    .ok_or_else(|| DbError::NotFound(format!("Hotspot {id}")))?;
                serde_json::from_slice::<Hotspot>(value.value())?
            };

            match hotspot.public_address.as_deref() {
                Some(bound) if bound == address => return Ok(BindOutcome::Unchanged(hotspot)),
                Some(bound) => {
                    return Err(DbError::AlreadyBound {
                        bound: bound.to_string(),
                    })
                }
                None => {}
            }

            let mut addresses = write_txn.open_table(PUBLIC_ADDRESSES)?;
            let holder = addresses.get(address)?.map(|v| v.value());
            if holder.is_some_and(|holder| holder != id) {
                return Err(DbError::AddressTaken {
                    address: address.to_string(),
                });
            }
            addresses.insert(address, id)?;

            hotspot.public_address = Some(address.to_string());
            hotspot.updated_at = Utc::now();
            put(&write_txn, &hotspot)?;
            BindOutcome::Bound(hotspot)
        };
        write_txn.commit()?;
        Ok(outcome)
    }

    fn scan(&self, keep: impl Fn(&Hotspot) -> bool) -> DbResult<Vec<Hotspot>> {
        let read_txn = self.db.inner().begin_read()?;
        let table = read_txn.open_table(HOTSPOTS)?;
        let mut out = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            let hotspot: Hotspot = serde_json::from_slice(value.value())?;
            if keep(&hotspot) {
                out.push(hotspot);
            }
        }
        Ok(out)
    }
}

fn put(txn: &WriteTransaction, hotspot: &Hotspot) -> DbResult<()> {
    let json = serde_json::to_vec(hotspot)?;
    let mut table = txn.open_table(HOTSPOTS)?;
    table.insert(hotspot.id, json.as_slice())?;
    Ok(())
}

fn device_ids(hotspot: &Hotspot) -> [(DeviceIndex, &'static str, Option<&str>); 4] {
    [
        (MAC_WLAN0, "MAC wlan0", hotspot.mac_wlan0.as_deref()),
        (MAC_ETH0, "MAC eth0", hotspot.mac_eth0.as_deref()),
        (RPI_SERIALS, "RPi serial", hotspot.rpi_serial.as_deref()),
        (HELIUM_SERIALS, "Helium serial", hotspot.helium_serial.as_deref()),
    ]
}

fn claim_device_ids(txn: &WriteTransaction, hotspot: &Hotspot) -> DbResult<()> {
    for (definition, field, value) in device_ids(hotspot) {
        let Some(value) = value else { continue };
        let mut index = txn.open_table(definition)?;
        let holder = index.get(value)?.map(|v| v.value());
        if holder.is_some_and(|holder| holder != hotspot.id) {
            return Err(DbError::Conflict(format!("{field} {value}")));
        }
        index.insert(value, hotspot.id)?;
    }
    Ok(())
}

fn release_device_ids(txn: &WriteTransaction, hotspot: &Hotspot) -> DbResult<()> {
    for (definition, _, value) in device_ids(hotspot) {
        let Some(value) = value else { continue };
        let mut index = txn.open_table(definition)?;
        let holder = index.get(value)?.map(|v| v.value());
        if holder == Some(hotspot.id) {
            index.remove(value)?;
        }
    }
    Ok(())
}

fn load_owned(txn: &WriteTransaction, maker_id: u64, id: u64) -> DbResult<Hotspot> {
    let table = txn.open_table(HOTSPOTS)?;
    let hotspot: Hotspot = match table.get(id)? {
        Some(value) => serde_json::from_slice(value.value())?,
        None => return Err(DbError::NotFound(format!("Hotspot {id}"))),
    };
    if hotspot.maker_id != maker_id {
        return Err(DbError::NotFound(format!("Hotspot {id}")));
    }
    Ok(hotspot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::database::fixtures::temp_db;

    fn new_hotspot(key: &str) -> NewHotspot {
        NewHotspot {
            onboarding_key: key.to_string(),
            batch: Some("batch-1".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn onboarding_keys_are_unique() {
        let (db, _dir) = temp_db();
        let repo = HotspotRepository::new(&db);
        repo.create(1, new_hotspot("key-a")).unwrap();
        assert!(matches!(
            repo.create(2, new_hotspot("key-a")),
            Err(DbError::Conflict(_))
        ));
    }

    #[test]
    fn bind_is_write_once() {
        let (db, _dir) = temp_db();
        let repo = HotspotRepository::new(&db);
        let h = repo.create(1, new_hotspot("key-a")).unwrap();

        assert!(matches!(repo.bind(h.id, "addr-1").unwrap(), BindOutcome::Bound(_)));
        assert!(matches!(repo.bind(h.id, "addr-1").unwrap(), BindOutcome::Unchanged(_)));
        match repo.bind(h.id, "addr-2") {
            Err(DbError::AlreadyBound { bound }) => assert_eq!(bound, "addr-1"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(repo.get(h.id).unwrap().unwrap().public_address.as_deref(), Some("addr-1"));
    }

    #[test]
    fn address_cannot_bind_two_records() {
        let (db, _dir) = temp_db();
        let repo = HotspotRepository::new(&db);
        let a = repo.create(1, new_hotspot("key-a")).unwrap();
        let b = repo.create(1, new_hotspot("key-b")).unwrap();

        repo.bind(a.id, "addr-1").unwrap();
        assert!(matches!(repo.bind(b.id, "addr-1"), Err(DbError::AddressTaken { .. })));
        assert!(repo.get(b.id).unwrap().unwrap().public_address.is_none());
    }

    #[test]
    fn concurrent_binds_for_same_record_admit_one_address() {
        let (db, _dir) = temp_db();
        let db = std::sync::Arc::new(db);
        let id = HotspotRepository::new(&db).create(1, new_hotspot("key-a")).unwrap().id;

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let db = db.clone();
                std::thread::spawn(move || HotspotRepository::new(&db).bind(id, &format!("addr-{i}")).is_ok())
            })
            .collect();
        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(successes, 1);
    }

    #[test]
    fn lookup_by_key_or_bound_address() {
        let (db, _dir) = temp_db();
        let repo = HotspotRepository::new(&db);
        let h = repo.create(1, new_hotspot("key-a")).unwrap();
        repo.bind(h.id, "addr-1").unwrap();

        assert_eq!(repo.find_by_key_or_address("key-a").unwrap().unwrap().id, h.id);
        assert_eq!(repo.find_by_key_or_address("addr-1").unwrap().unwrap().id, h.id);
        assert!(repo.find_by_key_or_address("nope").unwrap().is_none());
    }

    #[test]
    fn bound_records_are_immutable() {
        let (db, _dir) = temp_db();
        let repo = HotspotRepository::new(&db);
        let h = repo.create(1, new_hotspot("key-a")).unwrap();

        let updated = repo
            .update(1, h.id, HotspotUpdate {
                rpi_serial: Some("serial".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(updated.rpi_serial.as_deref(), Some("serial"));
        assert_eq!(updated.batch.as_deref(), Some("batch-1"));

        repo.bind(h.id, "addr-1").unwrap();
        assert!(matches!(
            repo.update(1, h.id, HotspotUpdate::default()),
            Err(DbError::Immutable(_))
        ));
        assert!(matches!(repo.delete(1, h.id), Err(DbError::Immutable(_))));
    }

    #[test]
    fn delete_frees_onboarding_key() {
        let (db, _dir) = temp_db();
        let repo = HotspotRepository::new(&db);
        let h = repo.create(1, new_hotspot("key-a")).unwrap();

        assert!(matches!(repo.delete(2, h.id), Err(DbError::NotFound(_))));
        repo.delete(1, h.id).unwrap();
        assert!(repo.get(h.id).unwrap().is_none());
        repo.create(1, new_hotspot("key-a")).unwrap();
    }

    #[test]
    fn device_identifiers_are_unique() {
        let (db, _dir) = temp_db();
        let repo = HotspotRepository::new(&db);
        let device = |key: &str| NewHotspot {
            mac_wlan0: Some("aa:bb:cc:dd:ee:01".into()),
            rpi_serial: Some("rpi-1".into()),
            ..new_hotspot(key)
        };
        let first = repo.create(1, device("key-a")).unwrap();

        match repo.create(1, device("key-b")) {
            Err(DbError::Conflict(what)) => assert!(what.contains("aa:bb:cc:dd:ee:01")),
            other => panic!("unexpected {other:?}"),
        }
        // the rejected insert left nothing behind
        assert!(repo.find_by_key_or_address("key-b").unwrap().is_none());

        let second = repo.create(1, new_hotspot("key-b")).unwrap();
        assert!(matches!(
            repo.update(1, second.id, HotspotUpdate {
                rpi_serial: Some("rpi-1".into()),
                ..Default::default()
            }),
            Err(DbError::Conflict(_))
        ));

        // updating a record with its own identifiers is fine
        repo.update(1, first.id, HotspotUpdate {
            rpi_serial: Some("rpi-1".into()),
            ..Default::default()
        })
        .unwrap();

        repo.delete(1, first.id).unwrap();
        repo.create(1, device("key-c")).unwrap();
    }

    #[test]
    fn list_and_search_are_maker_scoped() {
        let (db, _dir) = temp_db();
        let repo = HotspotRepository::new(&db);
        for i in 0..5 {
            repo.create(1, new_hotspot(&format!("m1-{i}"))).unwrap();
        }
        repo.create(2, new_hotspot("m2-0")).unwrap();

        assert_eq!(repo.list_for_maker(1, 0, 100).unwrap().len(), 5);
        let page = repo.list_for_maker(1, 1, 2).unwrap();
        assert_eq!(page.iter().map(|h| h.onboarding_key.as_str()).collect::<Vec<_>>(), vec!["m1-2", "m1-3"]);

        let filter = HotspotFilter {
            onboarding_key: Some("m2-0".into()),
            ..Default::default()
        };
        assert!(repo.search(1, &filter).unwrap().is_empty());
        assert_eq!(repo.search(2, &filter).unwrap().len(), 1);
    }
}

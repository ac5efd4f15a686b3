// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! LRU cache for chain values that never change once observed.
//!
//! Key-to-asset mappings are immutable after minting and rent minimums only
//! depend on account size, so both are safe to keep for the entry TTL.
//! Absence is never cached: a missing key-to-asset account may appear at
//! any moment.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;

use super::types::Pubkey;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum CacheKey {
    Asset(Pubkey),
    Rent(u64),
}

#[derive(Clone, Copy)]
enum CachedValue {
    Asset(Pubkey),
    Lamports(u64),
}

struct CacheEntry {
    value: CachedValue,
    inserted_at: Instant,
}

pub struct AccountCache {
    cache: Mutex<LruCache<CacheKey, CacheEntry>>,
    ttl: Duration,
}

impl AccountCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    /// Asset id recorded for a key-to-asset account.
    pub fn asset(&self, key_to_asset: &Pubkey) -> Option<Pubkey> {
        match self.get(&CacheKey::Asset(*key_to_asset))? {
            CachedValue::Asset(asset) => Some(asset),
            CachedValue::Lamports(_) => None,
        }
    }

    pub fn put_asset(&self, key_to_asset: &Pubkey, asset: Pubkey) {
        self.put(CacheKey::Asset(*key_to_asset), CachedValue::Asset(asset));
    }

    pub fn rent(&self, space: u64) -> Option<u64> {
        match self.get(&CacheKey::Rent(space))? {
            CachedValue::Lamports(lamports) => Some(lamports),
            CachedValue::Asset(_) => None,
        }
    }

    pub fn put_rent(&self, space: u64, lamports: u64) {
        self.put(CacheKey::Rent(space), CachedValue::Lamports(lamports));
    }

    fn get(&self, key: &CacheKey) -> Option<CachedValue> {
        let mut cache = self.cache.lock().ok()?;
        if let Some(entry) = cache.get(key) {
            if entry.inserted_at.elapsed() < self.ttl {
                return Some(entry.value);
            }
            cache.pop(key);
        }
        None
    }

    fn put(&self, key: CacheKey, value: CachedValue) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(
                key,
                CacheEntry {
                    value,
                    inserted_at: Instant::now(),
                },
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stores_assets_and_rent_separately() {
        let cache = AccountCache::new(8, Duration::from_secs(60));
        let key = Pubkey::new([1; 32]);
        cache.put_asset(&key, Pubkey::new([2; 32]));
        cache.put_rent(0, 890_880);

        assert_eq!(cache.asset(&key), Some(Pubkey::new([2; 32])));
        assert_eq!(cache.rent(0), Some(890_880));
        assert_eq!(cache.rent(1), None);
    }

    #[test]
    fn expired_entries_are_dropped() {
        let cache = AccountCache::new(8, Duration::from_millis(0));
        let key = Pubkey::new([1; 32]);
        cache.put_asset(&key, Pubkey::new([2; 32]));
        assert_eq!(cache.asset(&key), None);
    }

    #[test]
    fn evicts_least_recently_used() {
        let cache = AccountCache::new(1, Duration::from_secs(60));
        cache.put_rent(1, 10);
        cache.put_rent(2, 20);
        assert_eq!(cache.rent(1), None);
        assert_eq!(cache.rent(2), Some(20));
    }
}

//! Seqlock-guarded biome id cache.
//!
//! Readers never block: they read the stripe version, probe the slot table
//! with relaxed atomic loads and accept the result only if the version is
//! unchanged and even. Writers take the stripe's `try_lock`, bump the version
//! to odd, mutate, and bump it back to even. A writer that cannot get the lock
//! gives up and the caller computes the value uncached.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering, fence};
use std::sync::{Mutex, MutexGuard, TryLockError};

use strata_world::CellKey;

pub type BiomeId = u32;

/// Biome lookups are cached on a 4-block grid.
pub const BIOME_QUANT_SHIFT: u32 = 2;

const STRIPES: usize = 64;
const OCCUPIED: u64 = 1 << 32;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BiomeCacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Lookups that recomputed without storing because a writer held the stripe.
    pub uncached: u64,
    pub evictions: u64,
    pub entries: usize,
}

struct Slot {
    key: AtomicU64,
    /// `OCCUPIED | id`, or 0 when empty.
    value: AtomicU64,
}

enum Probe {
    Hit(BiomeId),
    Miss,
    Contended,
}

/// Writer-only bookkeeping; holding the guard is the exclusive section.
struct WriterState {
    order: VecDeque<u64>,
}

struct Stripe {
    version: AtomicU64,
    slots: Box<[Slot]>,
    mask: usize,
    capacity: usize,
    /// Mirrors `order.len()` so counting never takes the writer lock.
    entries: AtomicUsize,
    writer: Mutex<WriterState>,
}

#[inline]
fn spread(key: u64) -> u64 {
    let mut x = key ^ (key >> 33);
    x = x.wrapping_mul(0xff51_afd7_ed55_8ccd);
    x ^= x >> 33;
    x = x.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    x ^ (x >> 33)
}

impl Stripe {
    fn new(capacity: usize) -> Self {
        let table = (capacity * 2).next_power_of_two().max(4);
        Self {
            version: AtomicU64::new(0),
            slots: (0..table)
                .map(|_| Slot {
                    key: AtomicU64::new(0),
                    value: AtomicU64::new(0),
                })
                .collect(),
            mask: table - 1,
            capacity,
            entries: AtomicUsize::new(0),
            writer: Mutex::new(WriterState {
                order: VecDeque::with_capacity(capacity),
            }),
        }
    }

    #[inline]
    fn home(&self, key: u64) -> usize {
        (spread(key) as usize) & self.mask
    }

    /// Probe without synchronization; callers validate or hold the writer lock.
    fn probe(&self, key: u64) -> Option<BiomeId> {
        let mut i = self.home(key);
        for _ in 0..self.slots.len() {
            let value = self.slots[i].value.load(Ordering::Relaxed);
            if value == 0 {
                return None;
            }
            if self.slots[i].key.load(Ordering::Relaxed) == key {
                return Some(value as u32);
            }
            i = (i + 1) & self.mask;
        }
        None
    }

    fn optimistic_read(&self, key: u64) -> Probe {
        let v1 = self.version.load(Ordering::Acquire);
        if v1 & 1 == 1 {
            return Probe::Contended;
        }
        let found = self.probe(key);
        fence(Ordering::Acquire);
        let v2 = self.version.load(Ordering::Relaxed);
        if v1 != v2 {
            return Probe::Contended;
        }
        match found {
            Some(id) => Probe::Hit(id),
            None => Probe::Miss,
        }
    }

    fn try_write(&self) -> Option<MutexGuard<'_, WriterState>> {
        match self.writer.try_lock() {
            Ok(guard) => Some(guard),
            Err(TryLockError::Poisoned(p)) => Some(p.into_inner()),
            Err(TryLockError::WouldBlock) => None,
        }
    }

    /// Stores `key -> id`; returns how many entries were evicted. The caller
    /// must hold the writer guard.
    fn store_locked(&self, state: &mut WriterState, key: u64, id: BiomeId) -> u64 {
        let v = self.version.load(Ordering::Relaxed);
        self.version.store(v.wrapping_add(1), Ordering::Relaxed);
        fence(Ordering::Release);

        let mut evicted = 0;
        if !self.overwrite(key, id) {
            while state.order.len() >= self.capacity {
                let Some(old) = state.order.pop_front() else {
                    break;
                };
                if self.remove(old) {
                    evicted += 1;
                }
            }
            self.insert_new(key, id);
            state.order.push_back(key);
            self.entries.store(state.order.len(), Ordering::Relaxed);
        }

        self.version.store(v.wrapping_add(2), Ordering::Release);
        evicted
    }

    fn overwrite(&self, key: u64, id: BiomeId) -> bool {
        let mut i = self.home(key);
        for _ in 0..self.slots.len() {
            let value = self.slots[i].value.load(Ordering::Relaxed);
            if value == 0 {
                return false;
            }
            if self.slots[i].key.load(Ordering::Relaxed) == key {
                self.slots[i]
                    .value
                    .store(OCCUPIED | u64::from(id), Ordering::Relaxed);
                return true;
            }
            i = (i + 1) & self.mask;
        }
        false
    }

    fn insert_new(&self, key: u64, id: BiomeId) {
        let mut i = self.home(key);
        for _ in 0..self.slots.len() {
            if self.slots[i].value.load(Ordering::Relaxed) == 0 {
                self.slots[i].key.store(key, Ordering::Relaxed);
                self.slots[i]
                    .value
                    .store(OCCUPIED | u64::from(id), Ordering::Relaxed);
                return;
            }
            i = (i + 1) & self.mask;
        }
    }

    /// Linear-probing delete with backward shift, so no tombstones are needed.
    fn remove(&self, key: u64) -> bool {
        let mut i = self.home(key);
        let mut found = false;
        for _ in 0..self.slots.len() {
            if self.slots[i].value.load(Ordering::Relaxed) == 0 {
                break;
            }
            if self.slots[i].key.load(Ordering::Relaxed) == key {
                found = true;
                break;
            }
            i = (i + 1) & self.mask;
        }
        if !found {
            return false;
        }
        self.slots[i].value.store(0, Ordering::Relaxed);
        let mut hole = i;
        let mut j = i;
        loop {
            j = (j + 1) & self.mask;
            let value = self.slots[j].value.load(Ordering::Relaxed);
            if value == 0 {
                break;
            }
            let k = self.slots[j].key.load(Ordering::Relaxed);
            let home = self.home(k);
            // distance from home must not grow past the hole
            let dist_j = j.wrapping_sub(home) & self.mask;
            let dist_hole = hole.wrapping_sub(home) & self.mask;
            if dist_hole < dist_j {
                self.slots[hole].key.store(k, Ordering::Relaxed);
                self.slots[hole].value.store(value, Ordering::Relaxed);
                self.slots[j].value.store(0, Ordering::Relaxed);
                hole = j;
            }
        }
        true
    }

    fn clear_locked(&self, state: &mut WriterState) -> u64 {
        let v = self.version.load(Ordering::Relaxed);
        self.version.store(v.wrapping_add(1), Ordering::Relaxed);
        fence(Ordering::Release);
        for slot in self.slots.iter() {
            slot.value.store(0, Ordering::Relaxed);
        }
        let n = state.order.len() as u64;
        state.order.clear();
        self.entries.store(0, Ordering::Relaxed);
        self.version.store(v.wrapping_add(2), Ordering::Release);
        n
    }
}

pub struct BiomeCache {
    stripes: Box<[Stripe]>,
    hits: AtomicU64,
    misses: AtomicU64,
    uncached: AtomicU64,
    evictions: AtomicU64,
}

impl BiomeCache {
    pub fn new(capacity: usize) -> Self {
        let per_stripe = capacity.max(1).div_ceil(STRIPES);
        Self {
            stripes: (0..STRIPES).map(|_| Stripe::new(per_stripe)).collect(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            uncached: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    #[inline]
    fn key(biome_x: i32, biome_z: i32) -> u64 {
        CellKey::pack(biome_x, biome_z).raw()
    }

    #[inline]
    fn stripe(&self, key: u64) -> &Stripe {
        &self.stripes[(spread(key) >> 58) as usize % STRIPES]
    }

    pub fn capacity(&self) -> usize {
        self.stripes.iter().map(|s| s.capacity).sum()
    }

    /// Biome at block `(block_x, block_z)`. Only positions on the 4-block grid
    /// go through the cache; every other position calls `load` directly.
    pub fn try_get_biome<C, F>(&self, ctx: &C, block_x: i32, block_z: i32, load: F) -> BiomeId
    where
        C: ?Sized,
        F: FnOnce(&C, i32, i32) -> BiomeId,
    {
        let mask = (1 << BIOME_QUANT_SHIFT) - 1;
        if block_x & mask != 0 || block_z & mask != 0 {
            return load(ctx, block_x, block_z);
        }
        self.get_noise_biome(
            ctx,
            block_x >> BIOME_QUANT_SHIFT,
            block_z >> BIOME_QUANT_SHIFT,
            |c, bx, bz| load(c, bx << BIOME_QUANT_SHIFT, bz << BIOME_QUANT_SHIFT),
        )
    }

    /// Biome at quantized `(biome_x, biome_z)`, computed by `load` on a miss.
    /// Never blocks: if the stripe's writer is busy the value is computed and
    /// returned without being stored.
    pub fn get_noise_biome<C, F>(&self, ctx: &C, biome_x: i32, biome_z: i32, load: F) -> BiomeId
    where
        C: ?Sized,
        F: FnOnce(&C, i32, i32) -> BiomeId,
    {
        let key = Self::key(biome_x, biome_z);
        let stripe = self.stripe(key);
        for _ in 0..2 {
            match stripe.optimistic_read(key) {
                Probe::Hit(id) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return id;
                }
                Probe::Miss => break,
                Probe::Contended => continue,
            }
        }

        let Some(mut state) = stripe.try_write() else {
            self.uncached.fetch_add(1, Ordering::Relaxed);
            return load(ctx, biome_x, biome_z);
        };
        if let Some(id) = stripe.probe(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return id;
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        // a panicking loader leaves the version even and the key absent
        let id = load(ctx, biome_x, biome_z);
        let evicted = stripe.store_locked(&mut state, key, id);
        drop(state);
        if evicted > 0 {
            self.evictions.fetch_add(evicted, Ordering::Relaxed);
        }
        id
    }

    /// Best-effort store at block coordinates; ignored off the 4-block grid.
    pub fn try_store_biome(&self, block_x: i32, block_z: i32, id: BiomeId) -> bool {
        let mask = (1 << BIOME_QUANT_SHIFT) - 1;
        if block_x & mask != 0 || block_z & mask != 0 {
            return false;
        }
        self.try_store_noise_biome(
            block_x >> BIOME_QUANT_SHIFT,
            block_z >> BIOME_QUANT_SHIFT,
            id,
        )
    }

    /// Stores unconditionally if the stripe's writer is free; returns whether
    /// the value was stored.
    pub fn try_store_noise_biome(&self, biome_x: i32, biome_z: i32, id: BiomeId) -> bool {
        let key = Self::key(biome_x, biome_z);
        let stripe = self.stripe(key);
        let Some(mut state) = stripe.try_write() else {
            return false;
        };
        let evicted = stripe.store_locked(&mut state, key, id);
        drop(state);
        if evicted > 0 {
            self.evictions.fetch_add(evicted, Ordering::Relaxed);
        }
        true
    }

    /// Cached id for `(biome_x, biome_z)` without computing.
    pub fn peek(&self, biome_x: i32, biome_z: i32) -> Option<BiomeId> {
        let key = Self::key(biome_x, biome_z);
        match self.stripe(key).optimistic_read(key) {
            Probe::Hit(id) => Some(id),
            Probe::Miss | Probe::Contended => None,
        }
    }

    /// Approximate while writers are active; never waits on a stripe.
    pub fn len(&self) -> usize {
        self.stripes
            .iter()
            .map(|s| s.entries.load(Ordering::Relaxed))
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Empties every stripe, waiting for each stripe's writer in turn.
    pub fn clear(&self) {
        let mut removed = 0;
        for stripe in self.stripes.iter() {
            let mut state = match stripe.writer.lock() {
                Ok(state) => state,
                Err(p) => p.into_inner(),
            };
            removed += stripe.clear_locked(&mut state);
        }
        if removed > 0 {
            self.evictions.fetch_add(removed, Ordering::Relaxed);
        }
    }

    pub fn stats(&self) -> BiomeCacheStats {
        BiomeCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            uncached: self.uncached.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(_: &(), x: i32, z: i32) -> BiomeId {
        (x.wrapping_mul(31) ^ z.wrapping_mul(17)) as u32 & 0xFFFF
    }

    #[test]
    fn miss_then_hit() {
        let cache = BiomeCache::new(256);
        assert_eq!(cache.get_noise_biome(&(), 3, -4, classify), classify(&(), 3, -4));
        assert_eq!(
            cache.get_noise_biome(&(), 3, -4, |_: &(), _, _| panic!("cached")),
            classify(&(), 3, -4)
        );
        let s = cache.stats();
        assert_eq!((s.hits, s.misses, s.entries), (1, 1, 1));
    }

    #[test]
    fn off_grid_positions_bypass_the_cache() {
        let cache = BiomeCache::new(256);
        let mut calls = 0;
        for _ in 0..3 {
            cache.try_get_biome(&(), 5, 8, |_: &(), x, z| {
                calls += 1;
                classify(&(), x, z)
            });
        }
        assert_eq!(calls, 3);
        assert!(cache.is_empty());
        // on-grid block positions hand block coordinates to the loader
        let id = cache.try_get_biome(&(), -8, 12, |_: &(), x, z| {
            assert_eq!((x, z), (-8, 12));
            7
        });
        assert_eq!(id, 7);
        assert_eq!(cache.peek(-2, 3), Some(7));
    }

    #[test]
    fn fifo_eviction_keeps_entries_bounded() {
        let cache = BiomeCache::new(STRIPES * 2);
        for i in 0..2000 {
            cache.get_noise_biome(&(), i, i / 3, classify);
        }
        assert!(cache.len() <= cache.capacity());
        assert!(cache.stats().evictions > 0);
        // survivors still map to their own keys
        for i in 0..2000 {
            if let Some(id) = cache.peek(i, i / 3) {
                assert_eq!(id, classify(&(), i, i / 3));
            }
        }
    }

    #[test]
    fn backward_shift_keeps_colliding_keys_reachable() {
        let stripe = Stripe::new(16);
        let mut state = stripe.writer.lock().unwrap();
        let keys: Vec<u64> = (0..16u64).map(|i| i * 977).collect();
        for &k in &keys {
            stripe.store_locked(&mut state, k, k as u32);
        }
        for &k in keys.iter().step_by(3) {
            assert!(stripe.remove(k));
        }
        for (i, &k) in keys.iter().enumerate() {
            let expect = (i % 3 != 0).then_some(k as u32);
            assert_eq!(stripe.probe(k), expect);
        }
    }

    #[test]
    fn stores_are_skipped_while_a_writer_holds_the_stripe() {
        let cache = BiomeCache::new(64);
        let key = BiomeCache::key(1, 1);
        let stripe = cache.stripe(key);
        let guard = stripe.writer.lock().unwrap();
        assert!(!cache.try_store_noise_biome(1, 1, 9));
        assert_eq!(cache.get_noise_biome(&(), 1, 1, |_: &(), _, _| 4), 4);
        assert_eq!(cache.stats().uncached, 1);
        drop(guard);
        assert!(cache.try_store_noise_biome(1, 1, 9));
        assert_eq!(cache.peek(1, 1), Some(9));
        assert!(!cache.try_store_biome(1, 0, 3));
    }

    #[test]
    fn counting_does_not_wait_on_writers() {
        let cache = BiomeCache::new(256);
        cache.get_noise_biome(&(), 0, 0, classify);
        // the loader runs inside the stripe's exclusive section
        let id = cache.get_noise_biome(&(), 2, 5, |_: &(), _, _| {
            let s = cache.stats();
            assert_eq!((s.entries, s.misses), (1, 2));
            11
        });
        assert_eq!(id, 11);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn clear_empties() {
        let cache = BiomeCache::new(STRIPES * 128);
        for i in 0..100 {
            cache.try_store_noise_biome(i, -i, i as u32);
        }
        assert_eq!(cache.len(), 100);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.peek(5, -5), None);
    }
}

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::lattice::CellKey;
use crate::mesh::Mesh;

const SHARD_COUNT: usize = 16;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MeshCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
}

#[derive(Default)]
struct Shard {
    entries: HashMap<CellKey, Arc<Mesh>>,
    order: VecDeque<CellKey>,
}

/// Bounded, lossy map of computed meshes. Entries may be evicted at any time;
/// callers must only store pure functions of the key.
pub struct MeshCache {
    shards: Box<[RwLock<Shard>]>,
    shard_capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl MeshCache {
    pub fn new(capacity: usize) -> Self {
        let shard_capacity = capacity.max(1).div_ceil(SHARD_COUNT);
        Self {
            shards: (0..SHARD_COUNT)
                .map(|_| RwLock::new(Shard::default()))
                .collect(),
            shard_capacity,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    #[inline]
    fn shard(&self, key: CellKey) -> &RwLock<Shard> {
        let raw = key.raw();
        let h = (raw ^ (raw >> 29)).wrapping_mul(0x9E37_79B9_7F4A_7C15);
        &self.shards[(h >> 60) as usize % SHARD_COUNT]
    }

    pub fn get(&self, key: CellKey) -> Option<Arc<Mesh>> {
        let found = self
            .shard(key)
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .get(&key)
            .cloned();
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    /// Returns the cached mesh for `key`, computing it outside any lock on a
    /// miss. When two threads race on the same key the first insert wins and
    /// both receive that instance.
    pub fn get_or_compute<F>(&self, key: CellKey, compute: F) -> Arc<Mesh>
    where
        F: FnOnce() -> Mesh,
    {
        if let Some(mesh) = self.get(key) {
            return mesh;
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        let computed = Arc::new(compute());

        let mut shard = self
            .shard(key)
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = shard.entries.get(&key) {
            return Arc::clone(existing);
        }
        shard.entries.insert(key, Arc::clone(&computed));
        shard.order.push_back(key);
        let mut evicted = 0u64;
        while shard.order.len() > self.shard_capacity {
            if let Some(old) = shard.order.pop_front() {
                if shard.entries.remove(&old).is_some() {
                    evicted += 1;
                }
            }
        }
        drop(shard);
        if evicted > 0 {
            self.evictions.fetch_add(evicted, Ordering::Relaxed);
            log::trace!("mesh cache evicted {} entries", evicted);
        }
        computed
    }

    pub fn snapshot(&self) -> MeshCacheStats {
        MeshCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|s| s.read().map(|s| s.entries.len()).unwrap_or(0))
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.shard_capacity * SHARD_COUNT
    }

    pub fn invalidate_all(&self) {
        let mut evicted = 0u64;
        for shard in self.shards.iter() {
            let mut shard = shard.write().unwrap_or_else(PoisonError::into_inner);
            evicted += shard.entries.len() as u64;
            shard.entries.clear();
            shard.order.clear();
        }
        if evicted > 0 {
            self.evictions.fetch_add(evicted, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::Lattice;
    use crate::worldgen::RiverParams;

    fn make(key: CellKey) -> Mesh {
        Mesh::new(&Lattice::new(5, 0.7, 0.35), &RiverParams::default(), key)
    }

    #[test]
    fn second_lookup_hits() {
        let cache = MeshCache::new(64);
        let key = CellKey::pack(2, -3);
        let a = cache.get_or_compute(key, || make(key));
        let b = cache.get_or_compute(key, || panic!("should hit"));
        assert!(Arc::ptr_eq(&a, &b));
        let stats = cache.snapshot();
        assert_eq!((stats.hits, stats.misses, stats.entries), (1, 1, 1));
    }

    #[test]
    fn capacity_bounds_entries_and_eviction_is_lossless() {
        let cache = MeshCache::new(16);
        let mut first = Vec::new();
        for i in 0..200 {
            let key = CellKey::pack(i, i * 7);
            first.push(cache.get_or_compute(key, || make(key)));
        }
        assert!(cache.len() <= cache.capacity());
        assert!(cache.snapshot().evictions > 0);
        for (i, mesh) in first.iter().enumerate() {
            let key = CellKey::pack(i as i32, i as i32 * 7);
            let again = cache.get_or_compute(key, || make(key));
            assert_eq!(**mesh, *again);
        }
    }

    #[test]
    fn racing_misses_share_the_first_insert() {
        use std::sync::Barrier;
        use std::thread;

        let cache = MeshCache::new(64);
        let key = CellKey::pack(-4, 9);
        // both threads miss and compute before either inserts
        let computing = Barrier::new(2);
        let meshes: Vec<Arc<Mesh>> = thread::scope(|s| {
            let handles: Vec<_> = (0..2)
                .map(|_| {
                    s.spawn(|| {
                        cache.get_or_compute(key, || {
                            computing.wait();
                            make(key)
                        })
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(Arc::ptr_eq(&meshes[0], &meshes[1]));
        assert!(Arc::ptr_eq(&meshes[0], &cache.get(key).unwrap()));
        assert_eq!(cache.snapshot().misses, 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn invalidate_all_empties() {
        let cache = MeshCache::new(64);
        for i in 0..10 {
            let key = CellKey::pack(i, 0);
            cache.get_or_compute(key, || make(key));
        }
        cache.invalidate_all();
        assert!(cache.is_empty());
        assert_eq!(cache.snapshot().evictions, 10);
    }
}

use std::any::Any;
use std::collections::VecDeque;
use std::ops::Deref;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError, RwLock};

use hashbrown::HashMap;
use rayon::ThreadPool;
use strata_world::{
    CHUNK_SIZE, ChunkCoord, ColumnSample, GenError, RegionCoord, RegionSource, TerrainClass,
    TerrainTile,
};

use crate::gen_ctx_pool::GenCtxPool;

const SHARD_COUNT: usize = 16;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TileCacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Requests that joined a generation already in flight.
    pub collapsed: u64,
    pub generations: u64,
    pub failures: u64,
    pub evictions: u64,
    pub entries: usize,
}

enum SlotState {
    Pending,
    Ready(Arc<TerrainTile>),
    Failed(GenError),
}

/// One region's entry: pending until its single generation task completes.
struct TileSlot {
    region: RegionCoord,
    state: Mutex<SlotState>,
    done: Condvar,
    leases: AtomicUsize,
}

impl TileSlot {
    fn new(region: RegionCoord) -> Self {
        Self {
            region,
            state: Mutex::new(SlotState::Pending),
            done: Condvar::new(),
            leases: AtomicUsize::new(0),
        }
    }

    fn complete(&self, result: Result<Arc<TerrainTile>, GenError>) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        *state = match result {
            Ok(tile) => SlotState::Ready(tile),
            Err(e) => SlotState::Failed(e),
        };
        drop(state);
        self.done.notify_all();
    }

    fn wait(&self) -> Result<Arc<TerrainTile>, GenError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            match &*state {
                SlotState::Pending => {
                    state = self
                        .done
                        .wait(state)
                        .unwrap_or_else(PoisonError::into_inner);
                }
                SlotState::Ready(tile) => return Ok(Arc::clone(tile)),
                SlotState::Failed(e) => return Err(e.clone()),
            }
        }
    }

    fn is_ready(&self) -> bool {
        matches!(
            *self.state.lock().unwrap_or_else(PoisonError::into_inner),
            SlotState::Ready(_)
        )
    }

    fn evictable(&self) -> bool {
        self.leases.load(Ordering::Acquire) == 0 && self.is_ready()
    }
}

#[derive(Default)]
struct Shard {
    slots: HashMap<RegionCoord, Arc<TileSlot>>,
    /// Completed regions in completion order.
    order: VecDeque<RegionCoord>,
}

struct Inner {
    source: Arc<dyn RegionSource>,
    ctx_pool: Arc<GenCtxPool>,
    shards: Box<[RwLock<Shard>]>,
    shard_capacity: usize,
    queued: AtomicUsize,
    inflight: AtomicUsize,
    hits: AtomicU64,
    misses: AtomicU64,
    collapsed: AtomicU64,
    generations: AtomicU64,
    failures: AtomicU64,
    evictions: AtomicU64,
}

/// Region tile cache with at most one generation in flight per region.
///
/// A generation task must not request its own region from this cache; the
/// waiter would be the task itself.
#[derive(Clone)]
pub struct TileCache {
    inner: Arc<Inner>,
    pool: Arc<ThreadPool>,
}

enum Lookup {
    Hit(Arc<TileSlot>),
    Joined(Arc<TileSlot>),
    Created(Arc<TileSlot>),
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

impl Inner {
    #[inline]
    fn shard(&self, region: RegionCoord) -> &RwLock<Shard> {
        let h = ((region.rx as u32 as u64) << 32 | region.rz as u32 as u64)
            .wrapping_mul(0x9E37_79B9_7F4A_7C15);
        &self.shards[(h >> 60) as usize % SHARD_COUNT]
    }

    /// Finds or creates the slot for `region`. With `lease` set the slot is
    /// leased before the shard lock is released, so eviction cannot slip in
    /// between lookup and use.
    fn lookup(&self, region: RegionCoord, lease: bool) -> Lookup {
        let shard = self.shard(region);
        {
            let guard = shard.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(slot) = guard.slots.get(&region) {
                if lease {
                    slot.leases.fetch_add(1, Ordering::AcqRel);
                }
                return self.classify(Arc::clone(slot));
            }
        }
        let mut guard = shard.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = guard.slots.get(&region) {
            if lease {
                slot.leases.fetch_add(1, Ordering::AcqRel);
            }
            return self.classify(Arc::clone(slot));
        }
        let slot = Arc::new(TileSlot::new(region));
        if lease {
            slot.leases.fetch_add(1, Ordering::AcqRel);
        }
        guard.slots.insert(region, Arc::clone(&slot));
        drop(guard);
        self.misses.fetch_add(1, Ordering::Relaxed);
        Lookup::Created(slot)
    }

    fn classify(&self, slot: Arc<TileSlot>) -> Lookup {
        if slot.is_ready() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            Lookup::Hit(slot)
        } else {
            self.collapsed.fetch_add(1, Ordering::Relaxed);
            Lookup::Joined(slot)
        }
    }

    fn run(&self, slot: &TileSlot) {
        let region = slot.region;
        self.inflight.fetch_add(1, Ordering::Relaxed);
        let result = catch_unwind(AssertUnwindSafe(|| {
            let mut ctx = self.ctx_pool.acquire(self.source.as_ref());
            self.source.generate(region, &mut ctx)
        }))
        .unwrap_or_else(|payload| Err(GenError::panicked(region, panic_message(&*payload))));
        self.inflight.fetch_sub(1, Ordering::Relaxed);

        match result {
            Ok(tile) => {
                self.generations.fetch_add(1, Ordering::Relaxed);
                slot.complete(Ok(Arc::new(tile)));
                self.admit(region);
            }
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                log::warn!("{e}; evicting so the next request retries");
                // evict before waking waiters so a retry creates a fresh slot
                self.forget(region, slot);
                slot.complete(Err(e));
            }
        }
    }

    fn forget(&self, region: RegionCoord, slot: &TileSlot) {
        let mut guard = self
            .shard(region)
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if guard
            .slots
            .get(&region)
            .is_some_and(|s| std::ptr::eq(Arc::as_ptr(s), slot))
        {
            guard.slots.remove(&region);
        }
    }

    /// Records a completed region and evicts the oldest unleased ones over
    /// capacity.
    fn admit(&self, region: RegionCoord) {
        let mut guard = self
            .shard(region)
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        guard.order.push_back(region);
        let mut evicted = 0u64;
        while guard.order.len() > self.shard_capacity {
            let victim = guard.order.iter().position(|r| {
                guard
                    .slots
                    .get(r)
                    .is_none_or(|slot| slot.evictable())
            });
            let Some(pos) = victim else {
                break;
            };
            if let Some(r) = guard.order.remove(pos) {
                if guard.slots.remove(&r).is_some() {
                    evicted += 1;
                }
            }
        }
        drop(guard);
        if evicted > 0 {
            self.evictions.fetch_add(evicted, Ordering::Relaxed);
            log::trace!("tile cache evicted {} regions", evicted);
        }
    }
}

impl TileCache {
    pub fn new(
        source: Arc<dyn RegionSource>,
        capacity: usize,
        pool: Arc<ThreadPool>,
        ctx_pool: Arc<GenCtxPool>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                ctx_pool,
                shards: (0..SHARD_COUNT)
                    .map(|_| RwLock::new(Shard::default()))
                    .collect(),
                shard_capacity: capacity.max(1).div_ceil(SHARD_COUNT),
                queued: AtomicUsize::new(0),
                inflight: AtomicUsize::new(0),
                hits: AtomicU64::new(0),
                misses: AtomicU64::new(0),
                collapsed: AtomicU64::new(0),
                generations: AtomicU64::new(0),
                failures: AtomicU64::new(0),
                evictions: AtomicU64::new(0),
            }),
            pool,
        }
    }

    #[inline]
    pub fn region_chunks(&self) -> i32 {
        self.inner.source.region_chunks()
    }

    pub fn capacity(&self) -> usize {
        self.inner.shard_capacity * SHARD_COUNT
    }

    /// Schedules generation of `region` on the worker pool unless it is
    /// already cached or in flight. Never blocks.
    pub fn queue_region(&self, region: RegionCoord) {
        let Lookup::Created(slot) = self.inner.lookup(region, false) else {
            return;
        };
        let inner = Arc::clone(&self.inner);
        inner.queued.fetch_add(1, Ordering::Relaxed);
        self.pool.spawn(move || {
            inner.queued.fetch_sub(1, Ordering::Relaxed);
            inner.run(&slot);
        });
    }

    /// Returns a leased handle to the region's tile, generating it on the
    /// calling thread if nobody else is. Blocks while another thread is
    /// generating it.
    pub fn get_tile(&self, region: RegionCoord) -> Result<TileHandle, GenError> {
        let lease = match self.inner.lookup(region, true) {
            Lookup::Hit(slot) | Lookup::Joined(slot) => Lease(slot),
            Lookup::Created(slot) => {
                let lease = Lease(slot);
                self.inner.run(&lease.0);
                lease
            }
        };
        let tile = lease.0.wait()?;
        Ok(TileHandle { lease, tile })
    }

    /// Chunk-sized view into the tile of the region owning chunk `(cx, cz)`.
    pub fn get_chunk(&self, cx: i32, cz: i32) -> Result<ChunkView, GenError> {
        let coord = ChunkCoord::new(cx, cz);
        let (region, lx, lz) = coord.to_region(self.region_chunks());
        let tile = self.get_tile(region)?;
        Ok(ChunkView {
            coord,
            x0: lx * CHUNK_SIZE,
            z0: lz * CHUNK_SIZE,
            tile,
        })
    }

    /// Whether a completed tile for `region` is cached.
    pub fn contains(&self, region: RegionCoord) -> bool {
        self.inner
            .shard(region)
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .slots
            .get(&region)
            .is_some_and(|s| s.is_ready())
    }

    /// Drops every completed, unleased tile. Pending and leased entries stay.
    pub fn invalidate_all(&self) {
        let mut evicted = 0u64;
        for shard in self.inner.shards.iter() {
            let mut guard = shard.write().unwrap_or_else(PoisonError::into_inner);
            let Shard { slots, order } = &mut *guard;
            slots.retain(|_, slot| {
                let keep = !slot.evictable();
                if !keep {
                    evicted += 1;
                }
                keep
            });
            order.retain(|r| slots.contains_key(r));
        }
        if evicted > 0 {
            self.inner.evictions.fetch_add(evicted, Ordering::Relaxed);
        }
        log::debug!("tile cache invalidated {} regions", evicted);
    }

    pub fn len(&self) -> usize {
        self.inner
            .shards
            .iter()
            .map(|s| s.read().map(|s| s.slots.len()).unwrap_or(0))
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(queued, in_flight)` generation tasks.
    pub fn queue_counts(&self) -> (usize, usize) {
        (
            self.inner.queued.load(Ordering::Relaxed),
            self.inner.inflight.load(Ordering::Relaxed),
        )
    }

    pub fn stats(&self) -> TileCacheStats {
        let i = &self.inner;
        TileCacheStats {
            hits: i.hits.load(Ordering::Relaxed),
            misses: i.misses.load(Ordering::Relaxed),
            collapsed: i.collapsed.load(Ordering::Relaxed),
            generations: i.generations.load(Ordering::Relaxed),
            failures: i.failures.load(Ordering::Relaxed),
            evictions: i.evictions.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}

/// One counted lease on a slot, released on drop.
struct Lease(Arc<TileSlot>);

impl Clone for Lease {
    fn clone(&self) -> Self {
        self.0.leases.fetch_add(1, Ordering::AcqRel);
        Lease(Arc::clone(&self.0))
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.0.leases.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Scoped access to a completed tile. While any handle is alive the tile is
/// not evicted; dropping the last one makes it eligible again.
#[derive(Clone)]
pub struct TileHandle {
    lease: Lease,
    tile: Arc<TerrainTile>,
}

impl TileHandle {
    #[inline]
    pub fn tile(&self) -> &Arc<TerrainTile> {
        &self.tile
    }

    #[inline]
    pub fn region(&self) -> RegionCoord {
        self.lease.0.region
    }
}

impl Deref for TileHandle {
    type Target = TerrainTile;

    fn deref(&self) -> &Self::Target {
        &self.tile
    }
}

/// `CHUNK_SIZE`² window of a leased tile, addressed in chunk-local columns.
pub struct ChunkView {
    coord: ChunkCoord,
    x0: usize,
    z0: usize,
    tile: TileHandle,
}

impl ChunkView {
    #[inline]
    pub fn coord(&self) -> ChunkCoord {
        self.coord
    }

    #[inline]
    pub fn handle(&self) -> &TileHandle {
        &self.tile
    }

    #[inline]
    fn local(&self, x: usize, z: usize) -> Option<(usize, usize)> {
        (x < CHUNK_SIZE && z < CHUNK_SIZE).then_some((self.x0 + x, self.z0 + z))
    }

    pub fn column(&self, x: usize, z: usize) -> Option<ColumnSample> {
        let (tx, tz) = self.local(x, z)?;
        self.tile.column(tx, tz)
    }

    pub fn height(&self, x: usize, z: usize) -> Option<i32> {
        let (tx, tz) = self.local(x, z)?;
        self.tile.height(tx, tz)
    }

    pub fn edge(&self, x: usize, z: usize) -> Option<f32> {
        let (tx, tz) = self.local(x, z)?;
        self.tile.edge(tx, tz)
    }

    pub fn river(&self, x: usize, z: usize) -> Option<f32> {
        let (tx, tz) = self.local(x, z)?;
        self.tile.river(tx, tz)
    }

    pub fn terrain(&self, x: usize, z: usize) -> Option<TerrainClass> {
        let (tx, tz) = self.local(x, z)?;
        self.tile.terrain(tx, tz)
    }

    /// World block coordinate of column `(0, 0)`.
    pub fn block_origin(&self) -> (i32, i32) {
        let s = CHUNK_SIZE as i32;
        (self.coord.cx.wrapping_mul(s), self.coord.cz.wrapping_mul(s))
    }
}

//! Region tile scheduling, biome caching and worker orchestration.
#![forbid(unsafe_code)]

mod biome_cache;
mod gen_ctx_pool;
mod tile_cache;

use std::sync::Arc;
use std::thread;

use rayon::{ThreadPoolBuildError, ThreadPoolBuilder};
use strata_world::{GenError, RegionCoord, RegionSource, World, WorldGenParams};
use thiserror::Error;

pub use biome_cache::{BIOME_QUANT_SHIFT, BiomeCache, BiomeCacheStats, BiomeId};
pub use gen_ctx_pool::{GenCtxPool, PooledGenCtx};
pub use tile_cache::{ChunkView, TileCache, TileCacheStats, TileHandle};

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] ThreadPoolBuildError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// 0 picks available parallelism.
    pub threads: usize,
    pub tile_capacity: usize,
    pub biome_capacity: usize,
}

impl RuntimeConfig {
    pub fn from_params(params: &WorldGenParams) -> Self {
        Self {
            threads: params.threads,
            tile_capacity: params.tile_capacity,
            biome_capacity: params.biome_capacity,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueCounts {
    pub queued: usize,
    pub inflight: usize,
}

pub struct Runtime {
    tiles: TileCache,
    biomes: BiomeCache,
    ctx_pool: Arc<GenCtxPool>,
    workers: usize,
}

impl Runtime {
    pub fn new(source: Arc<dyn RegionSource>, cfg: RuntimeConfig) -> Result<Self, RuntimeError> {
        let workers = if cfg.threads == 0 {
            thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(8)
        } else {
            cfg.threads
        };
        let pool = Arc::new(
            ThreadPoolBuilder::new()
                .num_threads(workers)
                .thread_name(|i| format!("strata-gen-{i}"))
                .build()?,
        );
        // callers of get_tile generate inline too, so leave headroom over the workers
        let ctx_pool = GenCtxPool::with_capacity_from_workers(workers);
        let tiles = TileCache::new(
            source,
            cfg.tile_capacity,
            pool,
            Arc::clone(&ctx_pool),
        );
        log::info!(
            "runtime: {} workers, tile capacity {}, biome capacity {}",
            workers,
            tiles.capacity(),
            cfg.biome_capacity
        );
        Ok(Self {
            tiles,
            biomes: BiomeCache::new(cfg.biome_capacity),
            ctx_pool,
            workers,
        })
    }

    pub fn from_world(world: Arc<World>) -> Result<Self, RuntimeError> {
        let cfg = RuntimeConfig::from_params(world.params());
        Self::new(world, cfg)
    }

    #[inline]
    pub fn workers(&self) -> usize {
        self.workers
    }

    #[inline]
    pub fn tiles(&self) -> &TileCache {
        &self.tiles
    }

    #[inline]
    pub fn biomes(&self) -> &BiomeCache {
        &self.biomes
    }

    pub fn queue_region(&self, rx: i32, rz: i32) {
        self.tiles.queue_region(RegionCoord::new(rx, rz));
    }

    pub fn get_tile(&self, rx: i32, rz: i32) -> Result<TileHandle, GenError> {
        self.tiles.get_tile(RegionCoord::new(rx, rz))
    }

    pub fn get_chunk(&self, cx: i32, cz: i32) -> Result<ChunkView, GenError> {
        self.tiles.get_chunk(cx, cz)
    }

    pub fn queue_counts(&self) -> QueueCounts {
        let (queued, inflight) = self.tiles.queue_counts();
        QueueCounts { queued, inflight }
    }

    /// `(allocated, idle)` worker contexts.
    pub fn ctx_counts(&self) -> (usize, usize) {
        (self.ctx_pool.allocated(), self.ctx_pool.idle())
    }
}

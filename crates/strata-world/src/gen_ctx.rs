use std::sync::Arc;

use crate::continent::EdgeScratch;
use crate::tile::ColumnSample;
use crate::worldgen::WorldGenParams;

/// Per-worker generation state. Reused across tiles; never shared.
pub struct GenCtx {
    pub params: Arc<WorldGenParams>,
    pub edge_scratch: EdgeScratch,
    pub columns: Vec<ColumnSample>,
    pub stats: GenStats,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GenStats {
    pub tiles: u64,
    pub columns: u64,
    pub land_columns: u64,
    pub river_columns: u64,
}

impl GenCtx {
    pub fn new(params: Arc<WorldGenParams>) -> Self {
        Self {
            params,
            edge_scratch: EdgeScratch::default(),
            columns: Vec::new(),
            stats: GenStats::default(),
        }
    }

    /// Clears per-tile buffers, keeping their allocation.
    pub fn reset_columns(&mut self, capacity: usize) {
        self.columns.clear();
        self.columns.reserve(capacity);
    }
}

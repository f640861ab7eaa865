use std::sync::Arc;

use strata_geom::Vec2;

use crate::lattice::{CellKey, Lattice};
use crate::mesh::Mesh;
use crate::mesh_cache::{MeshCache, MeshCacheStats};
use crate::noise::{NoiseSampler, salt};
use crate::worldgen::{ContinentParams, RiverParams};

const EDGE_SPAN: i32 = 2;
const EDGE_CELLS: usize = ((2 * EDGE_SPAN + 1) * (2 * EDGE_SPAN + 1)) as usize;

/// Per-call neighbor buffers for `edge_value_with`; keep one per worker.
#[derive(Clone, Debug, Default)]
pub struct EdgeScratch {
    dist: [f32; EDGE_CELLS],
    density: [u8; EDGE_CELLS],
}

/// Continent/ocean field over lattice space (one unit per lattice cell).
pub struct ContinentGenerator {
    lattice: Lattice,
    params: ContinentParams,
    rivers: RiverParams,
    noise: Arc<dyn NoiseSampler>,
    meshes: MeshCache,
}

impl ContinentGenerator {
    pub fn new(
        seed: i64,
        params: ContinentParams,
        rivers: RiverParams,
        noise: Arc<dyn NoiseSampler>,
        mesh_capacity: usize,
    ) -> Self {
        Self {
            lattice: Lattice::new(seed, params.jitter, params.threshold),
            params,
            rivers,
            noise,
            meshes: MeshCache::new(mesh_capacity),
        }
    }

    #[inline]
    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    #[inline]
    pub fn params(&self) -> &ContinentParams {
        &self.params
    }

    #[inline]
    pub fn river_params(&self) -> &RiverParams {
        &self.rivers
    }

    fn falloff_at(&self, x: f32, y: f32) -> f32 {
        let f = self.params.falloff_frequency;
        let n = self
            .noise
            .sample(self.lattice.seed ^ salt::FALLOFF, x * f, y * f);
        let n01 = ((n + 1.0) * 0.5).clamp(0.0, 1.0);
        self.params.falloff + self.params.falloff_variation * n01
    }

    pub fn edge_value(&self, x: f32, y: f32) -> f32 {
        let mut scratch = EdgeScratch::default();
        self.edge_value_with(x, y, &mut scratch)
    }

    /// Smoothed land fraction in `[0, 1]` at `(x, y)`. Every cell of the 5×5
    /// neighborhood contributes its density with a weight falling linearly
    /// from 1 at distance 0 to 0 at the blend radius.
    pub fn edge_value_with(&self, x: f32, y: f32, scratch: &mut EdgeScratch) -> f32 {
        let bx = x.floor() as i32;
        let by = y.floor() as i32;
        let mut min0 = f32::MAX;
        let mut min1 = f32::MAX;
        let mut nearest_density = 0u8;
        let mut i = 0;
        for dy in -EDGE_SPAN..=EDGE_SPAN {
            for dx in -EDGE_SPAN..=EDGE_SPAN {
                let cell = self.lattice.cell(bx.wrapping_add(dx), by.wrapping_add(dy));
                let d = cell.dist_sq(x, y).sqrt();
                scratch.dist[i] = d;
                scratch.density[i] = cell.density;
                if d < min0 {
                    min1 = min0;
                    min0 = d;
                    nearest_density = cell.density;
                } else if d < min1 {
                    min1 = d;
                }
                i += 1;
            }
        }

        let radius = (min0 + min1) * 0.5 * self.falloff_at(x, y);
        if !(radius > 0.0) || !radius.is_finite() {
            return f32::from(nearest_density);
        }
        let mut weight_sum = 0.0f32;
        let mut value = 0.0f32;
        for k in 0..EDGE_CELLS {
            let w = 1.0 - scratch.dist[k] / radius;
            if w > 0.0 {
                weight_sum += w;
                value += w * f32::from(scratch.density[k]);
            }
        }
        if weight_sum <= f32::EPSILON {
            return f32::from(nearest_density);
        }
        (value / weight_sum).clamp(0.0, 1.0)
    }

    /// Nearest lattice point in the 3×3 neighborhood, or `None` when it is sea.
    /// Ties keep the first cell in row-major scan order.
    pub fn nearest(&self, x: f32, y: f32) -> Option<CellKey> {
        let bx = x.floor() as i32;
        let by = y.floor() as i32;
        let mut best = None;
        let mut best_d = f32::MAX;
        for dy in -1..=1 {
            for dx in -1..=1 {
                let cell = self.lattice.cell(bx.wrapping_add(dx), by.wrapping_add(dy));
                let d = cell.dist_sq(x, y);
                if d < best_d {
                    best_d = d;
                    best = Some(cell);
                }
            }
        }
        best.filter(|c| c.is_land()).map(|c| c.key())
    }

    /// Normalized banded distance to the nearest river of the owning land
    /// cell; 1 means no river influence.
    pub fn river_value(&self, x: f32, y: f32) -> f32 {
        let Some(key) = self.nearest(x, y) else {
            return 1.0;
        };
        self.mesh(key).river_value(Vec2::new(x, y), &self.rivers)
    }

    pub fn mesh(&self, key: CellKey) -> Arc<Mesh> {
        self.meshes.get_or_compute(key, || self.compute_mesh(key))
    }

    pub fn compute_mesh(&self, key: CellKey) -> Mesh {
        Mesh::new(&self.lattice, &self.rivers, key)
    }

    pub fn mesh_cache_stats(&self) -> MeshCacheStats {
        self.meshes.snapshot()
    }

    pub fn clear_mesh_cache(&self) {
        self.meshes.invalidate_all();
    }
}

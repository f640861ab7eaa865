use std::sync::Arc;
use std::time::Instant;

use crate::continent::ContinentGenerator;
use crate::error::GenError;
use crate::gen_ctx::GenCtx;
use crate::noise::{FastNoiseSampler, NoiseSampler, salt};
use crate::region::RegionCoord;
use crate::tile::{ColumnSample, TerrainClass, TerrainTile};
use crate::worldgen::WorldGenParams;

/// Turns a region coordinate into a finished tile. Implementations must be
/// pure in `region` for a fixed configuration.
pub trait RegionSource: Send + Sync {
    fn make_gen_ctx(&self) -> GenCtx;
    fn region_chunks(&self) -> i32;
    fn generate(&self, region: RegionCoord, ctx: &mut GenCtx) -> Result<TerrainTile, GenError>;
}

pub struct World {
    params: Arc<WorldGenParams>,
    noise: Arc<dyn NoiseSampler>,
    continent: ContinentGenerator,
}

impl World {
    pub fn new(params: WorldGenParams) -> Self {
        let noise: Arc<dyn NoiseSampler> = Arc::new(FastNoiseSampler::new(params.height_noise));
        Self::with_noise(params, noise)
    }

    pub fn with_noise(params: WorldGenParams, noise: Arc<dyn NoiseSampler>) -> Self {
        let continent = ContinentGenerator::new(
            params.seed,
            params.continent,
            params.rivers,
            Arc::clone(&noise),
            params.mesh_capacity,
        );
        Self {
            params: Arc::new(params),
            noise,
            continent,
        }
    }

    #[inline]
    pub fn params(&self) -> &Arc<WorldGenParams> {
        &self.params
    }

    #[inline]
    pub fn continent(&self) -> &ContinentGenerator {
        &self.continent
    }

    #[inline]
    pub fn seed(&self) -> i64 {
        self.params.seed
    }

    /// Block coordinates to lattice coordinates, after domain warp.
    pub fn to_lattice(&self, wx: i32, wz: i32) -> (f32, f32) {
        let c = &self.params.continent;
        let (fx, fz) = (wx as f32, wz as f32);
        let (qx, qz) = (fx * c.warp_frequency, fz * c.warp_frequency);
        let ox = self.noise.sample(self.seed() ^ salt::WARP_X, qx, qz);
        let oz = self.noise.sample(self.seed() ^ salt::WARP_Y, qx, qz);
        (
            (fx + ox * c.warp_strength) / c.scale,
            (fz + oz * c.warp_strength) / c.scale,
        )
    }

    /// Samples a single column; `None` if any noise input was not finite.
    pub fn sample_column(&self, wx: i32, wz: i32, ctx: &mut GenCtx) -> Option<ColumnSample> {
        let p = &*self.params;
        let (lx, lz) = self.to_lattice(wx, wz);
        if !lx.is_finite() || !lz.is_finite() {
            return None;
        }
        let edge = self
            .continent
            .edge_value_with(lx, lz, &mut ctx.edge_scratch);
        let river = self.continent.river_value(lx, lz);
        let f = p.height_frequency;
        let detail = self
            .noise
            .sample(self.seed() ^ salt::HEIGHT, wx as f32 * f, wz as f32 * f);
        if !edge.is_finite() || !river.is_finite() || !detail.is_finite() {
            return None;
        }

        let sea = p.sea_level as f32;
        let mut h = sea + (edge - 0.5) * 2.0 * p.continent_amplitude;
        h += detail * p.detail_amplitude * edge;
        let in_river = river < 1.0 && h > sea;
        if in_river {
            // deepest at the segment, fading out at the band edge
            h = (h - p.river_depth * (1.0 - river)).max(sea - 1.0);
        }
        let height = h.round() as i32;
        let terrain = if in_river {
            TerrainClass::River
        } else if height < p.sea_level {
            TerrainClass::Ocean
        } else if height <= p.sea_level + p.beach_height {
            TerrainClass::Beach
        } else if height >= p.mountain_level {
            TerrainClass::Mountain
        } else {
            TerrainClass::Land
        };
        Some(ColumnSample {
            height,
            edge,
            river,
            terrain,
        })
    }

    pub fn generate_region(
        &self,
        region: RegionCoord,
        ctx: &mut GenCtx,
    ) -> Result<TerrainTile, GenError> {
        let t0 = Instant::now();
        let size = self.params.region_size();
        let origin = region.block_origin(self.params.region_chunks);
        ctx.reset_columns(size * size);
        for dz in 0..size as i32 {
            for dx in 0..size as i32 {
                let (wx, wz) = (origin.0.wrapping_add(dx), origin.1.wrapping_add(dz));
                let Some(col) = self.sample_column(wx, wz, ctx) else {
                    return Err(GenError::NonFinite {
                        rx: region.rx,
                        rz: region.rz,
                        wx,
                        wz,
                    });
                };
                ctx.columns.push(col);
            }
        }

        let stats = &mut ctx.stats;
        stats.tiles += 1;
        stats.columns += ctx.columns.len() as u64;
        for c in &ctx.columns {
            match c.terrain {
                TerrainClass::River => {
                    stats.river_columns += 1;
                    stats.land_columns += 1;
                }
                TerrainClass::Ocean => {}
                _ => stats.land_columns += 1,
            }
        }
        let compute_time_us = t0.elapsed().as_micros().min(u32::MAX as u128) as u32;
        log::debug!(
            target: "perf",
            "region ({}, {}) generated {} columns in {}us",
            region.rx,
            region.rz,
            ctx.columns.len(),
            compute_time_us
        );
        Ok(TerrainTile::from_columns(
            region,
            size,
            origin,
            &ctx.columns,
            compute_time_us,
        ))
    }
}

impl RegionSource for World {
    fn make_gen_ctx(&self) -> GenCtx {
        GenCtx::new(Arc::clone(&self.params))
    }

    fn region_chunks(&self) -> i32 {
        self.params.region_chunks
    }

    fn generate(&self, region: RegionCoord, ctx: &mut GenCtx) -> Result<TerrainTile, GenError> {
        self.generate_region(region, ctx)
    }
}

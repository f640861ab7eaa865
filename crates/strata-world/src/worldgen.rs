use serde::Deserialize;
use std::error::Error;
use std::fs;
use std::path::Path;

use crate::noise::NoiseKind;

#[derive(Clone, Debug, Deserialize)]
pub struct WorldGenConfig {
    #[serde(default = "default_seed")]
    pub seed: i64,
    #[serde(default)]
    pub continent: Continent,
    #[serde(default)]
    pub rivers: Rivers,
    #[serde(default)]
    pub height: Height,
    #[serde(default)]
    pub region: Region,
    #[serde(default)]
    pub cache: Cache,
    #[serde(default)]
    pub runtime: RuntimeCfg,
}

fn default_seed() -> i64 {
    42
}

impl Default for WorldGenConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            continent: Continent::default(),
            rivers: Rivers::default(),
            height: Height::default(),
            region: Region::default(),
            cache: Cache::default(),
            runtime: RuntimeCfg::default(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Continent {
    /// Blocks per lattice cell.
    #[serde(default = "default_continent_scale")]
    pub scale: f32,
    #[serde(default = "default_jitter")]
    pub jitter: f32,
    #[serde(default = "default_threshold")]
    pub threshold: f32,
    #[serde(default = "default_falloff")]
    pub falloff: f32,
    #[serde(default = "default_falloff_variation")]
    pub falloff_variation: f32,
    #[serde(default = "default_falloff_frequency")]
    pub falloff_frequency: f32,
    /// Domain warp applied before lattice lookup, in blocks.
    #[serde(default = "default_warp_strength")]
    pub warp_strength: f32,
    #[serde(default = "default_warp_frequency")]
    pub warp_frequency: f32,
}
fn default_continent_scale() -> f32 {
    1024.0
}
fn default_jitter() -> f32 {
    0.7
}
fn default_threshold() -> f32 {
    0.35
}
fn default_falloff() -> f32 {
    1.25
}
fn default_falloff_variation() -> f32 {
    0.5
}
fn default_falloff_frequency() -> f32 {
    0.75
}
fn default_warp_strength() -> f32 {
    96.0
}
fn default_warp_frequency() -> f32 {
    0.004
}
impl Default for Continent {
    fn default() -> Self {
        Self {
            scale: default_continent_scale(),
            jitter: default_jitter(),
            threshold: default_threshold(),
            falloff: default_falloff(),
            falloff_variation: default_falloff_variation(),
            falloff_frequency: default_falloff_frequency(),
            warp_strength: default_warp_strength(),
            warp_frequency: default_warp_frequency(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Rivers {
    #[serde(default = "default_segments_min")]
    pub segments_min: f32,
    #[serde(default = "default_segments_range")]
    pub segments_range: f32,
    /// Multiplier on edge length (lattice units) when deriving a segment count.
    #[serde(default = "default_segments_per_unit")]
    pub segments_per_unit: f32,
    /// Segment length in lattice units.
    #[serde(default = "default_river_length")]
    pub length: f32,
    #[serde(default = "default_width_source")]
    pub width_source: f32,
    #[serde(default = "default_width_mouth")]
    pub width_mouth: f32,
}
fn default_segments_min() -> f32 {
    2.0
}
fn default_segments_range() -> f32 {
    2.0
}
fn default_segments_per_unit() -> f32 {
    1.5
}
fn default_river_length() -> f32 {
    0.3
}
fn default_width_source() -> f32 {
    0.02
}
fn default_width_mouth() -> f32 {
    0.008
}
impl Default for Rivers {
    fn default() -> Self {
        Self {
            segments_min: default_segments_min(),
            segments_range: default_segments_range(),
            segments_per_unit: default_segments_per_unit(),
            length: default_river_length(),
            width_source: default_width_source(),
            width_mouth: default_width_mouth(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Height {
    #[serde(default)]
    pub noise: NoiseKind,
    #[serde(default = "default_height_freq")]
    pub frequency: f32,
    #[serde(default = "default_sea_level")]
    pub sea_level: i32,
    #[serde(default = "default_continent_amplitude")]
    pub continent_amplitude: f32,
    #[serde(default = "default_detail_amplitude")]
    pub detail_amplitude: f32,
    #[serde(default = "default_river_depth")]
    pub river_depth: f32,
    #[serde(default = "default_beach_height")]
    pub beach_height: i32,
    #[serde(default = "default_mountain_level")]
    pub mountain_level: i32,
}
fn default_height_freq() -> f32 {
    0.01
}
fn default_sea_level() -> i32 {
    64
}
fn default_continent_amplitude() -> f32 {
    40.0
}
fn default_detail_amplitude() -> f32 {
    24.0
}
fn default_river_depth() -> f32 {
    6.0
}
fn default_beach_height() -> i32 {
    2
}
fn default_mountain_level() -> i32 {
    110
}
impl Default for Height {
    fn default() -> Self {
        Self {
            noise: NoiseKind::default(),
            frequency: default_height_freq(),
            sea_level: default_sea_level(),
            continent_amplitude: default_continent_amplitude(),
            detail_amplitude: default_detail_amplitude(),
            river_depth: default_river_depth(),
            beach_height: default_beach_height(),
            mountain_level: default_mountain_level(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Region {
    /// Chunks per region side.
    #[serde(default = "default_region_chunks")]
    pub chunks: i32,
    /// Completed tiles kept before FIFO eviction of unleased entries.
    #[serde(default = "default_tile_capacity")]
    pub cache_capacity: usize,
}
fn default_region_chunks() -> i32 {
    8
}
fn default_tile_capacity() -> usize {
    64
}
impl Default for Region {
    fn default() -> Self {
        Self {
            chunks: default_region_chunks(),
            cache_capacity: default_tile_capacity(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Cache {
    #[serde(default = "default_mesh_capacity")]
    pub mesh_capacity: usize,
    #[serde(default = "default_biome_capacity")]
    pub biome_capacity: usize,
}
fn default_mesh_capacity() -> usize {
    4096
}
fn default_biome_capacity() -> usize {
    8192
}
impl Default for Cache {
    fn default() -> Self {
        Self {
            mesh_capacity: default_mesh_capacity(),
            biome_capacity: default_biome_capacity(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RuntimeCfg {
    /// Worker threads for tile generation; 0 picks available parallelism.
    #[serde(default)]
    pub threads: usize,
}

/// Lattice and blending parameters for the continent field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContinentParams {
    pub scale: f32,
    pub jitter: f32,
    pub threshold: f32,
    pub falloff: f32,
    pub falloff_variation: f32,
    pub falloff_frequency: f32,
    pub warp_strength: f32,
    pub warp_frequency: f32,
}

/// River placement and band widths, in lattice units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RiverParams {
    pub segments_min: f32,
    pub segments_range: f32,
    pub segments_per_unit: f32,
    pub length: f32,
    pub width_source: f32,
    pub width_mouth: f32,
}

impl Default for ContinentParams {
    fn default() -> Self {
        WorldGenParams::default().continent
    }
}

impl Default for RiverParams {
    fn default() -> Self {
        WorldGenParams::default().rivers
    }
}

// Flattened params used in tight loops (snapshot of config)
#[derive(Clone, Debug)]
pub struct WorldGenParams {
    pub seed: i64,
    pub continent: ContinentParams,
    pub rivers: RiverParams,
    pub height_noise: NoiseKind,
    pub height_frequency: f32,
    pub sea_level: i32,
    pub continent_amplitude: f32,
    pub detail_amplitude: f32,
    pub river_depth: f32,
    pub beach_height: i32,
    pub mountain_level: i32,
    pub region_chunks: i32,
    pub tile_capacity: usize,
    pub mesh_capacity: usize,
    pub biome_capacity: usize,
    pub threads: usize,
}

impl Default for WorldGenParams {
    fn default() -> Self {
        Self::from_config(&WorldGenConfig::default())
    }
}

impl WorldGenParams {
    pub fn from_config(cfg: &WorldGenConfig) -> Self {
        let c = &cfg.continent;
        let r = &cfg.rivers;
        let h = &cfg.height;
        Self {
            seed: cfg.seed,
            continent: ContinentParams {
                scale: c.scale.max(1.0),
                jitter: c.jitter.clamp(0.0, 1.0),
                threshold: c.threshold,
                falloff: c.falloff.max(1.0),
                falloff_variation: c.falloff_variation.max(0.0),
                falloff_frequency: c.falloff_frequency,
                warp_strength: c.warp_strength,
                warp_frequency: c.warp_frequency,
            },
            rivers: RiverParams {
                segments_min: r.segments_min.max(0.0),
                segments_range: r.segments_range.max(0.0),
                segments_per_unit: r.segments_per_unit.max(0.0),
                length: r.length.max(0.0),
                width_source: r.width_source.max(0.0),
                width_mouth: r.width_mouth.max(0.0),
            },
            height_noise: h.noise,
            height_frequency: h.frequency,
            sea_level: h.sea_level,
            continent_amplitude: h.continent_amplitude,
            detail_amplitude: h.detail_amplitude,
            river_depth: h.river_depth,
            beach_height: h.beach_height,
            mountain_level: h.mountain_level,
            region_chunks: cfg.region.chunks.max(1),
            tile_capacity: cfg.region.cache_capacity.max(1),
            mesh_capacity: cfg.cache.mesh_capacity.max(1),
            biome_capacity: cfg.cache.biome_capacity.max(1),
            threads: cfg.runtime.threads,
        }
    }

    #[inline]
    pub fn region_size(&self) -> usize {
        self.region_chunks as usize * crate::CHUNK_SIZE
    }
}

pub fn parse_params(s: &str) -> Result<WorldGenParams, Box<dyn Error>> {
    let cfg: WorldGenConfig = toml::from_str(s)?;
    Ok(WorldGenParams::from_config(&cfg))
}

pub fn load_params_from_path(path: &Path) -> Result<WorldGenParams, Box<dyn Error>> {
    let s = fs::read_to_string(path)?;
    parse_params(&s)
}

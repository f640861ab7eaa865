//! Continent lattice, coastline meshes, rivers, and region tile generation.
#![forbid(unsafe_code)]

pub const CHUNK_SIZE: usize = 16;

pub mod continent;
pub mod error;
pub mod gen_ctx;
pub mod lattice;
pub mod mesh;
pub mod mesh_cache;
pub mod noise;
pub mod region;
pub mod river;
pub mod tile;
pub mod world;
pub mod worldgen;

pub use continent::{ContinentGenerator, EdgeScratch};
pub use error::GenError;
pub use gen_ctx::{GenCtx, GenStats};
pub use lattice::{CellKey, Lattice, LatticeCell};
pub use mesh::Mesh;
pub use mesh_cache::{MeshCache, MeshCacheStats};
pub use noise::{FastNoiseSampler, NoiseKind, NoiseSampler};
pub use region::{ChunkCoord, RegionCoord, chunk_to_region};
pub use tile::{ColumnSample, TerrainClass, TerrainTile};
pub use world::{RegionSource, World};
pub use worldgen::{ContinentParams, RiverParams, WorldGenConfig, WorldGenParams};

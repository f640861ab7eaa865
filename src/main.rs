use std::error::Error;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use simplelog::{
    ColorChoice, CombinedLogger, Config, LevelFilter, TermLogger, TerminalMode, WriteLogger,
};
use strata_runtime::{BiomeId, ChunkView, Runtime};
use strata_world::worldgen::load_params_from_path;
use strata_world::{CHUNK_SIZE, ChunkCoord, TerrainClass, World, WorldGenParams};

#[derive(Parser, Debug)]
#[command(name = "strata")]
#[command(about = "Generate continent terrain around a chunk and report cache behaviour")]
struct Args {
    /// Worldgen TOML; built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured seed
    #[arg(short, long)]
    seed: Option<i64>,

    /// Override the configured worker count (0 = available parallelism)
    #[arg(short, long)]
    threads: Option<usize>,

    /// Center chunk X
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    cx: i32,

    /// Center chunk Z
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    cz: i32,

    /// Radius in chunks around the center
    #[arg(short, long, default_value = "4")]
    radius: i32,

    /// Print one character per chunk showing its center column's terrain
    #[arg(long)]
    map: bool,

    /// Also write debug logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn init_logging(log_file: Option<&PathBuf>) -> Result<(), Box<dyn Error>> {
    match log_file {
        Some(path) => {
            CombinedLogger::init(vec![
                TermLogger::new(
                    LevelFilter::Info,
                    Config::default(),
                    TerminalMode::Mixed,
                    ColorChoice::Auto,
                ),
                WriteLogger::new(LevelFilter::Debug, Config::default(), File::create(path)?),
            ])?;
        }
        None => {
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
                .init();
        }
    }
    Ok(())
}

fn class_glyph(class: TerrainClass) -> char {
    match class {
        TerrainClass::Ocean => '~',
        TerrainClass::Beach => '.',
        TerrainClass::Land => '#',
        TerrainClass::River => '=',
        TerrainClass::Mountain => '^',
    }
}

/// Demonstration classifier: terrain class in the high bits, a 16-block
/// height band in the low ones.
fn demo_biome(view: &ChunkView, wx: i32, wz: i32) -> BiomeId {
    let (ox, oz) = view.block_origin();
    let (x, z) = ((wx - ox) as usize, (wz - oz) as usize);
    match view.column(x, z) {
        Some(c) => ((c.terrain as u32) << 8) | (c.height.clamp(0, 255 * 16) / 16) as u32,
        None => 0,
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_logging(args.log_file.as_ref())?;

    let mut params = match &args.config {
        Some(path) => load_params_from_path(path)?,
        None => WorldGenParams::default(),
    };
    if let Some(seed) = args.seed {
        params.seed = seed;
    }
    if let Some(threads) = args.threads {
        params.threads = threads;
    }
    log::info!(
        "seed {} scale {} jitter {} threshold {} region {} chunks",
        params.seed,
        params.continent.scale,
        params.continent.jitter,
        params.continent.threshold,
        params.region_chunks
    );

    let world = Arc::new(World::new(params));
    let rt = Runtime::from_world(Arc::clone(&world))?;
    let radius = args.radius.max(0);
    let center = ChunkCoord::new(args.cx, args.cz);
    let region_chunks = rt.tiles().region_chunks();

    let t0 = Instant::now();
    let (lo, _, _) = center.offset(-radius, -radius).to_region(region_chunks);
    let (hi, _, _) = center.offset(radius, radius).to_region(region_chunks);
    for rz in lo.rz..=hi.rz {
        for rx in lo.rx..=hi.rx {
            rt.queue_region(rx, rz);
        }
    }
    let q = rt.queue_counts();
    log::debug!("queued {} regions, {} in flight", q.queued, q.inflight);

    let mut counts = [0usize; TerrainClass::ALL.len()];
    let mut rows = Vec::new();
    let mut failed = 0usize;
    for dz in -radius..=radius {
        let mut row = String::new();
        for dx in -radius..=radius {
            let chunk = center.offset(dx, dz);
            let view = match rt.get_chunk(chunk.cx, chunk.cz) {
                Ok(view) => view,
                Err(e) => {
                    log::error!("chunk ({}, {}): {e}", chunk.cx, chunk.cz);
                    failed += 1;
                    row.push('?');
                    continue;
                }
            };
            let (ox, oz) = view.block_origin();
            for z in 0..CHUNK_SIZE {
                for x in 0..CHUNK_SIZE {
                    if let Some(class) = view.terrain(x, z) {
                        counts[class as usize] += 1;
                    }
                    let (wx, wz) = (ox + x as i32, oz + z as i32);
                    rt.biomes().try_get_biome(&view, wx, wz, demo_biome);
                }
            }
            let mid = CHUNK_SIZE / 2;
            row.push(view.terrain(mid, mid).map_or('?', class_glyph));
        }
        rows.push(row);
    }
    log::info!(
        target: "perf",
        "{} chunks in {:.1}ms",
        (2 * radius + 1).pow(2),
        t0.elapsed().as_secs_f64() * 1000.0
    );

    if args.map {
        for row in &rows {
            println!("{row}");
        }
    }
    let total: usize = counts.iter().sum();
    for class in TerrainClass::ALL {
        let n = counts[class as usize];
        let pct = if total == 0 {
            0.0
        } else {
            n as f64 * 100.0 / total as f64
        };
        println!("{:<9} {:>8} {:>6.2}%", class.label(), n, pct);
    }

    let tiles = rt.tiles().stats();
    let biomes = rt.biomes().stats();
    let meshes = world.continent().mesh_cache_stats();
    log::info!(
        "tiles: {} generated, {} hits, {} collapsed, {} failed, {} evicted, {} cached",
        tiles.generations,
        tiles.hits,
        tiles.collapsed,
        tiles.failures,
        tiles.evictions,
        tiles.entries
    );
    log::info!(
        "biomes: {} hits, {} misses, {} uncached, {} evicted, {} cached",
        biomes.hits,
        biomes.misses,
        biomes.uncached,
        biomes.evictions,
        biomes.entries
    );
    log::info!(
        "meshes: {} hits, {} misses, {} evicted, {} cached",
        meshes.hits,
        meshes.misses,
        meshes.evictions,
        meshes.entries
    );
    let (allocated, idle) = rt.ctx_counts();
    log::debug!("gen contexts: {allocated} allocated, {idle} idle");

    if failed > 0 {
        return Err(format!("{failed} chunks failed to generate").into());
    }
    Ok(())
}

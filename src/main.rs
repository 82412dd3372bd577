//! # Sparse Voxel Grid Demo
//!
//! Builds a grid from an optional JSON config, fills it with Perlin terrain,
//! writes it to disk, reads it back and checks the copy.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=debug cargo run --release -- [config.json] [output.svxg]
//! ```

use std::error::Error;
use std::fs::File;
use std::io::{BufReader, BufWriter};

use cgmath::Point3;
use log::{info, warn};
use web_time::Instant;

use sparse_voxel_grid::voxels::generation::{fill_perlin, fill_random};
use sparse_voxel_grid::voxels::material::{Material, MaterialId};
use sparse_voxel_grid::{init_logger, serialization, GridBounds, GridConfig, VoxelGrid};

const DEFAULT_OUTPUT: &str = "grid.svxg";
const TERRAIN_SEED: u32 = 7;
const TERRAIN_EXTENT: i32 = 48;
const SCATTER_DENSITY: f64 = 0.01;

fn main() -> Result<(), Box<dyn Error>> {
    init_logger();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => GridConfig::from_json_reader(BufReader::new(File::open(&path)?))?,
        None => GridConfig::default(),
    };
    let output = args.next().unwrap_or_else(|| DEFAULT_OUTPUT.to_string());
    info!("config: {:?}", config);

    let mut grid: VoxelGrid<MaterialId> = VoxelGrid::with_config(&config)?;
    let half_extent = grid.layout().half_extent();
    let edge = TERRAIN_EXTENT.min((half_extent - 1) as i32);
    let bounds = GridBounds::new(Point3::new(-edge, -edge, -edge), Point3::new(edge, edge, edge));

    let start = Instant::now();
    let written = fill_perlin(&mut grid, bounds, TERRAIN_SEED, |coord| {
        let material = if coord.y > 0 { Material::GRASS } else { Material::STONE };
        material.id()
    })?;
    let mut rng = fastrand::Rng::with_seed(u64::from(TERRAIN_SEED));
    let underground = GridBounds::new(Point3::new(-edge, -edge, -edge), Point3::new(edge, -1, edge));
    let scattered = fill_random(&mut grid, underground, SCATTER_DENSITY, &mut rng, |rng| {
        Material::random(rng).id()
    })?;
    let written = written + scattered;
    let stats = grid.stats();
    info!(
        "wrote {} cells in {:?}: {} leaves, {} nodes, ~{} KiB",
        written,
        start.elapsed(),
        stats.leaves,
        stats.nodes,
        stats.memory_bytes / 1024
    );

    let start = Instant::now();
    serialization::serialize_into(&grid, BufWriter::new(File::create(&output)?))?;
    info!("wrote {} in {:?}", output, start.elapsed());

    let start = Instant::now();
    let restored: VoxelGrid<MaterialId> = serialization::deserialize_from(BufReader::new(File::open(&output)?))?;
    info!("read {} back in {:?}", output, start.elapsed());

    if restored != grid {
        warn!("restored grid differs from the original");
        return Err("round trip mismatch".into());
    }

    let mut reader = restored.reader();
    let surface = (-edge..=edge)
        .filter(|&y| Material::from_id(reader.get(Point3::new(0, y, 0))) == Some(Material::GRASS))
        .count();
    info!(
        "round trip ok: {} cells, {} grass cells on the centre column, cache {} hits / {} misses",
        restored.occupied_count(),
        surface,
        reader.cache_hits(),
        reader.cache_misses()
    );
    Ok(())
}

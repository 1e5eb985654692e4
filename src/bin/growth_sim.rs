//! Headless Urban Growth Runner
//!
//! Builds a synthetic town (road grid, expressway, railway, river, lake,
//! settlement centers, a dense core) and runs the growth model over it,
//! printing one JSON summary line per iteration.

use std::path::PathBuf;

use clap::Parser;
use geo_types::{Coord, Geometry, LineString, Point, Polygon};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use urban_growth::{build_grid, Dataset, Feature, FeatureStore, GridSummary, Simulation, SimulationConfig};

/// Urban growth runner - stochastic cellular automaton over a synthetic town
#[derive(Parser, Debug)]
#[command(name = "growth_sim")]
#[command(about = "Run the urban growth model and print JSON summaries")]
struct Args {
    /// TOML file overriding configuration defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of iterations to run
    #[arg(long, short = 'n', default_value_t = 10)]
    iterations: u32,

    /// Random seed for deterministic runs (used for both terrain and growth)
    #[arg(long)]
    seed: Option<u64>,

    /// Edge length of the synthetic town in kilometers
    #[arg(long, default_value_t = 2.0)]
    extent_km: f64,
}

/// One JSON output line
#[derive(Serialize)]
struct IterationLine {
    seed: u64,
    #[serde(flatten)]
    summary: GridSummary,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("urban_growth=info")),
        )
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => SimulationConfig::load(path)?,
        None => SimulationConfig::default(),
    };
    let seed = args.seed.unwrap_or_else(rand::random);

    tracing::info!(seed, extent_km = args.extent_km, "Generating synthetic town");
    let mut terrain_rng = ChaCha8Rng::seed_from_u64(seed);
    let store = synthetic_town(args.extent_km, &mut terrain_rng);

    let grid = build_grid(&store, &config)?;
    println!("{}", serde_json::to_string(&IterationLine { seed, summary: grid.summary() })?);

    let mut sim = Simulation::seeded(grid, seed.wrapping_add(1));
    for summary in sim.run(args.iterations) {
        println!("{}", serde_json::to_string(&IterationLine { seed, summary })?);
    }
    Ok(())
}

// ============================================================================
// Synthetic landscape
// ============================================================================

/// Degrees per kilometer at the equator
const DEG_PER_KM: f64 = 1.0 / 111.319_444;

fn line(points: &[(f64, f64)]) -> Geometry<f64> {
    Geometry::LineString(LineString::from(points.to_vec()))
}

fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Geometry<f64> {
    let ring = vec![
        Coord { x: x0, y: y0 },
        Coord { x: x1, y: y0 },
        Coord { x: x1, y: y1 },
        Coord { x: x0, y: y1 },
        Coord { x: x0, y: y0 },
    ];
    Geometry::Polygon(Polygon::new(LineString::new(ring), vec![]))
}

fn synthetic_town<R: Rng>(extent_km: f64, rng: &mut R) -> FeatureStore {
    let size = extent_km * DEG_PER_KM;
    let mid = size / 2.0;
    let mut store = FeatureStore::new();

    // Street grid every ~250 m, plus a boundary-to-boundary expressway
    let spacing = 0.25 * DEG_PER_KM;
    let mut offset = spacing;
    while offset < size {
        store.insert(
            Dataset::Roads,
            Feature::new(line(&[(offset, 0.0), (offset, size)]))
                .with_type("residential")
                .with_attribute("maxspeed", 40),
        );
        store.insert(
            Dataset::Roads,
            Feature::new(line(&[(0.0, offset), (size, offset)]))
                .with_type("residential")
                .with_attribute("maxspeed", "50"),
        );
        offset += spacing;
    }
    store.insert(
        Dataset::Roads,
        Feature::new(line(&[(0.0, 0.0), (size, size)]))
            .with_type("motorway")
            .with_attribute("maxspeed", 110),
    );
    store.insert(
        Dataset::Roads,
        Feature::new(line(&[(mid - spacing, mid), (mid + spacing, mid)])).with_type("footway"),
    );

    store.insert(
        Dataset::Railways,
        Feature::new(line(&[(0.0, mid * 0.6), (size, mid * 0.8)])).with_type("rail"),
    );

    // River along the southern edge and a lake in the north-east
    store.insert(
        Dataset::Waterways,
        Feature::new(line(&[(0.0, size * 0.1), (size, size * 0.15)]))
            .with_type("river")
            .with_attribute("width", 50),
    );
    store.insert(
        Dataset::Natural,
        Feature::new(rect(size * 0.8, size * 0.8, size * 0.95, size * 0.95)).with_type("water"),
    );

    // Settlements
    store.insert(
        Dataset::Places,
        Feature::new(Point::new(mid, mid)).with_type("city"),
    );
    for (fx, fy) in [(0.3, 0.7), (0.7, 0.35)] {
        store.insert(
            Dataset::Places,
            Feature::new(Point::new(size * fx, size * fy)).with_type("neighbourhood"),
        );
    }
    store.insert(
        Dataset::Places,
        Feature::new(Point::new(size * 0.1, size * 0.9)).with_type("hamlet"),
    );

    // Dense core: commercial land, jittered buildings and points of interest
    let core = 0.2 * DEG_PER_KM;
    store.insert(
        Dataset::Landuse,
        Feature::new(rect(mid - core, mid - core, mid + core, mid + core)).with_type("commercial"),
    );
    store.insert(
        Dataset::Landuse,
        Feature::new(rect(mid - 2.0 * core, mid - 2.0 * core, mid + 2.0 * core, mid - core))
            .with_type("residential"),
    );
    let footprint = 0.03 * DEG_PER_KM;
    for _ in 0..120 {
        let x = mid + rng.gen_range(-core..core);
        let y = mid + rng.gen_range(-core..core);
        store.insert(Dataset::Buildings, Feature::new(rect(x, y, x + footprint, y + footprint)));
        store.insert(Dataset::Points, Feature::new(Point::new(x, y)).with_type("shop"));
    }

    store
}

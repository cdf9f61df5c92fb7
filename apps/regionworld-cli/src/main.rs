use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use glam::DVec2;
use regionworld_kernel::{
    DefaultCharacterFactory, RecordingCanvas, SeededGenerator, TILES_PER_SIDE, Viewport, World,
    WorldContext,
};
use regionworld_persist::SaveStore;
use regionworld_stream::{REGION_SIZE, StreamConfig, TickTimer};
use tracing_subscriber::EnvFilter;

type DemoWorld = World<SeededGenerator, DefaultCharacterFactory>;

#[derive(Parser)]
#[command(name = "regionworld-cli", about = "CLI tool for regionworld operations")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and world constants
    Info,
    /// Walk the player through a streamed world
    Explore {
        /// Number of ticks to simulate
        #[arg(short, long, default_value = "60")]
        ticks: u64,
        /// Generator seed
        #[arg(short, long, default_value = "42")]
        seed: u64,
        /// Streaming window radius, in regions
        #[arg(short, long, default_value = "3")]
        radius: i64,
        /// Player velocity along x, per tick
        #[arg(long, default_value = "40", allow_hyphen_values = true)]
        vx: f64,
        /// Player velocity along y, per tick
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        vy: f64,
        /// Resume from the latest save in this store first
        #[arg(long)]
        resume: Option<PathBuf>,
        /// Append the final world to a save store directory
        #[arg(long)]
        save: Option<PathBuf>,
        /// Write the final world as JSON text
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Summarize a save store
    Inspect {
        /// Save store directory
        dir: PathBuf,
    },
    /// Check a save store's integrity chain and that its latest save loads
    Verify {
        /// Save store directory
        dir: PathBuf,
    },
    /// Import a JSON world save into a save store
    Import {
        /// JSON save file
        file: PathBuf,
        /// Save store directory
        dir: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("regionworld-cli v{}", env!("CARGO_PKG_VERSION"));
            let stream = StreamConfig::default();
            let viewport = Viewport::default();
            println!("region: {REGION_SIZE} units, {TILES_PER_SIDE}x{TILES_PER_SIDE} tiles");
            println!(
                "stream window: radius={} ({} regions)",
                stream.radius,
                stream.cell_count()
            );
            println!("viewport: {}x{}", viewport.width, viewport.height);
        }
        Commands::Explore {
            ticks,
            seed,
            radius,
            vx,
            vy,
            resume,
            save,
            export,
        } => {
            anyhow::ensure!(radius >= 0, "radius must be non-negative, got {radius}");
            let ctx = WorldContext::new(SeededGenerator::new(seed), DefaultCharacterFactory)
                .with_stream(StreamConfig { radius });
            let mut world = World::new(ctx).context("building world")?;

            if let Some(dir) = resume {
                let store = SaveStore::open(&dir)
                    .with_context(|| format!("opening store {}", dir.display()))?;
                let slot = store
                    .restore_latest(&mut world)
                    .context("restoring latest save")?;
                println!("Resumed slot {slot}: seed={}", world.seed());
            }

            explore(&mut world, ticks, DVec2::new(vx, vy))?;

            if let Some(dir) = save {
                let mut store = SaveStore::open(&dir)
                    .with_context(|| format!("opening store {}", dir.display()))?;
                let slot = store.write_world(&world).context("writing save")?;
                println!("Saved slot {slot} to {}", dir.display());
            }
            if let Some(path) = export {
                let text = regionworld_persist::serialize_world(&world)?;
                std::fs::write(&path, text)
                    .with_context(|| format!("writing {}", path.display()))?;
                println!("Exported JSON to {}", path.display());
            }
        }
        Commands::Inspect { dir } => {
            let store = SaveStore::open(&dir)
                .with_context(|| format!("opening store {}", dir.display()))?;
            let meta = store.meta();
            println!("store: {}", store.root().display());
            println!(
                "schema v{}, saves={}, latest seed={}",
                meta.save_schema_version,
                meta.save_count,
                meta.latest_seed
                    .map_or_else(|| "-".to_owned(), |s| s.to_string())
            );
            if meta.save_count > 0 {
                let save = store.load_latest()?;
                let columns: Vec<&str> = save.world_data.keys().map(String::as_str).collect();
                println!(
                    "latest: regions={}, columns=[{}]",
                    save.region_count(),
                    columns.join(", ")
                );
            }
        }
        Commands::Verify { dir } => {
            let store = SaveStore::open(&dir)
                .with_context(|| format!("opening store {}", dir.display()))?;
            store
                .verify_integrity()
                .context("integrity chain is broken")?;
            println!("Integrity: OK ({} entries)", store.manifest().entries.len());

            if store.meta().save_count > 0 {
                let mut world = new_world(0)?;
                store.restore_latest(&mut world)?;
                println!(
                    "Latest save loads: seed={}, regions={}",
                    world.seed(),
                    world.region_count()
                );
            }
        }
        Commands::Import { file, dir } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let mut world = new_world(0)?;
            regionworld_persist::load_from_serialized(&mut world, &text)
                .with_context(|| format!("loading {}", file.display()))?;
            let mut store = SaveStore::open(&dir)
                .with_context(|| format!("opening store {}", dir.display()))?;
            let slot = store.write_world(&world)?;
            println!(
                "Imported {} as slot {slot}: seed={}, regions={}",
                file.display(),
                world.seed(),
                world.region_count()
            );
        }
    }

    Ok(())
}

fn new_world(seed: u64) -> anyhow::Result<DemoWorld> {
    let ctx = WorldContext::new(SeededGenerator::new(seed), DefaultCharacterFactory);
    World::new(ctx).context("building world")
}

fn explore(world: &mut DemoWorld, ticks: u64, velocity: DVec2) -> anyhow::Result<()> {
    println!("Exploring: seed={}, ticks={ticks}, velocity={velocity}", world.seed());

    let mut timer = TickTimer::new(120);
    let mut generated = 0;
    let mut migrated = 0;
    for tick in 0..ticks {
        let start = Instant::now();
        let report = world.update()?;
        timer.record(start.elapsed());
        generated += report.generated;
        migrated += report.migration.moved;

        if tick == 0 {
            if let Some(player) = world.player_mut() {
                player.set_velocity(velocity)?;
            }
        }
        if report.spawned.is_some() {
            tracing::info!(tick = report.tick, spawned = ?report.spawned, "player placed");
        }
    }

    let mut canvas = RecordingCanvas::default();
    let drawn = world.draw_blocks(&mut canvas);
    world.draw_entities(&mut canvas);

    match (world.player(), world.player_region()) {
        (Some(player), Some(home)) => {
            println!("Player: position={} region={home}", player.position())
        }
        (Some(player), None) => println!("Player: position={} (parked)", player.position()),
        _ => println!("Player: none"),
    }
    println!(
        "Regions: total={}, generated={generated}, window={}, migrations={migrated}",
        world.region_count(),
        world.draw_list().len()
    );
    println!(
        "Draw: regions={drawn}, tiles={}, entities={}",
        canvas.tiles.len(),
        canvas.entities.len()
    );
    println!(
        "Tick time: avg={:?} min={:?} max={:?} over {} ticks",
        timer.average(),
        timer.min(),
        timer.max(),
        timer.count()
    );
    Ok(())
}

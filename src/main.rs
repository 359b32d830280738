//! Corpsekeeper entry point.
//!
//! Runs the corpse lifecycle headless:
//!
//! 1. Load the INI configuration (defaults if the file is missing)
//! 2. Load the JSON world file with rooms, actors and accounts
//! 3. Restore the last snapshot, sweep abandoned corpses, reconcile rosters
//! 4. Tick every `tick_ms`: advance time, fire timers, autosave
//! 5. On exit, write a final snapshot
//!
//! # Running
//!
//! ```sh
//! cargo run --release -- --world demos/world.json --config demos/corpsekeeper.ini
//! ```

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Parser;
use log::{error, info, warn};

use corpsekeeper::resources::lifecycleconfig::LifecycleConfig;
use corpsekeeper::resources::worldtime::system_now_millis;
use corpsekeeper::server::{Server, load_world_file};
use corpsekeeper::systems::persistence::load_snapshot_from_file;

/// Corpse lifecycle and respawn server
#[derive(Parser)]
#[command(version, about = "Keeps corpses, decay timers and respawns of a text world.")]
struct Cli {
    /// Configuration file.
    #[arg(long, value_name = "PATH", default_value = "./corpsekeeper.ini")]
    config: PathBuf,

    /// World file (JSON) with rooms, actors and accounts.
    #[arg(long, value_name = "PATH", required_unless_present = "write_default_config")]
    world: Option<PathBuf>,

    /// Snapshot file; overrides `snapshot_path` from the configuration.
    #[arg(long, value_name = "PATH")]
    snapshot: Option<PathBuf>,

    /// Stop after this many seconds instead of running forever.
    #[arg(long, value_name = "SECONDS")]
    run_for: Option<u64>,

    /// Write a configuration file with default values and exit.
    #[arg(long, value_name = "PATH")]
    write_default_config: Option<PathBuf>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Early-exit: write the default configuration and quit
    if let Some(path) = cli.write_default_config {
        match LifecycleConfig::with_path(&path).save_to_file() {
            Ok(()) => println!("Default configuration written to {}", path.display()),
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    let mut config = LifecycleConfig::with_path(&cli.config);
    if let Err(e) = config.load_from_file() {
        warn!("{} ({}), using defaults", e, cli.config.display());
    }
    if let Some(snapshot) = cli.snapshot {
        config.snapshot_path = snapshot;
    }

    let Some(world_path) = cli.world else {
        eprintln!("Error: --world is required");
        std::process::exit(2);
    };
    let world_file = match load_world_file(&world_path) {
        Ok(file) => file,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };
    info!(
        "Loaded world: {} room(s), {} actor(s), {} account(s)",
        world_file.rooms.len(),
        world_file.actors.len(),
        world_file.accounts.len()
    );
    let (rooms, directory) = world_file.into_parts();

    let snapshot = match load_snapshot_from_file(&config.snapshot_path) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            error!("[Snapshot] {}, starting empty", e);
            None
        }
    };

    let tick = Duration::from_millis(config.tick_ms.max(1));
    let deadline = cli.run_for.map(|secs| Instant::now() + Duration::from_secs(secs));

    let mut server = Server::new(config, rooms, directory, system_now_millis());
    server.startup(snapshot);

    let mut last = Instant::now();
    while deadline.is_none_or(|d| Instant::now() < d) {
        std::thread::sleep(tick);
        let now = Instant::now();
        let dt_ms = now.duration_since(last).as_millis() as u64;
        last = now;

        server.tick(dt_ms);
        if server.autosave_due()
            && let Err(e) = server.save()
        {
            error!("[Snapshot] Autosave failed: {}", e);
        }
    }

    if let Err(e) = server.shutdown_and_save() {
        error!("[Snapshot] Final save failed: {}", e);
        std::process::exit(1);
    }
    info!("Bye");
}

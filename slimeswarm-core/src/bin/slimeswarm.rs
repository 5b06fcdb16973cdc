//! slimeswarm - headless runner for the trail simulation.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use slimeswarm_core::{setup_logging, Simulation, SimulationConfig};

#[derive(Parser)]
#[command(name = "slimeswarm")]
#[command(author, version, about = "Physarum slime mold simulation", long_about = None)]
struct Cli {
    /// JSON config file (overrides --preset)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Built-in preset: default, three_species, dense
    #[arg(short, long, default_value = "default")]
    preset: String,

    /// Seed for spawning and per-agent randomness
    #[arg(short, long, default_value = "0")]
    seed: u64,

    /// Number of displayed frames to run
    #[arg(short, long, default_value = "600")]
    frames: u32,

    /// Seconds of simulated time per tick
    #[arg(long, default_value = "0.016666668")]
    dt: f32,

    /// Save a PNG snapshot of the final frame
    #[arg(long)]
    snapshot: bool,

    /// Print the resolved config as JSON and exit
    #[arg(long)]
    dump_config: bool,

    /// Tracing filter, e.g. "debug" or "slimeswarm_core=trace"
    #[arg(long)]
    log_level: Option<String>,
}

fn load_config(cli: &Cli) -> Result<SimulationConfig> {
    match &cli.config {
        Some(path) => SimulationConfig::from_path(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => SimulationConfig::preset(&cli.preset).ok_or_else(|| anyhow!("unknown preset '{}'", cli.preset)),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.log_level.clone());

    let config = load_config(&cli)?;
    if cli.dump_config {
        println!("{}", config.to_json_pretty()?);
        return Ok(());
    }
    if !(cli.dt.is_finite() && cli.dt >= 0.0) {
        return Err(anyhow!("--dt must be finite and non-negative, got {}", cli.dt));
    }

    let mut sim = Simulation::initialize(config, cli.seed).context("initializing simulation")?;

    for frame in 1..=cli.frames {
        sim.run_frame(cli.dt);
        if frame % 60 == 0 || frame == cli.frames {
            let stats = sim.stats();
            info!(
                "[Run] Frame {}/{}: tick {}, t={:.2}s, last tick {:?}, mass {:?}",
                frame,
                cli.frames,
                stats.tick,
                stats.simulated_time,
                stats.last_tick,
                stats.channel_mass.iter().map(|m| format!("{:.1}", m)).collect::<Vec<_>>()
            );
        }
    }

    if cli.snapshot {
        if let Some(path) = sim.save_snapshot() {
            println!("{}", path.display());
        }
    }

    sim.teardown();
    Ok(())
}

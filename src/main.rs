//! Command-line runner: loads a scene, runs the simulation and writes the
//! JSON result bundle.

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Builder;
use log::{LevelFilter, debug, info};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use multiap_link_simulator::common::config::RunConfig;
use multiap_link_simulator::common::scene::{load_scene, load_trace};
use multiap_link_simulator::simulation::geometry::centroid;
use multiap_link_simulator::simulation::{LinearMobility, MobilityModel, SimulationResult, simulate};

#[derive(Parser, Debug)]
#[command(name = "multiap-link-simulator", about = "Multi-AP SINR, handover and adaptive MCS simulator")]
struct Args {
    /// Scene JSON file describing APs, users and model parameters
    scene: PathBuf,

    /// Mobility trace JSON of shape (users, 2, steps); generated when omitted
    #[arg(long)]
    trace: Option<PathBuf>,

    /// Run configuration TOML; defaults to config.toml next to the scene
    #[arg(long)]
    config: Option<PathBuf>,

    /// Random seed, overrides the configuration file
    #[arg(long)]
    seed: Option<u64>,

    /// Output file for the result bundle, overrides the configuration file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

/// Explicit `--config` must exist; the implicit one next to the scene is optional.
fn load_run_config(args: &Args) -> Result<RunConfig> {
    match &args.config {
        Some(path) => RunConfig::load(path).with_context(|| format!("Failed to load config {}", path.display())),
        None => {
            let path = RunConfig::config_path_from_scene(&args.scene);
            if path.exists() {
                info!("Loaded configuration file: {:?}", path);
                RunConfig::load(&path).with_context(|| format!("Failed to load config {}", path.display()))
            } else {
                debug!("No configuration file at {:?}, using defaults", path);
                Ok(RunConfig::default())
            }
        }
    }
}

fn write_result(result: &SimulationResult, output: Option<&Path>, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(result)
    } else {
        serde_json::to_string(result)
    };
    let json = json.context("Failed to serialize result")?;
    match output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Result written to {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", json).context("Failed to write result to stdout")?;
        }
    }
    Ok(())
}

fn run(args: Args) -> Result<()> {
    let config = load_run_config(&args)?;

    let scene = load_scene(&args.scene).with_context(|| format!("Failed to load scene {}", args.scene.display()))?;
    let aps = scene.access_points()?;
    let params = scene.simulation_parameters();
    let step_count = scene.step_count();

    let mut rng = match args.seed.or(config.seed) {
        Some(seed) => {
            info!("Using seed {}", seed);
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_entropy(),
    };

    let trace = match &args.trace {
        Some(path) => {
            let trace = load_trace(path).with_context(|| format!("Failed to load trace {}", path.display()))?;
            trace.expect_shape(scene.number_of_nodes, step_count)?;
            trace
        }
        None => LinearMobility {
            origin: centroid(&aps),
            velocity: scene.velocity,
            time_step: scene.time_step,
        }
        .generate(scene.number_of_nodes, step_count, &mut rng)?,
    };

    let result = simulate(&aps, &trace, &params, &mut rng)?;

    for summary in result.summary() {
        info!(
            "User {}: mean throughput {:.2} Mbps (MAC {:.2} Mbps), {} handovers, {} lost steps",
            summary.user + 1,
            summary.mean_throughput_bps / 1e6,
            summary.mean_mac_throughput_bps / 1e6,
            summary.handovers,
            summary.collisions
        );
    }

    let output = args.output.as_deref().or(config.output.as_deref());
    write_result(&result, output, args.pretty || config.pretty_output)
}

fn main() -> Result<()> {
    // Logging setup
    Builder::new()
        .filter_level(LevelFilter::Info)
        .filter(Some("multiap_link_simulator"), LevelFilter::Debug)
        .init();

    info!("Starting up");
    run(Args::parse())
}

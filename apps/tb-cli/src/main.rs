use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tb_app::{EngineConfig, EngineResult, ExecutionEngine, NullObserver};
use tb_model::{ModelParams, Simulation};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tb-cli")]
#[command(about = "ThermoBox CLI - load, inspect and run saved heat-transfer states", long_about = None)]
struct Cli {
    /// Engine configuration YAML (grid resolution, step pause)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a JSON summary of a saved state and any load problems
    Inspect {
        /// Path to the saved state
        state: PathBuf,
    },
    /// Load a saved state and write it back in canonical form
    Normalize {
        /// Path to the saved state
        input: PathBuf,
        /// Output path
        output: PathBuf,
    },
    /// Run a saved state for a wall-clock interval
    Run {
        /// Path to the saved state
        state: PathBuf,
        /// How long to let the engine step, in milliseconds
        #[arg(long, default_value_t = 1000)]
        millis: u64,
        /// Save the final state here
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Serialize)]
struct Summary<'a> {
    params: &'a ModelParams,
    time: f32,
    parts: usize,
    thermometers: usize,
    thermostats: usize,
    text_boxes: usize,
    issues: Vec<String>,
}

fn main() -> EngineResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Commands::Inspect { state } => cmd_inspect(&config, &state),
        Commands::Normalize { input, output } => cmd_normalize(&config, &input, &output),
        Commands::Run { state, millis, out } => cmd_run(&config, &state, millis, out.as_deref()),
    }
}

/// Build an engine and load `path` into it, returning the problems met.
fn load(config: &EngineConfig, path: &Path) -> EngineResult<(ExecutionEngine, Vec<String>)> {
    let engine = ExecutionEngine::new(config, Arc::new(NullObserver));
    let report = engine.load_state(File::open(path)?)?;
    let issues = report.issues().iter().map(ToString::to_string).collect();
    Ok((engine, issues))
}

fn summarize(sim: &Simulation, issues: Vec<String>) -> io::Result<String> {
    let summary = Summary {
        params: &sim.model.params,
        time: sim.model.time(),
        parts: sim.model.part_count(),
        thermometers: sim.model.thermometer_count(),
        thermostats: sim.model.thermostats().len(),
        text_boxes: sim.view.text_boxes.len(),
        issues,
    };
    serde_json::to_string_pretty(&summary).map_err(io::Error::from)
}

fn cmd_inspect(config: &EngineConfig, state: &Path) -> EngineResult<()> {
    let (engine, issues) = load(config, state)?;
    let json = engine.with_simulation(|sim| summarize(sim, issues))?;
    println!("{json}");
    Ok(())
}

fn cmd_normalize(config: &EngineConfig, input: &Path, output: &Path) -> EngineResult<()> {
    let (engine, issues) = load(config, input)?;
    for issue in &issues {
        eprintln!("warning: {issue}");
    }
    engine.save_state(BufWriter::new(File::create(output)?))?;
    println!("✓ Wrote {}", output.display());
    Ok(())
}

fn cmd_run(
    config: &EngineConfig,
    state: &Path,
    millis: u64,
    out: Option<&Path>,
) -> EngineResult<()> {
    let (engine, issues) = load(config, state)?;
    for issue in &issues {
        eprintln!("warning: {issue}");
    }

    info!(millis, "running");
    engine.run()?;
    thread::sleep(Duration::from_millis(millis));
    engine.stop();

    let (time, steps) = engine.with_simulation(|sim| (sim.model.time(), sim.model.step_count()));
    println!("Simulated {time} s in {steps} steps");

    if let Some(out) = out {
        engine.save_state(BufWriter::new(File::create(out)?))?;
        println!("✓ Saved {}", out.display());
    }
    engine.shutdown();
    Ok(())
}

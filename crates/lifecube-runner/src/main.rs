//! Headless runner for the Lifecube automaton.
//!
//! Stands in for a render loop: it builds a seeded engine, drives it with
//! scripted orbiting probes, and optionally streams dirty frames to stdout as
//! JSON lines. Logs go to stderr so the frame stream stays clean.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `LIFECUBE_CONFIG` or `lifecube-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Build the engine from the configured seed
//! 4. Run the frame loop
//! 5. Log the result

mod error;
mod probe;
mod runner;

use std::io::BufWriter;
use std::path::Path;

use anyhow::Context;
use lifecube_core::{Point3, SeededEngine, SimulationConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::RunnerError;
use crate::probe::Probe;
use crate::runner::{FrameSink, JsonLinesSink, NoOpSink};

/// Config file used when `LIFECUBE_CONFIG` is unset.
const DEFAULT_CONFIG_PATH: &str = "lifecube-config.yaml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load configuration.
    let config_path =
        std::env::var("LIFECUBE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_owned());
    let (config, loaded_from_file) = load_config(Path::new(&config_path))?;

    // 2. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    info!("lifecube-runner starting");
    if loaded_from_file {
        info!(path = %config_path, "Configuration loaded");
    } else {
        warn!(path = %config_path, "Config file not found, using defaults");
    }

    // 3. Build the engine.
    let mut engine = SeededEngine::from_seed(&config.engine, 0)
        .map_err(RunnerError::from)
        .context("failed to build engine")?;
    info!(
        seed = config.engine.seed,
        size = engine.size(),
        interaction_radius = engine.interaction_radius(),
        "Engine ready"
    );

    // 4. Run the frame loop.
    let probes = Probe::from_configs(&config.run.probes, Point3::default());
    let mut json_sink;
    let mut no_op_sink;
    let sink: &mut dyn FrameSink = if config.run.emit_frames {
        json_sink = JsonLinesSink::new(BufWriter::new(std::io::stdout()));
        &mut json_sink
    } else {
        no_op_sink = NoOpSink;
        &mut no_op_sink
    };

    let result = runner::run_simulation(&mut engine, &config.run, &probes, sink)
        .await
        .context("simulation failed")?;

    // 5. Log the result.
    runner::log_simulation_end(&result);
    Ok(())
}

/// Load the config file, falling back to defaults when it does not exist.
///
/// Returns the config and whether it came from the file.
fn load_config(path: &Path) -> Result<(SimulationConfig, bool), RunnerError> {
    if path.exists() {
        Ok((SimulationConfig::from_file(path)?, true))
    } else {
        let mut config = SimulationConfig::default();
        config.apply_env_overrides();
        Ok((config, false))
    }
}

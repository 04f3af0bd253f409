//! Configuration loading and typed config structures for Lifecube.
//!
//! The canonical configuration lives in `lifecube-config.yaml` at the project
//! root. This module defines strongly-typed structs that mirror the YAML
//! structure, and provides a loader that reads the file. Every field has a
//! default, so an empty document is a valid configuration.
//!
//! Structural validation (window ordering, bias range, lattice size) happens
//! in [`EngineConfig::validate`], which [`Engine::new`] also runs.
//!
//! [`Engine::new`]: crate::engine::Engine::new

use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crate::bias::{BiasController, BiasCycle, BiasWrap};
use crate::error::EngineError;
use crate::insertion::InsertionWindows;
use crate::lattice::checked_cell_count;
use crate::scheduler::Millis;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration: the engine plus the headless runner around it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// Automaton parameters.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Frame-loop parameters for the headless runner.
    #[serde(default)]
    pub run: RunConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `LIFECUBE_SEED` overrides `engine.seed`
    /// - `LIFECUBE_MAX_TICKS` overrides `run.max_ticks`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string, applying environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config = Self::parse_without_env(yaml)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string, ignoring the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse_without_env(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Override selected values from environment variables when set.
    ///
    /// Unparseable values are logged and ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Some(seed) = env_u64("LIFECUBE_SEED") {
            self.engine.seed = seed;
        }
        if let Some(max_ticks) = env_u64("LIFECUBE_MAX_TICKS") {
            self.run.max_ticks = max_ticks;
        }
    }
}

fn env_u64(key: &str) -> Option<u64> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key, value = %raw, error = %e, "ignoring unparseable environment override");
            None
        }
    }
}

/// Everything needed to construct an [`Engine`](crate::engine::Engine).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EngineConfig {
    /// Seed for the engine's random source.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Lattice dimensions and world-space geometry.
    #[serde(default)]
    pub lattice: LatticeConfig,

    /// Per-cell update cadence.
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Insertion protection windows and interaction radius.
    #[serde(default)]
    pub insertion: InsertionConfig,

    /// Initial bias and cycling range.
    #[serde(default)]
    pub bias: BiasConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            lattice: LatticeConfig::default(),
            schedule: ScheduleConfig::default(),
            insertion: InsertionConfig::default(),
            bias: BiasConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Check every construction-time constraint without building an engine.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] if the lattice size is zero or
    /// above [`MAX_LATTICE_SIZE`], the memory window does not exceed the
    /// protected window, the initial bias lies outside `[0, 1]`, the bias
    /// cycle is malformed, or a geometry value is non-positive or non-finite.
    ///
    /// [`MAX_LATTICE_SIZE`]: crate::lattice::MAX_LATTICE_SIZE
    pub fn validate(&self) -> Result<(), EngineError> {
        checked_cell_count(self.lattice.size)?;
        self.insertion.windows()?;
        self.bias.controller()?;
        if !(self.lattice.cell_spacing.is_finite() && self.lattice.cell_spacing > 0.0) {
            return Err(EngineError::invalid_config(format!(
                "cell spacing ({}) must be positive and finite",
                self.lattice.cell_spacing
            )));
        }
        if !(self.insertion.interaction_radius.is_finite()
            && self.insertion.interaction_radius >= 0.0)
        {
            return Err(EngineError::invalid_config(format!(
                "interaction radius ({}) must be non-negative and finite",
                self.insertion.interaction_radius
            )));
        }
        Ok(())
    }
}

/// Lattice dimensions.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LatticeConfig {
    /// Edge length `N`, at most
    /// [`MAX_LATTICE_SIZE`](crate::lattice::MAX_LATTICE_SIZE); the lattice
    /// holds `N³` cells.
    #[serde(default = "default_lattice_size")]
    pub size: u16,

    /// World-space distance between adjacent cell centers.
    #[serde(default = "default_cell_spacing")]
    pub cell_spacing: f64,
}

impl Default for LatticeConfig {
    fn default() -> Self {
        Self {
            size: default_lattice_size(),
            cell_spacing: default_cell_spacing(),
        }
    }
}

/// Per-cell update cadence.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScheduleConfig {
    /// Minimum delay between two evaluations of the same cell.
    #[serde(default = "default_base_interval_ms")]
    pub base_interval_ms: Millis,

    /// Exclusive upper bound of the random jitter added to each timer.
    #[serde(default = "default_max_offset_ms")]
    pub max_offset_ms: Millis,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            base_interval_ms: default_base_interval_ms(),
            max_offset_ms: default_max_offset_ms(),
        }
    }
}

/// Insertion protection windows.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InsertionConfig {
    /// Forced-alive window after an insertion.
    #[serde(default = "default_protected_window_ms")]
    pub protected_window_ms: Millis,

    /// End of insertion memory; must exceed `protected_window_ms`.
    #[serde(default = "default_memory_window_ms")]
    pub memory_window_ms: Millis,

    /// World-space radius around a tracked point within which dead cells
    /// are inserted.
    #[serde(default = "default_interaction_radius")]
    pub interaction_radius: f64,
}

impl InsertionConfig {
    /// Build the validated window pair.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] if the memory window does not
    /// exceed the protected window.
    pub fn windows(&self) -> Result<InsertionWindows, EngineError> {
        InsertionWindows::new(self.protected_window_ms, self.memory_window_ms)
    }
}

impl Default for InsertionConfig {
    fn default() -> Self {
        Self {
            protected_window_ms: default_protected_window_ms(),
            memory_window_ms: default_memory_window_ms(),
            interaction_radius: default_interaction_radius(),
        }
    }
}

/// Initial bias and the discrete cycle it steps through.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BiasConfig {
    /// Bias at construction, in `[0, 1]`.
    #[serde(default = "default_initial_bias")]
    pub initial: f64,

    /// Value the cycle returns to.
    #[serde(default = "default_bias_min")]
    pub min: f64,

    /// Highest value the cycle may reach.
    #[serde(default = "default_bias_max")]
    pub max: f64,

    /// Increment per cycle step.
    #[serde(default = "default_bias_step")]
    pub step: f64,

    /// Behavior once a step runs past `max`.
    #[serde(default)]
    pub wrap: BiasWrap,
}

impl BiasConfig {
    /// Build the validated bias controller.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] if the cycle is malformed or
    /// the initial bias lies outside `[0, 1]`.
    pub fn controller(&self) -> Result<BiasController, EngineError> {
        let cycle = BiasCycle::new(self.min, self.max, self.step, self.wrap)?;
        BiasController::new(self.initial, cycle)
    }
}

impl Default for BiasConfig {
    fn default() -> Self {
        Self {
            initial: default_initial_bias(),
            min: default_bias_min(),
            max: default_bias_max(),
            step: default_bias_step(),
            wrap: BiasWrap::default(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error), used when `RUST_LOG` is
    /// not set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Headless frame-loop parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RunConfig {
    /// Minimum wall-clock milliseconds between two engine ticks.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: Millis,

    /// Milliseconds between two polls of the probes and the tick gate.
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: Millis,

    /// Stop after this many ticks (0 = unlimited).
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,

    /// Cycle the bias every N ticks (0 = never).
    #[serde(default)]
    pub bias_cycle_every_ticks: u64,

    /// Write each dirty frame as a JSON line on stdout.
    #[serde(default)]
    pub emit_frames: bool,

    /// Scripted tracked points that insert cells, each with its own
    /// selecting window. Defaults to two points on opposite sides of the
    /// orbit.
    #[serde(default = "default_probes")]
    pub probes: Vec<ProbeConfig>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            frame_interval_ms: default_frame_interval_ms(),
            max_ticks: default_max_ticks(),
            bias_cycle_every_ticks: 0,
            emit_frames: false,
            probes: default_probes(),
        }
    }
}

/// A scripted tracked point orbiting the lattice center.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProbeConfig {
    /// Whether the probe inserts cells at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// World-space radius of the orbit around the lattice center.
    #[serde(default = "default_orbit_radius")]
    pub orbit_radius: f64,

    /// Full orbits per second.
    #[serde(default = "default_revolutions_per_second")]
    pub revolutions_per_second: f64,

    /// Starting position on the orbit, as a fraction of a revolution.
    #[serde(default)]
    pub phase: f64,

    /// Milliseconds after start before the probe begins selecting.
    #[serde(default)]
    pub start_ms: Millis,

    /// How long the probe keeps selecting once started.
    #[serde(default = "default_probe_active_ms")]
    pub active_ms: Millis,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            orbit_radius: default_orbit_radius(),
            revolutions_per_second: default_revolutions_per_second(),
            phase: 0.0,
            start_ms: 0,
            active_ms: default_probe_active_ms(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

const fn default_seed() -> u64 {
    42
}

const fn default_lattice_size() -> u16 {
    30
}

const fn default_cell_spacing() -> f64 {
    0.011
}

const fn default_base_interval_ms() -> Millis {
    100
}

const fn default_max_offset_ms() -> Millis {
    50
}

const fn default_protected_window_ms() -> Millis {
    500
}

const fn default_memory_window_ms() -> Millis {
    1000
}

const fn default_interaction_radius() -> f64 {
    0.025
}

const fn default_initial_bias() -> f64 {
    0.59
}

const fn default_bias_min() -> f64 {
    0.25
}

const fn default_bias_max() -> f64 {
    1.25
}

const fn default_bias_step() -> f64 {
    0.25
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_tick_interval_ms() -> Millis {
    100
}

const fn default_frame_interval_ms() -> Millis {
    16
}

const fn default_max_ticks() -> u64 {
    600
}

const fn default_orbit_radius() -> f64 {
    0.08
}

const fn default_revolutions_per_second() -> f64 {
    0.25
}

const fn default_probe_active_ms() -> Millis {
    8_000
}

const fn default_true() -> bool {
    true
}

fn default_probes() -> Vec<ProbeConfig> {
    vec![
        ProbeConfig::default(),
        ProbeConfig {
            phase: 0.5,
            ..ProbeConfig::default()
        },
    ]
}

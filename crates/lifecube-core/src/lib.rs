//! Lattice, per-cell scheduling, and the stochastic transition rule for the
//! Lifecube automaton.
//!
//! Lifecube is a Game-of-Life variant on a cubic `N x N x N` lattice with a
//! 26-cell Moore neighborhood and a hard (non-wrapping) boundary. Cells are
//! not updated in lockstep: each carries its own jittered timer, and each
//! evaluation is a probability draw skewed by a global bias. Cells inserted
//! by an external input are protected for a while before rejoining the
//! normal rule.
//!
//! # Modules
//!
//! - [`bias`] -- The bias scalar, its survival/birth terms, and discrete
//!   cycling through a configured range.
//! - [`config`] -- Configuration loading from `lifecube-config.yaml` into
//!   strongly-typed structs.
//! - [`engine`] -- The [`Engine`] composition root: `tick`, insertion, bias,
//!   and live-cell snapshots.
//! - [`error`] -- [`EngineError`].
//! - [`insertion`] -- Insertion memory and the protected/transition phases.
//! - [`lattice`] -- Double-buffered cell storage and [`Coordinate`].
//! - [`neighbors`] -- Moore-neighborhood counting with boundary clipping.
//! - [`rule`] -- The bias-weighted stochastic transition rule.
//! - [`scheduler`] -- Per-cell jittered update timers.
//! - [`spatial`] -- World-space geometry and proximity queries.

pub mod bias;
pub mod config;
pub mod engine;
pub mod error;
pub mod insertion;
pub mod lattice;
pub mod neighbors;
pub mod rule;
pub mod scheduler;
pub mod spatial;

pub use bias::{BiasController, BiasCycle, BiasTerms, BiasWrap};
pub use config::{ConfigError, EngineConfig, SimulationConfig};
pub use engine::{Engine, SeededEngine, TickSummary};
pub use error::EngineError;
pub use insertion::{InsertionPhase, InsertionWindows};
pub use lattice::{Coordinate, MAX_LATTICE_SIZE};
pub use scheduler::Millis;
pub use spatial::{LatticeGeometry, Point3};

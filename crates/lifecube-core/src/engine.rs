//! The engine: one lattice, its per-cell timers, and its insertion memory,
//! advanced by caller-supplied timestamps.
//!
//! A tick runs in three phases:
//!
//! 1. **Seed scratch** -- copy the current buffer into scratch, so every cell
//!    that is not due keeps its state.
//! 2. **Evaluate** -- walk the lattice in index order. For each due cell:
//!    re-arm its timer, count neighbors in the *current* buffer, resolve the
//!    rule, write the result to scratch.
//! 3. **Commit** -- swap buffers.
//!
//! Draws from the engine's random source happen in a fixed order (timer
//! jitter, then the rule's draws), so a seeded engine fed the same calls
//! reproduces the same history.
//!
//! The engine is single-threaded and never blocks. Callers own the clock
//! and the tick cadence.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::bias::BiasController;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::insertion::{InsertionPhase, InsertionTracker};
use crate::lattice::{Coordinate, Lattice};
use crate::neighbors;
use crate::rule::{self, CellContext};
use crate::scheduler::{Millis, UpdateScheduler};
use crate::spatial::{LatticeGeometry, Point3};

/// An engine driven by the seeded default random source.
pub type SeededEngine = Engine<SmallRng>;

/// Outcome of one [`Engine::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TickSummary {
    /// Timestamp the tick ran at.
    pub now: Millis,
    /// Cells whose timer had expired and were re-evaluated.
    pub evaluated: usize,
    /// Dead cells that became alive.
    pub births: usize,
    /// Live cells that died.
    pub deaths: usize,
    /// Live cells after the swap.
    pub live: usize,
    /// Whether any cell changed state. Renderers only need to re-read
    /// [`Engine::live_cells`] when this is set.
    pub dirty: bool,
}

/// The stochastic 3D automaton.
#[derive(Debug)]
pub struct Engine<R: Rng> {
    /// Double-buffered cell states.
    lattice: Lattice,
    /// Per-cell "next eligible at" timers.
    scheduler: UpdateScheduler,
    /// Per-cell insertion memory.
    tracker: InsertionTracker,
    /// Survival/birth skew.
    bias: BiasController,
    /// World-space placement of cells.
    geometry: LatticeGeometry,
    /// Default radius for [`Engine::insert_near_point`] callers.
    interaction_radius: f64,
    /// Single source of randomness for timers and the rule.
    rng: R,
}

impl SeededEngine {
    /// Build an engine whose random source is seeded from `config.seed`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] if the configuration fails
    /// validation.
    pub fn from_seed(config: &EngineConfig, now: Millis) -> Result<Self, EngineError> {
        Self::new(config, SmallRng::seed_from_u64(config.seed), now)
    }
}

impl<R: Rng> Engine<R> {
    /// Build an all-dead engine with staggered timers starting at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] if the configuration fails
    /// validation.
    pub fn new(config: &EngineConfig, mut rng: R, now: Millis) -> Result<Self, EngineError> {
        config.validate()?;

        let lattice = Lattice::new(config.lattice.size)?;
        let geometry = LatticeGeometry::new(config.lattice.size, config.lattice.cell_spacing)?;
        let tracker = InsertionTracker::new(lattice.cell_count(), config.insertion.windows()?);
        let bias = config.bias.controller()?;
        let scheduler = UpdateScheduler::new(
            lattice.cell_count(),
            config.schedule.base_interval_ms,
            config.schedule.max_offset_ms,
            now,
            &mut rng,
        );

        info!(
            size = config.lattice.size,
            cells = lattice.cell_count(),
            base_interval_ms = config.schedule.base_interval_ms,
            max_offset_ms = config.schedule.max_offset_ms,
            bias = bias.value(),
            "Engine created"
        );

        Ok(Self {
            lattice,
            scheduler,
            tracker,
            bias,
            geometry,
            interaction_radius: config.insertion.interaction_radius,
            rng,
        })
    }

    /// Advance every due cell by one rule evaluation and commit the result.
    pub fn tick(&mut self, now: Millis) -> TickSummary {
        let terms = self.bias.terms();
        self.lattice.copy_current_into_scratch();

        let mut evaluated: usize = 0;
        let mut births: usize = 0;
        let mut deaths: usize = 0;

        for index in 0..self.lattice.cell_count() {
            if !self.scheduler.is_due(index, now) {
                continue;
            }
            let Some(coord) = self.lattice.coord_at(index) else {
                continue;
            };
            self.scheduler.rearm(index, now, &mut self.rng);

            let alive = self.lattice.current_at(index);
            let cell = CellContext {
                alive,
                neighbors: neighbors::count_unchecked(&self.lattice, coord),
                phase: self.tracker.phase(index, now),
            };
            let next = rule::next_state(cell, terms, &mut self.rng);
            self.lattice.set_next_at(index, next);

            evaluated = evaluated.saturating_add(1);
            match (alive, next) {
                (false, true) => births = births.saturating_add(1),
                (true, false) => deaths = deaths.saturating_add(1),
                _ => {}
            }
        }

        self.lattice.swap();

        let summary = TickSummary {
            now,
            evaluated,
            births,
            deaths,
            live: self.lattice.live_count(),
            dirty: births > 0 || deaths > 0,
        };
        debug!(
            now,
            evaluated,
            births,
            deaths,
            live = summary.live,
            "Tick complete"
        );
        summary
    }

    /// Force a dead cell alive in both buffers, start its insertion memory,
    /// and hold it out of evaluation until the memory window has passed.
    ///
    /// Returns `false` without touching anything if the cell is already
    /// alive.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::OutOfBounds`] if `coord` is outside the lattice.
    pub fn insert_cell_at(&mut self, coord: Coordinate, now: Millis) -> Result<bool, EngineError> {
        let index = self.lattice.index_of(coord)?;
        if self.lattice.current_at(index) {
            return Ok(false);
        }
        self.lattice.set_both(coord, true)?;
        self.tracker.record_insertion(index, now);
        let memory_ms = self.tracker.windows().memory_ms();
        self.scheduler.defer(index, now, memory_ms, &mut self.rng);
        Ok(true)
    }

    /// Insert every dead cell whose center lies within `radius` of `point`.
    /// Returns how many cells were inserted.
    ///
    /// # Errors
    ///
    /// Propagates [`EngineError::OutOfBounds`], which only occurs if the
    /// geometry and lattice disagree on size.
    pub fn insert_near_point(
        &mut self,
        point: Point3,
        radius: f64,
        now: Millis,
    ) -> Result<usize, EngineError> {
        let mut inserted: usize = 0;
        for coord in self.geometry.cells_within(point, radius) {
            if self.insert_cell_at(coord, now)? {
                inserted = inserted.saturating_add(1);
            }
        }
        if inserted > 0 {
            debug!(inserted, now, "Inserted cells near point");
        }
        Ok(inserted)
    }

    /// Replace the bias. Takes effect from the next tick. Non-finite values
    /// are ignored.
    pub fn set_bias(&mut self, value: f64) {
        if self.bias.set(value) {
            debug!(bias = value, "Bias set");
        } else {
            warn!(value, "Ignoring non-finite bias");
        }
    }

    /// Step the bias through its configured cycle and return the new value.
    pub fn cycle_bias(&mut self) -> f64 {
        let bias = self.bias.cycle();
        info!(bias, "Bias cycled");
        bias
    }

    /// Current bias.
    pub const fn bias(&self) -> f64 {
        self.bias.value()
    }

    /// Snapshot of every live coordinate, in index order.
    pub fn live_cells(&self) -> Vec<Coordinate> {
        self.lattice.live_cells()
    }

    /// Number of live cells.
    pub fn live_count(&self) -> usize {
        self.lattice.live_count()
    }

    /// Whether `coord` is alive in the committed buffer.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::OutOfBounds`] if `coord` is outside the lattice.
    pub fn is_alive(&self, coord: Coordinate) -> Result<bool, EngineError> {
        self.lattice.get(coord)
    }

    /// Live Moore neighbors of `coord` in the committed buffer.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::OutOfBounds`] if `coord` is outside the lattice.
    pub fn neighbor_count(&self, coord: Coordinate) -> Result<u8, EngineError> {
        neighbors::count(&self.lattice, coord)
    }

    /// When `coord` next becomes eligible for evaluation.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::OutOfBounds`] if `coord` is outside the lattice.
    pub fn next_eligible_at(&self, coord: Coordinate) -> Result<Option<Millis>, EngineError> {
        let index = self.lattice.index_of(coord)?;
        Ok(self.scheduler.next_eligible_at(index))
    }

    /// When `coord` was last inserted, if ever.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::OutOfBounds`] if `coord` is outside the lattice.
    pub fn last_inserted_at(&self, coord: Coordinate) -> Result<Option<Millis>, EngineError> {
        let index = self.lattice.index_of(coord)?;
        Ok(self.tracker.last_inserted_at(index))
    }

    /// Insertion phase of `coord` at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::OutOfBounds`] if `coord` is outside the lattice.
    pub fn insertion_phase(
        &self,
        coord: Coordinate,
        now: Millis,
    ) -> Result<InsertionPhase, EngineError> {
        let index = self.lattice.index_of(coord)?;
        Ok(self.tracker.phase(index, now))
    }

    /// Render-scale hint for `coord` at `now`; see [`InsertionPhase::emphasis`].
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::OutOfBounds`] if `coord` is outside the lattice.
    pub fn emphasis(&self, coord: Coordinate, now: Millis) -> Result<f64, EngineError> {
        Ok(self.insertion_phase(coord, now)?.emphasis())
    }

    /// Edge length `N`.
    pub const fn size(&self) -> u16 {
        self.lattice.size()
    }

    /// World-space placement of cells.
    pub const fn geometry(&self) -> LatticeGeometry {
        self.geometry
    }

    /// Configured interaction radius for proximity insertion.
    pub const fn interaction_radius(&self) -> f64 {
        self.interaction_radius
    }
}

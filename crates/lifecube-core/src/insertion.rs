//! Insertion memory: temporary immunity for externally inserted cells.
//!
//! After a cell is inserted it passes through three phases, measured from
//! the insertion timestamp:
//!
//! | Elapsed                          | Phase        | Effect                               |
//! |----------------------------------|--------------|--------------------------------------|
//! | `< protected`                    | `Protected`  | forced alive                         |
//! | `protected ..< memory`           | `Transition` | forced alive with decaying chance    |
//! | `>= memory`, or never inserted   | `Settled`    | normal stochastic rule               |

use std::time::Duration;

use crate::error::EngineError;
use crate::scheduler::Millis;

/// Visual emphasis applied to a cell for the whole protected window.
const PROTECTED_EMPHASIS: f64 = 1.1;

/// Where a cell sits relative to its last insertion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InsertionPhase {
    /// Never inserted, or the memory window has fully elapsed.
    Settled,
    /// Inside the protected window: the cell cannot die.
    Protected,
    /// Between the protected and memory windows.
    Transition {
        /// Fraction of the transition band already elapsed, in `[0, 1)`.
        progress: f64,
    },
}

impl InsertionPhase {
    /// Whether normal rules apply unconditionally (including attrition).
    pub const fn is_settled(self) -> bool {
        matches!(self, Self::Settled)
    }

    /// Render-scale hint for consumers highlighting fresh insertions:
    /// `1.1` while protected, easing linearly to `1.0` across the
    /// transition, `1.0` once settled.
    pub const fn emphasis(self) -> f64 {
        match self {
            Self::Settled => 1.0,
            Self::Protected => PROTECTED_EMPHASIS,
            Self::Transition { progress } => (-0.1_f64).mul_add(progress, PROTECTED_EMPHASIS),
        }
    }
}

/// The two thresholds that shape insertion memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsertionWindows {
    /// Length of the forced-alive window.
    protected_ms: Millis,
    /// End of insertion memory; strictly greater than `protected_ms`.
    memory_ms: Millis,
}

impl InsertionWindows {
    /// Build the window pair.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] unless
    /// `memory_ms > protected_ms`.
    pub fn new(protected_ms: Millis, memory_ms: Millis) -> Result<Self, EngineError> {
        if memory_ms <= protected_ms {
            return Err(EngineError::invalid_config(format!(
                "memory window ({memory_ms}ms) must exceed protected window ({protected_ms}ms)"
            )));
        }
        Ok(Self {
            protected_ms,
            memory_ms,
        })
    }

    /// Length of the forced-alive window.
    pub const fn protected_ms(&self) -> Millis {
        self.protected_ms
    }

    /// End of insertion memory.
    pub const fn memory_ms(&self) -> Millis {
        self.memory_ms
    }

    /// Classify a time-since-insertion (`None` = never inserted).
    pub fn phase(&self, elapsed: Option<Millis>) -> InsertionPhase {
        let Some(elapsed) = elapsed else {
            return InsertionPhase::Settled;
        };
        if elapsed < self.protected_ms {
            return InsertionPhase::Protected;
        }
        if elapsed >= self.memory_ms {
            return InsertionPhase::Settled;
        }
        let into_band = Duration::from_millis(elapsed.saturating_sub(self.protected_ms));
        let band = Duration::from_millis(self.memory_ms.saturating_sub(self.protected_ms));
        InsertionPhase::Transition {
            progress: into_band.as_secs_f64() / band.as_secs_f64(),
        }
    }
}

/// Per-cell "last externally inserted at" timestamps, by flat lattice index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertionTracker {
    /// One entry per cell; `None` until the first insertion.
    last_inserted_at: Vec<Option<Millis>>,
    /// Protection thresholds.
    windows: InsertionWindows,
}

impl InsertionTracker {
    /// Create a tracker for `cells` cells, none of them inserted.
    pub fn new(cells: usize, windows: InsertionWindows) -> Self {
        Self {
            last_inserted_at: vec![None; cells],
            windows,
        }
    }

    /// Record that the cell at `index` was inserted at `now`.
    pub fn record_insertion(&mut self, index: usize, now: Millis) {
        if let Some(slot) = self.last_inserted_at.get_mut(index) {
            *slot = Some(now);
        }
    }

    /// Timestamp of the last insertion at `index`, if any.
    pub fn last_inserted_at(&self, index: usize) -> Option<Millis> {
        self.last_inserted_at.get(index).copied().flatten()
    }

    /// Time since the last insertion at `index`, or `None` if never inserted.
    ///
    /// A `now` earlier than the insertion reads as zero elapsed.
    pub fn elapsed_since_insertion(&self, index: usize, now: Millis) -> Option<Millis> {
        self.last_inserted_at(index)
            .map(|inserted| now.saturating_sub(inserted))
    }

    /// Insertion phase of the cell at `index` at `now`.
    pub fn phase(&self, index: usize, now: Millis) -> InsertionPhase {
        self.windows.phase(self.elapsed_since_insertion(index, now))
    }

    /// The configured thresholds.
    pub const fn windows(&self) -> InsertionWindows {
        self.windows
    }
}

//! The cubic lattice and its double-buffered cell storage.
//!
//! Cells live in two flat `Vec<bool>` buffers of identical length `N³`,
//! indexed by `x + y*N + z*N²`. Exactly one buffer is *current* (read by
//! neighbor counting and by consumers) and the other is *scratch* (written by
//! an in-progress tick). [`Lattice::swap`] flips which is which without
//! copying any cell data.
//!
//! # Invariants
//!
//! - Both buffers always hold exactly `N³` defined values.
//! - Scratch writes are never observable through [`Lattice::get`] until the
//!   next [`Lattice::swap`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Largest accepted edge length. Per-cell state for `128³` cells stays in
/// the tens of megabytes.
pub const MAX_LATTICE_SIZE: u16 = 128;

/// Integer position of a cell in the lattice, `0 <= axis < N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coordinate {
    /// Position along the x axis.
    pub x: u16,
    /// Position along the y axis.
    pub y: u16,
    /// Position along the z axis.
    pub z: u16,
}

impl Coordinate {
    /// Build a coordinate from its three components.
    pub const fn new(x: u16, y: u16, z: u16) -> Self {
        Self { x, y, z }
    }

    /// Return the coordinate displaced by `(dx, dy, dz)`, or `None` if the
    /// result leaves `[0, size)` on any axis.
    ///
    /// The lattice boundary is absorbing: there is no wraparound.
    pub const fn offset(self, dx: i16, dy: i16, dz: i16, size: u16) -> Option<Self> {
        let Some(x) = shift(self.x, dx, size) else {
            return None;
        };
        let Some(y) = shift(self.y, dy, size) else {
            return None;
        };
        let Some(z) = shift(self.z, dz, size) else {
            return None;
        };
        Some(Self { x, y, z })
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Shift one axis by a signed delta, rejecting results outside `[0, size)`.
const fn shift(value: u16, delta: i16, size: u16) -> Option<u16> {
    match value.checked_add_signed(delta) {
        Some(shifted) if shifted < size => Some(shifted),
        _ => None,
    }
}

/// Double-buffered boolean storage for an `N x N x N` lattice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lattice {
    /// Edge length `N`.
    size: u16,
    /// First buffer.
    front: Vec<bool>,
    /// Second buffer.
    back: Vec<bool>,
    /// When `true`, `front` is current and `back` is scratch.
    front_is_current: bool,
}

impl Lattice {
    /// Create an all-dead lattice with edge length `size`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] if `size` is zero or exceeds
    /// [`MAX_LATTICE_SIZE`].
    pub fn new(size: u16) -> Result<Self, EngineError> {
        let cells = checked_cell_count(size)?;
        Ok(Self {
            size,
            front: vec![false; cells],
            back: vec![false; cells],
            front_is_current: true,
        })
    }

    /// Edge length `N` of the lattice.
    pub const fn size(&self) -> u16 {
        self.size
    }

    /// Total number of cells, `N³`.
    pub const fn cell_count(&self) -> usize {
        self.front.len()
    }

    /// Whether `coord` lies inside the lattice.
    pub const fn contains(&self, coord: Coordinate) -> bool {
        coord.x < self.size && coord.y < self.size && coord.z < self.size
    }

    /// Flat buffer index of `coord`: `x + y*N + z*N²`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::OutOfBounds`] if `coord` is outside the lattice.
    pub fn index_of(&self, coord: Coordinate) -> Result<usize, EngineError> {
        if !self.contains(coord) {
            return Err(EngineError::OutOfBounds {
                coord,
                size: self.size,
            });
        }
        let n = usize::from(self.size);
        // In-bounds coordinates always produce an index below N³, which was
        // checked for overflow at construction.
        let index = usize::from(coord.z)
            .checked_mul(n)
            .and_then(|zn| zn.checked_add(usize::from(coord.y)))
            .and_then(|zy| zy.checked_mul(n))
            .and_then(|zyn| zyn.checked_add(usize::from(coord.x)));
        index.ok_or(EngineError::OutOfBounds {
            coord,
            size: self.size,
        })
    }

    /// Inverse of [`index_of`](Self::index_of). Returns `None` past the end.
    pub fn coord_at(&self, index: usize) -> Option<Coordinate> {
        if index >= self.cell_count() {
            return None;
        }
        let n = usize::from(self.size);
        let x = index.checked_rem(n)?;
        let rest = index.checked_div(n)?;
        let y = rest.checked_rem(n)?;
        let z = rest.checked_div(n)?;
        Some(Coordinate {
            x: u16::try_from(x).ok()?,
            y: u16::try_from(y).ok()?,
            z: u16::try_from(z).ok()?,
        })
    }

    /// State of `coord` in the current buffer.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::OutOfBounds`] if `coord` is outside the lattice.
    pub fn get(&self, coord: Coordinate) -> Result<bool, EngineError> {
        let index = self.index_of(coord)?;
        Ok(self.current_at(index))
    }

    /// Write the next state of `coord` into the scratch buffer.
    ///
    /// The write becomes visible only after [`swap`](Self::swap).
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::OutOfBounds`] if `coord` is outside the lattice.
    pub fn set_next(&mut self, coord: Coordinate, alive: bool) -> Result<(), EngineError> {
        let index = self.index_of(coord)?;
        self.set_next_at(index, alive);
        Ok(())
    }

    /// Write `alive` into both buffers at once, bypassing the tick cycle.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::OutOfBounds`] if `coord` is outside the lattice.
    pub fn set_both(&mut self, coord: Coordinate, alive: bool) -> Result<(), EngineError> {
        let index = self.index_of(coord)?;
        if let Some(cell) = self.front.get_mut(index) {
            *cell = alive;
        }
        if let Some(cell) = self.back.get_mut(index) {
            *cell = alive;
        }
        Ok(())
    }

    /// Promote the scratch buffer to current. O(1); no cell data is copied.
    pub const fn swap(&mut self) {
        self.front_is_current = !self.front_is_current;
    }

    /// Overwrite the scratch buffer with the current buffer, so every cell
    /// that is not re-evaluated keeps its state across the next swap.
    pub fn copy_current_into_scratch(&mut self) {
        if self.front_is_current {
            self.back.copy_from_slice(&self.front);
        } else {
            self.front.copy_from_slice(&self.back);
        }
    }

    /// Snapshot of every live coordinate in the current buffer, in index order.
    pub fn live_cells(&self) -> Vec<Coordinate> {
        self.current()
            .iter()
            .enumerate()
            .filter(|&(_, &alive)| alive)
            .filter_map(|(index, _)| self.coord_at(index))
            .collect()
    }

    /// Number of live cells in the current buffer.
    pub fn live_count(&self) -> usize {
        self.current().iter().filter(|&&alive| alive).count()
    }

    /// Current-buffer state by flat index. Out-of-range indices read as dead.
    pub(crate) fn current_at(&self, index: usize) -> bool {
        self.current().get(index).copied().unwrap_or(false)
    }

    /// Scratch-buffer write by flat index. Out-of-range indices are ignored.
    pub(crate) fn set_next_at(&mut self, index: usize, alive: bool) {
        if let Some(cell) = self.scratch_mut().get_mut(index) {
            *cell = alive;
        }
    }

    fn current(&self) -> &[bool] {
        if self.front_is_current {
            &self.front
        } else {
            &self.back
        }
    }

    fn scratch_mut(&mut self) -> &mut [bool] {
        if self.front_is_current {
            &mut self.back
        } else {
            &mut self.front
        }
    }
}

/// Compute `size³`, rejecting a zero or oversized edge length.
pub(crate) fn checked_cell_count(size: u16) -> Result<usize, EngineError> {
    if size == 0 {
        return Err(EngineError::invalid_config(
            "lattice size must be at least 1",
        ));
    }
    if size > MAX_LATTICE_SIZE {
        return Err(EngineError::invalid_config(format!(
            "lattice size {size} exceeds the maximum of {MAX_LATTICE_SIZE}"
        )));
    }
    let n = usize::from(size);
    n.checked_mul(n)
        .and_then(|sq| sq.checked_mul(n))
        .ok_or_else(|| EngineError::invalid_config("cell count overflows usize"))
}

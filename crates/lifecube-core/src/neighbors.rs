//! Moore-neighborhood counting over the current lattice buffer.
//!
//! Offsets that would leave the lattice contribute nothing. Cells on faces,
//! edges, and corners therefore see fewer effective neighbors (17, 11, and 7
//! at most) and drift toward death relative to interior cells.

use crate::error::EngineError;
use crate::lattice::{Coordinate, Lattice};

/// Largest possible live-neighbor count.
pub const MAX_NEIGHBORS: u8 = 26;

/// The 26 offsets of the 3D Moore neighborhood (every `{-1,0,1}³` vector
/// except the origin).
pub const MOORE_OFFSETS: [(i16, i16, i16); 26] = [
    (-1, -1, -1),
    (0, -1, -1),
    (1, -1, -1),
    (-1, 0, -1),
    (0, 0, -1),
    (1, 0, -1),
    (-1, 1, -1),
    (0, 1, -1),
    (1, 1, -1),
    (-1, -1, 0),
    (0, -1, 0),
    (1, -1, 0),
    (-1, 0, 0),
    (1, 0, 0),
    (-1, 1, 0),
    (0, 1, 0),
    (1, 1, 0),
    (-1, -1, 1),
    (0, -1, 1),
    (1, -1, 1),
    (-1, 0, 1),
    (0, 0, 1),
    (1, 0, 1),
    (-1, 1, 1),
    (0, 1, 1),
    (1, 1, 1),
];

/// Count live cells adjacent to `coord` in the current buffer.
///
/// # Errors
///
/// Returns [`EngineError::OutOfBounds`] if `coord` is outside the lattice.
pub fn count(lattice: &Lattice, coord: Coordinate) -> Result<u8, EngineError> {
    // Validate the center even though only its neighbors are read.
    lattice.index_of(coord)?;
    Ok(count_unchecked(lattice, coord))
}

/// Neighbor count for a coordinate already known to be in bounds.
pub(crate) fn count_unchecked(lattice: &Lattice, coord: Coordinate) -> u8 {
    let size = lattice.size();
    let mut live: u8 = 0;
    for &(dx, dy, dz) in &MOORE_OFFSETS {
        let Some(neighbor) = coord.offset(dx, dy, dz, size) else {
            continue;
        };
        let alive = lattice
            .index_of(neighbor)
            .is_ok_and(|index| lattice.current_at(index));
        if alive {
            live = live.saturating_add(1);
        }
    }
    live
}

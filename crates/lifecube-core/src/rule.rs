//! The bias-weighted stochastic transition rule.
//!
//! Given a cell's current state, its live-neighbor count, the bias terms, and
//! its insertion phase, [`next_state`] resolves the state the cell takes in
//! the scratch buffer. Every stochastic decision consumes exactly one fresh
//! uniform `[0, 1)` draw, in this order:
//!
//! 1. **Transition draw** (only in the transition band): survive forced-alive
//!    if the draw exceeds `progress * 0.8`; otherwise fall through.
//! 2. **Base draw** (alive cells always; dead cells only with 3 or 4
//!    neighbors): compare against the threshold table below.
//! 3. **Attrition draw** (only if the result is alive and the cell is
//!    settled): die if the draw exceeds `0.95 + survival`.
//!
//! | State | Neighbors | Outcome if `draw > threshold` | Threshold           |
//! |-------|-----------|-------------------------------|---------------------|
//! | alive | 4         | survive                       | `0.10 - survival`   |
//! | alive | 3 or 5    | survive                       | `0.40 - survival`   |
//! | alive | other     | survive                       | `0.99 - survival`   |
//! | dead  | 4         | birth                         | `0.70 - birth`      |
//! | dead  | 3         | birth                         | `0.95 - birth / 2`  |
//! | dead  | other     | stay dead (no draw)           | --                  |
//!
//! A fixed draw order keeps [`next_state`] reproducible under a seeded RNG.

use rand::Rng;

use crate::bias::BiasTerms;
use crate::insertion::InsertionPhase;

/// Scale applied to transition progress when deciding forced survival.
const TRANSITION_DECAY: f64 = 0.8;

/// Draws above `ATTRITION_FLOOR + survival` kill a settled live cell.
const ATTRITION_FLOOR: f64 = 0.95;

/// Everything the rule needs to know about one cell for one evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellContext {
    /// State in the current buffer.
    pub alive: bool,
    /// Live Moore neighbors in the current buffer, `0..=26`.
    pub neighbors: u8,
    /// Position relative to the cell's last insertion.
    pub phase: InsertionPhase,
}

/// Resolve the next state of one cell.
pub fn next_state(cell: CellContext, terms: BiasTerms, rng: &mut impl Rng) -> bool {
    match cell.phase {
        InsertionPhase::Protected => return true,
        InsertionPhase::Transition { progress } => {
            if draw(rng) > progress * TRANSITION_DECAY {
                return true;
            }
        }
        InsertionPhase::Settled => {}
    }

    let next = base_rule(cell.alive, cell.neighbors, terms, rng);

    if next && cell.phase.is_settled() && draw(rng) > ATTRITION_FLOOR + terms.survival {
        return false;
    }
    next
}

/// The base stochastic rule, with no insertion override and no attrition.
pub fn base_rule(alive: bool, neighbors: u8, terms: BiasTerms, rng: &mut impl Rng) -> bool {
    let threshold = base_threshold(alive, neighbors, terms);
    threshold.is_some_and(|t| draw(rng) > t)
}

/// Probability that the base rule yields a live cell.
///
/// Attrition and insertion overrides are not included.
pub fn base_probability(alive: bool, neighbors: u8, terms: BiasTerms) -> f64 {
    let threshold = base_threshold(alive, neighbors, terms);
    threshold.map_or(0.0, |t| (1.0 - t).clamp(0.0, 1.0))
}

/// Probability that a settled live cell escapes attrition.
pub fn attrition_survival(terms: BiasTerms) -> f64 {
    (ATTRITION_FLOOR + terms.survival).clamp(0.0, 1.0)
}

/// Threshold a draw must exceed for the base rule to yield alive, or `None`
/// when the outcome is certainly dead and no draw is taken.
fn base_threshold(alive: bool, neighbors: u8, terms: BiasTerms) -> Option<f64> {
    if alive {
        let death_weight = match neighbors {
            4 => 0.1,
            3 | 5 => 0.4,
            _ => 0.99,
        };
        Some(death_weight - terms.survival)
    } else {
        match neighbors {
            4 => Some(0.7 - terms.birth),
            3 => Some(0.95 - terms.birth / 2.0),
            _ => None,
        }
    }
}

fn draw(rng: &mut impl Rng) -> f64 {
    rng.random::<f64>()
}

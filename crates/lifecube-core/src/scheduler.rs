//! Per-cell deferred update scheduling.
//!
//! Every cell carries its own "next eligible at" timestamp. A tick only
//! re-evaluates cells whose timestamp has passed, and each evaluation pushes
//! the timestamp forward by the base interval plus a random jitter. Initial
//! timestamps are themselves jittered, so neighboring cells update at
//! pseudo-independent real-time rates instead of in synchronous generations.
//!
//! Timestamps are caller-supplied milliseconds ([`Millis`]); the scheduler
//! never reads a clock itself.

use rand::Rng;

/// Caller-supplied timestamp or duration in milliseconds.
pub type Millis = u64;

/// Per-cell "next eligible at" timers, indexed by flat lattice index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateScheduler {
    /// One entry per cell.
    next_eligible_at: Vec<Millis>,
    /// Minimum delay between two evaluations of the same cell.
    base_interval_ms: Millis,
    /// Exclusive upper bound of the random jitter added to every timer.
    max_offset_ms: Millis,
}

impl UpdateScheduler {
    /// Create timers for `cells` cells, each first due at
    /// `now + uniform(0, max_offset_ms)`.
    pub fn new(
        cells: usize,
        base_interval_ms: Millis,
        max_offset_ms: Millis,
        now: Millis,
        rng: &mut impl Rng,
    ) -> Self {
        let next_eligible_at = (0..cells)
            .map(|_| now.saturating_add(jitter(max_offset_ms, rng)))
            .collect();
        Self {
            next_eligible_at,
            base_interval_ms,
            max_offset_ms,
        }
    }

    /// Whether the cell at `index` may be evaluated at `now`.
    ///
    /// Unknown indices are never due.
    pub fn is_due(&self, index: usize, now: Millis) -> bool {
        self.next_eligible_at
            .get(index)
            .is_some_and(|&due| now >= due)
    }

    /// Re-arm the cell at `index` to `now + base_interval + jitter` and return
    /// the new timestamp.
    pub fn rearm(&mut self, index: usize, now: Millis, rng: &mut impl Rng) -> Millis {
        self.defer(index, now, self.base_interval_ms, rng)
    }

    /// Push the cell at `index` to `now + hold_ms + jitter` and return the new
    /// timestamp. Used to keep freshly inserted cells out of evaluation until
    /// their insertion memory has lapsed.
    pub fn defer(
        &mut self,
        index: usize,
        now: Millis,
        hold_ms: Millis,
        rng: &mut impl Rng,
    ) -> Millis {
        let next = now
            .saturating_add(hold_ms)
            .saturating_add(jitter(self.max_offset_ms, rng));
        if let Some(slot) = self.next_eligible_at.get_mut(index) {
            *slot = next;
        }
        next
    }

    /// The timestamp at which the cell at `index` next becomes due.
    pub fn next_eligible_at(&self, index: usize) -> Option<Millis> {
        self.next_eligible_at.get(index).copied()
    }

    /// Number of cells whose timers have expired at `now`.
    pub fn due_count(&self, now: Millis) -> usize {
        self.next_eligible_at
            .iter()
            .filter(|&&due| now >= due)
            .count()
    }

    /// Configured base interval.
    pub const fn base_interval_ms(&self) -> Millis {
        self.base_interval_ms
    }

    /// Configured jitter bound.
    pub const fn max_offset_ms(&self) -> Millis {
        self.max_offset_ms
    }
}

/// Uniform jitter in `[0, max_offset_ms)`; zero when jitter is disabled.
fn jitter(max_offset_ms: Millis, rng: &mut impl Rng) -> Millis {
    if max_offset_ms == 0 {
        0
    } else {
        rng.random_range(0..max_offset_ms)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    #[test]
    fn initial_timers_are_staggered_within_offset() {
        let mut rng = SmallRng::seed_from_u64(42);
        let scheduler = UpdateScheduler::new(1000, 100, 50, 10_000, &mut rng);

        let mut distinct = std::collections::BTreeSet::new();
        for index in 0..1000 {
            let due = scheduler.next_eligible_at(index).unwrap_or(0);
            assert!((10_000..10_050).contains(&due), "timer {due} out of range");
            distinct.insert(due);
        }
        // 1000 draws over 50 slots should hit well more than one value.
        assert!(distinct.len() > 10);
    }

    #[test]
    fn not_every_cell_is_due_at_construction_time() {
        let mut rng = SmallRng::seed_from_u64(7);
        let scheduler = UpdateScheduler::new(1000, 100, 50, 0, &mut rng);
        assert!(scheduler.due_count(0) < 1000);
        assert_eq!(scheduler.due_count(50), 1000);
    }

    #[test]
    fn rearm_adds_base_interval_plus_jitter() {
        let mut rng = SmallRng::seed_from_u64(1);
        let mut scheduler = UpdateScheduler::new(8, 100, 50, 0, &mut rng);

        for _ in 0..100 {
            let next = scheduler.rearm(3, 1_000, &mut rng);
            assert!((1_100..1_150).contains(&next));
            assert_eq!(scheduler.next_eligible_at(3), Some(next));
            assert!(!scheduler.is_due(3, 1_099));
            assert!(scheduler.is_due(3, next));
        }
    }

    #[test]
    fn defer_holds_cell_for_requested_window() {
        let mut rng = SmallRng::seed_from_u64(3);
        let mut scheduler = UpdateScheduler::new(8, 100, 50, 0, &mut rng);
        let next = scheduler.defer(0, 200, 1_000, &mut rng);
        assert!((1_200..1_250).contains(&next));
        assert!(!scheduler.is_due(0, 1_199));
    }

    #[test]
    fn zero_offset_means_lockstep() {
        let mut rng = SmallRng::seed_from_u64(9);
        let mut scheduler = UpdateScheduler::new(4, 100, 0, 500, &mut rng);
        assert_eq!(scheduler.due_count(500), 4);
        assert_eq!(scheduler.rearm(2, 500, &mut rng), 600);
    }

    #[test]
    fn unknown_index_is_never_due() {
        let mut rng = SmallRng::seed_from_u64(0);
        let scheduler = UpdateScheduler::new(2, 100, 50, 0, &mut rng);
        assert!(!scheduler.is_due(2, u64::MAX));
        assert_eq!(scheduler.next_eligible_at(2), None);
    }

    #[test]
    fn timers_saturate_instead_of_overflowing() {
        let mut rng = SmallRng::seed_from_u64(0);
        let mut scheduler = UpdateScheduler::new(1, 100, 50, u64::MAX, &mut rng);
        assert_eq!(scheduler.rearm(0, u64::MAX, &mut rng), u64::MAX);
    }
}

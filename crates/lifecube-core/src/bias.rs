//! The bias scalar and the survival/birth skew derived from it.
//!
//! A single `bias` value tilts the stochastic rule toward more permissive
//! outcomes. Values above `0.5` raise both survival and birth chances;
//! values at or below `0.5` leave the base rule untouched. The derived skew
//! is symmetric: survival and birth always receive the same term.
//!
//! Bias is changed only by explicit external calls, either a direct
//! [`BiasController::set`] or a discrete [`BiasController::cycle`] step
//! through a configured range.

use serde::Deserialize;

use crate::error::EngineError;

/// Gain applied to the centered bias before clamping.
const BIAS_GAIN: f64 = 0.4;

/// Upper clamp on the derived survival/birth terms.
const BIAS_TERM_CAP: f64 = 0.9;

/// Slack for "past the end of the range" comparisons after float stepping.
const RANGE_EPSILON: f64 = 1e-9;

/// How a cycle step that runs past `max` comes back into range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiasWrap {
    /// Jump straight back to `min` once the step exceeds `max`.
    #[default]
    Reset,
    /// Wrap modulo `max - min`, preserving the phase of the overshoot.
    Modulo,
}

/// A validated cyclic range for discrete bias stepping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiasCycle {
    /// Lowest value the cycle returns to.
    min: f64,
    /// Highest value the cycle may reach.
    max: f64,
    /// Increment per cycle step.
    step: f64,
    /// Behavior past `max`.
    wrap: BiasWrap,
}

impl BiasCycle {
    /// Build a cycle over `[min, max]` advancing by `step`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] if any value is non-finite,
    /// `min >= max`, or `step <= 0`.
    pub fn new(min: f64, max: f64, step: f64, wrap: BiasWrap) -> Result<Self, EngineError> {
        if !(min.is_finite() && max.is_finite() && step.is_finite()) {
            return Err(EngineError::invalid_config(
                "bias cycle values must be finite",
            ));
        }
        if min >= max {
            return Err(EngineError::invalid_config(format!(
                "bias cycle min ({min}) must be below max ({max})"
            )));
        }
        if step <= 0.0 {
            return Err(EngineError::invalid_config(format!(
                "bias cycle step ({step}) must be positive"
            )));
        }
        Ok(Self {
            min,
            max,
            step,
            wrap,
        })
    }

    /// Value following `current` in the cycle, rounded to two decimals.
    pub fn next(&self, current: f64) -> f64 {
        let stepped = current + self.step;
        let next = match self.wrap {
            BiasWrap::Reset => {
                if stepped > self.max + RANGE_EPSILON {
                    self.min
                } else {
                    stepped
                }
            }
            BiasWrap::Modulo => {
                let span = self.max - self.min;
                self.min + (stepped - self.min).rem_euclid(span)
            }
        };
        round_hundredths(next)
    }

    /// Lower end of the range.
    pub const fn min(&self) -> f64 {
        self.min
    }

    /// Upper end of the range.
    pub const fn max(&self) -> f64 {
        self.max
    }

    /// Increment per step.
    pub const fn step(&self) -> f64 {
        self.step
    }

    /// Wrap behavior.
    pub const fn wrap(&self) -> BiasWrap {
        self.wrap
    }
}

/// The survival and birth skew terms derived from one bias value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiasTerms {
    /// Added to every survival chance.
    pub survival: f64,
    /// Added to every birth chance (halved for the 3-neighbor case).
    pub birth: f64,
}

impl BiasTerms {
    /// Derive the terms: `clamp((bias - 0.5) * 2 * 0.4, 0, 0.9)` for both.
    pub fn from_bias(bias: f64) -> Self {
        let multiplier = (bias - 0.5) * 2.0;
        let term = (multiplier * BIAS_GAIN).clamp(0.0, BIAS_TERM_CAP);
        Self {
            survival: term,
            birth: term,
        }
    }

    /// Terms of a neutral bias (no skew).
    pub const fn neutral() -> Self {
        Self {
            survival: 0.0,
            birth: 0.0,
        }
    }
}

/// Owner of the engine's bias scalar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiasController {
    /// Current bias.
    value: f64,
    /// Discrete stepping range.
    cycle: BiasCycle,
}

impl BiasController {
    /// Create a controller starting at `initial`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] if `initial` is outside `[0, 1]`.
    pub fn new(initial: f64, cycle: BiasCycle) -> Result<Self, EngineError> {
        if !(0.0..=1.0).contains(&initial) {
            return Err(EngineError::invalid_config(format!(
                "initial bias ({initial}) must lie in [0, 1]"
            )));
        }
        Ok(Self {
            value: initial,
            cycle,
        })
    }

    /// Current bias.
    pub const fn value(&self) -> f64 {
        self.value
    }

    /// Replace the bias. Non-finite values are refused and `false` is
    /// returned; the previous bias stays in effect.
    pub const fn set(&mut self, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }
        self.value = value;
        true
    }

    /// Advance one step through the configured cycle and return the new bias.
    pub fn cycle(&mut self) -> f64 {
        self.value = self.cycle.next(self.value);
        self.value
    }

    /// Survival/birth terms for the current bias.
    pub fn terms(&self) -> BiasTerms {
        BiasTerms::from_bias(self.value)
    }

    /// The configured cycle.
    pub const fn cycle_range(&self) -> BiasCycle {
        self.cycle
    }
}

fn round_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn reset_cycle() -> BiasCycle {
        BiasCycle::new(0.25, 1.25, 0.25, BiasWrap::Reset).unwrap()
    }

    fn modulo_cycle() -> BiasCycle {
        BiasCycle::new(0.25, 1.25, 0.25, BiasWrap::Modulo).unwrap()
    }

    #[test]
    fn neutral_and_low_bias_give_no_skew() {
        for bias in [0.0, 0.25, 0.5] {
            let terms = BiasTerms::from_bias(bias);
            assert!(close(terms.survival, 0.0), "bias {bias}");
            assert!(close(terms.birth, 0.0), "bias {bias}");
        }
    }

    #[test]
    fn terms_are_symmetric_and_scaled() {
        let terms = BiasTerms::from_bias(0.59);
        assert!(close(terms.survival, 0.072));
        assert!(close(terms.survival, terms.birth));

        let full = BiasTerms::from_bias(1.0);
        assert!(close(full.survival, 0.4));
    }

    #[test]
    fn terms_are_capped() {
        let terms = BiasTerms::from_bias(10.0);
        assert!(close(terms.survival, 0.9));
        assert!(close(terms.birth, 0.9));
    }

    #[test]
    fn reset_cycle_returns_to_min_past_max() {
        let cycle = reset_cycle();
        let mut bias = 0.59;
        let mut seen = Vec::new();
        for _ in 0..4 {
            bias = cycle.next(bias);
            seen.push(bias);
        }
        let expected = [0.84, 1.09, 0.25, 0.5];
        for (got, want) in seen.iter().zip(expected) {
            assert!(close(*got, want), "got {got}, want {want}");
        }
    }

    #[test]
    fn reset_cycle_reaches_max_exactly() {
        let cycle = reset_cycle();
        assert!(close(cycle.next(1.0), 1.25));
        assert!(close(cycle.next(1.25), 0.25));
    }

    #[test]
    fn modulo_cycle_preserves_overshoot_phase() {
        let cycle = modulo_cycle();
        assert!(close(cycle.next(0.59), 0.84));
        assert!(close(cycle.next(0.84), 1.09));
        assert!(close(cycle.next(1.09), 0.34));
    }

    #[test]
    fn invalid_cycles_are_rejected() {
        assert!(BiasCycle::new(1.0, 1.0, 0.25, BiasWrap::Reset).is_err());
        assert!(BiasCycle::new(0.25, 1.25, 0.0, BiasWrap::Reset).is_err());
        assert!(BiasCycle::new(f64::NAN, 1.25, 0.25, BiasWrap::Modulo).is_err());
    }

    #[test]
    fn initial_bias_must_lie_in_unit_interval() {
        assert!(BiasController::new(1.2, reset_cycle()).is_err());
        assert!(BiasController::new(-0.1, reset_cycle()).is_err());
        assert!(BiasController::new(0.59, reset_cycle()).is_ok());
    }

    #[test]
    fn set_refuses_non_finite() {
        let mut controller = BiasController::new(0.59, reset_cycle()).unwrap();
        assert!(!controller.set(f64::NAN));
        assert!(close(controller.value(), 0.59));
        assert!(controller.set(0.9));
        assert!(close(controller.value(), 0.9));
    }

    #[test]
    fn controller_cycles_through_range() {
        let mut controller = BiasController::new(0.75, reset_cycle()).unwrap();
        assert!(close(controller.cycle(), 1.0));
        assert!(close(controller.cycle(), 1.25));
        assert!(close(controller.cycle(), 0.25));
    }

    #[test]
    fn wrap_mode_deserializes_from_snake_case() {
        let wrap: BiasWrap = serde_json::from_str("\"modulo\"").unwrap();
        assert_eq!(wrap, BiasWrap::Modulo);
    }
}

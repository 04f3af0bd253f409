//! A scripted tracked point standing in for live spatial input.
//!
//! A probe circles the lattice center in the x/y plane, starting at its
//! configured phase, and is "selecting" for a fixed span beginning at its
//! start time. While selecting, the frame loop inserts every dead cell
//! within the interaction radius of its position. Several probes may run at
//! once, one per tracked input.

use std::f64::consts::TAU;
use std::time::Duration;

use lifecube_core::config::ProbeConfig;
use lifecube_core::{Millis, Point3};

/// An orbiting insertion point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Probe {
    /// Whether the probe inserts at all.
    enabled: bool,
    /// Orbit center in world space.
    center: Point3,
    /// Orbit radius in world units.
    orbit_radius: f64,
    /// Angular speed.
    revolutions_per_second: f64,
    /// Starting angle as a fraction of a revolution.
    phase: f64,
    /// When the probe begins selecting.
    start_ms: Millis,
    /// How long the probe keeps selecting once started.
    active_ms: Millis,
}

impl Probe {
    /// Build a probe orbiting `center` as configured.
    pub const fn from_config(config: &ProbeConfig, center: Point3) -> Self {
        Self {
            enabled: config.enabled,
            center,
            orbit_radius: config.orbit_radius,
            revolutions_per_second: config.revolutions_per_second,
            phase: config.phase,
            start_ms: config.start_ms,
            active_ms: config.active_ms,
        }
    }

    /// Build one probe per entry, all orbiting `center`.
    pub fn from_configs(configs: &[ProbeConfig], center: Point3) -> Vec<Self> {
        configs
            .iter()
            .map(|config| Self::from_config(config, center))
            .collect()
    }

    /// Where the probe is at `elapsed` ms into the run, or `None` while it
    /// is not selecting.
    pub fn position(&self, elapsed: Millis) -> Option<Point3> {
        if elapsed < self.start_ms || self.is_finished(elapsed) {
            return None;
        }
        let seconds = Duration::from_millis(elapsed).as_secs_f64();
        let angle = TAU * self.revolutions_per_second.mul_add(seconds, self.phase);
        Some(Point3::new(
            self.orbit_radius.mul_add(angle.cos(), self.center.x),
            self.orbit_radius.mul_add(angle.sin(), self.center.y),
            self.center.z,
        ))
    }

    /// Whether the probe will never insert again.
    pub const fn is_finished(&self, elapsed: Millis) -> bool {
        !self.enabled || elapsed >= self.start_ms.saturating_add(self.active_ms)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config() -> ProbeConfig {
        ProbeConfig {
            enabled: true,
            orbit_radius: 0.1,
            revolutions_per_second: 0.25,
            phase: 0.0,
            start_ms: 0,
            active_ms: 8_000,
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn starts_on_positive_x_axis() {
        let probe = Probe::from_config(&config(), Point3::default());
        let p = probe.position(0).unwrap();
        assert!(close(p.x, 0.1) && close(p.y, 0.0) && close(p.z, 0.0));
    }

    #[test]
    fn quarter_revolution_after_one_second() {
        let probe = Probe::from_config(&config(), Point3::new(1.0, 2.0, 3.0));
        let p = probe.position(1_000).unwrap();
        assert!(close(p.x, 1.0), "x {}", p.x);
        assert!(close(p.y, 2.1), "y {}", p.y);
        assert!(close(p.z, 3.0));
    }

    #[test]
    fn stops_after_active_span() {
        let probe = Probe::from_config(&config(), Point3::default());
        assert!(probe.position(7_999).is_some());
        assert!(probe.position(8_000).is_none());
        assert!(probe.is_finished(8_000));
    }

    #[test]
    fn disabled_probe_never_selects() {
        let mut config = config();
        config.enabled = false;
        let probe = Probe::from_config(&config, Point3::default());
        assert!(probe.position(0).is_none());
        assert!(probe.is_finished(0));
    }

    #[test]
    fn half_phase_starts_opposite() {
        let mut config = config();
        config.phase = 0.5;
        let probe = Probe::from_config(&config, Point3::default());
        let p = probe.position(0).unwrap();
        assert!(close(p.x, -0.1), "x {}", p.x);
        assert!(close(p.y, 0.0), "y {}", p.y);
    }

    #[test]
    fn delayed_start_shifts_the_active_span() {
        let mut config = config();
        config.start_ms = 2_000;
        config.active_ms = 1_000;
        let probe = Probe::from_config(&config, Point3::default());
        assert!(probe.position(1_999).is_none());
        assert!(!probe.is_finished(1_999));
        assert!(probe.position(2_000).is_some());
        assert!(probe.position(2_999).is_some());
        assert!(probe.position(3_000).is_none());
        assert!(probe.is_finished(3_000));
    }

    #[test]
    fn one_probe_per_config_entry() {
        let mut late = config();
        late.start_ms = 500;
        let probes = Probe::from_configs(&[config(), late], Point3::default());
        assert_eq!(probes.len(), 2);
        assert!(probes.iter().any(|p| p.position(0).is_none()));
        assert!(probes.iter().all(|p| p.position(500).is_some()));
    }
}

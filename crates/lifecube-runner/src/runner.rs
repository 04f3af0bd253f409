//! Headless frame loop driving the engine.
//!
//! [`run_simulation`] plays the part of a render loop: every frame it polls
//! each [`Probe`] and inserts cells near it, ticks the engine once the tick
//! interval has elapsed, hands dirty frames to a [`FrameSink`], and steps
//! the bias on a fixed tick cadence. The run ends when either of these holds:
//!
//! - **Tick limit**: `max_ticks` ticks have run (`0` disables the limit).
//! - **Extinction**: no cell is alive and every probe has finished selecting.
//!
//! Time is measured from the start of the run with [`tokio::time::Instant`],
//! so tests can drive it with a paused clock.

use std::io::Write;

use lifecube_core::config::RunConfig;
use lifecube_core::{Coordinate, Millis, SeededEngine, TickSummary};
use serde::Serialize;
use tokio::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::error::RunnerError;
use crate::probe::Probe;

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SimulationEndReason {
    /// The configured tick limit was reached.
    MaxTicksReached,
    /// Every cell died after the probes stopped selecting.
    Extinction,
}

/// Result of a run.
#[derive(Debug)]
pub struct SimulationResult {
    /// The reason the run ended.
    pub end_reason: SimulationEndReason,
    /// The last tick summary, if any tick completed.
    pub final_summary: Option<TickSummary>,
    /// Total number of ticks executed.
    pub total_ticks: u64,
    /// Total number of cells inserted by the probes.
    pub total_inserted: usize,
}

/// One renderable frame: the live set after a tick that changed something.
#[derive(Debug, Clone, Serialize)]
pub struct Frame<'a> {
    /// Tick number, starting at 1.
    pub tick: u64,
    /// Milliseconds since the start of the run.
    pub now: Millis,
    /// Bias in effect for the tick.
    pub bias: f64,
    /// Live coordinates.
    pub live: &'a [Coordinate],
}

/// Receiver of dirty frames.
pub trait FrameSink: Send {
    /// Called after a tick that changed the live set.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError`] if the frame cannot be delivered.
    fn on_frame(&mut self, frame: &Frame<'_>) -> Result<(), RunnerError>;
}

/// Discards every frame.
pub struct NoOpSink;

impl FrameSink for NoOpSink {
    fn on_frame(&mut self, _frame: &Frame<'_>) -> Result<(), RunnerError> {
        Ok(())
    }
}

/// Writes each frame as one JSON object per line.
pub struct JsonLinesSink<W> {
    writer: W,
}

impl<W: Write + Send> JsonLinesSink<W> {
    /// Wrap a writer.
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write + Send> FrameSink for JsonLinesSink<W> {
    fn on_frame(&mut self, frame: &Frame<'_>) -> Result<(), RunnerError> {
        serde_json::to_writer(&mut self.writer, frame)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Run the frame loop until a termination condition is met.
///
/// # Errors
///
/// Returns [`RunnerError`] if an insertion fails or a frame cannot be
/// delivered.
pub async fn run_simulation(
    engine: &mut SeededEngine,
    run: &RunConfig,
    probes: &[Probe],
    sink: &mut dyn FrameSink,
) -> Result<SimulationResult, RunnerError> {
    let start = Instant::now();
    let radius = engine.interaction_radius();
    let mut last_tick_at: Millis = 0;
    let mut total_ticks: u64 = 0;
    let mut total_inserted: usize = 0;
    let mut inserted_since_frame = false;

    info!(
        max_ticks = run.max_ticks,
        tick_interval_ms = run.tick_interval_ms,
        frame_interval_ms = run.frame_interval_ms,
        bias = engine.bias(),
        probes = probes.len(),
        "Simulation starting"
    );

    loop {
        let now = elapsed_ms(start);

        // --- Probe insertion ---
        for point in probes.iter().filter_map(|probe| probe.position(now)) {
            let inserted = engine.insert_near_point(point, radius, now)?;
            if inserted > 0 {
                total_inserted = total_inserted.saturating_add(inserted);
                inserted_since_frame = true;
            }
        }

        // --- Tick, gated on the tick interval ---
        if now.saturating_sub(last_tick_at) > run.tick_interval_ms || total_ticks == 0 {
            let summary = engine.tick(now);
            last_tick_at = now;
            total_ticks = total_ticks.saturating_add(1);

            if summary.dirty || inserted_since_frame {
                let live = engine.live_cells();
                sink.on_frame(&Frame {
                    tick: total_ticks,
                    now,
                    bias: engine.bias(),
                    live: &live,
                })?;
                inserted_since_frame = false;
            }

            if total_ticks.checked_rem(run.bias_cycle_every_ticks) == Some(0) {
                engine.cycle_bias();
            }

            if summary.live == 0 && probes.iter().all(|probe| probe.is_finished(now)) {
                info!(tick = total_ticks, now, "No live cells left -- extinction");
                return Ok(SimulationResult {
                    end_reason: SimulationEndReason::Extinction,
                    final_summary: Some(summary),
                    total_ticks,
                    total_inserted,
                });
            }

            if run.max_ticks > 0 && total_ticks >= run.max_ticks {
                info!(
                    tick = total_ticks,
                    max_ticks = run.max_ticks,
                    "Tick limit reached"
                );
                return Ok(SimulationResult {
                    end_reason: SimulationEndReason::MaxTicksReached,
                    final_summary: Some(summary),
                    total_ticks,
                    total_inserted,
                });
            }

            debug!(tick = total_ticks, live = summary.live, "Frame ticked");
        }

        // --- Sleep for frame interval ---
        if run.frame_interval_ms > 0 {
            tokio::time::sleep(Duration::from_millis(run.frame_interval_ms)).await;
        } else {
            tokio::task::yield_now().await;
        }
    }
}

/// Log the end of a run.
pub fn log_simulation_end(result: &SimulationResult) {
    info!(
        reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        total_inserted = result.total_inserted,
        final_live = result.final_summary.as_ref().map(|s| s.live),
        "Simulation ended"
    );

    if let Some(ref summary) = result.final_summary {
        info!(
            now = summary.now,
            live = summary.live,
            births = summary.births,
            deaths = summary.deaths,
            "Final tick summary"
        );
    } else {
        warn!("Simulation ended with no ticks executed");
    }
}

fn elapsed_ms(start: Instant) -> Millis {
    Millis::try_from(start.elapsed().as_millis()).unwrap_or(Millis::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use lifecube_core::Point3;
    use lifecube_core::config::{ProbeConfig, SimulationConfig};

    use super::*;

    /// Collects frame sizes for inspection.
    #[derive(Default)]
    struct RecordingSink {
        frames: Vec<(u64, usize)>,
    }

    impl FrameSink for RecordingSink {
        fn on_frame(&mut self, frame: &Frame<'_>) -> Result<(), RunnerError> {
            self.frames.push((frame.tick, frame.live.len()));
            Ok(())
        }
    }

    fn small_config() -> SimulationConfig {
        let mut config = SimulationConfig::default();
        config.engine.lattice.size = 10;
        config.run.max_ticks = 5;
        config.run.probes = vec![orbiting(0.0)];
        config
    }

    fn orbiting(phase: f64) -> ProbeConfig {
        ProbeConfig {
            orbit_radius: 0.01,
            phase,
            ..ProbeConfig::default()
        }
    }

    fn setup(config: &SimulationConfig) -> (SeededEngine, Vec<Probe>) {
        let engine = SeededEngine::from_seed(&config.engine, 0).unwrap();
        let probes = Probe::from_configs(&config.run.probes, Point3::default());
        (engine, probes)
    }

    #[tokio::test(start_paused = true)]
    async fn stops_at_tick_limit() {
        let config = small_config();
        let (mut engine, probes) = setup(&config);
        let mut sink = NoOpSink;

        let result = run_simulation(&mut engine, &config.run, &probes, &mut sink)
            .await
            .unwrap();

        assert_eq!(result.end_reason, SimulationEndReason::MaxTicksReached);
        assert_eq!(result.total_ticks, 5);
        assert!(result.total_inserted > 0);
        assert!(result.final_summary.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn empty_lattice_without_probe_goes_extinct() {
        let mut config = small_config();
        config.run.probes = vec![ProbeConfig {
            enabled: false,
            ..ProbeConfig::default()
        }];
        let (mut engine, probes) = setup(&config);
        let mut sink = NoOpSink;

        let result = run_simulation(&mut engine, &config.run, &probes, &mut sink)
            .await
            .unwrap();

        assert_eq!(result.end_reason, SimulationEndReason::Extinction);
        assert_eq!(result.total_ticks, 1);
        assert_eq!(result.total_inserted, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn late_probe_keeps_an_empty_run_alive() {
        let mut config = small_config();
        config.run.max_ticks = 20;
        config.run.probes = vec![ProbeConfig {
            start_ms: 1_000,
            active_ms: 100,
            ..orbiting(0.0)
        }];
        let (mut engine, probes) = setup(&config);
        let mut sink = NoOpSink;

        let result = run_simulation(&mut engine, &config.run, &probes, &mut sink)
            .await
            .unwrap();

        assert!(result.total_ticks > 1);
        assert!(result.total_inserted > 0);
    }

    #[tokio::test(start_paused = true)]
    async fn second_probe_inserts_on_the_far_side() {
        let mut config = small_config();
        config.run.max_ticks = 1;
        let (mut one_engine, one) = setup(&config);
        let one_result = run_simulation(&mut one_engine, &config.run, &one, &mut NoOpSink)
            .await
            .unwrap();

        config.run.probes = vec![orbiting(0.0), orbiting(0.5)];
        let (mut engine, probes) = setup(&config);
        let result = run_simulation(&mut engine, &config.run, &probes, &mut NoOpSink)
            .await
            .unwrap();

        assert!(result.total_inserted > one_result.total_inserted);
        // Only the probe starting at -x reaches the third column.
        let reaches_far_side = |live: &[Coordinate]| live.iter().any(|c| c.x <= 3);
        assert!(!reaches_far_side(&one_engine.live_cells()));
        assert!(reaches_far_side(&engine.live_cells()));
    }

    #[tokio::test(start_paused = true)]
    async fn insertions_produce_frames() {
        let config = small_config();
        let (mut engine, probes) = setup(&config);
        let mut sink = RecordingSink::default();

        run_simulation(&mut engine, &config.run, &probes, &mut sink)
            .await
            .unwrap();

        let (first_tick, first_live) = sink.frames.first().copied().unwrap();
        assert_eq!(first_tick, 1);
        assert!(first_live > 0);
    }

    #[tokio::test(start_paused = true)]
    async fn bias_cycles_on_cadence() {
        let mut config = small_config();
        config.run.max_ticks = 4;
        config.run.bias_cycle_every_ticks = 2;
        let (mut engine, probes) = setup(&config);
        let mut sink = NoOpSink;

        run_simulation(&mut engine, &config.run, &probes, &mut sink)
            .await
            .unwrap();

        // 0.59 -> 0.84 -> 1.09
        let bias = engine.bias();
        assert!((bias - 1.09).abs() < 1e-9, "bias {bias}");
    }

    #[tokio::test(start_paused = true)]
    async fn json_lines_sink_writes_one_object_per_frame() {
        let config = small_config();
        let (mut engine, probes) = setup(&config);
        let mut buffer: Vec<u8> = Vec::new();
        let mut sink = JsonLinesSink::new(&mut buffer);

        run_simulation(&mut engine, &config.run, &probes, &mut sink)
            .await
            .unwrap();
        drop(sink);

        let output = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert!(!lines.is_empty());
        for line in lines {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            assert!(value.get("tick").is_some_and(serde_json::Value::is_u64));
            assert!(value.get("live").is_some_and(serde_json::Value::is_array));
        }
    }

    #[test]
    fn frame_serializes_coordinates() {
        let live = [Coordinate::new(1, 2, 3)];
        let frame = Frame {
            tick: 7,
            now: 700,
            bias: 0.59,
            live: &live,
        };
        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["live"][0]["x"], 1);
        assert_eq!(json["live"][0]["z"], 3);
        assert_eq!(json["tick"], 7);
    }
}

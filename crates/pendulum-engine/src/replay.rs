//! [`ReplayController`] re-drives an [`Engine`] from a recorded [`Recording`]
//! instead of live input, substituting the recorded delta sequence for
//! whatever delta the caller passes in.
//!
//! Validate the whole recording up front, before touching any engine state,
//! so a malformed recording never leaves the engine half-mutated; then drive
//! the tick loop and compare against any checkpoint hashes, reporting how far
//! replay got rather than failing all-or-nothing on the first mismatch.

use std::collections::BTreeMap;

use crate::engine::{Engine, GameState, Simulation};
use crate::error::ReplayError;
use crate::event_source::RecordedSource;
use crate::recorder::Recording;

/// Tolerance absorbing floating-point drift when a caller's fixed step
/// doesn't divide evenly into a recorded delta (e.g. ten `0.1` calls summing
/// to slightly less than `1.0`). Without it, a caller driving replay with
/// its own fractional-derived integer pacing could stall forever just
/// short of the next recorded delta.
const EPSILON: f64 = 1e-9;

/// What happened during one [`ReplayController::update`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplayOutcome {
    /// Zero or more recorded deltas were applied; replay may or may not be
    /// finished yet -- see `finished`.
    Continuing { replayed_ticks: u64, finished: bool },
    /// The engine was not `Playing`, so no recorded delta was applied.
    Paused { replayed_ticks: u64 },
    /// A checkpoint tick's recomputed state hash did not match the
    /// recording's. Replay halts here -- progress up to and including the
    /// diverging tick is preserved, not rolled back.
    Diverged {
        tick: u64,
        expected: String,
        actual: String,
    },
}

/// Replay progress, as reported by [`ReplayController::progress`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplayProgress {
    pub is_replaying: bool,
    /// `replayed_ticks / recording.total_ticks()`, clamped to `1.0`.
    /// Treated as `1.0` when the recording has zero total ticks.
    pub progress: f64,
    pub has_more_ticks: bool,
}

/// Wraps an [`Engine`] and drives it from a [`Recording`] instead of live
/// input.
///
/// Owns the engine outright for the duration of the replay -- there is no
/// way to construct two `ReplayController`s over the same engine instance at
/// once, which is how "no replay already in progress" is upheld for free in
/// Rust rather than needing its own runtime guard.
pub struct ReplayController<S: Simulation> {
    engine: Engine<S>,
    recording: Recording,
    checkpoints: BTreeMap<u64, String>,
    delta_index: usize,
    accum: f64,
    replayed_ticks: u64,
    finished: bool,
}

impl<S: Simulation> ReplayController<S> {
    /// Validate `recording` against `engine` and, on success, reset the
    /// engine and begin replay.
    ///
    /// All validation happens before any engine state is touched: a
    /// rejected recording leaves `engine` exactly as it was handed in, so
    /// the caller can inspect the error and retry with a corrected
    /// recording without having lost anything.
    ///
    /// Validated up front:
    /// - `engine` must be in [`GameState::Ready`].
    /// - `recording.seed` must match `engine.seed()`.
    /// - every `delta_ticks` entry must be positive.
    /// - `recording.checkpoints` ticks must be strictly increasing and each
    ///   `<= recording.total_ticks()`.
    pub fn new(engine: Engine<S>, recording: Recording) -> Result<Self, ReplayError> {
        if engine.state() != GameState::Ready {
            return Err(ReplayError::EngineNotReady(engine.state()));
        }
        if recording.seed != engine.seed() {
            return Err(ReplayError::SeedMismatch {
                expected: recording.seed.clone(),
                actual: engine.seed().to_owned(),
            });
        }
        if recording.delta_ticks.is_empty() && !recording.events.is_empty() {
            return Err(ReplayError::EmptyRecording);
        }
        for (index, &value) in recording.delta_ticks.iter().enumerate() {
            if value == 0 {
                return Err(ReplayError::NonPositiveDelta { index, value });
            }
        }
        let total_ticks = recording.total_ticks();
        let mut previous: Option<u64> = None;
        for &(tick, _) in &recording.checkpoints {
            if let Some(previous) = previous {
                if tick <= previous {
                    return Err(ReplayError::NonMonotonicTick { tick, previous });
                }
            }
            if tick > total_ticks {
                return Err(ReplayError::CheckpointOutOfRange { tick, total_ticks });
            }
            previous = Some(tick);
        }

        let mut engine = engine;
        engine.reset(None);
        engine.set_event_source(Box::new(RecordedSource::from_recording(&recording)));
        engine
            .start()
            .expect("engine was just reset to Ready; start() cannot fail here");

        let checkpoints = recording.checkpoints.iter().cloned().collect();
        Ok(Self {
            engine,
            recording,
            checkpoints,
            delta_index: 0,
            accum: 0.0,
            replayed_ticks: 0,
            finished: false,
        })
    }

    pub fn engine(&self) -> &Engine<S> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut Engine<S> {
        &mut self.engine
    }

    /// Consume the controller and reclaim the wrapped engine.
    pub fn into_engine(self) -> Engine<S> {
        self.engine
    }

    /// Total ticks the underlying engine has advanced since replay began.
    pub fn current_tick(&self) -> u64 {
        self.replayed_ticks
    }

    /// True once every recorded delta has been consumed, or replay was
    /// stopped early via [`ReplayController::stop`].
    pub fn finished(&self) -> bool {
        self.finished
    }

    pub fn progress(&self) -> ReplayProgress {
        let total = self.recording.total_ticks();
        let progress = if total == 0 {
            1.0
        } else {
            (self.replayed_ticks as f64 / total as f64).min(1.0)
        };
        ReplayProgress {
            is_replaying: !self.finished,
            progress,
            has_more_ticks: self.delta_index < self.recording.delta_ticks.len(),
        }
    }

    /// Advance replay by `external_delta` ticks of caller pacing.
    ///
    /// The caller's delta is only a pacing hint: it accumulates until it
    /// covers the next recorded delta (within [`EPSILON`]), at which point
    /// that recorded delta -- not the caller's -- is the one actually
    /// applied to the engine. A caller driving replay with a different
    /// step size than it was recorded with still reproduces the exact same
    /// sequence of [`Engine::update`] calls.
    ///
    /// Returns [`ReplayOutcome::Paused`] without consuming any of
    /// `external_delta` if the engine is not [`GameState::Playing`] (e.g.
    /// the caller paused it). Errors with [`ReplayError::AlreadyFinished`]
    /// if called again after replay has already finished or diverged.
    pub fn update(&mut self, external_delta: u64) -> Result<ReplayOutcome, ReplayError> {
        if self.finished {
            return Err(ReplayError::AlreadyFinished);
        }
        if self.engine.state() != GameState::Playing {
            return Ok(ReplayOutcome::Paused {
                replayed_ticks: self.replayed_ticks,
            });
        }

        self.accum += external_delta as f64;

        while self.delta_index < self.recording.delta_ticks.len() {
            let delta = self.recording.delta_ticks[self.delta_index];
            if self.accum + EPSILON < delta as f64 {
                break;
            }
            self.accum -= delta as f64;
            self.delta_index += 1;
            self.replayed_ticks += delta;
            self.engine.update(delta)?;

            let tick = self.engine.tick();
            if let Some(expected) = self.checkpoints.get(&tick) {
                let actual = self.engine.state_hash();
                if *expected != actual {
                    self.finished = true;
                    let _ = self.engine.pause();
                    tracing::warn!(tick, "replay diverged from recorded checkpoint");
                    return Ok(ReplayOutcome::Diverged {
                        tick,
                        expected: expected.clone(),
                        actual,
                    });
                }
            }
        }

        if self.delta_index == self.recording.delta_ticks.len() {
            self.finished = true;
            let _ = self.engine.pause();
            tracing::info!(replayed_ticks = self.replayed_ticks, "replay finished");
        }

        Ok(ReplayOutcome::Continuing {
            replayed_ticks: self.replayed_ticks,
            finished: self.finished,
        })
    }

    /// Stop replay early: pause the engine (if currently `Playing`) and
    /// mark the controller finished. `current_tick()` keeps reporting
    /// whatever was consumed before the stop.
    pub fn stop(&mut self) {
        if self.engine.state() == GameState::Playing {
            let _ = self.engine.pause();
        }
        self.finished = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::engine::SetupContext;
    use crate::event_source::LiveInputSource;
    use pendulum_core::entity::Entity;
    use pendulum_core::event::Event;
    use serde_json::Value;

    struct CounterSimulation;
    impl Simulation for CounterSimulation {
        fn setup(&mut self, ctx: &mut SetupContext<'_>) {
            ctx.registry.group_or_create_mut("counter").add(Box::new(Counter {
                id: "c1".into(),
                ticks: 0,
                destroyed: false,
            }));
        }
    }

    struct Counter {
        id: String,
        ticks: u64,
        destroyed: bool,
    }
    impl Entity for Counter {
        fn id(&self) -> &str {
            &self.id
        }
        fn type_name(&self) -> &str {
            "counter"
        }
        fn update(&mut self, _tick: u64, dt_ticks: u64) {
            self.ticks += dt_ticks;
        }
        fn destroyed(&self) -> bool {
            self.destroyed
        }
        fn destroy(&mut self) {
            self.destroyed = true;
        }
        fn snapshot(&self) -> Value {
            serde_json::json!({ "ticks": self.ticks })
        }
        fn handle_command(&mut self, method: &str, _params: &Value) -> Result<(), pendulum_core::error::CommandError> {
            if method == "reset" {
                self.ticks = 0;
                Ok(())
            } else {
                Err(pendulum_core::error::CommandError::UnknownMethod {
                    target_type: self.type_name().to_owned(),
                    method: method.to_owned(),
                })
            }
        }
    }

    fn fresh_engine(seed: &str) -> Engine<CounterSimulation> {
        Engine::new(GameConfig::new(seed), CounterSimulation, Box::new(LiveInputSource::new()))
    }

    fn record_a_run() -> (Recording, Vec<u64>) {
        let mut engine = fresh_engine("replay-seed");
        engine.start().unwrap();
        engine.start_recording();

        let mut source = LiveInputSource::new();
        source.push(Event::object_update("counter", "c1", "reset", Value::Null));
        engine.set_event_source(Box::new(source));

        engine.update(1).unwrap();
        engine.update(2).unwrap();
        engine.update(3).unwrap();

        let recording = engine.stop_recording().unwrap();
        (recording, vec![1, 2, 3])
    }

    #[test]
    fn replays_the_recorded_deltas_regardless_of_caller_pacing() {
        let (recording, _deltas) = record_a_run();
        let mut engine = fresh_engine("replay-seed");

        let mut controller = ReplayController::new(engine, recording).unwrap();
        // Drive with a caller step size unrelated to the recorded deltas.
        controller.update(10).unwrap();
        assert_eq!(controller.current_tick(), 6);
        assert!(controller.finished());
        assert_eq!(controller.engine().tick(), 6);
    }

    #[test]
    fn seed_mismatch_is_rejected_before_mutating_the_engine() {
        let (recording, _) = record_a_run();
        let engine = fresh_engine("different-seed");
        let err = ReplayController::new(engine, recording).unwrap_err();
        assert!(matches!(err, ReplayError::SeedMismatch { .. }));
    }

    #[test]
    fn engine_must_be_ready_to_begin_replay() {
        let (recording, _) = record_a_run();
        let mut engine = fresh_engine("replay-seed");
        engine.start().unwrap();
        let err = ReplayController::new(engine, recording).unwrap_err();
        assert!(matches!(err, ReplayError::EngineNotReady(GameState::Playing)));
    }

    #[test]
    fn pause_freezes_replay_progress() {
        let (recording, _) = record_a_run();
        let engine = fresh_engine("replay-seed");
        let mut controller = ReplayController::new(engine, recording).unwrap();

        controller.engine_mut().pause().unwrap();
        let outcome = controller.update(5).unwrap();
        assert!(matches!(outcome, ReplayOutcome::Paused { replayed_ticks: 0 }));
        assert_eq!(controller.current_tick(), 0);

        controller.engine_mut().resume().unwrap();
        controller.update(3).unwrap();
        assert_eq!(controller.current_tick(), 3);
    }

    #[test]
    fn auto_stops_exactly_when_every_delta_is_consumed() {
        let (recording, _) = record_a_run();
        let engine = fresh_engine("replay-seed");
        let mut controller = ReplayController::new(engine, recording).unwrap();

        assert!(controller.progress().has_more_ticks);
        controller.update(1).unwrap();
        assert!(!controller.finished());
        controller.update(2).unwrap();
        assert!(!controller.finished());
        let outcome = controller.update(3).unwrap();
        assert!(matches!(outcome, ReplayOutcome::Continuing { finished: true, .. }));
        assert!(controller.finished());
        assert!(!controller.progress().has_more_ticks);
        assert_eq!(controller.progress().progress, 1.0);
    }

    #[test]
    fn stop_preserves_ticks_replayed_so_far() {
        let (recording, _) = record_a_run();
        let engine = fresh_engine("replay-seed");
        let mut controller = ReplayController::new(engine, recording).unwrap();
        controller.update(1).unwrap();
        controller.stop();
        assert_eq!(controller.current_tick(), 1);
        assert!(controller.finished());
        assert_eq!(controller.engine().state(), GameState::Paused);
    }

    #[test]
    fn update_after_finished_errors() {
        let (recording, _) = record_a_run();
        let engine = fresh_engine("replay-seed");
        let mut controller = ReplayController::new(engine, recording).unwrap();
        controller.update(6).unwrap();
        assert!(controller.finished());
        let err = controller.update(1).unwrap_err();
        assert!(matches!(err, ReplayError::AlreadyFinished));
    }

    #[test]
    fn diverged_checkpoint_is_reported_without_losing_progress() {
        let mut engine = fresh_engine("checkpoint-seed");
        engine.start().unwrap();
        engine.start_recording();
        engine.update(1).unwrap();
        let mut recording = engine.stop_recording().unwrap();
        // Tamper with the checkpoint hash recorded at tick 1 so replay must
        // observe a state different from what was "recorded".
        recording.checkpoints = vec![(1, "not-the-real-hash".to_owned())];

        let replay_engine = fresh_engine("checkpoint-seed");
        let mut controller = ReplayController::new(replay_engine, recording).unwrap();
        let outcome = controller.update(1).unwrap();
        match outcome {
            ReplayOutcome::Diverged { tick, .. } => assert_eq!(tick, 1),
            other => panic!("expected Diverged, got {other:?}"),
        }
        assert!(controller.finished());
        assert_eq!(controller.current_tick(), 1, "progress made before divergence is preserved");
    }
}

//! Integration coverage for [`ReplayController`]: bit-faithful replay of a
//! recorded session, recording/replay validation, and pause semantics
//! mid-replay (scenarios S7-S9).

use pendulum_core::entity::Entity;
use pendulum_core::event::Event;
use pendulum_engine::prelude::*;
use serde_json::Value;

struct PlayerSim;
impl Simulation for PlayerSim {
    fn setup(&mut self, ctx: &mut SetupContext<'_>) {
        ctx.registry.group_or_create_mut("player").add(Box::new(Player {
            id: "p".into(),
            x: 0.0,
            y: 0.0,
            destroyed: false,
        }));
    }
}

struct Player {
    id: String,
    x: f64,
    y: f64,
    destroyed: bool,
}
impl Entity for Player {
    fn id(&self) -> &str {
        &self.id
    }
    fn type_name(&self) -> &str {
        "player"
    }
    fn update(&mut self, _tick: u64, dt_ticks: u64) {
        self.x += dt_ticks as f64;
    }
    fn destroyed(&self) -> bool {
        self.destroyed
    }
    fn destroy(&mut self) {
        self.destroyed = true;
    }
    fn snapshot(&self) -> Value {
        serde_json::json!({ "x": self.x, "y": self.y })
    }
    fn handle_command(&mut self, method: &str, params: &Value) -> Result<(), pendulum_core::error::CommandError> {
        if method == "set_position" {
            self.x = params["x"].as_f64().unwrap_or(self.x);
            self.y = params["y"].as_f64().unwrap_or(self.y);
            Ok(())
        } else {
            Err(pendulum_core::error::CommandError::UnknownMethod {
                target_type: self.type_name().to_owned(),
                method: method.to_owned(),
            })
        }
    }
}

fn engine_with_player(seed: &str, source: Box<dyn EventSource>) -> Engine<PlayerSim> {
    Engine::new(GameConfig::new(seed).with_checkpoint_interval(1), PlayerSim, source)
}

// S7: record a five-tick session that creates a player, applies two position
// updates and a repeating timer, then replay on a fresh engine; assert the
// final entity snapshot matches tick-by-tick.
#[test]
fn s7_replay_reproduces_the_exact_live_snapshot() {
    let mut live = engine_with_player("replay-bit-equality", Box::new(LiveInputSource::new()));
    live.timer_mut().set_interval(2, |_, _, _, _| {});
    live.start().unwrap();
    live.start_recording();

    let mut source = LiveInputSource::new();
    source.push(Event::object_update("player", "p", "set_position", serde_json::json!({"x": 1.0, "y": 1.0})));
    live.set_event_source(Box::new(source));
    live.update(1).unwrap();

    let mut source = LiveInputSource::new();
    source.push(Event::object_update("player", "p", "set_position", serde_json::json!({"x": 2.0, "y": 2.0})));
    live.set_event_source(Box::new(source));
    live.update(1).unwrap();

    live.update(1).unwrap();
    live.update(1).unwrap();
    live.update(1).unwrap();

    let live_final_snapshot = live.get_group("player").unwrap().get("p").unwrap().snapshot();
    let live_hash = live.state_hash();
    let recording = live.stop_recording().unwrap();
    assert_eq!(recording.total_ticks(), 5);

    let replay_engine = engine_with_player("replay-bit-equality", Box::new(LiveInputSource::new()));
    let mut controller = ReplayController::new(replay_engine, recording).unwrap();
    let outcome = controller.update(5).unwrap();
    assert!(matches!(outcome, ReplayOutcome::Continuing { finished: true, .. }));

    let replayed_snapshot = controller.engine().get_group("player").unwrap().get("p").unwrap().snapshot();
    assert_eq!(replayed_snapshot, live_final_snapshot);
    assert_eq!(controller.engine().state_hash(), live_hash);
}

// S8: validation rejects a malformed recording before touching engine state.
#[test]
fn s8_invalid_recordings_are_rejected_at_replay_entry() {
    let mut with_delta = Recording {
        seed: "validation".into(),
        game_config: Value::Null,
        events: Vec::new(),
        delta_ticks: vec![0, 1],
        metadata: Value::Null,
        checkpoints: Vec::new(),
    };
    let engine = engine_with_player("validation", Box::new(LiveInputSource::new()));
    let err = ReplayController::new(engine, with_delta.clone()).unwrap_err();
    assert!(matches!(err, ReplayError::NonPositiveDelta { index: 0, value: 0 }));

    with_delta.delta_ticks = Vec::new();
    with_delta.events.push((0, Event::user_input("k", Value::Null)));
    let engine = engine_with_player("validation", Box::new(LiveInputSource::new()));
    let err = ReplayController::new(engine, with_delta).unwrap_err();
    assert!(matches!(err, ReplayError::EmptyRecording));
}

// S9: pausing the engine mid-replay freezes progress; resuming continues
// from exactly where it left off and auto-stops once exhausted.
#[test]
fn s9_pause_freezes_replay_then_resume_drains_and_auto_stops() {
    let mut live = engine_with_player("pause-mid-replay", Box::new(LiveInputSource::new()));
    live.start().unwrap();
    live.start_recording();
    live.update(1).unwrap();
    live.update(1).unwrap();
    live.update(1).unwrap();
    let recording = live.stop_recording().unwrap();
    assert_eq!(recording.delta_ticks, vec![1, 1, 1]);

    let replay_engine = engine_with_player("pause-mid-replay", Box::new(LiveInputSource::new()));
    let mut controller = ReplayController::new(replay_engine, recording).unwrap();

    controller.engine_mut().pause().unwrap();
    let paused_outcome = controller.update(5).unwrap();
    assert!(matches!(paused_outcome, ReplayOutcome::Paused { replayed_ticks: 0 }));
    assert_eq!(controller.current_tick(), 0);

    controller.engine_mut().resume().unwrap();
    let outcome = controller.update(3).unwrap();
    assert_eq!(controller.current_tick(), 3);
    assert!(matches!(outcome, ReplayOutcome::Continuing { finished: true, .. }));
    assert!(controller.finished());
    assert!(!controller.progress().has_more_ticks);
}

//! The [`Engine`] state machine and its fixed-step tick loop.
//!
//! Rust has no subclassing, so an "engine subclass" contract becomes a
//! [`Simulation`] trait that `Engine` is generic over -- the same shape the
//! workspace uses elsewhere to make a fixed execution pipeline pluggable
//! without dynamic dispatch in the hot path.

use pendulum_core::entity::{Entity, EntityGroup};
use pendulum_core::event::Event;
use pendulum_core::prng::Prng;
use pendulum_core::registry::Registry;
use serde_json::Value;

use crate::config::GameConfig;
use crate::error::{ReplayError, StateError};
use crate::event_manager::EventManager;
use crate::event_source::EventSource;
use crate::recorder::{Recorder, Recording};
use crate::timer::Timer;

/// The engine's place in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameState {
    Ready,
    Playing,
    Paused,
    Ended,
}

/// The slice of engine state [`Simulation::setup`] is handed for the
/// duration of one call -- the registry, timer, and PRNG it needs to build
/// the initial world, passed by reference rather than a full handle back to
/// the [`Engine`] (which setup must not be able to call `update` or any
/// state transition on; none of those methods are reachable through this
/// struct).
pub struct SetupContext<'a> {
    pub registry: &'a mut Registry,
    pub timer: &'a mut Timer,
    pub prng: &'a mut Prng,
    pub config: &'a GameConfig,
}

/// The consumer-supplied hooks a [`Engine`] drives.
///
/// Stands in for the "subclass the engine" pattern a language with
/// inheritance would use: the consumer provides a type implementing this
/// trait and the engine is generic over it.
pub trait Simulation {
    /// Called by [`Engine::reset`], once per call, before `update` may run
    /// again. This is where initial entities are created and initial
    /// timers scheduled, via `ctx`; it must be deterministic under
    /// `ctx.config.seed` and cannot call `update` or any state-transition
    /// method, since no handle back to the engine is reachable from here.
    fn setup(&mut self, ctx: &mut SetupContext<'_>);

    /// Called once per dispatched `UserInput` event, after the engine has
    /// recorded it (if recording) and before entities are updated for the
    /// tick that produced it.
    fn on_user_input(&mut self, _event: &Event) {}
}

/// Drives a [`Registry`] of entities through a deterministic tick loop.
pub struct Engine<S: Simulation> {
    state: GameState,
    tick: u64,
    config: GameConfig,
    registry: Registry,
    timer: Timer,
    event_manager: EventManager,
    prng: Prng,
    simulation: S,
    recorder: Option<Recorder>,
}

impl<S: Simulation> Engine<S> {
    /// Construct a new engine and immediately run it through the same
    /// procedure [`Engine::reset`] performs -- seeding the PRNG from
    /// `config.seed` and invoking [`Simulation::setup`] once -- so a freshly
    /// constructed engine is ready for [`Engine::start`] without a separate
    /// explicit reset call.
    pub fn new(config: GameConfig, simulation: S, source: Box<dyn EventSource>) -> Self {
        let prng = Prng::from_seed(&config.seed);
        let mut engine = Self {
            state: GameState::Ready,
            tick: 0,
            config,
            registry: Registry::new(),
            timer: Timer::new(),
            event_manager: EventManager::new(source),
            prng,
            simulation,
            recorder: None,
        };
        engine.reset(None);
        engine
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn seed(&self) -> &str {
        &self.config.seed
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Look up one entity group by type name.
    pub fn get_group(&self, type_name: &str) -> Option<&EntityGroup> {
        self.registry.group(type_name)
    }

    /// Insert `entity` into the group named by `override_type`, or its own
    /// [`Entity::type_name`] if not given. Creates the group on first use.
    /// A no-op if an entity with the same id is already a member of that
    /// group.
    pub fn register_entity(&mut self, entity: Box<dyn Entity>, override_type: Option<&str>) {
        let type_name = override_type.map(str::to_owned).unwrap_or_else(|| entity.type_name().to_owned());
        self.registry.group_or_create_mut(&type_name).add(entity);
    }

    /// Names of every group that currently exists, sorted for deterministic
    /// diagnostics.
    pub fn get_registered_types(&self) -> Vec<&str> {
        self.registry.group_names_sorted()
    }

    /// Sweep destroyed members out of every group. Returns the total number
    /// of removals across all groups.
    pub fn clear_destroyed(&mut self) -> usize {
        self.registry.clear_destroyed()
    }

    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut Timer {
        &mut self.timer
    }

    pub fn prng(&self) -> &Prng {
        &self.prng
    }

    pub fn prng_mut(&mut self) -> &mut Prng {
        &mut self.prng
    }

    pub fn event_manager(&self) -> &EventManager {
        &self.event_manager
    }

    pub fn event_manager_mut(&mut self) -> &mut EventManager {
        &mut self.event_manager
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn simulation(&self) -> &S {
        &self.simulation
    }

    pub fn simulation_mut(&mut self) -> &mut S {
        &mut self.simulation
    }

    /// Swap the event source the engine polls from (e.g. live input to
    /// recorded, for replay).
    pub fn set_event_source(&mut self, source: Box<dyn EventSource>) {
        self.event_manager.set_source(source);
    }

    /// Start recording this run. Events dispatched and deltas applied from
    /// this point on are captured until [`Engine::stop_recording`].
    pub fn start_recording(&mut self) {
        self.recorder = Some(Recorder::new_with_checkpoint_interval(
            self.config.seed.clone(),
            self.config.extra.clone(),
            self.config.checkpoint_interval,
        ));
    }

    /// Stop recording and return the finished [`Recording`], if recording
    /// was active.
    pub fn stop_recording(&mut self) -> Option<Recording> {
        self.recorder.take().map(Recorder::finish)
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_some()
    }

    /// Return to `Ready`, replacing the stored config with `config` if
    /// given (keeping the current one otherwise), and run through the full
    /// re-initialization procedure: reseed the PRNG from `config.seed`,
    /// rewind the tick counter to 0, clear the registry and timer, rewind
    /// the active event source, drop any in-progress recording, and invoke
    /// [`Simulation::setup`] exactly once. Legal from every state.
    pub fn reset(&mut self, config: Option<GameConfig>) {
        if let Some(config) = config {
            self.config = config;
        }
        self.state = GameState::Ready;
        self.prng = Prng::from_seed(&self.config.seed);
        self.tick = 0;
        self.registry.clear();
        self.timer.reset();
        self.event_manager.reset();
        self.recorder = None;

        let mut ctx = SetupContext {
            registry: &mut self.registry,
            timer: &mut self.timer,
            prng: &mut self.prng,
            config: &self.config,
        };
        self.simulation.setup(&mut ctx);
        tracing::info!(state = ?self.state, seed = %self.config.seed, "engine reset");
    }

    /// `Ready -> Playing`.
    pub fn start(&mut self) -> Result<(), StateError> {
        if self.state != GameState::Ready {
            return Err(StateError::InvalidTransition {
                action: "start",
                from: self.state,
            });
        }
        self.state = GameState::Playing;
        tracing::info!(state = ?self.state, "engine started");
        Ok(())
    }

    /// `Playing -> Paused`.
    pub fn pause(&mut self) -> Result<(), StateError> {
        if self.state != GameState::Playing {
            return Err(StateError::InvalidTransition {
                action: "pause",
                from: self.state,
            });
        }
        self.state = GameState::Paused;
        tracing::info!(state = ?self.state, "engine paused");
        Ok(())
    }

    /// `Paused -> Playing`.
    pub fn resume(&mut self) -> Result<(), StateError> {
        if self.state != GameState::Paused {
            return Err(StateError::InvalidTransition {
                action: "resume",
                from: self.state,
            });
        }
        self.state = GameState::Playing;
        tracing::info!(state = ?self.state, "engine resumed");
        Ok(())
    }

    /// `Playing | Paused -> Ended`.
    pub fn end(&mut self) -> Result<(), StateError> {
        if self.state != GameState::Playing && self.state != GameState::Paused {
            return Err(StateError::InvalidTransition {
                action: "end",
                from: self.state,
            });
        }
        self.state = GameState::Ended;
        tracing::info!(state = ?self.state, "engine ended");
        Ok(())
    }

    /// Advance the simulation by `dt_ticks`. A no-op (returns an empty
    /// list, advances nothing) unless `state() == Playing`.
    ///
    /// In order: advance the tick counter, record the delta (if
    /// recording), poll and dispatch events due at or before the new tick,
    /// fire due timers, advance every entity, and -- if recording -- record
    /// this call's resulting content hash on a checkpoint boundary. Every
    /// dispatched event precedes every timer firing, which precedes every
    /// entity update.
    pub fn update(&mut self, dt_ticks: u64) -> Result<Vec<Event>, ReplayError> {
        if self.state != GameState::Playing {
            return Ok(Vec::new());
        }

        self.tick += dt_ticks;
        let tick = self.tick;

        if let Some(recorder) = self.recorder.as_mut() {
            recorder.record_delta(dt_ticks);
        }

        let events = self.event_manager.dispatch(tick, self.recorder.as_mut())?;
        for event in &events {
            match event {
                Event::UserInput { .. } => self.simulation.on_user_input(event),
                Event::ObjectUpdate {
                    target_type,
                    target_id,
                    method,
                    params,
                    ..
                } => self.apply_object_update(target_type, target_id, method, params),
            }
        }

        let fired = self.timer.update(tick, &mut self.registry, &mut self.prng);
        tracing::debug!(count = fired.len(), tick, "timers fired");

        self.registry.update_all(tick, dt_ticks);

        if self.recorder.is_some() {
            let hash = self.state_hash();
            if let Some(recorder) = self.recorder.as_mut() {
                recorder.record_checkpoint(tick, hash)?;
            }
        }

        Ok(events)
    }

    fn apply_object_update(&mut self, target_type: &str, target_id: &str, method: &str, params: &Value) {
        let Some(group) = self.registry.group_mut(target_type) else {
            tracing::warn!(target_type, target_id, method, "object_update targets an unknown entity type");
            return;
        };
        let Some(entity) = group.get_mut(target_id) else {
            tracing::warn!(target_type, target_id, method, "object_update targets a missing entity");
            return;
        };
        if entity.destroyed() {
            tracing::warn!(target_type, target_id, method, "object_update targets an already-destroyed entity");
            return;
        }
        if let Err(err) = entity.handle_command(method, params) {
            tracing::warn!(target_type, target_id, method, error = %err, "object_update command failed");
        }
    }

    /// A deterministic content hash of observable engine state: the tick
    /// counter plus every non-destroyed live entity's own
    /// [`snapshot`](pendulum_core::entity::Entity::snapshot), in
    /// group-name-sorted then per-group insertion order.
    pub fn state_hash(&self) -> String {
        let mut entities = Vec::new();
        for name in self.registry.group_names_sorted() {
            let group = self.registry.group(name).expect("name came from group_names_sorted");
            for entity in group.iter_active() {
                entities.push((name, entity.id().to_owned(), entity.snapshot()));
            }
        }
        let hashable = serde_json::json!({
            "tick": self.tick,
            "entities": entities,
        });
        let bytes = serde_json::to_vec(&hashable).expect("hashable state must serialize");
        blake3::hash(&bytes).to_hex().to_string()
    }
}

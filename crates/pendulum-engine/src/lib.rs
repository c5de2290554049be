//! pendulum-engine -- the tick-driven half of a deterministic simulation.
//!
//! Everything in this crate depends on "tick" as a concept: the [`Engine`]
//! state machine and its fixed-step loop, [`Timer`] callbacks, the
//! [`EventSource`]/[`EventManager`] pair that feeds events into a tick, the
//! [`Recorder`] that captures a run, and the [`ReplayController`] that
//! re-drives an engine from a recording instead of live input. Everything
//! that does *not* depend on tick -- entities, groups, the event shape, the
//! PRNG, the serializer registry -- lives in `pendulum-core`, which this
//! crate builds on.
//!
//! # Quick Start
//!
//! ```
//! use pendulum_engine::prelude::*;
//! use pendulum_core::entity::Entity;
//!
//! struct Ball { id: String, x: f64, destroyed: bool }
//!
//! impl Entity for Ball {
//!     fn id(&self) -> &str { &self.id }
//!     fn type_name(&self) -> &str { "ball" }
//!     fn update(&mut self, _tick: u64, dt_ticks: u64) { self.x += dt_ticks as f64; }
//!     fn destroyed(&self) -> bool { self.destroyed }
//!     fn destroy(&mut self) { self.destroyed = true; }
//! }
//!
//! struct Pong;
//! impl Simulation for Pong {
//!     fn setup(&mut self, ctx: &mut SetupContext<'_>) {
//!         ctx.registry.group_or_create_mut("ball").add(Box::new(Ball {
//!             id: "b1".into(),
//!             x: 0.0,
//!             destroyed: false,
//!         }));
//!     }
//! }
//!
//! let config = GameConfig::new("match-1");
//! let mut engine = Engine::new(config, Pong, Box::new(LiveInputSource::new()));
//! engine.start().unwrap();
//! engine.update(1).unwrap();
//! assert_eq!(engine.tick(), 1);
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod engine;
pub mod error;
pub mod event_manager;
pub mod event_source;
pub mod recorder;
pub mod replay;
pub mod timer;

/// Convenience re-exports for common engine usage.
pub mod prelude {
    pub use crate::config::GameConfig;
    pub use crate::engine::{Engine, GameState, SetupContext, Simulation};
    pub use crate::error::{ReplayError, StateError};
    pub use crate::event_manager::EventManager;
    pub use crate::event_source::{EventSource, LiveInputSource, RecordedSource};
    pub use crate::recorder::{Recorder, Recording};
    pub use crate::replay::{ReplayController, ReplayOutcome, ReplayProgress};
    pub use crate::timer::{Timer, TimerInfo, TimerScheduler};
}

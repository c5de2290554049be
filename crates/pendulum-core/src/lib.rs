//! pendulum-core -- data model for a deterministic tick-based simulation.
//!
//! This crate has no notion of time passing. It defines what an entity is,
//! how entities of one type are grouped and looked up, the event shape a
//! consumer dispatches each tick, a seeded PRNG, and a registry for
//! serializing opaque entity state to and from JSON. Everything that
//! depends on "tick" as a concept -- the engine loop, timers, recording,
//! replay -- lives in `pendulum-engine`.
//!
//! # Quick Start
//!
//! ```
//! use pendulum_core::prelude::*;
//!
//! struct Counter {
//!     id: String,
//!     ticks_elapsed: u64,
//!     destroyed: bool,
//! }
//!
//! impl Entity for Counter {
//!     fn id(&self) -> &str { &self.id }
//!     fn type_name(&self) -> &str { "counter" }
//!     fn update(&mut self, _tick: u64, dt_ticks: u64) { self.ticks_elapsed += dt_ticks; }
//!     fn destroyed(&self) -> bool { self.destroyed }
//!     fn destroy(&mut self) { self.destroyed = true; }
//! }
//!
//! let mut registry = Registry::new();
//! registry.group_or_create_mut("counter").add(Box::new(Counter {
//!     id: "c1".to_owned(),
//!     ticks_elapsed: 0,
//!     destroyed: false,
//! }));
//! registry.update_all(0, 1);
//! assert_eq!(registry.total_entity_count(), 1);
//! ```

#![deny(unsafe_code)]

pub mod entity;
pub mod error;
pub mod event;
pub mod prng;
pub mod registry;
pub mod serializer;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::entity::{Entity, EntityGroup, GroupEvent};
    pub use crate::error::{CommandError, SerializerError};
    pub use crate::event::Event;
    pub use crate::prng::Prng;
    pub use crate::registry::Registry;
    pub use crate::serializer::{Serializer, TypeKey};
}

//! The [`Event`] sum type dispatched through an event source each tick.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Something that happened on a given tick: either raw input from a live
/// source, or a command directed at one entity.
///
/// This is the only shape an [`crate::event::Event`] may take -- the engine
/// never needs a third variant, because anything else a consumer wants to
/// express is encodable as an `ObjectUpdate` against some entity.
///
/// The tick an event applies to is not carried on the event itself -- it
/// travels alongside it as the first element of the `(tick, Event)` pairs an
/// [`crate::event::Event`] is always stored and dispatched in (see
/// `pendulum_engine::recorder::Recording::events`). `timestamp` is the other
/// piece of per-event metadata carried alongside it: an opaque wall-clock
/// annotation, preserved verbatim and never read for dispatch ordering or
/// any other decision this crate makes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    /// Raw, opaque input from a live source (keyboard, network, script).
    UserInput {
        input_type: String,
        payload: Value,
        /// Opaque wall-clock annotation, e.g. milliseconds since epoch.
        /// Preserved verbatim; never inspected by this crate.
        #[serde(default)]
        timestamp: u64,
    },
    /// A command directed at one entity.
    ObjectUpdate {
        target_type: String,
        target_id: String,
        method: String,
        params: Value,
        #[serde(default)]
        timestamp: u64,
    },
}

impl Event {
    pub fn user_input(input_type: impl Into<String>, payload: Value) -> Self {
        Self::user_input_at(input_type, payload, 0)
    }

    pub fn user_input_at(input_type: impl Into<String>, payload: Value, timestamp: u64) -> Self {
        Event::UserInput {
            input_type: input_type.into(),
            payload,
            timestamp,
        }
    }

    pub fn object_update(
        target_type: impl Into<String>,
        target_id: impl Into<String>,
        method: impl Into<String>,
        params: Value,
    ) -> Self {
        Self::object_update_at(target_type, target_id, method, params, 0)
    }

    pub fn object_update_at(
        target_type: impl Into<String>,
        target_id: impl Into<String>,
        method: impl Into<String>,
        params: Value,
        timestamp: u64,
    ) -> Self {
        Event::ObjectUpdate {
            target_type: target_type.into(),
            target_id: target_id.into(),
            method: method.into(),
            params,
            timestamp,
        }
    }

    /// The opaque wall-clock annotation carried by either variant.
    pub fn timestamp(&self) -> u64 {
        match self {
            Event::UserInput { timestamp, .. } => *timestamp,
            Event::ObjectUpdate { timestamp, .. } => *timestamp,
        }
    }
}

//! [`EventManager`] polls the active [`EventSource`] each tick and, when
//! recording, forwards every dispatched event to a [`Recorder`].
//!
//! Storing `&mut Recorder` inside the manager while the engine also holds
//! the same `Recorder` elsewhere would be a live aliasing conflict in Rust,
//! so instead the engine remains the sole owner of the `Recorder` and hands
//! it to [`EventManager::dispatch`] for the duration of a single call -- the
//! same pattern the workspace uses elsewhere to pass a command buffer
//! through a tick rather than storing a reference to it.

use pendulum_core::event::Event;

use crate::error::ReplayError;
use crate::event_source::EventSource;
use crate::recorder::Recorder;

/// Owns the currently active [`EventSource`] and drives dispatch.
pub struct EventManager {
    source: Box<dyn EventSource>,
}

impl EventManager {
    pub fn new(source: Box<dyn EventSource>) -> Self {
        Self { source }
    }

    /// Replace the active event source (e.g. switching from live input to a
    /// recorded source for replay).
    pub fn set_source(&mut self, source: Box<dyn EventSource>) {
        self.source = source;
    }

    /// Whether the active source could still produce events on a later tick.
    pub fn has_more(&self) -> bool {
        self.source.has_more()
    }

    /// Rewind the active source to its initial position.
    pub fn reset(&mut self) {
        self.source.reset();
    }

    /// Poll the active source for `tick`, recording every event if
    /// `recorder` is present, and return the events for the caller to route
    /// (to `Simulation::on_user_input`, or to the target entity's
    /// `handle_command`).
    pub fn dispatch(
        &mut self,
        tick: u64,
        mut recorder: Option<&mut Recorder>,
    ) -> Result<Vec<Event>, ReplayError> {
        let events = self.source.poll(tick);
        if let Some(recorder) = recorder.as_deref_mut() {
            for event in &events {
                recorder.record_event(tick, event.clone())?;
            }
        }
        Ok(events)
    }
}

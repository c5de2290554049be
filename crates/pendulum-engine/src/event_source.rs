//! Where an [`crate::event_manager::EventManager`] pulls events from: a live
//! queue fed from outside this crate, or a recorded sequence being replayed.

use std::collections::VecDeque;

use pendulum_core::event::Event;

use crate::recorder::Recording;

/// Something an [`crate::event_manager::EventManager`] can poll for events
/// due on a given tick.
pub trait EventSource {
    /// Return every event due at or before `tick` that has not already been
    /// returned by a previous `poll`.
    fn poll(&mut self, tick: u64) -> Vec<Event>;

    /// Whether this source could still produce events on some future call
    /// to `poll`. A live source with an empty queue still has more (it may
    /// be fed later); a recorded source is exhausted once its cursor
    /// reaches the end.
    fn has_more(&self) -> bool;

    /// Rewind the source back to its initial position, e.g. for replaying
    /// the same recording from the start again.
    fn reset(&mut self);
}

/// An [`EventSource`] fed by pushing events from outside the engine (an
/// input adapter, a network listener, a script) as they occur.
#[derive(Default)]
pub struct LiveInputSource {
    queue: VecDeque<Event>,
}

impl LiveInputSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an event to be delivered on the next [`poll`](EventSource::poll).
    pub fn push(&mut self, event: Event) {
        self.queue.push_back(event);
    }

    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }
}

impl EventSource for LiveInputSource {
    fn poll(&mut self, _tick: u64) -> Vec<Event> {
        self.queue.drain(..).collect()
    }

    /// Always true: a live source might receive a push at any future tick.
    fn has_more(&self) -> bool {
        true
    }

    fn reset(&mut self) {
        self.queue.clear();
    }
}

/// An [`EventSource`] that replays a recorded `(tick, event)` sequence.
///
/// Events are consumed in the order they were recorded, never re-sorted:
/// `poll(t)` advances a cursor past the maximal prefix of remaining events
/// whose tick is `<= t`. If the underlying recording is out of order with
/// respect to tick (which nothing in this crate prevents a caller from
/// constructing), an event recorded early with a later tick silently masks
/// every event after it until `t` catches up -- this is a deliberate
/// consequence of the never-re-sort, never-go-backwards cursor discipline,
/// not a bug this type works around.
pub struct RecordedSource {
    events: Vec<(u64, Event)>,
    cursor: usize,
}

impl RecordedSource {
    /// Build a source from `(tick, event)` pairs in the exact order given.
    pub fn new(events: impl IntoIterator<Item = (u64, Event)>) -> Self {
        Self {
            events: events.into_iter().collect(),
            cursor: 0,
        }
    }

    /// Build a source that replays a [`Recording`]'s events in recorded order.
    pub fn from_recording(recording: &Recording) -> Self {
        Self::new(recording.events.clone())
    }

    pub fn remaining_count(&self) -> usize {
        self.events.len() - self.cursor
    }
}

impl EventSource for RecordedSource {
    fn poll(&mut self, tick: u64) -> Vec<Event> {
        let mut due = Vec::new();
        while self.cursor < self.events.len() && self.events[self.cursor].0 <= tick {
            due.push(self.events[self.cursor].1.clone());
            self.cursor += 1;
        }
        due
    }

    fn has_more(&self) -> bool {
        self.cursor < self.events.len()
    }

    fn reset(&mut self) {
        self.cursor = 0;
    }
}

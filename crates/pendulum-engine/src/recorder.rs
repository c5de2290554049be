//! [`Recorder`] captures everything needed to deterministically reproduce a
//! run, and [`Recording`] is the durable record it produces.

use pendulum_core::event::Event;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ReplayError;

/// The durable record of one deterministic run: enough to reconstruct an
/// identical sequence of [`crate::engine::Engine::update`] calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recording {
    pub seed: String,
    pub game_config: Value,
    /// Every dispatched event, tagged with the tick it was dispatched on.
    pub events: Vec<(u64, Event)>,
    /// The per-`update()` delta sequence, in call order.
    pub delta_ticks: Vec<u64>,
    /// Free-form, consumer-supplied metadata.
    pub metadata: Value,
    /// `(tick, content hash)` pairs taken at `checkpoint_interval`, used to
    /// detect replay divergence before the final tick. Empty when no
    /// interval was configured.
    pub checkpoints: Vec<(u64, String)>,
}

impl Recording {
    /// Total number of ticks this recording advances when replayed.
    pub fn total_ticks(&self) -> u64 {
        self.delta_ticks.iter().sum()
    }
}

/// Accumulates a [`Recording`] while an [`crate::engine::Engine`] runs live.
pub struct Recorder {
    seed: String,
    game_config: Value,
    events: Vec<(u64, Event)>,
    delta_ticks: Vec<u64>,
    metadata: Value,
    checkpoints: Vec<(u64, String)>,
    checkpoint_interval: Option<u64>,
    last_tick: Option<u64>,
}

impl Recorder {
    pub fn new(seed: String, game_config: Value) -> Self {
        Self::new_with_checkpoint_interval(seed, game_config, None)
    }

    /// `interval` of `None` or `Some(0)` means no checkpoints are recorded.
    pub fn new_with_checkpoint_interval(
        seed: String,
        game_config: Value,
        interval: Option<u64>,
    ) -> Self {
        Self {
            seed,
            game_config,
            events: Vec::new(),
            delta_ticks: Vec::new(),
            metadata: Value::Null,
            checkpoints: Vec::new(),
            checkpoint_interval: interval.filter(|&i| i > 0),
            last_tick: None,
        }
    }

    /// Record `event` as having been dispatched on `tick`.
    ///
    /// `tick` must be greater than or equal to the tick of the last
    /// recorded event or checkpoint.
    pub fn record_event(&mut self, tick: u64, event: Event) -> Result<(), ReplayError> {
        self.check_monotonic(tick)?;
        self.events.push((tick, event));
        Ok(())
    }

    /// Record the delta applied by one `update()` call.
    pub fn record_delta(&mut self, dt_ticks: u64) {
        self.delta_ticks.push(dt_ticks);
    }

    /// Record a checkpoint hash for `tick`, if a checkpoint interval was
    /// configured and `tick` falls on it. No-op otherwise.
    pub fn record_checkpoint(&mut self, tick: u64, state_hash: String) -> Result<(), ReplayError> {
        let Some(interval) = self.checkpoint_interval else {
            return Ok(());
        };
        if tick % interval != 0 {
            return Ok(());
        }
        self.check_monotonic(tick)?;
        self.checkpoints.push((tick, state_hash));
        Ok(())
    }

    pub fn set_metadata(&mut self, metadata: Value) {
        self.metadata = metadata;
    }

    pub fn finish(self) -> Recording {
        Recording {
            seed: self.seed,
            game_config: self.game_config,
            events: self.events,
            delta_ticks: self.delta_ticks,
            metadata: self.metadata,
            checkpoints: self.checkpoints,
        }
    }

    fn check_monotonic(&mut self, tick: u64) -> Result<(), ReplayError> {
        if let Some(previous) = self.last_tick {
            if tick < previous {
                return Err(ReplayError::NonMonotonicTick { tick, previous });
            }
        }
        self.last_tick = Some(tick);
        Ok(())
    }
}

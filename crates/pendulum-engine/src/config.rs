//! Configuration handed to an [`crate::engine::Engine`] at construction and
//! forwarded verbatim to [`crate::engine::Simulation::setup`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Everything the engine needs to start a deterministic run, plus whatever
/// free-form payload the consumer's simulation wants.
///
/// Serde-transparent so a consumer can load it from JSON directly rather
/// than writing a bespoke parser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Seed string fed to [`pendulum_core::prng::Prng::from_seed`].
    pub seed: String,
    /// How often (in ticks) the recorder should emit a checkpoint hash.
    /// `None` or `Some(0)` means no checkpoints are recorded.
    #[serde(default)]
    pub checkpoint_interval: Option<u64>,
    /// Consumer-defined configuration, passed through untouched.
    #[serde(default)]
    pub extra: Value,
}

impl GameConfig {
    pub fn new(seed: impl Into<String>) -> Self {
        Self {
            seed: seed.into(),
            checkpoint_interval: None,
            extra: Value::Null,
        }
    }

    pub fn with_checkpoint_interval(mut self, interval: u64) -> Self {
        self.checkpoint_interval = Some(interval);
        self
    }

    pub fn with_extra(mut self, extra: Value) -> Self {
        self.extra = extra;
        self
    }
}

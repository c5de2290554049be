//! Error types for the tick-driven half of the workspace.

/// Errors produced by [`crate::engine::Engine`] state transitions.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("cannot {action} from state {from:?}")]
    InvalidTransition {
        action: &'static str,
        from: crate::engine::GameState,
    },
}

/// Errors produced while constructing or driving a [`crate::replay::ReplayController`].
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("recording tick {tick} is not after previous tick {previous}")]
    NonMonotonicTick { tick: u64, previous: u64 },

    #[error("recording contains no delta_ticks to replay")]
    EmptyRecording,

    #[error("deltaTicks[{index}] must be positive, was {value}")]
    NonPositiveDelta { index: usize, value: u64 },

    #[error("checkpoint at tick {tick} exceeds recording length of {total_ticks} ticks")]
    CheckpointOutOfRange { tick: u64, total_ticks: u64 },

    #[error("engine must be in the Ready state to begin replay, was {0:?}")]
    EngineNotReady(crate::engine::GameState),

    #[error("recording was made with seed '{expected}', engine is configured with seed '{actual}'")]
    SeedMismatch { expected: String, actual: String },

    #[error("replay has already finished; construct a new ReplayController to replay again")]
    AlreadyFinished,
}

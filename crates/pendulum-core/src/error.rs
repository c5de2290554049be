//! Error types shared by the data-model layer.
//!
//! Mirrors the workspace convention of one `thiserror`-derived enum per
//! subsystem rather than a single catch-all error type: callers match on
//! the specific variant they care about instead of downcasting a string.

use crate::serializer::TypeKey;

/// Errors produced while an [`crate::entity::Entity`] handles an
/// `ObjectUpdate` command.
///
/// Never fatal to the caller: the engine logs and continues on either
/// variant rather than aborting the tick in progress.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// The entity does not recognize the requested method name.
    #[error("entity type '{target_type}' has no method named '{method}'")]
    UnknownMethod { target_type: String, method: String },

    /// The method is known but `params` could not be interpreted.
    #[error("invalid params for method '{method}': {details}")]
    InvalidParams { method: String, details: String },
}

/// Errors produced by the [`crate::serializer::Serializer`] registry.
#[derive(Debug, thiserror::Error)]
pub enum SerializerError {
    /// No serializer/deserializer pair has been registered under this name.
    #[error("type '{name}' not registered. Registered types: [{registered}]")]
    NotRegistered { name: String, registered: String },

    /// `name` is registered, but for a different Rust type than the one
    /// the caller is serializing/deserializing as.
    #[error("type '{name}' is registered for a different Rust type (id {registered_type:?})")]
    TypeMismatch {
        name: String,
        registered_type: TypeKey,
    },

    /// The registered deserialize function rejected the JSON value.
    #[error("failed to deserialize '{name}': {details}")]
    Deserialize { name: String, details: String },
}

//! Name-keyed registry of serialize/deserialize functions.
//!
//! Entity state needs to cross the boundary into a [`crate::event::Event`]
//! payload, a [`Recording`](../../pendulum_engine/struct.Recording.html)'s
//! metadata field, or a consumer-defined snapshot -- all as
//! [`serde_json::Value`] -- without this crate knowing any concrete entity
//! type. A [`Serializer`] is a runtime registry mapping a name to a pair of
//! type-erased closures that do the conversion, with a `TypeId` guard so a
//! caller can't accidentally deserialize `"position"` as the wrong Rust type.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::SerializerError;

/// Opaque identifier for a Rust type registered under some name.
///
/// Two different names registered for the same `T` share a `TypeKey`; the
/// same name can never be re-registered for a different `T`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeKey(TypeId);

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeKey({:?})", self.0)
    }
}

type SerializeFn = Box<dyn Fn(&dyn Any) -> Value + Send + Sync>;
type DeserializeFn = Box<dyn Fn(&Value) -> Result<Box<dyn Any>, String> + Send + Sync>;

struct Entry {
    type_key: TypeKey,
    serialize: SerializeFn,
    deserialize: DeserializeFn,
}

/// Registry of named serialize/deserialize pairs over [`serde_json::Value`].
///
/// Grounded in the same "register once, look up by name or type" pattern a
/// component registry uses, but operating on open-ended entity state rather
/// than archetype storage.
#[derive(Default)]
pub struct Serializer {
    by_name: HashMap<String, Entry>,
}

impl Serializer {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T` under `name`.
    ///
    /// Re-registering the same `name` for the same `T` is a no-op; doing so
    /// for a different `T` replaces the entry (the last registration for a
    /// name wins), matching how a consumer might re-register a type after
    /// a hot-reload.
    pub fn register<T>(&mut self, name: &str)
    where
        T: Serialize + DeserializeOwned + 'static,
    {
        let type_key = TypeKey(TypeId::of::<T>());
        let serialize: SerializeFn = Box::new(|value| {
            let typed = value
                .downcast_ref::<T>()
                .expect("downcast guarded by TypeKey check in Serializer::serialize");
            serde_json::to_value(typed).expect("T: Serialize must produce a valid Value")
        });
        let deserialize: DeserializeFn = Box::new(|value| {
            serde_json::from_value::<T>(value.clone())
                .map(|v| Box::new(v) as Box<dyn Any>)
                .map_err(|e| e.to_string())
        });
        self.by_name.insert(
            name.to_owned(),
            Entry {
                type_key,
                serialize,
                deserialize,
            },
        );
    }

    /// Serialize `value` using the function registered under `name`.
    pub fn serialize<T: 'static>(&self, name: &str, value: &T) -> Result<Value, SerializerError> {
        let entry = self.lookup(name)?;
        if entry.type_key.0 != TypeId::of::<T>() {
            return Err(SerializerError::TypeMismatch {
                name: name.to_owned(),
                registered_type: entry.type_key,
            });
        }
        Ok((entry.serialize)(value))
    }

    /// Deserialize a value registered under `name` back into `T`.
    pub fn deserialize<T: 'static>(&self, name: &str, value: &Value) -> Result<T, SerializerError> {
        let entry = self.lookup(name)?;
        if entry.type_key.0 != TypeId::of::<T>() {
            return Err(SerializerError::TypeMismatch {
                name: name.to_owned(),
                registered_type: entry.type_key,
            });
        }
        let boxed = (entry.deserialize)(value).map_err(|details| SerializerError::Deserialize {
            name: name.to_owned(),
            details,
        })?;
        Ok(*boxed
            .downcast::<T>()
            .expect("downcast guarded by TypeKey check in Serializer::deserialize"))
    }

    /// Names of every registered type, sorted for deterministic diagnostics.
    pub fn registered_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_name.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn lookup(&self, name: &str) -> Result<&Entry, SerializerError> {
        self.by_name.get(name).ok_or_else(|| SerializerError::NotRegistered {
            name: name.to_owned(),
            registered: self.registered_names().join(", "),
        })
    }
}

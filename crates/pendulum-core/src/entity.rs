//! The [`Entity`] trait and the ordered [`EntityGroup`] collection that
//! holds entities of one type.
//!
//! Unlike an archetype-based ECS, nothing here knows what an entity is made
//! of. The engine only ever needs four things from an entity: a stable id,
//! a way to advance it, a way to ask whether it should be reaped, and a way
//! to route a command at it. Everything else is the consumer's business.
//! Entities live behind `Box<dyn Entity>` so a single [`crate::registry::Registry`]
//! can hold many differently-typed groups side by side.

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::CommandError;

/// A unit of simulation state whose internals this crate never inspects.
///
/// `id` must be stable and unique within the [`EntityGroup`] the entity
/// lives in; `type_name` selects which group (and which [`Serializer`]
/// registration) the entity belongs to.
///
/// [`Serializer`]: crate::serializer::Serializer
pub trait Entity {
    /// Stable identifier, unique within this entity's group.
    fn id(&self) -> &str;

    /// Name of the group this entity belongs to in a [`crate::registry::Registry`].
    fn type_name(&self) -> &str;

    /// Advance this entity's state by `dt_ticks` logical ticks. Never called
    /// for an entity whose `destroyed()` is already true -- see
    /// [`EntityGroup::update_all`].
    fn update(&mut self, tick: u64, dt_ticks: u64);

    /// Whether this entity should be treated as gone. A destroyed entity
    /// remains a member of its group (and still counts toward `len()`) until
    /// something explicitly sweeps it out via [`EntityGroup::clear_destroyed`]
    /// or [`EntityGroup::clear`].
    fn destroyed(&self) -> bool;

    /// Mark this entity for removal. Idempotent: calling it again on an
    /// already-destroyed entity has no further effect. Implementors that
    /// need to notify a renderer of the false->true transition do so
    /// themselves -- this crate has no generic hook into a consumer type's
    /// own `destroy()` body.
    fn destroy(&mut self);

    /// Whether a consumer-side renderer should treat this entity as dirty.
    ///
    /// This crate only stores and exposes the flag; it never clears it or
    /// acts on it.
    fn needs_repaint(&self) -> bool {
        false
    }

    /// A JSON-representable snapshot of this entity's own state, used only
    /// to fold this entity into a deterministic content hash (e.g. a replay
    /// checkpoint). This is deliberately not a full serialize/deserialize
    /// round trip -- see [`crate::serializer::Serializer`] for that -- just
    /// enough to detect divergence.
    fn snapshot(&self) -> Value {
        Value::Null
    }

    /// Apply an `ObjectUpdate` command addressed to this entity.
    ///
    /// The default implementation rejects every method name. An unknown
    /// method is never fatal: callers log and continue.
    fn handle_command(&mut self, method: &str, _params: &Value) -> Result<(), CommandError> {
        Err(CommandError::UnknownMethod {
            target_type: self.type_name().to_owned(),
            method: method.to_owned(),
        })
    }
}

/// Notifications an [`EntityGroup`] emits to its subscribers on mutation.
///
/// Carries stable ids rather than entity references: a renderer or other
/// external observer looks the id back up through the owning
/// [`crate::registry::Registry`] rather than this crate handing out a
/// reference into its own storage (see the "handles, not back-references"
/// guidance for cross-subsystem observation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupEvent {
    /// A new entity was inserted. Does not fire for a duplicate `add` of an
    /// id already present.
    ItemAdded { id: String },
    /// An entity was removed by id. Does not fire if the id was absent.
    ItemRemoved { id: String },
    /// The group was emptied via [`EntityGroup::clear`] or
    /// [`EntityGroup::clear_and_destroy`]. Fires even if the group was
    /// already empty.
    ListCleared,
    /// [`EntityGroup::clear_destroyed`] swept out these ids, in the
    /// insertion order they held before removal. Only fires when at least
    /// one entity was actually removed.
    DestroyedItemsCleared { ids: Vec<String> },
}

type Listener = Box<dyn FnMut(&GroupEvent)>;

/// An insertion-ordered, id-keyed collection of boxed entities of one type.
///
/// Iteration order is always insertion order, independent of removals
/// elsewhere in the group -- removing entity `a` never reorders `b`
/// relative to `c`. Backed by [`IndexMap`] for exactly this guarantee.
///
/// Destroyed entities are *not* reaped automatically: [`EntityGroup::update_all`]
/// skips them but leaves them as members until [`EntityGroup::clear_destroyed`]
/// or [`EntityGroup::clear_and_destroy`] sweeps them out. `len()` therefore
/// counts destroyed-but-not-yet-swept members; [`EntityGroup::active_len`]
/// does not.
#[derive(Default)]
pub struct EntityGroup {
    entities: IndexMap<String, Box<dyn Entity>>,
    listeners: Vec<Listener>,
}

impl EntityGroup {
    /// Create an empty group.
    pub fn new() -> Self {
        Self {
            entities: IndexMap::new(),
            listeners: Vec::new(),
        }
    }

    /// Subscribe to this group's [`GroupEvent`] stream. Subscribers are
    /// notified synchronously, in subscription order, from inside whichever
    /// call triggered the event.
    pub fn subscribe(&mut self, listener: impl FnMut(&GroupEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    fn emit(&mut self, event: GroupEvent) {
        for listener in &mut self.listeners {
            listener(&event);
        }
    }

    /// Insert `entity`, keyed by `entity.id()`. A no-op if an entity with
    /// that id is already present -- no event fires and the existing
    /// member's insertion position is preserved.
    pub fn add(&mut self, entity: Box<dyn Entity>) {
        let id = entity.id().to_owned();
        if self.entities.contains_key(&id) {
            return;
        }
        self.entities.insert(id.clone(), entity);
        self.emit(GroupEvent::ItemAdded { id });
    }

    /// Remove and return the entity with the given id, if present. Emits
    /// `ItemRemoved` only when a member was actually removed.
    pub fn remove(&mut self, id: &str) -> Option<Box<dyn Entity>> {
        let removed = self.entities.shift_remove(id);
        if removed.is_some() {
            self.emit(GroupEvent::ItemRemoved { id: id.to_owned() });
        }
        removed
    }

    pub fn has(&self, id: &str) -> bool {
        self.entities.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&(dyn Entity)> {
        self.entities.get(id).map(|e| e.as_ref())
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Box<dyn Entity>> {
        self.entities.get_mut(id)
    }

    /// Iterate every member in insertion order, including destroyed ones.
    pub fn iter(&self) -> impl Iterator<Item = &(dyn Entity)> {
        self.entities.values().map(|e| e.as_ref())
    }

    /// Iterate non-destroyed members in insertion order.
    pub fn iter_active(&self) -> impl Iterator<Item = &(dyn Entity)> {
        self.entities.values().map(|e| e.as_ref()).filter(|e| !e.destroyed())
    }

    /// Total number of members, including destroyed-but-not-yet-swept ones.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Number of non-destroyed members.
    pub fn active_len(&self) -> usize {
        self.entities.values().filter(|e| !e.destroyed()).count()
    }

    /// Advance every non-destroyed entity by `dt_ticks`, in insertion order.
    /// Destroyed members are left untouched -- neither updated nor removed.
    pub fn update_all(&mut self, tick: u64, dt_ticks: u64) {
        for entity in self.entities.values_mut() {
            if !entity.destroyed() {
                entity.update(tick, dt_ticks);
            }
        }
    }

    /// Empty the group unconditionally. Emits `ListCleared` even if the
    /// group was already empty.
    pub fn clear(&mut self) {
        self.entities.clear();
        self.emit(GroupEvent::ListCleared);
    }

    /// Remove every member whose `destroyed()` is true, preserving the
    /// relative order of the survivors. Returns the ids removed, in the
    /// insertion order they held. Emits `DestroyedItemsCleared` with those
    /// ids, but only when at least one was removed -- observers therefore
    /// always see the group with the destroyed members already gone by the
    /// time the event reaches them.
    pub fn clear_destroyed(&mut self) -> Vec<String> {
        let mut removed = Vec::new();
        self.entities.retain(|id, e| {
            if e.destroyed() {
                removed.push(id.clone());
                false
            } else {
                true
            }
        });
        if !removed.is_empty() {
            self.emit(GroupEvent::DestroyedItemsCleared { ids: removed.clone() });
        }
        removed
    }

    /// Destroy every currently-active member (in insertion order), then
    /// empty the group. A member that was already destroyed before this
    /// call is not destroyed again. Emits a single `ListCleared`, matching
    /// plain `clear()` -- `destroy()` itself carries no group-level event.
    pub fn clear_and_destroy(&mut self) {
        for entity in self.entities.values_mut() {
            if !entity.destroyed() {
                entity.destroy();
            }
        }
        self.clear();
    }
}

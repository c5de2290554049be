//! [`Registry`] maps a type name to the [`EntityGroup`] holding entities of
//! that type.
//!
//! Grounded in the same name-keyed, deterministically-ordered lookup style
//! as a component registry, generalized from "Rust type -> id" to
//! "type name -> group of entities".

use indexmap::IndexMap;

use crate::entity::EntityGroup;

/// Map of type name to [`EntityGroup`], iterated in the order groups were
/// first touched.
#[derive(Default)]
pub struct Registry {
    groups: IndexMap<String, EntityGroup>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            groups: IndexMap::new(),
        }
    }

    /// Look up a group by type name, if it has been created.
    pub fn group(&self, type_name: &str) -> Option<&EntityGroup> {
        self.groups.get(type_name)
    }

    pub fn group_mut(&mut self, type_name: &str) -> Option<&mut EntityGroup> {
        self.groups.get_mut(type_name)
    }

    /// Look up a group by type name, creating an empty one on first use.
    pub fn group_or_create_mut(&mut self, type_name: &str) -> &mut EntityGroup {
        self.groups
            .entry(type_name.to_owned())
            .or_insert_with(EntityGroup::new)
    }

    /// Iterate every group in the order it was first created.
    pub fn all_groups(&self) -> impl Iterator<Item = (&str, &EntityGroup)> {
        self.groups.iter().map(|(name, group)| (name.as_str(), group))
    }

    /// Total number of entities across every group, including destroyed
    /// members not yet swept by `clear_destroyed`.
    pub fn total_entity_count(&self) -> usize {
        self.groups.values().map(EntityGroup::len).sum()
    }

    /// Total number of non-destroyed entities across every group.
    pub fn active_entity_count(&self) -> usize {
        self.groups.values().map(EntityGroup::active_len).sum()
    }

    /// Names of every group that currently exists, sorted for deterministic
    /// diagnostics.
    pub fn group_names_sorted(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.groups.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Advance every non-destroyed entity in every group by `dt_ticks`, in
    /// group-creation order and then per-group insertion order. Destroyed
    /// entities are skipped, not reaped -- sweep them explicitly with
    /// [`Registry::clear_destroyed`].
    pub fn update_all(&mut self, tick: u64, dt_ticks: u64) {
        for group in self.groups.values_mut() {
            group.update_all(tick, dt_ticks);
        }
    }

    /// Sweep destroyed members out of every group. Returns the total number
    /// of removals across all groups (one per destroyed group-membership,
    /// not per distinct entity -- an entity registered under two type names
    /// counts twice if destroyed in both).
    pub fn clear_destroyed(&mut self) -> usize {
        self.groups.values_mut().map(|group| group.clear_destroyed().len()).sum()
    }

    /// Drop every group and every entity within it.
    pub fn clear(&mut self) {
        self.groups.clear();
    }
}

use crate::core::{PersistenceError, Result};
use crate::metadata::Entity;
use crate::proxy::DirtyMap;
use std::collections::BTreeSet;

/// Runtime status of a managed wrapper.
///
/// `Stale` is set when a refresh discovered the backing row is gone; further
/// mutating operations on a stale wrapper fail fast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyStatus {
    Managed,
    Stale,
}

/// Shared state behind every generated per-entity wrapper: the decorated
/// instance, the dirty map, the loaded-property set, and the status flag.
///
/// Scalar mutation goes through [`ManagedState::mutate`], which applies the
/// change and records the property in one step; there is no raw `&mut`
/// escape hatch that could bypass tracking.
pub struct ManagedState<T: Entity> {
    entity: T,
    dirty: DirtyMap,
    loaded: BTreeSet<String>,
    status: ProxyStatus,
}

impl<T: Entity> ManagedState<T> {
    /// Wraps a freshly persisted or loaded instance; every property counts
    /// as loaded and nothing is dirty.
    pub fn managed(entity: T) -> Self {
        let loaded = T::metadata()
            .properties
            .iter()
            .filter(|p| !p.kind.is_counter() || T::metadata().is_clustered_counter())
            .map(|p| p.name.clone())
            .collect();
        Self {
            entity,
            dirty: DirtyMap::new(),
            loaded,
            status: ProxyStatus::Managed,
        }
    }

    pub fn entity(&self) -> &T {
        &self.entity
    }

    /// Applies a scalar mutation and marks the property dirty.
    pub fn mutate(&mut self, property: &str, f: impl FnOnce(&mut T)) {
        f(&mut self.entity);
        self.dirty.mark(property);
    }

    /// Projects a mutable borrow of a tracked container or counter field;
    /// those track structural changes themselves.
    pub fn project_mut<R: ?Sized>(&mut self, f: impl FnOnce(&mut T) -> &mut R) -> &mut R {
        f(&mut self.entity)
    }

    pub fn dirty(&self) -> &DirtyMap {
        &self.dirty
    }

    /// Explicitly marked properties plus collection properties whose
    /// containers saw structural mutation, in sorted order.
    pub fn effective_dirty(&self) -> Vec<String> {
        let mut all: BTreeSet<String> = self.dirty.sorted().into_iter().collect();
        all.extend(self.entity.dirty_collections());
        all.into_iter().collect()
    }

    pub fn loaded(&self) -> &BTreeSet<String> {
        &self.loaded
    }

    pub fn status(&self) -> ProxyStatus {
        self.status
    }

    pub fn ensure_usable(&self) -> Result<()> {
        match self.status {
            ProxyStatus::Managed => Ok(()),
            ProxyStatus::Stale => Err(PersistenceError::InvalidState(format!(
                "proxy for entity '{}' is stale; its backing row no longer exists",
                T::metadata().name
            ))),
        }
    }

    pub(crate) fn mark_stale(&mut self) {
        self.status = ProxyStatus::Stale;
    }

    /// Clears dirty tracking after a successful flush and folds counter
    /// deltas into their bases.
    pub(crate) fn settle(&mut self) {
        self.dirty.clear();
        self.entity.clear_collection_flags();
        self.entity.settle_counters();
    }

    /// Swaps in a freshly reloaded instance: dirty map and loaded set are
    /// reset to reflect the reload.
    pub(crate) fn replace_entity(&mut self, entity: T) {
        *self = Self::managed(entity);
    }

    pub(crate) fn entity_for_events(&mut self) -> &mut T {
        &mut self.entity
    }

    /// Returns the decorated instance, discarding tracking state. The same
    /// underlying instance comes back regardless of how long it was wrapped.
    pub fn into_entity(self) -> T {
        self.entity
    }
}

/// Implemented by generated wrapper types; connects a proxy back to its
/// entity type and state.
pub trait Proxied: Send + 'static {
    type Entity: Entity<Proxy = Self>;

    fn wrap(state: ManagedState<Self::Entity>) -> Self;
    fn state(&self) -> &ManagedState<Self::Entity>;
    fn state_mut(&mut self) -> &mut ManagedState<Self::Entity>;
    fn into_state(self) -> ManagedState<Self::Entity>;
}

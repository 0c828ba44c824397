use crate::core::PersistenceError;
use crate::metadata::Entity;
use serde::{Deserialize, Serialize};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

/// Lifecycle phase around a persistence operation.
///
/// Pre phases fire synchronously before any I/O; post phases fire only after
/// the combined execution future completed successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    PrePersist,
    PostPersist,
    PreUpdate,
    PostUpdate,
    PreRemove,
    PostRemove,
    PostLoad,
}

impl Phase {
    pub fn is_pre(&self) -> bool {
        matches!(self, Self::PrePersist | Self::PreUpdate | Self::PreRemove)
    }
}

/// Type-erased description of a lifecycle event, deliverable after the
/// owning operation's entity has been handed back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub entity: String,
    pub phase: Phase,
    pub key: String,
}

impl EventRecord {
    pub fn new(entity: impl Into<String>, phase: Phase, key: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            phase,
            key: key.into(),
        }
    }
}

/// Typed per-entity hook with mutable access to the instance.
///
/// Runs synchronously around immediate-mode operations; batch mode cannot
/// retain the instance until `end_batch`, so only [`LifecycleListener`]s see
/// deferred post events there.
pub trait Interceptor<T>: Send + Sync {
    fn intercept(&self, entity: &mut T, phase: Phase);
}

/// Global observer receiving every [`EventRecord`], in firing order.
pub trait LifecycleListener: Send + Sync {
    fn on_event(&self, event: &EventRecord);
}

/// Per-call completion hook; invoked exactly once, last, with the outcome.
pub trait CompletionListener: Send + Sync {
    fn on_complete(&self, error: Option<&PersistenceError>);
}

/// Holds typed interceptors (per entity type) and global listeners.
///
/// Typed interceptors are stored per `TypeId` and downcast on dispatch, so
/// registration stays statically typed without a trait-object-per-entity
/// explosion.
#[derive(Default)]
pub struct InterceptorRegistry {
    typed: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    listeners: Vec<Arc<dyn LifecycleListener>>,
}

impl InterceptorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: Entity>(&mut self, interceptor: Arc<dyn Interceptor<T>>) {
        let slot = self
            .typed
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(Vec::<Arc<dyn Interceptor<T>>>::new()));
        if let Some(list) = slot.downcast_mut::<Vec<Arc<dyn Interceptor<T>>>>() {
            list.push(interceptor);
        }
    }

    pub fn add_listener(&mut self, listener: Arc<dyn LifecycleListener>) {
        self.listeners.push(listener);
    }

    /// Runs typed interceptors for `T`, then notifies global listeners.
    pub fn fire<T: Entity>(&self, entity: &mut T, phase: Phase, key: &str) {
        self.fire_typed(entity, phase);
        self.notify(&EventRecord::new(T::metadata().name.clone(), phase, key));
    }

    /// Runs typed interceptors only; used for immediate-mode post phases
    /// whose records are delivered through the flush unit's event queue.
    pub fn fire_typed<T: Entity>(&self, entity: &mut T, phase: Phase) {
        if let Some(slot) = self.typed.get(&TypeId::of::<T>())
            && let Some(list) = slot.downcast_ref::<Vec<Arc<dyn Interceptor<T>>>>()
        {
            for interceptor in list {
                interceptor.intercept(entity, phase);
            }
        }
    }

    /// Notifies global listeners only; used for deferred records and for
    /// operations that carry no entity instance.
    pub fn notify(&self, record: &EventRecord) {
        for listener in &self.listeners {
            listener.on_event(record);
        }
    }

    pub fn has_typed<T: Entity>(&self) -> bool {
        self.typed.contains_key(&TypeId::of::<T>())
    }
}

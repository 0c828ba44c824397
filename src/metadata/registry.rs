use crate::core::{PersistenceError, Result};
use crate::metadata::{Entity, EntityMeta};
use std::any::TypeId;
use std::collections::HashMap;

/// Explicit registration of entity types known to a manager.
///
/// Replaces runtime schema scanning: every type must be registered at
/// construction, and metadata is validated exactly once.
#[derive(Default)]
pub struct MetadataRegistry {
    by_type: HashMap<TypeId, &'static EntityMeta>,
    by_name: HashMap<String, &'static EntityMeta>,
}

impl MetadataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: Entity>(&mut self) -> Result<()> {
        let meta = T::metadata();
        if self.by_type.insert(TypeId::of::<T>(), meta).is_some() {
            return Err(PersistenceError::Metadata(format!(
                "entity '{}' registered twice",
                meta.name
            )));
        }
        if let Some(previous) = self.by_name.insert(meta.name.clone(), meta) {
            return Err(PersistenceError::Metadata(format!(
                "entity name '{}' already mapped to table '{}'",
                meta.name, previous.table
            )));
        }
        Ok(())
    }

    pub fn meta_of<T: Entity>(&self) -> Result<&'static EntityMeta> {
        self.by_type.get(&TypeId::of::<T>()).copied().ok_or_else(|| {
            PersistenceError::Metadata(format!(
                "entity '{}' is not registered with this manager",
                T::metadata().name
            ))
        })
    }

    pub fn meta_by_name(&self, name: &str) -> Option<&'static EntityMeta> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }
}

use crate::core::{AccessKind, ConsistencyLevel, PersistenceError, Result};
use crate::metadata::{KeyShape, PropertyKind, PropertyMeta};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Per-entity schema description: key shape, ordered property descriptors,
/// counter classification, and default consistency levels.
///
/// Immutable once built; one `'static` instance per entity type, shared
/// read-only across all contexts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityMeta {
    pub name: String,
    pub keyspace: Option<String>,
    pub table: String,
    pub properties: Vec<PropertyMeta>,
    pub key_shape: KeyShape,
    pub read_consistency: Option<ConsistencyLevel>,
    pub write_consistency: Option<ConsistencyLevel>,
}

impl EntityMeta {
    pub fn builder(name: impl Into<String>, table: impl Into<String>) -> EntityMetaBuilder {
        EntityMetaBuilder {
            name: name.into(),
            keyspace: None,
            table: table.into(),
            properties: Vec::new(),
            read_consistency: None,
            write_consistency: None,
        }
    }

    pub fn qualified_table(&self) -> String {
        match &self.keyspace {
            Some(ks) => format!("{ks}.{}", self.table),
            None => self.table.clone(),
        }
    }

    pub fn property(&self, name: &str) -> Option<&PropertyMeta> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn expect_property(&self, name: &str) -> Result<&PropertyMeta> {
        self.property(name).ok_or_else(|| {
            PersistenceError::Metadata(format!(
                "entity '{}' has no property '{name}'",
                self.name
            ))
        })
    }

    /// Key properties in key order: partition components first, then
    /// clustering components, each sorted by declared position.
    pub fn key_properties(&self) -> Vec<&PropertyMeta> {
        let mut partition: Vec<&PropertyMeta> = self
            .properties
            .iter()
            .filter(|p| p.kind == PropertyKind::PartitionKey)
            .collect();
        partition.sort_by_key(|p| p.key_position.unwrap_or(0));
        let mut clustering: Vec<&PropertyMeta> = self
            .properties
            .iter()
            .filter(|p| p.kind == PropertyKind::ClusteringKey)
            .collect();
        clustering.sort_by_key(|p| p.key_position.unwrap_or(0));
        partition.extend(clustering);
        partition
    }

    /// Properties an insert statement covers: everything except counters.
    pub fn insertable_properties(&self) -> Vec<&PropertyMeta> {
        self.properties
            .iter()
            .filter(|p| !p.kind.is_counter())
            .collect()
    }

    pub fn counter_properties(&self) -> Vec<&PropertyMeta> {
        self.properties
            .iter()
            .filter(|p| p.kind.is_counter())
            .collect()
    }

    pub fn has_counters(&self) -> bool {
        self.properties.iter().any(|p| p.kind.is_counter())
    }

    /// A clustered-counter entity keeps counters in its own table: every
    /// non-key property is a counter.
    pub fn is_clustered_counter(&self) -> bool {
        self.has_counters()
            && self
                .properties
                .iter()
                .all(|p| p.kind.is_key() || p.kind.is_counter())
    }

    /// Counters on an otherwise regular entity are routed to the shared
    /// simple-counter table.
    pub fn has_simple_counters(&self) -> bool {
        self.has_counters() && !self.is_clustered_counter()
    }

    pub fn consistency_for(&self, kind: AccessKind) -> Option<ConsistencyLevel> {
        match kind {
            AccessKind::Read => self.read_consistency,
            AccessKind::Write => self.write_consistency,
        }
    }
}

pub struct EntityMetaBuilder {
    name: String,
    keyspace: Option<String>,
    table: String,
    properties: Vec<PropertyMeta>,
    read_consistency: Option<ConsistencyLevel>,
    write_consistency: Option<ConsistencyLevel>,
}

impl EntityMetaBuilder {
    pub fn keyspace(mut self, keyspace: impl Into<String>) -> Self {
        self.keyspace = Some(keyspace.into());
        self
    }

    pub fn read_consistency(mut self, level: ConsistencyLevel) -> Self {
        self.read_consistency = Some(level);
        self
    }

    pub fn write_consistency(mut self, level: ConsistencyLevel) -> Self {
        self.write_consistency = Some(level);
        self
    }

    pub fn property(mut self, property: PropertyMeta) -> Self {
        self.properties.push(property);
        self
    }

    pub fn build(self) -> Result<EntityMeta> {
        let mut names = HashSet::new();
        let mut columns = HashSet::new();
        for p in &self.properties {
            if !names.insert(p.name.clone()) {
                return Err(PersistenceError::Metadata(format!(
                    "duplicate property '{}' on entity '{}'",
                    p.name, self.name
                )));
            }
            if !columns.insert(p.column.clone()) {
                return Err(PersistenceError::Metadata(format!(
                    "duplicate column '{}' on entity '{}'",
                    p.column, self.name
                )));
            }
            if p.kind.is_key() && p.kind.is_counter() {
                return Err(PersistenceError::Metadata(format!(
                    "property '{}' cannot be both key and counter",
                    p.name
                )));
            }
        }

        let partition = self
            .properties
            .iter()
            .filter(|p| p.kind == PropertyKind::PartitionKey)
            .count();
        let clustering = self
            .properties
            .iter()
            .filter(|p| p.kind == PropertyKind::ClusteringKey)
            .count();
        if partition == 0 {
            return Err(PersistenceError::Metadata(format!(
                "entity '{}' has no partition key",
                self.name
            )));
        }
        let key_shape = if partition == 1 && clustering == 0 {
            KeyShape::Simple
        } else {
            KeyShape::Composite {
                partition,
                clustering,
            }
        };

        let static_counters = self
            .properties
            .iter()
            .any(|p| p.kind == PropertyKind::StaticCounter);
        if static_counters && clustering == 0 {
            return Err(PersistenceError::Metadata(format!(
                "entity '{}' declares a static counter but no clustering key",
                self.name
            )));
        }

        Ok(EntityMeta {
            name: self.name,
            keyspace: self.keyspace,
            table: self.table,
            properties: self.properties,
            key_shape,
            read_consistency: self.read_consistency,
            write_consistency: self.write_consistency,
        })
    }
}

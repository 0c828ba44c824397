use crate::core::ConsistencyLevel;
use serde::{Deserialize, Serialize};

/// Classification of a mapped property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyKind {
    PartitionKey,
    ClusteringKey,
    Regular,
    Static,
    List,
    Set,
    Map,
    Counter,
    /// Partition-scoped counter on a clustered entity.
    StaticCounter,
}

impl PropertyKind {
    pub fn is_key(&self) -> bool {
        matches!(self, Self::PartitionKey | Self::ClusteringKey)
    }

    pub fn is_counter(&self) -> bool {
        matches!(self, Self::Counter | Self::StaticCounter)
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, Self::List | Self::Set | Self::Map)
    }

    pub fn is_static(&self) -> bool {
        matches!(self, Self::Static | Self::StaticCounter)
    }
}

/// Per-property schema description. Built once, consumed read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyMeta {
    pub name: String,
    pub column: String,
    pub cql_type: String,
    pub kind: PropertyKind,
    /// Position among key components of the same kind; `None` for non-keys.
    pub key_position: Option<usize>,
    pub read_consistency: Option<ConsistencyLevel>,
    pub write_consistency: Option<ConsistencyLevel>,
}

impl PropertyMeta {
    pub fn new(
        name: impl Into<String>,
        column: impl Into<String>,
        cql_type: impl Into<String>,
        kind: PropertyKind,
    ) -> Self {
        Self {
            name: name.into(),
            column: column.into(),
            cql_type: cql_type.into(),
            kind,
            key_position: None,
            read_consistency: None,
            write_consistency: None,
        }
    }

    pub fn key_position(mut self, position: usize) -> Self {
        self.key_position = Some(position);
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

    pub fn consistency_for(&self, kind: crate::core::AccessKind) -> Option<ConsistencyLevel> {
        match kind {
            crate::core::AccessKind::Read => self.read_consistency,
            crate::core::AccessKind::Write => self.write_consistency,
        }
    }
}

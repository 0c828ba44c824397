use crate::core::{ColumnValue, PersistenceError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Shape of an entity's primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyShape {
    Simple,
    Composite { partition: usize, clustering: usize },
}

impl KeyShape {
    pub fn component_count(&self) -> usize {
        match self {
            Self::Simple => 1,
            Self::Composite {
                partition,
                clustering,
            } => partition + clustering,
        }
    }
}

/// A concrete primary key: ordered `(column, value)` pairs, partition
/// components first.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimaryKey {
    components: Vec<(String, ColumnValue)>,
    partition_len: usize,
}

impl PrimaryKey {
    pub fn simple(column: impl Into<String>, value: ColumnValue) -> Self {
        Self {
            components: vec![(column.into(), value)],
            partition_len: 1,
        }
    }

    pub fn composite(
        partition: Vec<(String, ColumnValue)>,
        clustering: Vec<(String, ColumnValue)>,
    ) -> Self {
        let partition_len = partition.len();
        let mut components = partition;
        components.extend(clustering);
        Self {
            components,
            partition_len,
        }
    }

    pub fn components(&self) -> &[(String, ColumnValue)] {
        &self.components
    }

    pub fn partition_components(&self) -> &[(String, ColumnValue)] {
        &self.components[..self.partition_len]
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.components.iter().map(|(c, _)| c.as_str())
    }

    pub fn values(&self) -> Vec<ColumnValue> {
        self.components.iter().map(|(_, v)| v.clone()).collect()
    }

    pub fn partition_values(&self) -> Vec<ColumnValue> {
        self.partition_components()
            .iter()
            .map(|(_, v)| v.clone())
            .collect()
    }

    /// Fails fast on missing components or null component values.
    pub fn validate(&self) -> Result<()> {
        if self.components.is_empty() {
            return Err(PersistenceError::Validation(
                "primary key has no components".into(),
            ));
        }
        for (column, value) in &self.components {
            if value.is_null() {
                return Err(PersistenceError::Validation(format!(
                    "primary key component '{column}' is null"
                )));
            }
        }
        Ok(())
    }

    /// Stable textual rendering, used for diagnostics and as the row key of
    /// the shared simple-counter table.
    pub fn render(&self) -> String {
        self.components
            .iter()
            .map(|(c, v)| format!("{c}={v}"))
            .collect::<Vec<_>>()
            .join(":")
    }
}

impl fmt::Display for PrimaryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

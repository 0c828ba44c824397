use crate::consistency::ConsistencyDefaults;
use crate::core::{ConsistencyLevel, PersistenceError, Result};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;

/// Manager construction knobs.
///
/// The global consistency defaults are the last layer of the resolution
/// chain; leaving either unset is a configuration error surfaced by
/// [`ManagerConfig::validate`] before any operation runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Bounded prepared-statement cache size (entries).
    pub statement_cache_capacity: usize,

    pub default_read_consistency: Option<ConsistencyLevel>,

    pub default_write_consistency: Option<ConsistencyLevel>,

    /// Sort batch submissions by (table, query) for deterministic replay.
    pub force_batch_order: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            statement_cache_capacity: 5000,
            default_read_consistency: None,
            default_write_consistency: None,
            force_batch_order: false,
        }
    }
}

impl ManagerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn statement_cache_capacity(mut self, capacity: usize) -> Self {
        self.statement_cache_capacity = capacity;
        self
    }

    pub fn default_read_consistency(mut self, level: ConsistencyLevel) -> Self {
        self.default_read_consistency = Some(level);
        self
    }

    pub fn default_write_consistency(mut self, level: ConsistencyLevel) -> Self {
        self.default_write_consistency = Some(level);
        self
    }

    pub fn force_batch_order(mut self, force: bool) -> Self {
        self.force_batch_order = force;
        self
    }

    pub fn validate(&self) -> Result<(NonZeroUsize, ConsistencyDefaults)> {
        let capacity = NonZeroUsize::new(self.statement_cache_capacity).ok_or_else(|| {
            PersistenceError::Configuration(
                "statement_cache_capacity must be greater than zero".into(),
            )
        })?;
        let read = self.default_read_consistency.ok_or_else(|| {
            PersistenceError::Configuration("default_read_consistency is not set".into())
        })?;
        let write = self.default_write_consistency.ok_or_else(|| {
            PersistenceError::Configuration("default_write_consistency is not set".into())
        })?;
        Ok((capacity, ConsistencyDefaults { read, write }))
    }
}

use crate::core::{ColumnValue, ConsistencyLevel, PersistenceError, Result, SerialConsistency};
use crate::lifecycle::CompletionListener;
use crate::metadata::EntityMeta;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;

/// One column=value predicate of a conditional write.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnCondition {
    pub column: String,
    pub value: ColumnValue,
}

/// Per-call overrides, builder style.
///
/// ```
/// use widerow::{ConsistencyLevel, Options};
///
/// let options = Options::new()
///     .consistency(ConsistencyLevel::Quorum)
///     .ttl(3600);
/// ```
#[derive(Clone, Default)]
pub struct Options {
    pub consistency: Option<ConsistencyLevel>,
    pub serial_consistency: Option<SerialConsistency>,
    /// Time-to-live in seconds.
    pub ttl: Option<u32>,
    /// Explicit write time in microseconds since the epoch.
    pub timestamp: Option<i64>,
    pub if_not_exists: bool,
    pub conditions: Vec<ColumnCondition>,
    pub listener: Option<Arc<dyn CompletionListener>>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn consistency(mut self, level: ConsistencyLevel) -> Self {
        self.consistency = Some(level);
        self
    }

    pub fn serial_consistency(mut self, level: SerialConsistency) -> Self {
        self.serial_consistency = Some(level);
        self
    }

    pub fn ttl(mut self, seconds: u32) -> Self {
        self.ttl = Some(seconds);
        self
    }

    pub fn timestamp(mut self, micros: i64) -> Self {
        self.timestamp = Some(micros);
        self
    }

    pub fn timestamp_at(mut self, at: DateTime<Utc>) -> Self {
        self.timestamp = Some(at.timestamp_micros());
        self
    }

    pub fn if_not_exists(mut self) -> Self {
        self.if_not_exists = true;
        self
    }

    pub fn condition(mut self, column: impl Into<String>, value: ColumnValue) -> Self {
        self.conditions.push(ColumnCondition {
            column: column.into(),
            value,
        });
        self
    }

    pub fn listener(mut self, listener: Arc<dyn CompletionListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Any conditional clause, `IF NOT EXISTS` included.
    pub fn has_conditions(&self) -> bool {
        self.if_not_exists || !self.conditions.is_empty()
    }

    /// Fails fast on option combinations the store cannot execute.
    pub fn validate_for(&self, meta: &EntityMeta) -> Result<()> {
        if self.timestamp.is_some() && self.has_conditions() {
            return Err(PersistenceError::Validation(
                "a fixed timestamp cannot be combined with conditional predicates".into(),
            ));
        }
        if self.ttl.is_some() && meta.is_clustered_counter() {
            return Err(PersistenceError::Validation(format!(
                "TTL is not applicable to clustered-counter entity '{}'",
                meta.name
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("consistency", &self.consistency)
            .field("serial_consistency", &self.serial_consistency)
            .field("ttl", &self.ttl)
            .field("timestamp", &self.timestamp)
            .field("if_not_exists", &self.if_not_exists)
            .field("conditions", &self.conditions)
            .field("listener", &self.listener.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{PropertyKind, PropertyMeta};

    fn clustered_counter_meta() -> EntityMeta {
        EntityMeta::builder("ClickCount", "click_counts")
            .property(PropertyMeta::new("id", "id", "bigint", PropertyKind::PartitionKey))
            .property(PropertyMeta::new(
                "day",
                "day",
                "text",
                PropertyKind::ClusteringKey,
            ))
            .property(PropertyMeta::new(
                "clicks",
                "clicks",
                "counter",
                PropertyKind::Counter,
            ))
            .build()
            .unwrap()
    }

    fn plain_meta() -> EntityMeta {
        EntityMeta::builder("User", "users")
            .property(PropertyMeta::new("id", "id", "bigint", PropertyKind::PartitionKey))
            .property(PropertyMeta::new("name", "name", "text", PropertyKind::Regular))
            .build()
            .unwrap()
    }

    #[test]
    fn timestamp_and_conditions_are_mutually_exclusive() {
        let options = Options::new()
            .timestamp(42)
            .condition("name", ColumnValue::Text("x".into()));
        assert!(matches!(
            options.validate_for(&plain_meta()),
            Err(PersistenceError::Validation(_))
        ));

        let options = Options::new().timestamp(42).if_not_exists();
        assert!(options.validate_for(&plain_meta()).is_err());
    }

    #[test]
    fn ttl_rejected_for_clustered_counter() {
        let options = Options::new().ttl(60);
        assert!(options.validate_for(&clustered_counter_meta()).is_err());
        assert!(options.validate_for(&plain_meta()).is_ok());
    }

    #[test]
    fn timestamp_alone_is_fine() {
        let options = Options::new().timestamp(42);
        assert!(options.validate_for(&plain_meta()).is_ok());
    }
}

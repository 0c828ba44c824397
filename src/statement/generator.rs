use crate::core::{ColumnValue, PersistenceError, Result};
use crate::metadata::{EntityMeta, PropertyKind, PropertyMeta};
use crate::options::Options;

/// Shared table holding simple (non-clustered) counters for all entities,
/// keyed by owning entity name, rendered primary key, and counter name.
pub const SIMPLE_COUNTER_TABLE: &str = "widerow_counters";

/// Builds CQL text for the statement shapes the engine issues.
///
/// Stateless and injected; bind helpers mirror the marker order of the text
/// they accompany, and the pairing is covered by unit tests below.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatementGenerator;

impl StatementGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Full-row insert covering every non-counter column.
    pub fn insert(&self, meta: &EntityMeta, options: &Options) -> String {
        let columns: Vec<&str> = meta
            .insertable_properties()
            .iter()
            .map(|p| p.column.as_str())
            .collect();
        let markers = vec!["?"; columns.len()].join(", ");
        let mut query = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            meta.qualified_table(),
            columns.join(", "),
            markers
        );
        if options.if_not_exists {
            query.push_str(" IF NOT EXISTS");
        }
        query.push_str(&self.using_clause(options, true));
        query
    }

    /// Partial update scoped to exactly `properties` (sorted by the caller's
    /// dirty map). An empty set is a validation error: it must never reach
    /// the cache or the gateway.
    pub fn update(
        &self,
        meta: &EntityMeta,
        properties: &[String],
        options: &Options,
    ) -> Result<String> {
        if properties.is_empty() {
            return Err(PersistenceError::Validation(format!(
                "update of entity '{}' with an empty changed-property set",
                meta.name
            )));
        }
        let mut sorted = properties.to_vec();
        sorted.sort();
        let mut assignments = Vec::with_capacity(sorted.len());
        for name in &sorted {
            let property = meta.expect_property(name)?;
            if property.kind.is_counter() {
                return Err(PersistenceError::Validation(format!(
                    "counter property '{}' cannot travel in a regular update",
                    name
                )));
            }
            assignments.push(format!("{} = ?", property.column));
        }
        let mut query = format!("UPDATE {}", meta.qualified_table());
        query.push_str(&self.using_clause(options, true));
        query.push_str(&format!(
            " SET {} WHERE {}",
            assignments.join(", "),
            self.key_clause(meta)
        ));
        query.push_str(&self.condition_clause(options));
        Ok(query)
    }

    /// Row delete by primary key.
    pub fn delete(&self, meta: &EntityMeta, options: &Options) -> String {
        let mut query = format!("DELETE FROM {}", meta.qualified_table());
        query.push_str(&self.using_clause(options, false));
        query.push_str(&format!(" WHERE {}", self.key_clause(meta)));
        query.push_str(&self.condition_clause(options));
        query
    }

    /// Full-row select; counter columns are readable and included.
    pub fn select_row(&self, meta: &EntityMeta) -> String {
        let columns: Vec<&str> = meta.properties.iter().map(|p| p.column.as_str()).collect();
        format!(
            "SELECT {} FROM {} WHERE {}",
            columns.join(", "),
            meta.qualified_table(),
            self.key_clause(meta)
        )
    }

    pub fn select_property(&self, meta: &EntityMeta, property: &PropertyMeta) -> String {
        format!(
            "SELECT {} FROM {} WHERE {}",
            property.column,
            meta.qualified_table(),
            self.key_clause(meta)
        )
    }

    // -- counter shapes ----------------------------------------------------

    pub fn simple_counter_increment(&self) -> String {
        format!(
            "UPDATE {SIMPLE_COUNTER_TABLE} SET counter_value = counter_value + ? \
             WHERE entity_name = ? AND row_key = ? AND counter_name = ?"
        )
    }

    pub fn simple_counter_select(&self) -> String {
        format!(
            "SELECT counter_value FROM {SIMPLE_COUNTER_TABLE} \
             WHERE entity_name = ? AND row_key = ? AND counter_name = ?"
        )
    }

    /// Removes every counter of one owning row.
    pub fn simple_counter_delete(&self) -> String {
        format!("DELETE FROM {SIMPLE_COUNTER_TABLE} WHERE entity_name = ? AND row_key = ?")
    }

    /// Clustered counter increment in the entity's own table. Static
    /// counters are scoped by the partition key alone.
    pub fn clustered_counter_increment(
        &self,
        meta: &EntityMeta,
        property: &PropertyMeta,
    ) -> String {
        let scope = if property.kind == PropertyKind::StaticCounter {
            self.partition_clause(meta)
        } else {
            self.key_clause(meta)
        };
        format!(
            "UPDATE {} SET {col} = {col} + ? WHERE {scope}",
            meta.qualified_table(),
            col = property.column
        )
    }

    pub fn clustered_counter_select(&self, meta: &EntityMeta, property: &PropertyMeta) -> String {
        let scope = if property.kind == PropertyKind::StaticCounter {
            self.partition_clause(meta)
        } else {
            self.key_clause(meta)
        };
        format!(
            "SELECT {} FROM {} WHERE {scope}",
            property.column,
            meta.qualified_table()
        )
    }

    // -- bind helpers ------------------------------------------------------

    /// Values for the `USING` clause, in marker order: TTL first, then
    /// timestamp.
    pub fn using_values(&self, options: &Options, with_ttl: bool) -> Vec<ColumnValue> {
        let mut values = Vec::new();
        if with_ttl && let Some(ttl) = options.ttl {
            values.push(ColumnValue::Int(ttl as i32));
        }
        if let Some(ts) = options.timestamp {
            values.push(ColumnValue::BigInt(ts));
        }
        values
    }

    pub fn condition_values(&self, options: &Options) -> Vec<ColumnValue> {
        options.conditions.iter().map(|c| c.value.clone()).collect()
    }

    // -- clause fragments --------------------------------------------------

    fn using_clause(&self, options: &Options, with_ttl: bool) -> String {
        let mut parts = Vec::new();
        if with_ttl && options.ttl.is_some() {
            parts.push("TTL ?");
        }
        if options.timestamp.is_some() {
            parts.push("TIMESTAMP ?");
        }
        if parts.is_empty() {
            String::new()
        } else {
            format!(" USING {}", parts.join(" AND "))
        }
    }

    fn condition_clause(&self, options: &Options) -> String {
        if options.conditions.is_empty() {
            return String::new();
        }
        let predicates: Vec<String> = options
            .conditions
            .iter()
            .map(|c| format!("{} = ?", c.column))
            .collect();
        format!(" IF {}", predicates.join(" AND "))
    }

    fn key_clause(&self, meta: &EntityMeta) -> String {
        meta.key_properties()
            .iter()
            .map(|p| format!("{} = ?", p.column))
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    fn partition_clause(&self, meta: &EntityMeta) -> String {
        meta.key_properties()
            .iter()
            .filter(|p| p.kind == PropertyKind::PartitionKey)
            .map(|p| format!("{} = ?", p.column))
            .collect::<Vec<_>>()
            .join(" AND ")
    }
}

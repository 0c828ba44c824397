use crate::context::PersistenceContext;
use crate::core::{ColumnValue, PersistenceError, Result};
use crate::metadata::{Entity, PrimaryKey, PropertyKind};
use crate::statement::{BoundStatement, CacheKey, StatementKind, StatementWrapper};

/// Builds and routes counter statements.
///
/// Counter mutations always travel in the counter group of the active flush
/// context; the regular group never sees them. Simple counters (a counter
/// column on an otherwise regular entity) live in the shared
/// `widerow_counters` table; clustered counters live in the entity's own
/// table scoped by its primary key.
#[derive(Debug, Clone, Copy, Default)]
pub struct CounterCoordinator;

impl CounterCoordinator {
    pub fn new() -> Self {
        Self
    }

    /// Pushes one increment statement per nonzero delta.
    pub async fn push_deltas(
        &self,
        ctx: &PersistenceContext,
        key: &PrimaryKey,
        deltas: &[(String, i64)],
    ) -> Result<()> {
        for (property, delta) in deltas {
            if *delta == 0 {
                continue;
            }
            let meta = ctx.meta();
            let property_meta = meta.expect_property(property)?;
            if !property_meta.kind.is_counter() {
                return Err(PersistenceError::Metadata(format!(
                    "property '{property}' of entity '{}' is not a counter",
                    meta.name
                )));
            }

            let wrapper = if meta.is_clustered_counter() {
                let query = ctx
                    .generator()
                    .clustered_counter_increment(meta, property_meta);
                let cache_key = CacheKey::new(
                    &meta.name,
                    StatementKind::CounterIncrement,
                    vec![property.clone()],
                );
                let prepared = ctx.gateway().prepare_cached(cache_key, &query).await?;
                let mut values = vec![ColumnValue::BigInt(*delta)];
                if property_meta.kind == PropertyKind::StaticCounter {
                    values.extend(key.partition_values());
                } else {
                    values.extend(key.values());
                }
                StatementWrapper::new(
                    StatementKind::CounterIncrement,
                    meta.qualified_table(),
                    BoundStatement::new(prepared.query.clone(), values)
                        .consistency(ctx.write_level(Some(property_meta))?),
                )
            } else {
                let query = ctx.generator().simple_counter_increment();
                let cache_key = CacheKey::new(
                    &meta.name,
                    StatementKind::CounterIncrement,
                    vec![property.clone()],
                );
                let prepared = ctx.gateway().prepare_cached(cache_key, &query).await?;
                let values = vec![
                    ColumnValue::BigInt(*delta),
                    ColumnValue::Text(meta.name.clone()),
                    ColumnValue::Text(key.render()),
                    ColumnValue::Text(property_meta.column.clone()),
                ];
                StatementWrapper::new(
                    StatementKind::CounterIncrement,
                    crate::statement::SIMPLE_COUNTER_TABLE,
                    BoundStatement::new(prepared.query.clone(), values)
                        .consistency(ctx.write_level(Some(property_meta))?),
                )
            };
            ctx.flush_handle().push_counter(wrapper)?;
        }
        Ok(())
    }

    /// Removes the shared-table counter row accompanying an entity removal.
    pub async fn push_simple_counter_removal(
        &self,
        ctx: &PersistenceContext,
        key: &PrimaryKey,
    ) -> Result<()> {
        let meta = ctx.meta();
        let query = ctx.generator().simple_counter_delete();
        let cache_key = CacheKey::whole(&meta.name, StatementKind::CounterDelete);
        let prepared = ctx.gateway().prepare_cached(cache_key, &query).await?;
        let values = vec![
            ColumnValue::Text(meta.name.clone()),
            ColumnValue::Text(key.render()),
        ];
        let wrapper = StatementWrapper::new(
            StatementKind::CounterDelete,
            crate::statement::SIMPLE_COUNTER_TABLE,
            BoundStatement::new(prepared.query.clone(), values)
                .consistency(ctx.write_level(None)?),
        );
        ctx.flush_handle().push_counter(wrapper)
    }

    /// Direct counter read: never cached on the entity, never proxied.
    pub async fn read_value(
        &self,
        ctx: &PersistenceContext,
        key: &PrimaryKey,
        property: &str,
    ) -> Result<Option<i64>> {
        let meta = ctx.meta();
        let property_meta = meta.expect_property(property)?;
        if !property_meta.kind.is_counter() {
            return Err(PersistenceError::Metadata(format!(
                "property '{property}' of entity '{}' is not a counter",
                meta.name
            )));
        }

        if meta.is_clustered_counter() {
            let value = ctx.select_property_value(key, property_meta).await?;
            Ok(value.and_then(|v| v.as_i64()))
        } else {
            let query = ctx.generator().simple_counter_select();
            let cache_key = CacheKey::new(
                &meta.name,
                StatementKind::CounterSelect,
                vec![property.to_string()],
            );
            let prepared = ctx.gateway().prepare_cached(cache_key, &query).await?;
            let values = vec![
                ColumnValue::Text(meta.name.clone()),
                ColumnValue::Text(key.render()),
                ColumnValue::Text(property_meta.column.clone()),
            ];
            let bound = BoundStatement::new(prepared.query.clone(), values)
                .consistency(ctx.read_level(Some(property_meta))?);
            let rows = ctx.gateway().execute(bound).await?;
            Ok(rows
                .first()
                .and_then(|row| row.get("counter_value"))
                .and_then(ColumnValue::as_i64))
        }
    }

    /// A brand-new clustered-counter entity with nothing to write is a
    /// validation error: counter rows only exist through increments.
    pub fn validate_clustered_persist<T: Entity>(&self, entity: &T) -> Result<()> {
        let meta = T::metadata();
        if meta.is_clustered_counter() && entity.counters_unset() {
            return Err(PersistenceError::Validation(format!(
                "cannot persist clustered-counter entity '{}': all counter properties are null",
                meta.name
            )));
        }
        Ok(())
    }
}

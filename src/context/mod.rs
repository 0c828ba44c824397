use crate::consistency::ConsistencyResolver;
use crate::core::{
    AccessKind, ColumnValue, ConsistencyLevel, PersistenceError, Result, SerialConsistency,
};
use crate::flush::FlushHandle;
use crate::gateway::{DaoGateway, Row};
use crate::lifecycle::EventRecord;
use crate::metadata::{Entity, EntityMeta, PrimaryKey, PropertyMeta};
use crate::options::Options;
use crate::statement::{
    BoundStatement, CacheKey, StatementGenerator, StatementKind, StatementVariant,
    StatementWrapper,
};

/// Per-operation unit binding one entity type's metadata, the per-call
/// options, and the active flush context.
///
/// The context produces statements (through the cache and the gateway) and
/// pushes them into its flush handle; it never executes mutations itself.
pub struct PersistenceContext {
    meta: &'static EntityMeta,
    options: Options,
    flush: FlushHandle,
    gateway: DaoGateway,
    resolver: ConsistencyResolver,
    generator: StatementGenerator,
}

impl PersistenceContext {
    pub fn new(
        meta: &'static EntityMeta,
        options: Options,
        flush: FlushHandle,
        gateway: DaoGateway,
        resolver: ConsistencyResolver,
        generator: StatementGenerator,
    ) -> Self {
        Self {
            meta,
            options,
            flush,
            gateway,
            resolver,
            generator,
        }
    }

    pub fn meta(&self) -> &'static EntityMeta {
        self.meta
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn flush_handle(&self) -> &FlushHandle {
        &self.flush
    }

    pub fn gateway(&self) -> &DaoGateway {
        &self.gateway
    }

    pub fn generator(&self) -> &StatementGenerator {
        &self.generator
    }

    /// Child context for cascading to related data: fresh per-entity
    /// binding, flush context per the duplicate semantics of the active
    /// mode (shared accumulator for batching, independent for immediate).
    pub fn duplicate_for(&self, meta: &'static EntityMeta) -> Self {
        Self {
            meta,
            options: self.options.clone(),
            flush: self.flush.duplicate(),
            gateway: self.gateway.clone(),
            resolver: self.resolver,
            generator: self.generator,
        }
    }

    pub fn write_level(&self, property: Option<&PropertyMeta>) -> Result<ConsistencyLevel> {
        Ok(self.resolver.resolve(
            AccessKind::Write,
            self.meta,
            property,
            &self.options,
            self.flush.batch_level()?,
        ))
    }

    pub fn read_level(&self, property: Option<&PropertyMeta>) -> Result<ConsistencyLevel> {
        Ok(self.resolver.resolve(
            AccessKind::Read,
            self.meta,
            property,
            &self.options,
            self.flush.batch_level()?,
        ))
    }

    fn serial_for_conditions(&self) -> Option<SerialConsistency> {
        if self.options.has_conditions() {
            self.resolver.resolve_serial(&self.options)
        } else {
            None
        }
    }

    pub fn defer_event(&self, event: EventRecord) -> Result<()> {
        self.flush.defer_event(event)
    }

    // -- statement production ---------------------------------------------

    /// Full-row insert into the regular group.
    pub async fn push_insert<T: Entity>(&self, entity: &T) -> Result<()> {
        let query = self.generator.insert(self.meta, &self.options);
        let key = CacheKey::whole(&self.meta.name, StatementKind::Insert)
            .with_variant(StatementVariant::of(&self.options));
        let prepared = self.gateway.prepare_cached(key, &query).await?;

        let mut values = Vec::new();
        for property in self.meta.insertable_properties() {
            let value = entity.column(&property.name).ok_or_else(|| {
                PersistenceError::Codec(format!(
                    "entity '{}' produced no value for property '{}'",
                    self.meta.name, property.name
                ))
            })?;
            values.push(value);
        }
        values.extend(self.generator.using_values(&self.options, true));

        let bound = BoundStatement::new(prepared.query.clone(), values)
            .consistency(self.write_level(None)?)
            .serial_consistency(self.serial_for_conditions());
        self.flush.push_regular(StatementWrapper::new(
            StatementKind::Insert,
            self.meta.qualified_table(),
            bound,
        ))
    }

    /// Partial update scoped to `properties` into the regular group. The
    /// caller guarantees a non-empty, non-counter property set; the
    /// generator re-checks.
    pub async fn push_update<T: Entity>(&self, entity: &T, properties: &[String]) -> Result<()> {
        let query = self.generator.update(self.meta, properties, &self.options)?;
        let key = CacheKey::new(
            &self.meta.name,
            StatementKind::Update,
            properties.to_vec(),
        )
        .with_variant(StatementVariant::of(&self.options));
        let prepared = self.gateway.prepare_cached(key, &query).await?;

        let mut values = self.generator.using_values(&self.options, true);
        let mut sorted = properties.to_vec();
        sorted.sort();
        for name in &sorted {
            let value = entity.column(name).ok_or_else(|| {
                PersistenceError::Codec(format!(
                    "entity '{}' produced no value for property '{name}'",
                    self.meta.name
                ))
            })?;
            values.push(value);
        }
        values.extend(entity.primary_key().values());
        values.extend(self.generator.condition_values(&self.options));

        let bound = BoundStatement::new(prepared.query.clone(), values)
            .consistency(self.write_level(None)?)
            .serial_consistency(self.serial_for_conditions());
        self.flush.push_regular(StatementWrapper::new(
            StatementKind::Update,
            self.meta.qualified_table(),
            bound,
        ))
    }

    /// Row delete. Clustered-counter rows are counter mutations as far as
    /// the store is concerned, so their deletes travel in the counter group.
    pub async fn push_delete(&self, key: &PrimaryKey) -> Result<()> {
        let query = self.generator.delete(self.meta, &self.options);
        let cache_key = CacheKey::whole(&self.meta.name, StatementKind::Delete)
            .with_variant(StatementVariant::of(&self.options));
        let prepared = self.gateway.prepare_cached(cache_key, &query).await?;

        let mut values = self.generator.using_values(&self.options, false);
        values.extend(key.values());
        values.extend(self.generator.condition_values(&self.options));

        let bound = BoundStatement::new(prepared.query.clone(), values)
            .consistency(self.write_level(None)?)
            .serial_consistency(self.serial_for_conditions());
        let wrapper = StatementWrapper::new(
            StatementKind::Delete,
            self.meta.qualified_table(),
            bound,
        );
        if self.meta.is_clustered_counter() {
            self.flush.push_counter(wrapper)
        } else {
            self.flush.push_regular(wrapper)
        }
    }

    // -- reads ------------------------------------------------------------

    /// Full-row read under the resolved read consistency; executes
    /// immediately, bypassing the flush unit.
    pub async fn select_row(&self, key: &PrimaryKey) -> Result<Option<Row>> {
        let query = self.generator.select_row(self.meta);
        let cache_key = CacheKey::whole(&self.meta.name, StatementKind::SelectRow);
        let prepared = self.gateway.prepare_cached(cache_key, &query).await?;

        let bound = BoundStatement::new(prepared.query.clone(), key.values())
            .consistency(self.read_level(None)?);
        let mut rows = self.gateway.execute(bound).await?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.swap_remove(0))
        })
    }

    /// Single-column read; counter reads resolve consistency through the
    /// counter property's own descriptor.
    pub async fn select_property_value(
        &self,
        key: &PrimaryKey,
        property: &PropertyMeta,
    ) -> Result<Option<ColumnValue>> {
        let query = self.generator.select_property(self.meta, property);
        let cache_key = CacheKey::new(
            &self.meta.name,
            StatementKind::SelectProperty,
            vec![property.name.clone()],
        );
        let prepared = self.gateway.prepare_cached(cache_key, &query).await?;

        let bound = BoundStatement::new(prepared.query.clone(), key.values())
            .consistency(self.read_level(Some(property))?);
        let rows = self.gateway.execute(bound).await?;
        Ok(rows
            .first()
            .and_then(|row| row.get(&property.column).cloned()))
    }
}

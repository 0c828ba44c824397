use crate::consistency::ConsistencyResolver;
use crate::context::PersistenceContext;
use crate::core::{PersistenceError, Result};
use crate::counter::CounterCoordinator;
use crate::facade::batch::BatchSession;
use crate::facade::config::ManagerConfig;
use crate::flush::{AsyncCompletion, FlushHandle};
use crate::gateway::{DaoGateway, Session};
use crate::lifecycle::{Interceptor, InterceptorRegistry, LifecycleListener, Phase};
use crate::metadata::{Entity, MetadataRegistry, PrimaryKey};
use crate::options::Options;
use crate::proxy::{ManagedState, Proxied};
use crate::statement::{StatementCache, StatementGenerator};
use std::sync::Arc;

/// Entry point of the engine.
///
/// Stateless across calls and safe to share: every operation builds a fresh
/// immediate flush context bound only to that call. The statement cache and
/// the gateway are the only shared mutable state, and both are internally
/// synchronized. Explicit batching goes through [`PersistenceManager::batch`].
pub struct PersistenceManager {
    gateway: DaoGateway,
    resolver: ConsistencyResolver,
    generator: StatementGenerator,
    coordinator: CounterCoordinator,
    metadata: MetadataRegistry,
    interceptors: InterceptorRegistry,
}

pub struct PersistenceManagerBuilder {
    session: Arc<dyn Session>,
    config: ManagerConfig,
    metadata: MetadataRegistry,
    interceptors: InterceptorRegistry,
    deferred_error: Option<PersistenceError>,
}

impl PersistenceManagerBuilder {
    pub fn new(session: Arc<dyn Session>) -> Self {
        Self {
            session,
            config: ManagerConfig::default(),
            metadata: MetadataRegistry::new(),
            interceptors: InterceptorRegistry::new(),
            deferred_error: None,
        }
    }

    pub fn config(mut self, config: ManagerConfig) -> Self {
        self.config = config;
        self
    }

    /// Registers an entity type; its metadata is built and validated once.
    pub fn register_entity<T: Entity>(mut self) -> Self {
        if self.deferred_error.is_none()
            && let Err(err) = self.metadata.register::<T>()
        {
            self.deferred_error = Some(err);
        }
        self
    }

    pub fn interceptor<T: Entity>(mut self, interceptor: Arc<dyn Interceptor<T>>) -> Self {
        self.interceptors.register(interceptor);
        self
    }

    pub fn listener(mut self, listener: Arc<dyn LifecycleListener>) -> Self {
        self.interceptors.add_listener(listener);
        self
    }

    pub fn build(self) -> Result<PersistenceManager> {
        if let Some(err) = self.deferred_error {
            return Err(err);
        }
        let (capacity, defaults) = self.config.validate()?;
        let cache = Arc::new(StatementCache::new(capacity));
        let gateway = DaoGateway::new(self.session, cache, self.config.force_batch_order);
        log::debug!(
            "persistence manager built: {} entities, cache capacity {capacity}",
            self.metadata.len()
        );
        Ok(PersistenceManager {
            gateway,
            resolver: ConsistencyResolver::new(defaults),
            generator: StatementGenerator::new(),
            coordinator: CounterCoordinator::new(),
            metadata: self.metadata,
            interceptors: self.interceptors,
        })
    }
}

impl PersistenceManager {
    pub fn builder(session: Arc<dyn Session>) -> PersistenceManagerBuilder {
        PersistenceManagerBuilder::new(session)
    }

    /// Opens an explicit batch session. The session is stateful, is not
    /// safe for concurrent use, and must be discarded (or cleaned) after a
    /// failed `end_batch`.
    pub fn batch(&self) -> BatchSession<'_> {
        BatchSession::new(self)
    }

    /// Returns the raw entity behind a managed wrapper; the same underlying
    /// instance regardless of wrap depth.
    pub fn unwrap<T: Entity>(proxy: T::Proxy) -> T {
        proxy.into_state().into_entity()
    }

    // -- immediate-mode surface -------------------------------------------

    pub async fn persist<T: Entity>(&self, entity: T, options: Options) -> Result<T::Proxy> {
        self.persist_with(entity, options, FlushHandle::immediate())
            .await
    }

    pub async fn merge<T: Entity>(&self, proxy: &mut T::Proxy, options: Options) -> Result<()> {
        self.merge_with::<T>(proxy, options, FlushHandle::immediate())
            .await
    }

    pub async fn remove<T: Entity>(&self, proxy: T::Proxy, options: Options) -> Result<()> {
        self.remove_with::<T>(proxy, options, FlushHandle::immediate())
            .await
    }

    pub async fn remove_by_id<T: Entity>(&self, key: PrimaryKey, options: Options) -> Result<()> {
        self.remove_by_id_with::<T>(key, options, FlushHandle::immediate())
            .await
    }

    pub async fn find<T: Entity>(
        &self,
        key: PrimaryKey,
        options: Options,
    ) -> Result<Option<T::Proxy>> {
        self.find_with::<T>(key, options, FlushHandle::immediate())
            .await
    }

    pub async fn refresh<T: Entity>(&self, proxy: &mut T::Proxy, options: Options) -> Result<()> {
        self.refresh_with::<T>(proxy, options, FlushHandle::immediate())
            .await
    }

    /// Direct counter read: plain value, not cached, not proxied, under the
    /// counter property's resolved read consistency.
    pub async fn read_counter<T: Entity>(
        &self,
        key: &PrimaryKey,
        property: &str,
        options: Options,
    ) -> Result<Option<i64>> {
        let ctx = self.context_for::<T>(options, FlushHandle::immediate())?;
        key.validate()?;
        self.coordinator.read_value(&ctx, key, property).await
    }

    // -- shared operation cores (immediate and batch) ----------------------

    pub(crate) fn context_for<T: Entity>(
        &self,
        options: Options,
        flush: FlushHandle,
    ) -> Result<PersistenceContext> {
        let meta = self.metadata.meta_of::<T>()?;
        options.validate_for(meta)?;
        Ok(PersistenceContext::new(
            meta,
            options,
            flush,
            self.gateway.clone(),
            self.resolver,
            self.generator,
        ))
    }

    pub(crate) async fn persist_with<T: Entity>(
        &self,
        mut entity: T,
        options: Options,
        flush: FlushHandle,
    ) -> Result<T::Proxy> {
        let meta = self.metadata.meta_of::<T>()?;
        options.validate_for(meta)?;
        let key = entity.primary_key();
        key.validate()?;
        self.coordinator.validate_clustered_persist(&entity)?;

        // pre-event fires synchronously before any I/O
        self.interceptors
            .fire(&mut entity, Phase::PrePersist, &key.render());

        let listener = options.listener.clone();
        let ctx = PersistenceContext::new(
            meta,
            options,
            flush,
            self.gateway.clone(),
            self.resolver,
            self.generator,
        );

        // a clustered-counter entity has nothing insertable; it exists
        // purely through its counter increments
        if !meta.is_clustered_counter() {
            ctx.push_insert(&entity).await?;
        }
        let deltas = entity.counter_deltas();
        self.coordinator.push_deltas(&ctx, &key, &deltas).await?;

        ctx.defer_event(crate::lifecycle::EventRecord::new(
            meta.name.clone(),
            Phase::PostPersist,
            key.render(),
        ))?;
        if let Some(listener) = listener {
            ctx.flush_handle().defer_listener(listener)?;
        }

        match ctx.flush_handle() {
            FlushHandle::Immediate(immediate) => {
                let completion = AsyncCompletion::new(&self.interceptors);
                let listeners = completion.flush(immediate.unit(), &self.gateway).await?;
                self.interceptors.fire_typed(&mut entity, Phase::PostPersist);
                entity.clear_collection_flags();
                entity.settle_counters();
                let proxy = T::Proxy::wrap(ManagedState::managed(entity));
                for listener in listeners {
                    listener.on_complete(None);
                }
                Ok(proxy)
            }
            FlushHandle::Batching(_) => {
                // deferred: post events and listeners fire at end_batch
                entity.clear_collection_flags();
                entity.settle_counters();
                Ok(T::Proxy::wrap(ManagedState::managed(entity)))
            }
        }
    }

    pub(crate) async fn merge_with<T: Entity>(
        &self,
        proxy: &mut T::Proxy,
        options: Options,
        flush: FlushHandle,
    ) -> Result<()> {
        let meta = self.metadata.meta_of::<T>()?;
        options.validate_for(meta)?;
        proxy.state().ensure_usable()?;

        let dirty = proxy.state().effective_dirty();
        let deltas = proxy.state().entity().counter_deltas();
        if dirty.is_empty() && deltas.is_empty() {
            // nothing changed: no statement, no cache entry, no events
            log::debug!("merge of '{}' with an empty dirty-set; skipping", meta.name);
            if let Some(listener) = &options.listener {
                listener.on_complete(None);
            }
            return Ok(());
        }

        let key = proxy.state().entity().primary_key();
        key.validate()?;

        self.interceptors.fire(
            proxy.state_mut().entity_for_events(),
            Phase::PreUpdate,
            &key.render(),
        );

        let listener = options.listener.clone();
        let ctx = PersistenceContext::new(
            meta,
            options,
            flush,
            self.gateway.clone(),
            self.resolver,
            self.generator,
        );

        if !dirty.is_empty() {
            ctx.push_update(proxy.state().entity(), &dirty).await?;
        }
        self.coordinator.push_deltas(&ctx, &key, &deltas).await?;

        ctx.defer_event(crate::lifecycle::EventRecord::new(
            meta.name.clone(),
            Phase::PostUpdate,
            key.render(),
        ))?;
        if let Some(listener) = listener {
            ctx.flush_handle().defer_listener(listener)?;
        }

        match ctx.flush_handle() {
            FlushHandle::Immediate(immediate) => {
                let completion = AsyncCompletion::new(&self.interceptors);
                let listeners = completion.flush(immediate.unit(), &self.gateway).await?;
                self.interceptors
                    .fire_typed(proxy.state_mut().entity_for_events(), Phase::PostUpdate);
                proxy.state_mut().settle();
                for listener in listeners {
                    listener.on_complete(None);
                }
            }
            FlushHandle::Batching(_) => {
                proxy.state_mut().settle();
            }
        }
        Ok(())
    }

    pub(crate) async fn remove_with<T: Entity>(
        &self,
        proxy: T::Proxy,
        options: Options,
        flush: FlushHandle,
    ) -> Result<()> {
        let meta = self.metadata.meta_of::<T>()?;
        options.validate_for(meta)?;
        proxy.state().ensure_usable()?;

        let mut state = proxy.into_state();
        let key = state.entity().primary_key();
        key.validate()?;

        self.interceptors
            .fire(state.entity_for_events(), Phase::PreRemove, &key.render());

        let listener = options.listener.clone();
        let ctx = PersistenceContext::new(
            meta,
            options,
            flush,
            self.gateway.clone(),
            self.resolver,
            self.generator,
        );

        ctx.push_delete(&key).await?;
        if meta.has_simple_counters() {
            self.coordinator
                .push_simple_counter_removal(&ctx, &key)
                .await?;
        }

        ctx.defer_event(crate::lifecycle::EventRecord::new(
            meta.name.clone(),
            Phase::PostRemove,
            key.render(),
        ))?;
        if let Some(listener) = listener {
            ctx.flush_handle().defer_listener(listener)?;
        }

        if let FlushHandle::Immediate(immediate) = ctx.flush_handle() {
            let completion = AsyncCompletion::new(&self.interceptors);
            let listeners = completion.flush(immediate.unit(), &self.gateway).await?;
            self.interceptors
                .fire_typed(state.entity_for_events(), Phase::PostRemove);
            for listener in listeners {
                listener.on_complete(None);
            }
        }
        Ok(())
    }

    pub(crate) async fn remove_by_id_with<T: Entity>(
        &self,
        key: PrimaryKey,
        options: Options,
        flush: FlushHandle,
    ) -> Result<()> {
        let meta = self.metadata.meta_of::<T>()?;
        options.validate_for(meta)?;
        key.validate()?;

        // no entity instance here; only the global listeners observe it
        self.interceptors.notify(&crate::lifecycle::EventRecord::new(
            meta.name.clone(),
            Phase::PreRemove,
            key.render(),
        ));

        let listener = options.listener.clone();
        let ctx = PersistenceContext::new(
            meta,
            options,
            flush,
            self.gateway.clone(),
            self.resolver,
            self.generator,
        );

        ctx.push_delete(&key).await?;
        if meta.has_simple_counters() {
            self.coordinator
                .push_simple_counter_removal(&ctx, &key)
                .await?;
        }

        ctx.defer_event(crate::lifecycle::EventRecord::new(
            meta.name.clone(),
            Phase::PostRemove,
            key.render(),
        ))?;
        if let Some(listener) = listener {
            ctx.flush_handle().defer_listener(listener)?;
        }

        if let FlushHandle::Immediate(immediate) = ctx.flush_handle() {
            let completion = AsyncCompletion::new(&self.interceptors);
            let listeners = completion.flush(immediate.unit(), &self.gateway).await?;
            for listener in listeners {
                listener.on_complete(None);
            }
        }
        Ok(())
    }

    pub(crate) async fn find_with<T: Entity>(
        &self,
        key: PrimaryKey,
        options: Options,
        flush: FlushHandle,
    ) -> Result<Option<T::Proxy>> {
        let listener = options.listener.clone();
        let ctx = self.context_for::<T>(options, flush)?;
        key.validate()?;

        let row = ctx.select_row(&key).await?;
        let proxy = match row {
            None => None,
            Some(row) => {
                let mut entity = T::from_row(&row)?;
                tracing::event!(
                    tracing::Level::TRACE,
                    entity = %ctx.meta().name,
                    row = %row.to_json(),
                    "row loaded"
                );
                self.interceptors
                    .fire(&mut entity, Phase::PostLoad, &key.render());
                Some(T::Proxy::wrap(ManagedState::managed(entity)))
            }
        };
        if let Some(listener) = listener {
            listener.on_complete(None);
        }
        Ok(proxy)
    }

    pub(crate) async fn refresh_with<T: Entity>(
        &self,
        proxy: &mut T::Proxy,
        options: Options,
        flush: FlushHandle,
    ) -> Result<()> {
        let meta = self.metadata.meta_of::<T>()?;
        options.validate_for(meta)?;
        proxy.state().ensure_usable()?;

        let key = proxy.state().entity().primary_key();
        key.validate()?;
        let listener = options.listener.clone();
        let ctx = PersistenceContext::new(
            meta,
            options,
            flush,
            self.gateway.clone(),
            self.resolver,
            self.generator,
        );

        match ctx.select_row(&key).await? {
            None => {
                // the backing row is gone; poison the wrapper
                proxy.state_mut().mark_stale();
                let err = PersistenceError::NoLongerExists {
                    entity: meta.name.clone(),
                    key: key.render(),
                };
                if let Some(listener) = listener {
                    listener.on_complete(Some(&err));
                }
                Err(err)
            }
            Some(row) => {
                let mut entity = T::from_row(&row)?;
                self.interceptors
                    .fire(&mut entity, Phase::PostLoad, &key.render());
                proxy.state_mut().replace_entity(entity);
                if let Some(listener) = listener {
                    listener.on_complete(None);
                }
                Ok(())
            }
        }
    }

    pub(crate) async fn read_counter_with<T: Entity>(
        &self,
        key: &PrimaryKey,
        property: &str,
        options: Options,
        flush: FlushHandle,
    ) -> Result<Option<i64>> {
        let ctx = self.context_for::<T>(options, flush)?;
        key.validate()?;
        self.coordinator.read_value(&ctx, key, property).await
    }

    pub(crate) fn gateway(&self) -> &DaoGateway {
        &self.gateway
    }

    pub(crate) fn interceptors(&self) -> &InterceptorRegistry {
        &self.interceptors
    }
}

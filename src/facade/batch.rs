use crate::core::{ConsistencyLevel, Result};
use crate::facade::manager::PersistenceManager;
use crate::flush::{AsyncCompletion, BatchingFlushContext, FlushHandle};
use crate::metadata::{Entity, PrimaryKey};
use crate::options::Options;

/// Explicit batch session.
///
/// Statements pushed by any number of operations accumulate without
/// executing until [`BatchSession::end_batch`]. Deferred post events fire in
/// push order only after the combined execution future succeeds. The
/// session is stateful and confined to one logical caller; after a failed
/// `end_batch` it must be discarded or recovered with
/// [`BatchSession::clean_batch`].
pub struct BatchSession<'m> {
    manager: &'m PersistenceManager,
    flush: BatchingFlushContext,
}

impl<'m> BatchSession<'m> {
    pub(crate) fn new(manager: &'m PersistenceManager) -> Self {
        Self {
            manager,
            flush: BatchingFlushContext::new(),
        }
    }

    /// Resets accumulators; operations are legal only after this.
    pub fn start_batch(&mut self) -> Result<()> {
        self.flush.start_batch(None)
    }

    /// Like [`BatchSession::start_batch`], fixing one consistency level for
    /// every statement of the batch.
    pub fn start_batch_with(&mut self, level: ConsistencyLevel) -> Result<()> {
        self.flush.start_batch(Some(level))
    }

    /// Splits accumulated statements into their regular and counter groups
    /// and submits both. Once the merged future succeeds, every deferred
    /// event fires in push order, then the per-operation listeners.
    pub async fn end_batch(&mut self) -> Result<()> {
        self.flush.ensure_started()?;
        let completion = AsyncCompletion::new(self.manager.interceptors());
        let listeners = completion
            .flush(self.flush.unit(), self.manager.gateway())
            .await?;
        for listener in listeners {
            listener.on_complete(None);
        }
        Ok(())
    }

    /// Discards accumulated state without executing; the error-recovery
    /// path after a failed batch.
    pub fn clean_batch(&mut self) -> Result<()> {
        log::warn!("batch session cleaned; accumulated statements discarded");
        self.flush.clean_batch()
    }

    fn handle(&self) -> FlushHandle {
        FlushHandle::Batching(self.flush.duplicate())
    }

    pub async fn persist<T: Entity>(&mut self, entity: T, options: Options) -> Result<T::Proxy> {
        self.flush.ensure_started()?;
        self.manager
            .persist_with(entity, options, self.handle())
            .await
    }

    pub async fn merge<T: Entity>(&mut self, proxy: &mut T::Proxy, options: Options) -> Result<()> {
        self.flush.ensure_started()?;
        self.manager
            .merge_with::<T>(proxy, options, self.handle())
            .await
    }

    pub async fn remove<T: Entity>(&mut self, proxy: T::Proxy, options: Options) -> Result<()> {
        self.flush.ensure_started()?;
        self.manager
            .remove_with::<T>(proxy, options, self.handle())
            .await
    }

    pub async fn remove_by_id<T: Entity>(
        &mut self,
        key: PrimaryKey,
        options: Options,
    ) -> Result<()> {
        self.flush.ensure_started()?;
        self.manager
            .remove_by_id_with::<T>(key, options, self.handle())
            .await
    }

    /// Reads execute immediately even inside a batch; only mutations defer.
    pub async fn find<T: Entity>(
        &mut self,
        key: PrimaryKey,
        options: Options,
    ) -> Result<Option<T::Proxy>> {
        self.flush.ensure_started()?;
        self.manager
            .find_with::<T>(key, options, self.handle())
            .await
    }

    pub async fn read_counter<T: Entity>(
        &mut self,
        key: &PrimaryKey,
        property: &str,
        options: Options,
    ) -> Result<Option<i64>> {
        self.flush.ensure_started()?;
        self.manager
            .read_counter_with::<T>(key, property, options, self.handle())
            .await
    }
}

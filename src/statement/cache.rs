use crate::core::Result;
use crate::gateway::{PreparedStatement, Session};
use crate::options::Options;
use crate::statement::StatementKind;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Option-dependent shape flags a cached statement was generated with.
/// Two calls differing in TTL presence or condition columns must not share
/// a prepared statement, even for the same dirty-set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct StatementVariant {
    pub ttl: bool,
    pub timestamp: bool,
    pub if_not_exists: bool,
    pub condition_columns: Vec<String>,
}

impl StatementVariant {
    pub fn of(options: &Options) -> Self {
        let mut condition_columns: Vec<String> = options
            .conditions
            .iter()
            .map(|c| c.column.clone())
            .collect();
        condition_columns.sort();
        Self {
            ttl: options.ttl.is_some(),
            timestamp: options.timestamp.is_some(),
            if_not_exists: options.if_not_exists,
            condition_columns,
        }
    }
}

/// Cache key: entity type, statement kind, the *sorted* changed-property
/// set (so two distinct dirty-sets of one entity type never collide), and
/// the option-dependent shape variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    entity: String,
    kind: StatementKind,
    properties: Vec<String>,
    variant: StatementVariant,
}

impl CacheKey {
    pub fn new(entity: impl Into<String>, kind: StatementKind, mut properties: Vec<String>) -> Self {
        properties.sort();
        Self {
            entity: entity.into(),
            kind,
            properties,
            variant: StatementVariant::default(),
        }
    }

    /// Key for statements whose shape does not depend on a property set.
    pub fn whole(entity: impl Into<String>, kind: StatementKind) -> Self {
        Self::new(entity, kind, Vec::new())
    }

    pub fn with_variant(mut self, variant: StatementVariant) -> Self {
        self.variant = variant;
        self
    }
}

/// Bounded prepared-statement cache with least-recently-used eviction.
///
/// Owned by one manager and shared across all of its concurrent operations.
/// The lock is held across the miss-path prepare, so concurrent requests for
/// one key converge on a single prepared instance.
pub struct StatementCache {
    inner: Mutex<LruCache<CacheKey, Arc<PreparedStatement>>>,
}

impl StatementCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Returns the cached statement for `key`, preparing and inserting it
    /// through `session` on a miss.
    pub async fn get_or_prepare(
        &self,
        key: CacheKey,
        query: &str,
        session: &dyn Session,
    ) -> Result<Arc<PreparedStatement>> {
        let mut cache = self.inner.lock().await;
        if let Some(prepared) = cache.get(&key) {
            return Ok(prepared.clone());
        }
        let prepared = Arc::new(session.prepare(query).await?);
        cache.put(key, prepared.clone());
        Ok(prepared)
    }

    pub async fn get(&self, key: &CacheKey) -> Option<Arc<PreparedStatement>> {
        self.inner.lock().await.get(key).cloned()
    }

    /// Lookup without promoting; test and diagnostic use.
    pub async fn peek(&self, key: &CacheKey) -> Option<Arc<PreparedStatement>> {
        self.inner.lock().await.peek(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

use crate::core::Result;
use crate::gateway::{PreparedStatement, Row, Session};
use crate::statement::{BatchKind, BoundStatement, CacheKey, StatementCache, StatementWrapper};
use std::sync::Arc;
use tracing::{event, info_span, Instrument, Level};

/// Thin executor in front of the external session: prepared-statement
/// caching, single-statement reads, and grouped mutation submission.
///
/// Shared across all operations of one manager; internally synchronized
/// (the cache mutex) and otherwise stateless.
#[derive(Clone)]
pub struct DaoGateway {
    session: Arc<dyn Session>,
    cache: Arc<StatementCache>,
    force_batch_order: bool,
}

impl DaoGateway {
    pub fn new(
        session: Arc<dyn Session>,
        cache: Arc<StatementCache>,
        force_batch_order: bool,
    ) -> Self {
        Self {
            session,
            cache,
            force_batch_order,
        }
    }

    pub fn statement_cache(&self) -> &StatementCache {
        &self.cache
    }

    /// Cache-through prepare; concurrent requests for one key converge on a
    /// single prepared instance.
    pub async fn prepare_cached(
        &self,
        key: CacheKey,
        query: &str,
    ) -> Result<Arc<PreparedStatement>> {
        self.cache
            .get_or_prepare(key, query, self.session.as_ref())
            .await
    }

    /// Executes one read statement directly.
    pub async fn execute(&self, statement: BoundStatement) -> Result<Vec<Row>> {
        self.session.execute(statement).await
    }

    /// Submits one statement group under its envelope. Empty groups are
    /// skipped without touching the session.
    pub async fn submit_group(
        &self,
        mut wrappers: Vec<StatementWrapper>,
        kind: BatchKind,
    ) -> Result<Vec<Row>> {
        if wrappers.is_empty() {
            return Ok(Vec::new());
        }
        if self.force_batch_order {
            wrappers.sort_by(|a, b| {
                a.table
                    .cmp(&b.table)
                    .then_with(|| a.statement.query.cmp(&b.statement.query))
            });
        }
        let span = info_span!("submit_group", kind = ?kind, statements = wrappers.len());
        let statements: Vec<BoundStatement> = wrappers.into_iter().map(|w| w.statement).collect();
        async {
            let result = self.session.execute_batch(statements, kind).await;
            match &result {
                Ok(_) => event!(Level::DEBUG, "statement group submitted"),
                Err(err) => {
                    event!(Level::ERROR, error = %err, "statement group submission failed");
                }
            }
            result
        }
        .instrument(span)
        .await
    }
}

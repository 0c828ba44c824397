#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use widerow::{
    BatchKind, BoundStatement, ColumnValue, CompletionListener, ConsistencyLevel, Counter, Entity,
    EventRecord, LifecycleListener, ManagerConfig, Map, PersistenceError, PersistenceManager,
    PreparedStatement, Result, Row, Session, Set,
};

// -- fixture entities -------------------------------------------------------

#[derive(Entity)]
#[entity(table = "users", keyspace = "app")]
pub struct User {
    #[partition_key]
    pub id: i64,
    #[column(name = "user_name")]
    pub name: String,
    pub email: Option<String>,
    pub tags: Set<String>,
    pub scores: Map<String, i64>,
}

impl User {
    pub fn sample(id: i64) -> Self {
        Self {
            id,
            name: format!("user-{id}"),
            email: Some(format!("user-{id}@example.com")),
            tags: ["alpha".to_string(), "beta".to_string()]
                .into_iter()
                .collect(),
            scores: [("initial".to_string(), 1i64)].into_iter().collect(),
        }
    }
}

/// Regular entity with a simple counter: the counter lives in the shared
/// counter table, not in `posts`.
#[derive(Entity)]
#[entity(table = "posts")]
pub struct Post {
    #[partition_key]
    pub id: i64,
    pub body: String,
    #[column(write_consistency = "QUORUM", read_consistency = "QUORUM")]
    pub views: Counter,
}

impl Post {
    pub fn sample(id: i64) -> Self {
        Self {
            id,
            body: format!("post body {id}"),
            views: Counter::new(),
        }
    }
}

/// Clustered-counter entity: every non-key property is a counter, so the
/// counters live in `click_counts` itself.
#[derive(Entity)]
#[entity(table = "click_counts")]
pub struct ClickCount {
    #[partition_key]
    pub user_id: i64,
    #[clustering_key]
    pub day: String,
    pub clicks: Counter,
}

impl ClickCount {
    pub fn new(user_id: i64, day: &str) -> Self {
        Self {
            user_id,
            day: day.to_string(),
            clicks: Counter::new(),
        }
    }
}

// -- recording session ------------------------------------------------------

#[derive(Debug, Clone)]
pub enum Recorded {
    Execute(BoundStatement),
    Batch {
        kind: BatchKind,
        statements: Vec<BoundStatement>,
    },
}

/// Mock session standing in for the external store: records every prepare
/// and submission, serves queued rows for reads, and can fail submissions
/// on demand.
pub struct RecordingSession {
    next_id: AtomicU64,
    prepared: Mutex<Vec<String>>,
    calls: Mutex<Vec<Recorded>>,
    rows: Mutex<VecDeque<Vec<Row>>>,
    fail_batches: AtomicBool,
}

impl RecordingSession {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_id: AtomicU64::new(1),
            prepared: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            rows: Mutex::new(VecDeque::new()),
            fail_batches: AtomicBool::new(false),
        })
    }

    /// Queues the response for the next `execute` call.
    pub fn queue_rows(&self, rows: Vec<Row>) {
        self.rows.lock().unwrap().push_back(rows);
    }

    pub fn fail_next_batch(&self) {
        self.fail_batches.store(true, Ordering::SeqCst);
    }

    pub fn prepared_queries(&self) -> Vec<String> {
        self.prepared.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<Recorded> {
        self.calls.lock().unwrap().clone()
    }

    pub fn batch_calls(&self) -> Vec<(BatchKind, Vec<BoundStatement>)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Recorded::Batch { kind, statements } => Some((kind, statements)),
                Recorded::Execute(_) => None,
            })
            .collect()
    }

    pub fn executed_statements(&self) -> Vec<BoundStatement> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Recorded::Execute(statement) => Some(statement),
                Recorded::Batch { .. } => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
        self.prepared.lock().unwrap().clear();
    }
}

#[async_trait]
impl Session for RecordingSession {
    async fn prepare(&self, query: &str) -> Result<PreparedStatement> {
        self.prepared.lock().unwrap().push(query.to_string());
        Ok(PreparedStatement {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            query: query.to_string(),
        })
    }

    async fn execute(&self, statement: BoundStatement) -> Result<Vec<Row>> {
        self.calls
            .lock()
            .unwrap()
            .push(Recorded::Execute(statement));
        Ok(self.rows.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn execute_batch(
        &self,
        statements: Vec<BoundStatement>,
        kind: BatchKind,
    ) -> Result<Vec<Row>> {
        if self.fail_batches.swap(false, Ordering::SeqCst) {
            return Err(PersistenceError::Gateway("injected batch failure".into()));
        }
        self.calls
            .lock()
            .unwrap()
            .push(Recorded::Batch { kind, statements });
        Ok(Vec::new())
    }
}

// -- observers --------------------------------------------------------------

#[derive(Default)]
pub struct EventLog {
    events: Mutex<Vec<EventRecord>>,
}

impl EventLog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<EventRecord> {
        self.events.lock().unwrap().clone()
    }
}

impl LifecycleListener for EventLog {
    fn on_event(&self, event: &EventRecord) {
        self.events.lock().unwrap().push(event.clone());
    }
}

#[derive(Default)]
pub struct CompletionProbe {
    outcomes: Mutex<Vec<Option<String>>>,
}

impl CompletionProbe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn outcomes(&self) -> Vec<Option<String>> {
        self.outcomes.lock().unwrap().clone()
    }
}

impl CompletionListener for CompletionProbe {
    fn on_complete(&self, error: Option<&PersistenceError>) {
        self.outcomes
            .lock()
            .unwrap()
            .push(error.map(|e| e.to_string()));
    }
}

// -- wiring -----------------------------------------------------------------

pub fn base_config() -> ManagerConfig {
    ManagerConfig::new()
        .default_read_consistency(ConsistencyLevel::One)
        .default_write_consistency(ConsistencyLevel::One)
}

pub fn manager(session: Arc<RecordingSession>) -> PersistenceManager {
    PersistenceManager::builder(session)
        .config(base_config())
        .register_entity::<User>()
        .register_entity::<Post>()
        .register_entity::<ClickCount>()
        .build()
        .unwrap()
}

/// Builds the result row a `find` for `entity` would get back, mapping
/// property values to their column names.
pub fn row_for<T: Entity>(entity: &T) -> Row {
    let meta = T::metadata();
    let mut row = Row::new();
    for (property, value) in entity.to_columns() {
        let column = meta
            .property(&property)
            .map(|p| p.column.clone())
            .unwrap_or(property);
        row.insert(column, value);
    }
    row
}

pub fn bigint(value: i64) -> ColumnValue {
    ColumnValue::BigInt(value)
}

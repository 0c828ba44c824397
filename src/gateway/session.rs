use crate::core::{ColumnCodec, ColumnValue, Result};
use crate::statement::{BatchKind, BoundStatement};
use async_trait::async_trait;

/// Handle to a statement prepared by the underlying session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedStatement {
    pub id: u64,
    pub query: String,
}

/// One result row: ordered `(column, value)` pairs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, ColumnValue)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs(columns: Vec<(String, ColumnValue)>) -> Self {
        Self { columns }
    }

    pub fn insert(&mut self, column: impl Into<String>, value: ColumnValue) {
        self.columns.push((column.into(), value));
    }

    pub fn get(&self, column: &str) -> Option<&ColumnValue> {
        self.columns
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v)
    }

    /// Decodes one column; an absent column reads as null, which lets
    /// entities whose counters live in a separate table decode cleanly.
    pub fn decode<T: ColumnCodec>(&self, column: &str) -> Result<T> {
        let value = self.get(column).cloned().unwrap_or(ColumnValue::Null);
        T::from_column(value)
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[(String, ColumnValue)] {
        &self.columns
    }

    /// Diagnostic JSON rendering used in trace output.
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for (column, value) in &self.columns {
            map.insert(column.clone(), value.to_json());
        }
        serde_json::Value::Object(map)
    }
}

/// The external driver/session abstraction this engine delegates to.
///
/// Implementations own connection handling, timeouts, and retries; this
/// layer never blocks on them and never retries through them.
#[async_trait]
pub trait Session: Send + Sync {
    async fn prepare(&self, query: &str) -> Result<PreparedStatement>;

    async fn execute(&self, statement: BoundStatement) -> Result<Vec<Row>>;

    /// Submits one statement group. `kind` selects the counter envelope;
    /// callers guarantee a group never mixes counter and non-counter
    /// mutations.
    async fn execute_batch(
        &self,
        statements: Vec<BoundStatement>,
        kind: BatchKind,
    ) -> Result<Vec<Row>>;
}

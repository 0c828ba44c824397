use crate::core::{ColumnValue, ConsistencyLevel, SerialConsistency};

/// What a generated statement does; part of the cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Insert,
    Update,
    Delete,
    SelectRow,
    SelectProperty,
    CounterIncrement,
    CounterSelect,
    CounterDelete,
}

/// Which execution envelope a statement group travels in. The store forbids
/// mixing counter and non-counter mutations in one group, so the split is
/// structural.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchKind {
    Regular,
    Counter,
}

/// An executable statement: query text, bound values, and the consistency
/// it must run under.
#[derive(Debug, Clone)]
pub struct BoundStatement {
    pub query: String,
    pub values: Vec<ColumnValue>,
    pub consistency: ConsistencyLevel,
    pub serial_consistency: Option<SerialConsistency>,
}

impl BoundStatement {
    pub fn new(query: impl Into<String>, values: Vec<ColumnValue>) -> Self {
        Self {
            query: query.into(),
            values,
            consistency: ConsistencyLevel::One,
            serial_consistency: None,
        }
    }

    pub fn consistency(mut self, level: ConsistencyLevel) -> Self {
        self.consistency = level;
        self
    }

    pub fn serial_consistency(mut self, level: Option<SerialConsistency>) -> Self {
        self.serial_consistency = level;
        self
    }
}

/// A statement queued in a flush unit, tagged with enough context for
/// deterministic ordering and tracing.
#[derive(Debug, Clone)]
pub struct StatementWrapper {
    pub kind: StatementKind,
    pub table: String,
    pub statement: BoundStatement,
}

impl StatementWrapper {
    pub fn new(kind: StatementKind, table: impl Into<String>, statement: BoundStatement) -> Self {
        Self {
            kind,
            table: table.into(),
            statement,
        }
    }
}

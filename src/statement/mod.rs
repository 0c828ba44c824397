pub mod cache;
pub mod generator;
pub mod wrapper;

pub use cache::{CacheKey, StatementCache, StatementVariant};
pub use generator::{StatementGenerator, SIMPLE_COUNTER_TABLE};
pub use wrapper::{BatchKind, BoundStatement, StatementKind, StatementWrapper};

//! Recommended API entrypoints grouped by abstraction level.
//!
//! `dx` is the stable default for application code mapping domain structs.
//! `advanced` is an explicit escape hatch for engine internals.

pub mod dx {
    //! Stable high-level surface for entity-first applications.
    //!
    //! Intended usage in app code:
    //! - `#[derive(Entity)]` on domain structs,
    //! - `PersistenceManager` / `BatchSession` for operations,
    //! - `Options` for per-call overrides,
    //! - `Counter`, `List`, `Set`, `Map` as tracked field types.
    pub use crate::{
        BatchSession, ColumnValue, ConsistencyLevel, Counter, Entity, List, ManagerConfig, Map,
        Options, PersistenceError, PersistenceManager, PrimaryKey, Result, SerialConsistency, Set,
    };
}

pub mod advanced {
    //! Escape hatch for engine internals.
    //!
    //! App-level product code should normally stay on `prelude::dx`.
    pub use crate::consistency::{ConsistencyDefaults, ConsistencyResolver};
    pub use crate::context::PersistenceContext;
    pub use crate::flush::{
        AsyncCompletion, BatchingFlushContext, FlushHandle, FlushState, FlushUnit,
        ImmediateFlushContext,
    };
    pub use crate::gateway::{DaoGateway, PreparedStatement, Row, Session};
    pub use crate::statement::{
        BatchKind, BoundStatement, CacheKey, StatementCache, StatementGenerator, StatementKind,
        StatementWrapper,
    };
}

// ============================================================================
// widerow Library
// ============================================================================

//! Asynchronous persistence engine for wide-column stores.
//!
//! `widerow` sits between typed entity structs and an external session
//! abstraction: it maps entities to rows, resolves per-operation consistency
//! through a four-layer precedence chain, tracks which fields actually
//! changed so updates carry only minimal mutations, and flushes generated
//! statements either immediately or at the end of an explicit batch,
//! keeping counter and non-counter mutations in structurally separate
//! statement groups throughout.

pub mod consistency;
pub mod context;
pub mod core;
pub mod counter;
pub mod facade;
pub mod flush;
pub mod gateway;
pub mod lifecycle;
pub mod metadata;
pub mod options;
pub mod prelude;
pub mod proxy;
pub mod statement;

// Re-export main types for convenience
pub use crate::core::{
    AccessKind, ColumnCodec, ColumnValue, ConsistencyLevel, PersistenceError, Result,
    SerialConsistency,
};
pub use consistency::{ConsistencyDefaults, ConsistencyResolver};
pub use context::PersistenceContext;
pub use counter::{Counter, CounterCoordinator};
pub use facade::{BatchSession, ManagerConfig, PersistenceManager, PersistenceManagerBuilder};
pub use flush::{
    AsyncCompletion, BatchingFlushContext, FlushHandle, FlushState, FlushUnit,
    ImmediateFlushContext,
};
pub use gateway::{DaoGateway, PreparedStatement, Row, Session};
pub use lifecycle::{
    CompletionListener, EventRecord, Interceptor, InterceptorRegistry, LifecycleListener, Phase,
};
pub use metadata::{
    Entity, EntityMeta, EntityMetaBuilder, KeyShape, MetadataRegistry, PrimaryKey, PropertyKind,
    PropertyMeta,
};
pub use options::{ColumnCondition, Options};
pub use proxy::{DirtyMap, List, ManagedState, Map, Proxied, ProxyStatus, Set};
pub use statement::{
    BatchKind, BoundStatement, CacheKey, StatementCache, StatementGenerator, StatementKind,
    StatementVariant, StatementWrapper, SIMPLE_COUNTER_TABLE,
};

// Derive macro: `#[derive(Entity)]` generates the `Entity` impl, the static
// metadata constructor, and the per-entity managed wrapper type.
pub use widerow_derive::Entity;

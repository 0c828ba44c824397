mod support;

use std::num::NonZeroUsize;
use std::sync::Arc;
use support::{ClickCount, Post, RecordingSession, User};
use widerow::{
    ConsistencyDefaults, ConsistencyLevel, ConsistencyResolver, DaoGateway, Entity, FlushHandle,
    KeyShape, Options, PersistenceContext, PropertyKind, StatementCache, StatementGenerator,
};

#[test]
fn derive_builds_the_expected_user_metadata() {
    let meta = User::metadata();
    assert_eq!(meta.name, "User");
    assert_eq!(meta.table, "users");
    assert_eq!(meta.keyspace.as_deref(), Some("app"));
    assert_eq!(meta.qualified_table(), "app.users");
    assert_eq!(meta.key_shape, KeyShape::Simple);

    let name = meta.property("name").unwrap();
    assert_eq!(name.column, "user_name");
    assert_eq!(name.kind, PropertyKind::Regular);
    assert_eq!(name.cql_type, "text");

    assert_eq!(meta.property("tags").unwrap().kind, PropertyKind::Set);
    assert_eq!(meta.property("scores").unwrap().kind, PropertyKind::Map);
    assert!(!meta.has_counters());
}

#[test]
fn derive_classifies_counters_by_field_type() {
    let meta = Post::metadata();
    let views = meta.property("views").unwrap();
    assert_eq!(views.kind, PropertyKind::Counter);
    assert_eq!(views.write_consistency, Some(ConsistencyLevel::Quorum));
    assert!(meta.has_simple_counters());
    assert!(!meta.is_clustered_counter());

    let meta = ClickCount::metadata();
    assert!(meta.is_clustered_counter());
    assert_eq!(
        meta.key_shape,
        KeyShape::Composite {
            partition: 1,
            clustering: 1
        }
    );
}

#[test]
fn metadata_is_built_exactly_once() {
    assert!(std::ptr::eq(User::metadata(), User::metadata()));
}

#[test]
fn primary_key_extraction_orders_partition_before_clustering() {
    let cc = ClickCount::new(9, "2026-08-06");
    let key = cc.primary_key();
    assert_eq!(key.render(), "user_id=9:day=2026-08-06");
    assert_eq!(key.partition_components().len(), 1);
}

fn sample_context(handle: FlushHandle) -> PersistenceContext {
    let session = RecordingSession::new();
    let gateway = DaoGateway::new(
        session,
        Arc::new(StatementCache::new(NonZeroUsize::new(16).unwrap())),
        false,
    );
    let resolver = ConsistencyResolver::new(ConsistencyDefaults {
        read: ConsistencyLevel::One,
        write: ConsistencyLevel::One,
    });
    PersistenceContext::new(
        User::metadata(),
        Options::new(),
        handle,
        gateway,
        resolver,
        StatementGenerator::new(),
    )
}

#[test]
fn duplicated_immediate_context_gets_an_independent_accumulator() {
    let ctx = sample_context(FlushHandle::immediate());
    let child = ctx.duplicate_for(Post::metadata());
    assert_eq!(child.meta().name, "Post");
    assert!(!Arc::ptr_eq(
        ctx.flush_handle().unit(),
        child.flush_handle().unit()
    ));
}

#[test]
fn duplicated_batching_context_shares_the_accumulator() {
    let batching = widerow::BatchingFlushContext::new();
    batching.start_batch(None).unwrap();
    let ctx = sample_context(FlushHandle::Batching(batching));
    let child = ctx.duplicate_for(Post::metadata());
    assert!(Arc::ptr_eq(
        ctx.flush_handle().unit(),
        child.flush_handle().unit()
    ));
}

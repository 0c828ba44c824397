mod support;

use support::{manager, ClickCount, Post, RecordingSession};
use widerow::{
    BatchKind, ColumnValue, ConsistencyLevel, Options, PersistenceError, PrimaryKey, Row,
    SIMPLE_COUNTER_TABLE,
};

#[tokio::test]
async fn counter_and_regular_statements_never_share_a_group() {
    let session = RecordingSession::new();
    let manager = manager(session.clone());

    let mut post = Post::sample(1);
    post.views.incr_by(5);
    manager.persist(post, Options::new()).await.unwrap();

    let batches = session.batch_calls();
    assert_eq!(batches.len(), 2);

    let regular: Vec<_> = batches
        .iter()
        .filter(|(kind, _)| *kind == BatchKind::Regular)
        .collect();
    let counter: Vec<_> = batches
        .iter()
        .filter(|(kind, _)| *kind == BatchKind::Counter)
        .collect();
    assert_eq!(regular.len(), 1);
    assert_eq!(counter.len(), 1);

    assert_eq!(
        regular[0].1[0].query,
        "INSERT INTO posts (id, body) VALUES (?, ?)"
    );
    let increment = &counter[0].1[0];
    assert!(increment.query.contains(SIMPLE_COUNTER_TABLE));
    assert_eq!(
        increment.values,
        vec![
            ColumnValue::BigInt(5),
            ColumnValue::Text("Post".into()),
            ColumnValue::Text("id=1".into()),
            ColumnValue::Text("views".into()),
        ]
    );
}

#[tokio::test]
async fn counter_only_merge_submits_only_the_counter_group() {
    let session = RecordingSession::new();
    let manager = manager(session.clone());

    let mut proxy = manager
        .persist(Post::sample(2), Options::new())
        .await
        .unwrap();
    session.clear();

    proxy.views_mut().incr();
    proxy.views_mut().incr();
    proxy.views_mut().decr();
    manager.merge::<Post>(&mut proxy, Options::new()).await.unwrap();

    let batches = session.batch_calls();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].0, BatchKind::Counter);
    assert_eq!(batches[0].1[0].values[0], ColumnValue::BigInt(1));

    // the local view settles after the flush
    assert_eq!(proxy.views().get(), Some(1));
    assert_eq!(proxy.views().delta(), 0);
}

#[tokio::test]
async fn counter_write_uses_the_property_consistency() {
    let session = RecordingSession::new();
    let manager = manager(session.clone());

    let mut proxy = manager
        .persist(Post::sample(3), Options::new())
        .await
        .unwrap();
    session.clear();

    proxy.views_mut().incr();
    manager.merge::<Post>(&mut proxy, Options::new()).await.unwrap();

    let batches = session.batch_calls();
    // `views` carries write_consistency = QUORUM, overriding the global ONE
    assert_eq!(batches[0].1[0].consistency, ConsistencyLevel::Quorum);
}

#[tokio::test]
async fn clustered_counter_persist_writes_increments_in_its_own_table() {
    let session = RecordingSession::new();
    let manager = manager(session.clone());

    let mut cc = ClickCount::new(1, "2026-08-06");
    cc.clicks.incr_by(10);
    manager.persist(cc, Options::new()).await.unwrap();

    let batches = session.batch_calls();
    assert_eq!(batches.len(), 1, "no insert for a clustered-counter entity");
    assert_eq!(batches[0].0, BatchKind::Counter);
    assert_eq!(
        batches[0].1[0].query,
        "UPDATE click_counts SET clicks = clicks + ? WHERE user_id = ? AND day = ?"
    );
    assert_eq!(
        batches[0].1[0].values,
        vec![
            ColumnValue::BigInt(10),
            ColumnValue::BigInt(1),
            ColumnValue::Text("2026-08-06".into()),
        ]
    );
}

#[tokio::test]
async fn clustered_counter_persist_with_all_null_counters_fails_before_io() {
    let session = RecordingSession::new();
    let manager = manager(session.clone());

    let err = manager
        .persist(ClickCount::new(1, "2026-08-06"), Options::new())
        .await
        .unwrap_err();
    assert!(matches!(err, PersistenceError::Validation(_)));
    assert!(session.calls().is_empty());
    assert!(session.prepared_queries().is_empty());
}

#[tokio::test]
async fn removing_an_entity_also_removes_its_simple_counters() {
    let session = RecordingSession::new();
    let manager = manager(session.clone());

    let proxy = manager
        .persist(Post::sample(4), Options::new())
        .await
        .unwrap();
    session.clear();

    manager.remove::<Post>(proxy, Options::new()).await.unwrap();

    let batches = session.batch_calls();
    assert_eq!(batches.len(), 2);
    let (regular, counter): (Vec<_>, Vec<_>) = batches
        .into_iter()
        .partition(|(kind, _)| *kind == BatchKind::Regular);
    assert_eq!(regular[0].1[0].query, "DELETE FROM posts WHERE id = ?");
    assert_eq!(
        counter[0].1[0].query,
        format!("DELETE FROM {SIMPLE_COUNTER_TABLE} WHERE entity_name = ? AND row_key = ?")
    );
}

#[tokio::test]
async fn clustered_counter_removal_travels_in_the_counter_group() {
    let session = RecordingSession::new();
    let manager = manager(session.clone());

    let mut cc = ClickCount::new(2, "2026-08-06");
    cc.clicks.incr();
    let proxy = manager.persist(cc, Options::new()).await.unwrap();
    session.clear();

    manager
        .remove::<ClickCount>(proxy, Options::new())
        .await
        .unwrap();

    let batches = session.batch_calls();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].0, BatchKind::Counter);
    assert_eq!(
        batches[0].1[0].query,
        "DELETE FROM click_counts WHERE user_id = ? AND day = ?"
    );
}

#[tokio::test]
async fn read_counter_reads_directly_from_the_shared_table() {
    let session = RecordingSession::new();
    let manager = manager(session.clone());

    let mut row = Row::new();
    row.insert("counter_value", ColumnValue::Counter(42));
    session.queue_rows(vec![row]);

    let key = PrimaryKey::simple("id", ColumnValue::BigInt(1));
    let value = manager
        .read_counter::<Post>(&key, "views", Options::new())
        .await
        .unwrap();
    assert_eq!(value, Some(42));

    let executed = session.executed_statements();
    assert_eq!(executed.len(), 1);
    assert!(executed[0].query.contains(SIMPLE_COUNTER_TABLE));
    // counter reads resolve through the property's own descriptor
    assert_eq!(executed[0].consistency, ConsistencyLevel::Quorum);
}

#[tokio::test]
async fn read_counter_on_a_clustered_entity_selects_its_own_column() {
    let session = RecordingSession::new();
    let manager = manager(session.clone());

    let mut row = Row::new();
    row.insert("clicks", ColumnValue::Counter(7));
    session.queue_rows(vec![row]);

    let key = PrimaryKey::composite(
        vec![("user_id".into(), ColumnValue::BigInt(1))],
        vec![("day".into(), ColumnValue::Text("2026-08-06".into()))],
    );
    let value = manager
        .read_counter::<ClickCount>(&key, "clicks", Options::new())
        .await
        .unwrap();
    assert_eq!(value, Some(7));

    let executed = session.executed_statements();
    assert_eq!(
        executed[0].query,
        "SELECT clicks FROM click_counts WHERE user_id = ? AND day = ?"
    );
}

#[tokio::test]
async fn read_counter_of_a_missing_row_is_none() {
    let session = RecordingSession::new();
    let manager = manager(session.clone());

    session.queue_rows(vec![]);
    let key = PrimaryKey::simple("id", ColumnValue::BigInt(99));
    let value = manager
        .read_counter::<Post>(&key, "views", Options::new())
        .await
        .unwrap();
    assert_eq!(value, None);
}

#[tokio::test]
async fn non_counter_property_is_rejected_for_counter_reads() {
    let session = RecordingSession::new();
    let manager = manager(session.clone());

    let key = PrimaryKey::simple("id", ColumnValue::BigInt(1));
    let err = manager
        .read_counter::<Post>(&key, "body", Options::new())
        .await
        .unwrap_err();
    assert!(matches!(err, PersistenceError::Metadata(_)));
}

mod support;

use support::{manager, ClickCount, RecordingSession, User};
use widerow::{ColumnValue, Options, PersistenceError};

#[tokio::test]
async fn ttl_and_timestamp_render_using_clauses_in_bind_order() {
    let session = RecordingSession::new();
    let manager = manager(session.clone());

    manager
        .persist(User::sample(1), Options::new().ttl(3600))
        .await
        .unwrap();

    let batches = session.batch_calls();
    let statement = &batches[0].1[0];
    assert!(statement.query.ends_with("USING TTL ?"));
    assert_eq!(
        statement.values.last().unwrap(),
        &ColumnValue::Int(3600),
        "TTL binds after the column values"
    );

    session.clear();
    manager
        .persist(User::sample(2), Options::new().ttl(60).timestamp(1_700_000_000))
        .await
        .unwrap();
    let batches = session.batch_calls();
    let statement = &batches[0].1[0];
    assert!(statement.query.ends_with("USING TTL ? AND TIMESTAMP ?"));
    let n = statement.values.len();
    assert_eq!(statement.values[n - 2], ColumnValue::Int(60));
    assert_eq!(statement.values[n - 1], ColumnValue::BigInt(1_700_000_000));
}

#[tokio::test]
async fn conditional_update_binds_predicates_last() {
    let session = RecordingSession::new();
    let manager = manager(session.clone());

    let mut proxy = manager
        .persist(User::sample(3), Options::new())
        .await
        .unwrap();
    session.clear();

    proxy.set_name("renamed".to_string());
    manager
        .merge::<User>(
            &mut proxy,
            Options::new().condition("email", ColumnValue::Text("user-3@example.com".into())),
        )
        .await
        .unwrap();

    let statement = &session.batch_calls()[0].1[0];
    assert_eq!(
        statement.query,
        "UPDATE app.users SET user_name = ? WHERE id = ? IF email = ?"
    );
    assert_eq!(
        statement.values,
        vec![
            ColumnValue::Text("renamed".into()),
            ColumnValue::BigInt(3),
            ColumnValue::Text("user-3@example.com".into()),
        ]
    );
}

#[tokio::test]
async fn fixed_timestamp_and_conditions_are_rejected_before_io() {
    let session = RecordingSession::new();
    let manager = manager(session.clone());

    let err = manager
        .persist(
            User::sample(4),
            Options::new().timestamp(1).if_not_exists(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, PersistenceError::Validation(_)));
    assert!(session.calls().is_empty());
}

#[tokio::test]
async fn ttl_on_a_clustered_counter_entity_is_rejected_before_io() {
    let session = RecordingSession::new();
    let manager = manager(session.clone());

    let mut cc = ClickCount::new(1, "2026-08-06");
    cc.clicks.incr();
    let err = manager
        .persist(cc, Options::new().ttl(60))
        .await
        .unwrap_err();
    assert!(matches!(err, PersistenceError::Validation(_)));
    assert!(session.calls().is_empty());
}

#[tokio::test]
async fn null_primary_key_component_is_rejected_before_io() {
    let session = RecordingSession::new();
    let manager = manager(session.clone());

    let err = manager
        .find::<User>(
            widerow::PrimaryKey::simple("id", ColumnValue::Null),
            Options::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, PersistenceError::Validation(_)));
    assert!(session.calls().is_empty());
}

#[tokio::test]
async fn delete_with_timestamp_keeps_marker_and_value_order() {
    let session = RecordingSession::new();
    let manager = manager(session.clone());

    let proxy = manager
        .persist(User::sample(6), Options::new())
        .await
        .unwrap();
    session.clear();

    manager
        .remove::<User>(proxy, Options::new().timestamp(123))
        .await
        .unwrap();

    let statement = &session.batch_calls()[0].1[0];
    assert_eq!(
        statement.query,
        "DELETE FROM app.users USING TIMESTAMP ? WHERE id = ?"
    );
    assert_eq!(
        statement.values,
        vec![ColumnValue::BigInt(123), ColumnValue::BigInt(6)]
    );
}

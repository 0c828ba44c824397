mod support;

use std::sync::Arc;
use support::{manager, CompletionProbe, RecordingSession, User};
use widerow::{BatchKind, ColumnValue, Options, Proxied};

#[tokio::test]
async fn repeated_mutations_mark_each_property_exactly_once() {
    let session = RecordingSession::new();
    let manager = manager(session.clone());

    let mut proxy = manager
        .persist(User::sample(1), Options::new())
        .await
        .unwrap();

    proxy.set_name("a".to_string());
    proxy.set_name("b".to_string());
    proxy.set_name("c".to_string());
    proxy.set_email(Some("x@example.com".to_string()));
    proxy.set_name("d".to_string());

    assert_eq!(
        proxy.state().effective_dirty(),
        vec!["email".to_string(), "name".to_string()]
    );
}

#[tokio::test]
async fn in_place_collection_mutation_marks_the_owning_property() {
    let session = RecordingSession::new();
    let manager = manager(session.clone());

    let mut proxy = manager
        .persist(User::sample(2), Options::new())
        .await
        .unwrap();

    proxy.tags_mut().insert("gamma".to_string());
    proxy.scores_mut().insert("late".to_string(), 9);

    let dirty = proxy.state().effective_dirty();
    assert_eq!(dirty, vec!["scores".to_string(), "tags".to_string()]);
}

#[tokio::test]
async fn read_paths_do_not_mark_dirty() {
    let session = RecordingSession::new();
    let manager = manager(session.clone());

    let proxy = manager
        .persist(User::sample(3), Options::new())
        .await
        .unwrap();

    assert!(proxy.tags().contains(&"alpha".to_string()));
    assert_eq!(proxy.tags().len(), 2);
    let _ = proxy.tags().iter().count();
    assert_eq!(proxy.scores().get(&"initial".to_string()), Some(&1));
    assert_eq!(proxy.name(), "user-3");

    assert!(proxy.state().effective_dirty().is_empty());
}

#[tokio::test]
async fn empty_dirty_merge_is_a_no_op() {
    let session = RecordingSession::new();
    let manager = manager(session.clone());

    let mut proxy = manager
        .persist(User::sample(4), Options::new())
        .await
        .unwrap();
    session.clear();

    let probe = CompletionProbe::new();
    manager
        .merge::<User>(
            &mut proxy,
            Options::new().listener(probe.clone() as Arc<dyn widerow::CompletionListener>),
        )
        .await
        .unwrap();

    // no statement generated, nothing prepared, nothing executed
    assert!(session.calls().is_empty());
    assert!(session.prepared_queries().is_empty());
    // the completion listener still observes the (empty) success
    assert_eq!(probe.outcomes(), vec![None]);
}

#[tokio::test]
async fn merge_sends_only_the_changed_properties_sorted() {
    let session = RecordingSession::new();
    let manager = manager(session.clone());

    let mut proxy = manager
        .persist(User::sample(5), Options::new())
        .await
        .unwrap();
    session.clear();

    proxy.set_name("renamed".to_string());
    proxy.tags_mut().remove(&"alpha".to_string());
    manager.merge::<User>(&mut proxy, Options::new()).await.unwrap();

    let batches = session.batch_calls();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].0, BatchKind::Regular);
    let statement = &batches[0].1[0];
    assert_eq!(
        statement.query,
        "UPDATE app.users SET user_name = ?, tags = ? WHERE id = ?"
    );
    assert_eq!(statement.values[0], ColumnValue::Text("renamed".into()));
    assert_eq!(
        statement.values[1],
        ColumnValue::Set(vec![ColumnValue::Text("beta".into())])
    );
    assert_eq!(statement.values[2], ColumnValue::BigInt(5));

    // successful flush clears the tracking state
    assert!(proxy.state().effective_dirty().is_empty());
}

#[tokio::test]
async fn second_merge_after_flush_sends_nothing() {
    let session = RecordingSession::new();
    let manager = manager(session.clone());

    let mut proxy = manager
        .persist(User::sample(6), Options::new())
        .await
        .unwrap();
    proxy.set_name("once".to_string());
    manager.merge::<User>(&mut proxy, Options::new()).await.unwrap();
    session.clear();

    manager.merge::<User>(&mut proxy, Options::new()).await.unwrap();
    assert!(session.calls().is_empty());
}

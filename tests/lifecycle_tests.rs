mod support;

use std::sync::Arc;
use support::{base_config, row_for, CompletionProbe, EventLog, RecordingSession, User};
use widerow::{ColumnValue, Interceptor, Options, PersistenceManager, Phase, PrimaryKey};

struct StampEmail;

impl Interceptor<User> for StampEmail {
    fn intercept(&self, entity: &mut User, phase: Phase) {
        if phase == Phase::PrePersist {
            entity.email = Some("stamped@example.com".to_string());
        }
        if phase == Phase::PostLoad {
            entity.name = format!("{}!", entity.name);
        }
    }
}

fn build_manager(
    session: Arc<RecordingSession>,
    log: Arc<EventLog>,
) -> PersistenceManager {
    PersistenceManager::builder(session)
        .config(base_config())
        .register_entity::<User>()
        .interceptor::<User>(Arc::new(StampEmail))
        .listener(log)
        .build()
        .unwrap()
}

#[tokio::test]
async fn pre_persist_interceptor_mutations_reach_the_statement() {
    let session = RecordingSession::new();
    let manager = build_manager(session.clone(), EventLog::new());

    let proxy = manager
        .persist(User::sample(1), Options::new())
        .await
        .unwrap();

    // the interceptor ran before statement generation
    let statement = &session.batch_calls()[0].1[0];
    assert_eq!(
        statement.values[2],
        ColumnValue::Text("stamped@example.com".into())
    );
    assert_eq!(
        proxy.email().as_deref(),
        Some("stamped@example.com"),
        "the returned wrapper reflects the intercepted instance"
    );
}

#[tokio::test]
async fn post_load_interceptor_runs_on_find() {
    let session = RecordingSession::new();
    let manager = build_manager(session.clone(), EventLog::new());

    session.queue_rows(vec![row_for(&User::sample(2))]);
    let found = manager
        .find::<User>(PrimaryKey::simple("id", ColumnValue::BigInt(2)), Options::new())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.name(), "user-2!");
}

#[tokio::test]
async fn events_fire_pre_before_io_and_post_after() {
    let session = RecordingSession::new();
    let log = EventLog::new();
    let manager = build_manager(session.clone(), log.clone());

    manager
        .persist(User::sample(3), Options::new())
        .await
        .unwrap();

    let phases: Vec<Phase> = log.events().iter().map(|e| e.phase).collect();
    assert_eq!(phases, vec![Phase::PrePersist, Phase::PostPersist]);
}

#[tokio::test]
async fn completion_listener_is_invoked_exactly_once_with_the_outcome() {
    let session = RecordingSession::new();
    let manager = build_manager(session.clone(), EventLog::new());

    let probe = CompletionProbe::new();
    manager
        .persist(
            User::sample(4),
            Options::new().listener(probe.clone() as Arc<dyn widerow::CompletionListener>),
        )
        .await
        .unwrap();
    assert_eq!(probe.outcomes(), vec![None]);

    let probe2 = CompletionProbe::new();
    session.fail_next_batch();
    let err = manager
        .persist(
            User::sample(5),
            Options::new().listener(probe2.clone() as Arc<dyn widerow::CompletionListener>),
        )
        .await
        .unwrap_err();
    let outcomes = probe2.outcomes();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].as_deref(), Some(err.to_string().as_str()));
}

#[tokio::test]
async fn failed_flush_suppresses_post_events() {
    let session = RecordingSession::new();
    let log = EventLog::new();
    let manager = build_manager(session.clone(), log.clone());

    session.fail_next_batch();
    let _ = manager.persist(User::sample(6), Options::new()).await;

    let phases: Vec<Phase> = log.events().iter().map(|e| e.phase).collect();
    assert_eq!(phases, vec![Phase::PrePersist]);
}

#[tokio::test]
async fn remove_by_id_emits_records_without_an_entity_instance() {
    let session = RecordingSession::new();
    let log = EventLog::new();
    let manager = build_manager(session.clone(), log.clone());

    manager
        .remove_by_id::<User>(
            PrimaryKey::simple("id", ColumnValue::BigInt(8)),
            Options::new(),
        )
        .await
        .unwrap();

    let events = log.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].phase, Phase::PreRemove);
    assert_eq!(events[1].phase, Phase::PostRemove);
    assert_eq!(events[1].key, "id=8");
}

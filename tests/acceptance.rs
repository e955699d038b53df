use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use sqlx::SqlitePool;

use customer_es::config::StoreConfig;
use customer_es::domain::customer::*;
use customer_es::error::ErrorKind;
use customer_es::event_sourcing::{
    connect, Aggregate, DomainEvent, FixedClock, SequenceIdGenerator, Transaction,
};
use customer_es::metrics::Metrics;
use customer_es::utils::{retry_on_transient, RetryConfig};

// ============================================================================
// Customer acceptance tests, end to end against a SQLite file
// ============================================================================

struct Harness {
    _dir: tempfile::TempDir,
    pool: SqlitePool,
    store: Arc<CustomerEventStore>,
    commands: CustomerCommandHandler,
    queries: CustomerQueryHandler,
    metrics: Arc<Metrics>,
}

async fn harness() -> Harness {
    harness_with(StoreConfig::default(), Duration::from_secs(5)).await
}

async fn harness_with(config: StoreConfig, busy_timeout: Duration) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("acceptance.db").display());
    let pool = connect(&url, 4, busy_timeout).await.unwrap();

    let clock = Arc::new(FixedClock(Utc.timestamp_opt(1_700_000_000, 0).unwrap()));
    let store = Arc::new(CustomerEventStore::new(pool.clone(), config, clock.clone()));
    store.init_schema().await.unwrap();

    let metrics = Arc::new(Metrics::new().unwrap());
    let ids = Arc::new(SequenceIdGenerator::new(["customer-a", "customer-b", "customer-c"]));
    let commands = CustomerCommandHandler::new(store.clone(), clock, ids, metrics.clone());
    let queries = CustomerQueryHandler::new(store.clone(), metrics.clone());

    Harness { _dir: dir, pool, store, commands, queries, metrics }
}

impl Harness {
    async fn register(&self, email: &str) -> CustomerId {
        self.commands.register_customer(email, "Fiona", "Gallagher").await.unwrap()
    }

    async fn history(&self, customer_id: &CustomerId) -> Vec<CustomerEvent> {
        self.store.retrieve_event_stream(customer_id).await.unwrap()
    }

    async fn registration_hash(&self, customer_id: &CustomerId) -> String {
        match &self.history(customer_id).await[0] {
            CustomerEvent::Registered(e) => e.confirmation_hash.to_string(),
            other => panic!("stream starts with {other:?}"),
        }
    }

    async fn version(&self, customer_id: &CustomerId) -> u64 {
        self.queries.customer_view_by_id(customer_id.as_str()).await.unwrap().version
    }
}

// Registration
// ============================================================================

#[tokio::test]
async fn test_register_customer() {
    let h = harness().await;

    let customer_id = h.register("fiona@gallagher.net").await;

    assert_eq!(customer_id.as_str(), "customer-a");
    let view = h.queries.customer_view_by_id("customer-a").await.unwrap();
    assert_eq!(view.email_address, "fiona@gallagher.net");
    assert_eq!(view.given_name, "Fiona");
    assert_eq!(view.family_name, "Gallagher");
    assert!(!view.is_email_address_confirmed);
    assert!(!view.is_deleted);
    assert_eq!(view.version, 1);
}

#[tokio::test]
async fn test_register_with_taken_email_is_duplicate() {
    let h = harness().await;
    h.register("fiona@gallagher.net").await;

    let err = h
        .commands
        .register_customer("fiona@gallagher.net", "Fiona", "Lishman")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Duplicate);
    let err = h.queries.customer_view_by_id("customer-b").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_email_is_registrable_again_after_delete() {
    let h = harness().await;
    let first = h.register("fiona@gallagher.net").await;

    h.commands.delete_customer(first.as_str()).await.unwrap();

    let second = h.register("fiona@gallagher.net").await;
    assert_ne!(first, second);
}

#[tokio::test]
async fn test_email_is_registrable_again_after_change() {
    let h = harness().await;
    let first = h.register("fiona@gallagher.net").await;

    h.commands
        .change_customer_email_address(first.as_str(), "fiona@lishman.net")
        .await
        .unwrap();

    h.register("fiona@gallagher.net").await;
    let err = h
        .commands
        .register_customer("fiona@lishman.net", "Fiona", "Lishman")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Duplicate);
}

#[tokio::test]
async fn test_invalid_input_is_rejected_before_storage() {
    let h = harness().await;

    let cases = [
        h.commands.register_customer("fiona@galagher.c", "Fiona", "Gallagher").await,
        h.commands.register_customer("fiona@gallagher.net", "", "Gallagher").await,
        h.commands.register_customer("fiona@gallagher.net", "Fiona", "").await,
    ];
    for result in cases {
        assert_eq!(result.unwrap_err().kind(), ErrorKind::InputIsInvalid);
    }

    let cases = [
        h.commands.confirm_customer_email_address("", "hash").await,
        h.commands.confirm_customer_email_address("x", "").await,
        h.commands.change_customer_email_address("x", "nope").await,
        h.commands.change_customer_name("x", "", "Gallagher").await,
        h.commands.delete_customer("").await,
    ];
    for result in cases {
        assert_eq!(result.unwrap_err().kind(), ErrorKind::InputIsInvalid);
    }
    let err = h.queries.customer_view_by_id("").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InputIsInvalid);

    // No id was consumed by the rejected registrations
    assert_eq!(h.register("fiona@gallagher.net").await.as_str(), "customer-a");
}

// Confirmation
// ============================================================================

#[tokio::test]
async fn test_confirm_email_address() {
    let h = harness().await;
    let customer_id = h.register("fiona@gallagher.net").await;
    let hash = h.registration_hash(&customer_id).await;

    h.commands.confirm_customer_email_address(customer_id.as_str(), &hash).await.unwrap();

    let view = h.queries.customer_view_by_id(customer_id.as_str()).await.unwrap();
    assert!(view.is_email_address_confirmed);
    assert_eq!(view.version, 2);
}

#[tokio::test]
async fn test_confirm_with_wrong_hash_records_failure() {
    let h = harness().await;
    let customer_id = h.register("fiona@gallagher.net").await;

    let err = h
        .commands
        .confirm_customer_email_address(customer_id.as_str(), "wrong-hash")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::DomainConstraintsViolation);
    let history = h.history(&customer_id).await;
    assert_eq!(history.len(), 2);
    assert!(matches!(history[1], CustomerEvent::EmailAddressConfirmationFailed(_)));
    assert!(history[1].indicates_an_error().is_some());
    let view = h.queries.customer_view_by_id(customer_id.as_str()).await.unwrap();
    assert!(!view.is_email_address_confirmed);
}

#[tokio::test]
async fn test_confirm_twice_is_a_no_op() {
    let h = harness().await;
    let customer_id = h.register("fiona@gallagher.net").await;
    let hash = h.registration_hash(&customer_id).await;
    h.commands.confirm_customer_email_address(customer_id.as_str(), &hash).await.unwrap();

    h.commands.confirm_customer_email_address(customer_id.as_str(), &hash).await.unwrap();

    assert_eq!(h.version(&customer_id).await, 2);
}

#[tokio::test]
async fn test_wrong_hash_after_confirmation_keeps_confirmation() {
    let h = harness().await;
    let customer_id = h.register("fiona@gallagher.net").await;
    let hash = h.registration_hash(&customer_id).await;
    h.commands.confirm_customer_email_address(customer_id.as_str(), &hash).await.unwrap();

    let err = h
        .commands
        .confirm_customer_email_address(customer_id.as_str(), "wrong-hash")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::DomainConstraintsViolation);
    let view = h.queries.customer_view_by_id(customer_id.as_str()).await.unwrap();
    assert!(view.is_email_address_confirmed);
    assert_eq!(view.version, 3);
}

// Changes
// ============================================================================

#[tokio::test]
async fn test_change_email_address() {
    let h = harness().await;
    let customer_id = h.register("fiona@gallagher.net").await;
    let hash = h.registration_hash(&customer_id).await;
    h.commands.confirm_customer_email_address(customer_id.as_str(), &hash).await.unwrap();

    h.commands
        .change_customer_email_address(customer_id.as_str(), "fiona@lishman.net")
        .await
        .unwrap();

    let view = h.queries.customer_view_by_id(customer_id.as_str()).await.unwrap();
    assert_eq!(view.email_address, "fiona@lishman.net");
    assert!(!view.is_email_address_confirmed);
    assert_eq!(view.version, 3);

    // The old hash belongs to the old address
    let err = h
        .commands
        .confirm_customer_email_address(customer_id.as_str(), &hash)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DomainConstraintsViolation);
}

#[tokio::test]
async fn test_change_to_current_email_address_is_a_no_op() {
    let h = harness().await;
    let customer_id = h.register("fiona@gallagher.net").await;

    h.commands
        .change_customer_email_address(customer_id.as_str(), "fiona@gallagher.net")
        .await
        .unwrap();

    assert_eq!(h.version(&customer_id).await, 1);
}

#[tokio::test]
async fn test_change_to_taken_email_address_is_duplicate() {
    let h = harness().await;
    let fiona = h.register("fiona@gallagher.net").await;
    h.register("lip@gallagher.net").await;

    let err = h
        .commands
        .change_customer_email_address(fiona.as_str(), "lip@gallagher.net")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Duplicate);
    // Nothing was appended
    assert_eq!(h.version(&fiona).await, 1);
}

#[tokio::test]
async fn test_change_name() {
    let h = harness().await;
    let customer_id = h.register("fiona@gallagher.net").await;

    h.commands.change_customer_name(customer_id.as_str(), "Fiona", "Lishman").await.unwrap();
    h.commands.change_customer_name(customer_id.as_str(), "Fiona", "Lishman").await.unwrap();

    let view = h.queries.customer_view_by_id(customer_id.as_str()).await.unwrap();
    assert_eq!(view.family_name, "Lishman");
    assert_eq!(view.version, 2);
}

// Deletion and absence
// ============================================================================

#[tokio::test]
async fn test_delete_customer() {
    let h = harness().await;
    let customer_id = h.register("fiona@gallagher.net").await;
    let id = customer_id.as_str();

    h.commands.delete_customer(id).await.unwrap();
    h.commands.delete_customer(id).await.unwrap();

    assert_eq!(h.history(&customer_id).await.len(), 2);
    assert_eq!(h.queries.customer_view_by_id(id).await.unwrap_err().kind(), ErrorKind::NotFound);
    let rejected = [
        h.commands.confirm_customer_email_address(id, "hash").await,
        h.commands.change_customer_email_address(id, "f@lishman.net").await,
        h.commands.change_customer_name(id, "Fiona", "Lishman").await,
    ];
    for result in rejected {
        assert_eq!(result.unwrap_err().kind(), ErrorKind::NotFound);
    }
}

#[tokio::test]
async fn test_never_registered_customer_is_not_found() {
    let h = harness().await;
    let id = "never-registered";

    assert_eq!(h.queries.customer_view_by_id(id).await.unwrap_err().kind(), ErrorKind::NotFound);
    let rejected = [
        h.commands.confirm_customer_email_address(id, "hash").await,
        h.commands.change_customer_email_address(id, "f@lishman.net").await,
        h.commands.change_customer_name(id, "Fiona", "Lishman").await,
        h.commands.delete_customer(id).await,
    ];
    for result in rejected {
        assert_eq!(result.unwrap_err().kind(), ErrorKind::NotFound);
    }
}

// Concurrency and replay
// ============================================================================

#[tokio::test]
async fn test_concurrent_appends_have_exactly_one_winner() {
    let h = harness().await;
    let customer_id = h.register("fiona@gallagher.net").await;
    let history = h.history(&customer_id).await;

    let decide = |family_name: &str| {
        let mut customer = CustomerAggregate::load_from_events(&history).unwrap();
        let command =
            CustomerCommand::change_name(customer_id.as_str(), "Fiona", family_name).unwrap();
        customer.handle_command(&command, Utc::now()).unwrap();
        customer.take_recorded_events()
    };
    let left = decide("Lishman");
    let right = decide("Ball");

    let (a, b) = tokio::join!(
        h.store.append_to_event_stream(&customer_id, &left, 1),
        h.store.append_to_event_stream(&customer_id, &right, 1),
    );

    let outcomes = [a, b];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    let loser = outcomes.iter().find_map(|r| r.as_ref().err()).unwrap();
    assert_eq!(loser.kind(), ErrorKind::ConcurrencyConflict);

    let persisted = h.history(&customer_id).await;
    assert_eq!(persisted.len(), 2);
    assert!(persisted[1] == left[0] || persisted[1] == right[0]);
}

#[tokio::test]
async fn test_concurrent_commands_succeed_with_explicit_retry() {
    let h = harness().await;
    let customer_id = h.register("fiona@gallagher.net").await;
    let id = customer_id.as_str();
    let commands = &h.commands;

    let rename = |family_name: &'static str| {
        retry_on_transient(RetryConfig::for_conflicts(), move |_attempt| {
            commands.change_customer_name(id, "Fiona", family_name)
        })
    };

    let (a, b) = tokio::join!(rename("Lishman"), rename("Ball"));
    a.into_result().unwrap();
    b.into_result().unwrap();

    assert_eq!(h.version(&customer_id).await, 3);
}

#[tokio::test]
async fn test_commands_past_their_deadline_leave_the_store_usable() {
    let config = StoreConfig {
        operation_timeout: Duration::from_millis(250),
        ..StoreConfig::default()
    };
    let h = harness_with(config, Duration::from_secs(2)).await;
    let customer_id = h.register("fiona@gallagher.net").await;
    let id = customer_id.as_str();

    let blocker = Transaction::begin(&h.pool).await.unwrap();

    let err = h
        .commands
        .change_customer_email_address(id, "fiona@lishman.net")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Technical);
    let err = h
        .commands
        .register_customer("lip@gallagher.net", "Lip", "Gallagher")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Technical);

    blocker.rollback().await.unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;

    assert_eq!(h.history(&customer_id).await.len(), 1);
    let err = h.queries.customer_view_by_id("customer-b").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    // Neither address was claimed by the abandoned writes
    let lip = h.register("lip@gallagher.net").await;
    assert_eq!(lip.as_str(), "customer-c");
    h.commands.change_customer_email_address(id, "fiona@lishman.net").await.unwrap();
    assert_eq!(h.version(&customer_id).await, 2);

    let text = h.metrics.render().unwrap();
    let technical =
        r#"customer_commands_total{command="change_customer_email_address",outcome="technical"} 1"#;
    assert!(text.contains(technical));
}

#[tokio::test]
async fn test_replayed_stream_matches_live_aggregate() {
    let h = harness().await;
    let ids = SequenceIdGenerator::new(["customer-z"]);
    let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();

    let registration =
        RegisterCustomer::build("fiona@gallagher.net", "Fiona", "Gallagher", &ids).unwrap();
    let hash = registration.confirmation_hash.as_str();
    let mut live = CustomerAggregate::register(&registration, at);
    let commands = [
        CustomerCommand::confirm_email_address("customer-z", "wrong").unwrap(),
        CustomerCommand::confirm_email_address("customer-z", hash).unwrap(),
        CustomerCommand::change_email_address("customer-z", "fiona@lishman.net").unwrap(),
        CustomerCommand::change_name("customer-z", "Fiona", "Lishman").unwrap(),
        CustomerCommand::delete("customer-z").unwrap(),
    ];
    for command in &commands {
        let _ = live.handle_command(command, at);
    }
    let recorded = live.take_recorded_events();
    h.store.start_event_stream(&registration.customer_id, &recorded).await.unwrap();

    let history = h.history(&registration.customer_id).await;
    let replayed = CustomerAggregate::load_from_events(&history).unwrap();

    assert_eq!(replayed, live);
    assert_eq!(replayed.version(), 6);
}

#[tokio::test]
async fn test_metrics_follow_outcomes() {
    let h = harness().await;
    let customer_id = h.register("fiona@gallagher.net").await;
    let _ = h.commands.register_customer("fiona@gallagher.net", "Fiona", "Gallagher").await;
    let _ = h.queries.customer_view_by_id(customer_id.as_str()).await;

    let text = h.metrics.render().unwrap();
    assert!(text.contains(
        r#"customer_commands_total{command="register_customer",outcome="ok"} 1"#
    ));
    assert!(text.contains(
        r#"customer_commands_total{command="register_customer",outcome="duplicate"} 1"#
    ));
    assert!(text.contains("customer_queries_total{outcome=\"ok\"} 1"));
    assert!(text.contains("event_store_appended_events_total 1"));
}

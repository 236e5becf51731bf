//! Cross-component integration tests
//!
//! These tests exercise the session, domain-store, fan-out, and messaging
//! components together against an in-memory SQLite database, without
//! starting an HTTP server.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::Json;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tokio::sync::mpsc;
use tower::ServiceExt;

use netbill_service::auth::Principal;
use netbill_service::config::{DatabaseConfig, JwtConfig, MessagingConfig, ServerConfig, Settings};
use netbill_service::db;
use netbill_service::domain::customers::{Category, CustomerFilter, NewCustomer, UpdateCustomer};
use netbill_service::domain::message_log::MessageOutcome;
use netbill_service::domain::transactions::{
    Direction, NewTransaction, TransactionFilter, TxStatus,
};
use netbill_service::domain::users::{Role, UpdateUser};
use netbill_service::error::AppError;
use netbill_service::messaging::{GatewayState, MessageTransport, TransportError, TransportEvent};
use netbill_service::server::{create_app, AppState};

/// Transport that records every attempt and fails on scripted call numbers.
struct ScriptedTransport {
    fail_on: Vec<usize>,
    calls: AtomicUsize,
    attempts: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    fn new(fail_on: Vec<usize>) -> Self {
        Self {
            fail_on,
            calls: AtomicUsize::new(0),
            attempts: Mutex::new(Vec::new()),
        }
    }

    fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageTransport for ScriptedTransport {
    async fn start(
        &self,
        _events: mpsc::Sender<TransportEvent>,
    ) -> Result<GatewayState, TransportError> {
        Ok(GatewayState::Ready)
    }

    async fn stop(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn send(&self, phone: &str, _body: &str) -> Result<(), TransportError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.attempts.lock().unwrap().push(phone.to_string());
        if self.fail_on.contains(&n) {
            Err(TransportError::SendFailed("number not on whatsapp".to_string()))
        } else {
            Ok(())
        }
    }
}

/// Transport whose sends never complete, pinning a broadcast in flight.
struct StalledTransport;

#[async_trait]
impl MessageTransport for StalledTransport {
    async fn start(
        &self,
        _events: mpsc::Sender<TransportEvent>,
    ) -> Result<GatewayState, TransportError> {
        Ok(GatewayState::Ready)
    }

    async fn stop(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn send(&self, _phone: &str, _body: &str) -> Result<(), TransportError> {
        std::future::pending::<()>().await;
        unreachable!()
    }
}

/// Transport that connects asynchronously: `start` settles in qr-pending
/// and hands the test its event channel for later transitions.
#[derive(Default)]
struct QrTransport {
    events: Mutex<Option<mpsc::Sender<TransportEvent>>>,
}

#[async_trait]
impl MessageTransport for QrTransport {
    async fn start(
        &self,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<GatewayState, TransportError> {
        *self.events.lock().unwrap() = Some(events);
        Ok(GatewayState::QrPending)
    }

    async fn stop(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn send(&self, _phone: &str, _body: &str) -> Result<(), TransportError> {
        Err(TransportError::NotConnected)
    }
}

fn test_settings() -> Settings {
    Settings {
        server: ServerConfig::default(),
        database: DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        },
        jwt: JwtConfig {
            secret: "integration-test-secret".to_string(),
            expiry_hours: 24,
        },
        messaging: MessagingConfig {
            broadcast_delay_ms: 0,
            country_code: "62".to_string(),
            preview_length: 120,
        },
    }
}

async fn test_pool() -> SqlitePool {
    // Single connection keeps the in-memory database alive and shared
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    db::migrate(&pool).await.unwrap();
    db::seed(&pool).await.unwrap();
    pool
}

async fn test_state(transport: Arc<dyn MessageTransport>) -> AppState {
    let pool = test_pool().await;
    AppState::new(test_settings(), pool, transport)
}

fn admin_principal() -> Principal {
    Principal {
        id: 1,
        username: "admin".to_string(),
        name: "Administrator".to_string(),
        role: Role::Admin,
    }
}

async fn add_customer(state: &AppState, name: &str, phone: &str) -> i64 {
    state
        .customers
        .create(
            NewCustomer {
                name: name.to_string(),
                category: Category::Internet,
                phone: phone.to_string(),
                pppoe_username: None,
                pppoe_password: None,
                address: None,
            },
            None,
        )
        .await
        .unwrap()
        .id
}

async fn add_pending(state: &AppState, customer_id: i64, amount: i64) -> i64 {
    state
        .transactions
        .create(
            &state.customers,
            NewTransaction {
                customer_id,
                label: "monthly bill".to_string(),
                amount,
                direction: Direction::Income,
                status: None,
                description: None,
            },
            None,
        )
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn test_authenticate_and_validate_roundtrip() {
    let state = test_state(Arc::new(ScriptedTransport::new(vec![]))).await;

    let (token, principal) = state
        .sessions
        .authenticate("admin", "admin123", None)
        .await
        .unwrap();
    assert_eq!(principal.role, Role::Admin);

    let validated = state.sessions.validate(&token).await.unwrap();
    assert_eq!(validated.id, principal.id);
    assert_eq!(validated.role, principal.role);
}

#[tokio::test]
async fn test_bad_credentials_are_indistinguishable() {
    let state = test_state(Arc::new(ScriptedTransport::new(vec![]))).await;

    let unknown = state
        .sessions
        .authenticate("nobody", "admin123", None)
        .await
        .unwrap_err();
    let wrong = state
        .sessions
        .authenticate("admin", "wrong-password", None)
        .await
        .unwrap_err();

    match (unknown, wrong) {
        (AppError::Auth(a), AppError::Auth(b)) => assert_eq!(a, b),
        other => panic!("expected Auth errors, got {:?}", other),
    }
}

#[tokio::test]
async fn test_disabled_user_cannot_authenticate() {
    let state = test_state(Arc::new(ScriptedTransport::new(vec![]))).await;

    let staff = state.users.find_by_username("staff").await.unwrap().unwrap();
    state
        .users
        .update(
            staff.id,
            UpdateUser {
                is_active: Some(false),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();

    let err = state
        .sessions
        .authenticate("staff", "staff123", None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Auth(ref m) if m.contains("disabled")));
}

#[tokio::test]
async fn test_deactivation_revokes_outstanding_token() {
    let state = test_state(Arc::new(ScriptedTransport::new(vec![]))).await;

    let (token, principal) = state
        .sessions
        .authenticate("staff", "staff123", None)
        .await
        .unwrap();
    assert!(state.sessions.validate(&token).await.is_ok());

    state
        .users
        .update(
            principal.id,
            UpdateUser {
                is_active: Some(false),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();

    // The token itself has not expired, but validation re-reads the account
    let err = state.sessions.validate(&token).await.unwrap_err();
    assert!(matches!(err, AppError::Auth(_)));
}

#[tokio::test]
async fn test_self_delete_rejected() {
    let state = test_state(Arc::new(ScriptedTransport::new(vec![]))).await;
    let err = state.users.delete(1, 1).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn test_duplicate_username_conflict() {
    let state = test_state(Arc::new(ScriptedTransport::new(vec![]))).await;
    let err = state
        .users
        .create(
            netbill_service::domain::users::NewUser {
                username: "admin".to_string(),
                password: "whatever1".to_string(),
                name: "Another Admin".to_string(),
                role: Role::Staff,
            },
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn test_stats_empty_ledger_is_all_zeros() {
    let state = test_state(Arc::new(ScriptedTransport::new(vec![]))).await;
    let stats = state.transactions.stats().await.unwrap();
    assert_eq!(stats.income, 0);
    assert_eq!(stats.expense, 0);
    assert_eq!(stats.pending, 0);
    assert_eq!(stats.balance, 0);
}

#[tokio::test]
async fn test_transaction_snapshot_survives_customer_rename() {
    let state = test_state(Arc::new(ScriptedTransport::new(vec![]))).await;
    let customer_id = add_customer(&state, "Budi", "0812000001").await;
    let tx_id = add_pending(&state, customer_id, 150_000).await;

    state
        .customers
        .update(
            customer_id,
            UpdateCustomer {
                name: Some("Budi Santoso".to_string()),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();

    let tx = state.transactions.get(tx_id).await.unwrap();
    assert_eq!(tx.customer_name, "Budi");
}

#[tokio::test]
async fn test_mark_settled_dual_write() {
    let state = test_state(Arc::new(ScriptedTransport::new(vec![]))).await;
    let customer_id = add_customer(&state, "Budi", "0812000001").await;
    let tx_id = add_pending(&state, customer_id, 50_000).await;

    let receipt = state.transactions.mark_settled(tx_id, None).await.unwrap();
    assert_eq!(receipt.direction, Direction::Income);
    assert_eq!(receipt.status, TxStatus::Settled);
    assert_eq!(receipt.amount, 50_000);
    assert_ne!(receipt.id, tx_id);

    let original = state.transactions.get(tx_id).await.unwrap();
    assert_eq!(original.status, TxStatus::Settled);

    let all = state
        .transactions
        .list(TransactionFilter::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn test_mark_settled_is_not_idempotent() {
    // Settling an already-settled record re-runs the dual-write and
    // produces a duplicate receipt. This documents current behavior.
    let state = test_state(Arc::new(ScriptedTransport::new(vec![]))).await;
    let customer_id = add_customer(&state, "Budi", "0812000001").await;
    let tx_id = add_pending(&state, customer_id, 50_000).await;

    state.transactions.mark_settled(tx_id, None).await.unwrap();
    state.transactions.mark_settled(tx_id, None).await.unwrap();

    let all = state
        .transactions
        .list(TransactionFilter::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 3);

    let receipts: Vec<_> = all.iter().filter(|t| t.label == "payment-receipt").collect();
    assert_eq!(receipts.len(), 2);
}

#[tokio::test]
async fn test_mark_settled_unknown_id() {
    let state = test_state(Arc::new(ScriptedTransport::new(vec![]))).await;
    let err = state.transactions.mark_settled(4242, None).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_debtors_exclude_inactive_and_settled() {
    let state = test_state(Arc::new(ScriptedTransport::new(vec![]))).await;

    let debtor_id = add_customer(&state, "Debtor", "0812000001").await;
    add_pending(&state, debtor_id, 100_000).await;

    let inactive_id = add_customer(&state, "Inactive", "0812000002").await;
    add_pending(&state, inactive_id, 75_000).await;
    state
        .customers
        .update(
            inactive_id,
            UpdateCustomer {
                is_active: Some(false),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();

    let settled_id = add_customer(&state, "Paid Up", "0812000003").await;
    let settled_tx = add_pending(&state, settled_id, 60_000).await;
    state.transactions.mark_settled(settled_tx, None).await.unwrap();

    let debtors = state.customers.with_outstanding_balance().await.unwrap();
    assert_eq!(debtors.len(), 1);
    assert_eq!(debtors[0].name, "Debtor");
    assert_eq!(debtors[0].pending_total, 100_000);
}

#[tokio::test]
async fn test_customer_delete_leaves_snapshot_with_null_reference() {
    let state = test_state(Arc::new(ScriptedTransport::new(vec![]))).await;
    let customer_id = add_customer(&state, "Budi", "0812000001").await;
    let tx_id = add_pending(&state, customer_id, 10_000).await;

    state.customers.delete(customer_id, None).await.unwrap();

    let tx = state.transactions.get(tx_id).await.unwrap();
    assert_eq!(tx.customer_id, None);
    assert_eq!(tx.customer_name, "Budi");
}

#[tokio::test]
async fn test_customer_list_filters_combine() {
    let state = test_state(Arc::new(ScriptedTransport::new(vec![]))).await;
    add_customer(&state, "Budi Internet", "0812000001").await;
    let gas_id = state
        .customers
        .create(
            NewCustomer {
                name: "Siti Gas".to_string(),
                category: Category::Gas,
                phone: "0812000002".to_string(),
                pppoe_username: None,
                pppoe_password: None,
                address: None,
            },
            None,
        )
        .await
        .unwrap()
        .id;

    let gas_only = state
        .customers
        .list(CustomerFilter {
            category: Some(Category::Gas),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(gas_only.len(), 1);
    assert_eq!(gas_only[0].id, gas_id);

    let searched = state
        .customers
        .list(CustomerFilter {
            search: Some("budi".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(searched.len(), 1);
    assert_eq!(searched[0].name, "Budi Internet");

    let none = state
        .customers
        .list(CustomerFilter {
            category: Some(Category::Gas),
            search: Some("budi".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_broadcast_continues_past_failures() {
    let transport = Arc::new(ScriptedTransport::new(vec![2]));
    let state = test_state(transport.clone()).await;

    for (name, phone, amount) in [
        ("Debtor A", "0812000001", 300_000),
        ("Debtor B", "0812000002", 200_000),
        ("Debtor C", "0812000003", 100_000),
    ] {
        let id = add_customer(&state, name, phone).await;
        add_pending(&state, id, amount).await;
    }

    state.messaging.start().await.unwrap();

    let summary = state
        .messaging
        .broadcast_to_debtors("Halo {name}, tagihan Anda Rp {amount}", None)
        .await
        .unwrap();

    assert_eq!(summary.total, 3);
    assert_eq!(summary.success, 2);
    assert_eq!(summary.failed, 1);
    // The failure on the 2nd send did not stop the 3rd attempt
    assert_eq!(transport.attempts().len(), 3);

    let logs = state.message_logs.list(None).await.unwrap();
    assert_eq!(logs.len(), 3);
    assert_eq!(
        logs.iter()
            .filter(|l| l.status == MessageOutcome::Failed)
            .count(),
        1
    );
}

#[tokio::test]
async fn test_send_fails_fast_when_gateway_not_started() {
    let state = test_state(Arc::new(ScriptedTransport::new(vec![]))).await;
    let customer_id = add_customer(&state, "Budi", "0812000001").await;

    let err = state
        .messaging
        .send_to_customer(customer_id, "halo", None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Gateway(_)));

    // The attempt is still logged
    let logs = state.message_logs.list(None).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, MessageOutcome::Failed);
    assert_eq!(logs[0].customer_id, Some(customer_id));
}

#[tokio::test]
async fn test_send_normalizes_phone_and_logs_success() {
    let transport = Arc::new(ScriptedTransport::new(vec![]));
    let state = test_state(transport.clone()).await;
    let customer_id = add_customer(&state, "Budi", "0812-3456-7890").await;

    state.messaging.start().await.unwrap();
    let outcome = state
        .messaging
        .send_to_customer(customer_id, "halo", None)
        .await
        .unwrap();

    assert_eq!(outcome.phone, "6281234567890");
    assert_eq!(transport.attempts(), vec!["6281234567890".to_string()]);

    let logs = state.message_logs.list(None).await.unwrap();
    assert_eq!(logs[0].status, MessageOutcome::Success);
}

#[tokio::test]
async fn test_restore_creates_fresh_customers_from_legacy_fields() {
    let state = test_state(Arc::new(ScriptedTransport::new(vec![]))).await;

    let payload: netbill_service::api::backup::RestorePayload = serde_json::from_value(
        serde_json::json!({
            "customers": [
                { "nama": "Budi", "tipe": "internet", "whatsapp": "081234", "id": 999 }
            ],
            "settings": { "business_name": "Restored ISP" }
        }),
    )
    .unwrap();

    let Json(resp) =
        netbill_service::api::backup::restore(State(state.clone()), admin_principal(), Json(payload))
            .await
            .unwrap();
    assert!(resp.success);
    assert_eq!(resp.data.customers_restored, 1);

    let customers = state.customers.list(CustomerFilter::default()).await.unwrap();
    assert_eq!(customers.len(), 1);
    let restored = &customers[0];
    assert_eq!(restored.name, "Budi");
    assert_eq!(restored.category, Category::Internet);
    assert_eq!(restored.phone, "081234");
    assert_ne!(restored.id, 999);

    assert_eq!(
        state.business_settings.get("business_name").await.unwrap(),
        Some("Restored ISP".to_string())
    );
}

#[tokio::test]
async fn test_event_stream_sees_publishes_after_subscribe_only() {
    let state = test_state(Arc::new(ScriptedTransport::new(vec![]))).await;

    use netbill_service::events::ChangeEvent;
    state.registry.publish(ChangeEvent::invalidate("customer_updated"));

    let initial = vec![state.messaging.status_event().await];
    let (_, mut rx) = state.registry.subscribe(initial);

    state.registry.publish(ChangeEvent::invalidate("transaction_updated"));

    assert_eq!(rx.recv().await.unwrap().event_type, "connected");
    assert_eq!(rx.recv().await.unwrap().event_type, "wa_status");
    assert_eq!(rx.recv().await.unwrap().event_type, "transaction_updated");
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_settings_upsert_and_read_back() {
    let state = test_state(Arc::new(ScriptedTransport::new(vec![]))).await;

    let mut values = std::collections::BTreeMap::new();
    values.insert("price_internet".to_string(), "175000".to_string());
    values.insert("greeting".to_string(), "Selamat datang".to_string());
    state.business_settings.upsert_many(values, None).await.unwrap();

    let all = state.business_settings.all().await.unwrap();
    assert_eq!(all.get("price_internet"), Some(&"175000".to_string()));
    assert_eq!(all.get("greeting"), Some(&"Selamat datang".to_string()));
}

#[tokio::test]
async fn test_second_broadcast_rejected_while_one_runs() {
    let state = test_state(Arc::new(StalledTransport)).await;
    let customer_id = add_customer(&state, "Debtor", "0812000001").await;
    add_pending(&state, customer_id, 100_000).await;

    state.messaging.start().await.unwrap();

    // First broadcast claims the slot before its task even runs
    let first = state
        .messaging
        .spawn_broadcast("Halo {name}".to_string(), None)
        .await;
    assert_eq!(first.unwrap(), 1);

    let second = state
        .messaging
        .spawn_broadcast("Halo {name}".to_string(), None)
        .await;
    assert!(matches!(second.unwrap_err(), AppError::Conflict(_)));
    assert!(state.messaging.broadcast_running());
}

#[tokio::test]
async fn test_transport_events_reach_subscribers() {
    let transport = Arc::new(QrTransport::default());
    let state = test_state(transport.clone()).await;

    let (_, mut rx) = state.registry.subscribe(vec![]);

    let status = state.messaging.start().await.unwrap();
    assert_eq!(status.state, GatewayState::QrPending);

    assert_eq!(rx.recv().await.unwrap().event_type, "connected");
    let initializing = rx.recv().await.unwrap();
    assert_eq!(initializing.event_type, "wa_status");
    assert_eq!(initializing.data.unwrap()["state"], "initializing");
    let qr_pending = rx.recv().await.unwrap();
    assert_eq!(qr_pending.data.unwrap()["state"], "qr-pending");

    // The operator scans the code; the transport reports it out-of-band
    let events = transport.events.lock().unwrap().clone().unwrap();
    events
        .send(TransportEvent::QrCode("QR-PAYLOAD".to_string()))
        .await
        .unwrap();
    events
        .send(TransportEvent::StateChanged(GatewayState::Ready))
        .await
        .unwrap();

    let qr = rx.recv().await.unwrap();
    assert_eq!(qr.event_type, "wa_qr");
    assert_eq!(qr.data.unwrap()["qr"], "QR-PAYLOAD");

    let ready = rx.recv().await.unwrap();
    assert_eq!(ready.event_type, "wa_status");
    assert_eq!(ready.data.unwrap()["state"], "ready");
    assert!(state.messaging.status().await.is_ready());
}

#[tokio::test]
async fn test_configured_cors_origins_are_enforced() {
    let mut settings = test_settings();
    settings.server.cors_origins = vec!["http://localhost:5173".to_string()];
    let pool = test_pool().await;
    let app = create_app(AppState::new(
        settings,
        pool,
        Arc::new(ScriptedTransport::new(vec![])),
    ));

    let allowed = Request::builder()
        .uri("/health")
        .header("origin", "http://localhost:5173")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(allowed).await.unwrap();
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "http://localhost:5173"
    );

    let denied = Request::builder()
        .uri("/health")
        .header("origin", "http://other.example")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(denied).await.unwrap();
    assert!(response
        .headers()
        .get("access-control-allow-origin")
        .is_none());
}

#[tokio::test]
async fn test_monthly_breakdown_groups_current_year() {
    let state = test_state(Arc::new(ScriptedTransport::new(vec![]))).await;
    let customer_id = add_customer(&state, "Budi", "0812000001").await;
    add_pending(&state, customer_id, 100_000).await;
    add_pending(&state, customer_id, 50_000).await;

    let months = state.transactions.monthly_breakdown().await.unwrap();
    // Only this month has activity; empty months are omitted
    assert_eq!(months.len(), 1);
    assert_eq!(months[0].income, 150_000);
    assert_eq!(months[0].expense, 0);
}

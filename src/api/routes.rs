use axum::{
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Serialize;

use crate::server::AppState;

use super::{activity, auth, backup, customers, events, messaging, settings, transactions, users};

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        // Authentication
        .route("/auth/login", post(auth::login))
        .route("/auth/verify", get(auth::verify))
        // User management (admin)
        .route("/users", get(users::list_users).post(users::create_user))
        .route("/users/{id}", put(users::update_user).delete(users::delete_user))
        // Customers
        .route(
            "/customers",
            get(customers::list_customers).post(customers::create_customer),
        )
        .route("/customers/with-pending", get(customers::customers_with_pending))
        .route(
            "/customers/{id}",
            get(customers::get_customer)
                .put(customers::update_customer)
                .delete(customers::delete_customer),
        )
        // Transactions
        .route(
            "/transactions",
            get(transactions::list_transactions).post(transactions::create_transaction),
        )
        .route("/transactions/stats", get(transactions::stats))
        .route("/transactions/monthly", get(transactions::monthly))
        .route("/transactions/{id}/mark-settled", post(transactions::mark_settled))
        .route("/transactions/{id}", delete(transactions::delete_transaction))
        // Settings
        .route(
            "/settings",
            get(settings::get_settings).post(settings::update_settings),
        )
        // Messaging gateway
        .route("/messaging/status", get(messaging::status))
        .route("/messaging/start", post(messaging::start))
        .route("/messaging/stop", post(messaging::stop))
        .route("/messaging/send", post(messaging::send))
        .route("/messaging/broadcast", post(messaging::broadcast))
        .route("/messaging/logs", get(messaging::logs))
        // Backup & restore (admin)
        .route("/backup", get(backup::backup))
        .route("/restore", post(backup::restore))
        // Audit trail (admin)
        .route("/activity-logs", get(activity::list_activity))
        // Live-update stream
        .route("/events", get(events::events_handler))
}

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::auth::SessionService;
use crate::config::Settings;
use crate::domain::customers::CustomerStore;
use crate::domain::message_log::MessageLogStore;
use crate::domain::settings_store::SettingsStore;
use crate::domain::transactions::TransactionStore;
use crate::domain::users::UserStore;
use crate::events::EventRegistry;
use crate::messaging::{MessageTransport, MessagingService};

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub db: SqlitePool,
    pub sessions: Arc<SessionService>,
    pub users: UserStore,
    pub customers: CustomerStore,
    pub transactions: TransactionStore,
    pub business_settings: SettingsStore,
    pub message_logs: MessageLogStore,
    pub registry: Arc<EventRegistry>,
    pub messaging: Arc<MessagingService>,
}

impl AppState {
    pub fn new(settings: Settings, db: SqlitePool, transport: Arc<dyn MessageTransport>) -> Self {
        let registry = Arc::new(EventRegistry::new());
        let sessions = Arc::new(SessionService::new(db.clone(), &settings.jwt));
        let messaging = Arc::new(MessagingService::new(
            transport,
            registry.clone(),
            db.clone(),
            settings.messaging.clone(),
        ));

        Self {
            settings: Arc::new(settings),
            users: UserStore::new(db.clone()),
            customers: CustomerStore::new(db.clone()),
            transactions: TransactionStore::new(db.clone()),
            business_settings: SettingsStore::new(db.clone()),
            message_logs: MessageLogStore::new(db.clone()),
            db,
            sessions,
            registry,
            messaging,
        }
    }
}

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tokio::sync::{mpsc, RwLock};

use crate::config::MessagingConfig;
use crate::domain::activity;
use crate::domain::customers::{CustomerStore, Debtor};
use crate::domain::message_log::{MessageLogStore, MessageOutcome, NewMessageLog};
use crate::error::{AppError, Result};
use crate::events::{ChangeEvent, EventRegistry};

use super::{
    normalize_phone, render_template, GatewayState, GatewayStatus, MessageTransport,
    TransportEvent,
};

#[derive(Debug, Clone, Serialize)]
pub struct SendOutcome {
    pub customer_id: i64,
    pub phone: String,
    pub message_log_id: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BroadcastDetail {
    pub customer_id: i64,
    pub name: String,
    pub phone: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BroadcastSummary {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub details: Vec<BroadcastDetail>,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl BroadcastSummary {
    fn new(total: usize) -> Self {
        Self {
            total,
            success: 0,
            failed: 0,
            details: Vec::with_capacity(total),
            started_at: Utc::now(),
            finished_at: None,
        }
    }
}

/// Gateway for templated customer notifications.
///
/// Owns the transport's connection-state lifecycle and reports every send
/// attempt into the message log, whatever its outcome.
pub struct MessagingService {
    transport: Arc<dyn MessageTransport>,
    registry: Arc<EventRegistry>,
    customers: CustomerStore,
    log: MessageLogStore,
    db: SqlitePool,
    status: RwLock<GatewayStatus>,
    last_broadcast: RwLock<Option<BroadcastSummary>>,
    broadcast_running: AtomicBool,
    config: MessagingConfig,
}

impl MessagingService {
    pub fn new(
        transport: Arc<dyn MessageTransport>,
        registry: Arc<EventRegistry>,
        db: SqlitePool,
        config: MessagingConfig,
    ) -> Self {
        Self {
            transport,
            registry,
            customers: CustomerStore::new(db.clone()),
            log: MessageLogStore::new(db.clone()),
            db,
            status: RwLock::new(GatewayStatus::default()),
            last_broadcast: RwLock::new(None),
            broadcast_running: AtomicBool::new(false),
            config,
        }
    }

    pub async fn status(&self) -> GatewayStatus {
        *self.status.read().await
    }

    pub async fn status_event(&self) -> ChangeEvent {
        let status = self.status().await;
        ChangeEvent::wa_status(serde_json::to_value(status).unwrap_or_default())
    }

    pub async fn last_broadcast(&self) -> Option<BroadcastSummary> {
        self.last_broadcast.read().await.clone()
    }

    pub fn broadcast_running(&self) -> bool {
        self.broadcast_running.load(Ordering::Relaxed)
    }

    async fn set_state(&self, state: GatewayState) {
        let status = GatewayStatus::new(state);
        *self.status.write().await = status;
        self.registry.publish(ChangeEvent::wa_status(
            serde_json::to_value(status).unwrap_or_default(),
        ));
        tracing::info!(state = ?state, "Gateway state changed");
    }

    #[tracing::instrument(name = "messaging.start", skip(self))]
    pub async fn start(self: &Arc<Self>) -> Result<GatewayStatus> {
        self.set_state(GatewayState::Initializing).await;

        // Transitions the transport reports after startup (QR scan flows)
        // are forwarded to subscribers; the loop ends when the transport
        // drops its sender.
        let (events_tx, mut events_rx) = mpsc::channel(16);
        let service = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(event) = events_rx.recv().await {
                match event {
                    TransportEvent::StateChanged(state) => service.set_state(state).await,
                    TransportEvent::QrCode(qr) => {
                        service
                            .registry
                            .publish(ChangeEvent::wa_qr(serde_json::json!({ "qr": qr })));
                    }
                }
            }
        });

        match self.transport.start(events_tx).await {
            Ok(state) => {
                self.set_state(state).await;
                Ok(self.status().await)
            }
            Err(e) => {
                self.set_state(GatewayState::Error).await;
                Err(AppError::Gateway(format!("failed to start transport: {}", e)))
            }
        }
    }

    #[tracing::instrument(name = "messaging.stop", skip(self))]
    pub async fn stop(&self) -> Result<GatewayStatus> {
        self.transport
            .stop()
            .await
            .map_err(|e| AppError::Gateway(format!("failed to stop transport: {}", e)))?;
        self.set_state(GatewayState::Disconnected).await;
        Ok(self.status().await)
    }

    fn preview_of<'a>(&self, message: &'a str) -> &'a str {
        match message.char_indices().nth(self.config.preview_length) {
            Some((idx, _)) => &message[..idx],
            None => message,
        }
    }

    /// Send a rendered message to one customer.
    ///
    /// Every attempt lands in the message log, including lookup failures
    /// (with a NULL customer reference) and not-ready rejections.
    #[tracing::instrument(name = "messaging.send", skip(self, message))]
    pub async fn send_to_customer(
        &self,
        customer_id: i64,
        message: &str,
        actor: Option<i64>,
    ) -> Result<SendOutcome> {
        let customer = match self.customers.get(customer_id).await {
            Ok(c) => c,
            Err(e) => {
                self.log
                    .append(NewMessageLog {
                        customer_id: None,
                        phone: "",
                        category: "manual",
                        status: MessageOutcome::Failed,
                        preview: self.preview_of(message),
                        error: Some("customer not found"),
                        sent_by: actor,
                    })
                    .await?;
                return Err(e);
            }
        };

        let phone = normalize_phone(&customer.phone, &self.config.country_code);

        if !self.status().await.is_ready() {
            self.log
                .append(NewMessageLog {
                    customer_id: Some(customer.id),
                    phone: &phone,
                    category: "manual",
                    status: MessageOutcome::Failed,
                    preview: self.preview_of(message),
                    error: Some("gateway not ready"),
                    sent_by: actor,
                })
                .await?;
            return Err(AppError::Gateway("messaging service is not ready".to_string()));
        }

        let send_result = self.transport.send(&phone, message).await;
        let (status, error) = match &send_result {
            Ok(()) => (MessageOutcome::Success, None),
            Err(e) => (MessageOutcome::Failed, Some(e.to_string())),
        };

        let message_log_id = self
            .log
            .append(NewMessageLog {
                customer_id: Some(customer.id),
                phone: &phone,
                category: "manual",
                status,
                preview: self.preview_of(message),
                error: error.as_deref(),
                sent_by: actor,
            })
            .await?;

        activity::record(
            &self.db,
            actor,
            "SEND_MESSAGE",
            &format!("Sent message to customer '{}'", customer.name),
            None,
        )
        .await?;

        send_result.map_err(|e| AppError::Gateway(format!("send failed: {}", e)))?;

        Ok(SendOutcome {
            customer_id: customer.id,
            phone,
            message_log_id,
        })
    }

    /// Claim the single broadcast slot; fails if one is already running.
    /// The slot is released at the end of `run_broadcast`.
    fn claim_broadcast_slot(&self) -> Result<()> {
        self.broadcast_running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| AppError::Conflict("a broadcast is already running".to_string()))?;
        Ok(())
    }

    /// Render and send the template to every debtor, sequentially, with a
    /// fixed inter-message delay. A single failure never aborts the rest.
    #[tracing::instrument(name = "messaging.broadcast", skip(self, template))]
    pub async fn broadcast_to_debtors(
        &self,
        template: &str,
        actor: Option<i64>,
    ) -> Result<BroadcastSummary> {
        self.claim_broadcast_slot()?;
        let debtors = match self.customers.with_outstanding_balance().await {
            Ok(d) => d,
            Err(e) => {
                self.broadcast_running.store(false, Ordering::Release);
                return Err(e);
            }
        };
        let summary = self.run_broadcast(debtors, template, actor).await?;
        Ok(summary)
    }

    /// Start the broadcast loop as a detached task. Returns the debtor
    /// count immediately; progress is observable via `last_broadcast` and
    /// the message log.
    pub async fn spawn_broadcast(
        self: &Arc<Self>,
        template: String,
        actor: Option<i64>,
    ) -> Result<usize> {
        // Claim before spawning so a second request racing this one cannot
        // start an overlapping loop
        self.claim_broadcast_slot()?;

        let debtors = match self.customers.with_outstanding_balance().await {
            Ok(d) => d,
            Err(e) => {
                self.broadcast_running.store(false, Ordering::Release);
                return Err(e);
            }
        };
        let total = debtors.len();

        let service = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = service.run_broadcast(debtors, &template, actor).await {
                tracing::error!(error = %e, "Broadcast task failed");
            }
        });

        Ok(total)
    }

    /// Broadcast slot must already be claimed by the caller.
    async fn run_broadcast(
        &self,
        debtors: Vec<Debtor>,
        template: &str,
        actor: Option<i64>,
    ) -> Result<BroadcastSummary> {
        let delay = Duration::from_millis(self.config.broadcast_delay_ms);
        let total = debtors.len();
        let mut summary = BroadcastSummary::new(total);
        *self.last_broadcast.write().await = Some(summary.clone());

        for (i, debtor) in debtors.iter().enumerate() {
            let rendered = render_template(template, debtor);
            let phone = normalize_phone(&debtor.phone, &self.config.country_code);

            // Once the gateway drops out of ready, remaining sends fail fast
            let send_result = if self.status().await.is_ready() {
                self.transport
                    .send(&phone, &rendered)
                    .await
                    .map_err(|e| e.to_string())
            } else {
                Err("gateway not ready".to_string())
            };

            let (status, error) = match &send_result {
                Ok(()) => (MessageOutcome::Success, None),
                Err(e) => (MessageOutcome::Failed, Some(e.clone())),
            };

            if let Err(e) = self
                .log
                .append(NewMessageLog {
                    customer_id: Some(debtor.id),
                    phone: &phone,
                    category: "broadcast",
                    status,
                    preview: self.preview_of(&rendered),
                    error: error.as_deref(),
                    sent_by: actor,
                })
                .await
            {
                tracing::error!(error = %e, customer_id = debtor.id, "Failed to log broadcast message");
            }

            match send_result {
                Ok(()) => summary.success += 1,
                Err(_) => summary.failed += 1,
            }
            summary.details.push(BroadcastDetail {
                customer_id: debtor.id,
                name: debtor.name.clone(),
                phone,
                success: error.is_none(),
                error,
            });

            *self.last_broadcast.write().await = Some(summary.clone());

            // Rate-limit mitigation between sends
            if i + 1 < total && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        summary.finished_at = Some(Utc::now());
        *self.last_broadcast.write().await = Some(summary.clone());
        self.broadcast_running.store(false, Ordering::Release);

        activity::record(
            &self.db,
            actor,
            "BROADCAST",
            &format!(
                "Broadcast to {} debtors: {} sent, {} failed",
                summary.total, summary.success, summary.failed
            ),
            None,
        )
        .await?;

        tracing::info!(
            total = summary.total,
            success = summary.success,
            failed = summary.failed,
            "Broadcast finished"
        );

        Ok(summary)
    }
}

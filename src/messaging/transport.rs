use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use super::GatewayState;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport not connected")]
    NotConnected,

    #[error("send failed: {0}")]
    SendFailed(String),
}

/// Asynchronous notifications a transport pushes while connected: state
/// transitions (qr-pending, authenticated, ready, error) and QR payloads
/// for the operator to scan.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    StateChanged(GatewayState),
    QrCode(String),
}

/// The opaque message-sending capability behind the gateway.
///
/// Production wires a real WhatsApp client behind this trait; tests inject
/// scripted mocks.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    /// Bring the transport up; returns the state it settled in.
    ///
    /// Transports whose connection completes later (QR scan, re-auth) hold
    /// on to `events` and push transitions through it; the service forwards
    /// them to live-update subscribers. Dropping the sender ends the
    /// forwarding loop.
    async fn start(
        &self,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<GatewayState, TransportError>;

    async fn stop(&self) -> Result<(), TransportError>;

    /// Deliver one message to a normalized international number.
    async fn send(&self, phone: &str, body: &str) -> Result<(), TransportError>;
}

/// Development transport that logs instead of sending.
pub struct LoggingTransport;

#[async_trait]
impl MessageTransport for LoggingTransport {
    async fn start(
        &self,
        _events: mpsc::Sender<TransportEvent>,
    ) -> Result<GatewayState, TransportError> {
        tracing::info!("Logging transport started");
        Ok(GatewayState::Ready)
    }

    async fn stop(&self) -> Result<(), TransportError> {
        tracing::info!("Logging transport stopped");
        Ok(())
    }

    async fn send(&self, phone: &str, body: &str) -> Result<(), TransportError> {
        tracing::info!(phone = %phone, chars = body.len(), "Would send message");
        Ok(())
    }
}

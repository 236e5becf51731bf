use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Connection-state lifecycle of the messaging transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GatewayState {
    Disconnected,
    Initializing,
    QrPending,
    Authenticated,
    Ready,
    Error,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct GatewayStatus {
    pub state: GatewayState,
    pub timestamp: DateTime<Utc>,
}

impl GatewayStatus {
    pub fn new(state: GatewayState) -> Self {
        Self {
            state,
            timestamp: Utc::now(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state == GatewayState::Ready
    }
}

impl Default for GatewayStatus {
    fn default() -> Self {
        Self::new(GatewayState::Disconnected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_serialization() {
        assert_eq!(
            serde_json::to_string(&GatewayState::QrPending).unwrap(),
            r#""qr-pending""#
        );
        assert_eq!(
            serde_json::to_string(&GatewayState::Ready).unwrap(),
            r#""ready""#
        );
    }

    #[test]
    fn test_default_is_disconnected() {
        let status = GatewayStatus::default();
        assert_eq!(status.state, GatewayState::Disconnected);
        assert!(!status.is_ready());
    }
}

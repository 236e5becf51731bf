use serde::Serialize;

/// A change-notification frame pushed to live-update subscribers.
///
/// Serializes as `{"type": "...", "data": ...}`; a frame without `data`
/// tells clients to refetch the relevant list.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ChangeEvent {
    pub fn new(event_type: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event_type: event_type.into(),
            data: Some(data),
        }
    }

    /// An event with no payload; clients treat it as an invalidation.
    pub fn invalidate(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            data: None,
        }
    }

    pub fn connected(subscriber_id: uuid::Uuid) -> Self {
        Self::new(
            "connected",
            serde_json::json!({ "subscriber_id": subscriber_id }),
        )
    }

    pub fn customer_updated(data: serde_json::Value) -> Self {
        Self::new("customer_updated", data)
    }

    pub fn transaction_updated(data: serde_json::Value) -> Self {
        Self::new("transaction_updated", data)
    }

    pub fn settings_updated(data: serde_json::Value) -> Self {
        Self::new("settings_updated", data)
    }

    pub fn data_restored() -> Self {
        Self::invalidate("data_restored")
    }

    pub fn wa_status(data: serde_json::Value) -> Self {
        Self::new("wa_status", data)
    }

    pub fn wa_qr(data: serde_json::Value) -> Self {
        Self::new("wa_qr", data)
    }
}

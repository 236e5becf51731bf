//! Long-lived live-update stream: one `{type, data}` JSON object per line.

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::events::{EventRegistry, SubscriberId};
use crate::server::AppState;

/// Query parameters for the event stream endpoint
#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub token: Option<String>,
}

/// Event stream handler.
///
/// Accepts the token from `?token=` (EventSource cannot set headers) or
/// the Authorization header. The first two frames on every connection are
/// the connection ack and the current messaging status.
#[tracing::instrument(name = "events.connect", skip(state, query, headers))]
pub async fn events_handler(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
    headers: axum::http::HeaderMap,
) -> Response {
    let token = query.token.clone().or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::to_string)
    });

    let Some(token) = token else {
        return (StatusCode::UNAUTHORIZED, "Missing authentication token").into_response();
    };

    let principal = match state.sessions.validate(&token).await {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(error = %e, "Event stream token rejected");
            return (StatusCode::UNAUTHORIZED, "Invalid token").into_response();
        }
    };

    // Current gateway status rides right behind the connection ack
    let initial = vec![state.messaging.status_event().await];
    let (subscriber_id, mut rx) = state.registry.subscribe(initial);

    tracing::info!(
        subscriber_id = %subscriber_id,
        user_id = principal.id,
        "Event stream connected"
    );

    let guard = CleanupGuard {
        subscriber_id,
        registry: state.registry.clone(),
    };

    let stream = async_stream::stream! {
        // Dropped when the client disconnects, unregistering the channel
        let _guard = guard;

        while let Some(event) = rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => yield Ok::<_, Infallible>(format!("{}\n", json)),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize event frame");
                }
            }
        }
    };

    Response::builder()
        .header(header::CONTENT_TYPE, "application/x-ndjson")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(stream))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

/// Guard that removes the subscriber when the stream ends.
struct CleanupGuard {
    subscriber_id: SubscriberId,
    registry: Arc<EventRegistry>,
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        tracing::info!(subscriber_id = %self.subscriber_id, "Event stream closed");
        self.registry.unsubscribe(self.subscriber_id);
    }
}

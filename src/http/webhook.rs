//! Notification webhook endpoint.
//!
//! Hands the raw body to the [`EventDispatcher`](crate::events::EventDispatcher)
//! and maps its outcome onto a status code and a plain-text message.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use super::AppState;
use crate::events::{DispatchError, Dispatched};
use crate::observability::metrics;

fn error_status(error: &DispatchError) -> StatusCode {
    match error {
        DispatchError::UnknownTopic(_) => StatusCode::NOT_FOUND,
        e if e.is_input_error() => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        (error_status(&self), self.to_string()).into_response()
    }
}

impl IntoResponse for Dispatched {
    fn into_response(self) -> Response {
        match self {
            Dispatched::Applied(outcome) => match outcome.into_result() {
                Ok(outcome) => (StatusCode::OK, outcome.message()).into_response(),
                // The change was kept; only the reload failed.
                Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
            },
            Dispatched::Subscribed { topic_arn } => {
                (StatusCode::ACCEPTED, format!("Subscribed to \"{topic_arn}\".")).into_response()
            }
            Dispatched::SubscriptionIgnored => StatusCode::OK.into_response(),
            Dispatched::Acknowledged(message) => (StatusCode::OK, message).into_response(),
        }
    }
}

/// Webhook handler.
///
/// # Response
///
/// - 200 OK: change applied and reloaded, or nothing to do
/// - 202 Accepted: subscription confirmation requested
/// - 400 Bad Request: malformed body, unknown group or event, missing member
/// - 404 Not Found: notification for another topic
/// - 500 Internal Server Error: resolve, store or reload failure
pub async fn handle_notification(State(state): State<AppState>, body: Bytes) -> Response {
    let response = match state.dispatcher.dispatch(&body).await {
        Ok(dispatched) => dispatched.into_response(),
        Err(e) => {
            let status = error_status(&e);
            if status.is_server_error() {
                tracing::error!(error = %e, "Notification handling failed");
            } else {
                tracing::warn!(status = status.as_u16(), error = %e, "Notification rejected");
            }
            e.into_response()
        }
    };

    metrics::record_webhook(response.status().as_u16());
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EnvelopeError;
    use crate::registry::{GroupKey, RegistryError};

    #[test]
    fn test_error_status_mapping() {
        let err = DispatchError::UnknownTopic("arn:other".into());
        assert_eq!(error_status(&err), StatusCode::NOT_FOUND);

        let err = DispatchError::InvalidEnvelope(EnvelopeError::MissingField("TopicArn"));
        assert_eq!(error_status(&err), StatusCode::BAD_REQUEST);

        let err = DispatchError::Registry(RegistryError::UnknownGroup(GroupKey::new("arn:x")));
        assert_eq!(error_status(&err), StatusCode::BAD_REQUEST);

        let err = DispatchError::Registry(RegistryError::Store {
            group: "g".into(),
            source: std::io::Error::other("disk"),
        });
        assert_eq!(error_status(&err), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_subscribed_response() {
        let response = Dispatched::Subscribed { topic_arn: "arn:test".into() }.into_response();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }
}

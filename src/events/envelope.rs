//! Outer notification envelope.
//!
//! The transport delivers a JSON object whose `Message` field is itself a
//! JSON document encoded as a string. This module only decodes the outer
//! object; the inner document is handled by [`crate::events::message`].

use serde::Deserialize;
use thiserror::Error;

/// Failure to decode the outer envelope.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("invalid envelope JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("envelope field {0} is missing")]
    MissingField(&'static str),
}

/// Kind of notification carried by the envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeKind {
    Notification,
    SubscriptionConfirmation,
    UnsubscribeConfirmation,
    Other(String),
}

impl EnvelopeKind {
    fn parse(kind: Option<&str>) -> Self {
        match kind {
            None | Some("") | Some("Notification") => EnvelopeKind::Notification,
            Some("SubscriptionConfirmation") => EnvelopeKind::SubscriptionConfirmation,
            Some("UnsubscribeConfirmation") => EnvelopeKind::UnsubscribeConfirmation,
            Some(other) => EnvelopeKind::Other(other.to_string()),
        }
    }
}

/// Decoded transport envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEnvelope {
    pub kind: EnvelopeKind,
    pub topic_arn: String,
    /// Inner message, still encoded.
    pub message: Option<String>,
    pub subscribe_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    #[serde(rename = "Type")]
    kind: Option<String>,
    #[serde(rename = "TopicArn")]
    topic_arn: Option<String>,
    #[serde(rename = "Message")]
    message: Option<String>,
    #[serde(rename = "SubscribeURL")]
    subscribe_url: Option<String>,
}

impl NotificationEnvelope {
    /// Decode an envelope from a request body.
    pub fn decode(body: &[u8]) -> Result<Self, EnvelopeError> {
        let raw: RawEnvelope = serde_json::from_slice(body)?;
        let topic_arn = raw.topic_arn.ok_or(EnvelopeError::MissingField("TopicArn"))?;

        Ok(Self {
            kind: EnvelopeKind::parse(raw.kind.as_deref()),
            topic_arn,
            message: raw.message,
            subscribe_url: raw.subscribe_url.filter(|url| !url.is_empty()),
        })
    }
}

//! Inner scaling lifecycle message.

use serde::Deserialize;
use thiserror::Error;

pub const EVENT_LAUNCH: &str = "autoscaling:EC2_INSTANCE_LAUNCH";
pub const EVENT_TERMINATE: &str = "autoscaling:EC2_INSTANCE_TERMINATE";
pub const EVENT_TEST: &str = "autoscaling:TEST_NOTIFICATION";

/// Failure to decode the inner message.
#[derive(Debug, Error)]
pub enum MessageError {
    #[error("envelope carries no message")]
    Missing,

    #[error("invalid message JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// What happened to the instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    Launch,
    Terminate,
    Test,
    Other(String),
}

impl LifecycleEvent {
    fn parse(event: &str) -> Self {
        match event {
            EVENT_LAUNCH => LifecycleEvent::Launch,
            EVENT_TERMINATE => LifecycleEvent::Terminate,
            EVENT_TEST => LifecycleEvent::Test,
            other => LifecycleEvent::Other(other.to_string()),
        }
    }
}

/// Decoded lifecycle message.
///
/// Group lookup and event interpretation happen in the dispatcher, so only
/// malformed JSON fails here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleMessage {
    pub event: LifecycleEvent,
    pub instance_id: String,
    pub group_arn: String,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    #[serde(rename = "Event", default)]
    event: String,
    #[serde(rename = "EC2InstanceId", default)]
    instance_id: String,
    #[serde(rename = "AutoScalingGroupARN", default)]
    group_arn: String,
}

impl LifecycleMessage {
    /// Decode the envelope's `Message` field.
    pub fn decode(message: Option<&str>) -> Result<Self, MessageError> {
        let message = message.ok_or(MessageError::Missing)?;
        let raw: RawMessage = serde_json::from_str(message)?;

        Ok(Self {
            event: LifecycleEvent::parse(&raw.event),
            instance_id: raw.instance_id,
            group_arn: raw.group_arn,
        })
    }
}

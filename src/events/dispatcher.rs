//! Event dispatcher.
//!
//! # Responsibilities
//! - Decode the envelope, check its topic, handle subscription handshakes
//! - Decode the lifecycle message and route it to a configured group
//! - Resolve launched members and hand the change to the engine
//!
//! # Design Decisions
//! - Envelope and message are decoded separately with distinct errors
//! - Each change runs on its own engine task; this future only awaits it
//! - Terminations need no address, so they never call the resolver

use std::sync::Arc;

use thiserror::Error;
use tokio::task::JoinError;

use crate::events::envelope::{EnvelopeError, EnvelopeKind, NotificationEnvelope};
use crate::events::message::{LifecycleEvent, LifecycleMessage, MessageError};
use crate::events::resolver::{AddressResolver, ResolveError};
use crate::registry::{
    ChangeOutcome, GroupKey, MemberAddress, MemberId, MembershipChange, Operation,
    ReconfigurationEngine, RegistryError,
};

/// Successful handling of a delivery.
#[derive(Debug)]
pub enum Dispatched {
    /// A membership change reached the artifact (the reload may have failed).
    Applied(ChangeOutcome),
    /// Subscription confirmation requested in the background.
    Subscribed { topic_arn: String },
    /// Subscription request seen but auto-subscribe is off.
    SubscriptionIgnored,
    /// Delivery accepted without any change.
    Acknowledged(&'static str),
}

/// Why a delivery was rejected.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Invalid JSON.")]
    InvalidEnvelope(#[source] EnvelopeError),

    #[error("No handler for the specified ARN (\"{0}\") found.")]
    UnknownTopic(String),

    #[error("Unsupported notification type \"{0}\".")]
    UnsupportedKind(String),

    #[error("Missing SubscribeURL.")]
    MissingSubscribeUrl,

    #[error("Invalid Message field JSON.")]
    InvalidMessage(#[source] MessageError),

    #[error("Invalid Event.")]
    InvalidEvent(String),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("membership task aborted: {0}")]
    Task(#[from] JoinError),
}

impl DispatchError {
    /// Malformed or unroutable input, as opposed to a server-side failure.
    pub fn is_input_error(&self) -> bool {
        match self {
            DispatchError::InvalidEnvelope(_)
            | DispatchError::UnknownTopic(_)
            | DispatchError::UnsupportedKind(_)
            | DispatchError::MissingSubscribeUrl
            | DispatchError::InvalidMessage(_)
            | DispatchError::InvalidEvent(_) => true,
            DispatchError::Registry(e) => e.is_input_error(),
            DispatchError::Resolve(_) | DispatchError::Task(_) => false,
        }
    }
}

/// Routes decoded notifications to the reconfiguration engine.
pub struct EventDispatcher {
    engine: Arc<ReconfigurationEngine>,
    resolver: Arc<dyn AddressResolver>,
    topic_arn: String,
    auto_subscribe: bool,
    http: reqwest::Client,
}

impl EventDispatcher {
    pub fn new(
        engine: Arc<ReconfigurationEngine>,
        resolver: Arc<dyn AddressResolver>,
        topic_arn: impl Into<String>,
        auto_subscribe: bool,
    ) -> Self {
        Self {
            engine,
            resolver,
            topic_arn: topic_arn.into(),
            auto_subscribe,
            http: reqwest::Client::new(),
        }
    }

    /// Replace the client used for subscription confirmation.
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    pub fn engine(&self) -> &Arc<ReconfigurationEngine> {
        &self.engine
    }

    pub fn topic_arn(&self) -> &str {
        &self.topic_arn
    }

    /// Handle one raw delivery body.
    pub async fn dispatch(&self, body: &[u8]) -> Result<Dispatched, DispatchError> {
        let envelope = NotificationEnvelope::decode(body).map_err(DispatchError::InvalidEnvelope)?;

        if envelope.topic_arn != self.topic_arn {
            return Err(DispatchError::UnknownTopic(envelope.topic_arn));
        }

        match envelope.kind {
            EnvelopeKind::Notification => {}
            EnvelopeKind::SubscriptionConfirmation => return self.confirm_subscription(envelope),
            EnvelopeKind::UnsubscribeConfirmation => {
                tracing::info!(topic = %envelope.topic_arn, "Unsubscribed from topic");
                return Ok(Dispatched::Acknowledged("Unsubscribed."));
            }
            EnvelopeKind::Other(kind) => return Err(DispatchError::UnsupportedKind(kind)),
        }

        let message = LifecycleMessage::decode(envelope.message.as_deref())
            .map_err(DispatchError::InvalidMessage)?;
        let group = GroupKey::new(message.group_arn);

        if self.engine.group(&group).is_none() {
            return Err(RegistryError::UnknownGroup(group).into());
        }

        let operation = match message.event {
            LifecycleEvent::Launch => Operation::Add,
            LifecycleEvent::Terminate => Operation::Remove,
            LifecycleEvent::Test => {
                tracing::info!(group = %group, "Test notification received");
                return Ok(Dispatched::Acknowledged("Test notification ignored."));
            }
            LifecycleEvent::Other(event) => return Err(DispatchError::InvalidEvent(event)),
        };

        let member = MemberId::parse(message.instance_id)?;
        let address = match operation {
            Operation::Add => Some(self.resolver.resolve(&member).await?),
            Operation::Remove => None,
        };

        let outcome = self
            .handle_membership_event(group, member, operation, address)
            .await?;
        Ok(Dispatched::Applied(outcome))
    }

    /// Apply one already-resolved membership event.
    ///
    /// The change runs on a detached task, so it completes even when this
    /// future is dropped.
    pub async fn handle_membership_event(
        &self,
        group: GroupKey,
        member: MemberId,
        operation: Operation,
        address: Option<MemberAddress>,
    ) -> Result<ChangeOutcome, DispatchError> {
        let change = MembershipChange {
            group,
            member,
            operation,
            address,
        };
        let outcome = self.engine.spawn(change).await??;
        Ok(outcome)
    }

    fn confirm_subscription(&self, envelope: NotificationEnvelope) -> Result<Dispatched, DispatchError> {
        if !self.auto_subscribe {
            tracing::info!(topic = %envelope.topic_arn, "Subscription request ignored, auto_subscribe is off");
            return Ok(Dispatched::SubscriptionIgnored);
        }

        let url = envelope.subscribe_url.ok_or(DispatchError::MissingSubscribeUrl)?;
        let client = self.http.clone();
        let topic = envelope.topic_arn.clone();
        tokio::spawn(async move {
            match client.get(&url).send().await {
                Ok(response) if response.status().is_success() => {
                    tracing::info!(topic = %topic, "Subscription confirmed");
                }
                Ok(response) => {
                    tracing::warn!(topic = %topic, status = %response.status(), "Subscription confirmation rejected");
                }
                Err(e) => {
                    tracing::warn!(topic = %topic, error = %e, "Subscription confirmation failed");
                }
            }
        });

        Ok(Dispatched::Subscribed {
            topic_arn: envelope.topic_arn,
        })
    }
}

//! Membership event intake.
//!
//! # Data Flow
//! ```text
//! raw webhook body
//!     → envelope.rs (Type, TopicArn, Message, SubscribeURL)
//!     → dispatcher.rs (topic check, subscription handshake)
//!     → message.rs (Event, EC2InstanceId, AutoScalingGroupARN)
//!     → dispatcher.rs (group lookup, event → operation)
//!     → resolver.rs (member id → address, launches only)
//!     → registry engine (add / remove)
//! ```

pub mod dispatcher;
pub mod envelope;
pub mod message;
pub mod resolver;

pub use dispatcher::{DispatchError, Dispatched, EventDispatcher};
pub use envelope::{EnvelopeError, EnvelopeKind, NotificationEnvelope};
pub use message::{LifecycleEvent, LifecycleMessage, MessageError};
pub use resolver::{AddressResolver, ResolveError, TemplateResolver};

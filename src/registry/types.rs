//! Identifiers, change descriptions and error definitions for the registry.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::registry::reload::{ReloadError, ReloadOutput};

/// Scaling-group key used to route events to a group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct GroupKey(String);

impl GroupKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GroupKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

/// Opaque member (instance) identifier.
///
/// The identifier doubles as the record file stem, so it is checked to be a
/// single path component on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct MemberId(String);

impl MemberId {
    pub fn parse(id: impl Into<String>) -> Result<Self, RegistryError> {
        let id = id.into();
        let reason = if id.is_empty() {
            Some("empty")
        } else if id.starts_with('.') {
            Some("starts with '.'")
        } else if id.contains(['/', '\\', '\0']) {
            Some("contains a path separator")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(RegistryError::InvalidMemberId { id, reason }),
            None => Ok(Self(id)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolved network address (host name or IP) of a member.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct MemberAddress(String);

impl MemberAddress {
    pub fn parse(address: impl Into<String>) -> Result<Self, RegistryError> {
        let address = address.into();
        if address.is_empty()
            || address
                .chars()
                .any(|c| c.is_whitespace() || matches!(c, ';' | '{' | '}' | '#'))
        {
            return Err(RegistryError::InvalidAddress(address));
        }
        Ok(Self(address))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemberAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mutation requested against a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Add,
    Remove,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Add => "add",
            Operation::Remove => "remove",
        }
    }
}

/// One membership change handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipChange {
    pub group: GroupKey,
    pub member: MemberId,
    pub operation: Operation,
    /// Required for [`Operation::Add`], ignored for [`Operation::Remove`].
    pub address: Option<MemberAddress>,
}

impl MembershipChange {
    pub fn add(group: GroupKey, member: MemberId, address: MemberAddress) -> Self {
        Self {
            group,
            member,
            operation: Operation::Add,
            address: Some(address),
        }
    }

    pub fn remove(group: GroupKey, member: MemberId) -> Self {
        Self {
            group,
            member,
            operation: Operation::Remove,
            address: None,
        }
    }
}

/// Result of the reload step of a completed change.
#[derive(Debug)]
pub enum ReloadStatus {
    Reloaded(ReloadOutput),
    Failed(ReloadError),
}

/// A membership change that reached the record store and the artifact.
///
/// The reload may still have failed; the change is kept either way.
#[derive(Debug)]
pub struct ChangeOutcome {
    pub group_name: String,
    pub member: MemberId,
    pub operation: Operation,
    /// Member count written to the artifact.
    pub members: usize,
    pub reload: ReloadStatus,
}

impl ChangeOutcome {
    /// Human-readable confirmation naming member and group.
    pub fn message(&self) -> String {
        match self.operation {
            Operation::Add => format!(
                "Added instance \"{}\" to group \"{}\".",
                self.member, self.group_name
            ),
            Operation::Remove => format!(
                "Removed instance \"{}\" from group \"{}\".",
                self.member, self.group_name
            ),
        }
    }

    pub fn reloaded(&self) -> bool {
        matches!(self.reload, ReloadStatus::Reloaded(_))
    }

    /// Treat a failed reload as an error.
    pub fn into_result(self) -> Result<Self, RegistryError> {
        let message = self.message();
        match self.reload {
            ReloadStatus::Failed(source) => Err(RegistryError::ReloadFailed { message, source }),
            ReloadStatus::Reloaded(_) => Ok(self),
        }
    }
}

/// Errors surfaced by the reconfiguration engine.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The event names a group that is not configured.
    #[error("No handler for group \"{0}\".")]
    UnknownGroup(GroupKey),

    /// Remove of a member that has no record.
    #[error("Instance \"{member}\" not found in group \"{group}\".")]
    MemberNotFound { group: String, member: MemberId },

    /// Add without a resolved address.
    #[error("Instance \"{0}\" has no resolved address.")]
    MissingAddress(MemberId),

    #[error("invalid member id {id:?}: {reason}")]
    InvalidMemberId { id: String, reason: &'static str },

    #[error("invalid member address {0:?}")]
    InvalidAddress(String),

    /// Record write/delete/list failed.
    #[error("record store failure in group \"{group}\": {source}")]
    Store {
        group: String,
        #[source]
        source: std::io::Error,
    },

    /// Artifact rewrite failed.
    #[error("failed to regenerate artifact for group \"{group}\": {source}")]
    Artifact {
        group: String,
        #[source]
        source: std::io::Error,
    },

    /// Membership change applied, reload failed.
    #[error("{message} Reload failed: {source}")]
    ReloadFailed {
        message: String,
        #[source]
        source: ReloadError,
    },
}

impl RegistryError {
    /// Input errors are the caller's fault and never worth retrying.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            RegistryError::UnknownGroup(_)
                | RegistryError::MemberNotFound { .. }
                | RegistryError::MissingAddress(_)
                | RegistryError::InvalidMemberId { .. }
                | RegistryError::InvalidAddress(_)
        )
    }
}

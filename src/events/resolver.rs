//! Member address resolution.
//!
//! The engine only accepts resolved addresses. Resolution is a port so a
//! deployment can plug in a directory lookup; the shipped implementation is
//! driven entirely by configuration.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::ResolverConfig;
use crate::registry::{MemberAddress, MemberId, RegistryError};

/// Failure to resolve a member's address.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no address known for instance \"{0}\"")]
    Unresolvable(MemberId),

    #[error("resolved address for instance \"{member}\" is invalid: {source}")]
    Invalid {
        member: MemberId,
        #[source]
        source: RegistryError,
    },
}

/// Resolves a member identifier to the address written into its record.
#[async_trait]
pub trait AddressResolver: Send + Sync {
    async fn resolve(&self, member: &MemberId) -> Result<MemberAddress, ResolveError>;
}

/// Static overrides first, then a `{member_id}` template.
#[derive(Debug, Clone, Default)]
pub struct TemplateResolver {
    template: Option<String>,
    overrides: HashMap<String, String>,
}

impl TemplateResolver {
    pub fn new(template: Option<String>, overrides: HashMap<String, String>) -> Self {
        Self { template, overrides }
    }

    pub fn from_config(config: &ResolverConfig) -> Self {
        Self::new(config.template.clone(), config.addresses.clone())
    }
}

#[async_trait]
impl AddressResolver for TemplateResolver {
    async fn resolve(&self, member: &MemberId) -> Result<MemberAddress, ResolveError> {
        let raw = match (self.overrides.get(member.as_str()), &self.template) {
            (Some(address), _) => address.clone(),
            (None, Some(template)) => template.replace("{member_id}", member.as_str()),
            (None, None) => return Err(ResolveError::Unresolvable(member.clone())),
        };

        MemberAddress::parse(raw).map_err(|source| ResolveError::Invalid {
            member: member.clone(),
            source,
        })
    }
}

//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Group keys unique, group labels usable inside an upstream block
//! - Validate value ranges (ports, timeouts) and socket addresses
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: Config → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{Config, PLACEHOLDER_API_KEY};

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("at least one group must be configured")]
    NoGroups,

    #[error("group #{index}: {field} must not be empty")]
    EmptyGroupField { index: usize, field: &'static str },

    #[error("duplicate group key {0:?}")]
    DuplicateGroupKey(String),

    #[error("group name {0:?} is not a valid upstream label")]
    InvalidGroupName(String),

    #[error("group {0:?}: artifact_path must not be member_dir or inside it")]
    ArtifactInsideRecords(String),

    #[error("reload.command must not be empty")]
    EmptyReloadCommand,

    #[error("backend.record_extension {0:?} must be non-empty without '.' or '/'")]
    InvalidRecordExtension(String),

    #[error("backend.{0} must be greater than zero")]
    ZeroValue(&'static str),

    #[error("{field} {value:?} is not a socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("admin.api_key must be set when admin is enabled")]
    MissingApiKey,

    #[error("resolver.template {0:?} does not contain {{member_id}}")]
    InvalidResolverTemplate(String),
}

/// Validate a parsed configuration, collecting every problem.
pub fn validate_config(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.groups.is_empty() {
        errors.push(ValidationError::NoGroups);
    }

    let mut seen = HashSet::new();
    for (index, group) in config.groups.iter().enumerate() {
        if group.key.is_empty() {
            errors.push(ValidationError::EmptyGroupField { index, field: "key" });
        } else if !seen.insert(group.key.as_str()) {
            errors.push(ValidationError::DuplicateGroupKey(group.key.clone()));
        }

        if group.name.is_empty() {
            errors.push(ValidationError::EmptyGroupField { index, field: "name" });
        } else if !is_valid_label(&group.name) {
            errors.push(ValidationError::InvalidGroupName(group.name.clone()));
        }

        if group.artifact_path.as_os_str().is_empty() {
            errors.push(ValidationError::EmptyGroupField { index, field: "artifact_path" });
        }
        if group.member_dir.as_os_str().is_empty() {
            errors.push(ValidationError::EmptyGroupField { index, field: "member_dir" });
        }
        if !group.artifact_path.as_os_str().is_empty()
            && (group.artifact_path == group.member_dir
                || group.artifact_path.parent() == Some(group.member_dir.as_path()))
        {
            errors.push(ValidationError::ArtifactInsideRecords(group.name.clone()));
        }
    }

    if config.reload.command.first().map_or(true, |program| program.is_empty()) {
        errors.push(ValidationError::EmptyReloadCommand);
    }

    let ext = &config.backend.record_extension;
    if ext.is_empty() || ext.contains('.') || ext.contains('/') {
        errors.push(ValidationError::InvalidRecordExtension(ext.clone()));
    }
    if config.backend.port == 0 {
        errors.push(ValidationError::ZeroValue("port"));
    }
    if config.backend.fail_timeout_secs == 0 {
        errors.push(ValidationError::ZeroValue("fail_timeout_secs"));
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if config.admin.enabled
        && (config.admin.api_key.is_empty() || config.admin.api_key == PLACEHOLDER_API_KEY)
    {
        errors.push(ValidationError::MissingApiKey);
    }

    if let Some(template) = &config.resolver.template {
        if !template.contains("{member_id}") {
            errors.push(ValidationError::InvalidResolverTemplate(template.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_valid_label(name: &str) -> bool {
    !name
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '{' | '}' | ';' | '#'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::GroupConfig;

    fn group(key: &str, name: &str) -> GroupConfig {
        GroupConfig {
            key: key.to_string(),
            name: name.to_string(),
            artifact_path: format!("/etc/nginx/{name}.upstream").into(),
            member_dir: format!("/etc/nginx/{name}").into(),
        }
    }

    fn valid() -> Config {
        let mut config = Config::default();
        config.topic_arn = "arn:topic".into();
        config.groups.push(group("arn:asg-0", "backend-0"));
        config
    }

    #[test]
    fn test_valid_config_passes() {
        assert_eq!(validate_config(&valid()), Ok(()));
    }

    #[test]
    fn test_no_groups() {
        let mut config = valid();
        config.groups.clear();
        assert_eq!(validate_config(&config), Err(vec![ValidationError::NoGroups]));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = valid();
        config.groups.push(group("arn:asg-0", "bad name"));
        config.reload.command.clear();
        config.backend.record_extension = "up.stream".into();

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::DuplicateGroupKey("arn:asg-0".into())));
        assert!(errors.contains(&ValidationError::InvalidGroupName("bad name".into())));
        assert!(errors.contains(&ValidationError::EmptyReloadCommand));
        assert!(errors.contains(&ValidationError::InvalidRecordExtension("up.stream".into())));
    }

    #[test]
    fn test_admin_requires_real_key() {
        let mut config = valid();
        config.admin.enabled = true;
        assert_eq!(validate_config(&config), Err(vec![ValidationError::MissingApiKey]));

        config.admin.api_key = "s3cret".into();
        assert_eq!(validate_config(&config), Ok(()));
    }

    #[test]
    fn test_resolver_template_placeholder() {
        let mut config = valid();
        config.resolver.template = Some("static.host".into());
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::InvalidResolverTemplate("static.host".into())]);
    }

    #[test]
    fn test_bad_listener_address() {
        let mut config = valid();
        config.listener.bind_address = "localhost".into();
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(errors[0], ValidationError::InvalidAddress { field: "listener.bind_address", .. }));
    }

    #[test]
    fn test_artifact_inside_member_dir() {
        let mut config = valid();
        config.groups[0].artifact_path = "/etc/nginx/backend-0/all.upstream".into();
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::ArtifactInsideRecords("backend-0".into())])
        );
    }
}

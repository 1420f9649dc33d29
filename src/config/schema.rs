//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the daemon.
//! All types derive Serde traits for deserialization from config files.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Placeholder admin key shipped in the defaults; rejected when admin is enabled.
pub const PLACEHOLDER_API_KEY: &str = "CHANGE_ME_IN_PRODUCTION";

/// Root configuration for the upstream synchronizer.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Notification topic whose events are accepted.
    pub topic_arn: String,

    /// Confirm subscription requests for the configured topic automatically.
    pub auto_subscribe: bool,

    /// Rebuild every group's artifact from its record directory at startup.
    pub regenerate_on_start: bool,

    /// Listener configuration (bind address, request limits).
    pub listener: ListenerConfig,

    /// How member fragments are rendered and stored.
    pub backend: BackendLineConfig,

    /// External reload action.
    pub reload: ReloadConfig,

    /// Member address resolution.
    pub resolver: ResolverConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin API settings.
    pub admin: AdminConfig,

    /// Upstream groups kept in sync.
    pub groups: Vec<GroupConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            topic_arn: String::new(),
            auto_subscribe: false,
            regenerate_on_start: true,
            listener: ListenerConfig::default(),
            backend: BackendLineConfig::default(),
            reload: ReloadConfig::default(),
            resolver: ResolverConfig::default(),
            observability: ObservabilityConfig::default(),
            admin: AdminConfig::default(),
            groups: Vec::new(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:5000").
    pub bind_address: String,

    /// Request timeout in seconds. Engine work already started keeps running.
    pub request_timeout_secs: u64,

    /// Maximum accepted webhook body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:5000".to_string(),
            request_timeout_secs: 30,
            max_body_bytes: 256 * 1024,
        }
    }
}

/// Rendering of a single member's `server` line.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendLineConfig {
    /// Port appended to the member address.
    pub port: u16,

    /// `max_fails` parameter of the server line.
    pub max_fails: u32,

    /// `fail_timeout` parameter of the server line, in seconds.
    pub fail_timeout_secs: u64,

    /// Append `# <member-id>` to every server line.
    pub annotate_member_id: bool,

    /// File extension of member records (without the dot).
    pub record_extension: String,
}

impl Default for BackendLineConfig {
    fn default() -> Self {
        Self {
            port: 80,
            max_fails: 3,
            fail_timeout_secs: 60,
            annotate_member_id: false,
            record_extension: "upstream".to_string(),
        }
    }
}

/// Reload command configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReloadConfig {
    /// Program and arguments, executed without a shell.
    pub command: Vec<String>,
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self {
            command: vec![
                "sudo".to_string(),
                "service".to_string(),
                "nginx".to_string(),
                "reload".to_string(),
            ],
        }
    }
}

/// Member address resolution.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ResolverConfig {
    /// Address template; `{member_id}` is replaced by the member identifier.
    pub template: Option<String>,

    /// Static member-id -> address overrides, consulted first.
    pub addresses: HashMap<String, String>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Mount the admin routes under `/admin`.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: PLACEHOLDER_API_KEY.to_string(),
        }
    }
}

/// One upstream group backed by a scaling group.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct GroupConfig {
    /// Scaling group key carried by membership events.
    pub key: String,

    /// Upstream block label written into the artifact.
    pub name: String,

    /// Consolidated artifact read by the load balancer.
    pub artifact_path: PathBuf,

    /// Directory holding one record file per member.
    pub member_dir: PathBuf,
}

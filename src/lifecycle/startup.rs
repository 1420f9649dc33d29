//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the reloader, engine, resolver and dispatcher from a validated config
//! - Regenerate every artifact from disk before traffic is accepted
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - A failed startup regeneration is logged, not fatal; the next change
//!   for the group rewrites its artifact anyway

use std::sync::Arc;

use thiserror::Error;

use crate::config::Config;
use crate::events::{EventDispatcher, TemplateResolver};
use crate::registry::{CommandReloader, ReconfigurationEngine, ReloadStatus};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("reload command is empty")]
    EmptyReloadCommand,
}

/// Core services shared by the HTTP layer.
#[derive(Clone)]
pub struct Services {
    pub engine: Arc<ReconfigurationEngine>,
    pub dispatcher: Arc<EventDispatcher>,
}

/// Wire the core services together.
pub fn bootstrap(config: &Config) -> Result<Services, StartupError> {
    let reloader =
        CommandReloader::from_argv(&config.reload.command).ok_or(StartupError::EmptyReloadCommand)?;
    tracing::debug!(command = ?config.reload.command, "Reload command configured");

    let engine = Arc::new(ReconfigurationEngine::new(
        &config.groups,
        &config.backend,
        Arc::new(reloader),
    ));
    let resolver = Arc::new(TemplateResolver::from_config(&config.resolver));
    let dispatcher = Arc::new(EventDispatcher::new(
        Arc::clone(&engine),
        resolver,
        config.topic_arn.clone(),
        config.auto_subscribe,
    ));

    tracing::info!(
        groups = config.groups.len(),
        topic = %config.topic_arn,
        auto_subscribe = config.auto_subscribe,
        "Core services initialized"
    );
    Ok(Services { engine, dispatcher })
}

/// Rebuild every artifact from the record store.
pub async fn resync_on_start(engine: &ReconfigurationEngine) {
    let report = engine.resync().await;
    for (group, members) in &report.regenerated {
        tracing::info!(group = %group, members, "Artifact regenerated at startup");
    }
    for (group, error) in &report.failed {
        tracing::error!(group = %group, error = %error, "Startup regeneration failed");
    }
    if let Some(ReloadStatus::Failed(e)) = &report.reload {
        tracing::warn!(error = %e, "Startup reload failed");
    }
}

//! Reconfiguration engine.
//!
//! # Responsibilities
//! - Validate a membership change against the configured groups
//! - Apply it under the group's lock: record → artifact → reload
//! - Report a confirmation, a not-found no-op, or the failing step
//!
//! # Design Decisions
//! - Terminal on first error; the lock guard is dropped on every path
//! - A failed reload keeps the membership change (no rollback)
//! - Changes can run on detached tasks so a dropped caller never cancels a
//!   critical section halfway

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinHandle;

use crate::config::{BackendLineConfig, GroupConfig};
use crate::observability::metrics;
use crate::registry::artifact::{ArtifactGenerator, FragmentRenderer};
use crate::registry::locks::GroupLockTable;
use crate::registry::reload::Reloader;
use crate::registry::store::{MemberRecordStore, StoreError};
use crate::registry::types::{
    ChangeOutcome, GroupKey, MemberAddress, MemberId, MembershipChange, Operation,
    RegistryError, ReloadStatus,
};

/// A configured group together with its storage.
#[derive(Debug)]
struct GroupHandle {
    config: GroupConfig,
    store: MemberRecordStore,
    artifact: ArtifactGenerator,
}

/// Result of a regeneration without a membership change.
#[derive(Debug)]
pub struct RegenerateOutcome {
    pub group_name: String,
    pub members: usize,
    pub reload: ReloadStatus,
}

/// Result of regenerating every group at once.
#[derive(Debug)]
pub struct ResyncReport {
    /// `(group name, members written)` for each regenerated group.
    pub regenerated: Vec<(String, usize)>,
    pub failed: Vec<(String, RegistryError)>,
    /// `None` when no artifact was rewritten.
    pub reload: Option<ReloadStatus>,
}

/// Owns per-group membership state and applies changes to it.
pub struct ReconfigurationEngine {
    groups: HashMap<GroupKey, GroupHandle>,
    /// Keys in configuration order.
    order: Vec<GroupKey>,
    locks: GroupLockTable,
    renderer: FragmentRenderer,
    reloader: Arc<dyn Reloader>,
}

impl std::fmt::Debug for ReconfigurationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconfigurationEngine")
            .field("groups", &self.order)
            .field("renderer", &self.renderer)
            .finish_non_exhaustive()
    }
}

impl ReconfigurationEngine {
    /// Create an engine for a fixed set of groups.
    pub fn new(
        groups: &[GroupConfig],
        backend: &BackendLineConfig,
        reloader: Arc<dyn Reloader>,
    ) -> Self {
        let mut handles = HashMap::with_capacity(groups.len());
        let mut order = Vec::with_capacity(groups.len());
        for group in groups {
            let key = GroupKey::new(group.key.clone());
            let handle = GroupHandle {
                store: MemberRecordStore::new(&group.member_dir, backend.record_extension.clone()),
                artifact: ArtifactGenerator::new(group.name.clone(), &group.artifact_path),
                config: group.clone(),
            };
            if handles.insert(key.clone(), handle).is_none() {
                order.push(key);
            }
        }

        Self {
            groups: handles,
            order,
            locks: GroupLockTable::new(),
            renderer: FragmentRenderer::new(backend),
            reloader,
        }
    }

    /// Configured groups in configuration order.
    pub fn groups(&self) -> impl Iterator<Item = &GroupConfig> {
        self.order.iter().filter_map(|key| self.groups.get(key)).map(|h| &h.config)
    }

    /// Look up a configured group.
    pub fn group(&self, key: &GroupKey) -> Option<&GroupConfig> {
        self.groups.get(key).map(|h| &h.config)
    }

    fn handle(&self, key: &GroupKey) -> Result<&GroupHandle, RegistryError> {
        self.groups
            .get(key)
            .ok_or_else(|| RegistryError::UnknownGroup(key.clone()))
    }

    /// Register (or re-register) a member with its resolved address.
    pub async fn add_member(
        &self,
        group: &GroupKey,
        member: &MemberId,
        address: Option<&MemberAddress>,
    ) -> Result<ChangeOutcome, RegistryError> {
        let handle = self.handle(group)?;
        let address = address.ok_or_else(|| RegistryError::MissingAddress(member.clone()))?;
        let fragment = self.renderer.render(member, address);

        let _guard = self.locks.acquire(group).await;
        tracing::debug!(group = %handle.config.name, member = %member, "Group lock acquired for add");

        if let Err(e) = handle.store.write(member, &fragment).await {
            metrics::record_change(&handle.config.name, Operation::Add, "error");
            return Err(store_error(&handle.config.name, e));
        }

        self.finish(handle, member, Operation::Add).await
    }

    /// Unregister a member. A member without a record is reported, not ignored.
    pub async fn remove_member(
        &self,
        group: &GroupKey,
        member: &MemberId,
    ) -> Result<ChangeOutcome, RegistryError> {
        let handle = self.handle(group)?;

        let _guard = self.locks.acquire(group).await;
        tracing::debug!(group = %handle.config.name, member = %member, "Group lock acquired for remove");

        match handle.store.delete(member).await {
            Ok(()) => {}
            Err(StoreError::NotFound(member)) => {
                tracing::warn!(group = %handle.config.name, member = %member, "Member not registered, nothing to remove");
                metrics::record_change(&handle.config.name, Operation::Remove, "not_found");
                return Err(RegistryError::MemberNotFound {
                    group: handle.config.name.clone(),
                    member,
                });
            }
            Err(e) => {
                metrics::record_change(&handle.config.name, Operation::Remove, "error");
                return Err(store_error(&handle.config.name, e));
            }
        }

        self.finish(handle, member, Operation::Remove).await
    }

    /// Apply a change on the caller's task.
    pub async fn apply(&self, change: MembershipChange) -> Result<ChangeOutcome, RegistryError> {
        match change.operation {
            Operation::Add => {
                self.add_member(&change.group, &change.member, change.address.as_ref())
                    .await
            }
            Operation::Remove => self.remove_member(&change.group, &change.member).await,
        }
    }

    /// Apply a change on its own task.
    ///
    /// Dropping the returned handle does not cancel the change.
    pub fn spawn(
        self: &Arc<Self>,
        change: MembershipChange,
    ) -> JoinHandle<Result<ChangeOutcome, RegistryError>> {
        let engine = Arc::clone(self);
        tokio::spawn(async move { engine.apply(change).await })
    }

    /// Regenerate and reload; the caller holds the group lock.
    async fn finish(
        &self,
        handle: &GroupHandle,
        member: &MemberId,
        operation: Operation,
    ) -> Result<ChangeOutcome, RegistryError> {
        let name = &handle.config.name;
        let members = match self.regenerate_locked(handle).await {
            Ok(members) => members,
            Err(e) => {
                metrics::record_change(name, operation, "error");
                return Err(e);
            }
        };

        let reload = self.reload(name).await;
        metrics::record_change(
            name,
            operation,
            if matches!(reload, ReloadStatus::Reloaded(_)) { "ok" } else { "reload_failed" },
        );

        let outcome = ChangeOutcome {
            group_name: name.clone(),
            member: member.clone(),
            operation,
            members,
            reload,
        };
        tracing::info!(
            group = %name,
            member = %member,
            operation = operation.as_str(),
            members,
            reloaded = outcome.reloaded(),
            "Membership change applied"
        );
        Ok(outcome)
    }

    async fn regenerate_locked(&self, handle: &GroupHandle) -> Result<usize, RegistryError> {
        let name = &handle.config.name;
        match handle.artifact.regenerate(&handle.store).await {
            Ok(members) => {
                metrics::record_members(name, members);
                tracing::debug!(group = %name, members, path = %handle.artifact.path().display(), "Artifact regenerated");
                Ok(members)
            }
            Err(e) => {
                tracing::error!(group = %name, error = %e, "Artifact regeneration failed");
                Err(RegistryError::Artifact {
                    group: name.clone(),
                    source: e.into_io(),
                })
            }
        }
    }

    async fn reload(&self, group_name: &str) -> ReloadStatus {
        let started = Instant::now();
        let result = self.reloader.reload().await;
        metrics::record_reload(result.is_ok(), started);

        match result {
            Ok(output) => ReloadStatus::Reloaded(output),
            Err(e) => {
                tracing::warn!(group = %group_name, error = %e, "Reload failed; membership change kept");
                ReloadStatus::Failed(e)
            }
        }
    }

    /// Rebuild one group's artifact from its records and reload.
    pub async fn regenerate(&self, group: &GroupKey) -> Result<RegenerateOutcome, RegistryError> {
        let handle = self.handle(group)?;
        let _guard = self.locks.acquire(group).await;

        let members = self.regenerate_locked(handle).await?;
        let reload = self.reload(&handle.config.name).await;
        Ok(RegenerateOutcome {
            group_name: handle.config.name.clone(),
            members,
            reload,
        })
    }

    /// Rebuild every group's artifact, then reload once.
    ///
    /// Every group lock is held until the reload returns. Locks are taken in
    /// configuration order and every other caller holds at most one.
    pub async fn resync(&self) -> ResyncReport {
        let mut report = ResyncReport {
            regenerated: Vec::new(),
            failed: Vec::new(),
            reload: None,
        };

        let mut guards = Vec::with_capacity(self.order.len());
        for key in &self.order {
            let Some(handle) = self.groups.get(key) else { continue };
            guards.push(self.locks.acquire(key).await);
            match self.regenerate_locked(handle).await {
                Ok(members) => report.regenerated.push((handle.config.name.clone(), members)),
                Err(e) => report.failed.push((handle.config.name.clone(), e)),
            }
        }

        if !report.regenerated.is_empty() {
            report.reload = Some(self.reload("*").await);
        }
        drop(guards);
        report
    }

    /// Member ids currently registered in a group, sorted.
    pub async fn members(&self, group: &GroupKey) -> Result<Vec<MemberId>, RegistryError> {
        let handle = self.handle(group)?;
        let _guard = self.locks.acquire(group).await;

        let records = handle
            .store
            .list()
            .await
            .map_err(|e| store_error(&handle.config.name, StoreError::Io(e)))?;
        Ok(records.into_iter().map(|r| r.member).collect())
    }
}

fn store_error(group: &str, e: StoreError) -> RegistryError {
    tracing::error!(group = %group, error = %e, "Record store operation failed");
    match e {
        StoreError::Io(source) => RegistryError::Store {
            group: group.to_string(),
            source,
        },
        StoreError::NotFound(member) => RegistryError::MemberNotFound {
            group: group.to_string(),
            member,
        },
    }
}

//! Consolidated upstream artifact generation.
//!
//! # Responsibilities
//! - Render one member's server line from configuration
//! - Fold every record of a group into a single `upstream <name> { ... }` block
//!
//! # Design Decisions
//! - The record directory is scanned before the artifact is touched, so a
//!   failed scan leaves the previous artifact in place
//! - The artifact is truncated and rewritten in place (no rename), fragments
//!   are copied verbatim in store order

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::config::BackendLineConfig;
use crate::registry::store::MemberRecordStore;
use crate::registry::types::{MemberAddress, MemberId};

/// Renders member fragments (`server ...;` lines).
#[derive(Debug, Clone)]
pub struct FragmentRenderer {
    port: u16,
    max_fails: u32,
    fail_timeout_secs: u64,
    annotate_member_id: bool,
}

impl FragmentRenderer {
    pub fn new(config: &BackendLineConfig) -> Self {
        Self {
            port: config.port,
            max_fails: config.max_fails,
            fail_timeout_secs: config.fail_timeout_secs,
            annotate_member_id: config.annotate_member_id,
        }
    }

    /// One newline-terminated server line.
    pub fn render(&self, member: &MemberId, address: &MemberAddress) -> String {
        let mut line = format!(
            "server {}:{} max_fails={} fail_timeout={}s;",
            address, self.port, self.max_fails, self.fail_timeout_secs
        );
        if self.annotate_member_id {
            line.push_str(" # ");
            line.push_str(member.as_str());
        }
        line.push('\n');
        line
    }
}

impl Default for FragmentRenderer {
    fn default() -> Self {
        Self::new(&BackendLineConfig::default())
    }
}

/// Build the artifact text for a group.
pub fn render_artifact<S: AsRef<str>>(name: &str, fragments: &[S]) -> String {
    let mut out = format!("upstream {name} {{\n");
    for fragment in fragments {
        out.push_str("  ");
        out.push_str(fragment.as_ref());
    }
    out.push_str("}\n");
    out
}

/// Error while regenerating an artifact.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    /// Listing the record directory failed; the artifact was not touched.
    #[error("scanning records: {0}")]
    Scan(#[source] std::io::Error),

    /// Writing the artifact failed; it may be truncated.
    #[error("writing {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ArtifactError {
    pub fn into_io(self) -> std::io::Error {
        match self {
            ArtifactError::Scan(e) => e,
            ArtifactError::Write { source, .. } => source,
        }
    }
}

/// Writes a group's consolidated artifact.
#[derive(Debug, Clone)]
pub struct ArtifactGenerator {
    name: String,
    path: PathBuf,
}

impl ArtifactGenerator {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rewrite the artifact from the store's current records.
    ///
    /// Returns the number of members written.
    pub async fn regenerate(&self, store: &MemberRecordStore) -> Result<usize, ArtifactError> {
        let fragments = store.list_fragments().await.map_err(ArtifactError::Scan)?;
        let body = render_artifact(&self.name, &fragments);

        let write_err = |source| ArtifactError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(write_err)?;
        }
        fs::write(&self.path, body).await.map_err(write_err)?;

        Ok(fragments.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(id: &str) -> MemberId {
        MemberId::parse(id).unwrap()
    }

    fn address(a: &str) -> MemberAddress {
        MemberAddress::parse(a).unwrap()
    }

    #[test]
    fn test_render_default_line() {
        let line = FragmentRenderer::default().render(&member("i-1"), &address("10.0.0.1"));
        assert_eq!(line, "server 10.0.0.1:80 max_fails=3 fail_timeout=60s;\n");
    }

    #[test]
    fn test_render_annotated_line() {
        let config = BackendLineConfig {
            port: 8080,
            max_fails: 1,
            fail_timeout_secs: 10,
            annotate_member_id: true,
            ..BackendLineConfig::default()
        };
        let line = FragmentRenderer::new(&config).render(&member("i-1"), &address("test.internal"));
        assert_eq!(line, "server test.internal:8080 max_fails=1 fail_timeout=10s; # i-1\n");
    }

    #[test]
    fn test_render_empty_artifact() {
        let fragments: [&str; 0] = [];
        assert_eq!(render_artifact("test", &fragments), "upstream test {\n}\n");
    }

    #[tokio::test]
    async fn test_regenerate_writes_block() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemberRecordStore::new(dir.path().join("backend-0"), "upstream");
        let generator = ArtifactGenerator::new("backend-0", dir.path().join("backend-0.upstream"));
        let renderer = FragmentRenderer::default();

        store
            .write(&member("i-1"), &renderer.render(&member("i-1"), &address("10.0.0.1")))
            .await
            .unwrap();

        assert_eq!(generator.regenerate(&store).await.unwrap(), 1);
        let content = std::fs::read_to_string(generator.path()).unwrap();
        assert_eq!(
            content,
            "upstream backend-0 {\n  server 10.0.0.1:80 max_fails=3 fail_timeout=60s;\n}\n"
        );
    }

    #[tokio::test]
    async fn test_regenerate_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemberRecordStore::new(dir.path().join("records"), "upstream");
        let generator = ArtifactGenerator::new("web", dir.path().join("web.upstream"));
        for i in 0..5 {
            let id = member(&format!("i-{i}"));
            store.write(&id, &format!("server 10.0.0.{i}:80;\n")).await.unwrap();
        }

        generator.regenerate(&store).await.unwrap();
        let first = std::fs::read(generator.path()).unwrap();
        generator.regenerate(&store).await.unwrap();
        let second = std::fs::read(generator.path()).unwrap();
        assert_eq!(first, second);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_scan_keeps_previous_artifact() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the record directory should be makes the scan fail.
        let bogus = dir.path().join("records");
        std::fs::write(&bogus, "not a directory").unwrap();
        let store = MemberRecordStore::new(&bogus, "upstream");

        let artifact = dir.path().join("web.upstream");
        std::fs::write(&artifact, "upstream web {\n  server old:80;\n}\n").unwrap();
        let generator = ArtifactGenerator::new("web", &artifact);

        let err = generator.regenerate(&store).await.unwrap_err();
        assert!(matches!(err, ArtifactError::Scan(_)));
        assert_eq!(
            std::fs::read_to_string(&artifact).unwrap(),
            "upstream web {\n  server old:80;\n}\n"
        );
    }
}

//! Member record store.
//!
//! # Responsibilities
//! - One file per registered member: `<member_dir>/<member-id>.<extension>`
//! - File content is the member's rendered server line
//! - Enumerate records for artifact regeneration
//!
//! # Design Decisions
//! - The directory is the only source of truth; nothing is cached in memory
//! - Writes are idempotent overwrites; deleting a missing record is an error
//! - Enumeration is sorted by file name so a given snapshot lists identically

use std::io::ErrorKind;
use std::path::PathBuf;

use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::registry::types::MemberId;

/// Permissions for newly created record files.
#[cfg(unix)]
const RECORD_MODE: u32 = 0o640;

/// Errors from the record store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no record for member \"{0}\"")]
    NotFound(MemberId),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// One member's on-disk record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRecord {
    pub member: MemberId,
    pub fragment: String,
}

/// File-backed record directory of one group.
#[derive(Debug, Clone)]
pub struct MemberRecordStore {
    dir: PathBuf,
    extension: String,
}

impl MemberRecordStore {
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.into(),
        }
    }

    /// Path of a member's record file.
    pub fn record_path(&self, member: &MemberId) -> PathBuf {
        self.dir.join(format!("{}.{}", member, self.extension))
    }

    /// Create or overwrite a member's record.
    pub async fn write(&self, member: &MemberId, fragment: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).await?;

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(RECORD_MODE);

        let mut file = options.open(self.record_path(member)).await?;
        file.write_all(fragment.as_bytes()).await?;
        file.sync_all().await?;
        Ok(())
    }

    /// Remove a member's record.
    pub async fn delete(&self, member: &MemberId) -> Result<(), StoreError> {
        match fs::remove_file(self.record_path(member)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound(member.clone())),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    /// Whether a record exists for the member.
    pub async fn contains(&self, member: &MemberId) -> std::io::Result<bool> {
        fs::try_exists(self.record_path(member)).await
    }

    /// All records in the directory, sorted by file name.
    ///
    /// A missing directory holds no records.
    pub async fn list(&self) -> std::io::Result<Vec<MemberRecord>> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(self.extension.as_str()) {
                continue;
            }
            if !entry.file_type().await?.is_file() {
                continue;
            }
            paths.push(path);
        }
        paths.sort();

        let mut records = Vec::with_capacity(paths.len());
        for path in paths {
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let Ok(member) = MemberId::parse(stem) else {
                tracing::warn!(path = %path.display(), "Skipping record with invalid member id");
                continue;
            };
            let fragment = fs::read_to_string(&path).await?;
            records.push(MemberRecord { member, fragment });
        }
        Ok(records)
    }

    /// Fragment contents only, in enumeration order.
    pub async fn list_fragments(&self) -> std::io::Result<Vec<String>> {
        Ok(self.list().await?.into_iter().map(|r| r.fragment).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(id: &str) -> MemberId {
        MemberId::parse(id).unwrap()
    }

    #[tokio::test]
    async fn test_write_then_list() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemberRecordStore::new(dir.path().join("backend-0"), "upstream");

        store.write(&member("i-2"), "server b:80;\n").await.unwrap();
        store.write(&member("i-1"), "server a:80;\n").await.unwrap();

        let records = store.list().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].member, member("i-1"));
        assert_eq!(records[0].fragment, "server a:80;\n");
        assert_eq!(records[1].member, member("i-2"));
    }

    #[tokio::test]
    async fn test_write_is_idempotent_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemberRecordStore::new(dir.path(), "upstream");

        store.write(&member("i-1"), "server old:80;\n").await.unwrap();
        store.write(&member("i-1"), "server new:80;\n").await.unwrap();

        assert_eq!(store.list_fragments().await.unwrap(), vec!["server new:80;\n"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_record_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = MemberRecordStore::new(dir.path(), "upstream");
        store.write(&member("i-1"), "x\n").await.unwrap();

        let meta = std::fs::metadata(store.record_path(&member("i-1"))).unwrap();
        assert_eq!(meta.permissions().mode() & 0o007, 0);
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemberRecordStore::new(dir.path(), "upstream");

        let err = store.delete(&member("i-00000")).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(ref m) if m.as_str() == "i-00000"));
    }

    #[tokio::test]
    async fn test_delete_removes_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemberRecordStore::new(dir.path(), "upstream");
        store.write(&member("i-1"), "x\n").await.unwrap();

        store.delete(&member("i-1")).await.unwrap();
        assert!(!store.contains(&member("i-1")).await.unwrap());
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_ignores_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemberRecordStore::new(dir.path(), "upstream");
        store.write(&member("i-1"), "x\n").await.unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignore me").unwrap();
        std::fs::create_dir(dir.path().join("nested.upstream")).unwrap();

        let records = store.list().await.unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemberRecordStore::new(dir.path().join("absent"), "upstream");
        assert!(store.list().await.unwrap().is_empty());
    }
}

//! Upstream registry and reconfiguration subsystem.
//!
//! # Data Flow
//! ```text
//! MembershipChange (group, member, operation, address)
//!     → engine.rs (validate, acquire group lock)
//!     → store.rs (write / delete <member_dir>/<member-id>.<ext>)
//!     → artifact.rs (rewrite `upstream <name> { ... }` from all records)
//!     → reload.rs (run the reload command, capture output)
//!     → lock released → ChangeOutcome / RegistryError to the caller
//! ```
//!
//! # Design Decisions
//! - Record files are the only membership state; no in-memory index
//! - locks.rs gives each group its own mutex; groups never wait on each other
//! - The lock covers mutation, regeneration and reload as one unit
//! - A reload failure is soft: the change stands and the caller is told

pub mod artifact;
pub mod engine;
pub mod locks;
pub mod reload;
pub mod store;
pub mod types;

pub use artifact::{render_artifact, ArtifactGenerator, FragmentRenderer};
pub use engine::{ReconfigurationEngine, RegenerateOutcome, ResyncReport};
pub use locks::GroupLockTable;
pub use reload::{CommandReloader, ReloadError, ReloadOutput, Reloader};
pub use store::{MemberRecord, MemberRecordStore, StoreError};
pub use types::{
    ChangeOutcome, GroupKey, MemberAddress, MemberId, MembershipChange, Operation, RegistryError,
    ReloadStatus,
};

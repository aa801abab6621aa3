//! Remote object store boundary for file-backup
//!
//! The engine only ever talks to a [`RemoteStore`]. Three implementations are
//! provided: the GitHub contents API, a local git repository, and an
//! in-memory store used by tests.

pub mod error;
pub mod exclusion;
pub mod git;
pub mod github;
pub mod memory;
pub mod store;

pub use error::{RemoteError, Result};
pub use exclusion::{DEFAULT_EXCLUSIONS, ExclusionRules};
pub use git::GitStore;
pub use github::GitHubStore;
pub use memory::MemoryStore;
pub use store::{ObjectMeta, RemoteStore, normalize_remote_path};

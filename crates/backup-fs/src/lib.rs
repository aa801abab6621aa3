//! Filesystem layer for file-backup
//!
//! Provides normalized paths, atomic writes with advisory locking, streaming
//! content hashing, backup snapshots and the locked-file retry helper shared by
//! every operation that overwrites a file.

pub mod checksum;
pub mod config;
pub mod constants;
pub mod error;
pub mod io;
pub mod path;
pub mod retry;

pub use checksum::{ContentDigest, hash_bytes, hash_file, hash_reader};
pub use config::ConfigStore;
pub use constants::{BACKUP_SUFFIX, HASH_CHUNK_SIZE};
pub use error::{Error, Result};
pub use io::RobustnessConfig;
pub use path::NormalizedPath;
pub use retry::{RetryPolicy, is_locked_error, retry_locked};

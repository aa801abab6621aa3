//! Shared test fixtures for the file-backup workspace.
//!
//! Dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`git`] — git repositories with controlled commit history
//! - [`workspace`] — [`Workspace`] sandbox with local files and a state path

pub mod git;
pub mod workspace;

pub use workspace::Workspace;

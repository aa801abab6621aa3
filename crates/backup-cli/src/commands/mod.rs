//! Command implementations for backup-cli

pub mod check;
pub mod list;
pub mod settings;
pub mod status;
pub mod track;

pub use check::{run_check, run_daemon};
pub use list::{run_list, run_remote_ls};
pub use settings::{run_exclude, run_interval, run_prompt, run_watch};
pub use status::run_status;
pub use track::{run_pull, run_track, run_untrack};

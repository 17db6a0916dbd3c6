//! # memsup common
//!
//! Error types and small domain types shared by the memsup crates.
//!
//! Every other crate in the workspace depends on this one, so it stays free
//! of process or configuration logic.

pub mod errors;
pub mod types;

// Re-export commonly used items
pub use errors::{
    ConfigError, ConfigResult, LaunchError, LaunchResult, ProcessError, ProcessResult,
};
pub use types::Pid;

//! # memsup process
//!
//! Low-level POSIX process operations used by the fixture supervisor.
//!
//! This crate provides primitives for:
//! - Spawning a backgrounded shell command line and capturing its stderr
//! - Draining whatever startup diagnostics are available without blocking
//! - Listing running processes by command name
//! - Forced termination (`SIGKILL`)
//! - Process existence checks
//!
//! Only POSIX systems with `sh` and a procps-style `ps` are supported.

pub mod check;
pub mod execute;
pub mod listing;
pub mod terminate;

// Re-export main types
pub use check::*;
pub use execute::*;
pub use listing::*;
pub use terminate::*;

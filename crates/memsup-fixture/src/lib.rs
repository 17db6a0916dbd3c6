//! # memsup fixture
//!
//! Supervisor for throwaway memcached instances used by integration tests.
//!
//! Setup launches one detached server per port and fails fast if the server
//! complains on stderr; teardown finds the servers again through the process
//! listing and kills them. Teardown never fails.
//!
//! ```rust,no_run
//! use memsup_fixture::{FixtureConfig, LocalServerControl, PosixServerControl};
//!
//! let config = FixtureConfig::load(None)?;
//! let control = PosixServerControl::new(config);
//!
//! control.add_local_server(&[11211, 11212])?;
//! // ... run tests ...
//! control.remove_configured_server(&[11211, 11212]);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod classify;
pub mod config;
pub mod control;
pub mod launcher;
pub mod params;
pub mod readiness;
pub mod terminator;

pub use classify::{classify, Classification, ClassificationRule, DEFAULT_RULES};
pub use config::{ClientMode, ConfigSlot, EngineVersion, FixtureConfig, ServerType, TestType};
pub use control::{LocalServerControl, PosixServerControl};
pub use launcher::{LaunchRequest, Launcher};
pub use params::{build_parameters, ServerParameters};
pub use readiness::wait_until_listening;
pub use terminator::{
    extract_pid, PortMatching, ProcessTable, SystemProcessTable, TerminationReport, Terminator,
};

pub use memsup_common::{ConfigError, LaunchError, Pid, ProcessError};

//! Error types for the fixture supervisor.
//!
//! Three families exist, matching the three places things go wrong:
//!
//! - [`LaunchError`]: starting a server fixture failed. Always propagated to
//!   the caller, because a missing fixture invalidates the test using it.
//! - [`ProcessError`]: a low-level process primitive (listing, signalling)
//!   failed. Teardown code logs and swallows these.
//! - [`ConfigError`]: the ambient fixture configuration is unusable or was
//!   initialised twice.

use thiserror::Error;

/// Result type for launch operations.
pub type LaunchResult<T> = std::result::Result<T, LaunchError>;

/// Result type for low-level process operations.
pub type ProcessResult<T> = std::result::Result<T, ProcessError>;

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// ==============================================================================
// Launch Errors
// ==============================================================================

/// A server fixture could not be started.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// The server wrote a startup line that is not a known benign notice.
    ///
    /// The display form is exactly the offending line, so test runners show
    /// the server's own words.
    #[error("{line}")]
    Fatal { port: u16, line: String },

    /// Spawning the server or reading its diagnostics failed.
    #[error("Server could not start on port {port}: {source}")]
    Io {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    /// The server never accepted a connection within the readiness window.
    #[error("Server at {addr} not accepting connections after {waited_ms}ms")]
    NotReady { addr: String, waited_ms: u128 },
}

impl LaunchError {
    pub fn fatal(port: u16, line: impl Into<String>) -> Self {
        Self::Fatal {
            port,
            line: line.into(),
        }
    }

    pub fn io(port: u16, source: std::io::Error) -> Self {
        Self::Io { port, source }
    }

    pub fn not_ready(addr: impl Into<String>, waited_ms: u128) -> Self {
        Self::NotReady {
            addr: addr.into(),
            waited_ms,
        }
    }

    /// Port of the launch that failed, when the error is tied to one.
    pub fn port(&self) -> Option<u16> {
        match self {
            Self::Fatal { port, .. } | Self::Io { port, .. } => Some(*port),
            Self::NotReady { .. } => None,
        }
    }
}

// ==============================================================================
// Process Errors
// ==============================================================================

/// Failures of the POSIX process primitives.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessError {
    #[error("Process listing failed: {command} - {reason}")]
    ListFailed { command: String, reason: String },

    #[error("Malformed listing line: {line:?} - {reason}")]
    MalformedListing { line: String, reason: String },

    #[error("Signal delivery failed: pid {pid} - {reason}")]
    SignalFailed { pid: u32, reason: String },

    #[error("Process probe failed: pid {pid} - {reason}")]
    ProbeFailed { pid: u32, reason: String },
}

impl ProcessError {
    pub fn list_failed(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ListFailed {
            command: command.into(),
            reason: reason.into(),
        }
    }

    pub fn malformed_listing(line: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedListing {
            line: line.into(),
            reason: reason.into(),
        }
    }

    pub fn signal_failed(pid: u32, reason: impl Into<String>) -> Self {
        Self::SignalFailed {
            pid,
            reason: reason.into(),
        }
    }

    pub fn probe_failed(pid: u32, reason: impl Into<String>) -> Self {
        Self::ProbeFailed {
            pid,
            reason: reason.into(),
        }
    }
}

// ==============================================================================
// Configuration Errors
// ==============================================================================

/// The fixture configuration is invalid or was set up more than once.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A configuration slot was initialised a second time.
    #[error("Fixture configuration is already initialized")]
    AlreadyConfigured,

    #[error("Memcached engine version {version} is not supported")]
    UnsupportedEngine { version: String },

    #[error("Invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    pub fn unsupported_engine(version: impl Into<String>) -> Self {
        Self::UnsupportedEngine {
            version: version.into(),
        }
    }

    pub fn invalid_value(
        key: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            key: key.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}

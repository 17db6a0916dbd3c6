//! Process terminator.
//!
//! Fixture servers are detached, so nothing holds a handle to them. Teardown
//! finds them again by command name in the process listing, picks the lines
//! that mention a target port, and sends `SIGKILL` to the pid on each line.
//!
//! Teardown is best-effort: every failure is logged and recorded in the
//! returned [`TerminationReport`], never raised.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use memsup_common::{ConfigError, ConfigResult, Pid, ProcessError, ProcessResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::FixtureConfig;

/// How a target port is recognised in a listing line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortMatching {
    /// A whitespace-separated argument after the command name equals the
    /// port. `1121` does not match `-p 11211`, and the pid column is never
    /// mistaken for a port.
    #[default]
    Exact,
    /// The port's digits appear anywhere in the line. Kept for compatibility
    /// with older harnesses; `1121` matches `11211`, and a pid, path or other
    /// argument containing the digits matches too.
    Substring,
}

impl PortMatching {
    pub fn matches(&self, line: &str, command_name: &str, port: u16) -> bool {
        let port = port.to_string();
        match self {
            PortMatching::Substring => line.contains(&port),
            PortMatching::Exact => {
                let args = line
                    .find(command_name)
                    .map(|idx| &line[idx + command_name.len()..])
                    .unwrap_or("");
                args.split_whitespace().any(|field| field == port)
            }
        }
    }
}

impl FromStr for PortMatching {
    type Err = ConfigError;

    fn from_str(s: &str) -> ConfigResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "exact" => Ok(Self::Exact),
            "substring" => Ok(Self::Substring),
            _ => Err(ConfigError::invalid_value("port_matching", s, "expected exact or substring")),
        }
    }
}

impl fmt::Display for PortMatching {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortMatching::Exact => write!(f, "exact"),
            PortMatching::Substring => write!(f, "substring"),
        }
    }
}

/// Where running processes are listed and signalled.
pub trait ProcessTable {
    /// Listing lines (`<pid> <command>`) for processes named `command_name`.
    fn list(&self, command_name: &str) -> ProcessResult<Vec<String>>;

    /// Sends `SIGKILL` to `pid`.
    fn kill(&self, pid: Pid) -> ProcessResult<()>;
}

/// The real process table, via `ps` and `kill(2)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProcessTable;

impl ProcessTable for SystemProcessTable {
    fn list(&self, command_name: &str) -> ProcessResult<Vec<String>> {
        memsup_process::list_processes(command_name)
    }

    fn kill(&self, pid: Pid) -> ProcessResult<()> {
        memsup_process::force_kill(pid)
    }
}

/// What a terminate call did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TerminationReport {
    pub lines_scanned: usize,
    /// `(port, pid)` for every signal sent, in order.
    pub signalled: Vec<(u16, Pid)>,
    /// Failures that were logged and swallowed.
    pub failures: Vec<ProcessError>,
}

impl TerminationReport {
    pub fn signal_count(&self) -> usize {
        self.signalled.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Pulls the pid out of a listing line.
///
/// The pid is whatever precedes the first occurrence of `command_name`. When
/// the command was started by path, that prefix also holds the directory, so
/// it is cut at the first `/`.
pub fn extract_pid(line: &str, command_name: &str) -> ProcessResult<Pid> {
    let idx = line
        .find(command_name)
        .ok_or_else(|| ProcessError::malformed_listing(line, "command name not found"))?;

    let mut prefix = &line[..idx];
    if let Some(slash) = prefix.find('/') {
        prefix = &prefix[..slash];
    }

    let pid = prefix
        .parse::<Pid>()
        .map_err(|e| ProcessError::malformed_listing(line, format!("bad pid {:?}: {}", prefix.trim(), e)))?;

    // kill(0, ..) would signal our own process group
    if pid.as_raw() == 0 {
        return Err(ProcessError::malformed_listing(line, "pid 0"));
    }
    Ok(pid)
}

/// Finds and kills fixture servers.
#[derive(Debug, Clone)]
pub struct Terminator<T = SystemProcessTable> {
    table: T,
    matching: PortMatching,
}

impl Terminator<SystemProcessTable> {
    pub fn new(matching: PortMatching) -> Self {
        Self::with_table(SystemProcessTable, matching)
    }

    pub fn from_config(config: &FixtureConfig) -> Self {
        Self::new(config.port_matching)
    }
}

impl Default for Terminator<SystemProcessTable> {
    fn default() -> Self {
        Self::new(PortMatching::default())
    }
}

impl<T: ProcessTable> Terminator<T> {
    pub fn with_table(table: T, matching: PortMatching) -> Self {
        Self { table, matching }
    }

    pub fn table(&self) -> &T {
        &self.table
    }

    pub fn matching(&self) -> PortMatching {
        self.matching
    }

    /// Kills every `command_name` process whose listing line matches a port
    /// in `ports`.
    ///
    /// `command_name` is the bare name (`memcached`), not a path. A process
    /// matching several ports is signalled once per match; signalling an
    /// already-dead process is recorded as a failure and otherwise ignored.
    pub fn terminate(&self, command_name: &str, ports: &BTreeSet<u16>) -> TerminationReport {
        let mut report = TerminationReport::default();

        let lines = match self.table.list(command_name) {
            Ok(lines) => lines,
            Err(e) => {
                warn!("Could not terminate {} processes: {}", command_name, e);
                report.failures.push(e);
                return report;
            }
        };

        for line in &lines {
            report.lines_scanned += 1;
            if !line.contains(command_name) {
                continue;
            }

            for &port in ports {
                if !self.matching.matches(line, command_name, port) {
                    continue;
                }

                let pid = match extract_pid(line, command_name) {
                    Ok(pid) => pid,
                    Err(e) => {
                        warn!("Skipping listing line for port {}: {}", port, e);
                        report.failures.push(e);
                        continue;
                    }
                };

                match self.table.kill(pid) {
                    Ok(()) => {
                        info!("Killed connection to port {} with pid {}", port, pid);
                        report.signalled.push((port, pid));
                    }
                    Err(e) => {
                        warn!("Could not kill pid {} for port {}: {}", pid, port, e);
                        report.failures.push(e);
                    }
                }
            }
        }

        debug!(
            "Terminate {} {:?}: scanned {} lines, sent {} signals",
            command_name,
            ports,
            report.lines_scanned,
            report.signal_count()
        );
        report
    }
}

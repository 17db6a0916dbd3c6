//! Process launcher.
//!
//! Starts one detached server per call and decides from its early stderr
//! output whether the start failed. A successful launch only means the server
//! did not complain within the grace window; readiness is checked separately
//! (see [`crate::readiness`]).

use std::thread;
use std::time::Duration;

use memsup_common::{LaunchError, LaunchResult};
use memsup_process::spawn_detached;
use tracing::{debug, info, warn};

use crate::classify::{classify_with, Classification, ClassificationRule, DEFAULT_RULES};
use crate::config::FixtureConfig;
use crate::params::ServerParameters;

/// One server start: which binary, on which port, with which flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    binary_path: String,
    port: u16,
    parameters: ServerParameters,
}

impl LaunchRequest {
    pub fn new(binary_path: impl Into<String>, port: u16, parameters: ServerParameters) -> Self {
        Self {
            binary_path: binary_path.into(),
            port,
            parameters,
        }
    }

    pub fn binary_path(&self) -> &str {
        &self.binary_path
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn parameters(&self) -> &ServerParameters {
        &self.parameters
    }

    /// `<binary> [<flag> <value>]* -p <port>`, before backgrounding.
    ///
    /// Values are not quoted; the shell splits compound flags such as
    /// `-Z -o` into separate arguments.
    pub fn command_line(&self) -> String {
        format!(
            "{}{} -p {}",
            self.binary_path,
            self.parameters.to_flag_string(),
            self.port
        )
    }
}

/// Starts server fixtures and classifies their startup diagnostics.
#[derive(Debug, Clone)]
pub struct Launcher {
    startup_grace: Duration,
    rules: &'static [ClassificationRule],
}

impl Launcher {
    pub fn new(startup_grace: Duration) -> Self {
        Self {
            startup_grace,
            rules: DEFAULT_RULES,
        }
    }

    pub fn from_config(config: &FixtureConfig) -> Self {
        Self::new(config.startup_grace)
    }

    /// Replaces the classification rules.
    pub fn with_rules(mut self, rules: &'static [ClassificationRule]) -> Self {
        self.rules = rules;
        self
    }

    pub fn startup_grace(&self) -> Duration {
        self.startup_grace
    }

    /// Launches `binary_path` on `port` with `parameters`.
    pub fn launch(
        &self,
        binary_path: &str,
        port: u16,
        parameters: &ServerParameters,
    ) -> LaunchResult<()> {
        self.launch_request(&LaunchRequest::new(binary_path, port, parameters.clone()))
    }

    /// Launches a prepared request.
    ///
    /// Returns the first fatal diagnostic line as [`LaunchError::Fatal`], or
    /// the spawn/read failure as [`LaunchError::Io`]. The stderr pipe is
    /// closed before returning on every path.
    pub fn launch_request(&self, request: &LaunchRequest) -> LaunchResult<()> {
        let port = request.port();
        let command_line = request.command_line();
        info!("Starting server on port {}: {}", port, command_line);

        let diagnostics = spawn_detached(&command_line).map_err(|e| {
            warn!("Server process could not start for port {}", port);
            LaunchError::io(port, e)
        })?;

        // The pipe is not filled the instant the server starts
        thread::sleep(self.startup_grace);

        let lines = diagnostics
            .drain_available()
            .map_err(|e| LaunchError::io(port, e))?;

        if lines.is_empty() {
            debug!("No startup diagnostics from port {}", port);
            return Ok(());
        }

        inspect_diagnostics(self.rules, port, &lines)
    }
}

impl Default for Launcher {
    fn default() -> Self {
        Self::from_config(&FixtureConfig::default())
    }
}

/// Walks startup lines in order; the first fatal one becomes the error.
pub fn inspect_diagnostics(
    rules: &[ClassificationRule],
    port: u16,
    lines: &[String],
) -> LaunchResult<()> {
    for line in lines {
        match classify_with(rules, line) {
            (Classification::Benign, "blank") => {}
            (Classification::Benign, rule) => {
                warn!(rule, "Server on port {}: {}", port, line);
            }
            (Classification::Fatal, _) => {
                warn!("Server on port {} failed to start: {}", port, line);
                return Err(LaunchError::fatal(port, line.as_str()));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn test_command_line() {
        let params: ServerParameters = [("-m", "4"), ("-o", "track_sizes")].into_iter().collect();
        let request = LaunchRequest::new("/usr/bin/memcached", 11211, params);
        assert_eq!(
            request.command_line(),
            "/usr/bin/memcached -m 4 -o track_sizes -p 11211"
        );
    }

    #[test]
    fn test_benign_lines_pass() {
        let result = inspect_diagnostics(
            DEFAULT_RULES,
            11211,
            &lines(&["WARNING: slab class too small", "", "failed to listen on 11211"]),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_first_fatal_line_is_reported() {
        let err = inspect_diagnostics(
            DEFAULT_RULES,
            11211,
            &lines(&["WARNING: ok", "Segmentation fault", "Illegal instruction"]),
        )
        .unwrap_err();

        assert_eq!(err.to_string(), "Segmentation fault");
        assert!(matches!(err, LaunchError::Fatal { port: 11211, .. }));
    }

    #[test]
    fn test_silent_launch_succeeds() {
        // `true` ignores its arguments and prints nothing
        let launcher = Launcher::new(Duration::from_millis(100));
        launcher
            .launch("true", 11299, &ServerParameters::new())
            .unwrap();
    }

    #[test]
    fn test_missing_binary_is_fatal() {
        let launcher = Launcher::new(Duration::from_millis(300));
        let err = launcher
            .launch("/nonexistent/memsup/memcached", 11298, &ServerParameters::new())
            .unwrap_err();

        // The shell's own complaint is the first stderr line
        assert!(matches!(err, LaunchError::Fatal { .. }));
        assert!(err.to_string().contains("/nonexistent/memsup/memcached"));
    }

    fn is_notice(line: &str) -> bool {
        line.starts_with("notice:")
    }

    const NOTICE_RULES: &[ClassificationRule] = &[ClassificationRule {
        name: "notice",
        matches: is_notice,
        class: Classification::Benign,
    }];

    #[test]
    fn test_custom_rules_replace_defaults() {
        // `-p <port>` lands in the inner shell's positional arguments
        let binary = "sh -c 'echo notice: slab sizes tuned >&2'";

        let err = Launcher::new(Duration::from_millis(300))
            .launch(binary, 11297, &ServerParameters::new())
            .unwrap_err();
        assert_eq!(err.to_string(), "notice: slab sizes tuned");

        let launcher = Launcher::new(Duration::from_millis(300)).with_rules(NOTICE_RULES);
        launcher
            .launch(binary, 11297, &ServerParameters::new())
            .unwrap();
    }
}

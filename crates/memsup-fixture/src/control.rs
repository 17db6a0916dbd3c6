//! LocalServerControl trait - what a test fixture can ask of the supervisor.
//!
//! Fixture setup adds servers on the ports a test needs; teardown removes
//! them again by command name and port. [`PosixServerControl`] is the only
//! implementation and drives a [`Launcher`] and a [`Terminator`].

use std::collections::BTreeSet;

use memsup_common::LaunchResult;

use crate::config::FixtureConfig;
use crate::launcher::Launcher;
use crate::params::{build_parameters, ServerParameters};
use crate::terminator::{ProcessTable, SystemProcessTable, TerminationReport, Terminator};

/// Starting and stopping local server fixtures.
pub trait LocalServerControl {
    /// Starts the configured server binary with default parameters on every
    /// port. Stops at the first port that fails.
    fn add_local_server(&self, ports: &[u16]) -> LaunchResult<()>;

    /// Like [`add_local_server`](Self::add_local_server) with caller-chosen
    /// parameters.
    fn add_local_server_with(&self, params: &ServerParameters, ports: &[u16]) -> LaunchResult<()>;

    /// Starts `binary_path` on a single port.
    fn add_local_server_at(
        &self,
        binary_path: &str,
        port: u16,
        params: &ServerParameters,
    ) -> LaunchResult<()>;

    /// Kills every `command_name` process listening on one of `ports`.
    ///
    /// Never fails; see [`TerminationReport`] for what happened.
    fn remove_local_server(&self, command_name: &str, ports: &[u16]) -> TerminationReport;

    /// Default parameters for the configured server.
    fn server_parameters(&self) -> ServerParameters;
}

/// POSIX implementation over `sh`, `ps` and `kill(2)`.
#[derive(Debug, Clone)]
pub struct PosixServerControl<T = SystemProcessTable> {
    config: FixtureConfig,
    launcher: Launcher,
    terminator: Terminator<T>,
}

impl PosixServerControl<SystemProcessTable> {
    pub fn new(config: FixtureConfig) -> Self {
        let launcher = Launcher::from_config(&config);
        let terminator = Terminator::from_config(&config);
        Self {
            config,
            launcher,
            terminator,
        }
    }
}

impl<T: ProcessTable> PosixServerControl<T> {
    pub fn with_parts(config: FixtureConfig, launcher: Launcher, terminator: Terminator<T>) -> Self {
        Self {
            config,
            launcher,
            terminator,
        }
    }

    pub fn config(&self) -> &FixtureConfig {
        &self.config
    }

    /// Removes the configured server from `ports`.
    pub fn remove_configured_server(&self, ports: &[u16]) -> TerminationReport {
        self.remove_local_server(&self.config.server_name, ports)
    }
}

impl<T: ProcessTable> LocalServerControl for PosixServerControl<T> {
    fn add_local_server(&self, ports: &[u16]) -> LaunchResult<()> {
        self.add_local_server_with(&self.server_parameters(), ports)
    }

    fn add_local_server_with(&self, params: &ServerParameters, ports: &[u16]) -> LaunchResult<()> {
        for &port in ports {
            self.add_local_server_at(&self.config.server_bin, port, params)?;
        }
        Ok(())
    }

    fn add_local_server_at(
        &self,
        binary_path: &str,
        port: u16,
        params: &ServerParameters,
    ) -> LaunchResult<()> {
        self.launcher.launch(binary_path, port, params)
    }

    fn remove_local_server(&self, command_name: &str, ports: &[u16]) -> TerminationReport {
        let ports: BTreeSet<u16> = ports.iter().copied().collect();
        self.terminator.terminate(command_name, &ports)
    }

    fn server_parameters(&self) -> ServerParameters {
        build_parameters(&self.config)
    }
}

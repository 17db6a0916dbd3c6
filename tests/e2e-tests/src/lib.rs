// E2E test framework for the memsup fixture supervisor

use std::net::TcpListener;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use memsup_common::Pid;
use memsup_fixture::{FixtureConfig, PortMatching};

/// Command name of the stand-in server, as `ps -C` sees it.
pub const FAKECACHED: &str = "fakecached";

/// Whether a procps-style `ps` supporting `-C` is installed.
pub fn ps_available() -> bool {
    Command::new("ps")
        .args(["-o", "pid,command", "-C", FAKECACHED])
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .map(|out| out.stderr.is_empty())
        .unwrap_or(false)
}

/// A TCP port nothing is listening on right now.
pub fn free_port() -> u16 {
    free_ports(1)[0]
}

/// `count` distinct free ports; all are held until every one is picked.
pub fn free_ports(count: usize) -> Vec<u16> {
    let listeners: Vec<TcpListener> = (0..count)
        .map(|_| TcpListener::bind("127.0.0.1:0").expect("Failed to pick a free port"))
        .collect();
    listeners
        .iter()
        .map(|l| l.local_addr().expect("Failed to read local address").port())
        .collect()
}

/// Fixture configuration pointing at the stand-in server binary.
pub fn fakecached_config(binary: &str) -> FixtureConfig {
    FixtureConfig {
        server_bin: binary.to_string(),
        server_name: FAKECACHED.to_string(),
        startup_grace: Duration::from_millis(500),
        port_matching: PortMatching::Exact,
        ..Default::default()
    }
}

/// Live (non-zombie) pids of `command_name` processes started with `port`.
pub fn server_pids(command_name: &str, port: u16) -> Vec<Pid> {
    let lines = memsup_process::list_processes(command_name).unwrap_or_default();
    lines
        .iter()
        .filter(|line| line.contains(command_name) && !line.contains("<defunct>"))
        .filter(|line| PortMatching::Exact.matches(line, command_name, port))
        .filter_map(|line| memsup_fixture::extract_pid(line, command_name).ok())
        .collect()
}

/// Polls until no live process serves `port`.
pub fn wait_for_port_released(command_name: &str, port: u16, timeout: Duration) -> Result<(), String> {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if server_pids(command_name, port).is_empty() {
            return Ok(());
        }
        thread::sleep(Duration::from_millis(50));
    }
    Err(format!(
        "{} on port {} still running after {:?}",
        command_name, port, timeout
    ))
}

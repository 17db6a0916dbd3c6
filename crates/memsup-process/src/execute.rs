//! Detached process execution.
//!
//! A server fixture is started through `sh -c "<command line> &"`. The shell
//! backgrounds the server and exits at once, so the server is reparented away
//! from us and nothing here owns its lifetime. The only thing kept is the read
//! end of the server's stderr pipe, which the shell handed down unchanged.

use std::io::{self, Read};
use std::os::unix::io::AsRawFd;
use std::process::{ChildStderr, Command, Stdio};

use nix::fcntl::{fcntl, FcntlArg, OFlag};
use tracing::debug;

/// Shell used to interpret fixture command lines.
pub const SHELL: &str = "sh";

/// Read end of a detached server's stderr.
///
/// Dropping this closes the pipe.
#[derive(Debug)]
pub struct StartupDiagnostics {
    stderr: ChildStderr,
}

impl StartupDiagnostics {
    /// Reads every diagnostic line that is available right now.
    ///
    /// The pipe is switched to non-blocking mode first, so a server that keeps
    /// stderr open without writing to it does not stall the caller. Returns an
    /// empty vector when nothing has been written. A trailing line without a
    /// newline is still returned.
    pub fn drain_available(mut self) -> io::Result<Vec<String>> {
        set_nonblocking(&self.stderr)?;

        let mut collected = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            match self.stderr.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => collected.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(String::from_utf8_lossy(&collected)
            .lines()
            .map(str::to_owned)
            .collect())
    }
}

fn set_nonblocking(stderr: &ChildStderr) -> io::Result<()> {
    let fd = stderr.as_raw_fd();
    let flags = OFlag::from_bits_truncate(fcntl(fd, FcntlArg::F_GETFL)?);
    fcntl(fd, FcntlArg::F_SETFL(flags | OFlag::O_NONBLOCK))?;
    Ok(())
}

/// Runs `command_line` in the background via `sh -c` and returns its stderr.
///
/// `command_line` must not already end with `&`; it is appended here. The
/// short-lived shell is reaped before returning, so no zombie is left behind.
pub fn spawn_detached(command_line: &str) -> io::Result<StartupDiagnostics> {
    let backgrounded = format!("{} &", command_line);
    debug!("Spawning detached: {} -c {:?}", SHELL, backgrounded);

    let mut shell = Command::new(SHELL)
        .arg("-c")
        .arg(&backgrounded)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()?;

    let stderr = shell
        .stderr
        .take()
        .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "stderr was not captured"))?;

    let status = shell.wait()?;
    debug!("Launcher shell exited with {}", status);

    Ok(StartupDiagnostics { stderr })
}

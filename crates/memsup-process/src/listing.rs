//! Process discovery by command name.

use memsup_common::{ProcessError, ProcessResult};
use std::process::{Command, Stdio};
use tracing::debug;

/// Listing program.
pub const PS: &str = "ps";

/// Lists running processes whose command name is `command_name`.
///
/// Runs `ps -o pid,command -C <command_name>` and returns its output lines,
/// header included. `ps` exits non-zero when nothing matches; that is an
/// empty listing, not a failure. It only counts as a failure when `ps`
/// cannot be run or reports an error on stderr.
pub fn list_processes(command_name: &str) -> ProcessResult<Vec<String>> {
    let rendered = format!("{} -o pid,command -C {}", PS, command_name);
    debug!("Listing processes: {}", rendered);

    let output = Command::new(PS)
        .args(["-o", "pid,command", "-C", command_name])
        .stdin(Stdio::null())
        .output()
        .map_err(|e| ProcessError::list_failed(&rendered, e.to_string()))?;

    let stderr = String::from_utf8_lossy(&output.stderr);
    if !output.status.success() && !stderr.trim().is_empty() {
        return Err(ProcessError::list_failed(&rendered, stderr.trim()));
    }

    Ok(String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_owned)
        .collect())
}

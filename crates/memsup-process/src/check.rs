//! Process existence checking.

use memsup_common::{Pid, ProcessError, ProcessResult};

/// Check if a process with the given PID exists.
///
/// Uses `kill(pid, 0)`, which sends no signal but checks if the process
/// exists. A zombie still counts as existing until it is reaped.
///
/// # Returns
///
/// * `Ok(true)` - Process exists
/// * `Ok(false)` - Process does not exist
/// * `Err(_)` - The probe itself failed
pub fn process_exists(pid: Pid) -> ProcessResult<bool> {
    use nix::sys::signal::kill;

    let raw = i32::try_from(pid.as_raw())
        .map_err(|_| ProcessError::probe_failed(pid.as_raw(), "pid out of range"))?;

    match kill(nix::unistd::Pid::from_raw(raw), None) {
        Ok(_) => Ok(true),
        Err(nix::errno::Errno::ESRCH) => Ok(false),
        // Exists, owned by someone else
        Err(nix::errno::Errno::EPERM) => Ok(true),
        Err(e) => Err(ProcessError::probe_failed(pid.as_raw(), e.to_string())),
    }
}

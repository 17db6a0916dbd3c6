//! Process termination primitives.

use memsup_common::{Pid, ProcessError, ProcessResult};
use nix::sys::signal::{kill, Signal};

/// Force kill a process with `SIGKILL`.
///
/// Equivalent to `kill -9 <pid>`. Signalling a process that already exited
/// fails with `ESRCH`, surfaced as [`ProcessError::SignalFailed`]. Pid 0 is
/// refused without sending anything.
pub fn force_kill(pid: Pid) -> ProcessResult<()> {
    if pid.as_raw() == 0 {
        return Err(ProcessError::signal_failed(0, "pid 0 names the caller's process group"));
    }
    let raw = i32::try_from(pid.as_raw())
        .map_err(|_| ProcessError::signal_failed(pid.as_raw(), "pid out of range"))?;

    kill(nix::unistd::Pid::from_raw(raw), Signal::SIGKILL)
        .map_err(|e| ProcessError::signal_failed(pid.as_raw(), e.to_string()))
}

//! Core domain types used throughout memsup.

use std::fmt;
use std::str::FromStr;

/// Operating-system process identifier of a running server instance.
///
/// # Example
/// ```
/// use memsup_common::Pid;
///
/// let pid: Pid = " 1234 ".parse().unwrap();
/// assert_eq!(pid.as_raw(), 1234);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pid(u32);

impl Pid {
    /// Creates a Pid from a raw process id.
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw process id.
    pub fn as_raw(&self) -> u32 {
        self.0
    }
}

impl From<u32> for Pid {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl FromStr for Pid {
    type Err = std::num::ParseIntError;

    /// Parses a pid, ignoring surrounding whitespace as found in `ps` columns.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u32>().map(Self)
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

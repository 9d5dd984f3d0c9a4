//! Error type shared by the lifecycle and streaming operations.

use core::fmt;

/// Failure of a ring operation.
///
/// Only [`Error::WouldBlock`] is transient; everything else is a
/// configuration or lifecycle error that retrying will not fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// No hardware transfer channel was free at `begin`.
    NoChannel,
    /// `begin` was called on a ring that is already running.
    AlreadyStarted,
    /// The ring has been torn down and cannot be restarted.
    Stopped,
    /// A stream operation was issued before `begin`.
    NotRunning,
    /// `write` on an input ring, or `read` on an output ring.
    WrongDirection,
    /// The operation would have to wait for the hardware (non-blocking mode).
    WouldBlock,
}

impl Error {
    /// `true` if the caller may simply retry later.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::WouldBlock)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Error::NoChannel => "no hardware transfer channel available",
            Error::AlreadyStarted => "ring already started",
            Error::Stopped => "ring has been stopped",
            Error::NotRunning => "ring not started",
            Error::WrongDirection => "operation does not match ring direction",
            Error::WouldBlock => "operation would block",
        };
        f.write_str(msg)
    }
}

//! Radio link capability.
//!
//! The orchestrator drives the network through this trait and never talks
//! to a vendor radio stack directly. The ESP-IDF implementation lives in
//! [`esp`] (feature `esp32`); host tests substitute a scripted mock.

#[cfg(feature = "esp32")]
mod esp;

#[cfg(feature = "esp32")]
pub use esp::EspRadioLink;

use std::fmt;
use std::time::Duration;

/// Snapshot of the link as reported by the radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LinkStatus {
    /// Associated with an access point and holding an address.
    pub joined: bool,
    /// Received signal strength, when available.
    pub signal_dbm: Option<i32>,
}

/// Errors from a join attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinError {
    /// Association or DHCP failed within the timeout. Recoverable; the
    /// reconnection policy decides what happens next.
    Failed(String),
    /// The radio itself misbehaved (driver or hardware). Escalates to the
    /// error state; requires external intervention or reset.
    Fault(String),
}

impl fmt::Display for JoinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(reason) => write!(f, "join failed: {}", reason),
            Self::Fault(reason) => write!(f, "radio fault: {}", reason),
        }
    }
}

impl std::error::Error for JoinError {}

/// Minimal operations the orchestrator needs from a radio.
///
/// [`join`] is the only call allowed to block, and only up to `timeout`.
/// Everything else is an immediate status inspection or mutation.
///
/// [`join`]: RadioLink::join
pub trait RadioLink {
    /// Attempt to join `ssid`, blocking up to `timeout`.
    ///
    /// An empty `password` means an open network.
    fn join(&mut self, ssid: &str, password: &str, timeout: Duration) -> Result<(), JoinError>;

    /// Current link state. Non-blocking.
    fn link_status(&mut self) -> LinkStatus;

    /// Leave the current network. Non-blocking best effort.
    fn leave(&mut self);
}

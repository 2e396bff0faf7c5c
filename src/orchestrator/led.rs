//! Status LED patterns.
//!
//! Pure data: the state machine never touches a pin. The firmware reads
//! the pattern for the current status and drives the LED itself.

use super::ConnectionStatus;
use std::time::Duration;

/// What the status LED should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedPattern {
    Off,
    Solid,
    /// Toggle at the given interval.
    Blink(Duration),
}

/// LED pattern for a connection status.
pub fn pattern_for(status: ConnectionStatus) -> LedPattern {
    match status {
        ConnectionStatus::Connected => LedPattern::Solid,
        ConnectionStatus::Connecting => LedPattern::Blink(Duration::from_millis(200)),
        ConnectionStatus::ConfigMode => LedPattern::Blink(Duration::from_millis(100)),
        ConnectionStatus::Error => LedPattern::Blink(Duration::from_millis(1000)),
        ConnectionStatus::Disconnected => LedPattern::Off,
    }
}

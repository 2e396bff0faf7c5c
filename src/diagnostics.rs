//! Diagnostic snapshot of the agent.
//!
//! Informational only; the rendered dump carries no programmatic
//! contract. Produced by
//! [`ConnectionOrchestrator::diagnostics`](crate::orchestrator::ConnectionOrchestrator::diagnostics).

use crate::orchestrator::ConnectionStatus;
use std::fmt;
use std::time::Duration;

/// Point-in-time view of connection state, uptime, memory, and storage
/// health.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    pub status: ConnectionStatus,
    pub config_mode: bool,
    pub uptime: Duration,
    pub free_heap: usize,
    pub reconnect_attempts: u8,
    pub has_credentials: bool,
    pub storage_valid: bool,
    pub storage_checksum: u32,
    pub storage_used: usize,
    pub storage_total: usize,
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== WiFi Manager Diagnostics ===")?;
        writeln!(f, "Status: {}", self.status)?;
        writeln!(f, "Config Mode: {}", if self.config_mode { "Yes" } else { "No" })?;
        writeln!(f, "Uptime: {} s", self.uptime.as_secs())?;
        writeln!(f, "Free Heap: {} bytes", self.free_heap)?;
        writeln!(f, "Reconnect Attempts: {}", self.reconnect_attempts)?;
        writeln!(
            f,
            "WiFi: {}",
            if self.has_credentials {
                "Configured"
            } else {
                "Not configured"
            }
        )?;
        writeln!(
            f,
            "Storage: {} ({}/{} bytes, checksum 0x{:08x})",
            if self.storage_valid { "Valid" } else { "CORRUPTED" },
            self.storage_used,
            self.storage_total,
            self.storage_checksum,
        )?;
        write!(f, "================================")
    }
}

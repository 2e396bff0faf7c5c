//! Device identity and reconnection policy settings.

use super::CredentialError;

/// Maximum hostname length (the storage field holds 32 bytes, NUL-padded).
pub const MAX_HOSTNAME_LEN: usize = 31;

/// Per-device settings persisted alongside the WiFi credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    /// mDNS/DHCP hostname (1-31 chars).
    pub hostname: String,
    /// Reconnect automatically after the link drops.
    pub auto_reconnect: bool,
    /// Consecutive failed attempts before falling back to the setup portal.
    pub max_reconnect_attempts: u8,
    /// Per-attempt join timeout in seconds.
    pub connect_timeout: u16,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            hostname: "pico2w".to_string(),
            auto_reconnect: true,
            max_reconnect_attempts: 3,
            connect_timeout: 30,
        }
    }
}

impl DeviceConfig {
    /// Validate the hostname against length limits.
    pub fn validate(&self) -> Result<(), CredentialError> {
        validate_hostname(&self.hostname)
    }
}

/// Validate a hostname: non-empty, at most [`MAX_HOSTNAME_LEN`] bytes.
pub fn validate_hostname(hostname: &str) -> Result<(), CredentialError> {
    if hostname.is_empty() {
        return Err(CredentialError::HostnameEmpty);
    }
    if hostname.len() > MAX_HOSTNAME_LEN {
        return Err(CredentialError::HostnameTooLong {
            len: hostname.len(),
            max: MAX_HOSTNAME_LEN,
        });
    }
    Ok(())
}

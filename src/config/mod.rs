//! Configuration types for the provisioning agent.
//!
//! This module contains platform-independent configuration data that can be
//! validated and tested on the host machine.
//!
//! # Components
//!
//! - [`wifi`] - WiFi credentials and SSID/password validation
//! - [`network`] - Static IP override configuration
//! - [`device`] - Device identity and reconnection policy settings

mod device;
mod network;
mod wifi;

pub use device::{validate_hostname, DeviceConfig, MAX_HOSTNAME_LEN};
pub use network::NetworkConfig;
pub use wifi::{validate_ssid, WifiCredentials, MAX_PASSWORD_LEN, MAX_SSID_LEN};

use std::fmt;

/// Errors raised when a credential or config field fails validation.
///
/// Validation happens at the API boundary; invalid values are never
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// SSID is empty.
    SsidEmpty,
    /// SSID exceeds the maximum length.
    SsidTooLong { len: usize, max: usize },
    /// SSID contains bytes outside printable ASCII.
    SsidNotPrintable,
    /// Password exceeds the maximum length.
    PasswordTooLong { len: usize, max: usize },
    /// Hostname is empty.
    HostnameEmpty,
    /// Hostname exceeds the maximum length.
    HostnameTooLong { len: usize, max: usize },
}

impl fmt::Display for CredentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SsidEmpty => write!(f, "SSID cannot be empty"),
            Self::SsidTooLong { len, max } => {
                write!(f, "SSID too long: {} bytes (max {})", len, max)
            }
            Self::SsidNotPrintable => write!(f, "SSID contains non-printable characters"),
            Self::PasswordTooLong { len, max } => {
                write!(f, "password too long: {} bytes (max {})", len, max)
            }
            Self::HostnameEmpty => write!(f, "hostname cannot be empty"),
            Self::HostnameTooLong { len, max } => {
                write!(f, "hostname too long: {} chars (max {})", len, max)
            }
        }
    }
}

impl std::error::Error for CredentialError {}

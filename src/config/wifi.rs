//! WiFi credential storage type and validation.
//!
//! # Example
//!
//! ```
//! use pico_wifi_manager::config::WifiCredentials;
//!
//! let creds = WifiCredentials::new("MyNetwork", "MyPassword").unwrap();
//! assert!(creds.valid);
//! assert!(creds.validate().is_ok());
//! ```

use super::CredentialError;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Maximum SSID length per IEEE 802.11.
pub const MAX_SSID_LEN: usize = 32;

/// Maximum password length for WPA2.
pub const MAX_PASSWORD_LEN: usize = 64;

/// Credentials for joining an access point.
///
/// `valid == false` means "no credentials configured": the ssid/password
/// content is meaningless and must never be used to attempt a connection.
///
/// The password is zeroed on drop and redacted from `Debug` output.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct WifiCredentials {
    /// Network SSID (1-32 printable ASCII bytes when `valid`).
    pub ssid: String,
    /// Network password (0-64 bytes; empty for open networks).
    pub password: String,
    /// Whether these credentials are configured and usable.
    pub valid: bool,
}

impl WifiCredentials {
    /// Create validated credentials with `valid` set.
    pub fn new(
        ssid: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, CredentialError> {
        let creds = Self {
            ssid: ssid.into(),
            password: password.into(),
            valid: true,
        };
        creds.validate()?;
        Ok(creds)
    }

    /// Create credentials for an open network (no password).
    pub fn open(ssid: impl Into<String>) -> Result<Self, CredentialError> {
        Self::new(ssid, String::new())
    }

    /// Validate ssid and password against length and charset limits.
    ///
    /// Unconfigured credentials (`valid == false`) always pass; their
    /// content is never used.
    pub fn validate(&self) -> Result<(), CredentialError> {
        if !self.valid {
            return Ok(());
        }

        validate_ssid(&self.ssid)?;

        if self.password.len() > MAX_PASSWORD_LEN {
            return Err(CredentialError::PasswordTooLong {
                len: self.password.len(),
                max: MAX_PASSWORD_LEN,
            });
        }

        Ok(())
    }

    /// Check if this is an open network (no password).
    pub fn is_open(&self) -> bool {
        self.password.is_empty()
    }

    /// Wipe the credentials and mark them unconfigured.
    pub fn clear(&mut self) {
        self.ssid.zeroize();
        self.password.zeroize();
        self.valid = false;
    }
}

impl Default for WifiCredentials {
    fn default() -> Self {
        Self {
            ssid: String::new(),
            password: String::new(),
            valid: false,
        }
    }
}

impl fmt::Debug for WifiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WifiCredentials")
            .field("ssid", &self.ssid)
            .field("password", &if self.password.is_empty() {
                "[empty]"
            } else {
                "[set]"
            })
            .field("valid", &self.valid)
            .finish()
    }
}

/// Validate an SSID: non-empty, at most [`MAX_SSID_LEN`] bytes, printable
/// ASCII only.
pub fn validate_ssid(ssid: &str) -> Result<(), CredentialError> {
    if ssid.is_empty() {
        return Err(CredentialError::SsidEmpty);
    }
    if ssid.len() > MAX_SSID_LEN {
        return Err(CredentialError::SsidTooLong {
            len: ssid.len(),
            max: MAX_SSID_LEN,
        });
    }
    if !ssid.bytes().all(|b| (0x20..=0x7e).contains(&b)) {
        return Err(CredentialError::SsidNotPrintable);
    }
    Ok(())
}

//! Typed credential and configuration vault.
//!
//! Thin façade over [`IntegrityStore`] exposing per-substructure accessors.
//! The vault is the single writer of the persisted record; every mutation
//! validates its input, then rewrites the whole record. There is no
//! partial-field persistence.

use super::backend::{StorageBackend, StorageError};
use super::store::IntegrityStore;
use crate::config::{
    validate_ssid, CredentialError, DeviceConfig, NetworkConfig, WifiCredentials,
    MAX_PASSWORD_LEN,
};
use crate::storage::StorageRecord;
use log::{info, warn};
use std::fmt;

/// Errors from vault operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VaultError {
    /// The persistence layer failed.
    Storage(StorageError),
    /// The submitted value failed validation; nothing was persisted.
    Invalid(CredentialError),
}

impl fmt::Display for VaultError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage(e) => write!(f, "storage error: {}", e),
            Self::Invalid(e) => write!(f, "invalid value: {}", e),
        }
    }
}

impl std::error::Error for VaultError {}

impl From<StorageError> for VaultError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<CredentialError> for VaultError {
    fn from(e: CredentialError) -> Self {
        Self::Invalid(e)
    }
}

/// Typed accessors over the persisted configuration record.
pub struct CredentialVault<B> {
    store: IntegrityStore<B>,
}

impl<B: StorageBackend> CredentialVault<B> {
    /// Create a vault over `backend`. Call [`open`] before use.
    ///
    /// [`open`]: CredentialVault::open
    pub fn new(backend: B) -> Self {
        Self {
            store: IntegrityStore::new(backend),
        }
    }

    /// Open the underlying store, recovering from corruption if needed.
    pub fn open(&mut self) -> Result<(), StorageError> {
        self.store.open()
    }

    /// Whether the store opened successfully. All mutating calls are
    /// rejected until it has.
    pub fn is_opened(&self) -> bool {
        self.store.is_opened()
    }

    /// Validate and persist WiFi credentials.
    ///
    /// The ssid must be 1-32 printable ASCII bytes. The password is
    /// silently truncated at 64 bytes; an empty password means an open
    /// network.
    pub fn save_wifi_credentials(&mut self, ssid: &str, password: &str) -> Result<(), VaultError> {
        validate_ssid(ssid)?;

        let password = truncate_password(password);
        let mut record = self.store.record().clone();
        record.wifi = WifiCredentials {
            ssid: ssid.to_string(),
            password: password.to_string(),
            valid: true,
        };
        self.store.write(record)?;
        info!("WiFi credentials saved for ssid {}", ssid);
        Ok(())
    }

    /// Stored credentials, if any are configured.
    pub fn load_wifi_credentials(&self) -> Option<WifiCredentials> {
        if !self.store.is_opened() {
            return None;
        }
        let wifi = &self.store.record().wifi;
        wifi.valid.then(|| wifi.clone())
    }

    /// Whether usable credentials are stored.
    pub fn has_wifi_credentials(&self) -> bool {
        self.store.is_opened() && self.store.record().wifi.valid
    }

    /// Wipe stored credentials.
    pub fn clear_wifi_credentials(&mut self) -> Result<(), StorageError> {
        let mut record = self.store.record().clone();
        record.wifi.clear();
        self.store.write(record)?;
        warn!("WiFi credentials cleared");
        Ok(())
    }

    /// Persist the static-IP override configuration.
    pub fn save_network_config(&mut self, config: NetworkConfig) -> Result<(), StorageError> {
        let mut record = self.store.record().clone();
        record.network = config;
        self.store.write(record)
    }

    /// Current network configuration. `None` only before open.
    pub fn load_network_config(&self) -> Option<NetworkConfig> {
        self.store.is_opened().then(|| self.store.record().network)
    }

    /// Reset the network configuration to DHCP defaults.
    pub fn clear_network_config(&mut self) -> Result<(), StorageError> {
        self.save_network_config(NetworkConfig::default())
    }

    /// Validate and persist device settings.
    pub fn save_device_config(&mut self, config: DeviceConfig) -> Result<(), VaultError> {
        config.validate()?;
        let mut record = self.store.record().clone();
        record.device = config;
        self.store.write(record)?;
        Ok(())
    }

    /// Current device settings. `None` only before open.
    pub fn load_device_config(&self) -> Option<DeviceConfig> {
        self.store
            .is_opened()
            .then(|| self.store.record().device.clone())
    }

    /// Reset device settings to defaults.
    pub fn clear_device_config(&mut self) -> Result<(), StorageError> {
        let mut record = self.store.record().clone();
        record.device = DeviceConfig::default();
        self.store.write(record)
    }

    /// Persist every substructure in one record write.
    pub fn save_all(
        &mut self,
        wifi: WifiCredentials,
        network: NetworkConfig,
        device: DeviceConfig,
    ) -> Result<(), VaultError> {
        wifi.validate()?;
        device.validate()?;
        self.store.write(StorageRecord {
            wifi,
            network,
            device,
        })?;
        Ok(())
    }

    /// The whole current record. `None` only before open.
    pub fn load_all(&self) -> Option<StorageRecord> {
        self.store.is_opened().then(|| self.store.record().clone())
    }

    /// Factory reset: defaults everywhere, persisted.
    pub fn clear_all(&mut self) -> Result<(), StorageError> {
        self.store.format()
    }

    /// Re-validate the persisted bytes (diagnostic).
    pub fn integrity_check(&mut self) -> bool {
        self.store.integrity_check()
    }

    /// Rewrite the persisted image from the validated copy if it no longer
    /// validates. Returns true if a repair happened.
    pub fn repair_if_needed(&mut self) -> Result<bool, StorageError> {
        self.store.repair_if_needed()
    }

    /// Checksum of the most recently persisted image.
    pub fn checksum(&self) -> u32 {
        self.store.checksum()
    }

    /// Bytes one record occupies.
    pub fn used_space(&self) -> usize {
        self.store.used_space()
    }

    /// Capacity of the backing region.
    pub fn total_space(&self) -> usize {
        self.store.total_space()
    }
}

/// Truncate a password at [`MAX_PASSWORD_LEN`] bytes, backing up to a
/// character boundary so the result stays valid UTF-8.
fn truncate_password(password: &str) -> &str {
    if password.len() <= MAX_PASSWORD_LEN {
        return password;
    }
    let mut end = MAX_PASSWORD_LEN;
    while !password.is_char_boundary(end) {
        end -= 1;
    }
    &password[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::backend::MemoryBackend;

    fn opened_vault() -> CredentialVault<MemoryBackend> {
        let mut vault = CredentialVault::new(MemoryBackend::new(512));
        vault.open().unwrap();
        vault
    }

    #[test]
    fn test_save_load_credentials() {
        let mut vault = opened_vault();
        assert!(!vault.has_wifi_credentials());

        vault
            .save_wifi_credentials("HomeNetwork", "secret-pass")
            .unwrap();
        assert!(vault.has_wifi_credentials());

        let creds = vault.load_wifi_credentials().unwrap();
        assert_eq!(creds.ssid, "HomeNetwork");
        assert_eq!(creds.password, "secret-pass");
        assert!(creds.valid);
    }

    #[test]
    fn test_empty_ssid_rejected_and_previous_kept() {
        let mut vault = opened_vault();
        vault
            .save_wifi_credentials("HomeNetwork", "secret-pass")
            .unwrap();

        let result = vault.save_wifi_credentials("", "x");
        assert_eq!(
            result,
            Err(VaultError::Invalid(CredentialError::SsidEmpty))
        );

        // Previously stored credentials are untouched
        let creds = vault.load_wifi_credentials().unwrap();
        assert_eq!(creds.ssid, "HomeNetwork");
        assert_eq!(creds.password, "secret-pass");
    }

    #[test]
    fn test_oversized_ssid_rejected() {
        let mut vault = opened_vault();
        let result = vault.save_wifi_credentials(&"s".repeat(33), "pass");
        assert!(matches!(
            result,
            Err(VaultError::Invalid(CredentialError::SsidTooLong { .. }))
        ));
        assert!(!vault.has_wifi_credentials());
    }

    #[test]
    fn test_password_truncated_at_64_bytes() {
        let mut vault = opened_vault();
        vault
            .save_wifi_credentials("HomeNetwork", &"p".repeat(80))
            .unwrap();
        let creds = vault.load_wifi_credentials().unwrap();
        assert_eq!(creds.password.len(), 64);
    }

    #[test]
    fn test_password_truncation_respects_char_boundary() {
        // 63 ASCII bytes followed by a 2-byte character straddling the cut
        let password = format!("{}é-tail", "p".repeat(63));
        let mut vault = opened_vault();
        vault
            .save_wifi_credentials("HomeNetwork", &password)
            .unwrap();
        let creds = vault.load_wifi_credentials().unwrap();
        assert_eq!(creds.password, "p".repeat(63));
    }

    #[test]
    fn test_clear_credentials() {
        let mut vault = opened_vault();
        vault
            .save_wifi_credentials("HomeNetwork", "secret-pass")
            .unwrap();
        vault.clear_wifi_credentials().unwrap();
        assert!(!vault.has_wifi_credentials());
        assert_eq!(vault.load_wifi_credentials(), None);
    }

    #[test]
    fn test_mutations_before_open_fail() {
        let mut vault = CredentialVault::new(MemoryBackend::new(512));
        assert_eq!(
            vault.save_wifi_credentials("HomeNetwork", "x"),
            Err(VaultError::Storage(StorageError::NotOpened))
        );
        assert_eq!(
            vault.clear_wifi_credentials(),
            Err(StorageError::NotOpened)
        );
        assert_eq!(vault.clear_all(), Err(StorageError::NotOpened));
        assert_eq!(vault.load_wifi_credentials(), None);
        assert_eq!(vault.load_network_config(), None);
        assert_eq!(vault.load_device_config(), None);
    }

    #[test]
    fn test_network_config_roundtrip() {
        let mut vault = opened_vault();
        let config = NetworkConfig {
            use_static_ip: true,
            static_ip: 0x0a00_0002,
            gateway: 0x0a00_0001,
            subnet: 0xffff_ff00,
            primary_dns: 0x0101_0101,
            secondary_dns: 0,
        };
        vault.save_network_config(config).unwrap();
        assert_eq!(vault.load_network_config(), Some(config));

        vault.clear_network_config().unwrap();
        assert_eq!(vault.load_network_config(), Some(NetworkConfig::default()));
    }

    #[test]
    fn test_device_config_roundtrip() {
        let mut vault = opened_vault();
        let config = DeviceConfig {
            hostname: "garage-sensor".to_string(),
            auto_reconnect: false,
            max_reconnect_attempts: 7,
            connect_timeout: 45,
        };
        vault.save_device_config(config.clone()).unwrap();
        assert_eq!(vault.load_device_config(), Some(config));
    }

    #[test]
    fn test_invalid_hostname_rejected() {
        let mut vault = opened_vault();
        let config = DeviceConfig {
            hostname: String::new(),
            ..Default::default()
        };
        assert!(matches!(
            vault.save_device_config(config),
            Err(VaultError::Invalid(CredentialError::HostnameEmpty))
        ));
    }

    #[test]
    fn test_save_all_load_all() {
        let mut vault = opened_vault();
        let wifi = WifiCredentials::new("HomeNetwork", "secret-pass").unwrap();
        let network = NetworkConfig::default();
        let device = DeviceConfig {
            hostname: "unit7".to_string(),
            ..Default::default()
        };
        vault
            .save_all(wifi.clone(), network, device.clone())
            .unwrap();

        let record = vault.load_all().unwrap();
        assert_eq!(record.wifi, wifi);
        assert_eq!(record.device, device);
    }

    #[test]
    fn test_clear_all_resets_everything() {
        let mut vault = opened_vault();
        vault
            .save_wifi_credentials("HomeNetwork", "secret-pass")
            .unwrap();
        vault
            .save_device_config(DeviceConfig {
                hostname: "unit7".to_string(),
                ..Default::default()
            })
            .unwrap();

        vault.clear_all().unwrap();
        assert!(!vault.has_wifi_credentials());
        assert_eq!(vault.load_device_config(), Some(DeviceConfig::default()));
        assert!(vault.integrity_check());
    }
}

//! Fixed-layout storage record with integrity checking.
//!
//! The persisted record is a fixed 227-byte layout:
//!
//! ```text
//! [magic:4][version:1][checksum:4]
//! [ssid:32][password:64][wifi_valid:1]
//! [use_static_ip:1][static_ip:4][gateway:4][subnet:4][dns1:4][dns2:4]
//! [hostname:32][auto_reconnect:1][max_attempts:1][connect_timeout:2]
//! [reserved:64]
//! ```
//!
//! Integers are little-endian; strings are NUL-padded. Any reader of the
//! raw bytes must replicate this exact field ordering and sizes to remain
//! compatible across firmware updates.
//!
//! The checksum is CRC32 (reflected polynomial `0xEDB88320`) computed over
//! every byte of the record except the checksum field itself.

use crate::config::{DeviceConfig, NetworkConfig, WifiCredentials, MAX_SSID_LEN};

/// Magic number identifying a provisioning record ("PICE").
pub const STORAGE_MAGIC: u32 = 0x5049_4345;

/// Record layout version.
pub const STORAGE_VERSION: u8 = 1;

/// Total serialized record size in bytes.
pub const RECORD_LEN: usize = 227;

const OFF_MAGIC: usize = 0;
const OFF_VERSION: usize = 4;
const OFF_CHECKSUM: usize = 5;
const OFF_SSID: usize = 9;
const OFF_PASSWORD: usize = 41;
const OFF_WIFI_VALID: usize = 105;
const OFF_USE_STATIC_IP: usize = 106;
const OFF_STATIC_IP: usize = 107;
const OFF_GATEWAY: usize = 111;
const OFF_SUBNET: usize = 115;
const OFF_PRIMARY_DNS: usize = 119;
const OFF_SECONDARY_DNS: usize = 123;
const OFF_HOSTNAME: usize = 127;
const OFF_AUTO_RECONNECT: usize = 159;
const OFF_MAX_ATTEMPTS: usize = 160;
const OFF_CONNECT_TIMEOUT: usize = 161;
const OFF_RESERVED: usize = 163;

const SSID_FIELD_LEN: usize = 32;
const PASSWORD_FIELD_LEN: usize = 64;
const HOSTNAME_FIELD_LEN: usize = 32;

const CRC32_POLYNOMIAL: u32 = 0xEDB8_8320;

/// The full configuration record persisted as one unit.
///
/// Magic, version, and checksum are layout artifacts; they are produced
/// during [`StorageRecord::encode`] and checked by [`validate_bytes`], not
/// carried in memory.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StorageRecord {
    /// WiFi credentials sub-structure.
    pub wifi: WifiCredentials,
    /// Static IP override sub-structure.
    pub network: NetworkConfig,
    /// Device settings sub-structure.
    pub device: DeviceConfig,
}

impl StorageRecord {
    /// Serialize to the fixed byte layout with a freshly computed checksum.
    ///
    /// Over-long string content is truncated at the field boundary; callers
    /// validate before storing, so truncation only applies to content that
    /// was never accepted through the API.
    pub fn encode(&self) -> [u8; RECORD_LEN] {
        let mut buf = [0u8; RECORD_LEN];

        buf[OFF_MAGIC..OFF_MAGIC + 4].copy_from_slice(&STORAGE_MAGIC.to_le_bytes());
        buf[OFF_VERSION] = STORAGE_VERSION;
        // Checksum bytes stay zero until the end

        put_str(&mut buf[OFF_SSID..OFF_SSID + SSID_FIELD_LEN], &self.wifi.ssid);
        put_str(
            &mut buf[OFF_PASSWORD..OFF_PASSWORD + PASSWORD_FIELD_LEN],
            &self.wifi.password,
        );
        buf[OFF_WIFI_VALID] = u8::from(self.wifi.valid);

        buf[OFF_USE_STATIC_IP] = u8::from(self.network.use_static_ip);
        buf[OFF_STATIC_IP..OFF_STATIC_IP + 4].copy_from_slice(&self.network.static_ip.to_le_bytes());
        buf[OFF_GATEWAY..OFF_GATEWAY + 4].copy_from_slice(&self.network.gateway.to_le_bytes());
        buf[OFF_SUBNET..OFF_SUBNET + 4].copy_from_slice(&self.network.subnet.to_le_bytes());
        buf[OFF_PRIMARY_DNS..OFF_PRIMARY_DNS + 4]
            .copy_from_slice(&self.network.primary_dns.to_le_bytes());
        buf[OFF_SECONDARY_DNS..OFF_SECONDARY_DNS + 4]
            .copy_from_slice(&self.network.secondary_dns.to_le_bytes());

        put_str(
            &mut buf[OFF_HOSTNAME..OFF_HOSTNAME + HOSTNAME_FIELD_LEN],
            &self.device.hostname,
        );
        buf[OFF_AUTO_RECONNECT] = u8::from(self.device.auto_reconnect);
        buf[OFF_MAX_ATTEMPTS] = self.device.max_reconnect_attempts;
        buf[OFF_CONNECT_TIMEOUT..OFF_CONNECT_TIMEOUT + 2]
            .copy_from_slice(&self.device.connect_timeout.to_le_bytes());

        let checksum = checksum_of(&buf);
        buf[OFF_CHECKSUM..OFF_CHECKSUM + 4].copy_from_slice(&checksum.to_le_bytes());
        buf
    }

    /// Deserialize from the fixed byte layout.
    ///
    /// This is a raw field extraction; callers must run [`validate_bytes`]
    /// first. Content of an invalid record is never exposed.
    pub fn decode(buf: &[u8; RECORD_LEN]) -> Self {
        Self {
            wifi: WifiCredentials {
                ssid: get_str(&buf[OFF_SSID..OFF_SSID + SSID_FIELD_LEN]),
                password: get_str(&buf[OFF_PASSWORD..OFF_PASSWORD + PASSWORD_FIELD_LEN]),
                valid: buf[OFF_WIFI_VALID] != 0,
            },
            network: NetworkConfig {
                use_static_ip: buf[OFF_USE_STATIC_IP] != 0,
                static_ip: get_u32(buf, OFF_STATIC_IP),
                gateway: get_u32(buf, OFF_GATEWAY),
                subnet: get_u32(buf, OFF_SUBNET),
                primary_dns: get_u32(buf, OFF_PRIMARY_DNS),
                secondary_dns: get_u32(buf, OFF_SECONDARY_DNS),
            },
            device: DeviceConfig {
                hostname: get_str(&buf[OFF_HOSTNAME..OFF_HOSTNAME + HOSTNAME_FIELD_LEN]),
                auto_reconnect: buf[OFF_AUTO_RECONNECT] != 0,
                max_reconnect_attempts: buf[OFF_MAX_ATTEMPTS],
                connect_timeout: u16::from_le_bytes([
                    buf[OFF_CONNECT_TIMEOUT],
                    buf[OFF_CONNECT_TIMEOUT + 1],
                ]),
            },
        }
    }
}

/// Pure validation of a raw record image.
///
/// A record is valid iff the magic and version match, the stored checksum
/// matches a recomputation over the rest of the bytes, and - when the wifi
/// sub-structure is marked valid - the ssid passes length and charset
/// checks.
pub fn validate_bytes(buf: &[u8]) -> bool {
    let buf: &[u8; RECORD_LEN] = match buf.try_into() {
        Ok(buf) => buf,
        Err(_) => return false,
    };

    if get_u32(buf, OFF_MAGIC) != STORAGE_MAGIC {
        return false;
    }
    if buf[OFF_VERSION] != STORAGE_VERSION {
        return false;
    }
    if get_u32(buf, OFF_CHECKSUM) != checksum_of(buf) {
        return false;
    }

    if buf[OFF_WIFI_VALID] != 0 {
        let ssid = &buf[OFF_SSID..OFF_SSID + SSID_FIELD_LEN];
        let len = ssid.iter().position(|&b| b == 0).unwrap_or(MAX_SSID_LEN);
        if len == 0 {
            return false;
        }
        if !ssid[..len].iter().all(|&b| (0x20..=0x7e).contains(&b)) {
            return false;
        }
    }

    true
}

/// Compute the record checksum: CRC32 over all bytes except the checksum
/// field itself.
pub fn checksum_of(buf: &[u8; RECORD_LEN]) -> u32 {
    let crc = crc32_update(0xFFFF_FFFF, &buf[..OFF_CHECKSUM]);
    let crc = crc32_update(crc, &buf[OFF_CHECKSUM + 4..]);
    !crc
}

/// Stored checksum field of a raw record image.
pub fn stored_checksum(buf: &[u8; RECORD_LEN]) -> u32 {
    get_u32(buf, OFF_CHECKSUM)
}

fn crc32_update(mut crc: u32, bytes: &[u8]) -> u32 {
    for &byte in bytes {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            let mask = (crc & 1).wrapping_neg();
            crc = (crc >> 1) ^ (CRC32_POLYNOMIAL & mask);
        }
    }
    crc
}

fn put_str(field: &mut [u8], value: &str) {
    let bytes = value.as_bytes();
    let len = bytes.len().min(field.len());
    field[..len].copy_from_slice(&bytes[..len]);
}

fn get_str(field: &[u8]) -> String {
    let len = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..len]).into_owned()
}

fn get_u32(buf: &[u8; RECORD_LEN], offset: usize) -> u32 {
    u32::from_le_bytes([buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]])
}

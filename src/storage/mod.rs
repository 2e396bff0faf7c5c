//! Integrity-checked configuration persistence.
//!
//! # Components
//!
//! - record byte layout: fixed-size record with magic, version, and a
//!   CRC32 checksum ([`StorageRecord`], [`validate_bytes`])
//! - [`IntegrityStore`] - validated load/store with default-initialization
//!   on corruption
//! - [`CredentialVault`] - typed accessors used by the rest of the agent
//! - [`StorageBackend`] - capability trait hiding the physical medium;
//!   [`MemoryBackend`] on the host, [`NvsBackend`] on the device (`esp32`)
//!
//! Corrupted or partially-written records are never exposed: the store
//! replaces them with defaults on open, so a flash failure can degrade the
//! device to "unconfigured" but never brick it.

mod backend;
#[cfg(feature = "esp32")]
mod nvs;
mod record;
mod store;
mod vault;

pub use backend::{MemoryBackend, StorageBackend, StorageError};
#[cfg(feature = "esp32")]
pub use nvs::NvsBackend;
pub use record::{
    checksum_of, validate_bytes, StorageRecord, RECORD_LEN, STORAGE_MAGIC, STORAGE_VERSION,
};
pub use store::IntegrityStore;
pub use vault::{CredentialVault, VaultError};

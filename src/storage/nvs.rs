//! NVS-backed storage for the configuration record.
//!
//! Persists the record as one raw blob in ESP32 Non-Volatile Storage.
//! Writes are verified by reading the blob back, which catches flash
//! write failures that do not return an error code.

use super::backend::{StorageBackend, StorageError};
use esp_idf_svc::nvs::{EspNvs, EspNvsPartition, NvsDefault};
use log::{error, warn};

/// NVS namespace for the provisioning agent.
const NVS_NAMESPACE: &str = "wifi_mgr";

/// NVS key holding the serialized record.
const NVS_KEY: &str = "config_record";

/// [`StorageBackend`] persisting to the default NVS partition.
pub struct NvsBackend {
    nvs: EspNvs<NvsDefault>,
    capacity: usize,
}

impl NvsBackend {
    /// Take the default NVS partition and open the agent namespace.
    ///
    /// `capacity` declares how many bytes the agent may use; NVS itself
    /// imposes a per-blob limit well above one record.
    pub fn new(capacity: usize) -> Result<Self, StorageError> {
        let partition = EspNvsPartition::<NvsDefault>::take().map_err(|e| {
            error!("Failed to take NVS partition: {:?}", e);
            StorageError::Unavailable("NVS partition unavailable")
        })?;
        let nvs = EspNvs::new(partition, NVS_NAMESPACE, true).map_err(|e| {
            error!("Failed to open NVS namespace: {:?}", e);
            StorageError::Unavailable("NVS namespace unavailable")
        })?;
        Ok(Self { nvs, capacity })
    }
}

impl StorageBackend for NvsBackend {
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, StorageError> {
        match self.nvs.get_raw(NVS_KEY, buf) {
            Ok(Some(bytes)) => Ok(bytes.len()),
            // Fresh device: nothing stored yet
            Ok(None) => Ok(0),
            Err(e) => {
                error!("NVS read failed: {:?}", e);
                Err(StorageError::Unavailable("NVS read failed"))
            }
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<(), StorageError> {
        self.nvs.set_raw(NVS_KEY, data).map_err(|e| {
            error!("NVS write failed: {:?}", e);
            StorageError::Unavailable("NVS write failed")
        })?;

        // Read back and verify to catch silent flash write failures
        let mut verify = vec![0u8; data.len() + 1];
        let read_back = self
            .nvs
            .get_raw(NVS_KEY, &mut verify)
            .map_err(|e| {
                error!("NVS read-back failed: {:?}", e);
                StorageError::Unavailable("NVS read-back failed")
            })?
            .ok_or_else(|| {
                warn!("Record missing after write, possible flash failure");
                StorageError::Unavailable("record missing after write")
            })?;

        if read_back != data {
            warn!("Record mismatch after write, possible flash failure");
            return Err(StorageError::Unavailable("record mismatch after write"));
        }
        Ok(())
    }
}

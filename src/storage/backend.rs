//! Storage backend capability trait.
//!
//! The integrity layer is written against this trait so the core can be
//! exercised on the host with an in-memory backend while the device build
//! persists to NVS. How bytes physically reach flash is the backend's
//! problem; the record layout and validation above it never change.

use std::fmt;

/// Errors surfaced by the persistence layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The backing medium cannot be read or written. Fatal to boot.
    Unavailable(&'static str),
    /// The backing region is smaller than one record.
    CapacityTooSmall { capacity: usize, needed: usize },
    /// A mutating call was made before the store was opened.
    NotOpened,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(msg) => write!(f, "storage unavailable: {}", msg),
            Self::CapacityTooSmall { capacity, needed } => {
                write!(
                    f,
                    "storage too small: {} bytes (need {})",
                    capacity, needed
                )
            }
            Self::NotOpened => write!(f, "storage not opened"),
        }
    }
}

impl std::error::Error for StorageError {}

/// A byte range the configuration record is persisted into.
///
/// Reads and writes always address the start of the region; the record is
/// rewritten whole, never patched in place.
pub trait StorageBackend {
    /// Total bytes available in the backing region.
    fn capacity(&self) -> usize;

    /// Read up to `buf.len()` bytes from the start of the region.
    ///
    /// Returns the number of bytes actually read (less than `buf.len()` on
    /// a fresh, never-written medium).
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Durably persist `data` at the start of the region, fully
    /// superseding previous content.
    fn write(&mut self, data: &[u8]) -> Result<(), StorageError>;
}

/// In-memory backend for host builds and tests.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    data: Vec<u8>,
    capacity: usize,
    #[cfg(test)]
    pub fail_reads: bool,
    #[cfg(test)]
    pub fail_writes: bool,
}

impl MemoryBackend {
    /// Create an empty backend with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            data: Vec::new(),
            capacity,
            #[cfg(test)]
            fail_reads: false,
            #[cfg(test)]
            fail_writes: false,
        }
    }

    /// Raw access to the stored bytes, for corruption injection in tests.
    #[cfg(test)]
    pub fn data_mut(&mut self) -> &mut Vec<u8> {
        &mut self.data
    }
}

impl StorageBackend for MemoryBackend {
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, StorageError> {
        #[cfg(test)]
        if self.fail_reads {
            return Err(StorageError::Unavailable("injected read failure"));
        }
        let n = buf.len().min(self.data.len());
        buf[..n].copy_from_slice(&self.data[..n]);
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), StorageError> {
        #[cfg(test)]
        if self.fail_writes {
            return Err(StorageError::Unavailable("injected write failure"));
        }
        if data.len() > self.capacity {
            return Err(StorageError::Unavailable("write exceeds capacity"));
        }
        self.data = data.to_vec();
        Ok(())
    }
}

//! System control capability.
//!
//! Restart and memory introspection differ per platform; the core sees
//! only this trait. The device build uses the ESP-IDF implementation, host
//! builds and tests use stand-ins.

/// Platform operations the orchestrator needs outside the radio.
pub trait SystemControl {
    /// Reboot the device. May not return on real hardware.
    fn restart(&mut self);

    /// Free heap estimate in bytes, for diagnostics only.
    fn free_heap(&self) -> usize;
}

/// ESP-IDF implementation of [`SystemControl`].
#[cfg(feature = "esp32")]
#[derive(Debug, Default)]
pub struct EspSystem;

#[cfg(feature = "esp32")]
impl SystemControl for EspSystem {
    fn restart(&mut self) {
        log::warn!("Restarting device");
        unsafe { esp_idf_sys::esp_restart() };
    }

    fn free_heap(&self) -> usize {
        unsafe { esp_idf_sys::esp_get_free_heap_size() as usize }
    }
}

//! WiFi provisioning agent firmware binary.

#[cfg(feature = "esp32")]
fn main() {
    use log::{error, info, warn};
    use pico_wifi_manager::orchestrator::{ConnectionOrchestrator, ManagerConfig};
    use pico_wifi_manager::portal::SetupPortal;
    use pico_wifi_manager::radio::EspRadioLink;
    use pico_wifi_manager::storage::{CredentialVault, NvsBackend};
    use pico_wifi_manager::system::EspSystem;
    use std::time::{Duration, Instant};

    // Link ESP-IDF patches (must be first!)
    esp_idf_sys::link_patches();

    // Initialize ESP-IDF logger for log crate integration
    esp_idf_svc::log::EspLogger::initialize_default();

    info!("=== WiFi provisioning agent starting ===");

    // Placeholder portal: the captive-portal UI layer (AP mode, DNS,
    // HTTP form) plugs in here and feeds submissions back through
    // handle_portal_command.
    struct LoggingPortal {
        active: bool,
    }

    impl SetupPortal for LoggingPortal {
        fn activate(&mut self, ap_ssid: &str, _ap_password: &str) -> bool {
            warn!("Setup portal requested: AP '{}' (UI layer not wired)", ap_ssid);
            self.active = true;
            true
        }

        fn deactivate(&mut self) {
            self.active = false;
        }

        fn is_active(&self) -> bool {
            self.active
        }
    }

    let peripherals = match esp_idf_hal::peripherals::Peripherals::take() {
        Ok(p) => p,
        Err(e) => {
            error!("Failed to take peripherals: {:?}", e);
            return;
        }
    };
    let sysloop = match esp_idf_svc::eventloop::EspSystemEventLoop::take() {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to take system event loop: {:?}", e);
            return;
        }
    };

    let backend = match NvsBackend::new(512) {
        Ok(b) => b,
        Err(e) => {
            error!("Storage unavailable: {}", e);
            return;
        }
    };
    let mut vault = CredentialVault::new(backend);
    if let Err(e) = vault.open() {
        error!("Storage unavailable: {}", e);
        return;
    }

    // Static IP settings take effect at radio construction, so a change
    // saved through the portal applies on the next boot.
    let network = vault.load_network_config().unwrap_or_default();
    let radio = match EspRadioLink::new(peripherals.modem, sysloop, &network) {
        Ok(r) => r,
        Err(e) => {
            error!("Radio init failed: {}", e);
            return;
        }
    };

    let mut agent = ConnectionOrchestrator::new(
        ManagerConfig::default(),
        vault,
        radio,
        LoggingPortal { active: false },
        EspSystem,
    );

    match agent.auto_connect(Instant::now()) {
        Ok(true) => info!("Connected"),
        Ok(false) => info!("Waiting for configuration"),
        Err(e) => {
            error!("Storage unavailable: {}", e);
            return;
        }
    }

    info!("Entering control loop");
    loop {
        agent.poll(Instant::now());
        std::thread::sleep(Duration::from_millis(100));
    }
}

#[cfg(not(feature = "esp32"))]
fn main() {
    println!("This binary requires the 'esp32' feature.");
    println!("Use 'cargo run --bin host-agent' for a simulated run,");
    println!("or 'cargo test' for host testing.");
}

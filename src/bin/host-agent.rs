//! Host-based simulated provisioning agent.
//!
//! Runs the full connection lifecycle on the host machine with a scripted
//! radio and portal: boot unconfigured, enter setup mode, receive
//! credentials, lose the link, reconnect. Useful for demos and for
//! eyeballing log output without hardware.
//!
//! # Usage
//!
//! ```bash
//! RUST_LOG=debug cargo run --bin host-agent
//! ```

use log::info;
use pico_wifi_manager::orchestrator::{ConnectionOrchestrator, ManagerConfig};
use pico_wifi_manager::portal::{PortalCommand, SetupPortal};
use pico_wifi_manager::radio::{JoinError, LinkStatus, RadioLink};
use pico_wifi_manager::storage::{CredentialVault, MemoryBackend};
use pico_wifi_manager::system::SystemControl;
use std::time::{Duration, Instant};

/// Radio that fails its first join attempt, then stays associated until
/// the script drops the link.
#[derive(Default)]
struct SimulatedRadio {
    joined: bool,
    attempts: u32,
}

impl RadioLink for SimulatedRadio {
    fn join(&mut self, ssid: &str, _password: &str, _timeout: Duration) -> Result<(), JoinError> {
        self.attempts += 1;
        if self.attempts == 1 {
            info!("[radio] '{}' not in range yet", ssid);
            self.joined = false;
            return Err(JoinError::Failed("association timeout".to_string()));
        }
        info!("[radio] associated with '{}'", ssid);
        self.joined = true;
        Ok(())
    }

    fn link_status(&mut self) -> LinkStatus {
        LinkStatus {
            joined: self.joined,
            signal_dbm: self.joined.then_some(-52),
        }
    }

    fn leave(&mut self) {
        self.joined = false;
    }
}

/// Portal that just logs; a real device serves an AP and a web form here.
#[derive(Default)]
struct SimulatedPortal {
    active: bool,
}

impl SetupPortal for SimulatedPortal {
    fn activate(&mut self, ap_ssid: &str, _ap_password: &str) -> bool {
        info!("[portal] serving setup AP '{}'", ap_ssid);
        self.active = true;
        true
    }

    fn deactivate(&mut self) {
        info!("[portal] stopped");
        self.active = false;
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

#[derive(Default)]
struct HostSystem;

impl SystemControl for HostSystem {
    fn restart(&mut self) {
        info!("[system] restart requested (ignored on host)");
    }

    fn free_heap(&self) -> usize {
        usize::MAX
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("=== Simulated provisioning agent ===");

    let mut vault = CredentialVault::new(MemoryBackend::new(512));
    if let Err(e) = vault.open() {
        eprintln!("storage unavailable: {}", e);
        std::process::exit(1);
    }

    let mut agent = ConnectionOrchestrator::new(
        ManagerConfig::default(),
        vault,
        SimulatedRadio::default(),
        SimulatedPortal::default(),
        HostSystem,
    );
    agent.set_event_sink(Box::new(|event: pico_wifi_manager::LifecycleEvent| {
        info!("[event] {:?}", event)
    }));

    // Fresh device: no credentials, so this lands in setup mode
    let t0 = Instant::now();
    if let Err(e) = agent.auto_connect(t0) {
        eprintln!("storage unavailable: {}", e);
        std::process::exit(1);
    }

    // A user submits credentials through the portal UI. The first join
    // fails, so the portal stays up for a retry.
    agent.handle_portal_command(
        PortalCommand::Connect {
            ssid: "HomeNetwork".to_string(),
            password: "correct horse".to_string(),
        },
        t0 + Duration::from_secs(30),
    );
    agent.handle_portal_command(
        PortalCommand::Connect {
            ssid: "HomeNetwork".to_string(),
            password: "correct horse".to_string(),
        },
        t0 + Duration::from_secs(60),
    );

    // Time passes, the link drops, and the reconnection policy brings it
    // back on the first spaced retry.
    agent.poll(t0 + Duration::from_secs(120));
    info!("--- simulating link loss ---");
    agent.disconnect();
    for secs in [130, 145, 160] {
        agent.poll(t0 + Duration::from_secs(secs));
    }

    println!("{}", agent.diagnostics(t0 + Duration::from_secs(180)));
}

//! Connection lifecycle orchestration.
//!
//! The state machine deciding which network mode the device is in:
//! joining a stored network, running, retrying after a drop, or serving
//! the setup portal. Driven by repeated non-blocking polls from one
//! control loop; timers are measured by elapsed wall-clock delta, so a
//! missed poll delays detection but never fires spuriously.
//!
//! # Components
//!
//! - [`ConnectionOrchestrator`] - the state machine itself
//! - [`button`] - reset button debounce and long-press detection
//! - [`events`] - lifecycle notifications via [`EventSink`]
//! - [`led`] - status-to-LED-pattern data table
//!
//! Whatever happens - corrupt storage, a dead network, too many failed
//! retries - the machine converges on a state where the device is
//! reachable: connected, or serving its own access point.

pub mod button;
pub mod events;
pub mod led;

pub use button::{ButtonAction, ResetButton, DEBOUNCE, LONG_PRESS};
pub use events::{EventSink, LifecycleEvent};
pub use led::{pattern_for, LedPattern};

use crate::diagnostics::Diagnostics;
use crate::portal::{PortalCommand, SetupPortal};
use crate::radio::{JoinError, RadioLink};
use crate::storage::{CredentialVault, StorageBackend, StorageError};
use crate::system::SystemControl;
use log::{error, info, warn};
use std::fmt;
use std::time::{Duration, Instant};

/// Minimum spacing between autonomous reconnection attempts.
pub const RECONNECT_INTERVAL: Duration = Duration::from_secs(10);

/// Externally visible connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
    ConfigMode,
    Error,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disconnected => "Disconnected",
            Self::Connecting => "Connecting",
            Self::Connected => "Connected",
            Self::ConfigMode => "Config Mode",
            Self::Error => "Error",
        };
        write!(f, "{}", s)
    }
}

/// Runtime settings for the orchestrator itself.
///
/// Persisted per-device settings (reconnect policy, join timeout) live in
/// [`DeviceConfig`](crate::config::DeviceConfig); this covers the setup AP
/// identity and the portal window.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// SSID the device advertises in setup mode.
    pub device_name: String,
    /// Password of the setup AP.
    pub ap_password: String,
    /// How long the portal may sit idle before its window is restarted.
    pub portal_timeout: Duration,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            device_name: "Pico2W".to_string(),
            ap_password: "picowifi123".to_string(),
            portal_timeout: Duration::from_secs(300),
        }
    }
}

/// The connection lifecycle state machine.
///
/// Owns the [`CredentialVault`] and the in-memory status and counters;
/// collaborators are reached only through their capability traits.
pub struct ConnectionOrchestrator<B, R, P, S> {
    config: ManagerConfig,
    vault: CredentialVault<B>,
    radio: R,
    portal: P,
    system: S,

    status: ConnectionStatus,
    config_mode: bool,
    reconnect_attempts: u8,
    last_reconnect_attempt: Option<Instant>,
    portal_deadline: Option<Instant>,
    button: ResetButton,
    started_at: Option<Instant>,
    sink: Option<Box<dyn EventSink>>,
}

impl<B, R, P, S> ConnectionOrchestrator<B, R, P, S>
where
    B: StorageBackend,
    R: RadioLink,
    P: SetupPortal,
    S: SystemControl,
{
    /// Create an orchestrator. Call [`begin`] (or [`auto_connect`], which
    /// implies it) before polling.
    ///
    /// [`begin`]: ConnectionOrchestrator::begin
    /// [`auto_connect`]: ConnectionOrchestrator::auto_connect
    pub fn new(config: ManagerConfig, vault: CredentialVault<B>, radio: R, portal: P, system: S) -> Self {
        Self {
            config,
            vault,
            radio,
            portal,
            system,
            status: ConnectionStatus::Disconnected,
            config_mode: false,
            reconnect_attempts: 0,
            last_reconnect_attempt: None,
            portal_deadline: None,
            button: ResetButton::new(),
            started_at: None,
            sink: None,
        }
    }

    /// Subscribe to lifecycle events.
    pub fn set_event_sink(&mut self, sink: Box<dyn EventSink>) {
        self.sink = Some(sink);
    }

    /// Open storage and start the uptime clock. Idempotent.
    ///
    /// Fails only if the backing medium is unavailable; a corrupted record
    /// is recovered inside the vault and never surfaces here.
    pub fn begin(&mut self, now: Instant) -> Result<(), StorageError> {
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
        if !self.vault.is_opened() {
            self.vault.open()?;
            info!("Connection orchestrator initialized");
        }
        Ok(())
    }

    /// Connect using stored credentials, or fall back to the setup portal.
    ///
    /// Returns `Ok(true)` when connected, `Ok(false)` when the device
    /// ended up in setup or error mode instead.
    pub fn auto_connect(&mut self, now: Instant) -> Result<bool, StorageError> {
        self.begin(now)?;
        match self.vault.load_wifi_credentials() {
            Some(creds) => {
                info!("Attempting auto-connect to: {}", creds.ssid);
                Ok(self.explicit_connect(&creds.ssid, &creds.password, now))
            }
            None => {
                info!("No saved credentials, starting config portal");
                self.start_config_portal(now);
                Ok(false)
            }
        }
    }

    /// Connect with explicit credentials (not persisted), falling back to
    /// the setup portal on failure.
    pub fn auto_connect_with(
        &mut self,
        ssid: &str,
        password: &str,
        now: Instant,
    ) -> Result<bool, StorageError> {
        self.begin(now)?;
        info!("Auto-connecting to: {}", ssid);
        Ok(self.explicit_connect(ssid, password, now))
    }

    /// Periodic tick: link-loss detection, portal window, reconnection.
    ///
    /// Non-blocking unless a reconnection attempt is due, in which case
    /// the join may block up to the configured timeout.
    pub fn poll(&mut self, now: Instant) {
        if self.started_at.is_none() {
            return;
        }

        if self.status == ConnectionStatus::Connected && !self.radio.link_status().joined {
            warn!("Link lost");
            self.set_status(ConnectionStatus::Disconnected);
            self.emit(LifecycleEvent::Disconnected);
            self.last_reconnect_attempt = None;
        }

        if self.config_mode {
            self.check_portal_timeout(now);
            return;
        }

        if self.status == ConnectionStatus::Disconnected {
            let device = self.vault.load_device_config().unwrap_or_default();
            if device.auto_reconnect {
                self.handle_reconnection(device.max_reconnect_attempts, now);
            }
        }
    }

    /// Feed the current reset-pin level. A recognized short press opens
    /// the portal; a long press factory resets.
    pub fn poll_button(&mut self, pressed: bool, now: Instant) {
        match self.button.poll(pressed, now) {
            Some(ButtonAction::FactoryReset) => {
                info!("Factory reset triggered by button");
                self.factory_reset();
            }
            Some(ButtonAction::TogglePortal) => {
                if !self.config_mode {
                    info!("Config portal requested by button");
                    self.start_config_portal(now);
                }
            }
            None => {}
        }
    }

    /// Handle an intent submitted through the portal UI.
    pub fn handle_portal_command(&mut self, command: PortalCommand, now: Instant) {
        match command {
            PortalCommand::Connect { ssid, password } => {
                if !self.config_mode {
                    warn!("Ignoring portal connect request outside config mode");
                    return;
                }
                info!("Portal connect request: {}", ssid);
                match self.connect_attempt(&ssid, &password) {
                    Ok(()) => {
                        if let Err(e) = self.vault.save_wifi_credentials(&ssid, &password) {
                            error!("Failed to persist credentials: {}", e);
                        }
                        self.stop_config_portal();
                    }
                    Err(JoinError::Failed(_)) => {
                        // Portal stays up so the user can retry; the idle
                        // window restarts since someone is interacting
                        self.set_status(ConnectionStatus::ConfigMode);
                        self.portal_deadline = Some(now + self.config.portal_timeout);
                    }
                    Err(JoinError::Fault(_)) => {}
                }
            }
            PortalCommand::Reset => {
                info!("Reset requested from portal");
                self.factory_reset();
            }
        }
    }

    /// Bring up the setup portal. True if it is serving afterwards.
    pub fn start_config_portal(&mut self, now: Instant) -> bool {
        if self.config_mode {
            return true;
        }
        info!("Starting config portal: {}", self.config.device_name);
        self.emit(LifecycleEvent::ConfigModeStarted);
        self.config_mode = true;
        self.set_status(ConnectionStatus::ConfigMode);

        if self
            .portal
            .activate(&self.config.device_name, &self.config.ap_password)
        {
            self.portal_deadline = Some(now + self.config.portal_timeout);
            true
        } else {
            error!("Failed to start config portal");
            self.config_mode = false;
            self.portal_deadline = None;
            self.set_status(ConnectionStatus::Error);
            false
        }
    }

    /// Tear the setup portal down. The caller decides the next status.
    pub fn stop_config_portal(&mut self) {
        if !self.config_mode {
            return;
        }
        info!("Stopping config portal");
        self.portal.deactivate();
        self.config_mode = false;
        self.portal_deadline = None;
        self.emit(LifecycleEvent::ConfigModeEnded);
    }

    /// Leave the current network without touching storage.
    ///
    /// With auto-reconnect enabled, subsequent polls will rejoin; disable
    /// it in [`DeviceConfig`](crate::config::DeviceConfig) to stay down.
    pub fn disconnect(&mut self) {
        info!("Disconnecting");
        self.radio.leave();
        self.set_status(ConnectionStatus::Disconnected);
        self.emit(LifecycleEvent::Disconnected);
    }

    /// Clear all persisted configuration and restart the device.
    pub fn factory_reset(&mut self) {
        warn!("Performing factory reset");
        self.stop_config_portal();
        self.radio.leave();
        if let Err(e) = self.vault.clear_all() {
            error!("Failed to clear storage: {}", e);
        }
        self.reconnect_attempts = 0;
        self.last_reconnect_attempt = None;
        self.set_status(ConnectionStatus::Disconnected);
        self.emit(LifecycleEvent::FactoryReset);
        self.system.restart();
    }

    /// Current status.
    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    /// Whether the setup portal is up.
    pub fn is_config_mode(&self) -> bool {
        self.config_mode
    }

    /// Whether the machine is in [`ConnectionStatus::Connected`] and the
    /// radio agrees.
    pub fn is_connected(&mut self) -> bool {
        self.status == ConnectionStatus::Connected && self.radio.link_status().joined
    }

    /// Consecutive failed reconnection attempts since the last success.
    pub fn reconnect_attempts(&self) -> u8 {
        self.reconnect_attempts
    }

    /// Time since [`begin`](ConnectionOrchestrator::begin).
    pub fn uptime(&self, now: Instant) -> Duration {
        self.started_at
            .map(|start| now.saturating_duration_since(start))
            .unwrap_or(Duration::ZERO)
    }

    /// LED pattern for the current status.
    pub fn led_pattern(&self) -> LedPattern {
        led::pattern_for(self.status)
    }

    /// Read access to the vault, for configuration surfaces.
    pub fn vault(&self) -> &CredentialVault<B> {
        &self.vault
    }

    /// Mutable access to the vault, for configuration surfaces.
    pub fn vault_mut(&mut self) -> &mut CredentialVault<B> {
        &mut self.vault
    }

    /// Snapshot of state, uptime, memory, and storage health.
    pub fn diagnostics(&mut self, now: Instant) -> Diagnostics {
        Diagnostics {
            status: self.status,
            config_mode: self.config_mode,
            uptime: self.uptime(now),
            free_heap: self.system.free_heap(),
            reconnect_attempts: self.reconnect_attempts,
            has_credentials: self.vault.has_wifi_credentials(),
            storage_valid: self.vault.integrity_check(),
            storage_checksum: self.vault.checksum(),
            storage_used: self.vault.used_space(),
            storage_total: self.vault.total_space(),
        }
    }

    fn explicit_connect(&mut self, ssid: &str, password: &str, now: Instant) -> bool {
        match self.connect_attempt(ssid, password) {
            Ok(()) => true,
            Err(JoinError::Failed(_)) => {
                info!("Auto-connect failed, starting config portal");
                self.start_config_portal(now);
                false
            }
            Err(JoinError::Fault(_)) => false,
        }
    }

    /// One join attempt. Leaves the status `Connecting` on a recoverable
    /// failure so the caller picks the landing state; a hard fault goes
    /// straight to `Error`.
    fn connect_attempt(&mut self, ssid: &str, password: &str) -> Result<(), JoinError> {
        info!("Connecting to: {}", ssid);
        self.set_status(ConnectionStatus::Connecting);

        let device = self.vault.load_device_config().unwrap_or_default();
        let timeout = Duration::from_secs(u64::from(device.connect_timeout));

        match self.radio.join(ssid, password, timeout) {
            Ok(()) => {
                self.reconnect_attempts = 0;
                self.last_reconnect_attempt = None;
                self.set_status(ConnectionStatus::Connected);
                self.emit(LifecycleEvent::Connected);
                Ok(())
            }
            Err(e @ JoinError::Failed(_)) => {
                warn!("Connection failed: {}", e);
                Err(e)
            }
            Err(e @ JoinError::Fault(_)) => {
                error!("Radio fault: {}", e);
                self.set_status(ConnectionStatus::Error);
                Err(e)
            }
        }
    }

    fn handle_reconnection(&mut self, max_attempts: u8, now: Instant) {
        if let Some(last) = self.last_reconnect_attempt {
            if now.saturating_duration_since(last) < RECONNECT_INTERVAL {
                return;
            }
        }

        if self.reconnect_attempts >= max_attempts {
            info!("Max reconnection attempts reached, starting config portal");
            self.start_config_portal(now);
            return;
        }

        info!(
            "Reconnection attempt {}/{}",
            self.reconnect_attempts + 1,
            max_attempts
        );
        self.last_reconnect_attempt = Some(now);
        self.reconnect_attempts += 1;

        if let Some(creds) = self.vault.load_wifi_credentials() {
            match self.connect_attempt(&creds.ssid, &creds.password) {
                Ok(()) => {}
                Err(JoinError::Failed(_)) => self.set_status(ConnectionStatus::Disconnected),
                Err(JoinError::Fault(_)) => {}
            }
        }
    }

    fn check_portal_timeout(&mut self, now: Instant) {
        let Some(deadline) = self.portal_deadline else {
            return;
        };
        if now < deadline {
            return;
        }
        warn!("Portal window elapsed with no submission, restarting portal");
        self.emit(LifecycleEvent::PortalTimeout);
        self.portal.deactivate();
        if self
            .portal
            .activate(&self.config.device_name, &self.config.ap_password)
        {
            self.portal_deadline = Some(now + self.config.portal_timeout);
        } else {
            error!("Failed to restart config portal");
            self.config_mode = false;
            self.portal_deadline = None;
            self.set_status(ConnectionStatus::Error);
        }
    }

    fn set_status(&mut self, status: ConnectionStatus) {
        if self.status != status {
            self.status = status;
            info!("Status changed to: {}", status);
            self.emit(LifecycleEvent::StatusChanged(status));
        }
    }

    fn emit(&mut self, event: LifecycleEvent) {
        if let Some(sink) = self.sink.as_mut() {
            sink.on_event(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBackend;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    #[derive(Default)]
    struct RadioState {
        join_results: VecDeque<Result<(), JoinError>>,
        join_calls: Vec<String>,
        joined: bool,
        leave_calls: u32,
    }

    #[derive(Clone, Default)]
    struct MockRadio(Rc<RefCell<RadioState>>);

    impl MockRadio {
        fn push_result(&self, result: Result<(), JoinError>) {
            self.0.borrow_mut().join_results.push_back(result);
        }

        fn push_failures(&self, count: usize) {
            for _ in 0..count {
                self.push_result(Err(JoinError::Failed("no ap".to_string())));
            }
        }

        fn join_count(&self) -> usize {
            self.0.borrow().join_calls.len()
        }

        fn drop_link(&self) {
            self.0.borrow_mut().joined = false;
        }
    }

    impl RadioLink for MockRadio {
        fn join(&mut self, ssid: &str, _password: &str, _timeout: Duration) -> Result<(), JoinError> {
            let mut state = self.0.borrow_mut();
            state.join_calls.push(ssid.to_string());
            let result = state
                .join_results
                .pop_front()
                .unwrap_or(Ok(()));
            state.joined = result.is_ok();
            result
        }

        fn link_status(&mut self) -> crate::radio::LinkStatus {
            crate::radio::LinkStatus {
                joined: self.0.borrow().joined,
                signal_dbm: None,
            }
        }

        fn leave(&mut self) {
            let mut state = self.0.borrow_mut();
            state.joined = false;
            state.leave_calls += 1;
        }
    }

    #[derive(Default)]
    struct PortalState {
        active: bool,
        activations: u32,
        deactivations: u32,
        fail_activate: bool,
    }

    #[derive(Clone, Default)]
    struct MockPortal(Rc<RefCell<PortalState>>);

    impl SetupPortal for MockPortal {
        fn activate(&mut self, _ap_ssid: &str, _ap_password: &str) -> bool {
            let mut state = self.0.borrow_mut();
            if state.fail_activate {
                return false;
            }
            state.active = true;
            state.activations += 1;
            true
        }

        fn deactivate(&mut self) {
            let mut state = self.0.borrow_mut();
            state.active = false;
            state.deactivations += 1;
        }

        fn is_active(&self) -> bool {
            self.0.borrow().active
        }
    }

    #[derive(Clone, Default)]
    struct MockSystem(Rc<RefCell<u32>>);

    impl MockSystem {
        fn restarts(&self) -> u32 {
            *self.0.borrow()
        }
    }

    impl SystemControl for MockSystem {
        fn restart(&mut self) {
            *self.0.borrow_mut() += 1;
        }

        fn free_heap(&self) -> usize {
            128 * 1024
        }
    }

    type TestOrchestrator = ConnectionOrchestrator<MemoryBackend, MockRadio, MockPortal, MockSystem>;

    struct Harness {
        orch: TestOrchestrator,
        radio: MockRadio,
        portal: MockPortal,
        system: MockSystem,
        events: Rc<RefCell<Vec<LifecycleEvent>>>,
        t0: Instant,
    }

    impl Harness {
        fn at(&self, secs: u64) -> Instant {
            self.t0 + Duration::from_secs(secs)
        }

        fn status_changes(&self) -> Vec<ConnectionStatus> {
            self.events
                .borrow()
                .iter()
                .filter_map(|e| match e {
                    LifecycleEvent::StatusChanged(s) => Some(*s),
                    _ => None,
                })
                .collect()
        }
    }

    fn harness(stored_creds: Option<(&str, &str)>) -> Harness {
        let mut vault = CredentialVault::new(MemoryBackend::new(512));
        vault.open().unwrap();
        if let Some((ssid, password)) = stored_creds {
            vault.save_wifi_credentials(ssid, password).unwrap();
        }

        let radio = MockRadio::default();
        let portal = MockPortal::default();
        let system = MockSystem::default();
        let mut orch = ConnectionOrchestrator::new(
            ManagerConfig::default(),
            vault,
            radio.clone(),
            portal.clone(),
            system.clone(),
        );

        let events = Rc::new(RefCell::new(Vec::new()));
        let events_writer = events.clone();
        orch.set_event_sink(Box::new(move |event: LifecycleEvent| {
            events_writer.borrow_mut().push(event)
        }));

        Harness {
            orch,
            radio,
            portal,
            system,
            events,
            t0: Instant::now(),
        }
    }

    #[test]
    fn test_fresh_device_goes_to_config_mode_without_join() {
        let mut h = harness(None);
        let connected = h.orch.auto_connect(h.t0).unwrap();

        assert!(!connected);
        assert_eq!(h.orch.status(), ConnectionStatus::ConfigMode);
        assert!(h.orch.is_config_mode());
        // No join was ever attempted
        assert_eq!(h.radio.join_count(), 0);
        assert!(h.portal.is_active());
        assert_eq!(h.status_changes(), vec![ConnectionStatus::ConfigMode]);
    }

    #[test]
    fn test_stored_credentials_connect_successfully() {
        let mut h = harness(Some(("HomeNetwork", "secret-pass")));
        let connected = h.orch.auto_connect(h.t0).unwrap();

        assert!(connected);
        assert_eq!(h.orch.status(), ConnectionStatus::Connected);
        assert!(h.orch.is_connected());
        assert_eq!(h.orch.reconnect_attempts(), 0);
        assert_eq!(h.radio.0.borrow().join_calls, vec!["HomeNetwork"]);
        assert_eq!(
            h.status_changes(),
            vec![ConnectionStatus::Connecting, ConnectionStatus::Connected]
        );
        assert!(h.events.borrow().contains(&LifecycleEvent::Connected));
    }

    #[test]
    fn test_explicit_auto_connect_failure_falls_back_to_portal() {
        let mut h = harness(Some(("HomeNetwork", "secret-pass")));
        h.radio.push_failures(1);

        let connected = h.orch.auto_connect(h.t0).unwrap();
        assert!(!connected);
        assert_eq!(h.orch.status(), ConnectionStatus::ConfigMode);
        assert!(h.portal.is_active());
    }

    #[test]
    fn test_reconnection_policy_gives_up_after_max_attempts() {
        let mut h = harness(Some(("HomeNetwork", "secret-pass")));
        h.orch.auto_connect(h.t0).unwrap();
        assert_eq!(h.orch.status(), ConnectionStatus::Connected);

        h.radio.push_failures(10);
        h.radio.drop_link();

        // Link loss detected, first retry fires on the same tick
        h.orch.poll(h.at(1));
        assert_eq!(h.orch.status(), ConnectionStatus::Disconnected);
        assert_eq!(h.orch.reconnect_attempts(), 1);

        // Too soon: spacing not yet elapsed
        h.orch.poll(h.at(5));
        assert_eq!(h.orch.reconnect_attempts(), 1);

        h.orch.poll(h.at(11));
        assert_eq!(h.orch.reconnect_attempts(), 2);
        h.orch.poll(h.at(21));
        assert_eq!(h.orch.reconnect_attempts(), 3);

        // Budget exhausted: portal, exactly once
        h.orch.poll(h.at(31));
        assert_eq!(h.orch.status(), ConnectionStatus::ConfigMode);
        let joins_so_far = h.radio.join_count();

        // No further autonomous retries while in config mode
        h.orch.poll(h.at(45));
        h.orch.poll(h.at(60));
        assert_eq!(h.radio.join_count(), joins_so_far);
        assert_eq!(h.portal.0.borrow().activations, 1);
    }

    #[test]
    fn test_successful_join_resets_reconnect_counter() {
        let mut h = harness(Some(("HomeNetwork", "secret-pass")));
        // First attempt fails, second succeeds
        h.radio.push_result(Err(JoinError::Failed("busy".to_string())));
        h.radio.push_result(Ok(()));

        h.orch.begin(h.t0).unwrap();
        h.orch.poll(h.at(0));
        assert_eq!(h.orch.reconnect_attempts(), 1);

        h.orch.poll(h.at(10));
        assert_eq!(h.orch.status(), ConnectionStatus::Connected);
        assert_eq!(h.orch.reconnect_attempts(), 0);

        // A later outage takes the full budget again before giving up
        h.radio.push_failures(10);
        h.radio.drop_link();
        h.orch.poll(h.at(20));
        h.orch.poll(h.at(30));
        h.orch.poll(h.at(40));
        assert_eq!(h.orch.reconnect_attempts(), 3);
        assert_eq!(h.orch.status(), ConnectionStatus::Disconnected);

        h.orch.poll(h.at(50));
        assert_eq!(h.orch.status(), ConnectionStatus::ConfigMode);
    }

    #[test]
    fn test_auto_reconnect_disabled_stays_down() {
        let mut h = harness(Some(("HomeNetwork", "secret-pass")));
        h.orch.auto_connect(h.t0).unwrap();

        let mut device = h.orch.vault().load_device_config().unwrap();
        device.auto_reconnect = false;
        h.orch.vault_mut().save_device_config(device).unwrap();

        h.radio.drop_link();
        let joins = h.radio.join_count();
        h.orch.poll(h.at(1));
        assert_eq!(h.orch.status(), ConnectionStatus::Disconnected);
        h.orch.poll(h.at(30));
        h.orch.poll(h.at(60));
        assert_eq!(h.radio.join_count(), joins);
    }

    #[test]
    fn test_long_press_factory_resets() {
        let mut h = harness(Some(("HomeNetwork", "secret-pass")));
        h.orch.auto_connect(h.t0).unwrap();
        assert!(h.orch.vault().has_wifi_credentials());

        h.orch.poll_button(true, h.t0);
        h.orch.poll_button(false, h.t0 + Duration::from_millis(3500));

        assert!(!h.orch.vault().has_wifi_credentials());
        assert_eq!(h.system.restarts(), 1);
        assert!(h.events.borrow().contains(&LifecycleEvent::FactoryReset));
        assert_eq!(h.radio.0.borrow().leave_calls, 1);
    }

    #[test]
    fn test_short_press_opens_portal_without_touching_storage() {
        let mut h = harness(Some(("HomeNetwork", "secret-pass")));
        h.orch.auto_connect(h.t0).unwrap();

        h.orch.poll_button(true, h.t0);
        h.orch.poll_button(false, h.t0 + Duration::from_millis(500));

        assert!(h.orch.is_config_mode());
        assert!(h.orch.vault().has_wifi_credentials());
        assert_eq!(h.system.restarts(), 0);

        // A second short press while active is ignored
        h.orch.poll_button(true, h.at(2));
        h.orch.poll_button(false, h.at(2) + Duration::from_millis(500));
        assert_eq!(h.portal.0.borrow().activations, 1);
    }

    #[test]
    fn test_portal_submission_persists_and_connects() {
        let mut h = harness(None);
        h.orch.auto_connect(h.t0).unwrap();
        assert!(h.orch.is_config_mode());

        h.orch.handle_portal_command(
            PortalCommand::Connect {
                ssid: "CoffeeShop".to_string(),
                password: "espresso1".to_string(),
            },
            h.at(5),
        );

        assert_eq!(h.orch.status(), ConnectionStatus::Connected);
        assert!(!h.orch.is_config_mode());
        assert!(!h.portal.is_active());
        let creds = h.orch.vault().load_wifi_credentials().unwrap();
        assert_eq!(creds.ssid, "CoffeeShop");
        assert!(h
            .events
            .borrow()
            .contains(&LifecycleEvent::ConfigModeEnded));
    }

    #[test]
    fn test_portal_submission_failure_keeps_portal_up() {
        let mut h = harness(None);
        h.orch.auto_connect(h.t0).unwrap();
        h.radio.push_failures(1);

        h.orch.handle_portal_command(
            PortalCommand::Connect {
                ssid: "CoffeeShop".to_string(),
                password: "wrong".to_string(),
            },
            h.at(5),
        );

        assert_eq!(h.orch.status(), ConnectionStatus::ConfigMode);
        assert!(h.orch.is_config_mode());
        assert!(h.portal.is_active());
        // Nothing was persisted
        assert!(!h.orch.vault().has_wifi_credentials());
    }

    #[test]
    fn test_portal_reset_command() {
        let mut h = harness(Some(("HomeNetwork", "secret-pass")));
        h.orch.auto_connect(h.t0).unwrap();
        h.orch.poll_button(true, h.at(1));
        h.orch.poll_button(false, h.at(1) + Duration::from_millis(500));
        assert!(h.orch.is_config_mode());

        h.orch.handle_portal_command(PortalCommand::Reset, h.at(2));
        assert!(!h.orch.vault().has_wifi_credentials());
        assert_eq!(h.system.restarts(), 1);
        assert!(!h.orch.is_config_mode());
    }

    #[test]
    fn test_portal_timeout_restarts_window() {
        let mut h = harness(None);
        h.orch.auto_connect(h.t0).unwrap();
        assert_eq!(h.portal.0.borrow().activations, 1);

        // Before the window elapses nothing happens
        h.orch.poll(h.at(299));
        assert_eq!(h.portal.0.borrow().activations, 1);

        h.orch.poll(h.at(301));
        assert!(h.events.borrow().contains(&LifecycleEvent::PortalTimeout));
        assert_eq!(h.portal.0.borrow().activations, 2);
        assert_eq!(h.orch.status(), ConnectionStatus::ConfigMode);
        assert!(h.portal.is_active());

        // The window restarted: next timeout is another full period away
        h.orch.poll(h.at(400));
        assert_eq!(h.portal.0.borrow().activations, 2);
        h.orch.poll(h.at(602));
        assert_eq!(h.portal.0.borrow().activations, 3);
    }

    #[test]
    fn test_hard_fault_parks_in_error_state() {
        let mut h = harness(Some(("HomeNetwork", "secret-pass")));
        h.radio.push_result(Err(JoinError::Fault("driver crashed".to_string())));

        let connected = h.orch.auto_connect(h.t0).unwrap();
        assert!(!connected);
        assert_eq!(h.orch.status(), ConnectionStatus::Error);
        assert!(!h.orch.is_config_mode());

        // No autonomous retries out of the error state
        let joins = h.radio.join_count();
        h.orch.poll(h.at(30));
        h.orch.poll(h.at(60));
        assert_eq!(h.radio.join_count(), joins);

        // Factory reset still recovers the device
        h.orch.factory_reset();
        assert_eq!(h.orch.status(), ConnectionStatus::Disconnected);
        assert_eq!(h.system.restarts(), 1);
    }

    #[test]
    fn test_no_duplicate_status_events_on_repeated_ticks() {
        let mut h = harness(Some(("HomeNetwork", "secret-pass")));
        h.orch.auto_connect(h.t0).unwrap();

        for s in 1..20 {
            h.orch.poll(h.at(s));
        }
        assert_eq!(
            h.status_changes(),
            vec![ConnectionStatus::Connecting, ConnectionStatus::Connected]
        );
    }

    #[test]
    fn test_poll_before_begin_is_inert() {
        let mut h = harness(Some(("HomeNetwork", "secret-pass")));
        h.orch.poll(h.t0);
        assert_eq!(h.radio.join_count(), 0);
        assert_eq!(h.orch.status(), ConnectionStatus::Disconnected);
    }

    #[test]
    fn test_portal_activation_failure_is_error() {
        let mut h = harness(None);
        h.portal.0.borrow_mut().fail_activate = true;
        let connected = h.orch.auto_connect(h.t0).unwrap();
        assert!(!connected);
        assert_eq!(h.orch.status(), ConnectionStatus::Error);
        assert!(!h.orch.is_config_mode());
    }

    #[test]
    fn test_disconnect_leaves_network() {
        let mut h = harness(Some(("HomeNetwork", "secret-pass")));
        h.orch.auto_connect(h.t0).unwrap();
        h.orch.disconnect();
        assert_eq!(h.orch.status(), ConnectionStatus::Disconnected);
        assert_eq!(h.radio.0.borrow().leave_calls, 1);
        assert!(h.events.borrow().contains(&LifecycleEvent::Disconnected));
    }

    #[test]
    fn test_diagnostics_snapshot() {
        let mut h = harness(Some(("HomeNetwork", "secret-pass")));
        h.orch.auto_connect(h.t0).unwrap();

        let diag = h.orch.diagnostics(h.at(90));
        assert_eq!(diag.status, ConnectionStatus::Connected);
        assert_eq!(diag.uptime, Duration::from_secs(90));
        assert!(diag.storage_valid);
        assert!(diag.has_credentials);
        assert!(diag.free_heap > 0);

        let dump = diag.to_string();
        assert!(dump.contains("Connected"));
        assert!(dump.contains("Uptime"));
    }

    #[test]
    fn test_uptime_before_begin_is_zero() {
        let h = harness(None);
        assert_eq!(h.orch.uptime(h.at(5)), Duration::ZERO);
    }
}

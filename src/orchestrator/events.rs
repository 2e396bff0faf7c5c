//! Lifecycle event notification.
//!
//! Consumers subscribe by installing an [`EventSink`]; the orchestrator
//! holds no UI closures. A status-changing transition produces exactly one
//! [`LifecycleEvent::StatusChanged`]; repeated polls in the same state
//! produce nothing.

use super::ConnectionStatus;

/// Externally visible lifecycle notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The connection status changed. Fired once per actual change.
    StatusChanged(ConnectionStatus),
    /// A join attempt completed successfully.
    Connected,
    /// The link was lost or deliberately dropped.
    Disconnected,
    /// The setup portal was activated.
    ConfigModeStarted,
    /// The setup portal was deactivated.
    ConfigModeEnded,
    /// The portal window elapsed with no submission; the portal was
    /// restarted and the device remains configurable.
    PortalTimeout,
    /// Storage was cleared and a device restart requested.
    FactoryReset,
}

/// Receiver for [`LifecycleEvent`]s.
pub trait EventSink {
    /// Called synchronously from the orchestrator's control loop; keep it
    /// short and non-blocking.
    fn on_event(&mut self, event: LifecycleEvent);
}

impl<F: FnMut(LifecycleEvent)> EventSink for F {
    fn on_event(&mut self, event: LifecycleEvent) {
        self(event)
    }
}

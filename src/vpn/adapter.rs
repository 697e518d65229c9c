//! Connection status tracking
//!
//! Bridges the tunnel engine's status stream to the coarse [`VpnStatus`],
//! keeps the derived connection metadata and feeds attached listeners.

use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::backend::EngineControl;
use super::common::{parse_ips_from_log_message, TunnelAddresses};
use super::status::{EngineLevel, VpnStatus};
use crate::interface::AddressLookup;

/// Default interval between connection info updates
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_millis(1000);
/// Default name of the tunnel interface
pub const DEFAULT_INTERFACE_NAME: &str = "tun0";

/// One status report from the tunnel engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineUpdate {
    pub level: EngineLevel,
    /// Free-text log line accompanying the report
    pub log_message: Option<String>,
    /// Localized error identifier, meaningful on failure
    pub localized_error: Option<String>,
}

impl EngineUpdate {
    pub fn new(level: EngineLevel) -> Self {
        Self {
            level,
            log_message: None,
            localized_error: None,
        }
    }

    pub fn with_log_message(mut self, message: impl Into<String>) -> Self {
        self.log_message = Some(message.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.localized_error = Some(error.into());
        self
    }
}

/// Statistics derived for the current connection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionMetadata {
    /// When the connection reached the connected state
    pub connected_at: Option<Instant>,
    pub bytes_in: Option<u64>,
    pub bytes_out: Option<u64>,
    pub addresses: TunnelAddresses,
    /// Localized error identifier of the last failure
    pub error: Option<String>,
}

impl ConnectionMetadata {
    /// Whole seconds since the connection was established
    pub fn elapsed_seconds(&self) -> Option<u64> {
        self.connected_at.map(|at| at.elapsed().as_secs())
    }
}

/// Receives connection info while attached to the adapter
#[cfg_attr(test, mockall::automock)]
pub trait ConnectionInfoListener: Send + Sync {
    /// Tunnel addresses became known
    fn metadata_available(&self, ipv4: Option<Ipv4Addr>, ipv6: Option<Ipv6Addr>);

    /// Periodic statistics update
    fn update_status(&self, seconds_elapsed: Option<u64>, bytes_in: Option<u64>, bytes_out: Option<u64>);
}

#[derive(Debug)]
struct AdapterState {
    level: EngineLevel,
    status: VpnStatus,
    metadata: ConnectionMetadata,
    /// Byte counter updates are applied only while set
    tracking_bytes: bool,
    listeners: usize,
    /// Bumped on every reset so late address lookups can be discarded
    generation: u64,
}

impl AdapterState {
    fn reset(&mut self) {
        self.metadata = ConnectionMetadata::default();
        self.tracking_bytes = false;
        self.generation = self.generation.wrapping_add(1);
    }
}

fn lock_state(state: &Mutex<AdapterState>) -> MutexGuard<'_, AdapterState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Tracks the tunnel engine's status and publishes changes
pub struct ConnectionStatusAdapter {
    state: Arc<Mutex<AdapterState>>,
    lookup: Arc<dyn AddressLookup>,
    engine: RwLock<Option<Arc<dyn EngineControl>>>,
    interface_name: String,
    update_interval: Duration,
    status_tx: broadcast::Sender<VpnStatus>,
}

impl ConnectionStatusAdapter {
    pub fn new(lookup: Arc<dyn AddressLookup>) -> Self {
        Self::with_settings(lookup, DEFAULT_INTERFACE_NAME, DEFAULT_UPDATE_INTERVAL)
    }

    pub fn with_settings(
        lookup: Arc<dyn AddressLookup>,
        interface_name: impl Into<String>,
        update_interval: Duration,
    ) -> Self {
        let (status_tx, _) = broadcast::channel(64);
        Self {
            state: Arc::new(Mutex::new(AdapterState {
                level: EngineLevel::NotConnected,
                status: VpnStatus::Disconnected,
                metadata: ConnectionMetadata::default(),
                tracking_bytes: false,
                listeners: 0,
                generation: 0,
            })),
            lookup,
            engine: RwLock::new(None),
            interface_name: interface_name.into(),
            update_interval,
            status_tx,
        }
    }

    /// Bind the engine control channel used by [`disconnect`](Self::disconnect)
    pub fn bind_engine(&self, engine: Arc<dyn EngineControl>) {
        *self.engine.write().unwrap_or_else(|p| p.into_inner()) = Some(engine);
    }

    pub fn unbind_engine(&self) {
        *self.engine.write().unwrap_or_else(|p| p.into_inner()) = None;
    }

    /// Subscribe to coarse status changes
    pub fn subscribe(&self) -> broadcast::Receiver<VpnStatus> {
        self.status_tx.subscribe()
    }

    pub fn status(&self) -> VpnStatus {
        lock_state(&self.state).status
    }

    /// Last raw level reported by the engine
    pub fn engine_level(&self) -> EngineLevel {
        lock_state(&self.state).level
    }

    pub fn metadata(&self) -> ConnectionMetadata {
        lock_state(&self.state).metadata.clone()
    }

    /// Error identifier captured on the last failure, if any
    pub fn error_string(&self) -> Option<String> {
        lock_state(&self.state).metadata.error.clone()
    }

    pub fn protocol_name(&self) -> &'static str {
        "OpenVPN"
    }

    pub fn interface_name(&self) -> &str {
        &self.interface_name
    }

    /// Handle a status report from the engine.
    ///
    /// Returns the coarse status after the update. Reports that do not change
    /// the coarse status have no effect and are not published.
    pub async fn update_state(&self, update: EngineUpdate) -> VpnStatus {
        let new_status = VpnStatus::from(update.level);

        let generation = {
            let mut state = lock_state(&self.state);
            state.level = update.level;
            if state.status == new_status {
                debug!("Engine level {} keeps status {}", update.level, new_status);
                return new_status;
            }
            info!("VPN status {} -> {} ({})", state.status, new_status, update.level);
            state.status = new_status;

            match new_status {
                VpnStatus::Connected => {
                    state.metadata.connected_at = Some(Instant::now());
                    state.tracking_bytes = true;
                }
                VpnStatus::Failed => {
                    state.metadata.error = update.localized_error.clone();
                }
                VpnStatus::Disconnected => state.reset(),
                VpnStatus::Connecting | VpnStatus::Paused => {}
            }
            state.generation
        };

        if new_status == VpnStatus::Connected {
            let addresses = self.resolve_addresses(update.log_message.as_deref()).await;
            let mut state = lock_state(&self.state);
            // A disconnect or newer report may have landed during the lookup
            if state.generation == generation && state.status == VpnStatus::Connected {
                state.metadata.addresses = addresses;
            } else {
                debug!("Discarding tunnel addresses resolved for a reset connection");
            }
        }

        // No receivers is fine
        let _ = self.status_tx.send(new_status);
        new_status
    }

    /// Cumulative byte counters from the engine
    pub fn update_byte_count(&self, bytes_in: u64, bytes_out: u64) {
        let mut state = lock_state(&self.state);
        if state.tracking_bytes {
            state.metadata.bytes_in = Some(bytes_in);
            state.metadata.bytes_out = Some(bytes_out);
        }
    }

    /// Ask the engine to stop the tunnel and clear local statistics.
    ///
    /// Engine failures are logged; the local reset happens regardless.
    pub async fn disconnect(&self) {
        let engine = self.engine.read().unwrap_or_else(|p| p.into_inner()).clone();
        match engine {
            Some(engine) => {
                if let Err(e) = engine.stop_vpn().await {
                    error!("Failed to stop VPN, connection might not be closed: {}", e);
                }
            }
            None => warn!("No VPN engine bound, resetting local state only"),
        }
        lock_state(&self.state).reset();
    }

    /// Attach a listener for connection info.
    ///
    /// Known tunnel addresses are delivered right away, then statistics every
    /// update interval until the returned subscription is detached.
    pub fn attach_connection_info_listener(
        &self,
        listener: Arc<dyn ConnectionInfoListener>,
    ) -> ConnectionInfoSubscription {
        let addresses = {
            let mut state = lock_state(&self.state);
            state.listeners += 1;
            if state.status == VpnStatus::Connected {
                state.tracking_bytes = true;
            }
            state.metadata.addresses
        };

        if !addresses.is_empty() {
            listener.metadata_available(addresses.ipv4, addresses.ipv6);
        }

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let handle = tokio::spawn(run_listener(
            self.state.clone(),
            listener,
            self.status_tx.subscribe(),
            cancel_rx,
            self.update_interval,
        ));

        ConnectionInfoSubscription {
            cancel_tx,
            handle: Some(handle),
            state: self.state.clone(),
            released: false,
        }
    }

    async fn resolve_addresses(&self, log_message: Option<&str>) -> TunnelAddresses {
        match self.lookup.addresses(&self.interface_name).await {
            Ok(list) => {
                let addresses = TunnelAddresses::from_interface_addresses(&list);
                if !addresses.is_empty() {
                    return addresses;
                }
            }
            Err(e) => warn!("Unable to inspect interface {}: {}", self.interface_name, e),
        }

        info!("No addresses from interface lookup, using log message instead");
        log_message
            .and_then(parse_ips_from_log_message)
            .unwrap_or_default()
    }
}

async fn run_listener(
    state: Arc<Mutex<AdapterState>>,
    listener: Arc<dyn ConnectionInfoListener>,
    mut status_rx: broadcast::Receiver<VpnStatus>,
    mut cancel_rx: watch::Receiver<bool>,
    update_interval: Duration,
) {
    let mut ticker = time::interval(update_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel_rx.changed() => break,
            status = status_rx.recv() => match status {
                Ok(VpnStatus::Connected) => {
                    let addresses = lock_state(&state).metadata.addresses;
                    if !addresses.is_empty() {
                        listener.metadata_available(addresses.ipv4, addresses.ipv6);
                    }
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!("Connection info listener skipped {} status updates", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = ticker.tick() => {
                let (elapsed, bytes_in, bytes_out) = {
                    let state = lock_state(&state);
                    let m = &state.metadata;
                    (m.elapsed_seconds(), m.bytes_in, m.bytes_out)
                };
                listener.update_status(elapsed, bytes_in, bytes_out);
            }
        }
    }

    debug!("Connection info listener stopped");
}

/// Handle to an attached connection info listener.
///
/// Dropping the handle stops updates; [`detach`](Self::detach) also waits
/// for the update task to finish.
pub struct ConnectionInfoSubscription {
    cancel_tx: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
    state: Arc<Mutex<AdapterState>>,
    released: bool,
}

impl ConnectionInfoSubscription {
    /// Stop updates. No listener callback runs after this returns.
    pub async fn detach(mut self) {
        self.release();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!("Connection info task ended abnormally: {}", e);
            }
        }
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        // Task may already be gone
        let _ = self.cancel_tx.send(true);

        let mut state = lock_state(&self.state);
        state.listeners = state.listeners.saturating_sub(1);
        if state.listeners == 0 {
            state.tracking_bytes = false;
        }
    }
}

impl Drop for ConnectionInfoSubscription {
    fn drop(&mut self) {
        self.release();
    }
}

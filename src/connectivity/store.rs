// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Per-domain connectivity state store.
//!
//! A store is the only writer of its domain's [`ConnectivityState`]. Every
//! mutating action goes through the store, at most one action is in flight at
//! a time, and subscribers are notified synchronously after each committed
//! change.

use parking_lot::{Mutex, ReentrantMutex};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tracing::{debug, info, warn};

use super::adapter::{ConnectedHandle, DiscoveryEvent, PermissionCheck, RadioAdapter};
use super::item::{BluetoothDevice, Domain, Item, WifiNetwork};
use super::subscribers::{Subscriber, SubscriberRegistry, Subscription};
use crate::error::{ConnectFailure, ConnectivityError, RadioError};
use crate::state::{Activity, ConnectivityState, Phase};

/// Store for the Bluetooth domain.
pub type BluetoothStore = ConnectivityStore<BluetoothDevice>;

/// Store for the WiFi domain.
pub type WifiStore = ConnectivityStore<WifiNetwork>;

/// Timing knobs for one store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RadioTimings {
    /// Scan duration used by callers that do not pass their own.
    pub scan_timeout: Duration,
    /// Upper bound for the platform connect call.
    pub connect_timeout: Duration,
    /// Delay between a successful connect call and verification.
    pub connect_settle: Duration,
    /// Delay between toggling the radio and reading its state back.
    pub toggle_settle: Duration,
}

impl Default for RadioTimings {
    fn default() -> Self {
        Self {
            scan_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(15),
            connect_settle: Duration::ZERO,
            toggle_settle: Duration::ZERO,
        }
    }
}

struct Inner<I> {
    state: ConnectivityState<I>,
    connection: Option<ConnectedHandle>,
    activity: Activity,
    /// Identifies the operation that owns `activity`.
    op_token: u64,
    /// Bumped whenever the radio goes off. Scan results and connections
    /// from operations started before the bump are dropped.
    power_generation: u64,
    /// Token of the scan operation still running, if any.
    scan_owner: Option<u64>,
    scan_cancel: Option<Arc<Notify>>,
}

impl<I: Item> Inner<I> {
    /// Apply radio-off to the state. Returns true if a scan was interrupted.
    fn power_off(&mut self) -> bool {
        self.state.enabled = false;
        self.state.items.clear();
        self.state.connected_item = None;
        self.connection = None;
        self.power_generation += 1;
        self.scan_owner = None;
        match self.scan_cancel.take() {
            Some(cancel) => {
                cancel.notify_one();
                true
            }
            None => false,
        }
    }
}

enum ScanEnd {
    Elapsed,
    Stopped,
    Exhausted,
    Failed(String),
}

/// Resets the activity when the owning operation finishes, unless another
/// operation (a preempting `disable`) has taken over in the meantime.
///
/// A `disable` that leaves the radio on hands the activity back to the scan
/// it preempted.
struct OperationGuard<'a, I: Item> {
    store: &'a ConnectivityStore<I>,
    token: u64,
    /// Power generation when the operation began.
    generation: u64,
}

impl<I: Item> Drop for OperationGuard<'_, I> {
    fn drop(&mut self) {
        let mut inner = self.store.inner.lock();
        if inner.scan_owner == Some(self.token) {
            inner.scan_owner = None;
        }
        if inner.op_token != self.token {
            return;
        }
        match inner.scan_owner {
            Some(scan) => {
                inner.activity = Activity::Scanning;
                inner.op_token = scan;
            }
            None => inner.activity = Activity::Idle,
        }
    }
}

/// Result of a successful [`ConnectivityStore::connect`].
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectOutcome<I> {
    /// The item now connected.
    pub item: I,
    /// Set when the previous connection could not be torn down first.
    pub previous_disconnect: Option<RadioError>,
}

/// State store for one connectivity domain.
pub struct ConnectivityStore<I: Item> {
    adapter: Arc<dyn RadioAdapter<I>>,
    permissions: Arc<dyn PermissionCheck>,
    timings: RadioTimings,
    inner: Mutex<Inner<I>>,
    /// Held from mutation through notification so snapshots reach
    /// subscribers in commit order. Reentrant for subscribers that act on
    /// the store from inside their callback.
    delivery: ReentrantMutex<()>,
    subscribers: SubscriberRegistry<ConnectivityState<I>>,
}

impl<I: Item> ConnectivityStore<I> {
    /// Create a store in the initial `{enabled: false, items: [], connectedItem: null}` state.
    pub fn new(
        adapter: Arc<dyn RadioAdapter<I>>,
        permissions: Arc<dyn PermissionCheck>,
        timings: RadioTimings,
    ) -> Arc<Self> {
        Arc::new(Self {
            adapter,
            permissions,
            timings,
            inner: Mutex::new(Inner {
                state: ConnectivityState::default(),
                connection: None,
                activity: Activity::Idle,
                op_token: 0,
                power_generation: 0,
                scan_owner: None,
                scan_cancel: None,
            }),
            delivery: ReentrantMutex::new(()),
            subscribers: SubscriberRegistry::new(),
        })
    }

    pub fn domain(&self) -> Domain {
        I::DOMAIN
    }

    pub fn timings(&self) -> &RadioTimings {
        &self.timings
    }

    /// Register a callback for every future committed change.
    ///
    /// The callback is not invoked with the current state; read
    /// [`get_state`](Self::get_state) if that is needed.
    pub fn subscribe(&self, callback: Subscriber<ConnectivityState<I>>) -> Subscription {
        self.subscribers.subscribe(callback)
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Copy of the current state.
    pub fn get_state(&self) -> ConnectivityState<I> {
        self.inner.lock().state.clone()
    }

    /// Operation currently in flight.
    pub fn activity(&self) -> Activity {
        self.inner.lock().activity
    }

    pub fn phase(&self) -> Phase {
        let inner = self.inner.lock();
        Phase::from_parts(
            inner.state.enabled,
            inner.state.connected_item.is_some(),
            inner.activity,
        )
    }

    /// Turn the radio on.
    pub async fn enable(&self) -> Result<bool, ConnectivityError> {
        let domain = I::DOMAIN;
        let _op = self.begin(Activity::Enabling)?;
        info!("Enabling {}...", domain);

        match self.adapter.set_enabled(true).await {
            Ok(()) => {}
            Err(RadioError::Unsupported) => {
                debug!("{} cannot be enabled from the app, checking current state", domain);
            }
            Err(RadioError::Failed(reason)) => {
                warn!("Enabling {} failed: {}", domain, reason);
                return Err(ConnectivityError::Unavailable { domain, reason });
            }
        }

        settle(self.timings.toggle_settle).await;

        let enabled = self
            .adapter
            .is_enabled()
            .await
            .map_err(|e| ConnectivityError::Unavailable {
                domain,
                reason: e.to_string(),
            })?;
        if !enabled {
            warn!("{} is still off", domain);
            return Err(ConnectivityError::Unavailable {
                domain,
                reason: "radio is still off".to_string(),
            });
        }

        self.commit(|inner| {
            if inner.state.enabled {
                return false;
            }
            inner.state.enabled = true;
            true
        });
        info!("{} enabled", domain);
        Ok(true)
    }

    /// Turn the radio off.
    ///
    /// An in-flight scan is aborted once the platform confirms the radio is
    /// off. If the radio stays on, the scan keeps running.
    pub async fn disable(&self) -> Result<bool, ConnectivityError> {
        let domain = I::DOMAIN;
        let _op = self.begin(Activity::Disabling)?;
        info!("Disabling {}...", domain);

        let manual = || ConnectivityError::ManualActionRequired {
            domain,
            action: format!("turn off {}", domain),
        };

        match self.adapter.set_enabled(false).await {
            Ok(()) => {}
            Err(RadioError::Unsupported) => {
                debug!("{} cannot be disabled from the app, checking current state", domain);
            }
            Err(RadioError::Failed(reason)) => {
                warn!("Disabling {} failed: {}", domain, reason);
                return Err(manual());
            }
        }

        settle(self.timings.toggle_settle).await;

        let still_on = self
            .adapter
            .is_enabled()
            .await
            .map_err(|source| ConnectivityError::Radio { domain, source })?;
        if still_on {
            return Err(manual());
        }

        let mut interrupted = false;
        self.commit(|inner| {
            let before = inner.state.clone();
            interrupted = inner.power_off();
            inner.state != before
        });
        if interrupted {
            self.adapter.stop_discovery();
        }
        info!("{} disabled", domain);
        Ok(true)
    }

    /// Discover items for `timeout`.
    ///
    /// Items are appended in first-seen order, unique by id, and subscribers
    /// are notified once per new item. Resolves with the accumulated list
    /// when the timeout elapses, the adapter ends discovery, or
    /// [`cancel_scan`](Self::cancel_scan) is called. A second scan while one
    /// is running is rejected with [`ConnectivityError::AlreadyScanning`].
    pub async fn scan(&self, timeout: Duration) -> Result<Vec<I>, ConnectivityError> {
        let domain = I::DOMAIN;
        if !self.inner.lock().state.enabled {
            return Err(ConnectivityError::Disabled { domain });
        }
        let op = self.begin(Activity::Scanning)?;

        if !self.permissions.check(domain).await {
            warn!("{} scan refused: permission not granted", domain);
            return Err(ConnectivityError::PermissionDenied { domain });
        }

        let cancel = Arc::new(Notify::new());
        let generation = op.generation;
        {
            let mut inner = self.inner.lock();
            if inner.power_generation != generation || !inner.state.enabled {
                return Err(ConnectivityError::ScanAborted { domain });
            }
            inner.scan_cancel = Some(cancel.clone());
        }

        self.commit(|inner| {
            if inner.state.items.is_empty() {
                return false;
            }
            inner.state.items.clear();
            true
        });

        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        if let Err(e) = self.adapter.start_discovery(event_tx) {
            self.release_scan(&cancel);
            return Err(ConnectivityError::Discovery {
                domain,
                reason: e.to_string(),
            });
        }
        info!("{} scan started ({:?})", domain, timeout);

        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        let end = loop {
            tokio::select! {
                _ = &mut deadline => break ScanEnd::Elapsed,
                _ = cancel.notified() => break ScanEnd::Stopped,
                event = event_rx.recv() => match event {
                    Some(DiscoveryEvent::Found(item)) => {
                        if !self.record_discovery(generation, item) {
                            break ScanEnd::Stopped;
                        }
                    }
                    Some(DiscoveryEvent::Failed(reason)) => break ScanEnd::Failed(reason),
                    None => break ScanEnd::Exhausted,
                },
            }
        };

        self.adapter.stop_discovery();
        self.release_scan(&cancel);

        let inner = self.inner.lock();
        if inner.power_generation != generation {
            info!("{} scan aborted", domain);
            return Err(ConnectivityError::ScanAborted { domain });
        }
        match end {
            ScanEnd::Failed(reason) => {
                warn!("{} discovery failed: {}", domain, reason);
                Err(ConnectivityError::Discovery { domain, reason })
            }
            ScanEnd::Elapsed | ScanEnd::Stopped | ScanEnd::Exhausted => {
                info!("{} scan finished with {} item(s)", domain, inner.state.items.len());
                Ok(inner.state.items.clone())
            }
        }
    }

    /// Stop the running scan early; it resolves with what it found so far.
    pub fn cancel_scan(&self) -> bool {
        match &self.inner.lock().scan_cancel {
            Some(cancel) => {
                cancel.notify_one();
                true
            }
            None => false,
        }
    }

    /// Connect to `item`, replacing any current connection.
    ///
    /// The current connection is torn down first. If that fails the connect
    /// still goes ahead and the failure is returned in
    /// [`ConnectOutcome::previous_disconnect`]. A radio power-off while the
    /// platform call is pending fails the connect with
    /// [`ConnectivityError::Disabled`].
    pub async fn connect(
        &self,
        item: &I,
        credentials: Option<&str>,
    ) -> Result<ConnectOutcome<I>, ConnectivityError> {
        let domain = I::DOMAIN;
        if !self.inner.lock().state.enabled {
            return Err(ConnectivityError::Disabled { domain });
        }
        if item.requires_credentials() && credentials.map_or(true, str::is_empty) {
            return Err(ConnectivityError::CredentialsRequired {
                network: item.display_name().to_string(),
            });
        }
        let op = self.begin(Activity::Connecting)?;

        let mut previous_disconnect = None;
        let previous = self.inner.lock().connection.clone();
        if let Some(previous) = previous {
            info!(
                "Disconnecting from {} before connecting to {}",
                previous.item_id,
                item.id()
            );
            match self.adapter.disconnect(&previous).await {
                Ok(()) => {
                    self.commit(|inner| {
                        inner.connection = None;
                        inner.state.connected_item.take().is_some()
                    });
                }
                Err(e) => {
                    warn!(
                        "Could not disconnect from {}: {} (connecting anyway)",
                        previous.item_id, e
                    );
                    previous_disconnect = Some(e);
                }
            }
        }

        let failed = |cause: ConnectFailure| {
            warn!("Connecting to {} failed: {}", item.display_name(), cause);
            ConnectivityError::Connection {
                item: item.display_name().to_string(),
                cause,
            }
        };

        info!("Connecting to {} {}...", domain, item.display_name());
        let connect_timeout = self.timings.connect_timeout;
        let handle = match tokio::time::timeout(connect_timeout, self.adapter.connect(item, credentials)).await {
            Err(_) => return Err(failed(ConnectFailure::Timeout(connect_timeout))),
            Ok(Err(e)) => return Err(failed(e.into())),
            Ok(Ok(handle)) => handle,
        };

        settle(self.timings.connect_settle).await;

        match self.adapter.current_connection().await {
            Ok(Some(current)) if item.matches_connection(&current) => {}
            Ok(_) => return Err(failed(ConnectFailure::NotVerified)),
            Err(e) => return Err(failed(e.into())),
        }

        let generation = op.generation;
        let connected = item.clone();
        let mut powered_off = false;
        self.commit(|inner| {
            if !inner.state.enabled || inner.power_generation != generation {
                powered_off = true;
                return false;
            }
            inner.connection = Some(handle);
            if inner.state.connected_item.as_ref() == Some(&connected) {
                return false;
            }
            inner.state.connected_item = Some(connected);
            true
        });
        if powered_off {
            warn!("{} went off while connecting to {}", domain, item.display_name());
            return Err(ConnectivityError::Disabled { domain });
        }
        info!("Connected to {}", item.display_name());
        Ok(ConnectOutcome {
            item: item.clone(),
            previous_disconnect,
        })
    }

    /// Tear down the current connection.
    pub async fn disconnect(&self) -> Result<bool, ConnectivityError> {
        let domain = I::DOMAIN;
        let _op = self.begin(Activity::Disconnecting)?;

        let current = self.inner.lock().connection.clone();
        let Some(handle) = current else {
            debug!("{} disconnect requested with nothing connected", domain);
            return Ok(true);
        };

        match self.adapter.disconnect(&handle).await {
            Ok(()) => {}
            Err(RadioError::Unsupported) => {
                return Err(ConnectivityError::ManualActionRequired {
                    domain,
                    action: format!("disconnect from the {} {}", domain, domain.item_noun()),
                });
            }
            Err(source) => return Err(ConnectivityError::Radio { domain, source }),
        }

        self.commit(|inner| {
            inner.connection = None;
            inner.state.connected_item.take().is_some()
        });
        info!("Disconnected from {}", handle.item_id);
        Ok(true)
    }

    /// Re-read power and connection state from the platform.
    ///
    /// Skipped while another action is in flight.
    pub async fn refresh(&self) -> Result<ConnectivityState<I>, ConnectivityError> {
        let domain = I::DOMAIN;
        let enabled = self
            .adapter
            .is_enabled()
            .await
            .map_err(|source| ConnectivityError::Radio { domain, source })?;

        if !enabled {
            self.apply_power_state(false);
            return Ok(self.get_state());
        }

        let current = match self.adapter.current_connection().await {
            Ok(current) => current,
            Err(e) => {
                debug!("Could not read current {} connection: {}", domain, e);
                None
            }
        };

        self.commit(|inner| {
            if inner.activity != Activity::Idle {
                debug!("Skipping {} refresh while {}", domain, inner.activity);
                return false;
            }
            let before = inner.state.clone();
            inner.state.enabled = true;
            match current {
                Some(handle) => {
                    let known = inner
                        .state
                        .connected_item
                        .as_ref()
                        .filter(|item| item.matches_connection(&handle))
                        .or_else(|| {
                            inner
                                .state
                                .items
                                .iter()
                                .find(|item| item.matches_connection(&handle))
                        })
                        .cloned();
                    if known.is_none() {
                        debug!("{} connected to unknown {}, not tracking it", domain, handle.item_id);
                    }
                    inner.connection = known.as_ref().map(|_| handle);
                    inner.state.connected_item = known;
                }
                None => {
                    inner.state.connected_item = None;
                    inner.connection = None;
                }
            }
            inner.state != before
        });
        Ok(self.get_state())
    }

    /// Apply a power change reported by the platform.
    pub fn apply_power_state(&self, enabled: bool) -> bool {
        let mut interrupted = false;
        let changed = self.commit(|inner| {
            if inner.state.enabled == enabled {
                return false;
            }
            if enabled {
                inner.state.enabled = true;
            } else {
                interrupted = inner.power_off();
            }
            true
        });
        if interrupted {
            self.adapter.stop_discovery();
        }
        if changed {
            info!("{} turned {}", I::DOMAIN, if enabled { "on" } else { "off" });
        }
        changed
    }

    /// Apply a connection loss reported by the platform.
    pub fn apply_connection_lost(&self) -> bool {
        self.commit(|inner| {
            inner.connection = None;
            inner.state.connected_item.take().is_some()
        })
    }

    /// Stop scanning, drop the connection and forget all subscribers.
    pub async fn shutdown(&self) {
        self.cancel_scan();
        let connected = self.inner.lock().connection.is_some();
        if connected {
            if let Err(e) = self.disconnect().await {
                warn!("{} disconnect during shutdown failed: {}", I::DOMAIN, e);
            }
        }
        self.subscribers.clear();
    }

    fn begin(&self, next: Activity) -> Result<OperationGuard<'_, I>, ConnectivityError> {
        let domain = I::DOMAIN;
        let mut inner = self.inner.lock();
        match inner.activity {
            Activity::Idle => {}
            Activity::Scanning if next == Activity::Scanning => {
                return Err(ConnectivityError::AlreadyScanning { domain });
            }
            // The scan keeps running until the radio is confirmed off.
            Activity::Scanning if next == Activity::Disabling => {}
            current => {
                return Err(ConnectivityError::Busy {
                    domain,
                    activity: current,
                });
            }
        }
        inner.op_token += 1;
        inner.activity = next;
        let token = inner.op_token;
        if next == Activity::Scanning {
            inner.scan_owner = Some(token);
        }
        Ok(OperationGuard {
            store: self,
            token,
            generation: inner.power_generation,
        })
    }

    /// Mutate under the lock; notify subscribers if `mutate` reports a change.
    fn commit<F>(&self, mutate: F) -> bool
    where
        F: FnOnce(&mut Inner<I>) -> bool,
    {
        let _delivery = self.delivery.lock();
        let snapshot = {
            let mut inner = self.inner.lock();
            if !mutate(&mut inner) {
                return false;
            }
            inner.state.clone()
        };
        self.subscribers.notify(&snapshot);
        true
    }

    /// Add a discovered item. Returns false if the scan has been invalidated.
    fn record_discovery(&self, generation: u64, item: I) -> bool {
        let mut current = true;
        self.commit(|inner| {
            if inner.power_generation != generation {
                current = false;
                return false;
            }
            if inner.state.items.iter().any(|known| known.id() == item.id()) {
                return false;
            }
            debug!("{} discovered: {} ({})", I::DOMAIN, item.display_name(), item.id());
            inner.state.items.push(item);
            true
        });
        current
    }

    fn release_scan(&self, cancel: &Arc<Notify>) {
        let mut inner = self.inner.lock();
        if inner
            .scan_cancel
            .as_ref()
            .map_or(false, |current| Arc::ptr_eq(current, cancel))
        {
            inner.scan_cancel = None;
        }
    }
}

async fn settle(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

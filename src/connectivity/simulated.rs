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

//! In-process radio used by the headless host and in tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use super::adapter::{ConnectedHandle, DiscoveryEvent, RadioAdapter};
use super::item::Item;
use crate::error::RadioError;

struct SimState<I> {
    enabled: bool,
    fixtures: Vec<I>,
    connected: Option<ConnectedHandle>,
    discovery: Option<JoinHandle<()>>,
    rejected: HashSet<String>,
    secrets: HashMap<String, String>,
}

/// Radio that "discovers" a fixed list of items.
///
/// Each fixture is reported once per `interval` after discovery starts. The
/// discovery channel stays open until [`RadioAdapter::stop_discovery`].
pub struct SimulatedRadio<I> {
    state: Mutex<SimState<I>>,
    interval: Duration,
    programmable_toggle: bool,
    programmable_disconnect: bool,
}

impl<I: Item> SimulatedRadio<I> {
    pub fn new(fixtures: Vec<I>) -> Self {
        Self {
            state: Mutex::new(SimState {
                enabled: false,
                fixtures,
                connected: None,
                discovery: None,
                rejected: HashSet::new(),
                secrets: HashMap::new(),
            }),
            interval: Duration::from_millis(250),
            programmable_toggle: true,
            programmable_disconnect: true,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Start with the radio already on.
    pub fn powered(self) -> Self {
        self.state.lock().enabled = true;
        self
    }

    /// Behave like a platform where the user must toggle the radio.
    pub fn manual_toggle(mut self) -> Self {
        self.programmable_toggle = false;
        self
    }

    /// Behave like a platform where the user must disconnect.
    pub fn manual_disconnect(mut self) -> Self {
        self.programmable_disconnect = false;
        self
    }

    /// Refuse connections to the item with this id.
    pub fn reject(self, id: impl Into<String>) -> Self {
        self.state.lock().rejected.insert(id.into());
        self
    }

    /// Require `secret` to connect to the item with this id.
    pub fn with_secret(self, id: impl Into<String>, secret: impl Into<String>) -> Self {
        self.state.lock().secrets.insert(id.into(), secret.into());
        self
    }

    /// Flip the radio as if the user used the system settings.
    pub fn set_power_externally(&self, enabled: bool) {
        let mut state = self.state.lock();
        state.enabled = enabled;
        if !enabled {
            state.connected = None;
        }
    }

    pub fn connected(&self) -> Option<ConnectedHandle> {
        self.state.lock().connected.clone()
    }

    pub fn is_discovering(&self) -> bool {
        self.state
            .lock()
            .discovery
            .as_ref()
            .map_or(false, |task| !task.is_finished())
    }
}

#[async_trait]
impl<I: Item> RadioAdapter<I> for SimulatedRadio<I> {
    async fn is_enabled(&self) -> Result<bool, RadioError> {
        Ok(self.state.lock().enabled)
    }

    async fn set_enabled(&self, enabled: bool) -> Result<(), RadioError> {
        if !self.programmable_toggle {
            return Err(RadioError::Unsupported);
        }
        self.set_power_externally(enabled);
        Ok(())
    }

    fn start_discovery(&self, events: mpsc::UnboundedSender<DiscoveryEvent<I>>) -> Result<(), RadioError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| RadioError::Failed("no async runtime available".to_string()))?;

        let mut state = self.state.lock();
        if !state.enabled {
            return Err(RadioError::Failed("radio is off".to_string()));
        }
        if let Some(previous) = state.discovery.take() {
            previous.abort();
        }

        let fixtures = state.fixtures.clone();
        let interval = self.interval;
        info!("[SIM] Discovery started with {} fixture(s)", fixtures.len());
        state.discovery = Some(runtime.spawn(async move {
            for item in fixtures {
                tokio::time::sleep(interval).await;
                if events.send(DiscoveryEvent::Found(item)).is_err() {
                    return;
                }
            }
            // Keep the channel open until stopped, like a real scanner.
            events.closed().await;
        }));
        Ok(())
    }

    fn stop_discovery(&self) {
        if let Some(task) = self.state.lock().discovery.take() {
            task.abort();
        }
    }

    async fn connect(&self, item: &I, credentials: Option<&str>) -> Result<ConnectedHandle, RadioError> {
        let mut state = self.state.lock();
        if !state.enabled {
            return Err(RadioError::Failed("radio is off".to_string()));
        }
        if state.rejected.contains(item.id()) {
            return Err(RadioError::Failed(format!("{} refused the connection", item.display_name())));
        }
        if let Some(secret) = state.secrets.get(item.id()) {
            if credentials != Some(secret.as_str()) {
                return Err(RadioError::Failed("authentication rejected".to_string()));
            }
        }
        let handle = ConnectedHandle::new(item.id()).with_label(item.display_name());
        state.connected = Some(handle.clone());
        info!("[SIM] Connected to {}", item.display_name());
        Ok(handle)
    }

    async fn disconnect(&self, handle: &ConnectedHandle) -> Result<(), RadioError> {
        if !self.programmable_disconnect {
            return Err(RadioError::Unsupported);
        }
        let mut state = self.state.lock();
        if state.connected.as_ref() == Some(handle) {
            state.connected = None;
        }
        Ok(())
    }

    async fn current_connection(&self) -> Result<Option<ConnectedHandle>, RadioError> {
        Ok(self.state.lock().connected.clone())
    }
}

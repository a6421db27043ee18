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

//! Platform radio and permission abstractions.

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc;

use super::item::{Domain, Item};
use crate::error::RadioError;

/// Handle to a live connection as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedHandle {
    /// Identity of the connected item (device id or BSSID when known).
    pub item_id: String,
    /// Platform label for the connection, e.g. the SSID.
    pub label: Option<String>,
}

impl ConnectedHandle {
    pub fn new(item_id: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Raw discovery events reported while a scan runs.
#[derive(Debug, Clone)]
pub enum DiscoveryEvent<I> {
    /// An item was observed. The same item may be reported many times.
    Found(I),
    /// Discovery stopped with an error.
    Failed(String),
}

/// Capability set a store needs from the platform radio.
///
/// Implementations wrap a native BLE or WiFi manager. Operations the platform
/// cannot perform from inside the app return [`RadioError::Unsupported`].
#[async_trait]
pub trait RadioAdapter<I: Item>: Send + Sync {
    /// Whether the radio is currently on.
    async fn is_enabled(&self) -> Result<bool, RadioError>;

    /// Turn the radio on or off.
    async fn set_enabled(&self, enabled: bool) -> Result<(), RadioError>;

    /// Begin discovery, reporting events on `events` until stopped.
    ///
    /// Dropping the sender ends the scan early.
    fn start_discovery(&self, events: mpsc::UnboundedSender<DiscoveryEvent<I>>) -> Result<(), RadioError>;

    /// Stop an ongoing discovery. Must be safe to call when none is running.
    fn stop_discovery(&self);

    /// Connect to an item.
    async fn connect(&self, item: &I, credentials: Option<&str>) -> Result<ConnectedHandle, RadioError>;

    /// Tear down a connection.
    async fn disconnect(&self, handle: &ConnectedHandle) -> Result<(), RadioError>;

    /// The connection the platform currently reports, if any.
    async fn current_connection(&self) -> Result<Option<ConnectedHandle>, RadioError>;
}

/// OS permission gate consulted before discovery.
#[async_trait]
pub trait PermissionCheck: Send + Sync {
    async fn check(&self, domain: Domain) -> bool;
}

/// Permission check for hosts without a runtime permission model.
pub struct AlwaysGranted;

#[async_trait]
impl PermissionCheck for AlwaysGranted {
    async fn check(&self, _domain: Domain) -> bool {
        true
    }
}

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

//! Discovered devices and networks.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::adapter::ConnectedHandle;

/// Connectivity domain a store is responsible for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Bluetooth,
    Wifi,
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Bluetooth => "Bluetooth",
            Domain::Wifi => "WiFi",
        }
    }

    /// What a single item of this domain is called.
    pub fn item_noun(&self) -> &'static str {
        match self {
            Domain::Bluetooth => "device",
            Domain::Wifi => "network",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A discovered device or network.
///
/// Items are immutable value snapshots identified by [`Item::id`].
pub trait Item: Clone + fmt::Debug + PartialEq + Serialize + Send + Sync + 'static {
    /// Domain this item type belongs to.
    const DOMAIN: Domain;

    /// Stable identity key (device id or BSSID).
    fn id(&self) -> &str;

    /// Human readable name.
    fn display_name(&self) -> &str;

    /// Signal strength (RSSI or level), if reported.
    fn signal(&self) -> Option<i32>;

    /// Label sent to the hosted page when this item is connected.
    fn status_label(&self) -> String {
        self.display_name().to_string()
    }

    /// Whether connecting requires credentials.
    fn requires_credentials(&self) -> bool {
        false
    }

    /// Whether a connection reported by the platform refers to this item.
    fn matches_connection(&self, handle: &ConnectedHandle) -> bool {
        handle.item_id == self.id()
    }
}

/// A Bluetooth LE peripheral.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BluetoothDevice {
    pub id: String,
    pub name: Option<String>,
    pub rssi: Option<i16>,
    #[serde(default)]
    pub service_uuids: Vec<String>,
    pub is_connectable: Option<bool>,
}

impl BluetoothDevice {
    pub fn new(id: impl Into<String>, name: Option<&str>) -> Self {
        Self {
            id: id.into(),
            name: name.map(str::to_string),
            rssi: None,
            service_uuids: Vec::new(),
            is_connectable: None,
        }
    }

    pub fn with_rssi(mut self, rssi: i16) -> Self {
        self.rssi = Some(rssi);
        self
    }
}

impl Item for BluetoothDevice {
    const DOMAIN: Domain = Domain::Bluetooth;

    fn id(&self) -> &str {
        &self.id
    }

    fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unknown Device")
    }

    fn signal(&self) -> Option<i32> {
        self.rssi.map(i32::from)
    }

    fn status_label(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.id.clone())
    }
}

/// WiFi security classification derived from the capabilities string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Security {
    Open,
    Wep,
    Wpa,
}

impl Security {
    /// Classify an Android-style capabilities string such as `[WPA2-PSK-CCMP][ESS]`.
    pub fn from_capabilities(capabilities: &str) -> Self {
        if capabilities.contains("WPA") {
            Security::Wpa
        } else if capabilities.contains("WEP") {
            Security::Wep
        } else {
            Security::Open
        }
    }

    pub fn is_secured(&self) -> bool {
        !matches!(self, Security::Open)
    }
}

/// A WiFi access point seen during a scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WifiNetwork {
    #[serde(rename = "SSID")]
    pub ssid: String,
    #[serde(rename = "BSSID")]
    pub bssid: String,
    #[serde(default)]
    pub capabilities: String,
    pub frequency: Option<u32>,
    pub level: Option<i32>,
    pub timestamp: Option<u64>,
}

impl WifiNetwork {
    pub fn new(ssid: impl Into<String>, bssid: impl Into<String>) -> Self {
        Self {
            ssid: ssid.into(),
            bssid: bssid.into(),
            capabilities: String::new(),
            frequency: None,
            level: None,
            timestamp: None,
        }
    }

    pub fn with_capabilities(mut self, capabilities: impl Into<String>) -> Self {
        self.capabilities = capabilities.into();
        self
    }

    pub fn with_level(mut self, level: i32) -> Self {
        self.level = Some(level);
        self
    }

    pub fn security(&self) -> Security {
        Security::from_capabilities(&self.capabilities)
    }
}

impl Item for WifiNetwork {
    const DOMAIN: Domain = Domain::Wifi;

    fn id(&self) -> &str {
        &self.bssid
    }

    fn display_name(&self) -> &str {
        &self.ssid
    }

    fn signal(&self) -> Option<i32> {
        self.level
    }

    fn requires_credentials(&self) -> bool {
        self.security().is_secured()
    }

    // Platforms often only report the SSID of the current network.
    fn matches_connection(&self, handle: &ConnectedHandle) -> bool {
        handle.item_id == self.bssid || handle.label.as_deref() == Some(self.ssid.as_str())
    }
}

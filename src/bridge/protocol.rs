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

//! Messages exchanged with the hosted page.
//!
//! Inbound traffic is a JSON object with a `type` string and arbitrary
//! additional fields. Types this crate understands have a typed view in
//! [`InboundRequest`]; anything else stays a plain [`BridgeMessage`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::connectivity::{BluetoothDevice, WifiNetwork};
use crate::error::BridgeError;
use crate::state::ConnectivityState;

/// Message types sent by the hosted page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    GetConnectionStatus,
    Message,
    RequestBluetoothScan,
    RequestWifiScan,
    ConnectToBluetoothDevice,
    ConnectToWifiNetwork,
}

impl MessageKind {
    pub const ALL: [MessageKind; 6] = [
        Self::GetConnectionStatus,
        Self::Message,
        Self::RequestBluetoothScan,
        Self::RequestWifiScan,
        Self::ConnectToBluetoothDevice,
        Self::ConnectToWifiNetwork,
    ];

    /// Wire name of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GetConnectionStatus => "getConnectionStatus",
            Self::Message => "message",
            Self::RequestBluetoothScan => "requestBluetoothScan",
            Self::RequestWifiScan => "requestWifiScan",
            Self::ConnectToBluetoothDevice => "connectToBluetoothDevice",
            Self::ConnectToWifiNetwork => "connectToWifiNetwork",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == s)
    }
}

/// Inbound bridge message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeMessage {
    #[serde(rename = "type")]
    pub message_type: String,

    /// Every field other than `type`.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl BridgeMessage {
    pub fn new(message_type: impl Into<String>) -> Self {
        Self {
            message_type: message_type.into(),
            fields: Map::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Decode a raw payload. Anything that is not a JSON object with a
    /// non-empty string `type` is malformed.
    pub fn parse(raw: &str) -> Result<Self, BridgeError> {
        let value: Value = serde_json::from_str(raw.trim())
            .map_err(|e| BridgeError::MalformedMessage(e.to_string()))?;

        let Value::Object(mut fields) = value else {
            return Err(BridgeError::MalformedMessage("expected a JSON object".to_string()));
        };

        let message_type = match fields.remove("type") {
            Some(Value::String(t)) if !t.is_empty() => t,
            Some(_) => {
                return Err(BridgeError::MalformedMessage(
                    "'type' must be a non-empty string".to_string(),
                ))
            }
            None => return Err(BridgeError::MalformedMessage("missing 'type'".to_string())),
        };

        Ok(Self {
            message_type,
            fields,
        })
    }

    pub fn kind(&self) -> Option<MessageKind> {
        MessageKind::parse(&self.message_type)
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// String field, `None` when absent or not a string.
    pub fn field_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }
}

/// Typed view of a recognized inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundRequest {
    GetConnectionStatus,
    Message { content: Value },
    RequestBluetoothScan,
    RequestWifiScan,
    ConnectToBluetoothDevice { device_id: String },
    ConnectToWifiNetwork { ssid: String, password: Option<String> },
}

impl InboundRequest {
    /// Interpret `message`. Returns `Ok(None)` for types this crate does not
    /// know about.
    pub fn from_message(message: &BridgeMessage) -> Result<Option<Self>, BridgeError> {
        let Some(kind) = message.kind() else {
            return Ok(None);
        };

        let required = |field: &'static str| {
            message
                .field_str(field)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or_else(|| BridgeError::MissingField {
                    message_type: message.message_type.clone(),
                    field,
                })
        };

        let request = match kind {
            MessageKind::GetConnectionStatus => Self::GetConnectionStatus,
            MessageKind::Message => Self::Message {
                content: message.field("content").cloned().unwrap_or(Value::Null),
            },
            MessageKind::RequestBluetoothScan => Self::RequestBluetoothScan,
            MessageKind::RequestWifiScan => Self::RequestWifiScan,
            MessageKind::ConnectToBluetoothDevice => Self::ConnectToBluetoothDevice {
                device_id: required("deviceId")?,
            },
            MessageKind::ConnectToWifiNetwork => Self::ConnectToWifiNetwork {
                ssid: required("ssid")?,
                password: message.field_str("password").map(str::to_string),
            },
        };
        Ok(Some(request))
    }
}

/// Connection summary pushed to the hosted page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub bluetooth_connected: bool,
    pub wifi_connected: bool,
    pub bluetooth_label: Option<String>,
    pub wifi_label: Option<String>,
}

impl StatusReport {
    pub fn from_states(
        bluetooth: &ConnectivityState<BluetoothDevice>,
        wifi: &ConnectivityState<WifiNetwork>,
    ) -> Self {
        Self {
            bluetooth_connected: bluetooth.is_connected(),
            wifi_connected: wifi.is_connected(),
            bluetooth_label: bluetooth.connected_label(),
            wifi_label: wifi.connected_label(),
        }
    }
}

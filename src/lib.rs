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

//! Bluetooth and WiFi connectivity stores plus a messaging bridge to hosted
//! web content.
//!
//! Each radio domain has a [`ConnectivityStore`] that owns its state and
//! notifies subscribers after every committed change. The [`WebViewBridge`]
//! carries JSON messages in from the hosted page and injects script calls
//! back out. [`EventProcessor`] wires the two together.

pub mod activity;
pub mod bridge;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod events;
pub mod state;

pub use activity::{ActivityEntry, ActivityLog, EntryKind};
pub use bridge::{BridgeMessage, InboundRequest, StatusReport, Transport, WebViewBridge};
pub use config::Config;
pub use connectivity::{
    BluetoothDevice, BluetoothStore, ConnectOutcome, ConnectivityStore, Domain, Item, RadioAdapter,
    RadioTimings, Subscription, WifiNetwork, WifiStore,
};
pub use error::{BridgeError, ConnectFailure, ConnectivityError, RadioError, TransportError};
pub use events::{EventProcessor, StatusRelay};
pub use state::{Activity, ConnectivityState, Phase};

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

//! Connectivity state stores.
//!
//! One store per radio domain owns that domain's state and fans snapshots out
//! to subscribers.

mod adapter;
mod item;
mod simulated;
mod store;
mod subscribers;

pub use adapter::{AlwaysGranted, ConnectedHandle, DiscoveryEvent, PermissionCheck, RadioAdapter};
pub use item::{BluetoothDevice, Domain, Item, Security, WifiNetwork};
pub use simulated::SimulatedRadio;
pub use store::{BluetoothStore, ConnectOutcome, ConnectivityStore, RadioTimings, WifiStore};
pub use subscribers::{Subscriber, SubscriberRegistry, Subscription};

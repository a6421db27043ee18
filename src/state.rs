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

//! Connectivity state snapshots and state-machine tags.

use serde::Serialize;
use std::fmt;

use crate::connectivity::Item;

/// Snapshot of one domain's connectivity state.
///
/// Stores hand these out by value (or by reference to subscribers); changing a
/// snapshot never changes the store it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectivityState<I> {
    /// Whether the radio is on.
    pub enabled: bool,

    /// Discovered items in first-seen order, unique by id.
    pub items: Vec<I>,

    /// The item currently connected, if any.
    pub connected_item: Option<I>,
}

impl<I> Default for ConnectivityState<I> {
    fn default() -> Self {
        Self {
            enabled: false,
            items: Vec::new(),
            connected_item: None,
        }
    }
}

impl<I: Item> ConnectivityState<I> {
    pub fn is_connected(&self) -> bool {
        self.connected_item.is_some()
    }

    /// Label for the connected item, as shown to the hosted page.
    pub fn connected_label(&self) -> Option<String> {
        self.connected_item.as_ref().map(|item| item.status_label())
    }

    /// Look up a discovered item by id.
    pub fn find(&self, id: &str) -> Option<&I> {
        self.items.iter().find(|item| item.id() == id)
    }
}

/// Operation currently in flight on a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Idle,
    Enabling,
    Disabling,
    Scanning,
    Connecting,
    Disconnecting,
}

impl Activity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Activity::Idle => "idle",
            Activity::Enabling => "enabling",
            Activity::Disabling => "disabling",
            Activity::Scanning => "scanning",
            Activity::Connecting => "connecting",
            Activity::Disconnecting => "disconnecting",
        }
    }
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position in the per-store state machine.
///
/// `Disabled -> Enabling -> Enabled -> Scanning -> Enabled -> Connecting ->
/// Connected -> Enabled -> Disabling -> Disabled`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Disabled,
    Enabling,
    Enabled,
    Scanning,
    Connecting,
    Connected,
    Disconnecting,
    Disabling,
}

impl Phase {
    /// Derive the phase from committed state and the operation in flight.
    pub fn from_parts(enabled: bool, connected: bool, activity: Activity) -> Self {
        match activity {
            Activity::Enabling => Phase::Enabling,
            Activity::Disabling => Phase::Disabling,
            Activity::Scanning => Phase::Scanning,
            Activity::Connecting => Phase::Connecting,
            Activity::Disconnecting => Phase::Disconnecting,
            Activity::Idle if !enabled => Phase::Disabled,
            Activity::Idle if connected => Phase::Connected,
            Activity::Idle => Phase::Enabled,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Disabled => "Disabled",
            Phase::Enabling => "Enabling...",
            Phase::Enabled => "Enabled",
            Phase::Scanning => "Scanning...",
            Phase::Connecting => "Connecting...",
            Phase::Connected => "Connected",
            Phase::Disconnecting => "Disconnecting...",
            Phase::Disabling => "Disabling...",
        }
    }

    /// Whether the radio is on in this phase.
    pub fn is_on(&self) -> bool {
        !matches!(self, Phase::Disabled | Phase::Enabling)
    }
}

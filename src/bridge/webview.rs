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

//! Two-way messaging between native code and the hosted page.
//!
//! Outbound calls return `false` instead of failing while no page is attached
//! or when injection fails. Inbound payloads are untrusted: malformed or
//! unknown messages are logged and dropped.

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::content::ContentLocation;
use super::protocol::{BridgeMessage, StatusReport};
use super::script::{self, PageFunction};
use super::transport::Transport;
use crate::connectivity::{BluetoothDevice, WifiNetwork};

/// Callback for one inbound message type.
pub type MessageHandler = Arc<dyn Fn(&BridgeMessage) + Send + Sync>;

/// Messaging bridge to a hosted web page.
pub struct WebViewBridge {
    transport: RwLock<Option<Arc<dyn Transport>>>,
    handlers: Mutex<HashMap<String, MessageHandler>>,
    content: Mutex<ContentLocation>,
}

impl WebViewBridge {
    pub fn new() -> Self {
        Self {
            transport: RwLock::new(None),
            handlers: Mutex::new(HashMap::new()),
            content: Mutex::new(ContentLocation::default()),
        }
    }

    /// Bind to a live transport, replacing any previous one.
    pub fn attach(&self, transport: Arc<dyn Transport>) {
        info!("Bridge attached to {} transport", transport.name());
        if let Some(previous) = self.transport.write().replace(transport) {
            debug!("Replaced {} transport", previous.name());
        }
    }

    /// Unbind the transport and drop all handlers.
    pub fn detach(&self) {
        let previous = self.transport.write().take();
        self.handlers.lock().clear();
        if previous.is_some() {
            info!("Bridge detached");
        }
    }

    /// Like [`detach`](Self::detach), and also forget the content location.
    pub fn reset(&self) {
        self.detach();
        self.content.lock().clear();
    }

    pub fn is_attached(&self) -> bool {
        self.transport.read().is_some()
    }

    /// Register the handler for `message_type`; a later registration for the
    /// same type replaces it.
    pub fn register_handler<F>(&self, message_type: impl Into<String>, handler: F)
    where
        F: Fn(&BridgeMessage) + Send + Sync + 'static,
    {
        let message_type = message_type.into();
        debug!("Registered bridge handler for '{}'", message_type);
        self.handlers.lock().insert(message_type, Arc::new(handler));
    }

    pub fn unregister_handler(&self, message_type: &str) -> bool {
        self.handlers.lock().remove(message_type).is_some()
    }

    pub fn clear_handlers(&self) {
        self.handlers.lock().clear();
    }

    pub fn has_handler(&self, message_type: &str) -> bool {
        self.handlers.lock().contains_key(message_type)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.lock().len()
    }

    /// Decode `raw` and run the handler for its type.
    ///
    /// Returns true only when a handler ran to completion.
    pub fn dispatch_incoming(&self, raw: &str) -> bool {
        let message = match BridgeMessage::parse(raw) {
            Ok(message) => message,
            Err(e) => {
                warn!("Dropping inbound message: {}", e);
                return false;
            }
        };

        let handler = self.handlers.lock().get(&message.message_type).cloned();
        let Some(handler) = handler else {
            debug!("No handler for '{}' message, ignoring", message.message_type);
            return false;
        };

        debug!("Dispatching '{}' message", message.message_type);
        if catch_unwind(AssertUnwindSafe(|| handler(&message))).is_err() {
            error!("Handler for '{}' panicked", message.message_type);
            return false;
        }
        true
    }

    /// Deliver `content` to the page's `receiveMessage`.
    pub fn send_message<T: Serialize + ?Sized>(&self, content: &T) -> bool {
        match serde_json::to_value(content) {
            Ok(value) => self.call_bridge(PageFunction::ReceiveMessage, &[value]),
            Err(e) => {
                error!("Could not serialize message for the page: {}", e);
                false
            }
        }
    }

    /// Push connection flags and labels to the page's `updateConnectionStatus`.
    pub fn push_connection_status(
        &self,
        bluetooth_connected: bool,
        wifi_connected: bool,
        bluetooth_label: Option<&str>,
        wifi_label: Option<&str>,
    ) -> bool {
        self.call_bridge(
            PageFunction::UpdateConnectionStatus,
            &[
                json!(bluetooth_connected),
                json!(wifi_connected),
                json!(bluetooth_label),
                json!(wifi_label),
            ],
        )
    }

    pub fn push_status(&self, report: &StatusReport) -> bool {
        self.push_connection_status(
            report.bluetooth_connected,
            report.wifi_connected,
            report.bluetooth_label.as_deref(),
            report.wifi_label.as_deref(),
        )
    }

    pub fn update_device_list(&self, devices: &[BluetoothDevice]) -> bool {
        self.call_bridge_with(PageFunction::UpdateDeviceList, devices)
    }

    pub fn update_network_list(&self, networks: &[WifiNetwork]) -> bool {
        self.call_bridge_with(PageFunction::UpdateNetworkList, networks)
    }

    /// Call a global page function by dotted path, e.g. `app.refresh`.
    pub fn call_function(&self, path: &str, args: &[Value]) -> bool {
        match script::global_call(path, args) {
            Some(code) => self.inject(&code),
            None => {
                warn!("Refusing to call '{}': not a function path", path);
                false
            }
        }
    }

    /// Run arbitrary script in the page.
    pub fn evaluate_remote(&self, code: &str) -> bool {
        self.inject(&script::with_completion(code))
    }

    /// Record extracted content and return the page to load.
    pub fn set_extracted_content(&self, root: &str, main_page: &str) -> String {
        let page = self.content.lock().set_extracted(root, main_page);
        info!("Hosted content set to {}", page);
        page
    }

    pub fn current_page(&self) -> Option<String> {
        self.content.lock().current_page().map(str::to_string)
    }

    pub fn extracted_root(&self) -> Option<String> {
        self.content.lock().extracted_root().map(str::to_string)
    }

    fn call_bridge_with<T: Serialize + ?Sized>(&self, function: PageFunction, payload: &T) -> bool {
        match serde_json::to_value(payload) {
            Ok(value) => self.call_bridge(function, &[value]),
            Err(e) => {
                error!("Could not serialize {} payload: {}", function.name(), e);
                false
            }
        }
    }

    fn call_bridge(&self, function: PageFunction, args: &[Value]) -> bool {
        self.inject(&script::bridge_call(function, args))
    }

    fn inject(&self, code: &str) -> bool {
        let transport = self.transport.read().clone();
        let Some(transport) = transport else {
            debug!("Bridge not attached, dropping outbound script");
            return false;
        };
        match transport.inject_script(code) {
            Ok(()) => true,
            Err(e) => {
                error!("Script injection via {} failed: {}", transport.name(), e);
                false
            }
        }
    }
}

impl Default for WebViewBridge {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::RecordingTransport;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn attached() -> (WebViewBridge, Arc<RecordingTransport>) {
        let bridge = WebViewBridge::new();
        let transport = Arc::new(RecordingTransport::new());
        bridge.attach(transport.clone());
        (bridge, transport)
    }

    fn counting(bridge: &WebViewBridge, message_type: &str) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        bridge.register_handler(message_type, move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        count
    }

    #[test]
    fn test_outbound_requires_attach() {
        let bridge = WebViewBridge::new();
        assert!(!bridge.is_attached());
        assert!(!bridge.send_message("hello"));
        assert!(!bridge.push_connection_status(true, false, Some("DeviceX"), None));
        assert!(!bridge.evaluate_remote("1 + 1"));
        assert!(!bridge.update_device_list(&[]));
    }

    #[test]
    fn test_malformed_and_unknown_messages_are_dropped() {
        let bridge = WebViewBridge::new();
        let count = counting(&bridge, "getConnectionStatus");

        assert!(!bridge.dispatch_incoming("not valid json"));
        assert!(!bridge.dispatch_incoming(r#"{"type":"unknownType"}"#));
        assert!(!bridge.dispatch_incoming(r#"{"content":"no type"}"#));
        assert_eq!(count.load(Ordering::SeqCst), 0);

        assert!(bridge.dispatch_incoming(r#"{"type":"getConnectionStatus"}"#));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_last_registration_wins() {
        let bridge = WebViewBridge::new();
        let first = counting(&bridge, "message");
        let second = counting(&bridge, "message");
        assert_eq!(bridge.handler_count(), 1);

        bridge.dispatch_incoming(r#"{"type":"message","content":"hi"}"#);
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);

        assert!(bridge.unregister_handler("message"));
        assert!(!bridge.unregister_handler("message"));
        assert!(!bridge.dispatch_incoming(r#"{"type":"message"}"#));
    }

    #[test]
    fn test_handler_panic_is_contained() {
        let bridge = WebViewBridge::new();
        bridge.register_handler("message", |_| panic!("bad handler"));
        assert!(!bridge.dispatch_incoming(r#"{"type":"message"}"#));
        assert!(bridge.has_handler("message"));
    }

    #[test]
    fn test_send_message_serializes_content() {
        let (bridge, transport) = attached();
        assert!(bridge.send_message(&json!({"text": "line1\nline2"})));

        let scripts = transport.scripts();
        assert_eq!(scripts.len(), 1);
        assert!(scripts[0].contains("receiveMessage({\"text\":\"line1\\nline2\"})"));
        assert!(scripts[0].ends_with("true;"));
    }

    #[test]
    fn test_injection_failure_returns_false() {
        let (bridge, transport) = attached();
        transport.close();
        assert!(bridge.is_attached());
        assert!(!bridge.send_message("hello"));
    }

    #[test]
    fn test_detach_clears_transport_and_handlers() {
        let (bridge, transport) = attached();
        let count = counting(&bridge, "message");
        bridge.set_extracted_content("/data/h5", "index.html");

        bridge.detach();
        assert!(!bridge.is_attached());
        assert_eq!(bridge.handler_count(), 0);
        assert!(!bridge.dispatch_incoming(r#"{"type":"message"}"#));
        assert!(!bridge.send_message("late"));
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(transport.scripts().is_empty());
        assert_eq!(bridge.current_page().as_deref(), Some("/data/h5/index.html"));

        bridge.reset();
        assert!(bridge.current_page().is_none());
        assert!(bridge.extracted_root().is_none());
    }

    #[test]
    fn test_attach_replaces_transport() {
        let (bridge, old) = attached();
        let new = Arc::new(RecordingTransport::new());
        bridge.attach(new.clone());

        assert!(bridge.evaluate_remote("refresh()"));
        assert!(old.scripts().is_empty());
        assert_eq!(new.scripts(), vec!["refresh()\ntrue;"]);
    }

    #[test]
    fn test_lists_and_function_calls() {
        let (bridge, transport) = attached();
        assert!(bridge.update_device_list(&[BluetoothDevice::new("AA", Some("Speaker"))]));
        assert!(bridge.update_network_list(&[WifiNetwork::new("Office", "aa:aa")]));
        assert!(bridge.call_function("app.refresh", &[json!(1)]));
        assert!(!bridge.call_function("alert(document.cookie)", &[]));

        let scripts = transport.scripts();
        assert_eq!(scripts.len(), 3);
        assert!(scripts[0].contains("updateDeviceList([{\"id\":\"AA\""));
        assert!(scripts[1].contains("updateNetworkList([{"));
        assert!(scripts[1].contains("\"SSID\":\"Office\""));
        assert!(scripts[2].contains("app.refresh(1)"));
    }
}

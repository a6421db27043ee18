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

//! Page request processing.
//!
//! Wires inbound bridge messages to the connectivity stores and relays store
//! changes back to the page.

use std::future::Future;
use std::sync::{Arc, Weak};
use tracing::{debug, error, info, warn};

use crate::activity::{ActivityLog, EntryKind};
use crate::bridge::{BridgeMessage, InboundRequest, MessageKind, StatusReport, WebViewBridge};
use crate::connectivity::{
    BluetoothDevice, BluetoothStore, ConnectivityStore, Item, Subscription, WifiNetwork, WifiStore,
};
use crate::error::ConnectivityError;
use crate::state::ConnectivityState;

/// Handles page requests against the Bluetooth and WiFi stores.
pub struct EventProcessor {
    bridge: Arc<WebViewBridge>,
    bluetooth: Arc<BluetoothStore>,
    wifi: Arc<WifiStore>,
    log: Arc<ActivityLog>,
}

impl EventProcessor {
    pub fn new(
        bridge: Arc<WebViewBridge>,
        bluetooth: Arc<BluetoothStore>,
        wifi: Arc<WifiStore>,
        log: Arc<ActivityLog>,
    ) -> Arc<Self> {
        Arc::new(Self {
            bridge,
            bluetooth,
            wifi,
            log,
        })
    }

    pub fn activity_log(&self) -> &Arc<ActivityLog> {
        &self.log
    }

    /// Register a bridge handler for every recognized message type.
    ///
    /// Handlers only hold a weak reference to the processor.
    pub fn install(self: &Arc<Self>) {
        for kind in MessageKind::ALL {
            let processor = Arc::downgrade(self);
            self.bridge.register_handler(kind.as_str(), move |message| {
                if let Some(processor) = processor.upgrade() {
                    processor.process_message(message);
                }
            });
        }
        info!("Event processor installed {} bridge handlers", MessageKind::ALL.len());
    }

    /// Handle one inbound message.
    pub fn process_message(&self, message: &BridgeMessage) {
        let request = match InboundRequest::from_message(message) {
            Ok(Some(request)) => request,
            Ok(None) => {
                debug!("Ignoring '{}' message", message.message_type);
                return;
            }
            Err(e) => {
                warn!("Invalid page request: {}", e);
                self.report_error(&e.to_string());
                return;
            }
        };

        match request {
            InboundRequest::GetConnectionStatus => {
                if self.push_status() {
                    self.log.record(EntryKind::Outbound, "Sent connection status to page");
                }
            }
            InboundRequest::Message { content } => {
                let text = content
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| content.to_string());
                info!("Message from page: {}", text);
                self.log.record(EntryKind::Inbound, format!("Received from page: {}", text));
            }
            InboundRequest::RequestBluetoothScan => {
                self.log.record(EntryKind::Inbound, "Page requested Bluetooth scan");
                let bridge = self.bridge.clone();
                self.spawn_scan(self.bluetooth.clone(), move |devices| {
                    bridge.update_device_list(devices)
                });
            }
            InboundRequest::RequestWifiScan => {
                self.log.record(EntryKind::Inbound, "Page requested WiFi scan");
                let bridge = self.bridge.clone();
                self.spawn_scan(self.wifi.clone(), move |networks| {
                    bridge.update_network_list(networks)
                });
            }
            InboundRequest::ConnectToBluetoothDevice { device_id } => {
                self.log.record(
                    EntryKind::Inbound,
                    format!("Page requested to connect to Bluetooth device: {}", device_id),
                );
                match self.bluetooth.get_state().find(&device_id).cloned() {
                    Some(device) => self.spawn_connect(self.bluetooth.clone(), device, None),
                    None => self.report_error(&format!("Unknown Bluetooth device: {}", device_id)),
                }
            }
            InboundRequest::ConnectToWifiNetwork { ssid, password } => {
                self.log.record(
                    EntryKind::Inbound,
                    format!("Page requested to connect to WiFi network: {}", ssid),
                );
                let network = self
                    .wifi
                    .get_state()
                    .items
                    .into_iter()
                    .find(|network| network.ssid == ssid);
                match network {
                    Some(network) => self.spawn_connect(self.wifi.clone(), network, password),
                    None => self.report_error(&format!("Unknown WiFi network: {}", ssid)),
                }
            }
        }
    }

    /// Push the current status of both stores to the page.
    pub fn push_status(&self) -> bool {
        let report = StatusReport::from_states(&self.bluetooth.get_state(), &self.wifi.get_state());
        self.bridge.push_status(&report)
    }

    /// Push status to the page whenever either store changes.
    ///
    /// The returned relay holds only weak references to the stores and the
    /// bridge; drop or [`StatusRelay::stop`] it to stop relaying.
    pub fn start_status_relay(&self) -> StatusRelay {
        let bluetooth_sub = {
            let wifi = Arc::downgrade(&self.wifi);
            let bridge = Arc::downgrade(&self.bridge);
            self.bluetooth.subscribe(Arc::new(move |bluetooth_state: &ConnectivityState<BluetoothDevice>| {
                let (Some(wifi), Some(bridge)) = (wifi.upgrade(), bridge.upgrade()) else {
                    return;
                };
                bridge.push_status(&StatusReport::from_states(bluetooth_state, &wifi.get_state()));
            }))
        };

        let wifi_sub = {
            let bluetooth: Weak<BluetoothStore> = Arc::downgrade(&self.bluetooth);
            let bridge = Arc::downgrade(&self.bridge);
            self.wifi.subscribe(Arc::new(move |wifi_state: &ConnectivityState<WifiNetwork>| {
                let (Some(bluetooth), Some(bridge)) = (bluetooth.upgrade(), bridge.upgrade()) else {
                    return;
                };
                bridge.push_status(&StatusReport::from_states(&bluetooth.get_state(), wifi_state));
            }))
        };

        debug!("Status relay started");
        StatusRelay {
            subscriptions: vec![bluetooth_sub, wifi_sub],
        }
    }

    fn spawn_scan<I, F>(&self, store: Arc<ConnectivityStore<I>>, publish: F)
    where
        I: Item,
        F: Fn(&[I]) -> bool + Send + 'static,
    {
        let log = self.log.clone();
        let bridge = self.bridge.clone();
        self.spawn(async move {
            let domain = store.domain();
            match store.scan(store.timings().scan_timeout).await {
                Ok(items) => {
                    info!("{} scan found {} {}(s)", domain, items.len(), domain.item_noun());
                    if publish(&items) {
                        log.record(
                            EntryKind::Outbound,
                            format!("Sent {} {} {}(s) to page", items.len(), domain, domain.item_noun()),
                        );
                    }
                }
                Err(e) => report_failure(&bridge, &log, &e),
            }
        });
    }

    fn spawn_connect<I: Item>(&self, store: Arc<ConnectivityStore<I>>, item: I, credentials: Option<String>) {
        let log = self.log.clone();
        let bridge = self.bridge.clone();
        self.spawn(async move {
            match store.connect(&item, credentials.as_deref()).await {
                Ok(outcome) => {
                    if let Some(e) = &outcome.previous_disconnect {
                        let text = format!("Could not disconnect from previous {}: {}", store.domain().item_noun(), e);
                        log.record(EntryKind::Error, text.clone());
                        bridge.send_message(&text);
                    }
                    let text = format!("Connected to {} {}", store.domain(), outcome.item.display_name());
                    log.record(EntryKind::Info, text.clone());
                    bridge.send_message(&text);
                }
                Err(e) => report_failure(&bridge, &log, &e),
            }
        });
    }

    fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(task);
            }
            Err(_) => {
                error!("No async runtime available for page request");
                self.report_error("Request could not be started");
            }
        }
    }

    fn report_error(&self, text: &str) {
        self.log.record(EntryKind::Error, format!("Error: {}", text));
        self.bridge.send_message(text);
    }
}

fn report_failure(bridge: &WebViewBridge, log: &ActivityLog, e: &ConnectivityError) {
    warn!("Page request failed: {}", e);
    log.record(EntryKind::Error, format!("Error: {}", e));
    bridge.send_message(&e.to_string());
}

/// Subscriptions that relay store changes to the page.
#[derive(Debug)]
pub struct StatusRelay {
    subscriptions: Vec<Subscription>,
}

impl StatusRelay {
    pub fn stop(&self) {
        for subscription in &self.subscriptions {
            subscription.unsubscribe();
        }
    }

    pub fn is_active(&self) -> bool {
        self.subscriptions.iter().any(Subscription::is_active)
    }
}

impl Drop for StatusRelay {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::RecordingTransport;
    use crate::connectivity::{AlwaysGranted, RadioTimings, SimulatedRadio};
    use std::time::Duration;

    struct Fixture {
        bridge: Arc<WebViewBridge>,
        transport: Arc<RecordingTransport>,
        bluetooth: Arc<BluetoothStore>,
        wifi: Arc<WifiStore>,
        processor: Arc<EventProcessor>,
    }

    fn fixture() -> Fixture {
        let timings = RadioTimings {
            scan_timeout: Duration::from_secs(1),
            ..RadioTimings::default()
        };
        let bt_radio = SimulatedRadio::new(vec![BluetoothDevice::new("AA", Some("Speaker"))])
            .with_interval(Duration::from_millis(100))
            .powered();
        let wifi_radio = SimulatedRadio::new(vec![
            WifiNetwork::new("Office", "aa:aa").with_capabilities("[WPA2-PSK]")
        ])
        .with_interval(Duration::from_millis(100))
        .powered()
        .with_secret("aa:aa", "secret");

        let bluetooth = BluetoothStore::new(Arc::new(bt_radio), Arc::new(AlwaysGranted), timings);
        let wifi = WifiStore::new(Arc::new(wifi_radio), Arc::new(AlwaysGranted), timings);
        let bridge = Arc::new(WebViewBridge::new());
        let transport = Arc::new(RecordingTransport::new());
        bridge.attach(transport.clone());
        let processor = EventProcessor::new(
            bridge.clone(),
            bluetooth.clone(),
            wifi.clone(),
            Arc::new(ActivityLog::new(32)),
        );
        processor.install();

        Fixture {
            bridge,
            transport,
            bluetooth,
            wifi,
            processor,
        }
    }

    async fn settle() {
        for _ in 0..50 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_install_registers_all_types() {
        let f = fixture();
        for kind in MessageKind::ALL {
            assert!(f.bridge.has_handler(kind.as_str()));
        }
    }

    #[tokio::test]
    async fn test_status_request_pushes_status() {
        let f = fixture();
        assert!(f.bridge.dispatch_incoming(r#"{"type":"getConnectionStatus"}"#));

        let scripts = f.transport.scripts();
        assert_eq!(scripts.len(), 1);
        assert!(scripts[0].contains("updateConnectionStatus(false, false, null, null)"));
        assert_eq!(f.processor.activity_log().len(), 1);
    }

    #[tokio::test]
    async fn test_page_message_is_logged() {
        let f = fixture();
        f.bridge.dispatch_incoming(r#"{"type":"message","content":"hello"}"#);
        let entries = f.processor.activity_log().entries();
        assert_eq!(entries[0].text, "Received from page: hello");
        assert!(f.transport.scripts().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_scan_request_publishes_list() {
        let f = fixture();
        f.bluetooth.enable().await.unwrap();

        f.bridge.dispatch_incoming(r#"{"type":"requestBluetoothScan"}"#);
        tokio::time::sleep(Duration::from_secs(2)).await;
        settle().await;

        let scripts = f.transport.scripts();
        assert!(scripts.iter().any(|s| s.contains("updateDeviceList([{")));
        assert_eq!(f.bluetooth.get_state().items.len(), 1);
    }

    #[tokio::test]
    async fn test_scan_failure_is_reported_to_page() {
        let f = fixture();
        // Store not enabled yet.
        f.bridge.dispatch_incoming(r#"{"type":"requestWifiScan"}"#);
        settle().await;

        let scripts = f.transport.scripts();
        assert_eq!(scripts.len(), 1);
        assert!(scripts[0].contains("receiveMessage(\"WiFi is not enabled"));
    }

    #[tokio::test]
    async fn test_unknown_device_reported() {
        let f = fixture();
        f.bridge
            .dispatch_incoming(r#"{"type":"connectToBluetoothDevice","deviceId":"nope"}"#);
        let scripts = f.transport.scripts();
        assert!(scripts[0].contains("Unknown Bluetooth device: nope"));

        f.bridge.dispatch_incoming(r#"{"type":"connectToBluetoothDevice"}"#);
        assert!(f.transport.scripts()[1].contains("missing 'deviceId'"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wifi_connect_request_and_relay() {
        let f = fixture();
        let relay = f.processor.start_status_relay();
        f.wifi.enable().await.unwrap();
        f.wifi.scan(Duration::from_secs(1)).await.unwrap();

        f.bridge.dispatch_incoming(
            r#"{"type":"connectToWifiNetwork","ssid":"Office","password":"secret"}"#,
        );
        settle().await;

        assert_eq!(
            f.wifi.get_state().connected_item.map(|n| n.ssid),
            Some("Office".to_string())
        );
        let scripts = f.transport.scripts();
        assert!(scripts
            .iter()
            .any(|s| s.contains("updateConnectionStatus(false, true, null, \"Office\")")));
        assert!(scripts.iter().any(|s| s.contains("Connected to WiFi Office")));

        relay.stop();
        assert!(!relay.is_active());
        assert_eq!(f.wifi.subscriber_count(), 0);
        assert_eq!(f.bluetooth.subscriber_count(), 0);
    }
}

//! Integration tests for the store and bridge flows.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use connectivity_bridge::bridge::RecordingTransport;
use connectivity_bridge::connectivity::{
    AlwaysGranted, ConnectedHandle, DiscoveryEvent, SimulatedRadio,
};
use connectivity_bridge::{
    BluetoothDevice, BluetoothStore, ConnectivityError, ConnectivityState, Domain, RadioAdapter,
    RadioError, RadioTimings, WebViewBridge, WifiNetwork, WifiStore,
};

/// Adapter that reports a fixed burst of devices and then ends discovery.
struct BurstRadio {
    burst: Vec<BluetoothDevice>,
}

#[async_trait]
impl RadioAdapter<BluetoothDevice> for BurstRadio {
    async fn is_enabled(&self) -> Result<bool, RadioError> {
        Ok(true)
    }

    async fn set_enabled(&self, _enabled: bool) -> Result<(), RadioError> {
        Ok(())
    }

    fn start_discovery(
        &self,
        events: mpsc::UnboundedSender<DiscoveryEvent<BluetoothDevice>>,
    ) -> Result<(), RadioError> {
        for device in &self.burst {
            let _ = events.send(DiscoveryEvent::Found(device.clone()));
        }
        Ok(())
    }

    fn stop_discovery(&self) {}

    async fn connect(
        &self,
        item: &BluetoothDevice,
        _credentials: Option<&str>,
    ) -> Result<ConnectedHandle, RadioError> {
        Ok(ConnectedHandle::new(item.id.clone()))
    }

    async fn disconnect(&self, _handle: &ConnectedHandle) -> Result<(), RadioError> {
        Ok(())
    }

    async fn current_connection(&self) -> Result<Option<ConnectedHandle>, RadioError> {
        Ok(None)
    }
}

fn device(id: &str) -> BluetoothDevice {
    BluetoothDevice::new(id, Some(id))
}

#[tokio::test(start_paused = true)]
async fn test_wifi_store_end_to_end() {
    let n1 = WifiNetwork::new("N1", "00:00:00:00:00:01").with_level(-40);
    let n2 = WifiNetwork::new("N2", "00:00:00:00:00:02")
        .with_capabilities("[WPA2-PSK-CCMP][ESS]")
        .with_level(-55);
    let radio = SimulatedRadio::new(vec![n1.clone(), n2.clone()])
        .with_interval(Duration::from_millis(200))
        .with_secret(n2.bssid.clone(), "secret");
    let store = WifiStore::new(Arc::new(radio), Arc::new(AlwaysGranted), RadioTimings::default());

    let seen: Arc<Mutex<Vec<ConnectivityState<WifiNetwork>>>> = Arc::new(Mutex::new(Vec::new()));
    let logger = seen.clone();
    let _sub = store.subscribe(Arc::new(move |state: &ConnectivityState<WifiNetwork>| {
        logger.lock().push(state.clone());
    }));

    assert!(store.enable().await.unwrap());
    {
        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].enabled);
        assert!(seen[0].items.is_empty());
        assert!(seen[0].connected_item.is_none());
    }

    let found = store.scan(Duration::from_millis(5000)).await.unwrap();
    assert_eq!(found, vec![n1.clone(), n2.clone()]);
    {
        let seen = seen.lock();
        let sizes: Vec<usize> = seen[1..].iter().map(|s| s.items.len()).collect();
        assert_eq!(sizes, vec![1, 2]);
        assert_eq!(seen.last().unwrap().items, vec![n1.clone(), n2.clone()]);
    }

    let connected = store.connect(&n2, Some("secret")).await.unwrap();
    assert_eq!(connected.item, n2);
    assert!(connected.previous_disconnect.is_none());
    let last = seen.lock().last().cloned().unwrap();
    assert_eq!(last.connected_item, Some(n2));
    assert_eq!(seen.lock().len(), 4);
}

#[test]
fn test_bridge_status_end_to_end() {
    let bridge = Arc::new(WebViewBridge::new());
    let transport = Arc::new(RecordingTransport::new());
    bridge.attach(transport.clone());

    let weak = Arc::downgrade(&bridge);
    bridge.register_handler("getConnectionStatus", move |_| {
        if let Some(bridge) = weak.upgrade() {
            bridge.push_connection_status(true, false, Some("DeviceX"), None);
        }
    });

    assert!(bridge.dispatch_incoming(r#"{"type":"getConnectionStatus"}"#));

    let scripts = transport.scripts();
    assert_eq!(scripts.len(), 1);
    for token in ["true", "false", "\"DeviceX\"", "null"] {
        assert!(scripts[0].contains(token), "missing {} in {}", token, scripts[0]);
    }
}

#[tokio::test]
async fn test_scan_dedups_repeated_discoveries() {
    let radio = BurstRadio {
        burst: vec![device("A"), device("B"), device("A"), device("C")],
    };
    let store = BluetoothStore::new(Arc::new(radio), Arc::new(AlwaysGranted), RadioTimings::default());
    store.enable().await.unwrap();

    // The burst adapter closes its channel, so the scan ends without waiting.
    let found = store.scan(Duration::from_secs(60)).await.unwrap();
    let ids: Vec<&str> = found.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["A", "B", "C"]);
    assert_eq!(store.get_state().items, found);
}

#[tokio::test(start_paused = true)]
async fn test_disable_during_scan_discards_results() {
    let radio = SimulatedRadio::new(vec![device("A"), device("B"), device("C")])
        .with_interval(Duration::from_millis(100));
    let store = BluetoothStore::new(Arc::new(radio), Arc::new(AlwaysGranted), RadioTimings::default());
    store.enable().await.unwrap();

    let scan = tokio::spawn({
        let store = store.clone();
        async move { store.scan(Duration::from_secs(5)).await }
    });
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(store.get_state().items.len(), 1);

    assert!(store.disable().await.unwrap());
    let result = scan.await.unwrap();
    assert_eq!(
        result,
        Err(ConnectivityError::ScanAborted {
            domain: Domain::Bluetooth
        })
    );

    tokio::time::sleep(Duration::from_secs(1)).await;
    let state = store.get_state();
    assert!(!state.enabled);
    assert!(state.items.is_empty());
    assert!(state.connected_item.is_none());
}

#[test]
fn test_untrusted_input_never_reaches_handlers() {
    let bridge = WebViewBridge::new();
    let calls = Arc::new(AtomicUsize::new(0));
    for message_type in ["getConnectionStatus", "message"] {
        let calls = calls.clone();
        bridge.register_handler(message_type, move |_| {
            calls.fetch_add(1, Ordering::SeqCst);
        });
    }

    assert!(!bridge.dispatch_incoming("not valid json"));
    assert!(!bridge.dispatch_incoming(r#"{"type":"unknownType"}"#));
    assert!(!bridge.dispatch_incoming(""));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_outbound_before_attach_returns_false() {
    let bridge = WebViewBridge::new();
    assert!(!bridge.send_message("hello"));
    assert!(!bridge.push_connection_status(true, false, Some("DeviceX"), None));

    let transport = Arc::new(RecordingTransport::new());
    bridge.attach(transport.clone());
    assert!(bridge.send_message("hello"));
    assert_eq!(transport.scripts().len(), 1);
}

#[tokio::test]
async fn test_subscribers_in_order_and_unsubscribe_is_idempotent() {
    let store = BluetoothStore::new(
        Arc::new(SimulatedRadio::new(vec![device("A")])),
        Arc::new(AlwaysGranted),
        RadioTimings::default(),
    );

    let order = Arc::new(Mutex::new(Vec::new()));
    let first = {
        let order = order.clone();
        store.subscribe(Arc::new(move |_: &ConnectivityState<BluetoothDevice>| {
            order.lock().push(1)
        }))
    };
    let _second = {
        let order = order.clone();
        store.subscribe(Arc::new(move |_: &ConnectivityState<BluetoothDevice>| {
            order.lock().push(2)
        }))
    };

    store.enable().await.unwrap();
    assert_eq!(*order.lock(), vec![1, 2]);

    first.unsubscribe();
    first.unsubscribe();
    store.disable().await.unwrap();
    assert_eq!(*order.lock(), vec![1, 2, 2]);
}

#[tokio::test]
async fn test_connect_requires_enabled_radio() {
    let store = BluetoothStore::new(
        Arc::new(SimulatedRadio::new(vec![device("A")])),
        Arc::new(AlwaysGranted),
        RadioTimings::default(),
    );
    let err = store.connect(&device("A"), None).await.unwrap_err();
    assert_eq!(err, ConnectivityError::Disabled { domain: Domain::Bluetooth });
    assert!(err.to_string().contains("enable Bluetooth first"));
}

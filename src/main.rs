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

//! Headless bridge host.
//!
//! Reads bridge messages from stdin, one JSON object per line, and writes the
//! scripts destined for the hosted page to stdout. Radios are simulated.

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use connectivity_bridge::bridge::StdoutTransport;
use connectivity_bridge::connectivity::{AlwaysGranted, SimulatedRadio};
use connectivity_bridge::{
    ActivityLog, BluetoothDevice, BluetoothStore, Config, EventProcessor, WebViewBridge,
    WifiNetwork, WifiStore,
};

fn demo_devices() -> Vec<BluetoothDevice> {
    vec![
        BluetoothDevice::new("5C:F3:70:8B:12:01", Some("Living Room Speaker")).with_rssi(-58),
        BluetoothDevice::new("A4:C1:38:22:9E:40", Some("Heart Rate Strap")).with_rssi(-71),
        BluetoothDevice::new("F0:99:B6:03:4D:7A", None).with_rssi(-88),
    ]
}

fn demo_networks() -> Vec<WifiNetwork> {
    vec![
        WifiNetwork::new("Office", "00:1a:2b:3c:4d:01")
            .with_capabilities("[WPA2-PSK-CCMP][ESS]")
            .with_level(-45),
        WifiNetwork::new("Guest", "00:1a:2b:3c:4d:02")
            .with_capabilities("[ESS]")
            .with_level(-63),
    ]
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries scripts for the page.
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("connectivity_bridge=info".parse()?),
        )
        .init();

    info!("Starting connectivity bridge v{}...", env!("CARGO_PKG_VERSION"));

    let config = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => {
            let config = Config::load_from(&path)?;
            std::fs::create_dir_all(&config.data_dir)?;
            config
        }
        None => Config::load()?,
    };
    info!("Configuration loaded");

    let bluetooth = BluetoothStore::new(
        Arc::new(SimulatedRadio::new(demo_devices()).powered()),
        Arc::new(AlwaysGranted),
        config.bluetooth.timings(),
    );
    let wifi = WifiStore::new(
        Arc::new(
            SimulatedRadio::new(demo_networks())
                .powered()
                .with_secret("00:1a:2b:3c:4d:01", "secret"),
        ),
        Arc::new(AlwaysGranted),
        config.wifi.timings(),
    );

    let bridge = Arc::new(WebViewBridge::new());
    if let Some(dir) = &config.bridge.content_dir {
        let page = bridge.set_extracted_content(&dir.to_string_lossy(), &config.bridge.main_page);
        info!("Serving {}", connectivity_bridge::bridge::file_url(&page).unwrap_or(page));
    }
    bridge.attach(Arc::new(StdoutTransport::stdout()));

    let log = Arc::new(ActivityLog::new(config.bridge.activity_log_capacity));
    let processor = EventProcessor::new(bridge.clone(), bluetooth.clone(), wifi.clone(), log.clone());
    processor.install();
    let relay = processor.start_status_relay();

    // Initial status check
    if let Err(e) = bluetooth.refresh().await {
        warn!("Could not read Bluetooth state: {}", e);
    }
    if let Err(e) = wifi.refresh().await {
        warn!("Could not read WiFi state: {}", e);
    }

    info!("Ready, reading bridge messages from stdin");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        bridge.dispatch_incoming(line);
                    }
                }
                Ok(None) => {
                    info!("Input closed");
                    break;
                }
                Err(e) => {
                    error!("Failed to read input: {}", e);
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    info!("Shutting down...");
    relay.stop();
    bluetooth.shutdown().await;
    wifi.shutdown().await;
    bridge.reset();

    if config.bridge.export_activity_on_exit && !log.is_empty() {
        if let Err(e) = log.export(&config.activity_export_path()) {
            error!("Failed to export activity log: {}", e);
        }
    }

    Ok(())
}

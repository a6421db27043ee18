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

//! Script injection backends.

use parking_lot::Mutex;
use serde_json::json;
use std::io::Write;
use tracing::debug;

use crate::error::TransportError;

/// Channel into the hosted page.
pub trait Transport: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &'static str;

    /// Evaluate `script` in the hosted page.
    fn inject_script(&self, script: &str) -> Result<(), TransportError>;
}

/// Writes each script to a line-oriented sink as `{"script": "..."}`.
///
/// Used by the headless host, where the page runtime reads stdout.
pub struct LineTransport<W: Write + Send> {
    writer: Mutex<W>,
    name: &'static str,
}

impl<W: Write + Send> LineTransport<W> {
    pub fn new(writer: W, name: &'static str) -> Self {
        Self {
            writer: Mutex::new(writer),
            name,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

/// [`LineTransport`] over the process stdout.
pub type StdoutTransport = LineTransport<std::io::Stdout>;

impl StdoutTransport {
    pub fn stdout() -> Self {
        LineTransport::new(std::io::stdout(), "stdout")
    }
}

impl<W: Write + Send> Transport for LineTransport<W> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn inject_script(&self, script: &str) -> Result<(), TransportError> {
        let line = json!({ "script": script }).to_string();
        let mut writer = self.writer.lock();
        writeln!(writer, "{}", line)?;
        writer.flush()?;
        debug!("Injected {} byte script via {}", script.len(), self.name);
        Ok(())
    }
}

/// Keeps every injected script in memory.
#[derive(Default)]
pub struct RecordingTransport {
    scripts: Mutex<Vec<String>>,
    closed: Mutex<bool>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scripts(&self) -> Vec<String> {
        self.scripts.lock().clone()
    }

    /// Make further injections fail as if the page went away.
    pub fn close(&self) {
        *self.closed.lock() = true;
    }
}

impl Transport for RecordingTransport {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn inject_script(&self, script: &str) -> Result<(), TransportError> {
        if *self.closed.lock() {
            return Err(TransportError::Closed);
        }
        self.scripts.lock().push(script.to_string());
        Ok(())
    }
}

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

//! Error types shared by the stores and the bridge.

use std::time::Duration;
use thiserror::Error;

use crate::connectivity::Domain;
use crate::state::Activity;

/// Errors reported by a radio adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RadioError {
    /// The platform does not allow this operation from inside the app.
    #[error("operation not supported programmatically on this platform")]
    Unsupported,

    /// The platform call failed.
    #[error("{0}")]
    Failed(String),
}

/// Why a connect attempt did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectFailure {
    #[error("no connection within {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Radio(#[from] RadioError),

    #[error("connection could not be verified")]
    NotVerified,
}

/// Errors returned by connectivity store actions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectivityError {
    #[error("could not enable {domain} ({reason}); please enable it manually in settings")]
    Unavailable { domain: Domain, reason: String },

    #[error("{domain} permissions are required for this operation")]
    PermissionDenied { domain: Domain },

    #[error("a {domain} scan is already in progress")]
    AlreadyScanning { domain: Domain },

    #[error("{domain} is busy ({activity})")]
    Busy { domain: Domain, activity: Activity },

    #[error("{domain} is not enabled; please enable {domain} first")]
    Disabled { domain: Domain },

    #[error("network '{network}' requires a password")]
    CredentialsRequired { network: String },

    #[error("failed to connect to {item}: {cause}")]
    Connection {
        item: String,
        #[source]
        cause: ConnectFailure,
    },

    #[error("please {action} manually in settings")]
    ManualActionRequired { domain: Domain, action: String },

    #[error("{domain} discovery failed: {reason}")]
    Discovery { domain: Domain, reason: String },

    #[error("{domain} scan was aborted because the radio was turned off")]
    ScanAborted { domain: Domain },

    #[error("{domain} radio error: {source}")]
    Radio {
        domain: Domain,
        #[source]
        source: RadioError,
    },
}

/// Errors raised by a bridge transport when injecting script.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The hosted page is gone (navigated away, reloaded or unmounted).
    #[error("hosted content is not available")]
    Closed,

    #[error("script rejected: {0}")]
    Rejected(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors raised while decoding inbound bridge traffic.
///
/// These are only ever logged; the bridge never hands them to a caller.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("malformed bridge message: {0}")]
    MalformedMessage(String),

    #[error("'{message_type}' message is missing '{field}'")]
    MissingField {
        message_type: String,
        field: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_action_messages() {
        let err = ConnectivityError::Unavailable {
            domain: Domain::Bluetooth,
            reason: "radio refused".to_string(),
        };
        assert!(err.to_string().contains("enable it manually"));

        let err = ConnectivityError::ManualActionRequired {
            domain: Domain::Wifi,
            action: "disconnect from the WiFi network".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "please disconnect from the WiFi network manually in settings"
        );
    }

    #[test]
    fn test_connection_error_keeps_cause() {
        use std::error::Error as _;

        let err = ConnectivityError::Connection {
            item: "Office".to_string(),
            cause: ConnectFailure::Radio(RadioError::Failed("auth rejected".to_string())),
        };
        assert!(err.to_string().contains("auth rejected"));
        assert!(err.source().is_some());
    }
}

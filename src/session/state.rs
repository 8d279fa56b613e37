use super::SessionError;
use crate::core::Network;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Error => "error",
        }
    }
}

/// Read-only view of the session handed to consumers.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub account: Option<String>,
    pub network: Option<Network>,
    pub connection_state: ConnectionState,
    pub last_error: Option<SessionError>,
    /// `None` when no chain is expected or the network is not known yet.
    pub on_expected_chain: Option<bool>,
}

impl SessionSnapshot {
    pub fn is_connected(&self) -> bool {
        self.connection_state == ConnectionState::Connected
    }

    /// Status line in the shape the connector widget shows.
    pub fn describe(&self) -> String {
        match (&self.account, self.connection_state) {
            (Some(account), ConnectionState::Connected) => {
                let network = self
                    .network
                    .as_ref()
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "Loading...".into());
                format!("Connected Account: {account} | Network: {network}")
            }
            (_, ConnectionState::Connecting) => "Connecting...".into(),
            _ => match &self.last_error {
                Some(error) => format!("Error: {}", error.message()),
                None => "Not connected".into(),
            },
        }
    }
}

use crate::provider::ProviderError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures surfaced to session consumers. None of them are fatal: the
/// session stays usable in `Disconnected`.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "reason")]
pub enum SessionError {
    #[error("no wallet provider detected")]
    ProviderUnavailable,
    #[error("connection rejected by user")]
    UserRejected,
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    /// The attempt resolved after a disconnect or provider notification had
    /// already moved the session on. Never recorded as `last_error`.
    #[error("connection attempt superseded")]
    Superseded,
}

impl SessionError {
    /// Text for the UI.
    pub fn message(&self) -> String {
        match self {
            SessionError::ProviderUnavailable => {
                "MetaMask is not installed. Please install it to use this DApp.".into()
            }
            SessionError::UserRejected => "Connection rejected by user.".into(),
            SessionError::ConnectionFailed(reason) => format!("Error connecting wallet: {reason}"),
            SessionError::Superseded => "Wallet changed while connecting. Please try again.".into(),
        }
    }
}

impl From<ProviderError> for SessionError {
    fn from(e: ProviderError) -> Self {
        if e.is_user_rejection() {
            SessionError::UserRejected
        } else {
            SessionError::ConnectionFailed(e.message)
        }
    }
}

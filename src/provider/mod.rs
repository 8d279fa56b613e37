//! WalletProvider - the injected wallet, behind a single-owner adapter
//!
//! The session manager is the only holder of a provider. Everything else reads
//! session state or borrows a [`Signer`].
//!
//! ```text
//! window.ethereum ──► InjectedProvider (wasm)  ─┐
//!                                               ├──► dyn WalletProvider ──► WalletSession
//! scripted tests  ──► MockProvider             ─┘
//! ```
//!
//! Error codes follow EIP-1193 / EIP-1474.

mod mock;
mod signer;

pub use mock::{ApprovalGate, MockProvider, MockSignerBackend};
pub use signer::{Signer, SignerBackend, SignerError, TransactionRequest};

use async_trait::async_trait;
use futures::channel::mpsc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// User rejected the request.
pub const USER_REJECTED: i64 = 4001;
/// The requested account/method has not been authorized.
pub const UNAUTHORIZED: i64 = 4100;
/// Provider is disconnected from all chains.
pub const DISCONNECTED: i64 = 4900;
/// Provider is not connected to the requested chain.
pub const CHAIN_DISCONNECTED: i64 = 4901;
/// A request of the same kind is already awaiting the user (MetaMask).
pub const REQUEST_PENDING: i64 = -32002;
pub const INTERNAL_ERROR: i64 = -32603;

#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("provider error {code}: {message}")]
pub struct ProviderError {
    pub code: i64,
    pub message: String,
}

impl ProviderError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    pub fn user_rejected() -> Self {
        Self::new(USER_REJECTED, "User rejected the request.")
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(INTERNAL_ERROR, message)
    }

    pub fn is_user_rejection(&self) -> bool {
        self.code == USER_REJECTED
    }
}

/// Notifications pushed by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ProviderEvent {
    AccountsChanged(Vec<String>),
    /// Raw chain id as emitted, usually a hex quantity.
    ChainChanged(String),
}

/// Capability surface of an injected wallet.
#[async_trait(?Send)]
pub trait WalletProvider {
    /// `eth_requestAccounts`. May wait on the user indefinitely.
    async fn request_accounts(&self) -> Result<Vec<String>, ProviderError>;

    /// `eth_chainId`
    async fn chain_id(&self) -> Result<u64, ProviderError>;

    /// Signing handle for `account` on `chain_id`.
    async fn signer(&self, account: &str, chain_id: u64) -> Result<Signer, ProviderError>;

    /// Attach listeners for `accountsChanged` / `chainChanged`. Every call
    /// attaches a fresh pair, so callers must guard against repeats.
    fn subscribe(&self) -> Result<mpsc::UnboundedReceiver<ProviderEvent>, ProviderError>;
}

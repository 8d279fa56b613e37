//! BitFrac: wallet session core for the BitFrac DApp.
//!
//! # Architecture
//!
//! ```text
//! window.ethereum / MockProvider
//!   │
//!   └── dyn WalletProvider (sole owner: WalletSession)
//!         │
//!         ├── connect / disconnect / handle_event
//!         ├── SessionSnapshot (account, network, state, last error)
//!         └── Signer (revoked when the session moves on)
//!               │
//!               └── dapp: presale registration, staking ledger, revenue claims
//! ```
//!
//! # Features
//!
//! - `native` - CLI, tokio runtime, file config, log subscriber
//! - `wasm` - browser bindings over the injected EIP-1193 provider
//!
//! # Usage
//!
//! ```ignore
//! use bitfrac::{MockProvider, SessionConfig, WalletSession};
//! use std::rc::Rc;
//!
//! let provider = Rc::new(MockProvider::new(["0xABC0000000000000000000000000000000000001"], 1));
//! let session = WalletSession::new(Some(provider), SessionConfig::new("bitfrac"));
//!
//! let snapshot = session.connect().await?;
//! let signer = session.signer().expect("connected");
//! ```

// =============================================================================
// Shared modules (compile everywhere)
// =============================================================================
pub mod config;
pub mod core;
pub mod dapp;
pub mod provider;
pub mod session;

// =============================================================================
// Native-only modules (CLI, log subscriber)
// =============================================================================
#[cfg(feature = "native")]
pub mod logging;

// =============================================================================
// WASM-only modules (browser, wasm-bindgen)
// =============================================================================
#[cfg(feature = "wasm")]
pub mod wasm;

// =============================================================================
// Re-exports
// =============================================================================
pub use config::{AppConfig, ContractAddresses, SessionConfig};
pub use core::{is_address, is_tx_hash, parse_chain_id, Network};
pub use provider::{
    MockProvider, ProviderError, ProviderEvent, Signer, SignerError, TransactionRequest,
    WalletProvider,
};
pub use session::{
    ChainChangePolicy, ConnectionState, EventPump, SessionError, SessionSnapshot, WalletSession,
};

#[cfg(feature = "wasm")]
pub use wasm::{InjectedProvider, JsWalletSession};

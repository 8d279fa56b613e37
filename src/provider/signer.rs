//! Signer - opaque signing handle handed out by a connected session.

use super::ProviderError;
use async_trait::async_trait;
use serde::{Serialize, Serializer};
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignerError {
    /// The session that issued this signer disconnected or moved to another
    /// account/chain.
    #[error("signer revoked: wallet session changed")]
    Revoked,
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Transaction in EIP-1193 `eth_sendTransaction` shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransactionRequest {
    pub from: String,
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "hex_quantity")]
    pub value: Option<u128>,
}

impl TransactionRequest {
    pub fn new(to: impl Into<String>) -> Self {
        Self { to: to.into(), ..Default::default() }
    }
    pub fn with_data(mut self, data: impl Into<String>) -> Self { self.data = Some(data.into()); self }
    pub fn with_value(mut self, wei: u128) -> Self { self.value = Some(wei); self }
}

fn hex_quantity<S: Serializer>(value: &Option<u128>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) => serializer.serialize_str(&format!("0x{v:x}")),
        None => serializer.serialize_none(),
    }
}

/// What actually talks to the wallet's signing UI.
#[async_trait(?Send)]
pub trait SignerBackend {
    /// `personal_sign`; `message` is the 0x-prefixed hex payload.
    async fn sign_message(&self, address: &str, message: &str) -> Result<String, ProviderError>;

    /// `eth_sendTransaction`, returns the transaction hash.
    async fn send_transaction(&self, tx: &TransactionRequest) -> Result<String, ProviderError>;
}

#[derive(Clone)]
pub struct Signer {
    address: String,
    chain_id: u64,
    backend: Rc<dyn SignerBackend>,
    revoked: Rc<Cell<bool>>,
}

impl Signer {
    pub fn new(address: impl Into<String>, chain_id: u64, backend: Rc<dyn SignerBackend>) -> Self {
        Self {
            address: address.into(),
            chain_id,
            backend,
            revoked: Rc::new(Cell::new(false)),
        }
    }

    pub fn address(&self) -> &str { &self.address }
    pub fn chain_id(&self) -> u64 { self.chain_id }
    pub fn is_valid(&self) -> bool { !self.revoked.get() }

    /// Invalidate this handle and every clone of it.
    pub(crate) fn revoke(&self) {
        self.revoked.set(true);
    }

    fn ensure_valid(&self) -> Result<(), SignerError> {
        if self.revoked.get() {
            return Err(SignerError::Revoked);
        }
        Ok(())
    }

    pub async fn sign_message(&self, message: &[u8]) -> Result<String, SignerError> {
        self.ensure_valid()?;
        let payload = format!("0x{}", hex::encode(message));
        let signature = self.backend.sign_message(&self.address, &payload).await?;
        // The session may have been torn down while the wallet UI was open.
        self.ensure_valid()?;
        Ok(signature)
    }

    /// Submits `tx` from this signer's account. `tx.from` is overwritten.
    pub async fn send_transaction(&self, mut tx: TransactionRequest) -> Result<String, SignerError> {
        self.ensure_valid()?;
        tx.from = self.address.clone();
        Ok(self.backend.send_transaction(&tx).await?)
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("address", &self.address)
            .field("chain_id", &self.chain_id)
            .field("valid", &self.is_valid())
            .finish()
    }
}

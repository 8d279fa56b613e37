//! Network descriptor resolved from the provider's chain id.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sepolia, the testnet the presale contracts are deployed on.
pub const SEPOLIA_CHAIN_ID: u64 = 11_155_111;

const UNKNOWN: &str = "unknown";

/// (chain id, name)
const KNOWN_CHAINS: &[(u64, &str)] = &[
    (1, "Ethereum"),
    (56, "BNB Smart Chain"),
    (137, "Polygon Mainnet"),
    (8453, "Base"),
    (42161, "Arbitrum One"),
    (59144, "Linea"),
    (SEPOLIA_CHAIN_ID, "Sepolia"),
];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChainIdError {
    #[error("empty chain id")]
    Empty,
    #[error("invalid chain id: {0}")]
    Invalid(String),
}

/// Chain the wallet is currently pointed at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Network {
    pub chain_id: u64,
    pub name: String,
}

impl Network {
    pub fn from_chain_id(chain_id: u64) -> Self {
        let name = KNOWN_CHAINS
            .iter()
            .find(|(id, _)| *id == chain_id)
            .map(|(_, name)| *name)
            .unwrap_or(UNKNOWN);
        Self { chain_id, name: name.to_string() }
    }

    pub fn is_known(&self) -> bool {
        self.name != UNKNOWN
    }

    /// Chain id as an EIP-1193 hex quantity (`0xaa36a7`).
    pub fn hex_chain_id(&self) -> String {
        format!("0x{:x}", self.chain_id)
    }
}

/// Every chain with a display name, in table order.
pub fn known_networks() -> Vec<Network> {
    KNOWN_CHAINS.iter().map(|(id, _)| Network::from_chain_id(*id)).collect()
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (Chain ID: {})", self.name, self.chain_id)
    }
}

/// Parse a chain id as emitted by `chainChanged` / `eth_chainId` (hex quantity),
/// falling back to plain decimal.
pub fn parse_chain_id(raw: &str) -> Result<u64, ChainIdError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ChainIdError::Empty);
    }
    let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(digits) if !digits.is_empty() => u64::from_str_radix(digits, 16),
        Some(_) => return Err(ChainIdError::Invalid(raw.to_string())),
        None => raw.parse::<u64>(),
    };
    parsed.map_err(|_| ChainIdError::Invalid(raw.to_string()))
}

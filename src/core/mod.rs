//! Core types shared by every target.

pub mod address;
pub mod network;

pub use address::{is_address, is_tx_hash, short_address};
pub use network::{known_networks, parse_chain_id, ChainIdError, Network, SEPOLIA_CHAIN_ID};

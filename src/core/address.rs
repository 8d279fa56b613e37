//! Shape checks for account addresses and transaction hashes.

use once_cell::sync::Lazy;
use regex::Regex;

static ADDRESS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^0[xX][0-9a-fA-F]{40}$").unwrap());
static TX_HASH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^0[xX][0-9a-fA-F]{64}$").unwrap());

/// `0x` followed by 40 hex digits. Checksum casing is not verified.
pub fn is_address(value: &str) -> bool {
    ADDRESS_RE.is_match(value)
}

pub fn is_tx_hash(value: &str) -> bool {
    TX_HASH_RE.is_match(value)
}

/// `0xAbCd…1234` for log lines and status messages.
pub fn short_address(address: &str) -> String {
    if address.len() <= 12 || !address.is_ascii() {
        return address.to_string();
    }
    format!("{}…{}", &address[..6], &address[address.len() - 4..])
}

//! Presale - payment method listing and investment registration
//!
//! Investors send BTC/ETH/XRP/DOGE/USDT to the presale payment addresses by
//! hand, then register the payment on-chain with
//! `registerInvestment(currency, txHash, amount)`, where `amount` is in the
//! currency's smallest unit (satoshis, wei, ...).

use super::units::{parse_units, UnitsError};
use crate::core::is_tx_hash;
use crate::provider::Signer;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const REGISTER_INVESTMENT: &str = "registerInvestment";
pub const GET_SUPPORTED_PAYMENT_METHODS: &str = "getSupportedPaymentMethods";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PresaleError {
    #[error("Please connect your wallet.")]
    NotConnected,
    #[error("Wallet session changed, please reconnect.")]
    SignerRevoked,
    #[error("unsupported currency: {0}")]
    UnknownCurrency(String),
    #[error("invalid amount: {0}")]
    InvalidAmount(#[from] UnitsError),
    #[error("amount must be greater than zero")]
    ZeroAmount,
    #[error("invalid transaction hash: {0}")]
    InvalidTxHash(String),
    #[error("payment methods mismatch: {currencies} currencies, {addresses} addresses")]
    MismatchedPaymentMethods { currencies: usize, addresses: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    #[serde(rename = "BTC")]
    Btc,
    #[serde(rename = "ETH")]
    Eth,
    #[serde(rename = "USDT_on_ETH")]
    UsdtOnEth,
    #[serde(rename = "XRP")]
    Xrp,
    #[serde(rename = "DOGE")]
    Doge,
    #[serde(rename = "USDT")]
    Usdt,
}

impl Currency {
    pub const ALL: [Currency; 6] = [
        Currency::Btc,
        Currency::Eth,
        Currency::UsdtOnEth,
        Currency::Xrp,
        Currency::Doge,
        Currency::Usdt,
    ];

    /// Symbol the presale contract keys payments by.
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::Btc => "BTC",
            Currency::Eth => "ETH",
            Currency::UsdtOnEth => "USDT_on_ETH",
            Currency::Xrp => "XRP",
            Currency::Doge => "DOGE",
            Currency::Usdt => "USDT",
        }
    }

    /// Decimals of the smallest unit the contract expects.
    pub fn decimals(&self) -> u8 {
        match self {
            Currency::Btc | Currency::Doge => 8,
            Currency::Eth => 18,
            Currency::UsdtOnEth | Currency::Xrp | Currency::Usdt => 6,
        }
    }
}

impl FromStr for Currency {
    type Err = PresaleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Currency::ALL
            .into_iter()
            .find(|c| c.symbol().eq_ignore_ascii_case(s))
            .ok_or_else(|| PresaleError::UnknownCurrency(s.to_string()))
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub currency: String,
    pub address: String,
}

/// Zip the two parallel arrays returned by `getSupportedPaymentMethods`.
pub fn payment_methods(
    currencies: Vec<String>,
    addresses: Vec<String>,
) -> Result<Vec<PaymentMethod>, PresaleError> {
    if currencies.len() != addresses.len() {
        return Err(PresaleError::MismatchedPaymentMethods {
            currencies: currencies.len(),
            addresses: addresses.len(),
        });
    }
    Ok(currencies
        .into_iter()
        .zip(addresses)
        .map(|(currency, address)| PaymentMethod { currency, address })
        .collect())
}

/// A validated `registerInvestment` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentRegistration {
    pub investor: String,
    pub currency: Currency,
    pub tx_hash: String,
    /// Smallest unit of `currency`.
    pub amount: u128,
}

impl InvestmentRegistration {
    pub fn prepare(
        signer: Option<&Signer>,
        currency: &str,
        amount: &str,
        tx_hash: &str,
    ) -> Result<Self, PresaleError> {
        let signer = signer.ok_or(PresaleError::NotConnected)?;
        if !signer.is_valid() {
            return Err(PresaleError::SignerRevoked);
        }
        let currency: Currency = currency.parse()?;
        let amount = parse_units(amount, currency.decimals())?;
        if amount == 0 {
            return Err(PresaleError::ZeroAmount);
        }
        let tx_hash = tx_hash.trim();
        if !is_tx_hash(tx_hash) {
            return Err(PresaleError::InvalidTxHash(tx_hash.to_string()));
        }
        Ok(Self {
            investor: signer.address().to_string(),
            currency,
            tx_hash: tx_hash.to_string(),
            amount,
        })
    }

    /// Call arguments; the amount is a decimal string since it exceeds JS numbers.
    pub fn args(&self) -> Value {
        json!([self.currency.symbol(), self.tx_hash, self.amount.to_string()])
    }
}

//! Revenue - protocol revenue pools and per-holder claims
//!
//! Revenue is distributed in a stablecoin (USDC, 6 decimals) against a token
//! snapshot. Holders at or above the minimum BFT balance can claim their share
//! of each `Claimable` pool once.

use super::units::format_units;
use crate::provider::Signer;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const STABLECOIN_SYMBOL: &str = "USDC";
pub const STABLECOIN_DECIMALS: u8 = 6;
pub const BFT_DECIMALS: u8 = 18;
/// 1000 BFT in base units.
pub const MIN_TOKENS_FOR_REVENUE: u128 = 1_000 * 10u128.pow(BFT_DECIMALS as u32);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RevenueError {
    #[error("Please connect your wallet.")]
    NotConnected,
    #[error("Wallet session changed, please reconnect.")]
    SignerRevoked,
    #[error("holding {balance} BFT base units, {minimum} required for revenue")]
    BelowThreshold { balance: u128, minimum: u128 },
    #[error("revenue pool not found: {0}")]
    PoolNotFound(String),
    #[error("revenue from pool {0} already claimed")]
    AlreadyClaimed(String),
    #[error("revenue pool {id} is {status:?}, not claimable")]
    NotClaimable { id: String, status: PoolStatus },
    #[error("nothing to claim from pool {0}")]
    NothingToClaim(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolStatus {
    Active,
    Claimable,
    Claimed,
    Ended,
}

/// One distribution round. Amounts are stablecoin base units.
#[derive(Debug, Clone, PartialEq)]
pub struct RevenuePool {
    pub id: String,
    pub status: PoolStatus,
    pub total_amount: u128,
    pub user_claimable: u128,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub snapshot_id: u64,
    /// BFT base units eligible at the snapshot.
    pub total_eligible_tokens: u128,
    pub has_user_claimed: bool,
}

impl RevenuePool {
    pub fn is_claimable(&self) -> bool {
        self.status == PoolStatus::Claimable && !self.has_user_claimed && self.user_claimable > 0
    }

    /// "75.2 USDC"
    pub fn display_claimable(&self) -> String {
        format!("{} {}", format_units(self.user_claimable, STABLECOIN_DECIMALS), STABLECOIN_SYMBOL)
    }
}

/// Revenue view for the connected holder.
#[derive(Debug, Clone)]
pub struct RevenueLedger {
    pub token_balance: u128,
    pub min_tokens: u128,
    pub total_claimed: u128,
    pub pools: Vec<RevenuePool>,
}

impl RevenueLedger {
    pub fn new(token_balance: u128, pools: Vec<RevenuePool>) -> Self {
        Self {
            token_balance,
            min_tokens: MIN_TOKENS_FOR_REVENUE,
            total_claimed: 0,
            pools,
        }
    }

    pub fn with_total_claimed(mut self, total_claimed: u128) -> Self {
        self.total_claimed = total_claimed;
        self
    }

    pub fn is_eligible(&self) -> bool {
        self.token_balance >= self.min_tokens
    }

    pub fn eligible_pools(&self) -> usize {
        self.pools.iter().filter(|p| p.is_claimable()).count()
    }

    pub fn pool(&self, id: &str) -> Option<&RevenuePool> {
        self.pools.iter().find(|p| p.id == id)
    }

    /// Claim the holder's share of `pool_id`. Returns the amount claimed.
    pub fn claim(&mut self, signer: Option<&Signer>, pool_id: &str) -> Result<u128, RevenueError> {
        match signer {
            None => return Err(RevenueError::NotConnected),
            Some(signer) if !signer.is_valid() => return Err(RevenueError::SignerRevoked),
            Some(_) => {}
        }
        if !self.is_eligible() {
            return Err(RevenueError::BelowThreshold {
                balance: self.token_balance,
                minimum: self.min_tokens,
            });
        }

        let pool = self
            .pools
            .iter_mut()
            .find(|p| p.id == pool_id)
            .ok_or_else(|| RevenueError::PoolNotFound(pool_id.to_string()))?;
        if pool.has_user_claimed || pool.status == PoolStatus::Claimed {
            return Err(RevenueError::AlreadyClaimed(pool.id.clone()));
        }
        if pool.status != PoolStatus::Claimable {
            return Err(RevenueError::NotClaimable { id: pool.id.clone(), status: pool.status });
        }
        if pool.user_claimable == 0 {
            return Err(RevenueError::NothingToClaim(pool.id.clone()));
        }

        let amount = pool.user_claimable;
        pool.has_user_claimed = true;
        pool.status = PoolStatus::Claimed;
        self.total_claimed += amount;
        tracing::info!(pool = %pool.id, amount = %pool.display_claimable(), "revenue claimed");
        Ok(amount)
    }
}

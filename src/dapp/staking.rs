//! Staking - lock tiers, reward estimates, and a local stake ledger
//!
//! Rewards accrue linearly: `amount * apy / 100 / 365 * days`. The ledger
//! mirrors the staking page flow: spend approval, stake, wait out the lock,
//! unstake and claim.

use crate::provider::Signer;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StakingError {
    #[error("Please connect wallet.")]
    NotConnected,
    #[error("Please enter a valid amount to stake.")]
    InvalidAmount,
    #[error("Insufficient BFT balance.")]
    InsufficientBalance,
    #[error("unsupported staking duration: {0} days")]
    UnknownDuration(u32),
    #[error("Please approve BFT spending for the staking contract.")]
    ApprovalRequired,
    #[error("stake not found: {0}")]
    NotFound(String),
    #[error("stake locked until {0}")]
    Locked(DateTime<Utc>),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StakingTier {
    pub days: u32,
    pub label: &'static str,
    /// Percent per year.
    pub apy: f64,
}

pub const TIERS: [StakingTier; 4] = [
    StakingTier { days: 30, label: "30 Days", apy: 5.0 },
    StakingTier { days: 90, label: "90 Days", apy: 7.5 },
    StakingTier { days: 180, label: "180 Days", apy: 10.0 },
    StakingTier { days: 365, label: "1 Year", apy: 15.0 },
];

pub const MIN_STAKING_DAYS: u32 = 30;

pub fn tier(days: u32) -> Option<&'static StakingTier> {
    TIERS.iter().find(|t| t.days == days)
}

fn daily_rate(apy: f64) -> f64 {
    apy / 100.0 / 365.0
}

/// Reward for holding `amount` over a full `days` lock.
pub fn estimate_reward(amount: f64, days: u32) -> Result<f64, StakingError> {
    let tier = tier(days).ok_or(StakingError::UnknownDuration(days))?;
    if !amount.is_finite() || amount <= 0.0 {
        return Err(StakingError::InvalidAmount);
    }
    Ok(amount * daily_rate(tier.apy) * days as f64)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stake {
    pub id: String,
    pub amount: f64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_days: u32,
    pub apy: f64,
}

impl Stake {
    pub fn open(id: impl Into<String>, amount: f64, tier: &StakingTier, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            amount,
            start_time: now,
            end_time: now + Duration::days(tier.days as i64),
            duration_days: tier.days,
            apy: tier.apy,
        }
    }

    /// Rewards earned since `start_time`, never negative.
    pub fn accrued_rewards(&self, now: DateTime<Utc>) -> f64 {
        let elapsed_ms = (now - self.start_time).num_milliseconds().max(0) as f64;
        let elapsed_days = elapsed_ms / Duration::days(1).num_milliseconds() as f64;
        self.amount * daily_rate(self.apy) * elapsed_days
    }

    pub fn can_unstake(&self, now: DateTime<Utc>) -> bool {
        self.end_time <= now
    }
}

/// BFT balance and open stakes for the connected account.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StakingLedger {
    pub balance: f64,
    pub total_staked: f64,
    pub stakes: Vec<Stake>,
    #[serde(skip)]
    approved: bool,
    #[serde(skip)]
    next_id: u64,
}

impl StakingLedger {
    pub fn new(balance: f64) -> Self {
        Self { balance, ..Default::default() }
    }

    pub fn is_approved(&self) -> bool { self.approved }

    /// Grant the staking contract an allowance. Consumed by the next stake.
    pub fn approve(&mut self, signer: Option<&Signer>) -> Result<(), StakingError> {
        require_signer(signer)?;
        self.approved = true;
        Ok(())
    }

    pub fn stake(
        &mut self,
        signer: Option<&Signer>,
        amount: f64,
        days: u32,
        now: DateTime<Utc>,
    ) -> Result<&Stake, StakingError> {
        require_signer(signer)?;
        if !amount.is_finite() || amount <= 0.0 {
            return Err(StakingError::InvalidAmount);
        }
        if amount > self.balance {
            return Err(StakingError::InsufficientBalance);
        }
        let tier = tier(days).ok_or(StakingError::UnknownDuration(days))?;
        if !self.approved {
            return Err(StakingError::ApprovalRequired);
        }

        self.approved = false;
        self.balance -= amount;
        self.total_staked += amount;
        self.next_id += 1;
        let stake = Stake::open(format!("stake{}", self.next_id), amount, tier, now);
        tracing::info!(id = %stake.id, amount, days, "staked");
        self.stakes.insert(0, stake);
        Ok(&self.stakes[0])
    }

    /// Close a matured stake. Returns it with the rewards claimed.
    pub fn unstake(&mut self, id: &str, now: DateTime<Utc>) -> Result<(Stake, f64), StakingError> {
        let index = self
            .stakes
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| StakingError::NotFound(id.to_string()))?;
        if !self.stakes[index].can_unstake(now) {
            return Err(StakingError::Locked(self.stakes[index].end_time));
        }
        let stake = self.stakes.remove(index);
        let rewards = stake.accrued_rewards(now);
        self.balance += stake.amount;
        self.total_staked -= stake.amount;
        tracing::info!(id = %stake.id, rewards, "unstaked");
        Ok((stake, rewards))
    }
}

fn require_signer(signer: Option<&Signer>) -> Result<(), StakingError> {
    match signer {
        Some(signer) if signer.is_valid() => Ok(()),
        _ => Err(StakingError::NotConnected),
    }
}

//! DApp helpers consumed by the presale, staking and revenue pages. They only need a
//! [`Signer`](crate::provider::Signer) from a connected session.

pub mod presale;
pub mod revenue;
pub mod staking;
pub mod units;

pub use presale::{payment_methods, Currency, InvestmentRegistration, PaymentMethod, PresaleError};
pub use revenue::{PoolStatus, RevenueError, RevenueLedger, RevenuePool, MIN_TOKENS_FOR_REVENUE, STABLECOIN_DECIMALS};
pub use staking::{estimate_reward, Stake, StakingError, StakingLedger, StakingTier, TIERS};
pub use units::{format_units, parse_units, UnitsError};

//! DApp Tests: presale, staking and revenue flows on top of a live session
//!
//! The helpers only ever see the signer the session hands out, so a session
//! change must make them refuse to act.

use bitfrac::dapp::{
    estimate_reward, parse_units, payment_methods, Currency, InvestmentRegistration, PoolStatus,
    PresaleError, RevenueError, RevenueLedger, RevenuePool, StakingError, StakingLedger,
    MIN_TOKENS_FOR_REVENUE, STABLECOIN_DECIMALS,
};
use bitfrac::{MockProvider, SessionConfig, TransactionRequest, WalletSession};
use chrono::{Duration, Utc};
use futures::executor::block_on;
use std::rc::Rc;

const INVESTOR: &str = "0xABC0000000000000000000000000000000000001";
const PRESALE: &str = "0x1111111111111111111111111111111111111111";

fn connected() -> (Rc<MockProvider>, WalletSession) {
    let provider = Rc::new(MockProvider::new([INVESTOR], 11_155_111));
    let session = WalletSession::new(Some(provider.clone()), SessionConfig::new("bitfrac-test"));
    block_on(session.connect()).expect("connect");
    (provider, session)
}

fn tx_hash() -> String {
    format!("0x{}", "c0".repeat(32))
}

/// Test: register a BTC payment with the connected account
#[test]
fn presale_registration_uses_session_signer() {
    let (_provider, session) = connected();
    let signer = session.signer();

    let registration =
        InvestmentRegistration::prepare(signer.as_ref(), "DOGE", "1500", &tx_hash()).expect("prepare");
    assert_eq!(registration.investor, INVESTOR);
    assert_eq!(registration.currency, Currency::Doge);
    assert_eq!(registration.amount, 150_000_000_000);

    let json = serde_json::to_value(&registration).unwrap();
    assert_eq!(json["currency"], "DOGE");
    assert_eq!(json["txHash"], tx_hash());
}

/// Test: helpers refuse a signer from a session that moved on
#[test]
fn disconnect_invalidates_held_signer() {
    let (_provider, session) = connected();
    let signer = session.signer().expect("signer");
    session.disconnect();

    assert_eq!(
        InvestmentRegistration::prepare(Some(&signer), "ETH", "1", &tx_hash()),
        Err(PresaleError::SignerRevoked)
    );
    assert_eq!(
        InvestmentRegistration::prepare(session.signer().as_ref(), "ETH", "1", &tx_hash()),
        Err(PresaleError::NotConnected)
    );

    let mut ledger = StakingLedger::new(1_000.0);
    assert_eq!(ledger.approve(Some(&signer)), Err(StakingError::NotConnected));
}

/// Test: ETH purchase goes out from the connected account
#[test]
fn payment_transaction_is_sent_from_account() {
    let (provider, session) = connected();
    let signer = session.signer().expect("signer");
    let value = parse_units("0.25", Currency::Eth.decimals()).expect("units");

    let hash = block_on(signer.send_transaction(TransactionRequest::new(PRESALE).with_value(value)))
        .expect("send");
    assert!(bitfrac::is_tx_hash(&hash));

    let sent = provider.backend().sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].from, INVESTOR);
    assert_eq!(sent[0].value, Some(250_000_000_000_000_000));
}

/// Test: supported payment methods pair up by index
#[test]
fn payment_methods_from_contract_arrays() {
    let methods = payment_methods(
        vec!["BTC".into(), "USDT_on_ETH".into()],
        vec!["bc1qpresale".into(), PRESALE.into()],
    )
    .expect("methods");
    assert_eq!(methods.len(), 2);
    assert_eq!(methods[1].currency.parse::<Currency>(), Ok(Currency::UsdtOnEth));
}

/// Test: full staking cycle with the session signer
#[test]
fn staking_cycle() {
    let (_provider, session) = connected();
    let signer = session.signer();
    let now = Utc::now();
    let mut ledger = StakingLedger::new(25_000.0);

    ledger.approve(signer.as_ref()).expect("approve");
    let id = ledger.stake(signer.as_ref(), 10_000.0, 365, now).expect("stake").id.clone();

    let stake = &ledger.stakes[0];
    assert_eq!(stake.duration_days, 365);
    assert!((stake.accrued_rewards(now + Duration::days(73)) - 300.0).abs() < 1e-6);

    let (_, rewards) = ledger.unstake(&id, now + Duration::days(365)).expect("unstake");
    assert!((rewards - estimate_reward(10_000.0, 365).unwrap()).abs() < 1e-6);
    assert!((rewards - 1_500.0).abs() < 1e-6);
    assert!((ledger.balance - 25_000.0).abs() < 1e-9);
}

/// Test: revenue claim with the session signer, refused once the session moves on
#[test]
fn revenue_claim_follows_session() {
    let (provider, session) = connected();
    let now = Utc::now();
    let pool = |id: &str, status, share: &str| RevenuePool {
        id: id.to_string(),
        status,
        total_amount: parse_units("12000", STABLECOIN_DECIMALS).unwrap(),
        user_claimable: parse_units(share, STABLECOIN_DECIMALS).unwrap(),
        start_time: now - Duration::days(14),
        end_time: now - Duration::days(7),
        snapshot_id: 95,
        total_eligible_tokens: 2_200_000,
        has_user_claimed: false,
    };
    let mut ledger = RevenueLedger::new(
        MIN_TOKENS_FOR_REVENUE,
        vec![pool("7", PoolStatus::Claimable, "50.30"), pool("8", PoolStatus::Claimable, "1.5")],
    );
    assert_eq!(ledger.eligible_pools(), 2);

    let signer = session.signer().expect("signer");
    assert_eq!(ledger.claim(Some(&signer), "7"), Ok(50_300_000));
    assert_eq!(ledger.eligible_pools(), 1);

    // Account switch revokes the held signer.
    let mut pump = session.event_pump().expect("pump");
    provider.emit_accounts_changed(["0xABC0000000000000000000000000000000000002"]);
    block_on(pump.drain());
    assert_eq!(ledger.claim(Some(&signer), "8"), Err(RevenueError::SignerRevoked));

    session.disconnect();
    assert_eq!(ledger.claim(session.signer().as_ref(), "8"), Err(RevenueError::NotConnected));
    assert_eq!(ledger.total_claimed, 50_300_000);
}

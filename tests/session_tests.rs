//! Session Tests: wallet connection lifecycle against a scripted provider
//!
//! These tests verify:
//! 1. connect/disconnect round trip and snapshot contents
//! 2. Concurrent connects share one authorization request
//! 3. accountsChanged / chainChanged handling through the event pump
//! 4. Stale attempts never resurrect or overwrite newer state
//! 5. Provider listeners are registered once
//! 6. connect() joins a notification-driven re-derivation instead of asking again

use bitfrac::provider::ProviderError;
use bitfrac::{
    ConnectionState, MockProvider, ProviderEvent, SessionConfig, SessionError, SignerError,
    WalletSession,
};
use futures::executor::block_on;
use futures::join;
use std::cell::Cell;
use std::rc::Rc;

const ALICE: &str = "0xABC0000000000000000000000000000000000001";
const BOB: &str = "0xABC0000000000000000000000000000000000002";
const SEPOLIA: u64 = 11_155_111;

fn setup() -> (Rc<MockProvider>, WalletSession) {
    let provider = Rc::new(MockProvider::new([ALICE], SEPOLIA));
    let config = SessionConfig::new("bitfrac-test").with_expected_chain(SEPOLIA);
    let session = WalletSession::new(Some(provider.clone()), config);
    (provider, session)
}

/// Test: connect reports the authorized account and network
#[test]
fn connect_reports_account_and_network() {
    let (provider, session) = setup();
    assert_eq!(session.state(), ConnectionState::Disconnected);

    let snapshot = block_on(session.connect()).expect("connect");
    assert_eq!(snapshot.account.as_deref(), Some(ALICE));
    let network = snapshot.network.expect("network");
    assert_eq!(network.chain_id, SEPOLIA);
    assert_eq!(network.name, "Sepolia");
    assert_eq!(snapshot.connection_state, ConnectionState::Connected);
    assert_eq!(snapshot.on_expected_chain, Some(true));
    assert!(snapshot.last_error.is_none());

    let signer = session.signer().expect("signer");
    assert_eq!(signer.address(), ALICE);
    assert_eq!(signer.chain_id(), SEPOLIA);
    assert_eq!(provider.account_requests(), 1);
}

/// Test: disconnect clears everything and revokes the signer
#[test]
fn disconnect_round_trip() {
    let (_provider, session) = setup();
    block_on(session.connect()).expect("connect");
    let signer = session.signer().expect("signer");

    session.disconnect();
    let snapshot = session.snapshot();
    assert_eq!(snapshot.connection_state, ConnectionState::Disconnected);
    assert!(snapshot.account.is_none());
    assert!(snapshot.network.is_none());
    assert!(snapshot.last_error.is_none());
    assert!(session.signer().is_none());
    assert_eq!(block_on(signer.sign_message(b"late")), Err(SignerError::Revoked));

    // Idempotent
    session.disconnect();
    assert_eq!(session.state(), ConnectionState::Disconnected);
}

/// Test: two connects while the wallet popup is open share one request
#[test]
fn concurrent_connects_share_one_request() {
    let (provider, session) = setup();
    let gate = provider.hold_approval();

    let (first, second, _) = block_on(async {
        join!(session.connect(), session.connect(), async {
            assert_eq!(session.state(), ConnectionState::Connecting);
            gate.approve();
        })
    });

    assert_eq!(first.expect("first").account.as_deref(), Some(ALICE));
    assert_eq!(second.expect("second").account.as_deref(), Some(ALICE));
    assert_eq!(provider.account_requests(), 1);
    assert_eq!(provider.signers_issued(), 1);
}

/// Test: connect while already connected does not touch the provider
#[test]
fn connect_when_connected_is_a_no_op() {
    let (provider, session) = setup();
    block_on(session.connect()).expect("connect");
    let again = block_on(session.connect()).expect("connect again");
    assert_eq!(again.account.as_deref(), Some(ALICE));
    assert_eq!(provider.account_requests(), 1);
    assert_eq!(provider.chain_queries(), 1);
}

/// Test: user rejection lands in Disconnected with UserRejected
#[test]
fn rejection_sets_user_rejected() {
    let (provider, session) = setup();
    provider.reject_next();

    assert_eq!(block_on(session.connect()), Err(SessionError::UserRejected));
    let snapshot = session.snapshot();
    assert_eq!(snapshot.connection_state, ConnectionState::Disconnected);
    assert_eq!(snapshot.last_error, Some(SessionError::UserRejected));
    assert!(snapshot.account.is_none());
    assert!(session.signer().is_none());
    assert_eq!(provider.signers_issued(), 0);

    // Next attempt succeeds and clears the error.
    block_on(session.connect()).expect("retry");
    assert!(session.snapshot().last_error.is_none());
}

/// Test: missing provider fails fast with ProviderUnavailable
#[test]
fn missing_provider_is_unavailable() {
    let session = WalletSession::unavailable(SessionConfig::default());
    assert!(!session.has_provider());

    assert_eq!(block_on(session.connect()), Err(SessionError::ProviderUnavailable));
    let snapshot = session.snapshot();
    assert_eq!(snapshot.connection_state, ConnectionState::Disconnected);
    assert_eq!(snapshot.last_error, Some(SessionError::ProviderUnavailable));
    assert!(session.event_pump().is_none());
}

/// Test: provider faults surface as ConnectionFailed
#[test]
fn provider_fault_is_connection_failed() {
    let (provider, session) = setup();
    provider.fail_next(ProviderError::internal("wallet crashed"));
    assert!(matches!(block_on(session.connect()), Err(SessionError::ConnectionFailed(_))));
    assert_eq!(session.state(), ConnectionState::Disconnected);

    let empty = Rc::new(MockProvider::new(Vec::<String>::new(), 1));
    let session = WalletSession::new(Some(empty), SessionConfig::default());
    assert!(matches!(block_on(session.connect()), Err(SessionError::ConnectionFailed(_))));
    assert!(session.account().is_none());
}

/// Test: disconnect during a pending approval is not undone by the approval
#[test]
fn disconnect_during_pending_connect_is_final() {
    let (provider, session) = setup();
    let gate = provider.hold_approval();

    let (result, _) = block_on(async {
        join!(session.connect(), async {
            session.disconnect();
            gate.approve();
        })
    });

    assert_eq!(result, Err(SessionError::Superseded));
    let snapshot = session.snapshot();
    assert_eq!(snapshot.connection_state, ConnectionState::Disconnected);
    assert!(snapshot.account.is_none());
    assert!(snapshot.last_error.is_none());
    assert!(session.signer().is_none());
    assert_eq!(provider.subscriptions(), 0);
}

/// Test: a newer accountsChanged wins over an older pending approval
#[test]
fn notification_outranks_stale_approval() {
    let (provider, session) = setup();
    let gate = provider.hold_approval();

    let (result, _) = block_on(async {
        join!(session.connect(), async {
            session.handle_event(ProviderEvent::AccountsChanged(vec![BOB.into()])).await;
            gate.approve();
        })
    });

    let snapshot = result.expect("session is connected");
    assert_eq!(snapshot.account.as_deref(), Some(BOB));
    assert_eq!(session.account().as_deref(), Some(BOB));
    assert_eq!(session.signer().expect("signer").address(), BOB);
}

/// Test: listeners are attached once across reconnects
#[test]
fn subscription_is_idempotent() {
    let (provider, session) = setup();
    block_on(session.connect()).expect("connect");
    session.disconnect();
    block_on(session.connect()).expect("reconnect");

    assert_eq!(provider.subscriptions(), 1);
    assert!(session.event_pump().is_some());
    assert!(session.event_pump().is_none());
}

/// Test: accountsChanged([]) disconnects
#[test]
fn empty_accounts_changed_disconnects() {
    let (provider, session) = setup();
    block_on(session.connect()).expect("connect");
    let mut pump = session.event_pump().expect("pump");

    provider.emit_accounts_changed(Vec::<String>::new());
    assert_eq!(block_on(pump.drain()), 1);

    assert_eq!(session.state(), ConnectionState::Disconnected);
    assert!(session.account().is_none());
    assert!(session.signer().is_none());
}

/// Test: accountsChanged([b]) switches accounts without a new connect
#[test]
fn accounts_changed_switches_account() {
    let (provider, session) = setup();
    block_on(session.connect()).expect("connect");
    let old_signer = session.signer().expect("signer");
    let mut pump = session.event_pump().expect("pump");

    provider.emit_accounts_changed([BOB]);
    block_on(pump.drain());

    let snapshot = session.snapshot();
    assert_eq!(snapshot.connection_state, ConnectionState::Connected);
    assert_eq!(snapshot.account.as_deref(), Some(BOB));
    assert!(!old_signer.is_valid());
    assert_eq!(session.signer().expect("signer").address(), BOB);
    assert_eq!(provider.account_requests(), 1);

    // Same account again changes nothing.
    let issued = provider.signers_issued();
    provider.emit_accounts_changed([BOB]);
    block_on(pump.drain());
    assert_eq!(provider.signers_issued(), issued);
}

/// Test: a grant observed after disconnect reconnects the session
#[test]
fn external_grant_after_disconnect_is_observed() {
    let (provider, session) = setup();
    block_on(session.connect()).expect("connect");
    let mut pump = session.event_pump().expect("pump");
    session.disconnect();

    provider.emit_accounts_changed([BOB]);
    block_on(pump.drain());
    assert_eq!(session.state(), ConnectionState::Connected);
    assert_eq!(session.account().as_deref(), Some(BOB));
}

/// Test: chainChanged refreshes the network and signer in place
#[test]
fn chain_changed_refreshes_network() {
    let (provider, session) = setup();
    block_on(session.connect()).expect("connect");
    let old_signer = session.signer().expect("signer");
    let mut pump = session.event_pump().expect("pump");

    provider.emit_chain_changed(1);
    block_on(pump.drain());

    let snapshot = session.snapshot();
    assert_eq!(snapshot.connection_state, ConnectionState::Connected);
    assert_eq!(snapshot.account.as_deref(), Some(ALICE));
    assert_eq!(snapshot.network.expect("network").chain_id, 1);
    assert_eq!(snapshot.on_expected_chain, Some(false));
    assert!(!old_signer.is_valid());
    assert_eq!(session.signer().expect("signer").chain_id(), 1);
    assert_eq!(provider.account_requests(), 1);
}

/// Test: connect() while accountsChanged is re-deriving joins that attempt
#[test]
fn connect_joins_account_rederivation() {
    let (provider, session) = setup();
    block_on(session.connect()).expect("connect");
    let mut pump = session.event_pump().expect("pump");
    let gate = provider.hold_chain_query();
    provider.emit_accounts_changed([BOB]);

    let (handled, joined, _) = block_on(async {
        join!(pump.drain(), session.connect(), async {
            assert_eq!(session.state(), ConnectionState::Connecting);
            gate.approve();
        })
    });

    assert_eq!(handled, 1);
    let snapshot = joined.expect("joined attempt");
    assert_eq!(snapshot.account.as_deref(), Some(BOB));
    assert_eq!(snapshot.connection_state, ConnectionState::Connected);
    assert_eq!(provider.account_requests(), 1);
    assert_eq!(provider.signers_issued(), 2);
}

/// Test: connect() while chainChanged is re-deriving joins that attempt
#[test]
fn connect_joins_chain_rederivation() {
    let (provider, session) = setup();
    block_on(session.connect()).expect("connect");
    let mut pump = session.event_pump().expect("pump");
    let gate = provider.hold_chain_query();
    provider.emit_chain_changed(137);

    let (_, joined, _) = block_on(async {
        join!(pump.drain(), session.connect(), async { gate.approve() })
    });

    let snapshot = joined.expect("joined attempt");
    assert_eq!(snapshot.account.as_deref(), Some(ALICE));
    assert_eq!(snapshot.network.expect("network").chain_id, 137);
    assert_eq!(provider.account_requests(), 1);
    assert_eq!(provider.chain_queries(), 2);
}

/// Test: chainChanged during a pending approval keeps the attempt alive
#[test]
fn chain_changed_during_pending_approval_keeps_attempt() {
    let (provider, session) = setup();
    block_on(session.connect()).expect("connect");
    let mut pump = session.event_pump().expect("pump");
    session.disconnect();
    let gate = provider.hold_approval();

    let (result, handled) = block_on(async {
        join!(session.connect(), async {
            provider.emit_chain_changed(137);
            let handled = pump.drain().await;
            assert_eq!(session.state(), ConnectionState::Connecting);
            gate.approve();
            handled
        })
    });

    assert_eq!(handled, 1);
    let snapshot = result.expect("connect survives the chain switch");
    assert_eq!(snapshot.connection_state, ConnectionState::Connected);
    assert_eq!(snapshot.account.as_deref(), Some(ALICE));
    assert_eq!(snapshot.network.expect("network").chain_id, 137);
    assert_eq!(session.signer().expect("signer").chain_id(), 137);
    assert_eq!(provider.account_requests(), 2);
}

/// Test: a chain switch while the network query is outstanding is picked up
#[test]
fn chain_switch_during_network_query_requeries() {
    let (provider, session) = setup();
    let gate = provider.hold_chain_query();

    let (result, _) = block_on(async {
        join!(session.connect(), async {
            provider.set_chain_id(137);
            session.handle_event(ProviderEvent::ChainChanged("0x89".into())).await;
            gate.approve();
        })
    });

    let snapshot = result.expect("connect");
    assert_eq!(snapshot.network.expect("network").chain_id, 137);
    assert_eq!(session.signer().expect("signer").chain_id(), 137);
    assert_eq!(provider.chain_queries(), 2);
    assert_eq!(provider.signers_issued(), 2);
    assert_eq!(provider.account_requests(), 1);
}

/// Test: a failed re-derivation after chainChanged lands in Error
#[test]
fn failed_chain_refresh_enters_error() {
    let (provider, session) = setup();
    block_on(session.connect()).expect("connect");
    let mut pump = session.event_pump().expect("pump");

    provider.fail_chain_queries(Some(ProviderError::new(4900, "disconnected")));
    provider.emit_chain_changed(137);
    block_on(pump.drain());

    let snapshot = session.snapshot();
    assert_eq!(snapshot.connection_state, ConnectionState::Error);
    assert!(snapshot.account.is_none());
    assert!(matches!(snapshot.last_error, Some(SessionError::ConnectionFailed(_))));
    assert!(session.signer().is_none());

    provider.fail_chain_queries(None);
    let snapshot = block_on(session.connect()).expect("recover");
    assert_eq!(snapshot.network.expect("network").chain_id, 137);
}

/// Test: Reload policy resets and runs the hook
#[test]
fn reload_policy_runs_hook() {
    let provider = Rc::new(MockProvider::new([ALICE], SEPOLIA));
    let reloads = Rc::new(Cell::new(0));
    let counter = reloads.clone();
    let config = SessionConfig::new("bitfrac-test")
        .reload_on_chain_change(move || counter.set(counter.get() + 1));
    let session = WalletSession::new(Some(provider.clone()), config);

    block_on(session.connect()).expect("connect");
    let signer = session.signer().expect("signer");
    let mut pump = session.event_pump().expect("pump");

    provider.emit_chain_changed(56);
    block_on(pump.drain());

    assert_eq!(reloads.get(), 1);
    assert_eq!(session.state(), ConnectionState::Disconnected);
    assert!(session.account().is_none());
    assert!(!signer.is_valid());
    assert_eq!(provider.chain_queries(), 1);
}

/// Test: watchers see each transition once
#[test]
fn watchers_observe_transitions() {
    let (provider, session) = setup();
    let mut rx = session.watch();

    block_on(session.connect()).expect("connect");
    let mut pump = session.event_pump().expect("pump");
    provider.emit_accounts_changed(Vec::<String>::new());
    block_on(pump.drain());

    let mut states = Vec::new();
    while let Ok(snapshot) = rx.try_recv() {
        states.push(snapshot.connection_state);
    }
    assert_eq!(
        states,
        vec![
            ConnectionState::Connecting,
            ConnectionState::Connected,
            ConnectionState::Disconnected,
        ]
    );
}

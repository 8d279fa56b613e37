//! WalletSession - connection lifecycle for an injected wallet
//!
//! # State machine
//!
//! ```text
//! Disconnected ──connect()──► Connecting ──approved──► Connected
//!      ▲                          │                        │
//!      └──────rejected/failed─────┘                        │
//!      ▲                                                   │
//!      ├────────disconnect() / accountsChanged([])─────────┤
//!      │                                                   │
//!      │          accountsChanged([x, ..]) ──► Connecting ─┘ (re-derive for x)
//!      │          chainChanged(_)          ──► Connecting ─┘ (Refresh policy, when connected)
//!      └────────────────────── chainChanged(_) (Reload policy)
//! ```
//!
//! # Ordering
//!
//! Every transition that invalidates the current context (disconnect, account
//! change, chain change on a live session) bumps `epoch`. An attempt captures
//! the epoch it started under and is discarded on resolution if the epoch has
//! moved, so a slow approval can never resurrect a session that was torn down
//! or overwrite state established by a newer notification.
//!
//! Concurrent `connect()` calls share one in-flight attempt: the provider sees
//! a single `eth_requestAccounts`.
//!
//! `chainChanged` does not void an attempt that is still in flight. Instead it
//! bumps `chain_epoch`, and an attempt whose network query straddled the bump
//! queries the chain again before committing.

mod error;
mod policy;
mod state;

pub use error::SessionError;
pub use policy::{ChainChangePolicy, ReloadFn};
pub use state::{ConnectionState, SessionSnapshot};

use crate::config::SessionConfig;
use crate::core::{is_address, parse_chain_id, short_address, Network};
use crate::provider::{ProviderEvent, Signer, WalletProvider};
use futures::channel::mpsc;
use futures::future::{FutureExt, LocalBoxFuture, Shared};
use futures::StreamExt;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use tracing::{debug, error, info, warn};

type AttemptResult = Result<SessionSnapshot, SessionError>;
type Attempt = Shared<LocalBoxFuture<'static, AttemptResult>>;

/// Where the account for an attempt comes from.
enum AccountSource {
    /// Ask the wallet (user approval).
    Request,
    /// Already granted, reported by `accountsChanged` or kept across a chain switch.
    Known(String),
}

#[derive(Default)]
struct SessionInner {
    account: Option<String>,
    network: Option<Network>,
    signer: Option<Signer>,
    state: ConnectionState,
    last_error: Option<SessionError>,
    epoch: u64,
    chain_epoch: u64,
    in_flight: Option<Attempt>,
    subscribed: bool,
    events: Option<mpsc::UnboundedReceiver<ProviderEvent>>,
}

impl SessionInner {
    /// Drop everything derived from the current account/chain. Returns the
    /// account that was active.
    fn invalidate(&mut self) -> Option<String> {
        self.epoch += 1;
        self.in_flight = None;
        if let Some(signer) = self.signer.take() {
            signer.revoke();
        }
        self.network = None;
        self.account.take()
    }
}

struct SessionCore {
    provider: Option<Rc<dyn WalletProvider>>,
    config: SessionConfig,
    inner: RefCell<SessionInner>,
    watchers: RefCell<Vec<mpsc::UnboundedSender<SessionSnapshot>>>,
}

/// Single owner of the wallet provider. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct WalletSession {
    core: Rc<SessionCore>,
}

impl WalletSession {
    pub fn new(provider: Option<Rc<dyn WalletProvider>>, config: SessionConfig) -> Self {
        Self {
            core: Rc::new(SessionCore {
                provider,
                config,
                inner: RefCell::new(SessionInner::default()),
                watchers: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Session for a host with no wallet installed.
    pub fn unavailable(config: SessionConfig) -> Self {
        Self::new(None, config)
    }

    pub fn config(&self) -> &SessionConfig { &self.core.config }

    pub fn has_provider(&self) -> bool { self.core.provider.is_some() }

    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.core.inner.borrow();
        let on_expected_chain = match (self.core.config.expected_chain_id, &inner.network) {
            (Some(expected), Some(network)) => Some(network.chain_id == expected),
            _ => None,
        };
        SessionSnapshot {
            account: inner.account.clone(),
            network: inner.network.clone(),
            connection_state: inner.state,
            last_error: inner.last_error.clone(),
            on_expected_chain,
        }
    }

    pub fn state(&self) -> ConnectionState { self.core.inner.borrow().state }

    pub fn account(&self) -> Option<String> { self.core.inner.borrow().account.clone() }

    /// Signing handle, only while connected.
    pub fn signer(&self) -> Option<Signer> {
        let inner = self.core.inner.borrow();
        match inner.state {
            ConnectionState::Connected => inner.signer.clone(),
            _ => None,
        }
    }

    /// Receive a snapshot after every change.
    pub fn watch(&self) -> mpsc::UnboundedReceiver<SessionSnapshot> {
        let (tx, rx) = mpsc::unbounded();
        self.core.watchers.borrow_mut().push(tx);
        rx
    }

    /// Provider notification stream. Available once, after the first
    /// successful connect registered the listeners.
    pub fn event_pump(&self) -> Option<EventPump> {
        let events = self.core.inner.borrow_mut().events.take()?;
        Some(EventPump { session: self.clone(), events })
    }

    pub async fn connect(&self) -> AttemptResult {
        let Some(provider) = self.core.provider.clone() else {
            warn!("connect: no wallet provider detected");
            self.update(|inner| {
                inner.state = ConnectionState::Disconnected;
                inner.last_error = Some(SessionError::ProviderUnavailable);
            });
            return Err(SessionError::ProviderUnavailable);
        };

        if self.state() == ConnectionState::Connected {
            return Ok(self.snapshot());
        }
        let in_flight = self.core.inner.borrow().in_flight.clone();
        let attempt = match in_flight {
            Some(attempt) => {
                debug!("connect: joining in-flight attempt");
                attempt
            }
            None => {
                info!(app = %self.core.config.app, "connect: requesting wallet authorization");
                self.begin(provider, AccountSource::Request, ConnectionState::Disconnected)
            }
        };
        attempt.await
    }

    /// Clear local session state. Wallet-side authorization is left alone;
    /// provider listeners stay attached so a later grant is still observed.
    pub fn disconnect(&self) {
        self.update(|inner| {
            inner.invalidate();
            inner.state = ConnectionState::Disconnected;
            inner.last_error = None;
        });
        info!("Wallet disconnected");
    }

    /// Apply one provider notification. Notifications must be fed in the order
    /// the provider emitted them; [`EventPump`] does this.
    pub async fn handle_event(&self, event: ProviderEvent) {
        match event {
            ProviderEvent::AccountsChanged(accounts) => self.on_accounts_changed(accounts).await,
            ProviderEvent::ChainChanged(raw) => self.on_chain_changed(&raw).await,
        }
    }

    async fn on_accounts_changed(&self, accounts: Vec<String>) {
        let Some(account) = accounts.into_iter().next() else {
            info!("accountsChanged: wallet reports no authorized accounts");
            self.disconnect();
            return;
        };
        let Some(provider) = self.core.provider.clone() else { return };

        {
            let inner = self.core.inner.borrow();
            if inner.state == ConnectionState::Connected && inner.account.as_deref() == Some(account.as_str()) {
                debug!(account = %short_address(&account), "accountsChanged: account unchanged");
                return;
            }
        }

        info!(account = %short_address(&account), "accountsChanged: adopting account");
        self.update(|inner| {
            inner.invalidate();
            inner.state = ConnectionState::Connecting;
        });
        let attempt = self.begin(provider, AccountSource::Known(account), ConnectionState::Error);
        let _ = attempt.await;
    }

    async fn on_chain_changed(&self, raw: &str) {
        let chain_id = match parse_chain_id(raw) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("chainChanged: {e}");
                None
            }
        };

        if let ChainChangePolicy::Reload(hook) = &self.core.config.chain_policy {
            info!(chain_id = ?chain_id, "chainChanged: resetting context");
            self.update(|inner| {
                inner.invalidate();
                inner.state = ConnectionState::Disconnected;
                inner.last_error = None;
            });
            hook();
            return;
        }

        let in_flight = {
            let mut inner = self.core.inner.borrow_mut();
            inner.chain_epoch += 1;
            inner.in_flight.is_some()
        };
        if in_flight {
            // The attempt resolves the network after this point or re-queries it.
            debug!(chain_id = ?chain_id, "chainChanged: attempt in flight, network resolved on completion");
            return;
        }

        let account = {
            let inner = self.core.inner.borrow();
            let current = inner.network.as_ref().map(|n| n.chain_id);
            if inner.state == ConnectionState::Connected && chain_id.is_some() && current == chain_id {
                debug!(chain_id = ?chain_id, "chainChanged: already on chain");
                return;
            }
            inner.account.clone()
        };
        let (Some(provider), Some(account)) = (self.core.provider.clone(), account) else {
            debug!(chain_id = ?chain_id, "chainChanged: no session to refresh");
            return;
        };

        info!(chain_id = ?chain_id, "chainChanged: refreshing network");
        self.update(|inner| {
            inner.invalidate();
            inner.state = ConnectionState::Connecting;
        });
        let attempt = self.begin(provider, AccountSource::Known(account), ConnectionState::Error);
        let _ = attempt.await;
    }

    /// Start an attempt and publish it as the in-flight one.
    fn begin(
        &self,
        provider: Rc<dyn WalletProvider>,
        source: AccountSource,
        on_failure: ConnectionState,
    ) -> Attempt {
        let mut epoch = 0;
        self.update(|inner| {
            inner.state = ConnectionState::Connecting;
            inner.last_error = None;
            epoch = inner.epoch;
        });
        let attempt = establish(Rc::downgrade(&self.core), provider, source, epoch, on_failure)
            .boxed_local()
            .shared();
        self.core.inner.borrow_mut().in_flight = Some(attempt.clone());
        attempt
    }

    fn commit(
        &self,
        epoch: u64,
        result: Result<(String, Network, Signer), SessionError>,
        on_failure: ConnectionState,
    ) -> AttemptResult {
        let stale = self.core.inner.borrow().epoch != epoch;
        if stale {
            if let Ok((_, _, signer)) = &result {
                signer.revoke();
            }
            debug!("connect: attempt resolved after the session moved on, discarding");
            let snapshot = self.snapshot();
            return if snapshot.is_connected() { Ok(snapshot) } else { Err(SessionError::Superseded) };
        }

        match result {
            Ok((account, network, signer)) => {
                info!(account = %short_address(&account), network = %network, "Wallet connected");
                self.update(|inner| {
                    inner.in_flight = None;
                    inner.account = Some(account);
                    inner.network = Some(network);
                    inner.signer = Some(signer);
                    inner.state = ConnectionState::Connected;
                    inner.last_error = None;
                });
                self.ensure_subscribed();
                Ok(self.snapshot())
            }
            Err(e) => {
                match &e {
                    SessionError::UserRejected => info!("connect: user rejected authorization"),
                    SessionError::ProviderUnavailable => warn!("connect: {e}"),
                    SessionError::ConnectionFailed(_) | SessionError::Superseded => error!("connect: {e}"),
                }
                self.update(|inner| {
                    inner.invalidate();
                    inner.state = on_failure;
                    inner.last_error = Some(e.clone());
                });
                Err(e)
            }
        }
    }

    fn ensure_subscribed(&self) {
        let Some(provider) = &self.core.provider else { return };
        let mut inner = self.core.inner.borrow_mut();
        if inner.subscribed {
            return;
        }
        match provider.subscribe() {
            Ok(events) => {
                inner.subscribed = true;
                inner.events = Some(events);
                debug!("subscribed to accountsChanged/chainChanged");
            }
            // Retried on the next successful connect.
            Err(e) => warn!("provider subscription failed: {e}"),
        }
    }

    /// Mutate state and notify watchers if the visible snapshot changed.
    fn update(&self, f: impl FnOnce(&mut SessionInner)) {
        let before = self.snapshot();
        f(&mut self.core.inner.borrow_mut());
        let after = self.snapshot();
        if before != after {
            self.notify(after);
        }
    }

    fn notify(&self, snapshot: SessionSnapshot) {
        self.core
            .watchers
            .borrow_mut()
            .retain(|tx| tx.unbounded_send(snapshot.clone()).is_ok());
    }
}

async fn establish(
    core: Weak<SessionCore>,
    provider: Rc<dyn WalletProvider>,
    source: AccountSource,
    epoch: u64,
    on_failure: ConnectionState,
) -> AttemptResult {
    let result = derive(&core, provider.as_ref(), source).await;
    let Some(core) = core.upgrade() else {
        return Err(SessionError::Superseded);
    };
    WalletSession { core }.commit(epoch, result, on_failure)
}

fn chain_epoch(core: &Weak<SessionCore>) -> Option<u64> {
    core.upgrade().map(|core| core.inner.borrow().chain_epoch)
}

async fn derive(
    core: &Weak<SessionCore>,
    provider: &dyn WalletProvider,
    source: AccountSource,
) -> Result<(String, Network, Signer), SessionError> {
    let account = match source {
        AccountSource::Request => provider
            .request_accounts()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| SessionError::ConnectionFailed("wallet returned no accounts".into()))?,
        AccountSource::Known(account) => account,
    };
    if !is_address(&account) {
        return Err(SessionError::ConnectionFailed(format!("invalid account address: {account}")));
    }
    loop {
        let observed = chain_epoch(core);
        let chain_id = provider.chain_id().await?;
        let signer = provider.signer(&account, chain_id).await?;
        if chain_epoch(core) == observed {
            return Ok((account, Network::from_chain_id(chain_id), signer));
        }
        signer.revoke();
        debug!(chain_id, "chain switched while resolving network, querying again");
    }
}

/// Feeds provider notifications into the session, one at a time, in order.
pub struct EventPump {
    session: WalletSession,
    events: mpsc::UnboundedReceiver<ProviderEvent>,
}

impl EventPump {
    /// Process notifications until the provider drops the stream.
    pub async fn run(mut self) {
        while let Some(event) = self.events.next().await {
            self.session.handle_event(event).await;
        }
        debug!("provider event stream closed");
    }

    /// Process whatever is queued right now. Returns the number handled.
    pub async fn drain(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events.try_recv() {
            self.session.handle_event(event).await;
            handled += 1;
        }
        handled
    }
}

//! MockProvider - scripted in-process wallet for tests and the CLI demo.

use super::{ProviderError, ProviderEvent, Signer, SignerBackend, TransactionRequest, WalletProvider};
use async_trait::async_trait;
use futures::channel::{mpsc, oneshot};
use std::cell::RefCell;
use std::rc::Rc;

type GateResult = Result<(), ProviderError>;

#[derive(Default)]
struct MockState {
    accounts: Vec<String>,
    chain_id: u64,
    next_failure: Option<ProviderError>,
    chain_failure: Option<ProviderError>,
    gate: Option<oneshot::Receiver<GateResult>>,
    chain_gate: Option<oneshot::Receiver<GateResult>>,
    subscribers: Vec<mpsc::UnboundedSender<ProviderEvent>>,
    account_requests: usize,
    chain_queries: usize,
    signers_issued: usize,
    subscriptions: usize,
}

/// Wallet whose answers are set up front. Approval can be held open with
/// [`MockProvider::hold_approval`] to model a user sitting on the wallet popup.
pub struct MockProvider {
    state: RefCell<MockState>,
    backend: Rc<MockSignerBackend>,
}

/// Releases (or rejects) a held `eth_requestAccounts` or `eth_chainId` call.
pub struct ApprovalGate {
    sender: oneshot::Sender<GateResult>,
}

impl ApprovalGate {
    pub fn approve(self) {
        let _ = self.sender.send(Ok(()));
    }

    pub fn reject(self) {
        let _ = self.sender.send(Err(ProviderError::user_rejected()));
    }

    pub fn fail(self, error: ProviderError) {
        let _ = self.sender.send(Err(error));
    }
}

impl MockProvider {
    pub fn new<S: Into<String>>(accounts: impl IntoIterator<Item = S>, chain_id: u64) -> Self {
        Self {
            state: RefCell::new(MockState {
                accounts: accounts.into_iter().map(Into::into).collect(),
                chain_id,
                ..Default::default()
            }),
            backend: Rc::new(MockSignerBackend::default()),
        }
    }

    /// The next authorization request fails as if the user clicked "Cancel".
    pub fn reject_next(&self) {
        self.fail_next(ProviderError::user_rejected());
    }

    pub fn fail_next(&self, error: ProviderError) {
        self.state.borrow_mut().next_failure = Some(error);
    }

    /// Every `eth_chainId` call fails until cleared with `None`.
    pub fn fail_chain_queries(&self, error: Option<ProviderError>) {
        self.state.borrow_mut().chain_failure = error;
    }

    /// Hold the next authorization request until the returned gate is resolved.
    pub fn hold_approval(&self) -> ApprovalGate {
        let (sender, receiver) = oneshot::channel();
        self.state.borrow_mut().gate = Some(receiver);
        ApprovalGate { sender }
    }

    /// Hold the next `eth_chainId` call, which parks a session mid-way through
    /// deriving its network.
    pub fn hold_chain_query(&self) -> ApprovalGate {
        let (sender, receiver) = oneshot::channel();
        self.state.borrow_mut().chain_gate = Some(receiver);
        ApprovalGate { sender }
    }

    pub fn set_accounts<S: Into<String>>(&self, accounts: impl IntoIterator<Item = S>) {
        self.state.borrow_mut().accounts = accounts.into_iter().map(Into::into).collect();
    }

    pub fn set_chain_id(&self, chain_id: u64) {
        self.state.borrow_mut().chain_id = chain_id;
    }

    /// Deliver `event` to every live subscription.
    pub fn emit(&self, event: ProviderEvent) {
        let mut state = self.state.borrow_mut();
        state.subscribers.retain(|tx| tx.unbounded_send(event.clone()).is_ok());
    }

    /// Switch accounts in the wallet and notify, like MetaMask does.
    pub fn emit_accounts_changed<S: Into<String>>(&self, accounts: impl IntoIterator<Item = S>) {
        let accounts: Vec<String> = accounts.into_iter().map(Into::into).collect();
        self.set_accounts(accounts.clone());
        self.emit(ProviderEvent::AccountsChanged(accounts));
    }

    pub fn emit_chain_changed(&self, chain_id: u64) {
        self.set_chain_id(chain_id);
        self.emit(ProviderEvent::ChainChanged(format!("0x{chain_id:x}")));
    }

    pub fn account_requests(&self) -> usize { self.state.borrow().account_requests }
    pub fn chain_queries(&self) -> usize { self.state.borrow().chain_queries }
    pub fn signers_issued(&self) -> usize { self.state.borrow().signers_issued }
    pub fn subscriptions(&self) -> usize { self.state.borrow().subscriptions }
    pub fn backend(&self) -> Rc<MockSignerBackend> { self.backend.clone() }
}

#[async_trait(?Send)]
impl WalletProvider for MockProvider {
    async fn request_accounts(&self) -> Result<Vec<String>, ProviderError> {
        let gate = {
            let mut state = self.state.borrow_mut();
            state.account_requests += 1;
            state.gate.take()
        };
        if let Some(gate) = gate {
            gate.await
                .map_err(|_| ProviderError::internal("approval abandoned"))??;
        }
        let mut state = self.state.borrow_mut();
        if let Some(error) = state.next_failure.take() {
            return Err(error);
        }
        Ok(state.accounts.clone())
    }

    async fn chain_id(&self) -> Result<u64, ProviderError> {
        let gate = {
            let mut state = self.state.borrow_mut();
            state.chain_queries += 1;
            state.chain_gate.take()
        };
        if let Some(gate) = gate {
            gate.await
                .map_err(|_| ProviderError::internal("chain query abandoned"))??;
        }
        let state = self.state.borrow();
        match &state.chain_failure {
            Some(error) => Err(error.clone()),
            None => Ok(state.chain_id),
        }
    }

    async fn signer(&self, account: &str, chain_id: u64) -> Result<Signer, ProviderError> {
        self.state.borrow_mut().signers_issued += 1;
        Ok(Signer::new(account, chain_id, self.backend.clone()))
    }

    fn subscribe(&self) -> Result<mpsc::UnboundedReceiver<ProviderEvent>, ProviderError> {
        let (tx, rx) = mpsc::unbounded();
        let mut state = self.state.borrow_mut();
        state.subscriptions += 1;
        state.subscribers.push(tx);
        Ok(rx)
    }
}

/// Records what would have been sent to the wallet.
#[derive(Default)]
pub struct MockSignerBackend {
    sent: RefCell<Vec<TransactionRequest>>,
    signed: RefCell<Vec<(String, String)>>,
}

impl MockSignerBackend {
    pub fn sent(&self) -> Vec<TransactionRequest> { self.sent.borrow().clone() }
    pub fn signed(&self) -> Vec<(String, String)> { self.signed.borrow().clone() }
}

#[async_trait(?Send)]
impl SignerBackend for MockSignerBackend {
    async fn sign_message(&self, address: &str, message: &str) -> Result<String, ProviderError> {
        let mut signed = self.signed.borrow_mut();
        signed.push((address.to_string(), message.to_string()));
        Ok(format!("0x{:0130x}", signed.len()))
    }

    async fn send_transaction(&self, tx: &TransactionRequest) -> Result<String, ProviderError> {
        let mut sent = self.sent.borrow_mut();
        sent.push(tx.clone());
        Ok(format!("0x{:064x}", sent.len()))
    }
}

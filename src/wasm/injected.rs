//! InjectedProvider: `window.ethereum` behind [`WalletProvider`]
//!
//! Every call goes through `ethereum.request({ method, params })`. Rejections
//! carry EIP-1193 `{ code, message }` objects, which map onto
//! [`ProviderError`] unchanged.

use super::log;
use crate::core::parse_chain_id;
use crate::provider::{
    ProviderError, ProviderEvent, Signer, SignerBackend, TransactionRequest, WalletProvider,
    INTERNAL_ERROR,
};
use async_trait::async_trait;
use futures::channel::mpsc;
use js_sys::{Array, Function, Object, Promise, Reflect};
use serde::Serialize;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

const INJECTION_KEY: &str = "ethereum";

fn js_error(value: JsValue) -> ProviderError {
    let field = |name: &str| Reflect::get(&value, &JsValue::from_str(name)).ok();
    let code = field("code")
        .and_then(|code| code.as_f64())
        .map(|code| code as i64)
        .unwrap_or(INTERNAL_ERROR);
    let message = field("message")
        .and_then(|message| message.as_string())
        .or_else(|| value.as_string())
        .unwrap_or_else(|| format!("{value:?}"));
    ProviderError::new(code, message)
}

/// Handle on the injected EIP-1193 object.
#[derive(Clone)]
struct Ethereum {
    object: JsValue,
}

impl Ethereum {
    fn method(&self, name: &str) -> Result<Function, ProviderError> {
        Reflect::get(&self.object, &JsValue::from_str(name))
            .map_err(js_error)?
            .dyn_into::<Function>()
            .map_err(|_| ProviderError::internal(format!("ethereum.{name} is not a function")))
    }

    async fn request(&self, method: &str, params: Option<Array>) -> Result<JsValue, ProviderError> {
        let args = Object::new();
        Reflect::set(&args, &"method".into(), &JsValue::from_str(method)).map_err(js_error)?;
        if let Some(params) = params {
            Reflect::set(&args, &"params".into(), &params).map_err(js_error)?;
        }
        let result = self.method("request")?.call1(&self.object, &args).map_err(js_error)?;
        // Some wallets hand back thenables rather than native promises.
        JsFuture::from(Promise::resolve(&result)).await.map_err(js_error)
    }
}

fn string_array(value: &JsValue) -> Vec<String> {
    value
        .dyn_ref::<Array>()
        .map(|accounts| accounts.iter().filter_map(|a| a.as_string()).collect())
        .unwrap_or_default()
}

pub struct InjectedProvider {
    ethereum: Ethereum,
}

impl InjectedProvider {
    /// `None` when no wallet extension injected `window.ethereum`.
    pub fn detect() -> Option<Self> {
        let window = web_sys::window()?;
        let object = Reflect::get(&window, &JsValue::from_str(INJECTION_KEY)).ok()?;
        if object.is_undefined() || object.is_null() {
            log!("[InjectedProvider] window.{} not found", INJECTION_KEY);
            return None;
        }
        Some(Self { ethereum: Ethereum { object } })
    }

    fn listen(
        &self,
        on: &Function,
        event: &str,
        tx: mpsc::UnboundedSender<ProviderEvent>,
        map: fn(JsValue) -> Option<ProviderEvent>,
    ) -> Result<(), ProviderError> {
        let handler = Closure::<dyn FnMut(JsValue)>::new(move |value: JsValue| {
            if let Some(event) = map(value) {
                let _ = tx.unbounded_send(event);
            }
        });
        on.call2(&self.ethereum.object, &JsValue::from_str(event), handler.as_ref())
            .map_err(js_error)?;
        // Listeners live as long as the page; the session subscribes once.
        handler.forget();
        Ok(())
    }
}

#[async_trait(?Send)]
impl WalletProvider for InjectedProvider {
    async fn request_accounts(&self) -> Result<Vec<String>, ProviderError> {
        let accounts = self.ethereum.request("eth_requestAccounts", None).await?;
        Ok(string_array(&accounts))
    }

    async fn chain_id(&self) -> Result<u64, ProviderError> {
        let raw = self.ethereum.request("eth_chainId", None).await?;
        let raw = raw
            .as_string()
            .or_else(|| raw.as_f64().map(|id| (id as u64).to_string()))
            .ok_or_else(|| ProviderError::internal("eth_chainId returned a non-string"))?;
        parse_chain_id(&raw).map_err(|e| ProviderError::internal(e.to_string()))
    }

    async fn signer(&self, account: &str, chain_id: u64) -> Result<Signer, ProviderError> {
        let backend = Rc::new(InjectedSigner { ethereum: self.ethereum.clone() });
        Ok(Signer::new(account, chain_id, backend))
    }

    fn subscribe(&self) -> Result<mpsc::UnboundedReceiver<ProviderEvent>, ProviderError> {
        let on = self.ethereum.method("on")?;
        let (tx, rx) = mpsc::unbounded();
        self.listen(&on, "accountsChanged", tx.clone(), |value| {
            Some(ProviderEvent::AccountsChanged(string_array(&value)))
        })?;
        self.listen(&on, "chainChanged", tx, |value| {
            value
                .as_string()
                .or_else(|| value.as_f64().map(|id| (id as u64).to_string()))
                .map(ProviderEvent::ChainChanged)
        })?;
        log!("[InjectedProvider] listening for accountsChanged/chainChanged");
        Ok(rx)
    }
}

struct InjectedSigner {
    ethereum: Ethereum,
}

#[async_trait(?Send)]
impl SignerBackend for InjectedSigner {
    async fn sign_message(&self, address: &str, message: &str) -> Result<String, ProviderError> {
        let params = Array::of2(&JsValue::from_str(message), &JsValue::from_str(address));
        let signature = self.ethereum.request("personal_sign", Some(params)).await?;
        signature
            .as_string()
            .ok_or_else(|| ProviderError::internal("personal_sign returned a non-string"))
    }

    async fn send_transaction(&self, tx: &TransactionRequest) -> Result<String, ProviderError> {
        let serializer = serde_wasm_bindgen::Serializer::json_compatible();
        let tx = tx
            .serialize(&serializer)
            .map_err(|e| ProviderError::internal(e.to_string()))?;
        let hash = self
            .ethereum
            .request("eth_sendTransaction", Some(Array::of1(&tx)))
            .await?;
        hash.as_string()
            .ok_or_else(|| ProviderError::internal("eth_sendTransaction returned a non-string"))
    }
}

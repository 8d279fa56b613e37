//! JsWalletSession: the session as seen from page scripts

use super::injected::InjectedProvider;
use super::log;
use crate::config::{SessionConfig, DEFAULT_APP};
use crate::provider::WalletProvider;
use crate::session::{SessionError, SessionSnapshot, WalletSession};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SessionOptions {
    app: Option<String>,
    expected_chain_id: Option<u64>,
    /// Reload the page on `chainChanged` instead of refreshing in place.
    reload_on_chain_change: bool,
}

impl SessionOptions {
    fn into_config(self) -> SessionConfig {
        let mut config = SessionConfig::new(self.app.unwrap_or_else(|| DEFAULT_APP.into()));
        if let Some(chain_id) = self.expected_chain_id {
            config = config.with_expected_chain(chain_id);
        }
        if self.reload_on_chain_change {
            config = config.reload_on_chain_change(|| {
                if let Some(window) = web_sys::window() {
                    let _ = window.location().reload();
                }
            });
        }
        config
    }
}

fn to_js(snapshot: &SessionSnapshot) -> JsValue {
    let serializer = serde_wasm_bindgen::Serializer::json_compatible();
    snapshot.serialize(&serializer).unwrap_or(JsValue::NULL)
}

fn error_to_js(error: SessionError) -> JsValue {
    JsValue::from_str(&error.message())
}

/// One per page. Owns the injected provider for its whole lifetime.
#[wasm_bindgen]
pub struct JsWalletSession {
    session: WalletSession,
}

#[wasm_bindgen]
impl JsWalletSession {
    /// `options`: `{ app?, expectedChainId?, reloadOnChainChange? }`
    #[wasm_bindgen(constructor)]
    pub fn new(options: JsValue) -> Result<JsWalletSession, JsValue> {
        let options: SessionOptions = if options.is_undefined() || options.is_null() {
            SessionOptions::default()
        } else {
            serde_wasm_bindgen::from_value(options).map_err(|e| JsValue::from_str(&e.to_string()))?
        };
        let provider = InjectedProvider::detect().map(|p| Rc::new(p) as Rc<dyn WalletProvider>);
        log!("[JsWalletSession] provider detected: {}", provider.is_some());
        Ok(Self { session: WalletSession::new(provider, options.into_config()) })
    }

    #[wasm_bindgen(getter, js_name = "hasProvider")]
    pub fn has_provider(&self) -> bool {
        self.session.has_provider()
    }

    /// Resolves with the snapshot, rejects with a UI-ready message.
    #[wasm_bindgen]
    pub async fn connect(&self) -> Result<JsValue, JsValue> {
        let session = self.session.clone();
        let result = session.connect().await;
        // The first successful connect registers provider listeners; start
        // feeding them into the session.
        if let Some(pump) = session.event_pump() {
            wasm_bindgen_futures::spawn_local(pump.run());
        }
        result.map(|snapshot| to_js(&snapshot)).map_err(error_to_js)
    }

    #[wasm_bindgen]
    pub fn disconnect(&self) {
        self.session.disconnect();
    }

    #[wasm_bindgen]
    pub fn snapshot(&self) -> JsValue {
        to_js(&self.session.snapshot())
    }

    #[wasm_bindgen]
    pub fn describe(&self) -> String {
        self.session.snapshot().describe()
    }

    /// Call `callback(snapshot)` after every change.
    #[wasm_bindgen(js_name = "onChange")]
    pub fn on_change(&self, callback: js_sys::Function) {
        let mut rx = self.session.watch();
        let this = JsValue::NULL;
        wasm_bindgen_futures::spawn_local(async move {
            while let Some(snapshot) = rx.next().await {
                let _ = callback.call1(&this, &to_js(&snapshot));
            }
        });
    }

    /// `personal_sign` with the connected account.
    #[wasm_bindgen(js_name = "signMessage")]
    pub async fn sign_message(&self, message: String) -> Result<String, JsValue> {
        let signer = self
            .session
            .signer()
            .ok_or_else(|| JsValue::from_str("Please connect your wallet."))?;
        signer
            .sign_message(message.as_bytes())
            .await
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }
}

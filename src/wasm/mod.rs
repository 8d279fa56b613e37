//! WASM module: the wallet session in the browser
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │        JsWalletSession (JS API)         │
//! │  connect, disconnect, snapshot,         │
//! │  onChange, signMessage                  │
//! └─────────────────┬───────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────┐
//! │        WalletSession (shared core)      │
//! │  state machine, epochs, event pump      │
//! └─────────────────┬───────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────┐
//! │     InjectedProvider (window.ethereum)  │
//! │  request({method, params}), on(...)     │
//! └─────────────────────────────────────────┘
//! ```

mod injected;
mod session;

pub use injected::InjectedProvider;
pub use session::JsWalletSession;

use wasm_bindgen::prelude::*;

/// Initialize WASM module (called automatically on load)
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Log to browser console
pub fn console_log(s: &str) {
    web_sys::console::log_1(&JsValue::from_str(s));
}

macro_rules! log {
    ($($t:tt)*) => {
        crate::wasm::console_log(&format!($($t)*))
    }
}

pub(crate) use log;

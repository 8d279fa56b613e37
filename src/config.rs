//! Configuration - passed from higher layers
//!
//! `SessionConfig` drives the wallet session. `AppConfig` is what the CLI and
//! host pages persist: the app name, the chain the contracts live on, and the
//! deployed contract addresses.
//!
//! Environment (a `.env` in the working directory is read first, without
//! overriding variables already set):
//!
//! | Variable | Field |
//! |----------|-------|
//! | `BITFRAC_APP` | `app` |
//! | `BITFRAC_CHAIN_ID` | `expected_chain_id` (hex or decimal) |
//! | `BITFRAC_TOKEN_ADDRESS` | `contracts.token` |
//! | `BITFRAC_PRESALE_ADDRESS` | `contracts.presale` |
//! | `BITFRAC_REVENUE_DIST_ADDRESS` | `contracts.revenue_distribution` |
//! | `BITFRAC_STABLECOIN_ADDRESS` | `contracts.stablecoin` |
//! | `BITFRAC_ROOT` | base directory for the saved config |

use crate::core::{is_address, parse_chain_id, ChainIdError, SEPOLIA_CHAIN_ID};
use crate::session::ChainChangePolicy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_APP: &str = "bitfrac";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io: {0}")]
    Io(#[from] std::io::Error),
    #[error("config json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid {field} address: {value}")]
    InvalidAddress { field: &'static str, value: String },
    #[error(transparent)]
    ChainId(#[from] ChainIdError),
    #[error("no config found at {0}")]
    NotFound(String),
}

/// Wallet session configuration. Higher layers construct this.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub app: String,
    /// Chain the contracts are deployed on; reflected in
    /// `SessionSnapshot::on_expected_chain`.
    pub expected_chain_id: Option<u64>,
    pub chain_policy: ChainChangePolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { app: DEFAULT_APP.into(), expected_chain_id: None, chain_policy: ChainChangePolicy::Refresh }
    }
}

impl SessionConfig {
    pub fn new(app: impl Into<String>) -> Self {
        Self { app: app.into(), ..Default::default() }
    }
    pub fn with_expected_chain(mut self, chain_id: u64) -> Self { self.expected_chain_id = Some(chain_id); self }
    pub fn with_chain_policy(mut self, policy: ChainChangePolicy) -> Self { self.chain_policy = policy; self }
    pub fn reload_on_chain_change(self, hook: impl Fn() + 'static) -> Self {
        self.with_chain_policy(ChainChangePolicy::reload(hook))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractAddresses {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue_distribution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stablecoin: Option<String>,
}

impl ContractAddresses {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("token", &self.token),
            ("presale", &self.presale),
            ("revenue_distribution", &self.revenue_distribution),
            ("stablecoin", &self.stablecoin),
        ];
        for (field, value) in fields {
            if let Some(value) = value {
                if !is_address(value) {
                    return Err(ConfigError::InvalidAddress { field, value: value.clone() });
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub app: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_chain_id: Option<u64>,
    #[serde(default)]
    pub contracts: ContractAddresses,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app: DEFAULT_APP.into(),
            expected_chain_id: Some(SEPOLIA_CHAIN_ID),
            contracts: ContractAddresses::default(),
        }
    }
}

impl AppConfig {
    pub fn new(app: impl Into<String>) -> Self {
        Self { app: app.into(), ..Default::default() }
    }
    pub fn with_expected_chain(mut self, chain_id: u64) -> Self { self.expected_chain_id = Some(chain_id); self }
    pub fn with_contracts(mut self, contracts: ContractAddresses) -> Self { self.contracts = contracts; self }

    pub fn session_config(&self) -> SessionConfig {
        let config = SessionConfig::new(&self.app);
        match self.expected_chain_id {
            Some(id) => config.with_expected_chain(id),
            None => config,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.contracts.validate()
    }

    /// Overlay `BITFRAC_*` variables on top of `self`.
    pub fn apply_env(mut self) -> Result<Self, ConfigError> {
        let var = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());
        if let Some(app) = var("BITFRAC_APP") {
            self.app = app;
        }
        if let Some(raw) = var("BITFRAC_CHAIN_ID") {
            self.expected_chain_id = Some(parse_chain_id(&raw)?);
        }
        let contracts = &mut self.contracts;
        if let Some(v) = var("BITFRAC_TOKEN_ADDRESS") { contracts.token = Some(v); }
        if let Some(v) = var("BITFRAC_PRESALE_ADDRESS") { contracts.presale = Some(v); }
        if let Some(v) = var("BITFRAC_REVENUE_DIST_ADDRESS") { contracts.revenue_distribution = Some(v); }
        if let Some(v) = var("BITFRAC_STABLECOIN_ADDRESS") { contracts.stablecoin = Some(v); }
        self.validate()?;
        Ok(self)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().apply_env()
    }
}

#[cfg(feature = "native")]
mod file {
    use super::{AppConfig, ConfigError};
    use std::path::{Path, PathBuf};

    /// `$BITFRAC_ROOT/<app>/config.json`, defaulting to the platform data dir.
    pub fn config_path(app: &str) -> PathBuf {
        let root = std::env::var("BITFRAC_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| dirs::data_local_dir().unwrap_or_else(|| PathBuf::from(".")));
        root.join(app).join("config.json")
    }

    impl AppConfig {
        pub fn load(path: &Path) -> Result<Self, ConfigError> {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.display().to_string()));
            }
            let raw = std::fs::read_to_string(path)?;
            let config: AppConfig = serde_json::from_str(&raw)?;
            config.validate()?;
            Ok(config)
        }

        pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
            self.validate()?;
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, serde_json::to_string_pretty(self)?)?;
            Ok(())
        }
    }

    /// Load `KEY=value` lines into the environment. Existing variables win.
    pub fn load_dotenv(path: &Path) {
        let Ok(contents) = std::fs::read_to_string(path) else { return };
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                let value = value.trim().trim_matches('"');
                if !value.is_empty() && std::env::var(key.trim()).is_err() {
                    std::env::set_var(key.trim(), value);
                }
            }
        }
    }
}

#[cfg(feature = "native")]
pub use file::{config_path, load_dotenv};

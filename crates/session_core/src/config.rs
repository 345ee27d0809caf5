use std::{collections::HashMap, fs, time::Duration};

use alloy_primitives::{address, Address};
use atm_contract::ContractOptions;
use shared::units::AmountUnit;
use url::Url;

/// Address the stock devnet gives the first deployed contract; real
/// deployments override it in config.
pub const DEFAULT_CONTRACT_ADDRESS: Address =
    address!("0x5FbDB2315678afecb367f032d93F642f64180aa3");

#[derive(Debug, Clone)]
pub struct Settings {
    /// JSON-RPC endpoint of the wallet bridge. Unset means no bridge is
    /// installed, which is a valid (if useless) state.
    pub bridge_url: Option<Url>,
    pub contract_address: Address,
    pub amount_unit: AmountUnit,
    pub receipt_poll_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bridge_url: None,
            contract_address: DEFAULT_CONTRACT_ADDRESS,
            amount_unit: AmountUnit::default(),
            receipt_poll_ms: 1_000,
        }
    }
}

impl Settings {
    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_ms)
    }

    pub fn contract_options(&self) -> ContractOptions {
        ContractOptions {
            address: self.contract_address,
            receipt_poll_interval: self.receipt_poll_interval(),
            attach_deposit_value: self.amount_unit == AmountUnit::Ether,
        }
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("atm.toml") {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(&raw) {
            if let Some(v) = file_cfg.get("bridge_url") {
                if let Ok(parsed) = Url::parse(v) {
                    settings.bridge_url = Some(parsed);
                }
            }
            if let Some(v) = file_cfg.get("contract_address") {
                if let Ok(parsed) = v.parse() {
                    settings.contract_address = parsed;
                }
            }
            if let Some(v) = file_cfg.get("amount_unit") {
                if let Some(parsed) = AmountUnit::from_config_str(v) {
                    settings.amount_unit = parsed;
                }
            }
            if let Some(v) = file_cfg.get("receipt_poll_ms") {
                if let Ok(parsed) = v.parse() {
                    settings.receipt_poll_ms = parsed;
                }
            }
        }
    }

    if let Ok(v) = std::env::var("WALLET_BRIDGE_URL") {
        if let Ok(parsed) = Url::parse(&v) {
            settings.bridge_url = Some(parsed);
        }
    }
    if let Ok(v) = std::env::var("ATM_CONTRACT_ADDRESS") {
        if let Ok(parsed) = v.parse() {
            settings.contract_address = parsed;
        }
    }
    if let Ok(v) = std::env::var("ATM_AMOUNT_UNIT") {
        if let Some(parsed) = AmountUnit::from_config_str(&v) {
            settings.amount_unit = parsed;
        }
    }
    if let Ok(v) = std::env::var("ATM_RECEIPT_POLL_MS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.receipt_poll_ms = parsed;
        }
    }

    settings
}

use alloy_primitives::{
    utils::{format_ether, parse_ether},
    U256,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How user-entered amounts map onto the contract's integer arguments. The
/// deployed contracts come in two flavours: one counts plain integer units,
/// the other counts wei and takes amounts as decimal ether. Configuration
/// picks the flavour; everything downstream works in `U256`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmountUnit {
    #[default]
    Units,
    Ether,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AmountParseError {
    #[error("amount is empty")]
    Empty,
    #[error("'{input}' is not a valid {unit} amount")]
    Invalid { input: String, unit: &'static str },
}

impl AmountUnit {
    pub fn from_config_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "units" | "unit" => Some(AmountUnit::Units),
            "ether" | "eth" => Some(AmountUnit::Ether),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AmountUnit::Units => "units",
            AmountUnit::Ether => "ETH",
        }
    }

    pub fn parse_amount(&self, input: &str) -> Result<U256, AmountParseError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(AmountParseError::Empty);
        }
        match self {
            AmountUnit::Units => {
                U256::from_str_radix(trimmed, 10).map_err(|_| AmountParseError::Invalid {
                    input: trimmed.to_string(),
                    unit: self.label(),
                })
            }
            AmountUnit::Ether => parse_ether(trimmed).map_err(|_| AmountParseError::Invalid {
                input: trimmed.to_string(),
                unit: self.label(),
            }),
        }
    }

    pub fn format_amount(&self, value: U256) -> String {
        match self {
            AmountUnit::Units => value.to_string(),
            AmountUnit::Ether => trim_decimal(&format_ether(value)),
        }
    }
}

// "1.500000000000000000" -> "1.5", "2.000000000000000000" -> "2"
fn trim_decimal(formatted: &str) -> String {
    match formatted.split_once('.') {
        Some((whole, frac)) => {
            let frac = frac.trim_end_matches('0');
            if frac.is_empty() {
                whole.to_string()
            } else {
                format!("{whole}.{frac}")
            }
        }
        None => formatted.to_string(),
    }
}

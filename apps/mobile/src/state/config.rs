//! # Configuration State
//!
//! Store identity and money formatting, loaded at startup.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`CAISSE_*`)
//! 2. Defaults (this file)
//!
//! Backend settings live in [`caisse_api::ClientConfig`].
//!
//! ## Thread Safety
//! Configuration is read-only after initialization, so no mutex needed.

use caisse_core::{ModuleActif, Money};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Where the currency symbol goes.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SymbolPosition {
    /// "$12.34"
    Before,
    /// "12 500 FCFA"
    #[default]
    After,
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigState {
    /// Store name (printed on receipts)
    pub store_name: String,

    /// Store address lines (for receipts)
    pub store_address: Vec<String>,

    /// Currency code (ISO 4217)
    pub currency_code: String,

    /// Currency symbol (for display)
    pub currency_symbol: String,

    /// Number of decimal places of the currency
    pub currency_decimals: u8,

    pub symbol_position: SymbolPosition,

    /// Thousands separator, `None` for none.
    pub thousands_separator: Option<char>,

    /// Receipt width in characters (typically 32, 42, or 48)
    pub receipt_width: usize,

    /// Module used when the user may use it and none was chosen yet.
    pub default_module: ModuleActif,
}

impl Default for ConfigState {
    /// ## Default Values
    /// - Currency: XOF (FCFA), no decimals, symbol after the amount
    /// - Receipt: 32 columns
    fn default() -> Self {
        ConfigState {
            store_name: "Caisse POS".to_string(),
            store_address: Vec::new(),
            currency_code: "XOF".to_string(),
            currency_symbol: "FCFA".to_string(),
            currency_decimals: 0,
            symbol_position: SymbolPosition::After,
            thousands_separator: Some(' '),
            receipt_width: 32,
            default_module: ModuleActif::default(),
        }
    }
}

impl ConfigState {
    /// Creates a ConfigState from environment variables and defaults.
    ///
    /// ## Environment Variables
    /// - `CAISSE_STORE_NAME`
    /// - `CAISSE_STORE_ADDRESS`: lines separated by `|`
    /// - `CAISSE_CURRENCY`: `CODE:SYMBOL:DECIMALS`, e.g. `EUR:€:2`
    /// - `CAISSE_RECEIPT_WIDTH`
    /// - `CAISSE_MODULE`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = ConfigState::default();

        if let Some(name) = lookup("CAISSE_STORE_NAME") {
            config.store_name = name;
        }

        if let Some(address) = lookup("CAISSE_STORE_ADDRESS") {
            config.store_address = address
                .split('|')
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect();
        }

        if let Some(currency) = lookup("CAISSE_CURRENCY") {
            let parts: Vec<&str> = currency.split(':').collect();
            match parts.as_slice() {
                [code, symbol, decimals] => match decimals.parse::<u8>() {
                    Ok(d) if d <= 4 => {
                        config.currency_code = code.to_string();
                        config.currency_symbol = symbol.to_string();
                        config.currency_decimals = d;
                        if d > 0 {
                            config.symbol_position = SymbolPosition::Before;
                            config.thousands_separator = None;
                        }
                    }
                    _ => warn!(value = %currency, "Invalid CAISSE_CURRENCY decimals"),
                },
                _ => warn!(value = %currency, "CAISSE_CURRENCY must be CODE:SYMBOL:DECIMALS"),
            }
        }

        if let Some(width) = lookup("CAISSE_RECEIPT_WIDTH") {
            match width.parse::<usize>() {
                Ok(w) if (24..=80).contains(&w) => config.receipt_width = w,
                _ => warn!(value = %width, "Invalid CAISSE_RECEIPT_WIDTH"),
            }
        }

        if let Some(module) = lookup("CAISSE_MODULE") {
            match module.parse::<ModuleActif>() {
                Ok(m) => config.default_module = m,
                Err(_) => warn!(module = %module, "Unknown module in environment"),
            }
        }

        config
    }

    /// Formats an amount in minor units for display.
    ///
    /// ## Example
    /// ```rust
    /// use caisse_core::Money;
    /// use caisse_mobile::state::ConfigState;
    ///
    /// let config = ConfigState::default();
    /// assert_eq!(config.format_money(Money::from_minor(12_500)), "12 500 FCFA");
    /// ```
    pub fn format_money(&self, amount: Money) -> String {
        let minor = amount.minor();
        let divisor = 10_i64.pow(self.currency_decimals as u32);
        let whole = (minor / divisor).unsigned_abs();
        let frac = (minor % divisor).unsigned_abs();

        let mut number = group_thousands(whole, self.thousands_separator);
        if self.currency_decimals > 0 {
            number = format!(
                "{}.{:0width$}",
                number,
                frac,
                width = self.currency_decimals as usize
            );
        }

        let sign = if minor < 0 { "-" } else { "" };
        match self.symbol_position {
            SymbolPosition::Before => format!("{}{}{}", sign, self.currency_symbol, number),
            SymbolPosition::After => format!("{}{} {}", sign, number, self.currency_symbol),
        }
    }
}

fn group_thousands(value: u64, separator: Option<char>) -> String {
    let digits = value.to_string();
    let Some(separator) = separator else {
        return digits;
    };

    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(separator);
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_format_money_fcfa() {
        let config = ConfigState::default();
        assert_eq!(config.format_money(Money::from_minor(0)), "0 FCFA");
        assert_eq!(config.format_money(Money::from_minor(650)), "650 FCFA");
        assert_eq!(config.format_money(Money::from_minor(7_200)), "7 200 FCFA");
        assert_eq!(config.format_money(Money::from_minor(1_234_567)), "1 234 567 FCFA");
        assert_eq!(config.format_money(Money::from_minor(-2_500)), "-2 500 FCFA");
    }

    #[test]
    fn test_format_money_with_decimals() {
        let config = ConfigState::from_lookup(|key| {
            (key == "CAISSE_CURRENCY").then(|| "USD:$:2".to_string())
        });
        assert_eq!(config.format_money(Money::from_minor(1234)), "$12.34");
        assert_eq!(config.format_money(Money::from_minor(1)), "$0.01");
        assert_eq!(config.format_money(Money::from_minor(-1234)), "-$12.34");
        assert_eq!(config.format_money(Money::from_minor(123_456_789)), "$1234567.89");
    }

    #[test]
    fn test_from_lookup() {
        let env: HashMap<&str, &str> = [
            ("CAISSE_STORE_NAME", "Pharmacie du Plateau"),
            ("CAISSE_STORE_ADDRESS", "Avenue Lamine Guèye | Dakar"),
            ("CAISSE_RECEIPT_WIDTH", "10"),
            ("CAISSE_MODULE", "pharma"),
            ("CAISSE_CURRENCY", "broken"),
        ]
        .into_iter()
        .collect();

        let config = ConfigState::from_lookup(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.store_name, "Pharmacie du Plateau");
        assert_eq!(config.store_address, vec!["Avenue Lamine Guèye", "Dakar"]);
        assert_eq!(config.receipt_width, 32);
        assert_eq!(config.default_module, ModuleActif::Pharmacie);
        assert_eq!(config.currency_code, "XOF");
    }
}

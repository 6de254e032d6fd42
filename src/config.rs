//! Ledger configuration

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use tracing::warn;

/// Tunables for trade validation and portfolio listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// How far in the past a trade may be dated
    pub max_backdate_days: i64,
    /// Tolerated clock skew for trades dated in the future
    pub max_future_skew_secs: i64,
    /// Maximum fractional digits of a traded amount
    pub max_amount_scale: i64,
    /// Maximum integer digits of a traded or credited amount
    pub max_amount_digits: i64,
    /// Whether fully withdrawn holdings appear in listings
    pub include_empty_holdings: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_backdate_days: 365,
            max_future_skew_secs: 300,
            max_amount_scale: 8,
            max_amount_digits: 20,
            include_empty_holdings: true,
        }
    }
}

impl LedgerConfig {
    /// Build a configuration from `PORTFOLIO_*` environment variables
    ///
    /// Missing, unparseable or negative variables keep their default value.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_backdate_days: parse_var("PORTFOLIO_MAX_BACKDATE_DAYS", defaults.max_backdate_days),
            max_future_skew_secs: parse_var(
                "PORTFOLIO_MAX_FUTURE_SKEW_SECS",
                defaults.max_future_skew_secs,
            ),
            max_amount_scale: parse_var("PORTFOLIO_MAX_AMOUNT_SCALE", defaults.max_amount_scale),
            max_amount_digits: parse_var("PORTFOLIO_MAX_AMOUNT_DIGITS", defaults.max_amount_digits),
            include_empty_holdings: parse_bool(
                "PORTFOLIO_INCLUDE_EMPTY_HOLDINGS",
                defaults.include_empty_holdings,
            ),
        }
    }
}

fn parse_var<T: FromStr + Copy + Default + PartialOrd>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(value) if value >= T::default() => value,
            _ => {
                warn!(key, value = %raw, "invalid config value; using default");
                default
            }
        },
        Err(_) => default,
    }
}

fn parse_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => match raw.trim() {
            "1" | "true" | "TRUE" | "yes" => true,
            "0" | "false" | "FALSE" | "no" => false,
            _ => {
                warn!(key, value = %raw, "invalid boolean config value; using default");
                default
            }
        },
        Err(_) => default,
    }
}

//! Validation utilities

use bigdecimal::BigDecimal;
use chrono::{Duration, NaiveDateTime};

use crate::config::LedgerConfig;
use crate::types::*;

/// Validate that an amount is positive
pub fn validate_positive_amount(amount: &BigDecimal) -> PortfolioResult<()> {
    if *amount <= BigDecimal::from(0) {
        Err(PortfolioError::InvalidAmount(format!(
            "Amount must be positive, got {}",
            amount
        )))
    } else {
        Ok(())
    }
}

/// Validate that an amount has at most `max_scale` fractional digits
pub fn validate_amount_scale(amount: &BigDecimal, max_scale: i64) -> PortfolioResult<()> {
    let (_, scale) = amount.normalized().as_bigint_and_exponent();
    if scale > max_scale {
        return Err(PortfolioError::InvalidAmount(format!(
            "Amount {} has more than {} decimal places",
            amount, max_scale
        )));
    }
    Ok(())
}

/// Validate that an amount has at most `max_digits` digits before the decimal point
pub fn validate_amount_magnitude(amount: &BigDecimal, max_digits: i64) -> PortfolioResult<()> {
    let normalized = amount.normalized();
    let (_, scale) = normalized.as_bigint_and_exponent();
    let integer_digits = (normalized.digits() as i64).saturating_sub(scale);
    if integer_digits > max_digits {
        return Err(PortfolioError::InvalidAmount(format!(
            "Amount {} has more than {} integer digits",
            amount, max_digits
        )));
    }
    Ok(())
}

/// Validate that a cryptocurrency id is usable as a catalog key
pub fn validate_crypto_id(crypto_id: &str) -> PortfolioResult<()> {
    if crypto_id.trim().is_empty() {
        return Err(PortfolioError::Validation(
            "Cryptocurrency ID cannot be empty".to_string(),
        ));
    }

    if crypto_id.len() > 100 {
        return Err(PortfolioError::Validation(
            "Cryptocurrency ID cannot exceed 100 characters".to_string(),
        ));
    }

    // Catalog ids are slugs such as "bitcoin" or "usd-coin"
    if !crypto_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(PortfolioError::Validation(format!(
            "Cryptocurrency ID '{}' may only contain alphanumeric characters, dashes, and underscores",
            crypto_id
        )));
    }

    Ok(())
}

/// Validate an external user identifier before resolving it
pub fn validate_external_user_id(user_id: &str) -> PortfolioResult<()> {
    if user_id.trim().is_empty() {
        return Err(PortfolioError::Validation(
            "User ID cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validate that a trade time lies within the accepted window around `now`
///
/// A bound that falls outside the representable date range leaves that
/// side of the window open.
pub fn validate_trade_time(
    at: NaiveDateTime,
    now: NaiveDateTime,
    config: &LedgerConfig,
) -> PortfolioResult<()> {
    let earliest = Duration::try_days(config.max_backdate_days)
        .and_then(|window| now.checked_sub_signed(window));
    if let Some(earliest) = earliest {
        if at < earliest {
            return Err(PortfolioError::InvalidTransactionTime(format!(
                "{} is more than {} days in the past",
                at, config.max_backdate_days
            )));
        }
    }

    let latest = Duration::try_seconds(config.max_future_skew_secs)
        .and_then(|skew| now.checked_add_signed(skew));
    if let Some(latest) = latest {
        if at > latest {
            return Err(PortfolioError::InvalidTransactionTime(format!(
                "{} is in the future",
                at
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_positive_amount() {
        assert!(validate_positive_amount(&BigDecimal::from(1)).is_ok());
        assert!(matches!(
            validate_positive_amount(&BigDecimal::from(0)),
            Err(PortfolioError::InvalidAmount(_))
        ));
        assert!(validate_positive_amount(&BigDecimal::from(-2)).is_err());
    }

    #[test]
    fn test_amount_scale() {
        let ok = BigDecimal::from_str("0.12345678").unwrap();
        let trailing_zeros = BigDecimal::from_str("1.50000000000").unwrap();
        let too_fine = BigDecimal::from_str("0.123456789").unwrap();

        assert!(validate_amount_scale(&ok, 8).is_ok());
        assert!(validate_amount_scale(&trailing_zeros, 8).is_ok());
        assert!(validate_amount_scale(&too_fine, 8).is_err());
        assert!(validate_amount_scale(&BigDecimal::from(1000), 0).is_ok());
    }

    #[test]
    fn test_amount_magnitude() {
        let ok = BigDecimal::from_str("99999999999999999999.5").unwrap();
        let huge = BigDecimal::from_str("1e20000000").unwrap();
        let just_over = BigDecimal::from_str("100000000000000000000").unwrap();

        assert!(validate_amount_magnitude(&ok, 20).is_ok());
        assert!(validate_amount_magnitude(&BigDecimal::from_str("0.0001").unwrap(), 20).is_ok());
        assert!(matches!(
            validate_amount_magnitude(&huge, 20),
            Err(PortfolioError::InvalidAmount(_))
        ));
        assert!(validate_amount_magnitude(&just_over, 20).is_err());
    }

    #[test]
    fn test_crypto_id() {
        assert!(validate_crypto_id("bitcoin").is_ok());
        assert!(validate_crypto_id("usd-coin").is_ok());
        assert!(validate_crypto_id("  ").is_err());
        assert!(validate_crypto_id("bit coin").is_err());
    }

    #[test]
    fn test_trade_time_window() {
        let config = LedgerConfig::default();
        let now = chrono::Utc::now().naive_utc();

        assert!(validate_trade_time(now, now, &config).is_ok());
        assert!(validate_trade_time(now - Duration::days(364), now, &config).is_ok());
        assert!(matches!(
            validate_trade_time(now - Duration::days(366), now, &config),
            Err(PortfolioError::InvalidTransactionTime(_))
        ));
        assert!(validate_trade_time(now + Duration::seconds(60), now, &config).is_ok());
        assert!(validate_trade_time(now + Duration::days(1), now, &config).is_err());
    }

    #[test]
    fn test_trade_time_window_with_unbounded_config() {
        let config = LedgerConfig {
            max_backdate_days: 1_000_000_000,
            max_future_skew_secs: i64::MAX,
            ..LedgerConfig::default()
        };
        let now = chrono::Utc::now().naive_utc();

        assert!(validate_trade_time(now, now, &config).is_ok());
        assert!(validate_trade_time(now - Duration::days(10_000), now, &config).is_ok());
        assert!(validate_trade_time(now + Duration::days(10_000), now, &config).is_ok());
    }
}

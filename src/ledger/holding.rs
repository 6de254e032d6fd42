//! Holding management: the low-level credit and debit primitives

use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use tracing::{debug, warn};

use crate::traits::*;
use crate::types::*;
use crate::utils::validation::validate_positive_amount;

/// Holding manager for direct balance adjustments
pub struct HoldingManager<S: PortfolioStorage> {
    pub(crate) storage: S,
}

impl<S: PortfolioStorage> HoldingManager<S> {
    /// Create a new holding manager
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Credit `amount` units, creating the holding on first use
    pub async fn add(
        &self,
        crypto_id: &str,
        amount: &BigDecimal,
        user_id: InternalUserId,
        at: NaiveDateTime,
    ) -> PortfolioResult<Holding> {
        validate_positive_amount(amount)?;

        let holding = self
            .storage
            .credit_holding(user_id, crypto_id, amount, at)
            .await?;

        debug!(
            user_id = %user_id,
            crypto_id,
            amount = %amount,
            balance = %holding.amount,
            "credited holding"
        );
        Ok(holding)
    }

    /// Debit `amount` units if the holding covers them
    ///
    /// Returns `Ok(false)` when the balance is insufficient or the holding
    /// does not exist. A `transaction_time` older than the holding's last
    /// update is rejected outright.
    pub async fn withdraw(
        &self,
        crypto_id: &str,
        amount: &BigDecimal,
        user_id: InternalUserId,
        transaction_time: NaiveDateTime,
    ) -> PortfolioResult<bool> {
        validate_positive_amount(amount)?;

        match self
            .storage
            .debit_holding(user_id, crypto_id, amount, transaction_time)
            .await?
        {
            BalanceChange::Applied(holding) => {
                debug!(
                    user_id = %user_id,
                    crypto_id,
                    amount = %amount,
                    balance = %holding.amount,
                    "withdrew from holding"
                );
                Ok(true)
            }
            BalanceChange::Insufficient { available } => {
                warn!(
                    user_id = %user_id,
                    crypto_id,
                    requested = %amount,
                    available = %available,
                    "withdrawal exceeds balance"
                );
                Ok(false)
            }
            BalanceChange::OutOfOrder { last_update } => {
                Err(PortfolioError::InvalidTransactionTime(format!(
                    "{} is earlier than the last update of {} ({})",
                    transaction_time, crypto_id, last_update
                )))
            }
        }
    }

    /// Get a holding
    pub async fn get_holding(
        &self,
        user_id: InternalUserId,
        crypto_id: &str,
    ) -> PortfolioResult<Option<Holding>> {
        self.storage.get_holding(user_id, crypto_id).await
    }

    /// Get the balance of a holding, zero when absent
    pub async fn get_balance(
        &self,
        user_id: InternalUserId,
        crypto_id: &str,
    ) -> PortfolioResult<BigDecimal> {
        Ok(self
            .storage
            .get_holding(user_id, crypto_id)
            .await?
            .map(|holding| holding.amount)
            .unwrap_or_else(|| BigDecimal::from(0)))
    }

    /// List the holdings of a user
    pub async fn list_holdings(&self, user_id: InternalUserId) -> PortfolioResult<Vec<Holding>> {
        self.storage.list_holdings(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::memory_storage::MemoryStorage;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, day)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[tokio::test]
    async fn test_add_then_withdraw() {
        let manager = HoldingManager::new(MemoryStorage::new());
        let user = InternalUserId(1);

        manager
            .add("bitcoin", &BigDecimal::from(2), user, at(1))
            .await
            .unwrap();
        assert!(!manager
            .withdraw("bitcoin", &BigDecimal::from(3), user, at(2))
            .await
            .unwrap());
        assert_eq!(
            manager.get_balance(user, "bitcoin").await.unwrap(),
            BigDecimal::from(2)
        );

        assert!(manager
            .withdraw("bitcoin", &BigDecimal::from_str("1.5").unwrap(), user, at(2))
            .await
            .unwrap());
        assert_eq!(
            manager.get_balance(user, "bitcoin").await.unwrap(),
            BigDecimal::from_str("0.5").unwrap()
        );
    }

    #[tokio::test]
    async fn test_withdraw_exact_balance_keeps_zero_holding() {
        let manager = HoldingManager::new(MemoryStorage::new());
        let user = InternalUserId(5);

        manager
            .add("ethereum", &BigDecimal::from(4), user, at(1))
            .await
            .unwrap();
        assert!(manager
            .withdraw("ethereum", &BigDecimal::from(4), user, at(3))
            .await
            .unwrap());

        let holding = manager.get_holding(user, "ethereum").await.unwrap().unwrap();
        assert!(holding.is_empty());
        assert_eq!(holding.last_update, at(3));
    }

    #[tokio::test]
    async fn test_rejects_non_positive_amounts() {
        let manager = HoldingManager::new(MemoryStorage::new());
        let user = InternalUserId(1);

        assert!(matches!(
            manager.add("bitcoin", &BigDecimal::from(0), user, at(1)).await,
            Err(PortfolioError::InvalidAmount(_))
        ));
        assert!(matches!(
            manager
                .withdraw("bitcoin", &BigDecimal::from(-1), user, at(1))
                .await,
            Err(PortfolioError::InvalidAmount(_))
        ));
        assert!(manager.list_holdings(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_withdraw_before_last_update_is_rejected() {
        let manager = HoldingManager::new(MemoryStorage::new());
        let user = InternalUserId(1);

        manager
            .add("bitcoin", &BigDecimal::from(1), user, at(10))
            .await
            .unwrap();
        assert!(matches!(
            manager
                .withdraw("bitcoin", &BigDecimal::from(1), user, at(9))
                .await,
            Err(PortfolioError::InvalidTransactionTime(_))
        ));
        assert_eq!(
            manager.get_balance(user, "bitcoin").await.unwrap(),
            BigDecimal::from(1)
        );
    }
}

//! Trade processing and history

use chrono::NaiveDateTime;
use tracing::{info, warn};

use crate::traits::*;
use crate::types::*;
use crate::utils::validation::validate_positive_amount;

/// Trade manager for recording buys and sells
pub struct TradeManager<S: PortfolioStorage> {
    storage: S,
}

impl<S: PortfolioStorage> TradeManager<S> {
    /// Create a new trade manager
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Apply a trade to its holding and record it
    ///
    /// Returns the updated holding. A sell that the holding cannot cover
    /// fails with [`PortfolioError::InsufficientBalance`] and leaves both the
    /// holding and the history untouched. Non-positive amounts are rejected
    /// with [`PortfolioError::InvalidAmount`].
    pub async fn execute(&self, transaction: &PortfolioTransaction) -> PortfolioResult<Holding> {
        validate_positive_amount(&transaction.amount)?;

        match self.storage.record_trade(transaction).await? {
            BalanceChange::Applied(holding) => {
                info!(
                    transaction_id = %transaction.id,
                    kind = %transaction.kind,
                    user_id = %transaction.user_id,
                    crypto_id = %transaction.crypto_id,
                    amount = %transaction.amount,
                    balance = %holding.amount,
                    "trade recorded"
                );
                Ok(holding)
            }
            BalanceChange::Insufficient { available } => {
                warn!(
                    kind = %transaction.kind,
                    user_id = %transaction.user_id,
                    crypto_id = %transaction.crypto_id,
                    requested = %transaction.amount,
                    available = %available,
                    "trade rejected: insufficient balance"
                );
                Err(PortfolioError::InsufficientBalance {
                    crypto_id: transaction.crypto_id.clone(),
                    requested: transaction.amount.clone(),
                    available,
                })
            }
            BalanceChange::OutOfOrder { last_update } => {
                warn!(
                    kind = %transaction.kind,
                    user_id = %transaction.user_id,
                    crypto_id = %transaction.crypto_id,
                    executed_at = %transaction.executed_at,
                    last_update = %last_update,
                    "trade rejected: predates last holding update"
                );
                Err(PortfolioError::InvalidTransactionTime(format!(
                    "{} is earlier than the last update of {} ({})",
                    transaction.executed_at, transaction.crypto_id, last_update
                )))
            }
        }
    }

    /// Get a trade by ID
    pub async fn get_transaction(
        &self,
        transaction_id: &str,
    ) -> PortfolioResult<Option<PortfolioTransaction>> {
        self.storage.get_transaction(transaction_id).await
    }

    /// Get a trade by ID, returning an error if not found
    pub async fn get_transaction_required(
        &self,
        transaction_id: &str,
    ) -> PortfolioResult<PortfolioTransaction> {
        self.storage
            .get_transaction(transaction_id)
            .await?
            .ok_or_else(|| PortfolioError::TransactionNotFound(transaction_id.to_string()))
    }

    /// Get a user's trades within an inclusive time range
    pub async fn get_user_transactions(
        &self,
        user_id: InternalUserId,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> PortfolioResult<Vec<PortfolioTransaction>> {
        self.storage.get_user_transactions(user_id, start, end).await
    }
}

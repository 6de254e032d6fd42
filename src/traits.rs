//! Traits for storage abstraction and extensibility

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;

use crate::config::LedgerConfig;
use crate::types::*;
use crate::utils::validation::*;

/// The portfolio contract consumed by request handlers
///
/// `user_id: &str` is the caller-facing identifier; the low-level balance
/// primitives take the resolved [`InternalUserId`].
#[async_trait]
pub trait PortfolioService: Send + Sync {
    /// Buy `request.amount` units and return the transaction id
    async fn buy_crypto_transaction(
        &self,
        request: &CryptoTransactionRequest,
        user_id: &str,
    ) -> PortfolioResult<String>;

    /// Sell `request.amount` units and return the transaction id
    ///
    /// Fails with [`PortfolioError::InsufficientBalance`] when the holding
    /// cannot cover the amount; the balance is left untouched.
    async fn sell_crypto_transaction(
        &self,
        request: &CryptoTransactionRequest,
        user_id: &str,
    ) -> PortfolioResult<String>;

    /// List every recorded holding of the user, valued at current prices
    async fn get_user_portfolio(&self, user_id: &str) -> PortfolioResult<Vec<PortfolioEntry>>;

    /// Credit a holding, creating it on first use
    ///
    /// The credit is stamped with the current time. A later
    /// [`withdraw_from_portfolio`](Self::withdraw_from_portfolio) dated before
    /// that moment fails with [`PortfolioError::InvalidTransactionTime`].
    async fn add_to_portfolio(
        &self,
        crypto: &Cryptocurrency,
        amount: &BigDecimal,
        user_id: InternalUserId,
    ) -> PortfolioResult<()>;

    /// Debit a holding; `Ok(false)` when the balance cannot cover `amount`
    async fn withdraw_from_portfolio(
        &self,
        crypto: &Cryptocurrency,
        amount: &BigDecimal,
        user_id: InternalUserId,
        transaction_time: NaiveDateTime,
    ) -> PortfolioResult<bool>;
}

/// Storage abstraction for holdings and trade history
///
/// Every mutating method must apply its check and its write atomically with
/// respect to other mutations of the same holding. Implementations backed by
/// a database do this inside a transaction holding a row lock.
#[async_trait]
pub trait PortfolioStorage: Send + Sync {
    /// Get a single holding
    async fn get_holding(
        &self,
        user_id: InternalUserId,
        crypto_id: &str,
    ) -> PortfolioResult<Option<Holding>>;

    /// List all holdings of a user
    async fn list_holdings(&self, user_id: InternalUserId) -> PortfolioResult<Vec<Holding>>;

    /// Add `amount` to a holding, creating it if needed
    async fn credit_holding(
        &self,
        user_id: InternalUserId,
        crypto_id: &str,
        amount: &BigDecimal,
        at: NaiveDateTime,
    ) -> PortfolioResult<Holding>;

    /// Remove `amount` from a holding if it can cover it
    async fn debit_holding(
        &self,
        user_id: InternalUserId,
        crypto_id: &str,
        amount: &BigDecimal,
        at: NaiveDateTime,
    ) -> PortfolioResult<BalanceChange>;

    /// Apply a trade to its holding and persist it in one step
    ///
    /// The transaction is only stored when the balance change is applied.
    async fn record_trade(&self, transaction: &PortfolioTransaction)
        -> PortfolioResult<BalanceChange>;

    /// Get a trade by ID
    async fn get_transaction(
        &self,
        transaction_id: &str,
    ) -> PortfolioResult<Option<PortfolioTransaction>>;

    /// List a user's trades executed within an inclusive time range
    async fn get_user_transactions(
        &self,
        user_id: InternalUserId,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> PortfolioResult<Vec<PortfolioTransaction>>;
}

/// Source of recognised cryptocurrencies and their prices
#[async_trait]
pub trait CryptocurrencyCatalog: Send + Sync {
    /// Look an asset up by catalog id
    async fn get_cryptocurrency(&self, crypto_id: &str) -> PortfolioResult<Option<Cryptocurrency>>;

    /// List every known asset
    async fn list_cryptocurrencies(&self) -> PortfolioResult<Vec<Cryptocurrency>>;
}

/// Maps external user identifiers to internal storage keys
#[async_trait]
pub trait UserResolver: Send + Sync {
    async fn resolve(&self, external_id: &str) -> PortfolioResult<Option<InternalUserId>>;
}

/// Trait for implementing custom trade request validation rules
pub trait RequestValidator: Send + Sync {
    /// Validate a buy or sell request before it reaches storage
    fn validate_request(
        &self,
        request: &CryptoTransactionRequest,
        config: &LedgerConfig,
        now: NaiveDateTime,
    ) -> PortfolioResult<()>;
}

/// Default request validator: amount, precision, asset id and time window
pub struct DefaultRequestValidator;

impl RequestValidator for DefaultRequestValidator {
    fn validate_request(
        &self,
        request: &CryptoTransactionRequest,
        config: &LedgerConfig,
        now: NaiveDateTime,
    ) -> PortfolioResult<()> {
        validate_crypto_id(&request.crypto_id)?;
        validate_amount_magnitude(&request.amount, config.max_amount_digits)?;
        validate_positive_amount(&request.amount)?;
        validate_amount_scale(&request.amount, config.max_amount_scale)?;
        validate_trade_time(request.date_time, now, config)
    }
}

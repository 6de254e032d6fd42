//! Core types and data structures for the portfolio ledger

use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Internal, storage-level user identifier
///
/// External callers identify users by an opaque string (session subject,
/// username, ...). Those are mapped to this numeric key by a
/// [`UserResolver`](crate::traits::UserResolver) and the two are never
/// compared directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InternalUserId(pub i64);

impl fmt::Display for InternalUserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for InternalUserId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// A tradable cryptocurrency as known to the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cryptocurrency {
    /// Catalog identifier (e.g. "bitcoin")
    pub id: String,
    /// Ticker symbol (e.g. "btc")
    pub symbol: String,
    /// Display name (e.g. "Bitcoin")
    pub name: String,
    /// Latest known price per unit in USD
    pub current_price: BigDecimal,
    /// When the price was last refreshed
    pub last_updated: NaiveDateTime,
}

impl Cryptocurrency {
    /// Create a new cryptocurrency priced now
    pub fn new(id: String, symbol: String, name: String, current_price: BigDecimal) -> Self {
        Self {
            id,
            symbol,
            name,
            current_price,
            last_updated: chrono::Utc::now().naive_utc(),
        }
    }
}

/// Quantity of one cryptocurrency owned by one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub user_id: InternalUserId,
    pub crypto_id: String,
    /// Units held; never negative
    pub amount: BigDecimal,
    /// When the holding was first credited
    pub created_at: NaiveDateTime,
    /// Time of the latest balance mutation
    pub last_update: NaiveDateTime,
}

impl Holding {
    /// Create an empty holding
    pub fn new(user_id: InternalUserId, crypto_id: String, at: NaiveDateTime) -> Self {
        Self {
            user_id,
            crypto_id,
            amount: BigDecimal::from(0),
            created_at: at,
            last_update: at,
        }
    }

    /// Increase the holding. `last_update` never moves backwards.
    pub fn credit(&mut self, amount: &BigDecimal, at: NaiveDateTime) {
        self.amount += amount;
        if at > self.last_update {
            self.last_update = at;
        }
    }

    /// Decrease the holding if it can cover `amount`
    pub fn debit(&mut self, amount: &BigDecimal, at: NaiveDateTime) -> BalanceChange {
        if at < self.last_update {
            return BalanceChange::OutOfOrder {
                last_update: self.last_update,
            };
        }
        if *amount > self.amount {
            return BalanceChange::Insufficient {
                available: self.amount.clone(),
            };
        }
        self.amount -= amount;
        self.last_update = at;
        BalanceChange::Applied(self.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.amount == BigDecimal::from(0)
    }
}

/// Outcome of a guarded balance mutation
#[derive(Debug, Clone, PartialEq)]
pub enum BalanceChange {
    /// The mutation was applied; carries the updated holding
    Applied(Holding),
    /// The holding cannot cover the debit; nothing changed
    Insufficient { available: BigDecimal },
    /// The debit predates the holding's latest mutation; nothing changed
    OutOfOrder { last_update: NaiveDateTime },
}

impl BalanceChange {
    pub fn is_applied(&self) -> bool {
        matches!(self, BalanceChange::Applied(_))
    }
}

/// Direction of a trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeKind {
    /// Units are added to the holding
    Buy,
    /// Units are removed from the holding
    Sell,
}

impl fmt::Display for TradeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeKind::Buy => write!(f, "buy"),
            TradeKind::Sell => write!(f, "sell"),
        }
    }
}

/// Recorded buy or sell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioTransaction {
    /// Unique identifier, returned to the caller as the trade token
    pub id: String,
    pub user_id: InternalUserId,
    pub crypto_id: String,
    pub kind: TradeKind,
    /// Units bought or sold
    pub amount: BigDecimal,
    /// Catalog price per unit at execution
    pub unit_price: BigDecimal,
    /// `amount * unit_price`
    pub total_value: BigDecimal,
    /// Time the trade happened, as stated by the caller
    pub executed_at: NaiveDateTime,
    /// Time the trade was written to the ledger
    pub recorded_at: NaiveDateTime,
}

impl PortfolioTransaction {
    /// Create a new trade with a fresh identifier
    pub fn new(
        user_id: InternalUserId,
        crypto: &Cryptocurrency,
        kind: TradeKind,
        amount: BigDecimal,
        executed_at: NaiveDateTime,
    ) -> Self {
        let total_value = &amount * &crypto.current_price;
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            crypto_id: crypto.id.clone(),
            kind,
            amount,
            unit_price: crypto.current_price.clone(),
            total_value,
            executed_at,
            recorded_at: chrono::Utc::now().naive_utc(),
        }
    }

    /// Create a buy
    pub fn buy(
        user_id: InternalUserId,
        crypto: &Cryptocurrency,
        amount: BigDecimal,
        executed_at: NaiveDateTime,
    ) -> Self {
        Self::new(user_id, crypto, TradeKind::Buy, amount, executed_at)
    }

    /// Create a sell
    pub fn sell(
        user_id: InternalUserId,
        crypto: &Cryptocurrency,
        amount: BigDecimal,
        executed_at: NaiveDateTime,
    ) -> Self {
        Self::new(user_id, crypto, TradeKind::Sell, amount, executed_at)
    }
}

/// Buy or sell request as submitted by a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CryptoTransactionRequest {
    /// Catalog identifier of the asset
    pub crypto_id: String,
    /// Units to buy or sell
    pub amount: BigDecimal,
    /// When the trade happened
    pub date_time: NaiveDateTime,
}

impl CryptoTransactionRequest {
    pub fn new(crypto_id: String, amount: BigDecimal, date_time: NaiveDateTime) -> Self {
        Self {
            crypto_id,
            amount,
            date_time,
        }
    }
}

/// One line of a user's portfolio listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioEntry {
    pub crypto_id: String,
    pub crypto_name: String,
    /// Units held
    pub amount: BigDecimal,
    /// Catalog price per unit
    pub unit_price: BigDecimal,
    /// Value of the whole position (`amount * unit_price`)
    pub current_price: BigDecimal,
    #[serde(rename = "last_update")]
    pub last_update: NaiveDateTime,
}

impl PortfolioEntry {
    /// Value a holding at the given unit price
    pub fn from_holding(holding: &Holding, crypto_name: String, unit_price: BigDecimal) -> Self {
        Self {
            crypto_id: holding.crypto_id.clone(),
            crypto_name,
            amount: holding.amount.clone(),
            current_price: &holding.amount * &unit_price,
            unit_price,
            last_update: holding.last_update,
        }
    }
}

/// Errors that can occur in the portfolio ledger
#[derive(Debug, thiserror::Error)]
pub enum PortfolioError {
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Unknown cryptocurrency: {0}")]
    UnknownCryptocurrency(String),
    #[error("User not found: {0}")]
    UserNotFound(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Insufficient balance of {crypto_id}: requested {requested}, available {available}")]
    InsufficientBalance {
        crypto_id: String,
        requested: BigDecimal,
        available: BigDecimal,
    },
    #[error("Invalid transaction time: {0}")]
    InvalidTransactionTime(String),
    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type for portfolio operations
pub type PortfolioResult<T> = Result<T, PortfolioError>;

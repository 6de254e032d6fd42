//! In-memory storage and collaborator implementations for testing

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::traits::*;
use crate::types::*;

type HoldingKey = (InternalUserId, String);

#[derive(Debug, Default)]
struct MemoryState {
    holdings: HashMap<HoldingKey, Holding>,
    transactions: HashMap<String, PortfolioTransaction>,
}

impl MemoryState {
    fn credit(
        &mut self,
        user_id: InternalUserId,
        crypto_id: &str,
        amount: &BigDecimal,
        at: NaiveDateTime,
    ) -> Holding {
        let holding = self
            .holdings
            .entry((user_id, crypto_id.to_string()))
            .or_insert_with(|| Holding::new(user_id, crypto_id.to_string(), at));
        holding.credit(amount, at);
        holding.clone()
    }

    fn debit(
        &mut self,
        user_id: InternalUserId,
        crypto_id: &str,
        amount: &BigDecimal,
        at: NaiveDateTime,
    ) -> BalanceChange {
        match self.holdings.get_mut(&(user_id, crypto_id.to_string())) {
            Some(holding) => holding.debit(amount, at),
            None => BalanceChange::Insufficient {
                available: BigDecimal::from(0),
            },
        }
    }
}

/// In-memory storage implementation for testing and development
///
/// Clones share the same underlying state. Each mutation runs under a single
/// write-lock acquisition, which makes check-and-debit atomic.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStorage {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) -> PortfolioResult<()> {
        let mut state = self.write()?;
        state.holdings.clear();
        state.transactions.clear();
        Ok(())
    }

    fn read(&self) -> PortfolioResult<RwLockReadGuard<'_, MemoryState>> {
        self.state
            .read()
            .map_err(|e| PortfolioError::Storage(format!("state lock poisoned: {}", e)))
    }

    fn write(&self) -> PortfolioResult<RwLockWriteGuard<'_, MemoryState>> {
        self.state
            .write()
            .map_err(|e| PortfolioError::Storage(format!("state lock poisoned: {}", e)))
    }
}

#[async_trait]
impl PortfolioStorage for MemoryStorage {
    async fn get_holding(
        &self,
        user_id: InternalUserId,
        crypto_id: &str,
    ) -> PortfolioResult<Option<Holding>> {
        Ok(self
            .read()?
            .holdings
            .get(&(user_id, crypto_id.to_string()))
            .cloned())
    }

    async fn list_holdings(&self, user_id: InternalUserId) -> PortfolioResult<Vec<Holding>> {
        let state = self.read()?;
        let mut holdings: Vec<Holding> = state
            .holdings
            .values()
            .filter(|holding| holding.user_id == user_id)
            .cloned()
            .collect();
        holdings.sort_by(|a, b| a.crypto_id.cmp(&b.crypto_id));
        Ok(holdings)
    }

    async fn credit_holding(
        &self,
        user_id: InternalUserId,
        crypto_id: &str,
        amount: &BigDecimal,
        at: NaiveDateTime,
    ) -> PortfolioResult<Holding> {
        Ok(self.write()?.credit(user_id, crypto_id, amount, at))
    }

    async fn debit_holding(
        &self,
        user_id: InternalUserId,
        crypto_id: &str,
        amount: &BigDecimal,
        at: NaiveDateTime,
    ) -> PortfolioResult<BalanceChange> {
        Ok(self.write()?.debit(user_id, crypto_id, amount, at))
    }

    async fn record_trade(
        &self,
        transaction: &PortfolioTransaction,
    ) -> PortfolioResult<BalanceChange> {
        let mut state = self.write()?;

        if state.transactions.contains_key(&transaction.id) {
            return Err(PortfolioError::Storage(format!(
                "Transaction '{}' already recorded",
                transaction.id
            )));
        }

        let change = match transaction.kind {
            TradeKind::Buy => BalanceChange::Applied(state.credit(
                transaction.user_id,
                &transaction.crypto_id,
                &transaction.amount,
                transaction.executed_at,
            )),
            TradeKind::Sell => state.debit(
                transaction.user_id,
                &transaction.crypto_id,
                &transaction.amount,
                transaction.executed_at,
            ),
        };

        if change.is_applied() {
            state
                .transactions
                .insert(transaction.id.clone(), transaction.clone());
        }

        Ok(change)
    }

    async fn get_transaction(
        &self,
        transaction_id: &str,
    ) -> PortfolioResult<Option<PortfolioTransaction>> {
        Ok(self.read()?.transactions.get(transaction_id).cloned())
    }

    async fn get_user_transactions(
        &self,
        user_id: InternalUserId,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> PortfolioResult<Vec<PortfolioTransaction>> {
        let state = self.read()?;
        let mut filtered: Vec<PortfolioTransaction> = state
            .transactions
            .values()
            .filter(|txn| {
                if txn.user_id != user_id {
                    return false;
                }

                // Check time range
                if let Some(start) = start {
                    if txn.executed_at < start {
                        return false;
                    }
                }
                if let Some(end) = end {
                    if txn.executed_at > end {
                        return false;
                    }
                }

                true
            })
            .cloned()
            .collect();
        filtered.sort_by(|a, b| {
            a.executed_at
                .cmp(&b.executed_at)
                .then_with(|| a.recorded_at.cmp(&b.recorded_at))
        });
        Ok(filtered)
    }
}

/// In-memory cryptocurrency catalog
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    cryptocurrencies: Arc<RwLock<HashMap<String, Cryptocurrency>>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a catalog pre-populated with the given assets
    pub fn with_cryptocurrencies(cryptocurrencies: Vec<Cryptocurrency>) -> Self {
        let map = cryptocurrencies
            .into_iter()
            .map(|crypto| (crypto.id.clone(), crypto))
            .collect();
        Self {
            cryptocurrencies: Arc::new(RwLock::new(map)),
        }
    }

    /// Insert or replace an asset
    pub fn insert(&self, crypto: Cryptocurrency) -> PortfolioResult<()> {
        self.cryptocurrencies
            .write()
            .map_err(|e| PortfolioError::Storage(format!("catalog lock poisoned: {}", e)))?
            .insert(crypto.id.clone(), crypto);
        Ok(())
    }

    /// Refresh the price of a known asset
    pub fn set_price(&self, crypto_id: &str, price: BigDecimal) -> PortfolioResult<()> {
        let mut cryptocurrencies = self
            .cryptocurrencies
            .write()
            .map_err(|e| PortfolioError::Storage(format!("catalog lock poisoned: {}", e)))?;
        let crypto = cryptocurrencies
            .get_mut(crypto_id)
            .ok_or_else(|| PortfolioError::UnknownCryptocurrency(crypto_id.to_string()))?;
        crypto.current_price = price;
        crypto.last_updated = chrono::Utc::now().naive_utc();
        Ok(())
    }

    /// Remove an asset from the catalog
    pub fn remove(&self, crypto_id: &str) -> PortfolioResult<Option<Cryptocurrency>> {
        Ok(self
            .cryptocurrencies
            .write()
            .map_err(|e| PortfolioError::Storage(format!("catalog lock poisoned: {}", e)))?
            .remove(crypto_id))
    }
}

#[async_trait]
impl CryptocurrencyCatalog for MemoryCatalog {
    async fn get_cryptocurrency(&self, crypto_id: &str) -> PortfolioResult<Option<Cryptocurrency>> {
        Ok(self
            .cryptocurrencies
            .read()
            .map_err(|e| PortfolioError::Storage(format!("catalog lock poisoned: {}", e)))?
            .get(crypto_id)
            .cloned())
    }

    async fn list_cryptocurrencies(&self) -> PortfolioResult<Vec<Cryptocurrency>> {
        let mut all: Vec<Cryptocurrency> = self
            .cryptocurrencies
            .read()
            .map_err(|e| PortfolioError::Storage(format!("catalog lock poisoned: {}", e)))?
            .values()
            .cloned()
            .collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all)
    }
}

/// In-memory external-to-internal user id mapping
#[derive(Debug, Clone, Default)]
pub struct MemoryUserDirectory {
    users: Arc<RwLock<HashMap<String, InternalUserId>>>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map an external id to an internal one
    pub fn register(&self, external_id: &str, user_id: InternalUserId) -> PortfolioResult<()> {
        self.users
            .write()
            .map_err(|e| PortfolioError::Storage(format!("user directory lock poisoned: {}", e)))?
            .insert(external_id.to_string(), user_id);
        Ok(())
    }
}

#[async_trait]
impl UserResolver for MemoryUserDirectory {
    async fn resolve(&self, external_id: &str) -> PortfolioResult<Option<InternalUserId>> {
        Ok(self
            .users
            .read()
            .map_err(|e| PortfolioError::Storage(format!("user directory lock poisoned: {}", e)))?
            .get(external_id)
            .copied())
    }
}

//! Main portfolio ledger that coordinates holdings, trades and valuation

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::LedgerConfig;
use crate::ledger::{HoldingManager, TradeManager};
use crate::traits::*;
use crate::types::*;
use crate::utils::validation::{validate_amount_magnitude, validate_external_user_id};

/// Portfolio ledger implementing [`PortfolioService`]
///
/// All methods take `&self`; share the ledger across tasks with an `Arc`.
pub struct PortfolioLedger<S: PortfolioStorage> {
    holding_manager: HoldingManager<S>,
    trade_manager: TradeManager<S>,
    catalog: Arc<dyn CryptocurrencyCatalog>,
    users: Arc<dyn UserResolver>,
    validator: Box<dyn RequestValidator>,
    config: LedgerConfig,
}

impl<S: PortfolioStorage + Clone> PortfolioLedger<S> {
    /// Create a new ledger over the given storage and collaborators
    pub fn new(
        storage: S,
        catalog: Arc<dyn CryptocurrencyCatalog>,
        users: Arc<dyn UserResolver>,
    ) -> Self {
        Self {
            holding_manager: HoldingManager::new(storage.clone()),
            trade_manager: TradeManager::new(storage),
            catalog,
            users,
            validator: Box::new(DefaultRequestValidator),
            config: LedgerConfig::default(),
        }
    }

    /// Replace the configuration
    pub fn with_config(mut self, config: LedgerConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the request validator
    pub fn with_validator(mut self, validator: Box<dyn RequestValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    async fn resolve_user(&self, user_id: &str) -> PortfolioResult<InternalUserId> {
        validate_external_user_id(user_id)?;
        self.users
            .resolve(user_id)
            .await?
            .ok_or_else(|| PortfolioError::UserNotFound(user_id.to_string()))
    }

    async fn require_cryptocurrency(&self, crypto_id: &str) -> PortfolioResult<Cryptocurrency> {
        self.catalog
            .get_cryptocurrency(crypto_id)
            .await?
            .ok_or_else(|| PortfolioError::UnknownCryptocurrency(crypto_id.to_string()))
    }

    async fn trade(
        &self,
        kind: TradeKind,
        request: &CryptoTransactionRequest,
        user_id: &str,
    ) -> PortfolioResult<String> {
        let now = chrono::Utc::now().naive_utc();
        self.validator.validate_request(request, &self.config, now)?;

        let internal_id = self.resolve_user(user_id).await?;
        let crypto = self.require_cryptocurrency(&request.crypto_id).await?;

        let transaction = PortfolioTransaction::new(
            internal_id,
            &crypto,
            kind,
            request.amount.clone(),
            request.date_time,
        );
        self.trade_manager.execute(&transaction).await?;

        Ok(transaction.id)
    }

    /// Credit a holding with an explicit credit time
    ///
    /// The credit time only moves the holding's `last_update` forward, so a
    /// later withdrawal dated at or after `at` is accepted.
    pub async fn add_to_portfolio_at(
        &self,
        crypto: &Cryptocurrency,
        amount: &BigDecimal,
        user_id: InternalUserId,
        at: NaiveDateTime,
    ) -> PortfolioResult<Holding> {
        validate_amount_magnitude(amount, self.config.max_amount_digits)?;
        self.holding_manager
            .add(&crypto.id, amount, user_id, at)
            .await
    }

    /// Get a single holding of a user
    pub async fn get_holding(
        &self,
        user_id: &str,
        crypto_id: &str,
    ) -> PortfolioResult<Option<Holding>> {
        let internal_id = self.resolve_user(user_id).await?;
        self.holding_manager.get_holding(internal_id, crypto_id).await
    }

    /// Get the balance of a holding, zero when the user never held the asset
    pub async fn get_balance(&self, user_id: &str, crypto_id: &str) -> PortfolioResult<BigDecimal> {
        let internal_id = self.resolve_user(user_id).await?;
        self.holding_manager.get_balance(internal_id, crypto_id).await
    }

    /// Total value of the user's portfolio at current prices
    pub async fn get_portfolio_value(&self, user_id: &str) -> PortfolioResult<BigDecimal> {
        let entries = self.get_user_portfolio(user_id).await?;
        Ok(entries.iter().map(|entry| &entry.current_price).sum())
    }

    /// Get a trade by ID
    pub async fn get_transaction(
        &self,
        transaction_id: &str,
    ) -> PortfolioResult<Option<PortfolioTransaction>> {
        self.trade_manager.get_transaction(transaction_id).await
    }

    /// Get a trade by ID, returning an error if not found
    pub async fn get_transaction_required(
        &self,
        transaction_id: &str,
    ) -> PortfolioResult<PortfolioTransaction> {
        self.trade_manager
            .get_transaction_required(transaction_id)
            .await
    }

    /// Get a user's trade history, oldest first
    pub async fn get_user_transactions(
        &self,
        user_id: &str,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> PortfolioResult<Vec<PortfolioTransaction>> {
        let internal_id = self.resolve_user(user_id).await?;
        self.trade_manager
            .get_user_transactions(internal_id, start, end)
            .await
    }
}

#[async_trait]
impl<S: PortfolioStorage + Clone> PortfolioService for PortfolioLedger<S> {
    async fn buy_crypto_transaction(
        &self,
        request: &CryptoTransactionRequest,
        user_id: &str,
    ) -> PortfolioResult<String> {
        self.trade(TradeKind::Buy, request, user_id).await
    }

    async fn sell_crypto_transaction(
        &self,
        request: &CryptoTransactionRequest,
        user_id: &str,
    ) -> PortfolioResult<String> {
        self.trade(TradeKind::Sell, request, user_id).await
    }

    async fn get_user_portfolio(&self, user_id: &str) -> PortfolioResult<Vec<PortfolioEntry>> {
        let internal_id = self.resolve_user(user_id).await?;
        let holdings = self.holding_manager.list_holdings(internal_id).await?;

        let mut entries = Vec::with_capacity(holdings.len());
        for holding in holdings {
            if holding.is_empty() && !self.config.include_empty_holdings {
                continue;
            }

            let entry = match self.catalog.get_cryptocurrency(&holding.crypto_id).await? {
                Some(crypto) => {
                    PortfolioEntry::from_holding(&holding, crypto.name, crypto.current_price)
                }
                None => {
                    warn!(
                        user_id = %internal_id,
                        crypto_id = %holding.crypto_id,
                        "holding references an asset missing from the catalog; valuing at zero"
                    );
                    PortfolioEntry::from_holding(
                        &holding,
                        holding.crypto_id.clone(),
                        BigDecimal::from(0),
                    )
                }
            };
            entries.push(entry);
        }

        entries.sort_by(|a, b| a.crypto_id.cmp(&b.crypto_id));
        debug!(user_id = %internal_id, entries = entries.len(), "listed portfolio");
        Ok(entries)
    }

    async fn add_to_portfolio(
        &self,
        crypto: &Cryptocurrency,
        amount: &BigDecimal,
        user_id: InternalUserId,
    ) -> PortfolioResult<()> {
        let now = chrono::Utc::now().naive_utc();
        self.add_to_portfolio_at(crypto, amount, user_id, now)
            .await?;
        Ok(())
    }

    async fn withdraw_from_portfolio(
        &self,
        crypto: &Cryptocurrency,
        amount: &BigDecimal,
        user_id: InternalUserId,
        transaction_time: NaiveDateTime,
    ) -> PortfolioResult<bool> {
        validate_amount_magnitude(amount, self.config.max_amount_digits)?;
        self.holding_manager
            .withdraw(&crypto.id, amount, user_id, transaction_time)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::memory_storage::{MemoryCatalog, MemoryStorage, MemoryUserDirectory};
    use chrono::Duration;
    use std::str::FromStr;

    fn bitcoin() -> Cryptocurrency {
        Cryptocurrency::new(
            "bitcoin".to_string(),
            "btc".to_string(),
            "Bitcoin".to_string(),
            BigDecimal::from(60000),
        )
    }

    fn setup() -> (PortfolioLedger<MemoryStorage>, MemoryCatalog) {
        let catalog = MemoryCatalog::with_cryptocurrencies(vec![bitcoin()]);
        let users = MemoryUserDirectory::new();
        users.register("alice", InternalUserId(1)).unwrap();
        let ledger = PortfolioLedger::new(
            MemoryStorage::new(),
            Arc::new(catalog.clone()),
            Arc::new(users),
        );
        (ledger, catalog)
    }

    fn request(crypto_id: &str, amount: &str, ago_minutes: i64) -> CryptoTransactionRequest {
        CryptoTransactionRequest::new(
            crypto_id.to_string(),
            BigDecimal::from_str(amount).unwrap(),
            chrono::Utc::now().naive_utc() - Duration::minutes(ago_minutes),
        )
    }

    #[tokio::test]
    async fn test_buy_then_sell_flow() {
        let (ledger, _) = setup();

        let buy_id = ledger
            .buy_crypto_transaction(&request("bitcoin", "2", 30), "alice")
            .await
            .unwrap();
        assert_eq!(
            ledger.get_balance("alice", "bitcoin").await.unwrap(),
            BigDecimal::from(2)
        );

        let oversell = ledger
            .sell_crypto_transaction(&request("bitcoin", "3", 20), "alice")
            .await;
        assert!(matches!(
            oversell,
            Err(PortfolioError::InsufficientBalance { .. })
        ));
        assert_eq!(
            ledger.get_balance("alice", "bitcoin").await.unwrap(),
            BigDecimal::from(2)
        );

        let sell_id = ledger
            .sell_crypto_transaction(&request("bitcoin", "1", 10), "alice")
            .await
            .unwrap();
        assert_eq!(
            ledger.get_balance("alice", "bitcoin").await.unwrap(),
            BigDecimal::from(1)
        );

        let history = ledger.get_user_transactions("alice", None, None).await.unwrap();
        let ids: Vec<&str> = history.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec![buy_id.as_str(), sell_id.as_str()]);
    }

    #[tokio::test]
    async fn test_buy_failures() {
        let (ledger, _) = setup();

        assert!(matches!(
            ledger
                .buy_crypto_transaction(&request("dogecoin", "1", 1), "alice")
                .await,
            Err(PortfolioError::UnknownCryptocurrency(_))
        ));
        assert!(matches!(
            ledger
                .buy_crypto_transaction(&request("bitcoin", "0", 1), "alice")
                .await,
            Err(PortfolioError::InvalidAmount(_))
        ));
        assert!(matches!(
            ledger
                .buy_crypto_transaction(&request("bitcoin", "1", 1), "mallory")
                .await,
            Err(PortfolioError::UserNotFound(_))
        ));
        assert!(matches!(
            ledger
                .buy_crypto_transaction(&request("bitcoin", "1", 60 * 24 * 400), "alice")
                .await,
            Err(PortfolioError::InvalidTransactionTime(_))
        ));
        assert!(ledger.get_user_portfolio("alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_portfolio_valuation_follows_catalog_price() {
        let (ledger, catalog) = setup();

        ledger
            .buy_crypto_transaction(&request("bitcoin", "0.5", 5), "alice")
            .await
            .unwrap();
        catalog.set_price("bitcoin", BigDecimal::from(70000)).unwrap();

        let portfolio = ledger.get_user_portfolio("alice").await.unwrap();
        assert_eq!(portfolio.len(), 1);
        assert_eq!(portfolio[0].crypto_name, "Bitcoin");
        assert_eq!(portfolio[0].unit_price, BigDecimal::from(70000));
        assert_eq!(portfolio[0].current_price, BigDecimal::from(35000));
        assert_eq!(
            ledger.get_portfolio_value("alice").await.unwrap(),
            BigDecimal::from(35000)
        );
    }

    #[tokio::test]
    async fn test_oversized_amounts_are_rejected() {
        let (ledger, _) = setup();
        let btc = bitcoin();
        let huge = BigDecimal::from_str("1e20000000").unwrap();

        assert!(matches!(
            ledger
                .buy_crypto_transaction(&request("bitcoin", "1e20000000", 1), "alice")
                .await,
            Err(PortfolioError::InvalidAmount(_))
        ));
        assert!(matches!(
            ledger.add_to_portfolio(&btc, &huge, InternalUserId(1)).await,
            Err(PortfolioError::InvalidAmount(_))
        ));
        let now = chrono::Utc::now().naive_utc();
        assert!(matches!(
            ledger
                .withdraw_from_portfolio(&btc, &huge, InternalUserId(1), now)
                .await,
            Err(PortfolioError::InvalidAmount(_))
        ));
        assert!(ledger
            .get_holding("alice", "bitcoin")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_wide_trade_window_config() {
        let (ledger, _) = setup();
        let ledger = ledger.with_config(LedgerConfig {
            max_backdate_days: 1_000_000_000,
            max_future_skew_secs: i64::MAX,
            ..LedgerConfig::default()
        });

        ledger
            .buy_crypto_transaction(&request("bitcoin", "1", 0), "alice")
            .await
            .unwrap();
        ledger
            .buy_crypto_transaction(&request("bitcoin", "1", -60 * 24), "alice")
            .await
            .unwrap();
        assert_eq!(
            ledger.get_balance("alice", "bitcoin").await.unwrap(),
            BigDecimal::from(2)
        );
    }

    #[tokio::test]
    async fn test_wall_clock_credit_orders_later_withdrawals() {
        let (ledger, _) = setup();
        let btc = bitcoin();
        let before_credit = chrono::Utc::now().naive_utc() - Duration::minutes(5);

        ledger
            .add_to_portfolio(&btc, &BigDecimal::from(2), InternalUserId(1))
            .await
            .unwrap();
        assert!(matches!(
            ledger
                .withdraw_from_portfolio(&btc, &BigDecimal::from(1), InternalUserId(1), before_credit)
                .await,
            Err(PortfolioError::InvalidTransactionTime(_))
        ));

        ledger
            .add_to_portfolio_at(&btc, &BigDecimal::from(1), InternalUserId(2), before_credit)
            .await
            .unwrap();
        assert!(ledger
            .withdraw_from_portfolio(&btc, &BigDecimal::from(1), InternalUserId(2), before_credit)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_empty_holdings_can_be_hidden() {
        let (ledger, _) = setup();
        let ledger = ledger.with_config(LedgerConfig {
            include_empty_holdings: false,
            ..LedgerConfig::default()
        });

        let btc = bitcoin();
        let credited_at = chrono::Utc::now().naive_utc() - Duration::hours(1);
        ledger
            .add_to_portfolio_at(&btc, &BigDecimal::from(1), InternalUserId(1), credited_at)
            .await
            .unwrap();
        assert!(ledger
            .withdraw_from_portfolio(&btc, &BigDecimal::from(1), InternalUserId(1), credited_at)
            .await
            .unwrap());

        assert!(ledger.get_user_portfolio("alice").await.unwrap().is_empty());
        assert!(ledger
            .get_holding("alice", "bitcoin")
            .await
            .unwrap()
            .is_some());
    }
}

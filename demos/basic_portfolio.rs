//! Basic portfolio usage example

use bigdecimal::BigDecimal;
use portfolio_ledger::telemetry::init_tracing;
use portfolio_ledger::utils::{MemoryCatalog, MemoryStorage, MemoryUserDirectory};
use portfolio_ledger::{
    CryptoTransactionRequest, Cryptocurrency, InternalUserId, LedgerConfig, PortfolioError,
    PortfolioLedger, PortfolioService,
};
use std::str::FromStr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing()?;
    println!("Portfolio Ledger - Basic Example\n");

    // Catalog of tradable assets and a user directory
    let catalog = MemoryCatalog::with_cryptocurrencies(vec![
        Cryptocurrency::new(
            "bitcoin".to_string(),
            "btc".to_string(),
            "Bitcoin".to_string(),
            BigDecimal::from(60000),
        ),
        Cryptocurrency::new(
            "ethereum".to_string(),
            "eth".to_string(),
            "Ethereum".to_string(),
            BigDecimal::from(3000),
        ),
    ]);
    let users = MemoryUserDirectory::new();
    users.register("alice@example.com", InternalUserId(1))?;

    let ledger = PortfolioLedger::new(MemoryStorage::new(), Arc::new(catalog), Arc::new(users))
        .with_config(LedgerConfig::from_env());

    let now = chrono::Utc::now().naive_utc();
    let hour_ago = now - chrono::Duration::hours(1);

    // 1. Buy some crypto
    let buy = CryptoTransactionRequest::new("bitcoin".to_string(), BigDecimal::from(2), hour_ago);
    let token = ledger.buy_crypto_transaction(&buy, "alice@example.com").await?;
    println!("  Bought 2 BTC (transaction {})", token);

    let buy = CryptoTransactionRequest::new(
        "ethereum".to_string(),
        BigDecimal::from_str("1.5")?,
        hour_ago,
    );
    ledger.buy_crypto_transaction(&buy, "alice@example.com").await?;
    println!("  Bought 1.5 ETH");

    // 2. Try to oversell, then sell within balance
    let oversell = CryptoTransactionRequest::new("bitcoin".to_string(), BigDecimal::from(3), now);
    match ledger.sell_crypto_transaction(&oversell, "alice@example.com").await {
        Err(PortfolioError::InsufficientBalance { available, .. }) => {
            println!("  Sell of 3 BTC rejected, only {} available", available)
        }
        other => println!("  Unexpected outcome: {:?}", other),
    }

    let sell = CryptoTransactionRequest::new("bitcoin".to_string(), BigDecimal::from(1), now);
    ledger.sell_crypto_transaction(&sell, "alice@example.com").await?;
    println!("  Sold 1 BTC\n");

    // 3. Show the portfolio
    println!("Portfolio:");
    for entry in ledger.get_user_portfolio("alice@example.com").await? {
        println!(
            "  {:<10} {:>12} units @ {:>8} = {}",
            entry.crypto_name, entry.amount, entry.unit_price, entry.current_price
        );
    }
    println!(
        "  Total value: {}",
        ledger.get_portfolio_value("alice@example.com").await?
    );

    // 4. Trade history
    println!("\nHistory:");
    for txn in ledger
        .get_user_transactions("alice@example.com", None, None)
        .await?
    {
        println!(
            "  {} {} {} {} at {}",
            txn.executed_at, txn.kind, txn.amount, txn.crypto_id, txn.unit_price
        );
    }

    Ok(())
}

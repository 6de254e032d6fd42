//! # Portfolio Ledger
//!
//! Per-user cryptocurrency holdings with guarded balance mutations, trade
//! history and valuation at catalog prices.
//!
//! ## Features
//!
//! - **Buy and sell**: validated trades recorded atomically with their balance change
//! - **Balance guard**: debits never drive a holding negative, even under concurrency
//! - **Portfolio listing**: holdings valued at the catalog's current price
//! - **Identity split**: external string user ids resolved to internal numeric keys
//! - **Storage abstraction**: database-agnostic design with trait-based storage
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use portfolio_ledger::utils::{MemoryCatalog, MemoryStorage, MemoryUserDirectory};
//! use portfolio_ledger::{Cryptocurrency, InternalUserId, PortfolioLedger};
//! use bigdecimal::BigDecimal;
//!
//! let catalog = MemoryCatalog::with_cryptocurrencies(vec![Cryptocurrency::new(
//!     "bitcoin".to_string(),
//!     "btc".to_string(),
//!     "Bitcoin".to_string(),
//!     BigDecimal::from(60000),
//! )]);
//! let users = MemoryUserDirectory::new();
//! users.register("alice", InternalUserId(1)).unwrap();
//!
//! let ledger = PortfolioLedger::new(MemoryStorage::new(), Arc::new(catalog), Arc::new(users));
//! assert_eq!(ledger.config().max_backdate_days, 365);
//! ```

pub mod config;
pub mod ledger;
pub mod telemetry;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::LedgerConfig;
pub use ledger::*;
pub use traits::*;
pub use types::*;

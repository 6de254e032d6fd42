//! Ledger module containing holding management and trade processing

pub mod core;
pub mod holding;
pub mod transaction;

pub use self::core::*;
pub use holding::*;
pub use transaction::*;

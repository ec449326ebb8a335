//! homebudget-core: bill records, reference currencies, amount parsing and conversion

pub mod amount;
pub mod bill;
pub mod convert;
pub mod currency;
pub mod error;

pub use amount::{AmountParser, SymbolTable};
pub use bill::{Bill, Item, UNKNOWN_CATEGORY};
pub use convert::{convert, to_rub, to_usd};
pub use currency::{Currency, CurrencyCode, RateTable};
pub use error::{HomebudgetError, Result};

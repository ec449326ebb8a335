//! Receipt template parsers.

pub mod fiscal_receipt;

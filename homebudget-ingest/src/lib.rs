//! homebudget-ingest: fiscal receipt extraction from the tax portal's verification page.

pub mod html;
pub mod parsers;
pub mod types;

pub use html::find_receipt_text;
pub use parsers::fiscal_receipt::{FiscalReceiptParser, parse_receipt_html, parse_receipt_text};
pub use types::{RECEIPT_CATEGORY, RECEIPT_DESCRIPTION, ReceiptLabels};

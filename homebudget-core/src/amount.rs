//! Chat amount tokens: `"500"`, `"200€"`, `"15$"`, `"300tl"`.
//!
//! Grammar is a base-10 integer in whole major units, optionally followed by one
//! currency symbol. No decimal or thousands separators.

use crate::currency::{Currency, CurrencyCode, RateTable};
use crate::error::{HomebudgetError, Result};

/// Ordered (symbol, currency) pairs; the first suffix match wins.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    entries: Vec<(&'static str, CurrencyCode)>,
}

impl SymbolTable {
    /// Validate and build a table.
    ///
    /// Symbols must be non-empty and no symbol may be a suffix of another,
    /// otherwise the match order would silently decide the currency.
    pub fn new(entries: Vec<(&'static str, CurrencyCode)>) -> Result<Self> {
        for (i, (sym, code)) in entries.iter().enumerate() {
            if sym.is_empty() {
                return Err(HomebudgetError::Format(format!("empty symbol for {code}")));
            }
            if *sym != sym.to_lowercase() {
                return Err(HomebudgetError::Format(format!(
                    "symbol {sym:?} for {code} must be lowercase"
                )));
            }
            for (j, (other, other_code)) in entries.iter().enumerate() {
                if i != j && other.ends_with(sym) {
                    return Err(HomebudgetError::Format(format!(
                        "symbol {sym:?} ({code}) is a suffix of {other:?} ({other_code})"
                    )));
                }
            }
        }
        Ok(Self { entries })
    }

    /// EUR, USD, TRY, GBP, RUB in that order.
    pub fn standard() -> Self {
        Self {
            entries: [
                CurrencyCode::EUR,
                CurrencyCode::USD,
                CurrencyCode::TRY,
                CurrencyCode::GBP,
                CurrencyCode::RUB,
            ]
            .into_iter()
            .map(|c| (c.symbol(), c))
            .collect(),
        }
    }

    pub fn entries(&self) -> &[(&'static str, CurrencyCode)] {
        &self.entries
    }

    /// Split a normalized token into its numeric part and currency.
    fn split<'a>(&self, token: &'a str) -> (&'a str, CurrencyCode) {
        self.entries
            .iter()
            .find_map(|(sym, code)| token.strip_suffix(*sym).map(|rest| (rest, *code)))
            .unwrap_or((token, CurrencyCode::LOCAL))
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[derive(Debug, Clone, Default)]
pub struct AmountParser {
    symbols: SymbolTable,
}

impl AmountParser {
    pub fn new(symbols: SymbolTable) -> Self {
        Self { symbols }
    }

    /// Parse a token into whole units and the currency it names.
    pub fn parse_code(&self, token: &str) -> Result<(i64, CurrencyCode)> {
        let normalized = token.trim().to_lowercase();
        let (digits, code) = self.symbols.split(&normalized);
        let value: i64 = digits.parse().map_err(|e| {
            HomebudgetError::Format(format!("invalid amount {token:?}: {e}"))
        })?;
        Ok((value, code))
    }

    /// Parse a token and resolve its currency against a rate table.
    pub fn parse(&self, token: &str, rates: &RateTable) -> Result<(i64, Currency)> {
        let (value, code) = self.parse_code(token)?;
        Ok((value, rates.get(code)?.clone()))
    }
}

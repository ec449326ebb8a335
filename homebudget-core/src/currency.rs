//! Reference currencies and per-date rate snapshots.
//!
//! Rates are expressed in the accounting currency (RUB) per single unit of the
//! currency. Feed nominals are divided out once, when a table is built.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{HomebudgetError, Result};

/// The fixed reference set (ISO 4217).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CurrencyCode {
    /// Serbian dinar, the currency amounts are written in by default.
    RSD,
    EUR,
    USD,
    TRY,
    GBP,
    /// Russian ruble, the accounting currency every rate is quoted in.
    RUB,
}

impl CurrencyCode {
    pub const ALL: [CurrencyCode; 6] = [
        CurrencyCode::RSD,
        CurrencyCode::EUR,
        CurrencyCode::USD,
        CurrencyCode::TRY,
        CurrencyCode::GBP,
        CurrencyCode::RUB,
    ];

    /// Currency that plain amounts without a symbol are attributed to.
    pub const LOCAL: CurrencyCode = CurrencyCode::RSD;

    /// Currency every rate is expressed in.
    pub const ACCOUNTING: CurrencyCode = CurrencyCode::RUB;

    pub fn as_str(&self) -> &'static str {
        match self {
            CurrencyCode::RSD => "RSD",
            CurrencyCode::EUR => "EUR",
            CurrencyCode::USD => "USD",
            CurrencyCode::TRY => "TRY",
            CurrencyCode::GBP => "GBP",
            CurrencyCode::RUB => "RUB",
        }
    }

    /// ISO 4217 numeric code
    pub fn numeric(&self) -> u16 {
        match self {
            CurrencyCode::RSD => 941,
            CurrencyCode::EUR => 978,
            CurrencyCode::USD => 840,
            CurrencyCode::TRY => 949,
            CurrencyCode::GBP => 826,
            CurrencyCode::RUB => 643,
        }
    }

    /// Trailing symbol used in chat amounts. Lowercase, since tokens are
    /// lowercased before matching.
    pub fn symbol(&self) -> &'static str {
        match self {
            CurrencyCode::RSD => "",
            CurrencyCode::EUR => "€",
            CurrencyCode::USD => "$",
            CurrencyCode::TRY => "tl",
            CurrencyCode::GBP => "£",
            CurrencyCode::RUB => "₽",
        }
    }

    /// Parse from an alphabetic code; `None` outside the reference set.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_uppercase().as_str() {
            "RSD" => Some(CurrencyCode::RSD),
            "EUR" => Some(CurrencyCode::EUR),
            "USD" => Some(CurrencyCode::USD),
            "TRY" => Some(CurrencyCode::TRY),
            "GBP" => Some(CurrencyCode::GBP),
            "RUB" => Some(CurrencyCode::RUB),
            _ => None,
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One reference currency as of a calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    pub num_code: u16,
    pub code: CurrencyCode,
    /// RUB per 1 unit of this currency
    pub rate: Decimal,
    pub symbol: String,
}

impl Currency {
    /// Build a snapshot from a feed value quoted per `nominal` units.
    pub fn from_quote(code: CurrencyCode, num_code: u16, value: Decimal, nominal: u32) -> Result<Self> {
        if nominal == 0 {
            return Err(HomebudgetError::Decode(format!(
                "nominal of {code} must be positive"
            )));
        }
        if value <= Decimal::ZERO {
            return Err(HomebudgetError::Decode(format!(
                "rate of {code} must be positive, got {value}"
            )));
        }
        let rate = if nominal == 1 {
            value
        } else {
            value / Decimal::from(nominal)
        };
        Ok(Self {
            num_code,
            code,
            rate,
            symbol: code.symbol().to_string(),
        })
    }

    /// The accounting currency itself: rate 1, never fetched.
    pub fn rub() -> Self {
        Self {
            num_code: CurrencyCode::RUB.numeric(),
            code: CurrencyCode::RUB,
            rate: Decimal::ONE,
            symbol: CurrencyCode::RUB.symbol().to_string(),
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) = {} RUB", self.code, self.num_code, self.rate)
    }
}

/// All reference currencies resolved for one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateTable {
    pub date: NaiveDate,
    currencies: BTreeMap<CurrencyCode, Currency>,
}

impl RateTable {
    /// Build a table; the RUB identity entry is always present.
    pub fn new(date: NaiveDate, currencies: impl IntoIterator<Item = Currency>) -> Self {
        let mut map: BTreeMap<CurrencyCode, Currency> =
            currencies.into_iter().map(|c| (c.code, c)).collect();
        map.insert(CurrencyCode::RUB, Currency::rub());
        Self {
            date,
            currencies: map,
        }
    }

    pub fn get(&self, code: CurrencyCode) -> Result<&Currency> {
        self.currencies
            .get(&code)
            .ok_or(HomebudgetError::CurrencyNotFound {
                code,
                date: self.date,
            })
    }

    pub fn contains(&self, code: CurrencyCode) -> bool {
        self.currencies.contains_key(&code)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Currency> {
        self.currencies.values()
    }

    pub fn len(&self) -> usize {
        self.currencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.currencies.is_empty()
    }
}

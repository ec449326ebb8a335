//! JSON daily rate table quoted against the ruble.
//!
//! ```text
//! {"date": "2024-03-02", "rub": {"eur": 0.01008, "usd": 0.01091, "rsd": 1.1807, ...}}
//! ```
//! Each entry is the amount of that currency one ruble buys, so the rubles
//! per unit are the reciprocal.

use chrono::NaiveDate;
use homebudget_core::{Currency, CurrencyCode, HomebudgetError, RateTable, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;

use super::{RateSource, feed_url};
use crate::http::HttpClient;

pub const DEFAULT_URL: &str =
    "https://cdn.jsdelivr.net/npm/@fawazahmed0/currency-api@{date}/v1/currencies/rub.json";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Deserialize)]
struct RubQuotes {
    #[serde(default)]
    date: Option<String>,
    rub: HashMap<String, f64>,
}

#[derive(Debug, Clone)]
pub struct JsonRateSource {
    http: HttpClient,
    url_template: String,
}

impl JsonRateSource {
    pub fn new(http: HttpClient, url_template: impl Into<String>) -> Self {
        Self {
            http,
            url_template: url_template.into(),
        }
    }
}

impl RateSource for JsonRateSource {
    fn name(&self) -> &str {
        "json"
    }

    async fn fetch_raw(&self, date: NaiveDate) -> Result<Vec<u8>> {
        let url = feed_url(&self.url_template, date, DATE_FORMAT);
        log::debug!("fetching JSON rates for {date} from {url}");
        self.http.get_bytes(&url).await
    }

    fn parse(&self, date: NaiveDate, raw: &[u8]) -> Result<RateTable> {
        parse_json_rates(date, raw)
    }
}

pub fn parse_json_rates(date: NaiveDate, raw: &[u8]) -> Result<RateTable> {
    let quotes: RubQuotes = serde_json::from_slice(raw)
        .map_err(|e| HomebudgetError::Decode(format!("invalid rate JSON: {e}")))?;

    if let Some(published) = &quotes.date {
        log::debug!("JSON table requested for {date}, published as {published}");
    }

    let mut currencies = Vec::new();
    for code in CurrencyCode::ALL {
        if code == CurrencyCode::RUB {
            continue;
        }
        let Some(per_rub) = quotes.rub.get(&code.as_str().to_lowercase()) else {
            continue;
        };
        currencies.push(reciprocal_quote(code, *per_rub)?);
    }

    if currencies.is_empty() {
        return Err(HomebudgetError::Decode(format!(
            "rate JSON for {date} has no reference currencies"
        )));
    }

    Ok(RateTable::new(date, currencies))
}

fn reciprocal_quote(code: CurrencyCode, per_rub: f64) -> Result<Currency> {
    let per_rub = Decimal::try_from(per_rub)
        .map_err(|e| HomebudgetError::Decode(format!("{code}: bad quote {per_rub}: {e}")))?;
    let rate = Decimal::ONE
        .checked_div(per_rub)
        .ok_or_else(|| HomebudgetError::Decode(format!("{code}: quote {per_rub} has no inverse")))?;

    Currency::from_quote(code, code.numeric(), rate, 1)
}

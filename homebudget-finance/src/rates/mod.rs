//! Daily exchange-rate feeds and the date-keyed cache in front of them.
//!
//! - **cbr**: Central Bank of Russia XML (Windows-1251, comma decimals, nominals)
//! - **json**: daily JSON table quoted per 1 RUB
//! - **cache**: in-memory + on-disk snapshot cache, one fetch per date

pub mod cache;
pub mod cbr;
pub mod json;

pub use cache::{DirSnapshotStore, RateCache, SnapshotStore, cache_key};
pub use cbr::{CbrXmlSource, parse_cbr_xml};
pub use json::{JsonRateSource, parse_json_rates};

use chrono::NaiveDate;
use homebudget_core::{RateTable, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;

use crate::http::HttpClient;

/// A daily rate feed.
///
/// Fetching and parsing are split so the raw payload can be stored as the
/// durable snapshot and parsed again after a restart.
pub trait RateSource: Send + Sync {
    /// Feed name for logs
    fn name(&self) -> &str;

    /// Download the raw payload for `date`.
    fn fetch_raw(&self, date: NaiveDate) -> impl Future<Output = Result<Vec<u8>>> + Send;

    /// Turn a payload previously returned by `fetch_raw` into a rate table.
    fn parse(&self, date: NaiveDate, raw: &[u8]) -> Result<RateTable>;
}

/// Feed variant selected in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedKind {
    #[serde(rename = "cbr-xml")]
    CbrXml,
    #[serde(rename = "json")]
    Json,
}

impl FeedKind {
    pub fn default_url(&self) -> &'static str {
        match self {
            FeedKind::CbrXml => cbr::DEFAULT_URL,
            FeedKind::Json => json::DEFAULT_URL,
        }
    }
}

/// The configured feed.
#[derive(Debug, Clone)]
pub enum RateFeed {
    Cbr(CbrXmlSource),
    Json(JsonRateSource),
}

impl RateFeed {
    /// Build a feed; `url` is a template with a `{date}` placeholder.
    pub fn new(kind: FeedKind, http: HttpClient, url: Option<String>) -> Self {
        let url = url.unwrap_or_else(|| kind.default_url().to_string());
        match kind {
            FeedKind::CbrXml => RateFeed::Cbr(CbrXmlSource::new(http, url)),
            FeedKind::Json => RateFeed::Json(JsonRateSource::new(http, url)),
        }
    }
}

impl RateSource for RateFeed {
    fn name(&self) -> &str {
        match self {
            RateFeed::Cbr(s) => s.name(),
            RateFeed::Json(s) => s.name(),
        }
    }

    async fn fetch_raw(&self, date: NaiveDate) -> Result<Vec<u8>> {
        match self {
            RateFeed::Cbr(s) => s.fetch_raw(date).await,
            RateFeed::Json(s) => s.fetch_raw(date).await,
        }
    }

    fn parse(&self, date: NaiveDate, raw: &[u8]) -> Result<RateTable> {
        match self {
            RateFeed::Cbr(s) => s.parse(date, raw),
            RateFeed::Json(s) => s.parse(date, raw),
        }
    }
}

/// Substitute the formatted date into a feed URL template.
pub(crate) fn feed_url(template: &str, date: NaiveDate, date_format: &str) -> String {
    template.replace("{date}", &date.format(date_format).to_string())
}

//! Receipt pages from the fiscal verification portal.

use homebudget_core::{Bill, Result};
use homebudget_ingest::FiscalReceiptParser;

use crate::http::HttpClient;

/// Downloads a verification page and parses the receipt embedded in it.
#[derive(Debug, Clone)]
pub struct ReceiptFetcher {
    http: HttpClient,
    parser: FiscalReceiptParser,
}

impl ReceiptFetcher {
    pub fn new(http: HttpClient) -> Self {
        Self::with_parser(http, FiscalReceiptParser::default())
    }

    pub fn with_parser(http: HttpClient, parser: FiscalReceiptParser) -> Self {
        Self { http, parser }
    }

    /// GET the page. Pages are served as UTF-8; stray invalid bytes are replaced.
    pub async fn fetch_page(&self, url: &str) -> Result<String> {
        log::debug!("fetching receipt page {url}");
        let body = self.http.get_bytes(url).await?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    pub fn parse_page(&self, html: &str) -> Result<Bill> {
        self.parser.parse_html(html)
    }
}

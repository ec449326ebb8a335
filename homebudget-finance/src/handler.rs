//! One inbound message in, one stored bill (or one localized failure) out.

use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;
use homebudget_core::{HomebudgetError, Result};
use regex::Regex;

use crate::assembler::BillAssembler;
use crate::rates::{RateSource, SnapshotStore};
use crate::receipts::ReceiptFetcher;
use crate::stage::{DONE_REPLY, Stage, StageError};
use crate::store::{BillSink, FailedInputLog, StoredBill};

/// Prefix of receipt verification links.
pub const PORTAL_PREFIX: &str = "https://suf.purs.gov.rs/";

/// What a message asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// Receipt verification link
    Link(String),
    /// `"<amount><symbol> <description...>"`
    Text { token: String, description: String },
}

impl Inbound {
    pub fn classify(text: &str, portal_prefix: &str) -> Result<Self> {
        let text = text.trim();
        if text.starts_with(portal_prefix) {
            return Ok(Inbound::Link(text.to_string()));
        }

        let text_re = Regex::new(r"(?s)^(?P<token>\S+)\s+(?P<desc>.*\S)")
            .map_err(|e| HomebudgetError::Format(e.to_string()))?;
        let caps = text_re.captures(text).ok_or_else(|| {
            HomebudgetError::Format(format!(
                "expected \"<amount> <description>\", got {text:?}"
            ))
        })?;
        Ok(Inbound::Text {
            token: caps["token"].to_string(),
            description: caps["desc"].to_string(),
        })
    }
}

/// Result of handling one message.
#[derive(Debug)]
pub enum Outcome {
    Saved(StoredBill),
    Failed(StageError),
}

impl Outcome {
    /// Text to send back to the user.
    pub fn reply(&self) -> &'static str {
        match self {
            Outcome::Saved(_) => DONE_REPLY,
            Outcome::Failed(err) => err.reply(),
        }
    }

    pub fn is_saved(&self) -> bool {
        matches!(self, Outcome::Saved(_))
    }
}

pub struct MessageHandler<'a, S, St> {
    assembler: BillAssembler<'a, S, St>,
    receipts: ReceiptFetcher,
    bills: &'a dyn BillSink,
    failed: FailedInputLog,
    portal_prefix: String,
    timezone: Tz,
}

impl<'a, S: RateSource, St: SnapshotStore> MessageHandler<'a, S, St> {
    pub fn new(
        assembler: BillAssembler<'a, S, St>,
        receipts: ReceiptFetcher,
        bills: &'a dyn BillSink,
        failed: FailedInputLog,
    ) -> Self {
        Self {
            assembler,
            receipts,
            bills,
            failed,
            portal_prefix: PORTAL_PREFIX.to_string(),
            timezone: Tz::UTC,
        }
    }

    pub fn with_portal_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.portal_prefix = prefix.into();
        self
    }

    /// Zone chat timestamps are converted to before picking the rate date.
    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    /// Process one message from `user` sent at `sent_at`.
    ///
    /// Failures are logged and the raw text is appended to the failed-input
    /// log; they never propagate past this call.
    pub async fn handle(&self, user: &str, text: &str, sent_at: DateTime<Utc>) -> Outcome {
        log::info!("[{user}] {text}");

        match self.process(user, text, sent_at).await {
            Ok(bill) => {
                log::info!(
                    "saved bill for {user}: {} ({} items)",
                    bill.description,
                    bill.items.len()
                );
                Outcome::Saved(bill)
            }
            Err(err) => {
                log::error!("{}: {err}", err.reply());
                if let Err(e) = self.failed.append(text) {
                    log::error!(
                        "could not record failed input in {}: {e}",
                        self.failed.path().display()
                    );
                }
                Outcome::Failed(err)
            }
        }
    }

    async fn process(
        &self,
        user: &str,
        text: &str,
        sent_at: DateTime<Utc>,
    ) -> std::result::Result<StoredBill, StageError> {
        let assembled = match Inbound::classify(text, &self.portal_prefix) {
            Ok(Inbound::Link(url)) => {
                let page = self
                    .receipts
                    .fetch_page(&url)
                    .await
                    .map_err(|e| Stage::HandlingLink.fail(e))?;
                let bill = self
                    .receipts
                    .parse_page(&page)
                    .map_err(|e| Stage::ParsingBill.fail(e))?;
                self.assembler.assemble_receipt(bill).await?
            }
            Ok(Inbound::Text { token, description }) => {
                self.assembler
                    .assemble_text(&token, &description, self.local_time(sent_at))
                    .await?
            }
            Err(e) => return Err(Stage::ParsingBill.fail(e)),
        };

        let record = assembled
            .to_record(user)
            .map_err(|e| Stage::GettingCurrency.fail(e))?;
        self.bills
            .save(&record)
            .map_err(|e| Stage::SavingBill.fail(e))?;
        Ok(record)
    }

    fn local_time(&self, at: DateTime<Utc>) -> NaiveDateTime {
        at.with_timezone(&self.timezone).naive_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_link() {
        let url = "https://suf.purs.gov.rs/v/?vl=A0RaSlZYV0E3";
        assert_eq!(
            Inbound::classify(&format!("  {url}\n"), PORTAL_PREFIX).unwrap(),
            Inbound::Link(url.to_string())
        );
    }

    #[test]
    fn test_classify_text_keeps_whole_description() {
        assert_eq!(
            Inbound::classify("200€  dinner with friends", PORTAL_PREFIX).unwrap(),
            Inbound::Text {
                token: "200€".to_string(),
                description: "dinner with friends".to_string(),
            }
        );
    }

    #[test]
    fn test_classify_requires_description() {
        assert!(matches!(
            Inbound::classify("500", PORTAL_PREFIX),
            Err(HomebudgetError::Format(_))
        ));
        assert!(matches!(
            Inbound::classify("   ", PORTAL_PREFIX),
            Err(HomebudgetError::Format(_))
        ));
    }

    #[test]
    fn test_other_sites_are_text() {
        let inbound = Inbound::classify("https://example.com/receipt lunch", PORTAL_PREFIX).unwrap();
        assert!(matches!(inbound, Inbound::Text { .. }));
    }
}

//! Serbian fiscal receipt parser (text dump from the tax portal)
//!
//! Expected text, as embedded in the verification page:
//!   ============ ФИСКАЛНИ РАЧУН ============
//!   ...
//!   Назив   Цена         Кол.         Укупно
//!   Хлеб бели 500г /КОМ (Ђ)
//!        89,99          1          89,99
//!   Млеко 2,8% 1л /КОМ
//!   (Ђ)
//!       139,99          2         279,98
//!   ----------------------------------------
//!   Укупан износ:                     369,97
//!   ...
//!   ПФР време:          15.03.2024. 14:22:31
//!
//! Amounts are printed with a decimal comma and two decimals, so dropping the
//! comma (and any `.` grouping) yields minor units directly.

use chrono::NaiveDateTime;
use homebudget_core::{Bill, HomebudgetError, Item, Result};

use crate::html::find_receipt_text;
use crate::types::{RECEIPT_CATEGORY, RECEIPT_DESCRIPTION, ReceiptLabels};

/// What a line of the receipt switches the scanner into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Scanning,
    InItemBlock,
    InTotalLine,
    InTimestampLine,
}

#[derive(Debug, Clone, Default)]
pub struct FiscalReceiptParser {
    labels: ReceiptLabels,
}

impl FiscalReceiptParser {
    pub fn new(labels: ReceiptLabels) -> Self {
        Self { labels }
    }

    /// Parse the portal HTML page into a bill.
    pub fn parse_html(&self, html: &str) -> Result<Bill> {
        let text = find_receipt_text(html, &self.labels.banner)?;
        self.parse_text(&text)
    }

    /// Parse the plain receipt text into a bill.
    ///
    /// Any malformed item line fails the whole receipt.
    pub fn parse_text(&self, text: &str) -> Result<Bill> {
        let lines: Vec<&str> = text.lines().collect();
        let mut items = Vec::new();
        let mut total = None;
        let mut bought_at = None;

        let mut i = 0;
        while i < lines.len() {
            let line = lines[i];
            match self.state_for(line) {
                ScanState::InItemBlock => {
                    i = self.read_item_block(&lines, i + 1, &mut items)?;
                    continue;
                }
                ScanState::InTotalLine => total = Some(self.parse_total(line)?),
                ScanState::InTimestampLine => bought_at = Some(self.parse_timestamp(line)?),
                ScanState::Scanning => {}
            }
            i += 1;
        }

        let total = total.ok_or_else(|| structure(format!("no {:?} line", self.labels.total)))?;
        let bought_at =
            bought_at.ok_or_else(|| structure(format!("no {:?} line", self.labels.timestamp)))?;
        if items.is_empty() {
            return Err(structure("receipt has no items".to_string()));
        }

        let bill = Bill::new(total, bought_at, RECEIPT_DESCRIPTION, RECEIPT_CATEGORY).with_items(items);
        let items_total = bill
            .items_total()
            .ok_or_else(|| structure("item sums overflow".to_string()))?;
        if items_total != bill.total_amount {
            return Err(structure(format!(
                "total {} does not match item sums {items_total}",
                bill.total_amount
            )));
        }
        Ok(bill)
    }

    fn state_for(&self, line: &str) -> ScanState {
        if line.starts_with(&self.labels.items_header) {
            ScanState::InItemBlock
        } else if line.starts_with(&self.labels.total) {
            ScanState::InTotalLine
        } else if line.starts_with(&self.labels.timestamp) {
            ScanState::InTimestampLine
        } else {
            ScanState::Scanning
        }
    }

    /// Read consecutive items starting at the name line `start`.
    ///
    /// Returns the index of the separator line that closes the table.
    fn read_item_block(&self, lines: &[&str], start: usize, items: &mut Vec<Item>) -> Result<usize> {
        let mut name_idx = start;
        loop {
            let mut name = line_at(lines, name_idx)?.trim().to_string();
            let mut numeric_idx = name_idx + 1;
            if has_continuation(lines, name_idx) {
                let extra = lines[name_idx + 1].trim();
                if !extra.is_empty() {
                    name.push(' ');
                    name.push_str(extra);
                }
                numeric_idx += 1;
            }

            let item = parse_item_line(line_at(lines, numeric_idx)?, name)?;
            items.push(item);

            let next = numeric_idx + 1;
            if line_at(lines, next)?.starts_with(&self.labels.separator) {
                return Ok(next);
            }
            name_idx = next;
        }
    }

    fn parse_total(&self, line: &str) -> Result<i64> {
        let value = line
            .trim_start_matches(&self.labels.total)
            .trim()
            .replace(['.', ','], "");
        value
            .parse()
            .map_err(|e| structure(format!("invalid total {value:?}: {e}")))
    }

    fn parse_timestamp(&self, line: &str) -> Result<NaiveDateTime> {
        let value = line.trim_start_matches(&self.labels.timestamp).trim();
        NaiveDateTime::parse_from_str(value, &self.labels.timestamp_format).map_err(|e| {
            log::warn!("unparseable receipt timestamp {value:?}: {e}");
            structure(format!("invalid receipt timestamp {value:?}: {e}"))
        })
    }
}

/// Parse receipt HTML with the default template.
pub fn parse_receipt_html(html: &str) -> Result<Bill> {
    FiscalReceiptParser::default().parse_html(html)
}

/// Parse receipt text with the default template.
pub fn parse_receipt_text(text: &str) -> Result<Bill> {
    FiscalReceiptParser::default().parse_text(text)
}

/// Continuation lookahead: numeric lines are indented, so a line after the name
/// that does not start with a space is the wrapped rest of the title.
///
/// This is a property of the portal's template, not a grammar; it breaks if the
/// template stops indenting the numeric line.
fn has_continuation(lines: &[&str], name_idx: usize) -> bool {
    lines
        .get(name_idx + 1)
        .is_some_and(|next| !next.starts_with(' '))
}

/// `price count ... sum`: first two tokens are positional, the last one is the sum.
fn parse_item_line(line: &str, name: String) -> Result<Item> {
    let cleaned = line.trim().replace('.', "");
    let tokens: Vec<&str> = cleaned.split_whitespace().collect();
    if tokens.len() < 3 {
        return Err(structure(format!(
            "item {name:?}: expected price, count and sum in {line:?}"
        )));
    }

    let price = parse_minor(tokens[0], &name, "price")?;
    let count: f64 = tokens[1]
        .replace(',', ".")
        .parse()
        .map_err(|e| structure(format!("item {name:?}: invalid count {:?}: {e}", tokens[1])))?;
    let sum = parse_minor(tokens[tokens.len() - 1], &name, "sum")?;

    Ok(Item {
        name,
        price,
        count,
        sum,
    })
}

fn parse_minor(token: &str, name: &str, field: &str) -> Result<i64> {
    token
        .replace(',', "")
        .parse()
        .map_err(|e| structure(format!("item {name:?}: invalid {field} {token:?}: {e}")))
}

fn line_at<'a>(lines: &[&'a str], idx: usize) -> Result<&'a str> {
    lines
        .get(idx)
        .copied()
        .ok_or_else(|| structure("receipt ends inside the items table".to_string()))
}

fn structure(msg: String) -> HomebudgetError {
    HomebudgetError::Structure(msg)
}

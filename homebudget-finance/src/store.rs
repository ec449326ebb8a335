//! Persistence of assembled bills and of inputs that could not be processed.

use chrono::NaiveDateTime;
use homebudget_core::Result;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// One bill row as written to the ledger.
///
/// Amounts are minor units. `currency` is the ISO numeric code of the
/// currency `amount` is denominated in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredBill {
    pub user: String,
    pub bought_at: NaiveDateTime,
    pub description: String,
    pub category: String,
    pub amount: i64,
    pub currency: u16,
    pub amount_rub: i64,
    pub amount_usd: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<StoredItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredItem {
    pub title: String,
    pub price: i64,
    pub count: f64,
    pub amount: i64,
    pub currency: u16,
    pub amount_rub: i64,
    pub amount_usd: i64,
}

/// Destination for finished bills; a bill is handed over exactly once.
pub trait BillSink: Send + Sync {
    fn save(&self, bill: &StoredBill) -> Result<()>;
}

/// Append-only JSON-lines ledger file.
#[derive(Debug, Clone)]
pub struct JsonlBillStore {
    path: PathBuf,
}

impl JsonlBillStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every stored bill, oldest first. A missing file is an empty ledger.
    pub fn read_all(&self) -> Result<Vec<StoredBill>> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut bills = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            bills.push(serde_json::from_str(&line)?);
        }
        Ok(bills)
    }
}

impl BillSink for JsonlBillStore {
    fn save(&self, bill: &StoredBill) -> Result<()> {
        let mut line = serde_json::to_string(bill)?;
        line.push('\n');
        append(&self.path, &line)
    }
}

/// Raw texts of messages that failed, kept for manual inspection.
#[derive(Debug, Clone)]
pub struct FailedInputLog {
    path: PathBuf,
}

impl FailedInputLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `text` as one line; embedded newlines are flattened.
    pub fn append(&self, text: &str) -> Result<()> {
        let flat = text.lines().map(str::trim).collect::<Vec<_>>().join(" ");
        append(&self.path, &format!("{flat}\n"))
    }
}

fn append(path: &Path, data: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(data.as_bytes())?;
    Ok(())
}

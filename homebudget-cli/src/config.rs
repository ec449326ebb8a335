use anyhow::{Context, Result, anyhow};
use chrono_tz::Tz;
use homebudget_finance::{FeedKind, PORTAL_PREFIX};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::state::{ensure_homebudget_home, resolve};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub rates: RatesSection,
    pub receipts: ReceiptsSection,
    pub ledger: LedgerSection,
    /// Lowercase description → category for chat bills
    pub categories: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatesSection {
    pub feed: FeedKind,
    /// Feed URL template with a `{date}` placeholder; the feed's default when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Snapshot directory, relative to the data directory unless absolute
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
    pub timeout_secs: u64,
    pub max_attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiptsSection {
    pub portal_prefix: String,
    pub timeout_secs: u64,
    pub max_attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerSection {
    /// IANA zone chat timestamps are converted to
    pub timezone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bills_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_inputs_file: Option<PathBuf>,
}

impl Default for RatesSection {
    fn default() -> Self {
        Self {
            feed: FeedKind::CbrXml,
            url: None,
            cache_dir: None,
            timeout_secs: 15,
            max_attempts: 3,
        }
    }
}

impl Default for ReceiptsSection {
    fn default() -> Self {
        Self {
            portal_prefix: PORTAL_PREFIX.to_string(),
            timeout_secs: 30,
            max_attempts: 3,
        }
    }
}

impl Default for LedgerSection {
    fn default() -> Self {
        Self {
            timezone: "Europe/Belgrade".to_string(),
            bills_file: None,
            failed_inputs_file: None,
        }
    }
}

impl RatesSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn cache_dir(&self, home: &Path) -> PathBuf {
        resolve(home, self.cache_dir.as_deref(), "rates")
    }
}

impl ReceiptsSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl LedgerSection {
    pub fn timezone(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| anyhow!("invalid ledger.timezone {:?}: {e}", self.timezone))
    }

    pub fn bills_file(&self, home: &Path) -> PathBuf {
        resolve(home, self.bills_file.as_deref(), "bills.jsonl")
    }

    pub fn failed_inputs_file(&self, home: &Path) -> PathBuf {
        resolve(home, self.failed_inputs_file.as_deref(), "errorLinks")
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_homebudget_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    load_config_from(&config_path()?)
}

pub fn load_config_from(p: &Path) -> Result<Config> {
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn save_config(cfg: &Config, p: &Path) -> Result<()> {
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config(&Config::default(), &p)?;
    println!("Wrote {}", p.display());
    Ok(())
}

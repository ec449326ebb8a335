//! Date-keyed rate cache with durable per-day snapshots.
//!
//! Lookup order for a date: in-memory table, then the on-disk snapshot, then
//! the feed. The raw feed payload is what gets persisted, so a restart parses
//! the snapshot instead of hitting the network again.

use chrono::NaiveDate;
use homebudget_core::{Currency, CurrencyCode, RateTable, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;

use super::RateSource;

/// Snapshot file name / key for a date.
pub fn cache_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Durable storage for raw feed payloads, one entry per day.
pub trait SnapshotStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>>;
    fn save(&self, key: &str, raw: &[u8]) -> Result<()>;
}

/// Snapshots as plain files named by key under one directory.
#[derive(Debug, Clone)]
pub struct DirSnapshotStore {
    dir: PathBuf,
}

impl DirSnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl SnapshotStore for DirSnapshotStore {
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.path(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, key: &str, raw: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let tmp = self.dir.join(format!(".{key}.tmp"));
        fs::write(&tmp, raw)?;
        fs::rename(&tmp, self.path(key))?;
        Ok(())
    }
}

type TableCell = Arc<OnceCell<Arc<RateTable>>>;

/// Rate tables per calendar date, fetched at most once each.
///
/// Tables are never evicted. Concurrent lookups for the same date wait on one
/// shared fetch; a failed fetch leaves the date empty so the next lookup
/// tries again.
pub struct RateCache<S, St = DirSnapshotStore> {
    source: S,
    store: St,
    tables: Mutex<HashMap<NaiveDate, TableCell>>,
}

impl<S: RateSource, St: SnapshotStore> RateCache<S, St> {
    pub fn new(source: S, store: St) -> Self {
        Self {
            source,
            store,
            tables: Mutex::new(HashMap::new()),
        }
    }

    /// Currency snapshot for `code` on `date`. RUB never touches the cache.
    pub async fn get(&self, date: NaiveDate, code: CurrencyCode) -> Result<Currency> {
        if code == CurrencyCode::RUB {
            return Ok(Currency::rub());
        }
        let table = self.table(date).await?;
        table.get(code).cloned()
    }

    /// Full rate table for `date`.
    pub async fn table(&self, date: NaiveDate) -> Result<Arc<RateTable>> {
        let cell = self.cell(date);
        cell.get_or_try_init(|| self.load_or_fetch(date))
            .await
            .cloned()
    }

    /// Dates with a table installed in memory, ascending.
    pub fn cached_dates(&self) -> Vec<NaiveDate> {
        let tables = self.tables.lock().unwrap_or_else(|e| e.into_inner());
        let mut dates: Vec<NaiveDate> = tables
            .iter()
            .filter(|(_, cell)| cell.initialized())
            .map(|(date, _)| *date)
            .collect();
        dates.sort();
        dates
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    fn cell(&self, date: NaiveDate) -> TableCell {
        let mut tables = self.tables.lock().unwrap_or_else(|e| e.into_inner());
        match tables.get(&date) {
            Some(cell) => {
                log::debug!("rate table for {date} already requested");
                cell.clone()
            }
            None => {
                let cell = TableCell::default();
                tables.insert(date, cell.clone());
                cell
            }
        }
    }

    async fn load_or_fetch(&self, date: NaiveDate) -> Result<Arc<RateTable>> {
        let key = cache_key(date);

        if let Some(raw) = self.store.load(&key)? {
            match self.source.parse(date, &raw) {
                Ok(table) => {
                    log::info!("loaded rates for {key} from snapshot");
                    return Ok(Arc::new(table));
                }
                Err(e) => {
                    log::warn!("snapshot for {key} is unreadable, refetching: {e}");
                }
            }
        }

        log::info!("fetching rates for {key} from {}", self.source.name());
        let raw = self.source.fetch_raw(date).await?;
        let table = self.source.parse(date, &raw)?;
        match self.store.save(&key, &raw) {
            Ok(()) => log::info!("saved {} rates for {key}", table.len()),
            Err(e) => log::warn!("could not save rate snapshot for {key}: {e}"),
        }

        Ok(Arc::new(table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use homebudget_core::HomebudgetError;
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Payload format: one `CODE=rate` per line.
    struct CountingSource {
        calls: Arc<AtomicUsize>,
        body: String,
        fail: bool,
    }

    impl CountingSource {
        fn new(body: &str) -> Self {
            Self {
                calls: Arc::new(AtomicUsize::new(0)),
                body: body.to_string(),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new("")
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl RateSource for CountingSource {
        fn name(&self) -> &str {
            "counting"
        }

        async fn fetch_raw(&self, _date: NaiveDate) -> Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            if self.fail {
                return Err(HomebudgetError::fetch("feed down", true));
            }
            Ok(self.body.clone().into_bytes())
        }

        fn parse(&self, date: NaiveDate, raw: &[u8]) -> Result<RateTable> {
            let text = std::str::from_utf8(raw)
                .map_err(|e| HomebudgetError::Decode(e.to_string()))?;
            let mut currencies = Vec::new();
            for line in text.lines().filter(|l| !l.trim().is_empty()) {
                let (code, rate) = line
                    .split_once('=')
                    .ok_or_else(|| HomebudgetError::Decode(format!("bad line {line:?}")))?;
                let code = CurrencyCode::from_code(code)
                    .ok_or_else(|| HomebudgetError::Decode(format!("bad code {code:?}")))?;
                let rate: Decimal = rate
                    .parse()
                    .map_err(|e| HomebudgetError::Decode(format!("{e}")))?;
                currencies.push(Currency::from_quote(code, code.numeric(), rate, 1)?);
            }
            Ok(RateTable::new(date, currencies))
        }
    }

    const BODY: &str = "EUR=99.19\nUSD=91.69\nRSD=0.8497\n";

    /// Never has a snapshot and cannot write one.
    struct ReadOnlyStore;

    impl SnapshotStore for ReadOnlyStore {
        fn load(&self, _key: &str) -> Result<Option<Vec<u8>>> {
            Ok(None)
        }

        fn save(&self, _key: &str, _raw: &[u8]) -> Result<()> {
            Err(std::io::Error::other("read-only file system").into())
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 2).unwrap()
    }

    #[tokio::test]
    async fn test_second_lookup_served_from_memory() {
        let dir = TempDir::new().unwrap();
        let cache = RateCache::new(CountingSource::new(BODY), DirSnapshotStore::new(dir.path()));

        let first = cache.table(date()).await.unwrap();
        let second = cache.table(date()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(cache.source().calls(), 1);
        assert_eq!(cache.cached_dates(), vec![date()]);
        assert!(dir.path().join("2024-03-02").exists());
    }

    #[tokio::test]
    async fn test_snapshot_survives_restart() {
        let dir = TempDir::new().unwrap();
        let first = {
            let cache = RateCache::new(CountingSource::new(BODY), DirSnapshotStore::new(dir.path()));
            cache.get(date(), CurrencyCode::EUR).await.unwrap()
        };

        let cache = RateCache::new(CountingSource::new(BODY), DirSnapshotStore::new(dir.path()));
        let again = cache.get(date(), CurrencyCode::EUR).await.unwrap();

        assert_eq!(first, again);
        assert_eq!(cache.source().calls(), 0);
    }

    #[tokio::test]
    async fn test_rub_never_fetches() {
        let dir = TempDir::new().unwrap();
        let cache = RateCache::new(CountingSource::failing(), DirSnapshotStore::new(dir.path()));

        let rub = cache.get(date(), CurrencyCode::RUB).await.unwrap();

        assert_eq!(rub.rate, Decimal::ONE);
        assert_eq!(cache.source().calls(), 0);
        assert!(cache.cached_dates().is_empty());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_missing_currency_is_not_found() {
        let dir = TempDir::new().unwrap();
        let cache = RateCache::new(CountingSource::new(BODY), DirSnapshotStore::new(dir.path()));

        let err = cache.get(date(), CurrencyCode::GBP).await.unwrap_err();

        assert!(matches!(
            err,
            HomebudgetError::CurrencyNotFound { code: CurrencyCode::GBP, date: d } if d == date()
        ));
    }

    #[tokio::test]
    async fn test_failed_fetch_is_retried_later() {
        let dir = TempDir::new().unwrap();
        let cache = RateCache::new(CountingSource::failing(), DirSnapshotStore::new(dir.path()));

        assert!(cache.get(date(), CurrencyCode::USD).await.unwrap_err().is_retryable());
        assert!(cache.get(date(), CurrencyCode::USD).await.is_err());

        assert_eq!(cache.source().calls(), 2);
        assert!(cache.cached_dates().is_empty());
        assert!(!dir.path().join("2024-03-02").exists());
    }

    #[tokio::test]
    async fn test_malformed_feed_not_persisted() {
        let dir = TempDir::new().unwrap();
        let cache = RateCache::new(CountingSource::new("garbage"), DirSnapshotStore::new(dir.path()));

        let err = cache.table(date()).await.unwrap_err();

        assert!(matches!(err, HomebudgetError::Decode(_)));
        assert!(!dir.path().join("2024-03-02").exists());
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_refetched() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("2024-03-02"), "garbage").unwrap();
        let cache = RateCache::new(CountingSource::new(BODY), DirSnapshotStore::new(dir.path()));

        let usd = cache.get(date(), CurrencyCode::USD).await.unwrap();

        assert_eq!(usd.code, CurrencyCode::USD);
        assert_eq!(cache.source().calls(), 1);
        assert_eq!(fs::read_to_string(dir.path().join("2024-03-02")).unwrap(), BODY);
    }

    #[tokio::test]
    async fn test_unwritable_snapshot_still_serves_rates() {
        let cache = RateCache::new(CountingSource::new(BODY), ReadOnlyStore);

        let eur = cache.get(date(), CurrencyCode::EUR).await.unwrap();
        let usd = cache.get(date(), CurrencyCode::USD).await.unwrap();

        assert_eq!(eur.code, CurrencyCode::EUR);
        assert_eq!(usd.code, CurrencyCode::USD);
        assert_eq!(cache.source().calls(), 1);
        assert_eq!(cache.cached_dates(), vec![date()]);
    }

    #[tokio::test]
    async fn test_concurrent_lookups_share_one_fetch() {
        let dir = TempDir::new().unwrap();
        let cache = RateCache::new(CountingSource::new(BODY), DirSnapshotStore::new(dir.path()));

        let (eur, usd, rsd) = tokio::join!(
            cache.get(date(), CurrencyCode::EUR),
            cache.get(date(), CurrencyCode::USD),
            cache.get(date(), CurrencyCode::RSD),
        );

        assert!(eur.is_ok() && usd.is_ok() && rsd.is_ok());
        assert_eq!(cache.source().calls(), 1);
    }

    #[tokio::test]
    async fn test_dates_are_independent() {
        let dir = TempDir::new().unwrap();
        let cache = RateCache::new(CountingSource::new(BODY), DirSnapshotStore::new(dir.path()));
        let next = date().succ_opt().unwrap();

        cache.table(next).await.unwrap();
        cache.table(date()).await.unwrap();

        assert_eq!(cache.source().calls(), 2);
        assert_eq!(cache.cached_dates(), vec![date(), next]);
    }

    #[test]
    fn test_cache_key_is_iso_day() {
        assert_eq!(cache_key(date()), "2024-03-02");
    }
}

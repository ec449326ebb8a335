use anyhow::{Context, Result, bail};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use homebudget_finance::{
    BillAssembler, BillSink, CategoryMap, DirSnapshotStore, FailedInputLog, HttpClient,
    HttpSettings, JsonlBillStore, MessageHandler, Outcome, RateCache, RateFeed, ReceiptFetcher,
    StoredBill,
};
use homebudget_ingest::FiscalReceiptParser;
use std::path::{Path, PathBuf};

mod config;
mod state;

use config::Config;

#[derive(Parser, Debug)]
#[command(
    name = "homebudget",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("HOMEBUDGET_BUILD_SHA"), ")"),
    about = "Expense ingestion with currency normalization"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Handle one message: a receipt link or "<amount><symbol> <description>"
    Ingest {
        /// Message text; several words are joined with spaces
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,

        /// User the bill is recorded for (default: $USER)
        #[arg(long)]
        user: Option<String>,

        /// Message time as RFC 3339 (default: now)
        #[arg(long)]
        at: Option<String>,
    },

    /// Print the rate table for a date
    Rates {
        /// YYYY-MM-DD (default: today in the ledger time zone)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Parse a saved receipt page and show the bill
    Receipt {
        /// HTML page saved from the verification portal
        file: PathBuf,

        /// Also append the bill to the ledger
        #[arg(long)]
        save: bool,

        #[arg(long)]
        user: Option<String>,
    },

    /// Write the default config to ~/.homebudget/config.toml
    InitConfig,
}

/// Long-lived pieces built once from configuration.
struct App {
    config: Config,
    rates: RateCache<RateFeed, DirSnapshotStore>,
    categories: CategoryMap,
    ledger: JsonlBillStore,
    failed: FailedInputLog,
    receipts: ReceiptFetcher,
}

impl App {
    fn load() -> Result<Self> {
        let home = state::ensure_homebudget_home()?;
        let config = config::load_config()?;
        Self::from_config(config, &home)
    }

    fn from_config(config: Config, home: &Path) -> Result<Self> {
        let rates_http = HttpClient::new(HttpSettings {
            timeout: config.rates.timeout(),
            max_attempts: config.rates.max_attempts,
        })
        .context("rate feed HTTP client")?;
        let receipts_http = HttpClient::new(HttpSettings {
            timeout: config.receipts.timeout(),
            max_attempts: config.receipts.max_attempts,
        })
        .context("receipt HTTP client")?;

        let feed = RateFeed::new(config.rates.feed, rates_http, config.rates.url.clone());
        let cache_dir = config.rates.cache_dir(home);
        log::debug!("rate snapshots in {}", cache_dir.display());

        Ok(Self {
            rates: RateCache::new(feed, DirSnapshotStore::new(cache_dir)),
            categories: config.categories.iter().collect(),
            ledger: JsonlBillStore::new(config.ledger.bills_file(home)),
            failed: FailedInputLog::new(config.ledger.failed_inputs_file(home)),
            receipts: ReceiptFetcher::new(receipts_http),
            config,
        })
    }

    fn handler(&self) -> Result<MessageHandler<'_, RateFeed, DirSnapshotStore>> {
        Ok(MessageHandler::new(
            BillAssembler::new(&self.rates, &self.categories),
            self.receipts.clone(),
            &self.ledger,
            self.failed.clone(),
        )
        .with_portal_prefix(self.config.receipts.portal_prefix.clone())
        .with_timezone(self.config.ledger.timezone()?))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Command::InitConfig => {
            config::init_config()?;
        }

        Command::Ingest { text, user, at } => {
            let app = App::load()?;
            let sent_at = match at {
                Some(s) => DateTime::parse_from_rfc3339(&s)
                    .with_context(|| format!("invalid --at {s:?}"))?
                    .with_timezone(&Utc),
                None => Utc::now(),
            };
            let user = user.unwrap_or_else(default_user);

            let outcome = app.handler()?.handle(&user, &text.join(" "), sent_at).await;
            println!("{}", outcome.reply());
            match outcome {
                Outcome::Saved(bill) => print_bill(&bill),
                Outcome::Failed(err) => bail!(err),
            }
        }

        Command::Rates { date } => {
            let app = App::load()?;
            let date = match date {
                Some(d) => d,
                None => Utc::now()
                    .with_timezone(&app.config.ledger.timezone()?)
                    .date_naive(),
            };

            let table = app
                .rates
                .table(date)
                .await
                .with_context(|| format!("rates for {date}"))?;
            println!("Rates for {} (RUB per unit)", table.date);
            for currency in table.iter() {
                println!(
                    "  {} {:>3}  {:<2} {}",
                    currency.code, currency.num_code, currency.symbol, currency.rate
                );
            }
        }

        Command::Receipt { file, save, user } => {
            let html = std::fs::read_to_string(&file)
                .with_context(|| format!("read {}", file.display()))?;
            let bill = FiscalReceiptParser::default()
                .parse_html(&html)
                .with_context(|| format!("parsing {}", file.display()))?;

            let app = App::load()?;
            let assembled = BillAssembler::new(&app.rates, &app.categories)
                .assemble_receipt(bill)
                .await?;
            let record = assembled.to_record(&user.unwrap_or_else(default_user))?;
            print_bill(&record);

            if save {
                app.ledger
                    .save(&record)
                    .with_context(|| format!("write {}", app.ledger.path().display()))?;
                println!("Saved to {}", app.ledger.path().display());
            }
        }
    }

    Ok(())
}

fn default_user() -> String {
    std::env::var("USER").unwrap_or_else(|_| "local".to_string())
}

fn print_bill(bill: &StoredBill) {
    println!(
        "{} | {} | {} | {} ({}) = {} RUB = {} USD",
        bill.bought_at,
        bill.description,
        bill.category,
        minor(bill.amount),
        bill.currency,
        minor(bill.amount_rub),
        minor(bill.amount_usd)
    );
    for item in &bill.items {
        println!(
            "  - {} | {} x {} = {}",
            item.title,
            minor(item.price),
            item.count,
            minor(item.amount)
        );
    }
}

fn minor(amount: i64) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let abs = amount.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

//! Price Tracker - stock & price history database
//!
//! Polls the pricing API, records the latest state of every product and
//! appends to the price history whenever a price changes. Runs until killed.

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use price_tracker::{logging, run_cycle, Config, Database, Fetcher, Scheduler, TokioSleeper};
use std::path::{Path, PathBuf};

/// Log file used by the `setup` command
const SETUP_LOG_FILE: &str = "price_tracker_setup.log";

/// Price tracker - polls stock prices and keeps a price history in SQLite
#[derive(Parser, Debug)]
#[command(name = "price_tracker")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, global = true, default_value = "price_tracker.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll the API and record price changes (default)
    Run {
        /// Run a single cycle and exit
        #[arg(long, default_value_t = false)]
        once: bool,
    },
    /// Create the database file, tables and indexes (idempotent)
    Setup,
    /// Show a product's current state and price history
    History {
        sku: String,
        /// Only entries at or after this time (RFC 3339)
        #[arg(long)]
        since: Option<DateTime<Utc>>,
        /// Only entries at or before this time (RFC 3339)
        #[arg(long)]
        until: Option<DateTime<Utc>>,
    },
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let command = args.command.unwrap_or(Command::Run { once: false });

    let config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            let log_file = match command {
                Command::Setup => PathBuf::from(SETUP_LOG_FILE),
                _ => PathBuf::from("price_tracker.log"),
            };
            logging::init(&log_file);
            log::error!("Failed to load {}: {}", args.config.display(), e);
            std::process::exit(1);
        }
    };

    match command {
        Command::Run { once } => {
            logging::init(&config.logging.file);
            run(&config, once).await;
        }
        Command::Setup => {
            logging::init(Path::new(SETUP_LOG_FILE));
            setup(&config);
        }
        Command::History { sku, since, until } => {
            logging::init(&config.logging.file);
            history(&config, &sku, since, until);
        }
    }
}

async fn run(config: &Config, once: bool) {
    if let Err(e) = config.validate_api() {
        log::error!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    log::info!("Starting price_tracker...");
    log::info!("Database path: {}", config.database.path.display());

    let fetcher = match Fetcher::from_config(&config.api) {
        Ok(fetcher) => fetcher,
        Err(e) => {
            log::error!("Failed to build HTTP client: {}", e);
            std::process::exit(1);
        }
    };
    let db_path = config.database.path.as_path();
    let fetcher = &fetcher;

    if once {
        match run_cycle(db_path, fetcher).await {
            Ok(report) if report.failures.is_empty() => {}
            Ok(report) => {
                log::warn!("{} products failed to update", report.failures.len());
            }
            Err(e) => {
                log::error!("Tracking cycle failed: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    let interval = config.check_interval();
    log::info!(
        "Running in daemon mode, checking every {} minute(s)",
        interval.as_secs() / 60
    );

    Scheduler::new(TokioSleeper, interval)
        .run_forever(move || run_cycle(db_path, fetcher))
        .await;
}

fn setup(config: &Config) {
    log::info!("Starting database setup...");
    match Database::setup(&config.database.path) {
        Ok(_) => log::info!("Database setup completed successfully"),
        Err(e) => {
            log::error!("Database setup failed: {}", e);
            std::process::exit(1);
        }
    }
}

fn history(
    config: &Config,
    sku: &str,
    since: Option<DateTime<Utc>>,
    until: Option<DateTime<Utc>>,
) {
    let db = match Database::open(&config.database.path) {
        Ok(db) => db,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };

    let product = match db.product(sku) {
        Ok(Some(product)) => product,
        Ok(None) => {
            log::error!("Unknown product: {}", sku);
            std::process::exit(1);
        }
        Err(e) => {
            log::error!("Failed to read product {}: {}", sku, e);
            std::process::exit(1);
        }
    };

    println!(
        "{} {} {} - price {} - stock {} - updated {}",
        product.sku,
        product.model.as_deref().unwrap_or("-"),
        product.color.as_deref().unwrap_or("-"),
        product.current_price,
        product.stock_level,
        product.last_updated.to_rfc3339()
    );

    match db.price_history(sku, since, until) {
        Ok(entries) => {
            for entry in entries {
                println!(
                    "  {}  {:>12}  stock {}",
                    entry.timestamp.to_rfc3339(),
                    entry.price,
                    entry.stock_level
                );
            }
        }
        Err(e) => {
            log::error!("Failed to read price history for {}: {}", sku, e);
            std::process::exit(1);
        }
    }
}

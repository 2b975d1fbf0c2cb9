//! Cambio Simulator
//!
//! Command line harness for the exchange core: quotes, rate sheets and
//! scripted order wizard sessions.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cambio_common::CurrencyCode;
use cambio_fx::{
    spawn_refresh_loop, FallbackRateSource, FxConfig, JsonFileRateSource, QuoteInput, RateBook,
    RateSheet, RateSource, StaticRateSource,
};
use cambio_order::{ClientStorage, FileStorage, MemoryStorage, WizardConfig};

mod metrics;
mod runner;
mod script;

use runner::SessionRunner;
use script::SessionScript;

/// Cambio Simulator CLI
#[derive(Parser, Debug)]
#[command(name = "simulator")]
#[command(about = "Cambio exchange core test harness")]
struct Args {
    /// JSON rate sheet (defaults to the built-in storefront sheet)
    #[arg(long, global = true, env = "CAMBIO_RATES_PATH")]
    rates: Option<PathBuf>,

    /// Directory for client storage slots (in memory when unset)
    #[arg(long, global = true)]
    storage_dir: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Quote an amount between two currencies
    Quote {
        #[arg(long)]
        from: CurrencyCode,
        #[arg(long)]
        to: CurrencyCode,
        #[arg(long)]
        amount: Decimal,
        /// Treat the amount as the target amount
        #[arg(long)]
        inverse: bool,
    },
    /// List every listed pair with its brackets
    Pairs,
    /// Replay a built-in or JSON session script
    Session {
        /// Script name or path
        script: String,
    },
    /// Keep the rate book refreshed until Ctrl+C
    Watch {
        /// Refresh interval in seconds
        #[arg(long)]
        interval: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
    );
    if args.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let fx_config = FxConfig::from_env();
    fx_config.validate().map_err(anyhow::Error::msg)?;

    let source = rate_source(args.rates.as_ref());
    let book = Arc::new(RateBook::new(fx_config));
    book.refresh(source.as_ref()).await?;

    match args.command {
        Command::Quote {
            from,
            to,
            amount,
            inverse,
        } => {
            let input = if inverse {
                QuoteInput::To(amount)
            } else {
                QuoteInput::From(amount)
            };
            let quote = book.calculator().quote(&from, &to, input)?;

            println!(
                "{} {} -> {} {} (rate {}, {}, min {} {})",
                quote.from_amount,
                from,
                quote.to_amount,
                to,
                quote.rate,
                quote.route,
                quote.min_amount,
                from
            );
        }
        Command::Pairs => {
            let snapshot = book.snapshot();
            for pair in snapshot.table.pairs() {
                for tier in snapshot.table.tiers(&pair.from, &pair.to)? {
                    println!("{tier}");
                }
            }
        }
        Command::Session { script } => {
            let wizard_config = WizardConfig::from_env();
            wizard_config.validate().map_err(anyhow::Error::msg)?;

            let storage: Arc<dyn ClientStorage> = match &args.storage_dir {
                Some(dir) => Arc::new(FileStorage::open(dir)?),
                None => Arc::new(MemoryStorage::new()),
            };

            let script = SessionScript::load(&script)?;
            let runner = SessionRunner::new(book.clone(), storage, wizard_config);
            let report = runner.run(&script).await?;

            info!("Session complete: {}", report.name);
            info!("Final step: {}", report.final_step);
            info!("Steps: {}", report.metrics.steps);
            info!(
                "Recalculated: {}, unavailable: {}",
                report.metrics.recalculated, report.metrics.unavailable
            );
            for (code, count) in report.metrics.error_counts() {
                info!("Rejected {}: {}", code, count);
            }
            if let Some(receipt) = &report.receipt {
                info!("Order {} is {:?}", receipt.order_id, receipt.status);
            }
            info!("Expectations passed: {:.0}%", report.metrics.pass_rate() * 100.0);

            if !report.passed() {
                anyhow::bail!(
                    "{} expectation(s) failed in session {}",
                    report.metrics.expectations_failed,
                    report.name
                );
            }
        }
        Command::Watch { interval } => {
            let book = match interval {
                Some(secs) => {
                    let mut config = book.config().clone();
                    config.refresh_interval = Duration::from_secs(secs);
                    config.validate().map_err(anyhow::Error::msg)?;
                    let rebuilt = Arc::new(RateBook::new(config));
                    rebuilt.refresh(source.as_ref()).await?;
                    rebuilt
                }
                None => book,
            };

            let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
            let handle = spawn_refresh_loop(book.clone(), source, shutdown_rx);

            info!("Watching rates, press Ctrl+C to stop");
            tokio::signal::ctrl_c().await?;

            let _ = shutdown_tx.send(());
            handle.await?;

            let stats = book.stats();
            info!(
                version = stats.version,
                source = %stats.source,
                pairs = stats.pairs,
                stale = stats.stale,
                "Rate book at shutdown"
            );
        }
    }

    Ok(())
}

fn rate_source(path: Option<&PathBuf>) -> Arc<dyn RateSource> {
    let storefront: Arc<dyn RateSource> =
        Arc::new(StaticRateSource::new("storefront", RateSheet::storefront()));

    match path {
        Some(path) => {
            info!(path = %path.display(), "Loading rates from file");
            Arc::new(FallbackRateSource::new(vec![
                Arc::new(JsonFileRateSource::new(path.clone())),
                storefront,
            ]))
        }
        None => {
            warn!("No rate sheet given, using the built-in storefront sheet");
            storefront
        }
    }
}

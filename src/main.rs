use anyhow::Context;
use api_client::{ApiClient, BrokerClient, BrokerHistory, HistorySource, YahooHistory};
use chrono::Local;
use clap::{Parser, Subcommand};
use configuration::{Config, MonitorOverrides};
use core_types::Holding;
use engine::{
    EngineSettings, HighLookup, HistoricalHighResolver, HoldingQuote, MonitorHandle, PositionRow, SessionParams,
    TrailingStopEngine, load_targets, quote_holdings,
};
use events::LogBook;
use executor::{Executor, LiveExecutor, OrderDispatcher, SimulatedExecutor};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

mod display;
mod telemetry;

/// The main entry point for the Trailguard stop monitor.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Credentials usually live in .env; a missing file is fine.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let mut config = configuration::load_config(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let _guard = telemetry::init(&config.logging)?;
    tracing::info!(config = %cli.config.display(), "Trailguard starting.");

    match cli.command {
        Commands::Positions(args) => {
            args.overrides.apply(&mut config.monitor)?;
            handle_positions(config).await
        }
        Commands::Monitor(args) => {
            args.overrides.apply(&mut config.monitor)?;
            handle_monitor(config, args.refresh_secs).await
        }
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Trailing-stop monitor for broker stock holdings.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show holdings with their historical highs and estimated exit prices.
    Positions(PositionsArgs),
    /// Monitor holdings and sell each one when its trailing stop is hit.
    Monitor(MonitorArgs),
}

#[derive(Parser)]
struct PositionsArgs {
    #[command(flatten)]
    overrides: MonitorOverrides,
}

#[derive(Parser)]
struct MonitorArgs {
    #[command(flatten)]
    overrides: MonitorOverrides,

    /// Seconds between board refreshes.
    #[arg(long, default_value_t = 3)]
    refresh_secs: u64,
}

// ==============================================================================
// Wiring
// ==============================================================================

/// The broker history first, then the fallback feed when enabled.
fn history_sources(config: &Config, api_client: Arc<dyn ApiClient>) -> anyhow::Result<Vec<Arc<dyn HistorySource>>> {
    let mut sources: Vec<Arc<dyn HistorySource>> = vec![Arc::new(BrokerHistory::new(api_client))];
    if config.fallback.enabled {
        let timeout = Duration::from_secs(config.api.timeout_secs);
        sources.push(Arc::new(YahooHistory::new(&config.fallback, timeout)?));
    }
    Ok(sources)
}

/// Redraws the board every `refresh` until the session ends or `shutdown`
/// resolves. `shutdown` is polled across ticks, never recreated.
async fn watch_board<F>(
    handle: &MonitorHandle,
    rows: &mut [PositionRow],
    refresh: Duration,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = std::io::Result<()>>,
{
    let mut refresh = tokio::time::interval(refresh);
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = refresh.tick() => {
                let view = handle.view();
                display::apply_session(rows, &view);
                println!("\n[{}] session {}", Local::now().format("%H:%M:%S"), view.status);
                println!("{}", display::position_table(rows));
                if handle.is_finished() {
                    return Ok(());
                }
            }
            signal = &mut shutdown => {
                signal?;
                println!("Stopping after the current cycle...");
                handle.stop();
                return Ok(());
            }
        }
    }
}

fn quote_for(quotes: &HashMap<String, HoldingQuote>, holding: &Holding) -> HoldingQuote {
    quotes.get(&holding.code).cloned().unwrap_or_else(|| HoldingQuote {
        name: String::new(),
        price: holding.last_price,
    })
}

// ==============================================================================
// Positions Command
// ==============================================================================

async fn handle_positions(config: Config) -> anyhow::Result<()> {
    let api_client: Arc<dyn ApiClient> = Arc::new(BrokerClient::new(&config.api)?);
    let monitor = &config.monitor;
    let log = LogBook::new(monitor.log_capacity)?;
    let resolver = HistoricalHighResolver::new(
        api_client.clone(),
        history_sources(&config, api_client.clone())?,
        log,
    );

    let holdings = api_client.list_positions().await.context("listing positions")?;
    if holdings.is_empty() {
        println!("No open positions.");
        return Ok(());
    }
    let quotes = quote_holdings(api_client.as_ref(), &holdings).await;

    let today = Local::now().date_naive();
    let start = monitor.lookback_start_or_default(today);

    let progress_bar = ProgressBar::new(holdings.len() as u64);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let mut rows = Vec::with_capacity(holdings.len());
    for holding in &holdings {
        let excluded = monitor.is_excluded(&holding.code);
        let historical_high = if excluded {
            None
        } else {
            progress_bar.set_message(format!("Fetching {}...", holding.code));
            match resolver.lookup(&holding.code, start, today).await {
                HighLookup::Found { high, .. } => Some(high),
                HighLookup::NoData | HighLookup::Unresolved => None,
            }
        };
        let quote = quote_for(&quotes, holding);
        rows.push(PositionRow::new(
            holding,
            &quote,
            historical_high,
            monitor.trailing_stop_pct,
            excluded,
        ));
        progress_bar.inc(1);
    }
    progress_bar.finish_with_message("Historical highs loaded");

    println!(
        "\nTrailing stop {}% | highs since {start} ({}) | exit order {}",
        monitor.trailing_stop_pct,
        resolver.source_names().join(" > "),
        monitor.order_type
    );
    println!("{}", display::position_table(&rows));
    Ok(())
}

// ==============================================================================
// Monitor Command
// ==============================================================================

async fn handle_monitor(config: Config, refresh_secs: u64) -> anyhow::Result<()> {
    let api_client: Arc<dyn ApiClient> = Arc::new(BrokerClient::new(&config.api)?);
    let monitor = &config.monitor;
    let log = LogBook::new(monitor.log_capacity)?;

    let (holdings, targets) = load_targets(api_client.as_ref(), &monitor.excluded_symbols)
        .await
        .context("listing positions")?;
    if targets.is_empty() {
        println!("Nothing to monitor: no holdings outside the exclusion list.");
        return Ok(());
    }

    let today = Local::now().date_naive();
    let params = SessionParams::new(
        monitor.trailing_stop_pct,
        monitor.order_type,
        monitor.lookback_start_or_default(today),
        targets,
    )?;

    let executor: Arc<dyn Executor> = if monitor.dry_run {
        log.warn("DRY RUN: exit orders are logged, not sent");
        Arc::new(SimulatedExecutor::new())
    } else {
        Arc::new(LiveExecutor::new(api_client.clone()))
    };
    let resolver = HistoricalHighResolver::new(
        api_client.clone(),
        history_sources(&config, api_client.clone())?,
        log.clone(),
    );
    let dispatcher = OrderDispatcher::new(api_client.clone(), executor, log.clone());
    let engine = TrailingStopEngine::new(
        params,
        api_client.clone(),
        resolver,
        dispatcher,
        log,
        EngineSettings::from(monitor),
    );
    let handle = MonitorHandle::spawn(engine);

    let quotes = quote_holdings(api_client.as_ref(), &holdings).await;
    let mut rows: Vec<PositionRow> = holdings
        .iter()
        .map(|h| {
            let quote = quote_for(&quotes, h);
            PositionRow::new(h, &quote, None, monitor.trailing_stop_pct, monitor.is_excluded(&h.code))
        })
        .collect();

    println!("Monitoring started. Press Ctrl-C to stop.");
    watch_board(
        &handle,
        &mut rows,
        Duration::from_secs(refresh_secs.max(1)),
        tokio::signal::ctrl_c(),
    )
    .await?;

    let log = handle.logs().clone();
    handle.join().await?;
    display::print_log_book(&log);
    Ok(())
}

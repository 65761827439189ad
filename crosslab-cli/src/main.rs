//! CrossLab CLI: download, run, sweep and report commands.
//!
//! Commands:
//! - `download`: fetch daily prices from Yahoo Finance into the local store
//! - `run`: backtest an SMA crossover (or a precomputed signal CSV)
//! - `sweep`: rank a grid of window pairs over the same prices
//! - `reports`: list recent runs from the report history
//! - `store`: list what the local store holds

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crosslab_core::data::{fetch_prices, PriceProvider, PriceStore, YahooProvider};
use crosslab_runner::config::{normalize_symbol, DEFAULT_STORE_DIR};
use crosslab_runner::export::{format_currency, format_pct, format_ratio, stats_rows};
use crosslab_runner::report_store::DEFAULT_REPORT_FILE;
use crosslab_runner::{
    load_prices, load_signal_csv, run_backtest_from_signals, run_single_backtest, run_sweep,
    save_artifacts, BacktestConfig, BacktestResult, ParamGrid, ReportEntry, ReportStore,
    SweepResults,
};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Parser)]
#[command(
    name = "crosslab",
    version,
    about = "CrossLab CLI: SMA crossover backtesting"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download daily prices from Yahoo Finance into the local store.
    Download {
        /// Symbols to download (e.g., SPY QQQ AAPL).
        #[arg(required = true)]
        symbols: Vec<String>,

        /// Start date (YYYY-MM-DD). Defaults to 10 years ago.
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        end: Option<String>,

        /// Store directory.
        #[arg(long, default_value = DEFAULT_STORE_DIR)]
        store_dir: PathBuf,
    },
    /// Backtest one symbol.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Symbol to backtest (instead of --config).
        #[arg(long)]
        symbol: Option<String>,

        /// Short SMA window.
        #[arg(long)]
        short: Option<usize>,

        /// Long SMA window.
        #[arg(long)]
        long: Option<usize>,

        /// Initial capital.
        #[arg(long)]
        capital: Option<f64>,

        /// Precomputed signal CSV (date, close, position_change). Skips signal generation.
        #[arg(long)]
        signals: Option<PathBuf>,

        #[command(flatten)]
        data: DataArgs,

        /// Output directory for artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Report history file.
        #[arg(long, default_value = DEFAULT_REPORT_FILE)]
        report_store: PathBuf,
    },
    /// Rank a grid of SMA window pairs.
    Sweep {
        #[arg(long)]
        symbol: String,

        /// Short windows, comma separated. Defaults to 10,20,40.
        #[arg(long, value_delimiter = ',')]
        short: Vec<usize>,

        /// Long windows, comma separated. Defaults to 50,100,200.
        #[arg(long, value_delimiter = ',')]
        long: Vec<usize>,

        #[arg(long)]
        capital: Option<f64>,

        #[command(flatten)]
        data: DataArgs,

        /// Rows to print.
        #[arg(long, default_value_t = 10)]
        top: usize,

        /// Print the full results as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// List recent runs from the report history.
    Reports {
        #[arg(long, default_value = DEFAULT_REPORT_FILE)]
        report_store: PathBuf,

        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// List symbols in the local store.
    Store {
        #[arg(long, default_value = DEFAULT_STORE_DIR)]
        store_dir: PathBuf,
    },
}

/// Where prices come from.
#[derive(Args)]
struct DataArgs {
    /// Start date (YYYY-MM-DD). Defaults to 5 years ago.
    #[arg(long)]
    start: Option<String>,

    /// End date (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    end: Option<String>,

    /// Read prices from a CSV file (date, close, ...).
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Offline mode: no network access.
    #[arg(long, default_value_t = false)]
    offline: bool,

    /// Use synthetic data as fallback.
    #[arg(long, default_value_t = false)]
    synthetic: bool,

    /// Store directory. Defaults to the config's, or ./data.
    #[arg(long)]
    store_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "crosslab=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Download {
            symbols,
            start,
            end,
            store_dir,
        } => run_download(&symbols, start.as_deref(), end.as_deref(), &store_dir),
        Commands::Run {
            config,
            symbol,
            short,
            long,
            capital,
            signals,
            data,
            output_dir,
            report_store,
        } => {
            let mut cfg = base_config(config.as_deref(), symbol)?;
            if let Some(s) = short {
                cfg.strategy.short_window = s;
            }
            if let Some(l) = long {
                cfg.strategy.long_window = l;
            }
            if let Some(c) = capital {
                cfg.backtest.initial_capital = c;
            }
            data.apply(&mut cfg)?;
            cfg.validate()?;
            run_backtest_cmd(&cfg, signals.as_deref(), &output_dir, &report_store)
        }
        Commands::Sweep {
            symbol,
            short,
            long,
            capital,
            data,
            top,
            json,
        } => {
            let mut cfg = base_config(None, Some(symbol))?;
            if let Some(c) = capital {
                cfg.backtest.initial_capital = c;
            }
            data.apply(&mut cfg)?;
            let defaults = ParamGrid::crossover_default();
            let grid = ParamGrid::new(
                if short.is_empty() { defaults.short_windows } else { short },
                if long.is_empty() { defaults.long_windows } else { long },
            );
            cfg.validate()?;
            run_sweep_cmd(&cfg, &grid, top, json)
        }
        Commands::Reports {
            report_store,
            limit,
        } => run_reports(&report_store, limit),
        Commands::Store { store_dir } => run_store_status(&store_dir),
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .with_context(|| format!("invalid date '{s}', expected YYYY-MM-DD"))
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn years_ago(years: i64) -> NaiveDate {
    today() - chrono::Duration::days(365 * years)
}

/// Config from a file, or defaults for `symbol`.
fn base_config(config_path: Option<&Path>, symbol: Option<String>) -> Result<BacktestConfig> {
    match (config_path, symbol) {
        (Some(_), Some(_)) => bail!("--config and --symbol are mutually exclusive"),
        (None, None) => bail!("one of --config or --symbol is required"),
        (Some(path), None) => Ok(BacktestConfig::from_file(path)?),
        (None, Some(symbol)) => Ok(BacktestConfig::new(symbol, years_ago(5), today())),
    }
}

impl DataArgs {
    /// Overlay flags on `cfg`. Flags only switch `offline`/`synthetic` on.
    fn apply(&self, cfg: &mut BacktestConfig) -> Result<()> {
        if let Some(s) = &self.start {
            cfg.backtest.start_date = parse_date(s)?;
        }
        if let Some(e) = &self.end {
            cfg.backtest.end_date = parse_date(e)?;
        }
        if let Some(csv) = &self.csv {
            cfg.data.csv_path = Some(csv.clone());
        }
        if let Some(dir) = &self.store_dir {
            cfg.data.store_dir = dir.clone();
        }
        cfg.data.offline |= self.offline;
        cfg.data.synthetic |= self.synthetic;
        Ok(())
    }
}

fn make_provider(offline: bool) -> Result<Option<YahooProvider>> {
    if offline {
        return Ok(None);
    }
    Ok(Some(YahooProvider::new()?))
}

fn run_download(
    symbols: &[String],
    start: Option<&str>,
    end: Option<&str>,
    store_dir: &Path,
) -> Result<()> {
    let start_date = start.map(parse_date).transpose()?.unwrap_or_else(|| years_ago(10));
    let end_date = end.map(parse_date).transpose()?.unwrap_or_else(today);

    let store = PriceStore::new(store_dir);
    let provider = YahooProvider::new()?;
    let mut failures = 0usize;

    for symbol in symbols {
        let symbol = normalize_symbol(symbol);
        match fetch_prices(&store, Some(&provider), &symbol, start_date, end_date) {
            Ok(history) => {
                if let Some(reason) = &history.remote_error {
                    eprintln!("Warning for {symbol}: {reason}");
                }
                println!(
                    "{symbol:<8} {:>6} bars  {:<10}  {}",
                    history.len(),
                    history.source.to_string(),
                    history.company_name.as_deref().unwrap_or("")
                );
            }
            Err(e) => {
                failures += 1;
                eprintln!("Error for {symbol}: {e}");
            }
        }
    }

    if failures > 0 {
        bail!("{failures} of {} symbol(s) failed", symbols.len());
    }
    Ok(())
}

fn run_backtest_cmd(
    cfg: &BacktestConfig,
    signals: Option<&Path>,
    output_dir: &Path,
    report_store: &Path,
) -> Result<()> {
    let result = match signals {
        Some(path) => {
            let table = load_signal_csv(path)?;
            run_backtest_from_signals(&cfg.backtest.symbol, &table, cfg.backtest.initial_capital)?
        }
        None => {
            let store = PriceStore::new(&cfg.data.store_dir);
            let provider = make_provider(cfg.data.offline)?;
            let provider_ref = provider.as_ref().map(|p| p as &dyn PriceProvider);
            run_single_backtest(cfg, &store, provider_ref)?
        }
    };

    print_summary(&result);

    let run_dir = save_artifacts(&result, output_dir)?;
    println!("Artifacts saved to: {}", run_dir.display());

    ReportStore::new(report_store)
        .append(&ReportEntry::from_result(&result))
        .with_context(|| format!("failed to append to {}", report_store.display()))?;

    Ok(())
}

fn run_sweep_cmd(cfg: &BacktestConfig, grid: &ParamGrid, top: usize, json: bool) -> Result<()> {
    if grid.size() == 0 {
        bail!("the window grid has no pair with short < long");
    }

    let store = PriceStore::new(&cfg.data.store_dir);
    let provider = make_provider(cfg.data.offline)?;
    let provider_ref = provider.as_ref().map(|p| p as &dyn PriceProvider);
    let loaded = load_prices(
        &cfg.backtest.symbol,
        &store,
        provider_ref,
        &cfg.load_options(),
    )?;

    let results = run_sweep(cfg, &loaded, grid)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        print_sweep(&results, top);
    }
    Ok(())
}

fn run_reports(path: &Path, limit: usize) -> Result<()> {
    let entries = ReportStore::new(path)
        .latest(limit)
        .with_context(|| format!("failed to read {}", path.display()))?;

    if entries.is_empty() {
        println!("No reports in {}", path.display());
        return Ok(());
    }

    println!(
        "{:<19}  {:<8} {:>9} {:>14} {:>9} {:>7} {:>7} {:>6}",
        "Timestamp", "Symbol", "Windows", "Final Value", "Return", "Sharpe", "Trades", "P/L"
    );
    println!("{}", "-".repeat(92));
    for e in &entries {
        let windows = match (e.short_window, e.long_window) {
            (Some(s), Some(l)) => format!("{s}/{l}"),
            _ => "signals".to_string(),
        };
        println!(
            "{:<19}  {:<8} {:>9} {:>14} {:>9} {:>7.3} {:>7} {:>6}{}",
            e.run_timestamp.format("%Y-%m-%d %H:%M:%S"),
            e.symbol,
            windows,
            format_currency(e.stats.final_value),
            format_pct(e.stats.total_return_pct),
            e.stats.sharpe_ratio,
            e.stats.total_trades,
            format_ratio(&e.stats.profit_loss_ratio),
            if e.has_synthetic { "  (synthetic)" } else { "" },
        );
    }
    Ok(())
}

fn run_store_status(store_dir: &Path) -> Result<()> {
    let store = PriceStore::new(store_dir);
    let symbols = store.symbols()?;
    if symbols.is_empty() {
        println!("Store is empty: {}", store_dir.display());
        return Ok(());
    }

    println!("Store: {}", store_dir.display());
    println!();
    println!(
        "{:<8} {:<25} {:>8}  {}",
        "Symbol", "Date Range", "Bars", "Company"
    );
    println!("{}", "-".repeat(60));
    for symbol in &symbols {
        match store.meta(symbol) {
            Some(meta) => println!(
                "{:<8} {:<25} {:>8}  {}",
                symbol,
                format!("{} to {}", meta.first_date, meta.last_date),
                meta.bar_count,
                meta.company_name.as_deref().unwrap_or("")
            ),
            None => println!("{symbol:<8} (no meta)"),
        }
    }
    Ok(())
}

fn print_summary(result: &BacktestResult) {
    println!();
    println!("=== Backtest Result ===");
    match &result.company_name {
        Some(name) => println!("Symbol:         {} ({name})", result.symbol),
        None => println!("Symbol:         {}", result.symbol),
    }
    if let (Some(start), Some(end)) = (result.start_date, result.end_date) {
        println!("Period:         {start} to {end}");
    }
    match (result.short_window, result.long_window) {
        (Some(s), Some(l)) => println!("Strategy:       SMA crossover {s}/{l}"),
        _ => println!("Strategy:       supplied signals"),
    }
    println!("Bars:           {}", result.bar_count);
    println!("Data:           {}", result.data_source);
    println!();
    println!("--- Performance ---");
    for (label, value) in stats_rows(&result.stats) {
        println!("{:<22} {:>16}", format!("{label}:"), value);
    }
    if let Some(reason) = result.degenerate {
        println!();
        println!("NOTE: {reason}; statistics are neutral");
    }
    if result.has_synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
    println!();
}

fn print_sweep(results: &SweepResults, top: usize) {
    println!();
    println!(
        "=== Sweep: {} ({} pairs) ===",
        results.symbol,
        results.len()
    );
    println!(
        "{:>4} {:>6} {:>6} {:>8} {:>10} {:>10} {:>7} {:>6}",
        "Rank", "Short", "Long", "Sharpe", "Return", "Max DD", "Trades", "P/L"
    );
    println!("{}", "-".repeat(64));
    for (i, e) in results.entries.iter().take(top).enumerate() {
        println!(
            "{:>4} {:>6} {:>6} {:>8.3} {:>10} {:>10} {:>7} {:>6}",
            i + 1,
            e.short_window,
            e.long_window,
            e.stats.sharpe_ratio,
            format_pct(e.stats.total_return_pct),
            format_pct(e.stats.max_drawdown_pct),
            e.stats.total_trades,
            format_ratio(&e.stats.profit_loss_ratio),
        );
    }
    if results.has_synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
    println!();
}

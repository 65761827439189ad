//! Reporting and export of JSON, CSV and Markdown artifacts.
//!
//! All persisted results carry a `schema_version` field. Newer versions are
//! rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crosslab_core::domain::{PortfolioSeries, ProfitLossRatio, StatsBundle, Trade};

use crate::runner::{BacktestResult, SCHEMA_VERSION};

pub const RESULT_FILE: &str = "result.json";
pub const PORTFOLIO_FILE: &str = "portfolio.csv";
pub const TRADES_FILE: &str = "trades.csv";
pub const REPORT_FILE: &str = "report.md";

// ─── Formatting ─────────────────────────────────────────────────────

/// `$1,234.56`, with a leading minus for negative amounts.
pub fn format_currency(value: f64) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    let cents = format!("{:.2}", value.abs());
    let (int_part, frac_part) = cents.split_once('.').unwrap_or((cents.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{sign}${grouped}.{frac_part}")
}

/// A value already in percent, two decimals.
pub fn format_pct(value: f64) -> String {
    format!("{value:.2}%")
}

/// `inf` for an unbounded ratio.
pub fn format_ratio(ratio: &ProfitLossRatio) -> String {
    match ratio {
        ProfitLossRatio::Finite(v) => format!("{v:.2}"),
        ProfitLossRatio::Infinite => "inf".to_string(),
    }
}

/// Label/value rows for a statistics table.
pub fn stats_rows(stats: &StatsBundle) -> Vec<(&'static str, String)> {
    vec![
        ("Initial Capital", format_currency(stats.initial_capital)),
        ("Final Value", format_currency(stats.final_value)),
        ("Total Return", format_pct(stats.total_return_pct)),
        ("Annualized Return", format_pct(stats.annualized_return * 100.0)),
        (
            "Annualized Volatility",
            format_pct(stats.annualized_volatility * 100.0),
        ),
        ("Sharpe Ratio", format!("{:.3}", stats.sharpe_ratio)),
        ("Max Drawdown", format_pct(stats.max_drawdown_pct)),
        ("Total Trades", stats.total_trades.to_string()),
        ("Win Rate", format_pct(stats.win_rate_pct)),
        ("Average Profit", format_pct(stats.average_profit * 100.0)),
        ("Average Loss", format_pct(stats.average_loss * 100.0)),
        ("Profit/Loss Ratio", format_ratio(&stats.profit_loss_ratio)),
    ]
}

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestResult` to pretty JSON.
pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export the portfolio series, one row per bar.
pub fn export_portfolio_csv(portfolio: &PortfolioSeries) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "date",
        "close",
        "position_change",
        "shares_held",
        "cash",
        "holdings_value",
        "total_value",
        "period_return",
    ])?;

    for row in portfolio.rows() {
        wtr.write_record([
            &row.date.to_string(),
            &format!("{:.6}", row.close),
            &row.position_change.to_string(),
            &row.shares_held.to_string(),
            &format!("{:.6}", row.cash),
            &format!("{:.6}", row.holdings_value),
            &format!("{:.6}", row.total_value),
            &format!("{:.10}", row.period_return),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export closed trades.
pub fn export_trades_csv(trades: &[Trade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "entry_index",
        "entry_date",
        "entry_price",
        "exit_index",
        "exit_date",
        "exit_price",
        "bars_held",
        "profit_fraction",
    ])?;

    for t in trades {
        wtr.write_record([
            &t.entry_index.to_string(),
            &t.entry_date.to_string(),
            &format!("{:.6}", t.entry_price),
            &t.exit_index.to_string(),
            &t.exit_date.to_string(),
            &format!("{:.6}", t.exit_price),
            &t.bars_held.to_string(),
            &format!("{:.10}", t.profit_fraction),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Directory name for a run: symbol plus the first 12 hex digits of its id.
pub fn artifact_dir_name(result: &BacktestResult) -> String {
    let short_id: String = result.run_id.chars().take(12).collect();
    format!("{}_{}", result.symbol, short_id)
}

/// Save the full artifact set for a single backtest run.
///
/// Creates `{symbol}_{run id prefix}/` under `output_dir` containing
/// `result.json`, `portfolio.csv`, `trades.csv` and `report.md`. Re-running
/// the same configuration overwrites the same directory.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf> {
    let run_dir = output_dir.join(artifact_dir_name(result));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    write(&run_dir.join(RESULT_FILE), &export_json(result)?)?;
    write(
        &run_dir.join(PORTFOLIO_FILE),
        &export_portfolio_csv(&result.portfolio)?,
    )?;
    write(&run_dir.join(TRADES_FILE), &export_trades_csv(&result.trades)?)?;
    write(&run_dir.join(REPORT_FILE), &generate_report(result))?;

    Ok(run_dir)
}

fn write(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}

/// Load a `BacktestResult` from an artifact directory.
pub fn load_artifacts(dir: &Path) -> Result<BacktestResult> {
    let path = dir.join(RESULT_FILE);
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

// ─── Markdown report ────────────────────────────────────────────────

/// Generate a Markdown report for a single backtest run.
pub fn generate_report(result: &BacktestResult) -> String {
    let mut md = String::with_capacity(2048);

    match &result.company_name {
        Some(name) => md.push_str(&format!("# Backtest Report: {} ({})\n\n", result.symbol, name)),
        None => md.push_str(&format!("# Backtest Report: {}\n\n", result.symbol)),
    }

    md.push_str("## Run\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Run ID | {} |\n", result.run_id));
    if let (Some(start), Some(end)) = (result.start_date, result.end_date) {
        md.push_str(&format!("| Period | {start} to {end} |\n"));
    }
    match (result.short_window, result.long_window) {
        (Some(short), Some(long)) => {
            md.push_str(&format!("| Strategy | SMA crossover {short}/{long} |\n"))
        }
        _ => md.push_str("| Strategy | supplied signals |\n"),
    }
    md.push_str(&format!("| Bars | {} |\n", result.bar_count));
    md.push_str(&format!("| Data Source | {} |\n", result.data_source));
    md.push_str(&format!("| Dataset Hash | {} |\n", result.dataset_hash));
    if result.has_synthetic {
        md.push_str("| Data | **SYNTHETIC** |\n");
    }
    if let Some(reason) = result.degenerate {
        md.push_str(&format!("| Note | {reason} |\n"));
    }
    md.push('\n');

    md.push_str("## Performance Summary\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | ---: |\n");
    for (label, value) in stats_rows(&result.stats) {
        md.push_str(&format!("| {label} | {value} |\n"));
    }
    md.push('\n');

    if !result.trades.is_empty() {
        md.push_str("## Trades\n\n");
        md.push_str("| # | Entry | Entry Price | Exit | Exit Price | Bars | Return |\n");
        md.push_str("| ---: | --- | ---: | --- | ---: | ---: | ---: |\n");
        for (i, t) in result.trades.iter().enumerate() {
            md.push_str(&format!(
                "| {} | {} | {:.2} | {} | {:.2} | {} | {} |\n",
                i + 1,
                t.entry_date,
                t.entry_price,
                t.exit_date,
                t.exit_price,
                t.bars_held,
                format_pct(t.profit_fraction * 100.0),
            ));
        }
        md.push('\n');
    }

    md
}

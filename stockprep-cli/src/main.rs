//! stockprep CLI: download, run and cache management commands.
//!
//! Commands:
//! - `download`: fetch daily prices from Yahoo Finance and cache as Parquet
//! - `run`: prepare a curated dataset from a TOML config and/or flags
//! - `cache status`: list cached symbols with their date ranges

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use stockprep_core::data::{
    download_symbols, CircuitBreaker, DataProvider, ParquetCache, StdoutProgress, YahooProvider,
};
use stockprep_core::domain::DateWindow;
use stockprep_runner::{export_dataset, run_pipeline, PipelineConfig, PipelineResult};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "stockprep",
    about = "stockprep: analysis-ready daily price datasets",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download daily prices from Yahoo Finance and cache as Parquet.
    Download {
        /// Symbols to download (e.g., AAPL MSFT).
        #[arg(required = true)]
        symbols: Vec<String>,

        /// Trailing period ending at --end (e.g., 2y, 6mo, 30d, ytd).
        #[arg(long, default_value = "2y", conflicts_with = "start")]
        period: String,

        /// Start date (YYYY-MM-DD).
        #[arg(long)]
        start: Option<NaiveDate>,

        /// End date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Force re-download even if cached.
        #[arg(long, default_value_t = false)]
        force: bool,

        /// Cache directory.
        #[arg(long, default_value = "data/cache")]
        cache_dir: PathBuf,
    },
    /// Prepare the curated dataset and write its artifacts.
    Run(RunArgs),
    /// Cache management commands.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

/// Flags override values from the config file.
#[derive(Args)]
struct RunArgs {
    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    symbol: Option<String>,

    /// Trailing period ending at --end (e.g., 2y, 6mo).
    #[arg(long, conflicts_with = "start")]
    period: Option<String>,

    /// Start date (YYYY-MM-DD).
    #[arg(long)]
    start: Option<NaiveDate>,

    /// End date (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Import records from this CSV file instead of the cache or network.
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Offline mode: no network access.
    #[arg(long, default_value_t = false)]
    offline: bool,

    /// Use synthetic data as fallback.
    #[arg(long, default_value_t = false)]
    synthetic: bool,

    /// Re-download even if cached.
    #[arg(long, default_value_t = false)]
    force: bool,

    #[arg(long)]
    cache_dir: Option<PathBuf>,

    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Field separator for the exported CSV files.
    #[arg(long)]
    separator: Option<char>,

    /// Also export the clean dataset as Parquet.
    #[arg(long, default_value_t = false)]
    parquet: bool,

    /// File name prefix for exported artifacts (defaults to the symbol).
    #[arg(long)]
    prefix: Option<String>,
}

#[derive(Subcommand)]
enum CacheAction {
    /// Report cached symbols, date ranges and sizes.
    Status {
        /// Cache directory.
        #[arg(long, default_value = "data/cache")]
        cache_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Download {
            symbols,
            period,
            start,
            end,
            force,
            cache_dir,
        } => run_download(symbols, &period, start, end, force, cache_dir),
        Commands::Run(args) => run_cmd(args),
        Commands::Cache { action } => match action {
            CacheAction::Status { cache_dir } => run_cache_status(cache_dir),
        },
    }
}

/// Logs go to stderr; `RUST_LOG` overrides the default level.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("stockprep=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn run_download(
    symbols: Vec<String>,
    period: &str,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    force: bool,
    cache_dir: PathBuf,
) -> Result<()> {
    let end = end.unwrap_or_else(today);
    let window = match start {
        Some(start) => DateWindow::new(start, end)?,
        None => DateWindow::from_period(period, end)?,
    };

    let circuit_breaker = Arc::new(CircuitBreaker::default_provider());
    let provider = YahooProvider::new(circuit_breaker)?;
    let cache = ParquetCache::new(cache_dir);

    let symbols: Vec<String> = symbols.iter().map(|s| s.trim().to_ascii_uppercase()).collect();
    let sym_refs: Vec<&str> = symbols.iter().map(|s| s.as_str()).collect();

    let summary = download_symbols(&provider, &cache, &sym_refs, window, force, &StdoutProgress);

    if !summary.all_succeeded() {
        for (sym, err) in &summary.errors {
            tracing::error!(symbol = %sym, error = %err, "download failed");
        }
        anyhow::bail!("{} of {} download(s) failed", summary.failed, summary.total);
    }

    Ok(())
}

fn run_cmd(args: RunArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };
    apply_overrides(&mut config, args);
    config.validate()?;

    let cache = ParquetCache::new(&config.source.cache_dir);
    let provider = if config.source.offline {
        None
    } else {
        let circuit_breaker = Arc::new(CircuitBreaker::default_provider());
        Some(YahooProvider::new(circuit_breaker)?)
    };
    let provider_ref = provider.as_ref().map(|p| p as &dyn DataProvider);

    let result = run_pipeline(&config, &cache, provider_ref)?;
    print_summary(&result);

    let paths = export_dataset(&result, &config.export, &config.file_prefix())
        .context("failed to export artifacts")?;
    tracing::info!(
        symbol = %result.symbol,
        output_dir = %config.export.output_dir.display(),
        clean_rows = result.clean.len(),
        synthetic = result.is_synthetic(),
        "artifacts written"
    );
    println!("Curated dataset: {}", paths.curated_csv.display());
    println!("Clean dataset:   {}", paths.clean_csv.display());
    if let Some(parquet) = &paths.clean_parquet {
        println!("Parquet:         {}", parquet.display());
    }
    println!("Report:          {}", paths.report.display());
    println!("Manifest:        {}", paths.manifest.display());

    Ok(())
}

fn apply_overrides(config: &mut PipelineConfig, args: RunArgs) {
    if let Some(symbol) = args.symbol {
        config.dataset.symbol = symbol;
    }
    if let Some(period) = args.period {
        config.dataset.period = period;
        config.dataset.start = None;
    }
    if args.start.is_some() {
        config.dataset.start = args.start;
    }
    if args.end.is_some() {
        config.dataset.end = args.end;
    }
    if args.csv.is_some() {
        config.source.csv = args.csv;
    }
    config.source.offline |= args.offline;
    config.source.synthetic |= args.synthetic;
    config.source.force |= args.force;
    if let Some(dir) = args.cache_dir {
        config.source.cache_dir = dir;
    }
    if let Some(dir) = args.output_dir {
        config.export.output_dir = dir;
    }
    if let Some(sep) = args.separator {
        config.export.separator = sep;
    }
    config.export.parquet |= args.parquet;
    if args.prefix.is_some() {
        config.export.file_prefix = args.prefix;
    }
}

fn run_cache_status(cache_dir: PathBuf) -> Result<()> {
    let cache = ParquetCache::new(&cache_dir);
    let rows = cache.status()?;

    if rows.is_empty() {
        println!("Cache is empty: {}", cache_dir.display());
        return Ok(());
    }

    let total_size: u64 = rows.iter().map(|r| r.size_bytes).sum();
    println!("Cache: {}", cache_dir.display());
    println!("Symbols: {}", rows.len());
    println!("Total size: {}", format_size(total_size));
    println!();
    println!(
        "{:<8} {:<25} {:<10} {:<14} {:>10}",
        "Symbol", "Date Range", "Rows", "Source", "Size"
    );
    println!("{}", "-".repeat(71));
    for row in &rows {
        let (range, count, source) = match &row.meta {
            Some(meta) => (
                format!("{} to {}", meta.start_date, meta.end_date),
                meta.row_count.to_string(),
                meta.source.to_string(),
            ),
            None => ("(no meta)".into(), "-".into(), "-".into()),
        };
        println!(
            "{:<8} {:<25} {:<10} {:<14} {:>10}",
            row.symbol,
            range,
            count,
            source,
            format_size(row.size_bytes)
        );
    }

    Ok(())
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

fn print_summary(result: &PipelineResult) {
    let c = &result.cleaning;
    println!();
    println!("=== Curated Dataset ===");
    println!("Symbol:         {}", result.symbol);
    println!("Window:         {}", result.window);
    println!("Source:         {}", result.source);
    println!("Input rows:     {}", c.input_rows);
    println!("Curated rows:   {}", result.curated.len());
    println!("Clean rows:     {}", result.clean.len());
    println!("Features:       {}", result.curated.features.names().join(", "));
    println!();
    println!("--- Cleaning ---");
    println!("Duplicates:     {}", c.duplicates_removed);
    println!("Invalid values: {}", c.invalid_values);
    println!("Filled values:  {}", c.filled_values);
    println!("Rejected rows:  {}", c.rejected_rows);
    println!();
    println!(
        "Outliers (|Return| > {}): {}",
        result.outlier_threshold,
        result.outliers.len()
    );
    for o in &result.outliers {
        println!("  {}  close {:.4}  return {:+.4}", o.date, o.close, o.ret);
    }
    if result.is_synthetic() {
        println!();
        println!("WARNING: Dataset based on SYNTHETIC data");
    }
    for warn in &result.warnings {
        println!("WARNING: {warn}");
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_override_config() {
        let cli = Cli::try_parse_from([
            "stockprep",
            "run",
            "--symbol",
            "msft",
            "--period",
            "6mo",
            "--separator",
            ",",
            "--offline",
            "--parquet",
        ])
        .unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run command");
        };

        let mut config = PipelineConfig::default();
        config.dataset.start = Some(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        apply_overrides(&mut config, args);

        assert_eq!(config.dataset.symbol, "msft");
        assert_eq!(config.dataset.period, "6mo");
        assert_eq!(config.dataset.start, None);
        assert_eq!(config.export.separator, ',');
        assert!(config.source.offline);
        assert!(config.export.parquet);
        assert!(!config.source.synthetic);
    }

    #[test]
    fn period_conflicts_with_start() {
        let parsed = Cli::try_parse_from([
            "stockprep", "run", "--period", "1y", "--start", "2024-01-01",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn format_size_units() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }
}

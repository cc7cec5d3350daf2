//! techscan CLI: run the indicator analysis over a ticker universe.
//!
//! Commands:
//! - `analyze`: fetch, clean and analyze tickers, writing tables and charts
//! - `universe`: list the ticker universe
//! - `validate-config`: check a TOML config file and print it resolved

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use techscan_core::domain::{Category, TickerUniverse};
use techscan_core::engine::IndicatorProfile;
use techscan_runner::{
    AnalysisConfig, AnalysisPipeline, BatchReport, BatchRunner, FsSink, LogProgress, SourceKind,
};

#[derive(Parser)]
#[command(
    name = "techscan",
    about = "techscan: technical indicator analysis for ETFs and stocks"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze tickers and write indicator tables and charts.
    Analyze(AnalyzeArgs),

    /// List the ticker universe.
    Universe {
        /// Universe TOML file. Defaults to the built-in list.
        #[arg(long)]
        universe: Option<PathBuf>,

        /// Print as TOML instead of a listing.
        #[arg(long, default_value_t = false)]
        toml: bool,
    },

    /// Validate a config file and print it with defaults filled in.
    ValidateConfig {
        /// Path to the TOML config file.
        path: PathBuf,
    },
}

#[derive(clap::Args)]
struct AnalyzeArgs {
    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Universe TOML file. Defaults to the built-in list.
    #[arg(long)]
    universe: Option<PathBuf>,

    /// Start date (YYYY-MM-DD).
    #[arg(long)]
    start: Option<String>,

    /// End date (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    end: Option<String>,

    /// Output root directory.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Data source: yahoo, csv or synthetic.
    #[arg(long)]
    source: Option<String>,

    /// Directory of {TICKER}.csv files for the csv source.
    #[arg(long)]
    csv_dir: Option<PathBuf>,

    /// Number of tickers analyzed in parallel.
    #[arg(long)]
    workers: Option<usize>,

    /// Indicator profile: technical, advanced or full.
    #[arg(long)]
    profile: Option<String>,

    /// Only analyze this category (ETF or Stock).
    #[arg(long)]
    category: Option<String>,

    /// Skip chart rendering.
    #[arg(long, default_value_t = false)]
    no_charts: bool,

    /// Print the plan without fetching anything.
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Tickers to analyze. Defaults to the whole universe.
    tickers: Vec<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze(args) => run_analyze(args),
        Commands::Universe { universe, toml } => run_universe(universe.as_deref(), toml),
        Commands::ValidateConfig { path } => run_validate_config(&path),
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{s}' (expected YYYY-MM-DD)"))
}

fn load_universe(path: Option<&Path>) -> Result<TickerUniverse> {
    match path {
        Some(p) => TickerUniverse::from_file(p)
            .with_context(|| format!("failed to load universe {}", p.display())),
        None => Ok(TickerUniverse::default_us()),
    }
}

fn resolve_config(args: &AnalyzeArgs) -> Result<AnalysisConfig> {
    let mut config = match &args.config {
        Some(path) => AnalysisConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => AnalysisConfig::default(),
    };

    if let Some(s) = &args.start {
        config.start = parse_date(s)?;
    }
    if let Some(s) = &args.end {
        config.end = Some(parse_date(s)?);
    }
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(source) = &args.source {
        config.source.kind = source.parse::<SourceKind>()?;
    }
    if let Some(dir) = &args.csv_dir {
        config.source.csv_dir = Some(dir.clone());
    }
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if let Some(profile) = &args.profile {
        config.profile = profile.parse::<IndicatorProfile>()?;
    }
    if args.no_charts {
        config.render_charts = false;
    }

    config.validate()?;
    Ok(config)
}

/// Tickers to run: the universe (optionally one category), or the named
/// tickers. Named tickers outside the universe take the `--category`
/// category, or Stock.
fn resolve_universe(args: &AnalyzeArgs) -> Result<TickerUniverse> {
    let universe = load_universe(args.universe.as_deref())?;
    let category = args
        .category
        .as_deref()
        .map(str::parse::<Category>)
        .transpose()?;

    if args.tickers.is_empty() {
        return Ok(match category {
            Some(c) => universe.only(c),
            None => universe,
        });
    }

    let mut selected = TickerUniverse::new();
    for ticker in &args.tickers {
        let known = universe.category_of(ticker);
        selected.push(ticker, known.or(category).unwrap_or(Category::Stock));
    }
    Ok(selected)
}

fn run_analyze(args: AnalyzeArgs) -> Result<()> {
    let config = resolve_config(&args)?;
    let universe = resolve_universe(&args)?;
    if universe.is_empty() {
        bail!("no tickers to analyze");
    }

    let end = config.end_date();
    info!(
        tickers = universe.len(),
        etfs = universe.count(Category::Etf),
        stocks = universe.count(Category::Stock),
        start = %config.start,
        end = %end,
        source = config.source.kind.as_str(),
        profile = %config.profile,
        workers = config.workers,
        "analysis plan"
    );

    if args.dry_run {
        for entry in universe.iter() {
            println!("{:<6} {}", entry.category.label(), entry.ticker);
        }
        return Ok(());
    }

    let fetcher = config.build_fetcher()?;
    let sink = Arc::new(FsSink::new(&config.output_dir));
    let pipeline = AnalysisPipeline::from_config(&config, fetcher, sink);
    let runner = BatchRunner::new(pipeline, config.workers);

    let report = runner.run(&universe, &LogProgress)?;
    let report_path = report.save_json(&config.output_dir)?;
    print_summary(&report);
    println!("Report: {}", report_path.display());

    if report.succeeded() == 0 {
        bail!("every ticker failed");
    }
    Ok(())
}

fn print_summary(report: &BatchReport) {
    println!();
    println!("{:<8} {:>9} {:>7}", "Category", "Succeeded", "Failed");
    for (category, counts) in report.counts_by_category() {
        println!(
            "{:<8} {:>9} {:>7}",
            category.label(),
            counts.succeeded,
            counts.failed
        );
    }

    let failures: Vec<_> = report
        .outcomes
        .values()
        .filter_map(|o| o.reason().map(|r| (o, r)))
        .collect();
    if !failures.is_empty() {
        println!();
        println!("Failures:");
        for (outcome, reason) in failures {
            println!("  {:<10} {}", outcome.ticker, reason);
        }
    }
}

fn run_universe(path: Option<&Path>, as_toml: bool) -> Result<()> {
    let universe = load_universe(path)?;
    if as_toml {
        print!("{}", universe.to_toml()?);
        return Ok(());
    }
    for category in Category::ALL {
        let tickers = universe.tickers(category);
        println!("{} ({}):", category.label(), tickers.len());
        println!("  {}", tickers.join(" "));
    }
    Ok(())
}

fn run_validate_config(path: &Path) -> Result<()> {
    let config = AnalysisConfig::load(path)
        .with_context(|| format!("invalid config {}", path.display()))?;
    print!("{}", config.to_toml()?);
    println!("# end resolves to {}", config.end_date());
    println!(
        "# report: {}",
        config
            .output_dir
            .join(techscan_runner::REPORT_FILE)
            .display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    fn analyze(argv: &[&str]) -> AnalyzeArgs {
        let mut full = vec!["techscan", "analyze"];
        full.extend_from_slice(argv);
        match Cli::parse_from(full).command {
            Commands::Analyze(args) => args,
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn flags_override_defaults() {
        let args = analyze(&[
            "--start", "2023-01-02", "--workers", "4", "--profile", "technical", "--source",
            "synthetic", "--no-charts",
        ]);
        let config = resolve_config(&args).unwrap();
        assert_eq!(config.start, NaiveDate::from_ymd_opt(2023, 1, 2).unwrap());
        assert_eq!(config.workers, 4);
        assert_eq!(config.profile, IndicatorProfile::Technical);
        assert_eq!(config.source.kind, SourceKind::Synthetic);
        assert!(!config.render_charts);
    }

    #[test]
    fn bad_date_is_rejected() {
        let args = analyze(&["--start", "01/02/2023"]);
        assert!(resolve_config(&args).is_err());
    }

    #[test]
    fn named_tickers_keep_universe_category() {
        let args = analyze(&["spy", "ZZZZ", "aapl"]);
        let universe = resolve_universe(&args).unwrap();
        assert_eq!(universe.category_of("SPY"), Some(Category::Etf));
        assert_eq!(universe.category_of("AAPL"), Some(Category::Stock));
        assert_eq!(universe.category_of("ZZZZ"), Some(Category::Stock));
        assert_eq!(universe.len(), 3);
    }

    #[test]
    fn category_filter_applies_to_whole_universe() {
        let args = analyze(&["--category", "ETF"]);
        let universe = resolve_universe(&args).unwrap();
        assert!(!universe.is_empty());
        assert_eq!(universe.count(Category::Stock), 0);
    }
}

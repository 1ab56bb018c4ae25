//! Options Liquidity Report
//!
//! Prints a liquidity grid, and optionally the chain summary, for an
//! exported or cached option chain snapshot.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use options_liquidity::prelude::*;

/// Options chain liquidity grids and bid-ask spread statistics
#[derive(Parser)]
#[command(name = "liquidity_report", version, about)]
struct Cli {
    /// Underlying ticker (e.g. SPY, QQQ)
    ticker: String,

    /// Chain JSON exported by a data fetcher (default: latest cache entry)
    #[arg(long)]
    input: Option<PathBuf>,

    /// Directory for cached snapshots
    #[arg(long, default_value = "data")]
    cache_dir: PathBuf,

    /// Disable snapshot caching
    #[arg(long)]
    no_cache: bool,

    /// Reuse a cached snapshot up to this many minutes old (positive)
    #[arg(long, default_value = "15")]
    max_age_minutes: i64,

    /// Y-axis mode: strike, moneyness or delta
    #[arg(long, default_value = "strike")]
    y_axis: String,

    /// Cell metric: oi_absolute, oi_percent, volume_absolute, volume_percent,
    /// spread_absolute, spread_percent or spread_per_delta
    #[arg(long, default_value = "oi_absolute")]
    value: String,

    /// Option type filter: call, put or both
    #[arg(long, default_value = "both")]
    option_type: String,

    /// Minimum days to expiration
    #[arg(long, default_value = "0")]
    dte_min: i64,

    /// Maximum days to expiration
    #[arg(long, default_value = "90")]
    dte_max: i64,

    /// Minimum moneyness (strike / spot)
    #[arg(long, default_value = "0.8")]
    moneyness_min: f64,

    /// Maximum moneyness (strike / spot)
    #[arg(long, default_value = "1.2")]
    moneyness_max: f64,

    /// Print calls and puts as separate grids
    #[arg(long)]
    split: bool,

    /// Print liquidity summary statistics
    #[arg(long)]
    summary: bool,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> LiquidityResult<()> {
    // Reject bad modes before touching any data
    let config = HeatmapConfig::builder()
        .y_axis_mode(cli.y_axis.parse()?)
        .value_mode(cli.value.parse()?)
        .option_type(cli.option_type.parse()?)
        .dte_range(cli.dte_min, cli.dte_max)
        .moneyness_range(cli.moneyness_min, cli.moneyness_max)
        .build()?;

    let snapshot = load_snapshot(cli)?;
    println!(
        "{} | {} contracts | Underlying: ${:.2} | As of: {}",
        snapshot.underlying_symbol(),
        snapshot.len(),
        snapshot.underlying_price(),
        snapshot.observed_at().format("%Y-%m-%d %H:%M:%S")
    );

    if cli.summary {
        let summary = summarize(&snapshot);
        if cli.json {
            let json = serde_json::to_string_pretty(&summary)
                .map_err(|e| LiquidityError::Serialization(e.to_string()))?;
            println!("{}", json);
        } else {
            print_summary(&summary);
        }
    }

    let engine = GridEngine::new(config);
    if cli.split {
        let split = engine.build_split(&snapshot);
        print_grid("CALLS", &split.calls);
        print_grid("PUTS", &split.puts);
    } else {
        let grid = engine.build(&snapshot);
        print_grid(engine.config().option_type().label(), &grid);
    }

    Ok(())
}

fn load_snapshot(cli: &Cli) -> LiquidityResult<ChainSnapshot> {
    let cache = SnapshotCache::new(CacheConfig {
        cache_dir: cli.cache_dir.clone(),
        max_age_minutes: cli.max_age_minutes,
        enabled: !cli.no_cache,
    })?;

    match &cli.input {
        Some(path) => CachedSource::new(JsonFileSource::new(path), cache)
            .get_snapshot(&cli.ticker, None),
        None => cache.load_latest(&cli.ticker)?.ok_or_else(|| {
            LiquidityError::data(format!(
                "no cached snapshot for {}; pass --input with an exported chain",
                cli.ticker
            ))
        }),
    }
}

fn print_summary(summary: &SummaryStatistics) {
    println!("\n=== Liquidity Summary ===");
    println!("Total Contracts: {}", summary.total_contracts);
    println!("Total Open Interest: {}", summary.total_open_interest);
    println!("Total Volume: {}", summary.total_volume);
    println!(
        "Calls: {} contracts, OI: {}, Vol: {}",
        summary.calls.count, summary.calls.open_interest, summary.calls.volume
    );
    println!(
        "Puts: {} contracts, OI: {}, Vol: {}",
        summary.puts.count, summary.puts.open_interest, summary.puts.volume
    );
    println!("Expirations: {}", summary.expirations);
    println!("Strikes: {}", summary.strikes);
    if let Some((lo, hi)) = summary.dte_range {
        println!("DTE Range: {} - {}", lo, hi);
    }
    if let Some((lo, hi)) = summary.moneyness_range {
        println!("Moneyness Range: {:.2} - {:.2}", lo, hi);
    }

    let spreads = &summary.spread_stats;
    if spreads.contracts_with_quotes == 0 {
        return;
    }

    println!("\n=== Bid-Ask Spread Statistics ===");
    println!("Contracts with quotes: {}", spreads.contracts_with_quotes);
    println!(
        "Avg Spread: ${:.2} ({:.1}%)",
        spreads.avg_spread_absolute.unwrap_or(0.0),
        spreads.avg_spread_percent.unwrap_or(0.0) * 100.0
    );
    println!(
        "Median Spread: ${:.2} ({:.1}%)",
        spreads.median_spread_absolute.unwrap_or(0.0),
        spreads.median_spread_percent.unwrap_or(0.0) * 100.0
    );
    println!(
        "Range: ${:.2} - ${:.2}",
        spreads.min_spread_absolute.unwrap_or(0.0),
        spreads.max_spread_absolute.unwrap_or(0.0)
    );

    for (title, ranking) in [
        ("Tightest Spreads", &spreads.tightest_spread_contracts),
        ("Widest Spreads", &spreads.widest_spread_contracts),
    ] {
        println!("\n{}:", title);
        for r in ranking {
            println!(
                "  {} {} (DTE {}): ${:.2} ({:.1}%) [{:.2} x {:.2}]",
                r.option_type,
                r.strike,
                r.days_to_expiration,
                r.spread_absolute,
                r.spread_percent * 100.0,
                r.bid,
                r.ask
            );
        }
    }
}

fn print_grid(side: &str, grid: &Grid) {
    println!("\n{} - {}", grid.value_mode().label(), side);

    if grid.is_empty() {
        println!("  No data available for the specified filters");
        return;
    }

    let header: String = grid
        .columns()
        .iter()
        .map(|c| format!("{:>10}", c.label()))
        .collect();
    println!("  {:>12} |{}", grid.y_axis_mode().label(), header);
    println!("  {}-+{}", "-".repeat(12), "-".repeat(10 * grid.columns().len()));

    for (r, label) in grid.rows().iter().enumerate() {
        let cells: String = (0..grid.columns().len())
            .map(|c| format_cell(grid.value(r, c), grid.value_mode()))
            .collect();
        println!("  {:>12.2} |{}", label, cells);
    }
}

fn format_cell(value: Option<f64>, mode: ValueMode) -> String {
    match value {
        None => format!("{:>10}", "-"),
        Some(v) => match mode {
            ValueMode::OiAbsolute | ValueMode::VolumeAbsolute => format!("{:>10.0}", v),
            ValueMode::OiPercent | ValueMode::VolumePercent => format!("{:>10.1}", v),
            _ => format!("{:>10.3}", v),
        },
    }
}

//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use log::{error, info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::snapshot_adapter::SnapshotAdapter;
use crate::domain::alpha::AlphaKind;
use crate::domain::config_validation::{parse_date, parse_number, validate_config};
use crate::domain::dataset::{build_dataset, HistoricalDataset};
use crate::domain::error::AlphaSimError;
use crate::domain::metrics::Summary;
use crate::domain::run_config::{ProviderKind, RunConfig};
use crate::domain::simulation::{SimulationResult, Simulator, INITIAL_FUNDS};
use crate::domain::universe::parse_codes;
use crate::ports::config_port::ConfigPort;
use crate::ports::dataset_store::DatasetStore;
use crate::ports::price_port::PriceProvider;

#[derive(Parser, Debug)]
#[command(name = "alphasim", about = "Backtest cross-sectional stock alphas")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch historical prices and save them as a dataset snapshot
    Fetch {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run an alpha over historical prices
    Simulate {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        alpha: Option<String>,
        /// Load this snapshot instead of fetching; it must exist
        #[arg(long)]
        snapshot: Option<PathBuf>,
        /// Write the daily series as CSV
        #[arg(long)]
        series: Option<PathBuf>,
    },
    /// Describe a dataset snapshot
    Info {
        #[arg(long)]
        snapshot: PathBuf,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Fetch { config, output } => run_fetch(&config, output.as_deref()),
        Command::Simulate {
            config,
            alpha,
            snapshot,
            series,
        } => run_simulate(&config, alpha.as_deref(), snapshot.as_deref(), series.as_deref()),
        Command::Info { snapshot } => run_info(&snapshot),
        Command::Validate { config } => run_validate(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, AlphaSimError> {
    FileConfigAdapter::from_file(path).map_err(|e| AlphaSimError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

pub fn build_run_config(adapter: &dyn ConfigPort) -> Result<RunConfig, AlphaSimError> {
    let codes_str =
        adapter
            .get_string("data", "codes")
            .ok_or_else(|| AlphaSimError::ConfigMissing {
                section: "data".into(),
                key: "codes".into(),
            })?;
    let codes = parse_codes(&codes_str)?;

    let start_date = parse_date(adapter.get_string("data", "start_date").as_deref(), "start_date")?;
    let end_date = parse_date(adapter.get_string("data", "end_date").as_deref(), "end_date")?;

    let provider = adapter
        .get_string("data", "provider")
        .map(|p| p.parse::<ProviderKind>())
        .transpose()?
        .unwrap_or(ProviderKind::Csv);

    let alpha = adapter
        .get_string("simulation", "alpha")
        .map(|a| a.parse::<AlphaKind>())
        .transpose()?
        .unwrap_or(AlphaKind::Equal);

    Ok(RunConfig {
        codes,
        start_date,
        end_date,
        provider,
        csv_dir: adapter.get_string("data", "csv_dir").map(PathBuf::from),
        snapshot: adapter.get_string("data", "snapshot").map(PathBuf::from),
        alpha,
        initial_funds: parse_number(adapter, "simulation", "initial_funds")?
            .unwrap_or(INITIAL_FUNDS),
    })
}

pub fn make_provider(
    run_config: &RunConfig,
    adapter: &dyn ConfigPort,
) -> Result<Box<dyn PriceProvider>, AlphaSimError> {
    match run_config.provider {
        ProviderKind::Csv => {
            let dir = run_config
                .csv_dir
                .clone()
                .ok_or_else(|| AlphaSimError::ConfigMissing {
                    section: "data".into(),
                    key: "csv_dir".into(),
                })?;
            Ok(Box::new(CsvAdapter::new(dir)))
        }
        #[cfg(feature = "sqlite")]
        ProviderKind::Sqlite => Ok(Box::new(
            crate::adapters::sqlite_adapter::SqliteAdapter::from_config(adapter)?,
        )),
        #[cfg(not(feature = "sqlite"))]
        ProviderKind::Sqlite => {
            let _ = adapter;
            Err(AlphaSimError::ConfigInvalid {
                section: "data".into(),
                key: "provider".into(),
                reason: "built without the sqlite feature".into(),
            })
        }
    }
}

/// Builds the dataset from the configured provider and reports what was left
/// out.
pub fn fetch_dataset(
    provider: &dyn PriceProvider,
    run_config: &RunConfig,
) -> Result<HistoricalDataset, AlphaSimError> {
    info!(
        "fetching {} stocks from {} to {}",
        run_config.codes.len(),
        run_config.start_date,
        run_config.end_date
    );
    let build = build_dataset(
        provider,
        &run_config.codes,
        run_config.start_date,
        run_config.end_date,
    )?;

    for skipped in &build.skipped {
        warn!("skipped {}: {}", skipped.code, skipped.reason);
    }
    if build.rejected_rows > 0 {
        warn!("{} rows rejected", build.rejected_rows);
    }
    info!(
        "dataset: {} stocks, {} aligned dates ({} removed by coverage repair)",
        build.dataset.stock_codes().len(),
        build.dataset.len(),
        build.removed_dates.len()
    );
    Ok(build.dataset)
}

/// Resolves the dataset for a simulation.
///
/// An explicit snapshot must exist. A snapshot named in the config is loaded
/// when present, otherwise prices are fetched and saved there.
pub fn load_or_fetch_dataset(
    adapter: &dyn ConfigPort,
    run_config: &RunConfig,
    snapshot_override: Option<&Path>,
) -> Result<HistoricalDataset, AlphaSimError> {
    let store = SnapshotAdapter::new();

    if let Some(path) = snapshot_override {
        return store.load(path);
    }

    match &run_config.snapshot {
        Some(path) if path.exists() => store.load(path),
        Some(path) => {
            let provider = make_provider(run_config, adapter)?;
            let dataset = fetch_dataset(provider.as_ref(), run_config)?;
            store.save(&dataset, path)?;
            Ok(dataset)
        }
        None => {
            let provider = make_provider(run_config, adapter)?;
            fetch_dataset(provider.as_ref(), run_config)
        }
    }
}

#[derive(Serialize)]
struct SeriesRow {
    date: NaiveDate,
    return_pct: f64,
    turnover: f64,
    funds: f64,
}

pub fn write_series(path: &Path, result: &SimulationResult) -> Result<(), AlphaSimError> {
    let csv_error = |e: csv::Error| AlphaSimError::Io(std::io::Error::other(e));
    let mut writer = csv::Writer::from_path(path).map_err(csv_error)?;
    for (i, date) in result.trading_days.iter().enumerate() {
        writer
            .serialize(SeriesRow {
                date: *date,
                return_pct: result.returns[i],
                turnover: result.turnover[i],
                funds: result.funds[i],
            })
            .map_err(csv_error)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn print_summary(alpha: &AlphaKind, summary: &Summary) {
    println!("=== {} ===", alpha);
    println!("Trading Days:     {}", summary.trading_days);
    println!("Initial Funds:    {:.2}", summary.initial_funds);
    println!("Final Funds:      {:.2}", summary.final_funds);
    println!("Total Return:     {:.2}%", summary.total_return_pct);
    println!("Mean Daily:       {:.4}%", summary.mean_daily_return);
    println!("Daily Volatility: {:.4}%", summary.daily_volatility);
    println!("Sharpe Ratio:     {:.2}", summary.sharpe_ratio);
    println!("Max Drawdown:     -{:.1}%", summary.max_drawdown * 100.0);
    println!("Mean Turnover:    {:.0}", summary.mean_turnover);
}

fn run_fetch(config_path: &Path, output: Option<&Path>) -> Result<(), AlphaSimError> {
    info!("Loading config from {}", config_path.display());
    let adapter = load_config(config_path)?;
    validate_config(&adapter)?;
    let run_config = build_run_config(&adapter)?;

    let output = output
        .map(Path::to_path_buf)
        .or_else(|| run_config.snapshot.clone())
        .ok_or_else(|| AlphaSimError::ConfigMissing {
            section: "data".into(),
            key: "snapshot".into(),
        })?;
    // Fail before fetching anything; save re-checks atomically.
    if output.exists() {
        return Err(AlphaSimError::PersistenceConflict {
            path: output.display().to_string(),
        });
    }

    let provider = make_provider(&run_config, &adapter)?;
    let dataset = fetch_dataset(provider.as_ref(), &run_config)?;
    SnapshotAdapter::new().save(&dataset, &output)?;
    println!("{}", output.display());
    Ok(())
}

fn run_simulate(
    config_path: &Path,
    alpha_override: Option<&str>,
    snapshot: Option<&Path>,
    series: Option<&Path>,
) -> Result<(), AlphaSimError> {
    info!("Loading config from {}", config_path.display());
    let adapter = load_config(config_path)?;
    validate_config(&adapter)?;
    let run_config = build_run_config(&adapter)?;

    let alpha = match alpha_override {
        Some(name) => name.parse::<AlphaKind>()?,
        None => run_config.alpha,
    };

    let mut dataset = load_or_fetch_dataset(&adapter, &run_config, snapshot)?;
    let result = Simulator::new(run_config.initial_funds).run(&mut dataset, &alpha)?;
    print_summary(&alpha, &Summary::compute(&result));

    if let Some(path) = series {
        write_series(path, &result)?;
        info!("Series written to {}", path.display());
    }
    Ok(())
}

fn run_info(snapshot: &Path) -> Result<(), AlphaSimError> {
    let (dataset, written) = SnapshotAdapter::new().load_with_timestamp(snapshot)?;
    let dates = dataset.dates();

    println!("Snapshot: {}", snapshot.display());
    println!("Written:  {}", written.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("Dates:    {}", dates.len());
    if let (Some(first), Some(last)) = (dates.first(), dates.last()) {
        println!("Span:     {} to {}", first, last);
    }
    println!("Stocks:   {}", dataset.stock_codes().join(", "));
    println!("Records:  {}", dataset.record_count());
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), AlphaSimError> {
    let adapter = load_config(config_path)?;
    validate_config(&adapter)?;
    let run_config = build_run_config(&adapter)?;

    println!("codes:    {}", run_config.codes.join(", "));
    println!(
        "range:    {} to {}",
        run_config.start_date, run_config.end_date
    );
    println!("alpha:    {}", run_config.alpha);
    println!("funds:    {:.2}", run_config.initial_funds);
    println!("Configuration is valid");
    Ok(())
}

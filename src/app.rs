use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand, error::ErrorKind};

use crate::config::{FetcherConfig, ProviderColumns};
use crate::day::DayKey;
use crate::errors::FetchError;
use crate::fetcher::{NewsFetcher, latest_records};
use crate::ingestion::CycleReport;
use crate::retention::{RetentionScanner, ScanReport};
use crate::scheduler::Scheduler;
use crate::source::{CommandProvider, JsonFileProvider, NewsProvider};
use crate::store::RecordStore;

type DynProvider = Box<dyn NewsProvider>;

#[derive(Debug, Parser)]
#[command(
    name = "wirefeed",
    disable_help_subcommand = true,
    about = "Deduplicating news telegraph fetcher",
    long_about = "Poll a news provider, drop content already stored in recent day files, and merge the rest into per-day JSON files.",
    after_help = "The storage directory and fetch interval are resolved in order by explicit flag, environment variables (WIREFEED_DIR, WIREFEED_INTERVAL_SECS), then defaults."
)]
struct WirefeedCli {
    #[arg(
        long = "save-dir",
        value_name = "PATH",
        global = true,
        help = "Directory holding news_YYYYMMDD.json day files"
    )]
    save_dir: Option<PathBuf>,
    #[arg(
        long = "warm-days",
        value_name = "DAYS",
        global = true,
        help = "Recent day files loaded into the dedup index at start"
    )]
    warm_days: Option<usize>,
    #[arg(
        long = "interval-secs",
        value_name = "SECS",
        global = true,
        help = "Seconds between fetch cycles"
    )]
    interval_secs: Option<u64>,
    #[arg(
        long = "backoff-secs",
        value_name = "SECS",
        global = true,
        help = "Seconds to wait after a cycle panicked"
    )]
    backoff_secs: Option<u64>,
    #[arg(
        long = "provider-command",
        value_name = "PROGRAM",
        global = true,
        conflicts_with = "provider_file",
        help = "Program printing a JSON array of rows on stdout"
    )]
    provider_command: Option<String>,
    #[arg(
        long = "provider-arg",
        value_name = "ARG",
        global = true,
        allow_hyphen_values = true,
        help = "Argument passed to --provider-command, repeat as needed in order"
    )]
    provider_args: Vec<String>,
    #[arg(
        long = "provider-file",
        value_name = "PATH",
        global = true,
        help = "File holding a JSON array of rows, refreshed by an external job"
    )]
    provider_file: Option<PathBuf>,
    #[arg(
        long = "cls-columns",
        global = true,
        help = "Map rows using the CLS telegraph column names"
    )]
    cls_columns: bool,
    #[command(subcommand)]
    command: WirefeedCommand,
}

#[derive(Debug, Subcommand)]
enum WirefeedCommand {
    /// Scan day files, warm the index, then fetch on a fixed interval forever.
    Run,
    /// Run a single fetch cycle and print its report.
    FetchOnce,
    /// Normalize legacy encodings and quarantine corrupted day files.
    Scan,
    /// Print the newest records of recent days as JSON.
    Latest {
        #[arg(long, value_name = "DAYS", help = "Day files to read, today first")]
        days: Option<usize>,
        #[arg(long, value_name = "N", help = "Maximum records to print")]
        limit: Option<usize>,
    },
}

/// Parse `args_iter` (without the program name) and run the selected command.
pub fn run_cli<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();

    let Some(cli) =
        parse_cli::<WirefeedCli, _>(std::iter::once("wirefeed".to_string()).chain(args_iter))?
    else {
        return Ok(());
    };

    let config = resolve_config(&cli)?;
    config.validate()?;

    match cli.command {
        WirefeedCommand::Run => {
            let provider = require_provider(&cli)?;
            let store = RecordStore::open(&config.save_dir)?;
            print_scan(&RetentionScanner::new(&store).scan());
            drop(store);
            let fetcher = Arc::new(NewsFetcher::open(config, provider)?);
            let handle = Scheduler::new(fetcher).spawn()?;
            handle
                .join()
                .map_err(|_| "scheduler thread terminated by panic")?;
        }
        WirefeedCommand::FetchOnce => {
            let provider = require_provider(&cli)?;
            let fetcher = NewsFetcher::open(config, provider)?;
            print_cycle(&fetcher.fetch_and_save());
        }
        WirefeedCommand::Scan => {
            let store = RecordStore::open(&config.save_dir)?;
            print_scan(&RetentionScanner::new(&store).scan());
        }
        WirefeedCommand::Latest { days, limit } => {
            let store = RecordStore::open(&config.save_dir)?;
            let records = latest_records(
                &store,
                DayKey::today(),
                days.unwrap_or(config.latest_days),
                limit.unwrap_or(config.latest_limit),
            );
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
    }
    Ok(())
}

fn resolve_config(cli: &WirefeedCli) -> Result<FetcherConfig, FetchError> {
    let mut config = FetcherConfig::default().with_env_overrides()?;
    if let Some(save_dir) = &cli.save_dir {
        config = config.with_save_dir(save_dir);
    }
    if let Some(warm_days) = cli.warm_days {
        config = config.with_warm_days(warm_days);
    }
    if let Some(secs) = cli.interval_secs {
        config.fetch_interval = Duration::from_secs(secs);
    }
    if let Some(secs) = cli.backoff_secs {
        config.error_backoff = Duration::from_secs(secs);
    }
    if cli.cls_columns {
        config = config.with_columns(ProviderColumns::cls_telegraph());
    }
    Ok(config)
}

fn require_provider(cli: &WirefeedCli) -> Result<DynProvider, FetchError> {
    if let Some(program) = &cli.provider_command {
        return Ok(Box::new(CommandProvider::new(
            program.clone(),
            cli.provider_args.clone(),
        )));
    }
    if let Some(path) = &cli.provider_file {
        return Ok(Box::new(JsonFileProvider::new(path.clone())));
    }
    Err(FetchError::Configuration(
        "a provider is required: pass --provider-command or --provider-file".to_string(),
    ))
}

fn print_cycle(report: &CycleReport) {
    println!("day:        {}", report.day);
    println!("outcome:    {}", report.outcome);
    println!("total:      {}", report.total);
    println!("new:        {}", report.new);
    println!("duplicates: {}", report.duplicates);
    println!("written:    {}", report.written);
    if let Some(error) = &report.error {
        println!("error:      {error}");
    }
}

fn print_scan(report: &ScanReport) {
    println!("files:       {}", report.files);
    println!("healthy:     {}", report.healthy);
    println!("reencoded:   {}", report.reencoded);
    println!("quarantined: {}", report.quarantined);
    println!("failed:      {}", report.failed);
    for path in &report.quarantine_paths {
        println!("backup:      {}", path.display());
    }
}

fn parse_cli<T, I>(args: I) -> Result<Option<T>, Box<dyn Error>>
where
    T: Parser,
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    match T::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                err.print()?;
                Ok(None)
            }
            _ => Err(err.into()),
        },
    }
}

mod progress;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use rolling_file::{BasicRollingFileAppender, RollingConditionBasic};
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use fightstats_core::config::CUSTOM_TOKEN;
use fightstats_core::{
    ConfigError, DpsReportClient, ExportError, FilterError, FilterOptions, FilterParams, GroupQuery,
    Pipeline, PipelineError, QueryError, StatTable, TableError, TokenRegistry, TransportError,
    filter_data, load_config, write_parquet,
};
use fightstats_types::{AppConfig, GroupBy, StatCategory};

use crate::progress::BarProgress;

/// Overrides the configured log directory
const LOG_DIR_ENV: &str = "FIGHTSTATS_LOG_DIR";

/// Rotated log files kept on disk
const MAX_LOG_FILES: usize = 7;

#[derive(Parser)]
#[command(version, about = "Per-player fight statistics from dps.report uploads")]
struct Cli {
    /// Configuration file (default: platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the configured token names
    Tokens,
    /// List the stat categories
    Categories,
    /// Show the selectable filter values of a dataset
    Options {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Print the filtered table, optionally exporting it to parquet
    Table {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Per-group means of the filtered table
    Means {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        filters: FilterArgs,
        /// profession, name, account or profession+name
        #[arg(short, long, default_value = "profession")]
        group_by: GroupBy,
    },
}

#[derive(Args)]
struct SourceArgs {
    /// User token, overrides --token-name
    #[arg(long)]
    token: Option<String>,
    /// Name of a configured token
    #[arg(short = 'n', long)]
    token_name: Option<String>,
    #[arg(short, long, default_value_t = StatCategory::Default)]
    category: StatCategory,
}

#[derive(Args)]
struct FilterArgs {
    #[arg(long = "account")]
    accounts: Vec<String>,
    #[arg(long = "name")]
    names: Vec<String>,
    #[arg(long = "profession")]
    professions: Vec<String>,
    /// Earliest fight start (RFC 3339)
    #[arg(long)]
    from: Option<DateTime<Utc>>,
    /// Latest fight start (RFC 3339)
    #[arg(long)]
    to: Option<DateTime<Utc>>,
}

impl FilterArgs {
    fn params(&self, table: &StatTable, group_by: GroupBy) -> Result<FilterParams, FilterError> {
        let mut params = FilterParams::unrestricted(table, table.category())?;
        params.group_by = group_by;
        params.account_name_filter = self.accounts.clone();
        params.character_name_filter = self.names.clone();
        params.profession_filter = self.professions.clone();
        if let Some(from) = self.from {
            params.start_time_min = from;
        }
        if let Some(to) = self.to {
            params.start_time_max = to;
        }
        Ok(params)
    }
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Table(#[from] TableError),
    #[error(transparent)]
    Filter(#[from] FilterError),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("could not start async runtime: {0}")]
    Runtime(std::io::Error),
}

fn init_logging(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::builder()
        .with_default_directive(tracing::Level::INFO.into())
        .from_env_lossy();

    if let Some(dir) = log_dir {
        let appender = std::fs::create_dir_all(dir).and_then(|_| {
            BasicRollingFileAppender::new(
                dir.join("fightstats.log"),
                RollingConditionBasic::new().daily(),
                MAX_LOG_FILES,
            )
        });
        match appender {
            Ok(appender) => {
                let (writer, guard) = tracing_appender::non_blocking(appender);
                tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .with_target(true)
                    .with_ansi(false)
                    .with_writer(writer)
                    .init();
                return Some(guard);
            }
            Err(e) => eprintln!("could not open log directory {}: {e}", dir.display()),
        }
    }

    // Fallback to stderr
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
    None
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref());

    let log_dir = std::env::var_os(LOG_DIR_ENV)
        .map(PathBuf::from)
        .or_else(|| config.as_ref().ok().and_then(|c| c.log_dir.clone()));
    // Dropping the guard flushes buffered file logs
    let guard = init_logging(log_dir.as_deref());

    let result = config.map_err(CliError::from).and_then(|config| run(cli.command, config));
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "fightstats failed");
            if guard.is_some() {
                eprintln!("error: {e}");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command, config: AppConfig) -> Result<(), CliError> {
    let tokens = TokenRegistry::from_env(&config)?;
    let source = match &command {
        Command::Tokens => {
            for name in tokens.names() {
                match name {
                    CUSTOM_TOKEN => println!("{name} (pass --token)"),
                    _ => println!("{name}"),
                }
            }
            return Ok(());
        }
        Command::Categories => {
            for category in StatCategory::ALL {
                println!("{:<14} {}", category.as_str(), category.description());
            }
            return Ok(());
        }
        Command::Options { source } | Command::Table { source, .. } | Command::Means { source, .. } => source,
    };

    let token = tokens.resolve(source.token_name.as_deref(), source.token.as_deref())?;
    let client = DpsReportClient::new(&config.remote, config.retry.clone())?;
    let pipeline = Pipeline::new(config, Arc::new(client));

    let progress = BarProgress::new();
    let fetched = pipeline.fetch_data(token, source.category, &progress);
    progress.finish();
    let table = fetched?;

    match &command {
        Command::Tokens | Command::Categories => Ok(()),
        Command::Options { .. } => {
            let options = FilterOptions::from_table(&table)?;
            println!("{}", serde_json::to_string_pretty(&options)?);
            Ok(())
        }
        Command::Table { filters, output, .. } => {
            let filtered = filter_data(&table, &filters.params(&table, GroupBy::default())?)?;
            println!("{}: {}", filtered.category(), filtered.category().description());
            println!("{filtered}");
            if let Some(path) = output {
                write_parquet(&filtered, path)?;
            }
            Ok(())
        }
        Command::Means { filters, group_by, .. } => {
            let filtered = filter_data(&table, &filters.params(&table, *group_by)?)?;
            print_means(&filtered, *group_by)
        }
    }
}

/// DataFusion needs an async context; the blocking HTTP client must stay
/// outside of it, so the runtime only exists for the query.
fn print_means(table: &StatTable, group_by: GroupBy) -> Result<(), CliError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;

    let query = GroupQuery::new();
    query.register(table)?;
    let groups = runtime.block_on(query.group_means(group_by))?;

    println!("Mean values by {group_by}:");
    for group in groups {
        println!("\n{} ({} rows)", group.group, group.rows);
        for (column, mean) in &group.means {
            match mean {
                Some(mean) => println!("  {column:<48} {mean:>12.2}"),
                None => println!("  {column:<48} {:>12}", "-"),
            }
        }
    }
    Ok(())
}

//! wikifetch CLI
//!
//! Local execution entry point.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use wikifetch::{
    error::Result,
    models::{ClientIdentity, Config, OutputFormat, validate_rate},
    pipeline::{self, FetchSettings},
};

/// wikifetch - Wikidata city lists and rate-limited Wikipedia downloads
#[derive(Parser, Debug)]
#[command(
    name = "wikifetch",
    version,
    about = "List city names from Wikidata and fetch their Wikipedia articles"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "wikifetch.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Query Wikidata for every city with an article in LANGUAGE
    List {
        /// Wikipedia language code (en, fr, de, ...)
        language: String,

        /// Directory for the list file (default: paths.list_dir)
        #[arg(long)]
        list_dir: Option<PathBuf>,
    },

    /// Fetch one document per identifier in LIST
    Fetch {
        /// Identifier list, one per line
        list: PathBuf,

        #[command(flatten)]
        fetch: FetchArgs,
    },

    /// Run full pipeline: List → Fetch
    Pipeline {
        #[command(flatten)]
        fetch: FetchArgs,

        /// Directory for the list file (default: paths.list_dir)
        #[arg(long)]
        list_dir: Option<PathBuf>,
    },

    /// Validate the configuration file
    Validate,
}

#[derive(Args, Debug)]
struct FetchArgs {
    /// Wikipedia language code (en, fr, de, ...)
    language: String,

    /// Document format: html or text
    format: OutputFormat,

    /// Project name sent in the User-Agent header
    project_name: String,

    /// Contact email sent in the User-Agent header
    email: String,

    /// Maximum requests per second (default: fetcher.max_requests_per_second)
    max_rps: Option<f64>,

    /// Only fetch the first N identifiers; 0 or less fetches all
    #[arg(long = "n", allow_negative_numbers = true)]
    n: Option<i64>,

    /// Output directory (default: {paths.output_dir}/{language})
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Responses allowed in flight at once (default: fetcher.max_in_flight)
    #[arg(long)]
    max_in_flight: Option<usize>,

    /// Write a JSON run report to this path
    #[arg(long)]
    report: Option<PathBuf>,
}

impl FetchArgs {
    fn into_settings(self, config: &Config, list_path: PathBuf) -> Result<FetchSettings> {
        let identity = ClientIdentity::new(self.project_name, self.email)?;
        let max_requests_per_second = self
            .max_rps
            .unwrap_or(config.fetcher.max_requests_per_second);
        validate_rate(max_requests_per_second)?;
        let output_dir = self
            .output_dir
            .unwrap_or_else(|| config.paths.output_dir.join(&self.language));

        Ok(FetchSettings {
            list_path,
            language: self.language,
            format: self.format,
            identity,
            max_requests_per_second,
            max_in_flight: self.max_in_flight.unwrap_or(config.fetcher.max_in_flight),
            limit: self.n,
            output_dir,
            report_path: self.report,
        })
    }
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::warn!("Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

fn list_dir_or_default(config: &Config, list_dir: Option<PathBuf>) -> PathBuf {
    list_dir.unwrap_or_else(|| config.paths.list_dir.clone())
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = if cli.config.exists() {
        Config::load(&cli.config)?
    } else {
        Config::load_or_default(&cli.config)
    };
    config.validate()?;

    match cli.command {
        Command::List { language, list_dir } => {
            let list_dir = list_dir_or_default(&config, list_dir);
            pipeline::run_lister(&config, &language, &list_dir).await?;
        }

        Command::Fetch { list, fetch } => {
            let settings = fetch.into_settings(&config, list)?;
            pipeline::run_fetcher(&config, &settings, shutdown_signal()).await?;
        }

        Command::Pipeline { fetch, list_dir } => {
            let list_dir = list_dir_or_default(&config, list_dir);
            let mut settings = fetch.into_settings(&config, PathBuf::new())?;

            log::info!("Step 1/2: Listing names for {}...", settings.language);
            settings.list_path =
                pipeline::run_lister(&config, &settings.language, &list_dir).await?;

            log::info!("Step 2/2: Fetching documents...");
            pipeline::run_fetcher(&config, &settings, shutdown_signal()).await?;
        }

        Command::Validate => {
            log::info!("Validating configuration...");
            report_config(&cli.config, &config);
            log::info!("✓ Config OK");
        }
    }

    Ok(())
}

fn report_config(path: &Path, config: &Config) {
    log::info!("Config file: {}", path.display());
    log::info!("Knowledge base: {}", config.knowledge_base.endpoint);
    log::info!("Documents: {}", config.documents.base_url);
    log::info!(
        "Rate: {} req/s, {} in flight",
        config.fetcher.max_requests_per_second,
        config.fetcher.max_in_flight
    );
}

// src/pipeline/fetch.rs

//! Document fetching pipeline.

use std::future::Future;
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};
use crate::models::{ClientIdentity, Config, FetchOutcome, IdentifierList, OutputFormat};
use crate::services::{DocumentSource, FetchJob, RateBudget, RateLimitedFetcher, WikipediaClient};
use crate::storage::{DocumentStorage, LocalStorage, write_atomic};

/// Everything a fetch run needs besides the configuration file.
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub list_path: PathBuf,
    pub language: String,
    pub format: OutputFormat,
    pub identity: ClientIdentity,
    pub max_requests_per_second: f64,
    pub max_in_flight: usize,
    /// Attempt only the first N identifiers; `None` or N <= 0 means all
    pub limit: Option<i64>,
    pub output_dir: PathBuf,
    /// Write the outcome as JSON here when set
    pub report_path: Option<PathBuf>,
}

/// Run the rate-limited fetcher over a list file.
///
/// Setup problems (unreadable list, bad rate, client construction) fail
/// before any request is sent. Per-identifier failures only show up in the
/// returned outcome.
pub async fn run_fetcher<F>(
    config: &Config,
    settings: &FetchSettings,
    cancel: F,
) -> Result<FetchOutcome>
where
    F: Future<Output = ()>,
{
    let source = WikipediaClient::new(config, &settings.identity)?;
    let storage = LocalStorage::new(&settings.output_dir);
    run_fetcher_with(&source, &storage, settings, cancel).await
}

/// [`run_fetcher`] against an explicit document source and storage.
///
/// The summary is logged and the report written even when the run stops on a
/// storage failure; the failure is returned afterwards.
pub async fn run_fetcher_with<F>(
    source: &dyn DocumentSource,
    storage: &dyn DocumentStorage,
    settings: &FetchSettings,
    cancel: F,
) -> Result<FetchOutcome>
where
    F: Future<Output = ()>,
{
    let list = IdentifierList::load(&settings.list_path)?;
    if list.is_empty() {
        return Err(AppError::validation(format!(
            "identifier list {} is empty",
            settings.list_path.display()
        )));
    }
    log::info!(
        "Loaded {} identifiers from {}",
        list.len(),
        settings.list_path.display()
    );

    let budget = RateBudget::per_second(settings.max_requests_per_second)?;
    let fetcher = RateLimitedFetcher::new(source, storage, budget)
        .with_max_in_flight(settings.max_in_flight);

    log::info!(
        "Writing documents to {} as {}",
        storage.location().display(),
        settings.identity.user_agent()
    );

    let job = FetchJob {
        language: &settings.language,
        format: settings.format,
        limit: settings.limit,
    };
    let outcome = fetcher.run_until(&list, &job, cancel).await;

    log_summary(&outcome);
    if let Some(path) = &settings.report_path {
        write_report(path, &outcome).await?;
        log::info!("Report written to {}", path.display());
    }

    match &outcome.aborted {
        Some(abort) => Err(abort.to_error()),
        None => Ok(outcome),
    }
}

/// Log the end-of-run accounting.
pub fn log_summary(outcome: &FetchOutcome) {
    log::info!(
        "Fetched {}/{} documents successfully in {:.2} seconds",
        outcome.succeeded(),
        outcome.attempted,
        outcome.elapsed_secs()
    );
    if outcome.cancelled {
        log::warn!(
            "Run interrupted: {} of {} selected identifiers were not attempted",
            outcome.selected - outcome.attempted,
            outcome.selected
        );
    }
    if outcome.failed() > 0 {
        let counts = outcome
            .failure_counts()
            .into_iter()
            .map(|(kind, count)| format!("{kind}={count}"))
            .collect::<Vec<_>>()
            .join(", ");
        log::warn!("{} failed ({})", outcome.failed(), counts);
        for failure in &outcome.failures {
            log::warn!("    {}: {}", failure.identifier, failure.cause);
        }
    }
    if let Some(abort) = &outcome.aborted {
        log::error!(
            "Run stopped: cannot write to {}: {}",
            abort.location.display(),
            abort.message
        );
    }
    if outcome.attempted > 0 && outcome.succeeded() == 0 {
        log::error!("No documents were fetched");
    }
}

async fn write_report(path: &Path, outcome: &FetchOutcome) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(outcome)?;
    write_atomic(path, &bytes)
        .await
        .map_err(|e| AppError::persistence(path, e))
}

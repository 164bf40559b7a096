// src/services/fetcher.rs

//! Rate-limited batch fetcher.
//!
//! Walks an [`IdentifierList`] in order, asks the [`RateBudget`] for an issue
//! slot before every request, and persists each body as soon as it is its
//! turn in list order. One identifier failing never stops the run; the
//! failure is recorded in the [`FetchOutcome`] and the loop moves on.
//!
//! Per identifier: `Fetching -> Persisting -> Advancing`. The run ends
//! `Completed` once every selected identifier has a record, `cancelled` when
//! the cancellation future resolves first, or `aborted` when storage fails in
//! a way that would repeat for every remaining identifier.

use std::future::{self, Future};
use std::ops::ControlFlow;
use std::pin::pin;

use futures::stream::{self, StreamExt};

use crate::models::{
    Attempt, Failure, FetchError, FetchOutcome, FetchRequest, Identifier, IdentifierList,
    OutputFormat, RunAbort, SavedDocument,
};
use crate::services::{DocumentSource, RateBudget};
use crate::storage::{DocumentStorage, is_systemic};

/// What to fetch for every identifier of a run.
#[derive(Debug, Clone, Copy)]
pub struct FetchJob<'a> {
    pub language: &'a str,
    pub format: OutputFormat,
    /// Attempt only the first N identifiers; `None` or N <= 0 means all
    pub limit: Option<i64>,
}

/// Fetches documents one identifier at a time under a request-rate ceiling.
pub struct RateLimitedFetcher<'a> {
    source: &'a dyn DocumentSource,
    storage: &'a dyn DocumentStorage,
    budget: RateBudget,
    max_in_flight: usize,
}

/// A response waiting for its turn to be persisted.
struct Fetched<'l> {
    position: usize,
    identifier: &'l Identifier,
    body: std::result::Result<String, FetchError>,
}

impl<'a> RateLimitedFetcher<'a> {
    pub fn new(
        source: &'a dyn DocumentSource,
        storage: &'a dyn DocumentStorage,
        budget: RateBudget,
    ) -> Self {
        Self {
            source,
            storage,
            budget,
            max_in_flight: 1,
        }
    }

    /// Let up to `max_in_flight` responses be outstanding at once.
    ///
    /// Issue spacing is unaffected; this only overlaps slow responses.
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight.max(1);
        self
    }

    /// Fetch every selected identifier.
    pub async fn run(&self, list: &IdentifierList, job: &FetchJob<'_>) -> FetchOutcome {
        self.run_until(list, job, future::pending()).await
    }

    /// Fetch every selected identifier, stopping early when `cancel` resolves.
    ///
    /// Responses still in flight at cancellation are dropped unsaved, so every
    /// document on storage has a record in the outcome. Persisting is never
    /// interrupted.
    ///
    /// A storage failure that would repeat for every remaining identifier
    /// stops the run and is reported in [`FetchOutcome::aborted`].
    pub async fn run_until<F>(
        &self,
        list: &IdentifierList,
        job: &FetchJob<'_>,
        cancel: F,
    ) -> FetchOutcome
    where
        F: Future<Output = ()>,
    {
        let selected = list.first(job.limit);
        let total = selected.len();
        let mut outcome = FetchOutcome::new(total);

        log::info!(
            "Fetching {} of {} identifiers as {} from language '{}' (min interval {:?})",
            total,
            list.len(),
            job.format,
            job.language,
            self.budget.min_interval()
        );

        let mut responses = pin!(
            stream::iter(selected.iter().enumerate())
                .map(|(index, identifier)| self.fetch(index + 1, total, identifier, job))
                .buffered(self.max_in_flight)
        );
        let mut cancel = pin!(cancel);

        loop {
            let fetched = tokio::select! {
                biased;
                () = &mut cancel => {
                    outcome.cancelled = true;
                    log::warn!(
                        "Interrupted after {} of {} identifiers",
                        outcome.attempted,
                        total
                    );
                    break;
                }
                next = responses.next() => match next {
                    Some(fetched) => fetched,
                    None => break,
                },
            };

            if self.persist(fetched, total, job.format, &mut outcome).await.is_break() {
                break;
            }
        }

        outcome.finish();
        outcome
    }

    async fn fetch<'l>(
        &self,
        position: usize,
        total: usize,
        identifier: &'l Identifier,
        job: &FetchJob<'_>,
    ) -> Fetched<'l> {
        let request = FetchRequest {
            identifier,
            language: job.language,
            format: job.format,
        };

        self.budget.acquire().await;
        log::debug!("[{position}/{total}] Requesting {identifier}");

        Fetched {
            position,
            identifier,
            body: self.source.fetch(request).await,
        }
    }

    /// Record one response, writing its document first when there is one.
    async fn persist(
        &self,
        fetched: Fetched<'_>,
        total: usize,
        format: OutputFormat,
        outcome: &mut FetchOutcome,
    ) -> ControlFlow<()> {
        let Fetched {
            position,
            identifier,
            body,
        } = fetched;

        let body = match body {
            Ok(body) => body,
            Err(error) => {
                log::warn!("[{position}/{total}] {identifier}: {error}");
                outcome.record(Attempt::Failed(Failure::fetch(identifier.clone(), error)));
                return ControlFlow::Continue(());
            }
        };

        match self.storage.save(identifier, format, body.as_bytes()).await {
            Ok(path) => {
                log::info!(
                    "[{position}/{total}] {identifier} -> {} ({} bytes)",
                    path.display(),
                    body.len()
                );
                outcome.record(Attempt::Saved(SavedDocument {
                    identifier: identifier.clone(),
                    path,
                    bytes: body.len(),
                }));
                ControlFlow::Continue(())
            }
            Err(error) if is_systemic(&error) => {
                log::error!("[{position}/{total}] {identifier}: cannot write documents: {error}");
                outcome.record(Attempt::Failed(Failure::persist(identifier.clone(), &error)));
                outcome.aborted = Some(RunAbort::new(self.storage.location(), &error));
                ControlFlow::Break(())
            }
            Err(error) => {
                log::warn!("[{position}/{total}] {identifier}: could not write document: {error}");
                outcome.record(Attempt::Failed(Failure::persist(identifier.clone(), &error)));
                ControlFlow::Continue(())
            }
        }
    }
}

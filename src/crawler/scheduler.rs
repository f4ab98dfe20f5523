//! Scheduler for harvesting discovered documents
//!
//! This module handles:
//! - Global concurrency limiting via an owned semaphore permit per task
//! - A random politeness delay before every fetch
//! - The per-document chain: fetch, extract, normalize, write
//! - Isolating failures so one document never stops its siblings
//! - Cooperative cancellation through a shutdown signal

use crate::config::CrawlerConfig;
use crate::crawler::discovery::{DiscoveredLinks, LinkEntry};
use crate::crawler::fetcher::PageSource;
use crate::crawler::parser::extract_paragraph_text;
use crate::output::{CrawlReport, DocumentSink, FailureRecord};
use crate::state::DocumentState;
use crate::text::Normalizer;
use crate::HarvestError;
use rand::{rng, Rng};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Semaphore};
use tokio::task::{JoinError, JoinSet};

/// Per-task settings copied into every spawned document task
#[derive(Debug, Clone, Copy)]
struct TaskSettings {
    delay: Duration,
    normalizer: Normalizer,
    skip_existing: bool,
    skip_empty: bool,
}

type TaskOutput = (LinkEntry, Result<DocumentState, HarvestError>);

/// Runs the document phase of a harvest
///
/// The scheduler coordinates:
/// - At most `concurrency_limit` documents in flight
/// - A delay drawn from `delay_candidates` before each fetch
/// - Recording every document's final state in a [`CrawlReport`]
pub struct CrawlScheduler<S> {
    source: Arc<S>,
    concurrency_limit: usize,
    delays: Vec<Duration>,
    normalizer: Normalizer,
    skip_existing: bool,
    skip_empty: bool,
    shutdown: watch::Receiver<bool>,
}

impl<S: PageSource> CrawlScheduler<S> {
    /// Creates a new scheduler
    ///
    /// # Arguments
    ///
    /// * `source` - Where article pages are fetched from
    /// * `config` - The crawler configuration
    pub fn new(source: Arc<S>, config: &CrawlerConfig) -> Self {
        // Without a sender the signal can never fire
        let (_, shutdown) = watch::channel(false);

        Self {
            source,
            concurrency_limit: (config.concurrency_limit as usize).max(1),
            delays: config.delays(),
            normalizer: Normalizer::new(config.danda_pipes),
            skip_existing: config.skip_existing,
            skip_empty: config.skip_empty,
            shutdown,
        }
    }

    /// Stops dispatching and aborts waiting tasks once `shutdown` turns true
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Harvests every link into `sink`
    ///
    /// Returns once every dispatched task has completed. Documents that were never
    /// dispatched because of a shutdown are reported as cancelled.
    pub async fn run<K: DocumentSink>(&self, links: DiscoveredLinks, sink: Arc<K>) -> CrawlReport {
        let mut report = CrawlReport::new(links.len());
        let semaphore = Arc::new(Semaphore::new(self.concurrency_limit));
        let mut tasks: JoinSet<TaskOutput> = JoinSet::new();
        let mut shutdown = self.shutdown.clone();
        let mut entries = links.into_entries().into_iter();

        tracing::info!(
            "Harvesting {} documents with concurrency {}",
            report.total_documents,
            self.concurrency_limit
        );

        'dispatch: for entry in entries.by_ref() {
            let permit = loop {
                tokio::select! {
                    biased;
                    _ = wait_for_shutdown(&mut shutdown) => {
                        report.record(DocumentState::Cancelled);
                        break 'dispatch;
                    }
                    Some(joined) = tasks.join_next() => record_outcome(&mut report, joined),
                    permit = semaphore.clone().acquire_owned() => match permit {
                        Ok(permit) => break permit,
                        Err(_) => {
                            report.record(DocumentState::Cancelled);
                            break 'dispatch;
                        }
                    },
                }
            };

            let settings = TaskSettings {
                delay: pick_delay(&self.delays),
                normalizer: self.normalizer,
                skip_existing: self.skip_existing,
                skip_empty: self.skip_empty,
            };
            let source = Arc::clone(&self.source);
            let sink = Arc::clone(&sink);
            let shutdown = self.shutdown.clone();

            tasks.spawn(async move {
                let _permit = permit;
                let result = harvest_document(&*source, &*sink, &entry, settings, shutdown).await;
                (entry, result)
            });
        }

        let undispatched = entries.count();
        if undispatched > 0 {
            tracing::info!("Shutdown requested, {} documents not dispatched", undispatched);
            for _ in 0..undispatched {
                report.record(DocumentState::Cancelled);
            }
        }

        while let Some(joined) = tasks.join_next().await {
            record_outcome(&mut report, joined);
        }

        report.finish();
        tracing::info!(
            written = report.count(DocumentState::Written),
            empty = report.count(DocumentState::Empty),
            failed = report.count(DocumentState::Failed),
            cancelled = report.count(DocumentState::Cancelled),
            "Harvest finished"
        );

        report
    }
}

/// Picks one politeness delay uniformly at random
pub fn pick_delay(candidates: &[Duration]) -> Duration {
    if candidates.is_empty() {
        return Duration::ZERO;
    }
    candidates[rng().random_range(0..candidates.len())]
}

/// Resolves once the shutdown flag is set; never resolves if the sender is gone
pub(crate) async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    let signalled = shutdown.wait_for(|stop| *stop).await.is_ok();
    if !signalled {
        std::future::pending::<()>().await;
    }
}

/// Fetches, extracts, normalizes and stores one document
///
/// The delay and the fetch are abandoned on shutdown. A write that has started
/// always runs to completion.
async fn harvest_document<S: PageSource, K: DocumentSink>(
    source: &S,
    sink: &K,
    entry: &LinkEntry,
    settings: TaskSettings,
    mut shutdown: watch::Receiver<bool>,
) -> Result<DocumentState, HarvestError> {
    if settings.skip_existing && sink.contains(&entry.identifier).await {
        tracing::debug!(identifier = %entry.identifier, "Already harvested, skipping");
        return Ok(DocumentState::SkippedExisting);
    }

    tokio::select! {
        biased;
        _ = wait_for_shutdown(&mut shutdown) => return Ok(DocumentState::Cancelled),
        _ = tokio::time::sleep(settings.delay) => {}
    }

    let body = tokio::select! {
        biased;
        _ = wait_for_shutdown(&mut shutdown) => return Ok(DocumentState::Cancelled),
        body = source.fetch(&entry.url) => body?,
    };

    let html = String::from_utf8_lossy(&body);
    let mut text = settings.normalizer.apply(&extract_paragraph_text(&html));

    let state = if text.trim().is_empty() {
        let empty = HarvestError::ExtractionEmpty {
            identifier: entry.identifier.clone(),
        };
        if settings.skip_empty {
            tracing::debug!(url = %entry.url, "{}, skipping", empty);
            return Ok(DocumentState::SkippedEmpty);
        }
        tracing::debug!(url = %entry.url, "{}, writing empty document", empty);
        text.clear();
        DocumentState::Empty
    } else {
        DocumentState::Written
    };

    sink.write(&entry.identifier, &text)
        .await
        .map_err(|source| HarvestError::SinkWriteFailed {
            identifier: entry.identifier.clone(),
            source,
        })?;

    tracing::debug!(
        identifier = %entry.identifier,
        chars = text.chars().count(),
        "Document stored"
    );
    Ok(state)
}

/// Folds one finished task into the report
fn record_outcome(report: &mut CrawlReport, joined: Result<TaskOutput, JoinError>) {
    match joined {
        Ok((_, Ok(state))) => report.record(state),
        Ok((entry, Err(e))) => {
            tracing::warn!(
                identifier = %entry.identifier,
                url = %entry.url,
                error = %e,
                "Document failed"
            );
            report.record_failure(FailureRecord {
                identifier: entry.identifier,
                url: entry.url.to_string(),
                kind: e.kind(),
                cause: e.to_string(),
            });
        }
        Err(e) => {
            tracing::error!("Document task failed: {}", e);
            report.record(DocumentState::Failed);
        }
    }
}

//! Crawl report generation
//!
//! The scheduler records one outcome per document into a [`CrawlReport`], which
//! is printed to stdout when the harvest ends.

use crate::state::DocumentState;
use crate::ErrorKind;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// A document that could not be harvested
#[derive(Debug, Clone)]
pub struct FailureRecord {
    pub identifier: String,
    pub url: String,
    pub kind: ErrorKind,
    pub cause: String,
}

/// Outcome of one crawl
#[derive(Debug, Clone)]
pub struct CrawlReport {
    /// Number of documents handed to the scheduler
    pub total_documents: usize,

    /// Count of documents by final state
    pub documents_by_state: BTreeMap<DocumentState, usize>,

    /// Every failed document, in completion order
    pub failures: Vec<FailureRecord>,

    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl CrawlReport {
    /// Starts a report for `total_documents` documents
    pub fn new(total_documents: usize) -> Self {
        Self {
            total_documents,
            documents_by_state: BTreeMap::new(),
            failures: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Records the final state of one document
    pub fn record(&mut self, state: DocumentState) {
        *self.documents_by_state.entry(state).or_insert(0) += 1;
    }

    /// Records a failed document along with its cause
    pub fn record_failure(&mut self, failure: FailureRecord) {
        self.record(DocumentState::Failed);
        self.failures.push(failure);
    }

    /// Number of documents that ended in `state`
    pub fn count(&self, state: DocumentState) -> usize {
        self.documents_by_state.get(&state).copied().unwrap_or(0)
    }

    /// Number of documents with a recorded outcome
    pub fn completed(&self) -> usize {
        self.documents_by_state.values().sum()
    }

    /// Returns the success rate as a percentage of recorded documents
    pub fn success_rate(&self) -> f64 {
        let completed = self.completed();
        if completed == 0 {
            return 0.0;
        }
        let succeeded: usize = self
            .documents_by_state
            .iter()
            .filter(|(state, _)| state.is_success())
            .map(|(_, count)| count)
            .sum();
        (succeeded as f64 / completed as f64) * 100.0
    }

    pub fn was_cancelled(&self) -> bool {
        self.count(DocumentState::Cancelled) > 0
    }

    /// Stamps the finish time
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Wall-clock duration, once finished
    pub fn duration_seconds(&self) -> Option<i64> {
        self.finished_at
            .map(|finished| (finished - self.started_at).num_seconds())
    }
}

/// Prints the report to stdout in a formatted manner
///
/// # Arguments
///
/// * `report` - The report to display
pub fn print_report(report: &CrawlReport) {
    println!("=== Harvest Report ===\n");

    println!("Overview:");
    println!("  Documents discovered: {}", report.total_documents);
    println!(
        "  Started: {}",
        report.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    if let Some(seconds) = report.duration_seconds() {
        println!("  Duration: {}s", seconds);
    }
    println!();

    println!("Documents by State:");
    let mut state_counts: Vec<_> = report.documents_by_state.iter().collect();
    state_counts.sort_by(|a, b| b.1.cmp(a.1));

    for (state, count) in state_counts {
        let percentage = if report.total_documents > 0 {
            (*count as f64 / report.total_documents as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", state, count, percentage);
    }
    println!();

    if !report.failures.is_empty() {
        println!("Failures ({}):", report.failures.len());
        for failure in &report.failures {
            println!(
                "  - {} [{:?}] {}: {}",
                failure.identifier, failure.kind, failure.url, failure.cause
            );
        }
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {} documents stored)",
        report.success_rate(),
        report.count(DocumentState::Written) + report.count(DocumentState::Empty),
        report.completed()
    );
}

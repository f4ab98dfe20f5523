/// Document state definitions for tracking harvest outcomes
use std::fmt;

/// Outcome of processing one discovered document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DocumentState {
    // ===== Success States =====
    /// Normalized text was written to the sink
    Written,

    /// The page held no paragraph text; an empty document was written
    Empty,

    // ===== Skip States =====
    /// The page held no paragraph text and empty documents are not kept
    SkippedEmpty,

    /// The sink already held this document
    SkippedExisting,

    // ===== Error States =====
    /// Fetch or write failed; see the crawl report for the cause
    Failed,

    /// The harvest was stopped before this document finished
    Cancelled,
}

impl DocumentState {
    /// Returns true if the document ended up in the sink during this run
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Written | Self::Empty)
    }

    /// Returns true if the document was intentionally not written
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::SkippedEmpty | Self::SkippedExisting)
    }

    /// Returns true if the document should be retried out-of-band
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failed | Self::Cancelled)
    }

    /// Stable label used in logs and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Written => "written",
            Self::Empty => "empty",
            Self::SkippedEmpty => "skipped_empty",
            Self::SkippedExisting => "skipped_existing",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns all possible document states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Written,
            Self::Empty,
            Self::SkippedEmpty,
            Self::SkippedExisting,
            Self::Failed,
            Self::Cancelled,
        ]
    }
}

impl fmt::Display for DocumentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

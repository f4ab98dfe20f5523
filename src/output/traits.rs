//! Document sink trait and errors
//!
//! A sink receives one normalized document per discovered identifier. The
//! scheduler writes to sinks concurrently, so implementations must be
//! thread-safe and tolerate writes for distinct identifiers at the same time.

use std::future::Future;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while storing a document
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Identifier cannot be stored: {0:?}")]
    InvalidIdentifier(String),

    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Sink rejected write: {0}")]
    Rejected(String),
}

/// Result type for sink operations
pub type SinkResult<T> = Result<T, SinkError>;

/// Destination for harvested documents
pub trait DocumentSink: Send + Sync + 'static {
    /// Stores `text` under `identifier`, replacing any previous document
    ///
    /// # Arguments
    ///
    /// * `identifier` - Page title the document was harvested for
    /// * `text` - Normalized paragraph text (may be empty)
    fn write(&self, identifier: &str, text: &str) -> impl Future<Output = SinkResult<()>> + Send;

    /// Returns true if a document for `identifier` is already stored
    ///
    /// Used to resume an interrupted harvest. Sinks that cannot tell report `false`.
    fn contains(&self, identifier: &str) -> impl Future<Output = bool> + Send {
        let _ = identifier;
        async { false }
    }
}

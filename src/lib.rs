//! Allpages-Harvester: a polite article harvester for paginated wiki indexes
//!
//! This crate discovers every article reachable from a `Special:AllPages` style index,
//! fetches each article with bounded concurrency, and writes its normalized paragraph
//! text as one plain-text document per article.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod text;

use thiserror::Error;

/// Coarse classification of every failure the harvester can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Timeout, connection failure or 5xx response (retryable)
    Transient,
    /// Retry budget exhausted, or a non-retryable HTTP status
    Unreachable,
    /// The index table or its anchors are missing
    IndexStructureChanged,
    /// A page was fetched but held no paragraph text
    ExtractionEmpty,
    /// The output sink rejected a write
    SinkWriteFailed,
    /// Invalid configuration
    Config,
    /// Local IO or serialization failure
    Io,
    /// Stopped by a shutdown request
    Cancelled,
}

/// Main error type for harvester operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("Index structure changed at {url}: {reason}")]
    IndexStructureChanged { url: String, reason: String },

    #[error("No paragraph text found for {identifier}")]
    ExtractionEmpty { identifier: String },

    #[error("Sink write failed for {identifier}: {source}")]
    SinkWriteFailed {
        identifier: String,
        source: output::SinkError,
    },

    #[error("Output error: {0}")]
    Sink(#[from] output::SinkError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Links cache error: {0}")]
    LinksCache(String),

    #[error("Cancelled during {0}")]
    Cancelled(&'static str),
}

impl HarvestError {
    /// Classifies this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) | Self::UrlParse(_) => ErrorKind::Config,
            Self::Fetch(e) => e.kind(),
            Self::IndexStructureChanged { .. } => ErrorKind::IndexStructureChanged,
            Self::ExtractionEmpty { .. } => ErrorKind::ExtractionEmpty,
            Self::SinkWriteFailed { .. } => ErrorKind::SinkWriteFailed,
            Self::Reqwest(_) => ErrorKind::Transient,
            Self::Sink(_) | Self::Io(_) | Self::LinksCache(_) => ErrorKind::Io,
            Self::Cancelled(_) => ErrorKind::Cancelled,
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid CSS selector: {0}")]
    InvalidSelector(String),
}

/// Result type alias for harvester operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{DiscoveredLinks, LinkEntry};
pub use state::{DocumentState, PageIndexState};
pub use text::normalize;

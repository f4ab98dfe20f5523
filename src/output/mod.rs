//! Output module for harvested documents and run artifacts
//!
//! This module handles:
//! - Storing normalized documents through a [`DocumentSink`]
//! - Caching discovered links between runs
//! - Summarizing a harvest in a [`CrawlReport`]

mod filesystem;
mod links;
mod memory;
mod report;
mod traits;

pub use filesystem::{document_file_name, FsSink};
pub use links::{load_links, save_links};
pub use memory::MemorySink;
pub use report::{print_report, CrawlReport, FailureRecord};
pub use traits::{DocumentSink, SinkError, SinkResult};

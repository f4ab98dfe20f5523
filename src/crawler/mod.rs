//! Crawler module for index discovery and document harvesting
//!
//! This module contains the core harvesting logic, including:
//! - HTTP fetching with retry logic
//! - HTML parsing of index listings and article bodies
//! - Paginated link discovery
//! - Concurrency-limited document scheduling
//! - Overall harvest coordination

mod coordinator;
mod discovery;
mod fetcher;
mod parser;
mod scheduler;

pub use coordinator::{run_harvest, Coordinator};
pub use discovery::{DiscoveredLinks, LinkDiscoverer, LinkEntry};
pub use fetcher::{
    build_http_client, is_retryable_status, FetchError, HttpFetcher, PageSource, RetryPolicy,
    RETRY_STATUSES,
};
pub use parser::{
    extract_allpages_links, extract_index_sections, extract_next_page, extract_paragraph_text,
    parse_allpages, parse_selector, resolve_link, Candidate,
};
pub use scheduler::{pick_delay, CrawlScheduler};

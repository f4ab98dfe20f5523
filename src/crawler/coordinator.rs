//! Harvest coordinator - main orchestration logic
//!
//! This module wires the harvest phases together:
//! - Building the shared HTTP fetcher from configuration
//! - Discovering links, or loading them from the links cache
//! - Crawling every link into the filesystem sink
//! - Propagating the shutdown signal to both phases

use crate::config::Config;
use crate::crawler::discovery::{DiscoveredLinks, LinkDiscoverer};
use crate::crawler::fetcher::HttpFetcher;
use crate::crawler::parser::parse_selector;
use crate::crawler::scheduler::CrawlScheduler;
use crate::output::{load_links, save_links, CrawlReport, FsSink};
use crate::HarvestError;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;
use url::Url;

/// Main harvest coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    index_url: Url,
    fetcher: Arc<HttpFetcher>,
    shutdown: watch::Receiver<bool>,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - A validated configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(HarvestError)` - The index URL or HTTP settings are unusable
    pub fn new(config: Config) -> Result<Self, HarvestError> {
        let index_url = Url::parse(&config.site.index_url)?;
        let fetcher = HttpFetcher::from_config(&config.http, &index_url)?;
        let (_, shutdown) = watch::channel(false);

        Ok(Self {
            config: Arc::new(config),
            index_url,
            fetcher: Arc::new(fetcher),
            shutdown,
        })
    }

    /// Attaches a shutdown signal, usually wired to Ctrl-C
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn index_url(&self) -> &Url {
        &self.index_url
    }

    /// Returns the links to harvest
    ///
    /// A links cache for the same index is reused unless `refresh` is set. Freshly
    /// discovered links are written back to the cache when one is configured. A
    /// discovery cut short by shutdown fails and leaves the cache untouched.
    pub async fn discover(&self, refresh: bool) -> Result<DiscoveredLinks, HarvestError> {
        let links_path = self.config.output.links_path.as_deref().map(Path::new);

        if let (Some(path), false) = (links_path, refresh) {
            match load_links(path, &self.index_url).await {
                Ok(Some(links)) => return Ok(links),
                Ok(None) => {}
                Err(e) => tracing::warn!("Ignoring unreadable links cache: {}", e),
            }
        }

        tracing::info!("Discovering links from {}", self.index_url);
        let selector = parse_selector(&self.config.site.index_table_selector)?;
        let discoverer = LinkDiscoverer::new(
            Arc::clone(&self.fetcher),
            selector,
            self.config.crawler.concurrency_limit as usize,
        )
        .with_shutdown(self.shutdown.clone());
        let links = discoverer.discover_all_links(&self.index_url).await?;

        if let Some(path) = links_path {
            if let Err(e) = save_links(path, &self.index_url, &links).await {
                tracing::warn!("Failed to save links cache {}: {}", path.display(), e);
            }
        }

        Ok(links)
    }

    /// Harvests `links` into the configured output directory
    pub async fn crawl(&self, links: DiscoveredLinks) -> Result<CrawlReport, HarvestError> {
        let sink = FsSink::create(&self.config.output.output_dir).await?;
        tracing::info!("Writing documents to {}", sink.dir().display());

        let scheduler = CrawlScheduler::new(Arc::clone(&self.fetcher), &self.config.crawler)
            .with_shutdown(self.shutdown.clone());

        Ok(scheduler.run(links, Arc::new(sink)).await)
    }

    /// Runs discovery followed by the crawl
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlReport)` - The crawl ran; individual documents may still have failed
    /// * `Err(HarvestError)` - Discovery or output setup failed
    pub async fn run(&self, refresh_links: bool) -> Result<CrawlReport, HarvestError> {
        let links = self.discover(refresh_links).await?;
        tracing::info!("Discovered {} links", links.len());
        self.crawl(links).await
    }
}

/// Runs a complete harvest with no external shutdown signal
pub async fn run_harvest(config: Config) -> Result<CrawlReport, HarvestError> {
    let coordinator = Coordinator::new(config)?;
    coordinator.run(false).await
}

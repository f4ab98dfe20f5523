//! Link discovery over a paginated AllPages index
//!
//! Discovery runs in two levels:
//! 1. The index page yields one link per alphabetical section
//! 2. Each section is paginated until it stops producing new candidates
//!
//! Sections are walked concurrently. Each walk builds its own [`DiscoveredLinks`];
//! the per-section results are merged in index order once every walk has finished,
//! so the last section mentioning a title decides its URL.
//!
//! A shutdown signal abandons discovery: in-flight section walks are aborted and
//! no partial link set is returned.

use crate::crawler::fetcher::PageSource;
use crate::crawler::parser::{extract_index_sections, parse_allpages};
use crate::crawler::scheduler::wait_for_shutdown;
use crate::state::PageIndexState;
use crate::HarvestError;
use scraper::Selector;
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use url::{Origin, Url};

/// A discovered article
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkEntry {
    /// Page title, unique within a [`DiscoveredLinks`] set
    pub identifier: String,

    /// Absolute article URL on the index origin
    pub url: Url,
}

/// Deduplicated identifier → URL mapping
///
/// Insertion is last-write-wins: inserting an identifier that is already present
/// replaces its URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveredLinks {
    links: BTreeMap<String, Url>,
}

impl DiscoveredLinks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a link, returning the URL it replaced
    pub fn insert(&mut self, identifier: impl Into<String>, url: Url) -> Option<Url> {
        self.links.insert(identifier.into(), url)
    }

    /// Merges `other` into `self`; entries of `other` win on collision
    ///
    /// Returns the number of identifiers whose URL changed.
    pub fn merge(&mut self, other: DiscoveredLinks) -> usize {
        let mut replaced = 0;
        for (identifier, url) in other.links {
            match self.links.get_mut(&identifier) {
                Some(existing) => {
                    if *existing != url {
                        *existing = url;
                        replaced += 1;
                    }
                }
                None => {
                    self.links.insert(identifier, url);
                }
            }
        }
        replaced
    }

    pub fn get(&self, identifier: &str) -> Option<&Url> {
        self.links.get(identifier)
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.links.contains_key(identifier)
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Iterates over `(identifier, url)` pairs in identifier order
    pub fn iter(&self) -> btree_map::Iter<'_, String, Url> {
        self.links.iter()
    }

    /// Consumes the set, yielding one [`LinkEntry`] per identifier
    pub fn into_entries(self) -> Vec<LinkEntry> {
        self.links
            .into_iter()
            .map(|(identifier, url)| LinkEntry { identifier, url })
            .collect()
    }
}

impl FromIterator<(String, Url)> for DiscoveredLinks {
    fn from_iter<I: IntoIterator<Item = (String, Url)>>(iter: I) -> Self {
        let mut links = DiscoveredLinks::new();
        for (identifier, url) in iter {
            links.insert(identifier, url);
        }
        links
    }
}

/// Result of walking one index section
#[derive(Debug, Default)]
struct SectionWalk {
    links: DiscoveredLinks,
    pages_fetched: usize,
}

/// Walks a paginated index and collects every article link
pub struct LinkDiscoverer<S> {
    source: Arc<S>,
    table_selector: Selector,
    concurrency_limit: usize,
    shutdown: watch::Receiver<bool>,
}

impl<S: PageSource> LinkDiscoverer<S> {
    /// Creates a discoverer
    ///
    /// # Arguments
    ///
    /// * `source` - Where pages are fetched from
    /// * `table_selector` - Selector for the index navigation table
    /// * `concurrency_limit` - Maximum number of sections walked at once
    pub fn new(source: Arc<S>, table_selector: Selector, concurrency_limit: usize) -> Self {
        let (_, shutdown) = watch::channel(false);

        Self {
            source,
            table_selector,
            concurrency_limit: concurrency_limit.max(1),
            shutdown,
        }
    }

    /// Abandons discovery once `shutdown` turns true
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Discovers every article reachable from `index_url`
    ///
    /// # Returns
    ///
    /// * `Ok(DiscoveredLinks)` - All links found; sections that failed midway keep what
    ///   they collected before the failure
    /// * `Err(HarvestError::IndexStructureChanged)` - The index table or its anchors
    ///   are missing
    /// * `Err(HarvestError::Fetch)` - The index page itself could not be fetched
    /// * `Err(HarvestError::Cancelled)` - Shutdown was requested before discovery finished
    pub async fn discover_all_links(&self, index_url: &Url) -> Result<DiscoveredLinks, HarvestError> {
        let mut shutdown = self.shutdown.clone();
        let sections = tokio::select! {
            biased;
            _ = wait_for_shutdown(&mut shutdown) => {
                return Err(HarvestError::Cancelled("link discovery"));
            }
            sections = self.fetch_sections(index_url) => sections?,
        };
        tracing::info!("Index lists {} sections", sections.len());

        let origin = index_url.origin();
        let semaphore = Arc::new(Semaphore::new(self.concurrency_limit));
        let mut tasks = JoinSet::new();

        for (position, section_url) in sections.into_iter().enumerate() {
            let permit = tokio::select! {
                biased;
                _ = wait_for_shutdown(&mut shutdown) => {
                    tasks.shutdown().await;
                    return Err(HarvestError::Cancelled("link discovery"));
                }
                permit = semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };
            let source = Arc::clone(&self.source);
            let origin = origin.clone();

            tasks.spawn(async move {
                let _permit = permit;
                let walk = walk_section(&*source, section_url, &origin).await;
                (position, walk)
            });
        }

        let mut walks: Vec<(usize, SectionWalk)> = Vec::new();
        loop {
            let joined = tokio::select! {
                biased;
                _ = wait_for_shutdown(&mut shutdown) => {
                    tracing::warn!("Shutdown requested, abandoning {} section walks", tasks.len());
                    tasks.shutdown().await;
                    return Err(HarvestError::Cancelled("link discovery"));
                }
                joined = tasks.join_next() => joined,
            };
            match joined {
                Some(Ok(result)) => walks.push(result),
                Some(Err(e)) => tracing::error!("Section walk task failed: {}", e),
                None => break,
            }
        }

        // Reduce in index order so later sections win on duplicate titles
        walks.sort_by_key(|(position, _)| *position);

        let mut all_links = DiscoveredLinks::new();
        let mut pages_fetched = 0;
        let mut replaced = 0;
        for (_, walk) in walks {
            pages_fetched += walk.pages_fetched;
            replaced += all_links.merge(walk.links);
        }

        tracing::info!(
            links = all_links.len(),
            pages = pages_fetched,
            replaced,
            "Link discovery complete"
        );

        Ok(all_links)
    }

    /// Fetches the index page and returns its same-origin section links
    async fn fetch_sections(&self, index_url: &Url) -> Result<Vec<Url>, HarvestError> {
        let body = self.source.fetch(index_url).await?;
        let html = String::from_utf8_lossy(&body);

        let sections = extract_index_sections(&html, &self.table_selector, index_url)
            .ok_or_else(|| HarvestError::IndexStructureChanged {
                url: index_url.to_string(),
                reason: "index table not found".to_string(),
            })?;

        let origin = index_url.origin();
        let sections: Vec<Url> = sections
            .into_iter()
            .filter(|url| url.origin() == origin)
            .collect();

        if sections.is_empty() {
            return Err(HarvestError::IndexStructureChanged {
                url: index_url.to_string(),
                reason: "index table has no section links".to_string(),
            });
        }

        Ok(sections)
    }
}

/// Paginates one section until it stops growing
///
/// A failed fetch ends the section but keeps the links gathered so far.
async fn walk_section<S: PageSource>(source: &S, start: Url, origin: &Origin) -> SectionWalk {
    let mut state = PageIndexState::new(start);
    let mut walk = SectionWalk::default();

    while let Some(page_url) = state.current_page_url.clone() {
        let body = match source.fetch(&page_url).await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(
                    url = %page_url,
                    error = %e,
                    "Section page fetch failed, keeping {} links",
                    walk.links.len()
                );
                break;
            }
        };
        walk.pages_fetched += 1;

        let html = String::from_utf8_lossy(&body);
        let (candidates, next) = parse_allpages(&html, &page_url);

        for candidate in candidates {
            if candidate.url.origin() != *origin {
                tracing::debug!("Skipping off-site link {}", candidate.url);
                continue;
            }
            walk.links.insert(candidate.title, candidate.url);
        }

        if !state.record_page(walk.links.len()) {
            tracing::debug!(url = %page_url, "Section reached fixed point");
            break;
        }

        tracing::debug!(
            url = %page_url,
            seen = state.seen_count,
            "Section page processed"
        );
        state.advance(next);
    }

    walk
}

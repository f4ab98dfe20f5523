use url::Url;

/// Cursor over one paginated index section
///
/// Lives only while a section is being walked. `seen_count` is the number of distinct
/// candidates collected so far; a page that does not raise it marks the fixed point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageIndexState {
    /// Page to fetch next, `None` once the section is exhausted
    pub current_page_url: Option<Url>,

    /// Distinct candidates seen after the last fetched page
    pub seen_count: usize,
}

impl PageIndexState {
    pub fn new(start: Url) -> Self {
        Self {
            current_page_url: Some(start),
            seen_count: 0,
        }
    }

    /// Records the candidate count after a page fetch
    ///
    /// Returns `false` when the count did not grow, i.e. the section reached its
    /// fixed point.
    pub fn record_page(&mut self, distinct_candidates: usize) -> bool {
        let grew = distinct_candidates > self.seen_count;
        self.seen_count = distinct_candidates;
        grew
    }

    /// Moves the cursor to the next page, or ends the section
    pub fn advance(&mut self, next: Option<Url>) {
        self.current_page_url = next;
    }
}

use serde::Deserialize;
use std::time::Duration;

/// Realistic browser user agent; the target wiki rejects obvious bot agents
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_11_6) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/66.0.3359.181 Safari/537.36";

/// Selector for the alphabetical navigation table on the Odia Wikipedia main page
pub const DEFAULT_INDEX_TABLE_SELECTOR: &str =
    r#"table[style="border:2px solid #e1eaee; border-collapse:separate;font-size:120%"]"#;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub http: HttpConfig,
    pub output: OutputConfig,
}

/// Site being harvested
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Site root holding the index table
    #[serde(rename = "index-url")]
    pub index_url: String,

    /// CSS selector for the table holding the section links
    #[serde(rename = "index-table-selector", default = "default_index_table_selector")]
    pub index_table_selector: String,
}

/// Crawl scheduling configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of documents in flight at once
    #[serde(rename = "concurrency-limit", default = "default_concurrency_limit")]
    pub concurrency_limit: u32,

    /// Politeness delays (milliseconds), one picked at random before each fetch
    #[serde(rename = "delay-candidates", default = "default_delay_candidates")]
    pub delay_candidates: Vec<u64>,

    /// Skip documents that already exist in the output directory
    #[serde(rename = "skip-existing", default)]
    pub skip_existing: bool,

    /// Do not write documents with no paragraph text
    #[serde(rename = "skip-empty", default)]
    pub skip_empty: bool,

    /// Replace ASCII pipes with the Odia danda during normalization
    #[serde(rename = "danda-pipes", default)]
    pub danda_pipes: bool,
}

impl CrawlerConfig {
    pub fn delays(&self) -> Vec<Duration> {
        self.delay_candidates
            .iter()
            .map(|ms| Duration::from_millis(*ms))
            .collect()
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: default_concurrency_limit(),
            delay_candidates: default_delay_candidates(),
            skip_existing: false,
            skip_empty: false,
            danda_pipes: false,
        }
    }
}

/// HTTP request configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Referer header; defaults to the index URL when unset
    #[serde(default)]
    pub referer: Option<String>,

    /// Accept header
    #[serde(default = "default_accept")]
    pub accept: String,

    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Total attempts per request, including the first
    #[serde(rename = "retry-max-attempts", default = "default_retry_max_attempts")]
    pub retry_max_attempts: u32,

    /// Wait before the first retry (milliseconds)
    #[serde(rename = "retry-backoff-base-ms", default = "default_retry_backoff_base_ms")]
    pub retry_backoff_base_ms: u64,

    /// Multiplier applied to the wait after each retry
    #[serde(rename = "retry-backoff-factor", default = "default_retry_backoff_factor")]
    pub retry_backoff_factor: f64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            referer: None,
            accept: default_accept(),
            timeout_secs: default_timeout_secs(),
            retry_max_attempts: default_retry_max_attempts(),
            retry_backoff_base_ms: default_retry_backoff_base_ms(),
            retry_backoff_factor: default_retry_backoff_factor(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving one `.txt` file per document
    #[serde(rename = "output-dir")]
    pub output_dir: String,

    /// Where discovered links are cached between runs
    #[serde(rename = "links-path", default)]
    pub links_path: Option<String>,
}

fn default_index_table_selector() -> String {
    DEFAULT_INDEX_TABLE_SELECTOR.to_string()
}

fn default_concurrency_limit() -> u32 {
    10
}

fn default_delay_candidates() -> Vec<u64> {
    vec![1000, 2000, 4000, 5000, 7000, 9000]
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_accept() -> String {
    "*/*".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_retry_max_attempts() -> u32 {
    5
}

fn default_retry_backoff_base_ms() -> u64 {
    200
}

fn default_retry_backoff_factor() -> f64 {
    2.0
}

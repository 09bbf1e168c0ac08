use serde::Deserialize;

/// Main configuration structure for Corpus-Sieve
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub provider: ProviderConfig,
    pub queue: QueueConfig,
    pub store: StoreConfig,
    #[serde(default)]
    pub reducer: ReducerConfig,
}

/// Remote crawl provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Crawl endpoint the site URL is posted to
    pub endpoint: String,

    /// Name of the environment variable holding the API key
    #[serde(rename = "api-key-env", default = "default_api_key_env")]
    pub api_key_env: String,

    /// Maximum number of pages requested per site
    #[serde(rename = "page-limit", default = "default_page_limit")]
    pub page_limit: u32,

    /// Upper bound on a single crawl call (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Upper bound on the buffered response payload (bytes)
    #[serde(rename = "max-response-bytes", default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
}

/// Site queue configuration
#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    /// Failed fetch attempts before a site is marked errored
    #[serde(rename = "retry-limit", default = "default_retry_limit")]
    pub retry_limit: u32,

    /// Sites claimed per batch run
    #[serde(rename = "max-sites-per-run", default = "default_max_sites")]
    pub max_sites_per_run: u32,
}

/// Document store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Cleaned text is truncated to this many bytes before storage
    #[serde(rename = "max-document-bytes", default = "default_max_document_bytes")]
    pub max_document_bytes: usize,

    /// Overwrite documents whose content already exists for the site
    #[serde(rename = "update-existing", default)]
    pub update_existing: bool,

    /// Largest value or row the database accepts (bytes); SQLite's own
    /// limit applies when unset
    #[serde(rename = "max-value-bytes", default)]
    pub max_value_bytes: Option<u32>,
}

/// Markup reducer denylists
#[derive(Debug, Clone, Deserialize)]
pub struct ReducerConfig {
    /// Elements removed together with their subtree
    #[serde(rename = "strip-tags", default = "default_strip_tags")]
    pub strip_tags: Vec<String>,

    /// Class names or ids whose elements are removed
    #[serde(rename = "strip-identifiers", default = "default_strip_identifiers")]
    pub strip_identifiers: Vec<String>,
}

impl Default for ReducerConfig {
    fn default() -> Self {
        Self {
            strip_tags: default_strip_tags(),
            strip_identifiers: default_strip_identifiers(),
        }
    }
}

fn default_api_key_env() -> String {
    "SPIDER_API_KEY".to_string()
}

fn default_page_limit() -> u32 {
    500
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_max_response_bytes() -> usize {
    256 * 1024 * 1024
}

fn default_retry_limit() -> u32 {
    3
}

fn default_max_sites() -> u32 {
    200
}

fn default_max_document_bytes() -> usize {
    1024 * 1024
}

fn default_strip_tags() -> Vec<String> {
    ["script", "style", "nav", "footer", "header", "aside", "form"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_strip_identifiers() -> Vec<String> {
    [
        "menu",
        "sidebar",
        "ad-section",
        "navbar",
        "modal",
        "footer",
        "masthead",
        "comment",
        "widget",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

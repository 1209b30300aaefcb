use crate::model::Category;
use serde::Deserialize;

/// Main configuration structure for Catalogue-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    #[serde(default, rename = "category")]
    pub categories: Vec<CategoryEntry>,
}

/// Upstream catalogue API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Endpoint returning the per-letter item counts of a category
    #[serde(rename = "summary-url")]
    pub summary_url: String,

    /// Endpoint returning one page of items for a category and letter
    #[serde(rename = "items-url")]
    pub items_url: String,

    /// Fixed number of items the server returns on a full page
    #[serde(rename = "page-size", default = "default_page_size")]
    pub page_size: u32,

    /// Whole-request timeout (seconds)
    #[serde(rename = "request-timeout", default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Connection timeout (seconds)
    #[serde(rename = "connect-timeout", default = "default_connect_timeout")]
    pub connect_timeout: u64,
}

/// Retry and backoff behaviour of a single logical request
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Total number of requests made before giving up
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Short wait between attempts (milliseconds)
    #[serde(rename = "retry-wait", default = "default_retry_wait")]
    pub retry_wait: u64,

    /// Consecutive failures after which every retry also waits for the cooldown
    #[serde(rename = "cooldown-after", default = "default_cooldown_after")]
    pub cooldown_after: u32,

    /// Long cooldown applied on suspected rate limiting (seconds)
    #[serde(default = "default_cooldown")]
    pub cooldown: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_wait: default_retry_wait(),
            cooldown_after: default_cooldown_after(),
            cooldown: default_cooldown(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the harvester
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the harvester
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the harvester
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for harvester-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// A catalogue category to harvest
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryEntry {
    pub id: i64,
    pub name: String,
}

impl From<&CategoryEntry> for Category {
    fn from(entry: &CategoryEntry) -> Self {
        Category::new(entry.id, entry.name.clone())
    }
}

fn default_page_size() -> u32 {
    12
}

fn default_request_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_max_attempts() -> u32 {
    8
}

fn default_retry_wait() -> u64 {
    5100
}

fn default_cooldown_after() -> u32 {
    5
}

fn default_cooldown() -> u64 {
    300
}

use serde::Deserialize;

/// Main application configuration for Pricewren
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub scraping: ScrapingConfig,
    #[serde(default)]
    pub processing: ProcessingConfig,
    #[serde(default)]
    pub site: Vec<SiteConfig>,
}

impl AppConfig {
    /// Looks up a site entry by its identifier.
    pub fn site(&self, id: &str) -> Option<&SiteConfig> {
        self.site.iter().find(|s| s.id == id)
    }
}

/// HTTP client behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Accept-Language header sent with every request
    #[serde(rename = "accept-language", default = "default_accept_language")]
    pub accept_language: String,

    /// Request timeout in seconds (5-120)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum fetch attempts per URL, including the first
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff multiplier applied per failed attempt
    #[serde(rename = "backoff-factor", default = "default_backoff_factor")]
    pub backoff_factor: f64,

    /// Base backoff before the first retry (milliseconds)
    #[serde(rename = "initial-backoff-ms", default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
}

/// Scraping behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ScrapingConfig {
    /// Default inter-request delay in seconds when a run does not override it
    #[serde(rename = "default-delay-secs", default = "default_delay_secs")]
    pub default_delay_secs: f64,

    /// Default maximum record count when a run does not override it
    #[serde(rename = "max-products", default = "default_max_products")]
    pub max_products: u32,

    /// Requests-per-minute ceiling enforced by the rate limiter
    #[serde(rename = "requests-per-minute", default = "default_requests_per_minute")]
    pub requests_per_minute: u32,

    /// Whether fetch/parse errors on single items or pages are skipped
    #[serde(rename = "skip-errors", default = "default_skip_errors")]
    pub skip_errors: bool,

    /// Back-to-back failure ceiling; exceeding it aborts the run
    #[serde(rename = "max-consecutive-errors", default = "default_max_consecutive_errors")]
    pub max_consecutive_errors: u32,
}

/// Data processor configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessingConfig {
    /// Decimal places prices are rounded to
    #[serde(rename = "decimal-places", default = "default_decimal_places")]
    pub decimal_places: u32,

    /// In strict mode, records with quality flags are dropped instead of kept
    #[serde(default)]
    pub strict: bool,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            decimal_places: default_decimal_places(),
            strict: false,
        }
    }
}

/// Which parser variant a site uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParserKind {
    /// Catalog-style listing pages with embedded price/rating/name/URL
    Catalog,
    /// Quote-style text blocks with author and tags
    Quotes,
}

/// How a site paginates its listing pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaginationKind {
    /// Follow the "next page" link found in the listing markup
    NextLink,
}

/// Per-target site configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Short identifier used to select the site from the CLI
    pub id: String,

    /// Human-readable site name
    pub name: String,

    /// Base URL the scrape starts from
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Parser variant for this site's page templates
    pub parser: ParserKind,

    /// Pagination strategy identifier
    #[serde(default = "default_pagination")]
    pub pagination: PaginationKind,

    /// Minimum delay between requests to this site (seconds)
    #[serde(rename = "rate-limit-secs", default = "default_delay_secs")]
    pub rate_limit_secs: f64,

    /// Maximum number of listing pages to walk
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: u32,

    /// Whether each item's detail page is fetched for enrichment
    #[serde(rename = "detail-pages", default)]
    pub detail_pages: bool,

    /// Categories or tags this site is known to support
    #[serde(default)]
    pub categories: Vec<String>,
}

/// Configuration for a single scraping run, immutable once the run starts
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    /// Identifier of the target site
    pub site: String,

    /// Hard upper bound on collected records (1-1000)
    pub max_products: u32,

    /// Minimum inter-request delay in seconds (0.5-10.0)
    pub delay_secs: f64,

    /// Case-insensitive substring matched against category and tags
    pub category_filter: Option<String>,
}

impl ScrapeConfig {
    /// Builds a run configuration from app defaults for the given site.
    pub fn from_defaults(app: &AppConfig, site: &str) -> Self {
        Self {
            site: site.to_string(),
            max_products: app.scraping.max_products,
            delay_secs: app.scraping.default_delay_secs,
            category_filter: None,
        }
    }
}

fn default_user_agent() -> String {
    format!("pricewren/{}", env!("CARGO_PKG_VERSION"))
}

fn default_accept_language() -> String {
    "en-US,en;q=0.5".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_factor() -> f64 {
    2.0
}

fn default_initial_backoff_ms() -> u64 {
    500
}

fn default_delay_secs() -> f64 {
    1.0
}

fn default_max_products() -> u32 {
    100
}

fn default_requests_per_minute() -> u32 {
    30
}

fn default_skip_errors() -> bool {
    true
}

fn default_max_consecutive_errors() -> u32 {
    10
}

fn default_decimal_places() -> u32 {
    2
}

fn default_max_pages() -> u32 {
    50
}

fn default_pagination() -> PaginationKind {
    PaginationKind::NextLink
}

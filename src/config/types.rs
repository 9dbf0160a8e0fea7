use serde::Deserialize;
use std::collections::BTreeMap;

/// Main configuration structure for Corpus-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    #[serde(default, rename = "target")]
    pub targets: Vec<TargetConfig>,
    #[serde(default, rename = "batch")]
    pub batches: Vec<BatchConfig>,
}

impl Config {
    /// Looks up a crawl target by name
    pub fn target(&self, name: &str) -> Option<&TargetConfig> {
        self.targets.iter().find(|t| t.name == name)
    }

    /// Looks up a converter batch by name
    pub fn batch(&self, name: &str) -> Option<&BatchConfig> {
        self.batches.iter().find(|b| b.name == name)
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Minimum time between requests to the same host (milliseconds)
    #[serde(rename = "request-delay-ms")]
    pub request_delay_ms: u64,

    /// Maximum number of requests in flight at once
    #[serde(rename = "max-concurrent-requests")]
    pub max_concurrent_requests: u32,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    20
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the User-Agent header value
    ///
    /// Format: `CrawlerName/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the Bangla corpus (JSON Lines)
    #[serde(rename = "bangla-corpus")]
    pub bangla_corpus: String,

    /// Path to the English corpus (JSON Lines)
    #[serde(rename = "english-corpus")]
    pub english_corpus: String,
}

impl OutputConfig {
    /// Returns the configured path for a corpus
    pub fn corpus_path(&self, kind: CorpusKind) -> &str {
        match kind {
            CorpusKind::Bangla => &self.bangla_corpus,
            CorpusKind::English => &self.english_corpus,
        }
    }
}

/// Which output corpus a target or batch writes into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorpusKind {
    Bangla,
    English,
}

/// One site crawl
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TargetConfig {
    /// Unique target name
    pub name: String,

    /// Listing pages fetched first; may contain `{param}` placeholders
    #[serde(default)]
    pub start_urls: Vec<String>,

    /// Hosts links may point to (subdomains included); empty allows all
    #[serde(default)]
    pub allowed_domains: Vec<String>,

    pub corpus: CorpusKind,

    pub language: String,

    /// Section label for records; divisions override it
    #[serde(default)]
    pub section: String,

    /// Author used when the article page does not name one
    #[serde(default)]
    pub default_author: Option<String>,

    #[serde(default = "default_max_articles")]
    pub max_articles: u32,

    #[serde(default = "default_min_body_words")]
    pub min_body_words: u32,

    pub links: LinkRule,

    pub article: ArticleRule,

    #[serde(default)]
    pub pagination: PaginationConfig,

    /// Independent sub-crawls (categories), each with its own state
    #[serde(default, rename = "division")]
    pub divisions: Vec<DivisionConfig>,
}

impl TargetConfig {
    /// Templates that may carry `{param}` placeholders: start URLs,
    /// pagination URLs and header values
    pub fn templates(&self) -> Vec<&str> {
        let mut templates: Vec<&str> = self.start_urls.iter().map(String::as_str).collect();
        templates.extend(self.pagination.templates());
        templates
    }
}

fn default_max_articles() -> u32 {
    200
}

fn default_min_body_words() -> u32 {
    30
}

/// A category sub-crawl of a target
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DivisionConfig {
    pub name: String,

    /// Values for `{param}` placeholders in URLs and headers
    #[serde(default)]
    pub params: BTreeMap<String, String>,

    /// Section label; defaults to the division name
    #[serde(default)]
    pub section: Option<String>,

    /// Quota override for this division
    #[serde(default)]
    pub max_articles: Option<u32>,
}

impl DivisionConfig {
    /// Placeholder values for this division: its params plus `{division}`
    pub fn template_vars(&self) -> BTreeMap<String, String> {
        let mut vars = self.params.clone();
        vars.entry("division".to_string())
            .or_insert_with(|| self.name.clone());
        vars
    }

    /// Section label written to records
    pub fn section_label(&self) -> &str {
        self.section.as_deref().unwrap_or(&self.name)
    }
}

/// How article links are found on a listing page
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LinkRule {
    /// CSS selector for link elements
    pub selector: String,

    /// Attribute holding the URL
    #[serde(default = "default_link_attribute")]
    pub attribute: String,
}

fn default_link_attribute() -> String {
    "href".to_string()
}

/// How article fields are read from an article page
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ArticleRule {
    #[serde(default)]
    pub title: Option<FieldRule>,

    /// CSS selector (group) for body paragraphs
    pub body: String,

    #[serde(default)]
    pub date: Option<FieldRule>,

    #[serde(default)]
    pub author: Option<FieldRule>,
}

/// A single-valued article field
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FieldRule {
    pub selector: String,

    /// Read this attribute instead of the element text
    #[serde(default)]
    pub attribute: Option<String>,

    /// Prefix removed from the value (e.g. "Published:")
    #[serde(default)]
    pub strip_prefix: Option<String>,
}

/// Pagination strategy for a target
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "strategy", rename_all = "kebab-case")]
pub enum PaginationConfig {
    /// Only the start URLs are crawled
    #[default]
    None,

    /// `page-url` rendered with `{page}`
    FixedPager(FixedPagerConfig),

    /// JSON API with a numeric `{offset}` and an HTML payload field
    OffsetPager(OffsetPagerConfig),

    /// JSON API returning items; next request carries the last `{cursor}`
    CursorPager(CursorPagerConfig),

    /// Drupal-style command list; `{page}` increments
    CommandPager(CommandPagerConfig),
}

impl PaginationConfig {
    /// Short strategy name for logs and dry runs
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::FixedPager(_) => "fixed-pager",
            Self::OffsetPager(_) => "offset-pager",
            Self::CursorPager(_) => "cursor-pager",
            Self::CommandPager(_) => "command-pager",
        }
    }

    /// URL and header templates used by the strategy
    pub fn templates(&self) -> Vec<&str> {
        let (url, headers) = match self {
            Self::None => return Vec::new(),
            Self::FixedPager(c) => (&c.page_url, &c.headers),
            Self::OffsetPager(c) => (&c.api_url, &c.headers),
            Self::CursorPager(c) => (&c.api_url, &c.headers),
            Self::CommandPager(c) => (&c.api_url, &c.headers),
        };
        let mut templates = vec![url.as_str()];
        templates.extend(headers.values().map(String::as_str));
        templates
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FixedPagerConfig {
    pub page_url: String,

    /// First paginated page; the start URL counts as page 1
    #[serde(default = "default_first_fixed_page")]
    pub first_page: u32,

    pub max_pages: u32,

    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

fn default_first_fixed_page() -> u32 {
    2
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OffsetPagerConfig {
    pub api_url: String,

    pub start_offset: u32,

    pub page_size: u32,

    /// Hard safety ceiling; no request is made past it
    pub max_offset: u32,

    #[serde(default = "default_html_field")]
    pub html_field: String,

    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

fn default_html_field() -> String {
    "html".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CursorPagerConfig {
    pub api_url: String,

    #[serde(default = "default_initial_cursor")]
    pub initial_cursor: String,

    #[serde(default = "default_url_field")]
    pub url_field: String,

    #[serde(default = "default_id_field")]
    pub id_field: String,

    #[serde(default)]
    pub max_pages: Option<u32>,

    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

fn default_initial_cursor() -> String {
    "0".to_string()
}

fn default_url_field() -> String {
    "url".to_string()
}

fn default_id_field() -> String {
    "id".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CommandPagerConfig {
    pub api_url: String,

    /// Only entries with this `command` contribute HTML
    pub command: String,

    #[serde(default = "default_first_command_page")]
    pub first_page: u32,

    pub max_pages: u32,

    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

fn default_first_command_page() -> u32 {
    1
}

/// Input file layout for a converter batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InputFormat {
    Jsonl,
    Csv,
    JsonArray,
}

/// One batch conversion into a corpus
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BatchConfig {
    pub name: String,

    pub inputs: Vec<String>,

    pub format: InputFormat,

    pub corpus: CorpusKind,

    /// Language used when a record has none
    pub language: String,

    pub default_author: String,

    /// Always use `default-author`, ignoring the record's author
    #[serde(default)]
    pub override_author: bool,

    /// Input field holding the section label
    #[serde(default = "default_section_field")]
    pub section_field: String,

    /// Rewrite URLs to https without query, fragment or trailing slash
    #[serde(default)]
    pub canonical_urls: bool,

    /// Treat the body as HTML and keep only its text
    #[serde(default)]
    pub strip_html: bool,

    /// Reject records without a title
    #[serde(default)]
    pub require_title: bool,

    #[serde(default)]
    pub min_body_words: u32,

    /// Cap on accepted records per input file
    #[serde(default)]
    pub max_per_input: Option<u32>,
}

fn default_section_field() -> String {
    "section".to_string()
}

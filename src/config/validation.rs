use crate::config::template::{has_placeholder, render_template, CURSOR_PLACEHOLDERS};
use crate::config::types::{
    BatchConfig, Config, CrawlerConfig, OutputConfig, PaginationConfig, TargetConfig,
    UserAgentConfig,
};
use crate::ConfigError;
use scraper::Selector;
use std::collections::{BTreeMap, HashSet};
use url::Url;

/// Validates the entire configuration
///
/// Runs before any network I/O so that a target missing a required
/// parameter fails at startup with the offending name.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;

    let mut names = HashSet::new();
    for target in &config.targets {
        if !names.insert(target.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Duplicate target name '{}'",
                target.name
            )));
        }
        validate_target(target)?;
    }

    let mut batch_names = HashSet::new();
    for batch in &config.batches {
        if !batch_names.insert(batch.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Duplicate batch name '{}'",
                batch.name
            )));
        }
        validate_batch(batch)?;
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_requests < 1 || config.max_concurrent_requests > 100 {
        return Err(ConfigError::Validation(format!(
            "max-concurrent-requests must be between 1 and 100, got {}",
            config.max_concurrent_requests
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "request-timeout-secs must be >= 1, got {}",
            config.request_timeout_secs
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler-name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler-name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact-url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.bangla_corpus.is_empty() {
        return Err(ConfigError::Validation(
            "bangla-corpus cannot be empty".to_string(),
        ));
    }

    if config.english_corpus.is_empty() {
        return Err(ConfigError::Validation(
            "english-corpus cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates one crawl target
fn validate_target(target: &TargetConfig) -> Result<(), ConfigError> {
    if target.name.is_empty() {
        return Err(ConfigError::Validation(
            "Target name cannot be empty".to_string(),
        ));
    }

    if target.start_urls.is_empty() {
        return Err(ConfigError::Validation(format!(
            "Target '{}' must have at least one start URL",
            target.name
        )));
    }

    if target.max_articles < 1 {
        return Err(ConfigError::Validation(format!(
            "Target '{}': max-articles must be >= 1",
            target.name
        )));
    }

    for domain in &target.allowed_domains {
        validate_domain_pattern(domain)?;
    }

    validate_selectors(target)?;
    validate_pagination(target)?;

    let mut division_names = HashSet::new();
    for division in &target.divisions {
        if !division_names.insert(division.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Target '{}' has duplicate division '{}'",
                target.name, division.name
            )));
        }
        if division.max_articles == Some(0) {
            return Err(ConfigError::Validation(format!(
                "Division '{}' of target '{}': max-articles must be >= 1",
                division.name, target.name
            )));
        }
    }

    // Every division must supply every placeholder its templates use
    let var_sets: Vec<BTreeMap<String, String>> = if target.divisions.is_empty() {
        vec![BTreeMap::new()]
    } else {
        target.divisions.iter().map(|d| d.template_vars()).collect()
    };

    for vars in &var_sets {
        for template in target.templates() {
            render_template(template, vars, CURSOR_PLACEHOLDERS).map_err(|parameter| {
                ConfigError::MissingParameter {
                    target: target.name.clone(),
                    parameter,
                }
            })?;
        }

        for start in &target.start_urls {
            let rendered = render_template(start, vars, &[]).map_err(|parameter| {
                ConfigError::MissingParameter {
                    target: target.name.clone(),
                    parameter,
                }
            })?;
            validate_http_url(&rendered)?;
        }
    }

    Ok(())
}

/// Checks that every CSS selector of a target parses
fn validate_selectors(target: &TargetConfig) -> Result<(), ConfigError> {
    let article = &target.article;
    let mut selectors = vec![target.links.selector.as_str(), article.body.as_str()];
    for field in [&article.title, &article.date, &article.author]
        .into_iter()
        .flatten()
    {
        selectors.push(field.selector.as_str());
    }

    for selector in selectors {
        if Selector::parse(selector).is_err() {
            return Err(ConfigError::InvalidSelector {
                target: target.name.clone(),
                selector: selector.to_string(),
            });
        }
    }

    Ok(())
}

/// Checks that each pager carries the cursor placeholder it advances
fn validate_pagination(target: &TargetConfig) -> Result<(), ConfigError> {
    let (url, placeholder) = match &target.pagination {
        PaginationConfig::None => return Ok(()),
        PaginationConfig::FixedPager(c) => (&c.page_url, "page"),
        PaginationConfig::CommandPager(c) => {
            if c.command.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "Target '{}': command-pager command cannot be empty",
                    target.name
                )));
            }
            (&c.api_url, "page")
        }
        PaginationConfig::OffsetPager(c) => {
            if c.page_size < 1 {
                return Err(ConfigError::Validation(format!(
                    "Target '{}': page-size must be >= 1",
                    target.name
                )));
            }
            (&c.api_url, "offset")
        }
        PaginationConfig::CursorPager(c) => (&c.api_url, "cursor"),
    };

    if !has_placeholder(url, placeholder) {
        return Err(ConfigError::MissingParameter {
            target: target.name.clone(),
            parameter: placeholder.to_string(),
        });
    }

    Ok(())
}

/// Validates one converter batch
fn validate_batch(batch: &BatchConfig) -> Result<(), ConfigError> {
    if batch.name.is_empty() {
        return Err(ConfigError::Validation(
            "Batch name cannot be empty".to_string(),
        ));
    }

    if batch.inputs.is_empty() {
        return Err(ConfigError::Validation(format!(
            "Batch '{}' must have at least one input",
            batch.name
        )));
    }

    if batch.section_field.is_empty() {
        return Err(ConfigError::Validation(format!(
            "Batch '{}': section-field cannot be empty",
            batch.name
        )));
    }

    Ok(())
}

/// Validates an absolute http(s) URL
fn validate_http_url(raw: &str) -> Result<(), ConfigError> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid start URL '{}': {}", raw, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "Start URL '{}' must use http or https",
            raw
        )));
    }

    Ok(())
}

/// Validates a domain pattern (supports wildcards)
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain pattern cannot be empty".to_string(),
        ));
    }

    if let Some(domain) = pattern.strip_prefix("*.") {
        validate_domain_string(domain)
    } else {
        validate_domain_string(pattern)
    }
}

/// Validates a domain string (without wildcard prefix)
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
        || domain.contains("..")
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' is malformed",
            domain
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' must contain at least one dot (e.g., 'example.com')",
            domain
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    let invalid = || ConfigError::Validation(format!("Invalid contact-email: '{}'", email));

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') || !domain.contains('.') {
        return Err(invalid());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::{
        ArticleRule, CorpusKind, DivisionConfig, FixedPagerConfig, LinkRule, OffsetPagerConfig,
    };

    fn create_test_target() -> TargetConfig {
        TargetConfig {
            name: "jagonews".to_string(),
            start_urls: vec!["https://www.jagonews24.com/{division}".to_string()],
            allowed_domains: vec!["jagonews24.com".to_string()],
            corpus: CorpusKind::Bangla,
            language: "bn".to_string(),
            section: String::new(),
            default_author: None,
            max_articles: 200,
            min_body_words: 30,
            links: LinkRule {
                selector: "div.paddingTop10 a".to_string(),
                attribute: "href".to_string(),
            },
            article: ArticleRule {
                title: None,
                body: "div.content-details p".to_string(),
                date: None,
                author: None,
            },
            pagination: PaginationConfig::OffsetPager(OffsetPagerConfig {
                api_url: "https://www.jagonews24.com/ajax/load/categorynews/{category-id}/20/{offset}/20"
                    .to_string(),
                start_offset: 20,
                page_size: 20,
                max_offset: 2000,
                html_field: "html".to_string(),
                headers: BTreeMap::new(),
            }),
            divisions: vec![DivisionConfig {
                name: "national".to_string(),
                params: BTreeMap::from([("category-id".to_string(), "2".to_string())]),
                section: None,
                max_articles: None,
            }],
        }
    }

    #[test]
    fn test_valid_target() {
        assert!(validate_target(&create_test_target()).is_ok());
    }

    #[test]
    fn test_missing_division_parameter() {
        let mut target = create_test_target();
        target.divisions[0].params.clear();

        match validate_target(&target) {
            Err(ConfigError::MissingParameter { target, parameter }) => {
                assert_eq!(target, "jagonews");
                assert_eq!(parameter, "category-id");
            }
            other => panic!("expected MissingParameter, got {:?}", other),
        }
    }

    #[test]
    fn test_placeholder_without_divisions() {
        let mut target = create_test_target();
        target.divisions.clear();
        assert!(matches!(
            validate_target(&target),
            Err(ConfigError::MissingParameter { .. })
        ));
    }

    #[test]
    fn test_pager_requires_cursor_placeholder() {
        let mut target = create_test_target();
        target.start_urls = vec!["https://example.com/sports/".to_string()];
        target.divisions.clear();
        target.pagination = PaginationConfig::FixedPager(FixedPagerConfig {
            page_url: "https://example.com/sports/page/2/".to_string(),
            first_page: 2,
            max_pages: 10,
            headers: BTreeMap::new(),
        });

        match validate_target(&target) {
            Err(ConfigError::MissingParameter { parameter, .. }) => assert_eq!(parameter, "page"),
            other => panic!("expected MissingParameter, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_selector() {
        let mut target = create_test_target();
        target.links.selector = "div[[".to_string();
        assert!(matches!(
            validate_target(&target),
            Err(ConfigError::InvalidSelector { .. })
        ));
    }

    #[test]
    fn test_non_http_start_url() {
        let mut target = create_test_target();
        target.start_urls = vec!["ftp://example.com/".to_string()];
        assert!(matches!(
            validate_target(&target),
            Err(ConfigError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_validate_domain_pattern() {
        assert!(validate_domain_pattern("example.com").is_ok());
        assert!(validate_domain_pattern("*.example.com").is_ok());
        assert!(validate_domain_pattern("sub.example.com").is_ok());

        assert!(validate_domain_pattern("").is_err());
        assert!(validate_domain_pattern("*.").is_err());
        assert!(validate_domain_pattern("example").is_err());
        assert!(validate_domain_pattern(".example.com").is_err());
        assert!(validate_domain_pattern("example.com.").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("admin@sub.example.com").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("invalid").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("user@").is_err());
        assert!(validate_email("user@domain").is_err());
    }
}

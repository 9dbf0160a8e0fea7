//! Pagination strategies
//!
//! Every site is the same traversal with a different way of asking for
//! "more": a numbered HTML pager, an AJAX offset, an AJAX last-ID cursor
//! or a Drupal command list. A `Paginator` builds the next request from
//! the cursor, decodes the response into links and advances the cursor.
//! Whether to continue is decided by the engine with `evaluate_stop`.

use crate::config::{
    fill_cursor, render_template, CommandPagerConfig, CursorPagerConfig, FixedPagerConfig,
    LinkRule, OffsetPagerConfig, PaginationConfig, CURSOR_PLACEHOLDERS,
};
use crate::crawler::extractor::FieldExtractor;
use crate::crawler::fetcher::PageRequest;
use crate::state::{Cursor, StopReason};
use crate::ConfigError;
use serde_json::Value;
use std::collections::BTreeMap;

/// A link found on a listing page or in an API batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredLink {
    /// Raw link value, possibly relative
    pub url: String,

    /// Item ID reported by a cursor API
    pub id: Option<String>,
}

impl DiscoveredLink {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            id: None,
        }
    }
}

/// What a continuation response contained
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// Links in page order (may be empty)
    Links(Vec<DiscoveredLink>),

    /// The payload itself ends pagination
    Exhausted(StopReason),
}

/// A pagination strategy bound to one (division of a) target
pub trait Paginator: Send + Sync {
    /// Strategy name for logs
    fn name(&self) -> &'static str;

    /// Cursor of the first continuation request
    fn initial_cursor(&self) -> Cursor;

    /// Builds the request for `cursor`; None when there is nothing to request
    fn request(&self, cursor: &Cursor, referer: &str) -> Option<PageRequest>;

    /// Decodes a continuation response
    fn decode(&self, body: &str, extractor: &dyn FieldExtractor, rule: &LinkRule) -> PageOutcome;

    /// Cursor after a page that contributed `new_links`
    fn advance(&self, cursor: &Cursor, new_links: &[DiscoveredLink]) -> Cursor;

    /// Whether requesting `cursor` would pass the safety cap
    ///
    /// `pages_fetched` counts continuation pages already requested.
    fn cap_reached(&self, cursor: &Cursor, pages_fetched: u32) -> bool;
}

/// Builds the paginator for a target, rendering its templates with `vars`
///
/// Cursor placeholders are kept for per-request filling. A placeholder
/// missing from `vars` is a configuration error naming the parameter.
pub fn build_paginator(
    target: &str,
    config: &PaginationConfig,
    vars: &BTreeMap<String, String>,
) -> Result<Box<dyn Paginator>, ConfigError> {
    let render = |template: &str| {
        render_template(template, vars, CURSOR_PLACEHOLDERS).map_err(|parameter| {
            ConfigError::MissingParameter {
                target: target.to_string(),
                parameter,
            }
        })
    };
    let render_headers = |headers: &BTreeMap<String, String>| {
        headers
            .iter()
            .map(|(name, value)| -> Result<(String, String), ConfigError> {
                Ok((name.clone(), render(value)?))
            })
            .collect::<Result<Vec<_>, ConfigError>>()
    };

    let paginator: Box<dyn Paginator> = match config {
        PaginationConfig::None => Box::new(SinglePage),
        PaginationConfig::FixedPager(c) => Box::new(FixedPager {
            page_url: render(&c.page_url)?,
            headers: render_headers(&c.headers)?,
            ..FixedPager::from(c)
        }),
        PaginationConfig::OffsetPager(c) => Box::new(OffsetPager {
            api_url: render(&c.api_url)?,
            headers: render_headers(&c.headers)?,
            ..OffsetPager::from(c)
        }),
        PaginationConfig::CursorPager(c) => Box::new(CursorPager {
            api_url: render(&c.api_url)?,
            headers: render_headers(&c.headers)?,
            ..CursorPager::from(c)
        }),
        PaginationConfig::CommandPager(c) => Box::new(CommandPager {
            api_url: render(&c.api_url)?,
            headers: render_headers(&c.headers)?,
            ..CommandPager::from(c)
        }),
    };

    Ok(paginator)
}

/// Builds a continuation request with configured headers and a Referer
fn continuation_request(
    template: &str,
    headers: &[(String, String)],
    placeholder: &str,
    value: &str,
    referer: &str,
) -> PageRequest {
    let mut request = PageRequest::get(fill_cursor(template, placeholder, value));
    for (name, header) in headers {
        request = request.with_header(name.clone(), fill_cursor(header, placeholder, value));
    }
    if !headers.iter().any(|(name, _)| name.eq_ignore_ascii_case("referer")) {
        request = request.with_header("Referer", referer);
    }
    request
}

/// Links from an HTML fragment; an empty fragment ends pagination
fn html_links(html: &str, extractor: &dyn FieldExtractor, rule: &LinkRule) -> PageOutcome {
    if html.trim().is_empty() {
        return PageOutcome::Exhausted(StopReason::EmptyPayload);
    }

    PageOutcome::Links(
        extractor
            .extract_links(html, rule)
            .into_iter()
            .map(DiscoveredLink::new)
            .collect(),
    )
}

/// Start URLs only
pub struct SinglePage;

impl Paginator for SinglePage {
    fn name(&self) -> &'static str {
        "none"
    }

    fn initial_cursor(&self) -> Cursor {
        Cursor::None
    }

    fn request(&self, _cursor: &Cursor, _referer: &str) -> Option<PageRequest> {
        None
    }

    fn decode(&self, _body: &str, _extractor: &dyn FieldExtractor, _rule: &LinkRule) -> PageOutcome {
        PageOutcome::Exhausted(StopReason::NoPagination)
    }

    fn advance(&self, _cursor: &Cursor, _new_links: &[DiscoveredLink]) -> Cursor {
        Cursor::None
    }

    fn cap_reached(&self, _cursor: &Cursor, _pages_fetched: u32) -> bool {
        true
    }
}

/// Numbered HTML pages: `page-url` with `{page}`
pub struct FixedPager {
    page_url: String,
    first_page: u32,
    max_pages: u32,
    headers: Vec<(String, String)>,
}

impl From<&FixedPagerConfig> for FixedPager {
    fn from(c: &FixedPagerConfig) -> Self {
        Self {
            page_url: c.page_url.clone(),
            first_page: c.first_page,
            max_pages: c.max_pages,
            headers: c.headers.clone().into_iter().collect(),
        }
    }
}

impl Paginator for FixedPager {
    fn name(&self) -> &'static str {
        "fixed-pager"
    }

    fn initial_cursor(&self) -> Cursor {
        Cursor::Page(self.first_page)
    }

    fn request(&self, cursor: &Cursor, referer: &str) -> Option<PageRequest> {
        let Cursor::Page(page) = cursor else {
            return None;
        };
        Some(continuation_request(
            &self.page_url,
            &self.headers,
            "page",
            &page.to_string(),
            referer,
        ))
    }

    fn decode(&self, body: &str, extractor: &dyn FieldExtractor, rule: &LinkRule) -> PageOutcome {
        html_links(body, extractor, rule)
    }

    fn advance(&self, cursor: &Cursor, _new_links: &[DiscoveredLink]) -> Cursor {
        match cursor {
            Cursor::Page(page) => Cursor::Page(page + 1),
            other => other.clone(),
        }
    }

    fn cap_reached(&self, cursor: &Cursor, _pages_fetched: u32) -> bool {
        match cursor {
            Cursor::Page(page) => *page > self.max_pages,
            _ => true,
        }
    }
}

/// JSON API with a numeric offset and an HTML field
pub struct OffsetPager {
    api_url: String,
    start_offset: u32,
    page_size: u32,
    max_offset: u32,
    html_field: String,
    headers: Vec<(String, String)>,
}

impl From<&OffsetPagerConfig> for OffsetPager {
    fn from(c: &OffsetPagerConfig) -> Self {
        Self {
            api_url: c.api_url.clone(),
            start_offset: c.start_offset,
            page_size: c.page_size,
            max_offset: c.max_offset,
            html_field: c.html_field.clone(),
            headers: c.headers.clone().into_iter().collect(),
        }
    }
}

impl Paginator for OffsetPager {
    fn name(&self) -> &'static str {
        "offset-pager"
    }

    fn initial_cursor(&self) -> Cursor {
        Cursor::Offset(self.start_offset)
    }

    fn request(&self, cursor: &Cursor, referer: &str) -> Option<PageRequest> {
        let Cursor::Offset(offset) = cursor else {
            return None;
        };
        Some(continuation_request(
            &self.api_url,
            &self.headers,
            "offset",
            &offset.to_string(),
            referer,
        ))
    }

    fn decode(&self, body: &str, extractor: &dyn FieldExtractor, rule: &LinkRule) -> PageOutcome {
        let Ok(data) = serde_json::from_str::<Value>(body) else {
            return PageOutcome::Exhausted(StopReason::InvalidPayload);
        };

        match data.get(&self.html_field).and_then(Value::as_str) {
            Some(html) => html_links(html, extractor, rule),
            None => PageOutcome::Exhausted(StopReason::EmptyPayload),
        }
    }

    fn advance(&self, cursor: &Cursor, _new_links: &[DiscoveredLink]) -> Cursor {
        match cursor {
            Cursor::Offset(offset) => Cursor::Offset(offset.saturating_add(self.page_size)),
            other => other.clone(),
        }
    }

    fn cap_reached(&self, cursor: &Cursor, _pages_fetched: u32) -> bool {
        match cursor {
            Cursor::Offset(offset) => *offset > self.max_offset,
            _ => true,
        }
    }
}

/// JSON API returning an array of items; the next request carries a last ID
pub struct CursorPager {
    api_url: String,
    initial_cursor: String,
    url_field: String,
    id_field: String,
    max_pages: Option<u32>,
    headers: Vec<(String, String)>,
}

impl From<&CursorPagerConfig> for CursorPager {
    fn from(c: &CursorPagerConfig) -> Self {
        Self {
            api_url: c.api_url.clone(),
            initial_cursor: c.initial_cursor.clone(),
            url_field: c.url_field.clone(),
            id_field: c.id_field.clone(),
            max_pages: c.max_pages,
            headers: c.headers.clone().into_iter().collect(),
        }
    }
}

/// Renders a JSON scalar as an ID string
fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl Paginator for CursorPager {
    fn name(&self) -> &'static str {
        "cursor-pager"
    }

    fn initial_cursor(&self) -> Cursor {
        Cursor::LastId(self.initial_cursor.clone())
    }

    fn request(&self, cursor: &Cursor, referer: &str) -> Option<PageRequest> {
        let Cursor::LastId(id) = cursor else {
            return None;
        };
        Some(continuation_request(
            &self.api_url,
            &self.headers,
            "cursor",
            id,
            referer,
        ))
    }

    fn decode(&self, body: &str, _extractor: &dyn FieldExtractor, _rule: &LinkRule) -> PageOutcome {
        let Ok(Value::Array(items)) = serde_json::from_str::<Value>(body) else {
            return PageOutcome::Exhausted(StopReason::InvalidPayload);
        };

        if items.is_empty() {
            return PageOutcome::Exhausted(StopReason::EmptyPayload);
        }

        let links = items
            .iter()
            .filter_map(|item| {
                let url = item.get(&self.url_field)?.as_str()?.trim();
                if url.is_empty() {
                    return None;
                }
                Some(DiscoveredLink {
                    url: url.to_string(),
                    id: item.get(&self.id_field).and_then(id_string),
                })
            })
            .collect();

        PageOutcome::Links(links)
    }

    /// Highest numeric ID among the new items, else the last new item's ID
    fn advance(&self, cursor: &Cursor, new_links: &[DiscoveredLink]) -> Cursor {
        let highest = new_links
            .iter()
            .filter_map(|link| link.id.as_deref()?.parse::<u64>().ok())
            .max();

        if let Some(id) = highest {
            return Cursor::LastId(id.to_string());
        }

        match new_links.iter().rev().find_map(|link| link.id.clone()) {
            Some(id) => Cursor::LastId(id),
            None => cursor.clone(),
        }
    }

    fn cap_reached(&self, _cursor: &Cursor, pages_fetched: u32) -> bool {
        self.max_pages.map_or(false, |max| pages_fetched >= max)
    }
}

/// Drupal AJAX: an array of commands, some carrying HTML in `data`
pub struct CommandPager {
    api_url: String,
    command: String,
    first_page: u32,
    max_pages: u32,
    headers: Vec<(String, String)>,
}

impl From<&CommandPagerConfig> for CommandPager {
    fn from(c: &CommandPagerConfig) -> Self {
        Self {
            api_url: c.api_url.clone(),
            command: c.command.clone(),
            first_page: c.first_page,
            max_pages: c.max_pages,
            headers: c.headers.clone().into_iter().collect(),
        }
    }
}

impl Paginator for CommandPager {
    fn name(&self) -> &'static str {
        "command-pager"
    }

    fn initial_cursor(&self) -> Cursor {
        Cursor::Page(self.first_page)
    }

    fn request(&self, cursor: &Cursor, referer: &str) -> Option<PageRequest> {
        let Cursor::Page(page) = cursor else {
            return None;
        };
        Some(continuation_request(
            &self.api_url,
            &self.headers,
            "page",
            &page.to_string(),
            referer,
        ))
    }

    fn decode(&self, body: &str, extractor: &dyn FieldExtractor, rule: &LinkRule) -> PageOutcome {
        let Ok(Value::Array(commands)) = serde_json::from_str::<Value>(body) else {
            return PageOutcome::Exhausted(StopReason::InvalidPayload);
        };

        let html = commands
            .iter()
            .filter(|entry| entry.get("command").and_then(Value::as_str) == Some(self.command.as_str()))
            .filter_map(|entry| entry.get("data").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n");

        html_links(&html, extractor, rule)
    }

    fn advance(&self, cursor: &Cursor, _new_links: &[DiscoveredLink]) -> Cursor {
        match cursor {
            Cursor::Page(page) => Cursor::Page(page + 1),
            other => other.clone(),
        }
    }

    fn cap_reached(&self, _cursor: &Cursor, pages_fetched: u32) -> bool {
        pages_fetched >= self.max_pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::extractor::SelectorExtractor;

    fn rule() -> LinkRule {
        LinkRule {
            selector: "a.link".to_string(),
            attribute: "href".to_string(),
        }
    }

    fn offset_pager() -> OffsetPager {
        OffsetPager {
            api_url: "https://example.com/api?start={offset}&tags=15".to_string(),
            start_offset: 20,
            page_size: 20,
            max_offset: 60,
            html_field: "html".to_string(),
            headers: vec![("X-Requested-With".to_string(), "XMLHttpRequest".to_string())],
        }
    }

    fn cursor_pager() -> CursorPager {
        CursorPager {
            api_url: "https://example.com/ajax?lastID={cursor}".to_string(),
            initial_cursor: "0".to_string(),
            url_field: "url".to_string(),
            id_field: "id".to_string(),
            max_pages: Some(3),
            headers: Vec::new(),
        }
    }

    #[test]
    fn test_offset_request_carries_headers_and_referer() {
        let pager = offset_pager();
        let request = pager
            .request(&Cursor::Offset(40), "https://example.com/country/dhaka")
            .unwrap();

        assert_eq!(request.url, "https://example.com/api?start=40&tags=15");
        assert!(request
            .headers
            .contains(&("X-Requested-With".to_string(), "XMLHttpRequest".to_string())));
        assert!(request
            .headers
            .contains(&("Referer".to_string(), "https://example.com/country/dhaka".to_string())));
    }

    #[test]
    fn test_offset_decode() {
        let pager = offset_pager();
        let body = r#"{"html": "<a class=\"link\" href=\"/n/1\">1</a><a class=\"link\" href=\"/n/2\">2</a>"}"#;
        match pager.decode(body, &SelectorExtractor, &rule()) {
            PageOutcome::Links(links) => {
                assert_eq!(links.len(), 2);
                assert_eq!(links[0].url, "/n/1");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_offset_empty_and_invalid_payloads() {
        let pager = offset_pager();
        assert_eq!(
            pager.decode(r#"{"html": ""}"#, &SelectorExtractor, &rule()),
            PageOutcome::Exhausted(StopReason::EmptyPayload)
        );
        assert_eq!(
            pager.decode(r#"{"html": null}"#, &SelectorExtractor, &rule()),
            PageOutcome::Exhausted(StopReason::EmptyPayload)
        );
        assert_eq!(
            pager.decode("<html>blocked</html>", &SelectorExtractor, &rule()),
            PageOutcome::Exhausted(StopReason::InvalidPayload)
        );
    }

    #[test]
    fn test_offset_advance_and_cap() {
        let pager = offset_pager();
        let next = pager.advance(&Cursor::Offset(40), &[]);
        assert_eq!(next, Cursor::Offset(60));
        assert!(!pager.cap_reached(&next, 2));
        assert!(pager.cap_reached(&Cursor::Offset(80), 3));
    }

    #[test]
    fn test_cursor_decode_and_highest_id() {
        let pager = cursor_pager();
        let body = r#"[
            {"id": 1041, "url": "https://example.com/post/1041"},
            {"id": 1052, "url": "https://example.com/post/1052"},
            {"id": 1047, "url": "https://example.com/post/1047"},
            {"id": 1060}
        ]"#;

        let PageOutcome::Links(links) = pager.decode(body, &SelectorExtractor, &rule()) else {
            panic!("expected links");
        };
        assert_eq!(links.len(), 3);
        assert_eq!(links[1].id.as_deref(), Some("1052"));

        let next = pager.advance(&Cursor::LastId("0".to_string()), &links);
        assert_eq!(next, Cursor::LastId("1052".to_string()));
    }

    #[test]
    fn test_cursor_non_numeric_ids_use_last() {
        let pager = cursor_pager();
        let links = vec![
            DiscoveredLink {
                url: "/a".to_string(),
                id: Some("abc".to_string()),
            },
            DiscoveredLink {
                url: "/b".to_string(),
                id: Some("def".to_string()),
            },
        ];
        assert_eq!(
            pager.advance(&Cursor::LastId("0".to_string()), &links),
            Cursor::LastId("def".to_string())
        );
    }

    #[test]
    fn test_cursor_empty_array_and_cap() {
        let pager = cursor_pager();
        assert_eq!(
            pager.decode("[]", &SelectorExtractor, &rule()),
            PageOutcome::Exhausted(StopReason::EmptyPayload)
        );
        assert_eq!(
            pager.decode(r#"{"items": []}"#, &SelectorExtractor, &rule()),
            PageOutcome::Exhausted(StopReason::InvalidPayload)
        );
        assert!(!pager.cap_reached(&Cursor::LastId("9".to_string()), 2));
        assert!(pager.cap_reached(&Cursor::LastId("9".to_string()), 3));
    }

    #[test]
    fn test_command_pager_concatenates_matching_commands() {
        let pager = CommandPager {
            api_url: "https://example.com/views/ajax?page={page}".to_string(),
            command: "viewsShowMore".to_string(),
            first_page: 1,
            max_pages: 10,
            headers: Vec::new(),
        };
        let body = r#"[
            {"command": "settings", "data": "<a class=\"link\" href=\"/ignored\">x</a>"},
            {"command": "viewsShowMore", "data": "<a class=\"link\" href=\"/news/1\">1</a>"},
            {"command": "viewsShowMore", "data": "<a class=\"link\" href=\"/news/2\">2</a>"}
        ]"#;

        let PageOutcome::Links(links) = pager.decode(body, &SelectorExtractor, &rule()) else {
            panic!("expected links");
        };
        let urls: Vec<_> = links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(urls, vec!["/news/1", "/news/2"]);

        assert_eq!(
            pager.decode(r#"[{"command": "settings", "data": "x"}]"#, &SelectorExtractor, &rule()),
            PageOutcome::Exhausted(StopReason::EmptyPayload)
        );
        assert_eq!(
            pager.decode("not json", &SelectorExtractor, &rule()),
            PageOutcome::Exhausted(StopReason::InvalidPayload)
        );
    }

    #[test]
    fn test_fixed_pager_cursor_and_cap() {
        let pager = FixedPager {
            page_url: "https://example.com/sports/page/{page}/".to_string(),
            first_page: 2,
            max_pages: 3,
            headers: Vec::new(),
        };
        let first = pager.initial_cursor();
        assert_eq!(
            pager.request(&first, "https://example.com/sports/").unwrap().url,
            "https://example.com/sports/page/2/"
        );
        assert!(!pager.cap_reached(&Cursor::Page(3), 1));
        assert!(pager.cap_reached(&Cursor::Page(4), 2));
    }

    #[test]
    fn test_build_paginator_reports_missing_parameter() {
        let config = PaginationConfig::OffsetPager(OffsetPagerConfig {
            api_url: "https://example.com/api?tags={tags}&start={offset}".to_string(),
            start_offset: 20,
            page_size: 20,
            max_offset: 100,
            html_field: "html".to_string(),
            headers: BTreeMap::new(),
        });

        let err = build_paginator("banglatribune", &config, &BTreeMap::new()).err();
        assert!(matches!(
            err,
            Some(ConfigError::MissingParameter { ref parameter, .. }) if parameter == "tags"
        ));

        let vars = BTreeMap::from([("tags".to_string(), "15".to_string())]);
        let pager = build_paginator("banglatribune", &config, &vars).unwrap();
        let request = pager.request(&pager.initial_cursor(), "https://example.com/").unwrap();
        assert_eq!(request.url, "https://example.com/api?tags=15&start=20");
    }
}

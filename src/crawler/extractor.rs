//! Field extraction from listing and article pages
//!
//! This module turns page content into:
//! - Candidate article links (raw attribute values, possibly relative)
//! - Article fields (title, body, date, author)
//!
//! Rules come from the target's configuration; selectors are validated at
//! config load time, so a selector that fails to parse here simply
//! matches nothing.

use crate::config::{ArticleRule, FieldRule, LinkRule};
use crate::record::{non_empty, normalize_whitespace};
use scraper::{ElementRef, Html, Selector};

/// Article fields read from one page; every field may be missing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedArticle {
    pub title: Option<String>,
    pub body: Option<String>,
    pub date: Option<String>,
    pub author: Option<String>,
}

/// Extracts links and article fields from page content
pub trait FieldExtractor: Send + Sync {
    /// Returns link attribute values in document order
    fn extract_links(&self, content: &str, rule: &LinkRule) -> Vec<String>;

    /// Returns the article fields found in `content`
    fn extract_article(&self, content: &str, rule: &ArticleRule) -> ExtractedArticle;
}

/// CSS-selector extractor backed by `scraper`
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectorExtractor;

impl FieldExtractor for SelectorExtractor {
    /// Extracts link values
    ///
    /// Elements carrying a `download` attribute are skipped, as are empty
    /// values. Resolution against the page URL is left to the caller.
    ///
    /// # Example
    ///
    /// ```
    /// use corpus_harvest::config::LinkRule;
    /// use corpus_harvest::crawler::{FieldExtractor, SelectorExtractor};
    ///
    /// let html = r#"<h2 class="title"><a href="/news/1">One</a></h2>"#;
    /// let rule = LinkRule { selector: "h2.title a".to_string(), attribute: "href".to_string() };
    /// assert_eq!(SelectorExtractor.extract_links(html, &rule), vec!["/news/1"]);
    /// ```
    fn extract_links(&self, content: &str, rule: &LinkRule) -> Vec<String> {
        let Ok(selector) = Selector::parse(&rule.selector) else {
            return Vec::new();
        };

        let document = Html::parse_document(content);
        document
            .select(&selector)
            .filter(|element| element.value().attr("download").is_none())
            .filter_map(|element| element.value().attr(&rule.attribute))
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .collect()
    }

    fn extract_article(&self, content: &str, rule: &ArticleRule) -> ExtractedArticle {
        let document = Html::parse_document(content);

        ExtractedArticle {
            title: rule.title.as_ref().and_then(|f| extract_field(&document, f)),
            body: extract_body(&document, &rule.body),
            date: rule.date.as_ref().and_then(|f| extract_field(&document, f)),
            author: rule.author.as_ref().and_then(|f| extract_field(&document, f)),
        }
    }
}

/// Reads a single-valued field from the first matching element
fn extract_field(document: &Html, rule: &FieldRule) -> Option<String> {
    let selector = Selector::parse(&rule.selector).ok()?;

    // First element that yields a non-empty value wins
    document.select(&selector).find_map(|element| {
        let raw = match &rule.attribute {
            Some(attribute) => element.value().attr(attribute)?.to_string(),
            None => element_text(element),
        };

        let mut value = raw.trim();
        if let Some(prefix) = &rule.strip_prefix {
            value = value.strip_prefix(prefix.as_str()).unwrap_or(value);
        }

        non_empty(Some(value.to_string()))
    })
}

/// Joins the text nodes of every matching element into one body
fn extract_body(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;

    let parts: Vec<String> = document
        .select(&selector)
        .flat_map(|element| element.text())
        .map(|text| text.trim().replace('\u{a0}', " "))
        .filter(|text| !text.is_empty())
        .collect();

    non_empty(Some(normalize_whitespace(&parts.join(" "))))
}

fn element_text(element: ElementRef<'_>) -> String {
    normalize_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link_rule(selector: &str) -> LinkRule {
        LinkRule {
            selector: selector.to_string(),
            attribute: "href".to_string(),
        }
    }

    fn field(selector: &str) -> Option<FieldRule> {
        Some(FieldRule {
            selector: selector.to_string(),
            attribute: None,
            strip_prefix: None,
        })
    }

    fn article_rule() -> ArticleRule {
        ArticleRule {
            title: field("h1.title"),
            body: "div.content p".to_string(),
            date: Some(FieldRule {
                selector: "span.published_time".to_string(),
                attribute: Some("content".to_string()),
                strip_prefix: None,
            }),
            author: field("span.name"),
        }
    }

    #[test]
    fn test_extract_links_in_order() {
        let html = r#"
            <a class="link_overlay" href="/a">A</a>
            <a class="other" href="/x">X</a>
            <a class="link_overlay" href=" https://example.com/b ">B</a>
        "#;
        let links = SelectorExtractor.extract_links(html, &link_rule("a.link_overlay"));
        assert_eq!(links, vec!["/a", "https://example.com/b"]);
    }

    #[test]
    fn test_extract_links_skips_download_and_empty() {
        let html = r#"
            <a class="l" href="/file.pdf" download>PDF</a>
            <a class="l" href="">Empty</a>
            <a class="l">No href</a>
            <a class="l" href="/ok">Ok</a>
        "#;
        let links = SelectorExtractor.extract_links(html, &link_rule("a.l"));
        assert_eq!(links, vec!["/ok"]);
    }

    #[test]
    fn test_extract_links_custom_attribute() {
        let html = r#"<div class="card" data-url="/news/7"></div>"#;
        let rule = LinkRule {
            selector: "div.card".to_string(),
            attribute: "data-url".to_string(),
        };
        assert_eq!(SelectorExtractor.extract_links(html, &rule), vec!["/news/7"]);
    }

    #[test]
    fn test_extract_article_fields() {
        let html = r#"
            <html><body>
            <h1 class="title">  Floods recede  </h1>
            <span class="published_time" content="2024-06-01T10:00:00+06:00"></span>
            <span class="name">Staff Correspondent</span>
            <div class="content">
                <p>  First   paragraph. </p>
                <p>Second&nbsp;paragraph <b>bold</b> end.</p>
            </div>
            </body></html>
        "#;
        let article = SelectorExtractor.extract_article(html, &article_rule());

        assert_eq!(article.title.as_deref(), Some("Floods recede"));
        assert_eq!(article.date.as_deref(), Some("2024-06-01T10:00:00+06:00"));
        assert_eq!(article.author.as_deref(), Some("Staff Correspondent"));
        assert_eq!(
            article.body.as_deref(),
            Some("First paragraph. Second paragraph bold end.")
        );
    }

    #[test]
    fn test_missing_fields_are_none() {
        let html = "<html><body><p>Unrelated</p></body></html>";
        let article = SelectorExtractor.extract_article(html, &article_rule());
        assert_eq!(article, ExtractedArticle::default());
    }

    #[test]
    fn test_strip_prefix() {
        let html = r#"<p class="date">Published: 12 May 2024</p><div class="content"><p>x</p></div>"#;
        let mut rule = article_rule();
        rule.date = Some(FieldRule {
            selector: "p.date".to_string(),
            attribute: None,
            strip_prefix: Some("Published:".to_string()),
        });
        let article = SelectorExtractor.extract_article(html, &rule);
        assert_eq!(article.date.as_deref(), Some("12 May 2024"));
    }

    #[test]
    fn test_bengali_body() {
        let html = r#"<div class="content"><p>ঢাকায় ভারী বৃষ্টি</p><p>জলাবদ্ধতা</p></div>"#;
        let article = SelectorExtractor.extract_article(html, &article_rule());
        assert_eq!(article.body.as_deref(), Some("ঢাকায় ভারী বৃষ্টি জলাবদ্ধতা"));
    }
}

//! `{name}` placeholder rendering for URLs and headers
//!
//! Division parameters are filled once when a crawl is planned; cursor
//! placeholders (`{page}`, `{offset}`, `{cursor}`) survive that pass and
//! are filled per request.

use std::collections::BTreeMap;

/// Placeholders filled per request by the pagination strategies
pub const CURSOR_PLACEHOLDERS: &[&str] = &["page", "offset", "cursor"];

/// Renders `{name}` placeholders in `template`
///
/// Names found in `vars` are replaced by their value, names listed in
/// `keep` are left untouched, and any other name is an error carrying the
/// missing name. Braces that do not enclose a plain identifier are copied
/// literally.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
/// use corpus_harvest::config::render_template;
///
/// let mut vars = BTreeMap::new();
/// vars.insert("tags".to_string(), "15".to_string());
/// let url = render_template("/api?tags={tags}&start={offset}", &vars, &["offset"]).unwrap();
/// assert_eq!(url, "/api?tags=15&start={offset}");
/// ```
pub fn render_template(
    template: &str,
    vars: &BTreeMap<String, String>,
    keep: &[&str],
) -> Result<String, String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let name_len = after
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
            .unwrap_or(after.len());

        if name_len == 0 || !after[name_len..].starts_with('}') {
            out.push('{');
            rest = after;
            continue;
        }

        let name = &after[..name_len];
        if let Some(value) = vars.get(name) {
            out.push_str(value);
        } else if keep.contains(&name) {
            out.push('{');
            out.push_str(name);
            out.push('}');
        } else {
            return Err(name.to_string());
        }

        rest = &after[name_len + 1..];
    }

    out.push_str(rest);
    Ok(out)
}

/// Fills a single cursor placeholder, leaving everything else as is
pub fn fill_cursor(template: &str, name: &str, value: &str) -> String {
    template.replace(&format!("{{{}}}", name), value)
}

/// Checks whether `template` contains the `{name}` placeholder
pub fn has_placeholder(template: &str, name: &str) -> bool {
    template.contains(&format!("{{{}}}", name))
}

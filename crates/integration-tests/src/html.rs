//! Just enough HTML scraping to submit forms the way a browser would.

use std::sync::LazyLock;

use regex::Regex;

static INPUT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<input\b([^>]*)>").expect("valid input regex"));
static SELECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<select\b[^>]*\bname="([^"]*)"[^>]*>(.*?)</select>"#)
        .expect("valid select regex")
});
static SELECTED_OPTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<option value="([^"]*)" selected>"#).expect("valid option regex")
});
static ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"([a-zA-Z_-]+)="([^"]*)""#).expect("valid attribute regex"));

/// Undo the escaping the templates apply to attribute values.
#[must_use]
pub fn unescape(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#34;", "\"")
        .replace("&#x22;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}

/// The markup of the `<form id="{form_id}">` element.
#[must_use]
pub fn form<'a>(html: &'a str, form_id: &str) -> Option<&'a str> {
    slice_between(html, &format!(r#"id="{form_id}""#), "</form>")
}

/// Text from the first `start` marker up to the next `end` marker.
#[must_use]
pub fn slice_between<'a>(html: &'a str, start: &str, end: &str) -> Option<&'a str> {
    let from = html.find(start)?;
    let rest = html.get(from..)?;
    let to = rest.find(end)?;
    rest.get(..to)
}

/// Successful controls of a form, excluding submit buttons.
///
/// Inputs are returned in document order, followed by selects. Checkboxes
/// count only when checked.
#[must_use]
pub fn form_fields(form_html: &str) -> Vec<(String, String)> {
    let mut fields = Vec::new();

    for input in INPUT.captures_iter(form_html) {
        let attrs = &input[1];
        let attr = |name: &str| {
            ATTR.captures_iter(attrs)
                .find(|c| &c[1] == name)
                .map(|c| unescape(&c[2]))
        };
        let Some(name) = attr("name") else {
            continue;
        };
        let is_checkbox = attr("type").as_deref() == Some("checkbox");
        if is_checkbox && !attrs.split_whitespace().any(|a| a == "checked") {
            continue;
        }
        fields.push((name, attr("value").unwrap_or_default()));
    }

    for select in SELECT.captures_iter(form_html) {
        if let Some(option) = SELECTED_OPTION.captures(&select[2]) {
            fields.push((unescape(&select[1]), unescape(&option[1])));
        }
    }

    fields
}

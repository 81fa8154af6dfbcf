//! Fragment sanitation
//!
//! Responders hand model output through [`finalize`] before it is logged.
//! Only a small tag vocabulary survives, only the `class` attribute is kept,
//! and anything that looks like raw structured data is replaced by an
//! apology.

use regex::{Captures, Regex};
use serde_json::Value;
use std::sync::LazyLock;

/// Tags a fragment may contain
pub const ALLOWED_TAGS: &[&str] = &["div", "ul", "ol", "li", "strong", "em", "p", "h2", "h3", "h4", "br", "span"];

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*```[A-Za-z]*[ \t]*$\n?").expect("hardcoded regex"));

static SCRIPT_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?(</script\s*>|$)").expect("hardcoded regex"));

static STYLE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style\b[^>]*>.*?(</style\s*>|$)").expect("hardcoded regex"));

static COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("hardcoded regex"));

static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<\s*(/?)\s*([A-Za-z][A-Za-z0-9]*)([^>]*)>").expect("hardcoded regex")
});

static CLASS_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bclass\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("hardcoded regex")
});

/// Reduce markup to the allowed vocabulary
pub fn sanitize(raw: &str) -> String {
    let text = CODE_FENCE.replace_all(raw, "");
    let text = SCRIPT_BLOCK.replace_all(&text, "");
    let text = STYLE_BLOCK.replace_all(&text, "");
    let text = COMMENT.replace_all(&text, "");
    rewrite_markup(&text).trim().to_string()
}

/// Rewrite every complete tag and escape angle brackets in the text between
/// them, so a tag left unclosed by the model stays inert text.
fn rewrite_markup(text: &str) -> String {
    let mut pieces = TAG.split(text);
    let mut out = escape_angles(pieces.next().unwrap_or_default());
    for (caps, piece) in TAG.captures_iter(text).zip(pieces) {
        out.push_str(&rewrite_tag(&caps));
        out.push_str(&escape_angles(piece));
    }
    out
}

fn escape_angles(text: &str) -> String {
    text.replace('<', "&lt;").replace('>', "&gt;")
}

fn rewrite_tag(caps: &Captures) -> String {
    let closing = !caps[1].is_empty();
    let name = caps[2].to_ascii_lowercase();
    if !ALLOWED_TAGS.contains(&name.as_str()) {
        return String::new();
    }
    if name == "br" {
        return if closing { String::new() } else { "<br>".to_string() };
    }
    if closing {
        return format!("</{name}>");
    }

    let class = CLASS_ATTR
        .captures(&caps[3])
        .and_then(|c| c.get(1).or_else(|| c.get(2)))
        .map(|m| m.as_str().trim())
        .filter(|c| !c.is_empty());
    match class {
        Some(class) => format!("<{name} class=\"{}\">", escape(class)),
        None => format!("<{name}>"),
    }
}

/// Text left once every tag is removed
fn text_content(html: &str) -> String {
    TAG.replace_all(html, " ").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The fragment carries raw JSON, on its own or embedded in prose
fn is_structured_data(html: &str) -> bool {
    let text = text_content(html);
    text.char_indices()
        .filter(|(_, c)| matches!(c, '{' | '['))
        .filter_map(|(start, _)| balanced_span(&text, start))
        .filter_map(|span| serde_json::from_str::<Value>(span).ok())
        .any(|value| is_record(&value))
}

/// The bracketed run starting at byte `start`, up to its matching close.
///
/// Brackets inside JSON strings do not count.
fn balanced_span(text: &str, start: usize) -> Option<&str> {
    let tail = text.get(start..)?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, c) in tail.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return tail.get(..offset + c.len_utf8());
                }
            }
            _ => {}
        }
    }
    None
}

/// Objects with fields, or arrays holding objects or arrays. Bare lists
/// such as `[1]` read as prose.
fn is_record(value: &Value) -> bool {
    match value {
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => items.iter().any(|v| v.is_object() || v.is_array()),
        _ => false,
    }
}

/// Escape text for inclusion in markup
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Fixed apologetic fragment in the responder's container
pub fn apology(class: &str, message: &str) -> String {
    format!(
        "<div class=\"{class}\">\n  <p>Sorry, {}</p>\n</div>",
        escape(message)
    )
}

/// Sanitize model output into a fragment wrapped in `class`.
///
/// Empty output and raw structured data both become an apology.
pub fn finalize(raw: &str, class: &str) -> String {
    let html = sanitize(raw);

    if text_content(&html).is_empty() {
        return apology(class, "I couldn't put together a response this time. Please try again.");
    }
    if is_structured_data(&html) {
        tracing::warn!(class, "Discarding structured data in responder output");
        return apology(class, "I couldn't format that information. Please try again.");
    }

    if html.contains(&format!("class=\"{class}\"")) {
        html
    } else {
        format!("<div class=\"{class}\">\n{html}\n</div>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_code_fences() {
        let raw = "```html\n<div class=\"diet-plan\"><p>Oats</p></div>\n```";
        assert_eq!(sanitize(raw), "<div class=\"diet-plan\"><p>Oats</p></div>");
    }

    #[test]
    fn test_drops_script_and_style_bodies() {
        let raw = "<div><style>p{color:red}</style><p>Hi</p><script>alert(1)</script></div>";
        assert_eq!(sanitize(raw), "<div><p>Hi</p></div>");
    }

    #[test]
    fn test_unknown_tags_keep_their_text() {
        let raw = "<div><a href=\"https://x\">Clinic</a><table><tr><td>cell</td></tr></table></div>";
        assert_eq!(sanitize(raw), "<div>Cliniccell</div>");
    }

    #[test]
    fn test_only_class_attribute_survives() {
        let raw = "<div onclick=\"evil()\" class='provider-card' style=\"x\"><h4 id=\"n\">Name</h4></div>";
        assert_eq!(sanitize(raw), "<div class=\"provider-card\"><h4>Name</h4></div>");
    }

    #[test]
    fn test_br_normalized() {
        assert_eq!(sanitize("a<br/>b<BR >c</br>"), "a<br>b<br>c");
    }

    #[test]
    fn test_finalize_wraps_missing_container() {
        let out = finalize("<h2>Plan</h2><ul><li>Walk</li></ul>", "exercise-plan");
        assert!(out.starts_with("<div class=\"exercise-plan\">"));
        assert!(out.contains("<li>Walk</li>"));
        assert!(out.ends_with("</div>"));
    }

    #[test]
    fn test_finalize_keeps_existing_container() {
        let raw = "<div class=\"symptoms-checker\"><h2>Symptom Checker Results</h2></div>";
        assert_eq!(finalize(raw, "symptoms-checker"), raw);
    }

    #[test]
    fn test_finalize_empty_becomes_apology() {
        let out = finalize("```html\n```", "medication-info");
        assert!(out.starts_with("<div class=\"medication-info\">"));
        assert!(out.contains("Sorry"));
    }

    #[test]
    fn test_finalize_rejects_raw_json() {
        let out = finalize("{\"aqi\": 42, \"category\": \"Good\"}", "air-quality-info");
        assert!(out.contains("Sorry"));
        assert!(!out.contains("aqi"));
    }

    #[test]
    fn test_unclosed_trailing_tag_is_inert() {
        let out = finalize("<p>Eat oats</p><img src=x onerror=alert(1)", "diet-plan");
        assert!(!out.contains("<img"));
        assert!(out.contains("&lt;img src=x onerror=alert(1)"));
        assert!(out.contains("<p>Eat oats</p>"));
        assert!(out.ends_with("</div>"));
    }

    #[test]
    fn test_stray_angle_brackets_are_escaped() {
        assert_eq!(sanitize("<p>AQI < 50 is good</p>"), "<p>AQI &lt; 50 is good</p>");
        assert_eq!(sanitize("<p>ok</p><script"), "<p>ok</p>&lt;script");
    }

    #[test]
    fn test_finalize_rejects_json_in_prose() {
        let raw = r#"<p>Here is the record: {"aqi": 42, "AQI_CATEGORY": {"Name": "Good"}}</p>"#;
        let out = finalize(raw, "air-quality-info");
        assert!(out.contains("Sorry"));
        assert!(!out.contains("AQI_CATEGORY"));

        let raw = r#"<div><p>Results: [{"name": "Clinic"}]</p></div>"#;
        assert!(finalize(raw, "provider-results").contains("Sorry"));
    }

    #[test]
    fn test_brackets_in_prose_are_kept() {
        let raw = "<p>Take it twice daily [morning, evening] {with food} and see note [1].</p>";
        let out = finalize(raw, "medication-info");
        assert!(!out.contains("Sorry"));
        assert!(out.contains("[morning, evening]"));
    }

    #[test]
    fn test_apology_escapes_message() {
        let out = apology("diet-plan", "<b>oops</b>");
        assert!(out.contains("&lt;b&gt;oops&lt;/b&gt;"));
    }
}

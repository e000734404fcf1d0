//! Markup neutralisation for user-authored rich text.
//!
//! Only `<ruby>` and `<rt>` survive as markup (normalised, attributes
//! dropped). Any other tag is spelled out as literal text so it is displayed
//! verbatim instead of being interpreted.

use std::sync::LazyLock;

use regex::Regex;

/// Elements allowed to remain structural.
pub const ALLOWED_TAGS: &[&str] = &["ruby", "rt"];

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(/?)([A-Za-z][A-Za-z0-9-]*)((?:\s[^<>]*)?)(/?)>").expect("valid regex")
});

static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^&(?:[A-Za-z][A-Za-z0-9]*|#[0-9]+|#[xX][0-9A-Fa-f]+);").expect("valid regex")
});

/// Escape `<`, `>` and bare `&`; existing character references are kept.
fn escape_text(text: &str, out: &mut String) {
    for (i, c) in text.char_indices() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' if ENTITY_RE.is_match(&text[i..]) => out.push('&'),
            '&' => out.push_str("&amp;"),
            _ => out.push(c),
        }
    }
}

/// Neutralise every tag except the ruby pair elements.
pub fn sanitize_ruby_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut last = 0;

    for caps in TAG_RE.captures_iter(html) {
        let Some(whole) = caps.get(0) else { continue };
        escape_text(&html[last..whole.start()], &mut out);

        let name = caps[2].to_ascii_lowercase();
        let closing = !caps[1].is_empty();
        let self_closing = !caps[4].is_empty();

        if ALLOWED_TAGS.contains(&name.as_str()) && !self_closing {
            if closing {
                out.push_str(&format!("</{name}>"));
            } else {
                out.push_str(&format!("<{name}>"));
            }
        } else {
            escape_text(whole.as_str(), &mut out);
        }
        last = whole.end();
    }

    escape_text(&html[last..], &mut out);
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

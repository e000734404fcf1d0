//! Ruby (furigana) markup codec.
//!
//! Authors type readings inline using a compact notation:
//!
//! ```text
//! |東京{とうきょう}   explicit scope: everything between the pipe and the brace
//! 東京{とうきょう}    implicit scope: the ideograph run before the brace
//! あ{a}               fallback: the single character before the brace
//! ```
//!
//! Stored text uses `<ruby>parent<rt>reading</rt></ruby>` pairs. [`encode`]
//! converts notation to storage in three passes with fixed precedence;
//! [`decode`] converts storage back to notation, adding the pipe whenever the
//! implicit form would re-encode to a different parent and keeping markup
//! for pairs the notation cannot express.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Ideographs that may form an implicit parent: CJK unified ideographs
/// (including extension A and the supplementary planes), compatibility
/// ideographs, and the iteration/zero marks 々 〇 〻.
const IDEOGRAPH_CLASS: &str =
    r"々〇〻\x{3400}-\x{9FFF}\x{F900}-\x{FAFF}\x{20000}-\x{2FA1F}";

/// Pass 1: `|parent{reading}` or `｜parent{reading}`.
static EXPLICIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[|｜]([^{}<>\s|｜]+)\{([^{}<>\s]*)\}").expect("valid regex")
});

/// Pass 2: ideograph run followed by `{reading}`.
static IDEOGRAPH_RUN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"([{IDEOGRAPH_CLASS}]+)\{{([^{{}}<>\s]*)\}}")).expect("valid regex")
});

/// Pass 3: any single character followed by `{reading}`.
static FALLBACK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(.)\{([^{}<>\s]*)\}").expect("valid regex"));

/// Stored ruby pair.
static STORED_PAIR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<ruby>(.*?)<rt>(.*?)</rt></ruby>").expect("valid regex")
});

/// A parent/reading pair extracted from stored text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RubyPair {
    pub parent: String,
    pub reading: String,
}

/// Stored text split into plain runs and ruby pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Ruby(RubyPair),
}

/// `true` for characters that can be part of an implicit ruby parent.
pub fn is_ideograph(c: char) -> bool {
    matches!(
        c,
        '々' | '〇' | '〻'
            | '\u{3400}'..='\u{9FFF}'
            | '\u{F900}'..='\u{FAFF}'
            | '\u{20000}'..='\u{2FA1F}'
    )
}

fn render_pair(parent: &str, reading: &str) -> String {
    format!("<ruby>{parent}<rt>{reading}</rt></ruby>")
}

fn pair_from(caps: &Captures<'_>) -> String {
    render_pair(&caps[1], &caps[2])
}

/// Convert author notation into stored ruby markup.
///
/// Pairs that are already stored as markup are kept verbatim; notation is
/// only recognised in the plain runs between them.
pub fn encode(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for segment in segments(text) {
        match segment {
            Segment::Text(plain) => out.push_str(&encode_plain(&plain)),
            Segment::Ruby(pair) => out.push_str(&render_pair(&pair.parent, &pair.reading)),
        }
    }
    out
}

fn encode_plain(text: &str) -> String {
    let explicit = EXPLICIT_RE.replace_all(text, pair_from);
    let runs = IDEOGRAPH_RUN_RE.replace_all(&explicit, pair_from);
    let fallback = FALLBACK_RE.replace_all(&runs, |caps: &Captures<'_>| {
        // A closing `>` means the brace follows a pair produced above.
        if &caps[1] == ">" {
            caps[0].to_string()
        } else {
            pair_from(caps)
        }
    });

    fallback.into_owned()
}

fn is_pipe(c: char) -> bool {
    c == '|' || c == '｜'
}

/// Whether `pair` can be written as `|parent{reading}` and read back intact.
fn has_notation(pair: &RubyPair) -> bool {
    let breaks_parent = |c: char| c.is_whitespace() || is_pipe(c) || "{}<>".contains(c);
    let breaks_reading = |c: char| c.is_whitespace() || "{}<>".contains(c);
    !pair.parent.is_empty()
        && !pair.parent.chars().any(breaks_parent)
        && !pair.reading.chars().any(breaks_reading)
}

/// Whether an explicit scope opened earlier in `run` would reach a brace
/// appended now.
fn pipe_scope_open(run: &str) -> bool {
    for c in run.chars().rev() {
        if is_pipe(c) {
            return true;
        }
        if c.is_whitespace() || c == '{' || c == '}' {
            return false;
        }
    }
    false
}

/// Convert stored ruby markup back into author notation.
///
/// Pairs that notation cannot express (whitespace, braces or pipes in the
/// parent, whitespace or braces in the reading) stay as markup, so
/// `encode(decode(s)) == s` for any stored text.
pub fn decode(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    // Start of the run `encode` will scan as one piece.
    let mut run_start = 0;

    for segment in segments(text) {
        let pair = match segment {
            Segment::Text(plain) => {
                out.push_str(&plain);
                continue;
            }
            Segment::Ruby(pair) => pair,
        };

        if !has_notation(&pair) {
            out.push_str(&render_pair(&pair.parent, &pair.reading));
            run_start = out.len();
            continue;
        }

        let run = &out[run_start..];
        let implicit = pair.parent.chars().all(is_ideograph)
            && !run.chars().next_back().is_some_and(is_ideograph)
            && !pipe_scope_open(run);
        if implicit {
            out.push_str(&format!("{}{{{}}}", pair.parent, pair.reading));
        } else {
            out.push_str(&format!("|{}{{{}}}", pair.parent, pair.reading));
        }
    }

    out
}

/// Split stored text into plain runs and ruby pairs.
pub fn segments(text: &str) -> Vec<Segment> {
    let mut out = Vec::new();
    let mut last = 0;

    for caps in STORED_PAIR_RE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        if whole.start() > last {
            out.push(Segment::Text(text[last..whole.start()].to_string()));
        }
        out.push(Segment::Ruby(RubyPair {
            parent: caps[1].to_string(),
            reading: caps[2].to_string(),
        }));
        last = whole.end();
    }

    if last < text.len() {
        out.push(Segment::Text(text[last..].to_string()));
    }
    out
}

/// Stored text with every ruby pair replaced by its parent.
pub fn base_text(text: &str) -> String {
    STORED_PAIR_RE.replace_all(text, "$1").into_owned()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Conformance clause extraction.
//!
//! A clause line carries a marker such as `CC-A.1-1` or `CC-C.2.1-4`,
//! optionally bolded, optionally followed by a parenthetical label, a period
//! or colon, and a table pipe. Everything after the marker is the clause
//! text. The marker is recognised in two positions, tried in order:
//!
//! 1. leading: after table, list (bulleted or numbered), quote, or bold
//!    decoration only;
//! 2. bold after a lead-in: `Note: **CC-A.1-2** | ...`. An unbolded marker
//!    in running prose is a cross-reference, not a clause.
//!
//! Source documents use typographic dashes inconsistently, even inside the
//! marker (`CC‑A.1‑1`), so every dash variant is folded to `-` before
//! matching and the emitted code always uses the plain hyphen.

use regex::Regex;
use std::sync::LazyLock;

use crate::models::{Clause, Modality};

/// Dash code points folded to `-` before any marker matching.
const DASH_VARIANTS: [char; 7] = [
    '\u{2010}', // hyphen
    '\u{2011}', // non-breaking hyphen
    '\u{2012}', // figure dash
    '\u{2013}', // en dash
    '\u{2014}', // em dash
    '\u{2015}', // horizontal bar
    '\u{2212}', // minus sign
];

/// Label, terminator, and pipe that may follow the code in either position.
const MARKER_TAIL: &str = r"(?:\s*\(([^)]*)\))?(?:\*\*)?\s*[.:]?(?:\*\*)?\s*\|?";

static LEADING_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^[\s|>*+\-]*?(?:\d+[.)]\s+)?(?:\*\*)?(CC-[A-Z][A-Za-z0-9.]*-\d+)(?:\*\*)?{}",
        MARKER_TAIL
    ))
    .expect("leading clause marker pattern")
});

static BOLD_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^[^*]*?\*\*(CC-[A-Z][A-Za-z0-9.]*-\d+)(?:\*\*)?{}",
        MARKER_TAIL
    ))
    .expect("bold clause marker pattern")
});

/// Marker positions in first-match-wins order.
static MARKER_RULES: [&LazyLock<Regex>; 2] = [&LEADING_MARKER, &BOLD_MARKER];

// Looser than the extraction rules (any case, any code shape): the line
// count must be able to disagree with the extractor.
static MARKER_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bCC-[A-Z][\w.]*-\d+").expect("marker token pattern")
});

// Leftmost-first alternation: negative forms are listed before their
// positive prefixes so "MUST NOT" is never read as "MUST".
static MODALITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(MUST NOT|SHALL NOT|SHOULD NOT|MUST|SHALL|SHOULD|MAY)\b")
        .expect("modality pattern")
});

/// Fold every dash variant in `line` to an ASCII hyphen.
pub fn normalize_dashes(line: &str) -> String {
    line.chars()
        .map(|c| if DASH_VARIANTS.contains(&c) { '-' } else { c })
        .collect()
}

/// First modality keyword in `text`, if any.
pub fn extract_modality(text: &str) -> Option<Modality> {
    let m = MODALITY.find(text)?;
    m.as_str().parse().ok()
}

/// Number of lines in `text` that look like they define a clause.
///
/// This is the grep-style cross-check for [`extract_clause`] and shares
/// none of its patterns. A line counts when its first `CC-` token (any
/// case) is bolded or has no letters before it. Prose mentions such as
/// "Refines CC-A.1-1" are not counted.
pub fn count_marker_lines(text: &str) -> usize {
    text.lines()
        .filter(|line| {
            let normalized = normalize_dashes(line);
            let Some(token) = MARKER_TOKEN.find(&normalized) else {
                return false;
            };
            let lead = &normalized[..token.start()];
            lead.ends_with("**") || !lead.chars().any(char::is_alphabetic)
        })
        .count()
}

/// Extract a clause from one content line.
///
/// `line_num` is 1-based; `section_ord` is the ordinal of the enclosing
/// section, `None` before the first heading.
pub fn extract_clause(line: &str, line_num: usize, section_ord: Option<u32>) -> Option<Clause> {
    let normalized = normalize_dashes(line);
    let caps = MARKER_RULES
        .iter()
        .find_map(|rule| rule.captures(&normalized))?;
    let marker = caps.get(0)?;
    let code = caps.get(1)?.as_str().to_uppercase();
    let label = caps
        .get(2)
        .map(|m| m.as_str().trim().to_string())
        .filter(|l| !l.is_empty());

    // Folding is char-for-char, so the marker's char count locates the
    // clause text in the original line.
    let marker_chars = normalized[..marker.end()].chars().count();
    let rest: String = line.chars().skip(marker_chars).collect();
    let text = rest
        .trim_matches(|c: char| c == '|' || c.is_whitespace())
        .to_string();
    let modality = extract_modality(&text);

    Some(Clause {
        code,
        label,
        text,
        modality,
        line_num,
        section_ord,
    })
}

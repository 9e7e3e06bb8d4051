//! Cross-reference extraction.
//!
//! Scanning every line for anything shaped like `letter.digit` drowns the
//! output in version numbers and enumerations, so extraction only runs on
//! lines admitted by an [`XrefGate`]: the line mentions a relation keyword
//! ("Builds on", "Refines", …) or contains a bare structural id. The gate is
//! policy, not law; tune it per document dialect via configuration.
//!
//! An admitted line goes through three independent passes, each
//! deduplicated on the matched text:
//!
//! 1. clause codes (`cc-a.1-1` → `CC-A.1-1`, kind `clause`)
//! 2. structural ids (`A.1.2`, kind `section`)
//! 3. part mentions (`Part B` → `Part-B`, kind `section`)

use regex::{Captures, Regex};
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::clause::normalize_dashes;
use crate::models::{TargetKind, Xref};

/// Relation keywords admitted by the default gate.
pub const DEFAULT_RELATION_KEYWORDS: [&str; 7] = [
    "Builds on",
    "Prerequisite",
    "Coordinates",
    "Constrains",
    "Used by",
    "Refines",
    "Informs",
];

/// Default number of characters captured on each side of a match.
pub const DEFAULT_CONTEXT_RADIUS: usize = 30;

static CLAUSE_MENTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bCC-[A-Z][A-Z0-9.]*-\d+").expect("clause mention pattern")
});

// The leading class keeps ids inside clause codes (`CC-A.1-1`) and dotted
// runs (`x.A.1`) from matching.
static STRUCTURAL_MENTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^\w.\-])([A-Z]\.\d+(?:\.\d+)*(?::\d+(?:\.\d+)*)?)\b")
        .expect("structural mention pattern")
});

static PART_MENTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bPart\s+([A-Z])\b").expect("part mention pattern"));

/// Decides whether a line is worth scanning for cross-references.
#[derive(Debug, Clone, PartialEq)]
pub struct XrefGate {
    /// Case-insensitive substrings that mark a citation line.
    pub relation_keywords: Vec<String>,
    /// Also admit lines containing a bare structural id.
    pub match_bare_ids: bool,
}

impl Default for XrefGate {
    fn default() -> Self {
        Self {
            relation_keywords: DEFAULT_RELATION_KEYWORDS
                .iter()
                .map(|k| k.to_string())
                .collect(),
            match_bare_ids: true,
        }
    }
}

impl XrefGate {
    pub fn admits(&self, line: &str) -> bool {
        let lower = line.to_lowercase();
        if self
            .relation_keywords
            .iter()
            .any(|k| lower.contains(&k.to_lowercase()))
        {
            return true;
        }
        self.match_bare_ids && STRUCTURAL_MENTION.is_match(line)
    }
}

/// One extraction pass: a pattern, the capture group holding the matched
/// text, and how to turn a match into a target reference.
#[derive(Clone)]
struct XrefPass {
    pattern: Regex,
    group: usize,
    kind: TargetKind,
    target: fn(&Captures) -> String,
}

/// Gated, multi-pass cross-reference extractor.
#[derive(Clone)]
pub struct XrefExtractor {
    gate: XrefGate,
    context_radius: usize,
    passes: Vec<XrefPass>,
}

impl XrefExtractor {
    pub fn new(gate: XrefGate, context_radius: usize) -> Self {
        Self {
            gate,
            context_radius,
            passes: vec![
                XrefPass {
                    pattern: CLAUSE_MENTION.clone(),
                    group: 0,
                    kind: TargetKind::Clause,
                    target: |c| c[0].to_uppercase(),
                },
                XrefPass {
                    pattern: STRUCTURAL_MENTION.clone(),
                    group: 1,
                    kind: TargetKind::Section,
                    target: |c| c[1].to_string(),
                },
                XrefPass {
                    pattern: PART_MENTION.clone(),
                    group: 0,
                    kind: TargetKind::Section,
                    target: |c| format!("Part-{}", &c[1]),
                },
            ],
        }
    }

    /// Extract cross-references from one content line.
    ///
    /// Returns an empty vector for lines the gate rejects.
    pub fn extract(&self, line: &str, line_num: usize, source_ord: Option<u32>) -> Vec<Xref> {
        let normalized = normalize_dashes(line);
        if !self.gate.admits(&normalized) {
            return Vec::new();
        }

        let mut xrefs = Vec::new();
        for pass in &self.passes {
            let mut seen = HashSet::new();
            for caps in pass.pattern.captures_iter(&normalized) {
                let Some(m) = caps.get(pass.group) else {
                    continue;
                };
                if !seen.insert(m.as_str().to_string()) {
                    continue;
                }
                xrefs.push(Xref {
                    target_ref: (pass.target)(&caps),
                    target_kind: pass.kind,
                    context: context_snippet(&normalized, m.start(), m.end(), self.context_radius),
                    source_ord,
                    source_line: line_num,
                });
            }
        }
        xrefs
    }
}

impl Default for XrefExtractor {
    fn default() -> Self {
        Self::new(XrefGate::default(), DEFAULT_CONTEXT_RADIUS)
    }
}

/// Up to `radius` characters either side of `line[start..end]`, trimmed.
fn context_snippet(line: &str, start: usize, end: usize, radius: usize) -> String {
    let from = if radius == 0 {
        start
    } else {
        line[..start]
            .char_indices()
            .rev()
            .nth(radius - 1)
            .map(|(i, _)| i)
            .unwrap_or(0)
    };
    let to = line[end..]
        .char_indices()
        .nth(radius)
        .map(|(i, _)| end + i)
        .unwrap_or(line.len());
    line[from..to].trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(line: &str) -> Vec<Xref> {
        XrefExtractor::default().extract(line, 12, Some(3))
    }

    #[test]
    fn test_ungated_prose_yields_nothing() {
        assert!(extract("The cache holds 2.5 GB and retries 3.0 times.").is_empty());
        assert!(extract("See Part B for more.").is_empty());
    }

    #[test]
    fn test_builds_on_section() {
        let xrefs = extract("Builds on A.1");
        assert_eq!(xrefs.len(), 1);
        assert_eq!(xrefs[0].target_ref, "A.1");
        assert_eq!(xrefs[0].target_kind, TargetKind::Section);
        assert_eq!(xrefs[0].source_line, 12);
        assert_eq!(xrefs[0].source_ord, Some(3));
        assert_eq!(xrefs[0].context, "Builds on A.1");
    }

    #[test]
    fn test_all_three_passes_on_one_line() {
        let xrefs = extract("Refines Part A, cc-b.2-1 and C.3.1; constrains C.3.1 again.");
        let targets: Vec<(&str, TargetKind)> = xrefs
            .iter()
            .map(|x| (x.target_ref.as_str(), x.target_kind))
            .collect();
        assert_eq!(
            targets,
            vec![
                ("CC-B.2-1", TargetKind::Clause),
                ("C.3.1", TargetKind::Section),
                ("Part-A", TargetKind::Section),
            ]
        );
    }

    #[test]
    fn test_bare_id_opens_gate() {
        let xrefs = extract("See A.2.1 for the storage model.");
        assert_eq!(xrefs.len(), 1);
        assert_eq!(xrefs[0].target_ref, "A.2.1");
    }

    #[test]
    fn test_bare_id_gate_can_be_disabled() {
        let gate = XrefGate {
            match_bare_ids: false,
            ..XrefGate::default()
        };
        let extractor = XrefExtractor::new(gate, DEFAULT_CONTEXT_RADIUS);
        assert!(extractor.extract("See A.2.1 for details.", 1, None).is_empty());
        assert_eq!(extractor.extract("Informs A.2.1.", 1, None).len(), 1);
    }

    #[test]
    fn test_id_inside_clause_code_is_not_a_section() {
        let xrefs = extract("Builds on CC-A.1-1.");
        assert_eq!(xrefs.len(), 1);
        assert_eq!(xrefs[0].target_ref, "CC-A.1-1");
        assert_eq!(xrefs[0].target_kind, TargetKind::Clause);
    }

    #[test]
    fn test_typographic_dash_in_mention() {
        let xrefs = extract("Prerequisite: CC–D.4–2");
        assert_eq!(xrefs.len(), 1);
        assert_eq!(xrefs[0].target_ref, "CC-D.4-2");
    }

    #[test]
    fn test_context_is_bounded() {
        let prefix = "x".repeat(80);
        let suffix = "y".repeat(80);
        let line = format!("{} Builds on B.7 {}", prefix, suffix);
        let xrefs = extract(&line);
        assert_eq!(xrefs.len(), 1);
        let ctx = &xrefs[0].context;
        assert!(ctx.contains("B.7"));
        assert!(ctx.chars().count() <= 30 + 3 + 30);
    }

    #[test]
    fn test_context_on_multibyte_text() {
        let xrefs = extract("Ünïcödé prose — Builds on A.3 — más allá");
        assert_eq!(xrefs.len(), 1);
        assert!(xrefs[0].context.contains("A.3"));
    }

    #[test]
    fn test_gate_keywords_case_insensitive() {
        assert!(XrefGate::default().admits("used BY the scheduler"));
        assert!(!XrefGate::default().admits("ordinary prose"));
    }
}

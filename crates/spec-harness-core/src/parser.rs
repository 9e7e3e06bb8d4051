//! Single-pass specification parser.
//!
//! Recovers an implicit section tree from a flat markdown line stream.
//! Sections are stored flat in document order; hierarchy is expressed by
//! [`Section::parent_ord`], computed with an explicit stack of
//! `(level, ord)` pairs:
//!
//! ```text
//! # Part A – Kernel        ord 1  stack [(1,1)]            parent -
//! ## A.1 - Overview        ord 2  stack [(1,1),(2,2)]      parent 1
//! ### A.1.1 - Scope        ord 3  stack [.., (3,3)]        parent 2
//! ## A.2 - Storage         ord 4  pop (3,3),(2,2) → [(1,1),(2,4)]  parent 1
//! ```
//!
//! Every non-heading line is appended to the open section's body and fed to
//! the clause and cross-reference extractors. Lines inside fenced code
//! blocks are never headings. Parsing never fails: ill-formed input degrades
//! to placeholder references or empty collections.

use regex::Regex;
use std::sync::LazyLock;

use crate::clause::extract_clause;
use crate::hash::content_hash;
use crate::heading::{split_heading, HeadingClassifier};
use crate::models::{DocumentSummary, ParsedDocument, Section, TargetKind};
use crate::xref::{XrefExtractor, XrefGate, DEFAULT_CONTEXT_RADIUS};

static MONTH_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(January|February|March|April|May|June|July|August|September|October|November|December)\s+(\d{4})\b",
    )
    .expect("month-year pattern")
});

static VERSION_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:[Vv]ersion\s*|v)(\d+(?:\.\d+)+)\b").expect("version pattern")
});

/// Tunable parsing policy.
#[derive(Debug, Clone, PartialEq)]
pub struct ParserOptions {
    pub gate: XrefGate,
    /// Characters of context captured on each side of a cross-reference.
    pub context_radius: usize,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            gate: XrefGate::default(),
            context_radius: DEFAULT_CONTEXT_RADIUS,
        }
    }
}

/// Parser over one document at a time. Holds no per-document state, so a
/// single instance can parse any number of documents, concurrently.
#[derive(Clone)]
pub struct DocumentParser {
    headings: HeadingClassifier,
    xrefs: XrefExtractor,
}

impl DocumentParser {
    pub fn new(options: &ParserOptions) -> Self {
        Self {
            headings: HeadingClassifier::new(),
            xrefs: XrefExtractor::new(options.gate.clone(), options.context_radius),
        }
    }

    /// Replace the heading classification chain.
    pub fn with_headings(mut self, headings: HeadingClassifier) -> Self {
        self.headings = headings;
        self
    }

    pub fn parse(&self, doc_ref: &str, title: &str, text: &str) -> ParsedDocument {
        let mut sections: Vec<Section> = Vec::new();
        let mut clauses = Vec::new();
        let mut xrefs = Vec::new();

        let mut stack: Vec<(u8, u32)> = Vec::new();
        let mut body: Vec<&str> = Vec::new();
        let mut fence: Option<&'static str> = None;
        let mut line_count = 0;

        for (idx, line) in text.lines().enumerate() {
            let line_num = idx + 1;
            line_count = line_num;

            if fence.is_none() {
                if let Some((level, heading_text)) = split_heading(line) {
                    if let Some(open) = sections.last_mut() {
                        close_section(open, &body, line_num - 1);
                    }
                    body.clear();

                    let classified = self.headings.classify(heading_text);
                    let reference = classified
                        .reference
                        .unwrap_or_else(|| placeholder_ref(doc_ref, line_num));

                    while stack.last().is_some_and(|&(l, _)| l >= level) {
                        stack.pop();
                    }
                    let parent_ord = stack.last().map(|&(_, ord)| ord);
                    let ord = sections.len() as u32 + 1;
                    stack.push((level, ord));

                    sections.push(Section {
                        ord,
                        reference,
                        title: classified.title,
                        level,
                        parent_ord,
                        text: String::new(),
                        line_start: line_num,
                        line_end: line_num,
                    });
                    continue;
                }
            }

            fence = next_fence_state(fence, line);
            body.push(line);

            let current = sections.last().map(|s| s.ord);
            let clause = extract_clause(line, line_num, current);
            let mut line_xrefs = self.xrefs.extract(line, line_num, current);
            if let Some(ref c) = clause {
                line_xrefs
                    .retain(|x| !(x.target_kind == TargetKind::Clause && x.target_ref == c.code));
            }
            clauses.extend(clause);
            xrefs.extend(line_xrefs);
        }

        if let Some(open) = sections.last_mut() {
            close_section(open, &body, line_count);
        }

        ParsedDocument {
            summary: DocumentSummary {
                doc_ref: doc_ref.to_string(),
                title: title.to_string(),
                version: extract_version(text),
                content_hash: content_hash(text),
            },
            sections,
            clauses,
            xrefs,
        }
    }
}

impl Default for DocumentParser {
    fn default() -> Self {
        Self::new(&ParserOptions::default())
    }
}

/// Parse with default options.
pub fn parse_document(doc_ref: &str, title: &str, text: &str) -> ParsedDocument {
    DocumentParser::default().parse(doc_ref, title, text)
}

/// Positional reference for a heading with no recoverable structural id.
///
/// Document-relative and line-based: stable only as long as the document's
/// line layout is.
pub fn placeholder_ref(doc_ref: &str, line_num: usize) -> String {
    format!("{}-L{}", doc_ref, line_num)
}

/// Best-effort version token: a month name with a four-digit year, else a
/// `Version`/`v` dotted number.
pub fn extract_version(text: &str) -> Option<String> {
    if let Some(caps) = MONTH_YEAR.captures(text) {
        return Some(format!("{} {}", &caps[1], &caps[2]));
    }
    VERSION_NUMBER
        .captures(text)
        .map(|caps| caps[1].to_string())
}

fn close_section(section: &mut Section, body: &[&str], last_line: usize) {
    section.line_end = last_line.max(section.line_start);
    section.text = join_trimmed(body);
}

/// Join body lines, dropping leading and trailing blank lines.
fn join_trimmed(body: &[&str]) -> String {
    let start = body.iter().position(|l| !l.trim().is_empty());
    let end = body.iter().rposition(|l| !l.trim().is_empty());
    match (start, end) {
        (Some(s), Some(e)) => body[s..=e].join("\n"),
        _ => String::new(),
    }
}

fn next_fence_state(current: Option<&'static str>, line: &str) -> Option<&'static str> {
    let trimmed = line.trim_start();
    match current {
        Some(marker) if trimmed.starts_with(marker) => None,
        Some(marker) => Some(marker),
        None if trimmed.starts_with("```") => Some("```"),
        None if trimmed.starts_with("~~~") => Some("~~~"),
        None => None,
    }
}

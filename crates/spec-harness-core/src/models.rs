//! Core data models used throughout Spec Harness.
//!
//! Two families of types live here:
//!
//! - **Parse records** ([`Section`], [`Clause`], [`Xref`]) produced by the
//!   [`parser`](crate::parser). They link to each other only through the
//!   per-parse section ordinal (`ord`), never through store identifiers.
//! - **Stored rows** ([`DocumentRow`], [`SectionRow`], …) as held by a
//!   [`Store`](crate::store::Store), carrying the `i64` ids the store assigned.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Obligation strength of a conformance clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Modality {
    #[serde(rename = "MUST")]
    Must,
    #[serde(rename = "MUST NOT")]
    MustNot,
    #[serde(rename = "SHALL")]
    Shall,
    #[serde(rename = "SHALL NOT")]
    ShallNot,
    #[serde(rename = "SHOULD")]
    Should,
    #[serde(rename = "SHOULD NOT")]
    ShouldNot,
    #[serde(rename = "MAY")]
    May,
}

impl Modality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Must => "MUST",
            Modality::MustNot => "MUST NOT",
            Modality::Shall => "SHALL",
            Modality::ShallNot => "SHALL NOT",
            Modality::Should => "SHOULD",
            Modality::ShouldNot => "SHOULD NOT",
            Modality::May => "MAY",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Modality {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MUST" => Ok(Modality::Must),
            "MUST NOT" => Ok(Modality::MustNot),
            "SHALL" => Ok(Modality::Shall),
            "SHALL NOT" => Ok(Modality::ShallNot),
            "SHOULD" => Ok(Modality::Should),
            "SHOULD NOT" => Ok(Modality::ShouldNot),
            "MAY" => Ok(Modality::May),
            other => anyhow::bail!("unknown modality: '{}'", other),
        }
    }
}

/// What an [`Xref`] points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetKind {
    Section,
    Clause,
    /// A part of another document. Never emitted by the built-in extractor
    /// (in-document part mentions are sections) but accepted from stores.
    ExternalPart,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Section => "section",
            TargetKind::Clause => "clause",
            TargetKind::ExternalPart => "external-part",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "section" => Ok(TargetKind::Section),
            "clause" => Ok(TargetKind::Clause),
            "external-part" => Ok(TargetKind::ExternalPart),
            other => anyhow::bail!("unknown xref target type: '{}'", other),
        }
    }
}

/// Document-level facts recovered by one parse.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentSummary {
    pub doc_ref: String,
    pub title: String,
    /// Best-effort version token found in the text (caller may override).
    pub version: Option<String>,
    /// SHA-256 of the full raw text.
    pub content_hash: String,
}

/// One heading-delimited region of a document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    /// Per-parse ordinal, strictly increasing in document order.
    pub ord: u32,
    /// Structural id (`A.1.1`, `Part-A`, `Cluster-B`) or a positional placeholder.
    pub reference: String,
    pub title: String,
    /// Heading depth, 1–6.
    pub level: u8,
    pub parent_ord: Option<u32>,
    /// Body lines between this heading and the next heading of any level,
    /// trimmed of surrounding blank lines. A parent's text never includes
    /// its children's bodies.
    pub text: String,
    /// 1-based line of the heading.
    pub line_start: usize,
    /// 1-based line of the last line belonging to the section.
    pub line_end: usize,
}

/// One labeled conformance statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Clause {
    /// Normalized code, e.g. `CC-A.1-1`.
    pub code: String,
    /// Parenthetical label following the marker, if any.
    pub label: Option<String>,
    pub text: String,
    pub modality: Option<Modality>,
    pub line_num: usize,
    pub section_ord: Option<u32>,
}

/// One inline mention of another section, clause, or part.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Xref {
    pub target_ref: String,
    pub target_kind: TargetKind,
    pub context: String,
    pub source_ord: Option<u32>,
    pub source_line: usize,
}

/// Complete output of [`parse`](crate::parser::DocumentParser::parse).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedDocument {
    pub summary: DocumentSummary,
    pub sections: Vec<Section>,
    pub clauses: Vec<Clause>,
    pub xrefs: Vec<Xref>,
}

/// Result of one ingestion, sufficient for completeness checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub document_id: i64,
    pub section_count: usize,
    pub clause_count: usize,
    pub xref_count: usize,
}

/// Document row as written by the ingestion pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentRow {
    pub id: i64,
    pub doc_ref: String,
    pub title: String,
    pub version: Option<String>,
    pub content_hash: String,
    pub ingested_at: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SectionRow {
    pub id: i64,
    pub doc_id: i64,
    pub reference: String,
    pub title: String,
    pub level: u8,
    pub ord: u32,
    pub parent_id: Option<i64>,
    pub text: String,
    pub line_start: usize,
    pub line_end: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClauseRow {
    pub id: i64,
    pub doc_id: i64,
    pub section_id: Option<i64>,
    pub code: String,
    pub label: Option<String>,
    pub text: String,
    pub modality: Option<Modality>,
    pub line_num: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct XrefRow {
    pub id: i64,
    pub doc_id: i64,
    pub source_id: Option<i64>,
    pub source_line: usize,
    pub target_ref: String,
    pub target_kind: TargetKind,
    pub context: String,
}

/// Input to a knowledge-card upsert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCard {
    pub kind_ref: String,
    pub context_ref: String,
    pub entity_ref: String,
    pub content: String,
    pub label: Option<String>,
    pub level: Option<String>,
}

/// A stored knowledge card. Identity is `(context_ref, entity_ref, content_hash)`.
#[derive(Debug, Clone, PartialEq)]
pub struct CardRow {
    pub id: i64,
    pub kind_ref: String,
    pub context_ref: String,
    pub entity_ref: String,
    pub content: String,
    pub content_hash: String,
    pub label: Option<String>,
    pub level: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Outcome of [`upsert_card`](crate::card::upsert_card).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CardUpsert {
    pub id: i64,
    pub created: bool,
}

//! # Spec Harness Core
//!
//! Pure logic for Spec Harness: the markdown specification parser, the
//! persistence boundary traits, an in-memory store, the idempotent
//! ingestion pipeline, and the content-addressed knowledge-card upsert.
//!
//! This crate has no SQL driver, filesystem I/O, or async runtime; the
//! parser is synchronous and re-entrant, and the pipeline talks to storage
//! only through an injected [`store::Store`].
//!
//! ```text
//! text ──▶ DocumentParser ──▶ ParsedDocument ──▶ ingest ──▶ Store
//!           │ heading  (HeadingClassifier)        ordinal → id
//!           │ clause   (extract_clause)
//!           │ xref     (XrefExtractor, gated)
//!           └ hash     (content_hash)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use spec_harness_core::parser::parse_document;
//!
//! let doc = parse_document(
//!     "kernel",
//!     "Kernel Spec",
//!     "## Part A – Kernel\n### A.1 - Overview\n**CC-A.1-1** | Systems MUST support X.",
//! );
//! assert_eq!(doc.sections[1].reference, "A.1");
//! assert_eq!(doc.sections[1].parent_ord, Some(doc.sections[0].ord));
//! assert_eq!(doc.clauses[0].code, "CC-A.1-1");
//! ```

pub mod card;
pub mod clause;
pub mod hash;
pub mod heading;
pub mod ingest;
pub mod models;
pub mod parser;
pub mod store;
pub mod xref;

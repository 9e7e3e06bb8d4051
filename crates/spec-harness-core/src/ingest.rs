//! Idempotent ingestion pipeline.
//!
//! `parse → begin → (update + clear | insert) document → sections →
//! clauses → xrefs → commit`, all inside one [`StoreTx`]. Re-ingesting a
//! document reference keeps the document's id, replaces its entire section
//! tree, and never duplicates rows. A failure at any step drops the
//! transaction, so an observer sees either the old tree or the new one.
//!
//! Parse records link through per-parse ordinals; this module translates
//! them into store ids with an ordinal → id map filled as sections are
//! inserted. Parents always precede children in ordinal order, so a
//! parent's id is known before any child needs it.

use std::collections::HashMap;

use anyhow::{Context, Result};

use crate::models::{IngestSummary, ParsedDocument};
use crate::parser::DocumentParser;
use crate::store::{Store, StoreTx};

/// Caller-supplied inputs for one ingestion.
#[derive(Debug, Clone)]
pub struct IngestRequest<'a> {
    pub doc_ref: &'a str,
    pub title: &'a str,
    pub text: &'a str,
    /// Overrides the version found in the text.
    pub version: Option<&'a str>,
}

impl IngestRequest<'_> {
    /// Parse the request's text, applying the version override.
    pub fn parse(&self, parser: &DocumentParser) -> ParsedDocument {
        let mut parsed = parser.parse(self.doc_ref, self.title, self.text);
        if let Some(version) = self.version {
            parsed.summary.version = Some(version.to_string());
        }
        parsed
    }
}

/// Parse `request.text` and persist the result through `store`.
pub async fn ingest(
    store: &dyn Store,
    parser: &DocumentParser,
    request: &IngestRequest<'_>,
) -> Result<IngestSummary> {
    let parsed = request.parse(parser);
    ingest_parsed(store, &parsed).await
}

/// Persist an already-parsed document.
pub async fn ingest_parsed(store: &dyn Store, parsed: &ParsedDocument) -> Result<IngestSummary> {
    let doc_ref = parsed.summary.doc_ref.as_str();
    tracing::debug!(
        doc_ref,
        sections = parsed.sections.len(),
        clauses = parsed.clauses.len(),
        xrefs = parsed.xrefs.len(),
        "ingesting document"
    );

    let mut tx = store.begin().await?;
    let summary = write_document(tx.as_mut(), parsed)
        .await
        .with_context(|| format!("failed to ingest document '{}'", doc_ref))?;
    tx.commit().await?;

    tracing::debug!(doc_ref, document_id = summary.document_id, "ingest committed");
    Ok(summary)
}

async fn write_document(tx: &mut dyn StoreTx, parsed: &ParsedDocument) -> Result<IngestSummary> {
    let now = chrono::Utc::now().timestamp();
    let doc = &parsed.summary;

    let doc_id = match tx.find_document(&doc.doc_ref).await? {
        Some(id) => {
            tracing::info!(doc_ref = %doc.doc_ref, document_id = id, "replacing existing document");
            tx.update_document(id, doc, now).await?;
            tx.clear_document(id).await?;
            id
        }
        None => tx.insert_document(doc, now).await?,
    };

    let mut ids: HashMap<u32, i64> = HashMap::with_capacity(parsed.sections.len());
    for section in &parsed.sections {
        let parent_id = section.parent_ord.and_then(|ord| ids.get(&ord).copied());
        let id = tx.insert_section(doc_id, section, parent_id).await?;
        ids.insert(section.ord, id);
    }

    for clause in &parsed.clauses {
        let section_id = clause.section_ord.and_then(|ord| ids.get(&ord).copied());
        tx.insert_clause(doc_id, clause, section_id).await?;
    }

    for xref in &parsed.xrefs {
        let source_id = xref.source_ord.and_then(|ord| ids.get(&ord).copied());
        tx.insert_xref(doc_id, xref, source_id).await?;
    }

    Ok(IngestSummary {
        document_id: doc_id,
        section_count: parsed.sections.len(),
        clause_count: parsed.clauses.len(),
        xref_count: parsed.xrefs.len(),
    })
}

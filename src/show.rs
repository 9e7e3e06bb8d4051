//! Stored document retrieval.
//!
//! Loads a document and its section tree, clauses, and cross-references
//! by external reference. Used by `spx show` and by the store tests.

use anyhow::{bail, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;

use spec_harness_core::models::{ClauseRow, DocumentRow, SectionRow, XrefRow};

use crate::config::Config;
use crate::db;

/// A stored document with all of its child rows, in document order.
#[derive(Debug, Clone)]
pub struct DocumentView {
    pub document: DocumentRow,
    pub sections: Vec<SectionRow>,
    pub clauses: Vec<ClauseRow>,
    pub xrefs: Vec<XrefRow>,
}

pub async fn load_document(pool: &SqlitePool, doc_ref: &str) -> Result<Option<DocumentView>> {
    let row = sqlx::query(
        "SELECT id, doc_ref, title, version, content_hash, ingested_at FROM documents WHERE doc_ref = ?",
    )
    .bind(doc_ref)
    .fetch_optional(pool)
    .await?;

    let document = match row {
        Some(row) => DocumentRow {
            id: row.get("id"),
            doc_ref: row.get("doc_ref"),
            title: row.get("title"),
            version: row.get("version"),
            content_hash: row.get("content_hash"),
            ingested_at: row.get("ingested_at"),
        },
        None => return Ok(None),
    };

    let sections = sqlx::query(
        r#"
        SELECT id, doc_id, ref, title, level, ord, parent_id, text, line_start, line_end
        FROM sections WHERE doc_id = ? ORDER BY ord ASC
        "#,
    )
    .bind(document.id)
    .fetch_all(pool)
    .await?
    .iter()
    .map(section_row)
    .collect();

    let clauses = sqlx::query(
        r#"
        SELECT id, doc_id, section_id, code, label, text, modality, line_num
        FROM clauses WHERE doc_id = ? ORDER BY line_num ASC
        "#,
    )
    .bind(document.id)
    .fetch_all(pool)
    .await?
    .iter()
    .map(clause_row)
    .collect::<Result<Vec<_>>>()?;

    let xrefs = sqlx::query(
        r#"
        SELECT id, doc_id, source_id, source_line, target_ref, target_type, context
        FROM xrefs WHERE doc_id = ? ORDER BY source_line ASC, id ASC
        "#,
    )
    .bind(document.id)
    .fetch_all(pool)
    .await?
    .iter()
    .map(xref_row)
    .collect::<Result<Vec<_>>>()?;

    Ok(Some(DocumentView {
        document,
        sections,
        clauses,
        xrefs,
    }))
}

fn section_row(row: &SqliteRow) -> SectionRow {
    SectionRow {
        id: row.get("id"),
        doc_id: row.get("doc_id"),
        reference: row.get("ref"),
        title: row.get("title"),
        level: row.get::<i64, _>("level") as u8,
        ord: row.get::<i64, _>("ord") as u32,
        parent_id: row.get("parent_id"),
        text: row.get("text"),
        line_start: row.get::<i64, _>("line_start") as usize,
        line_end: row.get::<i64, _>("line_end") as usize,
    }
}

fn clause_row(row: &SqliteRow) -> Result<ClauseRow> {
    let modality: Option<String> = row.get("modality");
    Ok(ClauseRow {
        id: row.get("id"),
        doc_id: row.get("doc_id"),
        section_id: row.get("section_id"),
        code: row.get("code"),
        label: row.get("label"),
        text: row.get("text"),
        modality: modality.map(|m| m.parse()).transpose()?,
        line_num: row.get::<i64, _>("line_num") as usize,
    })
}

fn xref_row(row: &SqliteRow) -> Result<XrefRow> {
    let kind: String = row.get("target_type");
    Ok(XrefRow {
        id: row.get("id"),
        doc_id: row.get("doc_id"),
        source_id: row.get("source_id"),
        source_line: row.get::<i64, _>("source_line") as usize,
        target_ref: row.get("target_ref"),
        target_kind: kind.parse()?,
        context: row.get("context"),
    })
}

/// CLI entry point: print the section tree, optionally with clauses and xrefs.
pub async fn run_show(
    config: &Config,
    doc_ref: &str,
    with_clauses: bool,
    with_xrefs: bool,
) -> Result<()> {
    let pool = db::connect(config).await?;
    let view = load_document(&pool, doc_ref).await;
    pool.close().await;

    let view = match view? {
        Some(v) => v,
        None => bail!("document not found: {}", doc_ref),
    };
    let doc = &view.document;

    println!("--- Document ---");
    println!("ref:          {}", doc.doc_ref);
    println!("title:        {}", doc.title);
    println!("version:      {}", doc.version.as_deref().unwrap_or("-"));
    println!("hash:         {}", doc.content_hash);
    println!("ingested_at:  {}", format_ts_iso(doc.ingested_at));
    println!();

    println!("--- Sections ({}) ---", view.sections.len());
    let depths = depths(&view.sections);
    for s in &view.sections {
        let depth = depths.get(&s.id).copied().unwrap_or(0);
        println!(
            "{}{}  {}  [L{}-{}]",
            "  ".repeat(depth),
            s.reference,
            s.title,
            s.line_start,
            s.line_end
        );
    }

    if with_clauses {
        let refs: HashMap<i64, &str> = view
            .sections
            .iter()
            .map(|s| (s.id, s.reference.as_str()))
            .collect();
        println!();
        println!("--- Clauses ({}) ---", view.clauses.len());
        for c in &view.clauses {
            let section = c.section_id.and_then(|id| refs.get(&id)).unwrap_or(&"-");
            let modality = c.modality.map(|m| m.as_str()).unwrap_or("-");
            let label = c
                .label
                .as_deref()
                .map(|l| format!(" ({})", l))
                .unwrap_or_default();
            println!(
                "{}{}  [{}]  {}  L{}: {}",
                c.code, label, modality, section, c.line_num, c.text
            );
        }
    }

    if with_xrefs {
        println!();
        println!("--- Cross-references ({}) ---", view.xrefs.len());
        for x in &view.xrefs {
            println!(
                "L{}  → {} ({})  \"{}\"",
                x.source_line, x.target_ref, x.target_kind, x.context
            );
        }
    }

    Ok(())
}

/// Tree depth of every section, from the parent links.
fn depths(sections: &[SectionRow]) -> HashMap<i64, usize> {
    let mut depths: HashMap<i64, usize> = HashMap::with_capacity(sections.len());
    for s in sections {
        let depth = s
            .parent_id
            .and_then(|p| depths.get(&p))
            .map(|d| d + 1)
            .unwrap_or(0);
        depths.insert(s.id, depth);
    }
    depths
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts.to_string())
}

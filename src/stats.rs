//! Database statistics.
//!
//! A quick summary of what's stored: totals for every table and a
//! per-document breakdown, so an ingest run can be checked at a glance.

use anyhow::Result;
use sqlx::Row;

use crate::config::Config;
use crate::db;

struct DocumentStats {
    doc_ref: String,
    section_count: i64,
    clause_count: i64,
    xref_count: i64,
    ingested_at: i64,
}

pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;

    let mut totals = Vec::new();
    for table in ["documents", "sections", "clauses", "xrefs", "cards"] {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&pool)
            .await?;
        totals.push((table, count));
    }

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Spec Harness — Database Stats");
    println!("=============================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    for (table, count) in &totals {
        println!("  {:<12} {}", format!("{}:", capitalize(table)), count);
    }

    let rows = sqlx::query(
        r#"
        SELECT
            d.doc_ref,
            d.ingested_at,
            (SELECT COUNT(*) FROM sections s WHERE s.doc_id = d.id) AS section_count,
            (SELECT COUNT(*) FROM clauses c WHERE c.doc_id = d.id) AS clause_count,
            (SELECT COUNT(*) FROM xrefs x WHERE x.doc_id = d.id) AS xref_count
        FROM documents d
        ORDER BY d.doc_ref
        "#,
    )
    .fetch_all(&pool)
    .await?;

    let stats: Vec<DocumentStats> = rows
        .iter()
        .map(|row| DocumentStats {
            doc_ref: row.get("doc_ref"),
            section_count: row.get("section_count"),
            clause_count: row.get("clause_count"),
            xref_count: row.get("xref_count"),
            ingested_at: row.get("ingested_at"),
        })
        .collect();

    if !stats.is_empty() {
        println!();
        println!("  By document:");
        println!(
            "  {:<32} {:>8} {:>8} {:>6}   {}",
            "DOCUMENT", "SECTIONS", "CLAUSES", "XREFS", "INGESTED"
        );
        println!("  {}", "-".repeat(78));
        for s in &stats {
            println!(
                "  {:<32} {:>8} {:>8} {:>6}   {}",
                s.doc_ref,
                s.section_count,
                s.clause_count,
                s.xref_count,
                format_ts(s.ingested_at)
            );
        }
    }

    println!();

    pool.close().await;
    Ok(())
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

fn format_ts(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("xrefs"), "Xrefs");
        assert_eq!(capitalize(""), "");
    }
}

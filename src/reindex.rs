//! Full-text search sidecar rebuild.
//!
//! Ingestion never touches the FTS5 tables; this rebuild clears and
//! repopulates all three from the base tables in one transaction, so it is
//! safe to run at any time and any number of times.

use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;
use crate::migrate::search_index_exists;

/// Row counts written to each sidecar table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexCounts {
    pub sections: u64,
    pub clauses: u64,
    pub cards: u64,
}

/// Rebuild the sidecar, or return `None` when this database has none.
pub async fn rebuild_search_index(pool: &SqlitePool) -> Result<Option<IndexCounts>> {
    if !search_index_exists(pool).await? {
        return Ok(None);
    }

    let mut tx = pool.begin_with("BEGIN IMMEDIATE").await?;

    for table in ["sections_fts", "clauses_fts", "cards_fts"] {
        sqlx::query(&format!("DELETE FROM {}", table))
            .execute(&mut *tx)
            .await?;
    }

    let sections = sqlx::query(
        "INSERT INTO sections_fts (section_id, doc_id, ref, title, text) SELECT id, doc_id, ref, title, text FROM sections",
    )
    .execute(&mut *tx)
    .await?
    .rows_affected();

    let clauses = sqlx::query(
        "INSERT INTO clauses_fts (clause_id, doc_id, code, text) SELECT id, doc_id, code, text FROM clauses",
    )
    .execute(&mut *tx)
    .await?
    .rows_affected();

    let cards = sqlx::query(
        "INSERT INTO cards_fts (card_id, entity_ref, content) SELECT id, entity_ref, content FROM cards",
    )
    .execute(&mut *tx)
    .await?
    .rows_affected();

    tx.commit().await?;

    let counts = IndexCounts {
        sections,
        clauses,
        cards,
    };
    tracing::debug!(?counts, "search index rebuilt");
    Ok(Some(counts))
}

pub async fn run_reindex(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    let result = rebuild_search_index(&pool).await;
    pool.close().await;

    match result? {
        Some(counts) => {
            println!("reindex");
            println!("  sections: {}", counts.sections);
            println!("  clauses: {}", counts.clauses);
            println!("  cards: {}", counts.cards);
            println!("ok");
        }
        None => println!("reindex skipped: search index unavailable (SQLite built without FTS5)"),
    }
    Ok(())
}

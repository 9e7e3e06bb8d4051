//! Idempotent schema setup.
//!
//! Every DDL statement goes through [`apply`], which classifies the outcome:
//!
//! - success, or an "already exists" error → the object is there;
//! - "no such module" on an FTS5 statement → the SQLite build lacks FTS5,
//!   which only disables the search sidecar;
//! - anything else → [`MigrateError::Statement`].
//!
//! Running migrations any number of times converges on the same schema.

use anyhow::Result;
use sqlx::SqlitePool;
use thiserror::Error;

use crate::config::Config;
use crate::db;

const TABLES: &[&str] = &[
    r#"
    CREATE TABLE documents (
        id INTEGER PRIMARY KEY,
        doc_ref TEXT NOT NULL UNIQUE,
        title TEXT NOT NULL,
        version TEXT,
        content_hash TEXT NOT NULL,
        ingested_at INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE sections (
        id INTEGER PRIMARY KEY,
        doc_id INTEGER NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
        ref TEXT NOT NULL,
        title TEXT NOT NULL,
        level INTEGER NOT NULL,
        ord INTEGER NOT NULL,
        parent_id INTEGER REFERENCES sections(id) ON DELETE CASCADE,
        text TEXT NOT NULL,
        line_start INTEGER NOT NULL,
        line_end INTEGER NOT NULL,
        UNIQUE(doc_id, ord)
    )
    "#,
    r#"
    CREATE TABLE clauses (
        id INTEGER PRIMARY KEY,
        doc_id INTEGER NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
        section_id INTEGER REFERENCES sections(id) ON DELETE SET NULL,
        code TEXT NOT NULL,
        label TEXT,
        text TEXT NOT NULL,
        modality TEXT,
        line_num INTEGER NOT NULL,
        UNIQUE(doc_id, code, line_num)
    )
    "#,
    r#"
    CREATE TABLE xrefs (
        id INTEGER PRIMARY KEY,
        doc_id INTEGER NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
        source_id INTEGER REFERENCES sections(id) ON DELETE SET NULL,
        source_line INTEGER NOT NULL,
        target_ref TEXT NOT NULL,
        target_type TEXT NOT NULL,
        context TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE cards (
        id INTEGER PRIMARY KEY,
        kind_ref TEXT NOT NULL,
        context_ref TEXT NOT NULL,
        entity_ref TEXT NOT NULL,
        content TEXT NOT NULL,
        content_hash TEXT NOT NULL,
        label TEXT,
        level TEXT,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL,
        UNIQUE(context_ref, entity_ref, content_hash)
    )
    "#,
    "CREATE INDEX idx_sections_doc ON sections(doc_id, ord)",
    "CREATE INDEX idx_sections_parent ON sections(parent_id)",
    "CREATE INDEX idx_clauses_doc ON clauses(doc_id)",
    "CREATE INDEX idx_clauses_code ON clauses(code)",
    "CREATE INDEX idx_xrefs_doc ON xrefs(doc_id)",
    "CREATE INDEX idx_xrefs_target ON xrefs(target_ref)",
    "CREATE INDEX idx_cards_entity ON cards(context_ref, entity_ref)",
];

/// FTS5 sidecar; optional.
const SEARCH_TABLES: &[&str] = &[
    "CREATE VIRTUAL TABLE sections_fts USING fts5(section_id UNINDEXED, doc_id UNINDEXED, ref, title, text)",
    "CREATE VIRTUAL TABLE clauses_fts USING fts5(clause_id UNINDEXED, doc_id UNINDEXED, code, text)",
    "CREATE VIRTUAL TABLE cards_fts USING fts5(card_id UNINDEXED, entity_ref, content)",
];

#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("migration statement failed: {lead}")]
    Statement {
        /// First non-blank line of the offending statement.
        lead: String,
        source: sqlx::Error,
    },
}

/// What a completed migration found out about the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationReport {
    pub fts_available: bool,
}

/// Whether a missing SQLite module may be tolerated for a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Required {
    Core,
    Optional,
}

#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    Applied,
    AlreadyExists,
    MissingModule,
}

pub async fn run_migrations(config: &Config) -> Result<MigrationReport> {
    let pool = db::connect(config).await?;
    let report = migrate_pool(&pool).await;
    pool.close().await;
    Ok(report?)
}

pub async fn migrate_pool(pool: &SqlitePool) -> Result<MigrationReport, MigrateError> {
    for sql in TABLES {
        apply(pool, sql, Required::Core).await?;
    }

    let mut fts_available = true;
    for sql in SEARCH_TABLES {
        if apply(pool, sql, Required::Optional).await? == Outcome::MissingModule {
            fts_available = false;
        }
    }
    if !fts_available {
        tracing::warn!("SQLite build lacks FTS5; search index disabled");
    }

    Ok(MigrationReport { fts_available })
}

async fn apply(pool: &SqlitePool, sql: &str, required: Required) -> Result<Outcome, MigrateError> {
    match sqlx::query(sql).execute(pool).await {
        Ok(_) => Ok(Outcome::Applied),
        Err(err) => {
            let message = match &err {
                sqlx::Error::Database(db_err) => db_err.message().to_string(),
                _ => String::new(),
            };
            if message.contains("already exists") {
                Ok(Outcome::AlreadyExists)
            } else if required == Required::Optional && message.contains("no such module") {
                Ok(Outcome::MissingModule)
            } else {
                Err(MigrateError::Statement {
                    lead: lead_line(sql),
                    source: err,
                })
            }
        }
    }
}

fn lead_line(sql: &str) -> String {
    sql.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default()
        .to_string()
}

/// Whether the FTS5 sidecar tables exist in this database.
pub async fn search_index_exists(pool: &SqlitePool) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('sections_fts', 'clauses_fts', 'cards_fts')",
    )
    .fetch_one(pool)
    .await?;
    Ok(count == SEARCH_TABLES.len() as i64)
}

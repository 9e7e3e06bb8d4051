//! SQLite-backed [`Store`] implementation.
//!
//! Each [`Store::begin`] opens a sqlx transaction on the pool; every
//! [`StoreTx`] method is one statement against the schema created by
//! [`crate::migrate`]. Dropping a [`SqliteTx`] without committing rolls the
//! transaction back.
//!
//! Transactions start with `BEGIN IMMEDIATE`, taking the write lock before
//! the first read. An ingestion reads the document row and then writes; a
//! deferred `BEGIN` would fail with `SQLITE_BUSY` on the lock upgrade when
//! another writer got there first. Waiting writers queue on the busy
//! timeout set in [`crate::db`].

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Sqlite, SqlitePool, Transaction};

use spec_harness_core::models::{Clause, DocumentSummary, NewCard, Section, Xref};
use spec_harness_core::store::{Store, StoreError, StoreTx};

/// SQLite implementation of the [`Store`] trait.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>> {
        let tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;
        Ok(Box::new(SqliteTx { tx: Some(tx) }))
    }
}

pub struct SqliteTx {
    tx: Option<Transaction<'static, Sqlite>>,
}

impl SqliteTx {
    fn conn(&mut self) -> Result<&mut Transaction<'static, Sqlite>> {
        Ok(self.tx.as_mut().ok_or(StoreError::Closed)?)
    }
}

/// Translate a unique-constraint failure into [`StoreError::UniqueViolation`].
fn unique_violation(table: &'static str, key: String) -> impl FnOnce(sqlx::Error) -> anyhow::Error {
    move |err| {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return StoreError::UniqueViolation { table, key }.into();
            }
        }
        err.into()
    }
}

#[async_trait]
impl StoreTx for SqliteTx {
    async fn find_document(&mut self, doc_ref: &str) -> Result<Option<i64>> {
        let tx = self.conn()?;
        let id: Option<i64> = sqlx::query_scalar("SELECT id FROM documents WHERE doc_ref = ?")
            .bind(doc_ref)
            .fetch_optional(&mut **tx)
            .await?;
        Ok(id)
    }

    async fn insert_document(&mut self, doc: &DocumentSummary, ingested_at: i64) -> Result<i64> {
        let tx = self.conn()?;
        let result = sqlx::query(
            "INSERT INTO documents (doc_ref, title, version, content_hash, ingested_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&doc.doc_ref)
        .bind(&doc.title)
        .bind(&doc.version)
        .bind(&doc.content_hash)
        .bind(ingested_at)
        .execute(&mut **tx)
        .await
        .map_err(unique_violation("documents", doc.doc_ref.clone()))?;
        Ok(result.last_insert_rowid())
    }

    async fn update_document(
        &mut self,
        id: i64,
        doc: &DocumentSummary,
        ingested_at: i64,
    ) -> Result<()> {
        let tx = self.conn()?;
        let result = sqlx::query(
            "UPDATE documents SET title = ?, version = ?, content_hash = ?, ingested_at = ? WHERE id = ?",
        )
        .bind(&doc.title)
        .bind(&doc.version)
        .bind(&doc.content_hash)
        .bind(ingested_at)
        .bind(id)
        .execute(&mut **tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::UnknownRow {
                table: "documents",
                id,
            }
            .into());
        }
        Ok(())
    }

    async fn clear_document(&mut self, id: i64) -> Result<()> {
        let tx = self.conn()?;
        for sql in [
            "DELETE FROM xrefs WHERE doc_id = ?",
            "DELETE FROM clauses WHERE doc_id = ?",
            "DELETE FROM sections WHERE doc_id = ?",
        ] {
            sqlx::query(sql).bind(id).execute(&mut **tx).await?;
        }
        Ok(())
    }

    async fn insert_section(
        &mut self,
        doc_id: i64,
        section: &Section,
        parent_id: Option<i64>,
    ) -> Result<i64> {
        let tx = self.conn()?;
        let result = sqlx::query(
            r#"
            INSERT INTO sections (doc_id, ref, title, level, ord, parent_id, text, line_start, line_end)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(doc_id)
        .bind(&section.reference)
        .bind(&section.title)
        .bind(section.level as i64)
        .bind(section.ord as i64)
        .bind(parent_id)
        .bind(&section.text)
        .bind(section.line_start as i64)
        .bind(section.line_end as i64)
        .execute(&mut **tx)
        .await
        .map_err(unique_violation(
            "sections",
            format!("({}, {})", doc_id, section.ord),
        ))?;
        Ok(result.last_insert_rowid())
    }

    async fn insert_clause(
        &mut self,
        doc_id: i64,
        clause: &Clause,
        section_id: Option<i64>,
    ) -> Result<i64> {
        let tx = self.conn()?;
        let result = sqlx::query(
            r#"
            INSERT INTO clauses (doc_id, section_id, code, label, text, modality, line_num)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(doc_id)
        .bind(section_id)
        .bind(&clause.code)
        .bind(&clause.label)
        .bind(&clause.text)
        .bind(clause.modality.map(|m| m.as_str()))
        .bind(clause.line_num as i64)
        .execute(&mut **tx)
        .await
        .map_err(unique_violation(
            "clauses",
            format!("({}, {}, {})", doc_id, clause.code, clause.line_num),
        ))?;
        Ok(result.last_insert_rowid())
    }

    async fn insert_xref(
        &mut self,
        doc_id: i64,
        xref: &Xref,
        source_id: Option<i64>,
    ) -> Result<i64> {
        let tx = self.conn()?;
        let result = sqlx::query(
            r#"
            INSERT INTO xrefs (doc_id, source_id, source_line, target_ref, target_type, context)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(doc_id)
        .bind(source_id)
        .bind(xref.source_line as i64)
        .bind(&xref.target_ref)
        .bind(xref.target_kind.as_str())
        .bind(&xref.context)
        .execute(&mut **tx)
        .await?;
        Ok(result.last_insert_rowid())
    }

    async fn find_card(
        &mut self,
        context_ref: &str,
        entity_ref: &str,
        content_hash: &str,
    ) -> Result<Option<i64>> {
        let tx = self.conn()?;
        let id: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM cards WHERE context_ref = ? AND entity_ref = ? AND content_hash = ?",
        )
        .bind(context_ref)
        .bind(entity_ref)
        .bind(content_hash)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(id)
    }

    async fn insert_card(&mut self, card: &NewCard, content_hash: &str, now: i64) -> Result<i64> {
        let tx = self.conn()?;
        let result = sqlx::query(
            r#"
            INSERT INTO cards (kind_ref, context_ref, entity_ref, content, content_hash,
                               label, level, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&card.kind_ref)
        .bind(&card.context_ref)
        .bind(&card.entity_ref)
        .bind(&card.content)
        .bind(content_hash)
        .bind(&card.label)
        .bind(&card.level)
        .bind(now)
        .bind(now)
        .execute(&mut **tx)
        .await
        .map_err(unique_violation(
            "cards",
            format!("({}, {}, {})", card.context_ref, card.entity_ref, content_hash),
        ))?;
        Ok(result.last_insert_rowid())
    }

    async fn update_card_metadata(&mut self, id: i64, card: &NewCard, now: i64) -> Result<()> {
        let tx = self.conn()?;
        let result = sqlx::query("UPDATE cards SET label = ?, level = ?, updated_at = ? WHERE id = ?")
            .bind(&card.label)
            .bind(&card.level)
            .bind(now)
            .bind(id)
            .execute(&mut **tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::UnknownRow { table: "cards", id }.into());
        }
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        let tx = self.tx.take().ok_or(StoreError::Closed)?;
        tx.commit().await?;
        Ok(())
    }
}

//! Persistence boundary for Spec Harness.
//!
//! The ingestion pipeline and the knowledge-card upsert never hold a
//! connection of their own: they receive a [`Store`], open one
//! [`StoreTx`] per operation, issue the statements below, and commit.
//! Dropping a transaction without calling [`StoreTx::commit`] rolls it
//! back, so an error anywhere leaves the previously committed state intact.
//!
//! # Operations
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`find_document`](StoreTx::find_document) | Look up a document id by external reference |
//! | [`insert_document`](StoreTx::insert_document) | Insert a document row, returning its id |
//! | [`update_document`](StoreTx::update_document) | Overwrite title/version/hash/timestamp in place |
//! | [`clear_document`](StoreTx::clear_document) | Delete a document's xrefs, clauses, and sections |
//! | [`insert_section`](StoreTx::insert_section) | Insert one section under an already-stored parent |
//! | [`insert_clause`](StoreTx::insert_clause) | Insert one clause |
//! | [`insert_xref`](StoreTx::insert_xref) | Insert one cross-reference |
//! | [`find_card`](StoreTx::find_card) | Look up a card by its identity triple |
//! | [`insert_card`](StoreTx::insert_card) | Insert a card with its content hash |
//! | [`update_card_metadata`](StoreTx::update_card_metadata) | Update a card's mutable fields |

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Clause, DocumentSummary, NewCard, Section, Xref};

/// Store-level failures callers may want to match on.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated on {table}: {key}")]
    UniqueViolation { table: &'static str, key: String },

    #[error("{table} row {id} does not exist")]
    UnknownRow { table: &'static str, id: i64 },

    #[error("transaction already committed")]
    Closed,
}

/// A source of transactions.
#[async_trait]
pub trait Store: Send + Sync {
    /// Open one atomic unit of work.
    ///
    /// Concurrent transactions touching the same document reference must
    /// serialize; transactions on different references need not.
    async fn begin(&self) -> Result<Box<dyn StoreTx>>;
}

/// One open transaction against a [`Store`].
#[async_trait]
pub trait StoreTx: Send {
    async fn find_document(&mut self, doc_ref: &str) -> Result<Option<i64>>;

    async fn insert_document(&mut self, doc: &DocumentSummary, ingested_at: i64) -> Result<i64>;

    async fn update_document(
        &mut self,
        id: i64,
        doc: &DocumentSummary,
        ingested_at: i64,
    ) -> Result<()>;

    async fn clear_document(&mut self, id: i64) -> Result<()>;

    async fn insert_section(
        &mut self,
        doc_id: i64,
        section: &Section,
        parent_id: Option<i64>,
    ) -> Result<i64>;

    async fn insert_clause(
        &mut self,
        doc_id: i64,
        clause: &Clause,
        section_id: Option<i64>,
    ) -> Result<i64>;

    async fn insert_xref(&mut self, doc_id: i64, xref: &Xref, source_id: Option<i64>)
        -> Result<i64>;

    async fn find_card(
        &mut self,
        context_ref: &str,
        entity_ref: &str,
        content_hash: &str,
    ) -> Result<Option<i64>>;

    async fn insert_card(&mut self, card: &NewCard, content_hash: &str, now: i64) -> Result<i64>;

    async fn update_card_metadata(&mut self, id: i64, card: &NewCard, now: i64) -> Result<()>;

    /// Make every statement issued on this transaction visible at once.
    async fn commit(&mut self) -> Result<()>;
}

//! In-memory [`Store`] implementation for testing and embedding.
//!
//! All tables live in one [`MemoryState`] behind a `tokio::sync::Mutex`.
//! A transaction takes the lock for its whole lifetime (writers serialize,
//! like SQLite's single writer) and works on a private copy of the state;
//! `commit` swaps the copy in, dropping without commit discards it.
//! The same uniqueness constraints as the SQL schema are enforced.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::models::{
    CardRow, Clause, ClauseRow, DocumentRow, DocumentSummary, NewCard, Section, SectionRow, Xref,
    XrefRow,
};

use super::{Store, StoreError, StoreTx};

/// Every table of the in-memory store.
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub documents: Vec<DocumentRow>,
    pub sections: Vec<SectionRow>,
    pub clauses: Vec<ClauseRow>,
    pub xrefs: Vec<XrefRow>,
    pub cards: Vec<CardRow>,
    last_id: i64,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    pub fn document(&self, doc_ref: &str) -> Option<&DocumentRow> {
        self.documents.iter().find(|d| d.doc_ref == doc_ref)
    }

    pub fn sections_of(&self, doc_id: i64) -> Vec<&SectionRow> {
        let mut rows: Vec<&SectionRow> = self
            .sections
            .iter()
            .filter(|s| s.doc_id == doc_id)
            .collect();
        rows.sort_by_key(|s| s.ord);
        rows
    }

    pub fn clauses_of(&self, doc_id: i64) -> Vec<&ClauseRow> {
        self.clauses.iter().filter(|c| c.doc_id == doc_id).collect()
    }

    pub fn xrefs_of(&self, doc_id: i64) -> Vec<&XrefRow> {
        self.xrefs.iter().filter(|x| x.doc_id == doc_id).collect()
    }
}

/// In-memory store; cheap to clone, clones share state.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the committed state.
    pub async fn snapshot(&self) -> MemoryState {
        self.state.lock().await.clone()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>> {
        let guard = self.state.clone().lock_owned().await;
        let work = guard.clone();
        Ok(Box::new(MemoryTx {
            guard: Some(guard),
            work,
        }))
    }
}

struct MemoryTx {
    guard: Option<OwnedMutexGuard<MemoryState>>,
    work: MemoryState,
}

impl MemoryTx {
    fn state(&mut self) -> Result<&mut MemoryState> {
        if self.guard.is_none() {
            return Err(StoreError::Closed.into());
        }
        Ok(&mut self.work)
    }
}

fn require_document(state: &MemoryState, id: i64) -> Result<()> {
    if state.documents.iter().any(|d| d.id == id) {
        Ok(())
    } else {
        Err(StoreError::UnknownRow {
            table: "documents",
            id,
        }
        .into())
    }
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn find_document(&mut self, doc_ref: &str) -> Result<Option<i64>> {
        Ok(self.state()?.document(doc_ref).map(|d| d.id))
    }

    async fn insert_document(&mut self, doc: &DocumentSummary, ingested_at: i64) -> Result<i64> {
        let state = self.state()?;
        if state.document(&doc.doc_ref).is_some() {
            return Err(StoreError::UniqueViolation {
                table: "documents",
                key: doc.doc_ref.clone(),
            }
            .into());
        }
        let id = state.next_id();
        state.documents.push(DocumentRow {
            id,
            doc_ref: doc.doc_ref.clone(),
            title: doc.title.clone(),
            version: doc.version.clone(),
            content_hash: doc.content_hash.clone(),
            ingested_at,
        });
        Ok(id)
    }

    async fn update_document(
        &mut self,
        id: i64,
        doc: &DocumentSummary,
        ingested_at: i64,
    ) -> Result<()> {
        let state = self.state()?;
        let row = state
            .documents
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or(StoreError::UnknownRow {
                table: "documents",
                id,
            })?;
        row.title = doc.title.clone();
        row.version = doc.version.clone();
        row.content_hash = doc.content_hash.clone();
        row.ingested_at = ingested_at;
        Ok(())
    }

    async fn clear_document(&mut self, id: i64) -> Result<()> {
        let state = self.state()?;
        state.xrefs.retain(|x| x.doc_id != id);
        state.clauses.retain(|c| c.doc_id != id);
        state.sections.retain(|s| s.doc_id != id);
        Ok(())
    }

    async fn insert_section(
        &mut self,
        doc_id: i64,
        section: &Section,
        parent_id: Option<i64>,
    ) -> Result<i64> {
        let state = self.state()?;
        require_document(state, doc_id)?;
        if state
            .sections
            .iter()
            .any(|s| s.doc_id == doc_id && s.ord == section.ord)
        {
            return Err(StoreError::UniqueViolation {
                table: "sections",
                key: format!("({}, {})", doc_id, section.ord),
            }
            .into());
        }
        if let Some(pid) = parent_id {
            if !state.sections.iter().any(|s| s.id == pid) {
                return Err(StoreError::UnknownRow {
                    table: "sections",
                    id: pid,
                }
                .into());
            }
        }
        let id = state.next_id();
        state.sections.push(SectionRow {
            id,
            doc_id,
            reference: section.reference.clone(),
            title: section.title.clone(),
            level: section.level,
            ord: section.ord,
            parent_id,
            text: section.text.clone(),
            line_start: section.line_start,
            line_end: section.line_end,
        });
        Ok(id)
    }

    async fn insert_clause(
        &mut self,
        doc_id: i64,
        clause: &Clause,
        section_id: Option<i64>,
    ) -> Result<i64> {
        let state = self.state()?;
        require_document(state, doc_id)?;
        if state
            .clauses
            .iter()
            .any(|c| c.doc_id == doc_id && c.code == clause.code && c.line_num == clause.line_num)
        {
            return Err(StoreError::UniqueViolation {
                table: "clauses",
                key: format!("({}, {}, {})", doc_id, clause.code, clause.line_num),
            }
            .into());
        }
        let id = state.next_id();
        state.clauses.push(ClauseRow {
            id,
            doc_id,
            section_id,
            code: clause.code.clone(),
            label: clause.label.clone(),
            text: clause.text.clone(),
            modality: clause.modality,
            line_num: clause.line_num,
        });
        Ok(id)
    }

    async fn insert_xref(
        &mut self,
        doc_id: i64,
        xref: &Xref,
        source_id: Option<i64>,
    ) -> Result<i64> {
        let state = self.state()?;
        require_document(state, doc_id)?;
        let id = state.next_id();
        state.xrefs.push(XrefRow {
            id,
            doc_id,
            source_id,
            source_line: xref.source_line,
            target_ref: xref.target_ref.clone(),
            target_kind: xref.target_kind,
            context: xref.context.clone(),
        });
        Ok(id)
    }

    async fn find_card(
        &mut self,
        context_ref: &str,
        entity_ref: &str,
        content_hash: &str,
    ) -> Result<Option<i64>> {
        Ok(self
            .state()?
            .cards
            .iter()
            .find(|c| {
                c.context_ref == context_ref
                    && c.entity_ref == entity_ref
                    && c.content_hash == content_hash
            })
            .map(|c| c.id))
    }

    async fn insert_card(&mut self, card: &NewCard, content_hash: &str, now: i64) -> Result<i64> {
        let state = self.state()?;
        if state.cards.iter().any(|c| {
            c.context_ref == card.context_ref
                && c.entity_ref == card.entity_ref
                && c.content_hash == content_hash
        }) {
            return Err(StoreError::UniqueViolation {
                table: "cards",
                key: format!("({}, {}, {})", card.context_ref, card.entity_ref, content_hash),
            }
            .into());
        }
        let id = state.next_id();
        state.cards.push(CardRow {
            id,
            kind_ref: card.kind_ref.clone(),
            context_ref: card.context_ref.clone(),
            entity_ref: card.entity_ref.clone(),
            content: card.content.clone(),
            content_hash: content_hash.to_string(),
            label: card.label.clone(),
            level: card.level.clone(),
            created_at: now,
            updated_at: now,
        });
        Ok(id)
    }

    async fn update_card_metadata(&mut self, id: i64, card: &NewCard, now: i64) -> Result<()> {
        let state = self.state()?;
        let row = state
            .cards
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(StoreError::UnknownRow { table: "cards", id })?;
        row.label = card.label.clone();
        row.level = card.level.clone();
        row.updated_at = now;
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        let mut guard = self.guard.take().ok_or(StoreError::Closed)?;
        *guard = std::mem::take(&mut self.work);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(doc_ref: &str) -> DocumentSummary {
        DocumentSummary {
            doc_ref: doc_ref.to_string(),
            title: "T".to_string(),
            version: None,
            content_hash: "h".to_string(),
        }
    }

    #[tokio::test]
    async fn test_uncommitted_transaction_is_discarded() {
        let store = InMemoryStore::new();
        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_document(&summary("a"), 1).await.unwrap();
        }
        assert!(store.snapshot().await.documents.is_empty());
    }

    #[tokio::test]
    async fn test_commit_publishes_and_closes() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let id = tx.insert_document(&summary("a"), 1).await.unwrap();
        tx.commit().await.unwrap();

        let err = tx.find_document("a").await.unwrap_err();
        assert!(matches!(err.downcast_ref::<StoreError>(), Some(StoreError::Closed)));
        drop(tx);

        let state = store.snapshot().await;
        assert_eq!(state.document("a").map(|d| d.id), Some(id));
    }

    #[tokio::test]
    async fn test_duplicate_document_ref_rejected() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.insert_document(&summary("a"), 1).await.unwrap();
        let err = tx.insert_document(&summary("a"), 2).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::UniqueViolation { table: "documents", .. })
        ));
    }

    #[tokio::test]
    async fn test_section_requires_existing_parent() {
        let store = InMemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let doc = tx.insert_document(&summary("a"), 1).await.unwrap();
        let section = Section {
            ord: 1,
            reference: "A.1".to_string(),
            title: "One".to_string(),
            level: 2,
            parent_ord: Some(0),
            text: String::new(),
            line_start: 1,
            line_end: 1,
        };
        let err = tx.insert_section(doc, &section, Some(999)).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::UnknownRow { table: "sections", id: 999 })
        ));
    }
}

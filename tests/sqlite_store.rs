use sqlx::SqlitePool;
use tempfile::TempDir;

use spec_harness::db;
use spec_harness::migrate::migrate_pool;
use spec_harness::reindex::rebuild_search_index;
use spec_harness::show::{load_document, DocumentView};
use spec_harness::sqlite_store::SqliteStore;
use spec_harness::verify::verify_cards;
use spec_harness_core::card::upsert_card;
use spec_harness_core::ingest::{ingest, IngestRequest};
use spec_harness_core::models::{DocumentSummary, Modality, NewCard, TargetKind};
use spec_harness_core::parser::DocumentParser;
use spec_harness_core::store::{Store, StoreError, StoreTx};

const KERNEL: &str = "\
# Kernel Specification

Version 1.2

## Part A – Kernel

Builds on Part B.

### A.1 - Overview

**CC-A.1-1 (Support).** Systems MUST support X.
**CC-A.1-2** | Systems MUST NOT drop Y.

### A.2 - Storage

Refines A.1 and CC-A.1-1.
";

async fn setup() -> (TempDir, SqliteStore) {
    let tmp = TempDir::new().unwrap();
    let pool = db::connect_path(&tmp.path().join("spx.sqlite"))
        .await
        .unwrap();
    migrate_pool(&pool).await.unwrap();
    (tmp, SqliteStore::new(pool))
}

async fn count(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .unwrap()
}

type SectionContent = (String, String, u8, u32, String, usize, usize, Option<u32>);
type ClauseContent = (String, Option<String>, String, Option<Modality>, usize, Option<u32>);
type XrefContent = (String, TargetKind, String, usize, Option<u32>);

/// A stored document's rows with ids replaced by section ordinals.
fn stored_content(
    view: &DocumentView,
) -> (Vec<SectionContent>, Vec<ClauseContent>, Vec<XrefContent>) {
    let ord_of = |id: Option<i64>| {
        id.and_then(|id| view.sections.iter().find(|s| s.id == id).map(|s| s.ord))
    };
    let sections = view
        .sections
        .iter()
        .map(|s| {
            (
                s.reference.clone(),
                s.title.clone(),
                s.level,
                s.ord,
                s.text.clone(),
                s.line_start,
                s.line_end,
                ord_of(s.parent_id),
            )
        })
        .collect();
    let clauses = view
        .clauses
        .iter()
        .map(|c| {
            (
                c.code.clone(),
                c.label.clone(),
                c.text.clone(),
                c.modality,
                c.line_num,
                ord_of(c.section_id),
            )
        })
        .collect();
    let xrefs = view
        .xrefs
        .iter()
        .map(|x| {
            (
                x.target_ref.clone(),
                x.target_kind,
                x.context.clone(),
                x.source_line,
                ord_of(x.source_id),
            )
        })
        .collect();
    (sections, clauses, xrefs)
}

fn request<'a>(doc_ref: &'a str, text: &'a str) -> IngestRequest<'a> {
    IngestRequest {
        doc_ref,
        title: "Kernel",
        text,
        version: None,
    }
}

#[tokio::test]
async fn test_ingest_round_trips_through_sqlite() {
    let (_tmp, store) = setup().await;
    let parser = DocumentParser::default();

    let summary = ingest(&store, &parser, &request("kernel", KERNEL))
        .await
        .unwrap();

    let view = load_document(store.pool(), "kernel")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(view.document.id, summary.document_id);
    assert_eq!(view.document.version.as_deref(), Some("1.2"));
    assert_eq!(view.sections.len(), 4);

    let part = &view.sections[1];
    let overview = &view.sections[2];
    assert_eq!(part.reference, "Part-A");
    assert_eq!(overview.parent_id, Some(part.id));
    assert_eq!((overview.line_start, overview.line_end), (9, 13));

    assert_eq!(view.clauses.len(), 2);
    let first = &view.clauses[0];
    assert_eq!(first.code, "CC-A.1-1");
    assert_eq!(first.label.as_deref(), Some("Support"));
    assert_eq!(first.modality, Some(Modality::Must));
    assert_eq!(first.section_id, Some(overview.id));
    assert_eq!(view.clauses[1].modality, Some(Modality::MustNot));

    let kinds: Vec<(&str, TargetKind)> = view
        .xrefs
        .iter()
        .map(|x| (x.target_ref.as_str(), x.target_kind))
        .collect();
    assert_eq!(
        kinds,
        [
            ("Part-B", TargetKind::Section),
            ("CC-A.1-1", TargetKind::Clause),
            ("A.1", TargetKind::Section),
        ]
    );
}

#[tokio::test]
async fn test_reingest_keeps_id_and_row_counts() {
    let (_tmp, store) = setup().await;
    let parser = DocumentParser::default();
    let pool = store.pool().clone();

    let first = ingest(&store, &parser, &request("kernel", KERNEL))
        .await
        .unwrap();
    let first_view = load_document(&pool, "kernel").await.unwrap().unwrap();
    let before = [
        count(&pool, "sections").await,
        count(&pool, "clauses").await,
        count(&pool, "xrefs").await,
    ];
    let second = ingest(&store, &parser, &request("kernel", KERNEL))
        .await
        .unwrap();
    let after = [
        count(&pool, "sections").await,
        count(&pool, "clauses").await,
        count(&pool, "xrefs").await,
    ];

    assert_eq!(first.document_id, second.document_id);
    assert_eq!(count(&pool, "documents").await, 1);
    assert_eq!(before, after);

    let second_view = load_document(&pool, "kernel").await.unwrap().unwrap();
    assert_eq!(second_view.document.content_hash, first_view.document.content_hash);
    assert_eq!(stored_content(&first_view), stored_content(&second_view));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_ingestion_serializes_writers() {
    let (_tmp, store) = setup().await;
    let parser = DocumentParser::default();

    let mut handles = Vec::new();
    for i in 0..16 {
        let store = store.clone();
        let parser = parser.clone();
        handles.push(tokio::spawn(async move {
            // Even tasks all write "shared"; odd tasks each write their own ref.
            let doc_ref = if i % 2 == 0 {
                "shared".to_string()
            } else {
                format!("doc-{}", i)
            };
            ingest(&store, &parser, &request(&doc_ref, KERNEL)).await
        }));
    }

    let mut shared_ids = Vec::new();
    for (i, handle) in handles.into_iter().enumerate() {
        let summary = handle.await.unwrap().unwrap();
        assert_eq!(summary.section_count, 4);
        if i % 2 == 0 {
            shared_ids.push(summary.document_id);
        }
    }
    shared_ids.dedup();
    assert_eq!(shared_ids.len(), 1, "one row for the shared ref: {:?}", shared_ids);

    let pool = store.pool();
    assert_eq!(count(pool, "documents").await, 9);
    assert_eq!(count(pool, "sections").await, 9 * 4);
    assert_eq!(count(pool, "clauses").await, 9 * 2);

    let shared = load_document(pool, "shared").await.unwrap().unwrap();
    let single = load_document(pool, "doc-1").await.unwrap().unwrap();
    assert_eq!(stored_content(&shared), stored_content(&single));
}

#[tokio::test]
async fn test_uncommitted_transaction_rolls_back() {
    let (_tmp, store) = setup().await;
    let summary = DocumentSummary {
        doc_ref: "ghost".to_string(),
        title: "Ghost".to_string(),
        version: None,
        content_hash: "h".to_string(),
    };

    {
        let mut tx = store.begin().await.unwrap();
        tx.insert_document(&summary, 1).await.unwrap();
    }
    assert_eq!(count(store.pool(), "documents").await, 0);

    let mut tx = store.begin().await.unwrap();
    tx.insert_document(&summary, 1).await.unwrap();
    let err = tx.insert_document(&summary, 2).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<StoreError>(),
        Some(StoreError::UniqueViolation {
            table: "documents",
            ..
        })
    ));
}

#[tokio::test]
async fn test_deleting_document_cascades() {
    let (_tmp, store) = setup().await;
    let parser = DocumentParser::default();
    ingest(&store, &parser, &request("kernel", KERNEL))
        .await
        .unwrap();

    sqlx::query("DELETE FROM documents WHERE doc_ref = 'kernel'")
        .execute(store.pool())
        .await
        .unwrap();
    for table in ["sections", "clauses", "xrefs"] {
        assert_eq!(count(store.pool(), table).await, 0, "{}", table);
    }
}

#[tokio::test]
async fn test_card_identity_and_verification() {
    let (_tmp, store) = setup().await;
    let card = |content: &str| NewCard {
        kind_ref: "concept".to_string(),
        context_ref: "C".to_string(),
        entity_ref: "E".to_string(),
        content: content.to_string(),
        label: None,
        level: None,
    };

    let a = upsert_card(&store, &card("a")).await.unwrap();
    let again = upsert_card(&store, &card("a")).await.unwrap();
    assert_eq!(a.id, again.id);
    assert!(!again.created);
    assert_eq!(count(store.pool(), "cards").await, 1);

    let b = upsert_card(&store, &card("b")).await.unwrap();
    assert!(b.created);
    assert_eq!(count(store.pool(), "cards").await, 2);

    let report = verify_cards(store.pool()).await.unwrap();
    assert_eq!(report.checked, 2);
    assert!(report.is_clean());

    sqlx::query("UPDATE cards SET content = 'tampered' WHERE id = ?")
        .bind(b.id)
        .execute(store.pool())
        .await
        .unwrap();
    let report = verify_cards(store.pool()).await.unwrap();
    assert_eq!(report.mismatches.len(), 1);
    assert_eq!(report.mismatches[0].card_id, b.id);
}

#[tokio::test]
async fn test_search_index_rebuild_is_idempotent() {
    let (_tmp, store) = setup().await;
    let parser = DocumentParser::default();
    ingest(&store, &parser, &request("kernel", KERNEL))
        .await
        .unwrap();

    let first = rebuild_search_index(store.pool()).await.unwrap();
    let second = rebuild_search_index(store.pool()).await.unwrap();
    assert_eq!(first, second);

    // Builds without FTS5 report no index rather than failing.
    if let Some(counts) = first {
        assert_eq!(counts.sections, 4);
        assert_eq!(counts.clauses, 2);
        assert_eq!(counts.cards, 0);
    }
}

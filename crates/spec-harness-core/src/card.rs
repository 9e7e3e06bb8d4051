//! Content-addressed knowledge-card upsert.
//!
//! A card's identity is `(context_ref, entity_ref, content_hash)`. Upserting
//! identical content is a no-op apart from metadata (`label`, `level`);
//! changed content always yields a new card, and the old one stays until
//! the caller deletes it.

use anyhow::Result;

use crate::hash::content_hash;
use crate::models::{CardUpsert, NewCard};
use crate::store::Store;

pub async fn upsert_card(store: &dyn Store, card: &NewCard) -> Result<CardUpsert> {
    let hash = content_hash(&card.content);
    let now = chrono::Utc::now().timestamp();

    let mut tx = store.begin().await?;
    let outcome = match tx
        .find_card(&card.context_ref, &card.entity_ref, &hash)
        .await?
    {
        Some(id) => {
            tx.update_card_metadata(id, card, now).await?;
            CardUpsert { id, created: false }
        }
        None => {
            let id = tx.insert_card(card, &hash, now).await?;
            CardUpsert { id, created: true }
        }
    };
    tx.commit().await?;

    tracing::debug!(
        card_id = outcome.id,
        created = outcome.created,
        entity = %card.entity_ref,
        "card upserted"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryStore;

    fn card(content: &str) -> NewCard {
        NewCard {
            kind_ref: "concept".to_string(),
            context_ref: "C".to_string(),
            entity_ref: "E".to_string(),
            content: content.to_string(),
            label: None,
            level: None,
        }
    }

    #[tokio::test]
    async fn test_identical_upsert_does_not_duplicate() {
        let store = InMemoryStore::new();
        let first = upsert_card(&store, &card("a")).await.unwrap();
        let second = upsert_card(&store, &card("a")).await.unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.id, second.id);
        assert_eq!(store.snapshot().await.cards.len(), 1);
    }

    #[tokio::test]
    async fn test_changed_content_creates_new_card() {
        let store = InMemoryStore::new();
        let a = upsert_card(&store, &card("a")).await.unwrap();
        let b = upsert_card(&store, &card("b")).await.unwrap();

        assert!(b.created);
        assert_ne!(a.id, b.id);
        let state = store.snapshot().await;
        assert_eq!(state.cards.iter().filter(|c| c.entity_ref == "E").count(), 2);
    }

    #[tokio::test]
    async fn test_metadata_updates_in_place() {
        let store = InMemoryStore::new();
        let first = upsert_card(&store, &card("a")).await.unwrap();

        let mut relabeled = card("a");
        relabeled.label = Some("Identity".to_string());
        relabeled.level = Some("advanced".to_string());
        let second = upsert_card(&store, &relabeled).await.unwrap();
        assert_eq!(first.id, second.id);

        let state = store.snapshot().await;
        let row = &state.cards[0];
        assert_eq!(row.label.as_deref(), Some("Identity"));
        assert_eq!(row.level.as_deref(), Some("advanced"));
        assert_eq!(row.content_hash, content_hash("a"));
    }

    #[tokio::test]
    async fn test_same_content_in_other_context_is_distinct() {
        let store = InMemoryStore::new();
        let a = upsert_card(&store, &card("a")).await.unwrap();
        let mut elsewhere = card("a");
        elsewhere.context_ref = "D".to_string();
        let b = upsert_card(&store, &elsewhere).await.unwrap();
        assert!(b.created);
        assert_ne!(a.id, b.id);
    }
}

//! `spx verify`: check stored knowledge cards against their content hashes.
//!
//! A card's identity includes the hash of its content, so a row whose
//! content no longer hashes to its stored `content_hash` has been edited
//! outside the upsert path.

use anyhow::Result;
use sqlx::{Row, SqlitePool};

use spec_harness_core::hash::content_hash;

use crate::config::Config;
use crate::db;

/// A card whose content does not match its recorded hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashMismatch {
    pub card_id: i64,
    pub entity_ref: String,
    pub stored: String,
    pub actual: String,
}

#[derive(Debug, Clone, Default)]
pub struct VerifyReport {
    pub checked: usize,
    pub mismatches: Vec<HashMismatch>,
}

impl VerifyReport {
    pub fn is_clean(&self) -> bool {
        self.mismatches.is_empty()
    }
}

pub async fn verify_cards(pool: &SqlitePool) -> Result<VerifyReport> {
    let rows = sqlx::query("SELECT id, entity_ref, content, content_hash FROM cards ORDER BY id")
        .fetch_all(pool)
        .await?;

    let mut report = VerifyReport {
        checked: rows.len(),
        mismatches: Vec::new(),
    };
    for row in &rows {
        let content: String = row.get("content");
        let stored: String = row.get("content_hash");
        let actual = content_hash(&content);
        if actual != stored {
            report.mismatches.push(HashMismatch {
                card_id: row.get("id"),
                entity_ref: row.get("entity_ref"),
                stored,
                actual,
            });
        }
    }
    Ok(report)
}

/// CLI entry point; exits with status 1 when any card fails verification.
pub async fn run_verify(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    let report = verify_cards(&pool).await;
    pool.close().await;
    let report = report?;

    println!("verify cards");
    println!("  checked: {}", report.checked);
    println!("  mismatches: {}", report.mismatches.len());
    for m in &report.mismatches {
        println!(
            "  card {} ({}): stored {} != actual {}",
            m.card_id, m.entity_ref, m.stored, m.actual
        );
    }

    if !report.is_clean() {
        tracing::warn!(count = report.mismatches.len(), "card hash mismatches found");
        std::process::exit(1);
    }
    println!("ok");
    Ok(())
}

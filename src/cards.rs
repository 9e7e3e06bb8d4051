//! `spx card add`: knowledge-card upsert from the command line.

use anyhow::{bail, Context, Result};
use std::path::Path;

use spec_harness_core::card::upsert_card;
use spec_harness_core::models::NewCard;

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

/// Card fields as given on the command line; content comes inline or from a file.
#[derive(Debug, Clone)]
pub struct CardArgs {
    pub kind: String,
    pub context: String,
    pub entity: String,
    pub content: Option<String>,
    pub file: Option<std::path::PathBuf>,
    pub label: Option<String>,
    pub level: Option<String>,
}

impl CardArgs {
    pub fn into_card(self) -> Result<NewCard> {
        let content = match (self.content, self.file) {
            (Some(text), None) => text,
            (None, Some(path)) => read_content(&path)?,
            (Some(_), Some(_)) => bail!("pass either --content or --file, not both"),
            (None, None) => bail!("one of --content or --file is required"),
        };
        if content.trim().is_empty() {
            bail!("card content must not be empty");
        }
        Ok(NewCard {
            kind_ref: self.kind,
            context_ref: self.context,
            entity_ref: self.entity,
            content,
            label: self.label,
            level: self.level,
        })
    }
}

fn read_content(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read card content: {}", path.display()))
}

pub async fn run_card_add(config: &Config, args: CardArgs) -> Result<()> {
    let card = args.into_card()?;
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());
    let result = upsert_card(&store, &card).await;
    pool.close().await;
    let outcome = result?;

    let state = if outcome.created { "created" } else { "unchanged" };
    println!("card {} {}", outcome.id, state);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> CardArgs {
        CardArgs {
            kind: "concept".to_string(),
            context: "C".to_string(),
            entity: "E".to_string(),
            content: None,
            file: None,
            label: None,
            level: None,
        }
    }

    #[test]
    fn test_inline_content() {
        let card = CardArgs {
            content: Some("a".to_string()),
            ..args()
        }
        .into_card()
        .unwrap();
        assert_eq!(card.content, "a");
        assert_eq!(card.entity_ref, "E");
    }

    #[test]
    fn test_content_source_is_required_and_exclusive() {
        assert!(args().into_card().is_err());
        let both = CardArgs {
            content: Some("a".to_string()),
            file: Some("x.md".into()),
            ..args()
        };
        assert!(both.into_card().is_err());
    }

    #[test]
    fn test_blank_content_rejected() {
        let blank = CardArgs {
            content: Some("  \n".to_string()),
            ..args()
        };
        assert!(blank.into_card().is_err());
    }
}

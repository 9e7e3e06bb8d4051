//! TOML configuration.
//!
//! ```toml
//! [db]
//! path = "./data/spx.sqlite"
//!
//! [parser]                 # optional
//! relation_keywords = ["Builds on", "Refines"]
//! gate_on_bare_ids = true
//! context_radius = 30
//!
//! [scan]                   # optional
//! include_globs = ["**/*.md"]
//! exclude_globs = []
//! follow_symlinks = false
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use spec_harness_core::parser::ParserOptions;
use spec_harness_core::xref::{XrefGate, DEFAULT_CONTEXT_RADIUS, DEFAULT_RELATION_KEYWORDS};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub parser: ParserConfig,
    #[serde(default)]
    pub scan: ScanConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ParserConfig {
    #[serde(default = "default_relation_keywords")]
    pub relation_keywords: Vec<String>,
    #[serde(default = "default_true")]
    pub gate_on_bare_ids: bool,
    #[serde(default = "default_context_radius")]
    pub context_radius: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            relation_keywords: default_relation_keywords(),
            gate_on_bare_ids: true,
            context_radius: DEFAULT_CONTEXT_RADIUS,
        }
    }
}

fn default_relation_keywords() -> Vec<String> {
    DEFAULT_RELATION_KEYWORDS
        .iter()
        .map(|k| k.to_string())
        .collect()
}
fn default_true() -> bool {
    true
}
fn default_context_radius() -> usize {
    DEFAULT_CONTEXT_RADIUS
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScanConfig {
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
            follow_symlinks: false,
        }
    }
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*.md".to_string()]
}

impl Config {
    /// Defaults for commands that can run without a config file.
    pub fn minimal() -> Self {
        Self {
            db: DbConfig {
                path: PathBuf::from("./data/spx.sqlite"),
            },
            parser: ParserConfig::default(),
            scan: ScanConfig::default(),
        }
    }

    pub fn parser_options(&self) -> ParserOptions {
        ParserOptions {
            gate: XrefGate {
                relation_keywords: self.parser.relation_keywords.clone(),
                match_bare_ids: self.parser.gate_on_bare_ids,
            },
            context_radius: self.parser.context_radius,
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.parser.context_radius == 0 {
        anyhow::bail!("parser.context_radius must be > 0");
    }

    if let Some(i) = config
        .parser
        .relation_keywords
        .iter()
        .position(|k| k.trim().is_empty())
    {
        anyhow::bail!("parser.relation_keywords[{}] must not be empty", i);
    }

    if config.scan.include_globs.is_empty() {
        anyhow::bail!("scan.include_globs must list at least one pattern");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_text: &str) -> Result<Config> {
        let config: Config = toml::from_str(toml_text)?;
        validate(&config)?;
        Ok(config)
    }

    #[test]
    fn test_minimal_file_gets_defaults() {
        let config = parse("[db]\npath = \"/tmp/x.sqlite\"\n").unwrap();
        assert_eq!(config.parser.context_radius, 30);
        assert_eq!(config.parser.relation_keywords.len(), 7);
        assert!(config.parser.gate_on_bare_ids);
        assert_eq!(config.scan.include_globs, vec!["**/*.md"]);
        assert_eq!(config.parser_options(), ParserOptions::default());
    }

    #[test]
    fn test_parser_section_overrides() {
        let config = parse(
            "[db]\npath = \"x\"\n[parser]\nrelation_keywords = [\"Depends on\"]\ngate_on_bare_ids = false\ncontext_radius = 10\n",
        )
        .unwrap();
        let options = config.parser_options();
        assert_eq!(options.gate.relation_keywords, vec!["Depends on"]);
        assert!(!options.gate.match_bare_ids);
        assert_eq!(options.context_radius, 10);
    }

    #[test]
    fn test_zero_radius_rejected() {
        let err = parse("[db]\npath = \"x\"\n[parser]\ncontext_radius = 0\n").unwrap_err();
        assert!(err.to_string().contains("context_radius"));
    }

    #[test]
    fn test_blank_keyword_rejected() {
        let err =
            parse("[db]\npath = \"x\"\n[parser]\nrelation_keywords = [\"Refines\", \" \"]\n")
                .unwrap_err();
        assert!(err.to_string().contains("relation_keywords[1]"));
    }

    #[test]
    fn test_missing_db_section_fails() {
        assert!(parse("[scan]\ninclude_globs = [\"*.md\"]\n").is_err());
    }
}

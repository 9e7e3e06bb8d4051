//! `spx parse`: run the parser on one file without touching the database.

use anyhow::{bail, Result};
use std::path::Path;

use spec_harness_core::clause::count_marker_lines;
use spec_harness_core::parser::DocumentParser;

use crate::config::Config;
use crate::ingest::{collect_files, IngestOptions};

pub fn run_parse(config: &Config, path: &Path, doc_ref: Option<&str>, json: bool) -> Result<()> {
    if path.is_dir() {
        bail!("spx parse takes a single file; use `spx ingest --dry-run` for directories");
    }
    let options = IngestOptions {
        doc_ref: doc_ref.map(str::to_string),
        ..IngestOptions::default()
    };
    let files = collect_files(config, path, &options)?;
    let Some(file) = files.first() else {
        bail!("nothing to parse at {}", path.display());
    };

    let parser = DocumentParser::new(&config.parser_options());
    let doc = parser.parse(&file.doc_ref, &file.title, &file.text);

    if json {
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    let summary = &doc.summary;
    println!("parse {}", path.display());
    println!("  ref: {}", summary.doc_ref);
    println!("  title: {}", summary.title);
    println!("  version: {}", summary.version.as_deref().unwrap_or("-"));
    println!("  hash: {}", summary.content_hash);
    println!("  sections: {}", doc.sections.len());
    println!("  clauses: {}", doc.clauses.len());
    println!("  xrefs: {}", doc.xrefs.len());
    println!("  markers: {}", count_marker_lines(&file.text));
    Ok(())
}

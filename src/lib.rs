//! # Spec Harness
//!
//! Parses markdown specifications into a section tree, conformance clauses,
//! and cross-references, and ingests them idempotently into SQLite.
//!
//! The parsing and ingestion logic lives in `spec-harness-core`; this crate
//! supplies configuration, the SQLite connection and schema, the SQLite
//! implementation of the core's [`Store`](spec_harness_core::store::Store)
//! boundary, directory scanning, and the `spx` command handlers.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────────┐   ┌──────────────┐
//! │  scan / CLI  │──▶│  core: parse +   │──▶│ SqliteStore  │
//! │  (.md files) │   │  ingest pipeline │   │ (one tx/doc) │
//! └──────────────┘   └──────────────────┘   └──────┬───────┘
//!                                                  │ reindex
//!                                                  ▼
//!                                            ┌──────────┐
//!                                            │  FTS5    │
//!                                            └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! spx init                         # create database
//! spx ingest ./specs               # parse and store every spec
//! spx show kernel --clauses        # inspect one document
//! spx reindex                      # refresh the search sidecar
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite `Store` implementation |
//! | [`scan`] | Directory scanning |
//! | [`ingest`] | `spx ingest` |
//! | [`parse`] | `spx parse` |
//! | [`show`] | `spx show` |
//! | [`stats`] | `spx stats` |
//! | [`reindex`] | `spx reindex` |
//! | [`cards`] | `spx card add` |
//! | [`verify`] | `spx verify` |

pub mod cards;
pub mod config;
pub mod db;
pub mod ingest;
pub mod migrate;
pub mod parse;
pub mod reindex;
pub mod scan;
pub mod show;
pub mod sqlite_store;
pub mod stats;
pub mod verify;

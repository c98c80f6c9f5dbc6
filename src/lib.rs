//! # Access Scan
//!
//! Accessibility and ATS analysis for uploaded documents and live websites.
//!
//! An upload (PDF, DOCX, PPTX, or image) or a URL goes through extraction or
//! a headless-browser DOM snapshot, is scored by a pluggable rule engine,
//! optionally enriched with AI remediation text, and stored as an analysis
//! record scoped to its owner.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌────────────┐   ┌────────────┐   ┌──────────┐
//! │  Upload /  │──▶│ Extractor  │──▶│ Rule       │──▶│ Enricher │
//! │  URL       │   │ or Browser │   │ Engine     │   │ (AI)     │
//! └────────────┘   └────────────┘   └────────────┘   └────┬─────┘
//!                                                          ▼
//!                       ┌──────────┐       ┌──────────┐  ┌────────┐
//!                       │   CLI    │◀──────│ Analyzer │─▶│ SQLite │
//!                       │ (ascan)  │       │          │  └────────┘
//!                       └──────────┘       └────▲─────┘
//!                                               │
//!                                          ┌────┴─────┐
//!                                          │   HTTP   │
//!                                          └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! ascan init                          # create database
//! ascan scan ./resume.docx            # analyze a document
//! ascan scan-url https://example.com  # analyze a website
//! ascan history
//! ascan serve                         # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`upload`] | Upload validation and transient artifact storage |
//! | [`extract`] | Text extraction from PDF, DOCX, PPTX, and images |
//! | [`browser`] | Headless Chromium DOM snapshots |
//! | [`enrich`] | AI remediation suggestions |
//! | [`pipeline`] | The analysis orchestrator |
//! | [`sqlite_store`] | SQLite analysis store |
//! | [`server`] | HTTP API |
//! | [`commands`] | CLI command runners |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//!
//! Scoring rules, models, and the store trait live in `access-scan-core`.

pub mod browser;
pub mod commands;
pub mod config;
pub mod db;
pub mod enrich;
pub mod extract;
pub mod migrate;
pub mod pipeline;
pub mod server;
pub mod sqlite_store;
pub mod upload;

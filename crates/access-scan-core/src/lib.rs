//! # Access Scan Core
//!
//! Shared, I/O-free logic for Access Scan: the analysis data model, the
//! rule engine that turns extracted signals into scores and findings,
//! prompt building and permissive parsing for AI remediation suggestions,
//! and the [`store::AnalysisStore`] abstraction.
//!
//! This crate contains no tokio, sqlx, filesystem, browser, or network
//! dependencies. Everything here is deterministic and unit-testable.

pub mod models;
pub mod rules;
pub mod store;
pub mod suggest;

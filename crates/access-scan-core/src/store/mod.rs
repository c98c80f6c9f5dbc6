//! Storage abstraction for analysis records.
//!
//! The [`AnalysisStore`] trait is the only persistence seam the orchestrator
//! uses. Every owner-facing read and delete is scoped by `(id, owner)` so a
//! record is invisible to anyone but the user who created it.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{AnalysisOutcome, AnalysisRecord, AnalysisSummary, NewAnalysis};

/// Abstract storage backend for analysis records.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`create`](AnalysisStore::create) | Insert a new `Processing` record |
/// | [`find_by_id`](AnalysisStore::find_by_id) | Fetch one record owned by the caller |
/// | [`list_by_owner`](AnalysisStore::list_by_owner) | History, newest first, without findings |
/// | [`update_outcome`](AnalysisStore::update_outcome) | Terminal transition of a record |
/// | [`delete`](AnalysisStore::delete) | Remove a record owned by the caller |
#[async_trait]
pub trait AnalysisStore: Send + Sync {
    /// Insert a new record in `Processing` state and return it.
    async fn create(&self, new: &NewAnalysis) -> Result<AnalysisRecord>;

    /// Fetch a record by ID. Returns `None` if absent or owned by someone else.
    async fn find_by_id(&self, id: &str, owner: &str) -> Result<Option<AnalysisRecord>>;

    /// All records of `owner`, ordered by creation time, newest first.
    async fn list_by_owner(&self, owner: &str) -> Result<Vec<AnalysisSummary>>;

    /// Apply a terminal outcome to the record with this ID.
    ///
    /// Errors if the record does not exist.
    async fn update_outcome(&self, id: &str, outcome: AnalysisOutcome) -> Result<()>;

    /// Delete a record owned by `owner`, returning the removed record.
    ///
    /// Returns `None` (and deletes nothing) if absent or owned by someone else.
    async fn delete(&self, id: &str, owner: &str) -> Result<Option<AnalysisRecord>>;
}

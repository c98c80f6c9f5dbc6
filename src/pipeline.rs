//! Analysis orchestration.
//!
//! [`Analyzer`] drives one analysis per request through
//! `Processing → Completed | Failed`:
//!
//! ```text
//! document: create → extract → score → enrich → complete   (artifact always removed)
//! website:  validate → create → snapshot → score → enrich → complete
//! ```
//!
//! Any error after the record exists is written back as a `Failed` record
//! carrying the error message before it is returned. Each submission runs on
//! its own task, so a caller that goes away mid-analysis (a dropped HTTP
//! request) still leaves the record terminal and the artifact removed.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use access_scan_core::models::{
    AnalysisOutcome, AnalysisRecord, AnalysisStatus, AnalysisSummary, ArtifactKind, NewAnalysis,
    ScoreResult,
};
use access_scan_core::rules::RuleEngine;
use access_scan_core::store::AnalysisStore;

use crate::browser::{DomSnapshotter, NavigationError};
use crate::enrich::Enricher;
use crate::extract::{extract_file, ExtractError};
use crate::upload::{remove_artifact, StoredArtifact, ValidationError};

/// User-visible message for a website that did not load in time.
pub const WEBSITE_TIMEOUT_MESSAGE: &str = "Website analysis failed: Timeout or URL not reachable.";

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Document analysis failed: {0}")]
    Extraction(#[from] ExtractError),
    #[error("Website analysis failed: {0}")]
    Navigation(#[from] NavigationError),
    #[error("storage error: {0:#}")]
    Persistence(anyhow::Error),
    #[error("Report not found or not authorized.")]
    NotFound,
    #[error("Analysis status is {0}. Report not ready.")]
    NotReady(AnalysisStatus),
    #[error("analysis task ended unexpectedly: {0}")]
    Interrupted(String),
}

impl AnalysisError {
    /// Message stored in a `Failed` record for this error.
    pub fn failure_message(&self) -> String {
        match self {
            AnalysisError::Navigation(e) if e.is_timeout() => WEBSITE_TIMEOUT_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

/// Runs a submission to completion on its own task, independent of the
/// caller's future.
async fn detached<F>(task: F) -> Result<AnalysisRecord, AnalysisError>
where
    F: Future<Output = Result<AnalysisRecord, AnalysisError>> + Send + 'static,
{
    tokio::spawn(task)
        .await
        .map_err(|e| AnalysisError::Interrupted(e.to_string()))?
}

/// The orchestrator. Clones share the same store, browser, and rules; it
/// holds no per-request state.
#[derive(Clone)]
pub struct Analyzer {
    store: Arc<dyn AnalysisStore>,
    snapshotter: Arc<dyn DomSnapshotter>,
    enricher: Enricher,
    engine: Arc<RuleEngine>,
    extract_timeout: Duration,
}

impl Analyzer {
    pub fn new(
        store: Arc<dyn AnalysisStore>,
        snapshotter: Arc<dyn DomSnapshotter>,
        enricher: Enricher,
        extract_timeout: Duration,
    ) -> Self {
        Self {
            store,
            snapshotter,
            enricher,
            engine: Arc::new(RuleEngine::standard()),
            extract_timeout,
        }
    }

    /// Replaces the standard rule set.
    pub fn with_engine(mut self, engine: RuleEngine) -> Self {
        self.engine = Arc::new(engine);
        self
    }

    /// Runs the document pipeline for an artifact already in storage.
    ///
    /// The artifact file is removed on every exit path, including when the
    /// returned future is dropped before it resolves.
    pub async fn analyze_document(
        &self,
        owner: &str,
        artifact: StoredArtifact,
    ) -> Result<AnalysisRecord, AnalysisError> {
        let this = self.clone();
        let owner = owner.to_string();
        detached(async move { this.document_task(&owner, artifact).await }).await
    }

    async fn document_task(
        &self,
        owner: &str,
        artifact: StoredArtifact,
    ) -> Result<AnalysisRecord, AnalysisError> {
        let location = artifact.path.to_string_lossy().into_owned();
        let new = NewAnalysis {
            owner: owner.to_string(),
            source_name: artifact.original_name.clone(),
            source_location: location.clone(),
            artifact_kind: artifact.kind,
        };

        let record = match self.store.create(&new).await {
            Ok(r) => r,
            Err(e) => {
                remove_artifact(&location).await;
                return Err(AnalysisError::Persistence(e));
            }
        };
        info!(
            "Analysis {} started: {} ({})",
            record.id, record.source_name, record.artifact_kind
        );

        let outcome = self.run_document(&artifact).await;
        remove_artifact(&location).await;
        self.finish(record, outcome).await
    }

    async fn run_document(&self, artifact: &StoredArtifact) -> Result<ScoreResult, AnalysisError> {
        let content = extract_file(&artifact.path, artifact.kind, self.extract_timeout).await?;
        let mut result = self.engine.score(&content, artifact.kind);
        debug!(
            "Document rules applied: {}",
            self.engine
                .document_rules()
                .iter()
                .map(|r| r.name())
                .collect::<Vec<_>>()
                .join(", ")
        );
        result.findings = self
            .enricher
            .enrich(result.findings, &artifact.original_name)
            .await;
        Ok(result)
    }

    /// Runs the website pipeline. Invalid URLs are rejected before any
    /// record is created. Like documents, the analysis finishes even if the
    /// returned future is dropped.
    pub async fn analyze_website(
        &self,
        owner: &str,
        url: &str,
    ) -> Result<AnalysisRecord, AnalysisError> {
        let this = self.clone();
        let owner = owner.to_string();
        let url = url.to_string();
        detached(async move { this.website_task(&owner, &url).await }).await
    }

    async fn website_task(&self, owner: &str, url: &str) -> Result<AnalysisRecord, AnalysisError> {
        let url = url.trim();
        if url.is_empty() || !url.starts_with("http") {
            return Err(ValidationError::InvalidUrl.into());
        }

        let new = NewAnalysis {
            owner: owner.to_string(),
            source_name: url.to_string(),
            source_location: url.to_string(),
            artifact_kind: ArtifactKind::Website,
        };
        let record = self
            .store
            .create(&new)
            .await
            .map_err(AnalysisError::Persistence)?;
        info!("Analysis {} started: {}", record.id, url);

        let outcome = self.run_website(url).await;
        self.finish(record, outcome).await
    }

    async fn run_website(&self, url: &str) -> Result<ScoreResult, AnalysisError> {
        let snapshot = self.snapshotter.snapshot(url).await?;
        let mut result = self.engine.score_website(&snapshot);
        debug!(
            "Website rules applied: {}",
            self.engine
                .website_rules()
                .iter()
                .map(|r| r.name())
                .collect::<Vec<_>>()
                .join(", ")
        );
        result.findings = self.enricher.enrich(result.findings, url).await;
        Ok(result)
    }

    /// Writes the terminal outcome and returns the final record, or the
    /// pipeline error once the record has been marked `Failed`.
    async fn finish(
        &self,
        mut record: AnalysisRecord,
        outcome: Result<ScoreResult, AnalysisError>,
    ) -> Result<AnalysisRecord, AnalysisError> {
        match outcome {
            Ok(result) => {
                let outcome = AnalysisOutcome::Completed(result);
                if let Err(e) = self.store.update_outcome(&record.id, outcome.clone()).await {
                    error!("Could not store result of analysis {}: {:#}", record.id, e);
                    let failed = AnalysisOutcome::Failed {
                        message: "Analysis result could not be saved.".to_string(),
                    };
                    if let Err(e) = self.store.update_outcome(&record.id, failed).await {
                        error!("Could not mark analysis {} as failed: {:#}", record.id, e);
                    }
                    return Err(AnalysisError::Persistence(e));
                }
                record.apply(outcome, chrono::Utc::now());
                info!(
                    "Analysis {} completed: score={}, findings={}",
                    record.id, record.accessibility_score, record.error_count
                );
                Ok(record)
            }
            Err(err) => {
                let message = err.failure_message();
                warn!("Analysis {} failed: {}", record.id, err);
                if let Err(e) = self
                    .store
                    .update_outcome(&record.id, AnalysisOutcome::Failed { message })
                    .await
                {
                    error!("Could not mark analysis {} as failed: {:#}", record.id, e);
                    return Err(AnalysisError::Persistence(e));
                }
                Err(err)
            }
        }
    }

    /// The caller's records, newest first.
    pub async fn history(&self, owner: &str) -> Result<Vec<AnalysisSummary>, AnalysisError> {
        self.store
            .list_by_owner(owner)
            .await
            .map_err(AnalysisError::Persistence)
    }

    /// A completed record owned by the caller.
    pub async fn report(&self, id: &str, owner: &str) -> Result<AnalysisRecord, AnalysisError> {
        let record = self
            .store
            .find_by_id(id, owner)
            .await
            .map_err(AnalysisError::Persistence)?
            .ok_or(AnalysisError::NotFound)?;

        if record.status != AnalysisStatus::Completed {
            return Err(AnalysisError::NotReady(record.status));
        }
        Ok(record)
    }

    /// Deletes a record owned by the caller along with any local artifact.
    pub async fn delete(&self, id: &str, owner: &str) -> Result<AnalysisRecord, AnalysisError> {
        let record = self
            .store
            .delete(id, owner)
            .await
            .map_err(AnalysisError::Persistence)?
            .ok_or(AnalysisError::NotFound)?;

        remove_artifact(&record.source_location).await;
        info!("Deleted analysis {}", record.id);
        Ok(record)
    }
}

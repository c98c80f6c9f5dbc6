//! Core data models used throughout Access Scan.
//!
//! These types describe the persisted analysis records, the findings the
//! rule engine produces, and the ephemeral signals that flow from the
//! extractors into scoring.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of artifact submitted for analysis. Immutable once a record exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Pdf,
    Docx,
    Pptx,
    Image,
    Website,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Pdf => "pdf",
            ArtifactKind::Docx => "docx",
            ArtifactKind::Pptx => "pptx",
            ArtifactKind::Image => "image",
            ArtifactKind::Website => "website",
        }
    }

    /// Resume-like kinds that receive an ATS score.
    pub fn is_document_family(&self) -> bool {
        matches!(
            self,
            ArtifactKind::Pdf | ArtifactKind::Docx | ArtifactKind::Pptx
        )
    }

    /// Maps an upload file extension (without the dot, any case) to a kind.
    ///
    /// Returns `None` for anything outside `pdf, docx, pptx, jpg, jpeg, png`.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(ArtifactKind::Pdf),
            "docx" => Some(ArtifactKind::Docx),
            "pptx" => Some(ArtifactKind::Pptx),
            "jpg" | "jpeg" | "png" => Some(ArtifactKind::Image),
            _ => None,
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pdf" => Ok(ArtifactKind::Pdf),
            "docx" => Ok(ArtifactKind::Docx),
            "pptx" => Ok(ArtifactKind::Pptx),
            "image" => Ok(ArtifactKind::Image),
            "website" => Ok(ArtifactKind::Website),
            other => Err(format!("unknown artifact kind: {}", other)),
        }
    }
}

/// Lifecycle state of an analysis. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisStatus {
    Processing,
    Completed,
    Failed,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStatus::Processing => "Processing",
            AnalysisStatus::Completed => "Completed",
            AnalysisStatus::Failed => "Failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, AnalysisStatus::Processing)
    }
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Processing" => Ok(AnalysisStatus::Processing),
            "Completed" => Ok(AnalysisStatus::Completed),
            "Failed" => Ok(AnalysisStatus::Failed),
            other => Err(format!("unknown analysis status: {}", other)),
        }
    }
}

/// Ordinal severity of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// One detected issue.
///
/// `code` is stable across runs for the same rule. `suggestion` starts as the
/// rule's generic default and may be replaced by AI enrichment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub code: String,
    pub message: String,
    pub priority: Priority,
    pub suggestion: String,
}

impl Finding {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        priority: Priority,
        suggestion: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            priority,
            suggestion: suggestion.into(),
        }
    }
}

/// Report payload of a terminal record.
///
/// Serialized untagged: a completed record carries a JSON array of findings,
/// a failed one carries `{ "message": ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReportData {
    Findings(Vec<Finding>),
    Failure { message: String },
}

/// Output of the rule engine for one artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreResult {
    pub accessibility_score: u8,
    pub ats_score: Option<u8>,
    pub findings: Vec<Finding>,
}

impl ScoreResult {
    pub fn error_count(&self) -> u32 {
        self.findings.len() as u32
    }
}

/// Terminal transition applied to a `Processing` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisOutcome {
    Completed(ScoreResult),
    Failed { message: String },
}

/// Fields supplied when a new record is created.
#[derive(Debug, Clone)]
pub struct NewAnalysis {
    pub owner: String,
    pub source_name: String,
    pub source_location: String,
    pub artifact_kind: ArtifactKind,
}

/// The persisted unit of work.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRecord {
    pub id: String,
    pub owner: String,
    pub source_name: String,
    pub source_location: String,
    pub artifact_kind: ArtifactKind,
    pub status: AnalysisStatus,
    pub accessibility_score: u8,
    pub ats_score: Option<u8>,
    pub error_count: u32,
    pub findings: Option<ReportData>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AnalysisRecord {
    /// Builds a fresh `Processing` record with default scores.
    pub fn pending(id: String, new: &NewAnalysis, now: DateTime<Utc>) -> Self {
        Self {
            id,
            owner: new.owner.clone(),
            source_name: new.source_name.clone(),
            source_location: new.source_location.clone(),
            artifact_kind: new.artifact_kind,
            status: AnalysisStatus::Processing,
            accessibility_score: 0,
            ats_score: None,
            error_count: 0,
            findings: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a terminal outcome in place.
    ///
    /// `ats_score` is only kept for document-family kinds and `error_count`
    /// always equals the number of stored findings on completion.
    pub fn apply(&mut self, outcome: AnalysisOutcome, now: DateTime<Utc>) {
        match outcome {
            AnalysisOutcome::Completed(result) => {
                self.status = AnalysisStatus::Completed;
                self.accessibility_score = result.accessibility_score;
                self.ats_score = if self.artifact_kind.is_document_family() {
                    result.ats_score
                } else {
                    None
                };
                self.error_count = result.error_count();
                self.findings = Some(ReportData::Findings(result.findings));
            }
            AnalysisOutcome::Failed { message } => {
                self.status = AnalysisStatus::Failed;
                self.findings = Some(ReportData::Failure { message });
            }
        }
        self.updated_at = now;
    }

    pub fn summary(&self) -> AnalysisSummary {
        AnalysisSummary {
            id: self.id.clone(),
            source_name: self.source_name.clone(),
            artifact_kind: self.artifact_kind,
            status: self.status,
            accessibility_score: self.accessibility_score,
            ats_score: self.ats_score,
            error_count: self.error_count,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// History view of a record: findings and internal fields omitted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisSummary {
    pub id: String,
    pub source_name: String,
    pub artifact_kind: ArtifactKind,
    pub status: AnalysisStatus,
    pub accessibility_score: u8,
    pub ats_score: Option<u8>,
    pub error_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Kind-specific structural facts gathered during extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContentMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slides: Option<u32>,
}

/// Normalized output of a content extractor. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedContent {
    pub full_text: String,
    pub metadata: ContentMetadata,
}

impl ExtractedContent {
    pub fn text(full_text: impl Into<String>) -> Self {
        Self {
            full_text: full_text.into(),
            metadata: ContentMetadata::default(),
        }
    }
}

/// Accessibility-relevant counts captured from a rendered page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomSnapshot {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub images: u32,
    #[serde(default)]
    pub alt_attributes: u32,
    #[serde(default)]
    pub h1_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_analysis(kind: ArtifactKind) -> NewAnalysis {
        NewAnalysis {
            owner: "u1".to_string(),
            source_name: "cv.pdf".to_string(),
            source_location: "/tmp/cv.pdf".to_string(),
            artifact_kind: kind,
        }
    }

    #[test]
    fn extension_mapping_is_case_insensitive() {
        assert_eq!(ArtifactKind::from_extension("PDF"), Some(ArtifactKind::Pdf));
        assert_eq!(ArtifactKind::from_extension("Jpeg"), Some(ArtifactKind::Image));
        assert_eq!(ArtifactKind::from_extension("png"), Some(ArtifactKind::Image));
        assert_eq!(ArtifactKind::from_extension("txt"), None);
        assert_eq!(ArtifactKind::from_extension("website"), None);
    }

    #[test]
    fn kind_and_status_parse_their_own_names() {
        for kind in [
            ArtifactKind::Pdf,
            ArtifactKind::Docx,
            ArtifactKind::Pptx,
            ArtifactKind::Image,
            ArtifactKind::Website,
        ] {
            assert_eq!(kind.as_str().parse::<ArtifactKind>(), Ok(kind));
        }
        assert_eq!("Failed".parse::<AnalysisStatus>(), Ok(AnalysisStatus::Failed));
        assert!("failed".parse::<AnalysisStatus>().is_err());
    }

    #[test]
    fn completion_drops_ats_for_non_document_kinds() {
        let mut record = AnalysisRecord::pending(
            "a".to_string(),
            &new_analysis(ArtifactKind::Image),
            Utc::now(),
        );
        record.apply(
            AnalysisOutcome::Completed(ScoreResult {
                accessibility_score: 85,
                ats_score: Some(50),
                findings: vec![Finding::new("I01", "m", Priority::Low, "s")],
            }),
            Utc::now(),
        );
        assert_eq!(record.status, AnalysisStatus::Completed);
        assert_eq!(record.ats_score, None);
        assert_eq!(record.error_count, 1);
    }

    #[test]
    fn failure_serializes_as_message_object() {
        let mut record = AnalysisRecord::pending(
            "a".to_string(),
            &new_analysis(ArtifactKind::Pdf),
            Utc::now(),
        );
        record.apply(
            AnalysisOutcome::Failed {
                message: "boom".to_string(),
            },
            Utc::now(),
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["status"], "Failed");
        assert_eq!(json["findings"]["message"], "boom");
    }

    #[test]
    fn dom_snapshot_reads_browser_field_names() {
        let snap: DomSnapshot = serde_json::from_str(
            r#"{"title":"Home","images":3,"altAttributes":2,"h1Count":1}"#,
        )
        .unwrap();
        assert_eq!(snap.title.as_deref(), Some("Home"));
        assert_eq!(snap.alt_attributes, 2);
        assert_eq!(snap.h1_count, 1);
    }
}

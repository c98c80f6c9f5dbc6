//! SQLite-backed [`AnalysisStore`] implementation.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use access_scan_core::models::{
    AnalysisOutcome, AnalysisRecord, AnalysisStatus, AnalysisSummary, ArtifactKind, Finding,
    NewAnalysis, ReportData,
};
use access_scan_core::store::AnalysisStore;

/// SQLite implementation of the [`AnalysisStore`] trait.
///
/// Wraps a [`SqlitePool`]; the `analyses` table is created by
/// [`crate::migrate`].
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

const RECORD_COLUMNS: &str = "id, owner, source_name, source_location, artifact_kind, status, \
     accessibility_score, ats_score, error_count, findings_json, failure_message, \
     created_at, updated_at";

fn ts_from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

fn score_from_db(value: i64) -> u8 {
    value.clamp(0, 100) as u8
}

fn parse_kind(row: &SqliteRow) -> Result<ArtifactKind> {
    let raw: String = row.get("artifact_kind");
    raw.parse::<ArtifactKind>().map_err(|e| anyhow!(e))
}

fn parse_status(row: &SqliteRow) -> Result<AnalysisStatus> {
    let raw: String = row.get("status");
    raw.parse::<AnalysisStatus>().map_err(|e| anyhow!(e))
}

fn record_from_row(row: &SqliteRow) -> Result<AnalysisRecord> {
    let status = parse_status(row)?;
    let findings = match status {
        AnalysisStatus::Processing => None,
        AnalysisStatus::Completed => {
            let json: Option<String> = row.get("findings_json");
            let list: Vec<Finding> = match json {
                Some(j) => serde_json::from_str(&j).context("Corrupt findings_json column")?,
                None => Vec::new(),
            };
            Some(ReportData::Findings(list))
        }
        AnalysisStatus::Failed => {
            let message: Option<String> = row.get("failure_message");
            Some(ReportData::Failure {
                message: message.unwrap_or_default(),
            })
        }
    };

    Ok(AnalysisRecord {
        id: row.get("id"),
        owner: row.get("owner"),
        source_name: row.get("source_name"),
        source_location: row.get("source_location"),
        artifact_kind: parse_kind(row)?,
        status,
        accessibility_score: score_from_db(row.get("accessibility_score")),
        ats_score: row
            .get::<Option<i64>, _>("ats_score")
            .map(score_from_db),
        error_count: row.get::<i64, _>("error_count").max(0) as u32,
        findings,
        created_at: ts_from_millis(row.get("created_at")),
        updated_at: ts_from_millis(row.get("updated_at")),
    })
}

#[async_trait]
impl AnalysisStore for SqliteStore {
    async fn create(&self, new: &NewAnalysis) -> Result<AnalysisRecord> {
        let record = AnalysisRecord::pending(uuid::Uuid::new_v4().to_string(), new, Utc::now());
        let ts = record.created_at.timestamp_millis();

        sqlx::query(
            r#"
            INSERT INTO analyses (id, owner, source_name, source_location, artifact_kind,
                                  status, accessibility_score, ats_score, error_count,
                                  created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, 0, NULL, 0, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.owner)
        .bind(&record.source_name)
        .bind(&record.source_location)
        .bind(record.artifact_kind.as_str())
        .bind(record.status.as_str())
        .bind(ts)
        .bind(ts)
        .execute(&self.pool)
        .await?;

        Ok(record)
    }

    async fn find_by_id(&self, id: &str, owner: &str) -> Result<Option<AnalysisRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM analyses WHERE id = ? AND owner = ?",
            RECORD_COLUMNS
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(record_from_row).transpose()
    }

    async fn list_by_owner(&self, owner: &str) -> Result<Vec<AnalysisSummary>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM analyses WHERE owner = ? ORDER BY created_at DESC, rowid DESC",
            RECORD_COLUMNS
        ))
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| record_from_row(row).map(|r| r.summary()))
            .collect()
    }

    async fn update_outcome(&self, id: &str, outcome: AnalysisOutcome) -> Result<()> {
        let now = Utc::now().timestamp_millis();

        let result = match outcome {
            AnalysisOutcome::Completed(result) => {
                let kind_row = sqlx::query("SELECT artifact_kind FROM analyses WHERE id = ?")
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?;
                let kind = match kind_row {
                    Some(row) => parse_kind(&row)?,
                    None => bail!("analysis not found: {}", id),
                };
                let ats = if kind.is_document_family() {
                    result.ats_score.map(i64::from)
                } else {
                    None
                };
                let findings_json = serde_json::to_string(&result.findings)?;

                sqlx::query(
                    r#"
                    UPDATE analyses SET
                        status = ?,
                        accessibility_score = ?,
                        ats_score = ?,
                        error_count = ?,
                        findings_json = ?,
                        failure_message = NULL,
                        updated_at = ?
                    WHERE id = ?
                    "#,
                )
                .bind(AnalysisStatus::Completed.as_str())
                .bind(i64::from(result.accessibility_score))
                .bind(ats)
                .bind(i64::from(result.error_count()))
                .bind(findings_json)
                .bind(now)
                .bind(id)
                .execute(&self.pool)
                .await?
            }
            AnalysisOutcome::Failed { message } => {
                sqlx::query(
                    r#"
                    UPDATE analyses SET
                        status = ?,
                        findings_json = NULL,
                        failure_message = ?,
                        updated_at = ?
                    WHERE id = ?
                    "#,
                )
                .bind(AnalysisStatus::Failed.as_str())
                .bind(message)
                .bind(now)
                .bind(id)
                .execute(&self.pool)
                .await?
            }
        };

        if result.rows_affected() == 0 {
            bail!("analysis not found: {}", id);
        }
        Ok(())
    }

    async fn delete(&self, id: &str, owner: &str) -> Result<Option<AnalysisRecord>> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            "SELECT {} FROM analyses WHERE id = ? AND owner = ?",
            RECORD_COLUMNS
        ))
        .bind(id)
        .bind(owner)
        .fetch_optional(&mut *tx)
        .await?;

        let record = match row {
            Some(row) => record_from_row(&row)?,
            None => return Ok(None),
        };

        sqlx::query("DELETE FROM analyses WHERE id = ? AND owner = ?")
            .bind(id)
            .bind(owner)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(Some(record))
    }
}

//! In-memory [`AnalysisStore`] implementation for tests and embedding.
//!
//! Records live in a `Vec` behind `std::sync::RwLock`, kept in insertion
//! order so history listing can break creation-time ties newest-first.

use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;

use crate::models::{AnalysisOutcome, AnalysisRecord, AnalysisSummary, NewAnalysis};

use super::AnalysisStore;

/// In-memory store for tests.
pub struct InMemoryStore {
    records: RwLock<Vec<AnalysisRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }

    /// Number of stored records, across all owners.
    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Unscoped lookup, for assertions in tests.
    pub fn get_unscoped(&self, id: &str) -> Option<AnalysisRecord> {
        self.records
            .read()
            .ok()?
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("in-memory store lock poisoned")
}

#[async_trait]
impl AnalysisStore for InMemoryStore {
    async fn create(&self, new: &NewAnalysis) -> Result<AnalysisRecord> {
        let record = AnalysisRecord::pending(uuid::Uuid::new_v4().to_string(), new, Utc::now());
        self.records.write().map_err(poisoned)?.push(record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: &str, owner: &str) -> Result<Option<AnalysisRecord>> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records
            .iter()
            .find(|r| r.id == id && r.owner == owner)
            .cloned())
    }

    async fn list_by_owner(&self, owner: &str) -> Result<Vec<AnalysisSummary>> {
        let records = self.records.read().map_err(poisoned)?;
        let mut owned: Vec<&AnalysisRecord> =
            records.iter().rev().filter(|r| r.owner == owner).collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned.into_iter().map(AnalysisRecord::summary).collect())
    }

    async fn update_outcome(&self, id: &str, outcome: AnalysisOutcome) -> Result<()> {
        let mut records = self.records.write().map_err(poisoned)?;
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| anyhow!("analysis not found: {}", id))?;
        record.apply(outcome, Utc::now());
        Ok(())
    }

    async fn delete(&self, id: &str, owner: &str) -> Result<Option<AnalysisRecord>> {
        let mut records = self.records.write().map_err(poisoned)?;
        match records.iter().position(|r| r.id == id && r.owner == owner) {
            Some(idx) => Ok(Some(records.remove(idx))),
            None => Ok(None),
        }
    }
}

//! CLI entry points for `ascan scan`, `scan-url`, `history`, `report`, and
//! `delete`. Each builds the production [`Analyzer`] and prints to stdout.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use access_scan_core::models::{AnalysisRecord, Priority, ReportData};

use crate::browser::ChromeSnapshotter;
use crate::config::Config;
use crate::db;
use crate::enrich::Enricher;
use crate::migrate;
use crate::pipeline::{AnalysisError, Analyzer};
use crate::sqlite_store::SqliteStore;
use crate::upload::ArtifactStorage;

/// Wires the SQLite store, headless browser, and enricher into an [`Analyzer`].
///
/// The schema is applied first, so commands work against a fresh database.
pub async fn build_analyzer(config: &Config) -> Result<Analyzer> {
    let pool = db::connect(config).await?;
    migrate::apply_schema(&pool).await?;
    let store = Arc::new(SqliteStore::new(pool));
    let snapshotter = Arc::new(ChromeSnapshotter::new(&config.browser));
    let enricher = Enricher::from_config(&config.enrichment)?;
    Ok(Analyzer::new(
        store,
        snapshotter,
        enricher,
        Duration::from_secs(config.storage.extract_timeout_secs),
    ))
}

fn fail(err: AnalysisError) -> ! {
    eprintln!("Error: {}", err);
    std::process::exit(1);
}

pub async fn run_scan(config: &Config, file: &Path, owner: &str) -> Result<()> {
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    // Open the store before writing the artifact so a setup failure
    // leaves nothing behind in the upload directory.
    let analyzer = build_analyzer(config).await?;
    let storage = ArtifactStorage::new(&config.storage);
    let artifact = match storage.store(&name, &bytes).await {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    match analyzer.analyze_document(owner, artifact).await {
        Ok(record) => print_record(&record),
        Err(e) => fail(e),
    }
    Ok(())
}

pub async fn run_scan_url(config: &Config, url: &str, owner: &str) -> Result<()> {
    let analyzer = build_analyzer(config).await?;
    match analyzer.analyze_website(owner, url).await {
        Ok(record) => print_record(&record),
        Err(e) => fail(e),
    }
    Ok(())
}

pub async fn run_history(config: &Config, owner: &str) -> Result<()> {
    let analyzer = build_analyzer(config).await?;
    let history = analyzer.history(owner).await?;

    if history.is_empty() {
        println!("No analyses for {}.", owner);
        return Ok(());
    }

    println!(
        "{:<36}  {:<8} {:<10} {:>5} {:>5} {:>6}  SOURCE",
        "ID", "KIND", "STATUS", "SCORE", "ATS", "ISSUES"
    );
    for s in history {
        println!(
            "{:<36}  {:<8} {:<10} {:>5} {:>5} {:>6}  {}",
            s.id,
            s.artifact_kind,
            s.status,
            s.accessibility_score,
            s.ats_score.map(|a| a.to_string()).unwrap_or_else(|| "-".into()),
            s.error_count,
            s.source_name
        );
    }
    Ok(())
}

pub async fn run_report(config: &Config, id: &str, owner: &str) -> Result<()> {
    let analyzer = build_analyzer(config).await?;
    match analyzer.report(id, owner).await {
        Ok(record) => print_record(&record),
        Err(e) => fail(e),
    }
    Ok(())
}

pub async fn run_delete(config: &Config, id: &str, owner: &str) -> Result<()> {
    let analyzer = build_analyzer(config).await?;
    match analyzer.delete(id, owner).await {
        Ok(record) => println!("Deleted analysis {} ({})", record.id, record.source_name),
        Err(e) => fail(e),
    }
    Ok(())
}

fn print_record(record: &AnalysisRecord) {
    println!("--- Analysis ---");
    println!("id:                  {}", record.id);
    println!("source:              {}", record.source_name);
    println!("kind:                {}", record.artifact_kind);
    println!("status:              {}", record.status);
    println!("accessibility_score: {}", record.accessibility_score);
    if let Some(ats) = record.ats_score {
        println!("ats_score:           {}", ats);
    }
    println!("error_count:         {}", record.error_count);
    println!(
        "created_at:          {}",
        record.created_at.format("%Y-%m-%dT%H:%M:%SZ")
    );

    if let Some(ReportData::Findings(ref findings)) = record.findings {
        println!();
        println!("--- Findings ({}) ---", findings.len());
        for f in findings {
            let priority = match f.priority {
                Priority::High => "HIGH",
                Priority::Medium => "MEDIUM",
                Priority::Low => "LOW",
            };
            println!("[{}] {:<6} {}", f.code, priority, f.message);
            println!("    fix: {}", f.suggestion);
        }
    }
}

//! DOM snapshots of live websites via headless Chromium.
//!
//! Every snapshot launches a fresh browser with its own temporary profile
//! directory, navigates under a hard time bound, evaluates a read-only
//! script, and closes the browser before returning, whatever the outcome.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as ChromeConfig};
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use futures::StreamExt;
use tracing::{debug, info, warn};

use access_scan_core::models::DomSnapshot;

use crate::config::BrowserConfig;

/// Resolves once the document has been parsed. Subresources such as images
/// and late scripts are not waited for.
const DOM_READY_SCRIPT: &str = r#"
new Promise((resolve) => {
    if (document.readyState === 'interactive' || document.readyState === 'complete') {
        resolve(document.readyState);
    } else {
        document.addEventListener('DOMContentLoaded', () => resolve(document.readyState));
    }
})
"#;

/// Upper bound on each browser shutdown step.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Read-only script evaluated in the loaded page.
const SNAPSHOT_SCRIPT: &str = r#"
(() => {
    const images = Array.from(document.querySelectorAll('img'));
    const withAlt = images.filter(img => img.alt && img.alt.trim() !== '').length;
    return {
        title: document.title,
        images: images.length,
        altAttributes: withAlt,
        h1Count: document.querySelectorAll('h1').length,
    };
})()
"#;

#[derive(Debug, thiserror::Error)]
pub enum NavigationError {
    #[error("navigation timed out after {0}s")]
    Timeout(u64),
    #[error("failed to launch browser: {0}")]
    Launch(String),
    #[error("navigation failed: {0}")]
    Navigate(String),
    #[error("DOM snapshot failed: {0}")]
    Snapshot(String),
}

impl NavigationError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, NavigationError::Timeout(_))
    }
}

/// Produces a [`DomSnapshot`] for a URL.
#[async_trait]
pub trait DomSnapshotter: Send + Sync {
    async fn snapshot(&self, url: &str) -> Result<DomSnapshot, NavigationError>;
}

/// [`DomSnapshotter`] backed by a per-request headless Chromium.
pub struct ChromeSnapshotter {
    navigation_timeout: Duration,
    chrome_path: Option<PathBuf>,
    sandbox: bool,
}

impl ChromeSnapshotter {
    pub fn new(config: &BrowserConfig) -> Self {
        Self {
            navigation_timeout: Duration::from_secs(config.navigation_timeout_secs),
            chrome_path: config.chrome_path.clone(),
            sandbox: config.sandbox,
        }
    }

    fn browser_config(&self, profile_dir: &std::path::Path) -> Result<ChromeConfig, NavigationError> {
        let mut builder = ChromeConfig::builder()
            .user_data_dir(profile_dir)
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-background-networking")
            .arg("--disable-sync")
            .arg("--disable-extensions");

        if !self.sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(ref path) = self.chrome_path {
            builder = builder.chrome_executable(path);
        }

        builder.build().map_err(NavigationError::Launch)
    }
}

/// Opens a blank page, navigates to `url`, and evaluates the snapshot script.
async fn capture(browser: &Browser, url: &str) -> Result<DomSnapshot, NavigationError> {
    let page = browser
        .new_page("about:blank")
        .await
        .map_err(|e| NavigationError::Navigate(e.to_string()))?;

    let result = async {
        let params = NavigateParams::builder()
            .url(url)
            .build()
            .map_err(|e| NavigationError::Navigate(format!("{}: {}", url, e)))?;
        let nav = page
            .execute(params)
            .await
            .map_err(|e| NavigationError::Navigate(format!("{}: {}", url, e)))?;
        if let Some(ref text) = nav.result.error_text {
            return Err(NavigationError::Navigate(format!("{}: {}", url, text)));
        }

        let state = page
            .evaluate(DOM_READY_SCRIPT)
            .await
            .map_err(|e| NavigationError::Navigate(format!("{}: {}", url, e)))?
            .into_value::<String>()
            .unwrap_or_else(|_| "unknown".to_string());
        debug!("Page {} ready state: {}", url, state);

        page.evaluate(SNAPSHOT_SCRIPT)
            .await
            .map_err(|e| NavigationError::Snapshot(e.to_string()))?
            .into_value::<DomSnapshot>()
            .map_err(|e| NavigationError::Snapshot(e.to_string()))
    }
    .await;

    if let Err(e) = page.close().await {
        debug!("Page close failed: {}", e);
    }
    result
}

/// Awaits one shutdown step for at most `limit`. Returns `false` if the step
/// did not finish in time.
async fn bounded_step<F, T, E>(limit: Duration, step: F, what: &str) -> bool
where
    F: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    match tokio::time::timeout(limit, step).await {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            warn!("Browser {} failed: {}", what, e);
            true
        }
        Err(_) => {
            warn!("Browser {} did not finish within {}s", what, limit.as_secs());
            false
        }
    }
}

#[async_trait]
impl DomSnapshotter for ChromeSnapshotter {
    async fn snapshot(&self, url: &str) -> Result<DomSnapshot, NavigationError> {
        let profile = tempfile::Builder::new()
            .prefix("ascan-chrome-")
            .tempdir()
            .map_err(|e| NavigationError::Launch(e.to_string()))?;
        let config = self.browser_config(profile.path())?;

        info!("Launching headless browser for {}", url);
        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| NavigationError::Launch(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let secs = self.navigation_timeout.as_secs();
        let result = match tokio::time::timeout(self.navigation_timeout, capture(&browser, url)).await
        {
            Ok(r) => r,
            Err(_) => Err(NavigationError::Timeout(secs)),
        };

        // A browser that ignores close is left to be reaped when dropped.
        if bounded_step(SHUTDOWN_TIMEOUT, browser.close(), "close").await {
            bounded_step(SHUTDOWN_TIMEOUT, browser.wait(), "exit").await;
        }
        handler_task.abort();

        match &result {
            Ok(snap) => debug!(
                "Snapshot of {}: {} images, {} with alt, {} h1",
                url, snap.images, snap.alt_attributes, snap.h1_count
            ),
            Err(e) => warn!("Snapshot of {} failed: {}", url, e),
        }
        result
    }
}

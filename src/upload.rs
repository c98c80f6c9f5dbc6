//! Transient storage for uploaded artifacts.
//!
//! Uploads are validated (extension allow-list, size cap), written under the
//! configured upload directory with a collision-resistant name, and removed
//! by the orchestrator once analysis ends.

use std::path::{Path, PathBuf};

use access_scan_core::models::ArtifactKind;
use tracing::{debug, warn};

use crate::config::StorageConfig;

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("No file uploaded")]
    MissingFile,
    #[error("Only PDF, DOCX, PPTX, and image files are allowed (got '{0}')")]
    UnsupportedType(String),
    #[error("File exceeds the {limit_mb} MB upload limit")]
    TooLarge { limit_mb: u64 },
    #[error("Invalid or missing website URL (must start with http/https)")]
    InvalidUrl,
}

/// Failure to accept an upload.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("failed to write upload: {0}")]
    Io(#[from] std::io::Error),
}

/// An artifact written to local storage and awaiting analysis.
#[derive(Debug, Clone)]
pub struct StoredArtifact {
    pub original_name: String,
    pub path: PathBuf,
    pub kind: ArtifactKind,
}

/// Writes uploads into a single directory.
#[derive(Debug, Clone)]
pub struct ArtifactStorage {
    dir: PathBuf,
    max_bytes: u64,
    max_mb: u64,
}

impl ArtifactStorage {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            dir: config.upload_dir.clone(),
            max_bytes: config.max_upload_bytes(),
            max_mb: config.max_upload_mb,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Determines the artifact kind from the original filename.
    pub fn classify(original_name: &str) -> Result<(ArtifactKind, String), ValidationError> {
        let ext = Path::new(original_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .ok_or_else(|| ValidationError::UnsupportedType(original_name.to_string()))?;
        let kind = ArtifactKind::from_extension(&ext)
            .ok_or_else(|| ValidationError::UnsupportedType(original_name.to_string()))?;
        Ok((kind, ext))
    }

    /// Validates and writes an upload, returning where it landed.
    pub async fn store(
        &self,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<StoredArtifact, UploadError> {
        if bytes.is_empty() || original_name.trim().is_empty() {
            return Err(ValidationError::MissingFile.into());
        }
        if bytes.len() as u64 > self.max_bytes {
            return Err(ValidationError::TooLarge {
                limit_mb: self.max_mb,
            }
            .into());
        }
        let (kind, ext) = Self::classify(original_name)?;

        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(unique_name(&ext));
        tokio::fs::write(&path, bytes).await?;
        debug!("Stored upload {} at {}", original_name, path.display());

        Ok(StoredArtifact {
            original_name: original_name.to_string(),
            path,
            kind,
        })
    }
}

/// `document-<unix millis>-<8 random hex>.<ext>`
fn unique_name(ext: &str) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "document-{}-{}.{}",
        chrono::Utc::now().timestamp_millis(),
        &suffix[..8],
        ext
    )
}

/// Whether a stored location refers to a remote URL rather than a local file.
pub fn is_remote_location(location: &str) -> bool {
    location.starts_with("http")
}

/// Best-effort removal of a local artifact. URLs are skipped; errors are logged.
pub async fn remove_artifact(location: &str) {
    if location.is_empty() || is_remote_location(location) {
        return;
    }
    match tokio::fs::remove_file(location).await {
        Ok(()) => debug!("Removed artifact {}", location),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to delete artifact {}: {}", location, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage(dir: &Path, max_mb: u64) -> ArtifactStorage {
        ArtifactStorage::new(&StorageConfig {
            upload_dir: dir.to_path_buf(),
            max_upload_mb: max_mb,
            extract_timeout_secs: 10,
        })
    }

    #[test]
    fn classify_accepts_allowed_extensions() {
        assert_eq!(
            ArtifactStorage::classify("Resume.PDF").unwrap().0,
            ArtifactKind::Pdf
        );
        assert_eq!(
            ArtifactStorage::classify("photo.jpeg").unwrap().0,
            ArtifactKind::Image
        );
        assert!(ArtifactStorage::classify("notes.txt").is_err());
        assert!(ArtifactStorage::classify("no_extension").is_err());
    }

    #[tokio::test]
    async fn store_writes_unique_files() {
        let tmp = tempfile::TempDir::new().unwrap();
        let storage = storage(tmp.path(), 1);

        let a = storage.store("cv.docx", b"abc").await.unwrap();
        let b = storage.store("cv.docx", b"abc").await.unwrap();
        assert_ne!(a.path, b.path);
        assert_eq!(a.kind, ArtifactKind::Docx);
        assert!(a.path.to_string_lossy().ends_with(".docx"));
        assert_eq!(std::fs::read(&a.path).unwrap(), b"abc");

        remove_artifact(&a.path.to_string_lossy()).await;
        assert!(!a.path.exists());
        // Second removal is silent.
        remove_artifact(&a.path.to_string_lossy()).await;
    }

    #[tokio::test]
    async fn store_rejects_invalid_uploads() {
        let tmp = tempfile::TempDir::new().unwrap();
        let storage = storage(tmp.path(), 1);

        let empty = storage.store("cv.pdf", b"").await.unwrap_err();
        assert!(matches!(empty, UploadError::Invalid(ValidationError::MissingFile)));

        let big = vec![0u8; 1024 * 1024 + 1];
        let too_big = storage.store("cv.pdf", &big).await.unwrap_err();
        assert!(matches!(
            too_big,
            UploadError::Invalid(ValidationError::TooLarge { limit_mb: 1 })
        ));

        let wrong = storage.store("cv.exe", b"MZ").await.unwrap_err();
        assert!(matches!(
            wrong,
            UploadError::Invalid(ValidationError::UnsupportedType(_))
        ));

        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn urls_are_remote() {
        assert!(is_remote_location("https://example.com"));
        assert!(!is_remote_location("/var/uploads/document-1.pdf"));
    }
}

//! Content extraction for uploaded artifacts (PDF, OOXML, images).
//!
//! Each artifact kind has its own strategy; all return an
//! [`ExtractedContent`] of plain UTF-8 text plus structural metadata.
//! Websites are not file-based and go through [`crate::browser`] instead.
//!
//! Parsing runs on the blocking pool under a time bound so a pathological
//! file cannot stall the request indefinitely.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use access_scan_core::models::{ArtifactKind, ContentMetadata, ExtractedContent};

/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("file not found at path: {}", .0.display())]
    Missing(PathBuf),
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported kind: {0}")]
    UnsupportedKind(ArtifactKind),
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("OOXML extraction failed: {0}")]
    Ooxml(String),
    #[error("extraction timed out after {0}s")]
    TimedOut(u64),
    #[error("extraction task failed: {0}")]
    Task(String),
}

/// Reads the artifact at `path` and extracts its content.
///
/// Fails with [`ExtractError::Missing`] when the file does not exist and
/// [`ExtractError::UnsupportedKind`] for [`ArtifactKind::Website`].
pub async fn extract_file(
    path: &Path,
    kind: ArtifactKind,
    timeout: Duration,
) -> Result<ExtractedContent, ExtractError> {
    if kind == ArtifactKind::Website {
        return Err(ExtractError::UnsupportedKind(kind));
    }

    let bytes = match tokio::fs::read(path).await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ExtractError::Missing(path.to_path_buf()))
        }
        Err(e) => {
            return Err(ExtractError::Read {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };

    let task = tokio::task::spawn_blocking(move || extract_bytes(&bytes, kind));
    match tokio::time::timeout(timeout, task).await {
        Err(_) => Err(ExtractError::TimedOut(timeout.as_secs())),
        Ok(Err(join)) if join.is_panic() => Err(match kind {
            ArtifactKind::Pdf => ExtractError::Pdf("parser panicked on malformed input".into()),
            _ => ExtractError::Task("parser panicked".into()),
        }),
        Ok(Err(join)) => Err(ExtractError::Task(join.to_string())),
        Ok(Ok(result)) => result,
    }
}

/// Extracts content from in-memory bytes of a known kind.
pub fn extract_bytes(bytes: &[u8], kind: ArtifactKind) -> Result<ExtractedContent, ExtractError> {
    match kind {
        ArtifactKind::Pdf => extract_pdf(bytes),
        ArtifactKind::Docx => extract_docx(bytes),
        ArtifactKind::Pptx => extract_pptx(bytes),
        ArtifactKind::Image => Ok(image_placeholder(bytes.len())),
        ArtifactKind::Website => Err(ExtractError::UnsupportedKind(kind)),
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<ExtractedContent, ExtractError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| ExtractError::Pdf(e.to_string()))?;
    let page_count = pages.len() as u32;
    Ok(ExtractedContent {
        full_text: pages.concat(),
        metadata: ContentMetadata {
            pages: (page_count > 0).then_some(page_count),
            slides: None,
        },
    })
}

/// OCR is not performed. The text only records the file size.
fn image_placeholder(len: usize) -> ExtractedContent {
    let size_mb = len as f64 / BYTES_PER_MB;
    ExtractedContent::text(format!(
        "Uploaded graphic queued for OCR. Size: {:.2} MB. \
         OCR analysis requires external AI integration (future scope).",
        size_mb
    ))
}

type OoxmlArchive<'a> = zip::ZipArchive<std::io::Cursor<&'a [u8]>>;

fn open_archive(bytes: &[u8]) -> Result<OoxmlArchive<'_>, ExtractError> {
    zip::ZipArchive::new(std::io::Cursor::new(bytes)).map_err(|e| ExtractError::Ooxml(e.to_string()))
}

fn read_zip_entry_bounded(
    archive: &mut OoxmlArchive<'_>,
    name: &str,
    max_bytes: u64,
) -> Result<Vec<u8>, ExtractError> {
    let entry = archive
        .by_name(name)
        .map_err(|e| ExtractError::Ooxml(format!("{}: {}", name, e)))?;
    let mut out = Vec::new();
    entry
        .take(max_bytes)
        .read_to_end(&mut out)
        .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
    if out.len() as u64 >= max_bytes {
        return Err(ExtractError::Ooxml(format!(
            "ZIP entry {} exceeds size limit ({} bytes)",
            name, max_bytes
        )));
    }
    Ok(out)
}

fn extract_docx(bytes: &[u8]) -> Result<ExtractedContent, ExtractError> {
    let mut archive = open_archive(bytes)?;
    let xml = read_zip_entry_bounded(&mut archive, "word/document.xml", MAX_XML_ENTRY_BYTES)?;
    let paragraphs = collect_text_runs(&xml, b"p")?;
    Ok(ExtractedContent::text(paragraphs.join("\n")))
}

fn slide_number(name: &str) -> u32 {
    name.trim_start_matches("ppt/slides/slide")
        .trim_end_matches(".xml")
        .parse::<u32>()
        .unwrap_or(u32::MAX)
}

fn extract_pptx(bytes: &[u8]) -> Result<ExtractedContent, ExtractError> {
    let mut archive = open_archive(bytes)?;
    let mut slide_names: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with("ppt/slides/slide") && n.ends_with(".xml"))
        .map(|s| s.to_string())
        .collect();
    slide_names.sort_by_key(|name| slide_number(name));

    let mut pieces = Vec::new();
    for name in &slide_names {
        let xml = read_zip_entry_bounded(&mut archive, name, MAX_XML_ENTRY_BYTES)?;
        pieces.extend(collect_text_runs(&xml, b"p")?);
    }

    Ok(ExtractedContent {
        full_text: pieces.join(" ").trim().to_string(),
        metadata: ContentMetadata {
            pages: None,
            slides: Some(slide_names.len() as u32),
        },
    })
}

/// Collects `<*:t>` text runs, concatenated per `<*:{block}>` element.
///
/// Works for both WordprocessingML (`w:p`/`w:t`) and DrawingML (`a:p`/`a:t`)
/// since only local names are compared. Empty blocks are dropped.
fn collect_text_runs(xml: &[u8], block: &[u8]) -> Result<Vec<String>, ExtractError> {
    use quick_xml::events::Event;

    let mut blocks = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text = true,
            Ok(Event::End(e)) if e.local_name().as_ref() == b"t" => in_text = false,
            Ok(Event::Text(te)) if in_text => {
                let text = te
                    .unescape()
                    .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
                current.push_str(&text);
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == block => {
                let trimmed = current.trim();
                if !trimmed.is_empty() {
                    blocks.push(trimmed.to_string());
                }
                current.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Ooxml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    let trimmed = current.trim();
    if !trimmed.is_empty() {
        blocks.push(trimmed.to_string());
    }
    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn zip_with(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            for (name, body) in entries {
                zip.start_file(*name, zip::write::SimpleFileOptions::default())
                    .unwrap();
                zip.write_all(body.as_bytes()).unwrap();
            }
            zip.finish().unwrap();
        }
        buf
    }

    fn slide(text: &str) -> String {
        format!(
            "<p:sld xmlns:p=\"p\" xmlns:a=\"a\"><p:cSld><p:spTree><p:sp><p:txBody>\
             <a:p><a:r><a:t>{}</a:t></a:r></a:p></p:txBody></p:sp></p:spTree></p:cSld></p:sld>",
            text
        )
    }

    #[test]
    fn website_kind_is_unsupported() {
        let err = extract_bytes(b"<html>", ArtifactKind::Website).unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedKind(ArtifactKind::Website)));
    }

    #[test]
    fn invalid_pdf_returns_error() {
        let err = extract_bytes(b"not a pdf", ArtifactKind::Pdf).unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
    }

    #[test]
    fn invalid_zip_returns_error_for_docx() {
        let err = extract_bytes(b"not a zip", ArtifactKind::Docx).unwrap_err();
        assert!(matches!(err, ExtractError::Ooxml(_)));
    }

    #[test]
    fn docx_without_document_part_fails() {
        let bytes = zip_with(&[("word/styles.xml", "<w:styles/>")]);
        let err = extract_bytes(&bytes, ArtifactKind::Docx).unwrap_err();
        assert!(err.to_string().contains("word/document.xml"));
    }

    #[test]
    fn docx_paragraphs_are_joined() {
        let xml = "<w:document xmlns:w=\"w\"><w:body>\
                   <w:p><w:r><w:t>Work </w:t></w:r><w:r><w:t>Experience</w:t></w:r></w:p>\
                   <w:p><w:r><w:t>Skills &amp; Education</w:t></w:r></w:p>\
                   </w:body></w:document>";
        let bytes = zip_with(&[("word/document.xml", xml)]);
        let content = extract_bytes(&bytes, ArtifactKind::Docx).unwrap();
        assert_eq!(content.full_text, "Work Experience\nSkills & Education");
        assert_eq!(content.metadata, ContentMetadata::default());
    }

    #[test]
    fn pptx_slides_in_numeric_order_with_count() {
        let s1 = slide("First");
        let s2 = slide("Second");
        let s10 = slide("Tenth");
        let bytes = zip_with(&[
            ("ppt/slides/slide10.xml", s10.as_str()),
            ("ppt/slides/slide2.xml", s2.as_str()),
            ("ppt/slides/slide1.xml", s1.as_str()),
        ]);
        let content = extract_bytes(&bytes, ArtifactKind::Pptx).unwrap();
        assert_eq!(content.full_text, "First Second Tenth");
        assert_eq!(content.metadata.slides, Some(3));
    }

    #[test]
    fn image_placeholder_reports_size() {
        let bytes = vec![0u8; 1024 * 1024 + 512 * 1024];
        let content = extract_bytes(&bytes, ArtifactKind::Image).unwrap();
        assert!(content.full_text.contains("Size: 1.50 MB"));
        assert!(content.full_text.contains("future scope"));
        assert!(!content.full_text.to_lowercase().contains("image"));
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let err = extract_file(
            Path::new("/definitely/not/here.pdf"),
            ArtifactKind::Pdf,
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ExtractError::Missing(_)));
    }
}

//! Plain-text extraction from uploaded documents

use regex::Regex;
use std::io::{Cursor, Read};
use std::path::Path;
use tracing::debug;

use pagent_core::{Error, Result};

/// Extensions accepted for ingestion, lowercase and without the dot
pub const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "pdf", "docx", "doc"];

/// Document formats the extractor understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Text,
    Pdf,
    Word,
}

impl DocumentFormat {
    /// Classify a file by its extension, case-insensitively
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "txt" => Ok(DocumentFormat::Text),
            "pdf" => Ok(DocumentFormat::Pdf),
            "docx" | "doc" => Ok(DocumentFormat::Word),
            _ => Err(Error::UnsupportedFormat(format!(
                "'{}' (supported: {})",
                path.display(),
                SUPPORTED_EXTENSIONS
                    .iter()
                    .map(|e| format!(".{}", e))
                    .collect::<Vec<_>>()
                    .join(", ")
            ))),
        }
    }
}

/// Read a document and return its text.
///
/// The extension is checked before the file is touched; missing files and
/// files larger than `max_size` bytes are rejected as invalid input.
pub async fn extract_text(path: &Path, max_size: u64) -> Result<String> {
    let format = DocumentFormat::from_path(path)?;

    let size = tokio::fs::metadata(path)
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::InvalidInput(format!("File not found: {}", path.display())),
            _ => Error::Io(e),
        })?
        .len();
    if size > max_size {
        return Err(Error::InvalidInput(format!(
            "File too large: {} bytes (limit {})",
            size, max_size
        )));
    }

    let bytes = tokio::fs::read(path).await?;
    debug!(path = %path.display(), ?format, size, "Extracting text");
    extract_from_bytes(format, bytes).await
}

/// Extract text from in-memory file contents
pub async fn extract_from_bytes(format: DocumentFormat, bytes: Vec<u8>) -> Result<String> {
    match format {
        DocumentFormat::Text => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        DocumentFormat::Pdf => tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_from_mem(&bytes)
                .map_err(|e| Error::InvalidInput(format!("Failed to extract text from PDF: {}", e)))
        })
        .await
        .map_err(|e| Error::Other(format!("PDF extraction task failed: {}", e)))?,
        DocumentFormat::Word => docx_text(&bytes),
    }
}

/// Paragraph text of a Word document, one paragraph per line
fn docx_text(bytes: &[u8]) -> Result<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| Error::InvalidInput(format!("Failed to read Word document: {}", e)))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| Error::InvalidInput(format!("Word document missing body: {}", e)))?
        .read_to_string(&mut xml)?;

    document_xml_text(&xml)
}

fn document_xml_text(xml: &str) -> Result<String> {
    let paragraph = Regex::new(r"(?s)<w:p[\s>].*?</w:p>").map_err(|e| Error::Other(e.to_string()))?;
    let text_run = Regex::new(r"(?s)<w:t(?:\s[^>]*)?>(.*?)</w:t>").map_err(|e| Error::Other(e.to_string()))?;

    Ok(paragraph
        .find_iter(xml)
        .map(|p| {
            text_run
                .captures_iter(p.as_str())
                .filter_map(|c| c.get(1))
                .map(|m| unescape_xml(m.as_str()))
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n"))
}

fn unescape_xml(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

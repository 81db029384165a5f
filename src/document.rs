use crate::error::{RagError, Result};
use log::{debug, info, warn};
use mime_guess::from_path;
use pdf_extract::extract_text;
use std::fs;
use std::path::Path;

/// Source corpus loaded for ingestion
#[derive(Debug, Clone)]
pub struct Document {
    /// Full text, with line endings normalized to `\n`
    pub content: String,
    /// File name, recorded on every index entry as its source
    pub source: String,
    pub kind: DocumentKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    PlainText,
    Pdf,
}

impl DocumentKind {
    /// Map a MIME type onto a supported kind
    pub fn from_mime(mime_type: &str) -> Option<Self> {
        if mime_type.starts_with("application/pdf") {
            Some(DocumentKind::Pdf)
        } else if mime_type.starts_with("text/") {
            Some(DocumentKind::PlainText)
        } else {
            None
        }
    }
}

impl Document {
    /// Build a document from text already in memory
    pub fn from_text(source: impl Into<String>, content: &str) -> Self {
        Document {
            content: normalize_line_endings(content),
            source: source.into(),
            kind: DocumentKind::PlainText,
        }
    }

    /// Load a text or PDF document from disk
    pub fn load<P: AsRef<Path>>(file_path: P) -> Result<Self> {
        let path = file_path.as_ref();
        let source = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| RagError::Document(format!("invalid file name: {}", path.display())))?
            .to_string();

        let mime_type = from_path(path).first_or_octet_stream().to_string();
        debug!("Detected MIME type: {}", mime_type);

        let kind = DocumentKind::from_mime(&mime_type).ok_or_else(|| {
            RagError::Document(format!(
                "unsupported document format {} for {}; only text and PDF files are supported",
                mime_type,
                path.display()
            ))
        })?;

        let content = match kind {
            DocumentKind::Pdf => {
                info!("Extracting text from PDF: {}", path.display());
                let raw = extract_text(path).map_err(|e| {
                    RagError::Document(format!("failed to extract {}: {}", path.display(), e))
                })?;
                normalize_whitespace(&raw)
            }
            DocumentKind::PlainText => {
                info!("Reading text document: {}", path.display());
                let raw = fs::read_to_string(path).map_err(|e| {
                    RagError::Document(format!("failed to read {}: {}", path.display(), e))
                })?;
                normalize_line_endings(&raw)
            }
        };

        if content.trim().is_empty() {
            warn!("Document {} contains no text", source);
        }

        Ok(Document {
            content,
            source,
            kind,
        })
    }
}

fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Collapse runs of spaces and cap blank lines at one paragraph break.
/// PDF extraction tends to pad output with both.
fn normalize_whitespace(text: &str) -> String {
    let text = normalize_line_endings(text);
    let mut normalized = String::with_capacity(text.len());
    let mut pending_newlines = 0;
    let mut prev_space = false;

    for c in text.chars() {
        if c == '\n' {
            pending_newlines += 1;
            continue;
        }

        if pending_newlines > 0 {
            normalized.push_str(if pending_newlines >= 2 { "\n\n" } else { "\n" });
            pending_newlines = 0;
            prev_space = false;
        }

        if c == ' ' && prev_space {
            continue;
        }
        prev_space = c == ' ';
        normalized.push(c);
    }

    normalized.trim().to_string()
}

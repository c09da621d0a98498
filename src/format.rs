//! Supported input formats.
//!
//! The set is closed: every match over [`DocumentFormat`] is exhaustive, so
//! adding a format forces every dispatch site (reader table, naming, CLI
//! help) to be revisited at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Extensions accepted for conversion, lowercase, without the dot.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "doc", "docx"];

/// A document format the converter can read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    /// Legacy binary Word document.
    Doc,
    Docx,
}

impl DocumentFormat {
    /// Detect the format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(DocumentFormat::Pdf),
            "doc" => Some(DocumentFormat::Doc),
            "docx" => Some(DocumentFormat::Docx),
            _ => None,
        }
    }

    /// Detect the format from a path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Canonical lowercase extension.
    pub fn extension(self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Doc => "doc",
            DocumentFormat::Docx => "docx",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Whether `path` has a supported extension.
pub fn is_supported(path: &Path) -> bool {
    DocumentFormat::from_path(path).is_some()
}

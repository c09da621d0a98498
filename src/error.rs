//! Error types for the resume2html library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Resume2HtmlError`] — **Fatal**: the run cannot start at all (input
//!   directory missing, invalid settings, output directory not writable).
//!   Returned as `Err(Resume2HtmlError)` from setup calls such as
//!   [`crate::batch::BatchDriver::run`] and
//!   [`crate::config::ConversionSettingsBuilder::build`].
//!
//! * [`ConversionError`] — **Non-fatal**: a single file failed (corrupt
//!   document, missing external tool, timeout). Stored inside
//!   [`crate::output::ConversionResult`] so one bad file never takes the
//!   rest of a batch down with it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the resume2html library.
///
/// Per-file failures use [`ConversionError`] and are stored in
/// [`crate::output::ConversionResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum Resume2HtmlError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The input path does not exist.
    #[error("Input not found: '{path}'\nCheck the path exists and is readable.")]
    InputNotFound { path: PathBuf },

    /// The input exists but cannot be used for the requested mode.
    #[error("Invalid input '{path}': {reason}")]
    InvalidInput { path: PathBuf, reason: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create the output directory.
    #[error("Failed to create output directory '{path}': {source}")]
    OutputDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not write the batch summary file.
    #[error("Failed to write batch summary '{path}': {source}")]
    SummaryWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not build the batch archive.
    #[error("Failed to build archive '{path}': {detail}")]
    ArchiveFailed { path: PathBuf, detail: String },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// The category of a per-file failure.
///
/// Serialised in snake_case into metadata and summary files so downstream
/// tooling can filter on it without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    UnsupportedFormat,
    FileNotFound,
    FileTooLarge,
    CorruptDocument,
    OcrUnavailable,
    ExternalConverterMissing,
    Timeout,
    Cancelled,
    OutputWriteFailed,
    UnknownFailure,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::UnsupportedFormat => "unsupported_format",
            FailureKind::FileNotFound => "file_not_found",
            FailureKind::FileTooLarge => "file_too_large",
            FailureKind::CorruptDocument => "corrupt_document",
            FailureKind::OcrUnavailable => "ocr_unavailable",
            FailureKind::ExternalConverterMissing => "external_converter_missing",
            FailureKind::Timeout => "timeout",
            FailureKind::Cancelled => "cancelled",
            FailureKind::OutputWriteFailed => "output_write_failed",
            FailureKind::UnknownFailure => "unknown_failure",
        };
        f.write_str(s)
    }
}

/// A non-fatal error for a single file.
///
/// Stored alongside [`crate::output::ConversionResult`] when a conversion
/// fails. The batch continues with the remaining files.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum ConversionError {
    /// Extension is not one of pdf, doc, docx.
    #[error("Unsupported file type '.{extension}' (expected pdf, doc or docx)")]
    UnsupportedFormat { extension: String },

    /// Input file vanished or is not a regular file.
    #[error("File not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// Input exceeds the configured size limit.
    #[error("File '{path}' is {size} bytes, over the {limit} byte limit")]
    FileTooLarge { path: PathBuf, size: u64, limit: u64 },

    /// The document could not be parsed.
    #[error("Document '{path}' is corrupt: {detail}")]
    CorruptDocument { path: PathBuf, detail: String },

    /// OCR was required but the engine could not run.
    #[error("OCR engine unavailable: {detail}\nInstall tesseract or pass --no-ocr.")]
    OcrUnavailable { detail: String },

    /// A required external program or library is missing.
    #[error("External converter '{tool}' is not available: {detail}")]
    ExternalConverterMissing { tool: String, detail: String },

    /// The per-file time budget was exhausted.
    #[error("Conversion timed out after {:.1}s", *.limit_ms as f64 / 1000.0)]
    Timeout { limit_ms: u64 },

    /// The batch was cancelled before this file finished.
    #[error("Conversion cancelled")]
    Cancelled,

    /// An output file could not be written.
    #[error("Failed to write '{path}': {detail}")]
    OutputWriteFailed { path: PathBuf, detail: String },

    /// Anything else, including panics inside a conversion task.
    #[error("Unexpected failure: {message}")]
    UnknownFailure { message: String },
}

impl ConversionError {
    /// The failure category for this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            ConversionError::UnsupportedFormat { .. } => FailureKind::UnsupportedFormat,
            ConversionError::FileNotFound { .. } => FailureKind::FileNotFound,
            ConversionError::FileTooLarge { .. } => FailureKind::FileTooLarge,
            ConversionError::CorruptDocument { .. } => FailureKind::CorruptDocument,
            ConversionError::OcrUnavailable { .. } => FailureKind::OcrUnavailable,
            ConversionError::ExternalConverterMissing { .. } => {
                FailureKind::ExternalConverterMissing
            }
            ConversionError::Timeout { .. } => FailureKind::Timeout,
            ConversionError::Cancelled => FailureKind::Cancelled,
            ConversionError::OutputWriteFailed { .. } => FailureKind::OutputWriteFailed,
            ConversionError::UnknownFailure { .. } => FailureKind::UnknownFailure,
        }
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, detail: impl fmt::Display) -> Self {
        ConversionError::CorruptDocument {
            path: path.into(),
            detail: detail.to_string(),
        }
    }

    pub(crate) fn unknown(message: impl fmt::Display) -> Self {
        ConversionError::UnknownFailure {
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        let e = ConversionError::Timeout { limit_ms: 30_000 };
        assert_eq!(e.kind(), FailureKind::Timeout);
        assert_eq!(ConversionError::Cancelled.kind(), FailureKind::Cancelled);
    }

    #[test]
    fn sub_second_timeout_keeps_its_fraction() {
        let e = ConversionError::Timeout { limit_ms: 200 };
        assert_eq!(e.to_string(), "Conversion timed out after 0.2s");
    }

    #[test]
    fn failure_kind_serialises_snake_case() {
        let json = serde_json::to_string(&FailureKind::ExternalConverterMissing).unwrap();
        assert_eq!(json, "\"external_converter_missing\"");
        assert_eq!(
            FailureKind::ExternalConverterMissing.to_string(),
            "external_converter_missing"
        );
    }

    #[test]
    fn corrupt_display_includes_path_and_detail() {
        let e = ConversionError::corrupt("cv.docx", "invalid Zip archive");
        let msg = e.to_string();
        assert!(msg.contains("cv.docx"), "got: {msg}");
        assert!(msg.contains("invalid Zip archive"), "got: {msg}");
    }

    #[test]
    fn too_large_display() {
        let e = ConversionError::FileTooLarge {
            path: "big.pdf".into(),
            size: 60,
            limit: 50,
        };
        assert!(e.to_string().contains("60 bytes"));
    }

    #[test]
    fn invalid_config_display() {
        let e = Resume2HtmlError::InvalidConfig("workers must be ≥ 1".into());
        assert!(e.to_string().contains("workers"));
    }
}

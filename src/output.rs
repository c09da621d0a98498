//! Conversion results, per-file metadata records and the batch summary.

use crate::error::{ConversionError, FailureKind};
use crate::format::DocumentFormat;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ── Per-file result ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionStatus {
    Success,
    Failed,
}

/// Outcome of converting one file.
///
/// `html` and `text` hold the rendered content in memory; they are not part
/// of the serialised [`FileRecord`].
#[derive(Debug, Clone)]
pub struct ConversionResult {
    /// Input file name without directories.
    pub filename: String,
    pub input_path: PathBuf,
    /// `None` when the extension was not recognised.
    pub format: Option<DocumentFormat>,
    pub timestamp: DateTime<Local>,
    pub status: ConversionStatus,
    pub html: Option<String>,
    pub text: Option<String>,
    pub output_path: Option<PathBuf>,
    pub text_path: Option<PathBuf>,
    pub metadata_path: Option<PathBuf>,
    /// Byte length of the rendered HTML.
    pub html_size: u64,
    /// Byte length of the input file.
    pub file_size: u64,
    pub page_count: usize,
    pub ocr_applied: bool,
    pub duration_ms: u64,
    pub error: Option<ConversionError>,
}

impl ConversionResult {
    /// An empty failed result for `path`; callers fill in what they know.
    pub fn failed(path: &Path, error: ConversionError) -> Self {
        Self {
            filename: file_name(path),
            input_path: path.to_path_buf(),
            format: DocumentFormat::from_path(path),
            timestamp: Local::now(),
            status: ConversionStatus::Failed,
            html: None,
            text: None,
            output_path: None,
            text_path: None,
            metadata_path: None,
            html_size: 0,
            file_size: 0,
            page_count: 0,
            ocr_applied: false,
            duration_ms: 0,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ConversionStatus::Success
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.error.as_ref().map(ConversionError::kind)
    }

    /// Mark the result failed, keeping whatever was measured so far.
    pub(crate) fn fail(&mut self, error: ConversionError) {
        self.status = ConversionStatus::Failed;
        self.error = Some(error);
    }
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

// ── Sidecar metadata ─────────────────────────────────────────────────────

/// Serialisable projection of a [`ConversionResult`], written next to the
/// outputs as `<stem>_metadata.json` and embedded in the batch summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub filename: String,
    pub input_path: String,
    pub timestamp: DateTime<Local>,
    pub status: ConversionStatus,
    pub output_path: Option<String>,
    pub html_size: u64,
    pub file_size: u64,
    pub text_path: Option<String>,
    pub format: Option<DocumentFormat>,
    pub page_count: usize,
    pub ocr_applied: bool,
    pub duration_ms: u64,
    pub error_kind: Option<FailureKind>,
    pub error: Option<String>,
}

impl From<&ConversionResult> for FileRecord {
    fn from(r: &ConversionResult) -> Self {
        let path_string = |p: &Option<PathBuf>| p.as_ref().map(|p| p.display().to_string());
        FileRecord {
            filename: r.filename.clone(),
            input_path: r.input_path.display().to_string(),
            timestamp: r.timestamp,
            status: r.status,
            output_path: path_string(&r.output_path),
            html_size: r.html_size,
            file_size: r.file_size,
            text_path: path_string(&r.text_path),
            format: r.format,
            page_count: r.page_count,
            ocr_applied: r.ocr_applied,
            duration_ms: r.duration_ms,
            error_kind: r.failure_kind(),
            error: r.error.as_ref().map(ToString::to_string),
        }
    }
}

// ── Batch summary ────────────────────────────────────────────────────────

/// Aggregate report of one batch run, written as `batch_summary.json`.
///
/// `succeeded + failed + skipped == total` always holds. Jobs the
/// cancellation reached before they started count as failed but not as
/// attempted, so `attempted <= succeeded + failed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub input_dir: String,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    /// Files found by enumeration, supported or not.
    pub total: usize,
    /// Jobs that actually started converting.
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    /// `true` when the run was interrupted and the summary is partial.
    pub cancelled: bool,
    pub skipped_files: Vec<String>,
    pub archive_path: Option<String>,
    /// One record per supported file, started or not, in input order.
    pub records: Vec<FileRecord>,
}

impl BatchSummary {
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// Records whose conversion failed.
    pub fn failures(&self) -> impl Iterator<Item = &FileRecord> {
        self.records
            .iter()
            .filter(|r| r.status == ConversionStatus::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_result_record() {
        let r = ConversionResult::failed(
            Path::new("/in/cv.docx"),
            ConversionError::Timeout { limit_ms: 30_000 },
        );
        assert!(!r.is_success());
        assert_eq!(r.filename, "cv.docx");
        assert_eq!(r.format, Some(DocumentFormat::Docx));

        let record = FileRecord::from(&r);
        assert_eq!(record.error_kind, Some(FailureKind::Timeout));
        assert!(record.error.as_deref().unwrap().contains("30.0s"));

        let json = serde_json::to_value(&record).unwrap();
        for key in [
            "filename",
            "input_path",
            "timestamp",
            "status",
            "output_path",
            "html_size",
            "file_size",
        ] {
            assert!(json.get(key).is_some(), "missing key {key}");
        }
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error_kind"], "timeout");
    }

    #[test]
    fn unknown_extension_has_no_format() {
        let r = ConversionResult::failed(
            Path::new("notes.txt"),
            ConversionError::UnsupportedFormat {
                extension: "txt".into(),
            },
        );
        assert_eq!(r.format, None);
        assert_eq!(r.failure_kind(), Some(FailureKind::UnsupportedFormat));
    }

    #[test]
    fn summary_round_trips_through_json() {
        let now = Local::now();
        let summary = BatchSummary {
            input_dir: "in".into(),
            started_at: now,
            finished_at: now,
            total: 2,
            attempted: 1,
            succeeded: 0,
            failed: 1,
            skipped: 1,
            cancelled: false,
            skipped_files: vec!["notes.txt".into()],
            archive_path: None,
            records: vec![FileRecord::from(&ConversionResult::failed(
                Path::new("cv.pdf"),
                ConversionError::Cancelled,
            ))],
        };
        let json = serde_json::to_string(&summary).unwrap();
        let back: BatchSummary = serde_json::from_str(&json).unwrap();
        assert!(back.has_failures());
        assert_eq!(back.failures().count(), 1);
        assert_eq!(back.skipped_files, vec!["notes.txt"]);
    }
}

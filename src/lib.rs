//! # resume2html
//!
//! Convert resumes (PDF, DOC, DOCX) into styled, self-contained HTML pages,
//! one file at a time or as a parallel batch.
//!
//! ## Pipeline Overview
//!
//! ```text
//! resume file
//!  │
//!  ├─ 1. Input    existence, format, size and signature checks
//!  ├─ 2. Read     pdfium (PDF) · zip + quick-xml (DOCX) · soffice → DOCX (DOC)
//!  ├─ 3. OCR      tesseract for PDFs without a text layer
//!  ├─ 4. Render   template + inline CSS/JS, images as data: URIs
//!  ├─ 5. Text     plain-text cleanup rules
//!  └─ 6. Output   <stem>.html, <stem>.txt, <stem>_metadata.json
//! ```
//!
//! A batch runs step 1–6 for every file of a directory on a bounded worker
//! pool. A file that fails never affects the others; the run ends with a
//! `batch_summary.json` listing every outcome.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use resume2html::{BatchDriver, ConversionSettings, Converter};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = ConversionSettings::builder()
//!         .output_dir("html_output")
//!         .workers(4)
//!         .build()?;
//!     let driver = BatchDriver::new(Converter::new(settings));
//!     let summary = driver.run_dir(Path::new("resumes")).await?;
//!     eprintln!("{} ok, {} failed", summary.succeeded, summary.failed);
//!     Ok(())
//! }
//! ```
//!
//! ## External Tools
//!
//! | Tool | Needed for | Setting |
//! |------|------------|---------|
//! | pdfium shared library | PDF input | `pdfium_library` (else system library) |
//! | `soffice` (LibreOffice) | DOC input | `soffice_path` |
//! | `tesseract` | OCR of scanned PDFs | `tesseract_path` |
//!
//! DOCX needs nothing external. A missing tool fails only the files that
//! need it, with `ExternalConverterMissing` or `OcrUnavailable`.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `resume2html` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod convert;
pub mod document;
pub mod error;
pub mod format;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod reader;
pub mod tools;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{enumerate, enumerate_files, BatchDriver, BatchPlan, ARCHIVE_FILE, SUMMARY_FILE};
pub use config::{ConversionSettings, ConversionSettingsBuilder, DEFAULT_MAX_FILE_SIZE};
pub use convert::{convert_sync, output_stem, ConversionJob, Converter};
pub use document::{
    Alignment, Block, EmbeddedImage, ExtractedDocument, ImageSource, Page, PageKind, Span,
};
pub use error::{ConversionError, FailureKind, Resume2HtmlError};
pub use format::{is_supported, DocumentFormat, SUPPORTED_EXTENSIONS};
pub use output::{BatchSummary, ConversionResult, ConversionStatus, FileRecord};
pub use pipeline::ocr::{RecognizedPage, TesseractRecognizer, TextRecognizer};
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use reader::{DocumentReader, ReaderTable};
pub use tools::{check_tools, ToolStatus};

/// Re-exported so callers can cancel a batch without depending on
/// `tokio-util` directly.
pub use tokio_util::sync::CancellationToken;

//! Pipeline stages for resume-to-HTML conversion.
//!
//! Each submodule implements one step. Readers turn a file into an
//! [`ExtractedDocument`](crate::document::ExtractedDocument); everything
//! after that works on the structured model only.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ pdf / doc / docx ──▶ (ocr) ──▶ html ──▶ postprocess
//! (checks)    (readers)         (scans)  (render)  (plain text)
//! ```
//!
//! 1. [`input`] — existence, extension, size and signature checks
//! 2. [`pdf`], [`docx`], [`doc`] — format readers; pdfium and zip parsing
//!    run in `spawn_blocking`, LibreOffice runs as a child process
//! 3. [`ocr`] — tesseract fallback for PDFs without a usable text layer
//! 4. [`html`] + [`encode`] — template rendering with inline `data:` images
//! 5. [`postprocess`] — cleanup rules for the `.txt` output

pub mod doc;
pub mod docx;
pub mod encode;
pub mod html;
pub mod input;
pub mod ocr;
pub mod pdf;
pub mod postprocess;

//! Configuration for resume conversion.
//!
//! All conversion behaviour is controlled through [`ConversionSettings`],
//! built via its [`ConversionSettingsBuilder`]. A batch constructs one value
//! and shares it read-only (behind an `Arc`) with every worker; nothing in
//! the crate reads tool paths or limits from process-wide state.

use crate::error::Resume2HtmlError;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default per-file size limit: 50 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// Settings for a single-file or batch conversion.
///
/// # Example
/// ```rust
/// use resume2html::ConversionSettings;
///
/// let settings = ConversionSettings::builder()
///     .image_quality(90)
///     .dpi(200)
///     .workers(8)
///     .ocr_enabled(false)
///     .build()
///     .unwrap();
/// assert_eq!(settings.workers, 8);
/// ```
#[derive(Clone)]
pub struct ConversionSettings {
    /// JPEG quality for embedded images. Range: 1–100. Default: 85.
    pub image_quality: u8,

    /// Rasterisation DPI for pages sent to OCR. Range: 72–600. Default: 150.
    ///
    /// Tesseract accuracy drops sharply below ~150 DPI on typical resume
    /// fonts; 300 is worth it for small print.
    pub dpi: u32,

    /// Run OCR on PDFs without a usable text layer. Default: true.
    pub ocr_enabled: bool,

    /// Number of files converted concurrently in batch mode. Default: 4.
    pub workers: usize,

    /// Write `<stem>.html`. Default: true.
    pub emit_html: bool,

    /// Write `<stem>.txt`. Default: true.
    pub emit_text: bool,

    /// Per-file time budget. `None` disables the limit. Default: 300 s.
    pub timeout: Option<Duration>,

    /// Directory receiving HTML, text, metadata and summary files.
    /// Default: `html_output`.
    pub output_dir: PathBuf,

    /// A PDF whose text layer holds fewer non-whitespace characters than this
    /// is treated as image-only. Default: 100.
    pub min_text_chars: usize,

    /// Inputs larger than this are rejected. `None` disables. Default: 50 MiB.
    pub max_file_size: Option<u64>,

    /// Tesseract language code(s), e.g. `eng` or `eng+fra`. Default: `eng`.
    pub ocr_language: String,

    /// Office-suite executable used for DOC → DOCX. Default: `soffice`.
    pub soffice_path: PathBuf,

    /// Tesseract executable. Default: `tesseract`.
    pub tesseract_path: PathBuf,

    /// Explicit pdfium shared library. `None` binds the system library.
    pub pdfium_library: Option<PathBuf>,

    /// Bundle produced outputs into `converted_files.zip` after a batch. Default: false.
    pub archive: bool,
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            image_quality: 85,
            dpi: 150,
            ocr_enabled: true,
            workers: 4,
            emit_html: true,
            emit_text: true,
            timeout: Some(Duration::from_secs(300)),
            output_dir: PathBuf::from("html_output"),
            min_text_chars: 100,
            max_file_size: Some(DEFAULT_MAX_FILE_SIZE),
            ocr_language: "eng".to_string(),
            soffice_path: PathBuf::from("soffice"),
            tesseract_path: PathBuf::from("tesseract"),
            pdfium_library: None,
            archive: false,
        }
    }
}

impl fmt::Debug for ConversionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionSettings")
            .field("image_quality", &self.image_quality)
            .field("dpi", &self.dpi)
            .field("ocr_enabled", &self.ocr_enabled)
            .field("workers", &self.workers)
            .field("emit_html", &self.emit_html)
            .field("emit_text", &self.emit_text)
            .field("timeout", &self.timeout)
            .field("output_dir", &self.output_dir)
            .field("max_file_size", &self.max_file_size)
            .field("ocr_language", &self.ocr_language)
            .finish_non_exhaustive()
    }
}

impl ConversionSettings {
    /// Create a new builder for `ConversionSettings`.
    pub fn builder() -> ConversionSettingsBuilder {
        ConversionSettingsBuilder {
            settings: Self::default(),
        }
    }
}

/// Builder for [`ConversionSettings`].
#[derive(Debug)]
pub struct ConversionSettingsBuilder {
    settings: ConversionSettings,
}

impl ConversionSettingsBuilder {
    pub fn image_quality(mut self, quality: u8) -> Self {
        self.settings.image_quality = quality.clamp(1, 100);
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.settings.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn ocr_enabled(mut self, v: bool) -> Self {
        self.settings.ocr_enabled = v;
        self
    }

    /// Worker count is not clamped: zero is a setup error reported by `build`.
    pub fn workers(mut self, n: usize) -> Self {
        self.settings.workers = n;
        self
    }

    pub fn emit_html(mut self, v: bool) -> Self {
        self.settings.emit_html = v;
        self
    }

    pub fn emit_text(mut self, v: bool) -> Self {
        self.settings.emit_text = v;
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.settings.timeout = timeout;
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.settings.timeout = if secs == 0 {
            None
        } else {
            Some(Duration::from_secs(secs))
        };
        self
    }

    pub fn output_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.settings.output_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn min_text_chars(mut self, n: usize) -> Self {
        self.settings.min_text_chars = n;
        self
    }

    pub fn max_file_size(mut self, bytes: Option<u64>) -> Self {
        self.settings.max_file_size = bytes;
        self
    }

    pub fn ocr_language(mut self, lang: impl Into<String>) -> Self {
        self.settings.ocr_language = lang.into();
        self
    }

    pub fn soffice_path(mut self, path: impl AsRef<Path>) -> Self {
        self.settings.soffice_path = path.as_ref().to_path_buf();
        self
    }

    pub fn tesseract_path(mut self, path: impl AsRef<Path>) -> Self {
        self.settings.tesseract_path = path.as_ref().to_path_buf();
        self
    }

    pub fn pdfium_library(mut self, path: impl AsRef<Path>) -> Self {
        self.settings.pdfium_library = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn archive(mut self, v: bool) -> Self {
        self.settings.archive = v;
        self
    }

    /// Build the settings, validating constraints.
    pub fn build(self) -> Result<ConversionSettings, Resume2HtmlError> {
        let s = &self.settings;
        if s.workers == 0 {
            return Err(Resume2HtmlError::InvalidConfig(
                "Worker count must be ≥ 1".into(),
            ));
        }
        if !(1..=100).contains(&s.image_quality) {
            return Err(Resume2HtmlError::InvalidConfig(format!(
                "Image quality must be 1–100, got {}",
                s.image_quality
            )));
        }
        if s.dpi < 72 || s.dpi > 600 {
            return Err(Resume2HtmlError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                s.dpi
            )));
        }
        if !s.emit_html && !s.emit_text {
            return Err(Resume2HtmlError::InvalidConfig(
                "At least one of HTML or text output must be enabled".into(),
            ));
        }
        if s.ocr_language.trim().is_empty() {
            return Err(Resume2HtmlError::InvalidConfig(
                "OCR language must not be empty".into(),
            ));
        }
        Ok(self.settings)
    }
}

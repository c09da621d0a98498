//! Single-file conversion: the unit of work every batch worker runs.
//!
//! [`Converter::convert`] never returns `Err`. Every failure, from a missing
//! file to a crashed external tool, comes back as a failed
//! [`ConversionResult`] with a typed [`ConversionError`], so one bad file
//! can never abort the files around it.

use crate::config::ConversionSettings;
use crate::document::{Block, EmbeddedImage, ExtractedDocument, ImageSource, Page, PageKind, Span};
use crate::error::{ConversionError, Resume2HtmlError};
use crate::format::DocumentFormat;
use crate::output::{file_name, ConversionResult, ConversionStatus, FileRecord};
use crate::pipeline::ocr::{TesseractRecognizer, TextRecognizer};
use crate::pipeline::{html, input, postprocess};
use crate::reader::{DocumentReader, ReaderTable};
use chrono::Local;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// One file scheduled by the batch driver.
#[derive(Debug, Clone)]
pub struct ConversionJob {
    /// 0-based position in input order.
    pub index: usize,
    pub path: PathBuf,
    pub format: DocumentFormat,
    /// File stem used for every output of this job.
    pub output_stem: String,
}

/// Converts files with one set of settings and one set of collaborators.
///
/// Cheap to clone: everything is behind an `Arc`, so each batch worker
/// gets its own handle.
#[derive(Clone)]
pub struct Converter {
    settings: Arc<ConversionSettings>,
    readers: ReaderTable,
    recognizer: Arc<dyn TextRecognizer>,
}

impl std::fmt::Debug for Converter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Converter")
            .field("settings", &self.settings)
            .field("readers", &self.readers)
            .field("recognizer", &self.recognizer.name())
            .finish()
    }
}

impl Converter {
    /// Production converter: pdfium, DOCX parser, soffice and tesseract as
    /// configured in `settings`.
    pub fn new(settings: ConversionSettings) -> Self {
        let readers = ReaderTable::from_settings(&settings);
        let recognizer = Arc::new(TesseractRecognizer::new(
            settings.tesseract_path.clone(),
            settings.ocr_language.clone(),
        ));
        Self::with_components(settings, readers, recognizer)
    }

    /// Converter with substitute readers or OCR engine.
    pub fn with_components(
        settings: ConversionSettings,
        readers: ReaderTable,
        recognizer: Arc<dyn TextRecognizer>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            readers,
            recognizer,
        }
    }

    pub fn settings(&self) -> &ConversionSettings {
        &self.settings
    }

    /// Convert `path` in memory. Nothing is written to disk.
    pub async fn convert(&self, path: &Path) -> ConversionResult {
        let started = Instant::now();
        let mut result = match self.convert_inner(path).await {
            Ok(result) => result,
            Err(e) => {
                warn!("{}: {}", path.display(), e);
                failed_result(path, e).await
            }
        };
        result.duration_ms = started.elapsed().as_millis() as u64;
        result
    }

    async fn convert_inner(&self, path: &Path) -> Result<ConversionResult, ConversionError> {
        let input = input::validate(path, self.settings.max_file_size).await?;
        let reader = self.readers.reader_for(input.format);
        debug!("Reading {} with {}", path.display(), reader.name());

        let mut document = reader.read(&input.path).await?;
        let mut ocr_applied = false;

        if input.format == DocumentFormat::Pdf
            && document.text_char_count() < self.settings.min_text_chars
        {
            if self.settings.ocr_enabled {
                info!("{}: no usable text layer, running OCR", path.display());
                document = self.apply_ocr(reader.as_ref(), &input.path, document).await?;
                ocr_applied = true;
            } else {
                info!("{}: image-only PDF and OCR is disabled", path.display());
            }
        }

        let stem = output_stem(path);
        let html = html::render_document(&document, &stem, self.settings.image_quality);
        let text = postprocess::clean_text(&document.plain_text());

        info!(
            "Converted {} ({} pages, {} bytes HTML{})",
            path.display(),
            document.page_count(),
            html.len(),
            if ocr_applied { ", OCR" } else { "" }
        );

        Ok(ConversionResult {
            filename: file_name(path),
            input_path: path.to_path_buf(),
            format: Some(input.format),
            timestamp: Local::now(),
            status: ConversionStatus::Success,
            html_size: html.len() as u64,
            html: Some(html),
            text: Some(text),
            output_path: None,
            text_path: None,
            metadata_path: None,
            file_size: input.size,
            page_count: document.page_count(),
            ocr_applied,
            duration_ms: 0,
            error: None,
        })
    }

    /// Replace page content with recognised text, keeping each scan as a
    /// faint background.
    async fn apply_ocr(
        &self,
        reader: &dyn DocumentReader,
        path: &Path,
        document: ExtractedDocument,
    ) -> Result<ExtractedDocument, ConversionError> {
        let scans = reader.rasterize(path, self.settings.dpi).await?;
        if scans.is_empty() {
            return Ok(document);
        }

        let mut pages = Vec::with_capacity(scans.len());
        for (idx, scan) in scans.into_iter().enumerate() {
            let number = idx + 1;
            let recognised = self.recognizer.recognize(&scan).await?;
            debug!("OCR page {}: {} paragraphs", number, recognised.paragraphs.len());
            let blocks = recognised
                .paragraphs
                .into_iter()
                .map(|p| Block::Paragraph {
                    spans: vec![Span::plain(p)],
                    align: None,
                })
                .collect();
            pages.push(Page {
                number,
                kind: PageKind::Ocr,
                blocks,
                background: Some(EmbeddedImage {
                    source: ImageSource::Bitmap(scan),
                    alt: format!("Page {number}"),
                }),
            });
        }

        Ok(ExtractedDocument {
            title: document.title,
            pages,
        })
    }

    /// Convert `path` and write `<stem>.html`, `<stem>.txt` and
    /// `<stem>_metadata.json` into `output_dir`.
    ///
    /// The metadata sidecar is written for failed conversions too.
    pub async fn convert_to_dir(
        &self,
        path: &Path,
        output_dir: &Path,
        stem: &str,
    ) -> ConversionResult {
        let mut result = self.convert(path).await;
        self.persist(&mut result, output_dir, stem).await;
        result
    }

    /// Write the result's outputs. A write failure turns a success into
    /// `OutputWriteFailed`.
    pub(crate) async fn persist(&self, result: &mut ConversionResult, output_dir: &Path, stem: &str) {
        if let Err(e) = tokio::fs::create_dir_all(output_dir).await {
            result.fail(ConversionError::OutputWriteFailed {
                path: output_dir.to_path_buf(),
                detail: e.to_string(),
            });
            return;
        }

        if result.is_success() {
            if let Err(e) = self.write_outputs(result, output_dir, stem).await {
                warn!("{}", e);
                result.output_path = None;
                result.text_path = None;
                result.fail(e);
            }
        }

        let metadata_path = output_dir.join(format!("{stem}_metadata.json"));
        let record = FileRecord::from(&*result);
        let written = match serde_json::to_vec_pretty(&record) {
            Ok(json) => write_atomic(&metadata_path, &json).await.map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        match written {
            Ok(()) => result.metadata_path = Some(metadata_path),
            Err(detail) => {
                warn!("Failed to write {}: {}", metadata_path.display(), detail);
                if result.is_success() {
                    result.fail(ConversionError::OutputWriteFailed {
                        path: metadata_path,
                        detail,
                    });
                }
            }
        }
    }

    async fn write_outputs(
        &self,
        result: &mut ConversionResult,
        output_dir: &Path,
        stem: &str,
    ) -> Result<(), ConversionError> {
        if self.settings.emit_html {
            if let Some(html) = &result.html {
                let path = output_dir.join(format!("{stem}.html"));
                write_atomic(&path, html.as_bytes())
                    .await
                    .map_err(|e| write_failed(&path, e))?;
                result.output_path = Some(path);
            }
        }
        if self.settings.emit_text {
            if let Some(text) = &result.text {
                let path = output_dir.join(format!("{stem}.txt"));
                write_atomic(&path, text.as_bytes())
                    .await
                    .map_err(|e| write_failed(&path, e))?;
                result.text_path = Some(path);
            }
        }
        Ok(())
    }
}

fn write_failed(path: &Path, e: std::io::Error) -> ConversionError {
    ConversionError::OutputWriteFailed {
        path: path.to_path_buf(),
        detail: e.to_string(),
    }
}

/// A failed result for `path` carrying the input's size, when it can be read.
pub(crate) async fn failed_result(path: &Path, error: ConversionError) -> ConversionResult {
    let mut failed = ConversionResult::failed(path, error);
    failed.file_size = tokio::fs::metadata(path)
        .await
        .map(|m| m.len())
        .unwrap_or(0);
    failed
}

/// Atomic write: write to a sibling temp file, then rename over `path`.
pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, bytes).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e);
    }
    Ok(())
}

/// Default output stem for `path`: its file stem.
pub fn output_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "document".to_string())
}

/// Synchronous wrapper: convert one file into `settings.output_dir`.
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    path: impl AsRef<Path>,
    settings: ConversionSettings,
) -> Result<ConversionResult, Resume2HtmlError> {
    let path = path.as_ref();
    let converter = Converter::new(settings);
    let output_dir = converter.settings().output_dir.clone();
    let stem = output_stem(path);
    tokio::runtime::Runtime::new()
        .map_err(|e| Resume2HtmlError::Internal(format!("Failed to create tokio runtime: {}", e)))
        .map(|rt| rt.block_on(converter.convert_to_dir(path, &output_dir, &stem)))
}

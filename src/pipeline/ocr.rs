//! OCR for image-only PDF pages via the tesseract command-line engine.
//!
//! Pages are written as PNG into a scratch directory and recognised with
//! `--psm 6` (a single uniform block of text) in TSV mode. Words with a
//! positive confidence are grouped into paragraphs by tesseract's block
//! number.

use crate::error::ConversionError;
use async_trait::async_trait;
use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::debug;

/// Text recognised on one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecognizedPage {
    pub paragraphs: Vec<String>,
}

impl RecognizedPage {
    pub fn is_empty(&self) -> bool {
        self.paragraphs.iter().all(|p| p.trim().is_empty())
    }
}

/// An OCR engine.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    fn name(&self) -> &'static str;

    async fn recognize(&self, image: &DynamicImage) -> Result<RecognizedPage, ConversionError>;
}

/// [`TextRecognizer`] that shells out to `tesseract`.
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    binary: PathBuf,
    language: String,
}

impl TesseractRecognizer {
    pub fn new(binary: PathBuf, language: impl Into<String>) -> Self {
        Self {
            binary,
            language: language.into(),
        }
    }
}

#[async_trait]
impl TextRecognizer for TesseractRecognizer {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    async fn recognize(&self, image: &DynamicImage) -> Result<RecognizedPage, ConversionError> {
        let scratch = TempDir::with_prefix("tesseract").map_err(|e| ConversionError::OcrUnavailable {
            detail: format!("cannot create scratch dir: {e}"),
        })?;
        let input = scratch.path().join("page.png");

        let png = image.clone();
        let target = input.clone();
        tokio::task::spawn_blocking(move || png.save_with_format(&target, image::ImageFormat::Png))
            .await
            .map_err(|e| ConversionError::unknown(format!("PNG write task panicked: {e}")))?
            .map_err(|e| ConversionError::OcrUnavailable {
                detail: format!("cannot write page image: {e}"),
            })?;

        let output = Command::new(&self.binary)
            .arg(&input)
            .arg("stdout")
            .args(["--psm", "6", "-l", &self.language, "tsv"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| unavailable(&self.binary, e))?;

        if !output.status.success() {
            return Err(ConversionError::OcrUnavailable {
                detail: format!(
                    "tesseract exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        let page = parse_tsv(&String::from_utf8_lossy(&output.stdout));
        debug!("OCR recognised {} paragraphs", page.paragraphs.len());
        Ok(page)
    }
}

fn unavailable(binary: &Path, err: std::io::Error) -> ConversionError {
    let detail = if err.kind() == std::io::ErrorKind::NotFound {
        format!("'{}' not found", binary.display())
    } else {
        format!("failed to run '{}': {err}", binary.display())
    };
    ConversionError::OcrUnavailable { detail }
}

/// Group tesseract TSV word rows into paragraphs.
///
/// Columns: level, page_num, block_num, par_num, line_num, word_num, left,
/// top, width, height, conf, text. Rows that are not words (conf `-1`) or
/// carry no text are dropped.
pub fn parse_tsv(tsv: &str) -> RecognizedPage {
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current_block: Option<(u32, u32)> = None;

    for row in tsv.lines().skip(1) {
        let cols: Vec<&str> = row.split('\t').collect();
        if cols.len() < 12 {
            continue;
        }
        let conf = cols[10].trim().parse::<f32>().unwrap_or(-1.0);
        let word = cols[11].trim();
        if conf <= 0.0 || word.is_empty() {
            continue;
        }
        let block = (
            cols[1].parse::<u32>().unwrap_or(0),
            cols[2].parse::<u32>().unwrap_or(0),
        );

        match paragraphs.last_mut() {
            Some(text) if current_block == Some(block) => {
                text.push(' ');
                text.push_str(word);
            }
            _ => {
                paragraphs.push(word.to_string());
                current_block = Some(block);
            }
        }
    }

    RecognizedPage { paragraphs }
}

//! Shared fixtures: DOCX archives built at runtime and fake collaborators
//! standing in for pdfium and tesseract.

#![allow(dead_code)]

use async_trait::async_trait;
use image::{DynamicImage, Rgb, RgbImage};
use resume2html::{
    Block, ConversionError, ConversionSettings, Converter, DocumentReader, ExtractedDocument,
    Page, PageKind, ReaderTable, RecognizedPage, TextRecognizer,
};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

// ── DOCX fixtures ────────────────────────────────────────────────────────────

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="xml" ContentType="application/xml"/>
  <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
</Types>"#;

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:style w:type="paragraph" w:styleId="Title"><w:name w:val="Title"/></w:style>
  <w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/></w:style>
  <w:style w:type="paragraph" w:styleId="ListParagraph"><w:name w:val="List Paragraph"/></w:style>
</w:styles>"#;

/// A resume-shaped DOCX: title, heading, a bold run, a list and a table.
pub fn resume_docx(name: &str) -> Vec<u8> {
    let body = format!(
        r#"<w:p><w:pPr><w:pStyle w:val="Title"/></w:pPr><w:r><w:t>{name}</w:t></w:r></w:p>
<w:p><w:r><w:rPr><w:b/></w:rPr><w:t xml:space="preserve">Senior Engineer </w:t></w:r><w:r><w:t>at ACME &amp; Co</w:t></w:r></w:p>
<w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t>Skills</w:t></w:r></w:p>
<w:p><w:pPr><w:pStyle w:val="ListParagraph"/></w:pPr><w:r><w:t>Rust</w:t></w:r></w:p>
<w:p><w:pPr><w:pStyle w:val="ListParagraph"/></w:pPr><w:r><w:t>Distributed systems</w:t></w:r></w:p>
<w:tbl>
  <w:tr><w:tc><w:p><w:r><w:t>Year</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>Role</w:t></w:r></w:p></w:tc></w:tr>
  <w:tr><w:tc><w:p><w:r><w:t>2021</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>Lead</w:t></w:r></w:p></w:tc></w:tr>
</w:tbl>"#
    );
    docx_with_body(&body)
}

/// A DOCX whose `word/document.xml` body is `body`.
pub fn docx_with_body(body: &str) -> Vec<u8> {
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"
  xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<w:body>{body}</w:body></w:document>"#
    );

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, content) in [
        ("[Content_Types].xml", CONTENT_TYPES),
        ("word/document.xml", document.as_str()),
        ("word/styles.xml", STYLES),
    ] {
        zip.start_file(name, options).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

/// Starts like a zip file but is not one.
pub fn corrupt_docx() -> Vec<u8> {
    b"PK\x03\x04 this archive was truncated in transit".to_vec()
}

/// Minimal bytes that pass the PDF signature check; only fake readers
/// ever look past the header.
pub fn fake_pdf() -> Vec<u8> {
    b"%PDF-1.7\n% fixture\n".to_vec()
}

pub fn write(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

// ── Fake collaborators ───────────────────────────────────────────────────────

/// PDF reader returning a fixed text layer and blank page scans.
pub struct FakePdfReader {
    pub text: String,
    pub pages: usize,
}

impl FakePdfReader {
    pub fn with_text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            pages: 1,
        }
    }

    /// A scanned document: no text layer at all.
    pub fn image_only(pages: usize) -> Self {
        Self {
            text: String::new(),
            pages,
        }
    }
}

#[async_trait]
impl DocumentReader for FakePdfReader {
    fn name(&self) -> &'static str {
        "fake-pdf"
    }

    async fn read(&self, _path: &Path) -> Result<ExtractedDocument, ConversionError> {
        let pages = (1..=self.pages)
            .map(|number| Page {
                number,
                kind: PageKind::Pdf,
                blocks: if self.text.is_empty() {
                    Vec::new()
                } else {
                    vec![Block::Lines(self.text.lines().map(String::from).collect())]
                },
                background: None,
            })
            .collect();
        Ok(ExtractedDocument { title: None, pages })
    }

    async fn rasterize(
        &self,
        _path: &Path,
        _dpi: u32,
    ) -> Result<Vec<DynamicImage>, ConversionError> {
        Ok((0..self.pages)
            .map(|_| DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 16, Rgb([255, 255, 255]))))
            .collect())
    }
}

/// Reader that panics, as a buggy parser might.
pub struct PanickingReader;

#[async_trait]
impl DocumentReader for PanickingReader {
    fn name(&self) -> &'static str {
        "panicking"
    }

    async fn read(&self, path: &Path) -> Result<ExtractedDocument, ConversionError> {
        panic!("parser blew up on {}", path.display());
    }
}

/// Reader that takes `delay` before answering, as a hung tool would.
pub struct SlowReader(pub Duration);

#[async_trait]
impl DocumentReader for SlowReader {
    fn name(&self) -> &'static str {
        "slow"
    }

    async fn read(&self, _path: &Path) -> Result<ExtractedDocument, ConversionError> {
        tokio::time::sleep(self.0).await;
        Ok(ExtractedDocument::default())
    }
}

/// OCR engine recognising the same paragraphs on every page.
pub struct FakeRecognizer(pub Vec<&'static str>);

#[async_trait]
impl TextRecognizer for FakeRecognizer {
    fn name(&self) -> &'static str {
        "fake-ocr"
    }

    async fn recognize(&self, _image: &DynamicImage) -> Result<RecognizedPage, ConversionError> {
        Ok(RecognizedPage {
            paragraphs: self.0.iter().map(|s| s.to_string()).collect(),
        })
    }
}

/// OCR engine that is not installed.
pub struct MissingRecognizer;

#[async_trait]
impl TextRecognizer for MissingRecognizer {
    fn name(&self) -> &'static str {
        "missing-ocr"
    }

    async fn recognize(&self, _image: &DynamicImage) -> Result<RecognizedPage, ConversionError> {
        Err(ConversionError::OcrUnavailable {
            detail: "'tesseract' not found".to_string(),
        })
    }
}

// ── Builders ─────────────────────────────────────────────────────────────────

pub fn settings(output_dir: &Path) -> resume2html::ConversionSettingsBuilder {
    ConversionSettings::builder()
        .output_dir(output_dir)
        .timeout_secs(30)
}

/// Converter with the real DOCX reader and the given fake PDF reader.
pub fn converter(
    settings: ConversionSettings,
    pdf: impl DocumentReader + 'static,
    ocr: impl TextRecognizer + 'static,
) -> Converter {
    let readers = ReaderTable::from_settings(&settings).with_pdf(Arc::new(pdf));
    Converter::with_components(settings, readers, Arc::new(ocr))
}

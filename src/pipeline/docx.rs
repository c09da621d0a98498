//! DOCX reading: walk `word/document.xml` with quick-xml.
//!
//! A DOCX file is a zip archive of WordprocessingML parts. Three parts
//! matter here:
//!
//! * `word/document.xml` — the body: paragraphs, runs, tables, drawings
//! * `word/styles.xml` — style ids → names, used to spot headings
//! * `word/_rels/document.xml.rels` — relationship ids → media paths
//!
//! `docProps/core.xml` supplies the title when present. Unknown elements are
//! ignored, so documents from any producer degrade to plain paragraphs
//! rather than failing.

use crate::document::{
    Alignment, Block, EmbeddedImage, ExtractedDocument, ImageSource, Page, PageKind, Span,
};
use crate::error::ConversionError;
use crate::reader::DocumentReader;
use async_trait::async_trait;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;
use tracing::{debug, warn};
use zip::ZipArchive;

/// Reader for Office Open XML word-processing documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocxReader;

impl DocxReader {
    pub fn new() -> Self {
        DocxReader
    }
}

#[async_trait]
impl DocumentReader for DocxReader {
    fn name(&self) -> &'static str {
        "docx"
    }

    async fn read(&self, path: &Path) -> Result<ExtractedDocument, ConversionError> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || {
            let file = File::open(&path).map_err(|_| ConversionError::FileNotFound {
                path: path.clone(),
            })?;
            parse_docx(file, &path)
        })
        .await
        .map_err(|e| ConversionError::unknown(format!("DOCX read task panicked: {e}")))?
    }
}

/// Parse a DOCX archive. `path` is only used in error messages.
pub fn parse_docx<R: Read + Seek>(
    reader: R,
    path: &Path,
) -> Result<ExtractedDocument, ConversionError> {
    let mut archive = ZipArchive::new(reader)
        .map_err(|e| ConversionError::corrupt(path, format!("invalid DOCX archive: {e}")))?;

    let body = read_part(&mut archive, "word/document.xml")
        .ok_or_else(|| ConversionError::corrupt(path, "missing word/document.xml"))?;
    let styles = read_part(&mut archive, "word/styles.xml")
        .map(|xml| parse_styles(&xml))
        .unwrap_or_default();
    let rels = read_part(&mut archive, "word/_rels/document.xml.rels")
        .map(|xml| parse_relationships(&xml))
        .unwrap_or_default();
    let title = read_part(&mut archive, "docProps/core.xml").and_then(|xml| parse_title(&xml));

    let blocks = walk_body(&body, &styles, &rels, &mut archive)
        .map_err(|detail| ConversionError::corrupt(path, detail))?;

    debug!("DOCX parsed: {} blocks from {}", blocks.len(), path.display());
    Ok(ExtractedDocument {
        title,
        pages: vec![Page {
            number: 1,
            kind: PageKind::Flow,
            blocks,
            background: None,
        }],
    })
}

// ── Archive helpers ──────────────────────────────────────────────────────

fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Option<String> {
    let mut part = archive.by_name(name).ok()?;
    let mut content = String::new();
    part.read_to_string(&mut content).ok()?;
    Some(content)
}

fn read_bytes<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Option<Vec<u8>> {
    let mut part = archive.by_name(name).ok()?;
    let mut bytes = Vec::new();
    part.read_to_end(&mut bytes).ok()?;
    Some(bytes)
}

/// Extract an attribute value by key from an element.
fn get_attr(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .find(|a| a.as_ref().ok().map(|x| x.key.as_ref()) == Some(key))
        .and_then(Result::ok)
        .map(|attr| String::from_utf8_lossy(&attr.value).to_string())
}

/// `<w:b w:val="0"/>` and friends switch a toggle property off.
fn toggle_on(e: &BytesStart) -> bool {
    !matches!(get_attr(e, b"w:val").as_deref(), Some("0" | "false" | "off"))
}

fn mime_for(target: &str) -> Option<&'static str> {
    let ext = target.rsplit('.').next()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}

// ── Auxiliary parts ──────────────────────────────────────────────────────

/// Style id → lowercase style name, e.g. `Heading1` → `heading 1`.
fn parse_styles(xml: &str) -> HashMap<String, String> {
    let mut styles = HashMap::new();
    let mut reader = Reader::from_str(xml);
    let mut current: Option<String> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.name().as_ref() == b"w:style" => {
                current = get_attr(&e, b"w:styleId");
            }
            Ok(Event::Start(e) | Event::Empty(e)) if e.name().as_ref() == b"w:name" => {
                if let (Some(id), Some(name)) = (current.as_ref(), get_attr(&e, b"w:val")) {
                    styles.insert(id.clone(), name.to_ascii_lowercase());
                }
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"w:style" => current = None,
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!("Ignoring malformed styles.xml: {e}");
                break;
            }
            _ => {}
        }
        buf.clear();
    }
    styles
}

/// Relationship id → archive path of the target part.
fn parse_relationships(xml: &str) -> HashMap<String, String> {
    let mut rels = HashMap::new();
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e) | Event::Empty(e)) if e.name().as_ref() == b"Relationship" => {
                if get_attr(&e, b"TargetMode").as_deref() == Some("External") {
                    continue;
                }
                if let (Some(id), Some(target)) = (get_attr(&e, b"Id"), get_attr(&e, b"Target")) {
                    let full = match target.strip_prefix('/') {
                        Some(absolute) => absolute.to_string(),
                        None => format!("word/{target}"),
                    };
                    rels.insert(id, full);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!("Ignoring malformed document.xml.rels: {e}");
                break;
            }
            _ => {}
        }
        buf.clear();
    }
    rels
}

fn parse_title(xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    let mut in_title = false;
    let mut title = String::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.name().as_ref() == b"dc:title" => in_title = true,
            Ok(Event::Text(e)) if in_title => {
                title.push_str(&e.unescape().unwrap_or_default());
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"dc:title" => break,
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    let title = title.trim().to_string();
    (!title.is_empty()).then_some(title)
}

// ── Body walk ────────────────────────────────────────────────────────────

#[derive(Default)]
struct TableBuilder {
    rows: Vec<Vec<String>>,
    row: Vec<String>,
    cell: Vec<String>,
}

struct BodyState<'a> {
    styles: &'a HashMap<String, String>,
    rels: &'a HashMap<String, String>,
    blocks: Vec<Block>,

    para_style: Option<String>,
    para_align: Option<Alignment>,
    para_is_list: bool,
    spans: Vec<Span>,
    pending_images: Vec<EmbeddedImage>,

    run: Span,
    in_run: bool,
    in_text: bool,

    image_alt: Option<String>,
    image_count: usize,

    tables: Vec<TableBuilder>,
    table_images: Vec<EmbeddedImage>,
}

impl<'a> BodyState<'a> {
    fn new(styles: &'a HashMap<String, String>, rels: &'a HashMap<String, String>) -> Self {
        Self {
            styles,
            rels,
            blocks: Vec::new(),
            para_style: None,
            para_align: None,
            para_is_list: false,
            spans: Vec::new(),
            pending_images: Vec::new(),
            run: Span::default(),
            in_run: false,
            in_text: false,
            image_alt: None,
            image_count: 0,
            tables: Vec::new(),
            table_images: Vec::new(),
        }
    }

    fn style_name(&self) -> Option<String> {
        let id = self.para_style.as_ref()?;
        let name = self.styles.get(id).unwrap_or(id);
        Some(name.chars().filter(|c| !c.is_whitespace()).collect::<String>().to_ascii_lowercase())
    }

    fn heading_level(&self) -> Option<u8> {
        let name = self.style_name()?;
        match name.as_str() {
            "title" => Some(1),
            "subtitle" => Some(2),
            _ => name
                .strip_prefix("heading")
                .and_then(|n| n.parse::<u8>().ok())
                .map(|n| n.clamp(1, 6)),
        }
    }

    fn is_list(&self) -> bool {
        self.para_is_list
            || self.style_name().is_some_and(|n| {
                n == "listparagraph" || n.starts_with("listbullet") || n.starts_with("listnumber")
            })
    }

    fn on_start<R: Read + Seek>(
        &mut self,
        e: &BytesStart<'_>,
        empty: bool,
        archive: &mut ZipArchive<R>,
    ) {
        match e.name().as_ref() {
            b"w:p" if !empty => {
                self.para_style = None;
                self.para_align = None;
                self.para_is_list = false;
                self.spans.clear();
            }
            b"w:pStyle" => self.para_style = get_attr(e, b"w:val"),
            b"w:jc" => {
                self.para_align = match get_attr(e, b"w:val").as_deref() {
                    Some("center") => Some(Alignment::Center),
                    Some("right" | "end") => Some(Alignment::Right),
                    Some("both" | "distribute") => Some(Alignment::Justify),
                    Some("left" | "start") => Some(Alignment::Left),
                    _ => None,
                }
            }
            b"w:numPr" => self.para_is_list = true,
            b"w:r" if !empty => {
                self.run = Span::default();
                self.in_run = true;
            }
            b"w:b" if self.in_run => self.run.bold = toggle_on(e),
            b"w:i" if self.in_run => self.run.italic = toggle_on(e),
            b"w:u" if self.in_run => {
                self.run.underline = get_attr(e, b"w:val").map_or(true, |v| v != "none");
            }
            b"w:color" if self.in_run => {
                self.run.color = get_attr(e, b"w:val").filter(|v| {
                    v.len() == 6 && v.chars().all(|c| c.is_ascii_hexdigit())
                });
            }
            b"w:sz" if self.in_run => {
                self.run.size_pt = get_attr(e, b"w:val")
                    .and_then(|v| v.parse::<f32>().ok())
                    .map(|half_points| half_points / 2.0);
            }
            b"w:t" if !empty => self.in_text = true,
            b"w:tab" if self.in_run => self.run.text.push('\t'),
            b"w:br" | b"w:cr" if self.in_run => self.run.text.push('\n'),
            b"wp:docPr" => {
                self.image_alt = get_attr(e, b"descr")
                    .filter(|d| !d.trim().is_empty())
                    .or_else(|| get_attr(e, b"name"));
            }
            b"a:blip" => {
                if let Some(id) = get_attr(e, b"r:embed") {
                    if let Some(image) = self.load_image(&id, archive) {
                        self.pending_images.push(image);
                    }
                }
            }
            b"w:tbl" if !empty => self.tables.push(TableBuilder::default()),
            b"w:tr" if !empty => {
                if let Some(t) = self.tables.last_mut() {
                    t.row.clear();
                }
            }
            b"w:tc" if !empty => {
                if let Some(t) = self.tables.last_mut() {
                    t.cell.clear();
                }
            }
            _ => {}
        }
    }

    fn on_text(&mut self, text: &str) {
        if self.in_text {
            self.run.text.push_str(text);
        }
    }

    fn on_end(&mut self, name: &[u8]) {
        match name {
            b"w:t" => self.in_text = false,
            b"w:r" => {
                self.in_run = false;
                if !self.run.text.is_empty() {
                    self.spans.push(std::mem::take(&mut self.run));
                }
            }
            b"w:p" => self.finish_paragraph(),
            b"w:tc" => {
                if let Some(t) = self.tables.last_mut() {
                    let cell = t.cell.join("\n");
                    t.row.push(cell);
                    t.cell.clear();
                }
            }
            b"w:tr" => {
                if let Some(t) = self.tables.last_mut() {
                    let row = std::mem::take(&mut t.row);
                    if !row.is_empty() {
                        t.rows.push(row);
                    }
                }
            }
            b"w:tbl" => self.finish_table(),
            _ => {}
        }
    }

    fn finish_paragraph(&mut self) {
        let spans = std::mem::take(&mut self.spans);
        let text: String = spans.iter().map(|s| s.text.as_str()).collect();
        let images = std::mem::take(&mut self.pending_images);

        if let Some(table) = self.tables.last_mut() {
            if !text.trim().is_empty() {
                table.cell.push(text.trim().to_string());
            }
            self.table_images.extend(images);
            return;
        }

        if !text.trim().is_empty() {
            let block = if let Some(level) = self.heading_level() {
                Block::Heading { level, spans }
            } else if self.is_list() {
                Block::ListItem { spans }
            } else {
                Block::Paragraph {
                    spans,
                    align: self.para_align,
                }
            };
            self.blocks.push(block);
        }
        self.blocks.extend(images.into_iter().map(Block::Image));
    }

    fn finish_table(&mut self) {
        let Some(table) = self.tables.pop() else {
            return;
        };
        match self.tables.last_mut() {
            // Nested tables flatten into the enclosing cell.
            Some(parent) => {
                let text = table
                    .rows
                    .iter()
                    .map(|r| r.join(" | "))
                    .collect::<Vec<_>>()
                    .join("\n");
                if !text.trim().is_empty() {
                    parent.cell.push(text);
                }
            }
            None => {
                if !table.rows.is_empty() {
                    self.blocks.push(Block::Table { rows: table.rows });
                }
                let images = std::mem::take(&mut self.table_images);
                self.blocks.extend(images.into_iter().map(Block::Image));
            }
        }
    }

    fn load_image<R: Read + Seek>(
        &mut self,
        rel_id: &str,
        archive: &mut ZipArchive<R>,
    ) -> Option<EmbeddedImage> {
        let target = self.rels.get(rel_id)?;
        let Some(mime) = mime_for(target) else {
            debug!("Skipping non-web image {target}");
            return None;
        };
        let Some(bytes) = read_bytes(archive, target) else {
            warn!("Image part {target} referenced by {rel_id} is missing");
            return None;
        };
        self.image_count += 1;
        let alt = self
            .image_alt
            .take()
            .unwrap_or_else(|| format!("Image {}", self.image_count));
        Some(EmbeddedImage {
            source: ImageSource::Encoded {
                mime: mime.to_string(),
                bytes,
            },
            alt,
        })
    }
}

fn walk_body<R: Read + Seek>(
    xml: &str,
    styles: &HashMap<String, String>,
    rels: &HashMap<String, String>,
    archive: &mut ZipArchive<R>,
) -> Result<Vec<Block>, String> {
    let mut state = BodyState::new(styles, rels);
    let mut reader = Reader::from_str(xml);
    // Whitespace inside w:t is significant (xml:space="preserve").
    reader.trim_text(false);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => state.on_start(&e, false, archive),
            Ok(Event::Empty(e)) => state.on_start(&e, true, archive),
            Ok(Event::Text(e)) => {
                let text = e.unescape().map_err(|e| format!("bad text: {e}"))?;
                state.on_text(&text);
            }
            Ok(Event::End(e)) => state.on_end(e.name().as_ref()),
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("error parsing document.xml: {e}")),
            _ => {}
        }
        buf.clear();
    }

    // A truncated body may leave a table open; keep what was read.
    while !state.tables.is_empty() {
        state.finish_table();
    }
    Ok(state.blocks)
}

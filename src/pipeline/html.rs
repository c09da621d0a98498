//! HTML rendering: [`ExtractedDocument`] → one self-contained HTML page.
//!
//! Output is deterministic: the same document and quality always yield the
//! same bytes. Stylesheet and scripts are inlined and images are embedded as
//! `data:` URIs, so the file opens offline with nothing beside it.

use crate::document::{Alignment, Block, EmbeddedImage, ExtractedDocument, Page, PageKind, Span};
use crate::pipeline::encode::encode_data_uri;
use std::fmt::Write as _;
use tracing::warn;

const BASE_CSS: &str = r#"
* { margin: 0; padding: 0; box-sizing: border-box; }
body {
    font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Arial, sans-serif;
    line-height: 1.6;
    color: #333;
    background-color: #f5f5f5;
    padding: 20px;
}
.resume-container {
    max-width: 850px;
    margin: 0 auto;
    background-color: white;
    box-shadow: 0 0 20px rgba(0,0,0,0.1);
    padding: 40px;
    position: relative;
}
h1 { font-size: 2.5em; margin-bottom: 0.5em; color: #2c3e50; }
h2 { font-size: 1.8em; margin-top: 1em; margin-bottom: 0.5em; color: #34495e; border-bottom: 2px solid #3498db; padding-bottom: 0.3em; }
h3 { font-size: 1.4em; margin-top: 0.8em; margin-bottom: 0.4em; color: #34495e; }
h4 { font-size: 1.2em; margin-top: 0.6em; margin-bottom: 0.3em; color: #34495e; }
h5, h6 { font-size: 1.1em; margin-top: 0.5em; margin-bottom: 0.3em; color: #34495e; }
p { margin-bottom: 0.8em; }
ul, ol { margin-left: 20px; margin-bottom: 0.8em; }
li { margin-bottom: 0.3em; }
table { width: 100%; border-collapse: collapse; margin-bottom: 1em; }
th, td { padding: 8px 12px; text-align: left; border-bottom: 1px solid #ddd; vertical-align: top; }
th { background-color: #f8f9fa; font-weight: bold; }
img { max-width: 100%; height: auto; display: block; margin: 1em auto; }
strong, b { font-weight: 600; color: #2c3e50; }
em, i { font-style: italic; }
u { text-decoration: underline; }
a { color: #3498db; text-decoration: none; }
.preserve-space { white-space: pre-wrap; }
.pdf-page, .ocr-page { position: relative; margin-bottom: 1em; }
.ocr-page .page-scan { width: 100%; opacity: 0.1; position: absolute; top: 0; left: 0; z-index: 0; margin: 0; }
.ocr-page .ocr-text { position: relative; z-index: 1; }
.page-break { page-break-after: always; border-top: 1px dashed #ddd; margin: 2em 0; }
.download-buttons { text-align: right; margin-bottom: 1em; }
.btn { padding: 10px 20px; margin: 5px; border: none; border-radius: 5px; cursor: pointer; font-size: 14px; color: white; }
.btn-print { background-color: #3498db; }
.btn-pdf { background-color: #e74c3c; }
"#;

const RESPONSIVE_CSS: &str = r#"
@media screen and (max-width: 768px) {
    body { padding: 10px; }
    .resume-container { padding: 20px; }
}
@media screen and (max-width: 480px) {
    .resume-container { padding: 15px; }
    h1 { font-size: 1.8em; }
    h2 { font-size: 1.4em; }
    table { font-size: 0.9em; }
}
@media (prefers-color-scheme: dark) {
    body { background-color: #1a1a1a; color: #e0e0e0; }
    .resume-container { background-color: #2a2a2a; }
    h1, h2, h3, h4, h5, h6, strong, b { color: #4a9eff; }
    th { background-color: #333; }
}
@media print {
    body { background-color: white; padding: 0; font-size: 11pt; }
    .resume-container { box-shadow: none; max-width: 100%; padding: 0; }
    .download-buttons { display: none; }
    .page-break { border: none; margin: 0; }
}
"#;

const SCRIPTS: &str = r#"
function printResume() {
    window.print();
}
function downloadAsPDF() {
    window.print();
}
"#;

const BUTTONS: &str = r#"<div class="download-buttons">
<button onclick="printResume()" class="btn btn-print">Print</button>
<button onclick="downloadAsPDF()" class="btn btn-pdf">Download PDF</button>
</div>
"#;

/// Escape text for HTML element content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render a full HTML page. `fallback_title` is used when the document
/// metadata carries no title.
pub fn render_document(doc: &ExtractedDocument, fallback_title: &str, quality: u8) -> String {
    let title = doc
        .title
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or(fallback_title);

    let mut content = String::from(BUTTONS);
    for (i, page) in doc.pages.iter().enumerate() {
        if i > 0 && page.kind != PageKind::Flow {
            content.push_str("<div class=\"page-break\"></div>\n");
        }
        render_page(&mut content, page, quality);
    }

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n\
         <meta charset=\"UTF-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n\
         <title>{title}</title>\n<style>{BASE_CSS}{RESPONSIVE_CSS}</style>\n</head>\n<body>\n\
         <div class=\"resume-container\">\n{content}</div>\n\
         <script>{SCRIPTS}</script>\n</body>\n</html>\n",
        title = escape_html(title),
    )
}

fn render_page(out: &mut String, page: &Page, quality: u8) {
    match page.kind {
        PageKind::Flow => render_blocks(out, &page.blocks, quality),
        PageKind::Pdf => {
            let _ = writeln!(out, "<div class=\"pdf-page\" data-page=\"{}\">", page.number);
            render_blocks(out, &page.blocks, quality);
            out.push_str("</div>\n");
        }
        PageKind::Ocr => {
            let _ = writeln!(out, "<div class=\"ocr-page\" data-page=\"{}\">", page.number);
            if let Some(scan) = &page.background {
                if let Some(src) = data_uri(scan, quality) {
                    let _ = writeln!(
                        out,
                        "<img class=\"page-scan\" src=\"{src}\" alt=\"Page {}\">",
                        page.number
                    );
                }
            }
            out.push_str("<div class=\"ocr-text\">\n");
            render_blocks(out, &page.blocks, quality);
            out.push_str("</div>\n</div>\n");
        }
    }
}

fn render_blocks(out: &mut String, blocks: &[Block], quality: u8) {
    let mut in_list = false;
    for block in blocks {
        let is_item = matches!(block, Block::ListItem { .. });
        if is_item && !in_list {
            out.push_str("<ul>\n");
        } else if !is_item && in_list {
            out.push_str("</ul>\n");
        }
        in_list = is_item;

        match block {
            Block::Heading { level, spans } => {
                let level = (*level).clamp(1, 6);
                let _ = writeln!(out, "<h{level}>{}</h{level}>", render_spans(spans));
            }
            Block::Paragraph { spans, align } => match align {
                Some(a) => {
                    let _ = writeln!(
                        out,
                        "<p style=\"text-align: {}\">{}</p>",
                        align_css(*a),
                        render_spans(spans)
                    );
                }
                None => {
                    let _ = writeln!(out, "<p>{}</p>", render_spans(spans));
                }
            },
            Block::ListItem { spans } => {
                let _ = writeln!(out, "<li>{}</li>", render_spans(spans));
            }
            Block::Table { rows } => render_table(out, rows),
            Block::Lines(lines) => {
                let body = lines
                    .iter()
                    .map(|l| escape_html(l))
                    .collect::<Vec<_>>()
                    .join("<br>\n");
                let _ = writeln!(out, "<p class=\"preserve-space\">{body}</p>");
            }
            Block::Image(image) => {
                if let Some(src) = data_uri(image, quality) {
                    let _ = writeln!(out, "<img src=\"{src}\" alt=\"{}\">", escape_html(&image.alt));
                }
            }
        }
    }
    if in_list {
        out.push_str("</ul>\n");
    }
}

fn render_table(out: &mut String, rows: &[Vec<String>]) {
    out.push_str("<table class=\"docx-table\">\n");
    for (i, row) in rows.iter().enumerate() {
        let tag = if i == 0 { "th" } else { "td" };
        out.push_str("<tr>");
        for cell in row {
            let text = escape_html(cell).replace('\n', "<br>");
            let _ = write!(out, "<{tag}>{text}</{tag}>");
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</table>\n");
}

fn render_spans(spans: &[Span]) -> String {
    let mut out = String::new();
    for span in spans {
        let mut html = escape_html(&span.text)
            .replace('\t', "&emsp;")
            .replace('\n', "<br>");
        if span.bold {
            html = format!("<strong>{html}</strong>");
        }
        if span.italic {
            html = format!("<em>{html}</em>");
        }
        if span.underline {
            html = format!("<u>{html}</u>");
        }

        let mut style = String::new();
        if let Some(color) = &span.color {
            let _ = write!(style, "color: #{color};");
        }
        if let Some(size) = span.size_pt {
            let _ = write!(style, "font-size: {size}pt;");
        }
        if style.is_empty() {
            out.push_str(&html);
        } else {
            let _ = write!(out, "<span style=\"{style}\">{html}</span>");
        }
    }
    out
}

fn align_css(align: Alignment) -> &'static str {
    match align {
        Alignment::Left => "left",
        Alignment::Center => "center",
        Alignment::Right => "right",
        Alignment::Justify => "justify",
    }
}

fn data_uri(image: &EmbeddedImage, quality: u8) -> Option<String> {
    match encode_data_uri(&image.source, quality) {
        Ok(src) => Some(src),
        Err(e) => {
            warn!("Dropping image '{}': {e}", image.alt);
            None
        }
    }
}

//! Document formats: text extraction on the way in, rendering on the way out.
//!
//! The engine works on plain strings. This module turns uploaded bytes into
//! that string and turns the paraphrased string back into a file in the
//! format the user started with.
//!
//! | format | extract             | render                  |
//! |--------|---------------------|-------------------------|
//! | TXT    | UTF-8 (lossy)       | UTF-8 pass-through      |
//! | PDF    | `pdf-extract`       | `lopdf`, Times 11pt     |
//! | DOCX   | `docx-rs`           | `docx-rs`, 1 para/block |
//!
//! ## Why spawn_blocking?
//!
//! PDF and DOCX parsing are CPU-bound and can take seconds on large files.
//! [`read_document`] runs extraction on tokio's blocking pool so it never
//! stalls the runtime threads driving other jobs.

use crate::error::ParaphraseError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Supported document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Txt,
}

impl DocumentFormat {
    /// Map a file extension (without the dot, any case) to a format.
    ///
    /// `doc` is accepted as Word; extraction of legacy binary `.doc` files
    /// fails with [`ParaphraseError::ExtractionFailed`].
    pub fn from_extension(ext: &str) -> Result<Self, ParaphraseError> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Ok(DocumentFormat::Pdf),
            "docx" | "doc" => Ok(DocumentFormat::Docx),
            "txt" | "text" => Ok(DocumentFormat::Txt),
            other => Err(ParaphraseError::UnsupportedFormat {
                format: other.to_string(),
            }),
        }
    }

    /// Format from a path's extension.
    pub fn from_path(path: &Path) -> Result<Self, ParaphraseError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ParaphraseError::UnsupportedFormat {
                format: path.display().to_string(),
            }
        })?;
        Self::from_extension(ext)
    }

    pub fn extension(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Docx => "docx",
            DocumentFormat::Txt => "txt",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "application/pdf",
            DocumentFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            DocumentFormat::Txt => "text/plain",
        }
    }

    /// Name offered for download: `paraphrased_{stem}.{ext}`.
    ///
    /// Only the last extension of `original` is dropped, so
    /// `notes.v2.txt` becomes `paraphrased_notes.v2.txt`.
    pub fn download_filename(&self, original: &str) -> String {
        let stem = match original.rfind('.') {
            Some(i) if i + 1 < original.len() => &original[..i],
            _ => original,
        };
        format!("paraphrased_{}.{}", stem, self.extension())
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Plain text pulled out of an uploaded document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedDocument {
    pub text: String,
    /// Only known for PDFs.
    pub page_count: Option<usize>,
    pub word_count: usize,
}

impl ExtractedDocument {
    fn new(text: String, page_count: Option<usize>) -> Self {
        let word_count = count_words(&text);
        Self {
            text,
            page_count,
            word_count,
        }
    }
}

/// Whitespace-separated tokens; empty text has zero words.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Extract plain text from the raw bytes of a document.
pub fn extract_text(
    bytes: &[u8],
    format: DocumentFormat,
) -> Result<ExtractedDocument, ParaphraseError> {
    let doc = match format {
        DocumentFormat::Txt => extract_txt(bytes),
        DocumentFormat::Pdf => extract_pdf(bytes)?,
        DocumentFormat::Docx => extract_docx(bytes)?,
    };
    debug!(
        "Extracted {} words from {} document",
        doc.word_count, format
    );
    Ok(doc)
}

/// Read a file from disk and extract its text.
///
/// The format is taken from the file extension.
pub async fn read_document(
    path: &Path,
) -> Result<(DocumentFormat, ExtractedDocument), ParaphraseError> {
    let format = DocumentFormat::from_path(path)?;
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| map_read_error(path.to_path_buf(), e))?;
    info!("Read {} ({} bytes, {})", path.display(), bytes.len(), format);

    let doc = tokio::task::spawn_blocking(move || extract_text(&bytes, format))
        .await
        .map_err(|e| ParaphraseError::Internal(format!("Extraction task panicked: {}", e)))??;

    Ok((format, doc))
}

fn map_read_error(path: PathBuf, e: std::io::Error) -> ParaphraseError {
    match e.kind() {
        std::io::ErrorKind::PermissionDenied => ParaphraseError::PermissionDenied { path },
        _ => ParaphraseError::FileNotFound { path },
    }
}

/// Render paraphrased text back into `format`.
pub fn render_document(text: &str, format: DocumentFormat) -> Result<Vec<u8>, ParaphraseError> {
    match format {
        DocumentFormat::Txt => Ok(text.as_bytes().to_vec()),
        DocumentFormat::Docx => render_docx(text),
        DocumentFormat::Pdf => render_pdf(text),
    }
}

// ── TXT ──────────────────────────────────────────────────────────────────────

fn extract_txt(bytes: &[u8]) -> ExtractedDocument {
    let text = match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => String::from_utf8_lossy(bytes).into_owned(),
    };
    let text = text.trim_start_matches('\u{FEFF}').replace("\r\n", "\n");
    ExtractedDocument::new(text, None)
}

// ── PDF ──────────────────────────────────────────────────────────────────────

#[cfg(feature = "pdf")]
fn extract_pdf(bytes: &[u8]) -> Result<ExtractedDocument, ParaphraseError> {
    let raw = pdf_extract::extract_text_from_mem(bytes).map_err(|e| {
        ParaphraseError::ExtractionFailed {
            format: "pdf".to_string(),
            detail: e.to_string(),
        }
    })?;

    // pdf-extract separates pages with form feeds.
    let pages: Vec<&str> = raw
        .split('\x0C')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    let page_count = pages.len().max(1);

    Ok(ExtractedDocument::new(pages.join("\n\n"), Some(page_count)))
}

#[cfg(not(feature = "pdf"))]
fn extract_pdf(_bytes: &[u8]) -> Result<ExtractedDocument, ParaphraseError> {
    Err(ParaphraseError::UnsupportedFormat {
        format: "pdf (built without the `pdf` feature)".to_string(),
    })
}

/// US Letter in points.
#[cfg(feature = "pdf")]
const PAGE_WIDTH: i64 = 612;
#[cfg(feature = "pdf")]
const PAGE_HEIGHT: i64 = 792;
/// 1 inch.
#[cfg(feature = "pdf")]
const PDF_MARGIN: i64 = 72;
#[cfg(feature = "pdf")]
const PDF_FONT_SIZE: i64 = 11;
/// 1.5 × font size, in tenths of a point.
#[cfg(feature = "pdf")]
const LINE_HEIGHT_TENTHS: i64 = 165;

/// Times-Roman advance widths (1/1000 em) for ASCII 32..=126.
#[cfg(feature = "pdf")]
const TIMES_WIDTHS: [u16; 95] = [
    250, 333, 408, 500, 500, 833, 778, 333, 333, 333, 500, 564, 250, 333, 250, 278, // ' '../
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, // 0..9
    278, 278, 564, 564, 564, 444, 921, // :..@
    722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889, 722, 722, 556, 722, 667,
    556, 611, 722, 722, 944, 722, 722, 611, // A..Z
    333, 278, 333, 469, 500, 333, // [..`
    444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778, 500, 500, 500, 500, 333,
    389, 278, 500, 500, 722, 500, 500, 444, // a..z
    480, 200, 480, 541, // {..~
];

/// Width of `word` in 1/1000 pt at [`PDF_FONT_SIZE`].
#[cfg(feature = "pdf")]
fn text_width(word: &str) -> i64 {
    word.chars()
        .map(|c| {
            let code = c as u32;
            let w = if (32..=126).contains(&code) {
                TIMES_WIDTHS[(code - 32) as usize]
            } else {
                500
            };
            i64::from(w) * PDF_FONT_SIZE
        })
        .sum()
}

/// Greedy word wrap to `max_width` (1/1000 pt). A word wider than a line
/// gets a line to itself.
#[cfg(feature = "pdf")]
fn wrap_line(paragraph: &str, max_width: i64) -> Vec<String> {
    let space = text_width(" ");
    let mut lines = Vec::new();
    let mut line = String::new();
    let mut width = 0;

    for word in paragraph.split_whitespace() {
        let w = text_width(word);
        if !line.is_empty() && width + space + w > max_width {
            lines.push(std::mem::take(&mut line));
            width = 0;
        }
        if !line.is_empty() {
            line.push(' ');
            width += space;
        }
        line.push_str(word);
        width += w;
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

/// WinAnsiEncoding bytes; characters outside it become `?`.
#[cfg(feature = "pdf")]
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' => c as u8,
            '\u{A0}'..='\u{FF}' => c as u32 as u8,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{2026}' => 0x85,
            _ => b'?',
        })
        .collect()
}

/// Lay out `text` on Letter pages: one `\n\n` block per paragraph, a blank
/// line between paragraphs, a new page when the bottom margin is reached.
#[cfg(feature = "pdf")]
fn layout_pages(text: &str) -> Vec<Vec<Option<String>>> {
    let max_width = (PAGE_WIDTH - 2 * PDF_MARGIN) * 1000;
    let lines_per_page = ((PAGE_HEIGHT - 2 * PDF_MARGIN) * 10 / LINE_HEIGHT_TENTHS) as usize;

    // `None` is the gap between paragraphs.
    let mut lines: Vec<Option<String>> = Vec::new();
    for block in text.split("\n\n").map(str::trim).filter(|b| !b.is_empty()) {
        if !lines.is_empty() {
            lines.push(None);
        }
        for raw in block.lines() {
            lines.extend(wrap_line(raw, max_width).into_iter().map(Some));
        }
    }

    let mut pages: Vec<Vec<Option<String>>> = lines
        .chunks(lines_per_page.max(1))
        .map(|page| {
            let mut page = page.to_vec();
            // A page never starts with a paragraph gap.
            if matches!(page.first(), Some(None)) {
                page.remove(0);
            }
            page
        })
        .collect();
    if pages.is_empty() {
        pages.push(Vec::new());
    }
    pages
}

#[cfg(feature = "pdf")]
fn render_pdf(text: &str) -> Result<Vec<u8>, ParaphraseError> {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    let failed = |e: lopdf::Error| ParaphraseError::Internal(format!("PDF rendering failed: {}", e));

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Times-Roman",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let top = (PAGE_HEIGHT - PDF_MARGIN - PDF_FONT_SIZE) * 10;
    let mut kids: Vec<Object> = Vec::new();

    for page in layout_pages(text) {
        let mut operations = Vec::new();
        for (i, line) in page.iter().enumerate() {
            let Some(line) = line else { continue };
            let y = (top - i as i64 * LINE_HEIGHT_TENTHS) / 10;
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), PDF_FONT_SIZE.into()]));
            operations.push(Operation::new("Td", vec![PDF_MARGIN.into(), y.into()]));
            operations.push(Operation::new(
                "Tj",
                vec![Object::string_literal(win_ansi(line))],
            ));
            operations.push(Operation::new("ET", vec![]));
        }

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().map_err(failed)?,
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut buf = Vec::new();
    doc.save_to(&mut buf)
        .map_err(|e| ParaphraseError::Internal(format!("PDF rendering failed: {}", e)))?;
    debug!("Rendered PDF: {} pages, {} bytes", count, buf.len());
    Ok(buf)
}

#[cfg(not(feature = "pdf"))]
fn render_pdf(_text: &str) -> Result<Vec<u8>, ParaphraseError> {
    Err(ParaphraseError::UnsupportedFormat {
        format: "pdf (built without the `pdf` feature)".to_string(),
    })
}

// ── DOCX ─────────────────────────────────────────────────────────────────────

#[cfg(feature = "docx")]
fn extract_docx(bytes: &[u8]) -> Result<ExtractedDocument, ParaphraseError> {
    let failed = |detail: String| ParaphraseError::ExtractionFailed {
        format: "docx".to_string(),
        detail,
    };

    let docx = docx_rs::read_docx(bytes).map_err(|e| failed(e.to_string()))?;
    let json: serde_json::Value =
        serde_json::from_str(&docx.json()).map_err(|e| failed(e.to_string()))?;

    // document.children[] -> paragraph.data.children[] (runs) -> run.data.children[] (texts)
    let children = |v: &serde_json::Value| -> Vec<serde_json::Value> {
        v.get("data")
            .and_then(|d| d.get("children"))
            .and_then(|c| c.as_array())
            .cloned()
            .unwrap_or_default()
    };

    let paragraphs: Vec<String> = json
        .get("document")
        .and_then(|d| d.get("children"))
        .and_then(|c| c.as_array())
        .map(|paras| {
            paras
                .iter()
                .map(|para| {
                    children(para)
                        .iter()
                        .flat_map(|run| children(run))
                        .filter_map(|t| {
                            t.get("data")
                                .and_then(|d| d.get("text"))
                                .and_then(|s| s.as_str())
                                .map(str::to_string)
                        })
                        .collect::<String>()
                })
                .filter(|p| !p.trim().is_empty())
                .collect()
        })
        .unwrap_or_default();

    Ok(ExtractedDocument::new(paragraphs.join("\n\n"), None))
}

#[cfg(not(feature = "docx"))]
fn extract_docx(_bytes: &[u8]) -> Result<ExtractedDocument, ParaphraseError> {
    Err(ParaphraseError::UnsupportedFormat {
        format: "docx (built without the `docx` feature)".to_string(),
    })
}

#[cfg(feature = "docx")]
fn render_docx(text: &str) -> Result<Vec<u8>, ParaphraseError> {
    use docx_rs::{Docx, PageMargin, Paragraph, Run, RunFonts};

    // 1 inch in twips; 11pt in half-points.
    const MARGIN: i32 = 1440;
    const FONT_SIZE: usize = 22;

    let mut docx = Docx::new().page_margin(
        PageMargin::new()
            .top(MARGIN)
            .bottom(MARGIN)
            .left(MARGIN)
            .right(MARGIN),
    );

    for block in text.split("\n\n").map(str::trim).filter(|b| !b.is_empty()) {
        let run = Run::new()
            .add_text(block)
            .size(FONT_SIZE)
            .fonts(RunFonts::new().ascii("Times New Roman"));
        docx = docx.add_paragraph(Paragraph::new().add_run(run));
    }

    let mut buf = std::io::Cursor::new(Vec::new());
    docx.build()
        .pack(&mut buf)
        .map_err(|e| ParaphraseError::Internal(format!("DOCX packing failed: {}", e)))?;
    Ok(buf.into_inner())
}

#[cfg(not(feature = "docx"))]
fn render_docx(_text: &str) -> Result<Vec<u8>, ParaphraseError> {
    Err(ParaphraseError::UnsupportedFormat {
        format: "docx (built without the `docx` feature)".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn format_from_extension() {
        assert_eq!(
            DocumentFormat::from_extension("PDF").unwrap(),
            DocumentFormat::Pdf
        );
        assert_eq!(
            DocumentFormat::from_extension("doc").unwrap(),
            DocumentFormat::Docx
        );
        assert!(matches!(
            DocumentFormat::from_extension("odt"),
            Err(ParaphraseError::UnsupportedFormat { .. })
        ));
        assert!(DocumentFormat::from_path(Path::new("README")).is_err());
    }

    #[test]
    fn mime_and_download_name() {
        assert_eq!(DocumentFormat::Txt.mime_type(), "text/plain");
        assert_eq!(
            DocumentFormat::Docx.download_filename("report.docx"),
            "paraphrased_report.docx"
        );
        assert_eq!(
            DocumentFormat::Txt.download_filename("notes.v2.txt"),
            "paraphrased_notes.v2.txt"
        );
        assert_eq!(
            DocumentFormat::Pdf.download_filename("scan"),
            "paraphrased_scan.pdf"
        );
    }

    #[test]
    fn txt_extraction() {
        let doc = extract_text(b"\xEF\xBB\xBFHello there.\r\n\r\nSecond line.", DocumentFormat::Txt)
            .unwrap();
        assert_eq!(doc.text, "Hello there.\n\nSecond line.");
        assert_eq!(doc.word_count, 4);
        assert_eq!(doc.page_count, None);
    }

    #[test]
    fn txt_extraction_is_lossy_on_bad_utf8() {
        let doc = extract_text(b"caf\xFF ok", DocumentFormat::Txt).unwrap();
        assert_eq!(doc.text, "caf\u{FFFD} ok");
    }

    #[test]
    fn word_count_of_empty_text_is_zero() {
        assert_eq!(count_words(""), 0);
        assert_eq!(count_words("  \n "), 0);
        assert_eq!(count_words(" one  two\tthree\n"), 3);
    }

    #[test]
    fn render_txt_is_passthrough() {
        assert_eq!(
            render_document("Body.", DocumentFormat::Txt).unwrap(),
            b"Body.".to_vec()
        );
    }

    #[cfg(feature = "docx")]
    #[test]
    fn docx_render_then_extract_keeps_paragraphs() {
        let text = "First paragraph here.\n\nSecond paragraph here.";
        let bytes = render_document(text, DocumentFormat::Docx).unwrap();
        assert!(bytes.starts_with(b"PK"));

        let doc = extract_text(&bytes, DocumentFormat::Docx).unwrap();
        assert_eq!(doc.text, text);
        assert_eq!(doc.word_count, 6);
    }

    #[cfg(feature = "pdf")]
    #[test]
    fn pdf_render_then_extract_keeps_words() {
        let text = "Hello world, this is paraphrased.\n\nSecond paragraph follows here.";
        let bytes = render_document(text, DocumentFormat::Pdf).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));

        let doc = extract_text(&bytes, DocumentFormat::Pdf).unwrap();
        assert_eq!(doc.page_count, Some(1));
        assert!(doc.text.contains("Hello world"), "got {:?}", doc.text);
        assert!(doc.text.contains("Second paragraph"), "got {:?}", doc.text);
    }

    #[cfg(feature = "pdf")]
    #[test]
    fn pdf_render_breaks_long_text_into_pages() {
        let paragraph = "The committee reviewed every proposal twice before voting. ".repeat(12);
        let text = vec![paragraph.trim(); 12].join("\n\n");
        let bytes = render_document(&text, DocumentFormat::Pdf).unwrap();

        let pdf = lopdf::Document::load_mem(&bytes).unwrap();
        assert!(pdf.get_pages().len() >= 2, "got {} pages", pdf.get_pages().len());
    }

    #[cfg(feature = "pdf")]
    #[test]
    fn pdf_wrap_respects_line_width() {
        let max = (PAGE_WIDTH - 2 * PDF_MARGIN) * 1000;
        let lines = wrap_line(&"word ".repeat(200), max);
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| text_width(l) <= max));
        assert_eq!(win_ansi("caf\u{e9} \u{2014} \u{4e2d}"), b"caf\xE9 \x97 ?".to_vec());
    }

    #[cfg(not(feature = "pdf"))]
    #[test]
    fn pdf_render_needs_feature() {
        assert!(matches!(
            render_document("Body.", DocumentFormat::Pdf),
            Err(ParaphraseError::UnsupportedFormat { .. })
        ));
    }

    #[cfg(feature = "pdf")]
    #[test]
    fn garbage_pdf_fails_extraction() {
        let err = extract_text(b"not a pdf at all", DocumentFormat::Pdf).unwrap_err();
        assert!(matches!(err, ParaphraseError::ExtractionFailed { .. }));
    }

    #[tokio::test]
    async fn read_document_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.txt");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"Some text on disk.").unwrap();

        let (format, doc) = read_document(&path).await.unwrap();
        assert_eq!(format, DocumentFormat::Txt);
        assert_eq!(doc.text, "Some text on disk.");
    }

    #[tokio::test]
    async fn read_document_missing_file() {
        let err = read_document(Path::new("/definitely/not/here.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, ParaphraseError::FileNotFound { .. }));
    }
}

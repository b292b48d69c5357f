//! Guide document rendering: plain text in, fixed-layout paginated PDF out.
//!
//! The guide text is not structurally parsed; markdown markers are written as
//! literal characters. Characters the built-in Helvetica font cannot encode
//! are sanitized before writing instead of failing the render.

use printpdf::{BuiltinFont, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};
use std::io::BufWriter;

use crate::error::{MedEaseError, Result};

/// Fixed filename offered for the downloadable guide.
pub const GUIDE_FILENAME: &str = "MedEase_Presurgery_Guide.pdf";

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 20.0;
const TOP_MM: f32 = 280.0;
const LINE_HEIGHT_MM: f32 = 5.5;
const FONT_SIZE: f32 = 12.0;
const WRAP_COLUMNS: usize = 90;

/// Renders guide text into a single-font A4 PDF with automatic word wrapping
/// and page breaks. Returns the document bytes.
pub fn render_guide_pdf(text: &str) -> Result<Vec<u8>> {
    let (doc, page1, layer1) = PdfDocument::new(
        "MedEase Pre-Surgery Guide",
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "Layer 1",
    );
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| MedEaseError::Document(format!("font error: {e}")))?;

    let mut layer = doc.get_page(page1).get_layer(layer1);
    let mut y = Mm(TOP_MM);

    for paragraph in sanitize_text(text).lines() {
        for line in wrap_text(paragraph, WRAP_COLUMNS) {
            if y < Mm(MARGIN_MM) {
                layer = next_page(&doc);
                y = Mm(TOP_MM);
            }
            layer.use_text(&line, FONT_SIZE, Mm(MARGIN_MM), y, &font);
            y -= Mm(LINE_HEIGHT_MM);
        }
    }

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf)
        .map_err(|e| MedEaseError::Document(format!("save error: {e}")))?;
    buf.into_inner()
        .map_err(|e| MedEaseError::Document(format!("buffer error: {e}")))
}

fn next_page(doc: &PdfDocumentReference) -> PdfLayerReference {
    let (page, layer) = doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
    doc.get_page(page).get_layer(layer)
}

/// Replaces characters the built-in font's WinAnsi encoding cannot represent.
/// Newlines survive as paragraph breaks; everything else outside printable
/// ASCII and Latin-1 becomes `?`.
fn sanitize_text(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\n' => '\n',
            '\t' => ' ',
            ' '..='~' => c,
            '\u{a0}'..='\u{ff}' => c,
            _ => '?',
        })
        .collect()
}

/// Simple word-wrap helper for PDF text rendering.
fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.len() + word.len() + 1 > max_chars && !current.is_empty() {
            lines.push(current.clone());
            current.clear();
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

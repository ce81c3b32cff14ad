use crate::constants::documents::{CONTEXT_PROMPT, EXTRACTION_ERROR_MARKER};
use crate::error::{KaiwaError, Result};
use hayro_interpret::font::Glyph;
use hayro_interpret::hayro_syntax::Pdf;
use hayro_interpret::util::PageExt;
use hayro_interpret::{
    interpret_page, BlendMode, ClipPath, Context, Device, GlyphDrawMode, Image,
    InterpreterSettings, Paint, PathDrawMode, SoftMask,
};
use kurbo::{Affine, Rect, Shape};
use quick_xml::events::{BytesRef, Event};
use quick_xml::Reader;
use std::io::{Cursor, Read};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Txt,
    Pdf,
    Docx,
}

impl DocumentKind {
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.trim_start_matches('.').to_lowercase().as_str() {
            "txt" => Some(Self::Txt),
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            _ => None,
        }
    }

    pub fn from_path(path: &std::path::Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

/// Extract plain text from an uploaded document.
///
/// Failures come back as a message containing
/// [`EXTRACTION_ERROR_MARKER`]; use [`classify_extraction`] to tell them
/// apart from real content.
pub fn extract_text(bytes: &[u8], extension: &str) -> String {
    let result = match DocumentKind::from_extension(extension) {
        Some(DocumentKind::Txt) => {
            String::from_utf8(bytes.to_vec()).map_err(|e| format!("invalid UTF-8: {e}"))
        }
        Some(DocumentKind::Docx) => extract_docx(bytes),
        Some(DocumentKind::Pdf) => extract_pdf(bytes),
        None => Err(format!("unsupported file type: {extension}")),
    };

    result.unwrap_or_else(|e| format!("{EXTRACTION_ERROR_MARKER}: {e}"))
}

/// Split an [`extract_text`] result into content or an extraction error.
pub fn classify_extraction(raw: String) -> Result<String> {
    if raw.contains(EXTRACTION_ERROR_MARKER) {
        Err(KaiwaError::Extraction(raw))
    } else {
        Ok(raw)
    }
}

/// System context that grounds answers in the document text.
pub fn document_context(text: &str) -> String {
    format!("{CONTEXT_PROMPT}\n\n---\n{text}\n---")
}

fn extract_docx(bytes: &[u8]) -> std::result::Result<String, String> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| format!("not a docx archive: {e}"))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| format!("missing document body: {e}"))?
        .read_to_string(&mut xml)
        .map_err(|e| format!("unreadable document body: {e}"))?;

    Ok(docx_paragraphs(&xml)?.join("\n"))
}

/// Paragraph texts of a WordprocessingML body. Only `w:t` text counts;
/// tabs and breaks are honored inside runs.
fn docx_paragraphs(xml: &str) -> std::result::Result<Vec<String>, String> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_run = false;
    let mut in_text = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| format!("malformed document body: {e}"))?;
        match event {
            Event::Start(e) => match e.name().as_ref() {
                b"w:r" => in_run = true,
                b"w:t" => in_text = true,
                b"w:tab" if in_run => current.push('\t'),
                b"w:br" | b"w:cr" if in_run => current.push('\n'),
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:p" => paragraphs.push(std::mem::take(&mut current)),
                b"w:tab" if in_run => current.push('\t'),
                b"w:br" | b"w:cr" if in_run => current.push('\n'),
                _ => {}
            },
            Event::End(e) => match e.name().as_ref() {
                b"w:r" => in_run = false,
                b"w:t" => in_text = false,
                b"w:p" => paragraphs.push(std::mem::take(&mut current)),
                _ => {}
            },
            Event::Text(text) if in_text => {
                let text = text
                    .decode()
                    .map_err(|e| format!("undecodable text: {e}"))?;
                current.push_str(&text);
            }
            Event::GeneralRef(reference) if in_text => {
                current.push_str(&resolve_reference(&reference)?);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !current.is_empty() {
        paragraphs.push(current);
    }
    Ok(paragraphs)
}

/// `&amp;`, `&#8217;` and friends.
fn resolve_reference(reference: &BytesRef<'_>) -> std::result::Result<String, String> {
    let name = reference
        .decode()
        .map_err(|e| format!("undecodable entity: {e}"))?;
    let escaped = format!("&{name};");
    quick_xml::escape::unescape(&escaped)
        .map(|s| s.into_owned())
        .map_err(|e| format!("unknown entity {escaped}: {e}"))
}

fn extract_pdf(bytes: &[u8]) -> std::result::Result<String, String> {
    let pdf = Pdf::new(Arc::new(bytes.to_vec())).map_err(|e| format!("not a PDF: {e:?}"))?;
    let pages = pdf.pages();
    if pages.is_empty() {
        return Err("PDF has no pages".to_string());
    }

    let settings = InterpreterSettings::default();
    let mut texts = Vec::with_capacity(pages.len());
    for page in pages.iter() {
        let (width, height) = page.render_dimensions();
        let mut ctx = Context::new(
            page.initial_transform(true),
            Rect::new(0.0, 0.0, width as f64, height as f64),
            page.xref(),
            settings.clone(),
        );
        let mut collector = GlyphCollector::default();
        interpret_page(page, &mut ctx, &mut collector);
        texts.push(collector.text());
    }

    let text = texts.join("\n");
    if text.trim().is_empty() {
        return Err("PDF contains no extractable text".to_string());
    }
    Ok(text)
}

/// Records the Unicode value and page-space box of every drawn glyph.
#[derive(Default)]
struct GlyphCollector {
    glyphs: Vec<(Option<char>, Option<Rect>)>,
}

impl GlyphCollector {
    /// Glyphs in drawing order. A space goes in where the horizontal gap
    /// exceeds a quarter of the glyph height, a newline where two glyphs
    /// share no vertical extent.
    fn text(&self) -> String {
        let mut out = String::new();
        let mut last_box: Option<Rect> = None;

        for &(ch, bbox) in &self.glyphs {
            if let (Some(prev), Some(cur)) = (last_box, bbox) {
                if !shares_line(prev, cur) {
                    if !out.is_empty() && !out.ends_with('\n') {
                        out.push('\n');
                    }
                } else {
                    let gap = cur.x0 - prev.x1;
                    let height = 0.5 * (prev.height() + cur.height());
                    if gap > 0.25 * height && !out.is_empty() && !out.ends_with(|c: char| c == ' ' || c == '\n') {
                        out.push(' ');
                    }
                }
            }
            if let Some(ch) = ch {
                out.push(ch);
            }
            if bbox.is_some() {
                last_box = bbox;
            }
        }
        out
    }
}

fn shares_line(a: Rect, b: Rect) -> bool {
    let overlap = a.y1.min(b.y1) - a.y0.max(b.y0);
    let smaller = a.height().min(b.height());
    smaller > 0.0 && overlap / smaller >= 0.5
}

impl<'a> Device<'a> for GlyphCollector {
    fn set_soft_mask(&mut self, _mask: Option<SoftMask<'a>>) {}

    fn set_blend_mode(&mut self, _blend_mode: BlendMode) {}

    fn draw_path(
        &mut self,
        _path: &kurbo::BezPath,
        _transform: Affine,
        _paint: &Paint<'a>,
        _draw_mode: &PathDrawMode,
    ) {
    }

    fn push_clip_path(&mut self, _clip_path: &ClipPath) {}

    fn push_transparency_group(
        &mut self,
        _opacity: f32,
        _mask: Option<SoftMask<'a>>,
        _blend_mode: BlendMode,
    ) {
    }

    fn draw_glyph(
        &mut self,
        glyph: &Glyph<'a>,
        transform: Affine,
        glyph_transform: Affine,
        _paint: &Paint<'a>,
        _draw_mode: &GlyphDrawMode,
    ) {
        // blank glyphs (spaces) have an empty outline and no usable box
        let bbox = match glyph {
            Glyph::Outline(outline) => {
                Some((transform * (glyph_transform * outline.outline())).bounding_box())
                    .filter(|r| r.area() > 0.0)
            }
            Glyph::Type3(_) => None,
        };
        self.glyphs.push((glyph.as_unicode(), bbox));
    }

    fn draw_image(&mut self, _image: Image<'a, '_>, _transform: Affine) {}

    fn pop_clip_path(&mut self) {}

    fn pop_transparency_group(&mut self) {}
}

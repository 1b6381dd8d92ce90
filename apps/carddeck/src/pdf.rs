//! PDF output.
//!
//! Replays committed canvas pages into a printpdf document. Canvas coordinates
//! are millimetres from the top-left corner; PDF coordinates grow upwards from
//! the bottom-left, so every y value is flipped against the page height here
//! and nowhere else.

use std::io::{BufWriter, Cursor};

use printpdf::path::{PaintMode, WindingOrder};
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Point, Polygon,
};
use tracing::debug;

use crate::errors::AppError;
use crate::layout::canvas::{DrawOp, Page, Rgb};
use crate::layout::font_metrics::FontFace;
use crate::layout::profile::SizeProfile;

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    italic: IndirectFontRef,
    bold_italic: IndirectFontRef,
}

impl Fonts {
    fn load(doc: &PdfDocumentReference) -> Result<Self, AppError> {
        let font = |builtin| {
            doc.add_builtin_font(builtin)
                .map_err(|e| AppError::Pdf(e.to_string()))
        };
        Ok(Fonts {
            regular: font(BuiltinFont::Helvetica)?,
            bold: font(BuiltinFont::HelveticaBold)?,
            italic: font(BuiltinFont::HelveticaOblique)?,
            bold_italic: font(BuiltinFont::HelveticaBoldOblique)?,
        })
    }

    fn get(&self, face: FontFace) -> &IndirectFontRef {
        match face {
            FontFace::Regular => &self.regular,
            FontFace::Bold => &self.bold,
            FontFace::Italic => &self.italic,
            FontFace::BoldItalic => &self.bold_italic,
        }
    }
}

/// Serializes `pages` into a PDF sized by `profile`.
pub fn write_pdf(pages: &[Page], profile: &SizeProfile, title: &str) -> Result<Vec<u8>, AppError> {
    let (first, rest) = pages
        .split_first()
        .ok_or_else(|| AppError::Pdf("Deck has no pages".into()))?;
    let (width, height) = (profile.page_width, profile.page_height);

    let (doc, page1, layer1) = PdfDocument::new(title, Mm(width), Mm(height), "Layer 1");
    let fonts = Fonts::load(&doc)?;

    draw_page(&doc.get_page(page1).get_layer(layer1), first, &fonts, height);
    for page in rest {
        let (index, layer) = doc.add_page(Mm(width), Mm(height), "Layer 1");
        draw_page(&doc.get_page(index).get_layer(layer), page, &fonts, height);
    }

    let mut buf = Vec::new();
    {
        let mut writer = BufWriter::new(Cursor::new(&mut buf));
        doc.save(&mut writer)
            .map_err(|e| AppError::Pdf(e.to_string()))?;
    }
    debug!(pages = pages.len(), bytes = buf.len(), "PDF serialized");
    Ok(buf)
}

fn draw_page(layer: &PdfLayerReference, page: &Page, fonts: &Fonts, page_height: f32) {
    for op in &page.ops {
        match op {
            DrawOp::Rect { x, y, w, h, color } => {
                set_fill(layer, *color);
                let corners = [(*x, *y), (x + w, *y), (x + w, y + h), (*x, y + h)];
                fill_points(layer, &corners, page_height);
            }
            DrawOp::Polygon { points, color } => {
                set_fill(layer, *color);
                fill_points(layer, points, page_height);
            }
            DrawOp::Text {
                x,
                baseline_y,
                text,
                size_pt,
                face,
                color,
            } => {
                set_fill(layer, *color);
                layer.use_text(
                    text.as_str(),
                    *size_pt,
                    Mm(*x),
                    Mm(flip_y(*baseline_y, page_height)),
                    fonts.get(*face),
                );
            }
        }
    }
}

fn set_fill(layer: &PdfLayerReference, color: Rgb) {
    let (r, g, b) = color.to_unit();
    layer.set_fill_color(Color::Rgb(printpdf::Rgb::new(r, g, b, None)));
}

fn fill_points(layer: &PdfLayerReference, points: &[(f32, f32)], page_height: f32) {
    let ring = points
        .iter()
        .map(|&(x, y)| (Point::new(Mm(x), Mm(flip_y(y, page_height))), false))
        .collect();
    layer.add_polygon(Polygon {
        rings: vec![ring],
        mode: PaintMode::Fill,
        winding_order: WindingOrder::NonZero,
    });
}

/// Converts a top-down canvas y into a bottom-up PDF y.
fn flip_y(y: f32, page_height: f32) -> f32 {
    page_height - y
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

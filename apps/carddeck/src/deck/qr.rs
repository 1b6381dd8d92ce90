//! QR codes for the printed cards.
//!
//! Links cannot be clicked on paper, so every card carries a QR code instead.
//! Codes are encoded with the `qrcode` crate and drawn as vector rectangles
//! into the canvas, one rectangle per horizontal run of dark modules.

use pulldown_cmark::{Event, Parser, Tag};
use qrcode::{Color, EcLevel, QrCode};
use sha2::{Digest, Sha256};

use crate::errors::{AppError, LayoutError};
use crate::layout::canvas::{CardCanvas, Rgb};

/// Light modules around the symbol, in modules.
pub const QUIET_ZONE: usize = 4;

/// Encoded QR symbol: `width * width` modules, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct QrMatrix {
    width: usize,
    dark: Vec<bool>,
}

impl QrMatrix {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn is_dark(&self, x: usize, y: usize) -> bool {
        self.dark[y * self.width + x]
    }
}

/// Encodes `url` at error-correction level M.
pub fn encode(url: &str) -> Result<QrMatrix, AppError> {
    let code = QrCode::with_error_correction_level(url.as_bytes(), EcLevel::M)
        .map_err(|e| AppError::Qr(format!("{url}: {e}")))?;
    let width = code.width();
    let dark = code
        .to_colors()
        .into_iter()
        .map(|c| c == Color::Dark)
        .collect();
    Ok(QrMatrix { width, dark })
}

/// Stable card identifier: `h` + first 12 hex digits of
/// sha256("<main category>_<question>").
pub fn card_id(main_category: &str, question: &str) -> String {
    let digest = Sha256::digest(format!("{main_category}_{question}").as_bytes());
    format!("h{}", &hex::encode(digest)[..12])
}

/// URL of the first link in a markdown snippet, or the snippet itself when
/// it is a bare URL.
pub fn link_url_only(markdown: &str) -> Option<String> {
    let link = Parser::new(markdown).find_map(|event| match event {
        Event::Start(Tag::Link { dest_url, .. }) => Some(dest_url.to_string()),
        _ => None,
    });
    link.or_else(|| {
        let bare = markdown.trim();
        (bare.starts_with("http://") || bare.starts_with("https://")).then(|| bare.to_string())
    })
}

/// Draws `matrix` as a `size` mm square with its top-left corner at (x, y),
/// quiet zone included.
pub fn draw_qr(
    canvas: &mut CardCanvas,
    matrix: &QrMatrix,
    x: f32,
    y: f32,
    size: f32,
    dark: Rgb,
    light: Rgb,
) -> Result<(), LayoutError> {
    let modules = matrix.width() + 2 * QUIET_ZONE;
    let module = size / modules as f32;
    canvas.fill_rect(x, y, size, size, light)?;

    for row in 0..matrix.width() {
        let top = y + (row + QUIET_ZONE) as f32 * module;
        let mut col = 0;
        while col < matrix.width() {
            if !matrix.is_dark(col, row) {
                col += 1;
                continue;
            }
            let start = col;
            while col < matrix.width() && matrix.is_dark(col, row) {
                col += 1;
            }
            let left = x + (start + QUIET_ZONE) as f32 * module;
            canvas.fill_rect(left, top, (col - start) as f32 * module, module, dark)?;
        }
    }
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::canvas::{DrawOp, Margins};

    #[test]
    fn test_card_id_is_stable_and_prefixed() {
        let id = card_id("Safety", "Could the system harm users?");
        assert_eq!(id.len(), 13);
        assert!(id.starts_with('h'));
        assert!(id[1..].chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(id, card_id("Safety", "Could the system harm users?"));
        assert_ne!(id, card_id("Ethics", "Could the system harm users?"));
    }

    #[test]
    fn test_card_id_known_digest() {
        let digest = hex::encode(Sha256::digest(b"a_b"));
        assert_eq!(card_id("a", "b"), format!("h{}", &digest[..12]));
    }

    #[test]
    fn test_link_url_only_extracts_first_link() {
        let md = "[Human rights impact](https://example.org/hria) and [other](https://x.y)";
        assert_eq!(link_url_only(md).as_deref(), Some("https://example.org/hria"));
    }

    #[test]
    fn test_link_url_only_accepts_bare_url() {
        assert_eq!(
            link_url_only(" https://plot4.ai/ ").as_deref(),
            Some("https://plot4.ai/")
        );
        assert_eq!(link_url_only("no link here"), None);
    }

    #[test]
    fn test_encode_produces_square_matrix() {
        let matrix = encode("https://plot4.ai/library/card/h0123456789ab").unwrap();
        assert!(matrix.width() >= 21);
        assert_eq!((matrix.width() - 17) % 4, 0, "QR widths are 17 + 4n");
        // Finder pattern corner is always dark.
        assert!(matrix.is_dark(0, 0));
    }

    #[test]
    fn test_draw_qr_stays_inside_its_square() {
        let mut canvas = CardCanvas::new(
            210.0,
            297.0,
            Margins {
                left: 15.0,
                right: 15.0,
                top: 27.0,
            },
            5.0,
        );
        canvas.add_page();
        let matrix = encode("https://plot4.ai/").unwrap();
        draw_qr(&mut canvas, &matrix, 160.0, 237.0, 40.0, Rgb::BLACK, Rgb::WHITE).unwrap();

        let ops = &canvas.pages()[0].ops;
        assert!(ops.len() > matrix.width(), "expected background plus module runs");
        assert_eq!(
            ops[0],
            DrawOp::Rect {
                x: 160.0,
                y: 237.0,
                w: 40.0,
                h: 40.0,
                color: Rgb::WHITE
            }
        );
        for op in &ops[1..] {
            if let DrawOp::Rect { x, y, w, h, color } = op {
                assert_eq!(*color, Rgb::BLACK);
                assert!(*x >= 160.0 && x + w <= 200.0 + 1e-3);
                assert!(*y >= 237.0 && y + h <= 277.0 + 1e-3);
            }
        }
    }
}

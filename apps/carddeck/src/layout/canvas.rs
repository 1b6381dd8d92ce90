//! In-memory page/cursor renderer.
//!
//! `CardCanvas` lays markup out into a display list of pages (filled shapes
//! and positioned text). Nothing reaches the PDF writer until the whole deck
//! is laid out, which is what makes speculative rendering possible:
//! `snapshot` captures page count, op count, cursor and margins, `restore`
//! truncates back to it.
//!
//! Coordinates are millimetres measured from the top-left corner of the page.

use serde::{Deserialize, Serialize};

use crate::errors::LayoutError;
use crate::layout::font_metrics::{get_metrics, FontFace, PT_TO_MM};
use crate::layout::markup::{Block, BlockKind, Markup, Run};

/// Line height as a multiple of the font size.
pub const LINE_HEIGHT: f32 = 1.25;
/// Baseline offset from the top of a line box, as a fraction of the font size.
const BASELINE_RATIO: f32 = 0.8;
/// Vertical gap between consecutive blocks, as a fraction of the line height.
const BLOCK_GAP: f32 = 0.3;
/// Space between a list marker and the item text, in em.
const MARKER_GAP_EM: f32 = 0.5;

// ────────────────────────────────────────────────────────────────────────────
// Colours
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }

    /// Parses `"83b3db"` or `"#83b3db"`. Returns `None` for anything else.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Rgb::new(channel(0)?, channel(2)?, channel(4)?))
    }

    /// Composites `over` on top of `self` with the given opacity.
    ///
    /// Card artwork uses this instead of PDF transparency groups: every
    /// translucent shape is drawn over a known solid background.
    pub fn blend(self, over: Rgb, alpha: f32) -> Rgb {
        let alpha = alpha.clamp(0.0, 1.0);
        let mix = |base: u8, top: u8| {
            (base as f32 * (1.0 - alpha) + top as f32 * alpha).round() as u8
        };
        Rgb::new(mix(self.r, over.r), mix(self.g, over.g), mix(self.b, over.b))
    }

    /// Channels as 0.0..=1.0 floats, the form PDF colour operators take.
    pub fn to_unit(self) -> (f32, f32, f32) {
        (
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        )
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Display list
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    pub left: f32,
    pub right: f32,
    pub top: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Align {
    Left,
    Center,
    Justify,
}

/// Paragraph-level settings for one `write_markup` call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    pub size_pt: f32,
    pub align: Align,
    pub color: Rgb,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DrawOp {
    Rect {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        color: Rgb,
    },
    Polygon {
        points: Vec<(f32, f32)>,
        color: Rgb,
    },
    Text {
        x: f32,
        baseline_y: f32,
        text: String,
        size_pt: f32,
        face: FontFace,
        color: Rgb,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub ops: Vec<DrawOp>,
}

/// Everything `restore` needs to undo a speculative render.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasState {
    page_count: usize,
    ops_len: usize,
    y: f32,
    margins: Margins,
}

// ────────────────────────────────────────────────────────────────────────────
// Canvas
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct CardCanvas {
    width: f32,
    height: f32,
    default_margins: Margins,
    margins: Margins,
    list_indent: f32,
    pages: Vec<Page>,
    y: f32,
    /// State captured by the pending speculative render, if any.
    pub(crate) trial: Option<CanvasState>,
}

impl CardCanvas {
    pub fn new(width: f32, height: f32, margins: Margins, list_indent: f32) -> Self {
        CardCanvas {
            width,
            height,
            default_margins: margins,
            margins,
            list_indent,
            pages: Vec::new(),
            y: margins.top,
            trial: None,
        }
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    /// Starts a new page with the default margins and the cursor at the top margin.
    pub fn add_page(&mut self) {
        self.pages.push(Page::default());
        self.margins = self.default_margins;
        self.y = self.margins.top;
    }

    /// 1-based number of the current page; 0 before the first page.
    pub fn page_number(&self) -> u32 {
        self.pages.len() as u32
    }

    #[cfg(test)]
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn into_pages(self) -> Vec<Page> {
        self.pages
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn set_y(&mut self, y: f32) {
        self.y = y;
    }

    pub fn margins(&self) -> Margins {
        self.margins
    }

    pub fn set_left_margin(&mut self, left: f32) {
        self.margins.left = left;
    }

    pub fn set_margins(&mut self, margins: Margins) {
        self.margins = margins;
    }

    pub fn snapshot(&self) -> CanvasState {
        CanvasState {
            page_count: self.pages.len(),
            ops_len: self.pages.last().map_or(0, |p| p.ops.len()),
            y: self.y,
            margins: self.margins,
        }
    }

    /// Discards every page and op added since `state` was taken.
    pub fn restore(&mut self, state: CanvasState) {
        self.pages.truncate(state.page_count);
        if let Some(page) = self.pages.last_mut() {
            page.ops.truncate(state.ops_len);
        }
        self.y = state.y;
        self.margins = state.margins;
    }

    // ── Primitive drawing ───────────────────────────────────────────────────

    pub fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgb) -> Result<(), LayoutError> {
        self.push(DrawOp::Rect { x, y, w, h, color })
    }

    pub fn fill_polygon(&mut self, points: Vec<(f32, f32)>, color: Rgb) -> Result<(), LayoutError> {
        self.push(DrawOp::Polygon { points, color })
    }

    /// Places a single line of text with its top-left corner at (x, y).
    /// Does not move the cursor.
    pub fn text_at(
        &mut self,
        x: f32,
        y: f32,
        text: &str,
        size_pt: f32,
        face: FontFace,
        color: Rgb,
    ) -> Result<(), LayoutError> {
        check_size(size_pt)?;
        self.push(DrawOp::Text {
            x,
            baseline_y: y + size_pt * PT_TO_MM * BASELINE_RATIO,
            text: text.to_string(),
            size_pt,
            face,
            color,
        })
    }

    /// Width of `text` in millimetres.
    pub fn text_width(&self, text: &str, size_pt: f32, face: FontFace) -> f32 {
        get_metrics(face).width_mm(text, size_pt)
    }

    fn push(&mut self, op: DrawOp) -> Result<(), LayoutError> {
        let page = self.pages.last_mut().ok_or(LayoutError::NoPage)?;
        page.ops.push(op);
        Ok(())
    }

    // ── Flowing text ────────────────────────────────────────────────────────

    /// Lays `markup` out at the cursor, wrapping between the current margins.
    ///
    /// The cursor ends below the last line. Lines that would cross the page
    /// bottom start a new page (there is no bottom margin), so long text
    /// spills over rather than being clipped.
    pub fn write_markup(&mut self, markup: &Markup, style: &TextStyle) -> Result<(), LayoutError> {
        if self.pages.is_empty() {
            return Err(LayoutError::NoPage);
        }
        check_size(style.size_pt)?;

        let line_h = style.size_pt * PT_TO_MM * LINE_HEIGHT;
        for (i, block) in markup.blocks.iter().enumerate() {
            if i > 0 {
                self.y += line_h * BLOCK_GAP;
            }
            self.write_block(block, style, line_h)?;
        }
        Ok(())
    }

    fn write_block(&mut self, block: &Block, style: &TextStyle, line_h: f32) -> Result<(), LayoutError> {
        let size = style.size_pt;
        let (depth, marker) = match block.kind {
            BlockKind::Paragraph => (0, None),
            BlockKind::Bullet { depth } => (depth, Some("-".to_string())),
            BlockKind::Numbered { depth, number } => (depth, Some(format!("{number}."))),
        };
        let left = self.margins.left + self.list_indent * depth as f32;
        let max_width = (self.width - self.margins.right - left).max(0.0);
        let lines = wrap_runs(&block.runs, size, max_width);

        for (i, line) in lines.iter().enumerate() {
            if self.y + line_h > self.height {
                self.break_page();
            }
            let baseline_y = self.y + size * PT_TO_MM * BASELINE_RATIO;

            if let (0, Some(marker)) = (i, marker.as_deref()) {
                let face = FontFace::Regular;
                let gap = MARKER_GAP_EM * size * PT_TO_MM;
                let x = left - gap - get_metrics(face).width_mm(marker, size);
                self.push(DrawOp::Text {
                    x,
                    baseline_y,
                    text: marker.to_string(),
                    size_pt: size,
                    face,
                    color: style.color,
                })?;
            }

            let last = i + 1 == lines.len();
            for op in line.place(left, max_width, baseline_y, style, last) {
                self.push(op)?;
            }
            self.y += line_h;
        }
        Ok(())
    }

    /// Automatic page break: new page, same margins, cursor at the top margin.
    fn break_page(&mut self) {
        let margins = self.margins;
        self.pages.push(Page::default());
        self.margins = margins;
        self.y = margins.top;
    }
}

fn check_size(size_pt: f32) -> Result<(), LayoutError> {
    if size_pt.is_finite() && size_pt > 0.0 {
        Ok(())
    } else {
        Err(LayoutError::InvalidFontSize(size_pt))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Word wrap
// ────────────────────────────────────────────────────────────────────────────

/// A same-face fragment of a word.
#[derive(Debug, Clone, PartialEq)]
struct Piece {
    text: String,
    face: FontFace,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Word {
    pieces: Vec<Piece>,
    width: f32,
}

impl Word {
    fn push_char(&mut self, c: char, face: FontFace) {
        match self.pieces.last_mut() {
            Some(piece) if piece.face == face => piece.text.push(c),
            _ => self.pieces.push(Piece {
                text: c.to_string(),
                face,
            }),
        }
    }

    fn measure(&mut self, size_pt: f32) {
        self.width = self
            .pieces
            .iter()
            .map(|p| get_metrics(p.face).width_mm(&p.text, size_pt))
            .sum();
    }
}

enum Token {
    Word(Word),
    Break,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Line {
    words: Vec<Word>,
    /// Width of the words plus one space between each.
    natural_width: f32,
    /// Ended by an explicit line break rather than by running out of room.
    forced: bool,
}

impl Line {
    fn place(&self, left: f32, max_width: f32, baseline_y: f32, style: &TextStyle, last: bool) -> Vec<DrawOp> {
        let space = get_metrics(FontFace::Regular).space_mm(style.size_pt);
        let slack = (max_width - self.natural_width).max(0.0);
        let gaps = self.words.len().saturating_sub(1);

        let (mut x, extra) = match style.align {
            Align::Left => (left, 0.0),
            Align::Center => (left + slack / 2.0, 0.0),
            Align::Justify if !last && !self.forced && gaps > 0 => (left, slack / gaps as f32),
            Align::Justify => (left, 0.0),
        };

        let mut ops: Vec<DrawOp> = Vec::new();
        for (i, word) in self.words.iter().enumerate() {
            for (j, piece) in word.pieces.iter().enumerate() {
                // Unjustified words in the same face share one text op.
                let joins = extra == 0.0 && (i > 0 || j > 0);
                match ops.last_mut() {
                    Some(DrawOp::Text { text, face, .. }) if joins && *face == piece.face => {
                        if j == 0 {
                            text.push(' ');
                        }
                        text.push_str(&piece.text);
                    }
                    _ => ops.push(DrawOp::Text {
                        x,
                        baseline_y,
                        text: piece.text.clone(),
                        size_pt: style.size_pt,
                        face: piece.face,
                        color: style.color,
                    }),
                }
                x += get_metrics(piece.face).width_mm(&piece.text, style.size_pt);
            }
            x += space + extra;
        }
        ops
    }
}

fn tokenize(runs: &[Run], size_pt: f32) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut word = Word::default();

    fn flush(word: &mut Word, tokens: &mut Vec<Token>, size_pt: f32) {
        if !word.pieces.is_empty() {
            let mut done = std::mem::take(word);
            done.measure(size_pt);
            tokens.push(Token::Word(done));
        }
    }

    for run in runs {
        let face = run.style.face();
        for c in run.text.chars() {
            if c == '\n' {
                flush(&mut word, &mut tokens, size_pt);
                tokens.push(Token::Break);
            } else if c.is_whitespace() {
                flush(&mut word, &mut tokens, size_pt);
            } else {
                word.push_char(c, face);
            }
        }
    }
    flush(&mut word, &mut tokens, size_pt);
    tokens
}

/// Greedy line breaking: a word goes on the current line if it fits,
/// otherwise it starts the next one. A word wider than the line gets a
/// line of its own.
fn wrap_runs(runs: &[Run], size_pt: f32, max_width: f32) -> Vec<Line> {
    let space = get_metrics(FontFace::Regular).space_mm(size_pt);
    let mut lines = Vec::new();
    let mut line = Line::default();

    for token in tokenize(runs, size_pt) {
        match token {
            Token::Break => {
                line.forced = true;
                lines.push(std::mem::take(&mut line));
            }
            Token::Word(word) => {
                if line.words.is_empty() {
                    line.natural_width = word.width;
                    line.words.push(word);
                } else if line.natural_width + space + word.width > max_width {
                    lines.push(std::mem::take(&mut line));
                    line.natural_width = word.width;
                    line.words.push(word);
                } else {
                    line.natural_width += space + word.width;
                    line.words.push(word);
                }
            }
        }
    }
    if !line.words.is_empty() {
        lines.push(line);
    }
    lines
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::markup::RunStyle;

    fn make_canvas() -> CardCanvas {
        let margins = Margins {
            left: 10.0,
            right: 10.0,
            top: 10.0,
        };
        let mut canvas = CardCanvas::new(100.0, 100.0, margins, 5.0);
        canvas.add_page();
        canvas
    }

    fn make_style(size_pt: f32, align: Align) -> TextStyle {
        TextStyle {
            size_pt,
            align,
            color: Rgb::BLACK,
        }
    }

    fn text_ops(page: &Page) -> Vec<(f32, f32, String)> {
        page.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text {
                    x, baseline_y, text, ..
                } => Some((*x, *baseline_y, text.clone())),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_from_hex_parses_with_and_without_hash() {
        assert_eq!(Rgb::from_hex("83b3db"), Some(Rgb::new(0x83, 0xb3, 0xdb)));
        assert_eq!(Rgb::from_hex("#FFFFFF"), Some(Rgb::WHITE));
        assert_eq!(Rgb::from_hex("12345"), None);
        assert_eq!(Rgb::from_hex("zzzzzz"), None);
    }

    #[test]
    fn test_blend_endpoints_and_midpoint() {
        let base = Rgb::new(200, 100, 0);
        assert_eq!(base.blend(Rgb::BLACK, 0.0), base);
        assert_eq!(base.blend(Rgb::BLACK, 1.0), Rgb::BLACK);
        assert_eq!(base.blend(Rgb::BLACK, 0.25), Rgb::new(150, 75, 0));
    }

    #[test]
    fn test_write_before_first_page_fails() {
        let mut canvas = CardCanvas::new(100.0, 100.0, make_canvas().margins(), 5.0);
        let markup = Markup::plain("hello", RunStyle::default());
        let err = canvas
            .write_markup(&markup, &make_style(10.0, Align::Left))
            .unwrap_err();
        assert_eq!(err, LayoutError::NoPage);
    }

    #[test]
    fn test_invalid_font_size_rejected() {
        let mut canvas = make_canvas();
        let markup = Markup::plain("hello", RunStyle::default());
        for size in [0.0, -1.0, f32::NAN] {
            let result = canvas.write_markup(&markup, &make_style(size, Align::Left));
            assert!(matches!(result, Err(LayoutError::InvalidFontSize(_))));
        }
    }

    #[test]
    fn test_single_line_advances_cursor_by_line_height() {
        let mut canvas = make_canvas();
        let markup = Markup::plain("short", RunStyle::default());
        canvas.write_markup(&markup, &make_style(10.0, Align::Left)).unwrap();
        let expected = 10.0 + 10.0 * PT_TO_MM * LINE_HEIGHT;
        assert!((canvas.y() - expected).abs() < 1e-4, "y = {}", canvas.y());
        let ops = text_ops(&canvas.pages()[0]);
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].0, 10.0);
        assert_eq!(ops[0].2, "short");
    }

    #[test]
    fn test_long_text_wraps_within_margins() {
        let mut canvas = make_canvas();
        let text = "word ".repeat(60);
        let markup = Markup::plain(&text, RunStyle::default());
        canvas.write_markup(&markup, &make_style(10.0, Align::Left)).unwrap();
        let ops = text_ops(&canvas.pages()[0]);
        assert!(ops.len() > 1, "expected several lines, got {}", ops.len());
        for (x, _, text) in &ops {
            let width = get_metrics(FontFace::Regular).width_mm(text, 10.0);
            assert!(x + width <= 90.0 + 1e-3, "line '{text}' overflows the right margin");
        }
    }

    #[test]
    fn test_overflow_breaks_onto_new_page() {
        let mut canvas = make_canvas();
        let text = "overflowing text ".repeat(200);
        let markup = Markup::plain(&text, RunStyle::default());
        canvas.write_markup(&markup, &make_style(12.0, Align::Justify)).unwrap();
        assert!(canvas.page_number() > 1, "text should spill onto a second page");
        assert!(canvas.y() <= canvas.height());
    }

    #[test]
    fn test_center_alignment_is_symmetric() {
        let mut canvas = make_canvas();
        let markup = Markup::plain("centred", RunStyle::default());
        canvas.write_markup(&markup, &make_style(10.0, Align::Center)).unwrap();
        let (x, _, text) = text_ops(&canvas.pages()[0]).remove(0);
        let width = get_metrics(FontFace::Regular).width_mm(&text, 10.0);
        let left_gap = x - 10.0;
        let right_gap = 90.0 - (x + width);
        assert!((left_gap - right_gap).abs() < 1e-3);
    }

    #[test]
    fn test_justify_fills_all_but_last_line() {
        let mut canvas = make_canvas();
        let text = "justify these words across the full measure please ".repeat(4);
        let markup = Markup::plain(&text, RunStyle::default());
        canvas.write_markup(&markup, &make_style(10.0, Align::Justify)).unwrap();
        let ops = text_ops(&canvas.pages()[0]);
        let first_baseline = ops[0].1;
        let first_line: Vec<_> = ops.iter().filter(|o| o.1 == first_baseline).collect();
        let (x, _, word) = first_line[first_line.len() - 1];
        let right = x + get_metrics(FontFace::Regular).width_mm(word, 10.0);
        assert!((right - 90.0).abs() < 1e-3, "justified line should end at 90, got {right}");
    }

    #[test]
    fn test_mixed_styles_emit_separate_faces() {
        let mut canvas = make_canvas();
        let markup = Markup::from_markdown("plain **bold** plain");
        canvas.write_markup(&markup, &make_style(10.0, Align::Left)).unwrap();
        let faces: Vec<FontFace> = canvas.pages()[0]
            .ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { face, .. } => Some(*face),
                _ => None,
            })
            .collect();
        assert_eq!(faces, vec![FontFace::Regular, FontFace::Bold, FontFace::Regular]);
    }

    #[test]
    fn test_list_items_are_indented_with_markers() {
        let mut canvas = make_canvas();
        let markup = Markup::from_markdown("1. first\n2. second");
        canvas.write_markup(&markup, &make_style(10.0, Align::Left)).unwrap();
        let ops = text_ops(&canvas.pages()[0]);
        assert_eq!(ops[0].2, "1.");
        assert!(ops[0].0 < 15.0);
        assert_eq!(ops[1].2, "first");
        assert_eq!(ops[1].0, 15.0);
    }

    #[test]
    fn test_hard_break_forces_new_line() {
        let mut canvas = make_canvas();
        let markup = Markup::from_markdown("one  \ntwo");
        canvas.write_markup(&markup, &make_style(10.0, Align::Left)).unwrap();
        let ops = text_ops(&canvas.pages()[0]);
        assert_eq!(ops.len(), 2);
        assert!(ops[1].1 > ops[0].1);
    }

    #[test]
    fn test_restore_discards_pages_ops_and_cursor() {
        let mut canvas = make_canvas();
        canvas.fill_rect(0.0, 0.0, 100.0, 10.0, Rgb::WHITE).unwrap();
        let before = canvas.clone();
        let state = canvas.snapshot();

        canvas.set_left_margin(30.0);
        let text = "spill ".repeat(400);
        canvas
            .write_markup(&Markup::plain(&text, RunStyle::default()), &make_style(12.0, Align::Left))
            .unwrap();
        assert!(canvas.page_number() > 1);

        canvas.restore(state);
        assert_eq!(canvas.pages(), before.pages());
        assert_eq!(canvas.y(), before.y());
        assert_eq!(canvas.margins(), before.margins());
    }

    #[test]
    fn test_add_page_resets_margins_and_cursor() {
        let mut canvas = make_canvas();
        canvas.set_left_margin(40.0);
        canvas.set_y(80.0);
        canvas.add_page();
        assert_eq!(canvas.page_number(), 2);
        assert_eq!(canvas.margins().left, 10.0);
        assert_eq!(canvas.y(), 10.0);
    }

    #[test]
    fn test_text_at_does_not_move_cursor() {
        let mut canvas = make_canvas();
        canvas
            .text_at(5.0, 50.0, "PLOT", 10.0, FontFace::Bold, Rgb::BLACK)
            .unwrap();
        assert_eq!(canvas.y(), 10.0);
        assert_eq!(canvas.pages()[0].ops.len(), 1);
    }
}

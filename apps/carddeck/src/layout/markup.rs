//! Styled markup: the text model the canvas lays out.
//!
//! Card text arrives as markdown. `Markup::from_markdown` converts it with
//! `pulldown-cmark` into blocks of styled runs. Links are stripped: their
//! text is kept, their targets dropped (the printed card carries QR codes
//! instead of links). Headings become bold paragraphs.

use pulldown_cmark::{Event, Parser, Tag, TagEnd};
use serde::{Deserialize, Serialize};

use crate::layout::font_metrics::FontFace;

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStyle {
    pub bold: bool,
    pub italic: bool,
}

impl RunStyle {
    pub const BOLD: RunStyle = RunStyle {
        bold: true,
        italic: false,
    };

    pub fn face(self) -> FontFace {
        FontFace::from_style(self.bold, self.italic)
    }
}

/// A span of text in a single style. May contain `\n` for forced line breaks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub text: String,
    pub style: RunStyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockKind {
    Paragraph,
    /// Unordered list item at the given nesting depth (1 = top level).
    Bullet { depth: u8 },
    /// Ordered list item with its number.
    Numbered { depth: u8, number: u64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub kind: BlockKind,
    pub runs: Vec<Run>,
}

impl Block {
    fn new(kind: BlockKind) -> Self {
        Block {
            kind,
            runs: Vec::new(),
        }
    }

    /// Appends text, merging with the previous run when the style matches.
    fn push_text(&mut self, text: &str, style: RunStyle) {
        if text.is_empty() {
            return;
        }
        match self.runs.last_mut() {
            Some(last) if last.style == style => last.text.push_str(text),
            _ => self.runs.push(Run {
                text: text.to_string(),
                style,
            }),
        }
    }

    fn has_text(&self) -> bool {
        self.runs.iter().any(|r| !r.text.trim().is_empty())
    }

    #[cfg(test)]
    pub fn plain_text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

/// A sequence of blocks, laid out top to bottom.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Markup {
    pub blocks: Vec<Block>,
}

impl Markup {
    /// Single paragraph, single style. Used for headings and fixed captions.
    pub fn plain(text: &str, style: RunStyle) -> Self {
        let mut block = Block::new(BlockKind::Paragraph);
        block.push_text(text.trim(), style);
        if !block.has_text() {
            return Markup::default();
        }
        Markup {
            blocks: vec![block],
        }
    }

    /// Converts markdown to markup, stripping links.
    ///
    /// List items written with a single leading space (`"\n - "`) are
    /// treated as sub-items of the item above.
    pub fn from_markdown(markdown: &str) -> Self {
        let markdown = nest_single_space_items(markdown);
        MarkdownConverter::default().convert(markdown.trim())
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Concatenated text of all blocks, one line per block.
    #[cfg(test)]
    pub fn plain_text(&self) -> String {
        self.blocks
            .iter()
            .map(Block::plain_text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Returns a copy with every run forced to the given style flags.
    pub fn emphasized(mut self, bold: bool) -> Self {
        for run in self.blocks.iter_mut().flat_map(|b| b.runs.iter_mut()) {
            run.style.bold |= bold;
        }
        self
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Markdown conversion
// ────────────────────────────────────────────────────────────────────────────

/// Catalog text indents sub-items by one space, which CommonMark reads as a
/// sibling item. Two spaces make it a nested list.
fn nest_single_space_items(markdown: &str) -> String {
    markdown.replace("\n - ", "\n  - ").replace("\n * ", "\n  * ")
}

#[derive(Default)]
struct MarkdownConverter {
    blocks: Vec<Block>,
    current: Option<Block>,
    /// One entry per open list: `Some(next_number)` for ordered lists.
    lists: Vec<Option<u64>>,
    bold_depth: u32,
    italic_depth: u32,
}

impl MarkdownConverter {
    fn convert(mut self, markdown: &str) -> Markup {
        for event in Parser::new(markdown) {
            match event {
                Event::Start(tag) => self.start(tag),
                Event::End(tag) => self.end(tag),
                Event::Text(text) | Event::Code(text) => self.text(&text),
                Event::SoftBreak => self.text(" "),
                Event::HardBreak => self.text("\n"),
                // Raw HTML, rules, footnotes and task markers have no printed form.
                _ => {}
            }
        }
        self.flush();
        Markup {
            blocks: self.blocks,
        }
    }

    fn style(&self) -> RunStyle {
        RunStyle {
            bold: self.bold_depth > 0,
            italic: self.italic_depth > 0,
        }
    }

    fn start(&mut self, tag: Tag) {
        match tag {
            Tag::Paragraph => {
                // Loose list items wrap their text in a paragraph; keep the item block.
                let in_fresh_item = self
                    .current
                    .as_ref()
                    .is_some_and(|b| b.kind != BlockKind::Paragraph && !b.has_text());
                if !in_fresh_item {
                    self.open(BlockKind::Paragraph);
                }
            }
            Tag::Heading { .. } => {
                self.open(BlockKind::Paragraph);
                self.bold_depth += 1;
            }
            Tag::List(start) => {
                self.flush();
                self.lists.push(start);
            }
            Tag::Item => {
                let depth = self.lists.len().min(u8::MAX as usize) as u8;
                let kind = match self.lists.last_mut() {
                    Some(Some(next)) => {
                        let number = *next;
                        *next += 1;
                        BlockKind::Numbered { depth, number }
                    }
                    _ => BlockKind::Bullet { depth },
                };
                self.open(kind);
            }
            Tag::Strong => self.bold_depth += 1,
            Tag::Emphasis => self.italic_depth += 1,
            // Links and images keep their text only.
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph | TagEnd::Item => self.flush(),
            TagEnd::Heading(_) => {
                self.bold_depth = self.bold_depth.saturating_sub(1);
                self.flush();
            }
            TagEnd::List(_) => {
                self.flush();
                self.lists.pop();
            }
            TagEnd::Strong => self.bold_depth = self.bold_depth.saturating_sub(1),
            TagEnd::Emphasis => self.italic_depth = self.italic_depth.saturating_sub(1),
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        let style = self.style();
        self.current
            .get_or_insert_with(|| Block::new(BlockKind::Paragraph))
            .push_text(text, style);
    }

    fn open(&mut self, kind: BlockKind) {
        self.flush();
        self.current = Some(Block::new(kind));
    }

    fn flush(&mut self) {
        if let Some(block) = self.current.take() {
            if block.has_text() {
                self.blocks.push(block);
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

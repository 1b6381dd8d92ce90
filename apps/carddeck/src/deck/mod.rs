// Deck rendering: catalog loading, colours, QR codes, intro pages and cards.
// `render_deck` is CPU-bound; callers run it via tokio::task::spawn_blocking.

pub mod cards;
pub mod catalog;
pub mod intro;
pub mod palette;
pub mod qr;

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::layout::canvas::{CardCanvas, Page};
use crate::layout::profile::SizeProfile;

pub use catalog::{load_catalog, CardCatalog};
pub use palette::CategoryPalette;

// ────────────────────────────────────────────────────────────────────────────
// Options
// ────────────────────────────────────────────────────────────────────────────

/// Which card sides go into the PDF.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrintMode {
    Fronts,
    Backs,
    /// Front and back of each card on consecutive pages, for duplex printing.
    #[default]
    FrontAndBack,
}

impl PrintMode {
    pub fn prints_fronts(self) -> bool {
        matches!(self, PrintMode::Fronts | PrintMode::FrontAndBack)
    }

    pub fn prints_backs(self) -> bool {
        matches!(self, PrintMode::Backs | PrintMode::FrontAndBack)
    }

    /// Parses a mode name. Unknown names keep the default mode.
    pub fn parse_or_default(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "fronts" => PrintMode::Fronts,
            "backs" => PrintMode::Backs,
            "frontandback" => PrintMode::FrontAndBack,
            _ => {
                warn!(mode = s, "Unknown print mode; using {}", PrintMode::default());
                PrintMode::default()
            }
        }
    }
}

impl fmt::Display for PrintMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PrintMode::Fronts => "Fronts",
            PrintMode::Backs => "Backs",
            PrintMode::FrontAndBack => "FrontAndBack",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeckOptions {
    pub mode: PrintMode,
    /// Site root the QR codes link to, ending with `/`.
    pub qr_base_url: String,
    /// Date printed on the title sheet.
    pub generated_on: NaiveDate,
}

// ────────────────────────────────────────────────────────────────────────────
// Rendering
// ────────────────────────────────────────────────────────────────────────────

/// Counts reported after a deck has been laid out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeckSummary {
    pub pages: u32,
    pub intro_pages: u32,
    pub cards: u32,
    /// Text blocks that hit the minimum font size without fitting.
    pub degraded_blocks: u32,
    /// Smallest font size any fitted card text ended up at.
    pub smallest_font_pt: Option<f32>,
}

impl DeckSummary {
    fn record_fit(&mut self, fit: &crate::layout::fit::FitResult) {
        if fit.floor_reached {
            self.degraded_blocks += 1;
        }
        self.smallest_font_pt = Some(match self.smallest_font_pt {
            Some(smallest) => smallest.min(fit.font_size),
            None => fit.font_size,
        });
    }
}

#[derive(Debug, Clone)]
pub struct RenderedDeck {
    pub pages: Vec<Page>,
    pub summary: DeckSummary,
}

/// Lays out the intro pages and every card in catalog order.
///
/// Cards are strictly sequential: one canvas, one card, one region at a time.
pub fn render_deck(
    catalog: &CardCatalog,
    profile: &SizeProfile,
    options: &DeckOptions,
) -> Result<RenderedDeck, AppError> {
    let mut canvas = CardCanvas::new(
        profile.page_width,
        profile.page_height,
        profile.margins,
        profile.list_indent,
    );
    let mut summary = DeckSummary {
        intro_pages: intro::draw_intro(&mut canvas, profile, catalog, options)?,
        ..DeckSummary::default()
    };

    for card in &catalog.cards {
        let shades = catalog.card_shades(card)?;
        if options.mode.prints_fronts() {
            let fit = cards::draw_card_front(&mut canvas, profile, card, shades)?;
            summary.record_fit(&fit.question);
            summary.record_fit(&fit.explanation);
        }
        if options.mode.prints_backs() {
            let fit = cards::draw_card_back(&mut canvas, profile, card, shades, &options.qr_base_url)?;
            summary.record_fit(&fit);
        }
        summary.cards += 1;
    }

    summary.pages = canvas.page_number();
    info!(
        size = %profile.size,
        mode = %options.mode,
        pages = summary.pages,
        cards = summary.cards,
        degraded = summary.degraded_blocks,
        "Deck laid out"
    );
    if summary.degraded_blocks > 0 {
        warn!(
            degraded = summary.degraded_blocks,
            "Some card text was set at the minimum font size and may overflow"
        );
    }

    Ok(RenderedDeck {
        pages: canvas.into_pages(),
        summary,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::catalog::parse_catalog;

    fn make_catalog() -> CardCatalog {
        let json = r#"[
          {"category": "Safety", "colour": "eea4b5", "cards": [
            {"label": "Safety", "question": "Could the system cause physical harm?", "threatif": "Yes",
             "explanation": "Think about robots and vehicles.", "recommendation": "Run a hazard analysis.",
             "categories": ["Safety"], "phases": ["Design"]},
            {"label": "Safety", "question": "Is there a fallback when the model fails?", "threatif": "No",
             "explanation": "Systems fail.", "recommendation": "Design a safe default.",
             "categories": ["Safety"], "phases": ["Output"], "cia": ["a"]}
          ]},
          {"category": "Security", "colour": "83b3db", "cards": [
            {"label": "Security", "question": "Can the model be poisoned?", "threatif": "Yes",
             "explanation": "Attackers may tamper with data.", "recommendation": "Validate inputs.",
             "categories": ["Security", "Safety"], "phases": ["Input", "Model"],
             "qr": "[More](https://example.org/poisoning)"}
          ]}
        ]"#;
        parse_catalog(json, &CategoryPalette::builtin()).unwrap()
    }

    fn make_options(mode: PrintMode) -> DeckOptions {
        DeckOptions {
            mode,
            qr_base_url: "https://plot4.ai/".to_string(),
            generated_on: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        }
    }

    #[test]
    fn test_parse_or_default() {
        assert_eq!(PrintMode::parse_or_default("Fronts"), PrintMode::Fronts);
        assert_eq!(PrintMode::parse_or_default("backs"), PrintMode::Backs);
        assert_eq!(PrintMode::parse_or_default("FrontAndBack"), PrintMode::FrontAndBack);
        assert_eq!(PrintMode::parse_or_default("Sideways"), PrintMode::FrontAndBack);
    }

    #[test]
    fn test_front_and_back_page_count() {
        let deck = render_deck(&make_catalog(), &SizeProfile::a6(), &make_options(PrintMode::FrontAndBack)).unwrap();
        assert_eq!(deck.summary.intro_pages, 6);
        assert_eq!(deck.summary.cards, 3);
        assert_eq!(deck.pages.len(), 6 + 3 * 2);
        assert_eq!(deck.summary.pages as usize, deck.pages.len());
        assert_eq!(deck.summary.degraded_blocks, 0);
    }

    #[test]
    fn test_single_sided_modes() {
        for mode in [PrintMode::Fronts, PrintMode::Backs] {
            let deck = render_deck(&make_catalog(), &SizeProfile::a4(), &make_options(mode)).unwrap();
            assert_eq!(deck.pages.len(), 3 + 3, "{mode} should print one page per card");
        }
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let options = make_options(PrintMode::FrontAndBack);
        let first = render_deck(&make_catalog(), &SizeProfile::a4(), &options).unwrap();
        let second = render_deck(&make_catalog(), &SizeProfile::a4(), &options).unwrap();
        assert_eq!(first.pages, second.pages);
        assert_eq!(first.summary, second.summary);
    }

    #[test]
    fn test_summary_tracks_smallest_font() {
        let deck = render_deck(&make_catalog(), &SizeProfile::a4(), &make_options(PrintMode::Fronts)).unwrap();
        let smallest = deck.summary.smallest_font_pt.unwrap();
        assert!(smallest <= 20.0 && smallest >= 1.0, "smallest font {smallest}");
    }
}

//! Card front and back drawing.
//!
//! A card front shows the question and explanation over the category colour,
//! with the threat-if banner at the bottom. The back shows the recommendations
//! and QR codes. Both sides carry the category label, the category and phase
//! tiles, and the footer wordmark.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::deck::catalog::ThreatCard;
use crate::deck::palette::Shades;
use crate::deck::qr;
use crate::errors::{AppError, LayoutError};
use crate::layout::canvas::{Align, CardCanvas, Rgb, TextStyle};
use crate::layout::fit::{auto_fit, FitMode, FitResult, TextBlock};
use crate::layout::font_metrics::{FontFace, PT_TO_MM};
use crate::layout::markup::{Block, BlockKind, Markup, Run, RunStyle};
use crate::layout::profile::SizeProfile;

const FOOTER_DARK: Rgb = Rgb::new(0x66, 0x66, 0x66);
const FOOTER_LIGHT: Rgb = Rgb::new(0x99, 0x99, 0x99);

/// Fit outcomes for one card front.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrontFit {
    pub question: FitResult,
    pub explanation: FitResult,
}

// ────────────────────────────────────────────────────────────────────────────
// Front
// ────────────────────────────────────────────────────────────────────────────

pub fn draw_card_front(
    canvas: &mut CardCanvas,
    profile: &SizeProfile,
    card: &ThreatCard,
    shades: Shades,
) -> Result<FrontFit, LayoutError> {
    let record = &card.record;
    canvas.add_page();
    draw_backdrop(canvas, profile, shades, Side::Front)?;
    draw_icons(canvas, profile, card, shades.main)?;
    draw_label(canvas, profile, &record.label, shades.main)?;

    let question = TextBlock {
        markup: Markup::from_markdown(&record.question).emphasized(true),
        align: Align::Center,
        color: Rgb::BLACK,
        region: profile.question.region,
        font: profile.question.font,
        mode: FitMode::SingleRegion,
    };
    let question = auto_fit(canvas, &question)?;

    canvas.set_left_margin(profile.explanation_margin);
    let explanation = TextBlock {
        markup: Markup::from_markdown(&record.explanation),
        align: Align::Justify,
        color: Rgb::BLACK,
        region: profile.explanation_region(!record.cia.is_empty()),
        font: profile.explanation.font,
        mode: FitMode::PageBound,
    };
    let explanation = auto_fit(canvas, &explanation)?;

    if !record.cia.is_empty() {
        let labels: Vec<&str> = record.cia.iter().map(|flag| flag.label()).collect();
        draw_cia(canvas, profile, &labels, shades.main)?;
    }

    draw_threat_if(canvas, profile, &record.threatif)?;
    draw_warning_icon(canvas, profile, dark_band_colour(shades))?;
    draw_footer(canvas, profile)?;

    debug!(
        card = card.number,
        question_pt = question.font_size,
        explanation_pt = explanation.font_size,
        "Card front drawn"
    );
    Ok(FrontFit {
        question,
        explanation,
    })
}

fn draw_cia(
    canvas: &mut CardCanvas,
    profile: &SizeProfile,
    labels: &[&str],
    background: Rgb,
) -> Result<(), LayoutError> {
    let cia = &profile.cia;
    let mut x = canvas.margins().left;
    canvas.text_at(
        x,
        cia.text_y,
        "CIA triad impact:",
        cia.text_font,
        FontFace::Regular,
        background.blend(Rgb::BLACK, 0.67),
    )?;

    let font_h = cia.label_font * PT_TO_MM;
    for label in labels {
        let word = label.to_uppercase();
        let width = canvas.text_width(&word, cia.label_font, FontFace::Regular) + cia.padding * 2.0;
        canvas.fill_rect(x, cia.label_y, width, cia.height, background.blend(Rgb::WHITE, 0.2))?;
        canvas.text_at(
            x + cia.padding,
            cia.label_y + (cia.height - font_h) / 2.0,
            &word,
            cia.label_font,
            FontFace::Regular,
            background.blend(Rgb::BLACK, 0.67),
        )?;
        x += width + cia.spacing;
    }
    Ok(())
}

/// "If your answer is YES or MAYBE, you might be at risk", in white on the dark band.
fn draw_threat_if(canvas: &mut CardCanvas, profile: &SizeProfile, threatif: &str) -> Result<(), LayoutError> {
    let run = |text: &str, bold: bool| Run {
        text: text.to_string(),
        style: RunStyle {
            bold,
            italic: false,
        },
    };
    let markup = Markup {
        blocks: vec![Block {
            kind: BlockKind::Paragraph,
            runs: vec![
                run("If your answer is ", false),
                run(&threatif.trim().to_uppercase(), true),
                run(" or ", false),
                run("MAYBE", true),
                run(", you might be at risk", false),
            ],
        }],
    };
    canvas.set_y(profile.threat_if.y);
    canvas.write_markup(
        &markup,
        &TextStyle {
            size_pt: profile.threat_if.font,
            align: Align::Center,
            color: Rgb::WHITE,
        },
    )
}

/// Warning triangle with an exclamation mark, left of the threat-if text.
fn draw_warning_icon(canvas: &mut CardCanvas, profile: &SizeProfile, band: Rgb) -> Result<(), LayoutError> {
    let t = &profile.threat_if;
    let (x, y, s) = (t.icon_x, t.icon_y, t.icon_size);
    let tri_h = s * 0.87;
    canvas.fill_polygon(
        vec![(x + s / 2.0, y), (x + s, y + tri_h), (x, y + tri_h)],
        band.blend(Rgb::WHITE, 0.6),
    )?;

    let mark_pt = s * 0.55 / PT_TO_MM;
    let mark_w = canvas.text_width("!", mark_pt, FontFace::Bold);
    canvas.text_at(
        x + (s - mark_w) / 2.0,
        y + tri_h * 0.3,
        "!",
        mark_pt,
        FontFace::Bold,
        band,
    )
}

// ────────────────────────────────────────────────────────────────────────────
// Back
// ────────────────────────────────────────────────────────────────────────────

pub fn draw_card_back(
    canvas: &mut CardCanvas,
    profile: &SizeProfile,
    card: &ThreatCard,
    shades: Shades,
    qr_base_url: &str,
) -> Result<FitResult, AppError> {
    let record = &card.record;
    canvas.add_page();
    draw_backdrop(canvas, profile, shades, Side::Back)?;
    draw_icons(canvas, profile, card, shades.light)?;
    draw_label(canvas, profile, &record.label, shades.light)?;

    canvas.set_y(profile.recommendation_header_y);
    canvas.write_markup(
        &Markup::plain("Recommendations", RunStyle::BOLD),
        &TextStyle {
            size_pt: profile.recommendation_header_font,
            align: Align::Center,
            color: Rgb::BLACK,
        },
    )?;

    canvas.set_left_margin(profile.explanation_margin);
    let recommendation = TextBlock {
        markup: Markup::from_markdown(&record.recommendation),
        align: Align::Justify,
        color: Rgb::BLACK,
        region: profile.recommendation.region,
        font: profile.recommendation.font,
        mode: FitMode::PageBound,
    };
    let recommendation = auto_fit(canvas, &recommendation)?;

    if let Some(link) = record.qr.as_deref().filter(|l| !l.trim().is_empty()) {
        match qr::link_url_only(link) {
            Some(url) => {
                let matrix = qr::encode(&url)?;
                let width = profile.info_qr_width;
                let x = (canvas.width() - width) / 2.0;
                let y = canvas.y() - profile.info_qr_lift;
                qr::draw_qr(canvas, &matrix, x, y, width, Rgb::BLACK, Rgb::WHITE)?;
            }
            None => warn!(card = card.number, link, "Info link has no URL; QR skipped"),
        }
    }

    let card_url = format!(
        "{qr_base_url}library/card/{}",
        qr::card_id(card.main_category(), &record.question)
    );
    let matrix = qr::encode(&card_url)?;
    let placement = profile.card_qr;
    qr::draw_qr(
        canvas,
        &matrix,
        placement.x,
        placement.y,
        placement.width,
        Rgb::BLACK,
        shades.main,
    )?;

    draw_footer(canvas, profile)?;

    debug!(
        card = card.number,
        recommendation_pt = recommendation.font_size,
        url = %card_url,
        "Card back drawn"
    );
    Ok(recommendation)
}

// ────────────────────────────────────────────────────────────────────────────
// Shared parts
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Front,
    Back,
}

fn dark_band_colour(shades: Shades) -> Rgb {
    shades.main.blend(Rgb::BLACK, 0.25)
}

/// Colour blocks behind the card content.
fn draw_backdrop(canvas: &mut CardCanvas, profile: &SizeProfile, shades: Shades, side: Side) -> Result<(), LayoutError> {
    let w = canvas.width();
    let h = canvas.height();
    let base = match side {
        Side::Front => shades.main,
        Side::Back => shades.light,
    };
    let band = &profile.label_band;

    canvas.fill_rect(0.0, 0.0, w, profile.header_height, base)?;
    canvas.fill_rect(0.0, band.y, w, band.height, Rgb::WHITE.blend(base, 0.7))?;

    match side {
        Side::Front => {
            canvas.fill_rect(0.0, profile.body_y, w, profile.dark_band_top - profile.body_y, shades.main)?;
            canvas.fill_rect(
                0.0,
                profile.dark_band_top,
                w,
                profile.dark_band_bottom - profile.dark_band_top,
                dark_band_colour(shades),
            )?;
        }
        Side::Back => {
            let header_bottom = band.y + band.height;
            canvas.fill_rect(0.0, header_bottom, w, profile.body_y - header_bottom, shades.main)?;
            canvas.fill_rect(0.0, profile.body_y, w, profile.dark_band_bottom - profile.body_y, shades.light)?;
        }
    }

    canvas.fill_rect(0.0, profile.dark_band_bottom, w, h - profile.dark_band_bottom, Rgb::WHITE)
}

/// Category tiles from the left, phase tiles right-aligned, each showing an
/// abbreviation of its name.
fn draw_icons(canvas: &mut CardCanvas, profile: &SizeProfile, card: &ThreatCard, header: Rgb) -> Result<(), LayoutError> {
    let icons = &profile.icons;
    let pitch = icons.width + icons.margin;
    let record = &card.record;

    let mut x = icons.category_x;
    for category in &record.categories {
        draw_tile(canvas, x, icons.y, icons.width, &abbreviate(category), header.blend(Rgb::WHITE, 0.45), Rgb::BLACK)?;
        x += pitch;
    }

    let mut x = icons.phase_x - pitch * record.phases.len().saturating_sub(1) as f32;
    for phase in &record.phases {
        draw_tile(canvas, x, icons.y, icons.width, &abbreviate(phase), header.blend(Rgb::BLACK, 0.4), Rgb::WHITE)?;
        x += pitch;
    }
    Ok(())
}

fn draw_tile(canvas: &mut CardCanvas, x: f32, y: f32, size: f32, text: &str, fill: Rgb, ink: Rgb) -> Result<(), LayoutError> {
    canvas.fill_rect(x, y, size, size, fill)?;
    let font_pt = size * 0.35 / PT_TO_MM;
    let text_w = canvas.text_width(text, font_pt, FontFace::Bold);
    canvas.text_at(
        x + (size - text_w) / 2.0,
        y + (size - font_pt * PT_TO_MM) / 2.0,
        text,
        font_pt,
        FontFace::Bold,
        ink,
    )
}

/// Up to two initials: "Data & Data Governance" -> "DD", "Safety" -> "S".
fn abbreviate(name: &str) -> String {
    name.split(|c: char| c.is_whitespace() || c == '-' || c == ',')
        .filter_map(|word| word.chars().find(|c| c.is_alphanumeric()))
        .take(2)
        .flat_map(char::to_uppercase)
        .collect()
}

fn draw_label(canvas: &mut CardCanvas, profile: &SizeProfile, label: &str, base: Rgb) -> Result<(), LayoutError> {
    let markup = Markup::plain(label, RunStyle::BOLD);
    if markup.is_empty() {
        return Ok(());
    }
    let band_colour = Rgb::WHITE.blend(base, 0.7);
    canvas.set_y(profile.label_band.text_y);
    canvas.write_markup(
        &markup,
        &TextStyle {
            size_pt: profile.label_band.font,
            align: Align::Center,
            color: band_colour.blend(Rgb::BLACK, 0.5),
        },
    )
}

/// "PLOT" "4" "AI" wordmark, drawn on every page.
pub fn draw_footer(canvas: &mut CardCanvas, profile: &SizeProfile) -> Result<(), LayoutError> {
    let f = &profile.footer;
    let plot_y = f.y + 1.0;
    canvas.text_at(f.x, plot_y, "PLOT", f.plot_font, FontFace::Bold, FOOTER_DARK)?;
    let four_x = f.x + canvas.text_width("PLOT", f.plot_font, FontFace::Bold);
    canvas.text_at(four_x, plot_y, "4", f.plot_font, FontFace::Bold, FOOTER_LIGHT)?;
    canvas.text_at(f.x + f.ai_dx, f.y + f.ai_dy, "AI", f.ai_font, FontFace::Bold, FOOTER_DARK)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::palette::CategoryPalette;
    use crate::layout::canvas::DrawOp;
    use crate::models::card::CiaFlag;
    use crate::models::ThreatRecord;

    fn make_canvas(profile: &SizeProfile) -> CardCanvas {
        CardCanvas::new(profile.page_width, profile.page_height, profile.margins, profile.list_indent)
    }

    fn make_card(explanation: &str) -> ThreatCard {
        ThreatCard {
            number: 1,
            record: ThreatRecord {
                label: "Data".to_string(),
                question: "Is the training data representative of the people the system serves?".to_string(),
                threatif: "No".to_string(),
                explanation: explanation.to_string(),
                recommendation: "- Audit the data sources.\n- Document known gaps.".to_string(),
                categories: vec!["Data & Data Governance".to_string()],
                phases: vec!["Design".to_string(), "Input".to_string()],
                cia: vec![],
                qr: None,
                roles: vec![],
                aitypes: vec![],
            },
        }
    }

    fn make_shades() -> Shades {
        CategoryPalette::builtin().get("83b3db").unwrap()
    }

    fn page_texts(canvas: &CardCanvas) -> Vec<String> {
        canvas.pages()[0]
            .ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_front_fits_on_one_page() {
        for profile in [SizeProfile::a4(), SizeProfile::a6()] {
            let mut canvas = make_canvas(&profile);
            let explanation = "Bias in the data leads to unfair outcomes for groups. ".repeat(20);
            let fit = draw_card_front(&mut canvas, &profile, &make_card(&explanation), make_shades()).unwrap();
            assert_eq!(canvas.page_number(), 1, "{} front spilled", profile.size);
            assert!(fit.explanation.final_position.y <= profile.explanation.region.overflow_threshold_y);
            assert!(fit.question.final_position.y <= profile.question.region.overflow_threshold_y);
        }
    }

    #[test]
    fn test_front_threat_if_sentence() {
        let profile = SizeProfile::a4();
        let mut canvas = make_canvas(&profile);
        draw_card_front(&mut canvas, &profile, &make_card("Short."), make_shades()).unwrap();
        let texts = page_texts(&canvas).join(" ");
        assert!(texts.contains("NO"), "threat-if answer should be upper-cased: {texts}");
        assert!(texts.contains("MAYBE"));
        assert!(texts.contains("might be at risk"));
    }

    #[test]
    fn test_front_cia_labels_drawn() {
        let profile = SizeProfile::a4();
        let mut canvas = make_canvas(&profile);
        let mut card = make_card("Short.");
        card.record.cia = vec![CiaFlag::Confidentiality, CiaFlag::Integrity];
        let fit = draw_card_front(&mut canvas, &profile, &card, make_shades()).unwrap();
        let texts = page_texts(&canvas);
        assert!(texts.iter().any(|t| t == "CIA triad impact:"));
        assert!(texts.iter().any(|t| t == "CONFIDENTIALITY"));
        assert!(texts.iter().any(|t| t == "INTEGRITY"));
        assert!(fit.explanation.final_position.y <= profile.cia.text_y);
    }

    #[test]
    fn test_back_draws_recommendation_and_card_qr() {
        let profile = SizeProfile::a6();
        let mut canvas = make_canvas(&profile);
        let fit = draw_card_back(&mut canvas, &profile, &make_card("x"), make_shades(), "https://plot4.ai/").unwrap();
        assert_eq!(canvas.page_number(), 1);
        assert!(!fit.floor_reached);
        let texts = page_texts(&canvas);
        assert!(texts.iter().any(|t| t == "Recommendations"));
        let qr_background = DrawOp::Rect {
            x: profile.card_qr.x,
            y: profile.card_qr.y,
            w: profile.card_qr.width,
            h: profile.card_qr.width,
            color: make_shades().main,
        };
        assert!(canvas.pages()[0].ops.contains(&qr_background));
    }

    #[test]
    fn test_back_info_qr_only_with_link() {
        let profile = SizeProfile::a4();
        let mut plain = make_canvas(&profile);
        draw_card_back(&mut plain, &profile, &make_card("x"), make_shades(), "https://plot4.ai/").unwrap();

        let mut card = make_card("x");
        card.record.qr = Some("[Human rights](https://example.org/hr)".to_string());
        let mut linked = make_canvas(&profile);
        draw_card_back(&mut linked, &profile, &card, make_shades(), "https://plot4.ai/").unwrap();

        let white_squares = |canvas: &CardCanvas| {
            canvas.pages()[0]
                .ops
                .iter()
                .filter(|op| matches!(op, DrawOp::Rect { w, h, color, .. }
                    if *w == profile.info_qr_width && *h == profile.info_qr_width && *color == Rgb::WHITE))
                .count()
        };
        assert_eq!(white_squares(&plain), 0);
        assert_eq!(white_squares(&linked), 1);
    }

    #[test]
    fn test_footer_wordmark() {
        let profile = SizeProfile::a4();
        let mut canvas = make_canvas(&profile);
        canvas.add_page();
        draw_footer(&mut canvas, &profile).unwrap();
        assert_eq!(page_texts(&canvas), vec!["PLOT", "4", "AI"]);
    }

    #[test]
    fn test_abbreviate() {
        assert_eq!(abbreviate("Data & Data Governance"), "DD");
        assert_eq!(abbreviate("Safety"), "S");
        assert_eq!(abbreviate("Identifiability & Linkability"), "IL");
        assert_eq!(abbreviate(""), "");
    }
}

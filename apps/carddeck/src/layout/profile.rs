//! Per-format geometry.
//!
//! Every coordinate the card layout uses lives in a `SizeProfile`. One is
//! built at startup for the requested format and passed by reference; the
//! drawing code never hard-codes a position.
//!
//! All values are millimetres (positions, from the top-left corner) or
//! points (font sizes).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::layout::canvas::Margins;
use crate::layout::fit::{FontParams, Region};

/// Smallest font size the auto-fit search may reach, for every block.
pub const MIN_FONT_PT: f32 = 1.0;

// ────────────────────────────────────────────────────────────────────────────
// Deck size
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeckSize {
    A4,
    A6,
}

impl FromStr for DeckSize {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A4" => Ok(DeckSize::A4),
            "A6" => Ok(DeckSize::A6),
            _ => Err(AppError::InvalidSize(s.to_string())),
        }
    }
}

impl fmt::Display for DeckSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeckSize::A4 => write!(f, "A4"),
            DeckSize::A6 => write!(f, "A6"),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Geometry groups
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FontSizes {
    pub normal: f32,
    pub normal_plus: f32,
    pub h1: f32,
}

/// The translucent band carrying the card label, below the header.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabelBand {
    pub y: f32,
    pub height: f32,
    pub text_y: f32,
    pub font: f32,
}

/// Category tiles (left to right) and phase tiles (right-aligned) in the header.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IconStrip {
    pub category_x: f32,
    pub y: f32,
    pub width: f32,
    pub margin: f32,
    /// X of the right-most phase tile.
    pub phase_x: f32,
}

/// A region the auto-fit engine fills.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitRegion {
    pub region: Region,
    pub font: FontParams,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CiaGeometry {
    pub text_y: f32,
    pub label_y: f32,
    pub text_font: f32,
    pub label_font: f32,
    pub padding: f32,
    pub height: f32,
    pub spacing: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThreatIfGeometry {
    pub y: f32,
    pub font: f32,
    pub icon_x: f32,
    pub icon_y: f32,
    pub icon_size: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QrPlacement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FooterGeometry {
    pub x: f32,
    pub y: f32,
    pub ai_dx: f32,
    pub ai_dy: f32,
    pub plot_font: f32,
    pub ai_font: f32,
}

// ────────────────────────────────────────────────────────────────────────────
// Size profile
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizeProfile {
    pub size: DeckSize,
    /// Physical page, including bleed for the cutout format.
    pub page_width: f32,
    pub page_height: f32,
    pub margins: Margins,
    pub list_indent: f32,
    pub fonts: FontSizes,
    /// Fraction of the content width the intro pages use.
    pub intro_width_factor: f32,

    pub header_height: f32,
    pub label_band: LabelBand,
    pub icons: IconStrip,
    /// Top of the card body (the explanation panel).
    pub body_y: f32,
    /// The dark threat-if banner spans `dark_band_top..dark_band_bottom`;
    /// below it is the white footer strip.
    pub dark_band_top: f32,
    pub dark_band_bottom: f32,

    pub question: FitRegion,
    pub explanation: FitRegion,
    /// Left margin of the explanation and recommendation text.
    pub explanation_margin: f32,
    pub recommendation: FitRegion,
    pub recommendation_header_y: f32,
    pub recommendation_header_font: f32,

    pub cia: CiaGeometry,
    pub threat_if: ThreatIfGeometry,
    pub card_qr: QrPlacement,
    /// The info QR is centred horizontally, `info_qr_lift` above the
    /// cursor left by the recommendation.
    pub info_qr_lift: f32,
    pub info_qr_width: f32,
    pub footer: FooterGeometry,
}

impl SizeProfile {
    pub fn for_size(size: DeckSize) -> Self {
        match size {
            DeckSize::A4 => Self::a4(),
            DeckSize::A6 => Self::a6(),
        }
    }

    pub fn a4() -> Self {
        SizeProfile {
            size: DeckSize::A4,
            page_width: 210.0,
            page_height: 297.0,
            margins: Margins {
                left: 15.0,
                right: 15.0,
                top: 27.0,
            },
            list_indent: 5.0,
            fonts: FontSizes {
                normal: 12.0,
                normal_plus: 14.0,
                h1: 16.0,
            },
            intro_width_factor: 0.75,

            header_height: 30.0,
            label_band: LabelBand {
                y: 30.0,
                height: 5.0,
                text_y: 30.3,
                font: 10.0,
            },
            icons: IconStrip {
                category_x: 8.0,
                y: 7.0,
                width: 17.0,
                margin: 5.0,
                phase_x: 185.0,
            },
            body_y: 72.0,
            dark_band_top: 240.0,
            dark_band_bottom: 280.0,

            question: FitRegion {
                region: Region {
                    y_init: 35.0,
                    overflow_threshold_y: 72.0,
                },
                font: FontParams {
                    init: 21.0,
                    step: 1.0,
                    floor: MIN_FONT_PT,
                },
            },
            explanation: FitRegion {
                region: Region {
                    y_init: 70.0,
                    overflow_threshold_y: 240.0,
                },
                font: FontParams {
                    init: 17.5,
                    step: 0.5,
                    floor: MIN_FONT_PT,
                },
            },
            explanation_margin: 28.0,
            recommendation: FitRegion {
                region: Region {
                    y_init: 74.0,
                    overflow_threshold_y: 240.0,
                },
                font: FontParams {
                    init: 17.5,
                    step: 0.5,
                    floor: MIN_FONT_PT,
                },
            },
            recommendation_header_y: 45.0,
            recommendation_header_font: 24.0,

            cia: CiaGeometry {
                text_y: 224.0,
                label_y: 231.0,
                text_font: 11.0,
                label_font: 9.0,
                padding: 2.0,
                height: 5.0,
                spacing: 3.0,
            },
            threat_if: ThreatIfGeometry {
                y: 250.0,
                font: 24.0,
                icon_x: 7.0,
                icon_y: 252.0,
                icon_size: 15.0,
            },
            card_qr: QrPlacement {
                x: 160.0,
                y: 237.0,
                width: 40.0,
            },
            info_qr_lift: 10.0,
            info_qr_width: 30.0,
            footer: FooterGeometry {
                x: 83.0,
                y: 282.0,
                ai_dx: 25.0,
                ai_dy: 3.0,
                plot_font: 22.0,
                ai_font: 20.0,
            },
        }
    }

    /// A6 cards are laid out on a 111 x 154 mm sheet: 105 x 148 plus 3 mm bleed.
    pub fn a6() -> Self {
        SizeProfile {
            size: DeckSize::A6,
            page_width: 111.0,
            page_height: 154.0,
            margins: Margins {
                left: 7.5,
                right: 7.5,
                top: 6.0,
            },
            list_indent: 5.0,
            fonts: FontSizes {
                normal: 7.0,
                normal_plus: 8.0,
                h1: 9.0,
            },
            intro_width_factor: 0.80,

            header_height: 15.0,
            label_band: LabelBand {
                y: 15.0,
                height: 2.5,
                text_y: 15.15,
                font: 5.0,
            },
            icons: IconStrip {
                category_x: 5.0,
                y: 5.0,
                width: 8.5,
                margin: 2.5,
                phase_x: 97.5,
            },
            body_y: 36.0,
            dark_band_top: 125.5,
            dark_band_bottom: 142.5,

            question: FitRegion {
                region: Region {
                    y_init: 17.5,
                    overflow_threshold_y: 36.0,
                },
                font: FontParams {
                    init: 10.5,
                    step: 0.5,
                    floor: MIN_FONT_PT,
                },
            },
            explanation: FitRegion {
                region: Region {
                    y_init: 35.0,
                    overflow_threshold_y: 125.0,
                },
                font: FontParams {
                    init: 8.75,
                    step: 0.25,
                    floor: MIN_FONT_PT,
                },
            },
            explanation_margin: 14.0,
            recommendation: FitRegion {
                region: Region {
                    y_init: 37.0,
                    overflow_threshold_y: 125.0,
                },
                font: FontParams {
                    init: 8.75,
                    step: 0.25,
                    floor: MIN_FONT_PT,
                },
            },
            recommendation_header_y: 22.5,
            recommendation_header_font: 12.0,

            cia: CiaGeometry {
                text_y: 112.0,
                label_y: 115.5,
                text_font: 5.5,
                label_font: 4.5,
                padding: 1.0,
                height: 2.5,
                spacing: 1.5,
            },
            threat_if: ThreatIfGeometry {
                y: 129.0,
                font: 12.0,
                icon_x: 5.5,
                icon_y: 130.0,
                icon_size: 7.5,
            },
            card_qr: QrPlacement {
                x: 85.5,
                y: 120.5,
                width: 20.0,
            },
            info_qr_lift: 5.0,
            info_qr_width: 15.0,
            footer: FooterGeometry {
                x: 44.5,
                y: 144.0,
                ai_dx: 12.5,
                ai_dy: 2.1,
                plot_font: 11.0,
                ai_font: 10.0,
            },
        }
    }

    /// Explanation region, raised above the CIA line when the card has one.
    pub fn explanation_region(&self, has_cia: bool) -> Region {
        let mut region = self.explanation.region;
        if has_cia {
            region.overflow_threshold_y = region.overflow_threshold_y.min(self.cia.text_y - 2.0);
        }
        region
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deck_size_parses_case_insensitively() {
        assert_eq!("A4".parse::<DeckSize>().unwrap(), DeckSize::A4);
        assert_eq!("a6".parse::<DeckSize>().unwrap(), DeckSize::A6);
        assert_eq!(DeckSize::A6.to_string(), "A6");
    }

    #[test]
    fn test_unknown_deck_size_is_an_error() {
        let err = "A5".parse::<DeckSize>().unwrap_err();
        assert!(matches!(err, AppError::InvalidSize(ref s) if s == "A5"));
    }

    #[test]
    fn test_all_font_params_are_valid() {
        for profile in [SizeProfile::a4(), SizeProfile::a6()] {
            for region in [profile.question, profile.explanation, profile.recommendation] {
                assert!(
                    region.font.validate().is_ok(),
                    "{} font params {:?} should be valid",
                    profile.size,
                    region.font
                );
            }
        }
    }

    #[test]
    fn test_regions_lie_inside_the_page() {
        for profile in [SizeProfile::a4(), SizeProfile::a6()] {
            for region in [profile.question, profile.explanation, profile.recommendation] {
                let r = region.region;
                assert!(r.y_init < r.overflow_threshold_y);
                assert!(r.overflow_threshold_y < profile.page_height);
            }
            assert!(profile.dark_band_top < profile.dark_band_bottom);
            assert!(profile.dark_band_bottom < profile.page_height);
        }
    }

    #[test]
    fn test_a6_is_roughly_half_of_a4() {
        let a4 = SizeProfile::a4();
        let a6 = SizeProfile::a6();
        assert_eq!(a6.header_height * 2.0, a4.header_height);
        assert_eq!(a6.card_qr.width * 2.0, a4.card_qr.width);
        assert_eq!(a6.explanation.font.step * 2.0, a4.explanation.font.step);
    }

    #[test]
    fn test_cia_raises_explanation_threshold() {
        let profile = SizeProfile::a4();
        assert_eq!(profile.explanation_region(false).overflow_threshold_y, 240.0);
        assert_eq!(profile.explanation_region(true).overflow_threshold_y, 222.0);
    }

    #[test]
    fn test_for_size_selects_profile() {
        assert_eq!(SizeProfile::for_size(DeckSize::A4).page_width, 210.0);
        assert_eq!(SizeProfile::for_size(DeckSize::A6).page_width, 111.0);
    }
}

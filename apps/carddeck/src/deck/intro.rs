//! Intro pages printed ahead of the cards.
//!
//! Three sheets, each with a front and a back: the title sheet (category
//! legend / "how does it work" QR), the guidelines sheet (categories /
//! lifecycle phases and tips) and the steps sheet (session steps / next steps
//! and benefits). Which sides are printed, and in what order, follows the
//! print mode.

use chrono::NaiveDate;
use tracing::warn;

use crate::deck::cards::draw_footer;
use crate::deck::catalog::CardCatalog;
use crate::deck::qr;
use crate::deck::{DeckOptions, PrintMode};
use crate::errors::{AppError, LayoutError};
use crate::layout::canvas::{Align, CardCanvas, Margins, Rgb, TextStyle};
use crate::layout::fit::{auto_fit, FitMode, FontParams, Region, TextBlock};
use crate::layout::font_metrics::{FontFace, PT_TO_MM};
use crate::layout::markup::{Markup, RunStyle};
use crate::layout::profile::{SizeProfile, MIN_FONT_PT};

/// Heading colour on the intro pages.
const ACCENT: Rgb = Rgb::new(0x0f, 0x71, 0xd4);
const GREY: Rgb = Rgb::new(0x66, 0x66, 0x66);
/// Path of the instructions page the title sheet's QR code links to.
pub const HOW_IT_WORKS_PATH: &str = "how-does-it-work?qr&instructions";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntroPage {
    TitleFront,
    TitleBack,
    GuidelinesFront,
    GuidelinesBack,
    StepsFront,
    StepsBack,
}

impl IntroPage {
    /// Pages in print order for `mode`.
    pub fn sequence(mode: PrintMode) -> Vec<IntroPage> {
        use IntroPage::*;
        match mode {
            PrintMode::Fronts => vec![TitleFront, GuidelinesFront, StepsFront],
            PrintMode::Backs => vec![TitleBack, GuidelinesBack, StepsBack],
            PrintMode::FrontAndBack => vec![
                TitleFront,
                TitleBack,
                GuidelinesFront,
                GuidelinesBack,
                StepsFront,
                StepsBack,
            ],
        }
    }
}

/// Draws the intro pages for `options.mode`. Returns the number of pages added.
pub fn draw_intro(
    canvas: &mut CardCanvas,
    profile: &SizeProfile,
    catalog: &CardCatalog,
    options: &DeckOptions,
) -> Result<u32, AppError> {
    let before = canvas.page_number();
    for page in IntroPage::sequence(options.mode) {
        canvas.add_page();
        let margins = intro_margins(profile);
        canvas.set_margins(margins);
        match page {
            IntroPage::TitleFront => title_front(canvas, profile, catalog)?,
            IntroPage::TitleBack => title_back(canvas, profile, options)?,
            IntroPage::GuidelinesFront => {
                heading(canvas, profile, "Guidelines")?;
                body(canvas, profile, &guidelines_markdown(catalog))?;
            }
            IntroPage::GuidelinesBack => {
                heading(canvas, profile, "Development Lifecycle (DLC)")?;
                body(canvas, profile, &lifecycle_markdown(catalog))?;
            }
            IntroPage::StepsFront => {
                heading(canvas, profile, "Steps")?;
                body(canvas, profile, STEPS)?;
            }
            IntroPage::StepsBack => {
                heading(canvas, profile, "Next steps")?;
                body(canvas, profile, NEXT_STEPS)?;
            }
        }
        draw_footer(canvas, profile)?;
    }
    Ok(canvas.page_number() - before)
}

/// The intro pages use a centred column narrower than the cards.
fn intro_margins(profile: &SizeProfile) -> Margins {
    let width = profile.page_width * profile.intro_width_factor;
    let side = (profile.page_width - width) / 2.0;
    Margins {
        left: side,
        right: side,
        top: profile.margins.top,
    }
}

fn heading(canvas: &mut CardCanvas, profile: &SizeProfile, text: &str) -> Result<(), LayoutError> {
    canvas.write_markup(
        &Markup::plain(text, RunStyle::BOLD),
        &TextStyle {
            size_pt: profile.fonts.h1,
            align: Align::Center,
            color: ACCENT,
        },
    )?;
    canvas.set_y(canvas.y() + profile.fonts.h1 * PT_TO_MM * 0.5);
    Ok(())
}

/// Fits guidance text between the cursor and the footer, starting at the
/// normal intro font size.
fn body(canvas: &mut CardCanvas, profile: &SizeProfile, markdown: &str) -> Result<(), LayoutError> {
    let step = 0.5;
    let block = TextBlock {
        markup: Markup::from_markdown(markdown),
        align: Align::Justify,
        color: Rgb::BLACK,
        region: Region {
            y_init: canvas.y(),
            overflow_threshold_y: profile.footer.y - 1.0,
        },
        font: FontParams {
            init: profile.fonts.normal + step,
            step,
            floor: MIN_FONT_PT,
        },
        mode: FitMode::PageBound,
    };
    auto_fit(canvas, &block)?;
    Ok(())
}

fn title_front(canvas: &mut CardCanvas, profile: &SizeProfile, catalog: &CardCatalog) -> Result<(), LayoutError> {
    canvas.set_y(profile.margins.top + profile.fonts.h1 * PT_TO_MM * 2.0);
    canvas.write_markup(
        &Markup::plain("PLOT4ai", RunStyle::BOLD),
        &TextStyle {
            size_pt: profile.fonts.h1 * 2.5,
            align: Align::Center,
            color: ACCENT,
        },
    )?;
    canvas.write_markup(
        &Markup::plain("Practical Library Of Threats 4 Artificial Intelligence", RunStyle::default()),
        &TextStyle {
            size_pt: profile.fonts.normal_plus,
            align: Align::Center,
            color: GREY,
        },
    )?;
    canvas.set_y(canvas.y() + profile.fonts.h1 * PT_TO_MM * 2.0);

    draw_legend(canvas, profile, catalog)
}

/// Category legend: swatch, name, card count. Rows shrink to fit above the
/// footer; rows that still do not fit at the minimum size are left out.
fn draw_legend(canvas: &mut CardCanvas, profile: &SizeProfile, catalog: &CardCatalog) -> Result<(), LayoutError> {
    const ROW_SPACING: f32 = 1.6;
    let bottom = profile.footer.y - 1.0;
    let available = (bottom - canvas.y()).max(0.0);
    let rows = catalog.categories.len() as f32;

    let mut size = profile.fonts.normal_plus;
    let needed = rows * size * PT_TO_MM * ROW_SPACING;
    if needed > available {
        size = (size * available / needed).max(MIN_FONT_PT);
        warn!(
            categories = catalog.categories.len(),
            size, "Category legend shrunk to fit the title page"
        );
    }

    let row_h = size * PT_TO_MM * ROW_SPACING;
    let swatch = size * PT_TO_MM;
    let x = canvas.margins().left;
    for (drawn, category) in catalog.categories.iter().enumerate() {
        let y = canvas.y();
        if y + swatch > bottom {
            warn!(
                drawn,
                skipped = catalog.categories.len() - drawn,
                "Category legend does not fit above the footer"
            );
            break;
        }
        canvas.fill_rect(x, y, swatch, swatch, category.shades.main)?;
        let label = format!("{} ({})", category.name, category.card_count);
        canvas.text_at(x + swatch * 1.8, y, &label, size, FontFace::Regular, Rgb::BLACK)?;
        canvas.set_y(y + row_h);
    }
    Ok(())
}

fn title_back(canvas: &mut CardCanvas, profile: &SizeProfile, options: &DeckOptions) -> Result<(), AppError> {
    heading(canvas, profile, "How does it work?")?;

    let margins = canvas.margins();
    let width = canvas.width() - margins.left - margins.right;
    let y = canvas.y() + profile.fonts.h1 * PT_TO_MM;
    let url = format!("{}{HOW_IT_WORKS_PATH}", options.qr_base_url);
    let matrix = qr::encode(&url)?;
    qr::draw_qr(canvas, &matrix, margins.left, y, width, Rgb::BLACK, Rgb::WHITE)?;

    canvas.set_y(y + width + profile.fonts.normal * PT_TO_MM);
    canvas.write_markup(
        &Markup::plain(&generated_caption(options.generated_on), RunStyle::default()),
        &TextStyle {
            size_pt: profile.fonts.normal,
            align: Align::Center,
            color: GREY,
        },
    )?;
    Ok(())
}

fn generated_caption(date: NaiveDate) -> String {
    format!("Deck generated on {}", date.format("%Y-%m-%d"))
}

// ────────────────────────────────────────────────────────────────────────────
// Guidance text
// ────────────────────────────────────────────────────────────────────────────

fn guidelines_markdown(catalog: &CardCatalog) -> String {
    let mut text = format!(
        "PLOT4ai is a library of **{} threats** classified under **{} categories**:\n\n",
        catalog.cards.len(),
        catalog.categories.len()
    );
    for category in &catalog.categories {
        text.push_str(&format!("- **{}**", category.name));
        if let Some(description) = category.description.as_deref().filter(|d| !d.trim().is_empty()) {
            text.push_str(&format!(": {}", description.trim()));
        }
        text.push('\n');
    }
    text
}

fn lifecycle_markdown(catalog: &CardCatalog) -> String {
    let mut phases: Vec<&str> = Vec::new();
    for phase in catalog.cards.iter().flat_map(|c| c.record.phases.iter()) {
        if !phases.contains(&phase.as_str()) {
            phases.push(phase);
        }
    }
    let mut text = format!(
        "Threats apply in **{} phases** of the development lifecycle:\n\n",
        phases.len()
    );
    for phase in phases {
        text.push_str(&format!("- {phase}\n"));
    }
    text.push_str("\n## How can you apply PLOT4ai in practice?\n\n");
    text.push_str(QUICK_TIPS);
    text
}

const QUICK_TIPS: &str = "\
- Keep sessions under two hours, or run 30 minute timeboxed sessions on one or two categories.
- Invite every stakeholder who holds knowledge or can take decisions. Diversity matters.
- Pick a facilitator to guide the session. Some privacy knowledge helps but is not required.
- Select the cards up front. Skip threats your quality process already covers.
- Add an effort column to the threat report if you need to prioritise.
- Agree on time boxes per threat and on when an exception is allowed.
";

const STEPS: &str = "\
1. Draw a data flow diagram of the system with the stakeholders. A simple one is enough during design.
2. Select the cards for the session, at random or by category.
3. Gather the stakeholders and start the session.
4. For each card, read the question and its explanation out loud.
5. Discuss the possible threat. Two minutes per card is usually enough; ethics cards may need more.
6. The card tells you whether YES or NO signals a threat. When unsure, treat it as a possible threat.
7. Turn the card over to read the recommendations, now or after the session.
8. Document the threat in the threat report.
9. Rate the risk as low, medium or high and note possible actions and an owner.
10. Stop when time is up or every card has been discussed.
";

const NEXT_STEPS: &str = "\
- Add the threats to your project backlog.
- Start with quick fixes and follow up on the rest.
- Record warnings that are not yet risks and review them regularly.
- Agree on privacy acceptance criteria with your development teams.
- Train the team in privacy, data protection and ethics.

## Benefits

- Threats that recur across projects point to process improvements.
- Clear expectations on bias, discrimination and explainability reduce rework.
- Sessions put every stakeholder on the same page.
- The output feeds directly into privacy impact assessments.
";

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

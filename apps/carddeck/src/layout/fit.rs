//! Auto-fit text layout engine.
//!
//! # Algorithm
//! Searches downward for the largest font size at which a block of text,
//! rendered from its region's start Y, stays inside that region:
//!
//! 1. `size -= step`, then render the block speculatively at `size`.
//! 2. Read the resulting cursor (Y, page) and roll the render back.
//! 3. Stop when the block fits, or when the next candidate would fall below
//!    `floor`. Otherwise go to 1.
//! 4. Render once more at the chosen size; that render is the one that stays.
//!
//! The first trial is always at `init - step`, never at `init`. Reaching the
//! floor without fitting is a degraded result, not an error: the text is
//! committed at the floor size and a warning is logged.
//!
//! The engine only talks to a `TrialRenderer`, so the search logic is tested
//! against a scripted renderer, and `CardCanvas` provides the real one.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::LayoutError;
use crate::layout::canvas::{Align, CardCanvas, Rgb, TextStyle};
use crate::layout::markup::Markup;

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

/// Font-size search parameters, in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FontParams {
    pub init: f32,
    pub step: f32,
    pub floor: f32,
}

impl FontParams {
    /// Rejects parameters the search cannot run with: non-finite values, a
    /// step that does not shrink the size, or a first trial size of zero or
    /// less. A first trial below the floor is allowed; the search then stops
    /// after that one trial.
    pub fn validate(&self) -> Result<(), LayoutError> {
        let finite = self.init.is_finite() && self.step.is_finite() && self.floor.is_finite();
        if finite && self.step > 0.0 && self.floor > 0.0 && self.init - self.step > 0.0 {
            Ok(())
        } else {
            Err(LayoutError::InvalidFontParams {
                init: self.init,
                step: self.step,
                floor: self.floor,
            })
        }
    }

    /// Upper bound on the number of trials a search can take.
    pub fn max_trials(&self) -> u32 {
        ((self.init - self.floor) / self.step).ceil() as u32 + 1
    }
}

/// Vertical extent a block must stay within.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Cursor Y the block starts at.
    pub y_init: f32,
    /// The cursor must end at or above this Y.
    pub overflow_threshold_y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitMode {
    /// Fits when the resulting Y is within the threshold.
    SingleRegion,
    /// Fits when the resulting Y is within the threshold AND the render did
    /// not spill onto another page.
    PageBound,
}

/// One text block to be fitted into one card region.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub markup: Markup,
    pub align: Align,
    pub color: Rgb,
    pub region: Region,
    pub font: FontParams,
    pub mode: FitMode,
}

impl TextBlock {
    pub fn style(&self, size_pt: f32) -> TextStyle {
        TextStyle {
            size_pt,
            align: self.align,
            color: self.color,
        }
    }

    fn fits(&self, position: RenderPosition, start_page: u32) -> bool {
        let within = position.y <= self.region.overflow_threshold_y;
        match self.mode {
            FitMode::SingleRegion => within,
            FitMode::PageBound => within && position.page == start_page,
        }
    }
}

/// Cursor position after a render.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderPosition {
    pub y: f32,
    pub page: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    /// Size used for the committed render.
    pub font_size: f32,
    /// Number of speculative renders performed.
    pub trials: u32,
    /// The search ran out of sizes without finding a fit, or its first
    /// trial was already below the floor.
    pub floor_reached: bool,
    /// The last trial ended on the page the block started on.
    pub same_page: bool,
    /// Cursor after the committed render.
    pub final_position: RenderPosition,
}

// ────────────────────────────────────────────────────────────────────────────
// Renderer seam
// ────────────────────────────────────────────────────────────────────────────

/// A renderer that supports speculative rendering.
///
/// Every `render_trial` must be paired with a `rollback` that restores the
/// state captured just before the trial. A trial that fails must leave the
/// renderer as it was.
pub trait TrialRenderer {
    fn render_trial(&mut self, block: &TextBlock, size_pt: f32) -> Result<RenderPosition, LayoutError>;

    fn rollback(&mut self);

    fn render_final(&mut self, block: &TextBlock, size_pt: f32) -> Result<RenderPosition, LayoutError>;

    fn current_page(&self) -> u32;

    fn current_y(&self) -> f32;
}

impl CardCanvas {
    fn render_block(&mut self, block: &TextBlock, size_pt: f32) -> Result<RenderPosition, LayoutError> {
        self.set_y(block.region.y_init);
        self.write_markup(&block.markup, &block.style(size_pt))?;
        Ok(RenderPosition {
            y: self.y(),
            page: self.page_number(),
        })
    }
}

impl TrialRenderer for CardCanvas {
    fn render_trial(&mut self, block: &TextBlock, size_pt: f32) -> Result<RenderPosition, LayoutError> {
        let state = self.snapshot();
        match self.render_block(block, size_pt) {
            Ok(position) => {
                self.trial = Some(state);
                Ok(position)
            }
            Err(e) => {
                self.restore(state);
                Err(e)
            }
        }
    }

    fn rollback(&mut self) {
        if let Some(state) = self.trial.take() {
            self.restore(state);
        }
    }

    fn render_final(&mut self, block: &TextBlock, size_pt: f32) -> Result<RenderPosition, LayoutError> {
        self.render_block(block, size_pt)
    }

    fn current_page(&self) -> u32 {
        self.page_number()
    }

    fn current_y(&self) -> f32 {
        self.y()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Search
// ────────────────────────────────────────────────────────────────────────────

/// Fits `block` into its region and commits it at the chosen size.
pub fn auto_fit<R: TrialRenderer>(renderer: &mut R, block: &TextBlock) -> Result<FitResult, LayoutError> {
    block.font.validate()?;
    let FontParams { init, step, floor } = block.font;
    let start_page = renderer.current_page();
    debug!(start_page, start_y = renderer.current_y(), init, step, floor, "Auto-fit start");

    let mut size = init;
    let mut trials = 0u32;
    let (fits, same_page) = loop {
        size -= step;
        trials += 1;

        let position = renderer.render_trial(block, size)?;
        renderer.rollback();

        let fits = block.fits(position, start_page);
        debug!(
            trial = trials,
            size,
            y = position.y,
            page = position.page,
            fits,
            "Auto-fit trial"
        );

        if fits || size - step < floor {
            break (fits, position.page == start_page);
        }
    };

    let floor_reached = !fits || size < floor;
    if floor_reached {
        warn!(
            size,
            floor,
            fits,
            trials,
            max_trials = block.font.max_trials(),
            threshold = block.region.overflow_threshold_y,
            "Auto-fit reached the minimum font size"
        );
    }

    let final_position = renderer.render_final(block, size)?;

    Ok(FitResult {
        font_size: size,
        trials,
        floor_reached,
        same_page,
        final_position,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

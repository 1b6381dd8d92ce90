// Text layout: font metrics, styled markup, the page/cursor canvas,
// per-format geometry and the auto-fit engine.
// Layout is CPU-bound and must run inside tokio::task::spawn_blocking.

pub mod canvas;
pub mod fit;
pub mod font_metrics;
pub mod markup;
pub mod profile;

// Re-export the entry points `main` selects a format with.
pub use profile::{DeckSize, SizeProfile};

use std::path::PathBuf;

use thiserror::Error;

/// Application-level error type.
/// Every failure that aborts a deck run ends up here and is reported once by `main`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Catalog file {path:?} could not be read: {source}")]
    CatalogRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Catalog is not valid JSON: {0}")]
    CatalogParse(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid card size '{0}' (expected A4 or A6)")]
    InvalidSize(String),

    #[error("Layout error: {0}")]
    Layout(#[from] LayoutError),

    #[error("QR code error: {0}")]
    Qr(String),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Failures raised by the page/cursor renderer.
///
/// These are fatal for the document: there is no per-card recovery from a
/// rendering failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    #[error("Cannot write before the first page has been added")]
    NoPage,

    #[error("Invalid font size {0}pt")]
    InvalidFontSize(f32),

    #[error("Invalid font parameters: init {init}pt, step {step}pt, floor {floor}pt")]
    InvalidFontParams { init: f32, step: f32, floor: f32 },
}

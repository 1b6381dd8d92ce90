//! Threat catalog loading and validation.
//!
//! The catalog is a JSON array of categories, each carrying its cards. Loading
//! flattens it into one numbered card list (numbers run across categories,
//! starting at 1) and checks everything the renderer relies on, so rendering
//! never has to handle a missing category or colour.

use std::collections::HashMap;
use std::path::Path;

use tracing::info;

use crate::deck::palette::{CategoryPalette, Shades};
use crate::errors::AppError;
use crate::layout::canvas::Rgb;
use crate::models::{CategoryRecord, ThreatRecord};

#[derive(Debug, Clone)]
pub struct ThreatCard {
    /// 1-based position in the printed deck.
    pub number: u32,
    pub record: ThreatRecord,
}

impl ThreatCard {
    /// The category that decides the card's colours.
    pub fn main_category(&self) -> &str {
        self.record
            .categories
            .first()
            .map(String::as_str)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct CatalogCategory {
    pub name: String,
    pub description: Option<String>,
    pub shades: Shades,
    pub card_count: usize,
}

#[derive(Debug, Clone)]
pub struct CardCatalog {
    pub categories: Vec<CatalogCategory>,
    pub cards: Vec<ThreatCard>,
    shades_by_name: HashMap<String, Shades>,
}

impl CardCatalog {
    pub fn shades_for(&self, category: &str) -> Option<Shades> {
        self.shades_by_name.get(category).copied()
    }

    /// Shades of the card's main category. Validated at load time to exist.
    pub fn card_shades(&self, card: &ThreatCard) -> Result<Shades, AppError> {
        self.shades_for(card.main_category()).ok_or_else(|| {
            AppError::Validation(format!(
                "Card {} has no known main category",
                card.number
            ))
        })
    }
}

/// Reads and validates the catalog at `path`.
pub async fn load_catalog(path: &Path, palette: &CategoryPalette) -> Result<CardCatalog, AppError> {
    let json = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| AppError::CatalogRead {
            path: path.to_path_buf(),
            source,
        })?;
    let catalog = parse_catalog(&json, palette)?;
    info!(
        path = %path.display(),
        categories = catalog.categories.len(),
        cards = catalog.cards.len(),
        "Catalog loaded"
    );
    Ok(catalog)
}

/// Parses catalog JSON and validates it against `palette`.
pub fn parse_catalog(json: &str, palette: &CategoryPalette) -> Result<CardCatalog, AppError> {
    let records: Vec<CategoryRecord> = serde_json::from_str(json)?;
    if records.is_empty() {
        return Err(AppError::Validation("Catalog contains no categories".into()));
    }

    let mut categories = Vec::with_capacity(records.len());
    let mut shades_by_name = HashMap::new();
    for record in &records {
        let shades = palette
            .get(&record.colour)
            .ok_or_else(|| unknown_colour(&record.category, &record.colour, palette))?;
        if shades_by_name.insert(record.category.clone(), shades).is_some() {
            return Err(AppError::Validation(format!(
                "Category '{}' is defined more than once",
                record.category
            )));
        }
        categories.push(CatalogCategory {
            name: record.category.clone(),
            description: record.description.clone(),
            shades,
            card_count: record.cards.len(),
        });
    }

    let mut cards = Vec::new();
    for record in records {
        for threat in record.cards {
            let number = cards.len() as u32 + 1;
            validate_card(number, &threat, &shades_by_name)?;
            cards.push(ThreatCard {
                number,
                record: threat,
            });
        }
    }

    Ok(CardCatalog {
        categories,
        cards,
        shades_by_name,
    })
}

fn unknown_colour(category: &str, colour: &str, palette: &CategoryPalette) -> AppError {
    let known = palette.keys().collect::<Vec<_>>().join(", ");
    let problem = if Rgb::from_hex(colour).is_some() {
        "is not a deck colour"
    } else {
        "is not a hex colour"
    };
    AppError::Validation(format!(
        "Category '{category}' uses colour '{colour}', which {problem} (expected one of: {known})"
    ))
}

fn validate_card(
    number: u32,
    threat: &ThreatRecord,
    known: &HashMap<String, Shades>,
) -> Result<(), AppError> {
    let main = threat.categories.first().ok_or_else(|| {
        AppError::Validation(format!("Card {number} has no categories"))
    })?;
    if !known.contains_key(main) {
        return Err(AppError::Validation(format!(
            "Card {number} references undefined category '{main}'"
        )));
    }
    if threat.question.trim().is_empty() {
        return Err(AppError::Validation(format!("Card {number} has an empty question")));
    }
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

//! Category colour palette.
//!
//! Each category in the catalog names a colour key; the palette maps that key
//! to the two shades a card uses: `main` for the front and header bands,
//! `light` for the back. Keys are checked when the catalog loads, so drawing
//! code can look shades up without a failure path.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::layout::canvas::Rgb;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shades {
    pub main: Rgb,
    pub light: Rgb,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryPalette {
    shades: BTreeMap<String, Shades>,
}

// (key, main, light)
#[rustfmt::skip]
const BUILTIN: [(&str, Rgb, Rgb); 8] = [
    ("83b3db", Rgb::new(0x83, 0xb3, 0xdb), Rgb::new(0xb2, 0xcd, 0xe8)),
    ("7fccdc", Rgb::new(0x7f, 0xcc, 0xdc), Rgb::new(0xb2, 0xde, 0xe9)),
    ("94cfbd", Rgb::new(0x94, 0xcf, 0xbd), Rgb::new(0xbd, 0xe0, 0xd4)),
    ("bdd895", Rgb::new(0xbd, 0xd8, 0x95), Rgb::new(0xd5, 0xe5, 0xbd)),
    ("f7f09f", Rgb::new(0xf7, 0xf0, 0x9f), Rgb::new(0xf8, 0xf6, 0xc6)),
    ("f8d18c", Rgb::new(0xf8, 0xd1, 0x8c), Rgb::new(0xfa, 0xe0, 0xb5)),
    ("f2bc9a", Rgb::new(0xf2, 0xbc, 0x9a), Rgb::new(0xf6, 0xd4, 0xbd)),
    ("eea4b5", Rgb::new(0xee, 0xa4, 0xb5), Rgb::new(0xf5, 0xc7, 0xd0)),
];

impl CategoryPalette {
    /// The eight colours the printed deck is designed around.
    pub fn builtin() -> Self {
        let shades = BUILTIN
            .iter()
            .map(|(key, main, light)| {
                (
                    key.to_string(),
                    Shades {
                        main: *main,
                        light: *light,
                    },
                )
            })
            .collect();
        CategoryPalette { shades }
    }

    /// Keys are matched case-insensitively, with or without a leading `#`.
    pub fn get(&self, key: &str) -> Option<Shades> {
        self.shades.get(&normalize_key(key)).copied()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.shades.keys().map(String::as_str)
    }
}

fn normalize_key(key: &str) -> String {
    key.trim().trim_start_matches('#').to_ascii_lowercase()
}

use std::path::PathBuf;

use anyhow::Result;

/// Application configuration loaded from environment variables.
/// Every variable has a default; CLI flags override the file locations.
#[derive(Debug, Clone)]
pub struct Config {
    /// JSON threat catalog to render.
    pub deck_path: PathBuf,
    /// Directory the PDF is written into.
    pub output_dir: PathBuf,
    /// Site the card QR codes link to. Always ends with `/`.
    pub qr_base_url: String,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            deck_path: PathBuf::from(env_or("DECK_PATH", "deck.json")),
            output_dir: PathBuf::from(env_or("OUTPUT_DIR", "output")),
            qr_base_url: normalize_base_url(&env_or("QR_BASE_URL", "https://plot4.ai/")),
            rust_log: env_or("RUST_LOG", "info"),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Trims whitespace and guarantees a single trailing slash.
pub fn normalize_base_url(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    format!("{trimmed}/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_url_adds_trailing_slash() {
        assert_eq!(normalize_base_url("https://plot4.ai"), "https://plot4.ai/");
    }

    #[test]
    fn test_normalize_base_url_collapses_repeated_slashes() {
        assert_eq!(normalize_base_url(" https://plot4.ai// "), "https://plot4.ai/");
    }

    #[test]
    fn test_env_or_falls_back_to_default() {
        assert_eq!(
            env_or("CARDDECK_TEST_SURELY_UNSET_VARIABLE", "fallback"),
            "fallback"
        );
    }
}

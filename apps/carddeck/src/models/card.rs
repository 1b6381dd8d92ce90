use serde::{Deserialize, Serialize};

/// One category entry in the catalog JSON, with the threats filed under it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub category: String,
    #[serde(default)]
    pub id: Option<String>,
    /// Colour key into the category palette, e.g. `"83b3db"`.
    pub colour: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cards: Vec<ThreatRecord>,
}

/// One threat card as stored in the catalog. Text fields are markdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatRecord {
    #[serde(default)]
    pub label: String,
    pub question: String,
    /// The answer that signals risk: "Yes" or "No".
    pub threatif: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub recommendation: String,
    /// First entry is the card's main category and decides its colours.
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub phases: Vec<String>,
    #[serde(default)]
    pub cia: Vec<CiaFlag>,
    /// Markdown link to further reading, printed as a QR code.
    #[serde(default)]
    pub qr: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub aitypes: Vec<String>,
}

/// Confidentiality / integrity / availability impact flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CiaFlag {
    #[serde(rename = "c")]
    Confidentiality,
    #[serde(rename = "i")]
    Integrity,
    #[serde(rename = "a")]
    Availability,
}

impl CiaFlag {
    pub fn label(self) -> &'static str {
        match self {
            CiaFlag::Confidentiality => "Confidentiality",
            CiaFlag::Integrity => "Integrity",
            CiaFlag::Availability => "Availability",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threat_record_optional_fields_default() {
        let json = r#"{"question": "Q?", "threatif": "Yes", "categories": ["Safety"]}"#;
        let record: ThreatRecord = serde_json::from_str(json).unwrap();
        assert!(record.label.is_empty());
        assert!(record.cia.is_empty());
        assert!(record.qr.is_none());
        assert!(record.phases.is_empty());
    }

    #[test]
    fn test_cia_flags_use_single_letter_keys() {
        let flags: Vec<CiaFlag> = serde_json::from_str(r#"["c", "a"]"#).unwrap();
        assert_eq!(flags, vec![CiaFlag::Confidentiality, CiaFlag::Availability]);
        assert_eq!(flags[1].label(), "Availability");
        assert!(serde_json::from_str::<CiaFlag>(r#""x""#).is_err());
    }
}

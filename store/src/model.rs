//! Typed views over the rule-data collections.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::{Document, Fields, field};
use crate::error::{Result, StoreError};

/// Collection names known to the application.
pub mod collections {
    pub const SYSTEMS: &str = "systems";
    pub const SOURCES: &str = "sources";
    pub const KEYWORDS: &str = "keywords";
    pub const PROFILES: &str = "profiles";
    pub const ARMORS: &str = "armors";
    pub const WEAPONS: &str = "weapons";
    pub const TRAITS: &str = "traits";

    /// Every known collection.
    pub const ALL: [&str; 7] = [SYSTEMS, SOURCES, KEYWORDS, PROFILES, ARMORS, WEAPONS, TRAITS];

    /// Collections whose entities are scoped to a game system.
    pub const PLAYABLE: [&str; 6] = [SOURCES, KEYWORDS, PROFILES, ARMORS, WEAPONS, TRAITS];

    /// Check whether a collection name is known.
    pub fn is_known(name: &str) -> bool {
        ALL.contains(&name)
    }

    /// Check whether a collection holds playable entities.
    pub fn is_playable(name: &str) -> bool {
        PLAYABLE.contains(&name)
    }
}

/// A ruleset or product line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSystem {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Kind of rulebook a source describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Core,
    Supplement,
    Codex,
    Campaign,
    Errata,
    Faq,
    Other,
}

impl SourceType {
    /// Get a human-readable display name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Core => "Core Rules",
            Self::Supplement => "Supplement",
            Self::Codex => "Codex",
            Self::Campaign => "Campaign",
            Self::Errata => "Errata",
            Self::Faq => "FAQ",
            Self::Other => "Other",
        }
    }
}

/// A rulebook or supplement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub name: String,

    pub system_id: String,

    #[serde(default)]
    pub authors: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(rename = "type")]
    pub source_type: SourceType,

    #[serde(default)]
    pub urls: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Source {
    /// Earliest publication year accepted.
    pub const MIN_YEAR: u16 = 1900;

    /// Latest publication year accepted.
    pub const MAX_YEAR: u16 = 2100;

    /// Read the bibliographic fields out of a document.
    pub fn from_document(doc: &Document) -> Result<Self> {
        let mut fields = doc.fields.clone();
        fields.insert(field::NAME.to_string(), Value::String(doc.name.clone()));
        Self::from_fields(fields)
    }

    fn from_fields(fields: Fields) -> Result<Self> {
        let source: Source = serde_json::from_value(Value::Object(fields))
            .map_err(|e| StoreError::InvalidDocument(e.to_string()))?;

        match source.year {
            Some(year) if !(Self::MIN_YEAR..=Self::MAX_YEAR).contains(&year) => {
                return Err(StoreError::InvalidDocument(format!(
                    "year {year} outside {}..={}",
                    Self::MIN_YEAR,
                    Self::MAX_YEAR
                )));
            }
            _ => {}
        }

        Ok(source)
    }
}

impl GameSystem {
    /// Read a game system out of a document.
    pub fn from_document(doc: &Document) -> Result<Self> {
        let mut fields = doc.fields.clone();
        fields.insert(field::NAME.to_string(), Value::String(doc.name.clone()));
        serde_json::from_value(Value::Object(fields))
            .map_err(|e| StoreError::InvalidDocument(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_source_from_document() {
        let doc = Document::new("Core Rulebook")
            .with_system("grimdark")
            .with_field("authors", vec!["A. Writer".to_string()])
            .with_field("year", 2020)
            .with_field("type", "core");

        let source = Source::from_document(&doc).unwrap();
        assert_eq!(source.name, "Core Rulebook");
        assert_eq!(source.system_id, "grimdark");
        assert_eq!(source.source_type, SourceType::Core);
        assert_eq!(source.year, Some(2020));
        assert!(source.urls.is_empty());
    }

    #[test]
    fn test_source_rejects_unknown_type() {
        let doc = Document::new("Zine")
            .with_system("grimdark")
            .with_field("type", "pamphlet");
        assert!(Source::from_document(&doc).is_err());
    }

    #[test]
    fn test_source_rejects_year_out_of_range() {
        let doc = Document::new("Far Future")
            .with_system("grimdark")
            .with_field("type", "codex")
            .with_field("year", 3000);
        assert!(matches!(
            Source::from_document(&doc),
            Err(StoreError::InvalidDocument(_))
        ));
    }

    #[test]
    fn test_collections() {
        assert!(collections::is_known("profiles"));
        assert!(!collections::is_known("users"));
        assert!(!collections::is_playable(collections::SYSTEMS));
    }
}

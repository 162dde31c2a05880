//! Persisted document shape.
//!
//! Every collection stores the same envelope: identity, audit fields, a
//! display name, an optional reference map, and whatever collection-specific
//! fields the entity kind carries.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, StoreError};

/// Raw document fields as stored by a backend.
pub type Fields = serde_json::Map<String, Value>;

/// Outgoing references: target entity id to the collection it lives in.
pub type ReferenceMap = BTreeMap<String, String>;

/// Placeholder id carried by entities that have not been saved yet.
pub const NEW_DOCUMENT_ID: &str = "new";

/// Author recorded when the caller does not supply one.
pub const SYSTEM_AUTHOR: &str = "system";

/// Field names of the envelope.
pub mod field {
    pub const ID: &str = "_id";
    pub const CREATED_AT: &str = "_createdAt";
    pub const UPDATED_AT: &str = "_updatedAt";
    pub const CREATED_BY: &str = "_createdBy";
    pub const UPDATED_BY: &str = "_updatedBy";
    pub const IS_UPDATED: &str = "_isUpdated";
    pub const NAME: &str = "name";
    pub const SYSTEM_ID: &str = "systemId";
    pub const REFERENCES: &str = "references";

    /// Keys owned by the typed envelope. They never belong in the
    /// collection-specific field map.
    pub const ENVELOPE: [&str; 8] = [
        ID, CREATED_AT, UPDATED_AT, CREATED_BY, UPDATED_BY, IS_UPDATED, NAME, REFERENCES,
    ];
}

/// A persisted entity.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
    /// Identity, unique within the collection.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(rename = "_createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(rename = "_updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,

    #[serde(rename = "_createdBy", default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,

    #[serde(rename = "_updatedBy", default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,

    /// Set once the document has been saved over at least once.
    #[serde(rename = "_isUpdated", default)]
    pub is_updated: bool,

    /// Human-readable name.
    #[serde(default)]
    pub name: String,

    /// Outgoing references, if the entity declares any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<ReferenceMap>,

    /// Collection-specific fields.
    #[serde(flatten)]
    pub fields: Fields,
}

impl Document {
    /// Create an unsaved document with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Some(NEW_DOCUMENT_ID.to_string()),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the document id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set a collection-specific field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Scope the document to a game system.
    pub fn with_system(self, system_id: impl Into<String>) -> Self {
        let system_id: String = system_id.into();
        self.with_field(field::SYSTEM_ID, system_id)
    }

    /// Replace the reference map.
    pub fn with_references(mut self, references: ReferenceMap) -> Self {
        self.references = Some(references);
        self
    }

    /// Whether this document still needs an id from the store.
    pub fn is_new(&self) -> bool {
        self.id.as_deref().is_none_or(|id| id.is_empty() || id == NEW_DOCUMENT_ID)
    }

    /// The id, if the document has been saved.
    pub fn saved_id(&self) -> Option<&str> {
        if self.is_new() { None } else { self.id.as_deref() }
    }

    /// The game system this document is scoped to.
    pub fn system_id(&self) -> Option<&str> {
        self.fields.get(field::SYSTEM_ID).and_then(Value::as_str)
    }

    /// Number of outgoing references (zero when the map is absent).
    pub fn reference_count(&self) -> usize {
        self.references.as_ref().map_or(0, BTreeMap::len)
    }

    /// Convert stored fields into a document.
    pub fn from_fields(fields: Fields) -> Result<Self> {
        serde_json::from_value(Value::Object(fields))
            .map_err(|e| StoreError::InvalidDocument(e.to_string()))
    }

    /// Convert the document into raw fields for a backend.
    pub fn into_fields(self) -> Result<Fields> {
        match serde_json::to_value(self)? {
            Value::Object(fields) => Ok(fields),
            other => Err(StoreError::InvalidDocument(format!(
                "document serialized to {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_new_document_uses_placeholder() {
        let doc = Document::new("Bolter");
        assert!(doc.is_new());
        assert_eq!(doc.saved_id(), None);
        assert!(Document::default().is_new());
        assert!(!doc.with_id("abc").is_new());
    }

    #[test]
    fn test_envelope_field_names() {
        let mut refs = ReferenceMap::new();
        refs.insert("s1".to_string(), "sources".to_string());
        let doc = Document::new("Sergeant")
            .with_id("p1")
            .with_system("grimdark")
            .with_references(refs);

        let fields = doc.into_fields().unwrap();
        assert_eq!(fields.get("_id"), Some(&json!("p1")));
        assert_eq!(fields.get("systemId"), Some(&json!("grimdark")));
        assert_eq!(fields.get("references"), Some(&json!({"s1": "sources"})));
        assert_eq!(fields.get("_isUpdated"), Some(&json!(false)));
        assert!(!fields.contains_key("_createdAt"));
    }

    #[test]
    fn test_from_fields_keeps_extra_fields() {
        let fields = match json!({
            "_id": "k1",
            "name": "Infantry",
            "systemId": "grimdark",
            "tags": ["core"]
        }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };

        let doc = Document::from_fields(fields).unwrap();
        assert_eq!(doc.saved_id(), Some("k1"));
        assert_eq!(doc.system_id(), Some("grimdark"));
        assert_eq!(doc.fields.get("tags"), Some(&json!(["core"])));
        assert_eq!(doc.reference_count(), 0);
    }
}

//! Entity kinds served by the API.
//!
//! Each collection is paired with a [`View`] (how documents are rendered in
//! responses) and an [`Edit`] (how request bodies become documents). The
//! registry is built once at startup; an unknown collection tag is a 404.

use std::collections::HashMap;

use serde_json::Value;
use warbook_store::document::field;
use warbook_store::{Document, Fields, GameSystem, Source, collections};

/// Input rejected by an [`Edit`] strategy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Renders a document for API output.
pub trait View: Send + Sync {
    fn view(&self, doc: &Document) -> Value;
}

/// Turns request input into a validated document.
pub trait Edit: Send + Sync {
    fn edit(&self, input: Fields) -> Result<Document, ValidationError>;
}

/// The stored envelope plus `referenceCount`.
pub struct DocumentView;

impl View for DocumentView {
    fn view(&self, doc: &Document) -> Value {
        let mut value = serde_json::to_value(doc).unwrap_or_default();
        if let Value::Object(map) = &mut value {
            map.insert("referenceCount".to_string(), doc.reference_count().into());
        }
        value
    }
}

/// [`DocumentView`] with the source type's display label.
pub struct SourceView;

impl View for SourceView {
    fn view(&self, doc: &Document) -> Value {
        let mut value = DocumentView.view(doc);
        if let (Value::Object(map), Ok(source)) = (&mut value, Source::from_document(doc)) {
            map.insert(
                "typeLabel".to_string(),
                source.source_type.display_name().into(),
            );
        }
        value
    }
}

/// Requires a name and, optionally, a system id.
pub struct BasicEdit {
    require_system: bool,
}

impl BasicEdit {
    /// For entities scoped to a game system.
    pub fn playable() -> Self {
        Self {
            require_system: true,
        }
    }

    /// For entities without a system.
    pub fn unscoped() -> Self {
        Self {
            require_system: false,
        }
    }
}

impl Edit for BasicEdit {
    fn edit(&self, input: Fields) -> Result<Document, ValidationError> {
        let doc = Document::from_fields(input)
            .map_err(|e| ValidationError::new("document", e.to_string()))?;

        if doc.name.trim().is_empty() {
            return Err(ValidationError::new(field::NAME, "is required"));
        }
        if self.require_system && doc.system_id().is_none_or(|id| id.trim().is_empty()) {
            return Err(ValidationError::new(field::SYSTEM_ID, "is required"));
        }
        Ok(doc)
    }
}

/// Sources must also parse as [`Source`].
pub struct SourceEdit;

impl Edit for SourceEdit {
    fn edit(&self, input: Fields) -> Result<Document, ValidationError> {
        let doc = BasicEdit::playable().edit(input)?;
        Source::from_document(&doc).map_err(|e| ValidationError::new("source", e.to_string()))?;
        Ok(doc)
    }
}

/// Game systems must parse as [`GameSystem`].
pub struct SystemEdit;

impl Edit for SystemEdit {
    fn edit(&self, input: Fields) -> Result<Document, ValidationError> {
        let doc = BasicEdit::unscoped().edit(input)?;
        GameSystem::from_document(&doc)
            .map_err(|e| ValidationError::new("system", e.to_string()))?;
        Ok(doc)
    }
}

/// View and edit strategies for one collection.
pub struct EntityKind {
    view: Box<dyn View>,
    edit: Box<dyn Edit>,
}

impl EntityKind {
    pub fn new(view: impl View + 'static, edit: impl Edit + 'static) -> Self {
        Self {
            view: Box::new(view),
            edit: Box::new(edit),
        }
    }

    pub fn view(&self, doc: &Document) -> Value {
        self.view.view(doc)
    }

    pub fn edit(&self, input: Fields) -> Result<Document, ValidationError> {
        self.edit.edit(input)
    }
}

/// Collection tag to [`EntityKind`].
#[derive(Default)]
pub struct Registry {
    kinds: HashMap<String, EntityKind>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every known collection with its standard strategies.
    pub fn standard() -> Self {
        let mut registry = Self::new()
            .register(collections::SYSTEMS, EntityKind::new(DocumentView, SystemEdit))
            .register(collections::SOURCES, EntityKind::new(SourceView, SourceEdit));
        for collection in collections::PLAYABLE {
            if registry.get(collection).is_none() {
                registry = registry.register(
                    collection,
                    EntityKind::new(DocumentView, BasicEdit::playable()),
                );
            }
        }
        registry
    }

    pub fn register(mut self, collection: impl Into<String>, kind: EntityKind) -> Self {
        self.kinds.insert(collection.into(), kind);
        self
    }

    pub fn get(&self, collection: &str) -> Option<&EntityKind> {
        self.kinds.get(collection)
    }

    /// Registered collection tags, sorted.
    pub fn collections(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.kinds.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

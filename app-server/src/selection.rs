//! Row selection for list views.
//!
//! Selection is held apart from the rows: documents are never mutated to
//! record that they are selected. [`Selection::mark`] projects the current
//! selection onto rendered rows.

use serde::Serialize;
use serde_json::Value;
use warbook_store::Document;

/// Changes to the selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionAction {
    Select(String),
    Toggle(String),
    Clear,
}

/// At most one selected row id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    selected: Option<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an action and return the next selection.
    pub fn reduce(self, action: SelectionAction) -> Self {
        let selected = match action {
            SelectionAction::Select(id) => Some(id),
            SelectionAction::Toggle(id) if self.selected.as_deref() == Some(id.as_str()) => None,
            SelectionAction::Toggle(id) => Some(id),
            SelectionAction::Clear => None,
        };
        Self { selected }
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.as_deref() == Some(id)
    }

    /// Render `rows` with `view`, flagging the selected one.
    pub fn mark(&self, rows: &[Document], view: impl Fn(&Document) -> Value) -> Vec<Row> {
        rows.iter()
            .map(|doc| Row {
                selected: doc.saved_id().is_some_and(|id| self.is_selected(id)),
                item: view(doc),
            })
            .collect()
    }
}

/// A rendered row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    pub selected: bool,
    pub item: Value,
}

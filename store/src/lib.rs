//! # Warbook Store
//!
//! Document storage for tabletop rule data. It provides:
//!
//! - **Documents**: the shared envelope (id, audit fields, name, references)
//! - **Queries**: ANDed equality/array-containment filters and a single sort
//! - **Backends**: an in-memory store and a JSON-file store behind one trait
//! - **Adapter**: audit stamping, id assignment and the stream-reset retry
//! - **Collection state**: the boundary where errors become UI state
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Warbook Store                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  CollectionState ──► EntityStore ──► DocumentStore              │
//! │                          │              │        │              │
//! │                          ▼              ▼        ▼              │
//! │                       Document     MemoryStore  FileStore       │
//! │                                                                 │
//! │  delete_collection ─────────────────► DocumentStore             │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod adapter;
pub mod backend;
pub mod bulk;
pub mod document;
pub mod error;
pub mod file;
pub mod memory;
pub mod model;
pub mod query;
pub mod state;

pub use adapter::EntityStore;
pub use backend::DocumentStore;
pub use bulk::{DEFAULT_BATCH_SIZE, delete_collection};
pub use document::{Document, Fields, NEW_DOCUMENT_ID, ReferenceMap, SYSTEM_AUTHOR};
pub use error::{Result, StorageError, StoreError};
pub use file::FileStore;
pub use memory::MemoryStore;
pub use model::{GameSystem, Source, SourceType, collections};
pub use query::{Filter, FilterOp, Query, Sort, SortDirection};
pub use state::{CollectionState, Notice, NoticeLevel};

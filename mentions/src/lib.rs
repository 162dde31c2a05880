//! # Reference and Mention Tracking
//!
//! Entities point at each other through a reference map,
//! `{target_id: target_collection}`. This crate provides:
//!
//! - **Policy**: which collections may reference which, validated up front
//! - **Scanner**: finds incoming references (mentions) by querying every
//!   collection allowed to mention an entity
//! - **Counter**: outgoing/incoming counts with a cached fallback for
//!   transiently empty recounts
//! - **Editor**: commits a new reference map through the store
//!
//! Consistency between reference maps and mentions is best effort; nothing
//! here is transactional.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                   Reference Tracking                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  MentionPolicy ──► MentionScanner ──► Mentions ──► Counter      │
//! │       │                  │                                      │
//! │       ▼                  ▼                                      │
//! │  ReferenceEditor ──► EntityStore                                │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod counter;
pub mod editor;
pub mod error;
pub mod policy;
pub mod scanner;

pub use counter::{CounterConfig, MentionCountCache, ReferenceCounter, ReferenceCounts};
pub use editor::{ReferenceEditor, references, with_reference, without_reference};
pub use error::{MentionError, Result};
pub use policy::{MentionPolicy, PolicyConfig};
pub use scanner::{MentionScanner, Mentions, mention_query};

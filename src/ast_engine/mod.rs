//! Analysis core: turns a front-end cursor stream into a validated model.
//!
//! This module provides:
//! - Type spelling normalization
//! - Cursor adaptation and scope tracking
//! - Entity construction and declaration merging
//! - Diagnostic aggregation and final model assembly

pub mod assembler;
pub mod cursor_stream;
pub mod diagnostics;
pub mod entity_extractor;
pub mod merger;
pub mod scope_tree;
pub mod type_normalizer;

pub use assembler::{AssembledModel, ModelAssembler};
pub use cursor_stream::{AdapterError, CursorNode, CursorStream};
pub use diagnostics::DiagnosticAggregator;
pub use entity_extractor::{signature_hash, EntityBuilder};
pub use merger::{DeclarationMerger, EntityKey, WorkingSet};
pub use scope_tree::{ScopeKind, ScopeResolver};
pub use type_normalizer::TypeNormalizer;

//! Adapter between front-end cursors and the entity builder.
//!
//! Every cursor handed to the builder goes through [`CursorNode::adapt`],
//! which reads the attributes the builder needs once and turns the
//! front-end's invalid-cursor sentinel into an [`AdapterError`].

use thiserror::Error;

use crate::frontend::{Cursor, CursorFlags, CursorKind, IncludeTarget, RawType};
use crate::types::{AccessSpecifier, SourceLocation};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum AdapterError {
    #[error("invalid cursor `{raw_kind}` at {location}, subtree skipped")]
    InvalidCursor {
        raw_kind: String,
        location: SourceLocation,
    },
}

impl AdapterError {
    pub fn location(&self) -> &SourceLocation {
        match self {
            Self::InvalidCursor { location, .. } => location,
        }
    }
}

/// A validated cursor with its kind resolved.
#[derive(Debug, Clone)]
pub struct CursorNode<C> {
    cursor: C,
    /// Every kind the front-end reported, most specific first.
    pub kinds: Vec<CursorKind>,
    /// The single kind chosen by the tie-break.
    pub kind: CursorKind,
    pub spelling: String,
    pub location: SourceLocation,
    pub flags: CursorFlags,
}

impl<C: Cursor> CursorNode<C> {
    pub fn adapt(cursor: C) -> Result<Self, AdapterError> {
        if !cursor.is_valid() {
            return Err(AdapterError::InvalidCursor {
                raw_kind: cursor.raw_kind(),
                location: cursor.location(),
            });
        }
        let kinds = cursor.kinds();
        let kind = CursorKind::resolve(&kinds)
            .cloned()
            .unwrap_or_else(|| CursorKind::Unexposed(cursor.raw_kind()));
        Ok(Self {
            kinds,
            kind,
            spelling: cursor.spelling(),
            location: cursor.location(),
            flags: cursor.flags(),
            cursor,
        })
    }

    /// Whether any reported kind matches, not only the resolved one.
    pub fn has_kind(&self, kind: &CursorKind) -> bool {
        self.kinds.contains(kind)
    }

    pub fn raw_kind(&self) -> String {
        self.cursor.raw_kind()
    }

    pub fn ty(&self) -> Option<RawType> {
        self.cursor.ty()
    }

    pub fn result_type(&self) -> Option<RawType> {
        self.cursor.result_type()
    }

    pub fn access(&self) -> Option<AccessSpecifier> {
        self.cursor.access()
    }

    pub fn initializer(&self) -> Option<String> {
        self.cursor.initializer()
    }

    pub fn template_arguments(&self) -> Vec<String> {
        self.cursor.template_arguments()
    }

    pub fn include(&self) -> Option<IncludeTarget> {
        self.cursor.include()
    }

    pub fn children(&self) -> CursorStream<C::Children> {
        CursorStream {
            inner: self.cursor.children(),
        }
    }
}

/// Lazy, forward-only sequence of adapted children.
pub struct CursorStream<I> {
    inner: I,
}

impl<I> Iterator for CursorStream<I>
where
    I: Iterator,
    I::Item: Cursor,
{
    type Item = Result<CursorNode<I::Item>, AdapterError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(CursorNode::adapt)
    }
}

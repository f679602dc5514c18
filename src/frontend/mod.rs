//! Boundary to the C++ parsing front-end.
//!
//! The analysis core only sees the traits declared here. A front-end
//! parses one file into a [`TranslationUnit`] whose root [`Cursor`]
//! exposes libclang-style node attributes and a lazy child sequence.

pub mod cpp_cursor;
pub mod parser;
pub mod syntax;

pub use cpp_cursor::{CppChildren, CppCursor};
pub use parser::{TreeSitterFrontEnd, TreeSitterUnit};

use crate::error::AnalyzerError;
use crate::types::{AccessSpecifier, ReferenceKind, SourceLocation};

/// Node kinds a front-end can report for a cursor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CursorKind {
    TranslationUnit,
    Namespace,
    ClassDecl,
    StructDecl,
    UnionDecl,
    ClassTemplate,
    ClassTemplatePartialSpecialization,
    ClassTemplateSpecialization,
    FunctionDecl,
    CxxMethod,
    Constructor,
    Destructor,
    ConversionFunction,
    FunctionTemplate,
    FunctionTemplateSpecialization,
    FieldDecl,
    VarDecl,
    ParmDecl,
    TemplateTypeParameter,
    NonTypeTemplateParameter,
    TemplateTemplateParameter,
    CxxBaseSpecifier,
    CxxAccessSpecifier,
    EnumDecl,
    EnumConstantDecl,
    InclusionDirective,
    TypedefDecl,
    TypeAliasDecl,
    UsingDirective,
    UsingDeclaration,
    NamespaceAlias,
    FriendDecl,
    StaticAssert,
    LinkageSpec,
    PreprocessingBlock,
    /// A construct the front-end does not classify, with its raw kind name.
    Unexposed(String),
}

impl CursorKind {
    /// Rank used when a cursor satisfies several kinds.
    /// Specialization beats template primary, which beats a plain declaration.
    pub fn tie_break_rank(&self) -> u8 {
        match self {
            Self::ClassTemplatePartialSpecialization
            | Self::ClassTemplateSpecialization
            | Self::FunctionTemplateSpecialization => 2,
            Self::ClassTemplate | Self::FunctionTemplate => 1,
            _ => 0,
        }
    }

    /// Pick the single kind a cursor is treated as. Among equal ranks the
    /// first reported kind wins.
    pub fn resolve(kinds: &[CursorKind]) -> Option<&CursorKind> {
        let mut best: Option<&CursorKind> = None;
        for kind in kinds {
            match best {
                Some(current) if current.tie_break_rank() >= kind.tie_break_rank() => {}
                _ => best = Some(kind),
            }
        }
        best
    }

    /// Display name used in diagnostics.
    pub fn name(&self) -> String {
        match self {
            Self::Unexposed(raw) => format!("unexposed `{}`", raw),
            other => format!("{:?}", other),
        }
    }
}

/// Type information attached to a cursor, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawType {
    pub spelling: String,
    pub is_const: bool,
    pub is_volatile: bool,
    pub pointer_depth: u32,
    pub reference: ReferenceKind,
}

impl RawType {
    pub fn new(spelling: impl Into<String>) -> Self {
        Self {
            spelling: spelling.into(),
            ..Default::default()
        }
    }
}

/// Bit predicates reported by the front-end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CursorFlags {
    pub is_definition: bool,
    pub is_virtual: bool,
    pub is_pure_virtual: bool,
    pub is_static: bool,
    pub is_const_method: bool,
    pub is_volatile: bool,
    pub is_constexpr: bool,
    pub is_extern: bool,
    pub is_mutable: bool,
    pub is_inline: bool,
    pub is_explicit: bool,
    pub is_deleted: bool,
    pub is_defaulted: bool,
    pub is_override: bool,
    pub is_final: bool,
    pub is_noexcept: bool,
    pub is_variadic: bool,
    pub is_pack: bool,
    pub is_scoped_enum: bool,
    pub is_virtual_base: bool,
    /// The node sits in code the preprocessor never compiles.
    pub is_unreachable: bool,
}

/// Target of an inclusion directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeTarget {
    pub spelling: String,
    pub is_system: bool,
    pub resolved_path: Option<String>,
}

/// Severities as a front-end reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontEndSeverity {
    Ignored,
    Note,
    Warning,
    Error,
    Fatal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrontEndDiagnostic {
    pub severity: FrontEndSeverity,
    pub message: String,
    pub location: Option<SourceLocation>,
}

/// An opaque node handle.
pub trait Cursor: Sized {
    type Children: Iterator<Item = Self>;

    /// False for the front-end's invalid-cursor sentinel.
    fn is_valid(&self) -> bool;
    /// The front-end's own name for the node kind.
    fn raw_kind(&self) -> String;
    /// Every kind the node satisfies, most specific first.
    fn kinds(&self) -> Vec<CursorKind>;
    fn spelling(&self) -> String;
    fn location(&self) -> SourceLocation;
    fn ty(&self) -> Option<RawType>;
    fn result_type(&self) -> Option<RawType>;
    fn flags(&self) -> CursorFlags;
    /// Access written on the node itself (base specifiers and access labels).
    fn access(&self) -> Option<AccessSpecifier>;
    /// Initializer or default value source text.
    fn initializer(&self) -> Option<String>;
    /// Explicit template arguments of a specialization.
    fn template_arguments(&self) -> Vec<String>;
    fn include(&self) -> Option<IncludeTarget>;
    /// Lazy, forward-only sequence of child cursors.
    fn children(&self) -> Self::Children;
}

/// A parsed file.
pub trait TranslationUnit {
    type Cursor<'u>: Cursor
    where
        Self: 'u;

    fn root(&self) -> Self::Cursor<'_>;
    fn diagnostics(&self) -> &[FrontEndDiagnostic];
}

/// A C++ parsing front-end.
pub trait FrontEnd: Send + Sync {
    type Unit: TranslationUnit;

    fn version(&self) -> String;

    /// Parse one file. An `Err` means no translation unit could be produced.
    fn parse(&self, path: &str, source: &str, args: &[String]) -> Result<Self::Unit, AnalyzerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_prefers_specialization() {
        let kinds = vec![
            CursorKind::ClassDecl,
            CursorKind::ClassTemplate,
            CursorKind::ClassTemplatePartialSpecialization,
        ];
        assert_eq!(
            CursorKind::resolve(&kinds),
            Some(&CursorKind::ClassTemplatePartialSpecialization)
        );
    }

    #[test]
    fn test_resolve_prefers_template_over_plain() {
        let kinds = vec![CursorKind::Constructor, CursorKind::FunctionTemplate];
        assert_eq!(CursorKind::resolve(&kinds), Some(&CursorKind::FunctionTemplate));
    }

    #[test]
    fn test_resolve_keeps_first_among_equals() {
        let kinds = vec![CursorKind::StructDecl, CursorKind::ClassDecl];
        assert_eq!(CursorKind::resolve(&kinds), Some(&CursorKind::StructDecl));
        assert_eq!(CursorKind::resolve(&[]), None);
    }
}

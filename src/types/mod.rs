//! Core types of the code model.

mod config;
mod descriptor;
mod diagnostic;
mod entity;
mod location;
mod result;

pub use config::AnalyzerConfig;
pub use descriptor::{ReferenceKind, TypeDescriptor};
pub use diagnostic::{Diagnostic, DiagnosticCategory, Severity};
pub use entity::{
    AccessSpecifier, BaseSpecifier, Class, ClassKind, EntityKind, EntityRef, Enum, Enumerator,
    Function, FunctionFlags, Namespace, Parameter, SpecializationKind, TemplateParameter,
    TemplateParameterKind, Variable,
};
pub use location::SourceLocation;
pub use result::{
    AnalysisMetadata, AnalysisResult, AnalysisStatistics, AnalysisStatus, FileSignature,
    IncludeEdge,
};

//! C++ Code Model Library
//!
//! Turns C++ source files into a validated, serializable model of their
//! declarations: classes, functions, variables, enums, namespaces and
//! include directives, with diagnostics for everything that could not be
//! modeled.

pub mod analyzer;
pub mod ast_engine;
pub mod batch;
pub mod error;
pub mod frontend;
pub mod processing;
pub mod types;

pub use analyzer::CppAnalyzer;
pub use batch::{CancellationFlag, IncludeGraph, ProjectAnalysis, ProjectAnalyzer, ProjectStatistics};
pub use error::AnalyzerError;
pub use frontend::{FrontEnd, TreeSitterFrontEnd};
pub use types::{AnalysisResult, AnalysisStatus, AnalyzerConfig, Diagnostic, Severity};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::analyzer::CppAnalyzer;
    pub use crate::batch::*;
    pub use crate::error::AnalyzerError;
    pub use crate::frontend::{FrontEnd, TreeSitterFrontEnd};
    pub use crate::types::*;
}

/// Default language standard passed as `-std=`
pub const DEFAULT_CPP_STANDARD: &str = "c++17";

/// Default front-end error limit before a fatal is raised
pub const DEFAULT_ERROR_LIMIT: usize = 20;

/// Default number of files analyzed at once
pub const DEFAULT_MAX_CONCURRENT_FILES: usize = 4;

/// Separator between the segments of a qualified name
pub const SCOPE_SEPARATOR: &str = "::";

//! The exported analysis result.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::diagnostic::{Diagnostic, Severity};
use super::entity::{Class, Enum, Function, Namespace, Variable};
use super::location::SourceLocation;
use crate::error::AnalyzerError;

/// An `#include` directive found in the analyzed file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IncludeEdge {
    pub including_file: String,
    /// Header name as spelled, without quotes or angle brackets.
    pub included: String,
    pub resolved_path: Option<String>,
    pub is_system: bool,
    pub is_found: bool,
    pub location: SourceLocation,
}

/// Identity of a file's content, handed to callers for cache decisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSignature {
    pub path: String,
    /// Hex SHA-256 of the file content.
    pub content_hash: String,
    pub size_bytes: usize,
    pub modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    pub front_end_version: String,
    /// Arguments handed to the front-end, passed through unexamined.
    pub compiler_args: Vec<String>,
    #[serde(default)]
    pub analysis_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub file_signature: Option<FileSignature>,
}

/// How completely a file was analyzed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    FullyAnalyzed,
    PartiallyAnalyzed,
    NotAnalyzed,
}

/// Entity and diagnostic counts for one result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisStatistics {
    pub classes: usize,
    pub methods: usize,
    pub fields: usize,
    pub functions: usize,
    pub variables: usize,
    pub enums: usize,
    pub namespaces: usize,
    pub includes: usize,
    pub abstract_classes: usize,
    pub template_classes: usize,
    pub diagnostics: BTreeMap<Severity, usize>,
}

impl AnalysisStatistics {
    /// Add the counts of `other` to these.
    pub fn absorb(&mut self, other: &AnalysisStatistics) {
        self.classes += other.classes;
        self.methods += other.methods;
        self.fields += other.fields;
        self.functions += other.functions;
        self.variables += other.variables;
        self.enums += other.enums;
        self.namespaces += other.namespaces;
        self.includes += other.includes;
        self.abstract_classes += other.abstract_classes;
        self.template_classes += other.template_classes;
        for (severity, count) in &other.diagnostics {
            *self.diagnostics.entry(*severity).or_insert(0) += count;
        }
    }

    pub fn diagnostics_at(&self, severity: Severity) -> usize {
        self.diagnostics.get(&severity).copied().unwrap_or(0)
    }
}

/// Model extracted from one source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub file_path: String,
    pub classes: Vec<Class>,
    pub functions: Vec<Function>,
    pub variables: Vec<Variable>,
    #[serde(default)]
    pub enums: Vec<Enum>,
    pub namespaces: Vec<Namespace>,
    pub includes: Vec<IncludeEdge>,
    pub diagnostics: Vec<Diagnostic>,
    /// Set when a fatal diagnostic stopped traversal early.
    #[serde(default)]
    pub incomplete: bool,
    pub metadata: AnalysisMetadata,
}

impl AnalysisResult {
    pub fn has_fatal(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_fatal)
    }

    /// Whether any diagnostic is an error or worse.
    pub fn has_errors(&self) -> bool {
        self.max_severity().map_or(false, |s| s >= Severity::Error)
    }

    pub fn max_severity(&self) -> Option<Severity> {
        self.diagnostics.iter().map(|d| d.severity).max()
    }

    pub fn entity_count(&self) -> usize {
        self.classes.len() + self.functions.len() + self.variables.len() + self.enums.len()
    }

    pub fn status(&self) -> AnalysisStatus {
        match self.max_severity() {
            None | Some(Severity::Note) | Some(Severity::Warning) => AnalysisStatus::FullyAnalyzed,
            Some(Severity::Error) => AnalysisStatus::PartiallyAnalyzed,
            Some(Severity::Fatal) if self.entity_count() == 0 => AnalysisStatus::NotAnalyzed,
            Some(Severity::Fatal) => AnalysisStatus::PartiallyAnalyzed,
        }
    }

    pub fn class(&self, qualified_name: &str) -> Option<&Class> {
        self.classes.iter().find(|c| c.qualified_name == qualified_name)
    }

    /// All free functions with the given qualified name (overloads included).
    pub fn functions_named(&self, qualified_name: &str) -> Vec<&Function> {
        self.functions
            .iter()
            .filter(|f| f.qualified_name == qualified_name)
            .collect()
    }

    pub fn namespace(&self, qualified_name: &str) -> Option<&Namespace> {
        self.namespaces.iter().find(|n| n.qualified_name == qualified_name)
    }

    pub fn statistics(&self) -> AnalysisStatistics {
        let mut diagnostics = BTreeMap::new();
        for diag in &self.diagnostics {
            *diagnostics.entry(diag.severity).or_insert(0) += 1;
        }
        AnalysisStatistics {
            classes: self.classes.len(),
            methods: self.classes.iter().map(|c| c.methods.len()).sum(),
            fields: self.classes.iter().map(|c| c.fields.len()).sum(),
            functions: self.functions.len(),
            variables: self.variables.len(),
            enums: self.enums.len(),
            namespaces: self.namespaces.iter().filter(|n| !n.is_global()).count(),
            includes: self.includes.len(),
            abstract_classes: self.classes.iter().filter(|c| c.is_abstract).count(),
            template_classes: self.classes.iter().filter(|c| c.is_template).count(),
            diagnostics,
        }
    }

    pub fn to_json(&self) -> Result<String, AnalyzerError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, AnalyzerError> {
        Ok(serde_json::from_str(json)?)
    }
}

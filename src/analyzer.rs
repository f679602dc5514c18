//! Single-file analysis pipeline.
//!
//! Loads a source file, hands it to the front-end and runs the analysis
//! core over the resulting translation unit. Every failure after the file
//! has been found and read is folded into the result's diagnostics.

use std::path::Path;

use chrono::Utc;
use tracing::{info, warn};

use crate::ast_engine::{DeclarationMerger, DiagnosticAggregator, EntityBuilder, ModelAssembler};
use crate::error::AnalyzerError;
use crate::frontend::{FrontEnd, TranslationUnit};
use crate::processing::FileProcessor;
use crate::types::{AnalysisMetadata, AnalysisResult, AnalyzerConfig, SourceLocation};

/// Analyzes C++ files with a given front-end.
#[derive(Debug)]
pub struct CppAnalyzer<F> {
    front_end: F,
    config: AnalyzerConfig,
    processor: FileProcessor,
}

impl<F: FrontEnd> CppAnalyzer<F> {
    pub fn new(front_end: F, config: AnalyzerConfig) -> Self {
        Self {
            front_end,
            config,
            processor: FileProcessor::new(),
        }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Analyze a file on disk.
    ///
    /// `args` are appended to the arguments derived from the configuration.
    /// Returns `Err` only when the path does not name a readable file.
    pub fn analyze_file(&self, path: impl AsRef<Path>, args: &[String]) -> Result<AnalysisResult, AnalyzerError> {
        let source = self.processor.load(path.as_ref())?;
        let mut compiler_args = self.config.compiler_args(Path::new(&source.path));
        compiler_args.extend(args.iter().cloned());

        let mut result = if source.is_binary {
            warn!(path = %source.path, "Binary content, skipping parse");
            self.fatal_result(&source.path, "file content is binary, not C++ source", compiler_args)
        } else {
            self.analyze_source(&source.path, &source.content, &compiler_args)
        };
        result.metadata.file_signature = Some(source.signature);
        Ok(result)
    }

    /// Analyze in-memory source as if it were the file at `path`.
    pub fn analyze_source(&self, path: &str, source: &str, args: &[String]) -> AnalysisResult {
        let mut diagnostics = DiagnosticAggregator::new(path);
        let merger = match self.front_end.parse(path, source, args) {
            Ok(unit) => {
                diagnostics.ingest_front_end(unit.diagnostics());
                EntityBuilder::new(path, &mut diagnostics).build(unit.root())
            }
            Err(e) => {
                warn!(path, error = %e, "Front-end produced no translation unit");
                diagnostics.fatal(e.to_string(), None);
                DeclarationMerger::new()
            }
        };
        self.finish(path, merger, diagnostics, args.to_vec())
    }

    /// A result holding nothing but one fatal diagnostic at the start of `path`.
    pub fn fatal_result(&self, path: &str, message: impl Into<String>, compiler_args: Vec<String>) -> AnalysisResult {
        let mut diagnostics = DiagnosticAggregator::new(path);
        diagnostics.fatal(message, Some(SourceLocation::start_of(path)));
        self.finish(path, DeclarationMerger::new(), diagnostics, compiler_args)
    }

    fn finish(
        &self,
        path: &str,
        merger: DeclarationMerger,
        mut diagnostics: DiagnosticAggregator,
        compiler_args: Vec<String>,
    ) -> AnalysisResult {
        let model = ModelAssembler::new(self.config.resolve_base_classes)
            .assemble(merger.into_working_set(), &mut diagnostics);
        let (diagnostics, incomplete) = diagnostics.finish();

        let result = AnalysisResult {
            file_path: path.to_string(),
            classes: model.classes,
            functions: model.functions,
            variables: model.variables,
            enums: model.enums,
            namespaces: model.namespaces,
            includes: model.includes,
            diagnostics,
            incomplete,
            metadata: AnalysisMetadata {
                front_end_version: self.front_end.version(),
                compiler_args,
                analysis_time: Some(Utc::now()),
                file_signature: None,
            },
        };
        info!(
            path,
            classes = result.classes.len(),
            functions = result.functions.len(),
            diagnostics = result.diagnostics.len(),
            status = ?result.status(),
            "Analyzed file"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::TreeSitterFrontEnd;
    use crate::types::{AnalysisStatus, DiagnosticCategory, Severity, TemplateParameterKind};
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn analyzer() -> CppAnalyzer<TreeSitterFrontEnd> {
        CppAnalyzer::new(TreeSitterFrontEnd::new(), AnalyzerConfig::default())
    }

    fn analyze(source: &str) -> AnalysisResult {
        analyzer().analyze_source("test.cpp", source, &[])
    }

    const CALCULATOR: &str = r#"
#include <string>

class Calculator {
public:
    virtual ~Calculator() = default;
    virtual double calculate(double a, double b) const = 0;
};

class BasicCalculator : public Calculator {
public:
    double calculate(double a, double b) const override { return a + b; }
};
"#;

    #[test]
    fn test_calculator_scenario() {
        let result = analyze(CALCULATOR);
        let calculator = result.class("Calculator").unwrap();
        let basic = result.class("BasicCalculator").unwrap();

        assert_eq!(result.classes.len(), 2);
        assert_eq!(basic.base_classes, vec!["Calculator".to_string()]);
        assert!(calculator.is_abstract);
        assert!(!basic.is_abstract);
        assert_eq!(result.status(), AnalysisStatus::FullyAnalyzed);
    }

    #[test]
    fn test_three_deep_qualified_name() {
        let result = analyze("namespace company {\nnamespace project {\nnamespace core {\nclass Engine {};\n}\n}\n}\n");
        assert!(result.class("company::project::core::Engine").is_some());
        let core = result.namespace("company::project::core").unwrap();
        assert_eq!(core.parent.as_deref(), Some("company::project"));
        let project = result.namespace("company::project").unwrap();
        assert_eq!(project.child_namespaces, vec!["company::project::core".to_string()]);
    }

    #[test]
    fn test_overloads_are_distinct() {
        let result = analyze(
            "class Printer {\npublic:\n  void print(int value);\n  void print(const std::string& value);\n};\n",
        );
        let printer = result.class("Printer").unwrap();
        assert_eq!(printer.methods.len(), 2);
        assert_eq!(printer.methods[0].qualified_name, printer.methods[1].qualified_name);
        assert_ne!(printer.methods[0].signature_hash, printer.methods[1].signature_hash);
        assert_eq!(printer.methods[1].parameters[0].ty.canonical, "const std::string&");
    }

    #[test]
    fn test_forward_declaration_merges() {
        let result = analyze("class Widget;\nvoid draw(Widget* w);\nclass Widget {\n  int id;\n};\n");
        assert_eq!(result.classes.len(), 1);
        let widget = &result.classes[0];
        assert!(widget.is_definition);
        assert_eq!(widget.fields.len(), 1);
        assert_eq!(widget.fields[0].name, "id");
    }

    #[test]
    fn test_template_parameter_type_is_kept() {
        let result = analyze("template <typename T>\nT twice(T value) { return value + value; }\n");
        let twice = &result.functions_named("twice")[0];
        assert_eq!(twice.template_parameters.len(), 1);
        assert_eq!(twice.template_parameters[0].kind, TemplateParameterKind::Type);
        assert_eq!(twice.parameters[0].ty.canonical, twice.template_parameters[0].name);
        assert_eq!(twice.parameters[0].ty.canonical, "T");
    }

    #[test]
    fn test_reopened_namespace_accumulates() {
        let result = analyze("namespace a { int x; }\nnamespace a { int y; }\n");
        let reopened: Vec<_> = result.namespaces.iter().filter(|n| n.qualified_name == "a").collect();
        assert_eq!(reopened.len(), 1);
        let listed: Vec<_> = reopened[0].entities.iter().map(|e| e.qualified_name.as_str()).collect();
        assert_eq!(listed, vec!["a::x", "a::y"]);
    }

    #[test]
    fn test_anonymous_namespace_is_named_by_position() {
        let result = analyze("namespace {\nint hidden;\n}\n");
        let anonymous = result.namespace("<anonymous@1:1>").unwrap();
        assert!(anonymous.is_anonymous);
        assert_eq!(result.variables[0].qualified_name, "<anonymous@1:1>::hidden");
        assert_eq!(anonymous.entities.len(), 1);
    }

    #[test]
    fn test_redundant_qualification_merges_declaration_and_definition() {
        let result = analyze(
            "namespace geo {\nstruct Point {\n  bool eq(const geo::Point& o) const;\n};\n\
             bool Point::eq(const Point& o) const { return true; }\n}\n",
        );
        let point = result.class("geo::Point").unwrap();
        assert_eq!(point.methods.len(), 1);
        let eq = &point.methods[0];
        assert!(eq.flags.is_definition);
        assert_eq!(eq.parameters[0].ty.canonical, "const Point&");
        assert_eq!(eq.signature, "eq(const Point&) const");
    }

    #[test]
    fn test_override_in_other_namespace_is_concrete() {
        let result = analyze(
            "namespace ns {\nstruct Value {};\nstruct Base {\n  virtual ~Base() = default;\n  virtual void f(const Value& v) = 0;\n};\n}\n\
             namespace other {\nstruct Derived : public ns::Base {\n  void f(const ns::Value& v) override;\n};\n}\n",
        );
        assert!(result.class("ns::Base").unwrap().is_abstract);
        assert!(!result.class("other::Derived").unwrap().is_abstract);
    }

    #[test]
    fn test_variable_constness_is_top_level() {
        let result = analyze(
            "const char* name = \"x\";\nchar* const cursor = nullptr;\nconst int limit = 1;\nconstexpr double pi = 3.14;\n",
        );
        let constness: Vec<_> = result.variables.iter().map(|v| (v.name.as_str(), v.is_const)).collect();
        assert_eq!(
            constness,
            vec![("name", false), ("cursor", true), ("limit", true), ("pi", true)]
        );
    }

    #[test]
    fn test_anonymous_record_type_links_to_its_class() {
        let result = analyze("struct { int q; } point;\n");
        assert_eq!(result.classes.len(), 1);
        let record = &result.classes[0];
        assert_eq!(record.name, "<anonymous@1:1>");
        assert_eq!(record.fields.len(), 1);
        let point = &result.variables[0];
        assert_eq!(point.name, "point");
        assert_eq!(point.ty.canonical, record.qualified_name);
    }

    #[test]
    fn test_malformed_input_still_returns_result() {
        let result = analyze("class Broken {\npublic:\n  int value;\n");
        assert!(!result.diagnostics.is_empty());
        assert!(result
            .diagnostics
            .iter()
            .any(|d| d.severity >= Severity::Error));
    }

    #[test]
    fn test_round_trip() {
        let result = analyze(CALCULATOR);
        let json = result.to_json().unwrap();
        let back = AnalysisResult::from_json(&json).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn test_idempotent_apart_from_timestamp() {
        let mut first = analyze(CALCULATOR);
        let mut second = analyze(CALCULATOR);
        first.metadata.analysis_time = None;
        second.metadata.analysis_time = None;
        assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
    }

    #[test]
    fn test_analyze_file_records_signature_and_args() {
        let mut file = tempfile::Builder::new().suffix(".hpp").tempfile().unwrap();
        file.write_all(b"#pragma once\nstruct Point { int x; int y; };\n").unwrap();

        let result = analyzer()
            .analyze_file(file.path(), &["-DEXTRA".to_string()])
            .unwrap();
        assert!(result.class("Point").is_some());
        assert!(result.metadata.file_signature.is_some());
        let args = &result.metadata.compiler_args;
        assert_eq!(args.last().map(String::as_str), Some("-DEXTRA"));
        assert!(args.windows(2).any(|w| w[0] == "-x" && w[1] == "c++-header"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = analyzer().analyze_file(dir.path().join("nope.cpp"), &[]).unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_binary_file_is_fatal() {
        let mut file = tempfile::Builder::new().suffix(".cpp").tempfile().unwrap();
        file.write_all(b"\x7fELF\x02\x01\x01\x00\x00\x00").unwrap();

        let result = analyzer().analyze_file(file.path(), &[]).unwrap();
        assert!(result.has_fatal());
        assert!(result.incomplete);
        assert_eq!(result.diagnostics[0].category, DiagnosticCategory::FatalParseFailure);
        assert_eq!(result.status(), AnalysisStatus::NotAnalyzed);
    }
}

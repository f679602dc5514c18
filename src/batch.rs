//! Project-level analysis over many files.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::analyzer::CppAnalyzer;
use crate::error::AnalyzerError;
use crate::frontend::FrontEnd;
use crate::types::{AnalysisResult, AnalysisStatistics};

/// Cooperative cancellation shared between a caller and a running project analysis.
///
/// Checked before each file starts; a file already being parsed runs to completion.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A path that produced no result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFailure {
    pub path: String,
    pub error: String,
}

/// Include relationships across every analyzed file.
///
/// Targets are resolved paths where the header was found and the spelled
/// name otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncludeGraph {
    edges: BTreeSet<(String, String)>,
}

impl IncludeGraph {
    pub fn from_results<'a>(results: impl IntoIterator<Item = &'a AnalysisResult>) -> Self {
        let mut graph = Self::default();
        for result in results {
            for include in &result.includes {
                let target = include
                    .resolved_path
                    .clone()
                    .unwrap_or_else(|| include.included.clone());
                graph.edges.insert((include.including_file.clone(), target));
            }
        }
        graph
    }

    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.edges.iter().map(|(from, to)| (from.as_str(), to.as_str()))
    }

    /// Headers directly included by `file`.
    pub fn dependencies_of(&self, file: &str) -> Vec<&str> {
        self.edges()
            .filter(|(from, _)| *from == file)
            .map(|(_, to)| to)
            .collect()
    }

    /// Files that directly include `header`.
    pub fn dependents_of(&self, header: &str) -> Vec<&str> {
        self.edges()
            .filter(|(_, to)| *to == header)
            .map(|(from, _)| from)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// Totals across every result of a project analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectStatistics {
    /// Files that produced a result.
    pub files: usize,
    /// Results carrying an error or fatal diagnostic.
    pub files_with_errors: usize,
    pub failed_files: usize,
    pub skipped_files: usize,
    #[serde(flatten)]
    pub totals: AnalysisStatistics,
}

/// Outcome of analyzing a set of files.
#[derive(Debug, Clone, Default)]
pub struct ProjectAnalysis {
    /// One result per analyzed path, in input order.
    pub results: Vec<AnalysisResult>,
    pub failures: Vec<FileFailure>,
    /// Paths never started because the analysis was cancelled.
    pub skipped: Vec<String>,
    pub include_graph: IncludeGraph,
    pub cancelled: bool,
}

impl ProjectAnalysis {
    pub fn has_fatal(&self) -> bool {
        self.results.iter().any(AnalysisResult::has_fatal)
    }

    pub fn statistics(&self) -> ProjectStatistics {
        let mut stats = ProjectStatistics {
            files: self.results.len(),
            files_with_errors: self.results.iter().filter(|r| r.has_errors()).count(),
            failed_files: self.failures.len(),
            skipped_files: self.skipped.len(),
            totals: AnalysisStatistics::default(),
        };
        for result in &self.results {
            stats.totals.absorb(&result.statistics());
        }
        stats
    }

    /// Process exit code: non-zero when any path failed or any result is fatal.
    pub fn exit_code(&self) -> i32 {
        if self.failures.is_empty() && !self.has_fatal() {
            0
        } else {
            1
        }
    }
}

enum FileOutcome {
    Analyzed(AnalysisResult),
    Failed(FileFailure),
    Skipped(String),
}

/// Runs a [`CppAnalyzer`] over many files on the blocking thread pool.
pub struct ProjectAnalyzer<F> {
    analyzer: Arc<CppAnalyzer<F>>,
    cancellation: CancellationFlag,
}

impl<F: FrontEnd + 'static> ProjectAnalyzer<F> {
    pub fn new(analyzer: CppAnalyzer<F>) -> Self {
        Self {
            analyzer: Arc::new(analyzer),
            cancellation: CancellationFlag::new(),
        }
    }

    pub fn analyzer(&self) -> &CppAnalyzer<F> {
        &self.analyzer
    }

    /// A handle that cancels the files of this analyzer not yet started.
    pub fn cancellation_flag(&self) -> CancellationFlag {
        self.cancellation.clone()
    }

    pub async fn analyze_project<P: AsRef<Path>>(&self, paths: &[P], args: &[String]) -> ProjectAnalysis {
        let concurrency = self.analyzer.config().max_concurrent_files.max(1);
        info!(files = paths.len(), concurrency, "Starting project analysis");

        let outcomes: Vec<FileOutcome> = stream::iter(paths.iter().map(|p| p.as_ref().to_path_buf()))
            .map(|path| self.analyze_one(path, args.to_vec()))
            .buffered(concurrency)
            .collect()
            .await;

        let mut analysis = ProjectAnalysis::default();
        for outcome in outcomes {
            match outcome {
                FileOutcome::Analyzed(result) => analysis.results.push(result),
                FileOutcome::Failed(failure) => analysis.failures.push(failure),
                FileOutcome::Skipped(path) => analysis.skipped.push(path),
            }
        }
        analysis.cancelled = !analysis.skipped.is_empty();
        analysis.include_graph = IncludeGraph::from_results(&analysis.results);

        let stats = analysis.statistics();
        info!(
            analyzed = stats.files,
            with_errors = stats.files_with_errors,
            failed = stats.failed_files,
            skipped = stats.skipped_files,
            classes = stats.totals.classes,
            functions = stats.totals.functions,
            include_edges = analysis.include_graph.len(),
            "Project analysis complete"
        );
        analysis
    }

    async fn analyze_one(&self, path: PathBuf, args: Vec<String>) -> FileOutcome {
        let shown = path.display().to_string();
        if self.cancellation.is_cancelled() {
            debug!(path = %shown, "Cancelled, skipping file");
            return FileOutcome::Skipped(shown);
        }

        let analyzer = Arc::clone(&self.analyzer);
        let task_args = args.clone();
        let handle = tokio::task::spawn_blocking(move || analyzer.analyze_file(&path, &task_args));

        let joined = match self.analyzer.config().file_timeout() {
            Some(limit) => match tokio::time::timeout(limit, handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    let error = AnalyzerError::Timeout {
                        path: shown.clone(),
                        millis: limit.as_millis() as u64,
                    };
                    warn!(path = %shown, "File analysis timed out");
                    return FileOutcome::Analyzed(self.analyzer.fatal_result(&shown, error.to_string(), args));
                }
            },
            None => handle.await,
        };

        match joined {
            Ok(Ok(result)) => FileOutcome::Analyzed(result),
            Ok(Err(e)) if e.is_invalid_input() => {
                warn!(path = %shown, error = %e, "Skipping unreadable path");
                FileOutcome::Failed(FileFailure {
                    path: shown,
                    error: e.to_string(),
                })
            }
            Ok(Err(e)) => FileOutcome::Analyzed(self.analyzer.fatal_result(&shown, e.to_string(), args)),
            Err(e) => {
                let error = AnalyzerError::Task(e.to_string());
                warn!(path = %shown, error = %error, "Analysis task failed");
                FileOutcome::Analyzed(self.analyzer.fatal_result(&shown, error.to_string(), args))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::TreeSitterFrontEnd;
    use crate::types::{AnalyzerConfig, Severity};
    use pretty_assertions::assert_eq;

    fn project() -> ProjectAnalyzer<TreeSitterFrontEnd> {
        ProjectAnalyzer::new(CppAnalyzer::new(TreeSitterFrontEnd::new(), AnalyzerConfig::default()))
    }

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[tokio::test]
    async fn test_results_follow_input_order() {
        let dir = tempfile::tempdir().unwrap();
        let paths: Vec<PathBuf> = (0..6)
            .map(|i| write(dir.path(), &format!("f{i}.cpp"), &format!("class C{i} {{}};\n")))
            .collect();

        let analysis = project().analyze_project(&paths, &[]).await;

        assert_eq!(analysis.results.len(), 6);
        for (i, result) in analysis.results.iter().enumerate() {
            assert!(result.class(&format!("C{i}")).is_some());
        }
        assert_eq!(analysis.exit_code(), 0);
        assert!(!analysis.cancelled);
    }

    #[tokio::test]
    async fn test_missing_path_is_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let good = write(dir.path(), "good.cpp", "int answer = 42;\n");
        let missing = dir.path().join("missing.cpp");

        let analysis = project().analyze_project(&[good, missing], &[]).await;

        assert_eq!(analysis.results.len(), 1);
        assert_eq!(analysis.failures.len(), 1);
        assert!(analysis.failures[0].path.ends_with("missing.cpp"));
        assert_eq!(analysis.exit_code(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_skips_everything() {
        let dir = tempfile::tempdir().unwrap();
        let paths = vec![
            write(dir.path(), "a.cpp", "class A {};\n"),
            write(dir.path(), "b.cpp", "class B {};\n"),
        ];
        let analyzer = project();
        analyzer.cancellation_flag().cancel();

        let analysis = analyzer.analyze_project(&paths, &[]).await;

        assert!(analysis.cancelled);
        assert!(analysis.results.is_empty());
        assert_eq!(analysis.skipped.len(), 2);
    }

    #[tokio::test]
    async fn test_include_graph_collects_edges() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "shape.hpp", "struct Shape {};\n");
        let circle = write(dir.path(), "circle.cpp", "#include \"shape.hpp\"\n#include <vector>\nstruct Circle : Shape {};\n");

        let analysis = project().analyze_project(&[circle], &[]).await;
        let including = analysis.results[0].file_path.clone();
        let deps = analysis.include_graph.dependencies_of(&including);

        assert_eq!(analysis.include_graph.len(), 2);
        assert!(deps.iter().any(|d| d.ends_with("shape.hpp")));
        assert!(deps.contains(&"vector"));
        assert_eq!(analysis.include_graph.dependents_of("vector"), vec![including.as_str()]);
    }

    #[tokio::test]
    async fn test_fatal_result_sets_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let binary = dir.path().join("blob.cpp");
        std::fs::write(&binary, b"\x00\x01\x02\x03\x00\x00").unwrap();

        let analysis = project().analyze_project(&[binary], &[]).await;

        assert_eq!(analysis.results.len(), 1);
        assert!(analysis.has_fatal());
        assert_eq!(analysis.exit_code(), 1);
    }

    #[tokio::test]
    async fn test_statistics_sum_over_files() {
        let dir = tempfile::tempdir().unwrap();
        let paths = vec![
            write(dir.path(), "a.cpp", "namespace a {\nclass A { void run(); int n; };\nint total;\n}\n"),
            write(dir.path(), "b.cpp", "class B {};\nvoid go();\nvoid stop();\n"),
            write(dir.path(), "broken.cpp", "@@@ ;\n"),
            dir.path().join("missing.cpp"),
        ];

        let analysis = project().analyze_project(&paths, &[]).await;
        let stats = analysis.statistics();

        assert_eq!(stats.files, 3);
        assert_eq!(stats.failed_files, 1);
        assert_eq!(stats.skipped_files, 0);
        assert_eq!(stats.files_with_errors, 1);
        assert_eq!(stats.totals.classes, 3);
        assert_eq!(stats.totals.methods, 1);
        assert_eq!(stats.totals.functions, 2);
        assert_eq!(stats.totals.variables, 1);
        assert_eq!(stats.totals.namespaces, 1);
        assert!(stats.totals.diagnostics_at(Severity::Error) >= 1);

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["files_with_errors"], 1);
        assert_eq!(json["classes"], 3);
    }

    #[test]
    fn test_cancellation_flag_is_shared() {
        let flag = CancellationFlag::new();
        let handle = flag.clone();
        assert!(!flag.is_cancelled());
        handle.cancel();
        assert!(flag.is_cancelled());
    }
}

//! Analyzer configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AnalyzerError;
use crate::{DEFAULT_CPP_STANDARD, DEFAULT_ERROR_LIMIT, DEFAULT_MAX_CONCURRENT_FILES};

/// Extensions compiled as headers (`-x c++-header`).
const HEADER_EXTENSIONS: &[&str] = &["h", "hh", "hpp", "hxx", "h++", "inl"];

/// Global analyzer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Language standard passed as `-std=`.
    pub cpp_standard: String,

    /// Directories passed as `-I`.
    pub include_paths: Vec<String>,

    /// Macro definitions passed as `-D`.
    pub defines: Vec<String>,

    /// Extra arguments appended verbatim.
    pub extra_args: Vec<String>,

    /// Syntax errors reported before the front-end gives up (0 = unlimited).
    pub error_limit: usize,

    /// Upper bound for a single parse, in milliseconds.
    pub parse_timeout_ms: Option<u64>,

    /// Upper bound for a whole file analysis in project mode, in milliseconds.
    pub file_timeout_ms: Option<u64>,

    /// Files analyzed concurrently in project mode.
    pub max_concurrent_files: usize,

    /// Whether base class names are matched against classes in the same result.
    pub resolve_base_classes: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            cpp_standard: DEFAULT_CPP_STANDARD.to_string(),
            include_paths: Vec::new(),
            defines: Vec::new(),
            extra_args: Vec::new(),
            error_limit: DEFAULT_ERROR_LIMIT,
            parse_timeout_ms: None,
            file_timeout_ms: None,
            max_concurrent_files: DEFAULT_MAX_CONCURRENT_FILES,
            resolve_base_classes: true,
        }
    }
}

impl AnalyzerConfig {
    /// Load configuration from an optional `cpp-model` file in the working
    /// directory and `CPP_MODEL_*` environment variables, on top of defaults.
    pub fn load() -> Result<Self, AnalyzerError> {
        Self::load_from(config::File::with_name("cpp-model").required(false))
    }

    /// Load configuration from the given file source plus the environment.
    pub fn load_from<S>(file: S) -> Result<Self, AnalyzerError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let settings = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix("CPP_MODEL")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("include_paths")
                    .with_list_parse_key("defines")
                    .with_list_parse_key("extra_args"),
            )
            .build()?;
        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AnalyzerError> {
        if self.max_concurrent_files == 0 {
            return Err(AnalyzerError::InvalidConfig(
                "max_concurrent_files must be at least 1".to_string(),
            ));
        }
        if self.cpp_standard.trim().is_empty() {
            return Err(AnalyzerError::InvalidConfig("cpp_standard must not be empty".to_string()));
        }
        Ok(())
    }

    /// Front-end arguments for the given file.
    pub fn compiler_args(&self, path: &Path) -> Vec<String> {
        let mut args = vec![format!("-std={}", self.cpp_standard)];
        args.extend(self.include_paths.iter().map(|p| format!("-I{}", p)));
        args.extend(self.defines.iter().map(|d| format!("-D{}", d)));
        if self.error_limit != DEFAULT_ERROR_LIMIT {
            args.push(format!("-ferror-limit={}", self.error_limit));
        }
        args.extend(self.extra_args.iter().cloned());

        let is_header = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| HEADER_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        args.push("-x".to_string());
        args.push(if is_header { "c++-header" } else { "c++" }.to_string());
        args
    }

    pub fn parse_timeout(&self) -> Option<Duration> {
        self.parse_timeout_ms.map(Duration::from_millis)
    }

    pub fn file_timeout(&self) -> Option<Duration> {
        self.file_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.cpp_standard, "c++17");
        assert_eq!(config.max_concurrent_files, 4);
        assert!(config.resolve_base_classes);
    }

    #[test]
    fn test_compiler_args_for_source() {
        let config = AnalyzerConfig {
            include_paths: vec!["include".to_string()],
            defines: vec!["NDEBUG".to_string()],
            ..Default::default()
        };
        let args = config.compiler_args(Path::new("src/main.cpp"));
        assert_eq!(args, vec!["-std=c++17", "-Iinclude", "-DNDEBUG", "-x", "c++"]);
    }

    #[test]
    fn test_compiler_args_for_header() {
        let config = AnalyzerConfig {
            cpp_standard: "c++20".to_string(),
            error_limit: 3,
            ..Default::default()
        };
        let args = config.compiler_args(Path::new("include/shape.HPP"));
        assert_eq!(args, vec!["-std=c++20", "-ferror-limit=3", "-x", "c++-header"]);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analyzer.toml");
        std::fs::write(
            &path,
            "cpp_standard = \"c++14\"\ninclude_paths = [\"inc\", \"third_party\"]\nmax_concurrent_files = 2\n",
        )
        .unwrap();

        let config = AnalyzerConfig::load_from(config::File::from(path.as_path())).unwrap();
        assert_eq!(config.cpp_standard, "c++14");
        assert_eq!(config.include_paths, vec!["inc", "third_party"]);
        assert_eq!(config.max_concurrent_files, 2);
        assert_eq!(config.error_limit, DEFAULT_ERROR_LIMIT);
    }

    #[test]
    fn test_rejects_zero_concurrency() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analyzer.toml");
        std::fs::write(&path, "max_concurrent_files = 0\n").unwrap();

        let result = AnalyzerConfig::load_from(config::File::from(path.as_path()));
        assert!(matches!(result, Err(AnalyzerError::InvalidConfig(_))));
    }
}

//! Tree-sitter based C++ front-end.
//!
//! Parses a file with tree-sitter-cpp, reports syntax errors and include
//! resolution problems as front-end diagnostics, and hands out
//! [`CppCursor`]s over the resulting tree.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;
use tree_sitter::{Node, Parser, Tree};

use super::cpp_cursor::{CppCursor, UnitSource};
use super::syntax::{include_spelling, squash, text};
use super::{FrontEnd, FrontEndDiagnostic, FrontEndSeverity, TranslationUnit};
use crate::error::AnalyzerError;
use crate::types::SourceLocation;
use crate::DEFAULT_ERROR_LIMIT;

/// Longest source excerpt quoted in a syntax error message.
const SNIPPET_CHARS: usize = 40;

/// The compiler arguments this front-end understands. Everything else is
/// accepted and ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct FrontEndArgs {
    pub include_dirs: Vec<PathBuf>,
    pub system_dirs: Vec<PathBuf>,
    /// Syntax errors reported before giving up; 0 means no limit.
    pub error_limit: usize,
}

impl FrontEndArgs {
    pub fn parse(args: &[String]) -> Self {
        let mut parsed = Self {
            include_dirs: Vec::new(),
            system_dirs: Vec::new(),
            error_limit: DEFAULT_ERROR_LIMIT,
        };
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            if arg == "-I" {
                if let Some(dir) = iter.next() {
                    parsed.include_dirs.push(PathBuf::from(dir));
                }
            } else if arg == "-isystem" {
                if let Some(dir) = iter.next() {
                    parsed.system_dirs.push(PathBuf::from(dir));
                }
            } else if let Some(dir) = arg.strip_prefix("-isystem") {
                parsed.system_dirs.push(PathBuf::from(dir));
            } else if let Some(dir) = arg.strip_prefix("-I") {
                parsed.include_dirs.push(PathBuf::from(dir));
            } else if let Some(limit) = arg.strip_prefix("-ferror-limit=") {
                if let Ok(limit) = limit.parse() {
                    parsed.error_limit = limit;
                }
            }
        }
        parsed
    }
}

/// A file parsed by [`TreeSitterFrontEnd`].
#[derive(Debug)]
pub struct TreeSitterUnit {
    source: UnitSource,
    tree: Tree,
    diagnostics: Vec<FrontEndDiagnostic>,
}

impl TranslationUnit for TreeSitterUnit {
    type Cursor<'u> = CppCursor<'u>;

    fn root(&self) -> CppCursor<'_> {
        CppCursor::root(self.tree.root_node(), &self.source)
    }

    fn diagnostics(&self) -> &[FrontEndDiagnostic] {
        &self.diagnostics
    }
}

/// C++ front-end backed by tree-sitter-cpp.
#[derive(Debug, Clone, Default)]
pub struct TreeSitterFrontEnd {
    parse_timeout: Option<Duration>,
}

impl TreeSitterFrontEnd {
    pub fn new() -> Self {
        Self::default()
    }

    /// Abort parses that take longer than `timeout`.
    pub fn with_parse_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.parse_timeout = timeout;
        self
    }
}

impl FrontEnd for TreeSitterFrontEnd {
    type Unit = TreeSitterUnit;

    fn version(&self) -> String {
        format!("tree-sitter-cpp (language abi {})", tree_sitter_cpp::language().version())
    }

    fn parse(&self, path: &str, source: &str, args: &[String]) -> Result<TreeSitterUnit, AnalyzerError> {
        let args = FrontEndArgs::parse(args);

        // Parser is not thread-safe, so every parse gets its own.
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_cpp::language())
            .map_err(|e| AnalyzerError::FrontEnd(format!("failed to load the C++ grammar: {}", e)))?;
        if let Some(timeout) = self.parse_timeout {
            parser.set_timeout_micros(timeout.as_micros() as u64);
        }
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| AnalyzerError::FrontEnd(format!("parsing {} was aborted", path)))?;

        let mut scanner = Scanner {
            path,
            source,
            args: &args,
            errors: 0,
            diagnostics: Vec::new(),
            includes: HashMap::new(),
        };
        scanner.scan(tree.root_node());
        debug!(
            path,
            diagnostics = scanner.diagnostics.len(),
            includes = scanner.includes.len(),
            "Parsed translation unit"
        );

        let Scanner {
            diagnostics,
            includes,
            ..
        } = scanner;
        Ok(TreeSitterUnit {
            source: UnitSource {
                path: path.to_string(),
                text: source.to_string(),
                includes,
            },
            tree,
            diagnostics,
        })
    }
}

/// Collects syntax errors and resolves include directives in one pass.
struct Scanner<'a> {
    path: &'a str,
    source: &'a str,
    args: &'a FrontEndArgs,
    errors: usize,
    diagnostics: Vec<FrontEndDiagnostic>,
    includes: HashMap<usize, Option<String>>,
}

impl<'a> Scanner<'a> {
    fn location(&self, node: Node) -> SourceLocation {
        let point = node.start_position();
        SourceLocation::new(
            self.path,
            point.row as u32 + 1,
            point.column as u32 + 1,
            node.start_byte(),
        )
    }

    fn report(&mut self, severity: FrontEndSeverity, message: String, node: Node) {
        let location = Some(self.location(node));
        self.diagnostics.push(FrontEndDiagnostic {
            severity,
            message,
            location,
        });
    }

    fn scan(&mut self, root: Node) {
        if root.is_error() {
            self.report(
                FrontEndSeverity::Fatal,
                "translation unit could not be parsed".to_string(),
                root,
            );
            return;
        }

        let mut cursor = root.walk();
        'walk: loop {
            let node = cursor.node();
            let mut descend = true;

            if node.is_error() || node.is_missing() {
                self.errors += 1;
                if self.args.error_limit > 0 && self.errors > self.args.error_limit {
                    self.report(
                        FrontEndSeverity::Fatal,
                        "too many errors emitted, stopping now".to_string(),
                        node,
                    );
                    break 'walk;
                }
                let message = if node.is_missing() {
                    format!("expected `{}`", node.kind())
                } else {
                    let snippet: String = squash(text(node, self.source)).chars().take(SNIPPET_CHARS).collect();
                    format!("syntax error near `{}`", snippet)
                };
                self.report(FrontEndSeverity::Error, message, node);
                descend = false;
            } else if node.kind() == "preproc_include" {
                self.record_include(node);
                descend = false;
            }

            if descend && cursor.goto_first_child() {
                continue;
            }
            loop {
                if cursor.goto_next_sibling() {
                    continue 'walk;
                }
                if !cursor.goto_parent() {
                    break 'walk;
                }
            }
        }
    }

    fn record_include(&mut self, node: Node) {
        let Some((spelling, is_system)) = include_spelling(node, self.source) else {
            return;
        };
        let resolved = self.resolve_include(&spelling, is_system);
        if resolved.is_none() && !is_system {
            self.report(
                FrontEndSeverity::Warning,
                format!("'{}' file not found", spelling),
                node,
            );
        }
        self.includes.insert(node.start_byte(), resolved);
    }

    /// Search order: the including file's directory (local includes only),
    /// then `-I` directories, then `-isystem` directories.
    fn resolve_include(&self, spelling: &str, is_system: bool) -> Option<String> {
        let mut candidates = Vec::new();
        if !is_system {
            let dir = Path::new(self.path).parent().unwrap_or_else(|| Path::new(""));
            candidates.push(dir.join(spelling));
        }
        candidates.extend(self.args.include_dirs.iter().map(|d| d.join(spelling)));
        candidates.extend(self.args.system_dirs.iter().map(|d| d.join(spelling)));
        candidates
            .into_iter()
            .find(|candidate| candidate.is_file())
            .map(|found| found.to_string_lossy().into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::{Cursor, CursorKind};
    use crate::types::AccessSpecifier;

    fn parse(source: &str) -> TreeSitterUnit {
        TreeSitterFrontEnd::new()
            .parse("test.cpp", source, &[])
            .unwrap()
    }

    #[test]
    fn test_front_end_args() {
        let args: Vec<String> = ["-std=c++17", "-Iinclude", "-I", "vendor", "-isystem/usr/include", "-ferror-limit=5"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let parsed = FrontEndArgs::parse(&args);
        assert_eq!(parsed.include_dirs, vec![PathBuf::from("include"), PathBuf::from("vendor")]);
        assert_eq!(parsed.system_dirs, vec![PathBuf::from("/usr/include")]);
        assert_eq!(parsed.error_limit, 5);
    }

    #[test]
    fn test_namespace_and_class_cursors() {
        let unit = parse("namespace geo {\nclass Shape {\npublic:\n  virtual double area() const = 0;\n};\n}\n");
        let root = unit.root();
        assert_eq!(root.kinds(), vec![CursorKind::TranslationUnit]);

        let ns = root.children().next().unwrap();
        assert_eq!(ns.kinds(), vec![CursorKind::Namespace]);
        assert_eq!(ns.spelling(), "geo");

        let class = ns.children().next().unwrap();
        assert_eq!(class.kinds(), vec![CursorKind::ClassDecl]);
        assert_eq!(class.spelling(), "Shape");
        assert!(class.flags().is_definition);

        let members: Vec<_> = class.children().collect();
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].kinds(), vec![CursorKind::CxxAccessSpecifier]);
        assert_eq!(members[0].access(), Some(AccessSpecifier::Public));

        let method = &members[1];
        assert_eq!(method.kinds(), vec![CursorKind::CxxMethod]);
        assert_eq!(method.spelling(), "area");
        let flags = method.flags();
        assert!(flags.is_virtual);
        assert!(flags.is_pure_virtual);
        assert!(flags.is_const_method);
        assert_eq!(method.result_type().unwrap().spelling, "double");
        assert_eq!(method.location().line, 4);
    }

    #[test]
    fn test_multiple_declarators() {
        let unit = parse("int a = 1, *b;\n");
        let vars: Vec<_> = unit.root().children().collect();
        assert_eq!(vars.len(), 2);
        assert_eq!(vars[0].kinds(), vec![CursorKind::VarDecl]);
        assert_eq!(vars[0].spelling(), "a");
        assert_eq!(vars[0].initializer().as_deref(), Some("1"));
        assert_eq!(vars[1].spelling(), "b");
        assert_eq!(vars[1].ty().unwrap().spelling, "int*");
    }

    #[test]
    fn test_function_template_cursor() {
        let unit = parse("template <typename T>\nT max_of(T a, T b) { return a > b ? a : b; }\n");
        let function = unit.root().children().next().unwrap();
        assert_eq!(
            function.kinds(),
            vec![CursorKind::FunctionTemplate, CursorKind::FunctionDecl]
        );
        assert_eq!(function.spelling(), "max_of");

        let children: Vec<_> = function.children().collect();
        assert_eq!(children.len(), 3);
        assert_eq!(children[0].kinds(), vec![CursorKind::TemplateTypeParameter]);
        assert_eq!(children[0].spelling(), "T");
        assert_eq!(children[1].kinds(), vec![CursorKind::ParmDecl]);
        assert_eq!(children[1].spelling(), "a");
        assert_eq!(children[1].ty().unwrap().spelling, "T");
    }

    #[test]
    fn test_base_specifiers() {
        let unit = parse("class D : public B1, private virtual B2 {};\n");
        let class = unit.root().children().next().unwrap();
        let bases: Vec<_> = class
            .children()
            .filter(|c| c.kinds() == vec![CursorKind::CxxBaseSpecifier])
            .collect();
        assert_eq!(bases.len(), 2);
        assert_eq!(bases[0].spelling(), "B1");
        assert_eq!(bases[0].access(), Some(AccessSpecifier::Public));
        assert!(!bases[0].flags().is_virtual_base);
        assert_eq!(bases[1].spelling(), "B2");
        assert_eq!(bases[1].access(), Some(AccessSpecifier::Private));
        assert!(bases[1].flags().is_virtual_base);
    }

    #[test]
    fn test_syntax_error_reported() {
        let unit = parse("class Broken {\n  int x;\n  void f(\n");
        assert!(unit
            .diagnostics()
            .iter()
            .any(|d| d.severity == FrontEndSeverity::Error));
    }

    #[test]
    fn test_error_limit_becomes_fatal() {
        let source = "class Good { int a; };\nvoid f() { int x = ; }\nvoid g() { int y = ; }\nvoid h() { int z = ; }\n";
        let unit = TreeSitterFrontEnd::new()
            .parse("limit.cpp", source, &["-ferror-limit=1".to_string()])
            .unwrap();
        assert!(unit
            .diagnostics()
            .iter()
            .any(|d| d.severity == FrontEndSeverity::Fatal));
    }

    #[test]
    fn test_missing_local_include_warns() {
        let unit = parse("#include <vector>\n#include \"no_such_header_0451.h\"\n");
        let includes: Vec<_> = unit.root().children().filter_map(|c| c.include()).collect();
        assert_eq!(includes.len(), 2);
        assert!(includes[0].is_system);
        assert_eq!(includes[1].spelling, "no_such_header_0451.h");
        assert_eq!(includes[1].resolved_path, None);

        let warnings: Vec<_> = unit
            .diagnostics()
            .iter()
            .filter(|d| d.severity == FrontEndSeverity::Warning)
            .collect();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("no_such_header_0451.h"));
    }

    #[test]
    fn test_resolves_include_next_to_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("shape.hpp"), "struct Shape {};\n").unwrap();
        let main = dir.path().join("main.cpp");
        let path = main.to_string_lossy().into_owned();

        let unit = TreeSitterFrontEnd::new()
            .parse(&path, "#include \"shape.hpp\"\n", &[])
            .unwrap();
        let include = unit.root().children().next().unwrap().include().unwrap();
        assert!(include.resolved_path.unwrap().ends_with("shape.hpp"));
        assert!(unit.diagnostics().is_empty());
    }

    #[test]
    fn test_disabled_block_is_unreachable() {
        let unit = parse("#if 0\nclass Hidden {};\n#else\nclass Shown {};\n#endif\n");
        let children: Vec<_> = unit.root().children().collect();
        assert_eq!(children.len(), 2);
        assert!(children[0].flags().is_unreachable);
        assert_eq!(children[0].children().count(), 0);
        assert!(!children[1].flags().is_unreachable);
        let shown: Vec<_> = children[1].children().map(|c| c.spelling()).collect();
        assert_eq!(shown, vec!["Shown"]);
    }
}

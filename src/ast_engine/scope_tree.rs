//! Scope tracking for qualified-name construction.
//!
//! The resolver keeps an explicit stack of the namespaces and classes the
//! traversal is inside of, and turns names into fully qualified ones.

use crate::types::SourceLocation;
use crate::SCOPE_SEPARATOR;

/// What opened a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Namespace,
    Class,
}

/// One entry of the scope stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeEntry {
    pub name: String,
    pub kind: ScopeKind,
    /// Fully qualified path of this scope (e.g. "geo::Shape").
    pub path: String,
}

/// Join a scope path and a name. The global scope is the empty string.
pub fn join_scope(scope: &str, name: &str) -> String {
    match (scope.is_empty(), name.is_empty()) {
        (true, _) => name.to_string(),
        (false, true) => scope.to_string(),
        (false, false) => format!("{}{}{}", scope, SCOPE_SEPARATOR, name),
    }
}

/// Split a qualified path on `::`, ignoring separators inside template
/// argument lists: `std::map<a::b, c>::iterator` has three components.
pub fn split_scope(path: &str) -> Vec<&str> {
    if path.is_empty() {
        return Vec::new();
    }
    let bytes = path.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'<' | b'(' => depth += 1,
            b'>' | b')' => depth = depth.saturating_sub(1),
            b':' if depth == 0 && bytes.get(i + 1) == Some(&b':') => {
                parts.push(&path[start..i]);
                i += 2;
                start = i;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    parts.push(&path[start..]);
    parts
}

/// Enclosing scope of a path; `None` for the global scope.
pub fn parent_scope(path: &str) -> Option<String> {
    if path.is_empty() {
        return None;
    }
    let mut parts = split_scope(path);
    parts.pop();
    Some(parts.join(SCOPE_SEPARATOR))
}

/// `Box<T>` → `Box`.
pub fn strip_template_arguments(segment: &str) -> &str {
    match segment.find('<') {
        Some(index) if index > 0 && !segment.starts_with("operator") => segment[..index].trim_end(),
        _ => segment,
    }
}

/// Stack of enclosing scopes during traversal.
#[derive(Debug, Default)]
pub struct ScopeResolver {
    stack: Vec<ScopeEntry>,
}

impl ScopeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Qualified path of the innermost scope, "" at global scope.
    pub fn current(&self) -> &str {
        self.stack.last().map(|e| e.path.as_str()).unwrap_or("")
    }

    /// Enter a scope nested in the current one and return its path.
    pub fn push(&mut self, name: &str, kind: ScopeKind) -> String {
        let path = join_scope(self.current(), name);
        self.push_path(name, kind, path.clone());
        path
    }

    /// Enter a scope whose path is already known, such as a class defined
    /// out of line as `Outer::Inner`.
    pub fn push_path(&mut self, name: &str, kind: ScopeKind, path: String) {
        self.stack.push(ScopeEntry {
            name: name.to_string(),
            kind,
            path,
        });
    }

    pub fn pop(&mut self) -> Option<ScopeEntry> {
        self.stack.pop()
    }

    /// Stable name for an anonymous namespace or record.
    pub fn anonymous_name(location: &SourceLocation) -> String {
        format!("<anonymous@{}:{}>", location.line, location.column)
    }

    /// Split a qualified declarator name (`Shape::area`) into its owning
    /// scope and leaf name.
    ///
    /// The qualifier is looked up relative to each enclosing scope, from
    /// the innermost outward, accepting the first candidate `is_known`
    /// confirms. Template arguments on the qualifier (`Box<T>::get`) are
    /// dropped when only the primary template is known. Unknown qualifiers
    /// resolve relative to the current scope.
    pub fn resolve_qualified<F>(&self, spelling: &str, is_known: F) -> (String, String)
    where
        F: Fn(&str) -> bool,
    {
        let mut parts = split_scope(spelling);
        let leaf = parts.pop().unwrap_or_default().to_string();
        if parts.is_empty() {
            return (self.current().to_string(), leaf);
        }

        let absolute = parts.first() == Some(&"");
        let qualifier: Vec<&str> = parts.into_iter().filter(|p| !p.is_empty()).collect();
        let literal = qualifier.join(SCOPE_SEPARATOR);
        let stripped = qualifier
            .iter()
            .map(|p| strip_template_arguments(p))
            .collect::<Vec<_>>()
            .join(SCOPE_SEPARATOR);

        let mut bases: Vec<String> = Vec::new();
        if absolute {
            bases.push(String::new());
        } else {
            let mut scope = Some(self.current().to_string());
            while let Some(s) = scope {
                scope = parent_scope(&s);
                bases.push(s);
            }
        }

        for base in &bases {
            for candidate in [&literal, &stripped] {
                let path = join_scope(base, candidate);
                if is_known(&path) {
                    return (path, leaf);
                }
            }
        }

        let fallback = if absolute {
            literal
        } else {
            join_scope(self.current(), &literal)
        };
        (fallback, leaf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_three_level_qualification() {
        let mut scopes = ScopeResolver::new();
        scopes.push("company", ScopeKind::Namespace);
        scopes.push("project", ScopeKind::Namespace);
        let path = scopes.push("core", ScopeKind::Namespace);
        assert_eq!(path, "company::project::core");
        assert_eq!(join_scope(scopes.current(), "Engine"), "company::project::core::Engine");

        let closed = scopes.pop().unwrap();
        assert_eq!(closed.kind, ScopeKind::Namespace);
        assert_eq!(scopes.current(), "company::project");
    }

    #[test]
    fn test_strip_template_arguments_keeps_anonymous_names() {
        assert_eq!(strip_template_arguments("Buffer<int, 4>"), "Buffer");
        assert_eq!(strip_template_arguments("operator<"), "operator<");
        assert_eq!(strip_template_arguments("<anonymous@4:1>"), "<anonymous@4:1>");
    }

    #[test]
    fn test_anonymous_name_is_location_based() {
        let loc = SourceLocation::new("a.cpp", 7, 3, 80);
        assert_eq!(ScopeResolver::anonymous_name(&loc), "<anonymous@7:3>");
        assert_eq!(ScopeResolver::anonymous_name(&loc), ScopeResolver::anonymous_name(&loc.clone()));
    }

    #[test]
    fn test_split_scope_respects_template_arguments() {
        assert_eq!(
            split_scope("std::map<a::b, c>::iterator"),
            vec!["std", "map<a::b, c>", "iterator"]
        );
        assert_eq!(split_scope("::x"), vec!["", "x"]);
        assert!(split_scope("").is_empty());
    }

    #[test]
    fn test_parent_scope() {
        assert_eq!(parent_scope("a::b::C").as_deref(), Some("a::b"));
        assert_eq!(parent_scope("a").as_deref(), Some(""));
        assert_eq!(parent_scope(""), None);
    }

    #[test]
    fn test_resolve_out_of_line_member() {
        let known: HashSet<&str> = ["geo", "geo::Shape", "Box"].into_iter().collect();
        let mut scopes = ScopeResolver::new();
        scopes.push("geo", ScopeKind::Namespace);

        let (owner, leaf) = scopes.resolve_qualified("Shape::area", |p| known.contains(p));
        assert_eq!((owner.as_str(), leaf.as_str()), ("geo::Shape", "area"));

        let (owner, leaf) = scopes.resolve_qualified("Box<T>::get", |p| known.contains(p));
        assert_eq!((owner.as_str(), leaf.as_str()), ("Box", "get"));

        let (owner, _) = scopes.resolve_qualified("::Unknown::run", |p| known.contains(p));
        assert_eq!(owner, "Unknown");

        let (owner, leaf) = scopes.resolve_qualified("plain", |p| known.contains(p));
        assert_eq!((owner.as_str(), leaf.as_str()), ("geo", "plain"));
    }
}

//! Tree-sitter C++ node tables and node helpers.
//!
//! Maps tree-sitter-cpp node types onto [`CursorKind`] and extracts names,
//! types and specifiers from declaration nodes.

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;
use tree_sitter::Node;

use super::{CursorKind, RawType};
use crate::types::ReferenceKind;

lazy_static! {
    /// Node types with a fixed cursor kind.
    pub static ref SIMPLE_KINDS: HashMap<&'static str, CursorKind> = [
        ("translation_unit", CursorKind::TranslationUnit),
        ("namespace_definition", CursorKind::Namespace),
        ("enum_specifier", CursorKind::EnumDecl),
        ("enumerator", CursorKind::EnumConstantDecl),
        ("preproc_include", CursorKind::InclusionDirective),
        ("access_specifier", CursorKind::CxxAccessSpecifier),
        ("type_definition", CursorKind::TypedefDecl),
        ("alias_declaration", CursorKind::TypeAliasDecl),
        ("namespace_alias_definition", CursorKind::NamespaceAlias),
        ("friend_declaration", CursorKind::FriendDecl),
        ("static_assert_declaration", CursorKind::StaticAssert),
        ("linkage_specification", CursorKind::LinkageSpec),
        ("preproc_if", CursorKind::PreprocessingBlock),
        ("preproc_ifdef", CursorKind::PreprocessingBlock),
        ("preproc_else", CursorKind::PreprocessingBlock),
        ("preproc_elif", CursorKind::PreprocessingBlock),
        ("preproc_elifdef", CursorKind::PreprocessingBlock),
    ]
    .into_iter()
    .collect();

    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    static ref SPACE_AROUND_PUNCT: Regex = Regex::new(r"\s*([^\w\s])\s*").unwrap();
}

/// Node types exposed as cursors when they appear in a declaration body.
pub const DECLARATION_NODES: &[&str] = &[
    "namespace_definition",
    "class_specifier",
    "struct_specifier",
    "union_specifier",
    "enum_specifier",
    "function_definition",
    "preproc_include",
    "access_specifier",
    "type_definition",
    "alias_declaration",
    "using_declaration",
    "namespace_alias_definition",
    "linkage_specification",
    "preproc_if",
    "preproc_ifdef",
    "preproc_else",
    "preproc_elif",
    "preproc_elifdef",
    "friend_declaration",
    "static_assert_declaration",
    "concept_definition",
    "template_instantiation",
];

/// Nodes never exposed: comments and macro definitions.
pub const HIDDEN_NODES: &[&str] = &["comment", "preproc_def", "preproc_function_def", "preproc_call"];

pub const RECORD_NODES: &[&str] = &["class_specifier", "struct_specifier", "union_specifier"];

pub const TEMPLATE_PARAMETER_NODES: &[&str] = &[
    "type_parameter_declaration",
    "optional_type_parameter_declaration",
    "variadic_type_parameter_declaration",
    "template_template_parameter_declaration",
    "parameter_declaration",
    "optional_parameter_declaration",
    "variadic_parameter_declaration",
];

pub const PARAMETER_NODES: &[&str] = &[
    "parameter_declaration",
    "optional_parameter_declaration",
    "variadic_parameter_declaration",
];

/// Source text of a node.
pub fn text<'s>(node: Node, source: &'s str) -> &'s str {
    source.get(node.start_byte()..node.end_byte()).unwrap_or("")
}

/// Collapse whitespace and drop it around punctuation: `std :: vector < int >`
/// becomes `std::vector<int>`.
pub fn compact(raw: &str) -> String {
    let collapsed = WHITESPACE.replace_all(raw.trim(), " ");
    SPACE_AROUND_PUNCT.replace_all(&collapsed, "$1").into_owned()
}

/// Collapse runs of whitespace into single spaces.
pub fn squash(raw: &str) -> String {
    WHITESPACE.replace_all(raw.trim(), " ").into_owned()
}

/// `operator +` → `operator+`, `operator  new [ ]` → `operator new[]`.
pub fn compact_operator(raw: &str) -> String {
    let rest: String = raw
        .trim()
        .trim_start_matches("operator")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    match rest.chars().next() {
        Some(c) if c.is_alphabetic() || c == '_' => format!("operator {}", rest),
        _ => format!("operator{}", rest),
    }
}

/// Whether a specifier keyword appears among the direct children of `node`.
pub fn has_keyword(node: Node, source: &str, keyword: &str) -> bool {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).any(|child| {
        child.kind() == keyword
            || (matches!(
                child.kind(),
                "storage_class_specifier"
                    | "type_qualifier"
                    | "virtual"
                    | "virtual_function_specifier"
                    | "virtual_specifier"
                    | "explicit_function_specifier"
                    | "function_specifier"
            ) && {
                let spelled = text(child, source).trim();
                spelled == keyword || spelled.starts_with(&format!("{}(", keyword))
            })
    });
    found
}

/// Whether a direct child has the given node type.
pub fn has_child_kind(node: Node, kind: &str) -> bool {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).any(|child| child.kind() == kind);
    found
}

pub fn first_child_of_kind<'t>(node: Node<'t>, kinds: &[&str]) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).find(|child| kinds.contains(&child.kind()));
    found
}

/// Last named child, skipping comments.
pub fn last_named_child(node: Node) -> Option<Node> {
    let mut cursor = node.walk();
    let found = node
        .named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .last();
    found
}

/// The declaration wrapped by a `template_declaration`.
pub fn template_body(node: Node) -> Option<Node> {
    let mut cursor = node.walk();
    let found = node
        .named_children(&mut cursor)
        .filter(|c| !matches!(c.kind(), "template_parameter_list" | "requires_clause" | "comment"))
        .last();
    found
}

/// Number of parameters in a `template_parameter_list`.
pub fn template_parameter_count(template: Node) -> usize {
    template
        .child_by_field_name("parameters")
        .map(|list| {
            let mut cursor = list.walk();
            let count = list
                .named_children(&mut cursor)
                .filter(|c| TEMPLATE_PARAMETER_NODES.contains(&c.kind()))
                .count();
            count
        })
        .unwrap_or(0)
}

/// Step one level into a declarator chain, `None` at a name.
fn inner_declarator(node: Node) -> Option<Node> {
    match node.kind() {
        "init_declarator"
        | "pointer_declarator"
        | "array_declarator"
        | "function_declarator"
        | "abstract_pointer_declarator"
        | "abstract_array_declarator" => node.child_by_field_name("declarator"),
        "reference_declarator" | "abstract_reference_declarator" | "variadic_declarator" => {
            last_named_child(node)
        }
        "attributed_declarator" | "parenthesized_declarator" => node.named_child(0),
        _ => None,
    }
}

/// The node naming the declared entity inside a declarator chain.
pub fn declarator_name(declarator: Node) -> Option<Node> {
    let mut current = declarator;
    loop {
        match current.kind() {
            "identifier" | "field_identifier" | "qualified_identifier" | "destructor_name"
            | "operator_name" | "template_function" | "template_method" | "operator_cast"
            | "type_identifier" | "namespace_identifier" => return Some(current),
            _ => current = inner_declarator(current)?,
        }
    }
}

/// The function declarator of a declaration, if it declares a function.
///
/// A function declarator whose own declarator is parenthesized declares a
/// pointer to function, which is a variable.
pub fn function_declarator(declarator: Node) -> Option<Node> {
    let mut current = declarator;
    loop {
        match current.kind() {
            "function_declarator" => {
                let inner = current.child_by_field_name("declarator")?;
                return (inner.kind() != "parenthesized_declarator").then_some(current);
            }
            "pointer_declarator" | "reference_declarator" | "attributed_declarator" => {
                current = inner_declarator(current)?;
            }
            "operator_cast" => return cast_function_declarator(current),
            "qualified_identifier" => {
                let name = current.child_by_field_name("name")?;
                if name.kind() == "operator_cast" {
                    return cast_function_declarator(name);
                }
                return None;
            }
            _ => return None,
        }
    }
}

fn cast_function_declarator(cast: Node) -> Option<Node> {
    let mut current = cast.child_by_field_name("declarator")?;
    loop {
        if current.kind() == "abstract_function_declarator" {
            return Some(current);
        }
        current = inner_declarator(current)?;
    }
}

/// The conversion operator node of a declarator, if any.
pub fn operator_cast(declarator: Node) -> Option<Node> {
    match declarator.kind() {
        "operator_cast" => Some(declarator),
        "qualified_identifier" => declarator
            .child_by_field_name("name")
            .and_then(operator_cast),
        _ => None,
    }
}

/// Spelling of a name node; qualifiers are kept, template arguments of the
/// final component are not.
pub fn name_spelling(node: Node, source: &str) -> String {
    match node.kind() {
        "qualified_identifier" | "qualified_type_identifier" | "nested_namespace_specifier" => {
            let scope = node
                .child_by_field_name("scope")
                .map(|s| compact(text(s, source)))
                .unwrap_or_default();
            match node.child_by_field_name("name") {
                Some(name) => format!("{}::{}", scope, name_spelling(name, source)),
                None => compact(text(node, source)),
            }
        }
        "template_function" | "template_type" | "template_method" => node
            .child_by_field_name("name")
            .map(|n| name_spelling(n, source))
            .unwrap_or_else(|| compact(text(node, source))),
        "operator_name" => compact_operator(text(node, source)),
        "operator_cast" => {
            let target = declared_type(node, node.child_by_field_name("declarator"), None, source);
            format!("operator {}", target.spelling)
        }
        _ => compact(text(node, source)),
    }
}

/// Explicit template arguments written on a name (`Box<int>`, `swap<T>`).
pub fn template_arguments(node: Node, source: &str) -> Vec<String> {
    match node.kind() {
        "template_function" | "template_type" | "template_method" => node
            .child_by_field_name("arguments")
            .map(|args| {
                let mut cursor = args.walk();
                let list = args
                    .named_children(&mut cursor)
                    .filter(|c| c.kind() != "comment")
                    .map(|c| squash(text(c, source)))
                    .collect();
                list
            })
            .unwrap_or_default(),
        "qualified_identifier" => node
            .child_by_field_name("name")
            .map(|n| template_arguments(n, source))
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// Base spelling of a type node; record and enum specifiers contribute their
/// name only, never their body. An unnamed one is spelled by its position,
/// matching the name given to the record or enum itself.
fn type_node_spelling(ty: Node, source: &str) -> String {
    match ty.kind() {
        "class_specifier" | "struct_specifier" | "union_specifier" | "enum_specifier" => {
            match ty.child_by_field_name("name") {
                Some(name) => squash(text(name, source)),
                None => {
                    let point = ty.start_position();
                    format!("<anonymous@{}:{}>", point.row + 1, point.column + 1)
                }
            }
        }
        _ => squash(text(ty, source)),
    }
}

/// Type of a declaration as written: specifiers and qualifiers of `decl`
/// plus the pointer, reference and array parts of `declarator`, stopping
/// before `stop` (a function declarator when reading a result type).
pub fn declared_type(decl: Node, declarator: Option<Node>, stop: Option<Node>, source: &str) -> RawType {
    let mut raw = RawType::default();
    let base = decl
        .child_by_field_name("type")
        .map(|t| type_node_spelling(t, source))
        .unwrap_or_default();

    let mut cursor = decl.walk();
    for child in decl.children(&mut cursor) {
        if child.kind() == "type_qualifier" {
            match text(child, source).trim() {
                "const" => raw.is_const = true,
                "volatile" => raw.is_volatile = true,
                _ => {}
            }
        }
    }

    let mut suffix = String::new();
    let mut arrays = Vec::new();
    let mut current = declarator;
    while let Some(node) = current {
        if Some(node) == stop {
            break;
        }
        match node.kind() {
            "pointer_declarator" | "abstract_pointer_declarator" => {
                suffix.push('*');
                raw.pointer_depth += 1;
                let mut qualifiers = node.walk();
                for q in node.children(&mut qualifiers) {
                    if q.kind() == "type_qualifier" {
                        suffix.push(' ');
                        suffix.push_str(text(q, source).trim());
                    }
                }
                current = node.child_by_field_name("declarator");
            }
            "reference_declarator" | "abstract_reference_declarator" => {
                let token = node.child(0).map(|t| text(t, source).trim()).unwrap_or("&");
                raw.reference = if token == "&&" {
                    ReferenceKind::Rvalue
                } else {
                    ReferenceKind::Lvalue
                };
                suffix.push_str(token);
                current = inner_declarator(node);
            }
            "array_declarator" | "abstract_array_declarator" => {
                let size = node
                    .child_by_field_name("size")
                    .map(|s| compact(text(s, source)))
                    .unwrap_or_default();
                arrays.push(format!("[{}]", size));
                current = node.child_by_field_name("declarator");
            }
            "variadic_declarator" => {
                suffix.push_str("...");
                break;
            }
            "init_declarator" | "attributed_declarator" => current = inner_declarator(node),
            "parenthesized_declarator" | "function_declarator" | "abstract_function_declarator" => {
                // Pointer to function or array: keep the declarator text minus the name.
                let mut spelled = compact(text(node, source));
                if let Some(name) = declarator_name(node) {
                    let name_text = text(name, source);
                    if !name_text.is_empty() {
                        spelled = spelled.replacen(&compact(name_text), "", 1);
                    }
                }
                suffix.push_str(&spelled);
                break;
            }
            _ => break,
        }
    }
    arrays.reverse();

    let mut spelling = String::new();
    if raw.is_const {
        spelling.push_str("const ");
    }
    if raw.is_volatile {
        spelling.push_str("volatile ");
    }
    spelling.push_str(&base);
    spelling.push_str(&suffix);
    for dim in arrays {
        spelling.push_str(&dim);
    }
    raw.spelling = spelling.trim().to_string();
    raw
}

/// Header name of an include directive and whether it is a system include.
pub fn include_spelling(node: Node, source: &str) -> Option<(String, bool)> {
    let path = node.child_by_field_name("path")?;
    let raw = text(path, source).trim();
    match path.kind() {
        "system_lib_string" => Some((raw.trim_start_matches('<').trim_end_matches('>').to_string(), true)),
        "string_literal" => Some((raw.trim_matches('"').to_string(), false)),
        _ => Some((raw.to_string(), false)),
    }
}

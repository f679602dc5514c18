//! libclang-style cursors over a tree-sitter-cpp syntax tree.
//!
//! A tree-sitter declaration node can declare several entities
//! (`int a, *b;`) and templates wrap the declaration they parameterize, so
//! a cursor is a node plus the role it plays: the node itself, one
//! declarator of a declaration, a base specifier, or a parameter.

use std::collections::{HashMap, VecDeque};

use tree_sitter::{Node, TreeCursor};

use super::syntax::{
    self, compact, declarator_name, declared_type, first_child_of_kind, function_declarator,
    has_child_kind, has_keyword, squash, template_body, text, DECLARATION_NODES, HIDDEN_NODES,
    PARAMETER_NODES, RECORD_NODES, SIMPLE_KINDS, TEMPLATE_PARAMETER_NODES,
};
use super::{Cursor, CursorFlags, CursorKind, IncludeTarget, RawType};
use crate::types::{AccessSpecifier, SourceLocation};

/// Per-file data shared by every cursor of a unit.
#[derive(Debug)]
pub struct UnitSource {
    pub path: String,
    pub text: String,
    /// Resolved include targets keyed by the directive's start byte.
    pub includes: HashMap<usize, Option<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Role<'t> {
    Plain,
    /// One declarator of a `declaration` or `field_declaration`.
    Declarator(Node<'t>),
    Base {
        access: Option<AccessSpecifier>,
        is_virtual: bool,
    },
    TemplateParameter,
    Parameter,
}

/// Cursor handed out by the tree-sitter front-end.
#[derive(Debug, Clone, Copy)]
pub struct CppCursor<'t> {
    node: Node<'t>,
    role: Role<'t>,
    /// Innermost `template_declaration` wrapping the node.
    template: Option<Node<'t>>,
    in_class: bool,
    unreachable: bool,
    unit: &'t UnitSource,
}

impl<'t> CppCursor<'t> {
    pub(crate) fn root(node: Node<'t>, unit: &'t UnitSource) -> Self {
        Self::plain(node, unit, false)
    }

    fn plain(node: Node<'t>, unit: &'t UnitSource, in_class: bool) -> Self {
        Self {
            node,
            role: Role::Plain,
            template: None,
            in_class,
            unreachable: false,
            unit,
        }
    }

    fn with_role(node: Node<'t>, role: Role<'t>, unit: &'t UnitSource, in_class: bool) -> Self {
        Self {
            role,
            ..Self::plain(node, unit, in_class)
        }
    }

    fn src(&self) -> &'t str {
        &self.unit.text
    }

    fn is_record(&self) -> bool {
        self.role == Role::Plain && RECORD_NODES.contains(&self.node.kind())
    }

    /// The declarator of a function-like cursor.
    fn function_parts(&self) -> Option<(Node<'t>, Option<Node<'t>>)> {
        let declarator = match self.role {
            Role::Declarator(d) => d,
            Role::Plain if self.node.kind() == "function_definition" => {
                self.node.child_by_field_name("declarator")?
            }
            _ => return None,
        };
        let function = function_declarator(declarator);
        if function.is_none() && syntax::operator_cast(declarator).is_none() {
            return None;
        }
        Some((declarator, function))
    }

    fn is_function(&self) -> bool {
        self.function_parts().is_some()
    }

    /// Name node of the declared entity.
    fn name_node(&self) -> Option<Node<'t>> {
        match self.role {
            Role::Plain => match self.node.kind() {
                "function_definition" => self.function_name_node(),
                "type_definition" => self
                    .node
                    .child_by_field_name("declarator")
                    .and_then(declarator_name),
                _ => self.node.child_by_field_name("name"),
            },
            Role::Declarator(d) => {
                if self.is_function() {
                    self.function_name_node()
                } else {
                    declarator_name(d)
                }
            }
            Role::Parameter | Role::TemplateParameter => self.parameter_name_node(),
            Role::Base { .. } => Some(self.node),
        }
    }

    fn function_name_node(&self) -> Option<Node<'t>> {
        let (declarator, function) = self.function_parts()?;
        match function {
            Some(f) if f.kind() == "function_declarator" => f
                .child_by_field_name("declarator")
                .and_then(declarator_name),
            _ => declarator_name(declarator),
        }
    }

    fn parameter_name_node(&self) -> Option<Node<'t>> {
        let node = self.node;
        match node.kind() {
            "type_parameter_declaration" | "variadic_type_parameter_declaration" => {
                first_child_of_kind(node, &["type_identifier"])
            }
            "optional_type_parameter_declaration" => node.child_by_field_name("name"),
            "template_template_parameter_declaration" => {
                let inner = first_child_of_kind(
                    node,
                    &[
                        "type_parameter_declaration",
                        "variadic_type_parameter_declaration",
                        "optional_type_parameter_declaration",
                    ],
                )?;
                let cursor = Self::with_role(inner, Role::TemplateParameter, self.unit, false);
                cursor.parameter_name_node()
            }
            _ => node.child_by_field_name("declarator").and_then(declarator_name),
        }
    }

    /// Final component of a possibly qualified name.
    fn name_leaf(node: Node<'t>) -> Node<'t> {
        let mut current = node;
        while current.kind() == "qualified_identifier" {
            match current.child_by_field_name("name") {
                Some(name) => current = name,
                None => break,
            }
        }
        current
    }

    fn record_kinds(&self) -> Vec<CursorKind> {
        let base = match self.node.kind() {
            "struct_specifier" => CursorKind::StructDecl,
            "union_specifier" => CursorKind::UnionDecl,
            _ => CursorKind::ClassDecl,
        };
        let Some(template) = self.template else {
            return vec![base];
        };
        let specialized = self
            .node
            .child_by_field_name("name")
            .map_or(false, |n| Self::name_leaf(n).kind() == "template_type");
        match (syntax::template_parameter_count(template), specialized) {
            (0, _) => vec![CursorKind::ClassTemplateSpecialization, base],
            (_, true) => vec![
                CursorKind::ClassTemplatePartialSpecialization,
                CursorKind::ClassTemplate,
                base,
            ],
            _ => vec![CursorKind::ClassTemplate, base],
        }
    }

    fn function_kinds(&self) -> Vec<CursorKind> {
        let leaf = self.function_name_node().map(Self::name_leaf);
        let leaf_kind = leaf.map(|n| n.kind()).unwrap_or("");
        let base = if leaf_kind == "operator_cast" {
            CursorKind::ConversionFunction
        } else if leaf_kind == "destructor_name" {
            CursorKind::Destructor
        } else if self.node.child_by_field_name("type").is_none() && leaf_kind != "operator_name" {
            CursorKind::Constructor
        } else if self.in_class {
            CursorKind::CxxMethod
        } else {
            CursorKind::FunctionDecl
        };

        let mut kinds = Vec::with_capacity(2);
        if let Some(template) = self.template {
            let explicit_args = matches!(leaf_kind, "template_function" | "template_method");
            if syntax::template_parameter_count(template) == 0 || explicit_args {
                kinds.push(CursorKind::FunctionTemplateSpecialization);
            } else {
                kinds.push(CursorKind::FunctionTemplate);
            }
        }
        kinds.push(base);
        kinds
    }

    fn plain_kinds(&self) -> Vec<CursorKind> {
        let kind = self.node.kind();
        if RECORD_NODES.contains(&kind) {
            return self.record_kinds();
        }
        match kind {
            "function_definition" if self.is_function() => self.function_kinds(),
            "using_declaration" if has_child_kind(self.node, "namespace") => {
                vec![CursorKind::UsingDirective]
            }
            "using_declaration" => vec![CursorKind::UsingDeclaration],
            _ => vec![SIMPLE_KINDS
                .get(kind)
                .cloned()
                .unwrap_or_else(|| CursorKind::Unexposed(kind.to_string()))],
        }
    }

    /// The node that follows `declarator` as its initializer inside `decl`.
    fn trailing_initializer(decl: Node<'t>, declarator: Node<'t>) -> Option<Node<'t>> {
        let mut cursor = decl.walk();
        if !cursor.goto_first_child() {
            return None;
        }
        let mut seen = false;
        loop {
            let node = cursor.node();
            if node == declarator {
                seen = true;
            } else if seen {
                match cursor.field_name() {
                    Some("declarator") => return None,
                    Some("default_value") | Some("value") => return Some(node),
                    _ if matches!(
                        node.kind(),
                        "delete_method_clause" | "default_method_clause" | "pure_virtual_clause"
                    ) =>
                    {
                        return Some(node)
                    }
                    _ => {}
                }
            }
            if !cursor.goto_next_sibling() {
                return None;
            }
        }
    }

    fn function_flags(&self, flags: &mut CursorFlags) {
        let decl = self.node;
        let src = self.src();
        let Some((declarator, function)) = self.function_parts() else {
            return;
        };
        flags.is_definition = decl.kind() == "function_definition";
        flags.is_virtual = has_keyword(decl, src, "virtual");
        flags.is_static = has_keyword(decl, src, "static");
        flags.is_explicit = has_keyword(decl, src, "explicit");
        flags.is_constexpr = has_keyword(decl, src, "constexpr");
        flags.is_inline = has_keyword(decl, src, "inline") || (flags.is_definition && self.in_class);
        flags.is_deleted = has_child_kind(decl, "delete_method_clause");
        flags.is_defaulted = has_child_kind(decl, "default_method_clause");
        flags.is_pure_virtual = has_child_kind(decl, "pure_virtual_clause");

        if let Some(init) = Self::trailing_initializer(decl, declarator) {
            match squash(text(init, src)).trim_start_matches('=').trim() {
                "0" => flags.is_pure_virtual = true,
                "delete" => flags.is_deleted = true,
                "default" => flags.is_defaulted = true,
                _ => {}
            }
        }

        if let Some(f) = function {
            let mut cursor = f.walk();
            for child in f.children(&mut cursor) {
                match child.kind() {
                    "type_qualifier" => match text(child, src).trim() {
                        "const" => flags.is_const_method = true,
                        "volatile" => flags.is_volatile = true,
                        _ => {}
                    },
                    "noexcept" => flags.is_noexcept = true,
                    _ => {}
                }
            }
            flags.is_override = has_keyword(f, src, "override") || has_keyword(decl, src, "override");
            flags.is_final = has_keyword(f, src, "final") || has_keyword(decl, src, "final");
            flags.is_variadic = f
                .child_by_field_name("parameters")
                .map_or(false, |params| has_child_kind(params, "..."));
        }
    }

    fn variable_flags(&self, declarator: Node<'t>, flags: &mut CursorFlags) {
        let decl = self.node;
        let src = self.src();
        flags.is_static = has_keyword(decl, src, "static");
        flags.is_extern = has_keyword(decl, src, "extern");
        flags.is_mutable = has_keyword(decl, src, "mutable");
        flags.is_constexpr = has_keyword(decl, src, "constexpr");
        flags.is_inline = has_keyword(decl, src, "inline");
        flags.is_volatile = has_keyword(decl, src, "volatile");
        flags.is_definition = if decl.kind() == "field_declaration" {
            !flags.is_static || flags.is_inline || flags.is_constexpr
        } else {
            !flags.is_extern || declarator.kind() == "init_declarator"
        };
    }

    fn unit_location(&self, node: Node<'t>) -> SourceLocation {
        let point = node.start_position();
        SourceLocation::new(
            self.unit.path.clone(),
            point.row as u32 + 1,
            point.column as u32 + 1,
            node.start_byte(),
        )
    }
}

impl<'t> Cursor for CppCursor<'t> {
    type Children = CppChildren<'t>;

    fn is_valid(&self) -> bool {
        match self.role {
            Role::Declarator(d) => !self.node.is_error() && !d.is_error(),
            _ => !self.node.is_error(),
        }
    }

    fn raw_kind(&self) -> String {
        self.node.kind().to_string()
    }

    fn kinds(&self) -> Vec<CursorKind> {
        match self.role {
            Role::Base { .. } => vec![CursorKind::CxxBaseSpecifier],
            Role::Parameter => vec![CursorKind::ParmDecl],
            Role::TemplateParameter => vec![match self.node.kind() {
                "type_parameter_declaration"
                | "optional_type_parameter_declaration"
                | "variadic_type_parameter_declaration" => CursorKind::TemplateTypeParameter,
                "template_template_parameter_declaration" => CursorKind::TemplateTemplateParameter,
                _ => CursorKind::NonTypeTemplateParameter,
            }],
            Role::Declarator(_) if self.is_function() => self.function_kinds(),
            Role::Declarator(_) if self.node.kind() == "field_declaration" || self.in_class => {
                vec![CursorKind::FieldDecl]
            }
            Role::Declarator(_) => vec![CursorKind::VarDecl],
            Role::Plain => self.plain_kinds(),
        }
    }

    fn spelling(&self) -> String {
        let src = self.src();
        match (self.role, self.node.kind()) {
            (Role::Base { .. }, _) => compact(text(self.node, src)),
            (Role::Plain, "translation_unit") => self.unit.path.clone(),
            (Role::Plain, "preproc_include") => syntax::include_spelling(self.node, src)
                .map(|(spelling, _)| spelling)
                .unwrap_or_default(),
            (Role::Plain, "access_specifier") => squash(text(self.node, src)),
            (Role::Plain, "namespace_definition") => self
                .node
                .child_by_field_name("name")
                .map(|n| compact(text(n, src)))
                .unwrap_or_default(),
            (Role::Parameter, _) | (Role::TemplateParameter, _) => self
                .parameter_name_node()
                .map(|n| compact(text(n, src)))
                .unwrap_or_default(),
            _ => self
                .name_node()
                .map(|n| syntax::name_spelling(n, src))
                .unwrap_or_default(),
        }
    }

    fn location(&self) -> SourceLocation {
        let anchor = match self.role {
            Role::Plain if self.node.kind() == "translation_unit" => self.node,
            Role::Parameter | Role::TemplateParameter => self.node,
            _ => self.name_node().unwrap_or(self.node),
        };
        self.unit_location(anchor)
    }

    fn ty(&self) -> Option<RawType> {
        let src = self.src();
        match self.role {
            Role::Declarator(d) if !self.is_function() => Some(declared_type(self.node, Some(d), None, src)),
            Role::Parameter => Some(declared_type(
                self.node,
                self.node.child_by_field_name("declarator"),
                None,
                src,
            )),
            Role::TemplateParameter if self.kinds() == [CursorKind::NonTypeTemplateParameter] => {
                Some(declared_type(
                    self.node,
                    self.node.child_by_field_name("declarator"),
                    None,
                    src,
                ))
            }
            Role::Plain if self.node.kind() == "enum_specifier" => self
                .node
                .child_by_field_name("base")
                .map(|b| RawType::new(squash(text(b, src)))),
            _ => None,
        }
    }

    fn result_type(&self) -> Option<RawType> {
        let src = self.src();
        let (declarator, function) = self.function_parts()?;
        if let Some(cast) = syntax::operator_cast(declarator) {
            return Some(declared_type(cast, cast.child_by_field_name("declarator"), function, src));
        }
        self.node.child_by_field_name("type")?;
        let raw = declared_type(self.node, Some(declarator), function, src);
        let trailing = function.and_then(|f| first_child_of_kind(f, &["trailing_return_type"]));
        match trailing {
            Some(trailing) if raw.spelling.ends_with("auto") => {
                let spelled = trailing
                    .named_child(0)
                    .map(|t| squash(text(t, src)))
                    .unwrap_or_else(|| squash(text(trailing, src).trim_start_matches("->")));
                Some(RawType::new(spelled))
            }
            _ => Some(raw),
        }
    }

    fn flags(&self) -> CursorFlags {
        let mut flags = CursorFlags {
            is_unreachable: self.unreachable,
            ..Default::default()
        };
        match self.role {
            Role::Base { is_virtual, .. } => flags.is_virtual_base = is_virtual,
            Role::Parameter | Role::TemplateParameter => {
                flags.is_pack = self.node.kind().starts_with("variadic_")
                    || has_child_kind(self.node, "...")
                    || self
                        .node
                        .child_by_field_name("declarator")
                        .map_or(false, |d| d.kind() == "variadic_declarator");
            }
            Role::Declarator(d) if !self.is_function() => self.variable_flags(d, &mut flags),
            _ if self.is_function() => self.function_flags(&mut flags),
            Role::Plain => match self.node.kind() {
                "namespace_definition" => {
                    flags.is_definition = true;
                    flags.is_inline = has_child_kind(self.node, "inline");
                }
                "enum_specifier" => {
                    flags.is_definition = self.node.child_by_field_name("body").is_some();
                    flags.is_scoped_enum =
                        has_child_kind(self.node, "class") || has_child_kind(self.node, "struct");
                }
                _ if self.is_record() => {
                    flags.is_definition = self.node.child_by_field_name("body").is_some();
                }
                _ => {}
            },
            _ => {}
        }
        flags
    }

    fn access(&self) -> Option<AccessSpecifier> {
        match self.role {
            Role::Base { access, .. } => access,
            Role::Plain if self.node.kind() == "access_specifier" => {
                AccessSpecifier::from_keyword(text(self.node, self.src()))
            }
            _ => None,
        }
    }

    fn initializer(&self) -> Option<String> {
        let src = self.src();
        let node = match self.role {
            Role::Declarator(d) if !self.is_function() => {
                if d.kind() == "init_declarator" {
                    d.child_by_field_name("value").or_else(|| {
                        syntax::last_named_child(d).filter(|n| Some(*n) != d.child_by_field_name("declarator"))
                    })
                } else {
                    Self::trailing_initializer(self.node, d)
                }
            }
            Role::Parameter => self.node.child_by_field_name("default_value"),
            Role::TemplateParameter => self
                .node
                .child_by_field_name("default_type")
                .or_else(|| self.node.child_by_field_name("default_value")),
            Role::Plain if self.node.kind() == "enumerator" => self.node.child_by_field_name("value"),
            _ => None,
        }?;
        let spelled = squash(text(node, src));
        let spelled = spelled.trim_start_matches('=').trim();
        (!spelled.is_empty()).then(|| spelled.to_string())
    }

    fn template_arguments(&self) -> Vec<String> {
        if !(self.is_record() || self.is_function()) {
            return Vec::new();
        }
        self.name_node()
            .map(|n| syntax::template_arguments(n, self.src()))
            .unwrap_or_default()
    }

    fn include(&self) -> Option<IncludeTarget> {
        if self.role != Role::Plain || self.node.kind() != "preproc_include" {
            return None;
        }
        let (spelling, is_system) = syntax::include_spelling(self.node, self.src())?;
        let resolved_path = self
            .unit
            .includes
            .get(&self.node.start_byte())
            .cloned()
            .flatten();
        Some(IncludeTarget {
            spelling,
            is_system,
            resolved_path,
        })
    }

    fn children(&self) -> CppChildren<'t> {
        let mut segments = VecDeque::new();
        if !self.is_valid() || self.unreachable {
            return CppChildren::new(self.unit, segments);
        }
        let node = self.node;
        if let Some(template) = self.template {
            if self.is_record() || self.is_function() {
                if let Some(list) = template.child_by_field_name("parameters") {
                    segments.push_back(Segment::TemplateParameters(list));
                }
            }
        }
        if let Some((_, Some(function))) = self.function_parts() {
            if let Some(params) = function.child_by_field_name("parameters") {
                segments.push_back(Segment::Parameters(params));
            }
        }
        if self.role == Role::Plain {
            match node.kind() {
                "translation_unit" => segments.push_back(Segment::Body { node, in_class: false }),
                "namespace_definition" => {
                    if let Some(body) = node.child_by_field_name("body") {
                        segments.push_back(Segment::Body { node: body, in_class: false });
                    }
                }
                "enum_specifier" => {
                    if let Some(body) = node.child_by_field_name("body") {
                        segments.push_back(Segment::Enumerators(body));
                    }
                }
                "linkage_specification" => {
                    if let Some(body) = node.child_by_field_name("body") {
                        if body.kind() == "declaration_list" {
                            segments.push_back(Segment::Body { node: body, in_class: false });
                        } else {
                            segments.push_back(Segment::Single { node: body, in_class: false });
                        }
                    }
                }
                "type_definition" => {
                    if let Some(ty) = node.child_by_field_name("type") {
                        if ty.child_by_field_name("body").is_some() {
                            segments.push_back(Segment::Single { node: ty, in_class: self.in_class });
                        }
                    }
                }
                kind if kind.starts_with("preproc_") && kind != "preproc_include" => {
                    segments.push_back(Segment::Body { node, in_class: self.in_class });
                }
                _ if self.is_record() => {
                    if let Some(bases) = first_child_of_kind(node, &["base_class_clause"]) {
                        segments.push_back(Segment::Bases(bases));
                    }
                    if let Some(body) = node.child_by_field_name("body") {
                        segments.push_back(Segment::Body { node: body, in_class: true });
                    }
                }
                _ => {}
            }
        }
        CppChildren::new(self.unit, segments)
    }
}

#[derive(Debug, Clone, Copy)]
enum Segment<'t> {
    TemplateParameters(Node<'t>),
    Parameters(Node<'t>),
    Bases(Node<'t>),
    Body { node: Node<'t>, in_class: bool },
    Enumerators(Node<'t>),
    Single { node: Node<'t>, in_class: bool },
}

struct Walk<'t> {
    segment: Segment<'t>,
    cursor: TreeCursor<'t>,
    started: bool,
}

#[derive(Debug, Default)]
struct BaseState {
    access: Option<AccessSpecifier>,
    is_virtual: bool,
}

/// Lazy child sequence of a [`CppCursor`].
///
/// Segments (template parameters, bases, parameters, body) are walked one
/// tree-sitter sibling at a time; a sibling may expand into several cursors.
pub struct CppChildren<'t> {
    unit: &'t UnitSource,
    segments: VecDeque<Segment<'t>>,
    walk: Option<Walk<'t>>,
    pending: VecDeque<CppCursor<'t>>,
    base: BaseState,
}

impl<'t> CppChildren<'t> {
    fn new(unit: &'t UnitSource, segments: VecDeque<Segment<'t>>) -> Self {
        Self {
            unit,
            segments,
            walk: None,
            pending: VecDeque::new(),
            base: BaseState::default(),
        }
    }

    fn visit(&mut self, segment: Segment<'t>, child: Node<'t>, field: Option<&'static str>) {
        match segment {
            Segment::TemplateParameters(_) => {
                if TEMPLATE_PARAMETER_NODES.contains(&child.kind()) {
                    self.pending.push_back(CppCursor::with_role(
                        child,
                        Role::TemplateParameter,
                        self.unit,
                        false,
                    ));
                }
            }
            Segment::Parameters(_) => {
                if PARAMETER_NODES.contains(&child.kind()) && !self.is_void_parameter(child) {
                    self.pending
                        .push_back(CppCursor::with_role(child, Role::Parameter, self.unit, false));
                } else if child.is_error() {
                    self.pending.push_back(CppCursor::plain(child, self.unit, false));
                }
            }
            Segment::Bases(_) => self.visit_base(child),
            Segment::Enumerators(_) => {
                if child.kind() == "enumerator" || child.is_error() {
                    self.pending.push_back(CppCursor::plain(child, self.unit, false));
                }
            }
            Segment::Body { in_class, .. } => {
                if matches!(field, Some("condition") | Some("name")) {
                    return;
                }
                self.expand(child, in_class);
            }
            Segment::Single { node, in_class } => self.expand(node, in_class),
        }
    }

    /// `f(void)` declares no parameters.
    fn is_void_parameter(&self, param: Node<'t>) -> bool {
        param.kind() == "parameter_declaration"
            && param.child_by_field_name("declarator").is_none()
            && param
                .child_by_field_name("type")
                .map_or(false, |t| text(t, &self.unit.text).trim() == "void")
    }

    fn visit_base(&mut self, child: Node<'t>) {
        let src = &self.unit.text;
        match child.kind() {
            "access_specifier" => self.base.access = AccessSpecifier::from_keyword(text(child, src)),
            "virtual" => self.base.is_virtual = true,
            "," => self.base = BaseState::default(),
            "base_class_specifier" => {
                let mut cursor = child.walk();
                let parts: Vec<Node<'t>> = child.children(&mut cursor).collect();
                for part in parts {
                    self.visit_base(part);
                }
            }
            "comment" | "attribute_declaration" | ":" | "..." => {}
            _ if child.is_error() => self.pending.push_back(CppCursor::plain(child, self.unit, false)),
            _ if child.is_named() => {
                if text(child, src).trim() == "virtual" {
                    self.base.is_virtual = true;
                    return;
                }
                let state = std::mem::take(&mut self.base);
                self.pending.push_back(CppCursor::with_role(
                    child,
                    Role::Base {
                        access: state.access,
                        is_virtual: state.is_virtual,
                    },
                    self.unit,
                    false,
                ));
            }
            _ => {
                if text(child, src).trim() == "virtual" {
                    self.base.is_virtual = true;
                }
            }
        }
    }

    fn expand(&mut self, child: Node<'t>, in_class: bool) {
        if child.is_error() {
            self.pending.push_back(CppCursor::plain(child, self.unit, in_class));
            return;
        }
        if child.is_missing() || !child.is_named() || HIDDEN_NODES.contains(&child.kind()) {
            return;
        }
        match child.kind() {
            "template_declaration" => self.expand_template(child, in_class),
            "declaration" | "field_declaration" => self.expand_declaration(child, None, in_class),
            "preproc_if" if Self::is_disabled(child, &self.unit.text) => {
                let mut cursor = CppCursor::plain(child, self.unit, in_class);
                cursor.unreachable = true;
                self.pending.push_back(cursor);
                if let Some(alternative) = child.child_by_field_name("alternative") {
                    self.expand(alternative, in_class);
                }
            }
            kind if DECLARATION_NODES.contains(&kind) => {
                self.pending.push_back(CppCursor::plain(child, self.unit, in_class));
            }
            _ => {}
        }
    }

    /// `#if 0` / `#if false`.
    fn is_disabled(node: Node<'t>, src: &str) -> bool {
        node.child_by_field_name("condition")
            .map_or(false, |c| matches!(text(c, src).trim(), "0" | "false"))
    }

    fn expand_template(&mut self, node: Node<'t>, in_class: bool) {
        let mut template = node;
        let mut inner = template_body(node);
        while let Some(candidate) = inner {
            if candidate.kind() != "template_declaration" {
                break;
            }
            template = candidate;
            inner = template_body(candidate);
        }
        let Some(inner) = inner else {
            return;
        };
        match inner.kind() {
            "declaration" | "field_declaration" => self.expand_declaration(inner, Some(template), in_class),
            _ => {
                let mut cursor = CppCursor::plain(inner, self.unit, in_class);
                cursor.template = Some(template);
                self.pending.push_back(cursor);
            }
        }
    }

    fn expand_declaration(&mut self, decl: Node<'t>, template: Option<Node<'t>>, in_class: bool) {
        let ty = decl.child_by_field_name("type");
        let mut cursor = decl.walk();
        let declarators: Vec<Node<'t>> = decl.children_by_field_name("declarator", &mut cursor).collect();

        if let Some(ty) = ty {
            let is_tag = RECORD_NODES.contains(&ty.kind()) || ty.kind() == "enum_specifier";
            if is_tag && (ty.child_by_field_name("body").is_some() || declarators.is_empty()) {
                let mut tag = CppCursor::plain(ty, self.unit, in_class);
                if declarators.is_empty() {
                    tag.template = template;
                }
                self.pending.push_back(tag);
            }
        }
        for declarator in &declarators {
            let mut cursor = CppCursor::with_role(decl, Role::Declarator(*declarator), self.unit, in_class);
            cursor.template = template;
            self.pending.push_back(cursor);
        }
        if ty.is_none() && declarators.is_empty() {
            self.pending.push_back(CppCursor::plain(decl, self.unit, in_class));
        }
    }
}

impl<'t> Iterator for CppChildren<'t> {
    type Item = CppCursor<'t>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(cursor) = self.pending.pop_front() {
                return Some(cursor);
            }
            if self.walk.is_none() {
                let segment = self.segments.pop_front()?;
                let node = match segment {
                    Segment::Single { .. } => {
                        self.visit(segment, segment_node(segment), None);
                        continue;
                    }
                    other => segment_node(other),
                };
                self.base = BaseState::default();
                self.walk = Some(Walk {
                    segment,
                    cursor: node.walk(),
                    started: false,
                });
            }
            let Some(walk) = self.walk.as_mut() else {
                continue;
            };
            let moved = if walk.started {
                walk.cursor.goto_next_sibling()
            } else {
                walk.started = true;
                walk.cursor.goto_first_child()
            };
            if !moved {
                self.walk = None;
                continue;
            }
            let child = walk.cursor.node();
            let field = walk.cursor.field_name();
            let segment = walk.segment;
            self.visit(segment, child, field);
        }
    }
}

fn segment_node(segment: Segment<'_>) -> Node<'_> {
    match segment {
        Segment::TemplateParameters(node)
        | Segment::Parameters(node)
        | Segment::Bases(node)
        | Segment::Enumerators(node) => node,
        Segment::Body { node, .. } | Segment::Single { node, .. } => node,
    }
}

//! Entity construction from the cursor stream.
//!
//! [`EntityBuilder`] walks a translation unit depth-first with an explicit
//! stack of frames, one per open namespace, class or transparent block,
//! and feeds every entity it builds to the [`DeclarationMerger`].

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::cursor_stream::{CursorNode, CursorStream};
use super::diagnostics::DiagnosticAggregator;
use super::merger::DeclarationMerger;
use super::scope_tree::{join_scope, split_scope, ScopeKind, ScopeResolver};
use super::type_normalizer::TypeNormalizer;
use crate::frontend::{Cursor, CursorKind};
use crate::types::{
    AccessSpecifier, BaseSpecifier, Class, ClassKind, Enum, Enumerator, Function, FunctionFlags,
    IncludeEdge, Parameter, SpecializationKind, TemplateParameter, TemplateParameterKind,
    TypeDescriptor, Variable,
};

/// Hex digits kept from the SHA-256 of a function's qualified signature.
const SIGNATURE_HASH_LEN: usize = 16;

/// Overload discriminator: truncated SHA-256 of qualified name plus signature.
pub fn signature_hash(qualified_name: &str, signature: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(qualified_name.as_bytes());
    hasher.update(signature.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..SIGNATURE_HASH_LEN].to_string()
}

/// `operator+`, `operator new`, `operator int` but not `operatorName`.
fn is_operator_name(name: &str) -> bool {
    name.strip_prefix("operator").map_or(false, |rest| {
        !rest.starts_with(|c: char| c.is_alphanumeric() || c == '_')
    })
}

/// A class whose members are being collected.
#[derive(Debug)]
struct ClassFrame {
    class: Class,
    /// Access applying to the next member.
    access: AccessSpecifier,
}

#[derive(Debug)]
enum FrameKind {
    Root,
    /// Number of scope levels the namespace pushed (`a::b::c` pushes three).
    Namespace(usize),
    Class(Box<ClassFrame>),
    /// `extern "C"` blocks, reachable preprocessor blocks and unsupported
    /// constructs whose children are still visited.
    Transparent,
}

struct Frame<I> {
    children: CursorStream<I>,
    kind: FrameKind,
}

/// Builds model entities for one file.
pub struct EntityBuilder<'d> {
    file: String,
    scopes: ScopeResolver,
    merger: DeclarationMerger,
    diagnostics: &'d mut DiagnosticAggregator,
}

impl<'d> EntityBuilder<'d> {
    pub fn new(file: impl Into<String>, diagnostics: &'d mut DiagnosticAggregator) -> Self {
        Self {
            file: file.into(),
            scopes: ScopeResolver::new(),
            merger: DeclarationMerger::new(),
            diagnostics,
        }
    }

    /// Traverse the unit below `root` and return the merged declarations.
    pub fn build<C: Cursor>(mut self, root: C) -> DeclarationMerger {
        let root = match CursorNode::adapt(root) {
            Ok(node) => node,
            Err(error) => {
                self.diagnostics.adapter_error(&error);
                return self.merger;
            }
        };

        let mut stack: Vec<Frame<C::Children>> = vec![Frame {
            children: root.children(),
            kind: FrameKind::Root,
        }];

        while let Some(frame) = stack.last_mut() {
            let Some(next) = frame.children.next() else {
                if let Some(done) = stack.pop() {
                    self.close(done.kind);
                }
                continue;
            };

            let location = match &next {
                Ok(node) => &node.location,
                Err(error) => error.location(),
            };
            if self.diagnostics.should_halt(location) {
                warn!(file = %self.file, line = location.line, "Fatal diagnostic reached, halting traversal");
                self.diagnostics.mark_halted();
                while let Some(done) = stack.pop() {
                    self.close(done.kind);
                }
                break;
            }

            let node = match next {
                Ok(node) => node,
                Err(error) => {
                    self.diagnostics.adapter_error(&error);
                    continue;
                }
            };

            let class = stack
                .iter_mut()
                .rev()
                .find_map(|f| match &mut f.kind {
                    FrameKind::Class(c) => Some(Some(&mut **c)),
                    FrameKind::Transparent => None,
                    _ => Some(None),
                })
                .flatten();

            if let Some(kind) = self.visit(&node, class) {
                stack.push(Frame {
                    children: node.children(),
                    kind,
                });
            }
        }

        self.merger
    }

    /// Handle one cursor; returns a frame when its children must be visited.
    fn visit<C: Cursor>(&mut self, node: &CursorNode<C>, class: Option<&mut ClassFrame>) -> Option<FrameKind> {
        match &node.kind {
            CursorKind::Namespace => Some(self.enter_namespace(node)),
            CursorKind::ClassDecl
            | CursorKind::StructDecl
            | CursorKind::UnionDecl
            | CursorKind::ClassTemplate
            | CursorKind::ClassTemplatePartialSpecialization
            | CursorKind::ClassTemplateSpecialization => Some(self.enter_class(node, class.map(|c| c.access))),
            CursorKind::FunctionDecl
            | CursorKind::CxxMethod
            | CursorKind::Constructor
            | CursorKind::Destructor
            | CursorKind::ConversionFunction
            | CursorKind::FunctionTemplate
            | CursorKind::FunctionTemplateSpecialization => {
                self.add_function(node, class.map(|c| c.access));
                None
            }
            CursorKind::FieldDecl | CursorKind::VarDecl => {
                self.add_variable(node, class.map(|c| c.access));
                None
            }
            CursorKind::EnumDecl => {
                self.add_enum(node, class.map(|c| c.access));
                None
            }
            CursorKind::InclusionDirective => {
                self.add_include(node);
                None
            }
            CursorKind::CxxAccessSpecifier => {
                if let (Some(frame), Some(access)) = (class, node.access()) {
                    frame.access = access;
                }
                None
            }
            CursorKind::CxxBaseSpecifier => {
                if let Some(frame) = class {
                    self.add_base(frame, node);
                }
                None
            }
            CursorKind::TemplateTypeParameter
            | CursorKind::NonTypeTemplateParameter
            | CursorKind::TemplateTemplateParameter => {
                if let Some(frame) = class {
                    let param = self.template_parameter(node);
                    frame.class.template_parameters.push(param);
                }
                None
            }
            CursorKind::TranslationUnit | CursorKind::LinkageSpec => Some(FrameKind::Transparent),
            CursorKind::PreprocessingBlock if node.flags.is_unreachable => {
                debug!(line = node.location.line, "Skipping unreachable block");
                None
            }
            CursorKind::PreprocessingBlock => Some(FrameKind::Transparent),
            other => {
                self.diagnostics.unsupported(&other.name(), &node.location);
                (!node.flags.is_unreachable).then_some(FrameKind::Transparent)
            }
        }
    }

    fn close(&mut self, kind: FrameKind) {
        match kind {
            FrameKind::Namespace(levels) => {
                for _ in 0..levels {
                    self.scopes.pop();
                }
            }
            FrameKind::Class(frame) => {
                self.scopes.pop();
                self.merger.add_class(frame.class, self.diagnostics);
            }
            FrameKind::Root | FrameKind::Transparent => {}
        }
    }

    fn normalizer(&self, scope: &str) -> TypeNormalizer {
        TypeNormalizer::in_scope(scope)
    }

    /// Owning scope and leaf name of a possibly qualified declarator.
    fn owner_and_name(&self, spelling: &str) -> (String, String) {
        if split_scope(spelling).len() > 1 {
            self.scopes
                .resolve_qualified(spelling, |path| self.merger.is_known_scope(path))
        } else {
            (self.scopes.current().to_string(), spelling.to_string())
        }
    }

    fn enter_namespace<C: Cursor>(&mut self, node: &CursorNode<C>) -> FrameKind {
        let is_anonymous = node.spelling.is_empty();
        let names: Vec<String> = if is_anonymous {
            vec![ScopeResolver::anonymous_name(&node.location)]
        } else {
            split_scope(&node.spelling)
                .into_iter()
                .filter(|s| !s.is_empty())
                .map(|s| s.trim_start_matches("inline ").to_string())
                .collect()
        };
        let last = names.len().saturating_sub(1);
        for (i, name) in names.iter().enumerate() {
            let path = self.scopes.push(name, ScopeKind::Namespace);
            let is_inline = i == last && node.flags.is_inline;
            self.merger
                .open_namespace(&path, &node.location, is_inline, is_anonymous);
        }
        FrameKind::Namespace(names.len())
    }

    fn enter_class<C: Cursor>(&mut self, node: &CursorNode<C>, access: Option<AccessSpecifier>) -> FrameKind {
        let kind = if node.has_kind(&CursorKind::StructDecl) {
            ClassKind::Struct
        } else if node.has_kind(&CursorKind::UnionDecl) {
            ClassKind::Union
        } else {
            ClassKind::Class
        };
        let specialization = if node.has_kind(&CursorKind::ClassTemplatePartialSpecialization) {
            SpecializationKind::Partial
        } else if node.has_kind(&CursorKind::ClassTemplateSpecialization) {
            SpecializationKind::Full
        } else {
            SpecializationKind::None
        };

        let (owner, name) = if node.spelling.is_empty() {
            (
                self.scopes.current().to_string(),
                ScopeResolver::anonymous_name(&node.location),
            )
        } else {
            self.owner_and_name(&node.spelling)
        };
        let is_definition = node.flags.is_definition;
        let class = Class {
            qualified_name: join_scope(&owner, &name),
            name: name.clone(),
            owning_scope: owner,
            kind,
            base_classes: Vec::new(),
            base_specifiers: Vec::new(),
            methods: Vec::new(),
            fields: Vec::new(),
            nested_classes: Vec::new(),
            nested_enums: Vec::new(),
            template_parameters: Vec::new(),
            template_arguments: node.template_arguments(),
            specialization,
            is_template: node.has_kind(&CursorKind::ClassTemplate) || specialization != SpecializationKind::None,
            is_abstract: false,
            is_definition,
            access,
            location: node.location.clone(),
            definition_location: is_definition.then(|| node.location.clone()),
        };

        let path = class.scope_path();
        self.merger.register_class_scope(&path);
        self.scopes.push_path(&name, ScopeKind::Class, path);
        FrameKind::Class(Box::new(ClassFrame {
            access: kind.default_access(),
            class,
        }))
    }

    fn add_base<C: Cursor>(&self, frame: &mut ClassFrame, node: &CursorNode<C>) {
        let class = &mut frame.class;
        let name = self
            .normalizer(&class.owning_scope)
            .normalize_spelling(&node.spelling)
            .canonical;
        class.base_specifiers.push(BaseSpecifier {
            name: name.clone(),
            access: node.access().unwrap_or_else(|| class.kind.default_access()),
            is_virtual: node.flags.is_virtual_base,
            resolved: None,
        });
        class.base_classes.push(name);
    }

    fn template_parameter<C: Cursor>(&self, node: &CursorNode<C>) -> TemplateParameter {
        let kind = match node.kind {
            CursorKind::TemplateTypeParameter => TemplateParameterKind::Type,
            CursorKind::NonTypeTemplateParameter => TemplateParameterKind::NonType,
            _ => TemplateParameterKind::Template,
        };
        let ty = match kind {
            TemplateParameterKind::NonType => node
                .ty()
                .map(|raw| self.normalizer(self.scopes.current()).normalize(&raw)),
            _ => None,
        };
        TemplateParameter {
            name: node.spelling.clone(),
            kind,
            ty,
            default_value: node.initializer(),
            is_pack: node.flags.is_pack,
        }
    }

    fn add_function<C: Cursor>(&mut self, node: &CursorNode<C>, access: Option<AccessSpecifier>) {
        let (owner, name) = self.owner_and_name(&node.spelling);
        if name.is_empty() {
            debug!(line = node.location.line, "Skipping unnamed function");
            return;
        }
        let normalizer = self.normalizer(&owner);

        let mut parameters = Vec::new();
        let mut template_parameters = Vec::new();
        for child in node.children() {
            let child = match child {
                Ok(child) => child,
                Err(error) => {
                    self.diagnostics.adapter_error(&error);
                    continue;
                }
            };
            match child.kind {
                CursorKind::ParmDecl => parameters.push(Parameter {
                    name: child.spelling.clone(),
                    ty: child
                        .ty()
                        .map(|raw| normalizer.normalize(&raw))
                        .unwrap_or_else(|| TypeDescriptor::opaque("")),
                    default_value: child.initializer(),
                }),
                CursorKind::TemplateTypeParameter
                | CursorKind::NonTypeTemplateParameter
                | CursorKind::TemplateTemplateParameter => {
                    template_parameters.push(self.template_parameter(&child))
                }
                _ => {}
            }
        }

        let f = node.flags;
        let flags = FunctionFlags {
            is_virtual: f.is_virtual || f.is_pure_virtual,
            is_pure_virtual: f.is_pure_virtual,
            is_static: f.is_static,
            is_const: f.is_const_method,
            is_constructor: node.has_kind(&CursorKind::Constructor),
            is_destructor: node.has_kind(&CursorKind::Destructor),
            is_operator: is_operator_name(&name),
            is_conversion: node.has_kind(&CursorKind::ConversionFunction),
            is_inline: f.is_inline || f.is_constexpr,
            is_explicit: f.is_explicit,
            is_deleted: f.is_deleted,
            is_defaulted: f.is_defaulted,
            is_override: f.is_override,
            is_final: f.is_final,
            is_noexcept: f.is_noexcept,
            is_variadic: f.is_variadic,
            is_definition: f.is_definition,
        };

        let specialization = if node.has_kind(&CursorKind::FunctionTemplateSpecialization) {
            SpecializationKind::Full
        } else {
            SpecializationKind::None
        };
        let template_arguments = node.template_arguments();
        let signature = Self::signature(&name, &template_arguments, &parameters, &flags, f.is_volatile);
        let qualified_name = join_scope(&owner, &name);
        let return_type = node
            .result_type()
            .map(|raw| normalizer.normalize(&raw))
            .unwrap_or_else(TypeDescriptor::void);

        let function = Function {
            signature_hash: signature_hash(&qualified_name, &signature),
            name,
            qualified_name,
            owning_scope: owner,
            return_type,
            parameters,
            flags,
            access,
            template_parameters,
            specialization,
            template_arguments,
            signature,
            location: node.location.clone(),
            definition_location: flags.is_definition.then(|| node.location.clone()),
        };
        self.merger.add_function(function, self.diagnostics);
    }

    /// `area(double) const`, `swap<int>(int&,int&)`, `printf(const char*,...)`.
    fn signature(
        name: &str,
        template_arguments: &[String],
        parameters: &[Parameter],
        flags: &FunctionFlags,
        is_volatile: bool,
    ) -> String {
        let mut params: Vec<String> = parameters.iter().map(|p| p.ty.signature_form()).collect();
        if flags.is_variadic {
            params.push("...".to_string());
        }
        let mut signature = name.to_string();
        if !template_arguments.is_empty() {
            signature.push_str(&format!("<{}>", template_arguments.join(", ")));
        }
        signature.push_str(&format!("({})", params.join(",")));
        if flags.is_const {
            signature.push_str(" const");
        }
        if is_volatile {
            signature.push_str(" volatile");
        }
        signature
    }

    fn add_variable<C: Cursor>(&mut self, node: &CursorNode<C>, access: Option<AccessSpecifier>) {
        let (owner, name) = self.owner_and_name(&node.spelling);
        if name.is_empty() {
            debug!(line = node.location.line, "Skipping unnamed declarator");
            return;
        }
        let ty = node
            .ty()
            .map(|raw| self.normalizer(&owner).normalize(&raw))
            .unwrap_or_else(|| TypeDescriptor::opaque(""));
        let f = node.flags;
        let variable = Variable {
            qualified_name: join_scope(&owner, &name),
            is_member: node.has_kind(&CursorKind::FieldDecl) || self.merger.is_class_scope(&owner),
            name,
            owning_scope: owner,
            is_const: f.is_constexpr || ty.is_top_level_const(),
            ty,
            is_static: f.is_static,
            is_constexpr: f.is_constexpr,
            is_extern: f.is_extern,
            is_mutable: f.is_mutable,
            initializer: node.initializer(),
            access,
            is_definition: f.is_definition,
            location: node.location.clone(),
        };
        self.merger.add_variable(variable, self.diagnostics);
    }

    fn add_enum<C: Cursor>(&mut self, node: &CursorNode<C>, access: Option<AccessSpecifier>) {
        let (owner, name) = if node.spelling.is_empty() {
            (
                self.scopes.current().to_string(),
                ScopeResolver::anonymous_name(&node.location),
            )
        } else {
            self.owner_and_name(&node.spelling)
        };

        let mut enumerators = Vec::new();
        for child in node.children() {
            match child {
                Ok(child) if child.kind == CursorKind::EnumConstantDecl => enumerators.push(Enumerator {
                    value: child.initializer(),
                    name: child.spelling,
                    location: child.location,
                }),
                Ok(_) => {}
                Err(error) => self.diagnostics.adapter_error(&error),
            }
        }

        let item = Enum {
            qualified_name: join_scope(&owner, &name),
            name,
            underlying_type: node.ty().map(|raw| self.normalizer(&owner).normalize(&raw)),
            owning_scope: owner,
            is_scoped: node.flags.is_scoped_enum,
            enumerators,
            access,
            is_definition: node.flags.is_definition,
            location: node.location.clone(),
        };
        self.merger.add_enum(item, self.diagnostics);
    }

    fn add_include<C: Cursor>(&mut self, node: &CursorNode<C>) {
        let Some(target) = node.include() else {
            return;
        };
        self.merger.add_include(IncludeEdge {
            including_file: self.file.clone(),
            included: target.spelling,
            is_found: target.resolved_path.is_some(),
            resolved_path: target.resolved_path,
            is_system: target.is_system,
            location: node.location.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast_engine::merger::WorkingSet;
    use crate::frontend::{FrontEnd, TranslationUnit, TreeSitterFrontEnd};
    use crate::types::{Diagnostic, DiagnosticCategory, Severity, SourceLocation};
    use pretty_assertions::assert_eq;

    fn build_with(source: &str, diags: &mut DiagnosticAggregator) -> WorkingSet {
        let unit = TreeSitterFrontEnd::new().parse("test.cpp", source, &[]).unwrap();
        diags.ingest_front_end(unit.diagnostics());
        EntityBuilder::new("test.cpp", diags)
            .build(unit.root())
            .into_working_set()
    }

    fn build(source: &str) -> (WorkingSet, Vec<Diagnostic>) {
        let mut diags = DiagnosticAggregator::new("test.cpp");
        let set = build_with(source, &mut diags);
        (set, diags.finish().0)
    }

    #[test]
    fn test_signature_hash_is_stable() {
        let a = signature_hash("geo::area", "area(double)");
        assert_eq!(a.len(), SIGNATURE_HASH_LEN);
        assert_eq!(a, signature_hash("geo::area", "area(double)"));
        assert_ne!(a, signature_hash("geo::area", "area(int)"));
    }

    #[test]
    fn test_operator_names() {
        assert!(is_operator_name("operator+"));
        assert!(is_operator_name("operator new"));
        assert!(is_operator_name("operator()"));
        assert!(!is_operator_name("operatorCount"));
        assert!(!is_operator_name("add"));
    }

    #[test]
    fn test_members_with_access() {
        let (set, _) = build(
            "class Calculator {\npublic:\n  virtual double calculate(double a, double b) const = 0;\nprotected:\n  int precision_ = 2;\n};\n",
        );
        assert_eq!(set.classes.len(), 1);
        assert_eq!(set.classes[0].qualified_name, "Calculator");

        let f = &set.functions[0];
        assert_eq!(f.qualified_name, "Calculator::calculate");
        assert_eq!(f.owning_scope, "Calculator");
        assert_eq!(f.signature, "calculate(double,double) const");
        assert_eq!(f.access, Some(AccessSpecifier::Public));
        assert!(f.flags.is_pure_virtual && f.flags.is_virtual && f.flags.is_const);
        assert_eq!(f.parameters[0].name, "a");

        let v = &set.variables[0];
        assert_eq!(v.qualified_name, "Calculator::precision_");
        assert_eq!(v.access, Some(AccessSpecifier::Protected));
        assert!(v.is_member);
        assert_eq!(v.initializer.as_deref(), Some("2"));
    }

    #[test]
    fn test_out_of_line_definition_merges_with_declaration() {
        let (set, diagnostics) = build(
            "namespace geo {\nclass Shape {\npublic:\n  double area(int scale = 1) const;\n};\ndouble Shape::area(int scale) const { return 0; }\n}\n",
        );
        assert_eq!(set.functions.len(), 1);
        let f = &set.functions[0];
        assert_eq!(f.qualified_name, "geo::Shape::area");
        assert!(f.flags.is_definition);
        assert_eq!(f.access, Some(AccessSpecifier::Public));
        assert_eq!(f.parameters[0].default_value.as_deref(), Some("1"));
        assert_eq!(f.location.line, 4);
        assert_eq!(f.definition_location.as_ref().map(|l| l.line), Some(6));
        assert!(diagnostics.iter().all(|d| d.severity < Severity::Warning));
    }

    #[test]
    fn test_nested_namespace_definition() {
        let (set, _) = build("namespace a::b::c {\nint value;\n}\n");
        let names: Vec<_> = set.namespaces.iter().map(|n| n.qualified_name.as_str()).collect();
        assert_eq!(names, vec!["", "a", "a::b", "a::b::c"]);
        assert_eq!(set.variables[0].qualified_name, "a::b::c::value");
    }

    #[test]
    fn test_class_template_and_specialization() {
        let (set, _) = build(
            "template <typename T, int N = 4>\nclass Buffer { T data[N]; };\ntemplate <>\nclass Buffer<bool, 8> { };\n",
        );
        assert_eq!(set.classes.len(), 2);
        let primary = &set.classes[0];
        assert!(primary.is_template);
        assert_eq!(primary.specialization, SpecializationKind::None);
        assert_eq!(primary.template_parameters.len(), 2);
        assert_eq!(primary.template_parameters[0].name, "T");
        assert_eq!(primary.template_parameters[0].kind, TemplateParameterKind::Type);
        assert_eq!(primary.template_parameters[1].default_value.as_deref(), Some("4"));

        let full = &set.classes[1];
        assert_eq!(full.specialization, SpecializationKind::Full);
        assert_eq!(full.template_arguments, vec!["bool".to_string(), "8".to_string()]);
    }

    #[test]
    fn test_enum_and_include() {
        let (set, _) = build("#include <vector>\nenum class Color : unsigned char { Red, Green = 3 };\n");
        assert_eq!(set.includes.len(), 1);
        assert_eq!(set.includes[0].included, "vector");
        assert!(set.includes[0].is_system);

        let color = &set.enums[0];
        assert!(color.is_scoped);
        assert_eq!(color.underlying_type.as_ref().map(|t| t.canonical.as_str()), Some("unsigned char"));
        let names: Vec<_> = color.enumerators.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Red", "Green"]);
        assert_eq!(color.enumerators[1].value.as_deref(), Some("3"));
    }

    #[test]
    fn test_unsupported_construct_is_a_note() {
        let (set, diagnostics) = build("typedef int Id;\nusing Name = int;\nint counter;\n");
        assert_eq!(set.variables.len(), 1);
        let notes: Vec<_> = diagnostics
            .iter()
            .filter(|d| d.category == DiagnosticCategory::UnsupportedConstruct)
            .collect();
        assert_eq!(notes.len(), 2);
        assert!(notes.iter().all(|d| d.severity == Severity::Note));
    }

    #[test]
    fn test_disabled_block_is_skipped() {
        let (set, _) = build("#if 0\nint hidden;\n#endif\nint shown;\n");
        let names: Vec<_> = set.variables.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["shown"]);
    }

    #[test]
    fn test_halt_keeps_entities_before_fatal() {
        let source = "int before;\nclass Open {\n  int a;\n  int b;\n};\nint after;\n";
        let halt_at = source.find("int b").unwrap();
        let mut diags = DiagnosticAggregator::new("test.cpp");
        diags.push(Diagnostic::new(
            Severity::Fatal,
            DiagnosticCategory::FrontEnd,
            "fatal error",
            Some(SourceLocation::new("test.cpp", 4, 3, halt_at)),
        ));
        let set = build_with(source, &mut diags);

        assert!(diags.is_halted());
        let names: Vec<_> = set.variables.iter().map(|v| v.qualified_name.as_str()).collect();
        assert_eq!(names, vec!["before", "Open::a"]);
        assert_eq!(set.classes.len(), 1);
        assert_eq!(set.classes[0].name, "Open");
    }
}

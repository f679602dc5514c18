//! Declaration merging.
//!
//! C++ lets an entity be declared many times and defined once, and a file
//! analyzed in isolation routinely shows both. The merger folds every
//! sighting of the same entity into one record, keyed by [`EntityKey`].

use std::collections::{HashMap, HashSet};

use tracing::debug;

use super::diagnostics::DiagnosticAggregator;
use super::scope_tree::{parent_scope, split_scope};
use crate::types::{
    Class, EntityKind, Enum, Function, FunctionFlags, IncludeEdge, Namespace, Parameter,
    SourceLocation, SpecializationKind, Variable,
};

/// Identity of an entity across its declarations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKey {
    pub scope: String,
    pub kind: EntityKind,
    pub name: String,
    /// Signature for functions, specialization arguments for classes.
    pub discriminator: String,
}

impl EntityKey {
    pub fn of_class(class: &Class) -> Self {
        let discriminator = if class.specialization == SpecializationKind::None {
            String::new()
        } else {
            class.template_arguments.join(", ")
        };
        Self {
            scope: class.owning_scope.clone(),
            kind: EntityKind::Class,
            name: class.name.clone(),
            discriminator,
        }
    }

    pub fn of_function(function: &Function) -> Self {
        Self {
            scope: function.owning_scope.clone(),
            kind: EntityKind::Function,
            name: function.name.clone(),
            discriminator: function.signature.clone(),
        }
    }

    pub fn of_variable(variable: &Variable) -> Self {
        Self {
            scope: variable.owning_scope.clone(),
            kind: EntityKind::Variable,
            name: variable.name.clone(),
            discriminator: String::new(),
        }
    }

    pub fn of_enum(item: &Enum) -> Self {
        Self {
            scope: item.owning_scope.clone(),
            kind: EntityKind::Enum,
            name: item.name.clone(),
            discriminator: String::new(),
        }
    }
}

/// Flat arena of one entity kind with key lookup.
#[derive(Debug)]
struct Arena<T> {
    items: Vec<T>,
    index: HashMap<EntityKey, usize>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T> Arena<T> {
    /// Insert a new entity, or hand back the existing one under the same key.
    fn entry(&mut self, key: EntityKey, item: T) -> Option<(&mut T, T)> {
        match self.index.get(&key) {
            Some(&i) => Some((&mut self.items[i], item)),
            None => {
                self.index.insert(key, self.items.len());
                self.items.push(item);
                None
            }
        }
    }
}

/// Entities of one file after merging, in first-sighting order.
#[derive(Debug, Default)]
pub struct WorkingSet {
    /// Namespace tree, global namespace first.
    pub namespaces: Vec<Namespace>,
    pub classes: Vec<Class>,
    /// Free functions and methods; methods are owned by a class scope.
    pub functions: Vec<Function>,
    /// Namespace variables and data members.
    pub variables: Vec<Variable>,
    pub enums: Vec<Enum>,
    pub includes: Vec<IncludeEdge>,
}

#[derive(Debug)]
pub struct DeclarationMerger {
    namespaces: Vec<Namespace>,
    namespace_index: HashMap<String, usize>,
    class_scopes: HashSet<String>,
    classes: Arena<Class>,
    functions: Arena<Function>,
    variables: Arena<Variable>,
    enums: Arena<Enum>,
    includes: Vec<IncludeEdge>,
}

impl Default for DeclarationMerger {
    fn default() -> Self {
        Self::new()
    }
}

impl DeclarationMerger {
    pub fn new() -> Self {
        let global = Namespace {
            name: String::new(),
            qualified_name: String::new(),
            parent: None,
            is_inline: false,
            is_anonymous: false,
            entities: Vec::new(),
            child_namespaces: Vec::new(),
            location: None,
        };
        Self {
            namespaces: vec![global],
            namespace_index: HashMap::from([(String::new(), 0)]),
            class_scopes: HashSet::new(),
            classes: Arena::default(),
            functions: Arena::default(),
            variables: Arena::default(),
            enums: Arena::default(),
            includes: Vec::new(),
        }
    }

    /// Look up or create a namespace, creating missing ancestors.
    pub fn open_namespace(
        &mut self,
        qualified_name: &str,
        location: &SourceLocation,
        is_inline: bool,
        is_anonymous: bool,
    ) {
        if let Some(&i) = self.namespace_index.get(qualified_name) {
            self.namespaces[i].is_inline |= is_inline;
            return;
        }
        let parent = parent_scope(qualified_name).unwrap_or_default();
        if !self.namespace_index.contains_key(&parent) {
            self.open_namespace(&parent, location, false, false);
        }
        let name = split_scope(qualified_name)
            .last()
            .map(|s| s.to_string())
            .unwrap_or_default();
        if let Some(&p) = self.namespace_index.get(&parent) {
            self.namespaces[p].child_namespaces.push(qualified_name.to_string());
        }
        debug!(namespace = qualified_name, "Opened namespace");
        self.namespace_index
            .insert(qualified_name.to_string(), self.namespaces.len());
        self.namespaces.push(Namespace {
            name,
            qualified_name: qualified_name.to_string(),
            parent: Some(parent),
            is_inline,
            is_anonymous,
            entities: Vec::new(),
            child_namespaces: Vec::new(),
            location: Some(location.clone()),
        });
    }

    pub fn register_class_scope(&mut self, path: &str) {
        self.class_scopes.insert(path.to_string());
    }

    pub fn is_class_scope(&self, path: &str) -> bool {
        self.class_scopes.contains(path)
    }

    /// Whether `path` names a namespace or class seen so far.
    pub fn is_known_scope(&self, path: &str) -> bool {
        self.namespace_index.contains_key(path) || self.class_scopes.contains(path)
    }

    pub fn add_include(&mut self, edge: IncludeEdge) {
        self.includes.push(edge);
    }

    pub fn add_class(&mut self, class: Class, diagnostics: &mut DiagnosticAggregator) {
        self.class_scopes.insert(class.scope_path());
        let key = EntityKey::of_class(&class);
        let Some((existing, incoming)) = self.classes.entry(key, class) else {
            return;
        };
        match (existing.is_definition, incoming.is_definition) {
            (false, true) => {
                debug!(class = %existing.qualified_name, "Merged definition into declaration");
                existing.is_definition = true;
                existing.kind = incoming.kind;
                existing.base_classes = incoming.base_classes;
                existing.base_specifiers = incoming.base_specifiers;
                existing.definition_location = Some(incoming.location);
                if existing.template_parameters.is_empty() {
                    existing.template_parameters = incoming.template_parameters;
                }
                existing.is_template |= incoming.is_template;
            }
            (true, true) => diagnostics.merge_conflict(
                format!(
                    "class `{}` is defined more than once, keeping the first definition",
                    existing.qualified_name
                ),
                &incoming.location,
            ),
            _ => {
                if existing.template_parameters.is_empty() {
                    existing.template_parameters = incoming.template_parameters;
                }
            }
        }
        existing.access = existing.access.or(incoming.access);
    }

    pub fn add_function(&mut self, function: Function, diagnostics: &mut DiagnosticAggregator) {
        let key = EntityKey::of_function(&function);
        let Some((existing, incoming)) = self.functions.entry(key, function) else {
            return;
        };
        match (existing.flags.is_definition, incoming.flags.is_definition) {
            (false, true) => {
                debug!(function = %existing.qualified_name, signature = %existing.signature, "Merged definition into declaration");
                let declared = existing.clone();
                *existing = incoming;
                existing.flags = merge_specifiers(&declared.flags, &existing.flags);
                fill_defaults(&mut existing.parameters, &declared.parameters);
                existing.access = declared.access.or(existing.access);
                if !declared.template_parameters.is_empty() {
                    existing.template_parameters = declared.template_parameters;
                }
                existing.definition_location = Some(existing.location.clone());
                existing.location = declared.location;
            }
            (true, true) => {
                let conflicts = existing.flags.differences(&incoming.flags);
                if !conflicts.is_empty() {
                    diagnostics.merge_conflict(
                        format!(
                            "conflicting definitions of `{}` differ in {}, keeping the first",
                            existing.signature,
                            conflicts.join(", ")
                        ),
                        &incoming.location,
                    );
                }
            }
            _ => {
                existing.flags = merge_specifiers(&incoming.flags, &existing.flags);
                fill_defaults(&mut existing.parameters, &incoming.parameters);
                existing.access = existing.access.or(incoming.access);
                if existing.template_parameters.is_empty() {
                    existing.template_parameters = incoming.template_parameters;
                }
            }
        }
    }

    pub fn add_variable(&mut self, variable: Variable, diagnostics: &mut DiagnosticAggregator) {
        let key = EntityKey::of_variable(&variable);
        let Some((existing, incoming)) = self.variables.entry(key, variable) else {
            return;
        };
        match (existing.is_definition, incoming.is_definition) {
            (false, true) => {
                existing.ty = incoming.ty;
                existing.initializer = incoming.initializer.or(existing.initializer.take());
                existing.is_definition = true;
                existing.is_const |= incoming.is_const;
                existing.is_constexpr |= incoming.is_constexpr;
            }
            (true, true) => {
                let mut conflicts = Vec::new();
                if existing.ty != incoming.ty {
                    conflicts.push("type");
                }
                if existing.initializer != incoming.initializer {
                    conflicts.push("initializer");
                }
                if !conflicts.is_empty() {
                    diagnostics.merge_conflict(
                        format!(
                            "conflicting definitions of `{}` differ in {}, keeping the first",
                            existing.qualified_name,
                            conflicts.join(", ")
                        ),
                        &incoming.location,
                    );
                }
            }
            _ => {}
        }
        existing.is_static |= incoming.is_static;
        existing.is_member |= incoming.is_member;
        existing.access = existing.access.or(incoming.access);
    }

    pub fn add_enum(&mut self, item: Enum, diagnostics: &mut DiagnosticAggregator) {
        let key = EntityKey::of_enum(&item);
        let Some((existing, incoming)) = self.enums.entry(key, item) else {
            return;
        };
        match (existing.is_definition, incoming.is_definition) {
            (false, true) => {
                existing.enumerators = incoming.enumerators;
                existing.is_definition = true;
                existing.underlying_type = existing.underlying_type.take().or(incoming.underlying_type);
            }
            (true, true) => {
                let names = |e: &Enum| e.enumerators.iter().map(|v| v.name.clone()).collect::<Vec<_>>();
                if names(&*existing) != names(&incoming) {
                    diagnostics.merge_conflict(
                        format!(
                            "conflicting definitions of enum `{}`, keeping the first",
                            existing.qualified_name
                        ),
                        &incoming.location,
                    );
                }
            }
            _ => {}
        }
        existing.is_scoped |= incoming.is_scoped;
        existing.access = existing.access.or(incoming.access);
    }

    pub fn into_working_set(self) -> WorkingSet {
        WorkingSet {
            namespaces: self.namespaces,
            classes: self.classes.items,
            functions: self.functions.items,
            variables: self.variables.items,
            enums: self.enums.items,
            includes: self.includes,
        }
    }
}

/// Combine a declaration's specifiers with a definition's flags.
///
/// Specifiers that may only appear on the in-class declaration are OR-ed
/// in; everything else comes from `definition`.
fn merge_specifiers(declaration: &FunctionFlags, definition: &FunctionFlags) -> FunctionFlags {
    FunctionFlags {
        is_virtual: declaration.is_virtual || definition.is_virtual,
        is_pure_virtual: declaration.is_pure_virtual || definition.is_pure_virtual,
        is_static: declaration.is_static || definition.is_static,
        is_explicit: declaration.is_explicit || definition.is_explicit,
        is_override: declaration.is_override || definition.is_override,
        is_final: declaration.is_final || definition.is_final,
        is_inline: declaration.is_inline || definition.is_inline,
        is_deleted: declaration.is_deleted || definition.is_deleted,
        is_defaulted: declaration.is_defaulted || definition.is_defaulted,
        is_noexcept: declaration.is_noexcept || definition.is_noexcept,
        ..*definition
    }
}

/// Default arguments live on the first declaration; parameter names
/// prefer whichever sighting spelled them.
fn fill_defaults(target: &mut [Parameter], source: &[Parameter]) {
    for (param, other) in target.iter_mut().zip(source) {
        if param.default_value.is_none() {
            param.default_value = other.default_value.clone();
        }
        if param.name.is_empty() {
            param.name = other.name.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccessSpecifier, ClassKind, DiagnosticCategory, TypeDescriptor};
    use pretty_assertions::assert_eq;

    fn loc(line: u32) -> SourceLocation {
        SourceLocation::new("shapes.cpp", line, 1, line as usize * 10)
    }

    fn method(line: u32, flags: FunctionFlags) -> Function {
        Function {
            name: "area".into(),
            qualified_name: "geo::Shape::area".into(),
            owning_scope: "geo::Shape".into(),
            return_type: TypeDescriptor::opaque("double"),
            parameters: vec![Parameter {
                name: String::new(),
                ty: TypeDescriptor::opaque("int"),
                default_value: None,
            }],
            flags,
            access: None,
            template_parameters: Vec::new(),
            specialization: SpecializationKind::None,
            template_arguments: Vec::new(),
            signature: "area(int) const".into(),
            signature_hash: "0123456789abcdef".into(),
            location: loc(line),
            definition_location: None,
        }
    }

    fn class(line: u32, is_definition: bool) -> Class {
        Class {
            name: "Shape".into(),
            qualified_name: "geo::Shape".into(),
            owning_scope: "geo".into(),
            kind: ClassKind::Class,
            base_classes: Vec::new(),
            base_specifiers: Vec::new(),
            methods: Vec::new(),
            fields: Vec::new(),
            nested_classes: Vec::new(),
            nested_enums: Vec::new(),
            template_parameters: Vec::new(),
            template_arguments: Vec::new(),
            specialization: SpecializationKind::None,
            is_template: false,
            is_abstract: false,
            is_definition,
            access: None,
            location: loc(line),
            definition_location: None,
        }
    }

    #[test]
    fn test_declaration_then_definition_merges() {
        let mut merger = DeclarationMerger::new();
        let mut diags = DiagnosticAggregator::new("shapes.cpp");

        let mut declared = method(3, FunctionFlags { is_virtual: true, is_const: true, ..Default::default() });
        declared.access = Some(AccessSpecifier::Public);
        declared.parameters[0].default_value = Some("1".into());
        merger.add_function(declared, &mut diags);

        let mut defined = method(10, FunctionFlags { is_const: true, is_definition: true, ..Default::default() });
        defined.parameters[0].name = "scale".into();
        merger.add_function(defined, &mut diags);

        let set = merger.into_working_set();
        assert_eq!(set.functions.len(), 1);
        let f = &set.functions[0];
        assert!(f.flags.is_virtual);
        assert!(f.flags.is_definition);
        assert_eq!(f.access, Some(AccessSpecifier::Public));
        assert_eq!(f.parameters[0].name, "scale");
        assert_eq!(f.parameters[0].default_value.as_deref(), Some("1"));
        assert_eq!(f.location, loc(3));
        assert_eq!(f.definition_location, Some(loc(10)));
        assert!(diags.finish().0.is_empty());
    }

    #[test]
    fn test_conflicting_definitions_warn_and_keep_first() {
        let mut merger = DeclarationMerger::new();
        let mut diags = DiagnosticAggregator::new("shapes.cpp");
        merger.add_function(method(3, FunctionFlags { is_definition: true, ..Default::default() }), &mut diags);
        merger.add_function(
            method(9, FunctionFlags { is_definition: true, is_inline: true, ..Default::default() }),
            &mut diags,
        );

        let set = merger.into_working_set();
        assert_eq!(set.functions.len(), 1);
        assert!(!set.functions[0].flags.is_inline);
        let (diagnostics, _) = diags.finish();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].category, DiagnosticCategory::MergeConflict);
        assert!(diagnostics[0].message.contains("is_inline"));
    }

    #[test]
    fn test_overloads_stay_apart() {
        let mut merger = DeclarationMerger::new();
        let mut diags = DiagnosticAggregator::new("shapes.cpp");
        merger.add_function(method(3, FunctionFlags::default()), &mut diags);
        let mut other = method(4, FunctionFlags::default());
        other.signature = "area(double) const".into();
        merger.add_function(other, &mut diags);
        assert_eq!(merger.into_working_set().functions.len(), 2);
    }

    #[test]
    fn test_forward_declared_class_merges_with_definition() {
        let mut merger = DeclarationMerger::new();
        let mut diags = DiagnosticAggregator::new("shapes.cpp");
        merger.add_class(class(1, false), &mut diags);
        let mut defined = class(5, true);
        defined.base_classes = vec!["Base".into()];
        merger.add_class(defined, &mut diags);

        assert!(merger.is_known_scope("geo::Shape"));
        let set = merger.into_working_set();
        assert_eq!(set.classes.len(), 1);
        assert!(set.classes[0].is_definition);
        assert_eq!(set.classes[0].base_classes, vec!["Base".to_string()]);
        assert_eq!(set.classes[0].location, loc(1));
        assert_eq!(set.classes[0].definition_location, Some(loc(5)));
    }

    #[test]
    fn test_namespace_lookup_or_create() {
        let mut merger = DeclarationMerger::new();
        merger.open_namespace("a::b", &loc(1), false, false);
        merger.open_namespace("a", &loc(7), false, false);
        merger.open_namespace("a::b", &loc(9), true, false);

        let set = merger.into_working_set();
        let names: Vec<_> = set.namespaces.iter().map(|n| n.qualified_name.as_str()).collect();
        assert_eq!(names, vec!["", "a", "a::b"]);
        assert_eq!(set.namespaces[0].child_namespaces, vec!["a".to_string()]);
        assert_eq!(set.namespaces[1].child_namespaces, vec!["a::b".to_string()]);
        assert!(set.namespaces[2].is_inline);
        assert_eq!(set.namespaces[2].parent.as_deref(), Some("a"));
    }
}

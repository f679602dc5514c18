//! Final validation and assembly of the per-file model.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::debug;

use super::diagnostics::DiagnosticAggregator;
use super::merger::WorkingSet;
use super::scope_tree::{join_scope, parent_scope, split_scope, strip_template_arguments};
use crate::types::{
    Class, EntityKind, EntityRef, Enum, Function, IncludeEdge, Namespace, Severity,
    SourceLocation, SpecializationKind, TypeDescriptor, Variable,
};
use crate::SCOPE_SEPARATOR;

/// Entities of one file, validated and arranged for output.
#[derive(Debug, Default)]
pub struct AssembledModel {
    pub classes: Vec<Class>,
    /// Free functions; methods live in their class.
    pub functions: Vec<Function>,
    /// Namespace-scope variables; data members live in their class.
    pub variables: Vec<Variable>,
    pub enums: Vec<Enum>,
    pub namespaces: Vec<Namespace>,
    pub includes: Vec<IncludeEdge>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ModelAssembler {
    resolve_bases: bool,
}

impl ModelAssembler {
    pub fn new(resolve_bases: bool) -> Self {
        Self { resolve_bases }
    }

    pub fn assemble(&self, set: WorkingSet, diagnostics: &mut DiagnosticAggregator) -> AssembledModel {
        let WorkingSet {
            mut namespaces,
            mut classes,
            mut functions,
            mut variables,
            mut enums,
            mut includes,
        } = set;

        let namespace_paths: HashSet<String> =
            namespaces.iter().map(|n| n.qualified_name.clone()).collect();
        let class_scopes: HashSet<String> = classes.iter().map(Class::scope_path).collect();
        let scopes = ScopeIndex {
            namespaces: &namespace_paths,
            classes: &class_scopes,
        };

        for class in &mut classes {
            scopes.rehome(&mut class.owning_scope, &class.qualified_name, &class.location, diagnostics);
        }
        for function in &mut functions {
            scopes.rehome(&mut function.owning_scope, &function.qualified_name, &function.location, diagnostics);
        }
        for variable in &mut variables {
            scopes.rehome(&mut variable.owning_scope, &variable.qualified_name, &variable.location, diagnostics);
        }
        for item in &mut enums {
            scopes.rehome(&mut item.owning_scope, &item.qualified_name, &item.location, diagnostics);
        }

        check_unique(&classes, &functions, &variables, &enums, diagnostics);
        check_type_names(&classes, &enums, diagnostics);
        for class in &mut classes {
            check_template_parameters(class, diagnostics);
        }

        // Members into their classes.
        let class_index: HashMap<String, usize> = classes
            .iter()
            .enumerate()
            .map(|(i, c)| (c.scope_path(), i))
            .collect();
        let mut free_functions = Vec::new();
        for function in functions.drain(..) {
            match class_index.get(&function.owning_scope) {
                Some(&i) => classes[i].methods.push(function),
                None => free_functions.push(function),
            }
        }
        let mut free_variables = Vec::new();
        for variable in variables.drain(..) {
            match class_index.get(&variable.owning_scope) {
                Some(&i) => classes[i].fields.push(variable),
                None => free_variables.push(variable),
            }
        }

        classes.sort_by(|a, b| a.location.sort_key().cmp(&b.location.sort_key()));
        free_functions.sort_by(|a, b| a.location.sort_key().cmp(&b.location.sort_key()));
        free_variables.sort_by(|a, b| a.location.sort_key().cmp(&b.location.sort_key()));
        enums.sort_by(|a, b| a.location.sort_key().cmp(&b.location.sort_key()));
        includes.sort_by(|a, b| a.location.sort_key().cmp(&b.location.sort_key()));
        for class in &mut classes {
            class.methods.sort_by(|a, b| a.location.sort_key().cmp(&b.location.sort_key()));
            class.fields.sort_by(|a, b| a.location.sort_key().cmp(&b.location.sort_key()));
        }

        let class_index: HashMap<String, usize> = classes
            .iter()
            .enumerate()
            .map(|(i, c)| (c.scope_path(), i))
            .collect();
        let nested: Vec<(usize, String)> = classes
            .iter()
            .filter_map(|c| class_index.get(&c.owning_scope).map(|&i| (i, c.qualified_name.clone())))
            .collect();
        for (i, name) in nested {
            classes[i].nested_classes.push(name);
        }
        for item in &enums {
            if let Some(&i) = class_index.get(&item.owning_scope) {
                classes[i].nested_enums.push(item.qualified_name.clone());
            }
        }

        if self.resolve_bases {
            resolve_bases(&mut classes);
        }
        mark_abstract(&mut classes, &enums);

        // Namespace listings, in source order.
        let namespace_index: HashMap<String, usize> = namespaces
            .iter()
            .enumerate()
            .map(|(i, n)| (n.qualified_name.clone(), i))
            .collect();
        let mut listed: Vec<(&str, &SourceLocation, EntityRef)> = Vec::new();
        for class in &classes {
            listed.push((
                class.owning_scope.as_str(),
                &class.location,
                entity_ref(EntityKind::Class, &class.qualified_name, None),
            ));
        }
        for function in &free_functions {
            listed.push((
                function.owning_scope.as_str(),
                &function.location,
                entity_ref(EntityKind::Function, &function.qualified_name, Some(&function.signature)),
            ));
        }
        for variable in &free_variables {
            listed.push((
                variable.owning_scope.as_str(),
                &variable.location,
                entity_ref(EntityKind::Variable, &variable.qualified_name, None),
            ));
        }
        for item in &enums {
            listed.push((
                item.owning_scope.as_str(),
                &item.location,
                entity_ref(EntityKind::Enum, &item.qualified_name, None),
            ));
        }
        listed.sort_by(|a, b| a.1.sort_key().cmp(&b.1.sort_key()));
        for (owner, _, entity) in listed {
            if let Some(&i) = namespace_index.get(owner) {
                namespaces[i].entities.push(entity);
            }
        }

        debug!(
            classes = classes.len(),
            functions = free_functions.len(),
            variables = free_variables.len(),
            namespaces = namespaces.len(),
            "Assembled model"
        );

        AssembledModel {
            classes,
            functions: free_functions,
            variables: free_variables,
            enums,
            namespaces,
            includes,
        }
    }
}

fn entity_ref(kind: EntityKind, qualified_name: &str, signature: Option<&String>) -> EntityRef {
    EntityRef {
        kind,
        qualified_name: qualified_name.to_string(),
        signature: signature.cloned(),
    }
}

struct ScopeIndex<'a> {
    namespaces: &'a HashSet<String>,
    classes: &'a HashSet<String>,
}

impl ScopeIndex<'_> {
    fn contains(&self, path: &str) -> bool {
        self.namespaces.contains(path) || self.classes.contains(path)
    }

    /// Move an entity whose owner is not part of this file to the nearest
    /// enclosing scope that is.
    fn rehome(
        &self,
        owner: &mut String,
        qualified_name: &str,
        location: &SourceLocation,
        diagnostics: &mut DiagnosticAggregator,
    ) {
        if self.contains(owner) {
            return;
        }
        let mut ancestor = parent_scope(owner);
        while let Some(candidate) = ancestor {
            if self.contains(&candidate) {
                diagnostics.validation(
                    Severity::Note,
                    format!(
                        "owner `{}` of `{}` is not declared in this file, attached to {}",
                        owner,
                        qualified_name,
                        display_scope(&candidate)
                    ),
                    Some(location),
                );
                *owner = candidate;
                return;
            }
            ancestor = parent_scope(&candidate);
        }
        *owner = String::new();
    }
}

fn display_scope(scope: &str) -> String {
    if scope.is_empty() {
        "the global namespace".to_string()
    } else {
        format!("`{}`", scope)
    }
}

/// Entities that would share an identity once their owners are known:
/// same owner, kind and name, with the same signature for functions and
/// the same arguments for class specializations.
fn check_unique(
    classes: &[Class],
    functions: &[Function],
    variables: &[Variable],
    enums: &[Enum],
    diagnostics: &mut DiagnosticAggregator,
) {
    let mut entries: Vec<(&str, EntityKind, &str, String, &SourceLocation)> = Vec::new();
    for c in classes {
        let args = c.template_arguments.join(", ");
        entries.push((c.owning_scope.as_str(), EntityKind::Class, c.name.as_str(), args, &c.location));
    }
    for f in functions {
        let signature = f.signature.clone();
        entries.push((f.owning_scope.as_str(), EntityKind::Function, f.name.as_str(), signature, &f.location));
    }
    for v in variables {
        entries.push((v.owning_scope.as_str(), EntityKind::Variable, v.name.as_str(), String::new(), &v.location));
    }
    for e in enums {
        entries.push((e.owning_scope.as_str(), EntityKind::Enum, e.name.as_str(), String::new(), &e.location));
    }

    let mut seen = HashSet::new();
    for (owner, kind, name, discriminator, location) in entries {
        if !seen.insert((owner, kind, name, discriminator)) {
            diagnostics.validation(
                Severity::Warning,
                format!("{} `{}` is declared more than once in {}", kind, name, display_scope(owner)),
                Some(location),
            );
        }
    }
}

/// A class and an enum may not share a qualified name within one scope.
fn check_type_names(classes: &[Class], enums: &[Enum], diagnostics: &mut DiagnosticAggregator) {
    let class_names: HashSet<&str> = classes
        .iter()
        .filter(|c| c.specialization == SpecializationKind::None)
        .map(|c| c.qualified_name.as_str())
        .collect();
    for item in enums {
        if class_names.contains(item.qualified_name.as_str()) {
            diagnostics.validation(
                Severity::Warning,
                format!("`{}` names both a class and an enum", item.qualified_name),
                Some(&item.location),
            );
        }
    }
}

fn check_template_parameters(class: &mut Class, diagnostics: &mut DiagnosticAggregator) {
    let has_params = !class.template_parameters.is_empty();
    if has_params && !class.is_template {
        diagnostics.validation(
            Severity::Warning,
            format!("`{}` has template parameters but is not a template", class.qualified_name),
            Some(&class.location),
        );
        class.is_template = true;
    } else if class.is_template && class.specialization == SpecializationKind::None && !has_params {
        diagnostics.validation(
            Severity::Warning,
            format!("class template `{}` has no template parameters", class.qualified_name),
            Some(&class.location),
        );
    }
}

/// Match base spellings to classes of this file: exact qualified name from
/// the derived class's scope outward, then the primary template.
fn resolve_bases(classes: &mut [Class]) {
    let by_scope: HashSet<String> = classes.iter().map(Class::scope_path).collect();
    let primaries: HashSet<String> = classes
        .iter()
        .filter(|c| c.specialization == SpecializationKind::None)
        .map(|c| c.qualified_name.clone())
        .collect();

    for class in classes.iter_mut() {
        let owner = class.owning_scope.clone();
        for base in &mut class.base_specifiers {
            let parts = split_scope(&base.name);
            let stripped = parts
                .iter()
                .map(|p| strip_template_arguments(p))
                .collect::<Vec<_>>()
                .join(SCOPE_SEPARATOR);
            let absolute = base.name.starts_with(SCOPE_SEPARATOR);

            let mut scope = Some(if absolute { String::new() } else { owner.clone() });
            while let Some(current) = scope {
                let exact = join_scope(&current, base.name.trim_start_matches(SCOPE_SEPARATOR));
                if by_scope.contains(&exact) {
                    base.resolved = Some(exact);
                    break;
                }
                let primary = join_scope(&current, stripped.trim_start_matches(SCOPE_SEPARATOR));
                if primaries.contains(&primary) {
                    base.resolved = Some(primary);
                    break;
                }
                scope = parent_scope(&current);
            }
        }
    }
}

/// A class is abstract when it declares a pure virtual function or
/// inherits one it does not override.
fn mark_abstract(classes: &mut [Class], enums: &[Enum]) {
    let known = known_types(classes, enums);
    let overrides: Vec<Vec<OverrideSlot>> = classes
        .iter()
        .map(|class| {
            class
                .methods
                .iter()
                .filter(|m| !m.flags.is_destructor)
                .map(|m| OverrideSlot {
                    key: override_key(m, &known),
                    is_pure: m.flags.is_pure_virtual,
                })
                .collect()
        })
        .collect();
    let pending = pending_pure(classes, &overrides);

    for (class, pending) in classes.iter_mut().zip(pending) {
        let own_pure = class.methods.iter().any(|m| m.flags.is_pure_virtual);
        class.is_abstract = own_pure || !pending.is_empty();
    }
}

struct OverrideSlot {
    key: String,
    is_pure: bool,
}

/// Qualified names of the types declared in this file, template
/// arguments removed.
fn known_types(classes: &[Class], enums: &[Enum]) -> HashSet<String> {
    classes
        .iter()
        .map(|c| &c.qualified_name)
        .chain(enums.iter().map(|e| &e.qualified_name))
        .map(|name| without_template_arguments(name))
        .collect()
}

fn without_template_arguments(name: &str) -> String {
    split_scope(name)
        .iter()
        .map(|part| strip_template_arguments(part))
        .collect::<Vec<_>>()
        .join(SCOPE_SEPARATOR)
}

/// Identity of a method for override matching. Parameter types naming a
/// known type are qualified from the method's scope outward, so that
/// `Value` written inside `ns` and `ns::Value` written elsewhere agree.
fn override_key(method: &Function, known: &HashSet<String>) -> String {
    let mut params: Vec<String> = method
        .parameters
        .iter()
        .map(|p| qualified_form(&p.ty, &method.owning_scope, known))
        .collect();
    if method.flags.is_variadic {
        params.push("...".to_string());
    }
    let qualifiers = method
        .signature
        .rfind(')')
        .map_or("", |close| &method.signature[close + 1..]);
    format!("{}({}){}", method.name, params.join(","), qualifiers)
}

fn qualified_form(ty: &TypeDescriptor, scope: &str, known: &HashSet<String>) -> String {
    let form = ty.signature_form();
    match qualify_type(&ty.base_name, scope, known) {
        Some(qualified) => requalify(&form, &ty.base_name, &qualified),
        None => form,
    }
}

/// Qualified name of the known type `base_name` as seen from `scope`.
fn qualify_type(base_name: &str, scope: &str, known: &HashSet<String>) -> Option<String> {
    if base_name.is_empty() {
        return None;
    }
    let relative = base_name.trim_start_matches(SCOPE_SEPARATOR);
    let stripped = without_template_arguments(relative);
    let mut current = Some(if base_name.starts_with(SCOPE_SEPARATOR) {
        String::new()
    } else {
        scope.to_string()
    });
    while let Some(candidate) = current {
        if known.contains(&join_scope(&candidate, &stripped)) {
            return Some(join_scope(&candidate, relative));
        }
        current = parent_scope(&candidate);
    }
    None
}

/// Replace the leading `base` of `form`, after any cv prefix, by `qualified`.
fn requalify(form: &str, base: &str, qualified: &str) -> String {
    let mut prefix_len = 0;
    loop {
        let rest = &form[prefix_len..];
        match ["const ", "volatile "].iter().find(|p| rest.starts_with(*p)) {
            Some(p) => prefix_len += p.len(),
            None => break,
        }
    }
    let rest = &form[prefix_len..];
    let Some(tail) = rest.strip_prefix(base) else {
        return form.to_string();
    };
    if tail.starts_with(|c: char| c.is_alphanumeric() || c == '_' || c == ':') {
        return form.to_string();
    }
    format!("{}{}{}", &form[..prefix_len], qualified, tail)
}

/// Override keys of pure virtual functions still unimplemented in each
/// class, computed bases first with an explicit stack. Inheritance cycles
/// contribute nothing past the repeated class.
fn pending_pure(classes: &[Class], overrides: &[Vec<OverrideSlot>]) -> Vec<BTreeSet<String>> {
    let index: HashMap<String, usize> = classes
        .iter()
        .enumerate()
        .map(|(i, c)| (c.scope_path(), i))
        .collect();
    let bases = |i: usize| -> Vec<usize> {
        classes[i]
            .base_specifiers
            .iter()
            .filter_map(|b| b.resolved.as_ref().and_then(|r| index.get(r)).copied())
            .collect()
    };

    let mut memo: Vec<Option<BTreeSet<String>>> = vec![None; classes.len()];
    let mut on_path = vec![false; classes.len()];
    for root in 0..classes.len() {
        let mut stack = vec![(root, false)];
        while let Some((i, expanded)) = stack.pop() {
            if memo[i].is_some() {
                continue;
            }
            if !expanded {
                if on_path[i] {
                    continue;
                }
                on_path[i] = true;
                stack.push((i, true));
                for b in bases(i) {
                    if memo[b].is_none() && !on_path[b] {
                        stack.push((b, false));
                    }
                }
                continue;
            }

            on_path[i] = false;
            let mut pending = BTreeSet::new();
            for b in bases(i) {
                if let Some(inherited) = &memo[b] {
                    pending.extend(inherited.iter().cloned());
                }
            }
            for slot in &overrides[i] {
                if slot.is_pure {
                    pending.insert(slot.key.clone());
                } else {
                    pending.remove(&slot.key);
                }
            }
            memo[i] = Some(pending);
        }
    }
    memo.into_iter().map(Option::unwrap_or_default).collect()
}

//! Entities of the extracted code model.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::descriptor::TypeDescriptor;
use super::location::SourceLocation;

/// C++ member access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessSpecifier {
    Public,
    Protected,
    Private,
}

impl AccessSpecifier {
    /// Parse the keyword of an access specifier (`public`, `protected`, `private`).
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.trim().trim_end_matches(':').trim() {
            "public" => Some(Self::Public),
            "protected" => Some(Self::Protected),
            "private" => Some(Self::Private),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Protected => "protected",
            Self::Private => "private",
        }
    }
}

/// Kinds of entity the model holds, used in keys and namespace listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Namespace,
    Class,
    Function,
    Variable,
    Enum,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Namespace => "namespace",
            Self::Class => "class",
            Self::Function => "function",
            Self::Variable => "variable",
            Self::Enum => "enum",
        };
        f.write_str(name)
    }
}

/// Whether a template entity is a primary template or a specialization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecializationKind {
    #[default]
    None,
    Partial,
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateParameterKind {
    Type,
    NonType,
    Template,
}

/// A template parameter of a class or function template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateParameter {
    pub name: String,
    pub kind: TemplateParameterKind,
    /// Declared type of a non-type parameter.
    #[serde(rename = "type")]
    pub ty: Option<TypeDescriptor>,
    pub default_value: Option<String>,
    pub is_pack: bool,
}

/// A function parameter. `name` is empty for unnamed parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeDescriptor,
    /// Default argument exactly as written in the source.
    pub default_value: Option<String>,
}

/// Boolean properties of a function.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FunctionFlags {
    pub is_virtual: bool,
    pub is_pure_virtual: bool,
    pub is_static: bool,
    pub is_const: bool,
    pub is_constructor: bool,
    pub is_destructor: bool,
    pub is_operator: bool,
    pub is_conversion: bool,
    pub is_inline: bool,
    pub is_explicit: bool,
    pub is_deleted: bool,
    pub is_defaulted: bool,
    pub is_override: bool,
    pub is_final: bool,
    pub is_noexcept: bool,
    pub is_variadic: bool,
    pub is_definition: bool,
}

impl FunctionFlags {
    /// Names of the flags that differ between two flag sets.
    pub fn differences(&self, other: &FunctionFlags) -> Vec<&'static str> {
        let pairs = [
            ("is_virtual", self.is_virtual, other.is_virtual),
            ("is_pure_virtual", self.is_pure_virtual, other.is_pure_virtual),
            ("is_static", self.is_static, other.is_static),
            ("is_const", self.is_const, other.is_const),
            ("is_inline", self.is_inline, other.is_inline),
            ("is_explicit", self.is_explicit, other.is_explicit),
            ("is_deleted", self.is_deleted, other.is_deleted),
            ("is_defaulted", self.is_defaulted, other.is_defaulted),
            ("is_override", self.is_override, other.is_override),
            ("is_final", self.is_final, other.is_final),
            ("is_noexcept", self.is_noexcept, other.is_noexcept),
        ];
        pairs
            .iter()
            .filter(|(_, a, b)| a != b)
            .map(|(name, _, _)| *name)
            .collect()
    }
}

/// A free function, method, constructor, destructor or operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub qualified_name: String,
    /// Qualified name of the namespace or class that owns this function.
    pub owning_scope: String,
    pub return_type: TypeDescriptor,
    pub parameters: Vec<Parameter>,
    pub flags: FunctionFlags,
    pub access: Option<AccessSpecifier>,
    pub template_parameters: Vec<TemplateParameter>,
    pub specialization: SpecializationKind,
    pub template_arguments: Vec<String>,
    /// Leaf name, parameter types and method qualifiers, e.g. `area(double) const`.
    pub signature: String,
    /// Overload discriminator derived from the qualified name and signature.
    pub signature_hash: String,
    pub location: SourceLocation,
    #[serde(default)]
    pub definition_location: Option<SourceLocation>,
}

impl Function {
    pub fn is_template(&self) -> bool {
        !self.template_parameters.is_empty() || self.specialization != SpecializationKind::None
    }

    pub fn is_method(&self) -> bool {
        self.access.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassKind {
    Class,
    Struct,
    Union,
}

impl ClassKind {
    /// Access that applies before the first access specifier.
    pub fn default_access(&self) -> AccessSpecifier {
        match self {
            Self::Class => AccessSpecifier::Private,
            Self::Struct | Self::Union => AccessSpecifier::Public,
        }
    }
}

/// A base class as written in the class head.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseSpecifier {
    /// Canonical spelling of the base, e.g. `Shape` or `Base<int>`.
    pub name: String,
    pub access: AccessSpecifier,
    pub is_virtual: bool,
    /// Qualified name of the matching class in the same result, if any.
    pub resolved: Option<String>,
}

/// A class, struct or union.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Class {
    pub name: String,
    pub qualified_name: String,
    pub owning_scope: String,
    pub kind: ClassKind,
    pub base_classes: Vec<String>,
    pub base_specifiers: Vec<BaseSpecifier>,
    pub methods: Vec<Function>,
    pub fields: Vec<Variable>,
    pub nested_classes: Vec<String>,
    #[serde(default)]
    pub nested_enums: Vec<String>,
    pub template_parameters: Vec<TemplateParameter>,
    pub template_arguments: Vec<String>,
    pub specialization: SpecializationKind,
    pub is_template: bool,
    pub is_abstract: bool,
    pub is_definition: bool,
    pub access: Option<AccessSpecifier>,
    pub location: SourceLocation,
    #[serde(default)]
    pub definition_location: Option<SourceLocation>,
}

impl Class {
    /// Path of the scope opened by this class. Specializations carry their
    /// arguments so that members of `Box<int>` and `Box<T>` stay apart.
    pub fn scope_path(&self) -> String {
        if self.specialization == SpecializationKind::None || self.template_arguments.is_empty() {
            self.qualified_name.clone()
        } else {
            format!("{}<{}>", self.qualified_name, self.template_arguments.join(", "))
        }
    }
}

/// A namespace-scope variable or a class data member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub qualified_name: String,
    pub owning_scope: String,
    #[serde(rename = "type")]
    pub ty: TypeDescriptor,
    pub is_const: bool,
    pub is_static: bool,
    #[serde(default)]
    pub is_constexpr: bool,
    #[serde(default)]
    pub is_extern: bool,
    #[serde(default)]
    pub is_mutable: bool,
    pub is_member: bool,
    pub initializer: Option<String>,
    /// Present for class members only.
    pub access: Option<AccessSpecifier>,
    pub is_definition: bool,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enumerator {
    pub name: String,
    pub value: Option<String>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enum {
    pub name: String,
    pub qualified_name: String,
    pub owning_scope: String,
    pub is_scoped: bool,
    pub underlying_type: Option<TypeDescriptor>,
    pub enumerators: Vec<Enumerator>,
    pub access: Option<AccessSpecifier>,
    pub is_definition: bool,
    pub location: SourceLocation,
}

/// Reference from a namespace to an entity it directly contains.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub qualified_name: String,
    /// Function signature, so overloads stay distinguishable.
    pub signature: Option<String>,
}

/// A namespace node. The global namespace has an empty qualified name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Namespace {
    pub name: String,
    pub qualified_name: String,
    pub parent: Option<String>,
    pub is_inline: bool,
    pub is_anonymous: bool,
    pub entities: Vec<EntityRef>,
    pub child_namespaces: Vec<String>,
    /// First opening of the namespace; absent for the global namespace.
    pub location: Option<SourceLocation>,
}

impl Namespace {
    pub fn is_global(&self) -> bool {
        self.qualified_name.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_from_keyword() {
        assert_eq!(AccessSpecifier::from_keyword("public"), Some(AccessSpecifier::Public));
        assert_eq!(AccessSpecifier::from_keyword("protected:"), Some(AccessSpecifier::Protected));
        assert_eq!(AccessSpecifier::from_keyword("friend"), None);
    }

    #[test]
    fn test_default_access() {
        assert_eq!(ClassKind::Class.default_access(), AccessSpecifier::Private);
        assert_eq!(ClassKind::Struct.default_access(), AccessSpecifier::Public);
        assert_eq!(ClassKind::Union.default_access(), AccessSpecifier::Public);
    }

    #[test]
    fn test_flag_differences() {
        let a = FunctionFlags { is_const: true, is_virtual: true, ..Default::default() };
        let b = FunctionFlags { is_virtual: true, is_static: true, ..Default::default() };
        assert_eq!(a.differences(&b), vec!["is_static", "is_const"]);
    }

    #[test]
    fn test_entity_kind_serializes_snake_case() {
        let json = serde_json::to_string(&EntityKind::Namespace).unwrap();
        assert_eq!(json, "\"namespace\"");
    }
}

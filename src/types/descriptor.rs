//! Canonical type descriptors.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Reference category of a type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    #[default]
    None,
    Lvalue,
    Rvalue,
}

/// A normalized type.
///
/// Two descriptors compare equal iff their `canonical` strings match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeDescriptor {
    /// Canonical spelling, e.g. `const std::vector<int>&`.
    pub canonical: String,
    /// Base name including template arguments, without qualifiers or suffixes.
    pub base_name: String,
    pub is_const: bool,
    pub is_volatile: bool,
    pub pointer_depth: u32,
    pub reference: ReferenceKind,
    pub template_arguments: Vec<TypeDescriptor>,
}

impl TypeDescriptor {
    /// Descriptor for `void`, used when a function reports no result type.
    pub fn void() -> Self {
        Self::opaque("void")
    }

    /// Descriptor that carries a spelling the normalizer could not decompose.
    pub fn opaque(spelling: impl Into<String>) -> Self {
        let spelling = spelling.into();
        Self {
            base_name: spelling.clone(),
            canonical: spelling,
            is_const: false,
            is_volatile: false,
            pointer_depth: 0,
            reference: ReferenceKind::None,
            template_arguments: Vec::new(),
        }
    }

    /// Whether the object itself is const, as opposed to what it points at.
    ///
    /// `const char*` is not, `char* const` and `const int` are. References
    /// are never const objects.
    pub fn is_top_level_const(&self) -> bool {
        if self.is_reference() {
            return false;
        }
        if self.pointer_depth == 0 {
            return self.is_const;
        }
        let form = self.canonical.strip_suffix(" volatile").unwrap_or(&self.canonical);
        form.ends_with(" const")
    }

    pub fn is_reference(&self) -> bool {
        self.reference != ReferenceKind::None
    }

    /// Spelling used in function signatures.
    ///
    /// Top-level cv-qualifiers do not take part in a function's type, so
    /// `f(const int)` and `f(int)` share a signature, as do `f(int* const)`
    /// and `f(int*)`.
    pub fn signature_form(&self) -> String {
        if self.pointer_depth == 0 && !self.is_reference() {
            let mut form = self.canonical.as_str();
            for prefix in ["const ", "volatile "] {
                form = form.strip_prefix(prefix).unwrap_or(form);
            }
            return form.to_string();
        }
        let mut form = self.canonical.as_str();
        if !self.is_reference() {
            for suffix in [" const", " volatile"] {
                form = form.strip_suffix(suffix).unwrap_or(form);
            }
        }
        form.to_string()
    }
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for TypeDescriptor {}

impl Hash for TypeDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical.hash(state);
    }
}

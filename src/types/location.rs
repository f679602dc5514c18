//! Source positions attached to every extracted entity.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A position inside a source file.
///
/// `line` and `column` are 1-based, `offset` is the 0-based byte offset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub offset: usize,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: u32, column: u32, offset: usize) -> Self {
        Self {
            file: file.into(),
            line,
            column,
            offset,
        }
    }

    /// Start of the given file.
    pub fn start_of(file: impl Into<String>) -> Self {
        Self::new(file, 1, 1, 0)
    }

    /// Ordering key used when sorting entities into source order.
    pub fn sort_key(&self) -> (usize, u32, u32) {
        (self.offset, self.line, self.column)
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let loc = SourceLocation::new("src/calc.hpp", 12, 5, 210);
        assert_eq!(loc.to_string(), "src/calc.hpp:12:5");
    }

    #[test]
    fn test_sort_key_follows_offset() {
        let a = SourceLocation::new("a.cpp", 3, 1, 40);
        let b = SourceLocation::new("a.cpp", 2, 9, 20);
        assert!(b.sort_key() < a.sort_key());
    }
}

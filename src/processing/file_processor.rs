//! Source loading for the analyzer.
//!
//! Checks that a path is a readable file, detects the text encoding,
//! recognizes binary content and computes the file signature handed back
//! to callers for cache decisions.

use std::fs;
use std::path::Path;
use std::str;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::AnalyzerError;
use crate::types::FileSignature;

/// Bytes inspected when deciding whether content is binary.
pub const BINARY_SAMPLE_BYTES: usize = 8192;

/// A file read from disk and decoded to text.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Canonical path of the file.
    pub path: String,
    pub content: String,
    /// Encoding the content was decoded from.
    pub encoding: String,
    pub size_bytes: usize,
    pub is_binary: bool,
    pub signature: FileSignature,
}

/// Loads and validates source files.
#[derive(Debug, Clone, Default)]
pub struct FileProcessor;

impl FileProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Read a file from disk.
    ///
    /// Missing paths, directories and unreadable files are rejected with
    /// [`AnalyzerError::InvalidInput`] before any analysis happens.
    pub fn load(&self, path: &Path) -> Result<SourceFile, AnalyzerError> {
        let canonical = path.canonicalize().map_err(|e| {
            AnalyzerError::InvalidInput(format!("{}: {}", path.display(), e))
        })?;
        let metadata = fs::metadata(&canonical)
            .map_err(|e| AnalyzerError::InvalidInput(format!("{}: {}", canonical.display(), e)))?;
        if !metadata.is_file() {
            return Err(AnalyzerError::InvalidInput(format!(
                "{}: not a regular file",
                canonical.display()
            )));
        }
        let bytes = fs::read(&canonical)
            .map_err(|e| AnalyzerError::InvalidInput(format!("{}: {}", canonical.display(), e)))?;
        let modified = metadata.modified().ok().map(DateTime::<Utc>::from);

        Ok(self.from_bytes(&canonical.to_string_lossy(), &bytes, modified))
    }

    /// Decode in-memory content as if it had been read from `path`.
    pub fn from_bytes(&self, path: &str, content: &[u8], modified: Option<DateTime<Utc>>) -> SourceFile {
        let signature = Self::file_signature(path, content, modified);
        let is_binary = self.is_binary_content(content, BINARY_SAMPLE_BYTES);
        let (text, encoding) = if is_binary {
            (String::new(), "binary".to_string())
        } else {
            let (text, encoding) = self.decode(content);
            (self.normalize_line_endings(&text), encoding)
        };
        debug!(path, size = content.len(), %encoding, "Loaded source file");

        SourceFile {
            path: path.to_string(),
            content: text,
            encoding,
            size_bytes: content.len(),
            is_binary,
            signature,
        }
    }

    /// Content hash, size and modification time of a file.
    pub fn file_signature(path: &str, content: &[u8], modified: Option<DateTime<Utc>>) -> FileSignature {
        let mut hasher = Sha256::new();
        hasher.update(content);
        FileSignature {
            path: path.to_string(),
            content_hash: format!("{:x}", hasher.finalize()),
            size_bytes: content.len(),
            modified,
        }
    }

    /// Check if content appears to be binary.
    pub fn is_binary_content(&self, content: &[u8], sample_size: usize) -> bool {
        let sample = &content[..content.len().min(sample_size)];

        // Null bytes never appear in source text
        if sample.contains(&0) {
            return true;
        }

        let non_printable = sample
            .iter()
            .filter(|&&b| b < 32 && !matches!(b, 9 | 10 | 12 | 13))
            .count();

        !sample.is_empty() && (non_printable as f64 / sample.len() as f64) > 0.1
    }

    /// Decode content, trying UTF-8, then UTF-16 with a byte order mark,
    /// then falling back to Latin-1.
    pub fn decode(&self, content: &[u8]) -> (String, String) {
        if let Ok(s) = str::from_utf8(content) {
            let s = s.strip_prefix('\u{feff}').unwrap_or(s);
            return (s.to_string(), "utf-8".to_string());
        }

        if content.len() >= 2 && content[0] == 0xFF && content[1] == 0xFE {
            let utf16: Vec<u16> = content[2..]
                .chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]))
                .collect();
            if let Ok(s) = String::from_utf16(&utf16) {
                return (s, "utf-16-le".to_string());
            }
        }

        if content.len() >= 2 && content[0] == 0xFE && content[1] == 0xFF {
            let utf16: Vec<u16> = content[2..]
                .chunks_exact(2)
                .map(|c| u16::from_be_bytes([c[0], c[1]]))
                .collect();
            if let Ok(s) = String::from_utf16(&utf16) {
                return (s, "utf-16-be".to_string());
            }
        }

        let s: String = content.iter().map(|&b| b as char).collect();
        (s, "latin-1".to_string())
    }

    /// Normalize line endings to Unix-style (LF).
    pub fn normalize_line_endings(&self, content: &str) -> String {
        content.replace("\r\n", "\n").replace('\r', "\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_reads_and_signs_file() {
        let mut file = tempfile::Builder::new().suffix(".cpp").tempfile().unwrap();
        file.write_all(b"int main() { return 0; }\r\n").unwrap();

        let source = FileProcessor::new().load(file.path()).unwrap();
        assert_eq!(source.content, "int main() { return 0; }\n");
        assert_eq!(source.encoding, "utf-8");
        assert!(!source.is_binary);
        assert_eq!(source.signature.content_hash.len(), 64);
        assert_eq!(source.signature.size_bytes, 26);
        assert!(source.signature.modified.is_some());
    }

    #[test]
    fn test_missing_path_is_invalid_input() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileProcessor::new().load(&dir.path().join("absent.cpp")).unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_directory_is_invalid_input() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileProcessor::new().load(dir.path()).unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_binary_detection() {
        let processor = FileProcessor::new();
        assert!(!processor.is_binary_content(b"class A {};", 1024));
        assert!(processor.is_binary_content(b"\x00\x01\x02\x03", 1024));

        let source = processor.from_bytes("blob.cpp", b"\x7fELF\x00\x00", None);
        assert!(source.is_binary);
        assert!(source.content.is_empty());
    }

    #[test]
    fn test_decode_fallbacks() {
        let processor = FileProcessor::new();
        let (text, encoding) = processor.decode(&[0xFF, 0xFE, b'i', 0, b'n', 0, b't', 0]);
        assert_eq!((text.as_str(), encoding.as_str()), ("int", "utf-16-le"));

        let (text, encoding) = processor.decode(&[b'c', 0xE9]);
        assert_eq!((text.as_str(), encoding.as_str()), ("c\u{e9}", "latin-1"));

        let (text, _) = processor.decode("\u{feff}int x;".as_bytes());
        assert_eq!(text, "int x;");
    }

    #[test]
    fn test_same_content_same_hash() {
        let a = FileProcessor::file_signature("a.cpp", b"int x;", None);
        let b = FileProcessor::file_signature("b.cpp", b"int x;", None);
        assert_eq!(a.content_hash, b.content_hash);
    }
}

//! Processing module for source loading.
//!
//! This module provides:
//! - Path validation (existence, regular file, readability)
//! - Encoding detection and line-ending normalization
//! - Binary content detection and file signatures

pub mod file_processor;

pub use file_processor::{FileProcessor, SourceFile, BINARY_SAMPLE_BYTES};

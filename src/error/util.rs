//! Utility functions for error handling
//!
//! Filesystem helpers that attach the path and purpose of an operation
//! to the IO error they return.

use std::fs;
use std::io;
use std::path::Path;

use crate::error::{AnalysisError, Result};

fn io_error(kind: io::ErrorKind, message: String) -> AnalysisError {
    AnalysisError::Io(io::Error::new(kind, message))
}

/// Safely open a file with rich error information
///
/// # Arguments
/// * `path` - The path to the file to open
/// * `purpose` - Why the file is being opened (for error context)
pub fn safe_open_file(path: &Path, purpose: &str) -> Result<fs::File> {
    if !path.exists() {
        return Err(io_error(
            io::ErrorKind::NotFound,
            format!("File not found: {} (needed for: {purpose})", path.display()),
        ));
    }

    if !path.is_file() {
        return Err(io_error(
            io::ErrorKind::InvalidInput,
            format!("Path is not a file: {} (expected a file for: {purpose})", path.display()),
        ));
    }

    fs::File::open(path).map_err(|e| {
        let context = match e.kind() {
            io::ErrorKind::PermissionDenied => "Permission denied - check file permissions".to_string(),
            _ => format!("Failed to open file for: {purpose}"),
        };
        io_error(e.kind(), format!("{context}: {} ({e})", path.display()))
    })
}

/// Safely read a file to string with rich error information
pub fn safe_read_to_string(path: &Path, purpose: &str) -> Result<String> {
    let mut file = safe_open_file(path, purpose)?;
    let mut content = String::new();
    io::Read::read_to_string(&mut file, &mut content).map_err(|e| {
        let context = match e.kind() {
            io::ErrorKind::InvalidData => "File contains invalid UTF-8 data".to_string(),
            _ => format!("Failed to read file content for: {purpose}"),
        };
        io_error(e.kind(), format!("{context}: {} ({e})", path.display()))
    })?;
    Ok(content)
}

/// Create a directory (and its parents) if it does not exist yet
pub fn ensure_directory(path: &Path, purpose: &str) -> Result<()> {
    if path.exists() && !path.is_dir() {
        return Err(io_error(
            io::ErrorKind::AlreadyExists,
            format!("Path exists but is not a directory: {} (needed for: {purpose})", path.display()),
        ));
    }
    fs::create_dir_all(path).map_err(|e| {
        io_error(
            e.kind(),
            format!("Failed to create directory {} for {purpose}: {e}", path.display()),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_reports_purpose() {
        let err = safe_open_file(Path::new("/definitely/not/here.csv"), "feature table")
            .expect_err("missing file must fail");
        let message = err.to_string();
        assert!(message.contains("feature table"));
        assert!(message.contains("here.csv"));
    }

    #[test]
    fn test_ensure_directory_creates_nested() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        ensure_directory(&nested, "test output").unwrap();
        assert!(nested.is_dir());
        // Idempotent
        ensure_directory(&nested, "test output").unwrap();
    }
}

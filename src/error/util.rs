//! Utility functions for error handling
//!
//! File helpers that attach the path and the reason for the access to IO
//! failures, so a failed stage reports which artifact it was touching.

use std::fs;
use std::io;
use std::path::Path;

use crate::error::{AnalysisError, Result};

/// Open a file for reading with rich error information
///
/// # Arguments
/// * `path` - The path to the file to open
/// * `purpose` - Why the file is being opened (for error context)
pub fn safe_open_file(path: &Path, purpose: &str) -> Result<fs::File> {
    if !path.is_file() {
        return Err(AnalysisError::io_at(
            path,
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("expected a file for: {purpose}"),
            ),
        ));
    }

    fs::File::open(path).map_err(|e| {
        let message = match e.kind() {
            io::ErrorKind::PermissionDenied => {
                "permission denied - check file permissions".to_string()
            }
            _ => format!("failed to open file for: {purpose}"),
        };
        AnalysisError::io_at(path, io::Error::new(e.kind(), message))
    })
}

/// Create (or truncate) a file for writing with rich error information
pub fn safe_create_file(path: &Path, purpose: &str) -> Result<fs::File> {
    fs::File::create(path).map_err(|e| {
        let message = format!("failed to create file for: {purpose} ({e})");
        AnalysisError::io_at(path, io::Error::new(e.kind(), message))
    })
}

/// Make sure an output directory exists, creating it when needed
pub fn ensure_directory(path: &Path, purpose: &str) -> Result<()> {
    if path.is_dir() {
        return Ok(());
    }

    if path.exists() {
        return Err(AnalysisError::io_at(
            path,
            io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("path is not a directory, needed for: {purpose}"),
            ),
        ));
    }

    fs::create_dir_all(path).map_err(|e| AnalysisError::io_at(path, e))
}

/// Read a UTF-8 text file with rich error information
pub fn safe_read_to_string(path: &Path, purpose: &str) -> Result<String> {
    let mut file = safe_open_file(path, purpose)?;

    let mut content = String::new();
    io::Read::read_to_string(&mut file, &mut content).map_err(|e| {
        let message = match e.kind() {
            io::ErrorKind::InvalidData => "file contains invalid UTF-8 data".to_string(),
            _ => format!("failed to read file content for: {purpose}"),
        };
        AnalysisError::io_at(path, io::Error::new(e.kind(), message))
    })?;

    Ok(content)
}

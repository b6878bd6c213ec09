//! Path and input validation utilities.
//!
//! Top-level commands validate their path arguments up front so that the user
//! gets one clear message instead of a low-level I/O error.

use owo_colors::OwoColorize;
use std::error::Error;
use std::path::Path;

/// Validate that a path exists.
///
/// # Returns
///
/// * `Ok(())` if the path exists
/// * `Err` with a formatted error message if the path doesn't exist
pub fn validate_path_exists(path: &Path) -> Result<(), Box<dyn Error>> {
    if !path.exists() {
        return Err(format!(
            "{} Path does not exist: {}",
            "Error:".red().bold(),
            path.display()
        )
        .into());
    }
    Ok(())
}

/// Validate that a path exists and is a directory.
pub fn validate_directory(path: &Path) -> Result<(), Box<dyn Error>> {
    validate_path_exists(path)?;
    if !path.is_dir() {
        return Err(format!(
            "{} Not a directory: {}",
            "Error:".red().bold(),
            path.display()
        )
        .into());
    }
    Ok(())
}

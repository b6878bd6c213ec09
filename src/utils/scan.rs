//! Directory enumeration for audio files.
//!
//! Only the immediate entries of a directory are considered; subdirectories
//! are never descended into. Names are returned sorted so that cache files and
//! listings have a stable, human-friendly order.

use crate::constants::AUDIO_EXTENSIONS;
use std::error::Error;
use std::fs;
use std::path::Path;

/// True when `name` ends in one of the known audio extensions (any case)
pub fn is_audio_file(name: &str) -> bool {
    Path::new(name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| AUDIO_EXTENSIONS.contains(&ext.as_str()))
}

/// Sorted names of the audio files directly inside `dir`.
///
/// # Errors
///
/// Fails when the directory itself cannot be read. Individual entries whose
/// type cannot be determined are skipped.
pub fn list_audio_files(dir: &Path) -> Result<Vec<String>, Box<dyn Error>> {
    let entries = fs::read_dir(dir)
        .map_err(|e| format!("Cannot read directory '{}': {e}", dir.display()))?;

    let mut files: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            // Follow symlinks so linked samples are indexed like regular files
            fs::metadata(entry.path())
                .map(|meta| !meta.is_dir())
                .unwrap_or(false)
        })
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| is_audio_file(name))
        .collect();

    files.sort();
    Ok(files)
}

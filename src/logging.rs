//! File logging for every `alf` invocation.
//!
//! The playback controller runs detached from any terminal, so the log file in
//! the state directory is the only place its diagnostics can go. Foreground
//! commands append to the same file.

use simplelog::{CombinedLogger, Config, LevelFilter, WriteLogger};
use std::error::Error;
use std::fs::{self, OpenOptions};
use std::path::Path;

/// Install a logger appending to `path` at the given level.
///
/// The parent directory is created when missing. Fails if a logger has
/// already been installed for this process.
pub fn init(path: &Path, level: &str) -> Result<(), Box<dyn Error>> {
    let level = level.parse::<LevelFilter>().unwrap_or(LevelFilter::Info);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    CombinedLogger::init(vec![WriteLogger::new(level, Config::default(), file)])?;

    Ok(())
}

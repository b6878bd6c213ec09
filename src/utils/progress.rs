//! Progress indicators for long-running commands.
//!
//! Indexing spawns several external tools per file and can take a while on
//! large sample folders, so it reports progress with an indicatif bar that
//! clears itself when done.

use crate::constants::SPINNER_CHARS;
use indicatif::{ProgressBar, ProgressStyle};

/// Create the indexing progress bar.
///
/// # Arguments
///
/// * `total` - The number of files that will be processed
///
/// # Example
///
/// ```ignore
/// let pb = create_progress_bar(files.len() as u64);
/// for file in &files {
///     pb.set_message(file.clone());
///     // ... extract ...
///     pb.inc(1);
/// }
/// pb.finish_and_clear();
/// ```
pub fn create_progress_bar(total: u64) -> ProgressBar {
    let style = ProgressStyle::default_bar()
        .template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .tick_strings(SPINNER_CHARS)
        .progress_chars("█▓░");

    let pb = ProgressBar::new(total);
    pb.set_style(style);
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_progress_bar() {
        let pb = create_progress_bar(10);
        pb.set_message("kick.wav");
        pb.inc(4);
        assert_eq!(pb.position(), 4);
        assert_eq!(pb.length(), Some(10));
        pb.finish_and_clear();
    }
}

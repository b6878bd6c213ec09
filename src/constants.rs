//! Project-wide constants used across multiple modules.
//!
//! This module centralizes constant definitions to avoid duplication and ensure
//! consistency between the indexer, the renderers and the playback daemon.

/// Spinner animation characters for progress indicators
pub const SPINNER_CHARS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Supported audio file extensions (matched case-insensitively)
pub const AUDIO_EXTENSIONS: &[&str] = &[
    "wav", "mp3", "flac", "ogg", "aif", "aiff", "opus", "m4a", "wma", "ape", "wv", "alac",
];

/// Eight-level glyph ramp, lightest first
pub const GLYPHS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// ANSI marker for the already-played part of a waveform
pub const DIM: &str = "\x1b[38;5;240m";

/// ANSI marker for the not-yet-played part of a waveform
pub const BRIGHT: &str = "\x1b[0m";

pub const RESET: &str = "\x1b[0m";

/// Name of the per-user subdirectory holding directory caches
pub const CACHE_SUBDIR: &str = "alf";

/// Extension of directory cache files
pub const CACHE_EXTENSION: &str = "tsv";

/// Number of digest bytes kept in a cache file name
pub const CACHE_KEY_BYTES: usize = 8;

/// Minimum columns in a cache line; the sparkline column is optional
pub const CACHE_MIN_FIELDS: usize = 7;

/// Sample rate requested from the decoder for peak extraction
pub const DECODE_SAMPLE_RATE: u32 = 8000;

/// Pitch readings at or below this frequency are discarded
pub const MIN_PITCH_HZ: f64 = 20.0;

/// Sparkline width clamp for directory listings
pub const LISTING_SPARK_MIN: usize = 16;
pub const LISTING_SPARK_MAX: usize = 30;

/// Session file names inside the state directory
pub const PID_FILE: &str = "pid";
pub const POS_FILE: &str = "pos";
pub const FILE_FILE: &str = "file";
pub const AUTOPLAY_FILE: &str = "autoplay";
pub const PLAYER_SOCKET: &str = "mpv";
pub const LOG_FILE: &str = "alf.log";

/// Player socket wait at session start: attempts and delay between them
pub const SOCKET_WAIT_RETRIES: u32 = 30;
pub const SOCKET_WAIT_INTERVAL_MS: u64 = 50;

/// Grace period after asking a previous player to quit
pub const PREEMPT_SETTLE_MS: u64 = 50;

/// Consecutive unanswered position polls after which the player is considered gone
pub const CONTROL_MISS_LIMIT: u32 = 3;

//! Per-directory metadata cache.
//!
//! Each indexed directory owns one cache file named after a digest of its
//! canonical path, so the same directory maps to the same file regardless of
//! the working directory it was reached from. The index pipeline is the only
//! writer; renderers and listings read it.

pub mod codec;

use crate::config::Config;
use crate::constants::{CACHE_EXTENSION, CACHE_KEY_BYTES};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

/// Derived metadata for one audio file. `None` means "not computed".
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AudioRecord {
    pub name: String,
    pub bpm: Option<u32>,
    pub pitch_hz: Option<f64>,
    /// Duration as reported by the stream probe, e.g. `00:01:40.59`
    pub duration: Option<String>,
    pub channels: Option<u16>,
    pub sample_rate: Option<u32>,
    pub bit_depth: Option<u16>,
    pub sparkline: Option<String>,
}

impl AudioRecord {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn duration_secs(&self) -> Option<f64> {
        self.duration
            .as_deref()
            .and_then(crate::analysis::parse_clock)
    }

    /// Cached sparkline, only if it was rendered at exactly `width` glyphs
    pub fn sparkline_at(&self, width: usize) -> Option<&str> {
        self.sparkline
            .as_deref()
            .filter(|spark| spark.chars().count() == width)
    }
}

/// All cached records of one directory, keyed by file name
#[derive(Debug, Clone, Default)]
pub struct DirectoryCache {
    records: HashMap<String, AudioRecord>,
}

impl DirectoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<AudioRecord>) -> Self {
        let records = records
            .into_iter()
            .map(|record| (record.name.clone(), record))
            .collect();
        Self { records }
    }

    pub fn get(&self, name: &str) -> Option<&AudioRecord> {
        self.records.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    /// Insert or replace the record for `record.name`
    pub fn insert(&mut self, record: AudioRecord) {
        self.records.insert(record.name.clone(), record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records for `names`, in that order. Names without a record are skipped,
    /// and records whose name is not listed are dropped.
    pub fn ordered(&self, names: &[String]) -> Vec<AudioRecord> {
        names
            .iter()
            .filter_map(|name| self.records.get(name).cloned())
            .collect()
    }
}

/// Canonical absolute form of `path`, falling back to a lexical absolute path
/// when it cannot be resolved.
pub fn canonical_path(path: &Path) -> PathBuf {
    fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Hex prefix of the sha256 digest of the canonical directory path
pub fn cache_key(dir: &Path) -> String {
    let canonical = canonical_path(dir);
    let digest = Sha256::digest(canonical.as_os_str().as_encoded_bytes());
    digest[..CACHE_KEY_BYTES]
        .iter()
        .fold(String::with_capacity(CACHE_KEY_BYTES * 2), |mut out, byte| {
            let _ = write!(out, "{byte:02x}");
            out
        })
}

/// Filesystem-backed cache files under one root directory
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_config(config: &Config) -> Result<Self, Box<dyn Error>> {
        Ok(Self::new(config.cache_root()?))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, dir: &Path) -> PathBuf {
        self.root
            .join(format!("{}.{CACHE_EXTENSION}", cache_key(dir)))
    }

    /// Load the cache for `dir`. A missing or unreadable file is an empty cache.
    pub fn load(&self, dir: &Path) -> DirectoryCache {
        let path = self.path_for(dir);
        match fs::read_to_string(&path) {
            Ok(text) => DirectoryCache::from_records(codec::decode(&text)),
            Err(e) => {
                log::debug!("No cache at {}: {e}", path.display());
                DirectoryCache::new()
            }
        }
    }

    /// Replace the cache for `dir` with `records`.
    ///
    /// The file is written next to the target and renamed over it, so readers
    /// see either the old or the new contents.
    pub fn save(&self, dir: &Path, records: &[AudioRecord]) -> Result<PathBuf, Box<dyn Error>> {
        fs::create_dir_all(&self.root)?;

        let path = self.path_for(dir);
        let tmp = path.with_extension(format!("{CACHE_EXTENSION}.tmp"));
        fs::write(&tmp, codec::encode(records))?;
        if let Err(e) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }

        log::info!("Wrote {} records to {}", records.len(), path.display());
        Ok(path)
    }
}

//! Preview renderers: full plot, one-line sparkline, directory views.
//!
//! All renderers consult the directory cache first. A cached sparkline is used
//! only when it has exactly the requested width; anything else is decoded and
//! computed on the spot with the same bucketing the indexer uses.

use super::{format_duration, format_size, peaks, plot, sparkline_from_samples};
use crate::analysis::{Decoder, InfoProbe, StreamInfo, hz_to_note};
use crate::cache::{AudioRecord, CacheStore, DirectoryCache, canonical_path};
use crate::constants::{LISTING_SPARK_MAX, LISTING_SPARK_MIN};
use crate::utils::scan::list_audio_files;
use std::cmp::Ordering;
use std::error::Error;
use std::fs;
use std::path::Path;

/// Column used to order `alf list` output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SortKey {
    #[default]
    Name,
    Bpm,
    Key,
    Dur,
    Size,
}

/// One row of `alf list`
#[derive(Debug, Clone, PartialEq)]
pub struct ListEntry {
    pub name: String,
    pub sparkline: String,
    pub bpm: Option<u32>,
    pub pitch_hz: Option<f64>,
    pub duration: f64,
    pub size: u64,
}

impl ListEntry {
    pub fn note(&self) -> String {
        self.pitch_hz.and_then(hz_to_note).unwrap_or_default()
    }

    /// `spark  bpm  key  dur  size  name`
    pub fn line(&self) -> String {
        let bpm = self.bpm.map(|b| b.to_string()).unwrap_or_default();
        format!(
            "{}  {:>3}  {:<3}  {:>7}  {:>5}  {}",
            self.sparkline,
            bpm,
            self.note(),
            format_duration(self.duration),
            format_size(self.size),
            self.name
        )
    }
}

pub fn sort_entries(entries: &mut [ListEntry], key: SortKey) {
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    match key {
        SortKey::Name => {}
        SortKey::Bpm => entries.sort_by_key(|e| e.bpm.unwrap_or(0)),
        SortKey::Key => entries.sort_by(|a, b| {
            cmp_f64(a.pitch_hz.unwrap_or(0.0), b.pitch_hz.unwrap_or(0.0))
        }),
        SortKey::Dur => entries.sort_by(|a, b| cmp_f64(a.duration, b.duration)),
        SortKey::Size => entries.sort_by_key(|e| e.size),
    }
}

fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

pub struct Renderer<'a> {
    decoder: &'a dyn Decoder,
    probe: &'a dyn InfoProbe,
    store: &'a CacheStore,
}

impl<'a> Renderer<'a> {
    pub fn new(decoder: &'a dyn Decoder, probe: &'a dyn InfoProbe, store: &'a CacheStore) -> Self {
        Self {
            decoder,
            probe,
            store,
        }
    }

    fn decode(&self, path: &Path) -> Vec<i16> {
        self.decoder.decode(path).unwrap_or_else(|e| {
            log::warn!("Decoding failed for {}: {e}", path.display());
            Vec::new()
        })
    }

    fn info(&self, path: &Path) -> StreamInfo {
        self.probe.probe(path).unwrap_or_else(|e| {
            log::warn!("Stream info unavailable for {}: {e}", path.display());
            StreamInfo::default()
        })
    }

    fn lookup(&self, path: &Path) -> Option<AudioRecord> {
        let dir = path.parent()?;
        let dir = if dir.as_os_str().is_empty() {
            Path::new(".")
        } else {
            dir
        };
        let name = path.file_name()?.to_string_lossy();
        self.store.load(dir).get(&name).cloned()
    }

    /// Sparkline for `path`, reusing the cached one when widths match
    pub fn sparkline_for(&self, path: &Path, record: Option<&AudioRecord>, width: usize) -> String {
        if let Some(cached) = record.and_then(|r| r.sparkline_at(width)) {
            return cached.to_string();
        }
        sparkline_from_samples(&self.decode(path), width)
    }

    fn duration_for(&self, path: &Path, record: Option<&AudioRecord>) -> f64 {
        record
            .and_then(AudioRecord::duration_secs)
            .or_else(|| self.info(path).duration_secs())
            .unwrap_or(0.0)
    }

    /// Header line plus a `height`-row plot, optionally split at `position`
    pub fn render_full(
        &self,
        path: &Path,
        width: usize,
        height: usize,
        position: Option<f64>,
    ) -> String {
        let samples = self.decode(path);
        if samples.is_empty() {
            return "  [no audio data]".to_string();
        }

        let info = self.info(path);
        let total = info.duration_secs().unwrap_or(0.0);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut tags = String::new();
        if let Some(record) = self.lookup(path) {
            if let Some(bpm) = record.bpm {
                tags.push_str(&format!("  {bpm}bpm"));
            }
            if let Some(hz) = record.pitch_hz {
                tags.push_str(&format!("  ~{hz:.0}Hz"));
            }
        }

        let time = match position {
            Some(p) => format!(
                "{} / {}",
                format_duration(total * p),
                format_duration(total)
            ),
            None => format_duration(total),
        };

        let header = format!("  {name}  {}  [{time}]{tags}", info.summary());
        let body = plot(&peaks(&samples, width), height, position);
        format!("{header}\n{body}")
    }

    /// `spark  dur  format` on one line
    pub fn render_oneline(&self, path: &Path, width: usize) -> String {
        let record = self.lookup(path);
        let spark = self.sparkline_for(path, record.as_ref(), width);
        let info = self.info(path);
        let total = info.duration_secs().unwrap_or(0.0);
        format!("{spark}  {}  {}", format_duration(total), info.summary())
    }

    /// Compact per-file listing sized to a terminal `width`
    pub fn render_directory(
        &self,
        dir: &Path,
        width: usize,
        max_files: usize,
    ) -> Result<String, Box<dyn Error>> {
        let files = list_audio_files(dir)?;
        if files.is_empty() {
            return Ok("  [no audio files]".to_string());
        }

        let spark_width = width
            .saturating_sub(40)
            .clamp(LISTING_SPARK_MIN, LISTING_SPARK_MAX);
        let name_width = width.saturating_sub(spark_width + 16);
        let cache = self.store.load(dir);

        let mut lines: Vec<String> = files
            .iter()
            .take(max_files)
            .map(|file| {
                let path = dir.join(file);
                let record = cache.get(file);
                let spark = self.sparkline_for(&path, record, spark_width);
                let duration = format_duration(self.duration_for(&path, record));

                let name: String = file.chars().take(name_width).collect();
                let pad = name_width.saturating_sub(name.chars().count());
                let bpm = record
                    .and_then(|r| r.bpm)
                    .map(|b| format!(" {b:>3}bpm"))
                    .unwrap_or_default();

                format!("  {name}{} {spark} {duration:>7}{bpm}", " ".repeat(pad))
            })
            .collect();

        if files.len() > max_files {
            lines.push(format!("  ... +{} more", files.len() - max_files));
        }

        Ok(lines.join("\n"))
    }

    /// Entries for `alf list`, sorted by `key`
    pub fn listing(
        &self,
        dir: &Path,
        key: SortKey,
        spark_width: usize,
    ) -> Result<Vec<ListEntry>, Box<dyn Error>> {
        let dir = canonical_path(dir);
        let files = list_audio_files(&dir)?;
        let cache: DirectoryCache = self.store.load(&dir);

        let mut entries: Vec<ListEntry> = files
            .into_iter()
            .map(|name| {
                let path = dir.join(&name);
                let record = cache.get(&name);
                let size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
                ListEntry {
                    sparkline: self.sparkline_for(&path, record, spark_width),
                    bpm: record.and_then(|r| r.bpm).filter(|b| *b > 0),
                    pitch_hz: record.and_then(|r| r.pitch_hz),
                    duration: self.duration_for(&path, record),
                    size,
                    name,
                }
            })
            .collect();

        sort_entries(&mut entries, key);
        Ok(entries)
    }
}

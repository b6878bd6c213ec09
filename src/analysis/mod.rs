//! Per-file feature extraction.
//!
//! The heavy lifting (decoding, beat tracking, pitch tracking, stream probing)
//! is done by external programs. This module wraps them behind narrow traits so
//! that the math on top of their output (tempo, note mapping, peak bucketing)
//! can be exercised without spawning processes, and combines their results into
//! an [`AudioRecord`].
//!
//! Every field is extracted independently: a failing tool only leaves its own
//! field empty.

pub mod music;
pub mod tools;

use crate::cache::AudioRecord;
use crate::waveform;
use std::error::Error;
use std::path::Path;

pub use music::{average_pitch, bpm_from_beats, hz_to_note};

/// Produces mono 16-bit samples at a fixed low sample rate
pub trait Decoder: Send + Sync {
    fn decode(&self, path: &Path) -> Result<Vec<i16>, Box<dyn Error>>;
}

/// Beat and fundamental-frequency tracking
pub trait Analyzer: Send + Sync {
    /// Beat timestamps in seconds
    fn beats(&self, path: &Path) -> Result<Vec<f64>, Box<dyn Error>>;
    /// Fundamental frequency estimates in Hz, one per analysis frame
    fn pitch_track(&self, path: &Path) -> Result<Vec<f64>, Box<dyn Error>>;
}

/// Basic stream parameters
pub trait InfoProbe: Send + Sync {
    fn probe(&self, path: &Path) -> Result<StreamInfo, Box<dyn Error>>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamInfo {
    /// Duration as printed by the probe, e.g. `00:00:10.07`
    pub duration: Option<String>,
    pub channels: Option<u16>,
    pub sample_rate: Option<u32>,
    pub bit_depth: Option<u16>,
}

impl StreamInfo {
    pub fn duration_secs(&self) -> Option<f64> {
        self.duration.as_deref().and_then(parse_clock)
    }

    /// Short format summary such as `24b 48000Hz 2ch`; unknown values are blank
    pub fn summary(&self) -> String {
        format!(
            "{}b {}Hz {}ch",
            opt(self.bit_depth),
            opt(self.sample_rate),
            opt(self.channels)
        )
    }
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Parse a `key : value` stream report.
///
/// Recognized keys are `Duration` (text before ` =`), `Channels`,
/// `Sample Rate` and `Precision` (with the `-bit` suffix removed).
pub fn parse_stream_info(report: &str) -> StreamInfo {
    let mut info = StreamInfo::default();

    for line in report.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();

        match key.trim() {
            "Duration" => {
                if let Some(idx) = value.find(" =")
                    && idx > 0
                {
                    info.duration = Some(value[..idx].to_string());
                }
            }
            "Channels" => info.channels = value.parse().ok(),
            "Sample Rate" => info.sample_rate = value.parse().ok(),
            "Precision" => info.bit_depth = value.trim_end_matches("-bit").parse().ok(),
            _ => {}
        }
    }

    info
}

/// Seconds from `HH:MM:SS.ss` or a plain number of seconds
pub fn parse_clock(text: &str) -> Option<f64> {
    let text = text.trim();
    let parts: Vec<&str> = text.split(':').collect();

    match parts.as_slice() {
        [h, m, s] => {
            let h: f64 = h.parse().ok()?;
            let m: f64 = m.parse().ok()?;
            let s: f64 = s.parse().ok()?;
            Some(h * 3600.0 + m * 60.0 + s)
        }
        [m, s] => {
            let m: f64 = m.parse().ok()?;
            let s: f64 = s.parse().ok()?;
            Some(m * 60.0 + s)
        }
        [s] => s.parse().ok(),
        _ => None,
    }
}

/// One timestamp per line; lines that are not numbers are ignored
pub fn parse_beats(output: &str) -> Vec<f64> {
    output
        .lines()
        .filter_map(|line| line.trim().parse().ok())
        .collect()
}

/// `time frequency` pairs; returns the frequency column
pub fn parse_pitch_track(output: &str) -> Vec<f64> {
    output
        .lines()
        .filter_map(|line| line.split_whitespace().nth(1))
        .filter_map(|field| field.parse().ok())
        .collect()
}

/// Little-endian signed 16-bit PCM; a trailing odd byte is dropped
pub fn decode_pcm_s16le(raw: &[u8]) -> Vec<i16> {
    raw.chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

/// Combines the collaborators into a complete record for one file
pub struct FeatureExtractor {
    decoder: Box<dyn Decoder>,
    analyzer: Box<dyn Analyzer>,
    probe: Box<dyn InfoProbe>,
    spark_width: usize,
}

impl FeatureExtractor {
    pub fn new(
        decoder: Box<dyn Decoder>,
        analyzer: Box<dyn Analyzer>,
        probe: Box<dyn InfoProbe>,
        spark_width: usize,
    ) -> Self {
        Self {
            decoder,
            analyzer,
            probe,
            spark_width,
        }
    }

    pub fn spark_width(&self) -> usize {
        self.spark_width
    }

    /// Extract every field for `dir/name`. Never fails; a field whose tool
    /// fails is left empty.
    pub fn extract(&self, dir: &Path, name: &str) -> AudioRecord {
        let path = dir.join(name);
        let mut record = AudioRecord::new(name);

        match self.probe.probe(&path) {
            Ok(info) => {
                record.duration = info.duration;
                record.channels = info.channels;
                record.sample_rate = info.sample_rate;
                record.bit_depth = info.bit_depth;
            }
            Err(e) => log::warn!("Stream info unavailable for {}: {e}", path.display()),
        }

        match self.analyzer.beats(&path) {
            Ok(beats) => record.bpm = bpm_from_beats(&beats),
            Err(e) => log::warn!("Beat tracking failed for {}: {e}", path.display()),
        }

        match self.analyzer.pitch_track(&path) {
            Ok(track) => record.pitch_hz = average_pitch(&track),
            Err(e) => log::warn!("Pitch tracking failed for {}: {e}", path.display()),
        }

        record.sparkline = Some(self.sparkline(&path));

        log::debug!("Extracted {record:?}");
        record
    }

    fn sparkline(&self, path: &Path) -> String {
        let samples = self.decoder.decode(path).unwrap_or_else(|e| {
            log::warn!("Decoding failed for {}: {e}", path.display());
            Vec::new()
        });
        waveform::sparkline_from_samples(&samples, self.spark_width)
    }
}

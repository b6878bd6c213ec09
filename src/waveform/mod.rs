//! Glyph waveforms built from peak envelopes.
//!
//! Every renderer goes through the same peak bucketing so that a sparkline
//! computed at index time and one computed at preview time are identical for
//! the same width.

pub mod format;
pub mod render;

use crate::constants::{BRIGHT, DIM, GLYPHS, RESET};

pub use format::{format_duration, format_size};
pub use render::Renderer;

/// Maximum absolute sample magnitude in each of `width` contiguous buckets.
///
/// Bucket `i` covers samples `i*n/width .. (i+1)*n/width` with integer
/// truncation, so neighbouring buckets may differ by one sample. Buckets that
/// receive no samples (more columns than samples) hold zero.
pub fn peaks(samples: &[i16], width: usize) -> Vec<u16> {
    let n = samples.len();

    (0..width)
        .map(|i| {
            let start = i * n / width;
            let end = (i + 1) * n / width;
            samples[start..end]
                .iter()
                .map(|s| s.unsigned_abs())
                .max()
                .unwrap_or(0)
        })
        .collect()
}

fn max_peak(peaks: &[u16]) -> u16 {
    peaks.iter().copied().max().unwrap_or(0).max(1)
}

/// One glyph per peak, scaled against the loudest peak
pub fn sparkline(peaks: &[u16]) -> String {
    let max = f64::from(max_peak(peaks));
    let top = (GLYPHS.len() - 1) as f64;

    peaks
        .iter()
        .map(|&p| GLYPHS[(f64::from(p) / max * top) as usize])
        .collect()
}

pub fn sparkline_from_samples(samples: &[i16], width: usize) -> String {
    sparkline(&peaks(samples, width))
}

/// Multi-row block plot, top row first.
///
/// Row `r` (0 = bottom) of a column is full when the column's fill level
/// reaches `r + 1`, a partial glyph when the level falls inside the row, and
/// blank above. The bottom row never goes blank so the baseline stays visible.
///
/// With a playback `position` in `[0, 1]` each row is split at
/// `floor(position * width)`: the played part is wrapped in dim markers and the
/// rest in bright markers. The glyphs themselves are unchanged.
pub fn plot(peaks: &[u16], height: usize, position: Option<f64>) -> String {
    let width = peaks.len();
    let max = f64::from(max_peak(peaks));
    let top = (GLYPHS.len() - 1) as f64;
    let split = position.map(|p| (p.max(0.0) * width as f64) as usize);

    let levels: Vec<f64> = peaks
        .iter()
        .map(|&p| f64::from(p) / max * height as f64)
        .collect();

    let rows: Vec<String> = (0..height)
        .rev()
        .map(|row| {
            let floor = row as f64;
            let chars: Vec<char> = levels
                .iter()
                .map(|&level| {
                    if level >= floor + 1.0 {
                        GLYPHS[GLYPHS.len() - 1]
                    } else if level > floor {
                        GLYPHS[((level - floor) * top) as usize]
                    } else if row == 0 {
                        GLYPHS[0]
                    } else {
                        ' '
                    }
                })
                .collect();
            highlight(&chars, split)
        })
        .collect();

    rows.join("\n")
}

fn highlight(chars: &[char], split: Option<usize>) -> String {
    match split {
        Some(split) if split < chars.len() => {
            let played: String = chars[..split].iter().collect();
            let rest: String = chars[split..].iter().collect();
            format!("{DIM}{played}{BRIGHT}{rest}{RESET}")
        }
        Some(_) => {
            let row: String = chars.iter().collect();
            format!("{DIM}{row}{RESET}")
        }
        None => chars.iter().collect(),
    }
}

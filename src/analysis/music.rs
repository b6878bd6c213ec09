//! Tempo and pitch math on top of raw analyzer output.

use crate::constants::MIN_PITCH_HZ;

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Tempo in beats per minute from a list of beat timestamps (seconds).
///
/// The average interval is the span between the first and last beat divided
/// by the number of intervals, which keeps a single irregular gap from
/// dominating the estimate. Returns `None` for fewer than two beats or a
/// non-positive average interval.
pub fn bpm_from_beats(beats: &[f64]) -> Option<u32> {
    if beats.len() < 2 {
        return None;
    }

    let span = beats[beats.len() - 1] - beats[0];
    let interval = span / (beats.len() - 1) as f64;
    if !(interval > 0.0) {
        return None;
    }

    Some((60.0 / interval).round() as u32)
}

/// Mean of the readings strictly above the audible floor, in whole Hz as
/// the cache stores it
pub fn average_pitch(frequencies: &[f64]) -> Option<f64> {
    let valid: Vec<f64> = frequencies
        .iter()
        .copied()
        .filter(|hz| *hz > MIN_PITCH_HZ)
        .collect();

    if valid.is_empty() {
        return None;
    }

    Some((valid.iter().sum::<f64>() / valid.len() as f64).round())
}

/// Nearest equal-tempered note name for a frequency, e.g. 440 Hz -> `A4`
pub fn hz_to_note(hz: f64) -> Option<String> {
    if !(hz > MIN_PITCH_HZ) {
        return None;
    }

    let midi = (69.0 + 12.0 * (hz / 440.0).log2()).round();
    if !(0.0..=127.0).contains(&midi) {
        return None;
    }

    let midi = midi as i32;
    Some(format!("{}{}", NOTE_NAMES[(midi % 12) as usize], midi / 12 - 1))
}

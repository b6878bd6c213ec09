//! Tab-separated text form of a directory cache.
//!
//! One record per line, columns in a fixed order:
//! `name, bpm, pitch_hz, duration, channels, sample_rate, bit_depth, sparkline`.
//! Absent values are written as empty columns. Decoding is lenient: short or
//! malformed lines are skipped and unparseable numbers become absent values.

use super::AudioRecord;
use crate::constants::CACHE_MIN_FIELDS;
use std::str::FromStr;

pub fn encode(records: &[AudioRecord]) -> String {
    let mut out = String::new();
    for record in records {
        out.push_str(&encode_line(record));
        out.push('\n');
    }
    out
}

fn encode_line(record: &AudioRecord) -> String {
    let fields = [
        record.name.clone(),
        column(record.bpm),
        record
            .pitch_hz
            .map(|hz| format!("{hz:.0}"))
            .unwrap_or_default(),
        record.duration.clone().unwrap_or_default(),
        column(record.channels),
        column(record.sample_rate),
        column(record.bit_depth),
        record.sparkline.clone().unwrap_or_default(),
    ];
    fields.join("\t")
}

fn column<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

pub fn decode(text: &str) -> Vec<AudioRecord> {
    text.lines().filter_map(decode_line).collect()
}

fn decode_line(line: &str) -> Option<AudioRecord> {
    let fields: Vec<&str> = line.trim_end_matches('\r').split('\t').collect();
    if fields.len() < CACHE_MIN_FIELDS || fields[0].is_empty() {
        return None;
    }

    Some(AudioRecord {
        name: fields[0].to_string(),
        bpm: parse(fields[1]),
        pitch_hz: parse(fields[2]),
        duration: text(fields[3]),
        channels: parse(fields[4]),
        sample_rate: parse(fields[5]),
        bit_depth: parse(fields[6]),
        sparkline: fields.get(7).and_then(|s| text(s)),
    })
}

fn parse<T: FromStr>(field: &str) -> Option<T> {
    let field = field.trim();
    if field.is_empty() {
        None
    } else {
        field.parse().ok()
    }
}

fn text(field: &str) -> Option<String> {
    if field.is_empty() {
        None
    } else {
        Some(field.to_string())
    }
}

use alf_audio::analysis::hz_to_note;
use alf_audio::cache::{AudioRecord, CacheStore, DirectoryCache};
use alf_audio::config::Config;
use alf_audio::utils::scan::is_audio_file;
use std::collections::HashMap;
use std::error::Error;
use std::path::{Path, PathBuf};

/// Print `addcustominfo` commands for the cached files among `files`, joined
/// by `; ` so lf can run them as one command line. Prints nothing when none
/// of them are cached.
pub fn handle_meta(files: &[String]) -> Result<(), Box<dyn Error>> {
    let config = Config::load()?;
    let store = CacheStore::from_config(&config)?;
    let mut caches: HashMap<PathBuf, DirectoryCache> = HashMap::new();

    let mut commands = Vec::new();
    for arg in files {
        let path = Path::new(arg);
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        if !is_audio_file(&name) {
            continue;
        }

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let cache = caches
            .entry(dir)
            .or_insert_with_key(|dir| store.load(dir));

        if let Some(record) = cache.get(&name) {
            commands.push(format!(
                "addcustominfo \"{}\" \"{}\"",
                lf_escape(arg),
                lf_escape(&custom_info(record))
            ));
        }
    }

    if !commands.is_empty() {
        print!("{}", commands.join("; "));
    }

    Ok(())
}

/// `spark bpm key`: the sparkline when cached, tempo padded to three columns
/// even when unknown, and the note name when there is a pitch
fn custom_info(record: &AudioRecord) -> String {
    let mut parts = Vec::new();

    if let Some(spark) = record.sparkline.as_deref().filter(|s| !s.is_empty()) {
        parts.push(spark.to_string());
    }

    let bpm = record.bpm.map(|b| b.to_string()).unwrap_or_default();
    parts.push(format!("{bpm:>3}"));

    if let Some(note) = record.pitch_hz.and_then(hz_to_note) {
        parts.push(format!("{note:<3}"));
    }

    parts.join(" ")
}

fn lf_escape(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\'', "\\'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_info_full_record() {
        let mut record = AudioRecord::new("kick.wav");
        record.sparkline = Some("▁▃█▃▁".to_string());
        record.bpm = Some(96);
        record.pitch_hz = Some(440.0);
        assert_eq!(custom_info(&record), "▁▃█▃▁  96 A4 ");
    }

    #[test]
    fn test_custom_info_keeps_bpm_column() {
        let record = AudioRecord::new("pad.wav");
        assert_eq!(custom_info(&record), "   ");

        let mut record = AudioRecord::new("pad.wav");
        record.pitch_hz = Some(261.63);
        assert_eq!(custom_info(&record), "    C4 ");
    }

    #[test]
    fn test_lf_escape() {
        assert_eq!(lf_escape(r#"it's "loud".wav"#), r#"it\'s \"loud\".wav"#);
        assert_eq!(lf_escape(r"back\slash"), r"back\\slash");
    }
}

use alf_audio::analysis::{Analyzer, Decoder, FeatureExtractor, InfoProbe, StreamInfo};
use alf_audio::cache::CacheStore;
use alf_audio::index::{IndexMode, IndexPipeline, NoProgress};
use std::error::Error;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

struct RampDecoder;

impl Decoder for RampDecoder {
    fn decode(&self, _path: &Path) -> Result<Vec<i16>, Box<dyn Error>> {
        Ok((0..400).map(|i| (i * 80) as i16).collect())
    }
}

/// Counts calls so tests can tell which files were re-extracted
#[derive(Default)]
struct FixedAnalyzer {
    calls: Arc<AtomicUsize>,
    fail_beats: bool,
}

impl Analyzer for FixedAnalyzer {
    fn beats(&self, _path: &Path) -> Result<Vec<f64>, Box<dyn Error>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_beats {
            return Err("beat tracker crashed".into());
        }
        Ok(vec![0.0, 0.5, 1.0, 1.5])
    }

    fn pitch_track(&self, _path: &Path) -> Result<Vec<f64>, Box<dyn Error>> {
        Ok(vec![0.0, 440.0, 440.0])
    }
}

struct FixedProbe;

impl InfoProbe for FixedProbe {
    fn probe(&self, _path: &Path) -> Result<StreamInfo, Box<dyn Error>> {
        Ok(StreamInfo {
            duration: Some("00:00:02.00".to_string()),
            channels: Some(2),
            sample_rate: Some(44100),
            bit_depth: Some(16),
        })
    }
}

fn extractor(calls: &Arc<AtomicUsize>, fail_beats: bool) -> FeatureExtractor {
    FeatureExtractor::new(
        Box::new(RampDecoder),
        Box::new(FixedAnalyzer {
            calls: Arc::clone(calls),
            fail_beats,
        }),
        Box::new(FixedProbe),
        10,
    )
}

fn touch(dir: &Path, names: &[&str]) {
    for name in names {
        fs::write(dir.join(name), b"RIFF").unwrap();
    }
}

fn cached_names(store: &CacheStore, dir: &Path) -> Vec<String> {
    let text = fs::read_to_string(store.path_for(dir)).unwrap();
    text.lines()
        .map(|line| line.split('\t').next().unwrap().to_string())
        .collect()
}

#[test]
fn test_incremental_indexing() {
    let music = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();
    touch(music.path(), &["b.wav", "a.flac", "notes.txt"]);

    let calls = Arc::new(AtomicUsize::new(0));
    let extractor = extractor(&calls, false);
    let store = CacheStore::new(cache.path());
    let pipeline = IndexPipeline::new(&extractor, &store, 4);

    let report = pipeline
        .run(music.path(), IndexMode::Incremental, &NoProgress)
        .unwrap();
    assert_eq!(report.total, 2);
    assert_eq!(report.indexed, 2);
    assert_eq!(report.cache_path, Some(store.path_for(music.path())));
    assert_eq!(cached_names(&store, music.path()), vec!["a.flac", "b.wav"]);

    // Nothing new: no extraction and no write
    let before = fs::metadata(store.path_for(music.path()))
        .unwrap()
        .modified()
        .unwrap();
    let report = pipeline
        .run(music.path(), IndexMode::Incremental, &NoProgress)
        .unwrap();
    assert_eq!(report.indexed, 0);
    assert_eq!(report.cache_path, None);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    let after = fs::metadata(store.path_for(music.path()))
        .unwrap()
        .modified()
        .unwrap();
    assert_eq!(before, after);

    // Only the new file is extracted
    touch(music.path(), &["c.mp3"]);
    let report = pipeline
        .run(music.path(), IndexMode::Incremental, &NoProgress)
        .unwrap();
    assert_eq!(report.indexed, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(
        cached_names(&store, music.path()),
        vec!["a.flac", "b.wav", "c.mp3"]
    );
}

#[test]
fn test_force_reindexes_everything() {
    let music = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();
    touch(music.path(), &["a.wav", "b.wav", "c.wav"]);

    let calls = Arc::new(AtomicUsize::new(0));
    let extractor = extractor(&calls, false);
    let store = CacheStore::new(cache.path());
    let pipeline = IndexPipeline::new(&extractor, &store, 2);

    pipeline
        .run(music.path(), IndexMode::Incremental, &NoProgress)
        .unwrap();
    let report = pipeline
        .run(music.path(), IndexMode::Force, &NoProgress)
        .unwrap();

    assert_eq!(report.indexed, 3);
    assert_eq!(calls.load(Ordering::SeqCst), 6);
}

#[test]
fn test_records_carry_extracted_fields() {
    let music = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();
    touch(music.path(), &["loop.wav"]);

    let calls = Arc::new(AtomicUsize::new(0));
    let extractor = extractor(&calls, false);
    let store = CacheStore::new(cache.path());
    IndexPipeline::new(&extractor, &store, 1)
        .run(music.path(), IndexMode::Incremental, &NoProgress)
        .unwrap();

    let loaded = store.load(music.path());
    let record = loaded.get("loop.wav").unwrap();
    assert_eq!(record.bpm, Some(120));
    assert_eq!(record.pitch_hz, Some(440.0));
    assert_eq!(record.duration_secs(), Some(2.0));
    assert_eq!(record.channels, Some(2));
    assert_eq!(record.sample_rate, Some(44100));
    assert_eq!(record.bit_depth, Some(16));
    assert_eq!(record.sparkline_at(10).map(|s| s.chars().count()), Some(10));
}

#[test]
fn test_failed_tool_only_empties_its_field() {
    let music = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();
    touch(music.path(), &["loop.wav"]);

    let calls = Arc::new(AtomicUsize::new(0));
    let extractor = extractor(&calls, true);
    let store = CacheStore::new(cache.path());
    IndexPipeline::new(&extractor, &store, 1)
        .run(music.path(), IndexMode::Incremental, &NoProgress)
        .unwrap();

    let loaded = store.load(music.path());
    let record = loaded.get("loop.wav").unwrap();
    assert_eq!(record.bpm, None);
    assert_eq!(record.pitch_hz, Some(440.0));
    assert!(record.sparkline.is_some());
}

#[test]
fn test_deleted_files_drop_out_on_next_write() {
    let music = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();
    touch(music.path(), &["a.wav", "b.wav"]);

    let calls = Arc::new(AtomicUsize::new(0));
    let extractor = extractor(&calls, false);
    let store = CacheStore::new(cache.path());
    let pipeline = IndexPipeline::new(&extractor, &store, 2);
    pipeline
        .run(music.path(), IndexMode::Incremental, &NoProgress)
        .unwrap();

    fs::remove_file(music.path().join("b.wav")).unwrap();
    touch(music.path(), &["c.wav"]);
    pipeline
        .run(music.path(), IndexMode::Incremental, &NoProgress)
        .unwrap();

    assert_eq!(cached_names(&store, music.path()), vec!["a.wav", "c.wav"]);
}

#[test]
fn test_directories_have_separate_caches() {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();
    touch(first.path(), &["one.wav"]);
    touch(second.path(), &["two.wav"]);

    let calls = Arc::new(AtomicUsize::new(0));
    let extractor = extractor(&calls, false);
    let store = CacheStore::new(cache.path());
    let pipeline = IndexPipeline::new(&extractor, &store, 2);

    let a = pipeline
        .run(first.path(), IndexMode::Incremental, &NoProgress)
        .unwrap();
    let b = pipeline
        .run(second.path(), IndexMode::Incremental, &NoProgress)
        .unwrap();

    assert_ne!(a.cache_path, b.cache_path);
    assert!(store.load(first.path()).get("two.wav").is_none());
    assert!(store.load(second.path()).get("two.wav").is_some());
}

#[test]
fn test_empty_and_missing_directories() {
    let music = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let extractor = extractor(&calls, false);
    let store = CacheStore::new(cache.path());
    let pipeline = IndexPipeline::new(&extractor, &store, 2);

    let report = pipeline
        .run(music.path(), IndexMode::Force, &NoProgress)
        .unwrap();
    assert_eq!(report.total, 0);
    assert_eq!(report.cache_path, None);
    assert!(!store.path_for(music.path()).exists());

    let missing = music.path().join("nope");
    assert!(
        pipeline
            .run(&missing, IndexMode::Incremental, &NoProgress)
            .is_err()
    );
}

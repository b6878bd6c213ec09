//! Bring a directory's metadata cache up to date.
//!
//! Extraction of each file is independent and dominated by external tool run
//! time, so files are processed on a fixed-size rayon pool. Workers only send
//! finished records over a channel; the calling thread is the single collector
//! and the only one touching the merged cache. The cache file is rewritten in
//! full once every selected file is done, or not at all.

use crate::analysis::FeatureExtractor;
use crate::cache::{AudioRecord, CacheStore, canonical_path};
use crate::utils::scan::list_audio_files;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexMode {
    /// Only files missing from the cache
    Incremental,
    /// Every audio file in the directory
    Force,
}

/// Observer for per-file progress. `started` is called from worker threads.
pub trait IndexProgress: Sync {
    fn selected(&self, _selected: usize, _total: usize) {}
    fn started(&self, _name: &str) {}
    fn finished(&self, _record: &AudioRecord) {}
}

pub struct NoProgress;

impl IndexProgress for NoProgress {}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexReport {
    /// Audio files found in the directory
    pub total: usize,
    /// Files extracted during this run
    pub indexed: usize,
    /// Cache file written, `None` when nothing needed doing
    pub cache_path: Option<PathBuf>,
}

pub struct IndexPipeline<'a> {
    extractor: &'a FeatureExtractor,
    store: &'a CacheStore,
    workers: usize,
}

impl<'a> IndexPipeline<'a> {
    pub fn new(extractor: &'a FeatureExtractor, store: &'a CacheStore, workers: usize) -> Self {
        Self {
            extractor,
            store,
            workers: workers.max(1),
        }
    }

    pub fn run(
        &self,
        dir: &Path,
        mode: IndexMode,
        progress: &dyn IndexProgress,
    ) -> Result<IndexReport, Box<dyn Error>> {
        let dir = canonical_path(dir);
        let files = list_audio_files(&dir)?;
        let mut cache = self.store.load(&dir);

        let selected: Vec<&String> = files
            .iter()
            .filter(|name| mode == IndexMode::Force || !cache.contains(name))
            .collect();

        progress.selected(selected.len(), files.len());
        log::info!(
            "Indexing {}/{} files in {}",
            selected.len(),
            files.len(),
            dir.display()
        );

        if selected.is_empty() {
            return Ok(IndexReport {
                total: files.len(),
                indexed: 0,
                cache_path: None,
            });
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("alf-index-{i}"))
            .build()?;

        let (tx, rx) = mpsc::channel::<AudioRecord>();
        let extractor = self.extractor;
        let dir_ref = dir.as_path();
        let mut indexed = 0;

        pool.in_place_scope(|scope| {
            for name in &selected {
                let tx = tx.clone();
                scope.spawn(move |_| {
                    progress.started(name);
                    let record = extractor.extract(dir_ref, name);
                    let _ = tx.send(record);
                });
            }
            drop(tx);

            for record in rx {
                progress.finished(&record);
                cache.insert(record);
                indexed += 1;
            }
        });

        let records = cache.ordered(&files);
        let cache_path = self.store.save(&dir, &records)?;

        Ok(IndexReport {
            total: files.len(),
            indexed,
            cache_path: Some(cache_path),
        })
    }
}

use alf_audio::analysis::FeatureExtractor;
use alf_audio::analysis::tools::{AubioAnalyzer, SoxDecoder, SoxProbe};
use alf_audio::cache::{AudioRecord, CacheStore};
use alf_audio::config::Config;
use alf_audio::index::{IndexMode, IndexPipeline, IndexProgress, IndexReport};
use alf_audio::utils::{progress::create_progress_bar, validation::validate_directory};
use indicatif::ProgressBar;
use owo_colors::OwoColorize;
use std::error::Error;
use std::path::Path;

/// Drives the indexing progress bar from the worker callbacks
struct BarProgress {
    bar: ProgressBar,
}

impl IndexProgress for BarProgress {
    fn selected(&self, selected: usize, total: usize) {
        self.bar.set_length(selected as u64);
        if selected > 0 {
            self.bar.println(format!(
                "{} {}/{} files...",
                "Indexing".bright_black(),
                selected.to_string().cyan(),
                total
            ));
        }
    }

    fn started(&self, name: &str) {
        self.bar.set_message(name.to_string());
    }

    fn finished(&self, _record: &AudioRecord) {
        self.bar.inc(1);
    }
}

pub fn handle_index(dir: &str, force: bool) -> Result<(), Box<dyn Error>> {
    let dir = Path::new(dir);
    validate_directory(dir)?;

    let config = Config::load()?;
    let store = CacheStore::from_config(&config)?;
    let extractor = FeatureExtractor::new(
        Box::new(SoxDecoder::from_config(&config)),
        Box::new(AubioAnalyzer::from_config(&config)),
        Box::new(SoxProbe::from_config(&config)),
        config.index_spark_width,
    );
    let pipeline = IndexPipeline::new(&extractor, &store, config.index_workers);

    let mode = if force {
        IndexMode::Force
    } else {
        IndexMode::Incremental
    };

    let progress = BarProgress {
        bar: create_progress_bar(0),
    };
    let result = pipeline.run(dir, mode, &progress);
    progress.bar.finish_and_clear();

    print_report(dir, &result?);
    Ok(())
}

fn print_report(dir: &Path, report: &IndexReport) {
    if report.total == 0 {
        println!(
            "{} No audio files in {}",
            "⚠".yellow(),
            dir.display().to_string().cyan()
        );
        return;
    }

    match &report.cache_path {
        None => println!(
            "{} Cache up to date ({} files)",
            "✓".green().bold(),
            report.total
        ),
        Some(path) => {
            println!(
                "{} {} Cached {} files",
                "✓".green().bold(),
                "Index updated:".green(),
                report.total.to_string().cyan()
            );
            println!(
                "  {} {}",
                "Extracted:".bright_black(),
                report.indexed.to_string().cyan()
            );
            println!(
                "  {} {}",
                "Cache:".bright_black(),
                path.display().to_string().cyan()
            );
        }
    }
}

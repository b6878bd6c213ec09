use alf_audio::analysis::tools::{SoxDecoder, SoxProbe};
use alf_audio::cache::CacheStore;
use alf_audio::config::Config;
use alf_audio::utils::validation::validate_directory;
use alf_audio::waveform::Renderer;
use alf_audio::waveform::render::SortKey;
use std::error::Error;
use std::path::Path;

pub fn handle_list(dir: &str, sort: SortKey, spark: usize) -> Result<(), Box<dyn Error>> {
    let dir = Path::new(dir);
    validate_directory(dir)?;

    let config = Config::load()?;
    let store = CacheStore::from_config(&config)?;
    let decoder = SoxDecoder::from_config(&config);
    let probe = SoxProbe::from_config(&config);
    let renderer = Renderer::new(&decoder, &probe, &store);

    for entry in renderer.listing(dir, sort, spark.max(1))? {
        println!("{}", entry.line());
    }

    Ok(())
}

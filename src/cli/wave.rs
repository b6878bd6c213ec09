use alf_audio::analysis::tools::{SoxDecoder, SoxProbe};
use alf_audio::cache::{CacheStore, canonical_path};
use alf_audio::config::Config;
use alf_audio::playback::{FsSessionStore, SessionStore};
use alf_audio::utils::validation::validate_path_exists;
use alf_audio::waveform::Renderer;
use std::error::Error;
use std::path::Path;

const FALLBACK_WIDTH: usize = 80;

pub struct WaveOptions {
    pub width: Option<usize>,
    pub height: usize,
    pub oneline: bool,
    pub directory: bool,
    pub position: Option<f64>,
}

pub fn handle_wave(path: &str, options: &WaveOptions) -> Result<(), Box<dyn Error>> {
    let path = Path::new(path);
    validate_path_exists(path)?;

    let config = Config::load()?;
    let store = CacheStore::from_config(&config)?;
    let decoder = SoxDecoder::from_config(&config);
    let probe = SoxProbe::from_config(&config);
    let renderer = Renderer::new(&decoder, &probe, &store);

    let width = options.width.unwrap_or_else(terminal_width).max(1);

    let output = if options.directory || path.is_dir() {
        renderer.render_directory(path, width, config.list_max_files)?
    } else if options.oneline {
        renderer.render_oneline(path, width)
    } else {
        let position = options
            .position
            .or_else(|| playing_position(&config, path))
            .map(|p| p.clamp(0.0, 1.0));
        renderer.render_full(path, width, options.height.max(1), position)
    };

    println!("{output}");
    Ok(())
}

fn terminal_width() -> usize {
    crossterm::terminal::size()
        .map(|(cols, _)| cols as usize)
        .ok()
        .filter(|cols| *cols > 0)
        .unwrap_or(FALLBACK_WIDTH)
}

/// Stored position when the active session is playing `path`
fn playing_position(config: &Config, path: &Path) -> Option<f64> {
    let session = FsSessionStore::new(config.state_dir()).load()?;
    if session.file == canonical_path(path) {
        session.position
    } else {
        None
    }
}

use alf_audio::analysis::InfoProbe;
use alf_audio::analysis::tools::SoxProbe;
use alf_audio::cache::{CacheStore, canonical_path};
use alf_audio::config::Config;
use alf_audio::constants::PLAYER_SOCKET;
use alf_audio::playback::{
    AutoplayCommand, Daemon, FsSessionStore, LfRemote, MpvIpc, MpvLauncher, NoRefresh, PauseAction,
    Refresher, SeekTarget, SessionStatus, UnixSignals, install_terminate_flag, spawn_controller,
};
use alf_audio::utils::validation::validate_path_exists;
use alf_audio::waveform::format_duration;
use owo_colors::OwoColorize;
use std::error::Error;
use std::fs;
use std::path::Path;

/// Wire the production collaborators together and hand the daemon to `f`.
/// Browser refreshes are only sent when a viewer id is known.
fn with_daemon<T>(
    viewer: Option<&str>,
    f: impl FnOnce(Daemon<'_>) -> Result<T, Box<dyn Error>>,
) -> Result<T, Box<dyn Error>> {
    let config = Config::load()?;
    let state_dir = config.state_dir();
    fs::create_dir_all(&state_dir)?;

    let socket = state_dir.join(PLAYER_SOCKET);
    let store = FsSessionStore::new(&state_dir);
    let control = MpvIpc::new(&socket, config.ipc_timeout());
    let launcher = MpvLauncher::new(&config.tools.player, &socket);
    let signals = UnixSignals;
    let refresher: Box<dyn Refresher> = match viewer {
        Some(id) => Box::new(LfRemote::new(&config.tools.browser, id)),
        None => Box::new(NoRefresh),
    };

    let daemon = Daemon::new(&store, &control, &launcher, &signals, refresher.as_ref())
        .with_poll_interval(config.poll_interval());
    f(daemon)
}

fn start_controller(path: &Path, viewer: &str) -> Result<(), Box<dyn Error>> {
    validate_path_exists(path)?;
    let exe = std::env::current_exe()?;
    spawn_controller(&exe, &canonical_path(path), viewer)?;
    Ok(())
}

pub fn handle_play(path: &str, viewer: &str) -> Result<(), Box<dyn Error>> {
    start_controller(Path::new(path), viewer)
}

/// Body of the detached controller process
pub fn handle_controller(path: &str, viewer: &str) -> Result<(), Box<dyn Error>> {
    let shutdown = install_terminate_flag()?;
    log::info!("Controller {} starting for {path}", std::process::id());

    let result = with_daemon(Some(viewer), |daemon| {
        daemon.with_shutdown(shutdown).play(Path::new(path))
    });
    if let Err(e) = &result {
        log::error!("Controller for {path} failed: {e}");
    }
    result
}

pub fn handle_pause(path: Option<&str>, viewer: Option<&str>) -> Result<(), Box<dyn Error>> {
    let action = with_daemon(None, |daemon| Ok(daemon.pause(path.map(Path::new))))?;

    match action {
        PauseAction::Toggled | PauseAction::Idle => Ok(()),
        PauseAction::Start(file) => {
            let viewer = viewer.ok_or("A viewer id is required to start playback")?;
            start_controller(&file, viewer)
        }
    }
}

pub fn handle_stop() -> Result<(), Box<dyn Error>> {
    with_daemon(None, |daemon| daemon.stop())
}

pub fn handle_seek(target: &SeekTarget) -> Result<(), Box<dyn Error>> {
    let sought = with_daemon(None, |daemon| Ok(daemon.seek(target)))?;
    if !sought {
        log::debug!("Seek {target} ignored: nothing playing");
    }
    Ok(())
}

pub fn handle_autoplay(command: AutoplayCommand) -> Result<(), Box<dyn Error>> {
    let on = with_daemon(None, |daemon| daemon.autoplay(command))?;

    if on {
        println!("autoplay: {}", "ON".green().bold());
    } else {
        println!("autoplay: {}", "OFF".bright_black());
    }

    Ok(())
}

/// Prints nothing when idle so lf can show the output verbatim
pub fn handle_status() -> Result<(), Box<dyn Error>> {
    let Some(status) = with_daemon(None, |daemon| Ok(daemon.status()))? else {
        return Ok(());
    };

    let config = Config::load()?;
    let total = total_duration(&config, &status.file);
    println!("{}", status_line(&status, total));

    Ok(())
}

/// Cached duration, else whatever the probe reports
fn total_duration(config: &Config, file: &Path) -> Option<f64> {
    let cached = match (file.parent(), file.file_name()) {
        (Some(dir), Some(name)) => CacheStore::from_config(config)
            .ok()
            .and_then(|store| {
                store
                    .load(dir)
                    .get(&name.to_string_lossy())
                    .and_then(|record| record.duration_secs())
            }),
        _ => None,
    };

    cached.or_else(|| {
        SoxProbe::from_config(config)
            .probe(file)
            .ok()
            .and_then(|info| info.duration_secs())
    })
}

fn status_line(status: &SessionStatus, total: Option<f64>) -> String {
    let glyph = if status.paused { "⏸" } else { "▶" };
    let name = status
        .file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    match total.filter(|t| *t > 0.0) {
        Some(total) => {
            let now = total * status.position.unwrap_or(0.0);
            format!(
                "{glyph} {} / {}  {name}",
                format_duration(now),
                format_duration(total)
            )
        }
        None => format!("{glyph} {name}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn status(position: Option<f64>, paused: bool) -> SessionStatus {
        SessionStatus {
            file: PathBuf::from("/music/loop.wav"),
            position,
            paused,
        }
    }

    #[test]
    fn test_status_line() {
        assert_eq!(
            status_line(&status(Some(0.5), false), Some(20.0)),
            "▶ 10.0s / 20.0s  loop.wav"
        );
        assert_eq!(
            status_line(&status(None, true), Some(90.0)),
            "⏸ 0.0s / 1:30.0  loop.wav"
        );
        assert_eq!(status_line(&status(Some(0.5), false), None), "▶ loop.wav");
    }
}

use alf_audio::playback::{
    AutoplayCommand, Daemon, FsSessionStore, NoRefresh, PlayerControl, PlayerHandle,
    PlayerLauncher, ProcessSignals, Refresher, SessionStore,
};
use serde_json::{Value, json};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

/// Player that reports a scripted sequence of percentages, then exits
struct ScriptedPlayer {
    percents: RefCell<VecDeque<f64>>,
    seen_files: RefCell<Vec<String>>,
    state_dir: PathBuf,
}

impl ScriptedPlayer {
    fn new(state_dir: &Path, percents: &[f64]) -> Self {
        Self {
            percents: RefCell::new(percents.iter().copied().collect()),
            seen_files: RefCell::new(Vec::new()),
            state_dir: state_dir.to_path_buf(),
        }
    }
}

impl PlayerControl for ScriptedPlayer {
    fn request(&self, command: &[Value]) -> Option<Value> {
        if command.first() != Some(&json!("get_property")) {
            return None;
        }
        // Snapshot what a polling browser would see at this tick
        if let Ok(pos) = fs::read_to_string(self.state_dir.join("pos")) {
            self.seen_files.borrow_mut().push(pos);
        }
        self.percents.borrow_mut().pop_front().map(|p| json!(p))
    }

    fn ready(&self) -> bool {
        true
    }
}

struct CountdownHandle(usize);

impl PlayerHandle for CountdownHandle {
    fn is_alive(&mut self) -> bool {
        if self.0 == 0 {
            return false;
        }
        self.0 -= 1;
        true
    }

    fn stop(&mut self) {
        self.0 = 0;
    }

    fn wait(&mut self) {}
}

struct CountdownLauncher(usize);

impl PlayerLauncher for CountdownLauncher {
    fn launch(&self, _file: &Path) -> Result<Box<dyn PlayerHandle>, Box<dyn Error>> {
        Ok(Box::new(CountdownHandle(self.0)))
    }
}

#[derive(Default)]
struct RecordingSignals {
    terminated: RefCell<Vec<u32>>,
}

impl ProcessSignals for RecordingSignals {
    fn terminate(&self, pid: u32) {
        self.terminated.borrow_mut().push(pid);
    }

    fn is_alive(&self, _pid: u32) -> bool {
        true
    }
}

#[derive(Default)]
struct CountingRefresher(Cell<usize>);

impl Refresher for CountingRefresher {
    fn refresh(&self) {
        self.0.set(self.0.get() + 1);
    }
}

fn daemon<'a>(
    store: &'a FsSessionStore,
    control: &'a dyn PlayerControl,
    launcher: &'a dyn PlayerLauncher,
    signals: &'a dyn ProcessSignals,
    refresher: &'a dyn Refresher,
    pid: u32,
) -> Daemon<'a> {
    Daemon::new(store, control, launcher, signals, refresher)
        .with_pid(pid)
        .with_poll_interval(Duration::ZERO)
        .with_socket_wait(1, Duration::ZERO)
        .with_settle(Duration::ZERO)
}

#[test]
fn test_play_publishes_position_files_then_cleans_up() {
    let state = TempDir::new().unwrap();
    let music = TempDir::new().unwrap();
    let track = music.path().join("loop.wav");
    fs::write(&track, b"RIFF").unwrap();

    let store = FsSessionStore::new(state.path());
    let player = ScriptedPlayer::new(state.path(), &[12.5, 50.0, 100.0]);
    let launcher = CountdownLauncher(3);
    let signals = RecordingSignals::default();
    let refresher = CountingRefresher::default();

    daemon(&store, &player, &launcher, &signals, &refresher, 100)
        .play(&track)
        .unwrap();

    // Each tick the browser sees the position written by the previous one
    assert_eq!(*player.seen_files.borrow(), vec!["0.1250", "0.5000"]);
    assert_eq!(refresher.0.get(), 4);

    for name in ["pid", "pos", "file"] {
        assert!(!state.path().join(name).exists(), "{name} left behind");
    }
}

#[test]
fn test_session_files_while_active() {
    let state = TempDir::new().unwrap();
    let music = TempDir::new().unwrap();
    let track = music.path().join("loop.wav");
    fs::write(&track, b"RIFF").unwrap();

    let store = FsSessionStore::new(state.path());
    let player = ScriptedPlayer::new(state.path(), &[]);
    let launcher = CountdownLauncher(1);
    let signals = RecordingSignals::default();

    let active = daemon(&store, &player, &launcher, &signals, &NoRefresh, 4242)
        .start(&track)
        .unwrap();

    assert_eq!(fs::read_to_string(state.path().join("pid")).unwrap(), "4242");
    let recorded = PathBuf::from(fs::read_to_string(state.path().join("file")).unwrap());
    assert!(recorded.is_absolute());
    assert_eq!(recorded, active.file);
    assert_eq!(recorded, fs::canonicalize(&track).unwrap());
    assert!(!state.path().join("pos").exists());
}

#[test]
fn test_preemption_leaves_only_the_new_session() {
    let state = TempDir::new().unwrap();
    let music = TempDir::new().unwrap();
    let a = music.path().join("a.wav");
    let b = music.path().join("b.wav");
    fs::write(&a, b"RIFF").unwrap();
    fs::write(&b, b"RIFF").unwrap();

    let store = FsSessionStore::new(state.path());
    let player = ScriptedPlayer::new(state.path(), &[]);
    let launcher = CountdownLauncher(10);
    let signals = RecordingSignals::default();

    let first = daemon(&store, &player, &launcher, &signals, &NoRefresh, 100);
    let second = daemon(&store, &player, &launcher, &signals, &NoRefresh, 200);

    let active_a = first.start(&a).unwrap();
    second.start(&b).unwrap();
    first.monitor(active_a).unwrap();

    assert_eq!(*signals.terminated.borrow(), vec![100]);
    let session = store.load().unwrap();
    assert_eq!(session.pid, 200);
    assert_eq!(session.file, fs::canonicalize(&b).unwrap());
}

#[test]
fn test_stop_twice_without_session() {
    let state = TempDir::new().unwrap();
    let store = FsSessionStore::new(state.path());
    let player = ScriptedPlayer::new(state.path(), &[]);
    let launcher = CountdownLauncher(0);
    let signals = RecordingSignals::default();
    let d = daemon(&store, &player, &launcher, &signals, &NoRefresh, 1);

    d.stop().unwrap();
    d.stop().unwrap();

    assert!(signals.terminated.borrow().is_empty());
    assert_eq!(fs::read_dir(state.path()).unwrap().count(), 0);
}

#[test]
fn test_autoplay_survives_stop() {
    let state = TempDir::new().unwrap();
    let store = FsSessionStore::new(state.path());
    let player = ScriptedPlayer::new(state.path(), &[]);
    let launcher = CountdownLauncher(0);
    let signals = RecordingSignals::default();
    let d = daemon(&store, &player, &launcher, &signals, &NoRefresh, 1);

    assert!(d.autoplay(AutoplayCommand::On).unwrap());
    d.stop().unwrap();
    assert!(d.autoplay(AutoplayCommand::Query).unwrap());
    assert!(state.path().join("autoplay").exists());
}

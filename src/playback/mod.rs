//! Playback daemon: one external player at a time, its progress republished
//! as session files for the browser to poll.
//!
//! A session moves Idle -> Starting -> Active -> Idle. Whether an active
//! session is playing or paused is never stored; it is asked of the player.
//! The controller that owns a session records its pid, and every new
//! session first terminates whichever controller is recorded, so at most one
//! process ever writes the position.

pub mod ipc;
pub mod process;
pub mod session;

pub use ipc::{MpvIpc, PlayerControl, SeekTarget};
pub use process::{
    LfRemote, MpvLauncher, NoRefresh, PlayerHandle, PlayerLauncher, ProcessSignals, Refresher,
    UnixSignals, install_terminate_flag, spawn_controller,
};
pub use session::{FsSessionStore, MemorySessionStore, Session, SessionStore};

use crate::cache::canonical_path;
use crate::constants::{
    CONTROL_MISS_LIMIT, PREEMPT_SETTLE_MS, SOCKET_WAIT_INTERVAL_MS, SOCKET_WAIT_RETRIES,
};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

const DEFAULT_POLL_INTERVAL_MS: u64 = 300;

/// What `pause` did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PauseAction {
    /// An active session was paused or resumed
    Toggled,
    /// Nothing was playing; the caller should start this file
    Start(PathBuf),
    /// Nothing was playing and there is nothing to start
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum AutoplayCommand {
    On,
    Off,
    Toggle,
    #[value(skip)]
    Query,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionStatus {
    pub file: PathBuf,
    pub position: Option<f64>,
    pub paused: bool,
}

/// A session this process started and is responsible for
pub struct ActiveSession {
    pub file: PathBuf,
    player: Box<dyn PlayerHandle>,
}

pub struct Daemon<'a> {
    store: &'a dyn SessionStore,
    control: &'a dyn PlayerControl,
    launcher: &'a dyn PlayerLauncher,
    signals: &'a dyn ProcessSignals,
    refresher: &'a dyn Refresher,
    pid: u32,
    poll_interval: Duration,
    socket_retries: u32,
    socket_interval: Duration,
    settle: Duration,
    shutdown: Option<&'a AtomicBool>,
}

impl<'a> Daemon<'a> {
    pub fn new(
        store: &'a dyn SessionStore,
        control: &'a dyn PlayerControl,
        launcher: &'a dyn PlayerLauncher,
        signals: &'a dyn ProcessSignals,
        refresher: &'a dyn Refresher,
    ) -> Self {
        Self {
            store,
            control,
            launcher,
            signals,
            refresher,
            pid: std::process::id(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            socket_retries: SOCKET_WAIT_RETRIES,
            socket_interval: Duration::from_millis(SOCKET_WAIT_INTERVAL_MS),
            settle: Duration::from_millis(PREEMPT_SETTLE_MS),
            shutdown: None,
        }
    }

    /// Act as controller `pid` instead of the current process
    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = pid;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_socket_wait(mut self, retries: u32, interval: Duration) -> Self {
        self.socket_retries = retries;
        self.socket_interval = interval;
        self
    }

    /// Pause between telling the old player to quit and clearing its state
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Once `flag` is set the monitor stops its player and exits
    pub fn with_shutdown(mut self, flag: &'a AtomicBool) -> Self {
        self.shutdown = Some(flag);
        self
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown.is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    fn owns_session(&self) -> bool {
        self.store
            .load()
            .is_some_and(|session| session.pid == self.pid)
    }

    /// End whatever session is recorded and remove its state
    pub fn preempt(&self) -> Result<(), Box<dyn Error>> {
        if let Some(previous) = self.store.load() {
            if previous.pid != self.pid {
                log::info!(
                    "Preempting controller {} ({})",
                    previous.pid,
                    previous.file.display()
                );
                self.signals.terminate(previous.pid);
            }
        }

        self.control.quit();
        thread::sleep(self.settle);
        self.store.clear()
    }

    /// Take over the session and launch the player on `path`
    pub fn start(&self, path: &Path) -> Result<ActiveSession, Box<dyn Error>> {
        self.preempt()?;

        let file = canonical_path(path);
        self.store.save(&Session {
            file: file.clone(),
            pid: self.pid,
            position: None,
        })?;

        let player = match self.launcher.launch(&file) {
            Ok(player) => player,
            Err(e) => {
                self.store.clear()?;
                return Err(e);
            }
        };

        for _ in 0..self.socket_retries {
            if self.control.ready() {
                break;
            }
            thread::sleep(self.socket_interval);
        }
        if !self.control.ready() {
            log::warn!("Player control channel not ready; continuing without it");
        }

        Ok(ActiveSession { file, player })
    }

    /// Publish progress until the player exits or another session takes over
    pub fn monitor(&self, mut active: ActiveSession) -> Result<(), Box<dyn Error>> {
        let mut last: Option<f64> = None;
        let mut answered = false;
        let mut misses = 0;

        loop {
            if !active.player.is_alive() {
                log::info!("Player exited for {}", active.file.display());
                break;
            }
            if self.shutdown_requested() {
                log::info!("Stop requested for {}", active.file.display());
                active.player.stop();
                break;
            }
            if !self.owns_session() {
                log::info!("Session for {} was taken over", active.file.display());
                active.player.stop();
                break;
            }

            match self.control.position() {
                Some(position) => {
                    answered = true;
                    misses = 0;
                    let position = (position * 10_000.0).round() / 10_000.0;
                    if last != Some(position) {
                        let session = Session {
                            file: active.file.clone(),
                            pid: self.pid,
                            position: Some(position),
                        };
                        match self.store.save(&session) {
                            Ok(()) => self.refresher.refresh(),
                            Err(e) => log::warn!("Failed to record position: {e}"),
                        }
                        last = Some(position);
                    }
                }
                // Misses only count once the channel has answered, so a slow socket is not fatal
                None if answered => {
                    misses += 1;
                    if misses >= CONTROL_MISS_LIMIT {
                        log::info!("Player stopped answering for {}", active.file.display());
                        active.player.stop();
                        break;
                    }
                }
                None => {}
            }

            thread::sleep(self.poll_interval);
        }

        active.player.wait();
        if self.owns_session() {
            self.store.clear()?;
        }
        self.refresher.refresh();
        Ok(())
    }

    pub fn play(&self, path: &Path) -> Result<(), Box<dyn Error>> {
        let active = self.start(path)?;
        self.monitor(active)
    }

    /// Toggle an active session, or report what should be started instead
    pub fn pause(&self, target: Option<&Path>) -> PauseAction {
        if self.control.is_active() {
            self.control.toggle_pause();
            return PauseAction::Toggled;
        }
        match target {
            Some(path) => PauseAction::Start(path.to_path_buf()),
            None => PauseAction::Idle,
        }
    }

    pub fn stop(&self) -> Result<(), Box<dyn Error>> {
        self.preempt()
    }

    /// Returns false when nothing is playing
    pub fn seek(&self, target: &SeekTarget) -> bool {
        if !self.control.is_active() {
            return false;
        }
        self.control.seek(*target);
        true
    }

    /// Apply `command` and return the resulting flag
    pub fn autoplay(&self, command: AutoplayCommand) -> Result<bool, Box<dyn Error>> {
        match command {
            AutoplayCommand::On => self.store.set_autoplay(true)?,
            AutoplayCommand::Off => self.store.set_autoplay(false)?,
            AutoplayCommand::Toggle => self.store.set_autoplay(!self.store.autoplay())?,
            AutoplayCommand::Query => {}
        }
        Ok(self.store.autoplay())
    }

    /// The live session, if any. State left by a dead controller is removed.
    pub fn status(&self) -> Option<SessionStatus> {
        let session = self.store.load()?;
        if !self.signals.is_alive(session.pid) {
            log::info!("Clearing stale session of controller {}", session.pid);
            if let Err(e) = self.store.clear() {
                log::warn!("Failed to clear stale session: {e}");
            }
            return None;
        }

        Some(SessionStatus {
            position: self.control.position().or(session.position),
            paused: self.control.is_paused().unwrap_or(false),
            file: session.file,
        })
    }
}

//! Persistence of the playback session and the autoplay flag.
//!
//! Production state lives as small plain files in the state directory so that
//! shell hooks can read them: `pid` (controller process id), `file` (absolute
//! path being played), `pos` (fraction played, four decimals) and `autoplay`
//! (presence means on). [`MemorySessionStore`] keeps the same state in memory
//! for tests.

use crate::constants::{AUTOPLAY_FILE, FILE_FILE, PID_FILE, POS_FILE};
use std::error::Error;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// Absolute path of the file being played
    pub file: PathBuf,
    /// Process id of the controller that owns the session
    pub pid: u32,
    /// Fraction played, 0.0 to 1.0, once the player has reported it
    pub position: Option<f64>,
}

pub trait SessionStore {
    /// Current session, or `None` when no controller has written one
    fn load(&self) -> Option<Session>;
    fn save(&self, session: &Session) -> Result<(), Box<dyn Error>>;
    /// Remove all session state. Succeeds when there is nothing to remove.
    fn clear(&self) -> Result<(), Box<dyn Error>>;
    fn autoplay(&self) -> bool;
    fn set_autoplay(&self, on: bool) -> Result<(), Box<dyn Error>>;
}

pub struct FsSessionStore {
    dir: PathBuf,
}

impl FsSessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    fn read(&self, name: &str) -> Option<String> {
        fs::read_to_string(self.path(name))
            .ok()
            .map(|s| s.trim().to_string())
    }

    /// Write through a temporary sibling so pollers never see a torn value
    fn write(&self, name: &str, contents: &str) -> Result<(), Box<dyn Error>> {
        let path = self.path(name);
        let tmp = self.path(&format!(".{name}.tmp"));
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<(), Box<dyn Error>> {
        match fs::remove_file(self.path(name)) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

impl SessionStore for FsSessionStore {
    fn load(&self) -> Option<Session> {
        let file = self.read(FILE_FILE).filter(|f| !f.is_empty())?;
        let pid = self.read(PID_FILE)?.parse().ok()?;
        let position = self.read(POS_FILE).and_then(|p| p.parse().ok());

        Some(Session {
            file: PathBuf::from(file),
            pid,
            position,
        })
    }

    fn save(&self, session: &Session) -> Result<(), Box<dyn Error>> {
        fs::create_dir_all(&self.dir)?;

        self.write(PID_FILE, &session.pid.to_string())?;
        self.write(FILE_FILE, &session.file.to_string_lossy())?;
        match session.position {
            Some(pos) => self.write(POS_FILE, &format!("{pos:.4}"))?,
            None => self.remove(POS_FILE)?,
        }

        Ok(())
    }

    fn clear(&self) -> Result<(), Box<dyn Error>> {
        for name in [POS_FILE, FILE_FILE, PID_FILE] {
            self.remove(name)?;
        }
        Ok(())
    }

    fn autoplay(&self) -> bool {
        self.path(AUTOPLAY_FILE).exists()
    }

    fn set_autoplay(&self, on: bool) -> Result<(), Box<dyn Error>> {
        if on {
            fs::create_dir_all(&self.dir)?;
            fs::write(self.path(AUTOPLAY_FILE), b"")?;
            Ok(())
        } else {
            self.remove(AUTOPLAY_FILE)
        }
    }
}

/// In-memory store with the same semantics as [`FsSessionStore`]
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    session: Mutex<Option<Session>>,
    autoplay: Mutex<bool>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Option<Session> {
        self.session.lock().ok()?.clone()
    }

    fn save(&self, session: &Session) -> Result<(), Box<dyn Error>> {
        let mut slot = self.session.lock().map_err(|_| "session lock poisoned")?;
        *slot = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), Box<dyn Error>> {
        let mut slot = self.session.lock().map_err(|_| "session lock poisoned")?;
        *slot = None;
        Ok(())
    }

    fn autoplay(&self) -> bool {
        self.autoplay.lock().map(|on| *on).unwrap_or(false)
    }

    fn set_autoplay(&self, on: bool) -> Result<(), Box<dyn Error>> {
        let mut flag = self.autoplay.lock().map_err(|_| "autoplay lock poisoned")?;
        *flag = on;
        Ok(())
    }
}

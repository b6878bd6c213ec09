//! External processes the daemon drives: the player, other controllers and
//! the file browser.

use std::error::Error;
use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};

/// A running player process
pub trait PlayerHandle {
    fn is_alive(&mut self) -> bool;
    /// Kill the process if it is still running
    fn stop(&mut self);
    /// Block until the process has exited
    fn wait(&mut self);
}

pub trait PlayerLauncher {
    fn launch(&self, file: &Path) -> Result<Box<dyn PlayerHandle>, Box<dyn Error>>;
}

/// Starts `mpv` headless with its IPC server on `socket`
pub struct MpvLauncher {
    program: OsString,
    socket: PathBuf,
}

impl MpvLauncher {
    pub fn new(program: impl Into<OsString>, socket: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            socket: socket.into(),
        }
    }
}

impl PlayerLauncher for MpvLauncher {
    fn launch(&self, file: &Path) -> Result<Box<dyn PlayerHandle>, Box<dyn Error>> {
        match fs::remove_file(&self.socket) {
            Err(e) if e.kind() != ErrorKind::NotFound => return Err(e.into()),
            _ => {}
        }

        let mut ipc_arg = OsString::from("--input-ipc-server=");
        ipc_arg.push(&self.socket);

        let child = Command::new(&self.program)
            .arg("--no-terminal")
            .arg("--no-video")
            .arg(ipc_arg)
            .arg(file)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| format!("Failed to start {}: {e}", self.program.to_string_lossy()))?;

        log::info!("Player started (pid {}) for {}", child.id(), file.display());
        Ok(Box::new(ChildHandle { child }))
    }
}

struct ChildHandle {
    child: Child,
}

impl PlayerHandle for ChildHandle {
    fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    fn stop(&mut self) {
        if self.is_alive() {
            let _ = self.child.kill();
        }
    }

    fn wait(&mut self) {
        let _ = self.child.wait();
    }
}

/// Signalling of processes known only by pid
pub trait ProcessSignals {
    /// Ask `pid` to exit. A dead or invalid pid is ignored.
    fn terminate(&self, pid: u32);
    fn is_alive(&self, pid: u32) -> bool;
}

pub struct UnixSignals;

impl UnixSignals {
    fn kill(pid: u32, signal: libc::c_int) -> bool {
        // pid 0 and overflowing values address process groups, never a single process
        let Ok(pid) = libc::pid_t::try_from(pid) else {
            return false;
        };
        if pid <= 0 {
            return false;
        }
        unsafe { libc::kill(pid, signal) == 0 }
    }
}

impl ProcessSignals for UnixSignals {
    fn terminate(&self, pid: u32) {
        if !Self::kill(pid, libc::SIGTERM) {
            log::debug!("No process {pid} to terminate");
        }
    }

    fn is_alive(&self, pid: u32) -> bool {
        Self::kill(pid, 0)
    }
}

static TERMINATE_REQUESTED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_terminate(_signal: libc::c_int) {
    TERMINATE_REQUESTED.store(true, Ordering::SeqCst);
}

/// Turn SIGTERM into a flag so a controller can stop its player and clean up
/// instead of dying mid-session
pub fn install_terminate_flag() -> Result<&'static AtomicBool, Box<dyn Error>> {
    let handler = on_terminate as extern "C" fn(libc::c_int) as libc::sighandler_t;
    let previous = unsafe { libc::signal(libc::SIGTERM, handler) };
    if previous == libc::SIG_ERR {
        return Err(format!(
            "Failed to install SIGTERM handler: {}",
            std::io::Error::last_os_error()
        )
        .into());
    }
    Ok(&TERMINATE_REQUESTED)
}

/// Tells the file browser to redraw
pub trait Refresher {
    fn refresh(&self);
}

/// `lf -remote "send <id> reload"`
pub struct LfRemote {
    program: OsString,
    id: String,
}

impl LfRemote {
    pub fn new(program: impl Into<OsString>, id: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            id: id.into(),
        }
    }
}

impl Refresher for LfRemote {
    fn refresh(&self) {
        let status = Command::new(&self.program)
            .arg("-remote")
            .arg(format!("send {} reload", self.id))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        if let Err(e) = status {
            log::debug!("Browser refresh failed: {e}");
        }
    }
}

pub struct NoRefresh;

impl Refresher for NoRefresh {
    fn refresh(&self) {}
}

/// Run `<exe> controller <path> <viewer>` detached from the terminal and the
/// caller's process group, returning its pid
pub fn spawn_controller(exe: &Path, path: &Path, viewer: &str) -> Result<u32, Box<dyn Error>> {
    let child = Command::new(exe)
        .arg("controller")
        .arg(path)
        .arg(viewer)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .process_group(0)
        .spawn()?;

    log::info!("Controller {} spawned for {}", child.id(), path.display());
    Ok(child.id())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_signals_ignore_invalid_pids() {
        let signals = UnixSignals;
        assert!(!signals.is_alive(0));
        assert!(!signals.is_alive(u32::MAX));
        signals.terminate(0);
    }

    #[test]
    fn test_own_process_is_alive() {
        assert!(UnixSignals.is_alive(std::process::id()));
    }

    #[test]
    fn test_sigterm_sets_flag() {
        let flag = install_terminate_flag().unwrap();
        assert!(!flag.load(Ordering::SeqCst));

        unsafe { libc::raise(libc::SIGTERM) };
        assert!(flag.load(Ordering::SeqCst));
        // the process survives to run this line
        assert!(UnixSignals.is_alive(std::process::id()));
    }

    #[test]
    fn test_launcher_missing_program() {
        let temp_dir = TempDir::new().unwrap();
        let launcher = MpvLauncher::new("alf-no-such-player", temp_dir.path().join("mpv"));
        assert!(launcher.launch(Path::new("/music/a.wav")).is_err());
    }

    #[test]
    fn test_launcher_removes_stale_socket() {
        let temp_dir = TempDir::new().unwrap();
        let socket = temp_dir.path().join("mpv");
        fs::write(&socket, b"stale").unwrap();

        let launcher = MpvLauncher::new("true", &socket);
        let mut handle = launcher.launch(Path::new("/music/a.wav")).unwrap();
        handle.wait();

        assert!(!socket.exists());
        assert!(!handle.is_alive());
    }

    #[test]
    fn test_child_handle_stop() {
        let temp_dir = TempDir::new().unwrap();
        let launcher = MpvLauncher::new("sleep", temp_dir.path().join("mpv"));
        let mut handle = launcher.launch(Path::new("5")).unwrap();
        handle.stop();
        handle.wait();
        assert!(!handle.is_alive());
    }
}

//! Control channel to the external player.
//!
//! mpv exposes a JSON IPC server on a unix socket: one request object per
//! line (`{"command": [...]}`), answered by one object whose `data` field holds
//! the result. Unsolicited `event` lines may be interleaved and are skipped.
//! Every failure (no socket, refused connection, timeout, bad JSON) collapses
//! into `None`, which callers treat as "no active session".

use serde_json::{Value, json};
use std::fmt;
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, Instant};

/// Where to move the playhead
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeekTarget {
    /// Seconds forward (positive) or back (negative)
    Relative(f64),
    /// Seconds from the start
    Absolute(f64),
    /// Percent of the track
    Percent(f64),
}

impl SeekTarget {
    fn mode(&self) -> &'static str {
        match self {
            SeekTarget::Relative(_) => "relative",
            SeekTarget::Absolute(_) => "absolute",
            SeekTarget::Percent(_) => "absolute-percent",
        }
    }

    fn amount(&self) -> f64 {
        match *self {
            SeekTarget::Relative(v) | SeekTarget::Absolute(v) | SeekTarget::Percent(v) => v,
        }
    }
}

impl FromStr for SeekTarget {
    type Err = String;

    /// `+5` / `-5` seek relative seconds, `30` jumps to 30s, `50%` to the middle
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || format!("Invalid seek offset '{s}' (expected +N, -N, N or N%)");

        if let Some(percent) = s.strip_suffix('%') {
            let value: f64 = percent.trim().parse().map_err(|_| invalid())?;
            return Ok(SeekTarget::Percent(value.clamp(0.0, 100.0)));
        }

        let value: f64 = s.parse().map_err(|_| invalid())?;
        if !value.is_finite() {
            return Err(invalid());
        }
        if s.starts_with('+') || s.starts_with('-') {
            Ok(SeekTarget::Relative(value))
        } else {
            Ok(SeekTarget::Absolute(value))
        }
    }
}

impl fmt::Display for SeekTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeekTarget::Relative(v) => write!(f, "{v:+}s"),
            SeekTarget::Absolute(v) => write!(f, "{v}s"),
            SeekTarget::Percent(v) => write!(f, "{v}%"),
        }
    }
}

pub trait PlayerControl {
    /// Send one command, returning the response's `data` when present
    fn request(&self, command: &[Value]) -> Option<Value>;

    /// Whether the control channel can be connected to yet
    fn ready(&self) -> bool;

    /// Fraction played, 0.0 to 1.0
    fn position(&self) -> Option<f64> {
        self.request(&[json!("get_property"), json!("percent-pos")])
            .and_then(|v| v.as_f64())
            .map(|pct| (pct / 100.0).clamp(0.0, 1.0))
    }

    /// A player is answering on the channel
    fn is_active(&self) -> bool {
        self.request(&[json!("get_property"), json!("pid")])
            .is_some()
    }

    fn is_paused(&self) -> Option<bool> {
        self.request(&[json!("get_property"), json!("pause")])
            .and_then(|v| v.as_bool())
    }

    fn toggle_pause(&self) {
        self.request(&[json!("cycle"), json!("pause")]);
    }

    fn seek(&self, target: SeekTarget) {
        self.request(&[json!("seek"), json!(target.amount()), json!(target.mode())]);
    }

    fn quit(&self) {
        self.request(&[json!("quit")]);
    }
}

/// mpv JSON IPC over a unix socket
pub struct MpvIpc {
    socket: PathBuf,
    timeout: Duration,
}

impl MpvIpc {
    pub fn new(socket: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            socket: socket.into(),
            timeout,
        }
    }

    pub fn socket(&self) -> &Path {
        &self.socket
    }

    fn exchange(&self, command: &[Value]) -> std::io::Result<Option<Value>> {
        let stream = UnixStream::connect(&self.socket)?;
        stream.set_read_timeout(Some(self.timeout))?;
        stream.set_write_timeout(Some(self.timeout))?;

        let mut request = json!({ "command": command }).to_string();
        request.push('\n');
        (&stream).write_all(request.as_bytes())?;

        let deadline = Instant::now() + self.timeout;
        let mut reader = BufReader::new(&stream);
        let mut line = String::new();

        while Instant::now() < deadline {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                break;
            }
            let Ok(response) = serde_json::from_str::<Value>(&line) else {
                continue;
            };
            if response.get("event").is_some() {
                continue;
            }
            return Ok(response.get("data").filter(|d| !d.is_null()).cloned());
        }

        Ok(None)
    }
}

impl PlayerControl for MpvIpc {
    fn request(&self, command: &[Value]) -> Option<Value> {
        match self.exchange(command) {
            Ok(data) => data,
            Err(e) => {
                log::debug!("Player IPC {command:?} failed: {e}");
                None
            }
        }
    }

    fn ready(&self) -> bool {
        self.socket.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::net::UnixListener;
    use std::thread;
    use tempfile::TempDir;

    #[test]
    fn test_seek_target_parse() {
        assert_eq!("+5".parse::<SeekTarget>(), Ok(SeekTarget::Relative(5.0)));
        assert_eq!("-2.5".parse::<SeekTarget>(), Ok(SeekTarget::Relative(-2.5)));
        assert_eq!("30".parse::<SeekTarget>(), Ok(SeekTarget::Absolute(30.0)));
        assert_eq!("50%".parse::<SeekTarget>(), Ok(SeekTarget::Percent(50.0)));
        assert_eq!("150%".parse::<SeekTarget>(), Ok(SeekTarget::Percent(100.0)));
        assert!("later".parse::<SeekTarget>().is_err());
        assert!("".parse::<SeekTarget>().is_err());
        assert!("inf".parse::<SeekTarget>().is_err());
    }

    #[test]
    fn test_missing_socket_is_unavailable() {
        let temp_dir = TempDir::new().unwrap();
        let ipc = MpvIpc::new(temp_dir.path().join("mpv"), Duration::from_millis(100));
        assert!(!ipc.ready());
        assert!(!ipc.is_active());
        assert_eq!(ipc.position(), None);
    }

    #[test]
    fn test_request_skips_events_and_reads_data() {
        let temp_dir = TempDir::new().unwrap();
        let socket = temp_dir.path().join("mpv");
        let listener = UnixListener::bind(&socket).unwrap();

        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(&stream);
            let mut request = String::new();
            reader.read_line(&mut request).unwrap();
            (&stream)
                .write_all(b"{\"event\":\"playback-restart\"}\n{\"data\":42.0,\"error\":\"success\"}\n")
                .unwrap();
            request
        });

        let ipc = MpvIpc::new(&socket, Duration::from_secs(2));
        assert!(ipc.ready());
        assert_eq!(ipc.position(), Some(0.42));

        let request: Value = serde_json::from_str(&server.join().unwrap()).unwrap();
        assert_eq!(request, json!({ "command": ["get_property", "percent-pos"] }));
    }
}

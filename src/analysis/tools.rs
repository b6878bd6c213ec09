//! Bindings to the external command-line tools (sox, aubio).

use super::{
    Analyzer, Decoder, InfoProbe, StreamInfo, decode_pcm_s16le, parse_beats, parse_pitch_track,
    parse_stream_info,
};
use crate::config::Config;
use crate::constants::DECODE_SAMPLE_RATE;
use std::error::Error;
use std::ffi::OsStr;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const WAIT_STEP: Duration = Duration::from_millis(20);

/// Run `program` with `args` and return its stdout.
///
/// Spawn failure, a non-zero exit status and running past `timeout` are all
/// errors; a timed-out child is killed.
pub fn run_tool<S: AsRef<OsStr>>(
    program: &str,
    args: &[S],
    timeout: Duration,
) -> Result<Vec<u8>, Box<dyn Error>> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| format!("Failed to launch '{program}': {e}"))?;

    // Drain stdout on a separate thread so a chatty tool never blocks on a full pipe
    let mut stdout = child.stdout.take().ok_or("Child stdout unavailable")?;
    let reader = thread::spawn(move || {
        let mut buf = Vec::new();
        stdout.read_to_end(&mut buf).map(|_| buf)
    });

    let started = Instant::now();
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if started.elapsed() >= timeout {
            let _ = child.kill();
            let _ = child.wait();
            return Err(format!("'{program}' timed out after {timeout:?}").into());
        }
        thread::sleep(WAIT_STEP);
    };

    let output = reader
        .join()
        .map_err(|_| format!("Reader thread for '{program}' panicked"))??;

    if !status.success() {
        return Err(format!("'{program}' exited with {status}").into());
    }

    Ok(output)
}

/// `sox <file> -c 1 -r 8000 -b 16 -e signed-integer -t raw -`
pub struct SoxDecoder {
    program: String,
    timeout: Duration,
}

impl SoxDecoder {
    pub fn new(program: &str, timeout: Duration) -> Self {
        Self {
            program: program.to_string(),
            timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.tools.decoder, config.tool_timeout())
    }
}

impl Decoder for SoxDecoder {
    fn decode(&self, path: &Path) -> Result<Vec<i16>, Box<dyn Error>> {
        let rate = DECODE_SAMPLE_RATE.to_string();
        let args = [
            path.as_os_str(),
            OsStr::new("-c"),
            OsStr::new("1"),
            OsStr::new("-r"),
            OsStr::new(&rate),
            OsStr::new("-b"),
            OsStr::new("16"),
            OsStr::new("-e"),
            OsStr::new("signed-integer"),
            OsStr::new("-t"),
            OsStr::new("raw"),
            OsStr::new("-"),
        ];
        let raw = run_tool(&self.program, &args, self.timeout)?;
        Ok(decode_pcm_s16le(&raw))
    }
}

/// `sox --i <file>`
pub struct SoxProbe {
    program: String,
    timeout: Duration,
}

impl SoxProbe {
    pub fn new(program: &str, timeout: Duration) -> Self {
        Self {
            program: program.to_string(),
            timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.tools.decoder, config.tool_timeout())
    }
}

impl InfoProbe for SoxProbe {
    fn probe(&self, path: &Path) -> Result<StreamInfo, Box<dyn Error>> {
        let out = run_tool(&self.program, &[OsStr::new("--i"), path.as_os_str()], self.timeout)?;
        Ok(parse_stream_info(&String::from_utf8_lossy(&out)))
    }
}

/// `aubiotrack <file>` and `aubiopitch -p yinfft <file>`
pub struct AubioAnalyzer {
    beat_tracker: String,
    pitch_detector: String,
    timeout: Duration,
}

impl AubioAnalyzer {
    pub fn new(beat_tracker: &str, pitch_detector: &str, timeout: Duration) -> Self {
        Self {
            beat_tracker: beat_tracker.to_string(),
            pitch_detector: pitch_detector.to_string(),
            timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.tools.beat_tracker,
            &config.tools.pitch_detector,
            config.tool_timeout(),
        )
    }
}

impl Analyzer for AubioAnalyzer {
    fn beats(&self, path: &Path) -> Result<Vec<f64>, Box<dyn Error>> {
        let out = run_tool(&self.beat_tracker, &[path.as_os_str()], self.timeout)?;
        Ok(parse_beats(&String::from_utf8_lossy(&out)))
    }

    fn pitch_track(&self, path: &Path) -> Result<Vec<f64>, Box<dyn Error>> {
        let args = [OsStr::new("-p"), OsStr::new("yinfft"), path.as_os_str()];
        let out = run_tool(&self.pitch_detector, &args, self.timeout)?;
        Ok(parse_pitch_track(&String::from_utf8_lossy(&out)))
    }
}

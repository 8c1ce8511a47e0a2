//! Bridge to an external decoder for formats the backend cannot play.
//!
//! Decoding blocks the calling thread until the tool exits. There is no
//! timeout: a tool that hangs keeps its worker busy until the process ends.

use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

use super::error::PlayerError;
use super::pcm::{PcmBuffer, PcmFormat, read_capped};

#[derive(Debug, Clone)]
pub struct DecodeRequest {
    pub path: PathBuf,
    /// Offset into the source where decoding starts.
    pub start: Duration,
    /// Stop after this much audio (the byte cap is derived from it).
    pub max_duration: Option<Duration>,
}

impl DecodeRequest {
    pub fn whole(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            start: Duration::ZERO,
            max_duration: None,
        }
    }

    pub fn from_offset(path: impl Into<PathBuf>, start: Duration) -> Self {
        Self {
            start,
            ..Self::whole(path)
        }
    }

    pub fn capped(path: impl Into<PathBuf>, max: Duration) -> Self {
        Self {
            max_duration: Some(max),
            ..Self::whole(path)
        }
    }
}

pub trait Transcoder: Send + Sync {
    fn decode(&self, req: &DecodeRequest) -> Result<PcmBuffer, PlayerError>;
}

/// Runs `ffmpeg` (or a compatible tool) and collects raw s16le from stdout.
pub struct FfmpegTranscoder {
    program: String,
    format: PcmFormat,
}

impl FfmpegTranscoder {
    pub fn new(program: impl Into<String>, format: PcmFormat) -> Self {
        Self {
            program: program.into(),
            format,
        }
    }

    fn args(&self, req: &DecodeRequest) -> Vec<String> {
        let mut args: Vec<String> = ["-hide_banner", "-loglevel", "error", "-nostdin"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        if !req.start.is_zero() {
            args.push("-ss".into());
            args.push(format!("{:.3}", req.start.as_secs_f64()));
        }
        args.push("-i".into());
        args.push(req.path.to_string_lossy().into_owned());
        if let Some(max) = req.max_duration {
            args.push("-t".into());
            args.push(format!("{:.3}", max.as_secs_f64()));
        }
        args.extend(
            [
                "-vn".to_string(),
                "-ac".to_string(),
                self.format.channels.to_string(),
                "-ar".to_string(),
                self.format.sample_rate.to_string(),
                "-f".to_string(),
                "s16le".to_string(),
                "pipe:1".to_string(),
            ]
            .into_iter(),
        );
        args
    }
}

/// Last non-empty line of a tool's stderr, for error messages.
fn stderr_tail(stderr: &[u8]) -> String {
    String::from_utf8_lossy(stderr)
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("no output")
        .trim()
        .to_string()
}

pub(crate) fn spawn_error(program: &str, path: &Path, e: std::io::Error) -> PlayerError {
    if e.kind() == ErrorKind::NotFound {
        PlayerError::ExternalToolMissing {
            tool: program.to_string(),
        }
    } else {
        PlayerError::decode(path, format!("failed to start {program}: {e}"))
    }
}

/// Pipe or wait failures belong to the file being decoded, not the engine.
fn child_io_error(path: &Path, e: std::io::Error) -> PlayerError {
    PlayerError::decode(path, format!("decoder i/o failed: {e}"))
}

impl Transcoder for FfmpegTranscoder {
    fn decode(&self, req: &DecodeRequest) -> Result<PcmBuffer, PlayerError> {
        tracing::debug!(path = %req.path.display(), start = ?req.start, "transcoding");

        let mut child = Command::new(&self.program)
            .args(self.args(req))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| spawn_error(&self.program, &req.path, e))?;

        // Drain stderr on the side so a chatty tool cannot fill the pipe and stall.
        let stderr_reader = child.stderr.take().map(|mut err| {
            thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = err.read_to_end(&mut buf);
                buf
            })
        });

        let cap = req.max_duration.map(|d| self.format.bytes_for(d));
        let read = match child.stdout.take() {
            Some(out) => read_capped(out, cap),
            None => Ok(Vec::new()),
        };
        if cap.is_some() {
            // The tool may still be writing past the cap.
            let _ = child.kill();
        }
        let status = child.wait().map_err(|e| child_io_error(&req.path, e))?;
        let stderr = stderr_reader
            .and_then(|h| h.join().ok())
            .unwrap_or_default();

        let bytes = read.map_err(|e| child_io_error(&req.path, e))?;
        let capped_early = cap.is_some_and(|c| bytes.len() >= c);
        if !status.success() && !capped_early {
            return Err(PlayerError::decode(&req.path, stderr_tail(&stderr)));
        }
        if bytes.is_empty() {
            if !req.start.is_zero() {
                // Started at or past the last frame: nothing left to play.
                return Ok(PcmBuffer::new(bytes, self.format));
            }
            return Err(PlayerError::decode(&req.path, "decoder produced no audio"));
        }

        let buf = PcmBuffer::new(bytes, self.format);
        tracing::debug!(
            path = %req.path.display(),
            bytes = buf.byte_len(),
            "transcode finished"
        );
        Ok(buf)
    }
}

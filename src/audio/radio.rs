//! Internet radio: an external stream decoder plus one feeder thread.
//!
//! The decoder writes raw s16le to stdout. The feeder converts it to f32 in
//! fixed-size chunks and pushes them through a bounded channel to the
//! backend's stream source. When the stream ends the feeder reports it; there
//! is no reconnect.

use std::io::{self, Read};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{Sender, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::error::PlayerError;
use super::pcm::{PcmFormat, s16le_to_f32};
use super::stream::{PcmStream, pcm_channel};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioEvent {
    /// The decoder stopped producing audio (EOF or read error).
    Ended { session_id: u64, reason: String },
}

pub struct RadioEngine {
    program: String,
    format: PcmFormat,
    chunk: Duration,
    depth: usize,
    next_id: AtomicU64,
}

impl RadioEngine {
    pub fn new(program: impl Into<String>, format: PcmFormat, chunk: Duration, depth: usize) -> Self {
        Self {
            program: program.into(),
            format,
            chunk,
            depth,
            next_id: AtomicU64::new(1),
        }
    }

    fn args(&self, url: &str) -> Vec<String> {
        let mut args: Vec<String> = ["-hide_banner", "-loglevel", "error", "-nostdin", "-i"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        args.push(url.to_string());
        args.extend([
            "-vn".to_string(),
            "-ac".to_string(),
            self.format.channels.to_string(),
            "-ar".to_string(),
            self.format.sample_rate.to_string(),
            "-f".to_string(),
            "s16le".to_string(),
            "pipe:1".to_string(),
        ]);
        args
    }

    /// Spawn the decoder for `url` and start feeding. The returned stream is
    /// handed to the backend; `events` receives `Ended` for this session.
    pub fn connect(
        &self,
        url: &str,
        events: Sender<RadioEvent>,
    ) -> Result<(RadioSession, PcmStream), PlayerError> {
        let mut child = Command::new(&self.program)
            .args(self.args(url))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| PlayerError::RadioUnavailable(format!("{}: {e}", self.program)))?;

        let Some(stdout) = child.stdout.take() else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(PlayerError::RadioUnavailable(format!(
                "{}: no stdout",
                self.program
            )));
        };

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, stream) = pcm_channel(self.format, self.depth);
        let stop = Arc::new(AtomicBool::new(false));
        let running = Arc::new(AtomicBool::new(true));
        let chunk_bytes = self.format.bytes_for(self.chunk).max(self.format.bytes_per_frame());

        let feeder = Feeder {
            id,
            out: stdout,
            tx,
            chunk_bytes,
            stop: Arc::clone(&stop),
            running: Arc::clone(&running),
            events,
        };
        let join = thread::Builder::new()
            .name("radio-feeder".into())
            .spawn(move || feeder.run());
        let join = match join {
            Ok(j) => j,
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(PlayerError::RadioUnavailable(e.to_string()));
            }
        };

        tracing::info!(url, session = id, pid = child.id(), "radio connected");
        Ok((
            RadioSession {
                id,
                url: url.to_string(),
                child: Some(child),
                feeder: Some(join),
                stop,
                running,
            },
            stream,
        ))
    }
}

struct Feeder {
    id: u64,
    out: ChildStdout,
    tx: SyncSender<Vec<f32>>,
    chunk_bytes: usize,
    stop: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    events: Sender<RadioEvent>,
}

impl Feeder {
    fn run(mut self) {
        let reason = self.pump();
        self.running.store(false, Ordering::SeqCst);
        if let Some(reason) = reason {
            tracing::info!(session = self.id, %reason, "radio stream ended");
            let _ = self.events.send(RadioEvent::Ended {
                session_id: self.id,
                reason,
            });
        }
    }

    /// Returns why the stream ended, or `None` when asked to stop.
    fn pump(&mut self) -> Option<String> {
        let mut buf = vec![0u8; self.chunk_bytes];
        loop {
            if self.stopped() {
                return None;
            }
            let n = match read_full(&mut self.out, &mut buf) {
                Ok(0) => return (!self.stopped()).then(|| "end of stream".to_string()),
                Ok(n) => n,
                Err(e) => return (!self.stopped()).then(|| e.to_string()),
            };
            let mut chunk = s16le_to_f32(&buf[..n]);
            loop {
                match self.tx.try_send(chunk) {
                    Ok(()) => break,
                    Err(TrySendError::Full(c)) => {
                        if self.stopped() {
                            return None;
                        }
                        chunk = c;
                        thread::sleep(Duration::from_millis(5));
                    }
                    Err(TrySendError::Disconnected(_)) => {
                        return (!self.stopped()).then(|| "output closed".to_string());
                    }
                }
            }
        }
    }

    fn stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }
}

/// Fill `buf` unless EOF comes first. Returns bytes read.
fn read_full(r: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Handle for tests and diagnostics.
#[derive(Debug, Clone)]
pub struct RadioProbe {
    pub pid: u32,
    feeder_running: Arc<AtomicBool>,
}

impl RadioProbe {
    pub fn feeder_running(&self) -> bool {
        self.feeder_running.load(Ordering::SeqCst)
    }
}

/// One live radio connection. Dropping it disconnects.
pub struct RadioSession {
    id: u64,
    url: String,
    child: Option<Child>,
    feeder: Option<JoinHandle<()>>,
    stop: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
}

impl RadioSession {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn probe(&self) -> RadioProbe {
        RadioProbe {
            pid: self.child.as_ref().map(|c| c.id()).unwrap_or(0),
            feeder_running: Arc::clone(&self.running),
        }
    }

    /// Kill the decoder, reap it and join the feeder. Idempotent.
    pub fn disconnect(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        if let Some(join) = self.feeder.take() {
            let _ = join.join();
            tracing::info!(session = self.id, "radio disconnected");
        }
    }
}

impl Drop for RadioSession {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    const FMT: PcmFormat = PcmFormat {
        sample_rate: 8_000,
        channels: 1,
    };

    fn engine(program: &str) -> RadioEngine {
        RadioEngine::new(program, FMT, Duration::from_millis(20), 4)
    }

    #[test]
    fn url_is_passed_as_a_single_argument() {
        let url = "http://example.com/stream?a=1&b=2 3;rm -rf";
        let args = engine("ffmpeg").args(url);
        let i = args.iter().position(|a| a == "-i").unwrap();
        assert_eq!(args[i + 1], url);
        assert_eq!(args.last().map(String::as_str), Some("pipe:1"));
    }

    #[test]
    fn missing_decoder_is_radio_unavailable() {
        let (tx, _rx) = mpsc::channel();
        let err = engine("cadenza-no-such-stream-decoder")
            .connect("http://example.com", tx)
            .err()
            .unwrap();
        assert!(matches!(err, PlayerError::RadioUnavailable(ref m) if m.contains("cadenza-no-such-stream-decoder")));
    }

    #[cfg(unix)]
    #[test]
    fn stream_end_is_reported_once() {
        // `echo` prints its arguments once and exits.
        let (tx, rx) = mpsc::channel();
        let (mut session, stream) = engine("echo").connect("http://example.com", tx).unwrap();
        let mut src = stream.into_source();

        let ev = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(
            ev,
            RadioEvent::Ended {
                session_id: session.id(),
                reason: "end of stream".into()
            }
        );
        assert!(src.next().is_some());
        session.disconnect();
        assert!(rx.try_recv().is_err());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn disconnect_kills_process_and_joins_feeder() {
        // `yes` writes forever, so the bounded channel fills and the feeder
        // sits in its retry loop.
        let (tx, rx) = mpsc::channel();
        let (mut session, stream) = engine("yes").connect("http://example.com", tx).unwrap();
        let probe = session.probe();
        assert!(probe.pid > 0);

        thread::sleep(Duration::from_millis(100));
        assert!(std::path::Path::new(&format!("/proc/{}", probe.pid)).exists());
        assert!(probe.feeder_running());

        session.disconnect();

        assert!(!probe.feeder_running());
        assert!(!std::path::Path::new(&format!("/proc/{}", probe.pid)).exists());
        // Asked to stop: no `Ended` event.
        assert!(rx.try_recv().is_err());
        drop(stream);
    }
}

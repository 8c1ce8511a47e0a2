use std::env;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

/// Where log output goes when `CADENZA_LOG` is set.
pub fn log_path() -> PathBuf {
    env::var_os("CADENZA_LOG_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|| env::temp_dir().join("cadenza.log"))
}

/// Install a file-backed subscriber when `CADENZA_LOG` is set.
///
/// The terminal belongs to the TUI, so nothing is ever written to stderr
/// once the alternate screen is up.
pub fn init() {
    let Some(directives) = env::var_os("CADENZA_LOG") else {
        return;
    };

    let path = log_path();
    let file = match OpenOptions::new().create(true).append(true).open(&path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("cadenza: cannot open log file {}: {e}", path.display());
            return;
        }
    };

    let filter = EnvFilter::try_new(directives.to_string_lossy())
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();
}

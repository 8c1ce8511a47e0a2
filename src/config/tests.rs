use super::load::{default_config_path, resolve_config_path};
use super::schema::*;
use std::sync::{Mutex, OnceLock};

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK.get_or_init(|| Mutex::new(())).lock().unwrap()
}

struct EnvGuard {
    key: &'static str,
    old: Option<std::ffi::OsString>,
}

impl EnvGuard {
    fn set(key: &'static str, val: &str) -> Self {
        let old = std::env::var_os(key);
        unsafe {
            std::env::set_var(key, val);
        }
        Self { key, old }
    }

    fn remove(key: &'static str) -> Self {
        let old = std::env::var_os(key);
        unsafe {
            std::env::remove_var(key);
        }
        Self { key, old }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        match self.old.take() {
            Some(v) => unsafe {
                std::env::set_var(self.key, v);
            },
            None => unsafe {
                std::env::remove_var(self.key);
            },
        }
    }
}

#[test]
fn resolve_config_path_prefers_cadenza_config_path() {
    let _lock = env_lock();
    let _g1 = EnvGuard::set("CADENZA_CONFIG_PATH", "/tmp/cadenza-test-config.toml");
    assert_eq!(
        resolve_config_path().unwrap(),
        std::path::PathBuf::from("/tmp/cadenza-test-config.toml")
    );
}

#[test]
fn default_config_path_prefers_xdg_config_home() {
    let _lock = env_lock();
    let _g1 = EnvGuard::set("XDG_CONFIG_HOME", "/tmp/xdg-config-home");
    let _g2 = EnvGuard::set("HOME", "/tmp/home-should-not-win");

    let p = default_config_path().unwrap();
    assert_eq!(
        p,
        std::path::PathBuf::from("/tmp/xdg-config-home")
            .join("cadenza")
            .join("config.toml")
    );
}

#[test]
fn default_config_path_falls_back_to_home_dot_config() {
    let _lock = env_lock();
    let _g1 = EnvGuard::remove("XDG_CONFIG_HOME");
    let _g2 = EnvGuard::set("HOME", "/tmp/home-dir");

    let p = default_config_path().unwrap();
    assert_eq!(
        p,
        std::path::PathBuf::from("/tmp/home-dir")
            .join(".config")
            .join("cadenza")
            .join("config.toml")
    );
}

#[test]
fn settings_load_from_config_file_and_parse_loop_mode_aliases() {
    let _lock = env_lock();

    let dir = tempfile::tempdir().unwrap();
    let cfg_path = dir.path().join("config.toml");
    std::fs::write(
        &cfg_path,
        r#"
[playback]
shuffle = true
loop_mode = "repeat-one"

[audio]
volume = 0.4
viz_window_ms = 40
preview_cap_secs = 60
sample_rate = 48000
channels = 1

[tools]
transcoder = "/opt/ffmpeg/bin/ffmpeg"

[controls]
scrub_seconds = 9

[ui]
follow_playback = false
now_playing_time_fields = ["elapsed", "remaining"]
now_playing_time_separator = " | "

[library]
extensions = ["mp3"]
recursive = false
display_fields = ["filename", "year"]
display_separator = "::"

[session]
last_folder = "/srv/music"
radio_favourites = ["http://radio.example/stream"]
"#,
    )
    .unwrap();

    let _g1 = EnvGuard::set("CADENZA_CONFIG_PATH", cfg_path.to_str().unwrap());
    let _g2 = EnvGuard::remove("CADENZA__AUDIO__VOLUME");

    let s = Settings::load().unwrap();
    assert!(s.validate().is_ok());
    assert!(s.playback.shuffle);
    assert!(matches!(s.playback.loop_mode, LoopModeSetting::LoopOne));
    assert_eq!(s.audio.volume, 0.4);
    assert_eq!(s.audio.viz_window_ms, 40);
    assert_eq!(s.audio.preview_cap_secs, 60);
    assert_eq!(s.audio.sample_rate, 48_000);
    assert_eq!(s.audio.channels, 1);
    assert_eq!(s.tools.transcoder, "/opt/ffmpeg/bin/ffmpeg");
    assert_eq!(s.tools.stream_decoder, "ffmpeg");
    assert_eq!(s.controls.scrub_seconds, 9);
    assert!(!s.ui.follow_playback);
    assert_eq!(s.ui.now_playing_time_fields.len(), 2);
    assert!(matches!(s.ui.now_playing_time_fields[1], TimeField::Remaining));
    assert_eq!(s.ui.now_playing_time_separator, " | ");
    assert_eq!(s.library.extensions, vec!["mp3".to_string()]);
    assert!(!s.library.recursive);
    assert_eq!(s.library.display_separator, "::");
    assert!(matches!(s.library.display_fields[1], TrackDisplayField::Year));
    assert_eq!(
        s.session.last_folder(),
        Some(std::path::Path::new("/srv/music"))
    );
    assert_eq!(s.session.radio_favourites(), ["http://radio.example/stream"]);
}

#[test]
fn settings_env_overrides_config_file() {
    let _lock = env_lock();

    let dir = tempfile::tempdir().unwrap();
    let cfg_path = dir.path().join("config.toml");
    std::fs::write(
        &cfg_path,
        r#"
[audio]
volume = 0.9
"#,
    )
    .unwrap();

    let _g1 = EnvGuard::set("CADENZA_CONFIG_PATH", cfg_path.to_str().unwrap());
    let _g2 = EnvGuard::set("CADENZA__AUDIO__VOLUME", "0.25");

    let s = Settings::load().unwrap();
    assert_eq!(s.audio.volume, 0.25);
}

#[test]
fn validate_rejects_out_of_range_volume_and_empty_tools() {
    let mut s = Settings::default();
    assert!(s.validate().is_ok());

    s.audio.volume = 1.5;
    assert!(s.validate().is_err());

    s.audio.volume = 0.5;
    s.tools.stream_decoder = "  ".to_string();
    assert!(s.validate().is_err());
}

#[test]
fn session_favourites_are_deduplicated() {
    let mut session = SessionSettings::default();
    assert!(session.add_radio_favourite("http://a/stream"));
    assert!(!session.add_radio_favourite("http://a/stream"));
    assert!(!session.add_radio_favourite("   "));
    assert!(session.add_radio_favourite("http://b/stream"));
    assert_eq!(session.radio_favourites().len(), 2);

    assert!(session.remove_radio_favourite("http://a/stream"));
    assert!(!session.remove_radio_favourite("http://a/stream"));
    assert_eq!(session.radio_favourites(), ["http://b/stream"]);

    session.set_last_folder("/music");
    assert_eq!(session.last_folder(), Some(std::path::Path::new("/music")));
}

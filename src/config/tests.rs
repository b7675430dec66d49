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
fn resolve_config_path_prefers_kiai_config_path() {
    let _lock = env_lock();
    let _g1 = EnvGuard::set("KIAI_CONFIG_PATH", "/tmp/kiai-test-config.toml");
    assert_eq!(
        resolve_config_path().unwrap(),
        std::path::PathBuf::from("/tmp/kiai-test-config.toml")
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
            .join("kiai")
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
            .join("kiai")
            .join("config.toml")
    );
}

#[test]
fn settings_load_from_config_file() {
    let _lock = env_lock();

    let dir = tempfile::tempdir().unwrap();
    let cfg_path = dir.path().join("config.toml");
    std::fs::write(
        &cfg_path,
        r#"
[library]
songs_dir = "/data/osu/Songs"
extensions = ["mp3"]
min_duration_seconds = 45

[audio]
volume = 0.5

[controls]
scrub_seconds = 9
min_duration_step = 10

[ui]
header_text = "hello"
"#,
    )
    .unwrap();

    let _g1 = EnvGuard::set("KIAI_CONFIG_PATH", cfg_path.to_str().unwrap());
    let _g2 = EnvGuard::remove("KIAI__AUDIO__VOLUME");

    let s = Settings::load().unwrap();
    assert_eq!(
        s.library.songs_dir,
        Some(std::path::PathBuf::from("/data/osu/Songs"))
    );
    assert_eq!(s.library.extensions, vec!["mp3".to_string()]);
    assert_eq!(s.library.min_duration_seconds, 45);
    assert_eq!(s.audio.volume, 0.5);
    assert_eq!(s.controls.scrub_seconds, 9);
    assert_eq!(s.controls.min_duration_step, 10);
    assert_eq!(s.ui.header_text, "hello");
    assert!(s.validate().is_ok());
}

#[test]
fn settings_env_overrides_config_file() {
    let _lock = env_lock();

    let dir = tempfile::tempdir().unwrap();
    let cfg_path = dir.path().join("config.toml");
    std::fs::write(
        &cfg_path,
        r#"
[library]
min_duration_seconds = 30
"#,
    )
    .unwrap();

    let _g1 = EnvGuard::set("KIAI_CONFIG_PATH", cfg_path.to_str().unwrap());
    let _g2 = EnvGuard::set("KIAI__LIBRARY__MIN_DURATION_SECONDS", "60");

    let s = Settings::load().unwrap();
    assert_eq!(s.library.min_duration_seconds, 60);
}

#[test]
fn validate_rejects_out_of_range_volume() {
    let mut s = Settings::default();
    assert!(s.validate().is_ok());
    s.audio.volume = 1.5;
    assert!(s.validate().is_err());
}

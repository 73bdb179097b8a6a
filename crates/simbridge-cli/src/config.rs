//! Configuration file – reads/writes `~/.simbridge/config.toml`.
//!
//! The file holds a [`BridgeConfig`]; any field it omits keeps its default.

use simbridge_runtime::BridgeConfig;
use std::fs;
use std::path::{Path, PathBuf};

/// Return the path to `~/.simbridge/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".simbridge").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<BridgeConfig>, String> {
    load_from(&config_path())
}

pub(crate) fn load_from(path: &Path) -> Result<Option<BridgeConfig>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    toml::from_str(&raw)
        .map(Some)
        .map_err(|e| format!("Failed to parse config at {}: {}", path.display(), e))
}

/// Apply `SIMBRIDGE_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `SIMBRIDGE_RATE_HZ` | `rate_hz` |
/// | `SIMBRIDGE_STEER_RATIO` | `control.steer_ratio` |
/// | `SIMBRIDGE_MAX_RESTARTS` | `restart.max_restarts` (`unlimited` retries forever) |
///
/// Values that do not parse are ignored.
pub fn apply_env_overrides(cfg: &mut BridgeConfig) {
    if let Ok(v) = std::env::var("SIMBRIDGE_RATE_HZ")
        && let Ok(hz) = v.trim().parse::<f64>()
    {
        cfg.rate_hz = hz;
    }
    if let Ok(v) = std::env::var("SIMBRIDGE_STEER_RATIO")
        && let Ok(ratio) = v.trim().parse::<f32>()
    {
        cfg.control.steer_ratio = ratio;
    }
    if let Ok(v) = std::env::var("SIMBRIDGE_MAX_RESTARTS") {
        let v = v.trim();
        if v.eq_ignore_ascii_case("unlimited") {
            cfg.restart.max_restarts = None;
        } else if let Ok(n) = v.parse::<u32>() {
            cfg.restart.max_restarts = Some(n);
        }
    }
}

/// Save the config to disk, creating `~/.simbridge/` if necessary.
pub fn save(cfg: &BridgeConfig) -> Result<(), String> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &BridgeConfig, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| format!("Failed to set config directory permissions: {}", e))?;
        }
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| f.write_all(raw.as_bytes()))
            .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn config_file_has_restrictive_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        save_to(&BridgeConfig::default(), &path).expect("save");

        let file_mode = std::fs::metadata(&path).expect("file metadata").permissions().mode() & 0o777;
        assert_eq!(file_mode, 0o600);
        let dir_mode = std::fs::metadata(path.parent().unwrap())
            .expect("dir metadata")
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(dir_mode, 0o700);
    }

    #[test]
    fn roundtrip_default_config() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        save_to(&BridgeConfig::default(), &path).expect("save");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded, BridgeConfig::default());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "print_decimation = 10\n[control]\nrepeat_count = 2\n").unwrap();

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.print_decimation, 10);
        assert_eq!(loaded.control.repeat_count, 2);
        assert_eq!(loaded.rate_hz, 100.0);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "rate_hz = \"fast\"").unwrap();
        assert!(load_from(&path).unwrap_err().contains("Failed to parse"));
    }

    #[test]
    fn config_path_points_to_simbridge_dir() {
        let p = config_path_for_home("/home/testuser");
        assert_eq!(p, PathBuf::from("/home/testuser/.simbridge/config.toml"));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        assert!(load_from(&path).expect("no error").is_none());
    }

    // Env-var tests run in one function so they never race each other.
    #[test]
    fn apply_env_overrides_sets_fields() {
        // SAFETY: only this test touches SIMBRIDGE_* variables.
        unsafe {
            std::env::set_var("SIMBRIDGE_RATE_HZ", "50");
            std::env::set_var("SIMBRIDGE_STEER_RATIO", "not-a-number");
            std::env::set_var("SIMBRIDGE_MAX_RESTARTS", "3");
        }
        let mut cfg = BridgeConfig::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.rate_hz, 50.0);
        assert_eq!(cfg.control.steer_ratio, 15.0, "invalid value ignored");
        assert_eq!(cfg.restart.max_restarts, Some(3));

        unsafe { std::env::set_var("SIMBRIDGE_MAX_RESTARTS", "unlimited") };
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.restart.max_restarts, None);

        unsafe {
            std::env::remove_var("SIMBRIDGE_RATE_HZ");
            std::env::remove_var("SIMBRIDGE_STEER_RATIO");
            std::env::remove_var("SIMBRIDGE_MAX_RESTARTS");
        }
    }
}

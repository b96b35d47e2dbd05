//! Configuration Vault – reads/writes `~/.motion_sensors/config.toml`.

use motion_types::SensorKind;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Per-kind update intervals in microseconds.  `None` keeps the source's
/// default rate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntervalConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accelerometer: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub magnetometer: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gyroscope: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_accelerometer: Option<i64>,
}

impl IntervalConfig {
    pub fn get(&self, kind: SensorKind) -> Option<i64> {
        match kind {
            SensorKind::Accelerometer => self.accelerometer,
            SensorKind::Magnetometer => self.magnetometer,
            SensorKind::Gyroscope => self.gyroscope,
            SensorKind::UserAccelerometer => self.user_accelerometer,
        }
    }

    pub fn set(&mut self, kind: SensorKind, micros: Option<i64>) {
        let slot = match kind {
            SensorKind::Accelerometer => &mut self.accelerometer,
            SensorKind::Magnetometer => &mut self.magnetometer,
            SensorKind::Gyroscope => &mut self.gyroscope,
            SensorKind::UserAccelerometer => &mut self.user_accelerometer,
        };
        *slot = micros;
    }
}

/// Persisted settings stored in `~/.motion_sensors/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Kinds the simulated device reports as absent.
    #[serde(default)]
    pub unavailable: Vec<SensorKind>,

    /// Whether simulated sources change rate without a restart.
    #[serde(default)]
    pub live_interval_updates: bool,

    /// How long `/listen` waits for each reading before giving up.
    #[serde(default = "default_listen_timeout_ms")]
    pub listen_timeout_ms: u64,

    /// Intervals applied to the registry at startup.
    #[serde(default)]
    pub intervals: IntervalConfig,
}

fn default_listen_timeout_ms() -> u64 {
    1000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            intervals: IntervalConfig::default(),
            unavailable: Vec::new(),
            live_interval_updates: false,
            listen_timeout_ms: default_listen_timeout_ms(),
        }
    }
}

/// Return the path to `~/.motion_sensors/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".motion_sensors").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, String> {
    load_from(&config_path())
}

/// Load the config from a specific path.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let mut cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Name of the environment variable overriding `kind`'s interval, e.g.
/// `MOTION_SENSORS_GYROSCOPE_INTERVAL_US`.
pub fn interval_env_var(kind: SensorKind) -> String {
    format!(
        "MOTION_SENSORS_{}_INTERVAL_US",
        kind.label().to_ascii_uppercase()
    )
}

/// Apply `MOTION_SENSORS_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `MOTION_SENSORS_<KIND>_INTERVAL_US` | `intervals.<kind>` |
/// | `MOTION_SENSORS_LISTEN_TIMEOUT_MS` | `listen_timeout_ms` |
///
/// Values that do not parse are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    for kind in SensorKind::ALL {
        if let Ok(v) = std::env::var(interval_env_var(kind))
            && let Ok(micros) = v.trim().parse::<i64>()
        {
            cfg.intervals.set(kind, Some(micros));
        }
    }
    if let Ok(v) = std::env::var("MOTION_SENSORS_LISTEN_TIMEOUT_MS")
        && let Ok(ms) = v.trim().parse::<u64>()
    {
        cfg.listen_timeout_ms = ms;
    }
}

/// Save the config to disk, creating `~/.motion_sensors/` if necessary.
pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

/// Save the config to a specific path.
pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
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
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| {
                use std::io::Write;
                f.write_all(raw.as_bytes())
            })
            .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}

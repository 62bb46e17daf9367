use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

const APP_DIR: &str = "BeatBuddyTracker";

/// User-editable tracking settings, persisted in the event store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub device_name: String,
    pub tracking_enabled: bool,
    pub location_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            device_name: "Beats Studio3".to_string(),
            tracking_enabled: true,
            location_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    #[serde(default = "default_level")]
    pub level: String, // "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_true")]
    pub file_logging_enabled: bool,
    #[serde(default = "default_true")]
    pub console_logging_enabled: bool,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_prefix")]
    pub file_name_prefix: String,
    #[serde(default = "default_true")]
    pub show_file_line: bool,
    #[serde(default = "default_false")]
    pub show_thread_ids: bool,
    #[serde(default = "default_true")]
    pub show_target: bool,
    #[serde(default = "default_true")]
    pub ansi_colors: bool,
    #[serde(default = "default_rotation")]
    pub rotation: String, // "daily", "hourly", "minutely", "never"
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            file_logging_enabled: default_true(),
            console_logging_enabled: default_true(),
            log_dir: default_log_dir(),
            file_name_prefix: default_prefix(),
            show_file_line: default_true(),
            show_thread_ids: default_false(),
            show_target: default_true(),
            ansi_colors: default_true(),
            rotation: default_rotation(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    #[serde(default = "default_location_timeout_ms")]
    pub timeout_ms: u64,
    /// How old a cached fix may be and still be reused.
    #[serde(default = "default_max_age_ms")]
    pub max_age_ms: u64,
    #[serde(default = "default_watch_interval_ms")]
    pub watch_interval_ms: u64,
    #[serde(default = "default_fallback_latitude")]
    pub fallback_latitude: f64,
    #[serde(default = "default_fallback_longitude")]
    pub fallback_longitude: f64,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_location_timeout_ms(),
            max_age_ms: default_max_age_ms(),
            watch_interval_ms: default_watch_interval_ms(),
            fallback_latitude: default_fallback_latitude(),
            fallback_longitude: default_fallback_longitude(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorBackend {
    Auto,
    Simulated,
    Radio,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimulationMode {
    Random,
    Fixed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_backend")]
    pub backend: MonitorBackend,
    #[serde(default = "default_simulation_mode")]
    pub simulation: SimulationMode,
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
    #[serde(default = "default_max_interval_ms")]
    pub max_interval_ms: u64,
    #[serde(default = "default_fixed_interval_ms")]
    pub fixed_interval_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            simulation: default_simulation_mode(),
            min_interval_ms: default_min_interval_ms(),
            max_interval_ms: default_max_interval_ms(),
            fixed_interval_ms: default_fixed_interval_ms(),
        }
    }
}

/// Application configuration, read once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub log_settings: LogSettings,
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,
    #[serde(default = "default_export_dir")]
    pub export_dir: PathBuf,
    #[serde(default)]
    pub location: LocationConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default = "default_restart_grace_ms")]
    pub restart_grace_ms: u64,
    #[serde(default = "default_true")]
    pub auto_start: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_settings: LogSettings::default(),
            storage_dir: default_storage_dir(),
            export_dir: default_export_dir(),
            location: LocationConfig::default(),
            monitor: MonitorConfig::default(),
            restart_grace_ms: default_restart_grace_ms(),
            auto_start: default_true(),
        }
    }
}

impl AppConfig {
    /// Replace zero intervals, which the timers cannot run on, with defaults.
    pub fn validated(mut self) -> Self {
        positive("location.timeout_ms", &mut self.location.timeout_ms, default_location_timeout_ms());
        positive(
            "location.watch_interval_ms",
            &mut self.location.watch_interval_ms,
            default_watch_interval_ms(),
        );
        positive("monitor.min_interval_ms", &mut self.monitor.min_interval_ms, default_min_interval_ms());
        positive("monitor.max_interval_ms", &mut self.monitor.max_interval_ms, default_max_interval_ms());
        positive(
            "monitor.fixed_interval_ms",
            &mut self.monitor.fixed_interval_ms,
            default_fixed_interval_ms(),
        );
        self
    }
}

fn positive(field: &str, value: &mut u64, default: u64) {
    if *value == 0 {
        warn!("Config {} must be positive, using {}", field, default);
        *value = default;
    }
}

fn default_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_log_dir() -> String {
    "logs".to_string()
}
fn default_prefix() -> String {
    "beat_buddy_tracker".to_string()
}
fn default_rotation() -> String {
    "daily".to_string()
}
fn default_location_timeout_ms() -> u64 {
    10_000
}
fn default_max_age_ms() -> u64 {
    300_000
}
fn default_watch_interval_ms() -> u64 {
    30_000
}
fn default_fallback_latitude() -> f64 {
    37.7749
}
fn default_fallback_longitude() -> f64 {
    -122.4194
}
fn default_backend() -> MonitorBackend {
    MonitorBackend::Auto
}
fn default_simulation_mode() -> SimulationMode {
    SimulationMode::Random
}
fn default_min_interval_ms() -> u64 {
    5_000
}
fn default_max_interval_ms() -> u64 {
    15_000
}
fn default_fixed_interval_ms() -> u64 {
    15_000
}
fn default_restart_grace_ms() -> u64 {
    1_000
}
fn default_storage_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("storage")
}
fn default_export_dir() -> PathBuf {
    dirs::document_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

pub struct ConfigService {
    config: AppConfig,
    config_path: PathBuf,
}

impl ConfigService {
    pub fn new() -> anyhow::Result<Self> {
        let config_path = Self::get_config_path()?;
        Ok(Self::load(config_path))
    }

    /// Load from an explicit path, falling back to defaults when the file is
    /// missing or unreadable.
    pub fn load(config_path: PathBuf) -> Self {
        let config = Self::load_from_file(&config_path).unwrap_or_default();
        Self {
            config,
            config_path,
        }
    }

    fn get_config_path() -> anyhow::Result<PathBuf> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        path.push(APP_DIR);
        fs::create_dir_all(&path)?;
        path.push("config.json");
        Ok(path)
    }

    fn load_from_file(path: &Path) -> anyhow::Result<AppConfig> {
        let contents = fs::read_to_string(path)?;
        let config = serde_json::from_str(&contents)?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(&self.config)?;
        fs::write(&self.config_path, json)?;
        Ok(())
    }

    pub fn get(&self) -> &AppConfig {
        &self.config
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"monitor": {"simulation": "fixed"}, "auto_start": false}"#)
                .unwrap();
        assert_eq!(config.monitor.simulation, SimulationMode::Fixed);
        assert_eq!(config.monitor.backend, MonitorBackend::Auto);
        assert_eq!(config.monitor.fixed_interval_ms, 15_000);
        assert_eq!(config.location.fallback_latitude, 37.7749);
        assert_eq!(config.location.fallback_longitude, -122.4194);
        assert_eq!(config.restart_grace_ms, 1_000);
        assert!(!config.auto_start);
    }

    #[test]
    fn test_missing_config_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let service = ConfigService::load(dir.path().join("config.json"));
        assert_eq!(service.get().location.timeout_ms, 10_000);
        assert_eq!(service.get().log_settings.file_name_prefix, "beat_buddy_tracker");

        service.save().unwrap();
        let reloaded = ConfigService::load(service.path().to_path_buf());
        assert_eq!(reloaded.get().monitor.min_interval_ms, 5_000);
    }

    #[test]
    fn test_zero_intervals_fall_back_to_defaults() {
        let config: AppConfig = serde_json::from_str(
            r#"{
                "location": {"watch_interval_ms": 0, "timeout_ms": 0, "max_age_ms": 0},
                "monitor": {"min_interval_ms": 0, "max_interval_ms": 0, "fixed_interval_ms": 0}
            }"#,
        )
        .unwrap();
        let config = config.validated();

        assert_eq!(config.location.watch_interval_ms, 30_000);
        assert_eq!(config.location.timeout_ms, 10_000);
        // a zero max age only disables the cache
        assert_eq!(config.location.max_age_ms, 0);
        assert_eq!(config.monitor.min_interval_ms, 5_000);
        assert_eq!(config.monitor.max_interval_ms, 15_000);
        assert_eq!(config.monitor.fixed_interval_ms, 15_000);
    }

    #[test]
    fn test_valid_intervals_are_kept() {
        let config: AppConfig =
            serde_json::from_str(r#"{"location": {"watch_interval_ms": 1000}}"#).unwrap();
        assert_eq!(config.validated().location.watch_interval_ms, 1_000);
    }

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.device_name, "Beats Studio3");
        assert!(settings.tracking_enabled);
        assert!(settings.location_enabled);
    }
}

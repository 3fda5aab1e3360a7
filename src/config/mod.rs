//! Application Configuration
//!
//! Settings stored in TOML format.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::context::DebugOverrides;

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// General settings
    pub general: GeneralConfig,
    /// State storage settings
    pub storage: StorageConfig,
    /// Capture detection settings
    pub detection: DetectionConfig,
    /// Element registration settings
    pub elements: ElementsConfig,
    /// Change signal settings
    pub signal: SignalConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log filter used when RUST_LOG is not set
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Where state is persisted
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database path; defaults to a file in the data directory
    pub database: Option<PathBuf>,
}

impl StorageConfig {
    pub const DEFAULT_DATABASE_NAME: &'static str = "overlay-state.sqlite3";

    /// Database path, falling back to `data_dir`
    pub fn database_path(&self, data_dir: &Path) -> PathBuf {
        self.database
            .clone()
            .unwrap_or_else(|| data_dir.join(Self::DEFAULT_DATABASE_NAME))
    }
}

/// Capture detection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Delay after the load event before stylesheets are inspected
    pub settle_delay_ms: u64,
    /// Fragments that force the dock role
    pub dock_overrides: Vec<String>,
    /// Fragments that force the overlay role
    pub overlay_overrides: Vec<String>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        let overrides = DebugOverrides::default();
        Self {
            settle_delay_ms: 100,
            dock_overrides: overrides.dock,
            overlay_overrides: overrides.overlay,
        }
    }
}

impl DetectionConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn overrides(&self) -> DebugOverrides {
        DebugOverrides {
            dock: self.dock_overrides.clone(),
            overlay: self.overlay_overrides.clone(),
        }
    }
}

/// Tag names the elements register under
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementsConfig {
    pub overlay_tag: String,
    pub dock_tag: String,
}

impl Default for ElementsConfig {
    fn default() -> Self {
        Self {
            overlay_tag: "obs-overlay".to_string(),
            dock_tag: "obs-dock".to_string(),
        }
    }
}

/// Change signal settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    /// Also raise an in-page event on commit so same-page listeners update
    pub notify_same_context: bool,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            notify_same_context: true,
        }
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_app_config() {
        let config = AppConfig::default();

        assert_eq!(config.general.log_level, "info");
        assert!(config.storage.database.is_none());
        assert_eq!(config.detection.settle_delay_ms, 100);
        assert_eq!(config.detection.dock_overrides, vec!["dock", "debug"]);
        assert_eq!(config.detection.overlay_overrides, vec!["overlay", "debug"]);
        assert_eq!(config.elements.overlay_tag, "obs-overlay");
        assert_eq!(config.elements.dock_tag, "obs-dock");
        assert!(config.signal.notify_same_context);
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let mut config = AppConfig::default();
        config.storage.database = Some(PathBuf::from("/tmp/state.sqlite3"));
        config.detection.settle_delay_ms = 250;

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed.storage.database, config.storage.database);
        assert_eq!(parsed.detection.settle_delay(), Duration::from_millis(250));
        assert_eq!(parsed.elements.dock_tag, config.elements.dock_tag);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: AppConfig = toml::from_str(
            r#"
[signal]
notify_same_context = false

[detection]
dock_overrides = ["control"]
"#,
        )
        .unwrap();

        assert!(!parsed.signal.notify_same_context);
        assert_eq!(parsed.detection.dock_overrides, vec!["control"]);
        assert_eq!(parsed.detection.overlay_overrides, vec!["overlay", "debug"]);
        assert_eq!(parsed.detection.settle_delay_ms, 100);
        assert_eq!(parsed.general.log_level, "info");
    }

    #[test]
    fn test_database_path_fallback() {
        let storage = StorageConfig::default();
        assert_eq!(
            storage.database_path(Path::new("/data")),
            PathBuf::from("/data/overlay-state.sqlite3")
        );

        let storage = StorageConfig {
            database: Some(PathBuf::from("/elsewhere/db.sqlite3")),
        };
        assert_eq!(
            storage.database_path(Path::new("/data")),
            PathBuf::from("/elsewhere/db.sqlite3")
        );
    }

    #[test]
    fn test_save_and_load_config() {
        let mut config = AppConfig::default();
        config.elements.overlay_tag = "score-overlay".to_string();

        let temp_file = NamedTempFile::new().unwrap();
        save_config(&config, temp_file.path()).unwrap();
        let loaded = load_config(temp_file.path()).unwrap();

        assert_eq!(loaded.elements.overlay_tag, "score-overlay");
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/path/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "this is not valid toml {{{{").unwrap();

        let result = load_config(temp_file.path());
        assert!(result.is_err());
    }
}

use anyhow::{bail, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::RwLock,
};

pub const MIN_PORT_ID: u8 = 1;
pub const MAX_PORT_ID: u8 = 15;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub port_id: u8,
    pub threshold_psi: f64,
    pub last_save_directory: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port_id: MIN_PORT_ID,
            threshold_psi: 20.0,
            last_save_directory: dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")),
        }
    }
}

pub fn validate_port_id(port_id: u8) -> bool {
    (MIN_PORT_ID..=MAX_PORT_ID).contains(&port_id)
}

pub fn validate_threshold(threshold_psi: f64) -> bool {
    threshold_psi.is_finite() && threshold_psi >= 0.0
}

/// `<config_dir>/pressure-monitor/settings.json`
pub fn default_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir().context("Could not determine config directory")?;
    Ok(config_dir.join("pressure-monitor").join("settings.json"))
}

/// Operator settings persisted as JSON, written through on every edit.
pub struct ConfigStore {
    path: PathBuf,
    data: RwLock<Config>,
}

impl ConfigStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("Ignoring unreadable settings {}: {err}", path.display());
                Config::default()
            })
        } else {
            Config::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(sanitize(data)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self) -> Config {
        self.read().clone()
    }

    pub fn port_id(&self) -> u8 {
        self.read().port_id
    }

    pub fn threshold_psi(&self) -> f64 {
        self.read().threshold_psi
    }

    pub fn last_save_directory(&self) -> PathBuf {
        self.read().last_save_directory.clone()
    }

    pub fn set_port_id(&self, port_id: u8) -> Result<()> {
        if !validate_port_id(port_id) {
            bail!("port id {port_id} is outside {MIN_PORT_ID}..={MAX_PORT_ID}");
        }
        self.update(|config| config.port_id = port_id)
    }

    pub fn set_threshold_psi(&self, threshold_psi: f64) -> Result<()> {
        if !validate_threshold(threshold_psi) {
            bail!("threshold {threshold_psi} must be a finite value >= 0");
        }
        self.update(|config| config.threshold_psi = threshold_psi)
    }

    pub fn set_last_save_directory(&self, directory: PathBuf) -> Result<()> {
        self.update(|config| config.last_save_directory = directory)
    }

    fn update(&self, edit: impl FnOnce(&mut Config)) -> Result<()> {
        let mut guard = self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        edit(&mut guard);
        self.persist(&guard)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Config> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn persist(&self, data: &Config) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

/// Values edited by hand outside the valid ranges fall back to defaults.
fn sanitize(mut config: Config) -> Config {
    let defaults = Config::default();
    if !validate_port_id(config.port_id) {
        warn!("Stored port id {} is out of range, using {}", config.port_id, defaults.port_id);
        config.port_id = defaults.port_id;
    }
    if !validate_threshold(config.threshold_psi) {
        warn!(
            "Stored threshold {} is invalid, using {}",
            config.threshold_psi, defaults.threshold_psi
        );
        config.threshold_psi = defaults.threshold_psi;
    }
    config
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn temp_settings_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("pressure-monitor-test-{}", uuid::Uuid::new_v4()))
            .join("settings.json")
    }

    #[test]
    fn missing_file_yields_defaults() {
        let store = ConfigStore::new(temp_settings_path()).unwrap();
        assert_eq!(store.port_id(), 1);
        assert_eq!(store.threshold_psi(), 20.0);
    }

    #[test]
    fn edits_are_written_through_and_reloaded() {
        let path = temp_settings_path();
        let store = ConfigStore::new(path.clone()).unwrap();
        store.set_port_id(4).unwrap();
        store.set_threshold_psi(12.5).unwrap();
        store.set_last_save_directory(PathBuf::from("/data/runs")).unwrap();

        let reloaded = ConfigStore::new(path).unwrap().get();
        assert_eq!(
            reloaded,
            Config {
                port_id: 4,
                threshold_psi: 12.5,
                last_save_directory: PathBuf::from("/data/runs"),
            }
        );
    }

    #[test]
    fn out_of_range_edits_are_rejected_without_writing() {
        let path = temp_settings_path();
        let store = ConfigStore::new(path.clone()).unwrap();
        assert!(store.set_port_id(0).is_err());
        assert!(store.set_port_id(16).is_err());
        assert!(store.set_threshold_psi(-1.0).is_err());
        assert!(store.set_threshold_psi(f64::NAN).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn corrupt_or_out_of_range_files_fall_back_to_defaults() {
        let path = temp_settings_path();
        fs::create_dir_all(path.parent().unwrap()).unwrap();

        fs::write(&path, "{ not json").unwrap();
        assert_eq!(ConfigStore::new(path.clone()).unwrap().port_id(), 1);

        fs::write(&path, r#"{"port_id": 40, "threshold_psi": 7.0}"#).unwrap();
        let store = ConfigStore::new(path).unwrap();
        assert_eq!(store.port_id(), 1);
        assert_eq!(store.threshold_psi(), 7.0);
    }
}

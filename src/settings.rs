//! Application settings
//!
//! Loaded once at startup from `settings.json` in the platform config
//! directory:
//! - macOS: ~/Library/Application Support/satmap/
//! - Linux: ~/.config/satmap/
//! - Windows: %APPDATA%\satmap\config\
//!
//! A missing or unreadable file falls back to defaults. A few values can be
//! overridden through environment variables.

use bevy::prelude::*;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::positions::types::{CandidateSatellites, ObserverSetting, SatelliteDescriptor};

pub const SETTINGS_FILE: &str = "settings.json";

/// Starlink category on the position service.
pub const STARLINK_CATEGORY: u32 = 52;

/// Position service endpoint and credentials.
#[derive(Resource, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionApiConfig {
    pub base_url: String,
    pub api_key: String,
    pub category: u32,
}

impl Default for PositionApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.n2yo.com/rest/v1/satellite".to_string(),
            api_key: String::new(),
            category: STARLINK_CATEGORY,
        }
    }
}

/// Base map source and canvas geometry.
#[derive(Resource, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub world_map_url: String,
    /// Object inside the topology holding the land features.
    pub land_object: String,
    pub width: u32,
    pub height: u32,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            world_map_url: "https://cdn.jsdelivr.net/npm/world-atlas@2/countries-110m.json"
                .to_string(),
            land_object: "countries".to_string(),
            width: 960,
            height: 600,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub observer: ObserverSetting,
    /// Satellites offered for selection before any nearby query.
    pub satellites: Vec<SatelliteDescriptor>,
    pub api: PositionApiConfig,
    pub map: MapConfig,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            observer: ObserverSetting::default(),
            satellites: vec![
                SatelliteDescriptor::new(25544, "SPACE STATION"),
                SatelliteDescriptor::new(48274, "CSS (TIANHE)"),
            ],
            api: PositionApiConfig::default(),
            map: MapConfig::default(),
        }
    }
}

impl AppSettings {
    /// Load from the platform config directory, then apply environment
    /// overrides.
    pub fn load() -> Self {
        let mut settings = match settings_path() {
            Some(path) => Self::load_from(&path),
            None => {
                warn!("[SETTINGS] could not resolve config directory, using defaults");
                Self::default()
            }
        };
        settings.apply_overrides(|key| std::env::var(key).ok());
        settings
    }

    /// Load from an explicit path, falling back to defaults.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            info!("[SETTINGS] {} not found, using defaults", path.display());
            return Self::default();
        }
        match Self::read(path) {
            Ok(settings) => {
                info!("[SETTINGS] loaded {}", path.display());
                settings
            }
            Err(err) => {
                warn!("[SETTINGS] ignoring {}: {:#}", path.display(), err);
                Self::default()
            }
        }
    }

    /// Insert the observer, service, map and candidate resources.
    pub fn insert_into(self, app: &mut App) {
        app.insert_resource(self.observer)
            .insert_resource(self.api)
            .insert_resource(self.map)
            .insert_resource(CandidateSatellites {
                items: self.satellites,
                ..default()
            });
    }

    fn read(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// `SATMAP_API_KEY`, `SATMAP_API_BASE` and `SATMAP_WORLD_MAP_URL` win
    /// over the file.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("SATMAP_API_KEY") {
            self.api.api_key = key;
        }
        if let Some(base) = lookup("SATMAP_API_BASE") {
            self.api.base_url = base.trim_end_matches('/').to_string();
        }
        if let Some(url) = lookup("SATMAP_WORLD_MAP_URL") {
            self.map.world_map_url = url;
        }
    }
}

fn settings_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "satmap").map(|dirs| dirs.config_dir().join(SETTINGS_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_temp_dir(test_name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let dir = std::env::temp_dir().join(format!(
            "satmap-settings-{}-{}-{}",
            test_name,
            std::process::id(),
            nanos
        ));
        fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = unique_temp_dir("missing");
        let settings = AppSettings::load_from(&dir.join(SETTINGS_FILE));
        assert_eq!(settings, AppSettings::default());
        assert_eq!(settings.map.width, 960);
        assert_eq!(settings.map.height, 600);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = unique_temp_dir("partial");
        let path = dir.join(SETTINGS_FILE);
        fs::write(
            &path,
            r#"{
                "observer": { "latitude": 51.5, "longitude": -0.1, "elevation": 20, "altitude": 45, "duration": 5 },
                "satellites": [{ "satid": 44714, "satname": "STARLINK-1130", "launchDate": "2019-11-11" }]
            }"#,
        )
        .expect("write settings");

        let settings = AppSettings::load_from(&path);
        assert_eq!(settings.observer.latitude, 51.5);
        assert_eq!(settings.observer.window_seconds(), 300);
        assert_eq!(settings.satellites.len(), 1);
        assert_eq!(settings.satellites[0].launch_date.as_deref(), Some("2019-11-11"));
        assert_eq!(settings.api, PositionApiConfig::default());
    }

    #[test]
    fn test_corrupt_file_falls_back() {
        let dir = unique_temp_dir("corrupt");
        let path = dir.join(SETTINGS_FILE);
        fs::write(&path, "{ not json").expect("write settings");
        assert_eq!(AppSettings::load_from(&path), AppSettings::default());
    }

    #[test]
    fn test_environment_overrides() {
        let mut settings = AppSettings::default();
        settings.apply_overrides(|key| match key {
            "SATMAP_API_KEY" => Some("secret".to_string()),
            "SATMAP_API_BASE" => Some("http://localhost:8080/api/".to_string()),
            _ => None,
        });
        assert_eq!(settings.api.api_key, "secret");
        assert_eq!(settings.api.base_url, "http://localhost:8080/api");
        assert_eq!(settings.map, MapConfig::default());
    }

    #[test]
    fn test_insert_into_app() {
        let mut settings = AppSettings::default();
        settings.api.api_key = "secret".to_string();
        settings.observer.duration = 5.0;

        let mut app = App::new();
        settings.insert_into(&mut app);

        let world = app.world();
        assert_eq!(world.resource::<PositionApiConfig>().api_key, "secret");
        assert_eq!(world.resource::<ObserverSetting>().window_seconds(), 300);
        assert_eq!(world.resource::<MapConfig>().width, 960);
        assert_eq!(world.resource::<CandidateSatellites>().items.len(), 2);
    }
}

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Result;

pub const CONFIG_FILE: &str = "config.json";

/// Settings read from `<data_dir>/config.json`. Every field is optional.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub data_dir: PathBuf,
    pub matrix_file: String,
    pub summary_file: String,
    pub states_geojson: String,
    pub counties_geojson: String,
    pub spas_geojson: String,
    pub time_column: String,
    /// Leading chart weeks below this are dropped.
    pub trim_threshold: f64,
    /// Weeks kept when no week reaches `trim_threshold`.
    pub fallback_tail: usize,
    pub log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            matrix_file: "weekly_matrix_by_county.csv".into(),
            summary_file: "states.json".into(),
            states_geojson: "us-states.json".into(),
            counties_geojson: "geojson-counties-fips.json".into(),
            spas_geojson: "la-spas.geojson".into(),
            time_column: "week_start".into(),
            trim_threshold: 10.0,
            fallback_tail: 52,
            log_file: "fire_atlas.log".into(),
        }
    }
}

impl Config {
    /// Defaults when the file is absent; a file that exists but does not
    /// parse is an error. `data_dir` always points at `dir`.
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let path = dir.join(CONFIG_FILE);
        let mut config = if path.exists() {
            serde_json::from_slice::<Config>(&fs::read(&path)?)?
        } else {
            Config::default()
        };
        config.data_dir = dir.to_path_buf();
        Ok(config)
    }

    pub fn path(&self, file: &str) -> PathBuf {
        self.data_dir.join(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.trim_threshold, 10.0);
        assert_eq!(config.fallback_tail, 52);
        assert_eq!(config.data_dir, dir.path());
        assert_eq!(config.path("states.json"), dir.path().join("states.json"));
    }

    #[test]
    fn partial_file_overrides_some_fields() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), r#"{ "fallback_tail": 26, "time_column": "week" }"#).unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.fallback_tail, 26);
        assert_eq!(config.time_column, "week");
        assert_eq!(config.matrix_file, "weekly_matrix_by_county.csv");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "{ not json").unwrap();
        assert!(Config::load(dir.path()).is_err());
    }
}

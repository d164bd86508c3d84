//! Matching settings file (TOML).
//!
//! ```toml
//! n_neighbors = 5
//! overlap_columns = ["LC4402_C_TYPACCOM", "LC4402_C_TENHUK11", "area_factor"]
//! transfer_columns = ["ACCOM_AGE", "FLOOR_AREA", "GAS"]
//! drop_columns = ["tenure"]
//! area_column = "OA"
//! partition_column = "LADCD"
//! seed = 42
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::MatchConfig;
use crate::error::AppError;

/// Used when neither `--config` nor `SHAPE_CONFIG` is given.
pub const DEFAULT_CONFIG_PATH: &str = "config/shape.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub n_neighbors: usize,
    pub overlap_columns: Vec<String>,
    #[serde(alias = "matches_columns")]
    pub transfer_columns: Vec<String>,
    #[serde(default = "default_drop_columns")]
    pub drop_columns: Vec<String>,
    #[serde(default)]
    pub area_column: Option<String>,
    #[serde(default = "default_partition_column")]
    pub partition_column: String,
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_drop_columns() -> Vec<String> {
    vec!["tenure".to_string()]
}

fn default_partition_column() -> String {
    "LADCD".to_string()
}

impl Settings {
    pub fn match_config(&self) -> MatchConfig {
        MatchConfig {
            n_neighbors: self.n_neighbors,
            overlap_columns: self.overlap_columns.clone(),
            transfer_columns: self.transfer_columns.clone(),
            drop_columns: self.drop_columns.clone(),
            area_column: self.area_column.clone(),
        }
    }
}

/// Pick the settings path: explicit flag, then `SHAPE_CONFIG`, then the default.
pub fn resolve_settings_path(flag: Option<&Path>) -> PathBuf {
    if let Some(p) = flag {
        return p.to_path_buf();
    }
    std::env::var_os("SHAPE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

pub fn load_settings(path: &Path) -> Result<Settings, AppError> {
    let text = fs::read_to_string(path)
        .map_err(|e| AppError::new(2, format!("Failed to read settings '{}': {e}", path.display())))?;
    parse_settings(&text)
        .map_err(|e| AppError::new(2, format!("Invalid settings '{}': {e}", path.display())))
}

pub fn parse_settings(text: &str) -> Result<Settings, toml::de::Error> {
    toml::from_str(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_settings_fill_defaults() {
        let s = parse_settings(
            r#"
            n_neighbors = 4
            overlap_columns = ["rooms"]
            matches_columns = ["FLOOR_AREA"]
            "#,
        )
        .unwrap();
        assert_eq!(s.n_neighbors, 4);
        assert_eq!(s.transfer_columns, vec!["FLOOR_AREA"]);
        assert_eq!(s.drop_columns, vec!["tenure"]);
        assert_eq!(s.partition_column, "LADCD");
        assert_eq!(s.seed, None);

        let cfg = s.match_config();
        assert_eq!(cfg.n_neighbors, 4);
        assert!(cfg.area_column.is_none());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = parse_settings(
            r#"
            n_neighbors = 4
            overlap_columns = []
            transfer_columns = []
            n_neighbours = 3
            "#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn explicit_path_wins() {
        let p = resolve_settings_path(Some(Path::new("custom.toml")));
        assert_eq!(p, PathBuf::from("custom.toml"));
    }
}

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::model::Column;

pub const DATA_PATH_ENV: &str = "ECHALLAN_DATA";
pub const DEFAULT_CONFIG_FILE: &str = "echallan.json";

/// Runtime settings. Every field has a default, so a partial file is fine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub data_path: PathBuf,
    pub top_n: usize,
    pub preview_rows: usize,
    pub export_dir: PathBuf,
    pub pivot_value: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("echallan_daily_data.csv"),
            top_n: 5,
            preview_rows: 20,
            export_dir: PathBuf::from("."),
            pivot_value: Column::TotalChallan.name().to_string(),
        }
    }
}

impl Config {
    /// Reads `path` if it exists, otherwise starts from defaults. The
    /// `ECHALLAN_DATA` environment variable overrides `dataPath` either way.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let data = fs::read_to_string(path)?;
            let parsed: Config = serde_json::from_str(&data)?;
            debug!(path = %path.display(), "config loaded");
            parsed
        } else {
            Config::default()
        };
        config.apply_env(std::env::var_os(DATA_PATH_ENV).map(PathBuf::from));
        Ok(config)
    }

    fn apply_env(&mut self, data_path: Option<PathBuf>) {
        if let Some(p) = data_path.filter(|p| !p.as_os_str().is_empty()) {
            self.data_path = p;
        }
    }

    /// The configured heatmap value column, validated.
    pub fn pivot_column(&self) -> Result<Column> {
        self.pivot_value.parse()
    }
}

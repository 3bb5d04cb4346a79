//! Pipeline Configuration
//! File locators, column names and chart labels, loaded from JSON.

use crate::charts::DualAxisLabels;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// One district-keyed input file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DatasetConfig {
    pub path: PathBuf,
    /// Encoding label understood by `encoding_rs` (e.g. "euc-kr").
    pub encoding: String,
    pub district_field: String,
    pub value_field: String,
    /// Axis label for the value column in the single-metric bar chart.
    pub value_label: String,
    pub title: String,
}

impl DatasetConfig {
    fn cctv() -> Self {
        Self {
            path: PathBuf::from("jinju_cctv.csv"),
            encoding: "euc-kr".to_string(),
            district_field: "읍면동".to_string(),
            value_field: "설치대수".to_string(),
            value_label: "설치 대수".to_string(),
            title: "📍 진주시 읍면동별 CCTV 설치대수".to_string(),
        }
    }

    fn street() -> Self {
        Self {
            path: PathBuf::from("jinju_street.csv"),
            encoding: "euc-kr".to_string(),
            district_field: "법정동".to_string(),
            value_field: "총등수".to_string(),
            value_label: "총 등수".to_string(),
            title: "💡 진주시 법정동별 가로등 총등수".to_string(),
        }
    }
}

/// Full run configuration. Missing keys fall back to the Jinju defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub cctv: DatasetConfig,
    pub street: DatasetConfig,
    pub output_dir: PathBuf,
    pub chart_width: u32,
    /// Font family for PNG charts. Every default label is Korean, so this must
    /// name a Hangul-capable font installed on the host (e.g. "Noto Sans CJK KR");
    /// with the generic "sans-serif" fallback Hangul is drawn as boxes.
    pub font_family: String,
    pub comparison_title: String,
    pub comparison_labels: DualAxisLabels,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cctv: DatasetConfig::cctv(),
            street: DatasetConfig::street(),
            output_dir: PathBuf::from("charts"),
            chart_width: 1200,
            font_family: "sans-serif".to_string(),
            comparison_title: "📊 진주시 동별 CCTV 설치대수 vs 가로등 총등수 (이중 Y축)"
                .to_string(),
            comparison_labels: DualAxisLabels::default(),
        }
    }
}

impl PipelineConfig {
    /// Read a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read a JSON config file, or use defaults when it does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

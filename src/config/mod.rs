// src/config/mod.rs

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::PipelineError;
use crate::process::Layout;

pub mod mapping;

pub use mapping::{MappingDocument, MappingRule, MatchMode, SheetField};

fn default_preview_rows() -> usize {
    200
}

/// Top-level `pipeline.yml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub interim_dir: PathBuf,
    pub processed_dir: PathBuf,
    #[serde(default)]
    pub history_dir: Option<PathBuf>,
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,
    #[serde(default)]
    pub releases: Vec<Release>,
    #[serde(default)]
    pub baseline: Option<BaselineConfig>,
}

/// One publication bundle ingested under a single vintage tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Release {
    /// File stem for the interim pool.
    pub name: String,
    pub vintage: String,
    pub raw_dir: PathBuf,
    #[serde(default)]
    pub layout: Layout,
    pub documents: Vec<DocumentSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSpec {
    /// File or directory name under the release's `raw_dir`.
    pub file: String,
    /// Default variable label for every row of this document.
    pub label: String,
    #[serde(default)]
    pub layout: Option<Layout>,
}

impl DocumentSpec {
    pub fn layout_or(&self, fallback: Layout) -> Layout {
        self.layout.unwrap_or(fallback)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineConfig {
    pub name: String,
    /// Release whose interim pool feeds the mapping.
    pub pool: String,
    pub mapping: PathBuf,
}

impl PipelineConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| PipelineError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&text).map_err(|source| PipelineError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn release(&self, name: &str) -> Result<&Release, PipelineError> {
        self.releases
            .iter()
            .find(|r| r.name == name)
            .ok_or_else(|| PipelineError::UnknownRelease(name.to_string()))
    }

    pub fn baseline(&self) -> Result<&BaselineConfig, PipelineError> {
        self.baseline.as_ref().ok_or(PipelineError::MissingBaseline)
    }

    pub fn pool_path(&self, release: &str) -> PathBuf {
        self.interim_dir.join(format!("{}_interim.parquet", release))
    }
}

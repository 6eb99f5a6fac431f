//! YAML configuration support for the StyleFP pipeline.
//!
//! One file configures every stage (ingest, tokens, layout, vector, index) so
//! deployments can tune thresholds without recompiling.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! # StyleFP pipeline configuration
//! version: "1.0"
//!
//! ingest:
//!   version: 1
//!   strip_control_chars: true
//!   max_nodes: 20000
//!
//! tokens:
//!   version: 1
//!   max_samples: 14
//!   chroma_brand_min: 40.0
//!
//! layout:
//!   version: 1
//!   use_parallel: false
//!
//! vector:
//!   version: 1
//!
//! index:
//!   dimension: 96
//!   backend: in_memory
//!   compression:
//!     codec: zstd
//!     level: 3
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use sfp_index::{BackendConfig, CompressionConfig, IndexConfig};
use sfp_ingest::IngestConfig;
use sfp_layout::LayoutConfig;
use sfp_tokens::TokenConfig;
use sfp_vector::{VectorConfig, VectorKind};

/// Errors that can occur when loading YAML configuration files.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// Top-level YAML configuration for the whole pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StylefpConfig {
    /// Configuration format version.
    pub version: String,

    /// Optional configuration name/description.
    #[serde(default)]
    pub name: Option<String>,

    /// Capture ingest configuration.
    #[serde(default)]
    pub ingest: IngestConfig,

    /// Token aggregation configuration.
    #[serde(default)]
    pub tokens: TokenConfig,

    /// Layout feature extraction configuration.
    #[serde(default)]
    pub layout: LayoutConfig,

    /// Vector assembly configuration.
    #[serde(default)]
    pub vector: VectorConfig,

    /// Similarity index configuration.
    #[serde(default)]
    pub index: IndexSettings,
}

impl StylefpConfig {
    /// Load a YAML configuration file from the given path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: StylefpConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        self.ingest
            .validate()
            .map_err(|e| ConfigLoadError::Validation(e.to_string()))?;
        self.tokens
            .validate()
            .map_err(|e| ConfigLoadError::Validation(e.to_string()))?;
        self.layout
            .validate()
            .map_err(|e| ConfigLoadError::Validation(e.to_string()))?;
        self.vector
            .validate()
            .map_err(|e| ConfigLoadError::Validation(e.to_string()))?;
        self.index.validate()?;

        Ok(())
    }
}

impl Default for StylefpConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            name: None,
            ingest: IngestConfig::default(),
            tokens: TokenConfig::default(),
            layout: LayoutConfig::default(),
            vector: VectorConfig::default(),
            index: IndexSettings::default(),
        }
    }
}

/// Index section of the YAML configuration.
///
/// [`IndexConfig`] itself stays serde-free, so this mirror carries the
/// YAML-facing fields and converts on demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSettings {
    /// Stored vector width; page vectors need interpretable plus reserved.
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    #[serde(
        default = "default_index_backend",
        with = "serde_yaml::with::singleton_map"
    )]
    pub backend: BackendConfig,

    #[serde(default)]
    pub compression: CompressionConfig,
}

fn default_dimension() -> usize {
    VectorKind::PageStyle.combined_dimensions()
}

fn default_index_backend() -> BackendConfig {
    BackendConfig::in_memory()
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            dimension: default_dimension(),
            backend: default_index_backend(),
            compression: CompressionConfig::default(),
        }
    }
}

impl IndexSettings {
    pub fn to_index_config(&self) -> IndexConfig {
        IndexConfig::new(self.dimension)
            .with_backend(self.backend.clone())
            .with_compression(self.compression.clone())
    }

    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.dimension == 0 {
            return Err(ConfigLoadError::Validation(
                "index.dimension must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

//! Editor configuration loaded from TOML
//!
//! Every section is optional; a missing file section falls back to its
//! defaults.

use crate::tools::{ToolSpec, ToolTable};
use anyhow::Context;
use pdfedit_core::RasterOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditorConfig {
    #[serde(default)]
    pub autosave: AutosaveConfig,
    #[serde(default)]
    pub zoom: ZoomConfig,
    #[serde(default)]
    pub raster: RasterOptions,
    #[serde(default)]
    pub storage: StorageConfig,
    /// Replaces the built-in tool table when present
    #[serde(default)]
    pub tools: Option<Vec<ToolSpec>>,
}

impl EditorConfig {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the TOML is malformed,
    /// or the tool table is inconsistent.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(s).context("Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        let zoom = &self.zoom;
        if zoom.min_scale.is_nan() || zoom.min_scale <= 0.0 || zoom.min_scale > zoom.max_scale {
            anyhow::bail!(
                "zoom.min_scale ({}) must be positive and not above zoom.max_scale ({})",
                zoom.min_scale,
                zoom.max_scale
            );
        }
        if self.raster.scale.is_nan() || self.raster.scale <= 0.0 {
            anyhow::bail!("raster.scale must be positive");
        }
        self.tool_table().map(|_| ())
    }

    /// The tool table this configuration describes
    pub fn tool_table(&self) -> anyhow::Result<ToolTable> {
        match &self.tools {
            Some(specs) => ToolTable::from_specs(specs.clone()).context("Invalid [[tools]] table"),
            None => Ok(ToolTable::default()),
        }
    }
}

/// Debounced session persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutosaveConfig {
    /// Quiet period after the last change before the session is written (default: 500)
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_debounce_ms() -> u64 {
    500
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl AutosaveConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoomConfig {
    /// Quiet period before an expensive re-render (default: 150)
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    #[serde(default = "default_min_scale")]
    pub min_scale: f64,
    #[serde(default = "default_max_scale")]
    pub max_scale: f64,
}

fn default_settle_ms() -> u64 {
    150
}

fn default_min_scale() -> f64 {
    0.25
}

fn default_max_scale() -> f64 {
    5.0
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            settle_ms: default_settle_ms(),
            min_scale: default_min_scale(),
            max_scale: default_max_scale(),
        }
    }
}

impl ZoomConfig {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Refuse writes that would push the store past this many bytes
    #[serde(default)]
    pub quota_bytes: Option<u64>,
    #[serde(default = "default_session_id")]
    pub session_id: String,
}

fn default_session_id() -> String {
    "default".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            quota_bytes: None,
            session_id: default_session_id(),
        }
    }
}

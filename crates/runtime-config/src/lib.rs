//! Display configuration for the conversation view.
//!
//! Read from `chamber.toml` by the CLI and handed explicitly to the view layer;
//! nothing here is global state.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Canonical config file name.
pub const CONFIG_FILE_NAME: &str = "chamber.toml";

/// Top-level configuration (persisted as `chamber.toml`).
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ChamberConfig {
    #[serde(default)]
    pub display: DisplaySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DisplaySettings {
    /// Density of tool call groups; decides whether turns start expanded.
    #[serde(default)]
    pub tool_call_expansion: ToolCallExpansion,
    /// Show interim assistant text between tool calls as turn activity.
    #[serde(default = "default_false")]
    pub show_text_justification_activity: bool,
    /// Animate streamed messages in. When off no space is ever reserved.
    #[serde(default = "default_true")]
    pub animate_messages: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            tool_call_expansion: ToolCallExpansion::Collapsed,
            show_text_justification_activity: false,
            animate_messages: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallExpansion {
    #[default]
    #[serde(alias = "collapse")]
    Collapsed,
    /// Only activity rows are shown; groups stay collapsed.
    #[serde(alias = "activity_only", alias = "activity-only")]
    Activity,
    #[serde(alias = "expanded")]
    Detailed,
    /// Unknown/invalid values are normalized by compatibility fallbacks.
    #[serde(other)]
    Unknown,
}

impl ToolCallExpansion {
    /// Whether a turn group starts expanded under this density.
    pub fn expands_by_default(&self) -> bool {
        matches!(self, Self::Detailed)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Parse config text and apply compatibility fallbacks.
pub fn parse_config(raw: &str) -> Result<ChamberConfig, toml::de::Error> {
    let mut config: ChamberConfig = toml::from_str(raw)?;
    apply_compat_fallbacks(&mut config);
    Ok(config)
}

pub fn load_from_path(path: &Path) -> Result<ChamberConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_config(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "loaded config");
    Ok(config)
}

/// Load config, falling back to defaults when the file is missing or invalid.
pub fn load_or_default(path: &Path) -> ChamberConfig {
    if !path.exists() {
        return ChamberConfig::default();
    }
    load_from_path(path).unwrap_or_else(|error| {
        warn!(%error, "using default display settings");
        ChamberConfig::default()
    })
}

/// Apply compatibility fallbacks after loading raw TOML.
/// Returns true when any field was updated.
pub fn apply_compat_fallbacks(config: &mut ChamberConfig) -> bool {
    let mut changed = false;

    if config.display.tool_call_expansion == ToolCallExpansion::Unknown {
        warn!("unknown tool_call_expansion value, falling back to collapsed");
        config.display.tool_call_expansion = ToolCallExpansion::Collapsed;
        changed = true;
    }

    changed
}

// ── Serde default functions ─────────────────────────────────────────────

fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}

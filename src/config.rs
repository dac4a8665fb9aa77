//! Configuration for the desktop tools themselves.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Settings shared by the new-qube wizard and the global config app,
/// loaded from an optional JSON file. Fields missing from the file keep
/// their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Menu entries preselected for a freshly created qube.
    #[serde(default = "default_applications")]
    pub default_applications: Vec<String>,

    /// Qube offered as the Tor gateway shortcut in the network chooser.
    #[serde(default = "default_tor_gateway")]
    pub tor_gateway_qube: String,
}

fn default_applications() -> Vec<String> {
    [
        "firefox.desktop",
        "firefox-esr.desktop",
        "exo-terminal-emulator.desktop",
        "xterm.desktop",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_tor_gateway() -> String {
    "sys-whonix".to_string()
}

impl Default for ToolConfig {
    fn default() -> Self {
        ToolConfig {
            default_applications: default_applications(),
            tor_gateway_qube: default_tor_gateway(),
        }
    }
}

impl ToolConfig {
    /// Load from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing config file {}", path.display()))
    }

    /// Load, falling back to defaults when no path is given or the file is
    /// unusable.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        match path {
            Some(path) => Self::load(path).unwrap_or_else(|err| {
                warn!("config unusable, using defaults: {err:#}");
                Self::default()
            }),
            None => Self::default(),
        }
    }
}

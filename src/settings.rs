//! Persistent settings for the ontology viewer.

use crate::api::DEFAULT_API_BASE;
use crate::graph::LayoutOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_API_URL: &str = "ONTOLOGY_API_URL";
pub const ENV_API_TOKEN: &str = "ONTOLOGY_API_TOKEN";
pub const ENV_HIERARCHY_PATH: &str = "ONTOLOGY_HIERARCHY_PATH";

/// All persistable settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Data source
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Bearer token; only ever taken from the environment
    #[serde(skip)]
    pub api_token: Option<String>,
    /// Local `class_hierarchy.json`; used instead of the API when set
    #[serde(default)]
    pub hierarchy_path: Option<PathBuf>,

    // Display
    pub node_size: f32,
    pub show_labels: bool,
    pub show_arrows: bool,

    // Layout
    #[serde(default = "default_layout")]
    pub layout: LayoutOptions,

    /// Class selected when the app was last closed
    #[serde(default)]
    pub last_class: Option<String>,

    /// Environment values for this run only; never written back
    #[serde(skip)]
    pub overrides: SourceOverrides,
}

/// Data-source values taken from the environment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceOverrides {
    pub api_base_url: Option<String>,
    pub hierarchy_path: Option<PathBuf>,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE.to_string()
}

/// Viewer layout defaults: classic numerics with a displacement cap so
/// plots stay finite.
fn default_layout() -> LayoutOptions {
    LayoutOptions {
        max_displacement: Some(0.5),
        ..LayoutOptions::default()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            api_token: None,
            hierarchy_path: None,
            node_size: 15.0,
            show_labels: true,
            show_arrows: true,
            layout: default_layout(),
            last_class: None,
            overrides: SourceOverrides::default(),
        }
    }
}

impl Settings {
    /// Get the path to the settings file
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push("ontology-graph-native");
            p.push("settings.json");
            p
        })
    }

    /// Load settings from the config directory and apply environment overrides
    pub fn load() -> Self {
        let mut settings = match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => {
                tracing::warn!("Could not determine config directory, using defaults");
                Self::default()
            }
        };
        settings.apply_overrides(|key| std::env::var(key).ok());
        settings
    }

    /// Load settings from `path`, returning defaults if the file doesn't exist or is invalid
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(settings) => {
                    tracing::info!(path = %path.display(), "Loaded settings");
                    settings
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to parse settings file, using defaults");
                    Self::default()
                }
            },
            // File doesn't exist yet, that's fine
            Err(_) => Self::default(),
        }
    }

    /// Override data-source fields from environment-style lookups
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.is_empty()) {
            self.overrides.api_base_url = Some(url);
        }
        if let Some(token) = lookup(ENV_API_TOKEN).filter(|v| !v.is_empty()) {
            self.api_token = Some(token);
        }
        if let Some(path) = lookup(ENV_HIERARCHY_PATH).filter(|v| !v.is_empty()) {
            self.overrides.hierarchy_path = Some(PathBuf::from(path));
        }
    }

    /// API base URL, preferring the environment over the saved value
    pub fn effective_api_base_url(&self) -> &str {
        self.overrides.api_base_url.as_deref().unwrap_or(self.api_base_url.as_str())
    }

    /// Local hierarchy file, preferring the environment over the saved value
    pub fn effective_hierarchy_path(&self) -> Option<&Path> {
        self.overrides
            .hierarchy_path
            .as_deref()
            .or(self.hierarchy_path.as_deref())
    }

    /// Save settings to the config directory
    pub fn save(&self) {
        let Some(path) = Self::config_path() else {
            tracing::warn!("Could not determine config directory, settings not saved");
            return;
        };
        if let Err(e) = self.save_to(&path) {
            tracing::error!(error = %e, "Failed to save settings");
        }
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        tracing::debug!(path = %path.display(), "Saved settings");
        Ok(())
    }
}

//! Configuration file support for kube-report

use crate::output::OutputFormat;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub roles: Roles,

    #[serde(default)]
    pub labels: Labels,

    #[serde(default)]
    pub nfs: NfsSettings,

    #[serde(default)]
    pub behavior: Behavior,
}

/// Default values for command-line options
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Defaults {
    #[serde(default)]
    pub output: OutputFormat,

    /// Export path components kept when grouping NFS volumes; 0 keeps the full path
    #[serde(default)]
    pub nfs_level: usize,
}

/// Node role classification
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Roles {
    #[serde(default = "default_control_plane_labels")]
    pub control_plane_labels: Vec<String>,
}

/// Labels of the aggregate rows
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Labels {
    #[serde(default = "default_total_label")]
    pub total: String,

    #[serde(default = "default_worker_total_label")]
    pub worker_total: String,
}

/// NFS probing settings
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct NfsSettings {
    #[serde(default = "default_mount_type")]
    pub mount_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mount_options: Option<String>,
}

/// Behavior settings
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Behavior {
    #[serde(default = "default_true")]
    pub show_progress: bool,
}

fn default_control_plane_labels() -> Vec<String> {
    vec![
        "node-role.kubernetes.io/control-plane".to_string(),
        "node-role.kubernetes.io/master".to_string(),
    ]
}

fn default_total_label() -> String {
    "Somma Totale".to_string()
}

fn default_worker_total_label() -> String {
    "Somma Worker".to_string()
}

fn default_mount_type() -> String {
    "nfs".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: OutputFormat::default(),
            nfs_level: 0,
        }
    }
}

impl Default for Roles {
    fn default() -> Self {
        Self {
            control_plane_labels: default_control_plane_labels(),
        }
    }
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            total: default_total_label(),
            worker_total: default_worker_total_label(),
        }
    }
}

impl Default for NfsSettings {
    fn default() -> Self {
        Self {
            mount_type: default_mount_type(),
            mount_options: None,
        }
    }
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            show_progress: default_true(),
        }
    }
}

impl Settings {
    /// Load settings from an explicit path, a standard location, or defaults.
    /// An explicit path that cannot be loaded is an error; a broken file found
    /// in a standard location is reported and ignored.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from_file(path);
        }

        match Self::find_config_file() {
            Some(path) => match Self::load_from_file(&path) {
                Ok(settings) => {
                    crate::log_debug!("Loaded settings from {}", path.display());
                    Ok(settings)
                }
                Err(e) => {
                    crate::log_warn!("Ignoring config file: {:#}", e);
                    Ok(Self::default())
                }
            },
            None => Ok(Self::default()),
        }
    }

    /// Load settings from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let settings: Settings = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(settings)
    }

    /// Find config file in standard locations
    /// Priority:
    /// 1. .kube-report.toml in current directory
    /// 2. ~/.config/kube-report/config.toml (XDG config directory)
    fn find_config_file() -> Option<PathBuf> {
        let local_config = PathBuf::from(".kube-report.toml");
        if local_config.exists() {
            return Some(local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join("kube-report").join("config.toml");
            if xdg_config.exists() {
                return Some(xdg_config);
            }
        }

        None
    }

    /// Generate example config file content
    pub fn example_config() -> Result<String> {
        let header = "# kube-report configuration file\n\
                      # Place this file at ~/.config/kube-report/config.toml or .kube-report.toml in your project\n\n";
        let body = toml::to_string_pretty(&Settings::default()).context("Failed to serialize settings")?;
        Ok(format!("{}{}", header, body))
    }
}

//! Configuration and settings management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_MAX_WORKERS: usize = 8;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub library: LibrarySettings,
    #[serde(default)]
    pub loader: LoaderSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LibrarySettings {
    #[serde(default = "default_custom_levels")]
    pub custom_levels: PathBuf,
    #[serde(default = "default_custom_wip_levels")]
    pub custom_wip_levels: PathBuf,
    #[serde(default = "default_cache_file")]
    pub cache_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoaderSettings {
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    #[serde(default = "default_level_id_prefix")]
    pub level_id_prefix: String,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            custom_levels: default_custom_levels(),
            custom_wip_levels: default_custom_wip_levels(),
            cache_file: default_cache_file(),
        }
    }
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            level_id_prefix: default_level_id_prefix(),
        }
    }
}

fn default_custom_levels() -> PathBuf {
    data_root().join("CustomLevels")
}

fn default_custom_wip_levels() -> PathBuf {
    data_root().join("CustomWIPLevels")
}

fn default_cache_file() -> PathBuf {
    data_root().join("cache.json")
}

fn default_max_workers() -> usize {
    DEFAULT_MAX_WORKERS
}

fn default_level_id_prefix() -> String {
    "custom_level_".to_string()
}

fn data_root() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("songloader")
}

impl Settings {
    /// Settings rooted at a single directory, with both content roots and
    /// the cache file underneath it
    pub fn rooted_at<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref();
        Self {
            library: LibrarySettings {
                custom_levels: root.join("CustomLevels"),
                custom_wip_levels: root.join("CustomWIPLevels"),
                cache_file: root.join("cache.json"),
            },
            loader: LoaderSettings::default(),
        }
    }

    /// Load settings from a file, or return defaults if file doesn't exist
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;

        let settings: Settings = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse settings from {}", path.display()))?;

        Ok(settings)
    }

    /// Save settings to a file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let contents = self.to_toml()?;

        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write settings to {}", path.display()))?;

        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize settings")
    }

    /// Worker count actually used by a scan; never zero
    pub fn max_workers(&self) -> usize {
        self.loader.max_workers.max(1)
    }

    /// Get the default settings file path
    pub fn default_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("songloader");

        config_dir.join("settings.toml")
    }
}

mod dirs {
    use std::path::PathBuf;

    pub fn config_dir() -> Option<PathBuf> {
        #[cfg(target_os = "macos")]
        {
            home().map(|home| home.join(".config"))
        }
        #[cfg(target_os = "linux")]
        {
            std::env::var_os("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .or_else(|| home().map(|home| home.join(".config")))
        }
        #[cfg(target_os = "windows")]
        {
            std::env::var_os("APPDATA").map(PathBuf::from)
        }
        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        {
            None
        }
    }

    pub fn data_dir() -> Option<PathBuf> {
        #[cfg(target_os = "macos")]
        {
            home().map(|home| home.join("Library").join("Application Support"))
        }
        #[cfg(target_os = "linux")]
        {
            std::env::var_os("XDG_DATA_HOME")
                .map(PathBuf::from)
                .or_else(|| home().map(|home| home.join(".local").join("share")))
        }
        #[cfg(target_os = "windows")]
        {
            std::env::var_os("LOCALAPPDATA").map(PathBuf::from)
        }
        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        {
            None
        }
    }

    #[allow(dead_code)]
    fn home() -> Option<PathBuf> {
        std::env::var_os("HOME").map(PathBuf::from)
    }
}

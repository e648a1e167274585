//! Configuration module for the nearshot CLI.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//! - CLI argument overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `NEARSHOT_` and use double
//! underscores to separate nested levels:
//! - `NEARSHOT_SEARCH__DEFAULT_K=5` sets `search.default_k`
//! - `NEARSHOT_SEARCHER__KIND=ivf` sets `searcher.kind`
//! - `NEARSHOT_DEBUG=true` sets `debug`
//!
//! The library itself never reads the environment; only [`Settings::load`]
//! and [`Settings::load_from`] do.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::vector::{IndexOptions, SearcherConfig};

/// Directory holding settings and, by default, the index file.
pub const CONFIG_DIR: &str = ".nearshot";

const SETTINGS_FILE: &str = "settings.toml";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Store file, relative to the workspace root unless absolute
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,

    /// Projector artifact; unset stores embeddings unprojected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projector_path: Option<PathBuf>,

    /// Expected embedding length
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension: Option<usize>,

    /// Workspace root directory (where .nearshot is located)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_root: Option<PathBuf>,

    /// Global debug mode
    #[serde(default)]
    pub debug: bool,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub searcher: SearcherConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SearchConfig {
    /// Results returned when `-k` is not given
    #[serde(default = "default_k")]
    pub default_k: usize,

    /// Drop hits farther than this squared distance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_distance: Option<f32>,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_index_path() -> PathBuf {
    PathBuf::from(CONFIG_DIR).join("index.nsx")
}
fn default_k() -> usize {
    9
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            index_path: default_index_path(),
            projector_path: None,
            dimension: None,
            workspace_root: None,
            debug: false,
            search: SearchConfig::default(),
            searcher: SearcherConfig::default(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_k: default_k(),
            max_distance: None,
        }
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join(SETTINGS_FILE));

        Self::figment(&config_path)
            .extract()
            .map_err(Box::new)
            .map(|mut settings: Settings| {
                if settings.workspace_root.is_none() {
                    settings.workspace_root = Self::workspace_root();
                }
                settings
            })
    }

    /// Load configuration from a specific file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        let path = path.as_ref();

        Self::figment(path)
            .extract()
            .map_err(Box::new)
            .map(|mut settings: Settings| {
                if settings.workspace_root.is_none() {
                    settings.workspace_root = Self::root_for_config(path);
                }
                settings
            })
    }

    fn figment(config_path: &Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("NEARSHOT_").map(|key| {
                key.as_str()
                    .to_lowercase()
                    .replace("__", ".") // Double underscore becomes dot
                    .into()
            }))
    }

    /// Find the workspace config file by searching up the directory tree
    fn find_workspace_config() -> Option<PathBuf> {
        Self::workspace_root().map(|root| root.join(CONFIG_DIR).join(SETTINGS_FILE))
    }

    /// Get the workspace root directory (where .nearshot is located)
    pub fn workspace_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        current
            .ancestors()
            .find(|ancestor| ancestor.join(CONFIG_DIR).is_dir())
            .map(Path::to_path_buf)
    }

    /// Workspace root implied by `<root>/.nearshot/settings.toml`.
    fn root_for_config(config_path: &Path) -> Option<PathBuf> {
        let config_dir = config_path.parent()?;
        if config_dir.file_name()? == CONFIG_DIR {
            config_dir.parent().map(Path::to_path_buf)
        } else {
            None
        }
    }

    /// Resolves a configured path against the workspace root.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        match &self.workspace_root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Absolute location of the store file.
    pub fn index_file(&self) -> PathBuf {
        self.resolve(&self.index_path)
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file in the current directory
    pub fn init_config_file(force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let current_dir = std::env::current_dir()?;
        Self::init_config_file_in(&current_dir, force)
    }

    /// Create a default settings file under `root/.nearshot/`
    pub fn init_config_file_in(
        root: &Path,
        force: bool,
    ) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = root.join(CONFIG_DIR).join(SETTINGS_FILE);

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let template = format!(
            r#"# nearshot configuration file

# Version of the configuration schema
version = 1

# Store file (relative to the workspace root)
index_path = "{}"

# Projector artifact mapping raw embeddings to the working dimension.
# Leave unset to store embeddings as given.
# projector_path = "models/pca-1792-256.nsp"

# Expected embedding length; must equal the projector input when both are set
# dimension = {}

# Global debug mode
debug = false

[search]
# Results returned when -k is not given
default_k = {}

# Drop hits farther than this squared Euclidean distance
# max_distance = 0.5

[searcher]
# "exact" scans every entry; "ivf" probes the nearest k-means lists
kind = "exact"

# Inverted lists and lists probed per query (ivf only)
nlist = 32
nprobe = 4
"#,
            default_index_path().display(),
            crate::vector::DEFAULT_INPUT_DIMENSION,
            default_k(),
        );

        std::fs::write(&config_path, template)?;

        Ok(config_path)
    }
}

impl From<&Settings> for IndexOptions {
    fn from(settings: &Settings) -> Self {
        IndexOptions {
            projector_path: settings
                .projector_path
                .as_deref()
                .map(|path| settings.resolve(path)),
            dimension: settings.dimension,
            searcher: settings.searcher.clone(),
        }
    }
}

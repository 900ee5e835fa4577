use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub paths: PathsConfig,
}

/// Knobs for the external search tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSettings {
    /// Binary name resolved on PATH, or an explicit path to it.
    #[serde(default = "default_binary")]
    pub binary: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,
    #[serde(default = "default_max_results")]
    pub default_max_results: usize,
    #[serde(default = "default_context_lines")]
    pub default_context_lines: usize,
    /// Report invocation failures instead of returning an empty result.
    #[serde(default)]
    pub surface_failures: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Replacement for a leading `~` in request paths.
    #[serde(default)]
    pub home: Option<PathBuf>,
}

fn default_binary() -> String {
    "rg".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_output_bytes() -> usize {
    5 * 1024 * 1024
}

fn default_max_results() -> usize {
    100
}

fn default_context_lines() -> usize {
    2
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            timeout_secs: default_timeout_secs(),
            max_output_bytes: default_max_output_bytes(),
            default_max_results: default_max_results(),
            default_context_lines: default_context_lines(),
            surface_failures: false,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content =
                std::fs::read_to_string(path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_project(project_root: &Path) -> Result<Option<Self>> {
        let path = Self::project_config_path(project_root);
        if path.exists() {
            let content =
                std::fs::read_to_string(&path).context("Failed to read project config")?;
            let config: Config =
                toml::from_str(&content).context("Failed to parse project config")?;
            Ok(Some(config))
        } else {
            Ok(None)
        }
    }

    /// Global config with the project's `.codesearch/config.toml` layered on top.
    pub fn load_for(project_root: &Path) -> Result<Self> {
        let global = Self::load()?;
        match Self::load_project(project_root)? {
            Some(project) => Ok(Self::merge(&global, &project)),
            None => Ok(global),
        }
    }

    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("codesearch")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    pub fn project_config_path(project_root: &Path) -> PathBuf {
        project_root.join(".codesearch").join("config.toml")
    }

    /// Home directory used for `~` expansion: the configured override, else the
    /// platform's home directory.
    pub fn home_dir(&self) -> Option<PathBuf> {
        self.paths.home.clone().or_else(dirs::home_dir)
    }

    pub fn merge(global: &Config, project: &Config) -> Config {
        let g = &global.search;
        let p = &project.search;
        Config {
            search: SearchSettings {
                binary: if p.binary != default_binary() {
                    p.binary.clone()
                } else {
                    g.binary.clone()
                },
                timeout_secs: if p.timeout_secs != default_timeout_secs() {
                    p.timeout_secs
                } else {
                    g.timeout_secs
                },
                max_output_bytes: if p.max_output_bytes != default_max_output_bytes() {
                    p.max_output_bytes
                } else {
                    g.max_output_bytes
                },
                default_max_results: if p.default_max_results != default_max_results() {
                    p.default_max_results
                } else {
                    g.default_max_results
                },
                default_context_lines: if p.default_context_lines != default_context_lines() {
                    p.default_context_lines
                } else {
                    g.default_context_lines
                },
                surface_failures: p.surface_failures || g.surface_failures,
            },
            paths: PathsConfig {
                home: project.paths.home.clone().or_else(|| global.paths.home.clone()),
            },
        }
    }
}

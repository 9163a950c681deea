//! User configuration
//!
//! Read from `config.yaml` in the platform config directory, or from the
//! file given with `--config`. Missing keys take their defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::Deserialize;

use crate::git::ServiceOptions;
use crate::ui::DiffMode;

pub const APP_NAME: &str = "git-tm";
const CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Remote whose prefix is stripped from commit decorations
    pub remote: String,
    /// Base branch candidates, in probing order
    pub trunk_branches: Vec<String>,
    pub fetch_timeout_secs: u64,
    pub max_parallel_lookups: usize,
    /// Skip the network refresh entirely
    pub offline: bool,
    pub context_lines: u32,
    pub diff_mode: DiffMode,
    /// Show lock files and dotfiles in diffs
    pub show_hidden: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            remote: "origin".to_string(),
            trunk_branches: vec!["main".to_string(), "master".to_string()],
            fetch_timeout_secs: 30,
            max_parallel_lookups: 8,
            offline: false,
            context_lines: 3,
            diff_mode: DiffMode::SideBySide,
            show_hidden: false,
        }
    }
}

impl Config {
    /// `<config dir>/git-tm/config.yaml`
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    /// Load the explicit file if given, else the default file if it exists
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        match Self::default_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.max_parallel_lookups == 0 {
            bail!("max_parallel_lookups must be at least 1");
        }
        if self.trunk_branches.iter().any(|b| b.trim().is_empty()) {
            bail!("trunk_branches must not contain empty names");
        }
        Ok(())
    }

    pub fn service_options(&self) -> ServiceOptions {
        ServiceOptions {
            default_remote: self.remote.clone(),
            trunk_branches: self.trunk_branches.clone(),
            fetch_timeout: Duration::from_secs(self.fetch_timeout_secs),
            max_parallel_lookups: self.max_parallel_lookups,
            offline: self.offline,
            ..ServiceOptions::default()
        }
    }
}

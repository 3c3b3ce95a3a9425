//! Runtime configuration.

use std::fs;
use std::path::{Path, PathBuf};

use devhost_shared::errors::{DevhostError, DevhostResult};
use dirs::home_dir;
use serde::{Deserialize, Serialize};

use crate::constants::dirs as const_dirs;
use crate::constants::envs as const_envs;
use crate::network::NetworkMode;
use crate::preflight::PreflightConfig;

/// Options shared by the host lifecycle and the preflight runner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevhostOptions {
    /// Root of everything devhost writes. `$DEVHOST_HOME`, else `~/.devhost`.
    pub home_dir: PathBuf,
    #[serde(default)]
    pub network_mode: NetworkMode,
    #[serde(default)]
    pub preflight: PreflightConfig,
}

impl Default for DevhostOptions {
    fn default() -> Self {
        let home_dir = std::env::var(const_envs::DEVHOST_HOME)
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let mut path = home_dir().unwrap_or_else(|| PathBuf::from("."));
                path.push(const_dirs::DEVHOST_DIR);
                path
            });

        Self::with_home_dir(home_dir)
    }
}

impl DevhostOptions {
    pub fn with_home_dir(home_dir: impl Into<PathBuf>) -> Self {
        Self {
            home_dir: home_dir.into(),
            network_mode: NetworkMode::default(),
            preflight: PreflightConfig::default(),
        }
    }

    /// Load options from a JSON file.
    pub fn from_json_file(path: &Path) -> DevhostResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            DevhostError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content)
            .map_err(|e| DevhostError::Config(format!("invalid {}: {}", path.display(), e)))
    }

    pub fn machines_dir(&self) -> PathBuf {
        self.home_dir.join(const_dirs::MACHINES_DIR)
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.home_dir.join(const_dirs::BIN_DIR)
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.home_dir.join(const_dirs::LOGS_DIR)
    }
}

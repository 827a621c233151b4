//! Project configuration (`config.yaml`)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::project::ProjectOptions;
use crate::yaml::{parse_yaml_file, write_yaml_file, YamlError};

pub const CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No config.yaml in {}", path.display())]
    NotFound { path: PathBuf },

    #[error(transparent)]
    Yaml(#[from] YamlError),
}

/// Settings stored at the root of every project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,

    /// CAD file the project was last built from, relative to the project root
    pub cad_path: PathBuf,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_url: Option<String>,

    #[serde(default)]
    pub options: ProjectOptions,
}

impl ProjectConfig {
    pub fn new(name: impl Into<String>, cad_path: impl Into<PathBuf>, options: ProjectOptions) -> Self {
        Self {
            name: name.into(),
            cad_path: cad_path.into(),
            repo_url: None,
            options,
        }
    }

    pub fn path(project_dir: &Path) -> PathBuf {
        project_dir.join(CONFIG_FILE)
    }

    pub fn load(project_dir: &Path) -> Result<Self, ConfigError> {
        let path = Self::path(project_dir);
        if !path.is_file() {
            return Err(ConfigError::NotFound { path });
        }
        Ok(parse_yaml_file(&path)?)
    }

    pub fn save(&self, project_dir: &Path) -> Result<(), ConfigError> {
        write_yaml_file(&Self::path(project_dir), self)?;
        Ok(())
    }

    /// Absolute path of the recorded CAD file
    pub fn cad_file(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.cad_path)
    }
}

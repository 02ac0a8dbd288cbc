use std::path::Path;

use serde::{Deserialize, Serialize};
use umbra_params::RenderConfig;

use crate::scene::{SceneDescription, SceneRegistry};
use crate::error::SceneError;

/// A complete run: render configuration plus the declared scene
///
/// The render sections sit at the top level of the YAML document next to `scene`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    #[serde(flatten)]
    pub render: RenderConfig,
    pub scene: SceneDescription,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl RunConfig {
    pub fn from_yaml_str(source: &str) -> Result<Self, ConfigError> {
        let config: RunConfig = serde_yaml::from_str(source)?;
        config.render.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&source)
    }

    pub fn to_yaml_string(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Resolve the declared scene into a registry, returning its diagnostics
    pub fn build_registry(&self) -> (SceneRegistry, Vec<SceneError>) {
        SceneRegistry::from_description(&self.scene, &self.render.limits)
    }
}

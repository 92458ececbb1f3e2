//! Infrastructure implementation of the `ConfigStore` port.

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::application::ports::ConfigStore;
use crate::domain::config::{
    Ec2K3sConfig, validate_instance_type, validate_region, validate_timings,
};

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "EC2_K3S_CONFIG";

/// Production implementation of `ConfigStore` that uses a YAML file on disk.
///
/// An explicit path (from `--config`) wins over `EC2_K3S_CONFIG`, which wins
/// over `~/.ec2-k3s/config.yaml`.
#[derive(Default)]
pub struct YamlConfigStore {
    explicit: Option<PathBuf>,
}

impl YamlConfigStore {
    #[must_use]
    pub fn new(explicit: Option<PathBuf>) -> Self {
        Self { explicit }
    }
}

impl ConfigStore for YamlConfigStore {
    fn load(&self) -> Result<Ec2K3sConfig> {
        let path = self.path()?;
        if !path.exists() {
            if self.explicit.is_some() {
                anyhow::bail!("config file {} does not exist", path.display());
            }
            return Ok(Ec2K3sConfig::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        let config: Ec2K3sConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("cannot parse {}", path.display()))?;
        if let Some(region) = &config.region {
            validate_region(region).with_context(|| format!("in {}", path.display()))?;
        }
        validate_instance_type(&config.instance_type)
            .with_context(|| format!("in {}", path.display()))?;
        validate_timings(&config).with_context(|| format!("in {}", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    fn path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.explicit {
            return Ok(path.clone());
        }
        if let Ok(val) = std::env::var(CONFIG_ENV) {
            return Ok(PathBuf::from(val));
        }
        let home =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
        Ok(home.join(".ec2-k3s").join("config.yaml"))
    }
}

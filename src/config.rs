//! Configuration module for registry credentials and the image list

use crate::error::{MigratorError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Address and login for one registry endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryCredential {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub base_address: String,
    #[serde(
        default,
        rename = "serveraddress",
        alias = "server_address",
        skip_serializing_if = "String::is_empty"
    )]
    pub server_address: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
}

impl RegistryCredential {
    pub fn new(base_address: impl Into<String>) -> Self {
        Self {
            base_address: base_address.into(),
            ..Self::default()
        }
    }

    pub fn with_login(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    pub fn with_server_address(mut self, server_address: impl Into<String>) -> Self {
        self.server_address = server_address.into();
        self
    }
}

/// One image to migrate
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ImageDescriptor {
    pub name: String,
    #[serde(default = "default_tag", deserialize_with = "tag_or_default")]
    pub tag: String,
    #[serde(default)]
    pub from_prefix: String,
    #[serde(default)]
    pub to_prefix: String,
}

impl ImageDescriptor {
    pub fn new(name: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tag: tag.into(),
            from_prefix: String::new(),
            to_prefix: String::new(),
        }
    }

    pub fn with_prefixes(mut self, from_prefix: impl Into<String>, to_prefix: impl Into<String>) -> Self {
        self.from_prefix = from_prefix.into();
        self.to_prefix = to_prefix.into();
        self
    }
}

fn default_tag() -> String {
    "latest".to_string()
}

// An explicit empty tag behaves like a missing one
fn tag_or_default<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let tag = String::deserialize(deserializer)?;
    Ok(if tag.is_empty() { default_tag() } else { tag })
}

/// The whole migration job list, loaded once at startup
#[derive(Debug, Clone, Deserialize)]
pub struct MigrationConfig {
    #[serde(rename = "from_repo")]
    pub from_registry: RegistryCredential,
    #[serde(rename = "to_repo")]
    pub to_registry: RegistryCredential,
    #[serde(default)]
    pub images: Vec<ImageDescriptor>,
}

impl MigrationConfig {
    /// Read, parse and validate a JSON configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|e| {
            MigratorError::Config(format!("Can't read config file {}: {}", path.display(), e))
        })?;

        let config = Self::from_json(&data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(data: &str) -> Result<Self> {
        serde_json::from_str(data)
            .map_err(|e| MigratorError::Config(format!("Can't parse config: {}", e)))
    }

    pub fn validate(&self) -> Result<()> {
        if self.from_registry.base_address.is_empty() {
            return Err(MigratorError::Config(
                "from_repo.base_address cannot be empty".to_string(),
            ));
        }
        if self.to_registry.base_address.is_empty() {
            return Err(MigratorError::Config(
                "to_repo.base_address cannot be empty".to_string(),
            ));
        }

        for (i, image) in self.images.iter().enumerate() {
            if image.name.is_empty() {
                return Err(MigratorError::Config(format!(
                    "images[{}].name cannot be empty",
                    i
                )));
            }
        }

        Ok(())
    }
}

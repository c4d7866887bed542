//! Desired configuration file (`cldform.yaml`)
//!
//! ```yaml
//! provider:
//!   cloud_name: demo
//! upload_mappings:
//!   remote:
//!     folder: remote
//!     template: https://example.com/images/
//! ```
//!
//! Provider keys that are left out fall back to the `CLOUDINARY_*`
//! environment variables.

use anyhow::Context;
use cldform_provider::{AttrValue, ProviderConfig, UploadMappingModel};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "cldform.yaml";

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DesiredConfig {
    pub provider: ProviderBlock,
    pub upload_mappings: BTreeMap<String, MappingBlock>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderBlock {
    pub cloud_name: Option<String>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub cloudinary_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MappingBlock {
    pub folder: String,
    pub template: String,
}

impl DesiredConfig {
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).context("failed to parse configuration")
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read configuration file: {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("invalid configuration file: {}", path.display()))?;
        tracing::debug!(path = %path.display(), mappings = config.upload_mappings.len(), "Loaded config");
        Ok(config)
    }

    /// Like [`DesiredConfig::load`], but a missing file means "environment only"
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using environment only");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn provider_config(&self) -> ProviderConfig {
        let p = &self.provider;
        ProviderConfig {
            cloud_name: AttrValue::from(p.cloud_name.clone()),
            api_key: AttrValue::from(p.api_key.clone()),
            api_secret: AttrValue::from(p.api_secret.clone()),
            cloudinary_url: AttrValue::from(p.cloudinary_url.clone()),
        }
    }

    pub fn desired_mappings(&self) -> BTreeMap<String, UploadMappingModel> {
        self.upload_mappings
            .iter()
            .map(|(name, m)| {
                (
                    name.clone(),
                    UploadMappingModel::desired(m.folder.as_str(), m.template.as_str()),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full() {
        let config = DesiredConfig::parse(
            r#"
provider:
  cloud_name: demo
  api_key: "123"
upload_mappings:
  remote:
    folder: remote
    template: https://example.com/images/
"#,
        )
        .unwrap();

        let provider = config.provider_config();
        assert_eq!(provider.cloud_name, AttrValue::known("demo"));
        assert_eq!(provider.api_key, AttrValue::known("123"));
        assert!(provider.api_secret.is_null());
        assert!(provider.cloudinary_url.is_null());

        let mappings = config.desired_mappings();
        assert_eq!(mappings["remote"].folder.as_str(), "remote");
        assert!(mappings["remote"].id.is_null());
    }

    #[test]
    fn test_parse_empty() {
        let config = DesiredConfig::parse("  \n").unwrap();
        assert!(config.upload_mappings.is_empty());
        assert!(config.provider_config().cloud_name.is_null());
    }

    #[test]
    fn test_parse_rejects_unknown_keys() {
        assert!(DesiredConfig::parse("provider:\n  region: eu\n").is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = DesiredConfig::load_or_default(&dir.path().join(DEFAULT_CONFIG_FILE)).unwrap();
        assert!(config.upload_mappings.is_empty());
        assert!(DesiredConfig::load(&dir.path().join(DEFAULT_CONFIG_FILE)).is_err());
    }
}

//! Settings resolution.
//!
//! Values come from three layers, later layers overriding earlier ones:
//! an optional `sitestack.toml` file, environment variables, and explicit
//! command line flags. The CLI folds the last two together through clap, so
//! this module only sees a file layer and an override layer.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::environment::{Environment, ACCOUNT_KEY, REGION_KEY};
use crate::error::{CoreError, CoreResult};
use crate::naming::validate_bucket_name;

pub const DOMAIN_KEY: &str = "DOMAIN_NAME";
pub const CERTIFICATE_KEY: &str = "CERTIFICATE_ARN";
pub const STACK_NAME_KEY: &str = "STACK_NAME";

pub const DEFAULT_CONFIG_FILE: &str = "sitestack.toml";
pub const DEFAULT_STACK_NAME: &str = "MySiteStack";

/// Partially specified settings, as read from one source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawConfig {
    pub account_id: Option<String>,
    pub region: Option<String>,
    pub domain_name: Option<String>,
    pub certificate_arn: Option<String>,
    pub stack_name: Option<String>,
    pub tags: BTreeMap<String, String>,
}

impl RawConfig {
    /// Load settings from a TOML file.
    pub fn from_file(path: &Path) -> CoreResult<Self> {
        let content = fs::read_to_string(path)?;
        let config: RawConfig = toml::from_str(&content)?;
        debug!("Loaded settings from {:?}", path);
        Ok(config)
    }

    /// Load settings from a TOML file if it exists.
    pub fn from_optional_file(path: &Path) -> CoreResult<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            debug!("No settings file at {:?}", path);
            Ok(Self::default())
        }
    }

    /// Overlay `other` on top of `self`; values present in `other` win.
    pub fn merge(mut self, other: RawConfig) -> Self {
        fn pick(base: &mut Option<String>, over: Option<String>) {
            if let Some(value) = over.filter(|v| !v.trim().is_empty()) {
                *base = Some(value);
            }
        }

        pick(&mut self.account_id, other.account_id);
        pick(&mut self.region, other.region);
        pick(&mut self.domain_name, other.domain_name);
        pick(&mut self.certificate_arn, other.certificate_arn);
        pick(&mut self.stack_name, other.stack_name);
        self.tags.extend(other.tags);
        self
    }

    /// Validate and convert into a complete configuration.
    pub fn resolve(self) -> CoreResult<SiteConfig> {
        let account = required(self.account_id, ACCOUNT_KEY)?;
        let region = required(self.region, REGION_KEY)?;
        let environment = Environment::new(account, region)?;

        let domain_name = required(self.domain_name, DOMAIN_KEY)?;
        let domain_name = domain_name.trim_end_matches('.').to_string();
        validate_bucket_name(&domain_name)?;

        let certificate_arn = required(self.certificate_arn, CERTIFICATE_KEY)?;

        let stack_name = self
            .stack_name
            .unwrap_or_else(|| DEFAULT_STACK_NAME.to_string());
        if !stack_name.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
            || !stack_name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
            || stack_name.len() > 128
        {
            return Err(CoreError::invalid(
                STACK_NAME_KEY,
                "must start with a letter and contain only letters, digits and hyphens",
            ));
        }

        for key in self.tags.keys() {
            if key.is_empty() || key.len() > 128 || key.starts_with("aws:") {
                return Err(CoreError::invalid("tags", format!("invalid tag key '{}'", key)));
            }
        }

        Ok(SiteConfig {
            environment,
            settings: SiteSettings {
                domain_name,
                certificate_arn,
                stack_name,
                tags: self.tags,
            },
        })
    }
}

fn required(value: Option<String>, key: &str) -> CoreResult<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| CoreError::missing(key))
}

/// Site-level settings handed to the topology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteSettings {
    pub domain_name: String,
    pub certificate_arn: String,
    pub stack_name: String,
    /// Extra tags applied alongside the `web-site` tag.
    pub tags: BTreeMap<String, String>,
}

/// Fully resolved input for one synthesis run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteConfig {
    pub environment: Environment,
    pub settings: SiteSettings,
}

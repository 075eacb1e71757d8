//! Lookup context for values that live outside the stack.
//!
//! Hosted zones and certificates already exist in the target account. Their
//! identifiers are resolved from a context file (`sitestack.context.json`)
//! so that synthesis never talks to a cloud API and two runs with the same
//! context produce the same template.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{CoreError, CoreResult};

pub const DEFAULT_CONTEXT_FILE: &str = "sitestack.context.json";

/// A hosted zone resolved by domain name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HostedZone {
    pub id: String,
    pub name: String,
}

/// Facts recorded about an existing certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CertificateInfo {
    pub domain_names: Vec<String>,
}

/// Source of lookups performed during synthesis.
pub trait ContextProvider {
    /// Find the hosted zone that serves `domain`.
    fn hosted_zone(&self, domain: &str) -> CoreResult<HostedZone>;

    /// Recorded facts about a certificate, if any were captured.
    fn certificate(&self, arn: &str) -> CoreResult<Option<CertificateInfo>>;
}

pub fn hosted_zone_key(domain: &str) -> String {
    format!("hosted-zone:domainName={}", domain.trim_end_matches('.'))
}

pub fn certificate_key(arn: &str) -> String {
    format!("certificate:arn={}", arn)
}

/// Lookup context backed by an optional JSON file.
#[derive(Debug, Clone, Default)]
pub struct LookupContext {
    path: Option<PathBuf>,
    entries: BTreeMap<String, Value>,
}

impl LookupContext {
    /// Create an empty context that is never persisted.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the context file at `path`. A missing file yields an empty context.
    pub fn load(path: impl Into<PathBuf>) -> CoreResult<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let content = fs::read_to_string(&path)?;
            serde_json::from_str(&content)?
        } else {
            debug!("No lookup context at {:?}", path);
            BTreeMap::new()
        };
        Ok(Self {
            path: Some(path),
            entries,
        })
    }

    /// Write the context back to the file it was loaded from.
    pub fn save(&self) -> CoreResult<()> {
        if let Some(path) = &self.path {
            fs::write(path, serde_json::to_string_pretty(&self.entries)? + "\n")?;
            info!("Saved lookup context to {:?}", path);
        }
        Ok(())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn entries(&self) -> &BTreeMap<String, Value> {
        &self.entries
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.entries.insert(key.into(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    /// Record the hosted zone for a domain.
    pub fn with_hosted_zone(mut self, domain: &str, zone_id: &str) -> Self {
        self.set_hosted_zone(domain, zone_id);
        self
    }

    pub fn set_hosted_zone(&mut self, domain: &str, zone_id: &str) {
        let domain = domain.trim_end_matches('.');
        let zone = HostedZone {
            id: normalize_zone_id(zone_id),
            name: format!("{}.", domain),
        };
        self.set(
            hosted_zone_key(domain),
            serde_json::json!({ "Id": zone.id, "Name": zone.name }),
        );
    }

    /// Record the names covered by a certificate.
    pub fn with_certificate(mut self, arn: &str, domain_names: &[&str]) -> Self {
        self.set(
            certificate_key(arn),
            serde_json::json!({ "DomainNames": domain_names }),
        );
        self
    }

    fn decode<T: for<'de> Deserialize<'de>>(&self, key: &str) -> CoreResult<Option<T>> {
        match self.entries.get(key) {
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| CoreError::MalformedContext {
                    key: key.to_string(),
                    reason: e.to_string(),
                }),
            None => Ok(None),
        }
    }
}

impl ContextProvider for LookupContext {
    fn hosted_zone(&self, domain: &str) -> CoreResult<HostedZone> {
        let domain = domain.trim_end_matches('.');

        // The zone for sub.example.com may be example.com; the longest
        // recorded suffix wins.
        let mut candidate = domain;
        loop {
            if let Some(mut zone) = self.decode::<HostedZone>(&hosted_zone_key(candidate))? {
                zone.id = normalize_zone_id(&zone.id);
                debug!("Resolved hosted zone {} for {}", zone.id, domain);
                return Ok(zone);
            }
            match candidate.split_once('.') {
                Some((_, parent)) if parent.contains('.') => candidate = parent,
                _ => break,
            }
        }

        Err(CoreError::HostedZoneNotFound(domain.to_string()))
    }

    fn certificate(&self, arn: &str) -> CoreResult<Option<CertificateInfo>> {
        self.decode(&certificate_key(arn))
    }
}

/// Strip the `/hostedzone/` prefix some APIs return.
fn normalize_zone_id(id: &str) -> String {
    id.trim_start_matches("/hostedzone/").to_string()
}

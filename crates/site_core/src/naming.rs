//! Naming rules for buckets, hostnames and certificate references.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::environment::{Environment, Partition};
use crate::error::{CoreError, CoreResult};

/// CloudFront only accepts certificates issued in this region.
pub const CERTIFICATE_REGION: &str = "us-east-1";

/// Check that `name` is usable as an S3 bucket name.
///
/// The domain name doubles as the bucket name, so this runs before any
/// resource is declared.
pub fn validate_bucket_name(name: &str) -> CoreResult<()> {
    let fail = |reason: &str| {
        Err(CoreError::InvalidBucketName {
            name: name.to_string(),
            reason: reason.to_string(),
        })
    };

    if name.len() < 3 || name.len() > 63 {
        return fail("must be between 3 and 63 characters long");
    }
    if name.chars().any(|c| c.is_ascii_uppercase()) {
        return fail("must not contain uppercase characters");
    }
    if !Regex::new(r"^[a-z0-9.-]+$")?.is_match(name) {
        return fail("may only contain lowercase letters, digits, dots and hyphens");
    }
    if !Regex::new(r"^[a-z0-9].*[a-z0-9]$")?.is_match(name) {
        return fail("must begin and end with a letter or digit");
    }
    if name.contains("..") || name.contains(".-") || name.contains("-.") {
        return fail("labels must not be empty or begin/end with a hyphen");
    }
    if Regex::new(r"^\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}$")?.is_match(name) {
        return fail("must not be formatted as an IP address");
    }
    if name.starts_with("xn--") || name.starts_with("sthree-") {
        return fail("uses a reserved prefix");
    }
    if name.ends_with("-s3alias") || name.ends_with("--ol-s3") {
        return fail("uses a reserved suffix");
    }

    Ok(())
}

/// The `www` alias for a bare domain.
pub fn www_alias(domain: &str) -> String {
    format!("www.{}", domain)
}

/// Whether a certificate name (possibly a wildcard) covers `host`.
pub fn certificate_covers(cert_name: &str, host: &str) -> bool {
    let cert_name = cert_name.trim_end_matches('.').to_ascii_lowercase();
    let host = host.trim_end_matches('.').to_ascii_lowercase();

    match cert_name.strip_prefix("*.") {
        Some(parent) => host
            .split_once('.')
            .map(|(label, rest)| !label.is_empty() && rest == parent)
            .unwrap_or(false),
        None => cert_name == host,
    }
}

/// A parsed ACM certificate ARN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateArn {
    pub arn: String,
    pub partition: Partition,
    pub region: String,
    pub account: String,
    pub certificate_id: String,
}

impl CertificateArn {
    /// Parse and validate a certificate reference for use by a distribution
    /// deployed into `env`.
    pub fn parse(arn: &str, env: &Environment) -> CoreResult<Self> {
        let fail = |reason: String| CoreError::InvalidCertificate {
            arn: arn.to_string(),
            reason,
        };

        let re = Regex::new(r"^arn:([a-z-]+):acm:([a-z0-9-]+):(\d{12}):certificate/([A-Za-z0-9-]+)$")?;
        let caps = re
            .captures(arn)
            .ok_or_else(|| fail("expected arn:<partition>:acm:<region>:<account>:certificate/<id>".into()))?;

        let partition: Partition = caps[1]
            .parse()
            .map_err(|_| fail(format!("unknown partition '{}'", &caps[1])))?;
        if partition != env.partition() {
            return Err(fail(format!(
                "partition {} does not match deployment partition {}",
                partition,
                env.partition()
            )));
        }

        let region = caps[2].to_string();
        if partition == Partition::Aws && region != CERTIFICATE_REGION {
            return Err(fail(format!(
                "certificate is in {} but distributions require {}",
                region, CERTIFICATE_REGION
            )));
        }

        Ok(Self {
            arn: arn.to_string(),
            partition,
            region,
            account: caps[3].to_string(),
            certificate_id: caps[4].to_string(),
        })
    }
}

impl std::fmt::Display for CertificateArn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.arn)
    }
}

//! Invariant rules and rule sets.
//!
//! Every rule inspects the template as plain JSON, so the same checks apply
//! to freshly synthesized stacks and to templates edited by hand.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use site_core::{DependencyGraph, RemovalPolicy, Resource, Template};

use crate::error::{PolicyError, PolicyResult};

const BUCKET: &str = "AWS::S3::Bucket";
const BUCKET_POLICY: &str = "AWS::S3::BucketPolicy";
const IDENTITY: &str = "AWS::CloudFront::CloudFrontOriginAccessIdentity";
const DISTRIBUTION: &str = "AWS::CloudFront::Distribution";
const RECORD_SET: &str = "AWS::Route53::RecordSet";

const READ_METHODS: [&str; 3] = ["GET", "HEAD", "OPTIONS"];
const DENIED_COUNTRIES: [&str; 3] = ["RU", "BY", "HU"];
const OBJECT_READ: &str = "s3:GetObject";

/// Security policies at or above the TLS 1.2 (2021) floor.
const ACCEPTED_TLS_POLICIES: [&str; 2] = ["TLSv1.2_2021", "TLSv1.2_2025"];

/// CloudFront's TTLs when a behavior leaves them unset.
const DEFAULT_MIN_TTL: u64 = 0;
const DEFAULT_DEFAULT_TTL: u64 = 86_400;
const DEFAULT_MAX_TTL: u64 = 31_536_000;

/// A policy rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyRule {
    pub id: String,
    pub name: String,
    pub description: String,
    pub severity: RuleSeverity,
    pub rule_type: RuleType,
    pub enabled: bool,
}

/// Rule severity levels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RuleSeverity {
    Error,
    Warning,
    Info,
}

/// Types of rules.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    BlockPublicAccess,
    NoPublicRead,
    SingleReaderPrincipal,
    ReadOnlyActions,
    IdempotentMethods,
    HttpsOnly,
    ViewerAliases,
    TlsFloor,
    TtlOrder,
    ErrorMapping,
    DnsAliasTargets,
    BucketRetained,
    GeoDenylist,
    AcyclicReferences,
}

impl RuleType {
    pub fn all() -> Vec<Self> {
        use RuleType::*;
        vec![
            BlockPublicAccess,
            NoPublicRead,
            SingleReaderPrincipal,
            ReadOnlyActions,
            IdempotentMethods,
            HttpsOnly,
            ViewerAliases,
            TlsFloor,
            TtlOrder,
            ErrorMapping,
            DnsAliasTargets,
            BucketRetained,
            GeoDenylist,
            AcyclicReferences,
        ]
    }

    pub fn id(&self) -> &'static str {
        match self {
            RuleType::BlockPublicAccess => "block-public-access",
            RuleType::NoPublicRead => "no-public-read",
            RuleType::SingleReaderPrincipal => "single-reader-principal",
            RuleType::ReadOnlyActions => "read-only-actions",
            RuleType::IdempotentMethods => "idempotent-methods",
            RuleType::HttpsOnly => "https-only",
            RuleType::ViewerAliases => "viewer-aliases",
            RuleType::TlsFloor => "tls-floor",
            RuleType::TtlOrder => "ttl-order",
            RuleType::ErrorMapping => "error-mapping",
            RuleType::DnsAliasTargets => "dns-alias-targets",
            RuleType::BucketRetained => "bucket-retained",
            RuleType::GeoDenylist => "geo-denylist",
            RuleType::AcyclicReferences => "acyclic-references",
        }
    }

    fn name(&self) -> &'static str {
        match self {
            RuleType::BlockPublicAccess => "Public Access Blocked",
            RuleType::NoPublicRead => "No Public Read",
            RuleType::SingleReaderPrincipal => "Single Reader Principal",
            RuleType::ReadOnlyActions => "Read-Only Bucket Actions",
            RuleType::IdempotentMethods => "Idempotent Methods Only",
            RuleType::HttpsOnly => "HTTPS Only",
            RuleType::ViewerAliases => "Apex and www Aliases",
            RuleType::TlsFloor => "TLS 1.2 Floor",
            RuleType::TtlOrder => "TTL Ordering",
            RuleType::ErrorMapping => "Error Pages Keep Status",
            RuleType::DnsAliasTargets => "DNS Aliases Target Distribution",
            RuleType::BucketRetained => "Bucket Retained",
            RuleType::GeoDenylist => "Geo Denylist",
            RuleType::AcyclicReferences => "Acyclic References",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            RuleType::BlockPublicAccess => "Every bucket blocks all four kinds of public access",
            RuleType::NoPublicRead => "No ACL or policy statement grants anonymous read",
            RuleType::SingleReaderPrincipal => {
                "Bucket policies grant access only to the stack's single origin access identity"
            }
            RuleType::ReadOnlyActions => "Bucket policies allow s3:GetObject and nothing else",
            RuleType::IdempotentMethods => "Distributions allow and cache only GET, HEAD and OPTIONS",
            RuleType::HttpsOnly => "Viewer HTTP traffic is redirected to HTTPS",
            RuleType::ViewerAliases => "Aliases include both the bare domain and its www host",
            RuleType::TlsFloor => "Viewer certificates use SNI and a TLSv1.2_2021 or newer policy",
            RuleType::TtlOrder => "MinTTL <= DefaultTTL <= MaxTTL",
            RuleType::ErrorMapping => "403 and 404 map to their own pages with the original status",
            RuleType::DnsAliasTargets => "Alias records resolve to a distribution, never a bucket",
            RuleType::BucketRetained => "Buckets survive stack deletion and replacement",
            RuleType::GeoDenylist => "Distributions restrict viewer geography with a denylist",
            RuleType::AcyclicReferences => "Resource references form a directed acyclic graph",
        }
    }

    fn default_severity(&self) -> RuleSeverity {
        match self {
            RuleType::GeoDenylist => RuleSeverity::Warning,
            _ => RuleSeverity::Error,
        }
    }
}

impl PolicyRule {
    pub fn new(rule_type: RuleType) -> Self {
        Self {
            id: rule_type.id().to_string(),
            name: rule_type.name().to_string(),
            description: rule_type.description().to_string(),
            severity: rule_type.default_severity(),
            rule_type,
            enabled: true,
        }
    }

    pub fn with_severity(mut self, severity: RuleSeverity) -> Self {
        self.severity = severity;
        self
    }
}

/// Result of rule evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleViolation {
    pub rule_id: String,
    pub severity: RuleSeverity,
    pub message: String,
    pub resource: Option<String>,
}

/// A set of policy rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleSet {
    pub name: String,
    pub rules: Vec<PolicyRule>,
}

impl RuleSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: Vec::new(),
        }
    }

    /// Every invariant of a static site stack.
    pub fn standard() -> Self {
        let mut rules = Self::new("Static Site Invariants");
        for rule_type in RuleType::all() {
            rules.add(PolicyRule::new(rule_type));
        }
        rules
    }

    /// Load a rule set from a YAML file.
    pub fn from_file(path: &Path) -> PolicyResult<Self> {
        let content = fs::read_to_string(path)?;
        let rules: RuleSet = serde_yaml::from_str(&content)?;
        if rules.rules.is_empty() {
            return Err(PolicyError::InvalidConfiguration(format!(
                "rule set {:?} contains no rules",
                path
            )));
        }
        Ok(rules)
    }

    /// Add a rule to the set.
    pub fn add(&mut self, rule: PolicyRule) {
        self.rules.push(rule);
    }

    /// Disable a rule by id.
    pub fn disable(&mut self, id: &str) -> PolicyResult<()> {
        let rule = self
            .rules
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| PolicyError::InvalidConfiguration(format!("unknown rule '{}'", id)))?;
        rule.enabled = false;
        Ok(())
    }

    /// Evaluate the enabled rules against a template.
    pub fn evaluate(&self, template: &Template) -> Vec<RuleViolation> {
        let mut violations = Vec::new();

        for rule in &self.rules {
            if !rule.enabled {
                debug!("Skipping disabled rule {}", rule.id);
                continue;
            }

            let findings = match rule.rule_type {
                RuleType::BlockPublicAccess => check_block_public_access(template),
                RuleType::NoPublicRead => check_no_public_read(template),
                RuleType::SingleReaderPrincipal => check_single_reader(template),
                RuleType::ReadOnlyActions => check_read_only_actions(template),
                RuleType::IdempotentMethods => check_idempotent_methods(template),
                RuleType::HttpsOnly => check_https_only(template),
                RuleType::ViewerAliases => check_viewer_aliases(template),
                RuleType::TlsFloor => check_tls_floor(template),
                RuleType::TtlOrder => check_ttl_order(template),
                RuleType::ErrorMapping => check_error_mapping(template),
                RuleType::DnsAliasTargets => check_dns_alias_targets(template),
                RuleType::BucketRetained => check_bucket_retained(template),
                RuleType::GeoDenylist => check_geo_denylist(template),
                RuleType::AcyclicReferences => check_acyclic(template),
            };

            debug!("Rule {} produced {} finding(s)", rule.id, findings.len());
            violations.extend(findings.into_iter().map(|(resource, message)| RuleViolation {
                rule_id: rule.id.clone(),
                severity: rule.severity,
                message: format!("{}: {}", rule.name, message),
                resource,
            }));
        }

        violations
    }
}

/// A finding before it is attributed to a rule: (logical id, message).
type Finding = (Option<String>, String);

fn finding(id: &str, message: impl Into<String>) -> Finding {
    (Some(id.to_string()), message.into())
}

/// A string or list of strings, as IAM and CloudFront both allow.
fn string_list(value: Option<&Value>) -> Vec<&str> {
    match value {
        Some(Value::String(s)) => vec![s.as_str()],
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

fn statements(policy: &Resource) -> Vec<&Value> {
    match policy.property("/PolicyDocument/Statement") {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(single @ Value::Object(_)) => vec![single],
        _ => Vec::new(),
    }
}

fn is_allow(statement: &Value) -> bool {
    statement.get("Effect").and_then(Value::as_str) == Some("Allow")
}

/// Logical id named by `{"Fn::GetAtt": [id, attr]}` when `attr` matches.
fn get_att_target<'a>(value: &'a Value, attr: &str) -> Option<&'a str> {
    match value.get("Fn::GetAtt")? {
        Value::Array(parts) if parts.len() == 2 && parts[1].as_str() == Some(attr) => parts[0].as_str(),
        Value::String(dotted) => dotted
            .split_once('.')
            .filter(|(_, a)| *a == attr)
            .map(|(id, _)| id),
        _ => None,
    }
}

/// Default behavior plus any path behaviors of a distribution.
fn behaviors(distribution: &Resource) -> Vec<&Value> {
    let mut out = Vec::new();
    if let Some(default) = distribution.property("/DistributionConfig/DefaultCacheBehavior") {
        out.push(default);
    }
    if let Some(Value::Array(items)) = distribution.property("/DistributionConfig/CacheBehaviors") {
        out.extend(items.iter());
    }
    out
}

fn check_block_public_access(template: &Template) -> Vec<Finding> {
    let flags = [
        "BlockPublicAcls",
        "BlockPublicPolicy",
        "IgnorePublicAcls",
        "RestrictPublicBuckets",
    ];
    let mut out = Vec::new();
    for (id, bucket) in template.resources_of_type(BUCKET) {
        for flag in flags {
            let path = format!("/PublicAccessBlockConfiguration/{}", flag);
            if bucket.property(&path).and_then(Value::as_bool) != Some(true) {
                out.push(finding(id, format!("{} is not enabled", flag)));
            }
        }
    }
    out
}

fn check_no_public_read(template: &Template) -> Vec<Finding> {
    let mut out = Vec::new();
    for (id, bucket) in template.resources_of_type(BUCKET) {
        if let Some(acl) = bucket.property("/AccessControl").and_then(Value::as_str) {
            if acl.starts_with("Public") || acl == "AuthenticatedRead" {
                out.push(finding(id, format!("bucket ACL {} exposes objects", acl)));
            }
        }
    }
    for (id, policy) in template.resources_of_type(BUCKET_POLICY) {
        for statement in statements(policy).into_iter().filter(|s| is_allow(s)) {
            let principal = statement.get("Principal");
            let anonymous = match principal {
                Some(Value::String(p)) => p == "*",
                Some(Value::Object(map)) => map
                    .get("AWS")
                    .map(|v| string_list(Some(v)).contains(&"*"))
                    .unwrap_or(false),
                _ => false,
            };
            if anonymous || statement.get("NotPrincipal").is_some() {
                out.push(finding(id, "statement grants access to everyone"));
            }
        }
    }
    out
}

fn check_single_reader(template: &Template) -> Vec<Finding> {
    let identities: BTreeSet<&str> = template
        .resources_of_type(IDENTITY)
        .map(|(id, _)| id.as_str())
        .collect();
    let mut out = Vec::new();

    if template.resources_of_type(BUCKET_POLICY).next().is_some() && identities.len() != 1 {
        out.push((
            None,
            format!("expected exactly one origin access identity, found {}", identities.len()),
        ));
    }

    let mut readers = BTreeSet::new();
    for (id, policy) in template.resources_of_type(BUCKET_POLICY) {
        for statement in statements(policy).into_iter().filter(|s| is_allow(s)) {
            let principal = statement.get("Principal").and_then(|p| p.get("CanonicalUser"));
            match principal.and_then(|p| get_att_target(p, "S3CanonicalUserId")) {
                Some(target) if identities.contains(target) => {
                    readers.insert(target);
                }
                _ => out.push(finding(
                    id,
                    "statement principal is not an origin access identity of this stack",
                )),
            }
        }
    }
    if readers.len() > 1 {
        out.push((None, format!("{} identities can read the bucket", readers.len())));
    }
    out
}

fn check_read_only_actions(template: &Template) -> Vec<Finding> {
    let mut out = Vec::new();
    for (id, policy) in template.resources_of_type(BUCKET_POLICY) {
        for statement in statements(policy).into_iter().filter(|s| is_allow(s)) {
            if statement.get("NotAction").is_some() {
                out.push(finding(id, "NotAction grants an open-ended action set"));
            }
            for action in string_list(statement.get("Action")) {
                if action != OBJECT_READ {
                    out.push(finding(id, format!("action {} is not read-only", action)));
                }
            }
        }
    }
    out
}

fn check_idempotent_methods(template: &Template) -> Vec<Finding> {
    let mut out = Vec::new();
    for (id, dist) in template.resources_of_type(DISTRIBUTION) {
        for behavior in behaviors(dist) {
            for key in ["AllowedMethods", "CachedMethods"] {
                // CloudFront falls back to GET and HEAD when the list is absent.
                let Some(value) = behavior.get(key) else {
                    out.push(finding(id, format!("{} is unset", key)));
                    continue;
                };
                let methods: BTreeSet<&str> = string_list(Some(value)).into_iter().collect();
                for method in &methods {
                    if !READ_METHODS.contains(method) {
                        out.push(finding(id, format!("{} includes {}", key, method)));
                    }
                }
                for method in READ_METHODS {
                    if !methods.contains(method) {
                        out.push(finding(id, format!("{} omits {}", key, method)));
                    }
                }
            }
        }
    }
    out
}

fn check_https_only(template: &Template) -> Vec<Finding> {
    let mut out = Vec::new();
    for (id, dist) in template.resources_of_type(DISTRIBUTION) {
        for behavior in behaviors(dist) {
            let policy = behavior.get("ViewerProtocolPolicy").and_then(Value::as_str);
            if !matches!(policy, Some("redirect-to-https") | Some("https-only")) {
                out.push(finding(
                    id,
                    format!("viewer protocol policy {} allows plain HTTP", policy.unwrap_or("<unset>")),
                ));
            }
        }
    }
    out
}

fn check_viewer_aliases(template: &Template) -> Vec<Finding> {
    let mut out = Vec::new();
    for (id, dist) in template.resources_of_type(DISTRIBUTION) {
        let aliases = string_list(dist.property("/DistributionConfig/Aliases"));
        if aliases.is_empty() {
            out.push(finding(id, "no aliases configured"));
            continue;
        }
        for alias in &aliases {
            let partner = match alias.strip_prefix("www.") {
                Some(bare) => bare.to_string(),
                None => format!("www.{}", alias),
            };
            if !aliases.contains(&partner.as_str()) {
                out.push(finding(id, format!("alias {} has no matching {}", alias, partner)));
            }
        }
        if dist
            .property("/DistributionConfig/ViewerCertificate/AcmCertificateArn")
            .is_none()
        {
            out.push(finding(id, "aliases are served without an ACM certificate"));
        }
    }
    out
}

fn check_tls_floor(template: &Template) -> Vec<Finding> {
    let mut out = Vec::new();
    for (id, dist) in template.resources_of_type(DISTRIBUTION) {
        let Some(cert) = dist.property("/DistributionConfig/ViewerCertificate") else {
            out.push(finding(id, "no viewer certificate"));
            continue;
        };
        let version = cert.get("MinimumProtocolVersion").and_then(Value::as_str);
        if !version.is_some_and(|v| ACCEPTED_TLS_POLICIES.contains(&v)) {
            out.push(finding(
                id,
                format!("minimum protocol {} is below TLSv1.2_2021", version.unwrap_or("<unset>")),
            ));
        }
        if cert.get("SslSupportMethod").and_then(Value::as_str) != Some("sni-only") {
            out.push(finding(id, "certificate is not served with SNI"));
        }
    }
    out
}

fn check_ttl_order(template: &Template) -> Vec<Finding> {
    let mut out = Vec::new();
    for (id, dist) in template.resources_of_type(DISTRIBUTION) {
        for behavior in behaviors(dist) {
            let parsed = [
                ttl_seconds(behavior, "MinTTL", DEFAULT_MIN_TTL),
                ttl_seconds(behavior, "DefaultTTL", DEFAULT_DEFAULT_TTL),
                ttl_seconds(behavior, "MaxTTL", DEFAULT_MAX_TTL),
            ];
            let mut seconds = Vec::with_capacity(3);
            for result in parsed {
                match result {
                    Ok(value) => seconds.push(value),
                    Err(message) => out.push(finding(id, message)),
                }
            }
            let &[min, default, max] = seconds.as_slice() else {
                continue;
            };
            if !(min <= default && default <= max) {
                out.push(finding(
                    id,
                    format!("min {}s, default {}s, max {}s are out of order", min, default, max),
                ));
            }
        }
    }
    out
}

/// TTLs may be numbers or numeric strings; absent keys take CloudFront's default.
fn ttl_seconds(behavior: &Value, key: &str, default: u64) -> Result<u64, String> {
    match behavior.get(key) {
        None => Ok(default),
        Some(Value::Number(n)) => n
            .as_u64()
            .ok_or_else(|| format!("{} {} is not a whole number of seconds", key, n)),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map_err(|_| format!("{} \"{}\" is not a whole number of seconds", key, s)),
        Some(other) => Err(format!("{} {} is not a whole number of seconds", key, other)),
    }
}

fn check_error_mapping(template: &Template) -> Vec<Finding> {
    let mut out = Vec::new();
    for (id, dist) in template.resources_of_type(DISTRIBUTION) {
        let responses: &[Value] = match dist.property("/DistributionConfig/CustomErrorResponses") {
            Some(Value::Array(items)) => items.as_slice(),
            _ => &[],
        };
        for code in [404u64, 403] {
            let expected_page = format!("/{}.html", code);
            match responses
                .iter()
                .find(|r| r.get("ErrorCode").and_then(Value::as_u64) == Some(code))
            {
                None => out.push(finding(id, format!("no custom response for {}", code))),
                Some(r) => {
                    let status = r.get("ResponseCode").and_then(Value::as_u64);
                    if status != Some(code) {
                        out.push(finding(
                            id,
                            format!("{} is reported to viewers as {:?}", code, status),
                        ));
                    }
                    let page = r.get("ResponsePagePath").and_then(Value::as_str);
                    if page != Some(expected_page.as_str()) {
                        out.push(finding(
                            id,
                            format!("{} maps to {:?} instead of {}", code, page, expected_page),
                        ));
                    }
                }
            }
        }
        for r in responses {
            if r.get("ResponseCode").and_then(Value::as_u64) == Some(200) {
                out.push(finding(id, "an error status is rewritten to 200"));
            }
        }
    }
    out
}

fn check_dns_alias_targets(template: &Template) -> Vec<Finding> {
    let mut out = Vec::new();
    let aliases: BTreeMap<&str, BTreeSet<&str>> = template
        .resources_of_type(DISTRIBUTION)
        .map(|(id, dist)| {
            let hosts = string_list(dist.property("/DistributionConfig/Aliases"));
            (id.as_str(), hosts.into_iter().collect())
        })
        .collect();

    let mut covered = BTreeSet::new();
    for (id, record) in template.resources_of_type(RECORD_SET) {
        let record_type = record.property("/Type").and_then(Value::as_str);
        if record_type != Some("A") {
            out.push(finding(
                id,
                format!("record type {} is not A", record_type.unwrap_or("<unset>")),
            ));
        }

        let Some(target) = record.property("/AliasTarget/DNSName") else {
            out.push(finding(id, "record is not an alias"));
            continue;
        };
        let Some((dist, hosts)) =
            get_att_target(target, "DomainName").and_then(|d| aliases.get_key_value(d))
        else {
            out.push(finding(id, "alias does not target a distribution"));
            continue;
        };

        let name = record
            .property("/Name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim_end_matches('.');
        if !hosts.contains(name) {
            out.push(finding(id, format!("{} is not an alias of {}", name, dist)));
        } else if !covered.insert((dist.to_string(), name.to_string())) {
            out.push(finding(id, format!("duplicate record for {}", name)));
        }
    }

    for (dist, hosts) in &aliases {
        for host in hosts {
            if !covered.contains(&(dist.to_string(), host.to_string())) {
                out.push(finding(dist, format!("no alias record for {}", host)));
            }
        }
    }
    out
}

fn check_bucket_retained(template: &Template) -> Vec<Finding> {
    let mut out = Vec::new();
    for (id, bucket) in template.resources_of_type(BUCKET) {
        if bucket.deletion_policy != Some(RemovalPolicy::Retain) {
            out.push(finding(id, "bucket is deleted with the stack"));
        }
        if bucket.update_replace_policy != Some(RemovalPolicy::Retain) {
            out.push(finding(id, "bucket is deleted on replacement"));
        }
    }
    out
}

fn check_geo_denylist(template: &Template) -> Vec<Finding> {
    let mut out = Vec::new();
    for (id, dist) in template.resources_of_type(DISTRIBUTION) {
        let geo = dist.property("/DistributionConfig/Restrictions/GeoRestriction");
        let kind = geo.and_then(|g| g.get("RestrictionType")).and_then(Value::as_str);
        let locations: BTreeSet<&str> = string_list(geo.and_then(|g| g.get("Locations")))
            .into_iter()
            .collect();
        let expected: BTreeSet<&str> = DENIED_COUNTRIES.into_iter().collect();
        if kind != Some("blacklist") {
            out.push(finding(id, "no geographic denylist"));
        } else if locations != expected {
            out.push(finding(
                id,
                format!("denylist {:?} differs from {:?}", locations, expected),
            ));
        }
    }
    out
}

fn check_acyclic(template: &Template) -> Vec<Finding> {
    match DependencyGraph::from_template(template) {
        Ok(_) => Vec::new(),
        Err(e) => vec![(None, e.to_string())],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn template_with(resources: Value) -> Template {
        serde_json::from_value(json!({ "Resources": resources })).unwrap()
    }

    fn ids(violations: &[RuleViolation]) -> Vec<&str> {
        violations.iter().map(|v| v.rule_id.as_str()).collect()
    }

    #[test]
    fn test_standard_contains_every_rule() {
        let rules = RuleSet::standard();
        assert_eq!(rules.rules.len(), RuleType::all().len());
        assert!(rules.rules.iter().all(|r| r.enabled));
    }

    #[test]
    fn test_public_bucket_flagged() {
        let template = template_with(json!({
            "Bucket": {
                "Type": "AWS::S3::Bucket",
                "Properties": { "AccessControl": "PublicRead" }
            }
        }));
        let violations = RuleSet::standard().evaluate(&template);
        let ids = ids(&violations);
        assert!(ids.contains(&"block-public-access"));
        assert!(ids.contains(&"no-public-read"));
        assert!(ids.contains(&"bucket-retained"));
    }

    #[test]
    fn test_wildcard_principal_flagged() {
        let template = template_with(json!({
            "Policy": {
                "Type": "AWS::S3::BucketPolicy",
                "Properties": {
                    "Bucket": "example.com",
                    "PolicyDocument": {
                        "Statement": [{ "Effect": "Allow", "Action": ["s3:GetObject", "s3:PutObject"], "Principal": "*", "Resource": "*" }]
                    }
                }
            }
        }));
        let violations = RuleSet::standard().evaluate(&template);
        let ids = ids(&violations);
        assert!(ids.contains(&"no-public-read"));
        assert!(ids.contains(&"single-reader-principal"));
        assert!(ids.contains(&"read-only-actions"));
    }

    #[test]
    fn test_mutating_method_and_http_flagged() {
        let template = template_with(json!({
            "Cdn": {
                "Type": "AWS::CloudFront::Distribution",
                "Properties": {
                    "DistributionConfig": {
                        "DefaultCacheBehavior": {
                            "AllowedMethods": ["GET", "HEAD", "OPTIONS", "PUT", "POST", "PATCH", "DELETE"],
                            "ViewerProtocolPolicy": "allow-all",
                            "MinTTL": 7200,
                            "DefaultTTL": 3600
                        }
                    }
                }
            }
        }));
        let violations = RuleSet::standard().evaluate(&template);
        let ids = ids(&violations);
        assert!(ids.contains(&"idempotent-methods"));
        assert!(ids.contains(&"https-only"));
        assert!(ids.contains(&"ttl-order"));
        assert!(ids.contains(&"viewer-aliases"));
        assert!(ids.contains(&"tls-floor"));
        assert!(ids.contains(&"error-mapping"));
    }

    #[test]
    fn test_error_rewritten_to_200_flagged() {
        let template = template_with(json!({
            "Cdn": {
                "Type": "AWS::CloudFront::Distribution",
                "Properties": {
                    "DistributionConfig": {
                        "CustomErrorResponses": [
                            { "ErrorCode": 404, "ResponseCode": 200, "ResponsePagePath": "/index.html" },
                            { "ErrorCode": 403, "ResponseCode": 403, "ResponsePagePath": "/403.html" }
                        ]
                    }
                }
            }
        }));
        let violations = RuleSet::standard().evaluate(&template);
        let mapping: Vec<_> = violations.iter().filter(|v| v.rule_id == "error-mapping").collect();
        assert_eq!(mapping.len(), 3);
    }

    #[test]
    fn test_record_aliasing_bucket_flagged() {
        let template = template_with(json!({
            "Bucket": { "Type": "AWS::S3::Bucket" },
            "Record": {
                "Type": "AWS::Route53::RecordSet",
                "Properties": {
                    "Name": "example.com.",
                    "Type": "A",
                    "AliasTarget": { "DNSName": { "Fn::GetAtt": ["Bucket", "RegionalDomainName"] }, "HostedZoneId": "Z1" }
                }
            }
        }));
        let violations = RuleSet::standard().evaluate(&template);
        assert!(violations
            .iter()
            .any(|v| v.rule_id == "dns-alias-targets" && v.resource.as_deref() == Some("Record")));
    }

    fn site_distribution(behavior: Value) -> Value {
        json!({
            "Type": "AWS::CloudFront::Distribution",
            "Properties": {
                "DistributionConfig": {
                    "Aliases": ["example.com", "www.example.com"],
                    "DefaultCacheBehavior": behavior,
                    "Restrictions": {
                        "GeoRestriction": { "RestrictionType": "blacklist", "Locations": ["RU", "BY", "HU"] }
                    }
                }
            }
        })
    }

    fn alias_record(name: &str, record_type: &str) -> Value {
        json!({
            "Type": "AWS::Route53::RecordSet",
            "Properties": {
                "Name": name,
                "Type": record_type,
                "AliasTarget": { "DNSName": { "Fn::GetAtt": ["Cdn", "DomainName"] }, "HostedZoneId": "Z2FDTNDATAQYW2" }
            }
        })
    }

    fn messages(template: &Template, rule: &str) -> Vec<String> {
        RuleSet::standard()
            .evaluate(template)
            .into_iter()
            .filter(|v| v.rule_id == rule)
            .map(|v| v.message)
            .collect()
    }

    #[test]
    fn test_dns_records_must_be_type_a() {
        let template = template_with(json!({
            "Cdn": site_distribution(json!({})),
            "Apex": alias_record("example.com.", "A"),
            "Www": alias_record("www.example.com.", "CNAME")
        }));
        let found = messages(&template, "dns-alias-targets");
        assert_eq!(found.len(), 1);
        assert!(found[0].contains("CNAME"));
    }

    #[test]
    fn test_dns_record_for_unknown_host_flagged() {
        let template = template_with(json!({
            "Cdn": site_distribution(json!({})),
            "Apex": alias_record("example.com.", "A"),
            "Www": alias_record("www.example.com.", "A"),
            "Shop": alias_record("shop.example.com.", "A")
        }));
        let found = messages(&template, "dns-alias-targets");
        assert_eq!(found.len(), 1);
        assert!(found[0].contains("shop.example.com is not an alias of Cdn"));
    }

    #[test]
    fn test_duplicate_dns_record_flagged() {
        let template = template_with(json!({
            "Cdn": site_distribution(json!({})),
            "Apex": alias_record("example.com.", "A"),
            "ApexAgain": alias_record("example.com", "A"),
            "Www": alias_record("www.example.com.", "A")
        }));
        let found = messages(&template, "dns-alias-targets");
        assert_eq!(found.len(), 1);
        assert!(found[0].contains("duplicate record for example.com"));
    }

    #[test]
    fn test_methods_must_equal_read_set() {
        let narrowed = template_with(json!({
            "Cdn": site_distribution(json!({ "AllowedMethods": ["GET"], "CachedMethods": ["GET"] }))
        }));
        let found = messages(&narrowed, "idempotent-methods");
        assert_eq!(found.len(), 4);
        assert!(found.iter().any(|m| m.contains("AllowedMethods omits OPTIONS")));

        let unset = template_with(json!({
            "Cdn": site_distribution(json!({ "AllowedMethods": ["GET", "HEAD", "OPTIONS"] }))
        }));
        let found = messages(&unset, "idempotent-methods");
        assert_eq!(found.len(), 1);
        assert!(found[0].contains("CachedMethods is unset"));

        let exact = template_with(json!({
            "Cdn": site_distribution(json!({
                "AllowedMethods": ["OPTIONS", "GET", "HEAD"],
                "CachedMethods": ["GET", "HEAD", "OPTIONS"]
            }))
        }));
        assert!(messages(&exact, "idempotent-methods").is_empty());
    }

    #[test]
    fn test_quoted_ttls_are_compared() {
        let quoted = template_with(json!({
            "Cdn": site_distribution(json!({ "MinTTL": "999999999", "DefaultTTL": "3600", "MaxTTL": 864000 }))
        }));
        let found = messages(&quoted, "ttl-order");
        assert_eq!(found.len(), 1);
        assert!(found[0].contains("out of order"));

        let ordered = template_with(json!({
            "Cdn": site_distribution(json!({ "MinTTL": "3600", "DefaultTTL": 3600, "MaxTTL": "864000" }))
        }));
        assert!(messages(&ordered, "ttl-order").is_empty());
    }

    #[test]
    fn test_unparseable_ttl_reported() {
        let template = template_with(json!({
            "Cdn": site_distribution(json!({ "MinTTL": "an hour", "DefaultTTL": -1 }))
        }));
        let found = messages(&template, "ttl-order");
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|m| m.contains("not a whole number of seconds")));
    }

    #[test]
    fn test_geo_denylist_must_match_site_set() {
        let mut dist = site_distribution(json!({}));
        dist["Properties"]["DistributionConfig"]["Restrictions"]["GeoRestriction"]["Locations"] =
            json!(["RU"]);
        let template = template_with(json!({ "Cdn": dist }));
        let violations = RuleSet::standard().evaluate(&template);
        let geo: Vec<_> = violations.iter().filter(|v| v.rule_id == "geo-denylist").collect();
        assert_eq!(geo.len(), 1);
        assert_eq!(geo[0].severity, RuleSeverity::Warning);

        let template = template_with(json!({ "Cdn": site_distribution(json!({})) }));
        assert!(messages(&template, "geo-denylist").is_empty());
    }

    #[test]
    fn test_disabled_rule_skipped() {
        let template = template_with(json!({ "Bucket": { "Type": "AWS::S3::Bucket" } }));
        let mut rules = RuleSet::standard();
        rules.disable("bucket-retained").unwrap();
        rules.disable("block-public-access").unwrap();
        assert!(rules.evaluate(&template).is_empty());
        assert!(rules.disable("no-such-rule").is_err());
    }

    #[test]
    fn test_geo_rule_is_warning() {
        let rule = PolicyRule::new(RuleType::GeoDenylist);
        assert_eq!(rule.severity, RuleSeverity::Warning);
        let rule = rule.with_severity(RuleSeverity::Error);
        assert_eq!(rule.severity, RuleSeverity::Error);
    }

    #[test]
    fn test_cycle_reported() {
        let template = template_with(json!({
            "A": { "Type": "T::A", "Properties": { "Peer": { "Ref": "B" } } },
            "B": { "Type": "T::B", "Properties": { "Peer": { "Ref": "A" } } }
        }));
        let violations = RuleSet::standard().evaluate(&template);
        assert_eq!(ids(&violations), vec!["acyclic-references"]);
    }
}

//! CloudFront distribution fronting the bucket.

use std::time::Duration;

use serde::{Serialize, Serializer};
use tracing::{debug, info};

use site_core::{CertificateArn, Expr, Resource, ResourceHandle, StackContext};

use crate::access::OriginAccess;
use crate::bucket::{WebsiteBucket, INDEX_DOCUMENT};
use crate::error::{StackError, StackResult};

pub const DISTRIBUTION_TYPE: &str = "AWS::CloudFront::Distribution";
pub const ORIGIN_ID: &str = "origin1";

/// Countries whose viewers receive CloudFront's block response.
pub const DENIED_COUNTRIES: [&str; 3] = ["RU", "BY", "HU"];

const HOUR: u64 = 60 * 60;
const DAY: u64 = 24 * HOUR;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The read-only method set served and cached by the site.
pub const READ_METHODS: [HttpMethod; 3] = [HttpMethod::Get, HttpMethod::Head, HttpMethod::Options];

/// Cache lifetime bounds, in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    pub min: Duration,
    pub default: Duration,
    pub max: Duration,
}

impl TtlPolicy {
    pub fn new(min: Duration, default: Duration, max: Duration) -> StackResult<Self> {
        if min > default || default > max {
            return Err(StackError::InvalidTtl {
                min: min.as_secs(),
                default: default.as_secs(),
                max: max.as_secs(),
            });
        }
        Ok(Self { min, default, max })
    }

    /// One hour minimum and default, ten days maximum.
    pub fn site_default() -> StackResult<Self> {
        Self::new(
            Duration::from_secs(HOUR),
            Duration::from_secs(HOUR),
            Duration::from_secs(10 * DAY),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ViewerProtocolPolicy {
    #[serde(rename = "redirect-to-https")]
    RedirectToHttps,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SslMethod {
    #[serde(rename = "sni-only")]
    Sni,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SecurityPolicy {
    #[serde(rename = "TLSv1.2_2021")]
    TlsV12_2021,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PriceClass {
    /// North America and Europe edge locations only.
    #[serde(rename = "PriceClass_100")]
    PriceClass100,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HttpVersion {
    #[serde(rename = "http2")]
    Http2,
}

/// TLS binding between the distribution and an existing ACM certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerCertificate {
    pub certificate: CertificateArn,
    pub aliases: Vec<String>,
    pub ssl_method: SslMethod,
    pub security_policy: SecurityPolicy,
}

impl ViewerCertificate {
    /// Bind `certificate` for `aliases`, which must include every host in
    /// `required`.
    pub fn from_acm(
        certificate: CertificateArn,
        aliases: Vec<String>,
        required: &[String],
    ) -> StackResult<Self> {
        for host in required {
            if !aliases.iter().any(|a| a == host) {
                return Err(StackError::MissingAlias(host.clone()));
            }
        }
        Ok(Self {
            certificate,
            aliases,
            ssl_method: SslMethod::Sni,
            security_policy: SecurityPolicy::TlsV12_2021,
        })
    }
}

/// Countries denied access to the distribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoRestriction {
    pub denied: Vec<String>,
}

impl GeoRestriction {
    pub fn denylist(countries: &[&str]) -> StackResult<Self> {
        let denied = countries
            .iter()
            .map(|c| {
                if c.len() == 2 && c.chars().all(|ch| ch.is_ascii_uppercase()) {
                    Ok(c.to_string())
                } else {
                    Err(StackError::InvalidCountryCode(c.to_string()))
                }
            })
            .collect::<StackResult<Vec<_>>>()?;
        Ok(Self { denied })
    }
}

impl Serialize for GeoRestriction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Wire<'a> {
            restriction_type: &'static str,
            locations: &'a [String],
        }

        Wire {
            restriction_type: "blacklist",
            locations: &self.denied,
        }
        .serialize(serializer)
    }
}

/// Maps an error status to a custom page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorResponse {
    pub error_code: u16,
    pub response_code: u16,
    pub response_page_path: String,
}

impl ErrorResponse {
    /// Serve `page` for `code` while keeping `code` as the viewer status.
    pub fn preserving(code: u16, page: &str) -> StackResult<Self> {
        if !(400..600).contains(&code) {
            return Err(StackError::InvalidErrorResponse(format!(
                "{} is not an error status",
                code
            )));
        }
        if !page.starts_with('/') {
            return Err(StackError::InvalidErrorResponse(format!(
                "page path '{}' must start with '/'",
                page
            )));
        }
        Ok(Self {
            error_code: code,
            response_code: code,
            response_page_path: page.to_string(),
        })
    }

    /// The `404.html`/`403.html` pair served by the site.
    pub fn site_defaults() -> StackResult<Vec<Self>> {
        Ok(vec![
            Self::preserving(404, "/404.html")?,
            Self::preserving(403, "/403.html")?,
        ])
    }
}

/// Default cache behavior; the distribution has no path-based behaviors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheBehavior {
    pub allowed_methods: Vec<HttpMethod>,
    pub cached_methods: Vec<HttpMethod>,
    pub ttl: TtlPolicy,
    pub viewer_protocol_policy: ViewerProtocolPolicy,
}

impl CacheBehavior {
    /// Every cached method must also be allowed.
    pub fn new(
        allowed_methods: Vec<HttpMethod>,
        cached_methods: Vec<HttpMethod>,
        ttl: TtlPolicy,
    ) -> StackResult<Self> {
        for method in &cached_methods {
            if !allowed_methods.contains(method) {
                return Err(StackError::UncacheableMethod(method.to_string()));
            }
        }
        Ok(Self {
            allowed_methods,
            cached_methods,
            ttl,
            viewer_protocol_policy: ViewerProtocolPolicy::RedirectToHttps,
        })
    }

    /// Read-only methods, cached with the site TTLs.
    pub fn read_only() -> StackResult<Self> {
        Self::new(READ_METHODS.to_vec(), READ_METHODS.to_vec(), TtlPolicy::site_default()?)
    }
}

/// Everything needed to declare the distribution.
#[derive(Debug, Clone)]
pub struct DistributionSpec {
    pub viewer_certificate: ViewerCertificate,
    pub behavior: CacheBehavior,
    pub geo_restriction: GeoRestriction,
    pub error_responses: Vec<ErrorResponse>,
    pub default_root_object: String,
    pub price_class: PriceClass,
    pub http_version: HttpVersion,
}

impl DistributionSpec {
    /// The site's fixed distribution policy.
    pub fn for_site(viewer_certificate: ViewerCertificate) -> StackResult<Self> {
        Ok(Self {
            viewer_certificate,
            behavior: CacheBehavior::read_only()?,
            geo_restriction: GeoRestriction::denylist(&DENIED_COUNTRIES)?,
            error_responses: ErrorResponse::site_defaults()?,
            default_root_object: INDEX_DOCUMENT.to_string(),
            price_class: PriceClass::PriceClass100,
            http_version: HttpVersion::Http2,
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct DistributionProperties {
    distribution_config: DistributionConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct DistributionConfig {
    aliases: Vec<String>,
    custom_error_responses: Vec<ErrorResponse>,
    default_cache_behavior: DefaultCacheBehavior,
    default_root_object: String,
    enabled: bool,
    http_version: HttpVersion,
    #[serde(rename = "IPV6Enabled")]
    ipv6_enabled: bool,
    origins: Vec<Origin>,
    price_class: PriceClass,
    restrictions: Restrictions,
    viewer_certificate: ViewerCertificateConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct DefaultCacheBehavior {
    allowed_methods: Vec<HttpMethod>,
    cached_methods: Vec<HttpMethod>,
    compress: bool,
    #[serde(rename = "DefaultTTL")]
    default_ttl: u64,
    forwarded_values: ForwardedValues,
    #[serde(rename = "MaxTTL")]
    max_ttl: u64,
    #[serde(rename = "MinTTL")]
    min_ttl: u64,
    target_origin_id: String,
    viewer_protocol_policy: ViewerProtocolPolicy,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ForwardedValues {
    query_string: bool,
    cookies: Cookies,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct Cookies {
    forward: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct Origin {
    domain_name: Expr,
    id: String,
    s3_origin_config: S3OriginConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct S3OriginConfig {
    origin_access_identity: Expr,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct Restrictions {
    geo_restriction: GeoRestriction,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ViewerCertificateConfig {
    acm_certificate_arn: String,
    minimum_protocol_version: SecurityPolicy,
    ssl_support_method: SslMethod,
}

/// Declare the distribution with the bucket as its only origin, read through
/// the origin access identity.
pub fn declare_distribution(
    ctx: &mut StackContext<'_>,
    logical_id: &str,
    bucket: &WebsiteBucket,
    access: &OriginAccess,
    spec: &DistributionSpec,
) -> StackResult<ResourceHandle> {
    let behavior = &spec.behavior;
    let cert = &spec.viewer_certificate;

    let config = DistributionConfig {
        aliases: cert.aliases.clone(),
        custom_error_responses: spec.error_responses.clone(),
        default_cache_behavior: DefaultCacheBehavior {
            allowed_methods: behavior.allowed_methods.clone(),
            cached_methods: behavior.cached_methods.clone(),
            compress: false,
            default_ttl: behavior.ttl.default.as_secs(),
            forwarded_values: ForwardedValues {
                query_string: false,
                cookies: Cookies { forward: "none" },
            },
            max_ttl: behavior.ttl.max.as_secs(),
            min_ttl: behavior.ttl.min.as_secs(),
            target_origin_id: ORIGIN_ID.to_string(),
            viewer_protocol_policy: behavior.viewer_protocol_policy,
        },
        default_root_object: spec.default_root_object.clone(),
        enabled: true,
        http_version: spec.http_version,
        ipv6_enabled: true,
        origins: vec![Origin {
            domain_name: bucket.handle.attr("RegionalDomainName"),
            id: ORIGIN_ID.to_string(),
            s3_origin_config: S3OriginConfig {
                origin_access_identity: Expr::concat(vec![
                    Expr::literal("origin-access-identity/cloudfront/"),
                    access.identity.reference(),
                ]),
            },
        }],
        price_class: spec.price_class,
        restrictions: Restrictions {
            geo_restriction: spec.geo_restriction.clone(),
        },
        viewer_certificate: ViewerCertificateConfig {
            acm_certificate_arn: cert.certificate.arn.clone(),
            minimum_protocol_version: cert.security_policy,
            ssl_support_method: cert.ssl_method,
        },
    };

    debug!("Distribution aliases: {:?}", cert.aliases);
    let props = DistributionProperties {
        distribution_config: config,
    };
    // The origin can only be read once the bucket policy grants the identity access.
    let resource = Resource::new(DISTRIBUTION_TYPE, &props)?.depends_on(access.policy.logical_id());
    let handle = ctx.add_resource(logical_id, resource)?;

    info!("Declared distribution for {}", cert.aliases.join(", "));
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use site_core::Environment;

    fn cert() -> CertificateArn {
        let env = Environment::new("123456789012", "us-east-1").unwrap();
        CertificateArn::parse(
            "arn:aws:acm:us-east-1:123456789012:certificate/abc",
            &env,
        )
        .unwrap()
    }

    fn hosts() -> Vec<String> {
        vec!["example.com".to_string(), "www.example.com".to_string()]
    }

    #[test]
    fn test_viewer_certificate_requires_both_hosts() {
        assert!(ViewerCertificate::from_acm(cert(), hosts(), &hosts()).is_ok());

        let err = ViewerCertificate::from_acm(cert(), vec!["example.com".into()], &hosts()).unwrap_err();
        assert!(matches!(err, StackError::MissingAlias(ref h) if h == "www.example.com"));

        let err = ViewerCertificate::from_acm(cert(), vec!["www.example.com".into()], &hosts()).unwrap_err();
        assert!(matches!(err, StackError::MissingAlias(ref h) if h == "example.com"));
    }

    #[test]
    fn test_viewer_certificate_tls_floor() {
        let vc = ViewerCertificate::from_acm(cert(), hosts(), &hosts()).unwrap();
        assert_eq!(vc.ssl_method, SslMethod::Sni);
        assert_eq!(vc.security_policy, SecurityPolicy::TlsV12_2021);
        assert_eq!(serde_json::to_value(vc.security_policy).unwrap(), "TLSv1.2_2021");
    }

    #[test]
    fn test_ttl_order() {
        let ttl = TtlPolicy::site_default().unwrap();
        assert!(ttl.min <= ttl.default && ttl.default <= ttl.max);
        assert_eq!(ttl.min.as_secs(), 3600);
        assert_eq!(ttl.max.as_secs(), 864_000);

        let err = TtlPolicy::new(
            Duration::from_secs(7200),
            Duration::from_secs(3600),
            Duration::from_secs(86400),
        );
        assert!(matches!(err, Err(StackError::InvalidTtl { .. })));
    }

    #[test]
    fn test_read_only_methods() {
        let behavior = CacheBehavior::read_only().unwrap();
        assert_eq!(
            behavior.allowed_methods,
            vec![HttpMethod::Get, HttpMethod::Head, HttpMethod::Options]
        );
        assert_eq!(behavior.cached_methods, behavior.allowed_methods);
        assert_eq!(behavior.ttl, TtlPolicy::site_default().unwrap());
        assert_eq!(behavior.viewer_protocol_policy, ViewerProtocolPolicy::RedirectToHttps);
    }

    #[test]
    fn test_cached_methods_must_be_allowed() {
        let err = CacheBehavior::new(
            vec![HttpMethod::Get, HttpMethod::Head],
            READ_METHODS.to_vec(),
            TtlPolicy::site_default().unwrap(),
        );
        assert!(matches!(err, Err(StackError::UncacheableMethod(ref m)) if m == "OPTIONS"));
    }

    #[test]
    fn test_geo_restriction_serialization() {
        let geo = GeoRestriction::denylist(&DENIED_COUNTRIES).unwrap();
        assert_eq!(
            serde_json::to_value(&geo).unwrap(),
            serde_json::json!({ "RestrictionType": "blacklist", "Locations": ["RU", "BY", "HU"] })
        );
        assert!(GeoRestriction::denylist(&["ru"]).is_err());
        assert!(GeoRestriction::denylist(&["USA"]).is_err());
    }

    #[test]
    fn test_error_responses_preserve_status() {
        let responses = ErrorResponse::site_defaults().unwrap();
        assert_eq!(responses.len(), 2);
        for r in &responses {
            assert_eq!(r.error_code, r.response_code);
            assert_eq!(r.response_page_path, format!("/{}.html", r.error_code));
        }
        assert!(ErrorResponse::preserving(200, "/ok.html").is_err());
        assert!(ErrorResponse::preserving(404, "404.html").is_err());
    }
}

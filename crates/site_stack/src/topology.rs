//! Static site topology: bucket, access binding, distribution and DNS.

use tracing::{debug, info};

use site_core::{
    certificate_covers, validate_bucket_name, www_alias, CertificateArn, Expr, HostedZone, Output,
    ResourceHandle, SiteSettings, StackContext,
};

use crate::access::{declare_origin_access, OriginAccess};
use crate::bucket::{declare_bucket, WebsiteBucket};
use crate::distribution::{declare_distribution, DistributionSpec, ViewerCertificate};
use crate::dns::declare_alias_record;
use crate::error::{StackError, StackResult};

/// Logical ids used in the template.
pub mod ids {
    pub const BUCKET: &str = "WebsiteBucket";
    pub const IDENTITY: &str = "OriginAccessIdentity";
    pub const BUCKET_POLICY: &str = "WebsiteBucketPolicy";
    pub const DISTRIBUTION: &str = "SiteDistribution";
    pub const APEX_RECORD: &str = "SiteAliasRecord";
    pub const WWW_RECORD: &str = "SiteWwwAliasRecord";
}

/// Everything resolved before the first resource is declared.
#[derive(Debug, Clone)]
struct Preflight {
    domain_name: String,
    hosts: Vec<String>,
    certificate: CertificateArn,
    zone: HostedZone,
}

/// Handles to the declared resources.
#[derive(Debug, Clone)]
pub struct SiteTopology {
    pub bucket: WebsiteBucket,
    pub access: OriginAccess,
    pub distribution: ResourceHandle,
    pub records: Vec<ResourceHandle>,
}

impl SiteTopology {
    /// Declare the topology into `ctx`.
    ///
    /// All settings and lookups are checked first, so on error the context
    /// holds no resources from this call.
    pub fn build(ctx: &mut StackContext<'_>, settings: &SiteSettings) -> StackResult<Self> {
        let pre = Self::preflight(ctx, settings)?;
        info!("Building site topology for {}", pre.domain_name);

        ctx.set_description(format!("Static website for {}", pre.domain_name));

        let bucket = declare_bucket(ctx, ids::BUCKET, &pre.domain_name)?;
        let access = declare_origin_access(
            ctx,
            ids::IDENTITY,
            ids::BUCKET_POLICY,
            &bucket,
            &pre.domain_name,
        )?;

        let viewer_certificate =
            ViewerCertificate::from_acm(pre.certificate.clone(), pre.hosts.clone(), &pre.hosts)?;
        let spec = DistributionSpec::for_site(viewer_certificate)?;
        let distribution = declare_distribution(ctx, ids::DISTRIBUTION, &bucket, &access, &spec)?;

        let apex = declare_alias_record(ctx, ids::APEX_RECORD, &pre.zone, &pre.hosts[0], &distribution)?;
        let www = declare_alias_record(ctx, ids::WWW_RECORD, &pre.zone, &pre.hosts[1], &distribution)?;

        ctx.add_output(
            "BucketName",
            Output::new("Bucket holding the site content", bucket.handle.reference())?,
        )?;
        ctx.add_output(
            "DistributionId",
            Output::new("Distribution id, for cache invalidations", distribution.reference())?,
        )?;
        ctx.add_output(
            "DistributionDomainName",
            Output::new("Edge hostname the alias records resolve to", distribution.attr("DomainName"))?,
        )?;
        ctx.add_output(
            "SiteUrl",
            Output::new("Public site address", Expr::literal(format!("https://{}", pre.domain_name)))?,
        )?;

        Ok(Self {
            bucket,
            access,
            distribution,
            records: vec![apex, www],
        })
    }

    fn preflight(ctx: &StackContext<'_>, settings: &SiteSettings) -> StackResult<Preflight> {
        let domain_name = settings.domain_name.trim_end_matches('.').to_string();
        validate_bucket_name(&domain_name)?;

        let hosts = vec![domain_name.clone(), www_alias(&domain_name)];

        let certificate = CertificateArn::parse(&settings.certificate_arn, ctx.environment())?;
        if let Some(info) = ctx.lookup().certificate(&certificate.arn)? {
            for host in &hosts {
                if !info.domain_names.iter().any(|name| certificate_covers(name, host)) {
                    return Err(StackError::CertificateCoverage {
                        arn: certificate.arn.clone(),
                        host: host.clone(),
                    });
                }
            }
            debug!("Certificate {} covers {:?}", certificate, hosts);
        }

        let zone = ctx.lookup().hosted_zone(&domain_name)?;
        debug!("Using hosted zone {} ({})", zone.id, zone.name);

        Ok(Preflight {
            domain_name,
            hosts,
            certificate,
            zone,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use site_core::{CoreError, Environment, LookupContext};

    const ARN: &str = "arn:aws:acm:us-east-1:123456789012:certificate/abc";

    fn settings(domain: &str) -> SiteSettings {
        SiteSettings {
            domain_name: domain.to_string(),
            certificate_arn: ARN.to_string(),
            stack_name: "Test".to_string(),
            tags: BTreeMap::new(),
        }
    }

    fn env() -> Environment {
        Environment::new("123456789012", "eu-west-1").unwrap()
    }

    #[test]
    fn test_build_declares_in_dependency_order() {
        let lookup = LookupContext::in_memory().with_hosted_zone("example.com", "Z1");
        let mut ctx = StackContext::new("Test", env(), &lookup);
        let topology = SiteTopology::build(&mut ctx, &settings("example.com")).unwrap();

        assert_eq!(topology.records.len(), 2);
        assert_eq!(
            ctx.graph().order(),
            &[
                ids::BUCKET,
                ids::IDENTITY,
                ids::BUCKET_POLICY,
                ids::DISTRIBUTION,
                ids::APEX_RECORD,
                ids::WWW_RECORD
            ]
        );
        assert!(ctx.graph().depends_transitively(ids::WWW_RECORD, ids::BUCKET));
    }

    #[test]
    fn test_missing_zone_declares_nothing() {
        let lookup = LookupContext::in_memory();
        let mut ctx = StackContext::new("Test", env(), &lookup);
        let err = SiteTopology::build(&mut ctx, &settings("example.com")).unwrap_err();
        assert!(matches!(err, StackError::Core(CoreError::HostedZoneNotFound(_))));
        assert_eq!(ctx.resource_count(), 0);
    }

    #[test]
    fn test_certificate_must_cover_www() {
        let lookup = LookupContext::in_memory()
            .with_hosted_zone("example.com", "Z1")
            .with_certificate(ARN, &["example.com"]);
        let mut ctx = StackContext::new("Test", env(), &lookup);
        let err = SiteTopology::build(&mut ctx, &settings("example.com")).unwrap_err();
        assert!(matches!(err, StackError::CertificateCoverage { ref host, .. } if host == "www.example.com"));
        assert!(err.is_lookup());
        assert_eq!(ctx.resource_count(), 0);
    }

    #[test]
    fn test_wildcard_certificate_accepted() {
        let lookup = LookupContext::in_memory()
            .with_hosted_zone("example.com", "Z1")
            .with_certificate(ARN, &["example.com", "*.example.com"]);
        let mut ctx = StackContext::new("Test", env(), &lookup);
        assert!(SiteTopology::build(&mut ctx, &settings("example.com")).is_ok());
    }

    #[test]
    fn test_uppercase_domain_declares_nothing() {
        let lookup = LookupContext::in_memory().with_hosted_zone("Example.com", "Z1");
        let mut ctx = StackContext::new("Test", env(), &lookup);
        let err = SiteTopology::build(&mut ctx, &settings("Example.com")).unwrap_err();
        assert!(err.is_config());
        assert_eq!(ctx.resource_count(), 0);
    }
}

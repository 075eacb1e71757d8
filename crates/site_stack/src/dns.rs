//! Route 53 alias records pointing at the distribution.

use serde::Serialize;
use tracing::info;

use site_core::{Expr, HostedZone, Partition, Resource, ResourceHandle, StackContext};

use crate::error::StackResult;

pub const RECORD_SET_TYPE: &str = "AWS::Route53::RecordSet";

/// Hosted zone that owns every CloudFront distribution domain.
pub fn cloudfront_alias_zone(partition: Partition) -> &'static str {
    match partition {
        Partition::AwsCn => "Z3RFFRIM2A3IF5",
        Partition::Aws | Partition::AwsUsGov => "Z2FDTNDATAQYW2",
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RecordSetProperties {
    pub name: String,
    #[serde(rename = "Type")]
    pub record_type: String,
    pub hosted_zone_id: String,
    pub alias_target: AliasTarget,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AliasTarget {
    #[serde(rename = "DNSName")]
    pub dns_name: Expr,
    pub hosted_zone_id: String,
}

/// Declare an `A` alias record for `host` that resolves to the distribution.
pub fn declare_alias_record(
    ctx: &mut StackContext<'_>,
    logical_id: &str,
    zone: &HostedZone,
    host: &str,
    distribution: &ResourceHandle,
) -> StackResult<ResourceHandle> {
    let partition = ctx.environment().partition();
    let props = RecordSetProperties {
        name: format!("{}.", host.trim_end_matches('.')),
        record_type: "A".to_string(),
        hosted_zone_id: zone.id.clone(),
        alias_target: AliasTarget {
            dns_name: distribution.attr("DomainName"),
            hosted_zone_id: cloudfront_alias_zone(partition).to_string(),
        },
    };
    let handle = ctx.add_resource(logical_id, Resource::new(RECORD_SET_TYPE, &props)?)?;

    info!("Declared alias {} -> {}", host, distribution.logical_id());
    Ok(handle)
}

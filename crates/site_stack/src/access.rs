//! Origin access identity and the bucket policy that lets it read objects.

use serde::Serialize;
use tracing::info;

use site_core::{Expr, Resource, ResourceHandle, StackContext};

use crate::bucket::WebsiteBucket;
use crate::error::StackResult;

pub const IDENTITY_TYPE: &str = "AWS::CloudFront::CloudFrontOriginAccessIdentity";
pub const BUCKET_POLICY_TYPE: &str = "AWS::S3::BucketPolicy";
pub const POLICY_VERSION: &str = "2012-10-17";
pub const READ_ACTION: &str = "s3:GetObject";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct IdentityProperties {
    pub cloud_front_origin_access_identity_config: IdentityConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct IdentityConfig {
    pub comment: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BucketPolicyProperties {
    pub bucket: Expr,
    pub policy_document: PolicyDocument,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: String,
    pub statement: Vec<PolicyStatement>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    pub effect: Effect,
    pub action: String,
    pub principal: Principal,
    pub resource: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Effect {
    Allow,
}

/// Principals a statement may name. Wildcard principals are not representable.
#[derive(Debug, Clone, Serialize)]
pub enum Principal {
    CanonicalUser(Expr),
}

impl PolicyStatement {
    /// Read-only access to every object in `bucket` for `identity`.
    pub fn object_read(bucket: &WebsiteBucket, identity: &ResourceHandle) -> Self {
        Self {
            effect: Effect::Allow,
            action: READ_ACTION.to_string(),
            principal: Principal::CanonicalUser(identity.attr("S3CanonicalUserId")),
            resource: Expr::concat(vec![bucket.handle.attr("Arn"), Expr::literal("/*")]),
        }
    }
}

/// Identity plus the policy binding it to the bucket.
#[derive(Debug, Clone)]
pub struct OriginAccess {
    pub identity: ResourceHandle,
    pub policy: ResourceHandle,
}

/// Declare the single origin access identity and grant it `s3:GetObject`
/// on the bucket's objects.
pub fn declare_origin_access(
    ctx: &mut StackContext<'_>,
    identity_id: &str,
    policy_id: &str,
    bucket: &WebsiteBucket,
    domain_name: &str,
) -> StackResult<OriginAccess> {
    let identity_props = IdentityProperties {
        cloud_front_origin_access_identity_config: IdentityConfig {
            comment: format!("Cloudfront OAI for {}", domain_name),
        },
    };
    let identity = ctx.add_resource(identity_id, Resource::new(IDENTITY_TYPE, &identity_props)?)?;

    let policy_props = BucketPolicyProperties {
        bucket: bucket.handle.reference(),
        policy_document: PolicyDocument {
            version: POLICY_VERSION.to_string(),
            statement: vec![PolicyStatement::object_read(bucket, &identity)],
        },
    };
    let policy = ctx.add_resource(policy_id, Resource::new(BUCKET_POLICY_TYPE, &policy_props)?)?;

    info!("Granted {} read access to {}", identity.logical_id(), bucket.name);
    Ok(OriginAccess { identity, policy })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::declare_bucket;
    use serde_json::json;
    use site_core::{Environment, LookupContext};

    #[test]
    fn test_policy_grants_only_identity() {
        let lookup = LookupContext::in_memory();
        let env = Environment::new("123456789012", "us-east-1").unwrap();
        let mut ctx = StackContext::new("Test", env, &lookup);
        let bucket = declare_bucket(&mut ctx, "Bucket", "example.com").unwrap();
        let access = declare_origin_access(&mut ctx, "Oai", "Policy", &bucket, "example.com").unwrap();
        assert_eq!(access.identity.logical_id(), "Oai");

        let stack = ctx.finish();
        let identity = &stack.template.resources["Oai"];
        assert_eq!(
            identity.properties["CloudFrontOriginAccessIdentityConfig"]["Comment"],
            "Cloudfront OAI for example.com"
        );

        let policy = &stack.template.resources["Policy"];
        assert_eq!(policy.properties["Bucket"], json!({ "Ref": "Bucket" }));
        assert_eq!(
            policy.properties["PolicyDocument"]["Statement"],
            json!([{
                "Effect": "Allow",
                "Action": "s3:GetObject",
                "Principal": { "CanonicalUser": { "Fn::GetAtt": ["Oai", "S3CanonicalUserId"] } },
                "Resource": { "Fn::Join": ["", [{ "Fn::GetAtt": ["Bucket", "Arn"] }, "/*"]] }
            }])
        );
        assert_eq!(stack.dependency_order, vec!["Bucket", "Oai", "Policy"]);
    }
}

//! Private website bucket.

use serde::Serialize;
use tracing::info;

use site_core::{validate_bucket_name, RemovalPolicy, Resource, ResourceHandle, StackContext};

use crate::error::StackResult;

pub const BUCKET_TYPE: &str = "AWS::S3::Bucket";
pub const INDEX_DOCUMENT: &str = "index.html";
pub const ERROR_DOCUMENT: &str = "error.html";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BucketProperties {
    pub bucket_name: String,
    pub website_configuration: WebsiteConfiguration,
    pub public_access_block_configuration: PublicAccessBlock,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct WebsiteConfiguration {
    pub index_document: String,
    pub error_document: String,
}

impl Default for WebsiteConfiguration {
    fn default() -> Self {
        Self {
            index_document: INDEX_DOCUMENT.to_string(),
            error_document: ERROR_DOCUMENT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PublicAccessBlock {
    pub block_public_acls: bool,
    pub block_public_policy: bool,
    pub ignore_public_acls: bool,
    pub restrict_public_buckets: bool,
}

impl PublicAccessBlock {
    pub fn block_all() -> Self {
        Self {
            block_public_acls: true,
            block_public_policy: true,
            ignore_public_acls: true,
            restrict_public_buckets: true,
        }
    }
}

/// The declared bucket.
#[derive(Debug, Clone)]
pub struct WebsiteBucket {
    pub handle: ResourceHandle,
    pub name: String,
}

/// Declare the content bucket, named after the domain.
///
/// Public access is always blocked and the bucket is retained when the stack
/// is deleted or the resource replaced.
pub fn declare_bucket(
    ctx: &mut StackContext<'_>,
    logical_id: &str,
    domain_name: &str,
) -> StackResult<WebsiteBucket> {
    validate_bucket_name(domain_name)?;

    let props = BucketProperties {
        bucket_name: domain_name.to_string(),
        website_configuration: WebsiteConfiguration::default(),
        public_access_block_configuration: PublicAccessBlock::block_all(),
    };
    let resource = Resource::new(BUCKET_TYPE, &props)?.with_removal_policy(RemovalPolicy::Retain);
    let handle = ctx.add_resource(logical_id, resource)?;

    info!("Declared bucket {}", domain_name);
    Ok(WebsiteBucket {
        handle,
        name: domain_name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use site_core::{Environment, LookupContext};

    #[test]
    fn test_declare_bucket() {
        let lookup = LookupContext::in_memory();
        let env = Environment::new("123456789012", "us-east-1").unwrap();
        let mut ctx = StackContext::new("Test", env, &lookup);

        let bucket = declare_bucket(&mut ctx, "Bucket", "example.com").unwrap();
        assert_eq!(bucket.name, "example.com");

        let stack = ctx.finish();
        let resource = &stack.template.resources["Bucket"];
        assert_eq!(resource.properties["BucketName"], "example.com");
        assert_eq!(
            resource.properties["PublicAccessBlockConfiguration"],
            json!({
                "BlockPublicAcls": true,
                "BlockPublicPolicy": true,
                "IgnorePublicAcls": true,
                "RestrictPublicBuckets": true
            })
        );
        assert_eq!(
            resource.properties["WebsiteConfiguration"],
            json!({ "IndexDocument": "index.html", "ErrorDocument": "error.html" })
        );
        assert_eq!(resource.deletion_policy, Some(RemovalPolicy::Retain));
        assert_eq!(resource.update_replace_policy, Some(RemovalPolicy::Retain));
    }

    #[test]
    fn test_declare_bucket_rejects_uppercase() {
        let lookup = LookupContext::in_memory();
        let env = Environment::new("123456789012", "us-east-1").unwrap();
        let mut ctx = StackContext::new("Test", env, &lookup);

        assert!(declare_bucket(&mut ctx, "Bucket", "Example.com").is_err());
        assert_eq!(ctx.resource_count(), 0);
    }
}

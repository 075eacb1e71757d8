//! # site_stack
//!
//! The static website topology and its synthesis into a CloudFormation
//! template.
//!
//! Resources are declared in dependency order:
//!
//! 1. a private bucket named after the domain, retained on stack deletion
//! 2. an origin access identity plus a bucket policy granting it `s3:GetObject`
//! 3. a CloudFront distribution serving `domain` and `www.domain` over HTTPS
//! 4. two Route 53 alias records resolving to the distribution
//!
//! ## Example
//!
//! ```rust
//! use site_core::{LookupContext, RawConfig};
//! use site_stack::Synthesizer;
//!
//! let config = RawConfig {
//!     account_id: Some("123456789012".into()),
//!     region: Some("eu-west-1".into()),
//!     domain_name: Some("example.com".into()),
//!     certificate_arn: Some("arn:aws:acm:us-east-1:123456789012:certificate/abc".into()),
//!     ..Default::default()
//! }
//! .resolve()
//! .unwrap();
//!
//! let lookup = LookupContext::in_memory().with_hosted_zone("example.com", "Z0123456789");
//! let stack = Synthesizer::new(&config, &lookup).synthesize().unwrap();
//! assert_eq!(stack.template.resources.len(), 6);
//! ```

pub mod access;
pub mod bucket;
pub mod distribution;
pub mod dns;
pub mod error;
pub mod synth;
pub mod topology;

pub use access::{declare_origin_access, OriginAccess, PolicyStatement, Principal};
pub use bucket::{declare_bucket, PublicAccessBlock, WebsiteBucket};
pub use distribution::{
    declare_distribution, CacheBehavior, DistributionSpec, ErrorResponse, GeoRestriction,
    HttpMethod, TtlPolicy, ViewerCertificate, DENIED_COUNTRIES, READ_METHODS,
};
pub use dns::declare_alias_record;
pub use error::{StackError, StackResult};
pub use synth::{AssemblyManifest, CloudAssembly, StackArtifact, Synthesizer, TemplateFormat, SITE_TAG};
pub use topology::SiteTopology;

//! # site_core
//!
//! Shared building blocks for sitestack.
//!
//! - **Configuration**: layered settings resolved into a [`SiteConfig`]
//! - **Naming**: bucket-name and certificate-reference validation
//! - **Template**: CloudFormation resources, intrinsics and outputs
//! - **Graph**: dependency ordering between declared resources
//! - **Lookup**: cached hosted-zone and certificate facts
//! - **Context**: the [`StackContext`] a topology declares resources into
//!
//! ## Example
//!
//! ```rust
//! use site_core::{Environment, LookupContext, Resource, StackContext};
//! use serde_json::json;
//!
//! let env = Environment::new("123456789012", "us-east-1").unwrap();
//! let lookup = LookupContext::in_memory();
//! let mut ctx = StackContext::new("Demo", env, &lookup);
//!
//! let bucket = ctx
//!     .add_resource("Bucket", Resource::new("AWS::S3::Bucket", &json!({})).unwrap())
//!     .unwrap();
//! ctx.tag("owner", "web");
//!
//! let stack = ctx.finish();
//! assert!(stack.template.resources.contains_key(bucket.logical_id()));
//! ```

pub mod config;
pub mod context;
pub mod environment;
pub mod error;
pub mod graph;
pub mod lookup;
pub mod naming;
pub mod template;

pub use config::{RawConfig, SiteConfig, SiteSettings, DEFAULT_CONFIG_FILE, DEFAULT_STACK_NAME};
pub use context::{ResourceHandle, StackContext, SynthesizedStack};
pub use environment::{Environment, Partition};
pub use error::{CoreError, CoreResult};
pub use graph::DependencyGraph;
pub use lookup::{
    certificate_key, hosted_zone_key, CertificateInfo, ContextProvider, HostedZone, LookupContext,
    DEFAULT_CONTEXT_FILE,
};
pub use naming::{certificate_covers, validate_bucket_name, www_alias, CertificateArn};
pub use template::{Expr, Output, RemovalPolicy, Resource, Template};

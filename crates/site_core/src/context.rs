//! Stack context: the capabilities a topology needs while declaring resources.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::environment::Environment;
use crate::error::{CoreError, CoreResult};
use crate::graph::DependencyGraph;
use crate::lookup::ContextProvider;
use crate::template::{Expr, Output, Resource, Template};

/// Resource types that accept a `Tags` list of `{Key, Value}` pairs.
const TAGGABLE_TYPES: &[&str] = &["AWS::S3::Bucket", "AWS::CloudFront::Distribution"];

/// Handle to a declared resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceHandle {
    logical_id: String,
}

impl ResourceHandle {
    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    /// `{"Ref": logical_id}`
    pub fn reference(&self) -> Expr {
        Expr::reference(&self.logical_id)
    }

    /// `{"Fn::GetAtt": [logical_id, attribute]}`
    pub fn attr(&self, attribute: &str) -> Expr {
        Expr::get_att(&self.logical_id, attribute)
    }
}

/// Mutable state of one stack while its topology is being declared.
pub struct StackContext<'a> {
    stack_name: String,
    environment: Environment,
    lookup: &'a dyn ContextProvider,
    template: Template,
    graph: DependencyGraph,
    tags: BTreeMap<String, String>,
}

impl<'a> StackContext<'a> {
    pub fn new(
        stack_name: impl Into<String>,
        environment: Environment,
        lookup: &'a dyn ContextProvider,
    ) -> Self {
        Self {
            stack_name: stack_name.into(),
            environment,
            lookup,
            template: Template::new(),
            graph: DependencyGraph::new(),
            tags: BTreeMap::new(),
        }
    }

    pub fn stack_name(&self) -> &str {
        &self.stack_name
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn lookup(&self) -> &dyn ContextProvider {
        self.lookup
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.template.description = Some(description.into());
    }

    /// Register a resource. Everything it references must already be registered.
    pub fn add_resource(
        &mut self,
        logical_id: impl Into<String>,
        resource: Resource,
    ) -> CoreResult<ResourceHandle> {
        let logical_id = logical_id.into();
        self.graph.add_node(&logical_id, resource.references())?;
        debug!("Declared {} ({})", logical_id, resource.resource_type);
        self.template.resources.insert(logical_id.clone(), resource);
        Ok(ResourceHandle { logical_id })
    }

    pub fn add_output(&mut self, name: impl Into<String>, output: Output) -> CoreResult<()> {
        let name = name.into();
        if self.template.outputs.contains_key(&name) {
            return Err(CoreError::DuplicateResource(name));
        }
        self.template.outputs.insert(name, output);
        Ok(())
    }

    /// Tag the stack. Tags reach every taggable resource when the stack is finished.
    pub fn tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.tags.insert(key.into(), value.into());
    }

    pub fn resource_count(&self) -> usize {
        self.template.resources.len()
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Apply stack tags and produce the final stack description.
    pub fn finish(mut self) -> SynthesizedStack {
        if !self.tags.is_empty() {
            for resource in self.template.resources.values_mut() {
                if TAGGABLE_TYPES.contains(&resource.resource_type.as_str()) {
                    apply_tags(resource, &self.tags);
                }
            }
        }

        info!(
            "Stack {} declares {} resources in {}",
            self.stack_name,
            self.template.resources.len(),
            self.environment
        );

        SynthesizedStack {
            stack_name: self.stack_name,
            environment: self.environment,
            tags: self.tags,
            dependency_order: self.graph.order().to_vec(),
            template: self.template,
        }
    }
}

/// Merge stack tags into a resource; tags already on the resource win.
fn apply_tags(resource: &mut Resource, tags: &BTreeMap<String, String>) {
    let mut merged = tags.clone();
    if let Some(Value::Array(existing)) = resource.properties.get("Tags") {
        for tag in existing {
            if let (Some(Value::String(k)), Some(Value::String(v))) = (tag.get("Key"), tag.get("Value")) {
                merged.insert(k.clone(), v.clone());
            }
        }
    }
    let list: Vec<Value> = merged
        .into_iter()
        .map(|(k, v)| json!({ "Key": k, "Value": v }))
        .collect();
    resource.properties.insert("Tags".to_string(), Value::Array(list));
}

/// Result of one synthesis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesizedStack {
    pub stack_name: String,
    pub environment: Environment,
    pub tags: BTreeMap<String, String>,
    /// Logical ids in the order they were declared.
    pub dependency_order: Vec<String>,
    pub template: Template,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::LookupContext;

    fn env() -> Environment {
        Environment::new("123456789012", "us-east-1").unwrap()
    }

    #[test]
    fn test_add_resource_and_reference() {
        let lookup = LookupContext::in_memory();
        let mut ctx = StackContext::new("Test", env(), &lookup);

        let bucket = ctx
            .add_resource("Bucket", Resource::new("AWS::S3::Bucket", &json!({})).unwrap())
            .unwrap();
        let policy = Resource::new("AWS::S3::BucketPolicy", &json!({ "Bucket": bucket.reference() })).unwrap();
        ctx.add_resource("Policy", policy).unwrap();

        assert_eq!(ctx.resource_count(), 2);
        assert!(ctx.graph().depends_transitively("Policy", "Bucket"));
    }

    #[test]
    fn test_forward_reference_rejected() {
        let lookup = LookupContext::in_memory();
        let mut ctx = StackContext::new("Test", env(), &lookup);
        let policy = Resource::new("AWS::S3::BucketPolicy", &json!({ "Bucket": {"Ref": "Bucket"} })).unwrap();
        assert!(ctx.add_resource("Policy", policy).is_err());
        assert_eq!(ctx.resource_count(), 0);
    }

    #[test]
    fn test_tags_only_on_taggable_resources() {
        let lookup = LookupContext::in_memory();
        let mut ctx = StackContext::new("Test", env(), &lookup);
        ctx.add_resource("Bucket", Resource::new("AWS::S3::Bucket", &json!({})).unwrap())
            .unwrap();
        ctx.add_resource(
            "Identity",
            Resource::new("AWS::CloudFront::CloudFrontOriginAccessIdentity", &json!({})).unwrap(),
        )
        .unwrap();
        ctx.tag("web-site", "example.com");

        let stack = ctx.finish();
        let bucket = &stack.template.resources["Bucket"];
        assert_eq!(
            bucket.properties["Tags"],
            json!([{ "Key": "web-site", "Value": "example.com" }])
        );
        assert!(stack.template.resources["Identity"].properties.get("Tags").is_none());
        assert_eq!(stack.dependency_order, vec!["Bucket", "Identity"]);
    }

    #[test]
    fn test_resource_tags_take_precedence() {
        let lookup = LookupContext::in_memory();
        let mut ctx = StackContext::new("Test", env(), &lookup);
        let bucket = Resource::new(
            "AWS::S3::Bucket",
            &json!({ "Tags": [{ "Key": "team", "Value": "web" }] }),
        )
        .unwrap();
        ctx.add_resource("Bucket", bucket).unwrap();
        ctx.tag("team", "platform");
        ctx.tag("web-site", "example.com");

        let stack = ctx.finish();
        assert_eq!(
            stack.template.resources["Bucket"].properties["Tags"],
            json!([
                { "Key": "team", "Value": "web" },
                { "Key": "web-site", "Value": "example.com" }
            ])
        );
    }

    #[test]
    fn test_duplicate_output_rejected() {
        let lookup = LookupContext::in_memory();
        let mut ctx = StackContext::new("Test", env(), &lookup);
        ctx.add_output("Name", Output::new("d", Expr::literal("x")).unwrap()).unwrap();
        assert!(ctx.add_output("Name", Output::new("d", Expr::literal("y")).unwrap()).is_err());
    }
}

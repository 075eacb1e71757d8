//! CloudFormation template model.
//!
//! Resource properties are kept as JSON so that templates produced by this
//! crate and templates loaded from disk share one representation. Typed
//! property structs live next to the code that declares each resource and are
//! converted with [`Resource::new`].

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CoreError, CoreResult};

pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

/// A value that is either a literal or an intrinsic function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Expr {
    Literal(String),
    Ref {
        #[serde(rename = "Ref")]
        target: String,
    },
    GetAtt {
        #[serde(rename = "Fn::GetAtt")]
        target: (String, String),
    },
    Join {
        #[serde(rename = "Fn::Join")]
        parts: (String, Vec<Expr>),
    },
}

impl Expr {
    pub fn literal(value: impl Into<String>) -> Self {
        Expr::Literal(value.into())
    }

    pub fn reference(logical_id: impl Into<String>) -> Self {
        Expr::Ref {
            target: logical_id.into(),
        }
    }

    pub fn get_att(logical_id: impl Into<String>, attribute: impl Into<String>) -> Self {
        Expr::GetAtt {
            target: (logical_id.into(), attribute.into()),
        }
    }

    /// Concatenate parts with no separator.
    pub fn concat(parts: Vec<Expr>) -> Self {
        Expr::Join {
            parts: (String::new(), parts),
        }
    }
}

impl From<&str> for Expr {
    fn from(value: &str) -> Self {
        Expr::Literal(value.to_string())
    }
}

impl From<String> for Expr {
    fn from(value: String) -> Self {
        Expr::Literal(value)
    }
}

/// What happens to a resource when it leaves the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemovalPolicy {
    Delete,
    Retain,
    Snapshot,
}

/// A single template resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(rename = "Type")]
    pub resource_type: String,

    #[serde(rename = "Properties", default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,

    #[serde(
        rename = "DependsOn",
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "one_or_many"
    )]
    pub depends_on: Vec<String>,

    #[serde(rename = "DeletionPolicy", default, skip_serializing_if = "Option::is_none")]
    pub deletion_policy: Option<RemovalPolicy>,

    #[serde(rename = "UpdateReplacePolicy", default, skip_serializing_if = "Option::is_none")]
    pub update_replace_policy: Option<RemovalPolicy>,
}

impl Resource {
    /// Build a resource from typed properties.
    pub fn new<P: Serialize>(resource_type: impl Into<String>, properties: &P) -> CoreResult<Self> {
        let properties = match serde_json::to_value(properties)? {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(CoreError::Json(serde::ser::Error::custom(format!(
                    "resource properties must serialize to an object, got {}",
                    other
                ))))
            }
        };

        Ok(Self {
            resource_type: resource_type.into(),
            properties,
            depends_on: Vec::new(),
            deletion_policy: None,
            update_replace_policy: None,
        })
    }

    /// Apply the same policy to deletion and replacement.
    pub fn with_removal_policy(mut self, policy: RemovalPolicy) -> Self {
        self.deletion_policy = Some(policy);
        self.update_replace_policy = Some(policy);
        self
    }

    pub fn depends_on(mut self, logical_id: impl Into<String>) -> Self {
        self.depends_on.push(logical_id.into());
        self
    }

    /// Look up a property by JSON pointer relative to `Properties`,
    /// e.g. `/DistributionConfig/Aliases`.
    pub fn property(&self, pointer: &str) -> Option<&Value> {
        let (head, rest) = match pointer.trim_start_matches('/').split_once('/') {
            Some((head, rest)) => (head, format!("/{}", rest)),
            None => (pointer.trim_start_matches('/'), String::new()),
        };
        let value = self.properties.get(head)?;
        if rest.is_empty() {
            Some(value)
        } else {
            value.pointer(&rest)
        }
    }

    /// Logical ids this resource refers to, through `Ref`, `Fn::GetAtt`,
    /// `Fn::Sub` or `DependsOn`. Pseudo parameters are ignored.
    pub fn references(&self) -> BTreeSet<String> {
        let mut out: BTreeSet<String> = self.depends_on.iter().cloned().collect();
        for value in self.properties.values() {
            collect_references(value, &mut out);
        }
        out
    }
}

/// `DependsOn` may be a single logical id or a list of them.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(id) => vec![id],
        OneOrMany::Many(ids) => ids,
    })
}

fn collect_references(value: &Value, out: &mut BTreeSet<String>) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(target)) = map.get("Ref") {
                if !target.starts_with("AWS::") {
                    out.insert(target.clone());
                }
            }
            match map.get("Fn::GetAtt") {
                Some(Value::Array(parts)) => {
                    if let Some(Value::String(target)) = parts.first() {
                        out.insert(target.clone());
                    }
                }
                Some(Value::String(dotted)) => {
                    if let Some((target, _)) = dotted.split_once('.') {
                        out.insert(target.to_string());
                    }
                }
                _ => {}
            }
            if let Some(Value::String(sub)) = map.get("Fn::Sub") {
                for name in sub.split("${").skip(1).filter_map(|s| s.split('}').next()) {
                    let target = name.split('.').next().unwrap_or(name);
                    if !target.starts_with("AWS::") && !target.starts_with('!') {
                        out.insert(target.to_string());
                    }
                }
            }
            for nested in map.values() {
                collect_references(nested, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_references(item, out);
            }
        }
        _ => {}
    }
}

/// Rewrite `!Name value` tags into their `{"Fn::Name": value}` long forms.
fn expand_short_forms(value: serde_yaml::Value) -> serde_yaml::Value {
    use serde_yaml::{Mapping, Value as Yaml};

    match value {
        Yaml::Tagged(tagged) => {
            let tag = tagged.tag.to_string();
            let name = tag.trim_start_matches('!');
            let inner = match (name, expand_short_forms(tagged.value)) {
                ("GetAtt", Yaml::String(dotted)) => match dotted.split_once('.') {
                    Some((target, attr)) => Yaml::Sequence(vec![target.into(), attr.into()]),
                    None => Yaml::String(dotted),
                },
                (_, inner) => inner,
            };
            let key = match name {
                "Ref" | "Condition" => name.to_string(),
                _ => format!("Fn::{}", name),
            };
            let mut map = Mapping::new();
            map.insert(Yaml::String(key), inner);
            Yaml::Mapping(map)
        }
        Yaml::Mapping(map) => Yaml::Mapping(
            map.into_iter()
                .map(|(k, v)| (k, expand_short_forms(v)))
                .collect(),
        ),
        Yaml::Sequence(items) => Yaml::Sequence(items.into_iter().map(expand_short_forms).collect()),
        other => other,
    }
}

/// A stack output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Output {
    #[serde(rename = "Description", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "Value")]
    pub value: Value,
}

impl Output {
    pub fn new(description: impl Into<String>, value: Expr) -> CoreResult<Self> {
        Ok(Self {
            description: Some(description.into()),
            value: serde_json::to_value(value)?,
        })
    }
}

/// A complete desired-state template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion", default = "default_format_version")]
    pub format_version: String,

    #[serde(rename = "Description", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "Resources", default)]
    pub resources: BTreeMap<String, Resource>,

    #[serde(rename = "Outputs", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, Output>,
}

fn default_format_version() -> String {
    TEMPLATE_FORMAT_VERSION.to_string()
}

impl Default for Template {
    fn default() -> Self {
        Self::new()
    }
}

impl Template {
    pub fn new() -> Self {
        Self {
            format_version: default_format_version(),
            description: None,
            resources: BTreeMap::new(),
            outputs: BTreeMap::new(),
        }
    }

    /// All resources of the given type, keyed by logical id.
    pub fn resources_of_type<'a>(
        &'a self,
        resource_type: &'a str,
    ) -> impl Iterator<Item = (&'a String, &'a Resource)> + 'a {
        self.resources
            .iter()
            .filter(move |(_, r)| r.resource_type == resource_type)
    }

    /// Load a template from a JSON or YAML file, chosen by extension.
    pub fn from_file(path: &Path) -> CoreResult<Self> {
        let content = fs::read_to_string(path)?;
        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        if is_yaml {
            Self::from_yaml_str(&content)
        } else {
            Ok(serde_json::from_str(&content)?)
        }
    }

    /// Parse YAML, accepting short-form intrinsics such as `!Ref` and `!GetAtt`.
    pub fn from_yaml_str(content: &str) -> CoreResult<Self> {
        let raw: serde_yaml::Value = serde_yaml::from_str(content)?;
        Ok(serde_yaml::from_value(expand_short_forms(raw))?)
    }

    pub fn to_json(&self) -> CoreResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_yaml(&self) -> CoreResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

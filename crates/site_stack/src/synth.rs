//! Synthesis: settings in, template and assembly manifest out.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use site_core::{ContextProvider, SiteConfig, StackContext, SynthesizedStack, Template};

use crate::error::StackResult;
use crate::topology::SiteTopology;

/// Tag attached to the stack for operator discoverability.
pub const SITE_TAG: &str = "web-site";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const ASSEMBLY_VERSION: &str = "1";

/// Output format of the template file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateFormat {
    #[default]
    Json,
    Yaml,
}

impl TemplateFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            TemplateFormat::Json => "json",
            TemplateFormat::Yaml => "yaml",
        }
    }

    pub fn render(&self, template: &Template) -> StackResult<String> {
        Ok(match self {
            TemplateFormat::Json => template.to_json()? + "\n",
            TemplateFormat::Yaml => template.to_yaml()?,
        })
    }
}

/// Builds one stack from resolved settings.
pub struct Synthesizer<'a> {
    config: &'a SiteConfig,
    lookup: &'a dyn ContextProvider,
}

impl<'a> Synthesizer<'a> {
    pub fn new(config: &'a SiteConfig, lookup: &'a dyn ContextProvider) -> Self {
        Self { config, lookup }
    }

    /// Declare the site topology and return the finished stack.
    pub fn synthesize(&self) -> StackResult<SynthesizedStack> {
        let settings = &self.config.settings;
        info!(
            "Synthesizing {} for {} in {}",
            settings.stack_name, settings.domain_name, self.config.environment
        );

        let mut ctx = StackContext::new(
            &settings.stack_name,
            self.config.environment.clone(),
            self.lookup,
        );
        for (key, value) in &settings.tags {
            ctx.tag(key, value);
        }
        ctx.tag(SITE_TAG, &settings.domain_name);

        SiteTopology::build(&mut ctx, settings)?;

        for id in ctx.graph().order() {
            debug!("{} <- {:?}", id, ctx.graph().dependents_of(id));
        }

        Ok(ctx.finish())
    }
}

/// Manifest entry describing one synthesized stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackArtifact {
    pub stack_name: String,
    pub environment: String,
    pub template_file: String,
    pub tags: BTreeMap<String, String>,
    pub dependency_order: Vec<String>,
}

/// Index of the files in an assembly directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyManifest {
    pub version: String,
    pub stacks: Vec<StackArtifact>,
}

impl AssemblyManifest {
    pub fn from_file(path: &Path) -> StackResult<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Output directory holding templates and the manifest.
pub struct CloudAssembly {
    dir: PathBuf,
}

impl CloudAssembly {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write the template and manifest for `stack`.
    pub fn write(&self, stack: &SynthesizedStack, format: TemplateFormat) -> StackResult<AssemblyManifest> {
        fs::create_dir_all(&self.dir)?;

        let template_file = format!("{}.template.{}", stack.stack_name, format.extension());
        let rendered = format.render(&stack.template)?;
        fs::write(self.dir.join(&template_file), rendered)?;
        debug!("Wrote {}", template_file);

        let manifest = AssemblyManifest {
            version: ASSEMBLY_VERSION.to_string(),
            stacks: vec![StackArtifact {
                stack_name: stack.stack_name.clone(),
                environment: stack.environment.to_string(),
                template_file,
                tags: stack.tags.clone(),
                dependency_order: stack.dependency_order.clone(),
            }],
        };
        fs::write(
            self.dir.join(MANIFEST_FILE),
            serde_json::to_string_pretty(&manifest)? + "\n",
        )?;

        info!("Wrote cloud assembly to {:?}", self.dir);
        Ok(manifest)
    }
}

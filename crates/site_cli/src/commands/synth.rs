//! Synth command - Resolve settings and write the cloud assembly.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use tracing::info;

use site_core::{
    LookupContext, RawConfig, SiteConfig, DEFAULT_CONFIG_FILE, DEFAULT_CONTEXT_FILE,
};
use site_policy::{PolicyGate, RuleSet};
use site_stack::{CloudAssembly, Synthesizer, TemplateFormat};

use super::parse_key_val;

pub const DEFAULT_OUT_DIR: &str = "site.out";

#[derive(Args, Debug)]
pub struct SynthArgs {
    /// AWS account id (12 digits)
    #[arg(long, env = "ACCOUNT_ID")]
    account_id: Option<String>,

    /// AWS region the stack is deployed to
    #[arg(long, env = "REGION")]
    region: Option<String>,

    /// Site domain; also the bucket name
    #[arg(long, env = "DOMAIN_NAME")]
    domain_name: Option<String>,

    /// ACM certificate ARN in us-east-1 covering the domain and its www host
    #[arg(long, env = "CERTIFICATE_ARN")]
    certificate_arn: Option<String>,

    /// CloudFormation stack name
    #[arg(long, env = "STACK_NAME")]
    stack_name: Option<String>,

    /// Extra stack tag as KEY=VALUE (repeatable)
    #[arg(long = "tag", value_parser = parse_key_val)]
    tags: Vec<(String, String)>,

    /// Settings file
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Lookup context file
    #[arg(long, default_value = DEFAULT_CONTEXT_FILE)]
    context: PathBuf,

    /// Rule set overriding the standard invariants
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Output directory
    #[arg(short, long, default_value = DEFAULT_OUT_DIR)]
    out: PathBuf,

    /// Template format
    #[arg(long, value_enum, default_value_t = FormatArg::Json)]
    format: FormatArg,

    /// Print the template instead of writing the assembly
    #[arg(long)]
    stdout: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum FormatArg {
    Json,
    Yaml,
}

impl From<FormatArg> for TemplateFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Json => TemplateFormat::Json,
            FormatArg::Yaml => TemplateFormat::Yaml,
        }
    }
}

impl SynthArgs {
    /// Settings file overlaid with flags and environment variables.
    fn resolve(&self) -> Result<SiteConfig> {
        let file = RawConfig::from_optional_file(&self.config)?;
        let overrides = RawConfig {
            account_id: self.account_id.clone(),
            region: self.region.clone(),
            domain_name: self.domain_name.clone(),
            certificate_arn: self.certificate_arn.clone(),
            stack_name: self.stack_name.clone(),
            tags: self.tags.iter().cloned().collect(),
        };
        Ok(file.merge(overrides).resolve()?)
    }
}

pub fn execute(args: SynthArgs) -> Result<()> {
    let config = args.resolve()?;
    let lookup = LookupContext::load(&args.context)?;

    let stack = Synthesizer::new(&config, &lookup).synthesize()?;

    let rules = match &args.rules {
        Some(path) => RuleSet::from_file(path)?,
        None => RuleSet::standard(),
    };
    let report = PolicyGate::new(rules).enforce(&stack.template)?;
    for warning in report.warnings() {
        eprintln!("warning: {} {}", warning.rule_id, warning.message);
    }

    let format = TemplateFormat::from(args.format);
    if args.stdout {
        print!("{}", format.render(&stack.template)?);
        return Ok(());
    }

    let assembly = CloudAssembly::new(&args.out);
    let manifest = assembly
        .write(&stack, format)
        .with_context(|| format!("writing cloud assembly to {:?}", args.out))?;

    info!(
        "Synthesized {} ({} resources)",
        stack.stack_name,
        stack.template.resources.len()
    );
    for artifact in &manifest.stacks {
        println!("{}", assembly.dir().join(&artifact.template_file).display());
    }
    Ok(())
}

//! CLI command definitions.

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};

pub mod context;
pub mod synth;
pub mod validate;

/// sitestack - static website infrastructure as code
#[derive(Parser)]
#[command(name = "sitestack")]
#[command(version, about = "Synthesize a private-bucket, CDN-fronted static website stack")]
#[command(long_about = r#"
sitestack declares a static website on AWS (a private S3 bucket, a CloudFront
distribution reading it through an origin access identity, and Route 53 alias
records for the apex and www hosts) and synthesizes it into a CloudFormation
template.

COMMANDS:
  synth     → Resolve settings, synthesize and write the cloud assembly
  validate  → Check an existing template against the site invariants
  context   → Inspect or edit the recorded lookup context

EXIT CODES:
  0 - Success
  1 - General error
  2 - Configuration error
  3 - Policy violation
  4 - Lookup error
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Synthesize the site stack
    Synth(synth::SynthArgs),

    /// Validate a template against the invariant rules
    Validate(validate::ValidateArgs),

    /// Show or edit the lookup context
    Context(context::ContextArgs),
}

/// Parse a `KEY=VALUE` argument.
pub fn parse_key_val(s: &str) -> Result<(String, String)> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| anyhow!("expected KEY=VALUE, got '{}'", s))?;
    if key.trim().is_empty() {
        return Err(anyhow!("empty key in '{}'", s));
    }
    Ok((key.trim().to_string(), value.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_val() {
        assert_eq!(
            parse_key_val("team=web").unwrap(),
            ("team".to_string(), "web".to_string())
        );
        assert_eq!(
            parse_key_val("note=a=b").unwrap(),
            ("note".to_string(), "a=b".to_string())
        );
        assert!(parse_key_val("novalue").is_err());
        assert!(parse_key_val("=x").is_err());
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["sitestack", "validate", "site.template.json"]).unwrap();
        assert!(matches!(cli.command, Commands::Validate(_)));

        let cli = Cli::try_parse_from(["sitestack", "-v", "context", "--reset", "k"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Context(_)));

        assert!(Cli::try_parse_from(["sitestack", "-v", "-q", "context"]).is_err());
    }
}

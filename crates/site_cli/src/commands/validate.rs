//! Validate command - Check a template against the invariant rules.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tracing::info;

use site_core::Template;
use site_policy::{PolicyGate, RuleSet, RuleSeverity};

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Template file (.json, .yaml or .yml)
    template: PathBuf,

    /// Rule set overriding the standard invariants
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Disable a rule by id (repeatable)
    #[arg(long = "skip")]
    skip: Vec<String>,
}

pub fn execute(args: ValidateArgs) -> Result<()> {
    info!("Validating template: {:?}", args.template);

    let template = Template::from_file(&args.template)?;

    let mut rules = match &args.rules {
        Some(path) => RuleSet::from_file(path)?,
        None => RuleSet::standard(),
    };
    for id in &args.skip {
        rules.disable(id)?;
    }

    let gate = PolicyGate::new(rules);
    let report = gate.evaluate(&template);

    println!(
        "{} resource(s), {} rule(s) evaluated",
        template.resources.len(),
        report.rules_evaluated
    );
    for v in &report.violations {
        let marker = match v.severity {
            RuleSeverity::Error => "error",
            RuleSeverity::Warning => "warning",
            RuleSeverity::Info => "info",
        };
        println!(
            "  {}: [{}] {} ({})",
            marker,
            v.rule_id,
            v.message,
            v.resource.as_deref().unwrap_or("template")
        );
    }

    // Fails with the policy error when any error-level rule is violated.
    gate.enforce(&template)?;
    println!("All invariants hold");
    Ok(())
}

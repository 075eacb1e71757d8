//! Context command - Show or edit the recorded lookup values.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;
use tracing::info;

use site_core::{LookupContext, DEFAULT_CONTEXT_FILE};

use super::parse_key_val;

#[derive(Args, Debug)]
pub struct ContextArgs {
    /// Lookup context file
    #[arg(long, default_value = DEFAULT_CONTEXT_FILE)]
    context: PathBuf,

    /// Record a hosted zone as DOMAIN=ZONE_ID
    #[arg(long, value_parser = parse_key_val, conflicts_with = "reset")]
    set: Option<(String, String)>,

    /// Record the names a certificate covers as ARN=NAME[,NAME...]
    #[arg(long, value_parser = parse_key_val, conflicts_with = "reset")]
    certificate: Option<(String, String)>,

    /// Remove an entry by its full key
    #[arg(long)]
    reset: Option<String>,
}

pub fn execute(args: ContextArgs) -> Result<()> {
    let mut context = LookupContext::load(&args.context)?;
    let mut changed = false;

    if let Some((domain, zone_id)) = &args.set {
        if zone_id.is_empty() {
            bail!("hosted zone id for {} is empty", domain);
        }
        context.set_hosted_zone(domain, zone_id);
        info!("Recorded hosted zone {} for {}", zone_id, domain);
        changed = true;
    }

    if let Some((arn, names)) = &args.certificate {
        let names: Vec<&str> = names
            .split(',')
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .collect();
        if names.is_empty() {
            bail!("no domain names given for {}", arn);
        }
        context = context.with_certificate(arn, &names);
        changed = true;
    }

    if let Some(key) = &args.reset {
        if context.remove(key).is_none() {
            bail!("no context entry '{}'", key);
        }
        info!("Removed {}", key);
        changed = true;
    }

    if changed {
        context.save()?;
    }

    if context.entries().is_empty() {
        println!("Lookup context {:?} is empty", args.context);
    }
    for (key, value) in context.entries() {
        println!("{} = {}", key, value);
    }
    Ok(())
}

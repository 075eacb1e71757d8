//! sitestack CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Configuration error
//! - 3: Policy violation
//! - 4: Lookup error

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use site_core::CoreError;
use site_policy::PolicyError;
use site_stack::StackError;

mod commands;

use commands::{Cli, Commands};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const CONFIG_ERROR: u8 = 2;
    pub const POLICY_VIOLATION: u8 = 3;
    pub const LOOKUP_ERROR: u8 = 4;
}

fn main() -> ExitCode {
    // A missing .env file is fine; real environment variables still apply.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let level = if cli.verbose {
        "site=debug"
    } else if cli.quiet {
        "site=warn"
    } else {
        "site=info"
    };
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(log_filter(rust_log.as_deref(), level))
        .try_init();

    let result = match cli.command {
        Commands::Synth(args) => commands::synth::execute(args),
        Commands::Validate(args) => commands::validate::execute(args),
        Commands::Context(args) => commands::context::execute(args),
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

/// RUST_LOG wins when set; otherwise warn globally and `level` for our crates.
fn log_filter(rust_log: Option<&str>, level: &str) -> EnvFilter {
    match rust_log.map(str::trim).filter(|spec| !spec.is_empty()) {
        Some(spec) => EnvFilter::new(spec),
        None => EnvFilter::new(format!("warn,{}", level)),
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    if let Some(err) = e.downcast_ref::<PolicyError>() {
        return match err {
            PolicyError::ValidationFailed { .. } => ExitCodes::POLICY_VIOLATION,
            PolicyError::InvalidConfiguration(_) => ExitCodes::CONFIG_ERROR,
            PolicyError::Template(core) => categorize_core(core),
            _ => ExitCodes::GENERAL_ERROR,
        };
    }
    if let Some(err) = e.downcast_ref::<StackError>() {
        return if err.is_config() {
            ExitCodes::CONFIG_ERROR
        } else if err.is_lookup() {
            ExitCodes::LOOKUP_ERROR
        } else {
            ExitCodes::GENERAL_ERROR
        };
    }
    if let Some(err) = e.downcast_ref::<CoreError>() {
        return categorize_core(err);
    }
    ExitCodes::GENERAL_ERROR
}

fn categorize_core(err: &CoreError) -> u8 {
    if err.is_config() {
        ExitCodes::CONFIG_ERROR
    } else if err.is_lookup() {
        ExitCodes::LOOKUP_ERROR
    } else {
        ExitCodes::GENERAL_ERROR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let config = anyhow::Error::new(CoreError::missing("DOMAIN_NAME"));
        assert_eq!(categorize_error(&config), ExitCodes::CONFIG_ERROR);

        let lookup = anyhow::Error::new(StackError::Core(CoreError::HostedZoneNotFound(
            "example.com".into(),
        )));
        assert_eq!(categorize_error(&lookup), ExitCodes::LOOKUP_ERROR);

        let policy = anyhow::Error::new(PolicyError::ValidationFailed {
            count: 1,
            summary: String::new(),
        });
        assert_eq!(categorize_error(&policy), ExitCodes::POLICY_VIOLATION);

        let other = anyhow::anyhow!("something else");
        assert_eq!(categorize_error(&other), ExitCodes::GENERAL_ERROR);
    }

    #[test]
    fn test_rust_log_keeps_its_default_level() {
        use tracing_subscriber::filter::LevelFilter;

        let filter = log_filter(Some("error"), "site=info");
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::ERROR));

        let filter = log_filter(Some("trace"), "site=warn");
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::TRACE));
    }

    #[test]
    fn test_verbosity_applies_without_rust_log() {
        use tracing_subscriber::filter::LevelFilter;

        assert_eq!(
            log_filter(None, "site=debug").max_level_hint(),
            Some(LevelFilter::DEBUG)
        );
        assert_eq!(
            log_filter(Some("  "), "site=info").max_level_hint(),
            Some(LevelFilter::INFO)
        );
        assert_eq!(
            log_filter(None, "site=warn").max_level_hint(),
            Some(LevelFilter::WARN)
        );
    }

    #[test]
    fn test_context_survives_anyhow_context() {
        let err = anyhow::Error::new(CoreError::missing("REGION")).context("resolving settings");
        assert_eq!(categorize_error(&err), ExitCodes::CONFIG_ERROR);
    }
}

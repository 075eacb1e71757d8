//! Policy gate: blocks synthesis output that breaks an error-level rule.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use site_core::Template;

use crate::error::{PolicyError, PolicyResult};
use crate::rules::{RuleSet, RuleSeverity, RuleViolation};

/// Result of running a rule set over one template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateReport {
    pub rule_set: String,
    pub rules_evaluated: usize,
    pub passed: bool,
    pub violations: Vec<RuleViolation>,
}

impl GateReport {
    pub fn errors(&self) -> impl Iterator<Item = &RuleViolation> {
        self.by_severity(RuleSeverity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &RuleViolation> {
        self.by_severity(RuleSeverity::Warning)
    }

    fn by_severity(&self, severity: RuleSeverity) -> impl Iterator<Item = &RuleViolation> {
        self.violations.iter().filter(move |v| v.severity == severity)
    }

    /// One line per violation, suitable for terminal output.
    pub fn summary(&self) -> String {
        self.violations
            .iter()
            .map(|v| {
                let level = match v.severity {
                    RuleSeverity::Error => "error",
                    RuleSeverity::Warning => "warning",
                    RuleSeverity::Info => "info",
                };
                match &v.resource {
                    Some(resource) => format!("  [{}] {} ({}): {}", level, v.rule_id, resource, v.message),
                    None => format!("  [{}] {}: {}", level, v.rule_id, v.message),
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Runs a rule set and turns error-level findings into a failure.
pub struct PolicyGate {
    rules: RuleSet,
}

impl Default for PolicyGate {
    fn default() -> Self {
        Self::new(RuleSet::standard())
    }
}

impl PolicyGate {
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn rules_mut(&mut self) -> &mut RuleSet {
        &mut self.rules
    }

    /// Evaluate without failing; the report says whether the gate passed.
    pub fn evaluate(&self, template: &Template) -> GateReport {
        let violations = self.rules.evaluate(template);
        let passed = !violations.iter().any(|v| v.severity == RuleSeverity::Error);
        GateReport {
            rule_set: self.rules.name.clone(),
            rules_evaluated: self.rules.rules.iter().filter(|r| r.enabled).count(),
            passed,
            violations,
        }
    }

    /// Evaluate and fail on any error-level violation.
    pub fn enforce(&self, template: &Template) -> PolicyResult<GateReport> {
        let report = self.evaluate(template);

        for warning in report.warnings() {
            warn!("{}: {}", warning.rule_id, warning.message);
        }

        if !report.passed {
            return Err(PolicyError::ValidationFailed {
                count: report.errors().count(),
                summary: report.summary(),
            });
        }

        info!(
            "Policy gate passed: {} rule(s), {} warning(s)",
            report.rules_evaluated,
            report.warnings().count()
        );
        Ok(report)
    }
}

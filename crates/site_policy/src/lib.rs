//! # site_policy
//!
//! Invariant rules for static site templates and the gate that enforces them.
//!
//! Rules read the template as JSON, so they catch regressions in synthesis
//! and hand edits to a written template alike.
//!
//! ## Example
//!
//! ```rust
//! use site_core::Template;
//! use site_policy::PolicyGate;
//!
//! let report = PolicyGate::default().enforce(&Template::new()).unwrap();
//! assert!(report.passed);
//! ```

pub mod error;
pub mod gate;
pub mod rules;

pub use error::{PolicyError, PolicyResult};
pub use gate::{GateReport, PolicyGate};
pub use rules::{PolicyRule, RuleSet, RuleSeverity, RuleType, RuleViolation};

//! FreeYT Redirect Rule Compiler
//!
//! This crate produces the declarative redirect ruleset the browser applies
//! before a page loads, validates it, and evaluates it the same way the
//! browser does so it can be checked against the in-page classifier.

pub mod builder;
pub mod engine;
pub mod rule;
pub mod validate;

#[cfg(test)]
mod conformance;

pub use builder::{build_rules, build_ruleset_json};
pub use engine::{RuleEngine, RuleRedirect};
pub use rule::Rule;
pub use validate::{validate_ruleset, RulesetValidationError};

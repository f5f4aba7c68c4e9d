//! Ruleset validation.
//!
//! [`validate_rules`] checks what any rule list needs before it can be
//! evaluated. [`validate_ruleset`] adds the invariants of the shipped
//! redirect ruleset: one rule per URL shape, ids `1..=N`, top-level
//! navigations only, one shared priority.

use std::collections::HashSet;

use fy_core::types::UrlShape;

use crate::engine::{compile_filter, referenced_groups};
use crate::rule::{ActionType, Rule, RESOURCE_MAIN_FRAME};

#[derive(Debug, thiserror::Error)]
pub enum RulesetValidationError {
    #[error("Expected {expected} rules, found {found}")]
    Count { expected: usize, found: usize },
    #[error("Duplicate rule id {0}")]
    DuplicateId(u32),
    #[error("Rule id {id} outside 1..={max}")]
    IdOutOfRange { id: u32, max: u32 },
    #[error("Rule {0} is a redirect without a substitution")]
    MissingSubstitution(u32),
    #[error("Rule {id} refers to capture group {group} but the filter has {groups}")]
    UnknownGroup { id: u32, group: usize, groups: usize },
    #[error("Rule {id} must target only main_frame, got {types:?}")]
    ResourceScope { id: u32, types: Vec<String> },
    #[error("Rule {id} has priority {priority}, expected {expected}")]
    MixedPriority { id: u32, priority: u32, expected: u32 },
    #[error("Rule {id} has an invalid regex: {source}")]
    BadRegex {
        id: u32,
        #[source]
        source: regex::Error,
    },
}

/// Checks needed before evaluation: non-zero unique ids, redirects carry a
/// substitution, filters compile and substitutions refer to existing groups.
pub fn validate_rules(rules: &[Rule]) -> Result<(), RulesetValidationError> {
    let mut seen = HashSet::new();
    for rule in rules {
        if rule.id == 0 {
            return Err(RulesetValidationError::IdOutOfRange { id: 0, max: u32::MAX });
        }
        if !seen.insert(rule.id) {
            return Err(RulesetValidationError::DuplicateId(rule.id));
        }

        let regex = compile_filter(rule)?;
        if rule.action.kind != ActionType::Redirect {
            continue;
        }
        let substitution = rule
            .substitution()
            .ok_or(RulesetValidationError::MissingSubstitution(rule.id))?;
        // captures_len counts group 0
        let groups = regex.captures_len() - 1;
        if let Some(group) = referenced_groups(substitution).into_iter().find(|&g| g > groups) {
            return Err(RulesetValidationError::UnknownGroup {
                id: rule.id,
                group,
                groups,
            });
        }
    }
    Ok(())
}

/// Full check of the shipped redirect ruleset.
pub fn validate_ruleset(rules: &[Rule]) -> Result<(), RulesetValidationError> {
    let expected = UrlShape::ALL.len();
    if rules.len() != expected {
        return Err(RulesetValidationError::Count {
            expected,
            found: rules.len(),
        });
    }
    validate_rules(rules)?;

    let max = expected as u32;
    let priority = rules.first().map(|r| r.priority).unwrap_or_default();
    for rule in rules {
        if rule.id > max {
            return Err(RulesetValidationError::IdOutOfRange { id: rule.id, max });
        }
        if rule.substitution().is_none() {
            return Err(RulesetValidationError::MissingSubstitution(rule.id));
        }
        if rule.condition.resource_types != [RESOURCE_MAIN_FRAME] {
            return Err(RulesetValidationError::ResourceScope {
                id: rule.id,
                types: rule.condition.resource_types.clone(),
            });
        }
        if rule.priority != priority {
            return Err(RulesetValidationError::MixedPriority {
                id: rule.id,
                priority: rule.priority,
                expected: priority,
            });
        }
    }
    Ok(())
}

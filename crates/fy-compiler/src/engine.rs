//! Rule evaluation.
//!
//! Applies compiled rules the way the browser's declarative layer does: the
//! filter is searched anywhere in the URL (case-insensitive unless the rule
//! says otherwise), only the listed resource types are considered, and the
//! first match is replaced by the substitution.

use fy_core::types::RequestType;
use log::debug;
use regex::{Regex, RegexBuilder};

use crate::rule::Rule;
use crate::validate::{validate_rules, RulesetValidationError};

/// Result of evaluating a URL against the ruleset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleRedirect {
    pub rule_id: u32,
    pub url: String,
}

#[derive(Debug)]
struct CompiledRule {
    id: u32,
    priority: u32,
    regex: Regex,
    /// `None` for non-redirect rules
    replacement: Option<String>,
    types: RequestType,
}

#[derive(Debug)]
pub struct RuleEngine {
    rules: Vec<CompiledRule>,
}

impl RuleEngine {
    /// Validate and compile `rules`.
    pub fn compile(rules: &[Rule]) -> Result<Self, RulesetValidationError> {
        validate_rules(rules)?;
        let compiled = rules
            .iter()
            .map(|rule| {
                Ok(CompiledRule {
                    id: rule.id,
                    priority: rule.priority,
                    regex: compile_filter(rule)?,
                    replacement: rule.substitution().map(translate_substitution),
                    types: rule.condition.type_mask(),
                })
            })
            .collect::<Result<Vec<_>, RulesetValidationError>>()?;
        debug!("Compiled {} rules", compiled.len());
        Ok(Self { rules: compiled })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Ids of every rule whose filter matches, in ruleset order.
    pub fn matching_rules(&self, url: &str, request_type: RequestType) -> Vec<u32> {
        self.candidates(url, request_type).map(|rule| rule.id).collect()
    }

    /// Redirect for `url`, if any rule applies.
    ///
    /// Only redirect rules take part. Higher priority wins; ties go to the
    /// lower id.
    pub fn evaluate(&self, url: &str, request_type: RequestType) -> Option<RuleRedirect> {
        let (rule, replacement) = self
            .candidates(url, request_type)
            .filter_map(|rule| rule.replacement.as_deref().map(|r| (rule, r)))
            .min_by_key(|(rule, _)| (std::cmp::Reverse(rule.priority), rule.id))?;
        let redirected = rule.regex.replace(url, replacement).into_owned();
        Some(RuleRedirect {
            rule_id: rule.id,
            url: redirected,
        })
    }

    /// Evaluate as a top-level navigation.
    pub fn redirect_url(&self, url: &str) -> Option<String> {
        self.evaluate(url, RequestType::MAIN_FRAME).map(|r| r.url)
    }

    fn candidates<'a>(&'a self, url: &'a str, request_type: RequestType) -> impl Iterator<Item = &'a CompiledRule> + 'a {
        self.rules
            .iter()
            .filter(move |rule| rule.types.intersects(request_type) && rule.regex.is_match(url))
    }
}

pub(crate) fn compile_filter(rule: &Rule) -> Result<Regex, RulesetValidationError> {
    RegexBuilder::new(&rule.condition.regex_filter)
        .case_insensitive(!rule.condition.case_sensitive())
        .build()
        .map_err(|source| RulesetValidationError::BadRegex { id: rule.id, source })
}

/// Rewrite a declarative substitution into `regex` replacement syntax.
///
/// `\N` becomes `${N}`, `\\` a literal backslash, and `$` is escaped.
pub fn translate_substitution(substitution: &str) -> String {
    let mut out = String::with_capacity(substitution.len() + 8);
    let mut chars = substitution.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.peek().copied() {
                Some(d) if d.is_ascii_digit() => {
                    chars.next();
                    out.push_str("${");
                    out.push(d);
                    out.push('}');
                }
                Some('\\') => {
                    chars.next();
                    out.push('\\');
                }
                _ => out.push('\\'),
            },
            '$' => out.push_str("$$"),
            _ => out.push(c),
        }
    }
    out
}

/// Capture groups a substitution refers to.
pub(crate) fn referenced_groups(substitution: &str) -> Vec<usize> {
    let bytes = substitution.as_bytes();
    let mut groups = Vec::new();
    let mut i = 0;
    while i + 1 < bytes.len() {
        if bytes[i] == b'\\' {
            if bytes[i + 1].is_ascii_digit() {
                groups.push((bytes[i + 1] - b'0') as usize);
            }
            i += 2;
        } else {
            i += 1;
        }
    }
    groups
}

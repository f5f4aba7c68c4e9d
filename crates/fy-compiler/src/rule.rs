//! Declarative network rule model.
//!
//! Field names follow the browser's `declarativeNetRequest` JSON so a
//! `Vec<Rule>` serializes straight into the static ruleset file.

use fy_core::types::RequestType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub id: u32,
    pub priority: u32,
    pub action: RuleAction,
    pub condition: RuleCondition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionType {
    Block,
    Allow,
    #[default]
    Redirect,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleAction {
    #[serde(rename = "type")]
    pub kind: ActionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect: Option<Redirect>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Redirect {
    /// Replacement for the first match of the condition's regex; `\N`
    /// refers to capture group N
    pub regex_substitution: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleCondition {
    pub regex_filter: String,
    pub resource_types: Vec<String>,
    /// Unset means case-insensitive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_url_filter_case_sensitive: Option<bool>,
}

impl Rule {
    /// Redirect rule scoped to top-level navigations.
    pub fn redirect(id: u32, priority: u32, regex_filter: impl Into<String>, substitution: impl Into<String>) -> Self {
        Self {
            id,
            priority,
            action: RuleAction {
                kind: ActionType::Redirect,
                redirect: Some(Redirect {
                    regex_substitution: substitution.into(),
                }),
            },
            condition: RuleCondition {
                regex_filter: regex_filter.into(),
                resource_types: vec![RESOURCE_MAIN_FRAME.to_string()],
                is_url_filter_case_sensitive: None,
            },
        }
    }

    pub fn substitution(&self) -> Option<&str> {
        self.action
            .redirect
            .as_ref()
            .map(|r| r.regex_substitution.as_str())
    }
}

impl RuleCondition {
    pub fn case_sensitive(&self) -> bool {
        self.is_url_filter_case_sensitive.unwrap_or(false)
    }

    /// Union of the listed resource types.
    pub fn type_mask(&self) -> RequestType {
        self.resource_types
            .iter()
            .fold(RequestType::empty(), |mask, name| mask | RequestType::from_resource_type(name))
    }
}

pub const RESOURCE_MAIN_FRAME: &str = "main_frame";

//! The static redirect ruleset.
//!
//! One rule per URL shape. Patterns are assembled from the host constants in
//! `fy_core::hosts` so the two layers cannot drift on domain names.
//! Every pattern is anchored at both ends, so "first match" always covers the
//! whole URL.

use fy_core::hosts::{DESTINATION_DOMAIN, DESTINATION_WWW_HOST, SHORT_LINK_HOST, SOURCE_DOMAIN};
use fy_core::params::DECLARATIVE_PLAYER_SUFFIX;
use fy_core::types::UrlShape;
use log::debug;

use crate::rule::Rule;

/// All rules share one priority; shapes never overlap.
pub const RULE_PRIORITY: u32 = 1;

/// Video id characters.
const ID: &str = "[A-Za-z0-9_-]+";

/// Query that carries a `v` parameter anywhere, up to the fragment. The id
/// must end at a parameter boundary.
const WATCH_QUERY: &str = "((?:[^#]*&)?v=[A-Za-z0-9_-]+(?:&[^#]*)?)";

/// Rule id for a URL shape. Ids follow the shape discriminants.
pub fn rule_id(shape: UrlShape) -> u32 {
    shape as u32
}

/// Build the full ruleset, ordered by id.
pub fn build_rules() -> Vec<Rule> {
    let rules: Vec<Rule> = UrlShape::ALL.iter().map(|&shape| build_rule(shape)).collect();
    debug!("Built {} redirect rules", rules.len());
    rules
}

/// Pretty-printed ruleset JSON, as shipped in the extension bundle.
pub fn build_ruleset_json() -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&build_rules())
}

pub fn build_rule(shape: UrlShape) -> Rule {
    let source = regex::escape(SOURCE_DOMAIN);
    let (filter, substitution) = match shape {
        UrlShape::Watch => (
            format!(r"^https?://(www\.)?{source}/watch\?{WATCH_QUERY}(#.*)?$"),
            format!(r"https://\1{DESTINATION_DOMAIN}/watch?\2&{DECLARATIVE_PLAYER_SUFFIX}\3"),
        ),
        UrlShape::Shorts | UrlShape::Embed | UrlShape::Live => {
            let segment = shape.path_segment();
            (
                format!(r"^https?://((?:www|m)\.)?{source}/{segment}/({ID})([/?#].*)?$"),
                format!(r"https://\1{DESTINATION_DOMAIN}/{segment}/\2\3"),
            )
        }
        UrlShape::MobileWatch => (
            format!(r"^https?://m\.{source}/watch\?{WATCH_QUERY}(#.*)?$"),
            format!(r"https://m.{DESTINATION_DOMAIN}/watch?\1&{DECLARATIVE_PLAYER_SUFFIX}\2"),
        ),
        UrlShape::ShortLink => (
            format!(
                r"^https?://{}/({ID})(?:/[^?#]*)?(?:\?([^#]*))?(#.*)?$",
                regex::escape(SHORT_LINK_HOST)
            ),
            format!(r"https://{DESTINATION_WWW_HOST}/watch?v=\1&{DECLARATIVE_PLAYER_SUFFIX}&\2\3"),
        ),
    };
    Rule::redirect(rule_id(shape), RULE_PRIORITY, filter, substitution)
}

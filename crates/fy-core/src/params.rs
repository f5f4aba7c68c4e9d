//! Player parameter set injected into rewritten URLs.

use crate::url::QueryParams;

pub const AUTOPLAY: &str = "autoplay";
pub const START: &str = "start";
pub const ENABLE_JS_API: &str = "enablejsapi";
pub const PLAYS_INLINE: &str = "playsinline";

/// Suffix the declarative rules append to watch-shaped destinations.
///
/// `start` is absent because a substitution cannot check for an existing
/// value.
pub const DECLARATIVE_PLAYER_SUFFIX: &str = "autoplay=1&enablejsapi=1&playsinline=1";

/// Merge the player parameters into `params`.
///
/// Returns `true` if anything changed. A non-empty `start` is kept as is.
pub fn ensure_player_params(params: &mut QueryParams) -> bool {
    let mut changed = false;
    changed |= ensure_value(params, AUTOPLAY, "1");
    if params.get(START).map_or(true, str::is_empty) {
        params.set(START, "0");
        changed = true;
    }
    changed |= ensure_value(params, ENABLE_JS_API, "1");
    changed |= ensure_value(params, PLAYS_INLINE, "1");
    changed
}

fn ensure_value(params: &mut QueryParams, key: &str, value: &str) -> bool {
    if params.get(key) == Some(value) {
        return false;
    }
    params.set(key, value);
    true
}

/// Autoplay and API flags are both present.
pub fn has_player_params(params: &QueryParams) -> bool {
    params.get(AUTOPLAY) == Some("1") && params.get(ENABLE_JS_API) == Some("1")
}

/// Autoplay was asked for in the URL.
pub fn autoplay_requested(params: &QueryParams) -> bool {
    params.get(AUTOPLAY) == Some("1")
}

/// Apply [`ensure_player_params`] to a full URL string.
///
/// Returns the rewritten URL when it changed, `None` when it already carried
/// the full set or could not be parsed.
pub fn ensure_player_params_in_url(url: &str) -> Option<String> {
    let mut parsed = ::url::Url::parse(url).ok()?;
    let mut params = QueryParams::from_url(&parsed);
    if !ensure_player_params(&mut params) {
        return None;
    }
    params.apply_to(&mut parsed);
    Some(parsed.to_string())
}

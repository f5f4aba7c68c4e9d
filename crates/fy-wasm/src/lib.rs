//! WebAssembly bindings for FreeYT
//!
//! One module serves all three extension contexts. The host script calls
//! [`background::start_background`], [`content::start_content_script`] or the
//! popup functions; the pure helpers below are shared by all of them.

use std::sync::OnceLock;

use fy_compiler::{build_rules, build_ruleset_json, RuleEngine};
use fy_core::{Classifier, HostPolicy, RequestType};
use js_sys::{Object, Reflect};
use wasm_bindgen::prelude::*;

mod background;
mod chrome;
mod content;
mod popup;

pub use background::start_background;
pub use content::start_content_script;
pub use popup::{popup_refresh_state, popup_toggle};

static RULE_ENGINE: OnceLock<Option<RuleEngine>> = OnceLock::new();

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

/// Destination for a video URL under the default policy, or `undefined`.
#[wasm_bindgen]
pub fn compute_redirect_url(url: &str) -> Option<String> {
    fy_core::compute_redirect_url(url)
}

/// `{ shape, videoId, destination }` for a video URL, otherwise `null`.
#[wasm_bindgen]
pub fn classify_url(url: &str, strict: bool) -> JsValue {
    let policy = if strict { HostPolicy::Strict } else { HostPolicy::Lax };
    let Some(decision) = Classifier::declarative(policy).classify(url) else {
        return JsValue::NULL;
    };

    let result = Object::new();
    let _ = Reflect::set(&result, &"shape".into(), &decision.shape.as_str().into());
    let _ = Reflect::set(&result, &"videoId".into(), &decision.video_id.as_str().into());
    let _ = Reflect::set(&result, &"destination".into(), &decision.destination.into());
    result.into()
}

/// `url` with the player parameters added, or `undefined` when it already
/// carries them.
#[wasm_bindgen]
pub fn ensure_player_params(url: &str) -> Option<String> {
    fy_core::params::ensure_player_params_in_url(url)
}

/// The declarative ruleset as the browser expects it in `rules.json`.
#[wasm_bindgen]
pub fn ruleset_json() -> Result<String, JsValue> {
    build_ruleset_json().map_err(|e| JsValue::from_str(&format!("Failed to serialize rules: {}", e)))
}

/// Evaluate the declarative rules against one request, as the browser would.
#[wasm_bindgen]
pub fn evaluate_rules(url: &str, request_type: &str) -> Result<Option<String>, JsValue> {
    let engine = RULE_ENGINE
        .get_or_init(|| match RuleEngine::compile(&build_rules()) {
            Ok(engine) => Some(engine),
            Err(err) => {
                log::error!("Ruleset failed to compile: {}", err);
                None
            }
        })
        .as_ref()
        .ok_or_else(|| JsValue::from_str("Ruleset failed to compile"))?;

    Ok(engine
        .evaluate(url, RequestType::from_resource_type(request_type))
        .map(|redirect| redirect.url))
}

#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
    use super::*;
    use wasm_bindgen_test::wasm_bindgen_test;

    #[wasm_bindgen_test]
    fn exports_agree_on_a_watch_url() {
        let url = "https://www.youtube.com/watch?v=abc123";
        let computed = compute_redirect_url(url).unwrap();
        let ruled = evaluate_rules(url, "main_frame").unwrap().unwrap();
        assert!(computed.contains("yout-ube.com/watch?v=abc123"));
        assert!(ruled.contains("yout-ube.com/watch?v=abc123"));
    }

    #[wasm_bindgen_test]
    fn sub_frames_are_not_redirected_by_rules() {
        let url = "https://www.youtube.com/watch?v=abc123";
        assert_eq!(evaluate_rules(url, "sub_frame").unwrap(), None);
    }

    #[wasm_bindgen_test]
    fn classify_url_is_null_for_other_pages() {
        assert!(classify_url("https://www.youtube.com/feed/subscriptions", false).is_null());
        assert!(classify_url("https://www.fakeyoutube.com/watch?v=x", true).is_null());
    }
}

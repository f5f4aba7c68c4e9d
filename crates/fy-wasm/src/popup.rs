//! Popup bindings. The popup script owns the markup; these calls only talk to
//! the background coordinator.

use fy_core::client::{StateClient, INIT_FAILED_MESSAGE};
use js_sys::{Object, Reflect};
use log::error;
use wasm_bindgen::prelude::*;

use crate::chrome::RuntimeChannel;

/// Current state for the toggle. Rejects with a user-facing message.
#[wasm_bindgen]
pub async fn popup_refresh_state() -> Result<bool, JsValue> {
    StateClient::new(RuntimeChannel).refresh().await.map_err(|err| {
        error!(target: "popup", "Failed to load state: {}", err);
        JsValue::from_str(INIT_FAILED_MESSAGE)
    })
}

/// Request a state change. Resolves to `{ enabled, error }` where `enabled`
/// is the state to show and `error` a message or `null`.
#[wasm_bindgen]
pub async fn popup_toggle(requested: bool) -> JsValue {
    let outcome = StateClient::new(RuntimeChannel).toggle(requested).await;
    let result = Object::new();
    let _ = Reflect::set(&result, &"enabled".into(), &JsValue::from(outcome.shown));
    let message = outcome.user_message().map_or(JsValue::NULL, JsValue::from_str);
    let _ = Reflect::set(&result, &"error".into(), &message);
    result.into()
}

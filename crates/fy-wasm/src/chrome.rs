//! Extension API bindings and the adapters that plug them into the core
//! traits.
//!
//! Values cross the boundary as JSON so the core only ever sees
//! `serde_json::Value`.

use async_trait::async_trait;
use fy_core::client::{ChannelError, MessageChannel};
use fy_core::coordinator::{RulesetController, RulesetError, RulesetUpdate};
use fy_core::store::{StorageArea, StorageBackend, StorageChange, StorageListener, StoreError};
use js_sys::{Function, Promise, Reflect, JSON};
use serde_json::{Map, Value};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(catch, js_namespace = ["chrome", "storage", "local"], js_name = get)]
    fn storage_local_get(keys: &JsValue) -> Result<Promise, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "storage", "local"], js_name = set)]
    fn storage_local_set(items: &JsValue) -> Result<Promise, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "storage", "onChanged"], js_name = addListener)]
    fn storage_on_changed(callback: &Function) -> Result<(), JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "declarativeNetRequest"], js_name = updateEnabledRulesets)]
    fn dnr_update_enabled_rulesets(options: &JsValue) -> Result<Promise, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "runtime", "onInstalled"], js_name = addListener)]
    fn runtime_on_installed(callback: &Function) -> Result<(), JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "runtime", "onStartup"], js_name = addListener)]
    fn runtime_on_startup(callback: &Function) -> Result<(), JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "runtime", "onMessage"], js_name = addListener)]
    fn runtime_on_message(callback: &Function) -> Result<(), JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "runtime"], js_name = sendMessage)]
    fn runtime_send_message(message: &JsValue) -> Result<Promise, JsValue>;
}

// =============================================================================
// Value bridging
// =============================================================================

pub fn to_js(value: &Value) -> Result<JsValue, JsValue> {
    let text = serde_json::to_string(value).map_err(|e| JsValue::from_str(&e.to_string()))?;
    JSON::parse(&text)
}

/// `None` for `undefined`, `null` and anything JSON cannot represent.
pub fn from_js(value: &JsValue) -> Option<Value> {
    if value.is_undefined() || value.is_null() {
        return None;
    }
    let text = JSON::stringify(value).ok()?.as_string()?;
    serde_json::from_str(&text).ok()
}

/// Readable message for a thrown JS value.
pub fn describe(err: &JsValue) -> String {
    err.as_string()
        .or_else(|| {
            Reflect::get(err, &JsValue::from_str("message"))
                .ok()
                .and_then(|m| m.as_string())
        })
        .unwrap_or_else(|| format!("{:?}", err))
}

async fn settle(promise: Result<Promise, JsValue>) -> Result<JsValue, JsValue> {
    JsFuture::from(promise?).await
}

fn parse_changes(changes: &JsValue) -> Vec<StorageChange> {
    let Some(Value::Object(entries)) = from_js(changes) else {
        return Vec::new();
    };
    entries
        .into_iter()
        .map(|(key, change)| StorageChange {
            key,
            old_value: change.get("oldValue").cloned(),
            new_value: change.get("newValue").cloned(),
        })
        .collect()
}

// =============================================================================
// Adapters
// =============================================================================

/// `chrome.storage.local`, observed through `chrome.storage.onChanged`.
pub struct ChromeStorage;

#[async_trait(?Send)]
impl StorageBackend for ChromeStorage {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let items = settle(storage_local_get(&JsValue::from_str(key)))
            .await
            .map_err(|e| StoreError::Unavailable(describe(&e)))?;
        let value = Reflect::get(&items, &JsValue::from_str(key)).map_err(|e| StoreError::Unavailable(describe(&e)))?;
        Ok(from_js(&value))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut items = Map::new();
        items.insert(key.to_string(), value);
        let items = to_js(&Value::Object(items)).map_err(|e| StoreError::InvalidValue {
            key: key.to_string(),
            reason: describe(&e),
        })?;
        settle(storage_local_set(&items))
            .await
            .map_err(|e| StoreError::Unavailable(describe(&e)))?;
        Ok(())
    }

    fn subscribe(&self, listener: StorageListener) {
        let callback = Closure::<dyn Fn(JsValue, String)>::new(move |changes: JsValue, area: String| {
            let Some(area) = StorageArea::from_name(&area) else {
                return;
            };
            listener(area, &parse_changes(&changes));
        });
        match storage_on_changed(callback.as_ref().unchecked_ref()) {
            Ok(()) => callback.forget(),
            Err(err) => log::warn!("storage.onChanged unavailable: {}", describe(&err)),
        }
    }
}

/// `chrome.declarativeNetRequest.updateEnabledRulesets`.
pub struct ChromeRulesets;

#[async_trait(?Send)]
impl RulesetController for ChromeRulesets {
    async fn update_enabled_rulesets(&self, update: RulesetUpdate) -> Result<(), RulesetError> {
        let options = serde_json::json!({
            "enableRulesetIds": update.enable,
            "disableRulesetIds": update.disable,
        });
        let options = to_js(&options).map_err(|e| RulesetError::Rejected(describe(&e)))?;
        settle(dnr_update_enabled_rulesets(&options)).await.map_err(|e| {
            // Missing API surfaces as a TypeError from the call itself
            if e.is_instance_of::<js_sys::TypeError>() {
                RulesetError::Unavailable
            } else {
                RulesetError::Rejected(describe(&e))
            }
        })?;
        Ok(())
    }
}

/// `chrome.runtime.sendMessage` to the background context.
pub struct RuntimeChannel;

#[async_trait(?Send)]
impl MessageChannel for RuntimeChannel {
    async fn send(&self, message: Value) -> Result<Option<Value>, ChannelError> {
        let message = to_js(&message).map_err(|e| ChannelError::Closed(describe(&e)))?;
        let reply = settle(runtime_send_message(&message))
            .await
            .map_err(|e| ChannelError::Closed(describe(&e)))?;
        Ok(from_js(&reply))
    }
}

// =============================================================================
// Runtime events
// =============================================================================

pub fn on_installed(handler: impl Fn() + 'static) -> Result<(), JsValue> {
    let callback = Closure::<dyn Fn(JsValue)>::new(move |_details: JsValue| handler());
    runtime_on_installed(callback.as_ref().unchecked_ref())?;
    callback.forget();
    Ok(())
}

pub fn on_startup(handler: impl Fn() + 'static) -> Result<(), JsValue> {
    let callback = Closure::<dyn Fn()>::new(handler);
    runtime_on_startup(callback.as_ref().unchecked_ref())?;
    callback.forget();
    Ok(())
}

/// Register a message handler. The handler returns `true` when it will call
/// `send_response` later, which keeps the channel open.
pub fn on_message(handler: impl Fn(JsValue, Function) -> bool + 'static) -> Result<(), JsValue> {
    let callback = Closure::<dyn Fn(JsValue, JsValue, Function) -> bool>::new(
        move |message: JsValue, _sender: JsValue, send_response: Function| handler(message, send_response),
    );
    runtime_on_message(callback.as_ref().unchecked_ref())?;
    callback.forget();
    Ok(())
}

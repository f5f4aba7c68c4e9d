//! Background service worker wiring.
//!
//! The worker can be torn down between events, so nothing here holds state
//! beyond the adapters; every handler goes back to storage.

use std::rc::Rc;

use fy_core::coordinator::BackgroundCoordinator;
use fy_core::protocol::Request;
use fy_core::store::{EnablementStore, StorageArea, StorageBackend, StorageChange};
use js_sys::Function;
use log::{error, info, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

use crate::chrome::{self, ChromeRulesets, ChromeStorage};

#[wasm_bindgen]
pub fn start_background() -> Result<(), JsValue> {
    let storage = Rc::new(ChromeStorage);
    let store = EnablementStore::new(storage.clone());
    let coordinator = Rc::new(BackgroundCoordinator::new(store, Rc::new(ChromeRulesets)));

    let c = coordinator.clone();
    chrome::on_installed(move || {
        let c = c.clone();
        spawn_local(async move { c.on_installed().await });
    })?;

    let c = coordinator.clone();
    chrome::on_startup(move || {
        let c = c.clone();
        spawn_local(async move { c.on_startup().await });
    })?;

    let c = coordinator.clone();
    chrome::on_message(move |message: JsValue, send_response: Function| {
        let Some(request) = chrome::from_js(&message).and_then(|value| Request::from_value(&value)) else {
            return false;
        };
        let c = c.clone();
        spawn_local(async move {
            let response = c.handle_request(request).await;
            let reply = match serde_json::to_value(response) {
                Ok(value) => chrome::to_js(&value),
                Err(err) => Err(JsValue::from_str(&err.to_string())),
            };
            let reply = match reply {
                Ok(reply) => reply,
                Err(err) => {
                    error!(target: "background", "Could not encode response: {}", chrome::describe(&err));
                    return;
                }
            };
            if let Err(err) = send_response.call1(&JsValue::NULL, &reply) {
                warn!(target: "background", "Response not delivered: {}", chrome::describe(&err));
            }
        });
        true
    })?;

    let c = coordinator.clone();
    storage.subscribe(Rc::new(move |area: StorageArea, changes: &[StorageChange]| {
        let c = c.clone();
        let changes = changes.to_vec();
        spawn_local(async move { c.on_storage_changed(area, &changes).await });
    }));

    // A woken worker gets neither onInstalled nor onStartup
    spawn_local(async move {
        coordinator.sync_rules_to_storage().await;
    });

    info!(target: "background", "Background coordinator ready");
    Ok(())
}

//! Message protocol between UI surfaces and the background coordinator.
//!
//! Requests are identified by their `action` field:
//!
//! | request                                  | response             |
//! |------------------------------------------|----------------------|
//! | `{"action":"getState"}`                  | `{"enabled":bool}`   |
//! | `{"action":"setState","enabled":bool}`   | `{"success":bool}`   |
//!
//! Anything else gets no response at all.

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[cfg(feature = "ts")]
use ts_rs::TS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
#[serde(tag = "action")]
pub enum Request {
    #[serde(rename = "getState")]
    GetState,
    #[serde(rename = "setState")]
    SetState { enabled: bool },
}

impl Request {
    /// Parse an incoming message. Unknown actions and malformed requests
    /// return `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let action = value.get("action")?.as_str()?;
        match Request::deserialize(value) {
            Ok(request) => Some(request),
            Err(err) => {
                if matches!(action, "getState" | "setState") {
                    warn!(target: "protocol", "Malformed {} request: {}", action, err);
                }
                None
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
#[serde(untagged)]
pub enum Response {
    State { enabled: bool },
    Ack { success: bool },
}

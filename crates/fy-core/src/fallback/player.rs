//! Embedded player wire messages.
//!
//! Outbound: `{"event":"command","func":<name>,"args":[...]}` posted to the
//! page's own window. Inbound: `{"event":"onReady"}` and friends.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Quality tiers, highest first.
pub const QUALITY_ORDER: [&str; 6] = ["highres", "hd2160", "hd1440", "hd1080", "hd720", "large"];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerCommand {
    event: &'static str,
    pub func: String,
    pub args: Vec<Value>,
}

impl PlayerCommand {
    pub fn new(func: &str, args: Vec<Value>) -> Self {
        Self {
            event: "command",
            func: func.to_string(),
            args,
        }
    }

    pub fn set_quality_range(tier: &str) -> Self {
        Self::new("setPlaybackQualityRange", vec![Value::from(tier), Value::from(tier)])
    }

    pub fn set_quality(tier: &str) -> Self {
        Self::new("setPlaybackQuality", vec![Value::from(tier)])
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Event reported by the embedded player.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    Ready,
    StateChange(i64),
    Other(String),
}

#[derive(Deserialize)]
struct RawPlayerMessage {
    event: String,
    #[serde(default)]
    info: Value,
}

impl PlayerEvent {
    /// Parse a posted message. Returns `None` for anything that is not a
    /// JSON object with an `event` field, which covers the page's own
    /// unrelated messages and our outbound commands echoing back.
    pub fn parse(data: &str) -> Option<Self> {
        let raw: RawPlayerMessage = serde_json::from_str(data).ok()?;
        let event = match raw.event.as_str() {
            "command" => return None,
            "onReady" => Self::Ready,
            "onStateChange" => Self::StateChange(raw.info.as_i64().unwrap_or(-1)),
            other => Self::Other(other.to_string()),
        };
        Some(event)
    }
}

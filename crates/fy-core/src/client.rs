//! UI side of the message protocol.
//!
//! A popup or settings surface never touches storage. It asks the background
//! coordinator for the state and asks it to change it. A failed change is
//! reported with the state the surface should fall back to showing.

use async_trait::async_trait;
use log::{error, info};
use serde_json::Value;

use crate::protocol::{Request, Response};
use crate::store::DEFAULT_ENABLED;

pub const SAVE_FAILED_MESSAGE: &str = "Failed to save settings. Please try again.";
pub const INIT_FAILED_MESSAGE: &str = "Failed to initialize extension popup. Please reload.";

/// Error type for the request/response channel.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Message channel closed: {0}")]
    Closed(String),
    #[error("Message channel timed out")]
    Timeout,
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Channel(#[from] ChannelError),
    #[error("Background rejected state change")]
    Rejected,
}

/// Request/response channel to the background context.
#[async_trait(?Send)]
pub trait MessageChannel {
    /// Send one request. `Ok(None)` means the receiver sent no response.
    async fn send(&self, message: Value) -> Result<Option<Value>, ChannelError>;
}

/// Outcome of a user-initiated toggle.
#[derive(Debug)]
pub struct ToggleOutcome {
    /// State the surface should now display
    pub shown: bool,
    /// Set when the change did not go through
    pub error: Option<ClientError>,
}

impl ToggleOutcome {
    /// Transient message to show the user, if any.
    pub fn user_message(&self) -> Option<&'static str> {
        self.error.as_ref().map(|_| SAVE_FAILED_MESSAGE)
    }
}

pub struct StateClient<C> {
    channel: C,
}

impl<C: MessageChannel> StateClient<C> {
    pub fn new(channel: C) -> Self {
        Self { channel }
    }

    /// Current effective state. A response without a usable `enabled` field
    /// reads as the default.
    pub async fn refresh(&self) -> Result<bool, ClientError> {
        let reply = self.send(Request::GetState).await?;
        let enabled = reply
            .and_then(|value| serde_json::from_value::<Response>(value).ok())
            .and_then(|response| match response {
                Response::State { enabled } => Some(enabled),
                Response::Ack { .. } => None,
            })
            .unwrap_or(DEFAULT_ENABLED);
        info!(target: "popup", "Current state: {}", enabled);
        Ok(enabled)
    }

    /// Ask the background to switch to `requested`.
    ///
    /// The surface has already flipped its control optimistically; on any
    /// failure the outcome says to show the previous state again.
    pub async fn toggle(&self, requested: bool) -> ToggleOutcome {
        match self.set_state(requested).await {
            Ok(()) => {
                info!(target: "popup", "State changed to: {}", requested);
                ToggleOutcome {
                    shown: requested,
                    error: None,
                }
            }
            Err(err) => {
                error!(target: "popup", "Failed to save state: {}", err);
                ToggleOutcome {
                    shown: !requested,
                    error: Some(err),
                }
            }
        }
    }

    async fn set_state(&self, enabled: bool) -> Result<(), ClientError> {
        let reply = self.send(Request::SetState { enabled }).await?;
        let accepted = reply
            .and_then(|value| serde_json::from_value::<Response>(value).ok())
            .is_some_and(|response| response == Response::Ack { success: true });
        if accepted {
            Ok(())
        } else {
            Err(ClientError::Rejected)
        }
    }

    async fn send(&self, request: Request) -> Result<Option<Value>, ChannelError> {
        let message = serde_json::to_value(request).map_err(|e| ChannelError::Closed(e.to_string()))?;
        self.channel.send(message).await
    }
}

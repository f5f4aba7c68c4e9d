//! Background Coordinator
//!
//! Keeps the declarative ruleset's enabled status in line with the stored
//! flag and answers the UI's requests.
//!
//! The host may tear the background context down between any two events, so
//! the coordinator holds no state of its own: every entry point re-reads the
//! flag from storage. Reconciliation is idempotent and safe to run on every
//! wake. Ruleset updates are best-effort; a failure is logged and the stored
//! flag is left as written, so the next reconciliation retries.

use std::rc::Rc;

use async_trait::async_trait;
use log::{debug, error, info, warn};

use crate::protocol::{Request, Response};
use crate::store::{EnablementStore, StorageArea, StorageChange};

/// Identifier of the static redirect ruleset.
pub const RULESET_ID: &str = "ruleset_1";

/// Error type for ruleset activation.
#[derive(Debug, thiserror::Error)]
pub enum RulesetError {
    #[error("Ruleset update rejected: {0}")]
    Rejected(String),
    #[error("Ruleset API unavailable")]
    Unavailable,
}

/// Ruleset ids to switch on and off in one call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RulesetUpdate {
    pub enable: Vec<String>,
    pub disable: Vec<String>,
}

impl RulesetUpdate {
    pub fn enable(id: &str) -> Self {
        Self {
            enable: vec![id.to_string()],
            disable: Vec::new(),
        }
    }

    pub fn disable(id: &str) -> Self {
        Self {
            enable: Vec::new(),
            disable: vec![id.to_string()],
        }
    }
}

/// The browser's declarative rule layer.
#[async_trait(?Send)]
pub trait RulesetController {
    async fn update_enabled_rulesets(&self, update: RulesetUpdate) -> Result<(), RulesetError>;
}

pub struct BackgroundCoordinator {
    store: EnablementStore,
    rulesets: Rc<dyn RulesetController>,
    ruleset_id: String,
}

impl BackgroundCoordinator {
    pub fn new(store: EnablementStore, rulesets: Rc<dyn RulesetController>) -> Self {
        Self {
            store,
            rulesets,
            ruleset_id: RULESET_ID.to_string(),
        }
    }

    pub fn store(&self) -> &EnablementStore {
        &self.store
    }

    /// Installation or update. A missing flag is initialized to enabled; an
    /// existing one is restored.
    pub async fn on_installed(&self) {
        info!(target: "background", "Extension installed");
        match self.store.stored().await {
            Ok(None) => {
                if let Err(err) = self.store.set(true).await {
                    warn!(target: "background", "Could not persist initial state: {}", err);
                }
                self.apply(true).await;
                info!(target: "background", "Initialized as enabled");
            }
            Ok(Some(enabled)) => {
                self.apply(enabled).await;
                info!(target: "background", "Restored state: {}", state_name(enabled));
            }
            Err(err) => {
                warn!(target: "background", "Could not read state on install: {}", err);
                self.apply(true).await;
            }
        }
    }

    /// Browser startup or background wake.
    pub async fn on_startup(&self) {
        self.sync_rules_to_storage().await;
    }

    /// Make the ruleset match the stored flag. Returns the flag applied.
    pub async fn sync_rules_to_storage(&self) -> bool {
        let enabled = self.store.get().await;
        self.apply(enabled).await;
        info!(target: "background", "Synced rules to stored state: {}", state_name(enabled));
        enabled
    }

    /// Answer a UI request.
    pub async fn handle_request(&self, request: Request) -> Response {
        debug!(target: "background", "Received request: {:?}", request);
        match request {
            Request::GetState => Response::State {
                enabled: self.store.get().await,
            },
            Request::SetState { enabled } => match self.store.set(enabled).await {
                Ok(()) => {
                    self.apply(enabled).await;
                    info!(target: "background", "State updated: {}", state_name(enabled));
                    Response::Ack { success: true }
                }
                Err(err) => {
                    error!(target: "background", "Failed to save state: {}", err);
                    Response::Ack { success: false }
                }
            },
        }
    }

    /// Answer a raw message. `None` means no response is sent.
    pub async fn handle_message(&self, message: &serde_json::Value) -> Option<Response> {
        let request = Request::from_value(message)?;
        Some(self.handle_request(request).await)
    }

    /// Storage change from any context.
    pub async fn on_storage_changed(&self, area: StorageArea, changes: &[StorageChange]) {
        if let Some(enabled) = EnablementStore::interpret_change(area, changes) {
            info!(target: "background", "Storage changed, updating rules: {}", state_name(enabled));
            self.apply(enabled).await;
        }
    }

    async fn apply(&self, enabled: bool) {
        let update = if enabled {
            RulesetUpdate::enable(&self.ruleset_id)
        } else {
            RulesetUpdate::disable(&self.ruleset_id)
        };
        match self.rulesets.update_enabled_rulesets(update).await {
            Ok(()) => info!(target: "background", "Redirect rules {}", state_name(enabled)),
            Err(err) => error!(
                target: "background",
                "Failed to {} redirect rules: {}",
                if enabled { "enable" } else { "disable" },
                err
            ),
        }
    }
}

fn state_name(enabled: bool) -> &'static str {
    if enabled {
        "enabled"
    } else {
        "disabled"
    }
}

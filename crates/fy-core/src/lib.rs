//! FreeYourTube Core Library
//!
//! This crate holds the redirect decision engine for the FreeYourTube
//! extension. It has no browser dependencies: storage, the ruleset API, the
//! message channel and the page are reached through traits, so the same
//! logic runs in the WebAssembly bindings and in native tests.
//!
//! # Architecture
//!
//! A top-level navigation to the video site is rewritten to the privacy
//! host either by a declarative ruleset (see `fy-compiler`) or, when that
//! misses, by the in-page fallback. Both follow the classification contract
//! in [`classify`]. A single persisted flag turns the whole thing on and off;
//! the background coordinator keeps the ruleset in step with it.
//!
//! # Modules
//!
//! - `hosts`: Host constants and host matching policy
//! - `types`: URL shapes, video ids, redirect decisions, request types
//! - `url`: Query-string and path helpers
//! - `params`: Player parameter injection
//! - `classify`: URL classifier
//! - `store`: Persisted enablement flag
//! - `protocol`: Background message protocol
//! - `coordinator`: Background coordinator
//! - `client`: UI side of the protocol
//! - `fallback`: In-page fallback redirector and autoplay driver
//! - `config`: Runtime configuration

pub mod classify;
pub mod client;
pub mod config;
pub mod coordinator;
pub mod fallback;
pub mod hosts;
pub mod params;
pub mod protocol;
pub mod store;
pub mod types;
pub mod url;

// Re-export commonly used types
pub use classify::{classify, compute_redirect_url, Classifier};
pub use client::{MessageChannel, StateClient};
pub use config::{FallbackConfig, RedirectConfig};
pub use coordinator::{BackgroundCoordinator, RulesetController, RULESET_ID};
pub use hosts::HostPolicy;
pub use protocol::{Request, Response};
pub use store::{EnablementStore, MemoryStorage, StorageBackend};
pub use types::{ParamMode, RedirectDecision, RequestType, UrlShape, VideoId};

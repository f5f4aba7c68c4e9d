//! In-Page Fallback Redirector
//!
//! Runs inside the loaded page. It repeats the classification independently
//! of the declarative rules, replaces the location when a video URL slipped
//! through, and on destination hosts drives autoplay and quality selection
//! through the embedded player's message channel.
//!
//! Everything here is host-agnostic: the page is reached through the
//! [`Page`] trait, timers are returned as durations for the host to
//! schedule, and DOM observation is modelled by [`BoundedWait`].

mod autoplay;
mod player;
mod redirector;
mod wait;

pub use autoplay::*;
pub use player::*;
pub use redirector::*;
pub use wait::*;

//! URL Classifier
//!
//! Decides whether a URL denotes a playable video on the source site and, if
//! so, builds the rewritten destination URL.
//!
//! The check order matters:
//!
//! 1. Parse. Any failure is a non-match.
//! 2. Idempotency guard: a host already on the destination or the no-cookie
//!    domain never matches, whatever its path.
//! 3. Shape dispatch by host and path prefix. Only the six known shapes
//!    match; every other page under the source domain is left alone.
//!
//! # Examples
//!
//! ```
//! use fy_core::classify::classify;
//! use fy_core::types::UrlShape;
//!
//! let decision = classify("https://youtu.be/abc123def12").unwrap();
//! assert_eq!(decision.shape, UrlShape::ShortLink);
//! assert!(decision.destination.starts_with("https://www.yout-ube.com/watch?v=abc123def12"));
//!
//! assert!(classify("https://www.youtube.com/results?search_query=x").is_none());
//! ```

use ::url::Url;
use log::debug;

use crate::hosts::{self, HostPolicy};
use crate::params::ensure_player_params;
use crate::types::{ParamMode, RedirectDecision, UrlShape, VideoId};
use crate::url::{path_segments, QueryParams};

/// Classifier configured with a host policy and a parameter mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Classifier {
    policy: HostPolicy,
    params: ParamMode,
}

impl Classifier {
    pub const fn new(policy: HostPolicy, params: ParamMode) -> Self {
        Self { policy, params }
    }

    /// Same contract as the declarative rules: only `/watch` results get the
    /// player parameters.
    pub const fn declarative(policy: HostPolicy) -> Self {
        Self::new(policy, ParamMode::WatchOnly)
    }

    /// In-page fallback: every result gets the player parameters.
    pub const fn fallback(policy: HostPolicy) -> Self {
        Self::new(policy, ParamMode::AllShapes)
    }

    pub fn policy(&self) -> HostPolicy {
        self.policy
    }

    /// Classify `url`. Never panics; malformed input yields `None`.
    pub fn classify(&self, url: &str) -> Option<RedirectDecision> {
        let mut parsed = Url::parse(url).ok()?;
        let host = parsed.host_str()?.to_ascii_lowercase();

        if hosts::is_rewritten_host(&host, self.policy) {
            return None;
        }

        if hosts::is_short_link_host(&host) {
            return self.rewrite_short_link(parsed);
        }

        if !hosts::is_source_host(&host, self.policy) {
            return None;
        }

        let (shape, video_id) = match_source_shape(&parsed, &host)?;
        let new_host = hosts::rewrite_host(&host);
        parsed.set_host(Some(&new_host)).ok()?;

        if self.wants_params(shape) {
            let mut params = QueryParams::from_url(&parsed);
            ensure_player_params(&mut params);
            params.apply_to(&mut parsed);
        }

        debug!(target: "classify", "{} match for {}: {}", shape, video_id, parsed);
        Some(RedirectDecision {
            shape,
            video_id,
            destination: parsed.into(),
        })
    }

    /// Destination URL for `url`, if it classifies.
    pub fn redirect_url(&self, url: &str) -> Option<String> {
        self.classify(url).map(|d| d.destination)
    }

    fn wants_params(&self, shape: UrlShape) -> bool {
        match self.params {
            ParamMode::WatchOnly => shape.is_watch_shaped(),
            ParamMode::AllShapes => true,
        }
    }

    fn rewrite_short_link(&self, mut parsed: Url) -> Option<RedirectDecision> {
        let video_id = path_segments(parsed.path())
            .first()
            .and_then(|segment| VideoId::parse(segment))?;

        let mut params = QueryParams::from_url(&parsed);
        params.set("v", video_id.as_str());
        if self.wants_params(UrlShape::ShortLink) {
            ensure_player_params(&mut params);
        }

        parsed.set_host(Some(hosts::DESTINATION_WWW_HOST)).ok()?;
        parsed.set_path("/watch");
        params.apply_to(&mut parsed);

        debug!(target: "classify", "short_link match for {}: {}", video_id, parsed);
        Some(RedirectDecision {
            shape: UrlShape::ShortLink,
            video_id,
            destination: parsed.into(),
        })
    }
}

fn match_source_shape(parsed: &Url, host: &str) -> Option<(UrlShape, VideoId)> {
    let path = parsed.path();

    if path.starts_with("/watch") {
        let params = QueryParams::from_url(parsed);
        let video_id = params.get("v").and_then(VideoId::parse)?;
        let shape = if hosts::is_mobile_host(host) {
            UrlShape::MobileWatch
        } else {
            UrlShape::Watch
        };
        return Some((shape, video_id));
    }

    let segments = path_segments(path);
    let shape = [UrlShape::Shorts, UrlShape::Embed, UrlShape::Live]
        .into_iter()
        .find(|shape| {
            path.strip_prefix('/')
                .and_then(|rest| rest.strip_prefix(shape.path_segment()))
                .is_some_and(|rest| rest.starts_with('/'))
        })?;

    let video_id = segments.get(1).and_then(|s| VideoId::parse(s))?;
    Some((shape, video_id))
}

/// Classify with the default (lax, watch-only parameters) classifier.
pub fn classify(url: &str) -> Option<RedirectDecision> {
    Classifier::default().classify(url)
}

/// Destination URL with the default classifier.
pub fn compute_redirect_url(url: &str) -> Option<String> {
    Classifier::default().redirect_url(url)
}

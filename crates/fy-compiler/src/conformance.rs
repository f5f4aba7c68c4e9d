//! Cross-checks between the declarative rules and the in-page classifier.
//!
//! The two layers are independent implementations of the same contract.
//! Every URL below goes through both; they must agree on whether it is
//! redirected, which shape it is, where it lands and which video it plays.

use fy_core::hosts::{HostPolicy, DESTINATION_DOMAIN};
use fy_core::types::{RequestType, UrlShape};
use fy_core::url::{path_segments, QueryParams};
use fy_core::Classifier;

use crate::builder::{build_rules, rule_id};
use crate::engine::RuleEngine;

const REDIRECTED: &[(&str, UrlShape, &str)] = &[
    ("https://www.youtube.com/watch?v=dQw4w9WgXcQ", UrlShape::Watch, "dQw4w9WgXcQ"),
    ("https://youtube.com/watch?v=abc123", UrlShape::Watch, "abc123"),
    ("http://www.youtube.com/watch?v=abc123", UrlShape::Watch, "abc123"),
    ("https://www.youtube.com/watch?v=abc123&t=42s&list=PLxyz", UrlShape::Watch, "abc123"),
    ("https://www.youtube.com/watch?list=PLxyz&v=abc-123_def", UrlShape::Watch, "abc-123_def"),
    ("https://www.youtube.com/watch?v=abc123#t=42", UrlShape::Watch, "abc123"),
    ("https://www.YouTube.com/watch?v=abc123", UrlShape::Watch, "abc123"),
    ("https://www.youtube.com/shorts/abc123def", UrlShape::Shorts, "abc123def"),
    ("https://youtube.com/shorts/abc123def?feature=share", UrlShape::Shorts, "abc123def"),
    ("https://m.youtube.com/shorts/abc123def", UrlShape::Shorts, "abc123def"),
    ("https://www.youtube.com/shorts/abc123def/", UrlShape::Shorts, "abc123def"),
    ("https://www.youtube.com/embed/dQw4w9WgXcQ", UrlShape::Embed, "dQw4w9WgXcQ"),
    ("https://youtube.com/embed/dQw4w9WgXcQ?autoplay=1&mute=1&start=30", UrlShape::Embed, "dQw4w9WgXcQ"),
    ("https://www.youtube.com/live/xyz789abc", UrlShape::Live, "xyz789abc"),
    ("https://www.youtube.com/live/xyz789abc?feature=share", UrlShape::Live, "xyz789abc"),
    ("https://m.youtube.com/watch?v=dQw4w9WgXcQ", UrlShape::MobileWatch, "dQw4w9WgXcQ"),
    ("https://m.youtube.com/watch?v=dQw4w9WgXcQ&t=120", UrlShape::MobileWatch, "dQw4w9WgXcQ"),
    ("https://youtu.be/dQw4w9WgXcQ", UrlShape::ShortLink, "dQw4w9WgXcQ"),
    ("http://youtu.be/abc123", UrlShape::ShortLink, "abc123"),
    ("https://youtu.be/dQw4w9WgXcQ?t=42", UrlShape::ShortLink, "dQw4w9WgXcQ"),
    ("https://youtu.be/dQw4w9WgXcQ?si=shareId123", UrlShape::ShortLink, "dQw4w9WgXcQ"),
];

const UNTOUCHED: &[&str] = &[
    "https://www.youtube.com/",
    "https://www.youtube.com/@channelname",
    "https://www.youtube.com/results?search_query=test",
    "https://www.youtube.com/feed/subscriptions",
    "https://www.youtube.com/playlist?list=PLxyz",
    "https://www.youtube.com/watch",
    "https://www.youtube.com/watch?v=",
    "https://www.youtube.com/shorts/",
    "https://www.yout-ube.com/watch?v=test",
    "https://yout-ube.com/shorts/test",
    "https://www.yout-ube.com/embed/test",
    "https://m.yout-ube.com/watch?v=test",
    "https://www.youtube-nocookie.com/embed/test",
    "https://youtube-nocookie.com/embed/test",
    "https://www.google.com/watch?v=test",
    "https://youtu.be/",
    "not a url",
    // ids outside [A-Za-z0-9_-]
    "https://www.youtube.com/shorts/abc.def",
    "https://www.youtube.com/embed/abc~1",
    "https://www.youtube.com/live/abc.def?feature=share",
    "https://www.youtube.com/watch?v=abc.def",
    "https://www.youtube.com/watch?v=abc.def&t=1",
    "https://m.youtube.com/watch?v=abc!",
    "https://youtu.be/abc.def",
];

/// Hosts that only contain the source domain as a substring.
const LOOKALIKES: &[&str] = &[
    "https://www.fakeyoutube.com/watch?v=test",
    "https://youtube.com.evil.com/watch?v=test",
    "https://notyoutube.com/watch?v=test",
];

fn engine() -> RuleEngine {
    RuleEngine::compile(&build_rules()).unwrap()
}

/// Video id carried by a destination URL: `v` for watch pages, otherwise the
/// segment after the shape prefix.
fn video_id_in(destination: &str) -> Option<String> {
    let before_fragment = destination.split('#').next()?;
    let (location, query) = before_fragment.split_once('?').unwrap_or((before_fragment, ""));
    if let Some(v) = QueryParams::parse(query).get("v") {
        return Some(v.to_string());
    }
    let path = location.splitn(4, '/').nth(3)?;
    path_segments(path).get(1).map(|s| s.to_string())
}

fn host_in(destination: &str) -> &str {
    destination
        .split("://")
        .nth(1)
        .and_then(|rest| rest.split(['/', '?', '#']).next())
        .unwrap_or_default()
}

#[test]
fn both_layers_redirect_every_video_shape() {
    let engine = engine();
    for policy in [HostPolicy::Lax, HostPolicy::Strict] {
        let classifier = Classifier::declarative(policy);
        for &(url, shape, id) in REDIRECTED {
            let decision = classifier
                .classify(url)
                .unwrap_or_else(|| panic!("classifier missed {}", url));
            let redirect = engine
                .evaluate(url, RequestType::MAIN_FRAME)
                .unwrap_or_else(|| panic!("rules missed {}", url));

            assert_eq!(decision.shape, shape, "{}", url);
            assert_eq!(redirect.rule_id, rule_id(shape), "{}", url);

            assert_eq!(decision.video_id.as_str(), id, "{}", url);
            assert_eq!(video_id_in(&redirect.url).as_deref(), Some(id), "{}", redirect.url);

            let classified_host = host_in(&decision.destination).to_ascii_lowercase();
            let rule_host = host_in(&redirect.url).to_ascii_lowercase();
            assert!(classified_host.contains(DESTINATION_DOMAIN), "{}", decision.destination);
            assert_eq!(classified_host, rule_host, "{}", url);
        }
    }
}

#[test]
fn both_layers_leave_other_urls_alone() {
    let engine = engine();
    for policy in [HostPolicy::Lax, HostPolicy::Strict] {
        let classifier = Classifier::declarative(policy);
        for &url in UNTOUCHED {
            assert_eq!(classifier.classify(url), None, "{}", url);
            assert_eq!(engine.redirect_url(url), None, "{}", url);
        }
    }
}

#[test]
fn strict_classifier_agrees_on_lookalike_hosts() {
    let engine = engine();
    let classifier = Classifier::declarative(HostPolicy::Strict);
    for &url in LOOKALIKES {
        assert_eq!(classifier.classify(url), None, "{}", url);
        assert_eq!(engine.redirect_url(url), None, "{}", url);
    }
}

#[test]
fn lax_classifier_over_matches_lookalike_hosts() {
    let engine = engine();
    let classifier = Classifier::declarative(HostPolicy::Lax);
    for &url in LOOKALIKES {
        assert!(classifier.classify(url).is_some(), "{}", url);
        assert_eq!(engine.redirect_url(url), None, "{}", url);
    }
}

#[test]
fn non_watch_shapes_land_on_the_same_url() {
    let engine = engine();
    let classifier = Classifier::default();
    for &(url, shape, _) in REDIRECTED {
        if shape.is_watch_shaped() || url.contains('#') {
            continue;
        }
        assert_eq!(classifier.redirect_url(url), engine.redirect_url(url), "{}", url);
    }
}

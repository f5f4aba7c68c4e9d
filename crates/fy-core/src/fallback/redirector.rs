//! Per-page redirect state machine.
//!
//! ```text
//! Init --start--> IdleWatching --match--> Redirecting
//! ```
//!
//! `Redirecting` is terminal for the page: once a replacing navigation has
//! been issued every later trigger is ignored, whichever detection source it
//! came from. Detection sources report the visible URL through
//! [`FallbackRedirector::note_url`], which answers whether a debounced check
//! should be scheduled; the host then calls [`FallbackRedirector::check`].

use std::fmt;
use std::time::Duration;

use log::{debug, error, info};

use crate::classify::Classifier;
use crate::config::{FallbackConfig, RedirectConfig};
use crate::hosts;
use crate::params::{autoplay_requested, ensure_player_params_in_url, has_player_params};
use crate::url::QueryParams;

#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error("Navigation failed: {0}")]
    Navigation(String),
}

/// The page the redirector runs in.
pub trait Page {
    /// Current visible URL.
    fn href(&self) -> String;

    /// Replacing navigation; no new history entry.
    fn replace(&self, url: &str) -> Result<(), PageError>;
}

/// What prompted a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationSource {
    Initial,
    PushState,
    ReplaceState,
    PopState,
    Mutation,
    Poll,
}

impl NavigationSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::PushState => "pushState",
            Self::ReplaceState => "replaceState",
            Self::PopState => "popstate",
            Self::Mutation => "mutation",
            Self::Poll => "poll",
        }
    }
}

impl fmt::Display for NavigationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    IdleWatching,
    Redirecting,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// `start` has not run yet
    NotStarted,
    Disabled,
    /// A navigation is already under way
    Latched,
    Idle,
    Redirected(String),
    /// Player parameters added on a destination host
    ParamsInjected(String),
    /// Autoplay was requested; the host should wait for the video element
    AwaitVideo,
    /// Replacement failed; the latch stays set
    NavigationFailed,
}

#[derive(Debug)]
pub struct FallbackRedirector {
    classifier: Classifier,
    config: FallbackConfig,
    phase: Phase,
    enabled: bool,
    last_url: Option<String>,
    autoplay_attempted: bool,
}

impl FallbackRedirector {
    pub fn new(config: &RedirectConfig) -> Self {
        Self {
            classifier: Classifier::fallback(config.host_policy),
            config: config.fallback.clone(),
            phase: Phase::Init,
            enabled: false,
            last_url: None,
            autoplay_attempted: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn config(&self) -> &FallbackConfig {
        &self.config
    }

    /// Leave `Init` with the flag read from storage and run the initial check.
    ///
    /// When disabled the redirector stays passive, but the host keeps its
    /// listeners registered since the flag may flip later.
    pub fn start(&mut self, enabled: bool, page: &dyn Page) -> CheckOutcome {
        if self.phase != Phase::Init {
            return self.check(page, NavigationSource::Initial);
        }
        self.phase = Phase::IdleWatching;
        self.enabled = enabled;
        info!(target: "content", "Fallback redirector started (enabled: {})", enabled);
        self.check(page, NavigationSource::Initial)
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            info!(target: "content", "Enabled changed to {}", enabled);
        }
        self.enabled = enabled;
    }

    /// Record the visible URL from a detection source.
    ///
    /// Returns the debounce delay when the URL differs from the last one
    /// seen, `None` when nothing needs checking.
    pub fn note_url(&mut self, href: &str, source: NavigationSource) -> Option<Duration> {
        if self.phase != Phase::IdleWatching {
            return None;
        }
        if self.last_url.as_deref() == Some(href) {
            return None;
        }
        debug!(target: "content", "URL change via {}: {}", source, href);
        self.last_url = Some(href.to_string());
        Some(self.config.debounce())
    }

    pub fn check(&mut self, page: &dyn Page, source: NavigationSource) -> CheckOutcome {
        match self.phase {
            Phase::Init => return CheckOutcome::NotStarted,
            Phase::Redirecting => return CheckOutcome::Latched,
            Phase::IdleWatching => {}
        }
        if !self.enabled {
            return CheckOutcome::Disabled;
        }

        let href = page.href();
        self.last_url = Some(href.clone());

        if let Some(target) = self.classifier.redirect_url(&href) {
            if target != href {
                info!(target: "content", "Redirecting ({}): {} -> {}", source, href, target);
                return self.navigate(page, target, CheckOutcome::Redirected);
            }
        }

        if !self.config.autoplay {
            return CheckOutcome::Idle;
        }
        let Ok(parsed) = ::url::Url::parse(&href) else {
            return CheckOutcome::Idle;
        };
        let on_autoplay_host = parsed
            .host_str()
            .is_some_and(|host| hosts::is_autoplay_host(&host.to_ascii_lowercase(), self.classifier.policy()));
        if !on_autoplay_host {
            return CheckOutcome::Idle;
        }

        let params = QueryParams::from_url(&parsed);
        if !has_player_params(&params) {
            if let Some(target) = ensure_player_params_in_url(&href) {
                info!(target: "content", "Adding player parameters: {}", target);
                return self.navigate(page, target, CheckOutcome::ParamsInjected);
            }
        }

        if autoplay_requested(&params) && !self.autoplay_attempted {
            self.autoplay_attempted = true;
            debug!(target: "content", "Autoplay requested; waiting for video element");
            return CheckOutcome::AwaitVideo;
        }
        CheckOutcome::Idle
    }

    fn navigate(&mut self, page: &dyn Page, target: String, done: fn(String) -> CheckOutcome) -> CheckOutcome {
        self.phase = Phase::Redirecting;
        match page.replace(&target) {
            Ok(()) => done(target),
            Err(err) => {
                error!(target: "content", "Failed to replace location: {}", err);
                CheckOutcome::NavigationFailed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hosts::HostPolicy;
    use std::cell::RefCell;

    struct FakePage {
        href: RefCell<String>,
        replaced: RefCell<Vec<String>>,
        fail: bool,
    }

    impl FakePage {
        fn at(href: &str) -> Self {
            Self {
                href: RefCell::new(href.to_string()),
                replaced: RefCell::new(Vec::new()),
                fail: false,
            }
        }

        fn failing(href: &str) -> Self {
            Self {
                fail: true,
                ..Self::at(href)
            }
        }

        fn go(&self, href: &str) {
            *self.href.borrow_mut() = href.to_string();
        }

        fn replaced(&self) -> Vec<String> {
            self.replaced.borrow().clone()
        }
    }

    impl Page for FakePage {
        fn href(&self) -> String {
            self.href.borrow().clone()
        }

        fn replace(&self, url: &str) -> Result<(), PageError> {
            if self.fail {
                return Err(PageError::Navigation("blocked".into()));
            }
            self.replaced.borrow_mut().push(url.to_string());
            Ok(())
        }
    }

    fn redirector() -> FallbackRedirector {
        FallbackRedirector::new(&RedirectConfig::default())
    }

    #[test]
    fn check_before_start_does_nothing() {
        let page = FakePage::at("https://www.youtube.com/watch?v=abc");
        let mut r = redirector();
        assert_eq!(r.check(&page, NavigationSource::Poll), CheckOutcome::NotStarted);
        assert_eq!(r.note_url(&page.href(), NavigationSource::Poll), None);
        assert!(page.replaced().is_empty());
    }

    #[test]
    fn initial_load_redirects_once() {
        let page = FakePage::at("https://www.youtube.com/shorts/abc123");
        let mut r = redirector();

        let outcome = r.start(true, &page);
        let CheckOutcome::Redirected(target) = outcome else {
            panic!("expected redirect, got {:?}", outcome);
        };
        assert!(target.starts_with("https://www.yout-ube.com/shorts/abc123?"));
        assert!(target.contains("autoplay=1"));
        assert_eq!(r.phase(), Phase::Redirecting);

        // Overlapping triggers are swallowed by the latch
        assert_eq!(r.check(&page, NavigationSource::Mutation), CheckOutcome::Latched);
        assert_eq!(r.check(&page, NavigationSource::Poll), CheckOutcome::Latched);
        assert_eq!(r.note_url("https://www.youtube.com/watch?v=x", NavigationSource::PushState), None);
        assert_eq!(page.replaced().len(), 1);
    }

    #[test]
    fn disabled_stays_passive_until_enabled() {
        let page = FakePage::at("https://www.youtube.com/");
        let mut r = redirector();
        assert_eq!(r.start(false, &page), CheckOutcome::Disabled);
        assert_eq!(r.phase(), Phase::IdleWatching);

        page.go("https://www.youtube.com/watch?v=abc");
        assert!(r.note_url(&page.href(), NavigationSource::PushState).is_some());
        assert_eq!(r.check(&page, NavigationSource::PushState), CheckOutcome::Disabled);

        r.set_enabled(true);
        assert!(matches!(
            r.check(&page, NavigationSource::Poll),
            CheckOutcome::Redirected(_)
        ));
    }

    #[test]
    fn spa_navigation_is_debounced_on_change_only() {
        let page = FakePage::at("https://www.youtube.com/");
        let mut r = redirector();
        assert_eq!(r.start(true, &page), CheckOutcome::Idle);

        // Same URL from the poll: nothing to do
        assert_eq!(r.note_url("https://www.youtube.com/", NavigationSource::Poll), None);

        let next = "https://www.youtube.com/watch?v=abc";
        assert_eq!(
            r.note_url(next, NavigationSource::PushState),
            Some(Duration::from_millis(75))
        );
        assert_eq!(r.note_url(next, NavigationSource::Mutation), None);

        page.go(next);
        assert!(matches!(
            r.check(&page, NavigationSource::PushState),
            CheckOutcome::Redirected(_)
        ));
    }

    #[test]
    fn non_video_pages_stay_idle() {
        for href in [
            "https://www.youtube.com/results?search_query=x",
            "https://www.youtube.com/@channel",
            "https://example.com/watch?v=abc",
        ] {
            let page = FakePage::at(href);
            let mut r = redirector();
            assert_eq!(r.start(true, &page), CheckOutcome::Idle, "{}", href);
            assert!(page.replaced().is_empty());
        }
    }

    #[test]
    fn destination_without_params_gets_them_once() {
        let page = FakePage::at("https://www.yout-ube.com/shorts/abc123");
        let mut r = redirector();
        let outcome = r.start(true, &page);
        let CheckOutcome::ParamsInjected(target) = outcome else {
            panic!("expected params, got {:?}", outcome);
        };
        assert_eq!(
            target,
            "https://www.yout-ube.com/shorts/abc123?autoplay=1&start=0&enablejsapi=1&playsinline=1"
        );
        assert_eq!(r.check(&page, NavigationSource::Poll), CheckOutcome::Latched);
    }

    #[test]
    fn destination_with_params_waits_for_video_once() {
        let page = FakePage::at("https://www.yout-ube.com/watch?v=abc&autoplay=1&enablejsapi=1&playsinline=1");
        let mut r = redirector();
        assert_eq!(r.start(true, &page), CheckOutcome::AwaitVideo);
        assert_eq!(r.check(&page, NavigationSource::Mutation), CheckOutcome::Idle);
        assert!(page.replaced().is_empty());
    }

    #[test]
    fn nocookie_host_is_autoplay_eligible() {
        let page = FakePage::at("https://www.youtube-nocookie.com/embed/abc");
        let mut r = redirector();
        assert!(matches!(r.start(true, &page), CheckOutcome::ParamsInjected(_)));
    }

    #[test]
    fn autoplay_switch_off_skips_escalation() {
        let config = RedirectConfig::from_json(r#"{"fallback":{"autoplay":false}}"#).unwrap();
        let page = FakePage::at("https://www.yout-ube.com/shorts/abc123");
        let mut r = FallbackRedirector::new(&config);
        assert_eq!(r.start(true, &page), CheckOutcome::Idle);
    }

    #[test]
    fn failed_replace_keeps_latch() {
        let page = FakePage::failing("https://youtu.be/abc");
        let mut r = redirector();
        assert_eq!(r.start(true, &page), CheckOutcome::NavigationFailed);
        assert_eq!(r.phase(), Phase::Redirecting);
        assert_eq!(r.check(&page, NavigationSource::Poll), CheckOutcome::Latched);
    }

    #[test]
    fn strict_policy_ignores_lookalike_hosts() {
        let config = RedirectConfig {
            host_policy: HostPolicy::Strict,
            ..RedirectConfig::default()
        };
        let page = FakePage::at("https://notyoutube.com/watch?v=abc");
        let mut r = FallbackRedirector::new(&config);
        assert_eq!(r.start(true, &page), CheckOutcome::Idle);
    }
}

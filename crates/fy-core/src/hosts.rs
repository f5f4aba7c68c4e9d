//! Host constants and host matching
//!
//! Source-domain matching is substring containment by default. That is
//! deliberately broad: a host such as `fakeexample-youtube.com` also matches.
//! [`HostPolicy::Strict`] narrows it to the domain itself and its subdomains.
//!
//! # Examples
//!
//! ```
//! use fy_core::hosts::{HostPolicy, is_source_host};
//!
//! assert!(is_source_host("m.youtube.com", HostPolicy::Lax));
//! assert!(is_source_host("fakeyoutube.com", HostPolicy::Lax));
//! assert!(!is_source_host("fakeyoutube.com", HostPolicy::Strict));
//! ```

use serde::{Deserialize, Serialize};

/// Domain of the video site being rewritten.
pub const SOURCE_DOMAIN: &str = "youtube.com";

/// Short-link host; its first path segment is the video id.
pub const SHORT_LINK_HOST: &str = "youtu.be";

/// Privacy-rewritten destination domain.
pub const DESTINATION_DOMAIN: &str = "yout-ube.com";

/// Host used for short-link rewrites, which have no subdomain to carry over.
pub const DESTINATION_WWW_HOST: &str = "www.yout-ube.com";

/// Privacy-enhanced embed domain, treated as already safe.
pub const NOCOOKIE_DOMAIN: &str = "youtube-nocookie.com";

/// Hosts where the in-page layer drives autoplay and quality.
pub const AUTOPLAY_HOSTS: [&str; 2] = [DESTINATION_DOMAIN, NOCOOKIE_DOMAIN];

/// How a host is compared against a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostPolicy {
    /// `host.contains(domain)`
    #[default]
    Lax,
    /// `host == domain` or `host` ends with `.domain`
    Strict,
}

impl HostPolicy {
    /// Check a lowercase host against a domain.
    #[inline]
    pub fn matches(self, host: &str, domain: &str) -> bool {
        match self {
            Self::Lax => host.contains(domain),
            Self::Strict => {
                host == domain
                    || (host.len() > domain.len()
                        && host.ends_with(domain)
                        && host.as_bytes()[host.len() - domain.len() - 1] == b'.')
            }
        }
    }
}

/// Host already on the destination or the no-cookie domain.
#[inline]
pub fn is_rewritten_host(host: &str, policy: HostPolicy) -> bool {
    policy.matches(host, DESTINATION_DOMAIN) || policy.matches(host, NOCOOKIE_DOMAIN)
}

#[inline]
pub fn is_source_host(host: &str, policy: HostPolicy) -> bool {
    policy.matches(host, SOURCE_DOMAIN)
}

#[inline]
pub fn is_short_link_host(host: &str) -> bool {
    host == SHORT_LINK_HOST
}

#[inline]
pub fn is_mobile_host(host: &str) -> bool {
    host.starts_with("m.")
}

/// Host eligible for autoplay/quality escalation.
pub fn is_autoplay_host(host: &str, policy: HostPolicy) -> bool {
    AUTOPLAY_HOSTS.iter().any(|domain| policy.matches(host, domain))
}

/// Replace the first occurrence of the source domain with the destination.
/// Subdomains (`www.`, `m.`) are carried over unchanged.
pub fn rewrite_host(host: &str) -> String {
    host.replacen(SOURCE_DOMAIN, DESTINATION_DOMAIN, 1)
}

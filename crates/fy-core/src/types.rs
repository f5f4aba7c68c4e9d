//! Core type definitions for FreeYT
//!
//! These types are shared by the classifier, the in-page fallback and the
//! rule compiler.

use std::fmt;

// =============================================================================
// URL Shapes
// =============================================================================

/// Structural pattern of a URL that denotes a playable video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum UrlShape {
    /// `youtube.com/watch?v=ID` (with or without `www.`)
    Watch = 1,
    /// `youtube.com/shorts/ID`
    Shorts = 2,
    /// `youtube.com/embed/ID`
    Embed = 3,
    /// `youtube.com/live/ID`
    Live = 4,
    /// `m.youtube.com/watch?v=ID`
    MobileWatch = 5,
    /// `youtu.be/ID`
    ShortLink = 6,
}

impl UrlShape {
    /// All shapes, in declarative rule order.
    pub const ALL: [UrlShape; 6] = [
        Self::Watch,
        Self::Shorts,
        Self::Embed,
        Self::Live,
        Self::MobileWatch,
        Self::ShortLink,
    ];

    /// Stable tag used in logs and bindings.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Watch => "watch",
            Self::Shorts => "shorts",
            Self::Embed => "embed",
            Self::Live => "live",
            Self::MobileWatch => "mobile_watch",
            Self::ShortLink => "short_link",
        }
    }

    /// First path segment on the source host. Short links have none.
    pub fn path_segment(self) -> &'static str {
        match self {
            Self::Watch | Self::MobileWatch => "watch",
            Self::Shorts => "shorts",
            Self::Embed => "embed",
            Self::Live => "live",
            Self::ShortLink => "",
        }
    }

    /// Shapes whose destination is a `/watch` page.
    #[inline]
    pub fn is_watch_shaped(self) -> bool {
        matches!(self, Self::Watch | Self::MobileWatch | Self::ShortLink)
    }
}

impl TryFrom<u8> for UrlShape {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Watch),
            2 => Ok(Self::Shorts),
            3 => Ok(Self::Embed),
            4 => Ok(Self::Live),
            5 => Ok(Self::MobileWatch),
            6 => Ok(Self::ShortLink),
            _ => Err(()),
        }
    }
}

impl fmt::Display for UrlShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Video Identifier
// =============================================================================

/// Opaque video token extracted from a matched URL.
///
/// Alphanumeric plus `-` and `_`. The usual length is 11 but no length is
/// assumed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoId(String);

impl VideoId {
    /// Validate and wrap a raw identifier. Returns `None` for empty input or
    /// any character outside `[A-Za-z0-9_-]`.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.is_empty() {
            return None;
        }
        if !raw.bytes().all(is_id_byte) {
            return None;
        }
        Some(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[inline]
fn is_id_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_'
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Redirect Decision
// =============================================================================

/// Which rewritten URLs receive the player parameter set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParamMode {
    /// Only `/watch` destinations (what the declarative rules do)
    #[default]
    WatchOnly,
    /// Every destination (what the in-page fallback does)
    AllShapes,
}

/// Result of a successful classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectDecision {
    /// Which canonical shape matched
    pub shape: UrlShape,
    /// Identifier embedded in the input
    pub video_id: VideoId,
    /// Fully rewritten destination URL
    pub destination: String,
}

// =============================================================================
// Request Types (bit mask for resource scoping)
// =============================================================================

bitflags::bitflags! {
    /// Request type bit mask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RequestType: u32 {
        const OTHER = 1 << 0;
        const SCRIPT = 1 << 1;
        const IMAGE = 1 << 2;
        const STYLESHEET = 1 << 3;
        const OBJECT = 1 << 4;
        const SUB_FRAME = 1 << 5;
        const MAIN_FRAME = 1 << 6;
        const XMLHTTPREQUEST = 1 << 7;
        const WEBSOCKET = 1 << 8;
        const FONT = 1 << 9;
        const MEDIA = 1 << 10;
        const PING = 1 << 11;
        const CSP_REPORT = 1 << 12;

        /// Document types (main_frame + sub_frame)
        const DOCUMENT = Self::MAIN_FRAME.bits() | Self::SUB_FRAME.bits();
    }
}

impl RequestType {
    /// Parse from browser resource type string.
    pub fn from_resource_type(s: &str) -> Self {
        RESOURCE_TYPE_NAMES
            .iter()
            .find(|(_, name)| *name == s)
            .map(|(mask, _)| *mask)
            .unwrap_or(Self::OTHER)
    }

    /// Browser resource type string for a single-bit mask.
    pub fn resource_type_name(self) -> Option<&'static str> {
        RESOURCE_TYPE_NAMES
            .iter()
            .find(|(mask, _)| *mask == self)
            .map(|(_, name)| *name)
    }
}

const RESOURCE_TYPE_NAMES: [(RequestType, &str); 13] = [
    (RequestType::MAIN_FRAME, "main_frame"),
    (RequestType::SUB_FRAME, "sub_frame"),
    (RequestType::STYLESHEET, "stylesheet"),
    (RequestType::SCRIPT, "script"),
    (RequestType::IMAGE, "image"),
    (RequestType::FONT, "font"),
    (RequestType::OBJECT, "object"),
    (RequestType::XMLHTTPREQUEST, "xmlhttprequest"),
    (RequestType::PING, "ping"),
    (RequestType::CSP_REPORT, "csp_report"),
    (RequestType::MEDIA, "media"),
    (RequestType::WEBSOCKET, "websocket"),
    (RequestType::OTHER, "other"),
];

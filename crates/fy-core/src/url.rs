//! Query string and path helpers
//!
//! `QueryParams` follows `URLSearchParams` semantics: pairs keep their order,
//! `set` replaces the first occurrence and drops later duplicates, and
//! serialization is `application/x-www-form-urlencoded`.

use ::url::form_urlencoded;

// =============================================================================
// Query Parameters
// =============================================================================

/// Ordered list of decoded query pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a raw query string (without the leading `?`).
    pub fn parse(query: &str) -> Self {
        let pairs = form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        Self { pairs }
    }

    /// Parse the query of an already parsed URL.
    pub fn from_url(url: &::url::Url) -> Self {
        url.query().map(Self::parse).unwrap_or_default()
    }

    /// First value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn has(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }

    /// Set `key` to `value`, keeping the position of its first occurrence.
    pub fn set(&mut self, key: &str, value: &str) {
        let mut found = false;
        self.pairs.retain_mut(|(k, v)| {
            if k != key {
                return true;
            }
            if found {
                return false;
            }
            found = true;
            *v = value.to_string();
            true
        });
        if !found {
            self.pairs.push((key.to_string(), value.to_string()));
        }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Encoded query string, or `None` when there are no pairs.
    pub fn to_query_string(&self) -> Option<String> {
        if self.pairs.is_empty() {
            return None;
        }
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (k, v) in &self.pairs {
            serializer.append_pair(k, v);
        }
        Some(serializer.finish())
    }

    /// Write these pairs back into `url`, clearing the query when empty.
    pub fn apply_to(&self, url: &mut ::url::Url) {
        url.set_query(self.to_query_string().as_deref());
    }
}

// =============================================================================
// Path Segments
// =============================================================================

/// Non-empty path segments, so `/shorts//abc/` yields `["shorts", "abc"]`.
pub fn path_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Host of `url`, lowercased. `None` for URLs without a host or that fail to
/// parse.
pub fn host_of(url: &str) -> Option<String> {
    let parsed = ::url::Url::parse(url).ok()?;
    parsed.host_str().map(|h| h.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_get() {
        let params = QueryParams::parse("v=abc&t=42s&list=PLxyz");
        assert_eq!(params.get("v"), Some("abc"));
        assert_eq!(params.get("t"), Some("42s"));
        assert_eq!(params.get("missing"), None);
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_set_replaces_first_and_drops_duplicates() {
        let mut params = QueryParams::parse("a=1&v=old&b=2&v=dup");
        params.set("v", "new");
        assert_eq!(params.to_query_string().as_deref(), Some("a=1&v=new&b=2"));
    }

    #[test]
    fn test_set_appends_missing_key() {
        let mut params = QueryParams::parse("t=42");
        params.set("v", "abc");
        assert_eq!(params.to_query_string().as_deref(), Some("t=42&v=abc"));
    }

    #[test]
    fn test_empty_serializes_to_none() {
        assert_eq!(QueryParams::parse("").to_query_string(), None);
        assert!(QueryParams::new().is_empty());
    }

    #[test]
    fn test_encoding_is_form_urlencoded() {
        let mut params = QueryParams::new();
        params.set("q", "a b&c");
        assert_eq!(params.to_query_string().as_deref(), Some("q=a+b%26c"));
    }

    #[test]
    fn test_path_segments() {
        assert_eq!(path_segments("/shorts/abc"), vec!["shorts", "abc"]);
        assert_eq!(path_segments("/shorts/"), vec!["shorts"]);
        assert_eq!(path_segments("/"), Vec::<&str>::new());
        assert_eq!(path_segments("//a//b/"), vec!["a", "b"]);
    }

    #[test]
    fn test_host_of() {
        assert_eq!(host_of("https://WWW.YouTube.com/watch").as_deref(), Some("www.youtube.com"));
        assert_eq!(host_of("not-a-valid-url"), None);
        assert_eq!(host_of(""), None);
    }
}

use regex::Regex;

/// A site-specific acceptance check: can media be retrieved from this URL?
///
/// Mirrors the per-site extractor registry of the external fetch tool. Each
/// matcher either claims a URL or rejects it; the generic catch-all the tool
/// ships is deliberately not represented here, so an arbitrary webpage is
/// never considered fetchable.
pub trait UrlMatcher: Send + Sync {
    /// Stable identifier, used only in logs.
    fn name(&self) -> &'static str;

    /// Whether this matcher claims capability to retrieve media from `url`.
    fn accepts(&self, url: &str) -> bool;
}

/// Regex-backed [`UrlMatcher`] for a single site.
pub struct SiteMatcher {
    name: &'static str,
    pattern: Regex,
}

impl SiteMatcher {
    /// Panics on an invalid pattern; all patterns are compile-time literals
    /// exercised by tests.
    #[must_use]
    pub fn new(name: &'static str, pattern: &str) -> Self {
        let pattern =
            Regex::new(pattern).unwrap_or_else(|e| panic!("matcher pattern {name}: {e}"));
        Self { name, pattern }
    }
}

impl UrlMatcher for SiteMatcher {
    fn name(&self) -> &'static str {
        self.name
    }

    fn accepts(&self, url: &str) -> bool {
        self.pattern.is_match(url)
    }
}

/// The sites the fetch tool extracts natively and grabbot recognizes.
pub(crate) fn builtin_site_matchers() -> Vec<Box<dyn UrlMatcher>> {
    let table: &[(&'static str, &str)] = &[
        ("youtube", r"^https?://(?:www\.|m\.|music\.)?youtube\.com/"),
        ("youtube-short", r"^https?://(?:www\.)?youtu\.be/"),
        ("tiktok", r"^https?://(?:www\.)?tiktok\.com/"),
        ("twitter", r"^https?://(?:www\.|mobile\.)?(?:twitter|x)\.com/\w+/status/"),
        ("instagram", r"^https?://(?:www\.)?instagram\.com/(?:p|reel|tv)/"),
        ("reddit", r"^https?://(?:www\.|old\.)?reddit\.com/r/\w+/comments/"),
        ("soundcloud", r"^https?://(?:www\.|m\.)?soundcloud\.com/[^/]+/"),
        ("vimeo", r"^https?://(?:www\.)?vimeo\.com/\d+"),
        ("twitch", r"^https?://(?:www\.|m\.)?twitch\.tv/(?:videos/\d+|\w+/clip/)"),
        ("streamable", r"^https?://(?:www\.)?streamable\.com/\w+"),
    ];
    table
        .iter()
        .map(|(name, pattern)| Box::new(SiteMatcher::new(name, pattern)) as Box<dyn UrlMatcher>)
        .collect()
}

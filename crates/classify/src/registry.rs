use {once_cell::sync::Lazy, regex::Regex};

use crate::{Classification, matchers, matchers::UrlMatcher};

/// Short/redirect TikTok links resolve through a host the native site
/// matchers don't cover; keep them on an explicit allow-list.
static PROBLEM_PATTERNS: Lazy<Vec<Regex>> =
    Lazy::new(|| compile(&[r"^https?://(?:www\.)?(?:vm\.)?tiktok\.com/[^/]+/?"]));

/// Sites cheap and safe enough to fetch without an explicit command.
static AUTO_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"^https?://(?:www\.)?(?:vm\.)?tiktok\.com/[^/]+/?",
        r"^https?://(?:www\.)?youtube\.com/[^/]+/?",
        r"^https?://(?:www\.)?youtu\.be/[^/]+/?",
    ])
});

/// URLs guaranteed to be audio content.
static AUDIO_PATTERNS: Lazy<Vec<Regex>> =
    Lazy::new(|| compile(&[r"^https?://music\.youtube\.com/"]));

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).unwrap_or_else(|e| panic!("pattern {p}: {e}")))
        .collect()
}

/// The set of site matchers plus the static pattern lists driving
/// classification. Swappable as a value so tests can install their own.
pub struct MatcherRegistry {
    matchers: Vec<Box<dyn UrlMatcher>>,
}

impl MatcherRegistry {
    /// Registry backed by the built-in site matcher table.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            matchers: matchers::builtin_site_matchers(),
        }
    }

    /// Registry with an explicit matcher set (test seam).
    #[must_use]
    pub fn new(matchers: Vec<Box<dyn UrlMatcher>>) -> Self {
        Self { matchers }
    }

    /// Classify a URL. Pure and deterministic; safe to call any number of
    /// times from any context.
    #[must_use]
    pub fn classify(&self, url: &str) -> Classification {
        let matched_site = self.matchers.iter().any(|m| m.accepts(url));
        let problem_listed = PROBLEM_PATTERNS.iter().any(|re| re.is_match(url));
        let fetchable = matched_site || problem_listed;
        if !fetchable {
            return Classification::UNFETCHABLE;
        }
        Classification {
            fetchable,
            audio_only: AUDIO_PATTERNS.iter().any(|re| re.is_match(url)),
            auto_eligible: AUTO_PATTERNS.iter().any(|re| re.is_match(url)),
        }
    }
}

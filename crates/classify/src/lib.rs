//! URL classification for grabbot.
//!
//! Decides, from a URL string alone, whether a link is worth handing to the
//! fetch tool and what media kind it implies. Classification is pure: no
//! network, no filesystem, no ordering constraints.

pub mod extract;
pub mod matchers;
pub mod registry;

pub use {
    extract::first_url,
    matchers::{SiteMatcher, UrlMatcher},
    registry::MatcherRegistry,
};

/// Result of classifying a single URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    /// Some registered matcher claims it can retrieve media from this URL.
    pub fetchable: bool,
    /// The URL is guaranteed to be audio content; the fetch must run in
    /// Audio mode regardless of the caller's default.
    pub audio_only: bool,
    /// The URL is trusted enough to fetch without an explicit command.
    pub auto_eligible: bool,
}

impl Classification {
    /// Classification of a URL nothing matched. Callers silently decline.
    pub const UNFETCHABLE: Self = Self {
        fetchable: false,
        audio_only: false,
        auto_eligible: false,
    };
}

use {once_cell::sync::Lazy, regex::Regex, url::Url};

/// Rough candidate scan; each hit is validated with a real URL parse.
static URL_CANDIDATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https?://[^\s<>]+").unwrap_or_else(|e| panic!("url regex: {e}")));

/// Find the first http(s) URL in a message body.
///
/// Trailing punctuation that commonly clings to links in chat text is
/// stripped before parsing. Returns `None` when no parseable URL is present.
#[must_use]
pub fn first_url(text: &str) -> Option<String> {
    for candidate in URL_CANDIDATE.find_iter(text) {
        let trimmed = candidate
            .as_str()
            .trim_end_matches(['.', ',', ';', ':', '!', '?', ')', ']', '"', '\'']);
        if Url::parse(trimmed).is_ok() {
            return Some(trimmed.to_string());
        }
    }
    None
}

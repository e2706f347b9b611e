//! Fetch orchestration: drives the external fetch tool (`yt-dlp`) with the
//! right options for the requested media kind, allocates counter-based
//! output names, and maps tool outcomes onto a uniform result.

pub mod counter;
pub mod error;
pub mod ytdlp;

use std::path::PathBuf;

use async_trait::async_trait;

use grabbot_common::MediaKind;

pub use {
    counter::FetchCounter,
    error::{FetchError, Result},
    ytdlp::YtDlpFetcher,
};

/// A successfully produced artifact on local disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    /// Final path of the playable file.
    pub path: PathBuf,
    /// Title reported by the tool, when it reported one.
    pub title: Option<String>,
}

/// The fetch capability: given a URL and a media kind, either produce a
/// local file (advancing the counter exactly once) or fail without touching
/// the counter.
///
/// A trait so the coordinator can be exercised without the real tool.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(
        &self,
        url: &str,
        kind: MediaKind,
        counter: &mut FetchCounter,
    ) -> Result<Fetched>;
}

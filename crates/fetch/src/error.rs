use std::path::PathBuf;

/// Why a fetch failed.
///
/// All variants surface to the user as one generic failure message; the
/// distinction exists for logs and tests. A tool-level size-ceiling abort
/// arrives as a nonzero exit and therefore folds into [`Self::Extraction`].
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The tool raised during extraction or download.
    #[error("extraction failed: {detail}")]
    Extraction { detail: String },

    /// The tool exited cleanly but the expected file is absent.
    #[error("fetch produced no output at {}", path.display())]
    MissingOutput { path: PathBuf },

    /// The tool ran longer than the configured ceiling and was killed.
    #[error("fetch timed out after {seconds}s")]
    TimedOut { seconds: u64 },
}

impl FetchError {
    #[must_use]
    pub fn extraction(detail: impl Into<String>) -> Self {
        Self::Extraction {
            detail: detail.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;

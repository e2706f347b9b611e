use std::path::PathBuf;

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Configuration for the bot.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Bot token from @BotFather.
    #[serde(serialize_with = "serialize_secret")]
    pub token: Secret<String>,

    /// Working directory for fetched files. Recreated empty at startup.
    pub download_dir: PathBuf,

    /// Output size ceiling in megabytes; the fetch tool aborts oversized
    /// sources instead of downloading them.
    pub max_file_size_mb: u64,

    /// Ceiling on a single fetch before it is killed, in seconds.
    pub fetch_timeout_secs: u64,
}

impl BotConfig {
    /// Size ceiling in bytes, as passed to the fetch tool.
    #[must_use]
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb * 1_000_000
    }
}

impl std::fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotConfig")
            .field("token", &"[REDACTED]")
            .field("download_dir", &self.download_dir)
            .field("max_file_size_mb", &self.max_file_size_mb)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .finish()
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            token: Secret::new(String::new()),
            download_dir: PathBuf::from("videos"),
            max_file_size_mb: 100,
            fetch_timeout_secs: 900,
        }
    }
}

use std::{
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};

use {
    async_trait::async_trait,
    tokio::process::Command,
    tracing::{debug, info, warn},
};

use grabbot_common::MediaKind;

use crate::{Fetched, FetchError, MediaFetcher, Result, counter::FetchCounter};

/// Title used when the tool reports none for an audio fetch.
const FALLBACK_AUDIO_TITLE: &str = "audio";

/// Target bitrate for extracted audio.
const AUDIO_QUALITY: &str = "192K";

/// `yt-dlp` subprocess driver.
///
/// One invocation per fetch, no internal retry. The size ceiling is enforced
/// by the tool itself (`--max-filesize`), so oversized sources abort instead
/// of downloading and then being discarded.
pub struct YtDlpFetcher {
    program: PathBuf,
    workdir: PathBuf,
    max_file_size: u64,
    timeout: Duration,
}

impl YtDlpFetcher {
    /// Locate `yt-dlp` on `PATH` and build a fetcher writing into `workdir`.
    pub fn discover(workdir: impl Into<PathBuf>, max_file_size: u64, timeout: Duration) -> Result<Self> {
        let program = which::which("yt-dlp")
            .map_err(|e| FetchError::extraction(format!("yt-dlp not found on PATH: {e}")))?;
        Ok(Self::with_program(program, workdir, max_file_size, timeout))
    }

    /// Build a fetcher around an explicit tool binary (test seam).
    #[must_use]
    pub fn with_program(
        program: impl Into<PathBuf>,
        workdir: impl Into<PathBuf>,
        max_file_size: u64,
        timeout: Duration,
    ) -> Self {
        Self {
            program: program.into(),
            workdir: workdir.into(),
            max_file_size,
            timeout,
        }
    }

    /// Argument vector for one invocation, plus the output path the tool is
    /// expected to produce. The filename comes from the *current* counter
    /// value; the counter only advances once the file is confirmed.
    fn build_invocation(&self, url: &str, kind: MediaKind, counter_value: u64) -> (Vec<String>, PathBuf) {
        let expected = self
            .workdir
            .join(format!("{counter_value}.{}", kind.extension()));

        let mut args = vec![
            "--no-playlist".to_string(),
            "--no-progress".to_string(),
            "--max-filesize".to_string(),
            self.max_file_size.to_string(),
            // Title readback on stdout; --print alone implies simulation.
            "--print".to_string(),
            "title".to_string(),
            "--no-simulate".to_string(),
        ];
        match kind {
            MediaKind::Video => {
                // Remux into a single mp4 container, no transcoding.
                args.extend([
                    "-f".to_string(),
                    "mp4".to_string(),
                    "-o".to_string(),
                    format!("{counter_value}.mp4"),
                ]);
            },
            MediaKind::Audio => {
                // Best audio-only source, extracted to mp3 at a fixed bitrate.
                args.extend([
                    "-f".to_string(),
                    "bestaudio/best".to_string(),
                    "-x".to_string(),
                    "--audio-format".to_string(),
                    "mp3".to_string(),
                    "--audio-quality".to_string(),
                    AUDIO_QUALITY.to_string(),
                    "-o".to_string(),
                    format!("{counter_value}.%(ext)s"),
                ]);
            },
        }
        args.push(url.to_string());
        (args, expected)
    }

    /// Rename an audio artifact to carry its title for presentation.
    ///
    /// Only path separators and NUL are replaced; the title is otherwise
    /// kept verbatim. A failed rename keeps the counter-named file rather
    /// than failing the whole fetch.
    async fn rename_with_title(&self, produced: &Path, title: &str) -> PathBuf {
        let safe: String = title
            .chars()
            .map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c })
            .collect();
        let target = self.workdir.join(format!("{safe}.mp3"));
        match tokio::fs::rename(produced, &target).await {
            Ok(()) => target,
            Err(e) => {
                warn!(
                    from = %produced.display(),
                    to = %target.display(),
                    error = %e,
                    "title rename failed, keeping counter-named file"
                );
                produced.to_path_buf()
            },
        }
    }
}

#[async_trait]
impl MediaFetcher for YtDlpFetcher {
    async fn fetch(
        &self,
        url: &str,
        kind: MediaKind,
        counter: &mut FetchCounter,
    ) -> Result<Fetched> {
        let value = counter.peek();
        let (args, expected) = self.build_invocation(url, kind, value);

        debug!(url, %kind, file = value, "invoking yt-dlp");

        let mut command = Command::new(&self.program);
        command
            .args(&args)
            .current_dir(&self.workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Err(_) => {
                return Err(FetchError::TimedOut {
                    seconds: self.timeout.as_secs(),
                });
            },
            Ok(Err(e)) => {
                return Err(FetchError::extraction(format!(
                    "failed to run {}: {e}",
                    self.program.display()
                )));
            },
            Ok(Ok(output)) => output,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr
                .lines()
                .rev()
                .find(|line| !line.trim().is_empty())
                .unwrap_or("tool exited with an error")
                .trim()
                .to_string();
            return Err(FetchError::extraction(detail));
        }

        if !tokio::fs::try_exists(&expected).await.unwrap_or(false) {
            return Err(FetchError::MissingOutput { path: expected });
        }

        // File confirmed on disk: this fetch consumed its counter value.
        counter.advance();

        let stdout = String::from_utf8_lossy(&output.stdout);
        let title = stdout
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(String::from);

        let path = match kind {
            MediaKind::Video => expected,
            MediaKind::Audio => {
                let title = title.as_deref().unwrap_or(FALLBACK_AUDIO_TITLE);
                self.rename_with_title(&expected, title).await
            },
        };

        info!(url, %kind, path = %path.display(), "fetch complete");
        Ok(Fetched { path, title })
    }
}

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use {
    anyhow::Context,
    clap::Parser,
    secrecy::{ExposeSecret, Secret},
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use {
    grabbot_classify::MatcherRegistry,
    grabbot_fetch::YtDlpFetcher,
    grabbot_pipeline::Pipeline,
    grabbot_telegram::{BotConfig, start_polling},
};

#[derive(Parser)]
#[command(name = "grabbot", about = "grabbot — Telegram media fetch bot")]
struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, default_value_t = false)]
    json_logs: bool,

    /// Path to a JSON config file.
    #[arg(long, env = "GRABBOT_CONFIG")]
    config: Option<PathBuf>,

    /// Bot token (overrides config file and token file).
    #[arg(long, env = "GRABBOT_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// File containing the bot token, used when no token is configured.
    #[arg(long, default_value = "token.txt")]
    token_file: PathBuf,

    /// Working directory for fetched files (overrides config).
    #[arg(long, env = "GRABBOT_DOWNLOAD_DIR")]
    download_dir: Option<PathBuf>,

    /// Output size ceiling in megabytes (overrides config).
    #[arg(long)]
    max_file_size_mb: Option<u64>,

    /// Single fetch timeout in seconds (overrides config).
    #[arg(long)]
    fetch_timeout_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_telemetry(&cli);

    let config = build_config(&cli)?;

    prepare_download_dir(&config.download_dir)?;
    info!(dir = %config.download_dir.display(), "download directory ready");

    let fetcher = YtDlpFetcher::discover(
        config.download_dir.clone(),
        config.max_file_size_bytes(),
        Duration::from_secs(config.fetch_timeout_secs),
    )?;
    let pipeline = Arc::new(Pipeline::new(MatcherRegistry::builtin(), Arc::new(fetcher)));

    let cancel = start_polling(config, pipeline).await?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    info!("shutting down");
    cancel.cancel();
    Ok(())
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Config file, then flag/env overrides, then token resolution.
fn build_config(cli: &Cli) -> anyhow::Result<BotConfig> {
    let mut config = load_config(cli.config.as_deref())?;

    if let Some(dir) = &cli.download_dir {
        config.download_dir.clone_from(dir);
    }
    if let Some(mb) = cli.max_file_size_mb {
        config.max_file_size_mb = mb;
    }
    if let Some(secs) = cli.fetch_timeout_secs {
        config.fetch_timeout_secs = secs;
    }

    config.token = resolve_token(cli, &config)?;
    Ok(config)
}

fn load_config(path: Option<&Path>) -> anyhow::Result<BotConfig> {
    let Some(path) = path else {
        return Ok(BotConfig::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid config {}", path.display()))
}

fn resolve_token(cli: &Cli, config: &BotConfig) -> anyhow::Result<Secret<String>> {
    if let Some(token) = &cli.token {
        return Ok(Secret::new(token.clone()));
    }
    if !config.token.expose_secret().is_empty() {
        return Ok(config.token.clone());
    }
    let raw = std::fs::read_to_string(&cli.token_file).with_context(|| {
        format!(
            "no token configured and token file {} is unreadable",
            cli.token_file.display()
        )
    })?;
    Ok(Secret::new(raw.trim().to_string()))
}

/// Recreate the download working directory empty.
fn prepare_download_dir(dir: &Path) -> anyhow::Result<()> {
    if dir.exists() {
        std::fs::remove_dir_all(dir)
            .with_context(|| format!("failed to clear {}", dir.display()))?;
    }
    std::fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("grabbot").chain(args.iter().copied()))
    }

    #[test]
    fn defaults_without_config_file() {
        let config = load_config(None).expect("default config");
        assert_eq!(config.max_file_size_mb, 100);
    }

    #[test]
    fn config_file_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"token":"1:A","max_file_size_mb":25}"#).expect("write config");

        let config = load_config(Some(&path)).expect("load config");
        assert_eq!(config.max_file_size_mb, 25);
        assert_eq!(config.token.expose_secret(), "1:A");
    }

    #[test]
    fn flags_override_config_values() {
        let args = cli(&["--token", "1:A", "--max-file-size-mb", "10"]);
        let config = build_config(&args).expect("build config");
        assert_eq!(config.max_file_size_mb, 10);
        assert_eq!(config.token.expose_secret(), "1:A");
    }

    #[test]
    fn token_file_is_trimmed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("token.txt");
        std::fs::write(&path, "123:ABC\n").expect("write token");

        let args = cli(&["--token-file", path.to_str().expect("utf8 path")]);
        let token = resolve_token(&args, &BotConfig::default()).expect("resolve token");
        assert_eq!(token.expose_secret(), "123:ABC");
    }

    #[test]
    fn missing_token_everywhere_is_an_error() {
        let args = cli(&["--token-file", "/nonexistent/token.txt"]);
        assert!(resolve_token(&args, &BotConfig::default()).is_err());
    }

    #[test]
    fn download_dir_is_recreated_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("videos");
        std::fs::create_dir(&target).expect("create dir");
        std::fs::write(target.join("stale.mp4"), b"x").expect("write stale file");

        prepare_download_dir(&target).expect("prepare dir");
        assert!(target.exists());
        assert_eq!(
            std::fs::read_dir(&target).expect("read dir").count(),
            0,
            "stale files are cleared"
        );
    }
}

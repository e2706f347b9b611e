use std::sync::Arc;

use {
    secrecy::ExposeSecret,
    teloxide::{
        ApiError, RequestError,
        prelude::*,
        types::{AllowedUpdate, BotCommand, UpdateKind},
    },
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
};

use grabbot_pipeline::Pipeline;

use crate::{config::BotConfig, handlers, outbound::TelegramSink};

/// Start polling for updates.
///
/// Spawns a background task that processes messages until the returned
/// `CancellationToken` is cancelled.
pub async fn start_polling(
    config: BotConfig,
    pipeline: Arc<Pipeline>,
) -> anyhow::Result<CancellationToken> {
    // Client timeout has to outlast the long-polling window (30s) so the
    // HTTP client doesn't abort before Telegram responds; it also bounds
    // how long a media upload may take.
    let client = teloxide::net::default_reqwest_settings()
        .timeout(std::time::Duration::from_secs(120))
        .build()?;
    let bot = Bot::with_client(config.token.expose_secret(), client);

    // Verify credentials and get the bot username for command addressing.
    let me = bot.get_me().await?;
    let bot_username = me.username.clone();

    // Delete any existing webhook so long polling works.
    bot.delete_webhook().send().await?;

    // Register slash commands for autocomplete in Telegram clients.
    let commands = vec![
        BotCommand::new("download", "Fetch the linked media as video"),
        BotCommand::new("daudio", "Fetch the linked media as audio"),
    ];
    if let Err(e) = bot.set_my_commands(commands).await {
        warn!("failed to register bot commands: {e}");
    }

    info!(username = ?bot_username, "telegram bot connected (webhook cleared)");

    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    let sink = TelegramSink::new(bot.clone());

    tokio::spawn(async move {
        info!("starting telegram polling loop");
        let mut offset: i32 = 0;

        loop {
            if cancel_clone.is_cancelled() {
                info!("telegram polling stopped");
                break;
            }

            let result = bot
                .get_updates()
                .offset(offset)
                .timeout(30)
                .allowed_updates(vec![AllowedUpdate::Message])
                .await;

            match result {
                Ok(updates) => {
                    debug!(count = updates.len(), "got telegram updates");
                    for update in updates {
                        offset = update.id.as_offset();
                        match update.kind {
                            UpdateKind::Message(msg) => {
                                debug!(chat_id = msg.chat.id.0, "received telegram message");
                                if let Err(e) = handlers::handle_message(
                                    msg,
                                    bot_username.as_deref(),
                                    &pipeline,
                                    &sink,
                                )
                                .await
                                {
                                    error!(error = %e, "error handling telegram message");
                                }
                            },
                            other => {
                                debug!("ignoring non-message update: {other:?}");
                            },
                        }
                    }
                },
                Err(e) => {
                    // Another bot instance is running with the same token.
                    let is_conflict =
                        matches!(&e, RequestError::Api(ApiError::TerminatedByOtherGetUpdates));
                    if is_conflict {
                        error!("another bot instance is already polling with this token, stopping");
                        cancel_clone.cancel();
                        break;
                    }

                    warn!(error = %e, "telegram getUpdates failed");
                    tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                },
            }
        }
    });

    Ok(cancel)
}

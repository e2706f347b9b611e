use std::path::Path;

use {
    anyhow::Context,
    async_trait::async_trait,
    teloxide::{
        payloads::{SendAudioSetters, SendMessageSetters, SendVideoSetters},
        prelude::*,
        types::{ChatAction, ChatId, InputFile, MessageId, ReplyParameters},
    },
    tracing::{debug, warn},
};

use {
    grabbot_cache::ArtifactRef,
    grabbot_common::MediaKind,
    grabbot_pipeline::{FETCH_FAILED_MSG, MediaSink, Origin},
};

/// Delivery side of the Telegram transport: uploads, forwards of cached
/// artifacts, requester tags, and failure notes.
pub struct TelegramSink {
    bot: Bot,
}

impl TelegramSink {
    #[must_use]
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn chat_id(raw: &str) -> anyhow::Result<ChatId> {
    let id = raw
        .parse::<i64>()
        .with_context(|| format!("invalid chat id: {raw}"))?;
    Ok(ChatId(id))
}

fn message_id(raw: &str) -> anyhow::Result<MessageId> {
    let id = raw
        .parse::<i32>()
        .with_context(|| format!("invalid message id: {raw}"))?;
    Ok(MessageId(id))
}

#[async_trait]
impl MediaSink for TelegramSink {
    async fn notify_fetching(&self, origin: &Origin, kind: MediaKind) {
        let Ok(chat) = chat_id(&origin.chat_id) else {
            return;
        };
        let action = match kind {
            MediaKind::Video => ChatAction::UploadVideo,
            MediaKind::Audio => ChatAction::UploadVoice,
        };
        // Best effort; a missed indicator never blocks the fetch.
        if let Err(e) = self.bot.send_chat_action(chat, action).await {
            debug!(chat_id = %origin.chat_id, error = %e, "chat action failed");
        }
    }

    async fn deliver(
        &self,
        origin: &Origin,
        file: &Path,
        kind: MediaKind,
    ) -> anyhow::Result<ArtifactRef> {
        let chat = chat_id(&origin.chat_id)?;
        let reply = ReplyParameters::new(message_id(&origin.message_id)?);
        let input = InputFile::file(file.to_path_buf());

        let sent = match kind {
            MediaKind::Video => {
                self.bot
                    .send_video(chat, input)
                    .reply_parameters(reply)
                    .await?
            },
            MediaKind::Audio => {
                self.bot
                    .send_audio(chat, input)
                    .reply_parameters(reply)
                    .await?
            },
        };

        Ok(ArtifactRef {
            chat_id: origin.chat_id.clone(),
            message_id: sent.id.0.to_string(),
        })
    }

    async fn redeliver(&self, artifact: &ArtifactRef, origin: &Origin) -> anyhow::Result<()> {
        let to = chat_id(&origin.chat_id)?;
        let stored = message_id(&artifact.message_id)?;

        // Forward only when the artifact lives in another conversation;
        // within the producing chat the original message is reused.
        let tag_target = if artifact.chat_id == origin.chat_id {
            stored
        } else {
            let from = chat_id(&artifact.chat_id)?;
            let forwarded = self.bot.forward_message(to, from, stored).await?;
            forwarded.id
        };

        if let Some(requester) = origin.requester.as_deref() {
            self.bot
                .send_message(to, format!("@{requester}"))
                .reply_parameters(ReplyParameters::new(tag_target))
                .await?;
        }
        Ok(())
    }

    async fn report_failure(&self, origin: &Origin) {
        let Ok(chat) = chat_id(&origin.chat_id) else {
            return;
        };
        let mut request = self.bot.send_message(chat, FETCH_FAILED_MSG);
        if let Ok(reply_to) = message_id(&origin.message_id) {
            request = request.reply_parameters(ReplyParameters::new(reply_to));
        }
        if let Err(e) = request.await {
            warn!(chat_id = %origin.chat_id, error = %e, "failed to send failure note");
        }
    }
}

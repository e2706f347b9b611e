use std::sync::Arc;

use {
    teloxide::{
        prelude::*,
        types::{MediaKind as TgMediaKind, MessageKind},
    },
    tracing::debug,
};

use grabbot_pipeline::{Command, InboundMessage, Origin, Pipeline};

use crate::outbound::TelegramSink;

/// Map one inbound Telegram message into a pipeline request and run it.
pub async fn handle_message(
    msg: Message,
    bot_username: Option<&str>,
    pipeline: &Arc<Pipeline>,
    sink: &TelegramSink,
) -> anyhow::Result<()> {
    let Some(text) = extract_text(&msg) else {
        debug!(chat_id = msg.chat.id.0, "ignoring non-text message");
        return Ok(());
    };

    let command = parse_command(&text, bot_username);
    let reply_text = msg.reply_to_message().and_then(extract_text);

    let origin = Origin {
        chat_id: msg.chat.id.0.to_string(),
        message_id: msg.id.0.to_string(),
        requester: msg.from.as_ref().and_then(|u| u.username.clone()),
        direct: msg.chat.is_private(),
    };

    let inbound = InboundMessage {
        text,
        reply_text,
        origin,
        command,
    };

    let outcome = pipeline.handle(sink, inbound).await;
    debug!(chat_id = msg.chat.id.0, ?outcome, "message handled");
    Ok(())
}

/// Extract text content from a message (plain text or media caption).
fn extract_text(msg: &Message) -> Option<String> {
    match &msg.kind {
        MessageKind::Common(common) => match &common.media_kind {
            TgMediaKind::Text(t) => Some(t.text.clone()),
            TgMediaKind::Photo(p) => p.caption.clone(),
            TgMediaKind::Video(v) => v.caption.clone(),
            TgMediaKind::Document(d) => d.caption.clone(),
            _ => None,
        },
        _ => None,
    }
}

/// Recognize the bot's slash commands, tolerating the `@botname` suffix
/// Telegram appends in group chats.
fn parse_command(text: &str, bot_username: Option<&str>) -> Option<Command> {
    let first_word = text.split_whitespace().next()?;
    let command = first_word.strip_prefix('/')?;
    let bare = match command.split_once('@') {
        Some((name, target)) => {
            // A command addressed to some other bot is not for us.
            if let Some(username) = bot_username
                && !target.eq_ignore_ascii_case(username)
            {
                return None;
            }
            name
        },
        None => command,
    };
    match bare {
        "download" => Some(Command::Download),
        "daudio" => Some(Command::Audio),
        _ => None,
    }
}

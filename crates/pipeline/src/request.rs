use grabbot_common::{MediaKind, Trigger};

/// The conversation and message a request originated from. Opaque to the
/// coordinator beyond the `direct` flag; the transport interprets the ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub chat_id: String,
    pub message_id: String,
    /// Requester identity, used to tag re-delivered artifacts.
    pub requester: Option<String>,
    /// Direct (one-to-one) conversations are privileged: a fetchable link
    /// there fetches even without an explicit command or auto trust.
    pub direct: bool,
}

/// Slash command a message carried, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Fetch as video (the default kind).
    Download,
    /// Fetch as audio.
    Audio,
}

/// An inbound chat message reduced to what coordination needs.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub text: String,
    /// Text of the message this one replies to. A command without a link of
    /// its own falls back to looking here.
    pub reply_text: Option<String>,
    pub origin: Origin,
    pub command: Option<Command>,
}

/// A fully classified download request. Immutable once constructed: the
/// effective media kind and trigger are frozen at creation.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    url: String,
    kind: MediaKind,
    trigger: Trigger,
    origin: Origin,
}

impl DownloadRequest {
    #[must_use]
    pub fn new(url: String, kind: MediaKind, trigger: Trigger, origin: Origin) -> Self {
        Self {
            url,
            kind,
            trigger,
            origin,
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    #[must_use]
    pub fn trigger(&self) -> Trigger {
        self.trigger
    }

    #[must_use]
    pub fn origin(&self) -> &Origin {
        &self.origin
    }
}

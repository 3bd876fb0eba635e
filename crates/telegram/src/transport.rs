//! Bot API implementation of the engine's [`Transport`].

use std::time::Duration;

use {
    async_trait::async_trait,
    courier_common::{AssetKind, Markup, RecipientId},
    courier_config::{TelegramConfig, TextFormat},
    courier_engine::{MediaSource, Transport, TransportError},
    secrecy::ExposeSecret,
    teloxide::{
        RequestError,
        prelude::*,
        types::{InputFile, Message, ParseMode},
    },
    tracing::debug,
};

use crate::{Result, keyboard::inline_keyboard};

/// Build a bot whose HTTP client honours the configured timeouts. The
/// request timeout must exceed the long-polling timeout, otherwise the
/// client aborts `getUpdates` before Telegram answers.
pub fn build_bot(config: &TelegramConfig) -> Result<Bot> {
    let client = teloxide::net::default_reqwest_settings()
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()?;
    Ok(Bot::with_client(config.token.expose_secret(), client))
}

#[allow(deprecated)]
pub fn parse_mode(format: TextFormat) -> ParseMode {
    match format {
        TextFormat::Markdown => ParseMode::Markdown,
        TextFormat::MarkdownV2 => ParseMode::MarkdownV2,
        TextFormat::Html => ParseMode::Html,
    }
}

pub struct TelegramTransport {
    bot: Bot,
    parse_mode: Option<ParseMode>,
}

impl TelegramTransport {
    pub fn new(bot: Bot, parse_mode: Option<ParseMode>) -> Self {
        Self { bot, parse_mode }
    }
}

fn input_file(source: MediaSource) -> InputFile {
    match source {
        MediaSource::FileId(id) => InputFile::file_id(id),
        MediaSource::Url(url) => InputFile::url(url),
        MediaSource::Bytes { file_name, data } => InputFile::memory(data).file_name(file_name),
    }
}

/// File id Telegram assigned to the media in a sent message.
fn issued_file_id(kind: AssetKind, msg: &Message) -> Option<String> {
    match kind {
        // Sizes are ordered smallest first; the last one is the original.
        AssetKind::Image => msg
            .photo()
            .and_then(|sizes| sizes.last())
            .map(|size| size.file.id.clone()),
        AssetKind::Audio => msg.audio().map(|audio| audio.file.id.clone()),
    }
}

/// Sort Bot API failures into the engine's retry classes.
pub(crate) fn classify(error: &RequestError) -> TransportError {
    match error {
        RequestError::RetryAfter(wait) => TransportError::RateLimited {
            retry_after: wait.duration(),
        },
        RequestError::Network(e) if e.is_timeout() || e.is_connect() => TransportError::TimedOut,
        other => TransportError::permanent(other.to_string()),
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn send_media(
        &self,
        to: RecipientId,
        kind: AssetKind,
        source: MediaSource,
        caption: Option<&str>,
        markup: Option<&Markup>,
    ) -> std::result::Result<Option<String>, TransportError> {
        let chat_id = ChatId(to.0);
        let input = input_file(source);

        let sent = match kind {
            AssetKind::Image => {
                let mut req = self.bot.send_photo(chat_id, input);
                if let Some(caption) = caption {
                    req = req.caption(caption);
                    if let Some(mode) = self.parse_mode {
                        req = req.parse_mode(mode);
                    }
                }
                if let Some(markup) = markup {
                    req = req.reply_markup(inline_keyboard(markup));
                }
                req.await
            },
            AssetKind::Audio => {
                let mut req = self.bot.send_audio(chat_id, input);
                if let Some(caption) = caption {
                    req = req.caption(caption);
                    if let Some(mode) = self.parse_mode {
                        req = req.parse_mode(mode);
                    }
                }
                if let Some(markup) = markup {
                    req = req.reply_markup(inline_keyboard(markup));
                }
                req.await
            },
        };

        let msg = sent.map_err(|e| classify(&e))?;
        let issued = issued_file_id(kind, &msg);
        debug!(
            chat_id = to.0,
            message_id = msg.id.0,
            %kind,
            issued = issued.is_some(),
            "telegram media sent"
        );
        Ok(issued)
    }

    async fn send_text(
        &self,
        to: RecipientId,
        text: &str,
        markup: Option<&Markup>,
    ) -> std::result::Result<(), TransportError> {
        let mut req = self.bot.send_message(ChatId(to.0), text);
        if let Some(mode) = self.parse_mode {
            req = req.parse_mode(mode);
        }
        if let Some(markup) = markup {
            req = req.reply_markup(inline_keyboard(markup));
        }
        let msg = req.await.map_err(|e| classify(&e))?;
        debug!(chat_id = to.0, message_id = msg.id.0, "telegram text sent");
        Ok(())
    }
}

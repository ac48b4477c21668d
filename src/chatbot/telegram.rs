//! Telegram client using teloxide.

use std::future::Future;

use teloxide::prelude::*;
use teloxide::types::{MessageId, ParseMode, ReplyParameters};
use teloxide::{ApiError, RequestError};
use tracing::{info, warn};

/// Outbound message operations the analyze pipeline needs.
pub trait Messenger {
    fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_to_message_id: Option<i64>,
    ) -> impl Future<Output = Result<i64, String>> + Send;

    fn edit_message(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
    ) -> impl Future<Output = Result<(), String>> + Send;

    fn delete_message(
        &self,
        chat_id: i64,
        message_id: i64,
    ) -> impl Future<Output = Result<(), String>> + Send;
}

/// Telegram API client.
///
/// Text goes out with legacy Markdown so the fenced corrected-text block
/// renders as a copyable code block. Model output is not guaranteed to be
/// valid Markdown, so a message Telegram cannot parse is retried as plain
/// text. Any other error is returned as is; the first attempt may already
/// have been delivered.
pub struct TelegramClient {
    bot: Bot,
}

// Legacy mode: fences render without escaping the rest of the text.
#[allow(deprecated)]
const PARSE_MODE: ParseMode = ParseMode::Markdown;

impl TelegramClient {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    async fn send(
        &self,
        chat_id: i64,
        text: &str,
        reply_to_message_id: Option<i64>,
        parse_mode: Option<ParseMode>,
    ) -> Result<i64, RequestError> {
        let mut request = self.bot.send_message(ChatId(chat_id), text);

        if let Some(mode) = parse_mode {
            request = request.parse_mode(mode);
        }

        if let Some(msg_id) = reply_to_message_id {
            let reply_params = ReplyParameters::new(MessageId(msg_id as i32));
            request = request.reply_parameters(reply_params);
        }

        request.await.map(|msg| msg.id.0 as i64)
    }

    async fn edit(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        parse_mode: Option<ParseMode>,
    ) -> Result<(), RequestError> {
        let mut request = self
            .bot
            .edit_message_text(ChatId(chat_id), MessageId(message_id as i32), text);

        if let Some(mode) = parse_mode {
            request = request.parse_mode(mode);
        }

        request.await.map(|_| ())
    }
}

/// Telegram rejected the Markdown entities; nothing was delivered.
fn is_markdown_rejection(error: &RequestError) -> bool {
    matches!(error, RequestError::Api(ApiError::CantParseEntities(_)))
}

impl Messenger for TelegramClient {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_to_message_id: Option<i64>,
    ) -> Result<i64, String> {
        let result = match self.send(chat_id, text, reply_to_message_id, Some(PARSE_MODE)).await {
            Err(e) if is_markdown_rejection(&e) => {
                warn!("Markdown send rejected ({e}), retrying as plain text");
                self.send(chat_id, text, reply_to_message_id, None).await
            }
            other => other,
        };

        result.map_err(|e| {
            let msg = format!("Failed to send: {e}");
            warn!("{}", msg);
            msg
        })
    }

    async fn edit_message(&self, chat_id: i64, message_id: i64, text: &str) -> Result<(), String> {
        let result = match self.edit(chat_id, message_id, text, Some(PARSE_MODE)).await {
            Err(e) if is_markdown_rejection(&e) => {
                warn!("Markdown edit rejected ({e}), retrying as plain text");
                self.edit(chat_id, message_id, text, None).await
            }
            other => other,
        };

        result.map_err(|e| {
            let msg = format!("Failed to edit message: {e}");
            warn!("{}", msg);
            msg
        })
    }

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<(), String> {
        info!("🗑️ Deleting message {} in chat {}", message_id, chat_id);

        self.bot
            .delete_message(ChatId(chat_id), MessageId(message_id as i32))
            .await
            .map_err(|e| {
                let msg = format!("Failed to delete message: {e}");
                warn!("{}", msg);
                msg
            })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_entities_error_is_retried() {
        let err = RequestError::Api(ApiError::CantParseEntities(
            "Bad Request: can't parse entities: Can't find end of the entity starting at byte offset 12".to_string(),
        ));
        assert!(is_markdown_rejection(&err));
    }

    #[test]
    fn test_other_api_errors_are_not_retried() {
        assert!(!is_markdown_rejection(&RequestError::Api(ApiError::MessageIsTooLong)));
        assert!(!is_markdown_rejection(&RequestError::Api(ApiError::BotBlocked)));
        assert!(!is_markdown_rejection(&RequestError::Api(ApiError::MessageToEditNotFound)));
    }

    #[test]
    fn test_chat_migration_is_not_retried() {
        assert!(!is_markdown_rejection(&RequestError::MigrateToChatId(ChatId(-100123))));
    }
}

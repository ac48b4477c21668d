//! Forwards operator log records to a Telegram chat.
//!
//! Users never see these; the chat is configured with `LOG_CHAT_ID`.

use std::time::Duration;

use teloxide::prelude::*;
use teloxide::types::ChatId;
use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

use crate::chatbot::format::MAX_MESSAGE_CHARS;

const FLUSH_INTERVAL: Duration = Duration::from_secs(5);
const MAX_BUFFERED: usize = 50;

#[derive(Debug, PartialEq, Eq)]
enum LogRecord {
    /// WARN/ERROR, sent as soon as it arrives.
    Urgent(String),
    /// INFO, batched.
    Info(String),
}

pub struct TelegramLogLayer {
    tx: mpsc::UnboundedSender<LogRecord>,
}

impl TelegramLogLayer {
    /// Must be called inside a tokio runtime.
    pub fn new(bot: Bot, chat_id: ChatId) -> Self {
        let (tx, rx) = mpsc::unbounded_channel::<LogRecord>();
        tokio::spawn(forward(bot, chat_id, rx));
        Self { tx }
    }
}

async fn forward(bot: Bot, chat_id: ChatId, mut rx: mpsc::UnboundedReceiver<LogRecord>) {
    let mut buffer: Vec<String> = Vec::new();
    let mut interval = tokio::time::interval(FLUSH_INTERVAL);

    loop {
        tokio::select! {
            record = rx.recv() => match record {
                Some(LogRecord::Urgent(text)) => send_log(&bot, chat_id, &text).await,
                Some(LogRecord::Info(text)) => {
                    buffer.push(text);
                    if buffer.len() >= MAX_BUFFERED {
                        flush(&bot, chat_id, &mut buffer).await;
                    }
                }
                None => {
                    flush(&bot, chat_id, &mut buffer).await;
                    break;
                }
            },
            _ = interval.tick() => flush(&bot, chat_id, &mut buffer).await,
        }
    }
}

async fn flush(bot: &Bot, chat_id: ChatId, buffer: &mut Vec<String>) {
    if buffer.is_empty() {
        return;
    }
    let combined = buffer.join("\n");
    buffer.clear();
    send_log(bot, chat_id, &combined).await;
}

async fn send_log(bot: &Bot, chat_id: ChatId, text: &str) {
    // Plain text; records may contain anything.
    if let Err(e) = bot.send_message(chat_id, truncate(text)).await {
        eprintln!("Failed to send log to Telegram: {e}");
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_MESSAGE_CHARS {
        return text.to_string();
    }
    let truncated: String = text.chars().take(MAX_MESSAGE_CHARS).collect();
    format!("{truncated}...")
}

fn to_record(level: Level, message: String) -> Option<LogRecord> {
    match level {
        Level::ERROR => Some(LogRecord::Urgent(format!("❌ {message}"))),
        Level::WARN => Some(LogRecord::Urgent(format!("⚠️ {message}"))),
        Level::INFO => Some(LogRecord::Info(message)),
        _ => None,
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            let fields = std::mem::take(&mut self.message);
            self.message = format!("{value:?}");
            if !fields.is_empty() {
                self.message.push_str(&format!(" ({fields})"));
            }
        } else if self.message.is_empty() {
            self.message = format!("{} = {:?}", field.name(), value);
        } else {
            self.message.push_str(&format!(", {} = {:?}", field.name(), value));
        }
    }
}

impl<S: Subscriber> Layer<S> for TelegramLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let level = *event.metadata().level();
        if level > Level::INFO {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        if let Some(record) = to_record(level, visitor.message)
            && self.tx.send(record).is_err()
        {
            eprintln!("Log channel closed, record dropped");
        }
    }
}

//! Chatbot engine - command state machine and the analyze pipeline.

use teloxide::utils::command::BotCommands;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::chatbot::format::format_response;
use crate::chatbot::gemini::{GeminiError, TextModel};
use crate::chatbot::mode::{Mode, ModeStore};
use crate::chatbot::prompt::build_prompt;
use crate::chatbot::telegram::Messenger;

/// Placeholder shown while the model is working.
pub const PLACEHOLDER: &str = "Analyzing... 🔍";

/// The only failure text end users ever see.
pub const APOLOGY: &str = "⚠️ Sorry, something went wrong. Please try again.";

pub const EMPTY_INPUT_REPLY: &str = "✏️ Please send some text to analyze.";

#[derive(BotCommands, Clone, Copy, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "These commands are supported:")]
pub enum Command {
    #[command(description = "start the bot and reset to grammar check")]
    Start,
    #[command(description = "show this help")]
    Help,
    #[command(description = "analyze grammar and correctness")]
    Check,
    #[command(description = "rewrite text clearly and naturally")]
    Rewrite,
    #[command(description = "explain the grammar rules used")]
    Explain,
    #[command(description = "suggest improvements to the writing")]
    Improve,
    #[command(description = "reset the conversation")]
    Clear,
}

/// Why an analysis produced no output for the user.
#[derive(Debug)]
pub enum AnalyzeError {
    EmptyInput,
    Model(GeminiError),
    /// Telegram refused one of the outbound messages.
    Delivery(String),
}

impl std::fmt::Display for AnalyzeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalyzeError::EmptyInput => write!(f, "empty input"),
            AnalyzeError::Model(e) => write!(f, "model call failed: {e}"),
            AnalyzeError::Delivery(e) => write!(f, "delivery failed: {e}"),
        }
    }
}

impl std::error::Error for AnalyzeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AnalyzeError::Model(e) => Some(e),
            _ => None,
        }
    }
}

impl From<GeminiError> for AnalyzeError {
    fn from(e: GeminiError) -> Self {
        AnalyzeError::Model(e)
    }
}

impl AnalyzeError {
    /// Text shown to the user for this failure.
    pub fn user_message(&self) -> &'static str {
        match self {
            AnalyzeError::EmptyInput => EMPTY_INPUT_REPLY,
            _ => APOLOGY,
        }
    }
}

/// Apply a command to the chat's mode and return the reply text.
///
/// Free text never goes through here, so only commands move the mode.
pub fn apply_command(modes: &mut ModeStore, chat_id: i64, command: Command) -> String {
    match command {
        Command::Start => {
            modes.set(chat_id, Mode::Check);
            "👋 Hello! I'm GrammarGuide, your English writing tutor.\n\n\
             Send me a sentence and I'll check its grammar.\n\
             Use /help to see all commands."
                .to_string()
        }
        Command::Help => help_text(modes.get(chat_id)),
        Command::Clear => {
            modes.clear(chat_id);
            "🧹 Conversation cleared. Mode reset to check.".to_string()
        }
        Command::Check => select_mode(modes, chat_id, Mode::Check),
        Command::Rewrite => select_mode(modes, chat_id, Mode::Rewrite),
        Command::Explain => select_mode(modes, chat_id, Mode::Explain),
        Command::Improve => select_mode(modes, chat_id, Mode::Improve),
    }
}

fn select_mode(modes: &mut ModeStore, chat_id: i64, mode: Mode) -> String {
    modes.set(chat_id, mode);
    format!("✅ Mode set to {mode}: {}", mode.task())
}

fn help_text(current: Mode) -> String {
    format!(
        "{}\n\nSend any text and I'll analyze it in the current mode.\nCurrent mode: {current}",
        Command::descriptions()
    )
}

/// True for text the command handler owns, including unknown commands.
pub fn is_command(text: &str) -> bool {
    text.trim_start().starts_with('/')
}

/// Build the prompt, ask the model and format the reply into chunks.
pub async fn analyze<L: TextModel>(model: &L, text: &str, mode: Mode) -> Result<Vec<String>, AnalyzeError> {
    if text.trim().is_empty() {
        return Err(AnalyzeError::EmptyInput);
    }

    let prompt = build_prompt(text, mode);
    let raw = model.generate(&prompt).await?;
    let chunks = format_response(&raw);

    // Nothing left once fences are stripped.
    if chunks.iter().all(|c| c.trim().is_empty()) {
        return Err(AnalyzeError::Model(GeminiError::Empty));
    }

    Ok(chunks)
}

/// Handle one free-text message end to end.
///
/// Every failure is logged and turned into a single user-facing reply;
/// nothing propagates to the dispatcher.
pub async fn handle_text<M, L>(
    messenger: &M,
    model: &L,
    modes: &Mutex<ModeStore>,
    chat_id: i64,
    message_id: i64,
    text: &str,
) where
    M: Messenger,
    L: TextModel,
{
    if text.trim().is_empty() {
        info!("Empty input in chat {chat_id}");
        if let Err(e) = messenger.send_message(chat_id, EMPTY_INPUT_REPLY, Some(message_id)).await {
            warn!("Failed to send empty-input reply: {e}");
        }
        return;
    }

    let mode = modes.lock().await.get(chat_id);
    info!("📝 Analyzing {} chars in chat {chat_id} (mode: {mode})", text.chars().count());

    let mut placeholder = match messenger.send_message(chat_id, PLACEHOLDER, Some(message_id)).await {
        Ok(id) => Some(id),
        Err(e) => {
            warn!("Failed to send placeholder: {e}");
            None
        }
    };

    let result = match analyze(model, text, mode).await {
        Ok(chunks) => deliver(messenger, chat_id, message_id, &mut placeholder, &chunks).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        error!("Error while processing text in chat {chat_id}: {e}");
        reply_failure(messenger, chat_id, message_id, placeholder, e.user_message()).await;
    }
}

/// Single chunk: edit the placeholder in place. Several: delete it and
/// send every chunk as a reply, in order.
async fn deliver<M: Messenger>(
    messenger: &M,
    chat_id: i64,
    message_id: i64,
    placeholder: &mut Option<i64>,
    chunks: &[String],
) -> Result<(), AnalyzeError> {
    if let ([chunk], Some(status_id)) = (chunks, *placeholder) {
        return messenger
            .edit_message(chat_id, status_id, chunk)
            .await
            .map_err(AnalyzeError::Delivery);
    }

    if let Some(status_id) = placeholder.take() {
        if let Err(e) = messenger.delete_message(chat_id, status_id).await {
            warn!("Failed to delete placeholder: {e}");
        }
    }

    for chunk in chunks {
        messenger
            .send_message(chat_id, chunk, Some(message_id))
            .await
            .map_err(AnalyzeError::Delivery)?;
    }

    info!("📤 Sent {} chunk(s) to chat {chat_id}", chunks.len());
    Ok(())
}

async fn reply_failure<M: Messenger>(
    messenger: &M,
    chat_id: i64,
    message_id: i64,
    placeholder: Option<i64>,
    text: &str,
) {
    if let Some(status_id) = placeholder {
        if messenger.edit_message(chat_id, status_id, text).await.is_ok() {
            return;
        }
    }

    if let Err(e) = messenger.send_message(chat_id, text, Some(message_id)).await {
        error!("Failed to notify chat {chat_id} of failure: {e}");
    }
}

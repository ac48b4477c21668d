//! Chatbot module - relays Telegram messages to Gemini for grammar analysis.

pub mod engine;
pub mod format;
pub mod gemini;
pub mod mode;
pub mod prompt;
pub mod telegram;


pub use engine::{analyze, apply_command, handle_text, is_command, AnalyzeError, Command};
pub use gemini::{GeminiClient, GeminiError, TextModel};
pub use mode::{Mode, ModeStore};
pub use telegram::{Messenger, TelegramClient};

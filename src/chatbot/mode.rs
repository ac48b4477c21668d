//! Per-chat analysis mode.

use std::collections::HashMap;
use std::fmt;

/// The analysis task selected for a chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    #[default]
    Check,
    Rewrite,
    Explain,
    Improve,
}

impl Mode {
    pub const ALL: [Mode; 4] = [Mode::Check, Mode::Rewrite, Mode::Explain, Mode::Improve];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Check => "check",
            Mode::Rewrite => "rewrite",
            Mode::Explain => "explain",
            Mode::Improve => "improve",
        }
    }

    /// Task sentence embedded in the model prompt.
    pub fn task(&self) -> &'static str {
        match self {
            Mode::Check => "Analyze grammar and correctness.",
            Mode::Rewrite => "Rewrite this text clearly and naturally.",
            Mode::Explain => "Explain the grammar rules used in this sentence.",
            Mode::Improve => "Suggest improvements to make this writing better.",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// In-memory mode table keyed by chat id. Lost on restart.
#[derive(Debug, Default)]
pub struct ModeStore {
    modes: HashMap<i64, Mode>,
}

impl ModeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current mode, `Check` if none was set.
    pub fn get(&self, chat_id: i64) -> Mode {
        self.modes.get(&chat_id).copied().unwrap_or_default()
    }

    pub fn set(&mut self, chat_id: i64, mode: Mode) {
        self.modes.insert(chat_id, mode);
    }

    /// Drop everything held for the chat, then re-establish `Check`.
    pub fn clear(&mut self, chat_id: i64) {
        self.modes.remove(&chat_id);
        self.modes.insert(chat_id, Mode::Check);
    }

    pub fn len(&self) -> usize {
        self.modes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }
}

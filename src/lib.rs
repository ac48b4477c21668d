pub mod chatbot;
pub mod config;
pub mod keepalive;
pub mod logging;
pub mod telegram_log;

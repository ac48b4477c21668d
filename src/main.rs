use std::sync::Arc;
use tokio::sync::Mutex;

use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{error, info, warn};
use tracing_subscriber::filter::Targets;
use tracing_subscriber::prelude::*;

use grammarguide::chatbot::{
    apply_command, handle_text, is_command, Command, GeminiClient, Messenger, ModeStore, TelegramClient,
};
use grammarguide::config::Config;
use grammarguide::{keepalive, logging, telegram_log};

struct BotState {
    telegram: TelegramClient,
    gemini: GeminiClient,
    /// Per-chat mode. Locked only to read or write a mode, never across a model call.
    modes: Mutex<ModeStore>,
}

#[tokio::main]
async fn main() {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {e}");
            std::process::exit(1);
        }
    };

    let bot = Bot::new(&config.telegram_token);

    // Setup logging
    let file_appender = match logging::file_appender(&config.log_dir) {
        Ok(appender) => appender,
        Err(e) => {
            eprintln!("❌ cannot open log file in '{}': {e}", config.log_dir.display());
            std::process::exit(1);
        }
    };
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let registry = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        );

    if let Some(log_chat_id) = config.log_chat_id {
        let tg_layer = telegram_log::TelegramLogLayer::new(bot.clone(), log_chat_id)
            .with_filter(Targets::new().with_target("grammarguide", tracing::Level::INFO));
        registry.with(tg_layer).init();
    } else {
        registry.init();
    }

    info!("🚀 Starting GrammarGuide...");

    let gemini = match GeminiClient::new(config.google_api_key.clone(), config.gemini_model.clone()) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to create Gemini client: {e}");
            std::process::exit(1);
        }
    };

    info!("Model: {}", gemini.model());

    keepalive::spawn(config.port);

    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!("Failed to register command list: {e}");
    }

    let state = Arc::new(BotState {
        telegram: TelegramClient::new(bot.clone()),
        gemini,
        modes: Mutex::new(ModeStore::new()),
    });

    let handler = Update::filter_message()
        .branch(dptree::entry().filter_command::<Command>().endpoint(handle_command))
        .branch(dptree::endpoint(handle_message));

    info!("✅ Bot is running...");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

async fn handle_command(msg: Message, cmd: Command, state: Arc<BotState>) -> ResponseResult<()> {
    let chat_id = msg.chat.id.0;
    info!("⌨️ {:?} in chat {}", cmd, chat_id);

    let reply = {
        let mut modes = state.modes.lock().await;
        apply_command(&mut modes, chat_id, cmd)
    };

    if let Err(e) = state.telegram.send_message(chat_id, &reply, None).await {
        warn!("Failed to answer {:?}: {e}", cmd);
    }
    Ok(())
}

async fn handle_message(msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };

    // Unknown commands are ignored rather than analyzed.
    if is_command(text) {
        return Ok(());
    }

    handle_text(
        &state.telegram,
        &state.gemini,
        &state.modes,
        msg.chat.id.0,
        msg.id.0 as i64,
        text,
    )
    .await;

    Ok(())
}

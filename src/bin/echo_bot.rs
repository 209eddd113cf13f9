//! echo-bot
//!
//! A small Telegram bot built on botloop: echoes text messages, counts them per
//! chat, and answers inline-button presses.
//!
//! Configuration comes from the environment (see `TelegramConfig::from_env`);
//! log verbosity from `RUST_LOG`.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use botloop::telegram::{
    InlineKeyboardButton, InlineKeyboardMarkup, SendOptions, TelegramClient, TelegramConfig, Update,
};
use botloop::{Engine, EngineConfig, FieldValue, KeyedStore, Record};

/// Per-chat state kept between updates.
#[derive(Debug, Clone, Default)]
struct ChatSession {
    username: Option<String>,
    messages: u64,
}

impl Record for ChatSession {
    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "username" => Some(self.username.clone().into()),
            "messages" => Some(self.messages.into()),
            _ => None,
        }
    }
}

fn again_keyboard() -> SendOptions {
    SendOptions::with_markup(InlineKeyboardMarkup {
        inline_keyboard: vec![vec![InlineKeyboardButton::callback("How many?", "count")]],
    })
}

fn register_handlers(
    engine: &mut Engine<Update, TelegramClient>,
    client: &TelegramClient,
    sessions: &Arc<KeyedStore<ChatSession>>,
) {
    let (api, store) = (client.clone(), Arc::clone(sessions));
    engine.register_named(
        "start",
        |u: &Update| u.is_command("start"),
        move |u: Update| {
            let Some(chat_id) = u.chat_id() else { return };
            let username = u.message().and_then(|m| m.from.as_ref()).and_then(|f| f.username.clone());
            store.set(chat_id, ChatSession { username, messages: 0 });
            if let Err(e) = api.send_message(chat_id, "Hi! Send me anything and I will echo it.", &SendOptions::default()) {
                tracing::warn!(chat_id, error = %e, "failed to greet");
            }
        },
    );

    let (api, store) = (client.clone(), Arc::clone(sessions));
    engine.register_named(
        "find",
        |u: &Update| u.is_command("find"),
        move |u: Update| {
            let Some(chat_id) = u.chat_id() else { return };
            let Some(name) = u.text().and_then(|t| t.split_whitespace().nth(1)) else { return };
            let reply = match store.find_key_by_field("username", Some(name.trim_start_matches('@'))) {
                Ok(found) => format!("@{name} talks to me in chat {found}"),
                Err(e) => format!("No chat for @{name} ({e})"),
            };
            if let Err(e) = api.send_message(chat_id, &reply, &SendOptions::default()) {
                tracing::warn!(chat_id, error = %e, "failed to answer /find");
            }
        },
    );

    let (api, store) = (client.clone(), Arc::clone(sessions));
    engine.register_named(
        "echo",
        |u: &Update| u.text().is_some_and(|t| !t.starts_with('/')),
        move |u: Update| {
            let Some(message) = u.message.as_ref() else { return };
            let chat_id = message.chat.id;
            let count = store.update(chat_id, |session| {
                session.messages += 1;
                session.messages
            });
            let text = format!("{} (#{count})", message.text.as_deref().unwrap_or_default());
            if let Err(e) = api.send_message(chat_id, &text, &again_keyboard()) {
                tracing::warn!(chat_id, error = %e, "failed to echo");
            }
        },
    );

    let (api, store) = (client.clone(), Arc::clone(sessions));
    engine.register_named(
        "count",
        |u: &Update| u.callback_data() == Some("count"),
        move |u: Update| {
            let Some(query) = u.callback_query.as_ref() else { return };
            let count = u.chat_id().map_or(0, |chat_id| store.get(chat_id).messages);
            let text = format!("{count} messages so far");
            if let Err(e) = api.answer_callback_query(&query.id, Some(&text), false) {
                tracing::warn!(error = %e, "failed to answer callback query");
            }
        },
    );
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = TelegramConfig::from_env()?;
    tracing::info!(?config, "configuration loaded");

    let client = TelegramClient::new(config)?;
    let sessions: Arc<KeyedStore<ChatSession>> = Arc::new(KeyedStore::new());

    let mut engine = Engine::new(client.clone(), EngineConfig::default());
    register_handlers(&mut engine, &client, &sessions);

    engine.run()?;
    Ok(())
}

//! # botloop - long-poll ingestion and dispatch for chat bots
//!
//! botloop turns a remote long-poll feed into a stream of events delivered to
//! predicate-matched handlers, and gives those handlers a concurrent keyed
//! store for per-chat or per-user state.
//!
//! ## Core Concepts
//!
//! - **UpdateSource**: fetches the next batch of events for a cursor
//! - **Engine**: runs the poll loop and the dispatch loop on their own threads
//! - **Handler**: a predicate plus an action; every matching action runs on its own thread
//! - **KeyedStore**: mutex-guarded `i64 -> T` map with auto-increment keys and lookup by field
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use botloop::telegram::{SendOptions, TelegramClient, TelegramConfig, Update};
//! use botloop::{Engine, EngineConfig, KeyedStore};
//!
//! let client = TelegramClient::new(TelegramConfig::from_env()?)?;
//! let seen: Arc<KeyedStore<u64>> = Arc::new(KeyedStore::new());
//!
//! let mut engine = Engine::new(client.clone(), EngineConfig::default());
//! engine.register(
//!     |u: &Update| u.text().is_some(),
//!     move |u: Update| {
//!         let chat = u.chat_id().unwrap_or_default();
//!         let n = seen.update(chat, |n| { *n += 1; *n });
//!         let _ = client.send_message(chat, &format!("message #{n}"), &SendOptions::default());
//!     },
//! );
//! engine.run()?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod engine;
pub mod error;
pub mod registry;
pub mod source;
pub mod store;
pub mod telegram;
pub mod value;

// Re-export primary types at crate root for convenience
pub use engine::{Engine, EngineConfig, EngineHandle, EngineStats};
pub use error::{BotError, BotResult, EngineError, FetchError, StoreError};
pub use registry::{Handler, HandlerId, HandlerRegistry};
pub use source::{Event, UpdateSource};
pub use store::{KeyedStore, Record, WarningZone};
pub use value::FieldValue;

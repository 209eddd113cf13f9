//! Telegram Bot API bindings.
//!
//! The wire types are always available so handlers can be written and tested
//! without network access. The blocking HTTP client, which implements
//! [`UpdateSource`](crate::UpdateSource) over `getUpdates`, needs the
//! `telegram` feature.

#[cfg(feature = "telegram")]
mod client;
mod config;
mod types;

#[cfg(feature = "telegram")]
pub use client::{ParseMode, PhotoInput, SendOptions, TelegramClient, MAX_EDIT_CHARS, MAX_MESSAGE_CHARS};
pub use config::{TelegramConfig, DEFAULT_API_URL};
pub use types::{
    ApiResponse, CallbackQuery, Chat, ChatJoinRequest, ChatMember, ChatMemberUpdated, Document, File,
    InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, Message, PhotoSize, ReplyKeyboardMarkup,
    ReplyKeyboardRemove, ReplyMarkup, Update, User, WebAppInfo,
};

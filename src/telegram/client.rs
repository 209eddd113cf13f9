//! Blocking Telegram Bot API client.
//!
//! Every method maps to one Bot API call and returns the decoded `result` or a
//! [`FetchError`]. The HTTP client has no request timeout; `getUpdates` is a
//! long poll whose wait is bounded on the server side by
//! [`TelegramConfig::poll_timeout_secs`].

use std::borrow::Cow;
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::blocking::{multipart, Client, Response};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};

use crate::error::FetchError;
use crate::source::UpdateSource;

use super::config::TelegramConfig;
use super::types::{ApiResponse, File, Message, ReplyMarkup, Update};

/// Longest text `send_message` sends before truncating.
pub const MAX_MESSAGE_CHARS: usize = 10_000;

/// Longest text `edit_message_text` sends before truncating.
pub const MAX_EDIT_CHARS: usize = 1_000;

/// Text formatting mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParseMode {
    /// HTML markup. Default for every send.
    #[default]
    Html,
    /// Telegram MarkdownV2.
    MarkdownV2,
    /// No `parse_mode` parameter; text is sent as is.
    Plain,
}

impl ParseMode {
    const fn as_api(self) -> Option<&'static str> {
        match self {
            Self::Html => Some("HTML"),
            Self::MarkdownV2 => Some("MarkdownV2"),
            Self::Plain => None,
        }
    }
}

/// Optional parameters shared by the send and edit calls.
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    /// Keyboard attached to the message.
    pub reply_markup: Option<ReplyMarkup>,
    /// Message the new one replies to.
    pub reply_to_message_id: Option<i64>,
    /// Forum topic to post in.
    pub message_thread_id: Option<i64>,
    /// Formatting of the text or caption.
    pub parse_mode: ParseMode,
}

impl SendOptions {
    /// Options carrying only a reply markup.
    #[must_use]
    pub fn with_markup(markup: impl Into<ReplyMarkup>) -> Self {
        Self {
            reply_markup: Some(markup.into()),
            ..Self::default()
        }
    }

    /// Options replying to `message_id`.
    #[must_use]
    pub fn reply_to(message_id: i64) -> Self {
        Self {
            reply_to_message_id: Some(message_id),
            ..Self::default()
        }
    }

    fn apply(&self, payload: &mut Map<String, Value>) -> Result<(), FetchError> {
        if let Some(mode) = self.parse_mode.as_api() {
            payload.insert("parse_mode".to_string(), json!(mode));
        }
        if let Some(markup) = &self.reply_markup {
            payload.insert("reply_markup".to_string(), serde_json::to_value(markup)?);
        }
        if let Some(id) = self.reply_to_message_id {
            payload.insert("reply_to_message_id".to_string(), json!(id));
        }
        if let Some(id) = self.message_thread_id {
            payload.insert("message_thread_id".to_string(), json!(id));
        }
        Ok(())
    }

    fn apply_form(&self, mut form: multipart::Form) -> Result<multipart::Form, FetchError> {
        if let Some(mode) = self.parse_mode.as_api() {
            form = form.text("parse_mode", mode);
        }
        if let Some(markup) = &self.reply_markup {
            form = form.text("reply_markup", serde_json::to_string(markup)?);
        }
        if let Some(id) = self.reply_to_message_id {
            form = form.text("reply_to_message_id", id.to_string());
        }
        if let Some(id) = self.message_thread_id {
            form = form.text("message_thread_id", id.to_string());
        }
        Ok(form)
    }
}

/// Where a photo comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhotoInput {
    /// A file already on Telegram's servers.
    FileId(String),
    /// A URL Telegram downloads itself.
    Url(String),
    /// A local file, uploaded as multipart.
    Path(PathBuf),
}

fn truncate(text: &str, max_chars: usize) -> Cow<'_, str> {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => Cow::Owned(format!("{}...", &text[..cut])),
        None => Cow::Borrowed(text),
    }
}

fn into_result<T>(method: &str, envelope: ApiResponse<T>) -> Result<T, FetchError> {
    if !envelope.ok {
        return Err(FetchError::Api {
            code: envelope.error_code.unwrap_or_default(),
            description: envelope.description.unwrap_or_default(),
        });
    }
    envelope.result.ok_or_else(|| FetchError::Parse {
        message: format!("{method}: response has no result"),
    })
}

/// Telegram Bot API client.
#[derive(Debug, Clone)]
pub struct TelegramClient {
    http: Client,
    config: TelegramConfig,
}

impl TelegramClient {
    /// Builds a client.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Network`] if the HTTP client cannot be initialised.
    pub fn new(config: TelegramConfig) -> Result<Self, FetchError> {
        let http = Client::builder().timeout(None::<Duration>).build()?;
        Ok(Self { http, config })
    }

    /// Configuration the client was built with.
    #[must_use]
    pub const fn config(&self) -> &TelegramConfig {
        &self.config
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.config.api_url, self.config.token)
    }

    fn decode<T: DeserializeOwned>(method: &str, resp: Response) -> Result<T, FetchError> {
        let status = resp.status();
        let body = resp.text()?;
        match serde_json::from_str::<ApiResponse<T>>(&body) {
            Ok(envelope) => into_result(method, envelope),
            Err(_) if !status.is_success() => Err(FetchError::Api {
                code: i64::from(status.as_u16()),
                description: body.chars().take(200).collect(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn call<T: DeserializeOwned>(&self, method: &str, payload: &Value) -> Result<T, FetchError> {
        let resp = self.http.post(self.method_url(method)).json(payload).send()?;
        Self::decode(method, resp)
    }

    /// Fetches updates with `update_id >= offset`.
    ///
    /// # Errors
    ///
    /// Any network, HTTP or decoding failure, or an `ok: false` response.
    pub fn get_updates(&self, offset: i64) -> Result<Vec<Update>, FetchError> {
        let payload = json!({
            "offset": offset,
            "timeout": self.config.poll_timeout_secs,
        });
        let updates: Vec<Update> = self.call("getUpdates", &payload)?;

        if self.config.log_updates && !updates.is_empty() {
            tracing::debug!(
                offset,
                count = updates.len(),
                body = %serde_json::to_string_pretty(&updates).unwrap_or_default(),
                "received updates"
            );
            for message in updates.iter().filter_map(|u| u.message.as_ref()) {
                tracing::debug!(
                    chat_id = message.chat.id,
                    from = message.from.as_ref().map_or("", |u| u.first_name.as_str()),
                    text = message.text.as_deref().unwrap_or(""),
                    "incoming message"
                );
            }
        }

        Ok(updates)
    }

    /// Sends a text message and returns its message id.
    ///
    /// Text longer than [`MAX_MESSAGE_CHARS`] is cut and suffixed with `...`.
    ///
    /// # Errors
    ///
    /// Any network, HTTP or decoding failure, or an `ok: false` response.
    pub fn send_message(&self, chat_id: i64, text: &str, options: &SendOptions) -> Result<i64, FetchError> {
        let payload = message_payload(chat_id, text, options)?;
        let message: Message = self.call("sendMessage", &payload)?;
        Ok(message.message_id)
    }

    /// Replaces the text of a sent message and returns its message id.
    ///
    /// Text longer than [`MAX_EDIT_CHARS`] is cut and suffixed with `...`.
    ///
    /// # Errors
    ///
    /// Any network, HTTP or decoding failure, or an `ok: false` response.
    pub fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        options: &SendOptions,
    ) -> Result<i64, FetchError> {
        let mut payload = Map::new();
        payload.insert("chat_id".to_string(), json!(chat_id));
        payload.insert("message_id".to_string(), json!(message_id));
        payload.insert("text".to_string(), json!(truncate(text, MAX_EDIT_CHARS)));
        options.apply(&mut payload)?;

        // Inline edits answer `true` instead of a message; chat edits always return the message.
        let message: Message = self.call("editMessageText", &Value::Object(payload))?;
        Ok(message.message_id)
    }

    /// Deletes a message.
    ///
    /// # Errors
    ///
    /// Any network, HTTP or decoding failure, or an `ok: false` response.
    pub fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<(), FetchError> {
        let _: bool = self.call("deleteMessage", &json!({ "chat_id": chat_id, "message_id": message_id }))?;
        Ok(())
    }

    /// Sends an animated dice and returns its message id.
    ///
    /// # Errors
    ///
    /// Any network, HTTP or decoding failure, or an `ok: false` response.
    pub fn send_dice(&self, chat_id: i64, emoji: &str, options: &SendOptions) -> Result<i64, FetchError> {
        let mut payload = Map::new();
        payload.insert("chat_id".to_string(), json!(chat_id));
        payload.insert("emoji".to_string(), json!(emoji));
        options.apply(&mut payload)?;
        payload.remove("parse_mode");

        let message: Message = self.call("sendDice", &Value::Object(payload))?;
        Ok(message.message_id)
    }

    /// Sends a photo and returns its message id.
    ///
    /// # Errors
    ///
    /// Fails if a local file cannot be read, on any network, HTTP or decoding
    /// failure, or on an `ok: false` response.
    pub fn send_photo(
        &self,
        chat_id: i64,
        photo: &PhotoInput,
        caption: Option<&str>,
        options: &SendOptions,
    ) -> Result<i64, FetchError> {
        let message: Message = match photo {
            PhotoInput::FileId(id) | PhotoInput::Url(id) => {
                let mut payload = Map::new();
                payload.insert("chat_id".to_string(), json!(chat_id));
                payload.insert("photo".to_string(), json!(id));
                if let Some(caption) = caption.filter(|c| !c.is_empty()) {
                    payload.insert("caption".to_string(), json!(caption));
                }
                options.apply(&mut payload)?;
                self.call("sendPhoto", &Value::Object(payload))?
            }
            PhotoInput::Path(path) => {
                let mut form = multipart::Form::new()
                    .text("chat_id", chat_id.to_string())
                    .file("photo", path)?;
                if let Some(caption) = caption.filter(|c| !c.is_empty()) {
                    form = form.text("caption", caption.to_string());
                }
                form = options.apply_form(form)?;

                let resp = self.http.post(self.method_url("sendPhoto")).multipart(form).send()?;
                Self::decode("sendPhoto", resp)?
            }
        };
        Ok(message.message_id)
    }

    /// Acknowledges a callback query, optionally showing `text` to the user.
    ///
    /// # Errors
    ///
    /// Any network, HTTP or decoding failure, or an `ok: false` response.
    pub fn answer_callback_query(&self, callback_query_id: &str, text: Option<&str>, show_alert: bool) -> Result<(), FetchError> {
        let mut payload = Map::new();
        payload.insert("callback_query_id".to_string(), json!(callback_query_id));
        if let Some(text) = text {
            payload.insert("text".to_string(), json!(text));
        }
        payload.insert("show_alert".to_string(), json!(show_alert));

        let _: bool = self.call("answerCallbackQuery", &Value::Object(payload))?;
        Ok(())
    }

    /// Resolves a file id to its metadata.
    ///
    /// # Errors
    ///
    /// Any network, HTTP or decoding failure, or an `ok: false` response.
    pub fn get_file(&self, file_id: &str) -> Result<File, FetchError> {
        self.call("getFile", &json!({ "file_id": file_id }))
    }

    /// Downloads the contents of a file by id.
    ///
    /// # Errors
    ///
    /// Any network, HTTP or decoding failure, an `ok: false` response, or a
    /// file without a download path.
    pub fn download_file(&self, file_id: &str) -> Result<Vec<u8>, FetchError> {
        let file = self.get_file(file_id)?;
        let path = file.file_path.ok_or_else(|| FetchError::Parse {
            message: format!("getFile: no file_path for {file_id}"),
        })?;

        let url = format!("{}/file/bot{}/{path}", self.config.api_url, self.config.token);
        let mut resp = self.http.get(url).send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Api {
                code: i64::from(status.as_u16()),
                description: format!("file download failed for {file_id}"),
            });
        }

        let mut bytes = Vec::new();
        resp.read_to_end(&mut bytes)?;
        Ok(bytes)
    }
}

fn message_payload(chat_id: i64, text: &str, options: &SendOptions) -> Result<Value, FetchError> {
    let mut payload = Map::new();
    payload.insert("chat_id".to_string(), json!(chat_id));
    payload.insert("text".to_string(), json!(truncate(text, MAX_MESSAGE_CHARS)));
    options.apply(&mut payload)?;
    Ok(Value::Object(payload))
}

impl UpdateSource<Update> for TelegramClient {
    fn fetch(&self, cursor: i64) -> Result<Vec<Update>, FetchError> {
        self.get_updates(cursor)
    }
}

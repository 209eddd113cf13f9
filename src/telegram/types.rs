//! Telegram Bot API types used by the engine and the client.
//!
//! Only the fields this crate works with are modelled; unknown fields in the
//! JSON are ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::source::Event;
use crate::store::Record;
use crate::value::FieldValue;

/// Envelope around every Bot API response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    /// False when the call failed; `error_code` and `description` explain why.
    pub ok: bool,
    /// Payload of a successful call.
    pub result: Option<T>,
    /// Bot API error code.
    #[serde(default)]
    pub error_code: Option<i64>,
    /// Human-readable error description.
    #[serde(default)]
    pub description: Option<String>,
}

/// One incoming update from `getUpdates`.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_post: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_channel_post: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_query: Option<CallbackQuery>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub my_chat_member: Option<ChatMemberUpdated>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_member: Option<ChatMemberUpdated>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_join_request: Option<ChatJoinRequest>,
}

impl Update {
    /// The message carried by this update, whichever kind it is.
    #[must_use]
    pub fn message(&self) -> Option<&Message> {
        self.message
            .as_ref()
            .or(self.edited_message.as_ref())
            .or(self.channel_post.as_ref())
            .or(self.edited_channel_post.as_ref())
            .or_else(|| self.callback_query.as_ref().and_then(|q| q.message.as_ref()))
    }

    /// Chat the update belongs to, if any.
    #[must_use]
    pub fn chat_id(&self) -> Option<i64> {
        if let Some(message) = self.message() {
            return Some(message.chat.id);
        }
        self.my_chat_member
            .as_ref()
            .or(self.chat_member.as_ref())
            .map(|m| m.chat.id)
            .or_else(|| self.chat_join_request.as_ref().map(|r| r.chat.id))
    }

    /// Text of a new (not edited) message.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.message.as_ref().and_then(|m| m.text.as_deref())
    }

    /// Payload of a callback query.
    #[must_use]
    pub fn callback_data(&self) -> Option<&str> {
        self.callback_query.as_ref().and_then(|q| q.data.as_deref())
    }

    /// Returns true if the update is a new message whose text starts with `/command`.
    ///
    /// Matches `/command`, `/command args` and `/command@botname`.
    #[must_use]
    pub fn is_command(&self, command: &str) -> bool {
        let Some(text) = self.text() else {
            return false;
        };
        let Some(head) = text.split_whitespace().next() else {
            return false;
        };
        let Some(name) = head.strip_prefix('/') else {
            return false;
        };
        name.split('@').next() == Some(command)
    }
}

impl Event for Update {
    fn sequence(&self) -> i64 {
        self.update_id
    }
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub message_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_thread_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_chat: Option<Chat>,
    pub chat: Chat,
    pub date: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<Vec<PhotoSize>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<Document>,
    #[serde(rename = "reply_to_message", default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<Box<Message>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<InlineKeyboardMarkup>,
}

impl Message {
    /// Send time, or `None` if the timestamp is out of range.
    #[must_use]
    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.date, 0)
    }

    /// Largest photo size attached, by pixel count.
    #[must_use]
    pub fn largest_photo(&self) -> Option<&PhotoSize> {
        self.photo
            .as_ref()
            .and_then(|sizes| sizes.iter().max_by_key(|p| u64::from(p.width) * u64::from(p.height)))
    }
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
}

impl Record for User {
    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "id" => Some(self.id.into()),
            "is_bot" => Some(self.is_bot.into()),
            "first_name" => Some(self.first_name.as_str().into()),
            "last_name" => Some(self.last_name.clone().into()),
            "username" => Some(self.username.clone().into()),
            "language_code" => Some(self.language_code.clone().into()),
            _ => None,
        }
    }
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_forum: Option<bool>,
}

impl Chat {
    /// Returns true for one-to-one chats with a user.
    #[must_use]
    pub fn is_private(&self) -> bool {
        self.kind == "private"
    }
}

impl Record for Chat {
    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "id" => Some(self.id.into()),
            "type" => Some(self.kind.as_str().into()),
            "title" => Some(self.title.clone().into()),
            "username" => Some(self.username.clone().into()),
            "first_name" => Some(self.first_name.clone().into()),
            "last_name" => Some(self.last_name.clone().into()),
            _ => None,
        }
    }
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_message_id: Option<String>,
    #[serde(default)]
    pub chat_instance: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
    pub file_unique_id: String,
    pub width: u32,
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub file_id: String,
    pub file_unique_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
}

/// Membership change of a user (or the bot itself) in a chat.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatMemberUpdated {
    pub chat: Chat,
    pub from: User,
    pub date: i64,
    pub old_chat_member: ChatMember,
    pub new_chat_member: ChatMember,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatMember {
    pub status: String,
    pub user: User,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatJoinRequest {
    pub chat: Chat,
    pub from: User,
    pub date: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

/// Result of `getFile`.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct File {
    pub file_id: String,
    pub file_unique_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_app: Option<WebAppInfo>,
}

impl InlineKeyboardButton {
    /// Button that sends `data` back as a callback query.
    #[must_use]
    pub fn callback(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: Some(data.into()),
            ..Self::default()
        }
    }

    /// Button that opens `url`.
    #[must_use]
    pub fn link(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            url: Some(url.into()),
            ..Self::default()
        }
    }
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebAppInfo {
    pub url: String,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplyKeyboardMarkup {
    pub keyboard: Vec<Vec<KeyboardButton>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub resize_keyboard: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub one_time_keyboard: bool,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyboardButton {
    pub text: String,
}

/// Asks the client to hide the current reply keyboard.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyKeyboardRemove {
    pub remove_keyboard: bool,
}

impl Default for ReplyKeyboardRemove {
    fn default() -> Self {
        Self { remove_keyboard: true }
    }
}

/// Any of the keyboards a message can carry.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReplyMarkup {
    Inline(InlineKeyboardMarkup),
    Reply(ReplyKeyboardMarkup),
    Remove(ReplyKeyboardRemove),
}

impl From<InlineKeyboardMarkup> for ReplyMarkup {
    fn from(v: InlineKeyboardMarkup) -> Self {
        Self::Inline(v)
    }
}

impl From<ReplyKeyboardMarkup> for ReplyMarkup {
    fn from(v: ReplyKeyboardMarkup) -> Self {
        Self::Reply(v)
    }
}

impl From<ReplyKeyboardRemove> for ReplyMarkup {
    fn from(v: ReplyKeyboardRemove) -> Self {
        Self::Remove(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UPDATES: &str = r#"{
        "ok": true,
        "result": [
            {
                "update_id": 815,
                "message": {
                    "message_id": 31,
                    "from": {"id": 7, "is_bot": false, "first_name": "Ann", "username": "ann"},
                    "chat": {"id": 7, "type": "private", "first_name": "Ann"},
                    "date": 1700000000,
                    "text": "/start@echo_bot hello",
                    "entities": [{"offset": 0, "length": 15, "type": "bot_command"}]
                }
            },
            {
                "update_id": 816,
                "callback_query": {
                    "id": "cb-1",
                    "from": {"id": 7, "is_bot": false, "first_name": "Ann"},
                    "chat_instance": "ci",
                    "data": "again",
                    "message": {
                        "message_id": 32,
                        "chat": {"id": -100, "type": "supergroup", "title": "Room"},
                        "date": 1700000005
                    }
                }
            }
        ]
    }"#;

    fn parsed() -> Vec<Update> {
        let resp: ApiResponse<Vec<Update>> = serde_json::from_str(UPDATES).unwrap();
        assert!(resp.ok);
        resp.result.unwrap()
    }

    #[test]
    fn test_parse_updates_and_sequence() {
        let updates = parsed();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].sequence(), 815);
        assert_eq!(updates[1].sequence(), 816);
    }

    #[test]
    fn test_message_helpers() {
        let updates = parsed();
        let first = &updates[0];
        assert_eq!(first.chat_id(), Some(7));
        assert_eq!(first.text(), Some("/start@echo_bot hello"));
        assert!(first.is_command("start"));
        assert!(!first.is_command("help"));
        assert!(first.message().unwrap().chat.is_private());
        assert_eq!(
            first.message().unwrap().sent_at().unwrap().timestamp(),
            1_700_000_000
        );
    }

    #[test]
    fn test_callback_helpers() {
        let updates = parsed();
        let cb = &updates[1];
        assert_eq!(cb.callback_data(), Some("again"));
        assert_eq!(cb.chat_id(), Some(-100));
        assert_eq!(cb.text(), None);
        assert!(!cb.is_command("start"));
    }

    #[test]
    fn test_error_envelope() {
        let resp: ApiResponse<Vec<Update>> =
            serde_json::from_str(r#"{"ok":false,"error_code":401,"description":"Unauthorized"}"#).unwrap();
        assert!(!resp.ok);
        assert!(resp.result.is_none());
        assert_eq!(resp.error_code, Some(401));
    }

    #[test]
    fn test_user_record_fields() {
        let user = parsed()[0].message().unwrap().from.clone().unwrap();
        assert_eq!(user.field("username"), Some(FieldValue::String("ann".to_string())));
        assert_eq!(user.field("last_name"), Some(FieldValue::Null));
        assert_eq!(user.field("nope"), None);
    }

    #[test]
    fn test_reply_markup_serializes_untagged() {
        let markup: ReplyMarkup = InlineKeyboardMarkup {
            inline_keyboard: vec![vec![InlineKeyboardButton::callback("Again", "again")]],
        }
        .into();
        let json = serde_json::to_value(&markup).unwrap();
        assert_eq!(json["inline_keyboard"][0][0]["callback_data"], "again");
        assert!(json["inline_keyboard"][0][0].get("url").is_none());

        let remove = serde_json::to_value(ReplyMarkup::from(ReplyKeyboardRemove::default())).unwrap();
        assert_eq!(remove, serde_json::json!({"remove_keyboard": true}));
    }

    #[test]
    fn test_largest_photo() {
        let message = Message {
            photo: Some(vec![
                PhotoSize { file_id: "s".into(), file_unique_id: "s".into(), width: 90, height: 60, file_size: None },
                PhotoSize { file_id: "l".into(), file_unique_id: "l".into(), width: 800, height: 600, file_size: None },
            ]),
            ..Message::default()
        };
        assert_eq!(message.largest_photo().unwrap().file_id, "l");
    }
}

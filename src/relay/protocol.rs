//! Relay wire shapes
//!
//! Frames are JSON text. Two shapes go out to peers:
//!
//! ```json
//! // acknowledgment of an echo request
//! {"status":"ok","retcode":0,"data":{"message_id":1253451396},"message":"","wording":"","echo":"abc"}
//!
//! // OneBot v11 style group message event
//! {"self_id":1000000,"user_id":111111111,"time":1739849686,"message_id":1253451396, ...,
//!  "message":[{"type":"at","data":{"qq":"1000000","name":"Eridanus"}}, ...],
//!  "message_format":"array","post_type":"message","group_id":879886836}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// Synthetic identity the relay presents to backend plugins.
///
/// These stand in for a real chat session. The defaults match what the
/// bundled front-end expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayIdentity {
    /// Account the bot runs as
    pub self_id: u64,
    /// Account the operator chats as
    pub user_id: u64,
    pub group_id: u64,
    /// Fixed id stamped on every event and acknowledgment
    pub message_id: u64,
    /// Sender nickname shown to plugins
    pub nickname: String,
    /// Display name in the leading mention fragment
    pub mention_name: String,
    pub font: u32,
}

impl Default for RelayIdentity {
    fn default() -> Self {
        Self {
            self_id: 1_000_000,
            user_id: 111_111_111,
            group_id: 879_886_836,
            message_id: 1_253_451_396,
            nickname: "主人".to_string(),
            mention_name: "Eridanus".to_string(),
            font: 14,
        }
    }
}

impl RelayIdentity {
    /// `{"type":"at","data":{"qq":"<self_id>","name":"<mention_name>"}}`
    pub fn mention(&self) -> Json {
        serde_json::json!({
            "type": "at",
            "data": {
                "qq": self.self_id.to_string(),
                "name": self.mention_name,
            }
        })
    }
}

/// Reply to an `echo` request, sent to every peer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Acknowledgment {
    pub status: String,
    pub retcode: i64,
    pub data: AckData,
    pub message: String,
    pub wording: String,
    pub echo: Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckData {
    pub message_id: u64,
}

impl Acknowledgment {
    pub fn new(identity: &RelayIdentity, echo: Json) -> Self {
        Self {
            status: "ok".to_string(),
            retcode: 0,
            data: AckData {
                message_id: identity.message_id,
            },
            message: String::new(),
            wording: String::new(),
            echo,
        }
    }
}

/// Sender block of a [`RelayEvent`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSender {
    pub user_id: u64,
    pub nickname: String,
    pub card: String,
    pub role: String,
    pub title: String,
}

/// Group message event broadcast to backend plugins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayEvent {
    pub self_id: u64,
    pub user_id: u64,
    pub time: i64,
    pub message_id: u64,
    pub real_id: u64,
    pub message_seq: u64,
    pub message_type: String,
    pub sender: EventSender,
    pub raw_message: String,
    pub font: u32,
    pub sub_type: String,
    pub message: Json,
    pub message_format: String,
    pub post_type: String,
    pub group_id: u64,
}

impl RelayEvent {
    pub fn new(identity: &RelayIdentity, time: i64, message: Json) -> Self {
        Self {
            self_id: identity.self_id,
            user_id: identity.user_id,
            time,
            message_id: identity.message_id,
            real_id: identity.message_id,
            message_seq: identity.message_id,
            message_type: "group".to_string(),
            sender: EventSender {
                user_id: identity.user_id,
                nickname: identity.nickname.clone(),
                card: String::new(),
                role: "member".to_string(),
                title: String::new(),
            },
            raw_message: String::new(),
            font: identity.font,
            sub_type: "normal".to_string(),
            message,
            message_format: "array".to_string(),
            post_type: "message".to_string(),
            group_id: identity.group_id,
        }
    }
}

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::models::{Comment, Post, PostType, Track};

/// Events sent from the server over the realtime channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// First frame on every connection: bounded snapshot of the feed.
    Welcome {
        message: String,
        posts: Vec<Post>,
        daily_playlist: Vec<Track>,
    },

    /// A post was accepted by the feed
    NewPost { post: Post },

    /// A comment or reaction was appended to a post
    CommentAdded {
        post_id: String,
        comment: Comment,
        new_interactions: u32,
    },

    /// A post was resolved or expired
    PostRemoved { post_id: String },

    /// Periodic decay lowered the engagement of some posts
    InteractionsDecayed { updates: Vec<InteractionUpdate> },

    HeartbeatAck,

    /// Unicast failure notice. Never broadcast.
    Error { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionUpdate {
    pub post_id: String,
    pub interactions: u32,
}

impl ServerEvent {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Wire name of the event, used for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Welcome { .. } => "welcome",
            Self::NewPost { .. } => "new_post",
            Self::CommentAdded { .. } => "comment_added",
            Self::PostRemoved { .. } => "post_removed",
            Self::InteractionsDecayed { .. } => "interactions_decayed",
            Self::HeartbeatAck => "heartbeat_ack",
            Self::Error { .. } => "error",
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Commands sent FROM client TO server.
///
/// Text fields default to empty so that a missing field surfaces as a
/// validation failure in the feed rather than a decode failure here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientCommand {
    NewPost {
        #[serde(default)]
        user: String,
        #[serde(default)]
        content: String,
        #[serde(default)]
        post_type: Option<PostType>,
    },

    /// Comments and quick reactions share this shape; a reaction is a
    /// comment whose text is the reaction glyph.
    NewComment {
        #[serde(default, deserialize_with = "text_or_number")]
        post_id: String,
        #[serde(default)]
        user: String,
        #[serde(default)]
        text: String,
    },

    Heartbeat,

    /// A playlist track started playing. Logged only.
    MusicPlayStart {
        #[serde(default, deserialize_with = "text_or_number")]
        song_id: String,
        #[serde(default)]
        user_id: Option<String>,
    },

    /// A playlist track played to the end; recorded for the play report.
    MusicPlayComplete {
        #[serde(default, deserialize_with = "text_or_number")]
        song_id: String,
        #[serde(default)]
        user_id: Option<String>,
        /// Seconds listened.
        #[serde(default)]
        duration: f64,
    },
}

impl ClientCommand {
    pub const KINDS: &'static [&'static str] = &[
        "new_post",
        "new_comment",
        "heartbeat",
        "music_play_start",
        "music_play_complete",
    ];
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid message: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("message has no type")]
    MissingType,

    #[error("unknown message type: {0}")]
    UnknownType(String),

    #[error("invalid payload: {0}")]
    InvalidPayload(#[source] serde_json::Error),
}

/// Parse and validate the shape of one inbound text frame.
pub fn decode_command(text: &str) -> Result<ClientCommand, DecodeError> {
    let value: Value = serde_json::from_str(text).map_err(DecodeError::Malformed)?;

    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or(DecodeError::MissingType)?;
    if !ClientCommand::KINDS.contains(&kind) {
        return Err(DecodeError::UnknownType(kind.to_string()));
    }

    serde_json::from_value(value).map_err(DecodeError::InvalidPayload)
}

/// Clients send post ids either as strings or as bare numbers.
fn text_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_new_post_without_post_type() {
        let cmd = decode_command(r#"{"type":"new_post","user":"bob","content":"hello"}"#).unwrap();
        assert_eq!(
            cmd,
            ClientCommand::NewPost {
                user: "bob".into(),
                content: "hello".into(),
                post_type: None,
            }
        );
    }

    #[test]
    fn decodes_explicit_composer_post_type() {
        let cmd =
            decode_command(r#"{"type":"new_post","user":"a","content":"x","postType":"composer"}"#)
                .unwrap();
        assert!(matches!(
            cmd,
            ClientCommand::NewPost { post_type: Some(PostType::Composer), .. }
        ));
    }

    #[test]
    fn accepts_numeric_post_id() {
        let cmd =
            decode_command(r#"{"type":"new_comment","postId":1700000000000,"user":"a","text":"hi"}"#)
                .unwrap();
        match cmd {
            ClientCommand::NewComment { post_id, .. } => assert_eq!(post_id, "1700000000000"),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let cmd = decode_command(r#"{"type":"new_comment"}"#).unwrap();
        assert_eq!(
            cmd,
            ClientCommand::NewComment {
                post_id: String::new(),
                user: String::new(),
                text: String::new(),
            }
        );
    }

    #[test]
    fn heartbeat_ignores_extra_fields() {
        let cmd = decode_command(r#"{"type":"heartbeat","ts":12}"#).unwrap();
        assert_eq!(cmd, ClientCommand::Heartbeat);
    }

    #[test]
    fn decodes_play_events() {
        let cmd = decode_command(
            r#"{"type":"music_play_complete","songId":3,"userId":"bob","duration":182.5}"#,
        )
        .unwrap();
        assert_eq!(
            cmd,
            ClientCommand::MusicPlayComplete {
                song_id: "3".into(),
                user_id: Some("bob".into()),
                duration: 182.5,
            }
        );

        let cmd = decode_command(r#"{"type":"music_play_start","songId":"day-1"}"#).unwrap();
        assert_eq!(
            cmd,
            ClientCommand::MusicPlayStart {
                song_id: "day-1".into(),
                user_id: None,
            }
        );
    }

    #[test]
    fn rejects_garbage_and_unknown_types() {
        assert!(matches!(decode_command("not json"), Err(DecodeError::Malformed(_))));
        assert!(matches!(decode_command(r#"{"user":"a"}"#), Err(DecodeError::MissingType)));
        assert!(matches!(
            decode_command(r#"{"type":"music_pause"}"#),
            Err(DecodeError::UnknownType(t)) if t == "music_pause"
        ));
        assert!(matches!(
            decode_command(r#"{"type":"new_post","user":42}"#),
            Err(DecodeError::InvalidPayload(_))
        ));
    }

    #[test]
    fn comment_added_uses_camel_case_fields() {
        let event = ServerEvent::CommentAdded {
            post_id: "1".into(),
            comment: Comment {
                user: "alice".into(),
                text: "hi".into(),
                timestamp: 5,
            },
            new_interactions: 3,
        };
        let value: Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "comment_added",
                "postId": "1",
                "comment": { "user": "alice", "text": "hi", "timestamp": 5 },
                "newInteractions": 3
            })
        );
    }

    #[test]
    fn unit_events_carry_only_their_tag() {
        assert_eq!(ServerEvent::HeartbeatAck.to_json().unwrap(), r#"{"type":"heartbeat_ack"}"#);
        assert_eq!(
            ServerEvent::error("nope").to_json().unwrap(),
            r#"{"type":"error","message":"nope"}"#
        );
    }

    #[test]
    fn post_omits_unset_optional_fields() {
        let post = Post {
            id: "7".into(),
            user: "bob".into(),
            content: "hello".into(),
            post_type: PostType::General,
            interactions: 0,
            comments: vec![],
            timestamp: 7,
            status: Default::default(),
            is_persistent: false,
            expires_at: None,
        };
        let value = serde_json::to_value(ServerEvent::NewPost { post }).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "new_post",
                "post": {
                    "id": "7",
                    "user": "bob",
                    "content": "hello",
                    "postType": "general",
                    "interactions": 0,
                    "comments": [],
                    "timestamp": 7,
                    "status": "active"
                }
            })
        );
    }
}

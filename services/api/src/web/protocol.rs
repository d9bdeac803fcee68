//! services/api/src/web/protocol.rs
//!
//! Control messages exchanged over the realtime socket. Domain events travel
//! as `RealtimeEvent`; these cover the client's own bookkeeping.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

//=========================================================================================
// Messages Sent FROM the Client TO the Server
//=========================================================================================

#[derive(Deserialize, Debug, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Subscribe this connection to the named user's room; `null` is a no-op.
    JoinRoom(Option<Uuid>),
}

impl ClientMessage {
    /// Parses a text frame; anything unrecognized yields `None`.
    pub fn parse(text: &str) -> Option<Self> {
        serde_json::from_str(text).ok()
    }
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client
//=========================================================================================

#[derive(Serialize, Debug, Clone)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerMessage {
    #[serde(rename_all = "camelCase")]
    RoomJoined { user_id: Uuid },
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_join_room() {
        let id = Uuid::new_v4();
        let text = format!(r#"{{"event":"join-room","data":"{id}"}}"#);
        assert_eq!(ClientMessage::parse(&text), Some(ClientMessage::JoinRoom(Some(id))));
        assert_eq!(
            ClientMessage::parse(r#"{"event":"join-room","data":null}"#),
            Some(ClientMessage::JoinRoom(None))
        );
    }

    #[test]
    fn ignores_unknown_or_malformed_frames() {
        assert_eq!(ClientMessage::parse(r#"{"event":"dance","data":1}"#), None);
        assert_eq!(ClientMessage::parse(r#"{"event":"join-room","data":"nope"}"#), None);
        assert_eq!(ClientMessage::parse("not json"), None);
    }

    #[test]
    fn server_messages_use_event_envelope() {
        let json = serde_json::to_string(&ServerMessage::Error {
            message: "denied".to_string(),
        })
        .unwrap();
        assert_eq!(json, r#"{"event":"error","data":{"message":"denied"}}"#);
    }
}

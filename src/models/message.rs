//! The chat message frame exchanged with clients and round-tripped through the bus.

use serde::{Deserialize, Serialize};

/// A chat message scoped to a channel. This is both the client wire frame and
/// the bus payload for channel topics; it only exists in flight, the core
/// never persists it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub content: String,
    pub channel_id: i64,
    /// Display name of the sender. Must match the session's authenticated
    /// identity or the frame is dropped.
    pub username: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_uses_camel_case_channel_id() {
        let msg = Message {
            content: "hi".to_string(),
            channel_id: 5,
            username: "alice".to_string(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["channelId"], 5);
        assert_eq!(json["content"], "hi");
        assert_eq!(json["username"], "alice");
    }

    #[test]
    fn frame_decodes() {
        let msg: Message =
            serde_json::from_str(r#"{"content":"hi","channelId":5,"username":"alice"}"#).unwrap();
        assert_eq!(msg.channel_id, 5);
        assert_eq!(msg.username, "alice");
    }
}

//! Test fixtures and frame generators
//!
//! Provides the server-side gateway frames tests push at the client.

use serde_json::{json, Value};

/// Token every test client authenticates with
pub const TEST_TOKEN: &str = "test-token";

/// Session ID issued by `ready`
pub const TEST_SESSION: &str = "session-abc";

/// User ID of the bot in `ready`
pub const BOT_ID: &str = "1000";

/// Heartbeat interval long enough that no test trips it by accident
pub const LONG_INTERVAL_MS: u64 = 45_000;

pub fn hello(interval_ms: u64) -> Value {
    json!({"op": 10, "d": {"heartbeat_interval": interval_ms}})
}

pub fn heartbeat_ack() -> Value {
    json!({"op": 11, "d": null})
}

pub fn heartbeat_request() -> Value {
    json!({"op": 1, "d": null})
}

pub fn reconnect() -> Value {
    json!({"op": 7, "d": null})
}

pub fn invalid_session(resumable: bool) -> Value {
    json!({"op": 9, "d": resumable})
}

pub fn ready(seq: u64) -> Value {
    dispatch(
        "READY",
        seq,
        json!({
            "v": 10,
            "session_id": TEST_SESSION,
            "resume_gateway_url": "wss://resume.test",
            "user": {"id": BOT_ID, "username": "mention-bot", "discriminator": "0", "bot": true},
            "guilds": []
        }),
    )
}

pub fn resumed(seq: u64) -> Value {
    dispatch("RESUMED", seq, Value::Null)
}

pub fn dispatch(name: &str, seq: u64, data: Value) -> Value {
    json!({"op": 0, "s": seq, "t": name, "d": data})
}

/// A MESSAGE_CREATE from a human that mentions the bot
pub fn message_create(seq: u64, content: &str) -> Value {
    dispatch(
        "MESSAGE_CREATE",
        seq,
        json!({
            "id": format!("msg-{seq}"),
            "channel_id": "200",
            "guild_id": "300",
            "author": {"id": "42", "username": "human", "discriminator": "0"},
            "content": content,
            "mentions": [{"id": BOT_ID, "username": "mention-bot", "bot": true}]
        }),
    )
}

//! Identity, channel, and membership records.
//!
//! Channels and memberships are persisted by an external collaborator (see
//! [`crate::repositories`]); the hub only indexes them in memory while the
//! owning session is connected.

use serde::{Deserialize, Serialize};

/// Authenticated identity of a connecting client, established by the
/// embedding layer before it hands the transport to the hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i64,
    pub username: String,
}

/// A (user, channel) binding. Immutable once created; also the bus payload
/// on the membership topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub id: i64,
    pub user_id: i64,
    pub channel_id: i64,
}

/// A named channel. The core never mutates channels, it only publishes
/// messages tagged with a channel id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: i64,
    pub name: String,
}

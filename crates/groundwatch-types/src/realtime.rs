//! Wire shapes for the live WebSocket feed.
//!
//! Outbound traffic is either the one-time [`ServerMessage::Connected`]
//! greeting or a [`BroadcastEnvelope`] carrying an incident lifecycle
//! event. Inbound traffic is limited to [`ClientMessage::Subscribe`]
//! control frames; anything else a client sends is ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{Channel, EventKind};

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// One published event as delivered to a subscribed connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct BroadcastEnvelope {
    /// Which topic the event belongs to.
    pub channel: Channel,
    /// What happened to the record.
    pub event: EventKind,
    /// The full record for `created`/`updated`, or `{"id": ...}` for
    /// `deleted`.
    pub data: serde_json::Value,
    /// When the event was published (UTC).
    pub timestamp: DateTime<Utc>,
}

impl BroadcastEnvelope {
    /// Build an envelope stamped with `now`.
    pub const fn new(
        channel: Channel,
        event: EventKind,
        data: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            channel,
            event,
            data,
            timestamp: now,
        }
    }
}

/// Control frames the server sends outside the envelope stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Sent once, immediately after the socket opens.
    Connected {
        /// Human-readable confirmation.
        message: String,
    },
}

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// Control frames a client may send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Replace the connection's channel filter.
    ///
    /// An absent or empty list means "receive everything".
    Subscribe {
        /// Channels to receive going forward.
        #[serde(default)]
        channels: Option<Vec<Channel>>,
    },
}

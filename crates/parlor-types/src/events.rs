use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Cursor, Message, ReactionDraft, User, UserId};

/// Addressee of a peer-to-peer event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerRef {
    pub id: UserId,
    #[serde(default)]
    pub sid: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerName {
    pub username: String,
}

/// Events carried by the channel, in both directions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload")]
pub enum ChannelEvent {
    /// A new chat message
    #[serde(rename = "message")]
    Message(Message),

    /// A message's text was edited
    #[serde(rename = "channel:edition")]
    Edition {
        id: Uuid,
        message: String,
        #[serde(default, with = "crate::models::timestamp::option")]
        modified_at: Option<DateTime<Utc>>,
        #[serde(default)]
        modified_id: Option<UserId>,
    },

    /// A message was deleted
    #[serde(rename = "channel:deletion")]
    Deletion { id: Uuid },

    /// An emoji reaction was added to a message
    #[serde(rename = "channel:reaction")]
    Reaction { id: Uuid, reaction: ReactionDraft },

    /// A participant joined or changed status
    #[serde(rename = "channel:status")]
    Status { user: User },

    /// A private note addressed to one participant
    #[serde(rename = "channel:whisper")]
    Whisper {
        to: PeerRef,
        from: PeerName,
        whisper: String,
    },

    /// The sender blocked the addressee
    #[serde(rename = "channel:block")]
    Block { to: PeerRef, from: PeerName },

    /// A participant's pointer moved
    #[serde(rename = "cursor:move")]
    CursorMove(Cursor),
}

impl ChannelEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Message(_) => "message",
            Self::Edition { .. } => "channel:edition",
            Self::Deletion { .. } => "channel:deletion",
            Self::Reaction { .. } => "channel:reaction",
            Self::Status { .. } => "channel:status",
            Self::Whisper { .. } => "channel:whisper",
            Self::Block { .. } => "channel:block",
            Self::CursorMove(_) => "cursor:move",
        }
    }

    /// Whether the event belongs to a room. Whispers and blocks are
    /// addressed to a user and travel without a room.
    pub fn is_room_scoped(&self) -> bool {
        !matches!(self, Self::Whisper { .. } | Self::Block { .. })
    }
}

/// One frame on the channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub room: Option<Uuid>,
    /// Session that emitted the frame. Lets a session ignore its own echoes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<Uuid>,
    #[serde(flatten)]
    pub event: ChannelEvent,
}

impl Envelope {
    pub fn new(room: Uuid, origin: Uuid, event: ChannelEvent) -> Self {
        let room = event.is_room_scoped().then_some(room);
        Self {
            room,
            origin: Some(origin),
            event,
        }
    }
}

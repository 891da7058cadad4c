use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Participant ids are integers assigned by the backend on registration.
pub type UserId = i64;

/// Connectivity/activity classification shared with every peer.
///
/// Blocking is deliberately absent: it is a relation local to the viewer,
/// not something a peer can observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Online,
    Offline,
    Idle,
    Typing,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
            Self::Idle => "idle",
            Self::Typing => "typing",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub status: Status,
    /// Connection id. One user can hold several at once (tabs).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    pub id: u32,
    pub chat_id: Uuid,
    pub sender_id: UserId,
    pub emoji: String,
    pub count: u32,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

/// A reaction before the store has given it a per-message index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionDraft {
    pub chat_id: Uuid,
    pub sender_id: UserId,
    pub emoji: String,
    #[serde(default = "default_count")]
    pub count: u32,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

fn default_count() -> u32 {
    1
}

impl ReactionDraft {
    pub fn into_reaction(self, id: u32) -> Reaction {
        Reaction {
            id,
            chat_id: self.chat_id,
            sender_id: self.sender_id,
            emoji: self.emoji,
            count: self.count,
            created_at: self.created_at,
        }
    }
}

impl From<Reaction> for ReactionDraft {
    fn from(r: Reaction) -> Self {
        Self {
            chat_id: r.chat_id,
            sender_id: r.sender_id,
            emoji: r.emoji,
            count: r.count,
            created_at: r.created_at,
        }
    }
}

/// A chat entry in a room's log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub sender_id: UserId,
    pub room_id: Uuid,
    #[serde(rename = "message")]
    pub text: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub modified_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub modified_id: Option<UserId>,
    /// Sender snapshot embedded by the REST API.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player: Option<User>,
    #[serde(default)]
    pub reactions: Vec<Reaction>,
    /// Set while an optimistic local copy waits for the backend.
    #[serde(skip)]
    pub pending: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cursor {
    pub user_id: UserId,
    pub x: f64,
    pub y: f64,
    pub color: String,
    pub room: Uuid,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub logo: Option<String>,
}

/// Timestamps arrive either as RFC 3339 or as the backend's naive
/// "YYYY-MM-DD HH:MM:SS" form, which is UTC.
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    const NAIVE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        raw.parse::<DateTime<Utc>>().ok().or_else(|| {
            NaiveDateTime::parse_from_str(raw, NAIVE_FORMAT)
                .map(|ndt| ndt.and_utc())
                .ok()
        })
    }

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&ts.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("bad timestamp '{}'", raw)))
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(ts: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error> {
            match ts {
                Some(ts) => s.serialize_str(&ts.to_rfc3339()),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            d: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            match Option::<String>::deserialize(d)? {
                Some(raw) => super::parse(&raw)
                    .map(Some)
                    .ok_or_else(|| serde::de::Error::custom(format!("bad timestamp '{}'", raw))),
                None => Ok(None),
            }
        }
    }
}

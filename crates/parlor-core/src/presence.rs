use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

use parlor_types::models::{Status, User, UserId};

/// How many typing participants are listed by name.
const TYPING_SHOWN: usize = 6;
/// Cap on the "+N" overflow counter.
const TYPING_OVERFLOW_CAP: usize = 9;

/// What an inbound presence update did to the roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Joined,
    Updated,
    Unchanged,
}

/// Host page visibility as observed locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

/// Roster of the room, keyed by participant id, in join order.
#[derive(Debug, Clone, Default)]
pub struct PresenceTracker {
    participants: Vec<User>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the roster with the backend's player list.
    pub fn load(&mut self, users: Vec<User>) {
        self.participants = users;
    }

    /// Insert an unknown participant whole; for a known one take only
    /// `status` and, when given, `sid`. Identity fields are fixed after the
    /// first insert so a stale status broadcast cannot clobber them.
    pub fn upsert(&mut self, user: User) -> Upsert {
        match self.participants.iter_mut().find(|p| p.id == user.id) {
            None => {
                debug!("{} ({}) joined as {}", user.username, user.id, user.status.as_str());
                self.participants.push(user);
                Upsert::Joined
            }
            Some(existing) => {
                let sid_changed = user.sid.is_some() && user.sid != existing.sid;
                if existing.status == user.status && !sid_changed {
                    return Upsert::Unchanged;
                }
                existing.status = user.status;
                if sid_changed {
                    existing.sid = user.sid;
                }
                Upsert::Updated
            }
        }
    }

    /// Change one participant's status. Returns false for unknown ids.
    pub fn set_status(&mut self, id: UserId, status: Status) -> bool {
        match self.participants.iter_mut().find(|p| p.id == id) {
            Some(p) => {
                p.status = status;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: UserId) -> Option<&User> {
        self.participants.iter().find(|p| p.id == id)
    }

    pub fn status_of(&self, id: UserId) -> Option<Status> {
        self.get(id).map(|p| p.status)
    }

    pub fn participants(&self) -> &[User] {
        &self.participants
    }

    pub fn online_count(&self) -> usize {
        self.participants
            .iter()
            .filter(|p| p.status == Status::Online)
            .count()
    }

    /// Who is typing, other than `me`.
    pub fn typing(&self, me: UserId) -> TypingSummary {
        let typing: Vec<&User> = self
            .participants
            .iter()
            .filter(|p| p.id != me && p.status == Status::Typing)
            .collect();

        TypingSummary {
            count: typing.len(),
            shown: typing.iter().take(TYPING_SHOWN).map(|p| (*p).clone()).collect(),
            overflow: typing.len().saturating_sub(TYPING_SHOWN).min(TYPING_OVERFLOW_CAP),
        }
    }

    /// The roster as seen by a viewer with the given block list.
    pub fn roster(&self, blocks: &BlockList) -> Vec<RosterEntry> {
        self.participants
            .iter()
            .map(|p| RosterEntry {
                user: p.clone(),
                blocked: blocks.is_blocked(p.id),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TypingSummary {
    pub count: usize,
    pub shown: Vec<User>,
    pub overflow: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RosterEntry {
    pub user: User,
    pub blocked: bool,
}

/// Peers this session has blocked. Private to the viewer; never broadcast
/// as a status.
#[derive(Debug, Clone, Default)]
pub struct BlockList {
    blocked: HashSet<UserId>,
}

impl BlockList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the peer was already blocked.
    pub fn block(&mut self, id: UserId) -> bool {
        self.blocked.insert(id)
    }

    pub fn unblock(&mut self, id: UserId) -> bool {
        self.blocked.remove(&id)
    }

    pub fn is_blocked(&self, id: UserId) -> bool {
        self.blocked.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.blocked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocked.is_empty()
    }
}

use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

use parlor_types::models::{Cursor, Status, UserId};

use crate::debounce::Debounce;
use crate::presence::{BlockList, PresenceTracker};

/// Identity stamped on every outbound pointer sample.
#[derive(Debug, Clone, PartialEq)]
pub struct CursorOwner {
    pub user_id: UserId,
    pub username: String,
    pub color: String,
    pub room: Uuid,
}

#[derive(Debug, Clone)]
struct RemoteCursor {
    cursor: Cursor,
    last_seen: Instant,
}

/// A remote cursor ready for a renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisibleCursor {
    pub cursor: Cursor,
    /// The owner is idle; draw with reduced emphasis.
    pub dimmed: bool,
}

/// Local pointer sampling and the cache of remote pointers.
#[derive(Debug)]
pub struct CursorBoard {
    owner: CursorOwner,
    outbound: Debounce<(f64, f64)>,
    local: Option<(f64, f64)>,
    remote: Vec<RemoteCursor>,
    ttl: Option<Duration>,
}

impl CursorBoard {
    pub fn new(owner: CursorOwner, debounce: Duration, ttl: Option<Duration>) -> Self {
        Self {
            owner,
            outbound: Debounce::new(debounce),
            local: None,
            remote: Vec::new(),
            ttl,
        }
    }

    /// Record a native pointer move. Only the last sample of a quiet
    /// window is broadcast.
    pub fn on_local_move(&mut self, x: f64, y: f64, now: Instant) {
        self.local = Some((x, y));
        self.outbound.push((x, y), now);
    }

    pub fn local(&self) -> Option<(f64, f64)> {
        self.local
    }

    /// The sample to broadcast, once the debounce window has elapsed.
    pub fn poll_outbound(&mut self, now: Instant) -> Option<Cursor> {
        let (x, y) = self.outbound.poll(now)?;
        Some(Cursor {
            user_id: self.owner.user_id,
            x,
            y,
            color: self.owner.color.clone(),
            room: self.owner.room,
            username: self.owner.username.clone(),
        })
    }

    /// Upsert a peer's pointer: coordinates are replaced, identity fields
    /// kept from the first sample. Own echoes and other rooms are ignored.
    pub fn apply_remote(&mut self, cursor: Cursor, now: Instant) -> bool {
        if cursor.user_id == self.owner.user_id || cursor.room != self.owner.room {
            return false;
        }

        match self.remote.iter_mut().find(|c| c.cursor.user_id == cursor.user_id) {
            Some(existing) => {
                existing.cursor.x = cursor.x;
                existing.cursor.y = cursor.y;
                existing.last_seen = now;
            }
            None => self.remote.push(RemoteCursor {
                cursor,
                last_seen: now,
            }),
        }
        true
    }

    /// Drop cursors not refreshed within the configured TTL. Without a TTL
    /// nothing is ever evicted.
    pub fn evict_stale(&mut self, now: Instant) -> usize {
        let Some(ttl) = self.ttl else {
            return 0;
        };
        let before = self.remote.len();
        self.remote
            .retain(|c| now.saturating_duration_since(c.last_seen) < ttl);
        let evicted = before - self.remote.len();
        if evicted > 0 {
            debug!("evicted {} stale cursors", evicted);
        }
        evicted
    }

    /// Earliest instant at which `poll_outbound` or `evict_stale` has work.
    pub fn next_deadline(&self) -> Option<Instant> {
        let expiry = self.ttl.and_then(|ttl| {
            self.remote
                .iter()
                .map(|c| c.last_seen + ttl)
                .min()
        });
        match (self.outbound.deadline(), expiry) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Cursors to draw: offline and blocked owners are hidden, idle ones
    /// dimmed. Owners missing from the roster are shown.
    pub fn visible(&self, presence: &PresenceTracker, blocks: &BlockList) -> Vec<VisibleCursor> {
        self.remote
            .iter()
            .filter(|c| !blocks.is_blocked(c.cursor.user_id))
            .filter_map(|c| {
                let status = presence.status_of(c.cursor.user_id);
                match status {
                    Some(Status::Offline) => None,
                    _ => Some(VisibleCursor {
                        cursor: c.cursor.clone(),
                        dimmed: status == Some(Status::Idle),
                    }),
                }
            })
            .collect()
    }

    pub fn remote_len(&self) -> usize {
        self.remote.len()
    }

    /// Teardown: forget the unsent sample.
    pub fn cancel(&mut self) {
        self.outbound.cancel();
    }
}

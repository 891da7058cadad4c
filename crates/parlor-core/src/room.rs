use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use parlor_types::events::{ChannelEvent, Envelope, PeerName, PeerRef};
use parlor_types::models::{Message, Status, User, UserId};

use crate::cursor::{CursorBoard, CursorOwner, VisibleCursor};
use crate::notice::Notice;
use crate::presence::{BlockList, PresenceTracker, RosterEntry, TypingSummary, Visibility};
use crate::reconcile::{Ack, Reconciler, RollbackPolicy, Write, WriteOp};
use crate::typing::TypingSignaler;

/// Tunables of one room session.
#[derive(Debug, Clone, PartialEq)]
pub struct CoreConfig {
    /// Quiet interval that ends a typing burst.
    pub typing_quiet: Duration,
    /// Debounce window of outbound pointer samples.
    pub cursor_debounce: Duration,
    /// Evict remote cursors silent for this long. `None` keeps them forever.
    pub cursor_ttl: Option<Duration>,
    /// Status announced while the host page is hidden (`Idle` or `Offline`).
    pub hidden_status: Status,
    pub rollback: RollbackPolicy,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            typing_quiet: Duration::from_millis(1000),
            cursor_debounce: Duration::from_millis(125),
            cursor_ttl: None,
            hidden_status: Status::Idle,
            rollback: RollbackPolicy::Keep,
        }
    }
}

/// A user intent coming from the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Send { text: String },
    Edit { id: Uuid, text: String },
    Delete { id: Uuid },
    React { id: Uuid, emoji: String },
    /// A keystroke in the composer.
    Input,
    PointerMove { x: f64, y: f64 },
    Visibility(Visibility),
    Block { user_id: UserId },
    Unblock { user_id: UserId },
    WhisperTo { user_id: UserId },
    Whisper { text: String },
    CancelWhisper,
}

/// What a core call asks the I/O shell to do.
#[derive(Debug, Default, PartialEq)]
pub struct Effects {
    pub writes: Vec<Write>,
    pub emits: Vec<Envelope>,
    pub notices: Vec<Notice>,
}

impl Effects {
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty() && self.emits.is_empty() && self.notices.is_empty()
    }

    fn extend(&mut self, other: Effects) {
        self.writes.extend(other.writes);
        self.emits.extend(other.emits);
        self.notices.extend(other.notices);
    }
}

#[derive(Debug, Clone, PartialEq)]
struct WhisperTarget {
    to: PeerRef,
    username: String,
}

/// Read-only view of the room for consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomSnapshot {
    pub room: Uuid,
    pub me: User,
    pub messages: Arc<Vec<Message>>,
    pub roster: Vec<RosterEntry>,
    pub online: usize,
    pub typing: TypingSummary,
    pub cursors: Vec<VisibleCursor>,
    pub local_cursor: Option<(f64, f64)>,
    pub whispering_to: Option<String>,
}

impl RoomSnapshot {
    /// Equality that compares the shared message log by identity, so an
    /// unchanged log costs nothing to check.
    pub fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.messages, &other.messages)
            && self.room == other.room
            && self.me == other.me
            && self.roster == other.roster
            && self.online == other.online
            && self.typing == other.typing
            && self.cursors == other.cursors
            && self.local_cursor == other.local_cursor
            && self.whispering_to == other.whispering_to
    }
}

/// Everything one session knows about its room. Synchronous and free of
/// I/O: callers feed it intents, inbound envelopes, timer ticks and write
/// results, and carry out the returned effects.
#[derive(Debug)]
pub struct RoomCore {
    me: User,
    room: Uuid,
    origin: Uuid,
    config: CoreConfig,
    messages: Reconciler,
    presence: PresenceTracker,
    blocks: BlockList,
    cursors: CursorBoard,
    typing: TypingSignaler,
    whisper: Option<WhisperTarget>,
}

impl RoomCore {
    pub fn new(me: User, room: Uuid, config: CoreConfig) -> Self {
        let cursors = CursorBoard::new(
            CursorOwner {
                user_id: me.id,
                username: me.username.clone(),
                color: me.color.clone(),
                room,
            },
            config.cursor_debounce,
            config.cursor_ttl,
        );

        Self {
            messages: Reconciler::new(me.id, room, config.rollback),
            presence: PresenceTracker::new(),
            blocks: BlockList::new(),
            typing: TypingSignaler::new(config.typing_quiet),
            cursors,
            whisper: None,
            origin: Uuid::new_v4(),
            me,
            room,
            config,
        }
    }

    /// Id stamped on every envelope this session emits.
    pub fn origin(&self) -> Uuid {
        self.origin
    }

    pub fn me(&self) -> &User {
        &self.me
    }

    pub fn room(&self) -> Uuid {
        self.room
    }

    /// Load the REST snapshot and announce ourselves to the room.
    pub fn bootstrap(&mut self, messages: Vec<Message>, players: Vec<User>) -> Effects {
        info!(
            "joining room {} with {} messages and {} players",
            self.room,
            messages.len(),
            players.len()
        );
        self.messages.init(messages);
        self.presence.load(players);
        self.me.status = Status::Online;
        self.presence.upsert(self.me.clone());

        Effects {
            emits: vec![self.status_envelope(Status::Online)],
            ..Default::default()
        }
    }

    pub fn handle(&mut self, intent: Intent, now: Instant) -> Effects {
        let mut effects = Effects::default();
        match intent {
            Intent::Send { text } => effects.writes.extend(self.messages.send(&text, Utc::now())),
            Intent::Edit { id, text } => {
                effects.writes.extend(self.messages.edit(id, &text, Utc::now()))
            }
            Intent::Delete { id } => effects.writes.extend(self.messages.remove(id)),
            Intent::React { id, emoji } => {
                effects.writes.extend(self.messages.react(id, &emoji, Utc::now()))
            }
            Intent::Input => {
                if let Some(status) = self.typing.on_input(now) {
                    effects.emits.push(self.status_envelope(status));
                }
            }
            Intent::PointerMove { x, y } => self.cursors.on_local_move(x, y, now),
            Intent::Visibility(visibility) => {
                let status = match visibility {
                    Visibility::Visible => Status::Online,
                    Visibility::Hidden => {
                        self.typing.cancel();
                        self.config.hidden_status
                    }
                };
                effects.extend(self.announce_status(status));
            }
            Intent::Block { user_id } => effects.emits.extend(self.block(user_id)),
            Intent::Unblock { user_id } => {
                self.blocks.unblock(user_id);
            }
            Intent::WhisperTo { user_id } => self.whisper_to(user_id),
            Intent::Whisper { text } => effects.emits.extend(self.submit_whisper(text)),
            Intent::CancelWhisper => self.whisper = None,
        }
        effects
    }

    /// Route one inbound frame. Our own echoes and frames for other rooms
    /// are dropped.
    pub fn receive(&mut self, envelope: Envelope, now: Instant) -> Effects {
        let mut effects = Effects::default();

        if envelope.origin == Some(self.origin) {
            debug!("dropping own {} echo", envelope.event.name());
            return effects;
        }
        if envelope.event.is_room_scoped() && envelope.room != Some(self.room) {
            debug!("dropping {} for room {:?}", envelope.event.name(), envelope.room);
            return effects;
        }

        match envelope.event {
            ChannelEvent::Message(message) if message.room_id != self.room => {
                debug!("dropping message {} from room {}", message.id, message.room_id);
            }
            event @ (ChannelEvent::Message(_)
            | ChannelEvent::Edition { .. }
            | ChannelEvent::Deletion { .. }
            | ChannelEvent::Reaction { .. }) => {
                self.messages.apply_remote(event, Utc::now());
            }
            ChannelEvent::Status { user } => {
                self.presence.upsert(user);
            }
            ChannelEvent::Whisper { to, from, whisper } => {
                if to.id != self.me.id {
                    return effects;
                }
                if self.is_blocked_username(&from.username) {
                    debug!("dropping whisper from blocked @{}", from.username);
                    return effects;
                }
                effects.notices.push(Notice::Whisper {
                    from: from.username,
                    text: whisper,
                });
            }
            ChannelEvent::Block { to, from } => {
                if to.id == self.me.id {
                    effects.notices.push(Notice::BlockedBy {
                        username: from.username,
                    });
                }
            }
            ChannelEvent::CursorMove(cursor) => {
                self.cursors.apply_remote(cursor, now);
            }
        }
        effects
    }

    /// Fire whatever timers have elapsed.
    pub fn tick(&mut self, now: Instant) -> Effects {
        let mut effects = Effects::default();
        if let Some(status) = self.typing.poll(now) {
            effects.emits.push(self.status_envelope(status));
        }
        if let Some(cursor) = self.cursors.poll_outbound(now) {
            effects.emits.push(self.envelope(ChannelEvent::CursorMove(cursor)));
        }
        self.cursors.evict_stale(now);
        effects
    }

    /// Earliest instant at which `tick` has something to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.typing.deadline(), self.cursors.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Fold a finished durable write back in.
    pub fn settle<E: std::fmt::Display>(&mut self, write: Write, result: Result<Ack, E>) -> Effects {
        let settled = self.messages.settle(write, result);
        Effects {
            writes: settled.next.into_iter().collect(),
            emits: settled.emit.map(|e| self.envelope(e)).into_iter().collect(),
            notices: settled.notice.into_iter().collect(),
        }
    }

    /// Teardown: stop timers and announce we are gone.
    pub fn leave(&mut self) -> Effects {
        self.typing.cancel();
        self.cursors.cancel();
        self.announce_status(Status::Offline)
    }

    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            room: self.room,
            me: self.me.clone(),
            messages: self.messages.store().shared(),
            roster: self.presence.roster(&self.blocks),
            online: self.presence.online_count(),
            typing: self.presence.typing(self.me.id),
            cursors: self.cursors.visible(&self.presence, &self.blocks),
            local_cursor: self.cursors.local(),
            whispering_to: self.whisper.as_ref().map(|w| w.username.clone()),
        }
    }

    fn envelope(&self, event: ChannelEvent) -> Envelope {
        Envelope::new(self.room, self.origin, event)
    }

    fn status_envelope(&mut self, status: Status) -> Envelope {
        self.me.status = status;
        self.presence.set_status(self.me.id, status);
        self.envelope(ChannelEvent::Status {
            user: self.me.clone(),
        })
    }

    fn announce_status(&mut self, status: Status) -> Effects {
        let write = Write::new(WriteOp::UpdateStatus {
            user_id: self.me.id,
            status,
        });
        Effects {
            writes: self.messages.submit(write).into_iter().collect(),
            emits: vec![self.status_envelope(status)],
            notices: Vec::new(),
        }
    }

    fn peer_ref(&self, user_id: UserId) -> PeerRef {
        PeerRef {
            id: user_id,
            sid: self.presence.get(user_id).and_then(|p| p.sid.clone()),
        }
    }

    fn block(&mut self, user_id: UserId) -> Option<Envelope> {
        if user_id == self.me.id || !self.blocks.block(user_id) {
            return None;
        }
        if self.whisper.as_ref().is_some_and(|w| w.to.id == user_id) {
            self.whisper = None;
        }
        Some(self.envelope(ChannelEvent::Block {
            to: self.peer_ref(user_id),
            from: PeerName {
                username: self.me.username.clone(),
            },
        }))
    }

    fn whisper_to(&mut self, user_id: UserId) {
        let Some(peer) = self.presence.get(user_id) else {
            debug!("cannot whisper unknown user {}", user_id);
            return;
        };
        if user_id == self.me.id || peer.status == Status::Offline || self.blocks.is_blocked(user_id) {
            debug!("whispering to @{} is not allowed", peer.username);
            return;
        }
        self.whisper = Some(WhisperTarget {
            to: self.peer_ref(user_id),
            username: peer.username.clone(),
        });
    }

    fn submit_whisper(&mut self, text: String) -> Option<Envelope> {
        let target = self.whisper.take()?;
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        Some(self.envelope(ChannelEvent::Whisper {
            to: target.to,
            from: PeerName {
                username: self.me.username.clone(),
            },
            whisper: text.to_string(),
        }))
    }

    fn is_blocked_username(&self, username: &str) -> bool {
        self.presence
            .participants()
            .iter()
            .any(|p| p.username == username && self.blocks.is_blocked(p.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlor_types::models::{Cursor, ReactionDraft};

    const ROOM: Uuid = Uuid::from_u128(0x53c38a2c_9640_4957_92d7_0d4400b2b9ac);

    fn user(id: UserId, name: &str, status: Status) -> User {
        User {
            id,
            username: name.into(),
            role: "player".into(),
            avatar: String::new(),
            color: "#336699".into(),
            status,
            sid: Some(format!("sid-{}", id)),
        }
    }

    fn core() -> RoomCore {
        let mut core = RoomCore::new(user(1, "me", Status::Offline), ROOM, CoreConfig::default());
        core.bootstrap(
            Vec::new(),
            vec![user(2, "ana", Status::Online), user(7, "bo", Status::Online)],
        );
        core
    }

    fn peer(event: ChannelEvent) -> Envelope {
        Envelope::new(ROOM, Uuid::new_v4(), event)
    }

    fn statuses(emits: &[Envelope]) -> Vec<Status> {
        emits
            .iter()
            .filter_map(|e| match &e.event {
                ChannelEvent::Status { user } => Some(user.status),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn bootstrap_announces_join() {
        let mut core = RoomCore::new(user(1, "me", Status::Offline), ROOM, CoreConfig::default());
        let effects = core.bootstrap(Vec::new(), vec![user(2, "ana", Status::Online)]);

        assert_eq!(statuses(&effects.emits), vec![Status::Online]);
        assert_eq!(effects.emits[0].origin, Some(core.origin()));
        assert_eq!(core.snapshot().online, 2);
    }

    #[test]
    fn typing_burst_broadcasts_start_and_stop_once() {
        let mut core = core();
        let t0 = Instant::now();
        let mut emits = Vec::new();

        for i in 0..5u64 {
            let now = t0 + Duration::from_millis(i * 50);
            emits.extend(core.handle(Intent::Input, now).emits);
            emits.extend(core.tick(now).emits);
        }
        let mut now = t0 + Duration::from_millis(200);
        while now <= t0 + Duration::from_millis(1300) {
            emits.extend(core.tick(now).emits);
            now += Duration::from_millis(50);
        }

        assert_eq!(statuses(&emits), vec![Status::Typing, Status::Online]);
        assert_eq!(core.next_deadline(), None);
    }

    #[test]
    fn cursor_of_peer_going_offline_is_hidden() {
        let mut core = core();
        let now = Instant::now();
        core.receive(
            peer(ChannelEvent::CursorMove(Cursor {
                user_id: 7,
                x: 1.0,
                y: 2.0,
                color: "#000000".into(),
                room: ROOM,
                username: "bo".into(),
            })),
            now,
        );
        assert_eq!(core.snapshot().cursors.len(), 1);

        core.receive(
            peer(ChannelEvent::Status {
                user: user(7, "bo", Status::Offline),
            }),
            now,
        );
        assert!(core.snapshot().cursors.is_empty());
    }

    #[test]
    fn pointer_samples_are_debounced_into_one_emit() {
        let mut core = core();
        let t0 = Instant::now();
        core.handle(Intent::PointerMove { x: 1.0, y: 1.0 }, t0);
        core.handle(Intent::PointerMove { x: 9.0, y: 9.0 }, t0 + Duration::from_millis(20));

        let deadline = core.next_deadline().unwrap();
        assert_eq!(deadline, t0 + Duration::from_millis(145));
        let emits = core.tick(deadline).emits;
        assert_eq!(emits.len(), 1);
        match &emits[0].event {
            ChannelEvent::CursorMove(c) => assert_eq!((c.x, c.y, c.user_id), (9.0, 9.0, 1)),
            other => panic!("unexpected {}", other.name()),
        }
    }

    #[test]
    fn own_reaction_echo_is_not_double_counted() {
        let mut core = core();
        let write = core
            .handle(Intent::Send { text: "hi".into() }, Instant::now())
            .writes
            .remove(0);
        let id = match &write.op {
            WriteOp::CreateMessage { message, .. } => message.id,
            other => panic!("unexpected {}", other.name()),
        };
        core.settle::<String>(write, Ok(Ack::Done));

        let react = core
            .handle(Intent::React { id, emoji: "👍".into() }, Instant::now())
            .writes
            .remove(0);
        let echo = core.settle::<String>(react, Ok(Ack::Done)).emits.remove(0);

        core.receive(echo, Instant::now());
        let snapshot = core.snapshot();
        assert_eq!(snapshot.messages[0].reactions.len(), 1);
        assert_eq!(snapshot.messages[0].reactions[0].count, 1);
    }

    #[test]
    fn peer_reactions_aggregate() {
        let mut core = core();
        let write = core
            .handle(Intent::Send { text: "hi".into() }, Instant::now())
            .writes
            .remove(0);
        let id = match &write.op {
            WriteOp::CreateMessage { message, .. } => message.id,
            other => panic!("unexpected {}", other.name()),
        };

        for _ in 0..2 {
            core.receive(
                peer(ChannelEvent::Reaction {
                    id,
                    reaction: ReactionDraft {
                        chat_id: id,
                        sender_id: 2,
                        emoji: "👍".into(),
                        count: 1,
                        created_at: Utc::now(),
                    },
                }),
                Instant::now(),
            );
        }

        let reactions = &core.snapshot().messages[0].reactions;
        assert_eq!(reactions.len(), 1);
        assert_eq!(reactions[0].count, 2);
    }

    #[test]
    fn frames_for_other_rooms_are_dropped() {
        let mut core = core();
        let other = Envelope::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            ChannelEvent::Status {
                user: user(99, "ghost", Status::Online),
            },
        );
        assert!(core.receive(other, Instant::now()).is_empty());
        assert!(core.snapshot().roster.iter().all(|r| r.user.id != 99));
    }

    #[test]
    fn hidden_page_goes_idle_and_persists_status() {
        let mut core = core();
        let now = Instant::now();
        core.handle(Intent::Input, now);

        let effects = core.handle(Intent::Visibility(Visibility::Hidden), now);
        assert_eq!(statuses(&effects.emits), vec![Status::Idle]);
        assert!(matches!(
            effects.writes[0].op,
            WriteOp::UpdateStatus { user_id: 1, status: Status::Idle }
        ));
        // the cancelled burst never produces a stop broadcast
        assert!(core.tick(now + Duration::from_secs(5)).emits.is_empty());
    }

    #[test]
    fn block_is_private_and_notifies_peer() {
        let mut core = core();
        let effects = core.handle(Intent::Block { user_id: 7 }, Instant::now());

        assert!(statuses(&effects.emits).is_empty());
        match &effects.emits[0].event {
            ChannelEvent::Block { to, from } => {
                assert_eq!(to.id, 7);
                assert_eq!(to.sid.as_deref(), Some("sid-7"));
                assert_eq!(from.username, "me");
            }
            other => panic!("unexpected {}", other.name()),
        }
        assert!(effects.emits[0].room.is_none());

        let snapshot = core.snapshot();
        let bo = snapshot.roster.iter().find(|r| r.user.id == 7).unwrap();
        assert!(bo.blocked);
        assert_eq!(bo.user.status, Status::Online);
    }

    #[test]
    fn whisper_round_trip_and_blocked_sender() {
        let mut core = core();
        let now = Instant::now();

        core.handle(Intent::WhisperTo { user_id: 2 }, now);
        assert_eq!(core.snapshot().whispering_to.as_deref(), Some("ana"));
        let emits = core.handle(Intent::Whisper { text: "psst".into() }, now).emits;
        assert!(matches!(&emits[0].event, ChannelEvent::Whisper { whisper, .. } if whisper == "psst"));
        assert!(core.snapshot().whispering_to.is_none());

        let incoming = |from: &str| {
            peer(ChannelEvent::Whisper {
                to: PeerRef { id: 1, sid: None },
                from: PeerName { username: from.into() },
                whisper: "hello".into(),
            })
        };
        let notices = core.receive(incoming("ana"), now).notices;
        assert_eq!(
            notices,
            vec![Notice::Whisper { from: "ana".into(), text: "hello".into() }]
        );

        core.handle(Intent::Block { user_id: 2 }, now);
        assert!(core.receive(incoming("ana"), now).notices.is_empty());
    }

    #[test]
    fn being_blocked_raises_notice() {
        let mut core = core();
        let notices = core
            .receive(
                peer(ChannelEvent::Block {
                    to: PeerRef { id: 1, sid: None },
                    from: PeerName { username: "bo".into() },
                }),
                Instant::now(),
            )
            .notices;
        assert_eq!(notices, vec![Notice::BlockedBy { username: "bo".into() }]);
    }

    #[test]
    fn snapshot_serializes_for_consumers() {
        let core = core();
        let json = serde_json::to_value(core.snapshot()).unwrap();
        assert_eq!(json["online"], 3);
        assert_eq!(json["roster"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn messages_from_another_room_are_ignored() {
        let mut core = core();
        let mut stray = Message {
            id: Uuid::new_v4(),
            sender_id: 2,
            room_id: Uuid::new_v4(),
            text: "wrong room".into(),
            created_at: Utc::now(),
            modified_at: None,
            modified_id: None,
            player: None,
            reactions: Vec::new(),
            pending: false,
        };
        core.receive(peer(ChannelEvent::Message(stray.clone())), Instant::now());
        assert!(core.snapshot().messages.is_empty());

        let unscoped = Envelope {
            room: None,
            origin: Some(Uuid::new_v4()),
            event: ChannelEvent::Message(stray.clone()),
        };
        stray.room_id = ROOM;
        let unscoped_here = Envelope {
            event: ChannelEvent::Message(stray.clone()),
            ..unscoped.clone()
        };
        core.receive(unscoped, Instant::now());
        core.receive(unscoped_here, Instant::now());
        assert!(core.snapshot().messages.is_empty());

        core.receive(peer(ChannelEvent::Message(stray)), Instant::now());
        assert_eq!(core.snapshot().messages.len(), 1);
    }

    #[test]
    fn delete_of_unsent_message_goes_out_after_the_send_settles() {
        let mut core = core();
        let create = core
            .handle(Intent::Send { text: "oops".into() }, Instant::now())
            .writes
            .remove(0);
        let id = match &create.op {
            WriteOp::CreateMessage { message, .. } => message.id,
            other => panic!("unexpected {}", other.name()),
        };

        let effects = core.handle(Intent::Delete { id }, Instant::now());
        assert!(effects.writes.is_empty());
        assert!(core.snapshot().messages.is_empty());

        let effects = core.settle::<String>(create, Ok(Ack::Done));
        assert!(effects.emits.is_empty());
        assert_eq!(effects.writes.len(), 1);
        assert!(matches!(
            effects.writes[0].op,
            WriteOp::DeleteMessage { id: target, .. } if target == id
        ));
    }

    #[test]
    fn status_writes_go_out_one_at_a_time() {
        let mut core = core();
        let now = Instant::now();
        let hidden = core.handle(Intent::Visibility(Visibility::Hidden), now);
        let visible = core.handle(Intent::Visibility(Visibility::Visible), now);

        assert_eq!(hidden.writes.len(), 1);
        assert!(visible.writes.is_empty());
        assert_eq!(statuses(&visible.emits), vec![Status::Online]);

        let write = hidden.writes.into_iter().next().unwrap();
        let released = core.settle::<String>(write, Ok(Ack::Done));
        assert!(matches!(
            released.writes[0].op,
            WriteOp::UpdateStatus { status: Status::Online, .. }
        ));
    }

    #[test]
    fn snapshots_share_an_unchanged_log() {
        let mut core = core();
        core.handle(Intent::Send { text: "hi".into() }, Instant::now());
        let first = core.snapshot();
        let again = core.snapshot();
        assert!(first.same_as(&again));

        core.receive(
            peer(ChannelEvent::CursorMove(Cursor {
                user_id: 7,
                x: 1.0,
                y: 2.0,
                color: "#000000".into(),
                room: ROOM,
                username: "bo".into(),
            })),
            Instant::now(),
        );
        let moved = core.snapshot();
        assert!(!first.same_as(&moved));
        assert!(Arc::ptr_eq(&first.messages, &moved.messages));

        core.handle(Intent::Send { text: "again".into() }, Instant::now());
        let grown = core.snapshot();
        assert!(!moved.same_as(&grown));
        assert_eq!(first.messages.len(), 1);
        assert_eq!(grown.messages.len(), 2);
    }
}

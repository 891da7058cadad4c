use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use parlor_types::events::ChannelEvent;
use parlor_types::models::{Message, Reaction, ReactionDraft, Status, UserId};

use crate::notice::Notice;
use crate::store::{ChatState, MessageAction, Outcome};

/// What to do with an optimistic change the backend refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RollbackPolicy {
    /// Leave the optimistic state in place until the next full resync.
    #[default]
    Keep,
    /// Undo the optimistic change.
    Revert,
}

impl FromStr for RollbackPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "keep" => Ok(Self::Keep),
            "revert" => Ok(Self::Revert),
            other => Err(format!("unknown rollback policy '{}'", other)),
        }
    }
}

/// A durable write for the persistence collaborator.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    CreateMessage {
        room: Uuid,
        message: Message,
    },
    EditMessage {
        room: Uuid,
        id: Uuid,
        text: String,
        modified_at: DateTime<Utc>,
    },
    DeleteMessage {
        room: Uuid,
        id: Uuid,
    },
    React {
        room: Uuid,
        id: Uuid,
        reaction: ReactionDraft,
    },
    UpdateStatus {
        user_id: UserId,
        status: Status,
    },
}

impl WriteOp {
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateMessage { .. } => "send message",
            Self::EditMessage { .. } => "edit message",
            Self::DeleteMessage { .. } => "delete message",
            Self::React { .. } => "react",
            Self::UpdateStatus { .. } => "update status",
        }
    }

    fn target(&self) -> Target {
        match self {
            Self::CreateMessage { message, .. } => Target::Message(message.id),
            Self::EditMessage { id, .. } | Self::DeleteMessage { id, .. } | Self::React { id, .. } => {
                Target::Message(*id)
            }
            Self::UpdateStatus { .. } => Target::Status,
        }
    }
}

/// The backend resource a write touches. Writes to one target go out one
/// at a time, in the order they were made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Target {
    Message(Uuid),
    Status,
}

/// A write plus what it takes to undo its optimistic effect.
#[derive(Debug, Clone, PartialEq)]
pub struct Write {
    pub op: WriteOp,
    undo: Option<MessageAction>,
}

impl Write {
    pub fn new(op: WriteOp) -> Self {
        Self { op, undo: None }
    }

    fn with_undo(op: WriteOp, undo: MessageAction) -> Self {
        Self {
            op,
            undo: Some(undo),
        }
    }

    /// Point a write that waited on a create at the id the backend assigned.
    fn retarget(&mut self, from: Uuid, to: Uuid) {
        let swap = |id: &mut Uuid| {
            if *id == from {
                *id = to;
            }
        };
        match &mut self.op {
            WriteOp::CreateMessage { message, .. } => swap(&mut message.id),
            WriteOp::EditMessage { id, .. } | WriteOp::DeleteMessage { id, .. } => swap(id),
            WriteOp::React { id, reaction, .. } => {
                swap(id);
                swap(&mut reaction.chat_id);
            }
            WriteOp::UpdateStatus { .. } => {}
        }
        match &mut self.undo {
            Some(
                MessageAction::Remove { id }
                | MessageAction::Rewrite { id, .. }
                | MessageAction::Unreact { id, .. },
            ) => swap(id),
            Some(MessageAction::Restore { message, .. }) => swap(&mut message.id),
            _ => {}
        }
    }
}

/// What the backend returned for a successful write.
#[derive(Debug, Clone, PartialEq)]
pub enum Ack {
    Message(Message),
    Reaction(Reaction),
    Done,
}

/// Result of settling a write.
#[derive(Debug, Default, PartialEq)]
pub struct Settled {
    pub emit: Option<ChannelEvent>,
    pub notice: Option<Notice>,
    /// The write that was waiting on this one, now free to go out.
    pub next: Option<Write>,
}

/// Owns the message log and routes every mutation of it, local or remote,
/// through the reducer.
#[derive(Debug)]
pub struct Reconciler {
    me: UserId,
    room: Uuid,
    policy: RollbackPolicy,
    store: ChatState,
    in_flight: HashSet<Target>,
    waiting: HashMap<Target, VecDeque<Write>>,
}

impl Reconciler {
    pub fn new(me: UserId, room: Uuid, policy: RollbackPolicy) -> Self {
        Self {
            me,
            room,
            policy,
            store: ChatState::new(),
            in_flight: HashSet::new(),
            waiting: HashMap::new(),
        }
    }

    pub fn store(&self) -> &ChatState {
        &self.store
    }

    pub fn init(&mut self, messages: Vec<Message>) {
        self.store.apply(MessageAction::Init(messages));
    }

    /// Hand a write out for execution, or hold it while an earlier write to
    /// the same target is unsettled. Held writes come back through
    /// `Settled::next`.
    pub fn submit(&mut self, write: Write) -> Option<Write> {
        let target = write.op.target();
        if self.in_flight.insert(target) {
            return Some(write);
        }
        debug!("{} waits for an earlier write to settle", write.op.name());
        self.waiting.entry(target).or_default().push_back(write);
        None
    }

    /// Free `target` and release the next write waiting on it. A create that
    /// came back under a server id moves its waiters over to that id.
    fn release(&mut self, target: Target, rekey: Option<(Uuid, Uuid)>) -> Option<Write> {
        self.in_flight.remove(&target);
        let mut queue = self.waiting.remove(&target)?;
        let target = match rekey {
            Some((from, to)) => {
                queue.iter_mut().for_each(|w| w.retarget(from, to));
                Target::Message(to)
            }
            None => target,
        };

        if self.in_flight.contains(&target) {
            self.waiting.entry(target).or_default().extend(queue);
            return None;
        }
        let next = queue.pop_front()?;
        self.in_flight.insert(target);
        if !queue.is_empty() {
            self.waiting.insert(target, queue);
        }
        Some(next)
    }

    /// A refused create means the message never existed for the backend, so
    /// whatever waited on it is dropped.
    fn abandon(&mut self, target: Target) {
        self.in_flight.remove(&target);
        if let Some(queue) = self.waiting.remove(&target) {
            debug!("dropping {} writes behind a failed send", queue.len());
        }
    }

    /// Optimistically append a new message. Blank text is ignored.
    pub fn send(&mut self, text: &str, now: DateTime<Utc>) -> Option<Write> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let id = Uuid::new_v4();
        let message = Message {
            id,
            sender_id: self.me,
            room_id: self.room,
            text: text.to_string(),
            created_at: now,
            modified_at: None,
            modified_id: None,
            player: None,
            reactions: Vec::new(),
            pending: true,
        };
        self.store.apply(MessageAction::Add(message.clone()));

        self.submit(Write::with_undo(
            WriteOp::CreateMessage {
                room: self.room,
                message,
            },
            MessageAction::Remove { id },
        ))
    }

    pub fn edit(&mut self, id: Uuid, text: &str, now: DateTime<Utc>) -> Option<Write> {
        let Some(previous) = self.store.get(id).cloned() else {
            debug!("edit of unknown message {} dropped", id);
            return None;
        };

        self.store.apply(MessageAction::Edit {
            id,
            text: text.to_string(),
            modified_at: now,
            modified_id: Some(self.me),
        });

        self.submit(Write::with_undo(
            WriteOp::EditMessage {
                room: self.room,
                id,
                text: text.to_string(),
                modified_at: now,
            },
            MessageAction::Rewrite {
                id,
                text: previous.text,
                modified_at: previous.modified_at,
                modified_id: previous.modified_id,
            },
        ))
    }

    pub fn remove(&mut self, id: Uuid) -> Option<Write> {
        let Some(index) = self.store.position(id) else {
            debug!("delete of unknown message {} dropped", id);
            return None;
        };
        let previous = self.store.messages()[index].clone();

        self.store.apply(MessageAction::Remove { id });

        self.submit(Write::with_undo(
            WriteOp::DeleteMessage { room: self.room, id },
            MessageAction::Restore {
                index,
                message: previous,
            },
        ))
    }

    pub fn react(&mut self, id: Uuid, emoji: &str, now: DateTime<Utc>) -> Option<Write> {
        let reaction = ReactionDraft {
            chat_id: id,
            sender_id: self.me,
            emoji: emoji.to_string(),
            count: 1,
            created_at: now,
        };

        if self.store.apply(MessageAction::React {
            id,
            reaction: reaction.clone(),
        }) == Outcome::Unchanged
        {
            return None;
        }

        self.submit(Write::with_undo(
            WriteOp::React {
                room: self.room,
                id,
                reaction: reaction.clone(),
            },
            MessageAction::Unreact {
                id,
                emoji: reaction.emoji,
                count: reaction.count,
            },
        ))
    }

    /// Fold the outcome of a durable write back in. Success yields the event
    /// that fans the change out to peers; failure yields a notice and, under
    /// `RollbackPolicy::Revert`, undoes the optimistic change.
    pub fn settle<E: fmt::Display>(&mut self, write: Write, result: Result<Ack, E>) -> Settled {
        let target = write.op.target();
        let ack = match result {
            Ok(ack) => ack,
            Err(e) => {
                warn!("{} failed: {}", write.op.name(), e);
                let next = match write.op {
                    WriteOp::CreateMessage { .. } => {
                        self.abandon(target);
                        None
                    }
                    _ => self.release(target, None),
                };
                if self.policy == RollbackPolicy::Revert {
                    if let Some(undo) = write.undo {
                        self.store.apply(undo);
                    }
                }
                return Settled {
                    emit: None,
                    notice: Some(Notice::WriteFailed {
                        action: write.op.name(),
                        reason: e.to_string(),
                    }),
                    next,
                };
            }
        };

        let mut rekey = None;
        let emit = match write.op {
            WriteOp::CreateMessage { message, .. } => {
                let local_id = message.id;
                let confirmed = match ack {
                    Ack::Message(server) => {
                        let server_id = server.id;
                        self.store.apply(MessageAction::Confirm {
                            local_id,
                            message: server,
                        });
                        server_id
                    }
                    _ => {
                        self.store.apply(MessageAction::Confirm { local_id, message });
                        local_id
                    }
                };
                if confirmed != local_id {
                    rekey = Some((local_id, confirmed));
                }
                // Deleted before the backend answered: nothing left to announce.
                self.store
                    .get(confirmed)
                    .cloned()
                    .map(ChannelEvent::Message)
            }
            WriteOp::EditMessage {
                id,
                text,
                modified_at,
                ..
            } => Some(ChannelEvent::Edition {
                id,
                message: text,
                modified_at: Some(modified_at),
                modified_id: Some(self.me),
            }),
            WriteOp::DeleteMessage { id, .. } => Some(ChannelEvent::Deletion { id }),
            WriteOp::React { id, reaction, .. } => Some(ChannelEvent::Reaction { id, reaction }),
            WriteOp::UpdateStatus { .. } => None,
        };

        Settled {
            emit,
            notice: None,
            next: self.release(target, rekey),
        }
    }

    /// Apply a peer's message event through the same actions local intents use.
    pub fn apply_remote(&mut self, event: ChannelEvent, now: DateTime<Utc>) -> Outcome {
        let action = match event {
            ChannelEvent::Message(mut message) => {
                message.pending = false;
                MessageAction::Add(message)
            }
            ChannelEvent::Edition {
                id,
                message,
                modified_at,
                modified_id,
            } => MessageAction::Edit {
                id,
                text: message,
                modified_at: modified_at.unwrap_or(now),
                modified_id,
            },
            ChannelEvent::Deletion { id } => MessageAction::Remove { id },
            ChannelEvent::Reaction { id, reaction } => MessageAction::React { id, reaction },
            other => {
                debug!("{} is not a message event", other.name());
                return Outcome::Unchanged;
            }
        };
        self.store.apply(action)
    }
}

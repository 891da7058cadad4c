use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use parlor_types::models::{Message, ReactionDraft, UserId};

/// Every transition the message log supports.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageAction {
    /// Replace the whole log (room join snapshot).
    Init(Vec<Message>),
    /// Append unless a message with the same id is already present.
    Add(Message),
    Edit {
        id: Uuid,
        text: String,
        modified_at: DateTime<Utc>,
        modified_id: Option<UserId>,
    },
    Remove {
        id: Uuid,
    },
    /// Aggregate into the matching emoji, or append a new reaction.
    React {
        id: Uuid,
        reaction: ReactionDraft,
    },
    /// The backend accepted an optimistic message. Its copy may carry a
    /// different id and authoritative creation metadata.
    Confirm {
        local_id: Uuid,
        message: Message,
    },
    /// Put back an earlier revision of a message's text (rollback of an edit).
    Rewrite {
        id: Uuid,
        text: String,
        modified_at: Option<DateTime<Utc>>,
        modified_id: Option<UserId>,
    },
    /// Put a message back at a position (rollback of a delete).
    Restore {
        index: usize,
        message: Message,
    },
    /// Take back `count` from an emoji (rollback of a reaction).
    Unreact {
        id: Uuid,
        emoji: String,
        count: u32,
    },
}

impl MessageAction {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Init(_) => "init",
            Self::Add(_) => "add",
            Self::Edit { .. } => "edit",
            Self::Remove { .. } => "remove",
            Self::React { .. } => "react",
            Self::Confirm { .. } => "confirm",
            Self::Rewrite { .. } => "rewrite",
            Self::Restore { .. } => "restore",
            Self::Unreact { .. } => "unreact",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Changed,
    Unchanged,
}

/// The ordered message log of one room. The log is shared copy-on-write
/// with any snapshot still holding it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatState {
    messages: Arc<Vec<Message>>,
}

/// Pure form of [`ChatState::apply`].
pub fn reduce(mut state: ChatState, action: MessageAction) -> ChatState {
    state.apply(action);
    state
}

impl ChatState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn shared(&self) -> Arc<Vec<Message>> {
        Arc::clone(&self.messages)
    }

    fn log_mut(&mut self) -> &mut Vec<Message> {
        Arc::make_mut(&mut self.messages)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn position(&self, id: Uuid) -> Option<usize> {
        self.messages.iter().position(|m| m.id == id)
    }

    pub fn get(&self, id: Uuid) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    fn get_mut(&mut self, id: Uuid) -> Option<&mut Message> {
        let idx = self.position(id)?;
        Some(&mut self.log_mut()[idx])
    }

    pub fn apply(&mut self, action: MessageAction) -> Outcome {
        let kind = action.kind();
        let outcome = match action {
            MessageAction::Init(messages) => {
                self.messages = Arc::new(messages);
                Outcome::Changed
            }
            MessageAction::Add(message) => self.add(message),
            MessageAction::Edit {
                id,
                text,
                modified_at,
                modified_id,
            } => match self.get_mut(id) {
                Some(m) => {
                    m.text = text;
                    m.modified_at = Some(modified_at);
                    m.modified_id = modified_id;
                    Outcome::Changed
                }
                None => Outcome::Unchanged,
            },
            MessageAction::Remove { id } => match self.position(id) {
                Some(idx) => {
                    self.log_mut().remove(idx);
                    Outcome::Changed
                }
                None => Outcome::Unchanged,
            },
            MessageAction::Rewrite {
                id,
                text,
                modified_at,
                modified_id,
            } => match self.get_mut(id) {
                Some(m) => {
                    m.text = text;
                    m.modified_at = modified_at;
                    m.modified_id = modified_id;
                    Outcome::Changed
                }
                None => Outcome::Unchanged,
            },
            MessageAction::React { id, reaction } => self.react(id, reaction),
            MessageAction::Confirm { local_id, message } => self.confirm(local_id, message),
            MessageAction::Restore { index, message } => {
                if self.get(message.id).is_some() {
                    Outcome::Unchanged
                } else {
                    let index = index.min(self.messages.len());
                    self.log_mut().insert(index, message);
                    Outcome::Changed
                }
            }
            MessageAction::Unreact { id, emoji, count } => self.unreact(id, &emoji, count),
        };

        if outcome == Outcome::Unchanged {
            debug!("{} left the message log unchanged", kind);
        }
        outcome
    }

    fn add(&mut self, message: Message) -> Outcome {
        if self.get(message.id).is_some() {
            return Outcome::Unchanged;
        }
        self.log_mut().push(message);
        Outcome::Changed
    }

    fn react(&mut self, id: Uuid, reaction: ReactionDraft) -> Outcome {
        let Some(message) = self.get_mut(id) else {
            return Outcome::Unchanged;
        };

        match message.reactions.iter_mut().find(|r| r.emoji == reaction.emoji) {
            Some(existing) => existing.count += reaction.count,
            None => {
                let next_id = message.reactions.iter().map(|r| r.id).max().unwrap_or(0) + 1;
                message.reactions.push(reaction.into_reaction(next_id));
            }
        }
        Outcome::Changed
    }

    fn unreact(&mut self, id: Uuid, emoji: &str, count: u32) -> Outcome {
        let Some(message) = self.get_mut(id) else {
            return Outcome::Unchanged;
        };
        let Some(idx) = message.reactions.iter().position(|r| r.emoji == emoji) else {
            return Outcome::Unchanged;
        };

        let reaction = &mut message.reactions[idx];
        reaction.count = reaction.count.saturating_sub(count);
        if reaction.count == 0 {
            message.reactions.remove(idx);
        }
        Outcome::Changed
    }

    fn confirm(&mut self, local_id: Uuid, server: Message) -> Outcome {
        let Some(idx) = self.position(local_id) else {
            return Outcome::Unchanged;
        };

        // The peer echo of the server copy got here before the REST response.
        if server.id != local_id && self.get(server.id).is_some() {
            self.log_mut().remove(idx);
            return Outcome::Changed;
        }

        // Local text and reactions may be newer than the server's copy.
        let entry = &mut self.log_mut()[idx];
        entry.id = server.id;
        entry.created_at = server.created_at;
        if server.player.is_some() {
            entry.player = server.player;
        }
        entry.pending = false;
        Outcome::Changed
    }
}

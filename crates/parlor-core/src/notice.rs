use serde::Serialize;

/// Something the user should be told about. Never fatal.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    /// A durable write failed; local state may differ from the backend
    /// until the next resync.
    WriteFailed { action: &'static str, reason: String },
    /// A peer whispered to us.
    Whisper { from: String, text: String },
    /// A peer blocked us.
    BlockedBy { username: String },
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WriteFailed { action, reason } => write!(f, "could not {}: {}", action, reason),
            Self::Whisper { from, text } => write!(f, "@{} whispers: {}", from, text),
            Self::BlockedBy { username } => write!(f, "you have been blocked by @{}", username),
        }
    }
}

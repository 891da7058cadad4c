use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Status, User, UserId};

// -- Messages --

/// Body of `POST /rooms/{room}/messages`. The id is the client's optimistic
/// id; the backend may keep it or assign its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub id: Uuid,
    pub message: String,
    pub sender_id: UserId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditMessageRequest {
    pub message: String,
}

// -- Reactions --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactRequest {
    pub emoji: String,
    pub sender_id: UserId,
}

// -- Players --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: Status,
}

/// Query string of `GET /players/register/{username}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterQuery {
    pub avatar: String,
    pub color: String,
    pub room: Uuid,
    pub status: Status,
}

/// Whether registration created the player or found an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Membership {
    New,
    Old,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user: User,
    pub is: Membership,
}

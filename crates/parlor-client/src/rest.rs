use std::future::Future;
use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;
use uuid::Uuid;

use parlor_core::{Ack, WriteOp};
use parlor_types::api::{
    EditMessageRequest, ReactRequest, RegisterQuery, RegisterResponse, SendMessageRequest,
    UpdateStatusRequest,
};
use parlor_types::models::{Message, Reaction, Room, Status, User, UserId};

use crate::error::ClientError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Durable store behind a room session.
pub trait Persistence: Clone + Send + Sync + 'static {
    fn fetch_messages(
        &self,
        room: Uuid,
    ) -> impl Future<Output = Result<Vec<Message>, ClientError>> + Send;

    fn list_players(&self) -> impl Future<Output = Result<Vec<User>, ClientError>> + Send;

    fn create_message(
        &self,
        room: Uuid,
        req: SendMessageRequest,
    ) -> impl Future<Output = Result<Message, ClientError>> + Send;

    fn edit_message(
        &self,
        room: Uuid,
        id: Uuid,
        req: EditMessageRequest,
    ) -> impl Future<Output = Result<Message, ClientError>> + Send;

    fn delete_message(
        &self,
        room: Uuid,
        id: Uuid,
    ) -> impl Future<Output = Result<Message, ClientError>> + Send;

    fn react(
        &self,
        room: Uuid,
        id: Uuid,
        req: ReactRequest,
    ) -> impl Future<Output = Result<Reaction, ClientError>> + Send;

    fn update_status(
        &self,
        user_id: UserId,
        status: Status,
    ) -> impl Future<Output = Result<User, ClientError>> + Send;
}

/// Carry out one write against the store.
pub async fn execute<P: Persistence>(store: &P, op: &WriteOp) -> Result<Ack, ClientError> {
    match op {
        WriteOp::CreateMessage { room, message } => {
            let req = SendMessageRequest {
                id: message.id,
                message: message.text.clone(),
                sender_id: message.sender_id,
            };
            store.create_message(*room, req).await.map(Ack::Message)
        }
        WriteOp::EditMessage { room, id, text, .. } => {
            let req = EditMessageRequest {
                message: text.clone(),
            };
            store.edit_message(*room, *id, req).await.map(Ack::Message)
        }
        WriteOp::DeleteMessage { room, id } => {
            store.delete_message(*room, *id).await.map(|_| Ack::Done)
        }
        WriteOp::React { room, id, reaction } => {
            let req = ReactRequest {
                emoji: reaction.emoji.clone(),
                sender_id: reaction.sender_id,
            };
            store.react(*room, *id, req).await.map(Ack::Reaction)
        }
        WriteOp::UpdateStatus { user_id, status } => {
            store.update_status(*user_id, *status).await.map(|_| Ack::Done)
        }
    }
}

/// HTTP client for the backend's REST surface.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: Client,
    base: Url,
}

impl RestClient {
    pub fn new(base: Url) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { http, base })
    }

    /// `GET /players/register/{username}`: create the player or fetch the
    /// existing one.
    pub async fn register(
        &self,
        username: &str,
        query: &RegisterQuery,
    ) -> Result<RegisterResponse, ClientError> {
        let url = self.url(&["players", "register", username])?;
        self.json(self.http.get(url).query(query)).await
    }

    /// `GET /channels/{room}/`
    pub async fn fetch_room(&self, room: Uuid) -> Result<Room, ClientError> {
        let url = self.url(&["channels", &room.to_string(), ""])?;
        self.json(self.http.get(url)).await
    }

    fn url(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::Config(format!("{} cannot be a base url", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, req: RequestBuilder) -> Result<reqwest::Response, ClientError> {
        let res = req.send().await?;
        let status = res.status();
        debug!("{} {}", status.as_u16(), res.url());
        if !status.is_success() {
            return Err(ClientError::Status {
                status,
                url: res.url().to_string(),
            });
        }
        Ok(res)
    }

    async fn json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ClientError> {
        let body = self.send(req).await?.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    fn messages_url(&self, room: Uuid) -> Result<Url, ClientError> {
        self.url(&["rooms", &room.to_string(), "messages"])
    }

    fn message_url(&self, room: Uuid, id: Uuid, action: &str) -> Result<Url, ClientError> {
        self.url(&["rooms", &room.to_string(), "messages", &id.to_string(), action])
    }
}

impl Persistence for RestClient {
    async fn fetch_messages(&self, room: Uuid) -> Result<Vec<Message>, ClientError> {
        let url = self.messages_url(room)?;
        self.json(self.http.get(url)).await
    }

    async fn list_players(&self) -> Result<Vec<User>, ClientError> {
        let url = self.url(&["players"])?;
        self.json(self.http.get(url)).await
    }

    async fn create_message(
        &self,
        room: Uuid,
        req: SendMessageRequest,
    ) -> Result<Message, ClientError> {
        let url = self.messages_url(room)?;
        self.json(self.http.post(url).json(&req)).await
    }

    async fn edit_message(
        &self,
        room: Uuid,
        id: Uuid,
        req: EditMessageRequest,
    ) -> Result<Message, ClientError> {
        let url = self.message_url(room, id, "edit")?;
        self.json(self.http.patch(url).json(&req)).await
    }

    async fn delete_message(&self, room: Uuid, id: Uuid) -> Result<Message, ClientError> {
        let url = self.message_url(room, id, "delete")?;
        self.json(self.http.delete(url)).await
    }

    async fn react(
        &self,
        room: Uuid,
        id: Uuid,
        req: ReactRequest,
    ) -> Result<Reaction, ClientError> {
        let url = self.message_url(room, id, "react")?;
        self.json(self.http.post(url).json(&req)).await
    }

    async fn update_status(&self, user_id: UserId, status: Status) -> Result<User, ClientError> {
        let url = self.url(&["players", &user_id.to_string()])?;
        let req = UpdateStatusRequest { status };
        self.json(self.http.patch(url).json(&req)).await
    }
}

//! I/O shell around `parlor-core`: REST persistence, the websocket event
//! channel and the task that ties them to a room session.

pub mod channel;
pub mod config;
pub mod error;
pub mod rest;
pub mod session;

pub use config::Config;
pub use error::ClientError;
pub use rest::{Persistence, RestClient};
pub use session::{Session, SessionHandle};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} answered {status}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("event channel failed: {0}")]
    Channel(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("malformed payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("bad url: {0}")]
    Url(#[from] url::ParseError),

    #[error("configuration: {0}")]
    Config(String),

    #[error("session closed")]
    Closed,
}

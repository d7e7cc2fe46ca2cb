//! Error kinds surfaced by the history pipelines.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HistoryError {
    /// Request could not be completed by the fetch collaborator.
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Configured session cookies cannot be sent as a `Cookie` header.
    #[error("session cookie is not a valid header value: {0}")]
    InvalidCookie(#[from] reqwest::header::InvalidHeaderValue),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// An expected structural marker is absent from the page.
    #[error("malformed page: {0}")]
    MalformedPage(String),

    /// Embedded structured data is present but could not be decoded.
    #[error("invalid payload in {what}: {source}")]
    InvalidPayload {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// An item reference has no matching catalog entry.
    #[error("no description for app {app_id} key {key}")]
    MissingDescription { app_id: String, key: String },

    #[error("could not resolve vanity URL \"{0}\" to a SteamID")]
    IdentityNotFound(String),

    /// A JSON envelope is missing one of its required fields.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The endpoint answered with a non-OK `success` code.
    #[error("request failed with eresult {code}: {message}")]
    Eresult { code: i64, message: String },
}

impl From<reqwest::Error> for HistoryError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(Box::new(err))
    }
}

impl HistoryError {
    pub fn malformed_page(detail: impl Into<String>) -> Self {
        Self::MalformedPage(detail.into())
    }

    pub fn malformed_response(detail: impl Into<String>) -> Self {
        Self::MalformedResponse(detail.into())
    }
}

pub type Result<T> = std::result::Result<T, HistoryError>;

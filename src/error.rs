use thiserror::Error;

#[derive(Error, Debug)]
pub enum TeamCityError {
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Invalid resource path '{path}': {reason}")]
    InvalidUrl { path: String, reason: String },

    #[error("TeamCity API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Credentials unavailable: {0}")]
    Credentials(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TeamCityError {
    /// True when the server could not be reached at all.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

pub type Result<T> = std::result::Result<T, TeamCityError>;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TopgoError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Vector store error: {0}")]
    Store(String),

    #[error("Unknown Hanoi district: {0}")]
    InvalidDistrict(String),

    #[error("Invalid filter {field}: {value}")]
    InvalidFilter { field: String, value: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Service not ready: {0}")]
    NotReady(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for TopgoError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.to_string())
    }
}

impl TopgoError {
    /// Errors caused by the caller's input rather than by a backend
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidDistrict(_) | Self::InvalidFilter { .. } | Self::InvalidRequest(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, TopgoError>;

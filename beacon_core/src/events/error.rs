use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("invalid event topic")]
    InvalidTopic,

    #[error("invalid event source")]
    InvalidSource,

    #[error("invalid dedupe_key")]
    InvalidDedupeKey,

    #[error("invalid query filter")]
    InvalidQuery,

    #[error("payload too large")]
    PayloadTooLarge,

    #[error("serialize event: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("{message}")]
    Message { message: String },
}

impl Error {
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }
}

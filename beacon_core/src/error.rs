use std::error::Error as StdError;

/// Error type shared by the poller, its remote-API clients and the notice path.
///
/// Remote failures keep their cause chain through `Error::Backend`; the poller
/// treats every variant the same way when counting fetch failures.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("remote returned status {status} for {url}")]
    RemoteStatus { status: u16, url: String },

    #[error("backend error: {context}")]
    Backend {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync + 'static>,
    },

    #[error("backend error: {0}")]
    BackendMessage(String),

    #[error(transparent)]
    Events(#[from] crate::events::Error),
}

impl Error {
    pub fn backend(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Backend {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Wrap an HTTP client error with "reqwest" context.
    pub fn backend_reqwest(source: impl StdError + Send + Sync + 'static) -> Self {
        Self::backend("reqwest", source)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PushError {
    #[error("push transport error: {0}")]
    Transport(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("batch of {len} tokens exceeds the limit of {limit}")]
    BatchTooLarge { len: usize, limit: usize },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("token store error: {0}")]
    Store(#[from] pulse_social::SocialError),

    #[error("database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LitlensError {
    #[error("Network access denied: {0}")]
    Security(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, LitlensError>;

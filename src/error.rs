use thiserror::Error;

#[derive(Error, Debug)]
pub enum StarboardError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Incomplete response: {0}")]
    Incomplete(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StarboardError>;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("{0}")]
    Protocol(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Handler(String),

    #[error("{0}")]
    Browser(String),

    #[error("Agent error: {0}")]
    Agent(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Message text as it appears in an `error` wire frame.
    ///
    /// Protocol and validation errors go out verbatim (the driver matches on
    /// strings like "Unknown command: x"); everything else keeps its
    /// Display form.
    pub fn wire_message(&self) -> String {
        self.to_string()
    }
}

use thiserror::Error;

/// Everything that can go wrong between issuing a fetch and holding a
/// normalized dataset. None of these are fatal: the engines render an
/// empty dataset plus a banner.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    #[error("HTTP error: {status}")]
    Http { status: u16 },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed JSON: {0}")]
    Parse(String),

    #[error("endpoint reported failure: {0}")]
    Rejected(String),

    #[error("no records in response")]
    EmptyData,
}

impl From<reqwest::Error> for LoadError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => LoadError::Http { status: status.as_u16() },
            None => LoadError::Transport(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for LoadError {
    fn from(err: serde_json::Error) -> Self {
        LoadError::Parse(err.to_string())
    }
}

impl From<std::io::Error> for LoadError {
    fn from(err: std::io::Error) -> Self {
        LoadError::Transport(err.to_string())
    }
}

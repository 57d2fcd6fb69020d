use thiserror::Error;

/// Failures while loading settings or preparing directories.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("config file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cannot resolve path: {0}")]
    Path(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

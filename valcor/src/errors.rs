use thiserror::Error;
use valcor_core::errors::ValcorCoreError;

pub type Result<T> = std::result::Result<T, ValcorError>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ValcorError {
    #[error(transparent)]
    Core(#[from] ValcorCoreError),
    /// The only category that propagates to the caller as a hard failure:
    /// the corpus store could not answer a query.
    #[error("corpus store failure: {0}")]
    Store(String),
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error(transparent)]
    ConfigDeserialization(#[from] toml::de::Error),
    #[error("store row has no column {index}")]
    MissingField { index: usize },
    #[error("store row column {index} has an unexpected type")]
    UnexpectedFieldType { index: usize },
}

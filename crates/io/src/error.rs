use pcedit_core::CloudError;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PcdError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("PCD header line {line}: {message}")]
    Header { line: usize, message: String },

    #[error("PCD payload: {0}")]
    Data(String),

    #[error("LZF block: {0}")]
    Compressed(String),

    #[error(transparent)]
    Cloud(#[from] CloudError),
}

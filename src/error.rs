use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid extension pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("keyword file '{0}' could not be decoded with any supported encoding")]
    KeywordsUndecodable(PathBuf),

    #[error("keyword source contains no keywords")]
    NoKeywords,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("none of the configured root directories exist")]
    NoUsableRoots,
}

pub type Result<T> = std::result::Result<T, ScanError>;

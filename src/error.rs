use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BigramError>;

/// Every failure the pipeline can report. None of them are retried; the
/// binary prints the error and exits.
#[derive(Debug, Error)]
pub enum BigramError {
    #[error("failed to read corpus {}: {source}", path.display())]
    CorpusRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("corpus {} is empty", path.display())]
    EmptyCorpus { path: PathBuf },

    #[error("character {0:?} is not in the vocabulary")]
    UnknownCharacter(char),

    #[error("token id {index} is out of range for a vocabulary of {vocab_size}")]
    IndexOutOfRange { index: i64, vocab_size: usize },

    #[error("need more than {block_size} tokens to sample a window, got {len}")]
    InsufficientData { len: usize, block_size: usize },

    #[error("context of {len} tokens exceeds the block size of {block_size}")]
    ContextTooLong { len: usize, block_size: usize },

    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch { expected: Vec<i64>, got: Vec<i64> },

    #[error("cannot sample the next token: {0}")]
    Sampling(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("torch error: {0}")]
    Torch(#[from] tch::TchError),
}

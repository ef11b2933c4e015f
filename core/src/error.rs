use std::io;

use thiserror::Error;

pub type PreimageResult<T> = std::result::Result<T, PreimageError>;

#[derive(Error, Debug)]
pub enum PreimageError {
    #[error("Invalid alphabet: {0}")]
    InvalidAlphabet(String),

    #[error("The candidate length should be between 1 and {max}, but {length} was given")]
    InvalidLength { length: u8, max: u8 },

    #[error("Invalid resume cursor: {0}")]
    InvalidCursor(String),

    #[error("Only search spaces up to 2^64 are supported, but the provided space is 2^{0}")]
    Space(u32),

    #[error("The store is unavailable: {0}")]
    StorageUnavailable(String),

    #[error("The store rejected the batch: {0}")]
    StorageConstraintViolation(String),

    #[error(
        "Unable to access the file at the given path. Make sure the right permissions are available"
    )]
    Io(#[from] io::Error),

    #[error("Failed to serialize the data")]
    Serialize,

    #[error("Failed to deserialize the data. Is the file corrupted?")]
    Deserialize,

    #[error("The checkpoint was written for a different alphabet, length or hash function")]
    CheckpointMismatch,
}

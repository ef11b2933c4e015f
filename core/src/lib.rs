pub mod batch;
pub mod ctx;
pub mod cursor;
pub mod enumerator;
pub mod error;
pub mod event;
pub mod hash;
pub mod scheduling;
pub mod storage;

pub use {
    batch::{BatchBuffer, FlushOutcome},
    ctx::{EnumerationCtx, EnumerationCtxBuilder},
    cursor::{candidate_to_counter, counter_to_candidate, Checkpoint, ResumeCursor},
    enumerator::{enumerate, enumerate_resume, EnumerationReport, Enumerator},
    error::{PreimageError, PreimageResult},
    event::{EnumerationHandle, Event},
    hash::{Digester, HashFunction},
    storage::{
        open_store, FileStore, MemoryStore, Record, StorageGateway, StoredRecord,
        DEFAULT_STORE_URI,
    },
};

/// The default candidate length.
pub const DEFAULT_PASSWORD_LENGTH: u8 = 4;

/// The default charset.
pub const DEFAULT_CHARSET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// The maximum candidate length allowed.
pub const MAX_PASSWORD_LENGTH_ALLOWED: u8 = 16;

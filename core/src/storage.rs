mod file;
mod memory;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PreimageError, PreimageResult};

#[cfg(test)]
pub use memory::FlakyStore;
pub use {file::FileStore, memory::MemoryStore};

/// The default store, a file in the working directory.
pub const DEFAULT_STORE_URI: &str = "file:digests.tbl";

/// A candidate and its hex digest, ready to be stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    pub plaintext: String,
    pub digest: String,
}

impl Record {
    pub fn new(plaintext: String, digest: String) -> Self {
        Self { plaintext, digest }
    }
}

/// A row of the `hash_records` table.
/// Ids are attributed in insertion order, starting from 1.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: u64,
    pub plaintext: String,
    pub digest: String,
}

/// Trait that durable keyed stores implement to receive the enumerated records.
///
/// The plaintext is unique within a store. Inserting a plaintext that is already
/// present is not an error: the record is skipped and the previous row is kept.
pub trait StorageGateway {
    /// Inserts a batch of records.
    /// Returns the number of rows that were newly persisted.
    fn insert_batch(&mut self, records: &[Record]) -> PreimageResult<usize>;

    /// Returns the number of rows stored.
    fn len(&self) -> usize;

    /// Returns true if the store is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<G: StorageGateway + ?Sized> StorageGateway for Box<G> {
    fn insert_batch(&mut self, records: &[Record]) -> PreimageResult<usize> {
        (**self).insert_batch(records)
    }

    fn len(&self) -> usize {
        (**self).len()
    }
}

impl<G: StorageGateway + ?Sized> StorageGateway for &mut G {
    fn insert_batch(&mut self, records: &[Record]) -> PreimageResult<usize> {
        (**self).insert_batch(records)
    }

    fn len(&self) -> usize {
        (**self).len()
    }
}

/// Opens the store described by the given connection string.
///
/// - `memory:` opens an empty in-memory store.
/// - `file:<path>`, `file://<path>` or a bare path opens (or creates) a file store.
pub fn open_store(uri: &str) -> PreimageResult<Box<dyn StorageGateway + Send>> {
    if let Some(rest) = uri.strip_prefix("memory:") {
        if !rest.trim_start_matches('/').is_empty() {
            return Err(PreimageError::StorageUnavailable(format!(
                "an in-memory store takes no path, got `{uri}`"
            )));
        }
        return Ok(Box::new(MemoryStore::new()));
    }

    let path = match uri.strip_prefix("file:") {
        Some(rest) => rest.strip_prefix("//").unwrap_or(rest),
        None if uri.contains("://") => {
            return Err(PreimageError::StorageUnavailable(format!(
                "unsupported store scheme in `{uri}`"
            )))
        }
        None => uri,
    };

    if path.is_empty() {
        return Err(PreimageError::StorageUnavailable(
            "the store path is empty".to_owned(),
        ));
    }

    Ok(Box::new(FileStore::open(Path::new(path))?))
}

#[cfg(test)]
mod tests {
    use super::{open_store, Record, StorageGateway};
    use crate::error::PreimageError;

    fn record(plaintext: &str) -> Record {
        Record::new(plaintext.to_owned(), format!("digest of {plaintext}"))
    }

    #[test]
    fn test_open_memory_store() {
        let mut store = open_store("memory:").unwrap();

        assert!(store.is_empty());
        assert_eq!(1, store.insert_batch(&[record("aa")]).unwrap());
        assert_eq!(1, store.len());
    }

    #[test]
    fn test_open_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.tbl");

        for uri in [
            format!("file:{}", path.display()),
            format!("file://{}", path.display()),
            path.display().to_string(),
        ] {
            let mut store = open_store(&uri).unwrap();
            store.insert_batch(&[record("aa")]).unwrap();
            assert_eq!(1, store.len());
        }
    }

    #[test]
    fn test_open_invalid_uris() {
        assert!(matches!(
            open_store("postgres://localhost/db"),
            Err(PreimageError::StorageUnavailable(_))
        ));
        assert!(matches!(
            open_store("memory://somewhere"),
            Err(PreimageError::StorageUnavailable(_))
        ));
        assert!(matches!(
            open_store("file:"),
            Err(PreimageError::StorageUnavailable(_))
        ));
    }
}

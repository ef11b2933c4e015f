use std::collections::HashMap;

use super::{Record, StorageGateway, StoredRecord};
use crate::error::PreimageResult;

/// A store that keeps every row in memory.
/// Useful for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: Vec<StoredRecord>,
    index: HashMap<String, usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the row of a plaintext, if it was stored.
    pub fn get(&self, plaintext: &str) -> Option<&StoredRecord> {
        self.index.get(plaintext).map(|&i| &self.rows[i])
    }

    /// Returns all the rows, in insertion order.
    pub fn rows(&self) -> &[StoredRecord] {
        &self.rows
    }
}

impl StorageGateway for MemoryStore {
    fn insert_batch(&mut self, records: &[Record]) -> PreimageResult<usize> {
        let before = self.rows.len();

        for record in records {
            if self.index.contains_key(&record.plaintext) {
                continue;
            }

            self.index
                .insert(record.plaintext.clone(), self.rows.len());
            self.rows.push(StoredRecord {
                id: self.rows.len() as u64 + 1,
                plaintext: record.plaintext.clone(),
                digest: record.digest.clone(),
            });
        }

        Ok(self.rows.len() - before)
    }

    fn len(&self) -> usize {
        self.rows.len()
    }
}

/// A memory store that fails the batch insertions whose call number is in `failing_calls`.
/// Call numbers start from 0.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub failing_calls: Vec<usize>,
    pub calls: usize,
}

#[cfg(test)]
impl FlakyStore {
    pub fn failing_on(failing_calls: &[usize]) -> Self {
        Self {
            failing_calls: failing_calls.to_vec(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
impl StorageGateway for FlakyStore {
    fn insert_batch(&mut self, records: &[Record]) -> PreimageResult<usize> {
        let call = self.calls;
        self.calls += 1;

        if self.failing_calls.contains(&call) {
            return Err(crate::error::PreimageError::StorageUnavailable(format!(
                "connection lost on call {call}"
            )));
        }

        self.inner.insert_batch(records)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryStore;
    use crate::storage::{Record, StorageGateway};

    fn record(plaintext: &str, digest: &str) -> Record {
        Record::new(plaintext.to_owned(), digest.to_owned())
    }

    #[test]
    fn test_insert_batch() {
        let mut store = MemoryStore::new();

        let inserted = store
            .insert_batch(&[record("aa", "1"), record("ab", "2")])
            .unwrap();

        assert_eq!(2, inserted);
        assert_eq!(2, store.len());
        assert_eq!(1, store.get("aa").unwrap().id);
        assert_eq!("2", store.get("ab").unwrap().digest);
    }

    #[test]
    fn test_duplicates_are_absorbed() {
        let mut store = MemoryStore::new();
        store.insert_batch(&[record("aa", "old")]).unwrap();

        let inserted = store
            .insert_batch(&[record("aa", "new"), record("ab", "2")])
            .unwrap();

        assert_eq!(1, inserted);
        assert_eq!(2, store.len());
        assert_eq!("old", store.get("aa").unwrap().digest);
    }

    #[test]
    fn test_duplicates_inside_a_batch() {
        let mut store = MemoryStore::new();

        let inserted = store
            .insert_batch(&[record("aa", "1"), record("aa", "1")])
            .unwrap();

        assert_eq!(1, inserted);
        assert_eq!(0, store.insert_batch(&[record("aa", "1")]).unwrap());
    }
}

use std::{
    collections::HashSet,
    fs::File,
    io::{self, BufReader, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use bincode::ErrorKind;
use tracing::{debug, warn};

use super::{Record, StorageGateway, StoredRecord};
use crate::error::{PreimageError, PreimageResult};

/// A durable store backed by an append-only log of bincode-encoded rows.
///
/// The log is replayed when the store is opened to rebuild the uniqueness index,
/// so the plaintexts of the whole table are kept in memory.
/// A batch is written with a single write and synced to the disk before returning.
/// If the write fails, the log is cut back to its previous length.
pub struct FileStore {
    path: PathBuf,
    file: File,
    /// Length of the log up to the last fully persisted row.
    len_bytes: u64,
    plaintexts: HashSet<String>,
    next_id: u64,
}

impl FileStore {
    /// Opens the store at the given path, creating it if needed.
    /// A row torn by an interrupted write at the end of the log is discarded.
    pub fn open(path: &Path) -> PreimageResult<Self> {
        let mut file = File::options()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(path)?;

        let file_len = file.metadata()?.len();
        let mut plaintexts = HashSet::new();
        let mut next_id = 1;
        let mut len_bytes = 0;

        {
            let mut buf_reader = BufReader::with_capacity(1024 * 1024, &file);
            while len_bytes < file_len {
                let row: StoredRecord = match bincode::deserialize_from(&mut buf_reader) {
                    Ok(row) => row,
                    Err(err) if is_torn_row(&err) => break,
                    Err(_) => return Err(PreimageError::Deserialize),
                };

                len_bytes +=
                    bincode::serialized_size(&row).map_err(|_| PreimageError::Serialize)?;
                next_id = next_id.max(row.id + 1);
                plaintexts.insert(row.plaintext);
            }
        }

        if len_bytes < file_len {
            warn!(
                path = %path.display(),
                discarded_bytes = file_len - len_bytes,
                "discarding a partially written row at the end of the store"
            );
            file.set_len(len_bytes)?;
        }
        file.seek(SeekFrom::Start(len_bytes))?;

        debug!(path = %path.display(), rows = plaintexts.len(), "opened file store");

        Ok(Self {
            path: path.to_owned(),
            file,
            len_bytes,
            plaintexts,
            next_id,
        })
    }

    /// Reads all the rows of the store at the given path, in insertion order.
    pub fn scan(path: &Path) -> PreimageResult<Vec<StoredRecord>> {
        let file = File::open(path)?;
        let file_len = file.metadata()?.len();
        let mut buf_reader = BufReader::new(file);
        let mut rows = Vec::new();
        let mut read = 0;

        while read < file_len {
            let row: StoredRecord = match bincode::deserialize_from(&mut buf_reader) {
                Ok(row) => row,
                Err(err) if is_torn_row(&err) => break,
                Err(_) => return Err(PreimageError::Deserialize),
            };
            read += bincode::serialized_size(&row).map_err(|_| PreimageError::Serialize)?;
            rows.push(row);
        }

        Ok(rows)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the encoded rows at the end of the log and syncs them.
    fn append(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.file.write_all(bytes)?;
        self.file.sync_data()
    }

    /// Cuts the log back to its last persisted row.
    fn rollback(&mut self) -> io::Result<()> {
        self.file.set_len(self.len_bytes)?;
        self.file.seek(SeekFrom::Start(self.len_bytes))?;
        Ok(())
    }
}

/// A row cut in the middle by a crash shows up as an unexpected end of file.
fn is_torn_row(err: &bincode::Error) -> bool {
    matches!(&**err, ErrorKind::Io(io_err) if io_err.kind() == io::ErrorKind::UnexpectedEof)
}

impl StorageGateway for FileStore {
    fn insert_batch(&mut self, records: &[Record]) -> PreimageResult<usize> {
        let mut bytes = Vec::new();
        let mut staged = Vec::new();

        for record in records {
            if self.plaintexts.contains(&record.plaintext)
                || staged.contains(&&record.plaintext)
            {
                continue;
            }

            let row = StoredRecord {
                id: self.next_id + staged.len() as u64,
                plaintext: record.plaintext.clone(),
                digest: record.digest.clone(),
            };
            bincode::serialize_into(&mut bytes, &row).map_err(|_| PreimageError::Serialize)?;
            staged.push(&record.plaintext);
        }

        if staged.is_empty() {
            return Ok(0);
        }

        if let Err(err) = self.append(&bytes) {
            if let Err(rollback_err) = self.rollback() {
                warn!(
                    path = %self.path.display(),
                    "unable to roll back the store after a failed write: {rollback_err}"
                );
            }
            return Err(PreimageError::StorageUnavailable(err.to_string()));
        }

        self.len_bytes += bytes.len() as u64;
        self.next_id += staged.len() as u64;
        let inserted = staged.len();
        self.plaintexts.extend(staged.into_iter().cloned());

        Ok(inserted)
    }

    fn len(&self) -> usize {
        self.plaintexts.len()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        fs::{self, File, OpenOptions},
        io::{Seek, SeekFrom},
    };

    use itertools::Itertools;

    use super::FileStore;
    use crate::{
        error::PreimageError,
        storage::{Record, StorageGateway},
    };

    fn record(plaintext: &str) -> Record {
        Record::new(plaintext.to_owned(), format!("{plaintext}-digest"))
    }

    #[test]
    fn test_insert_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.tbl");

        {
            let mut store = FileStore::open(&path).unwrap();
            assert!(store.is_empty());
            assert_eq!(2, store.insert_batch(&[record("aa"), record("ab")]).unwrap());
        }

        let mut store = FileStore::open(&path).unwrap();
        assert_eq!(2, store.len());
        assert_eq!(1, store.insert_batch(&[record("ab"), record("ba")]).unwrap());

        let rows = FileStore::scan(&path).unwrap();
        assert_eq!(
            vec![(1, "aa"), (2, "ab"), (3, "ba")],
            rows.iter()
                .map(|row| (row.id, row.plaintext.as_str()))
                .collect_vec()
        );
        assert_eq!("ba-digest", rows[2].digest);
    }

    #[test]
    fn test_duplicates_are_absorbed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.tbl");
        let mut store = FileStore::open(&path).unwrap();

        store.insert_batch(&[record("aa")]).unwrap();
        let len_before = fs::metadata(&path).unwrap().len();

        assert_eq!(0, store.insert_batch(&[record("aa"), record("aa")]).unwrap());
        assert_eq!(len_before, fs::metadata(&path).unwrap().len());
        assert_eq!(1, store.insert_batch(&[record("bb"), record("bb")]).unwrap());
        assert_eq!(2, FileStore::scan(&path).unwrap().len());
    }

    #[test]
    fn test_torn_row_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.tbl");

        {
            let mut store = FileStore::open(&path).unwrap();
            store.insert_batch(&[record("aa"), record("ab")]).unwrap();
        }

        // simulate a crash in the middle of the last row
        let len = fs::metadata(&path).unwrap().len();
        OpenOptions::new()
            .write(true)
            .open(&path)
            .unwrap()
            .set_len(len - 3)
            .unwrap();

        let mut store = FileStore::open(&path).unwrap();
        assert_eq!(1, store.len());
        assert_eq!(1, store.insert_batch(&[record("ab")]).unwrap());

        let rows = FileStore::scan(&path).unwrap();
        assert_eq!(
            vec!["aa", "ab"],
            rows.iter().map(|row| row.plaintext.as_str()).collect_vec()
        );
        assert_eq!(2, rows[1].id);
    }

    #[test]
    fn test_failed_write_leaves_the_store_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.tbl");
        let mut store = FileStore::open(&path).unwrap();
        store.insert_batch(&[record("aa"), record("ab")]).unwrap();
        let len_before = fs::metadata(&path).unwrap().len();

        // writes through a read-only handle fail
        store.file = File::open(&path).unwrap();
        assert!(matches!(
            store.insert_batch(&[record("ba"), record("bb")]),
            Err(PreimageError::StorageUnavailable(_))
        ));

        assert_eq!(len_before, store.len_bytes);
        assert_eq!(3, store.next_id);
        assert_eq!(2, store.len());
        assert_eq!(len_before, fs::metadata(&path).unwrap().len());

        store.file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .unwrap();
        store.file.seek(SeekFrom::Start(store.len_bytes)).unwrap();
        assert_eq!(2, store.insert_batch(&[record("ba"), record("bb")]).unwrap());

        let rows = FileStore::scan(&path).unwrap();
        assert_eq!(
            vec![(1, "aa"), (2, "ab"), (3, "ba"), (4, "bb")],
            rows.iter()
                .map(|row| (row.id, row.plaintext.as_str()))
                .collect_vec()
        );
    }

    #[test]
    fn test_rollback_cuts_unconfirmed_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.tbl");
        let mut store = FileStore::open(&path).unwrap();
        store.insert_batch(&[record("aa")]).unwrap();
        let len_before = fs::metadata(&path).unwrap().len();

        store.append(&[0xff; 5]).unwrap();
        assert_eq!(len_before + 5, fs::metadata(&path).unwrap().len());

        store.rollback().unwrap();
        assert_eq!(len_before, fs::metadata(&path).unwrap().len());

        assert_eq!(1, store.insert_batch(&[record("ab")]).unwrap());
        drop(store);

        let store = FileStore::open(&path).unwrap();
        assert_eq!(2, store.len());
        assert_eq!(3, store.next_id);
    }
}

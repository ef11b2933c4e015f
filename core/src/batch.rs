use tracing::warn;

use crate::{
    error::PreimageError,
    storage::{Record, StorageGateway},
};

/// The result of handing a batch to the store.
#[derive(Debug)]
pub enum FlushOutcome {
    /// The store accepted the batch. Some records may have been skipped as duplicates.
    Stored { attempted: usize, inserted: usize },
    /// The store failed. The records of the batch are lost.
    Failed {
        attempted: usize,
        error: PreimageError,
    },
}

impl FlushOutcome {
    /// Returns true if the store accepted the batch.
    pub fn is_stored(&self) -> bool {
        matches!(self, Self::Stored { .. })
    }

    /// Returns true if at least one row was newly persisted.
    pub fn persisted(&self) -> bool {
        matches!(self, Self::Stored { inserted, .. } if *inserted > 0)
    }

    /// Returns the number of rows newly persisted.
    pub fn inserted(&self) -> usize {
        match self {
            Self::Stored { inserted, .. } => *inserted,
            Self::Failed { .. } => 0,
        }
    }

    /// Returns the number of records handed to the store.
    pub fn attempted(&self) -> usize {
        match self {
            Self::Stored { attempted, .. } | Self::Failed { attempted, .. } => *attempted,
        }
    }
}

/// Accumulates records until they are flushed to the store as a single batch.
#[derive(Debug, Default)]
pub struct BatchBuffer {
    records: Vec<Record>,
}

impl BatchBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Vec::with_capacity(capacity),
        }
    }

    /// Buffers a record. Nothing reaches the store until the next flush.
    #[inline]
    pub fn append(&mut self, record: Record) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Hands the buffered records to the store in one call, then clears the buffer
    /// whatever the outcome.
    /// Store errors are logged and returned in the outcome, never propagated.
    pub fn flush<G: StorageGateway + ?Sized>(
        &mut self,
        gateway: &mut G,
        prefix: &str,
    ) -> FlushOutcome {
        let attempted = self.records.len();
        if attempted == 0 {
            return FlushOutcome::Stored {
                attempted,
                inserted: 0,
            };
        }

        let outcome = match gateway.insert_batch(&self.records) {
            Ok(inserted) => FlushOutcome::Stored {
                attempted,
                inserted,
            },
            Err(error) => {
                warn!(batch_size = attempted, prefix, "failed to store a batch: {error}");
                FlushOutcome::Failed { attempted, error }
            }
        };

        self.records.clear();
        outcome
    }
}

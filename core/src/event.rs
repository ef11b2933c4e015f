use std::{
    panic,
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{Receiver, TryRecvError},
        Arc,
    },
    thread::JoinHandle,
};

use crate::{batch::FlushOutcome, cursor::ResumeCursor, enumerator::EnumerationReport};

/// An event to track the progress of an enumeration.
#[derive(Debug)]
pub enum Event {
    /// Overall progress of the enumeration in percent.
    Progress(f64),
    /// The nth leaf group was handed to the store.
    Batch {
        batch_number: u64,
        batch_count: u64,
        prefix: String,
        outcome: FlushOutcome,
        /// The new resume checkpoint, if this batch advanced it.
        /// It only advances while every batch so far was stored.
        checkpoint: Option<ResumeCursor>,
    },
}

pub struct EnumerationHandle {
    pub(crate) handle: JoinHandle<EnumerationReport>,
    pub(crate) receiver: Receiver<Event>,
    pub(crate) stop: Arc<AtomicBool>,
}

impl EnumerationHandle {
    /// Returns the report of the enumeration.
    /// Blocks until the enumeration is finished.
    pub fn join(self) -> EnumerationReport {
        self.handle
            .join()
            .unwrap_or_else(|payload| panic::resume_unwind(payload))
    }

    /// Blocks until an event is received.
    /// Returns `None` if the enumeration is finished.
    pub fn recv(&self) -> Option<Event> {
        self.receiver.recv().ok()
    }

    /// Returns an event if one is pending, without blocking.
    pub fn try_recv(&self) -> Result<Event, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Returns true once the enumeration thread has returned.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Asks the enumeration to stop after the batch being processed.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::mpsc::{self, Receiver, TryRecvError},
        thread,
    };

    use super::Event;
    use crate::{
        ctx::build_test_ctx,
        enumerator::Enumerator,
        error::PreimageResult,
        storage::{MemoryStore, Record, StorageGateway},
    };

    /// A store that waits for a permit before every batch.
    /// A dropped permit sender lets every batch through.
    struct GatedStore {
        inner: MemoryStore,
        permits: Receiver<()>,
    }

    impl StorageGateway for GatedStore {
        fn insert_batch(&mut self, records: &[Record]) -> PreimageResult<usize> {
            let _ = self.permits.recv();
            self.inner.insert_batch(records)
        }

        fn len(&self) -> usize {
            self.inner.len()
        }
    }

    #[test]
    fn test_stop() {
        let (permit_sender, permits) = mpsc::channel();
        let store = GatedStore {
            inner: MemoryStore::new(),
            permits,
        };
        let handle = Enumerator::new(build_test_ctx()).spawn_with_events(store);

        permit_sender.send(()).unwrap();
        loop {
            match handle.recv() {
                Some(Event::Batch { batch_number, .. }) => {
                    assert_eq!(1, batch_number);
                    break;
                }
                Some(Event::Progress(_)) => (),
                None => panic!("the enumeration ended before its first batch"),
            }
        }

        handle.stop();
        drop(permit_sender);
        while handle.recv().is_some() {}

        let report = handle.join();
        assert!(!report.completed);
        assert!(report.batches < 4);
    }

    #[test]
    fn test_try_recv_after_the_end() {
        let handle = Enumerator::new(build_test_ctx()).spawn_with_events(MemoryStore::new());

        while !handle.is_finished() {
            thread::yield_now();
        }

        let mut batches = 0;
        loop {
            match handle.try_recv() {
                Ok(Event::Batch { .. }) => batches += 1,
                Ok(Event::Progress(_)) => (),
                Err(err) => {
                    assert_eq!(TryRecvError::Disconnected, err);
                    break;
                }
            }
        }

        assert_eq!(4, batches);
        assert!(handle.join().completed);
    }
}

use std::{
    ops::ControlFlow,
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc, Arc,
    },
    thread,
};

use tracing::{debug, info};

use crate::{
    batch::BatchBuffer,
    ctx::{EnumerationCtx, EnumerationCtxBuilder},
    cursor::{charset_to_symbol, ResumeCursor},
    error::PreimageResult,
    event::{EnumerationHandle, Event},
    hash::Digester,
    scheduling::LeafGroupIterator,
    storage::{Record, StorageGateway},
};

/// What happened during an enumeration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnumerationReport {
    /// The number of candidates digested.
    pub candidates: u64,
    /// The number of batches handed to the store.
    pub batches: u64,
    /// The number of rows newly persisted.
    pub inserted: u64,
    /// The prefixes of the batches the store failed to persist.
    pub failed: Vec<String>,
    /// The last position from which resuming loses nothing, if any batch was confirmed.
    pub checkpoint: Option<ResumeCursor>,
    /// False if the enumeration was stopped before the end.
    pub completed: bool,
}

/// Enumerates every candidate of a context and stores it with its digest.
pub struct Enumerator {
    ctx: EnumerationCtx,
    cursor: Option<ResumeCursor>,
}

impl Enumerator {
    /// Creates an enumerator for a full run.
    pub fn new(ctx: EnumerationCtx) -> Self {
        Self { ctx, cursor: None }
    }

    /// Makes the enumeration start at the cursor position, inclusively.
    pub fn resume_from(mut self, cursor: &ResumeCursor) -> PreimageResult<Self> {
        self.cursor = Some(ResumeCursor::new(cursor.indices().to_vec(), &self.ctx)?);

        Ok(self)
    }

    pub fn ctx(&self) -> &EnumerationCtx {
        &self.ctx
    }

    /// Runs the enumeration to the end.
    pub fn run<G: StorageGateway + ?Sized>(&self, gateway: &mut G) -> EnumerationReport {
        self.run_with_events(gateway, |_| ControlFlow::Continue(()))
    }

    /// Runs the enumeration, calling `on_event` after every batch.
    /// The enumeration stops as soon as `on_event` breaks.
    pub fn run_with_events<G, F>(&self, gateway: &mut G, mut on_event: F) -> EnumerationReport
    where
        G: StorageGateway + ?Sized,
        F: FnMut(Event) -> ControlFlow<()>,
    {
        let groups = match &self.cursor {
            Some(cursor) => LeafGroupIterator::resume(&self.ctx, cursor),
            None => LeafGroupIterator::new(&self.ctx),
        };
        let batch_count = groups.remaining();
        let charset = &self.ctx.charset;

        info!(
            charset_len = charset.len(),
            length = self.ctx.length,
            hash = %self.ctx.hash_function,
            batch_count,
            resume_from = ?self.cursor.as_ref().map(|cursor| cursor.prefix(&self.ctx)),
            "starting enumeration"
        );

        let mut digester = Digester::new(self.ctx.hash_function);
        let mut buffer = BatchBuffer::with_capacity(self.ctx.batch_capacity());
        let mut report = EnumerationReport::default();
        let mut prefix = String::new();
        let mut all_stored = true;
        let mut last_permille = None;

        for (i, group) in groups.enumerate() {
            prefix.clear();
            prefix.extend(
                group
                    .prefix
                    .iter()
                    .map(|&index| charset_to_symbol(index, charset)),
            );

            for leaf in group.leaves.clone() {
                let mut candidate = String::with_capacity(prefix.len() + 4);
                candidate.push_str(&prefix);
                candidate.push(charset_to_symbol(leaf, charset));

                let digest = digester.digest_hex(&candidate);
                buffer.append(Record::new(candidate, digest));
            }

            let outcome = buffer.flush(&mut *gateway, &prefix);
            report.candidates += group.leaves.len() as u64;
            report.batches += 1;
            report.inserted += outcome.inserted() as u64;

            debug!(
                prefix = %prefix,
                attempted = outcome.attempted(),
                inserted = outcome.inserted(),
                "flushed batch"
            );

            // the checkpoint never moves past a failed batch
            let mut checkpoint = None;
            if !outcome.is_stored() {
                all_stored = false;
                report.failed.push(prefix.clone());
            } else if all_stored && !group.prefix.is_empty() {
                let cursor = ResumeCursor::from_stack(&group.prefix);
                report.checkpoint = Some(cursor.clone());
                checkpoint = Some(cursor);
            }

            let flow = on_event(Event::Batch {
                batch_number: i as u64 + 1,
                batch_count,
                prefix: prefix.clone(),
                outcome,
                checkpoint,
            });
            if flow.is_break() {
                info!(batches = report.batches, "enumeration stopped");
                return report;
            }

            let permille = report.batches as u128 * 1000 / batch_count as u128;
            if last_permille != Some(permille) {
                last_permille = Some(permille);
                let progress = report.batches as f64 / batch_count as f64 * 100.;
                if on_event(Event::Progress(progress)).is_break() {
                    info!(batches = report.batches, "enumeration stopped");
                    return report;
                }
            }
        }

        report.completed = true;
        info!(
            candidates = report.candidates,
            inserted = report.inserted,
            failed_batches = report.failed.len(),
            "enumeration complete"
        );

        report
    }

    /// Runs the enumeration on another thread.
    /// Returns an handle to get events related to the enumeration and to get its report.
    pub fn spawn_with_events<G>(self, mut gateway: G) -> EnumerationHandle
    where
        G: StorageGateway + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = stop.clone();

        let handle = thread::spawn(move || {
            self.run_with_events(&mut gateway, |event| {
                // nobody listening is not a reason to stop
                let _ = sender.send(event);

                if thread_stop.load(Ordering::Relaxed) {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })
        });

        EnumerationHandle {
            handle,
            receiver,
            stop,
        }
    }
}

/// Stores every candidate of `length` symbols over `alphabet`, from scratch.
pub fn enumerate<G: StorageGateway + ?Sized>(
    alphabet: &str,
    length: u8,
    gateway: &mut G,
) -> PreimageResult<EnumerationReport> {
    let ctx = EnumerationCtxBuilder::new()
        .charset(alphabet)
        .length(length)
        .build()?;

    Ok(Enumerator::new(ctx).run(gateway))
}

/// Stores every candidate of `length` symbols over `alphabet`, starting at the position
/// given by `cursor` as alphabet indices.
pub fn enumerate_resume<G: StorageGateway + ?Sized>(
    alphabet: &str,
    length: u8,
    cursor: &[usize],
    gateway: &mut G,
) -> PreimageResult<EnumerationReport> {
    let ctx = EnumerationCtxBuilder::new()
        .charset(alphabet)
        .length(length)
        .build()?;
    let cursor = ResumeCursor::new(cursor.to_vec(), &ctx)?;

    Ok(Enumerator::new(ctx).resume_from(&cursor)?.run(gateway))
}

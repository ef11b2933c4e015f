use std::time::Instant;

use anyhow::{Context, Result};
use human_repr::{HumanCount, HumanDuration};
use tracing::{info, warn};

use preimage_core::{
    open_store, Checkpoint, Enumerator, Event, FlushOutcome, ResumeCursor, StorageGateway,
};

use crate::Generate;

pub fn generate(args: Generate) -> Result<()> {
    let ctx = args.table.build_ctx()?;

    let cursor = if let Some(prefix) = &args.resume {
        Some(ResumeCursor::from_candidate(prefix, &ctx).context("Invalid resume position")?)
    } else if args.resume_checkpoint {
        // clap makes sure the checkpoint path is set
        let path = args.checkpoint.as_deref().context("No checkpoint file given")?;
        Some(Checkpoint::load_for(path, &ctx).context("Unable to load the checkpoint")?)
    } else {
        None
    };

    let store = open_store(&args.store).context("Unable to open the store")?;
    info!(
        store = %args.store,
        rows = store.len(),
        candidates = %ctx.n.human_count_bare(),
        "store opened"
    );

    let mut enumerator = Enumerator::new(ctx.clone());
    if let Some(cursor) = &cursor {
        info!(prefix = %cursor.prefix(&ctx), "resuming");
        enumerator = enumerator.resume_from(cursor)?;
    }

    let start = Instant::now();
    let handle = enumerator.spawn_with_events(store);

    while let Some(event) = handle.recv() {
        match event {
            Event::Progress(progress) => {
                info!(
                    elapsed = %start.elapsed().as_secs().human_duration(),
                    "{progress:.1}%"
                );
            }
            Event::Batch {
                batch_number,
                batch_count,
                prefix,
                outcome,
                checkpoint,
            } => {
                if let FlushOutcome::Failed { error, .. } = &outcome {
                    warn!(batch_number, batch_count, prefix = %prefix, "batch lost: {error}");
                }

                if let (Some(path), Some(cursor)) = (&args.checkpoint, checkpoint) {
                    // the run stops as soon as its progress can't be saved anymore
                    if let Err(err) = Checkpoint::new(ctx.clone(), cursor).store(path) {
                        handle.stop();
                        let report = handle.join();
                        warn!(batches = report.batches, "enumeration stopped");
                        return Err(err).context("Unable to save the checkpoint");
                    }
                }
            }
        }
    }

    let report = handle.join();

    info!(
        candidates = %report.candidates.human_count_bare(),
        inserted = %report.inserted.human_count_bare(),
        duration = %start.elapsed().as_secs().human_duration(),
        "done"
    );

    if !report.failed.is_empty() {
        warn!(
            failed_batches = report.failed.len(),
            first_failed_prefix = %report.failed[0],
            "some batches could not be stored, resume from the checkpoint to fill the gaps"
        );
    }

    Ok(())
}

use anyhow::Result;
use human_repr::{HumanCount, HumanDuration};

use crate::Info;

/// Rough number of digests per second on a single core, used for the time estimate.
const ESTIMATED_DIGESTS_PER_SECOND: u64 = 2_000_000;

pub fn info(args: Info) -> Result<()> {
    let ctx = args.table.build_ctx()?;

    println!("{:<20} {}", "Hash function", ctx.hash_function);
    println!("{:<20} {}", "Charset size", ctx.charset.len());
    println!("{:<20} {}", "Candidate length", ctx.length);
    println!("{:<20} {}", "Candidates", ctx.n.human_count_bare());
    println!("{:<20} {}", "Batches", ctx.group_count().human_count_bare());
    println!(
        "{:<20} {}",
        "Estimated duration",
        (ctx.n / ESTIMATED_DIGESTS_PER_SECOND).human_duration()
    );

    Ok(())
}

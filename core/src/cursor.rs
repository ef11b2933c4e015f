use std::{
    fs::{self, File},
    io::{BufReader, BufWriter},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    ctx::EnumerationCtx,
    error::{PreimageError, PreimageResult},
};

/// A traversal position: one alphabet index per depth level, most significant first.
///
/// Resuming from a cursor restarts the traversal at the position it represents,
/// inclusively. The leaf group at that position is emitted again and its records
/// are expected to be absorbed by the uniqueness constraint of the store.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResumeCursor {
    indices: Vec<usize>,
}

impl ResumeCursor {
    /// Creates a cursor from alphabet indices.
    /// There should be between 1 and `ctx.length` indices, all valid positions in the charset.
    pub fn new(indices: Vec<usize>, ctx: &EnumerationCtx) -> PreimageResult<Self> {
        if indices.is_empty() || indices.len() > ctx.length as usize {
            return Err(PreimageError::InvalidCursor(format!(
                "expected between 1 and {} indices, got {}",
                ctx.length,
                indices.len()
            )));
        }

        if let Some(&index) = indices.iter().find(|&&i| i >= ctx.charset.len()) {
            return Err(PreimageError::InvalidCursor(format!(
                "index {index} is out of the charset bounds"
            )));
        }

        Ok(Self { indices })
    }

    /// Creates a cursor from a candidate or a prefix of a candidate.
    pub fn from_candidate(prefix: &str, ctx: &EnumerationCtx) -> PreimageResult<Self> {
        let indices = prefix
            .chars()
            .map(|c| {
                symbol_to_charset(c, &ctx.charset).ok_or_else(|| {
                    PreimageError::InvalidCursor(format!("{c:?} is not part of the charset"))
                })
            })
            .collect::<PreimageResult<Vec<_>>>()?;

        Self::new(indices, ctx)
    }

    /// Used by the enumerator, whose stack is always made of valid indices.
    pub(crate) fn from_stack(indices: &[usize]) -> Self {
        Self {
            indices: indices.to_vec(),
        }
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Returns the prefix represented by this cursor.
    pub fn prefix(&self, ctx: &EnumerationCtx) -> String {
        self.indices
            .iter()
            .map(|&i| charset_to_symbol(i, &ctx.charset))
            .collect()
    }

    /// Returns the rank of the first candidate emitted when resuming from this cursor.
    pub fn counter(&self, ctx: &EnumerationCtx) -> u64 {
        let k = ctx.charset.len() as u64;
        (0..ctx.length as usize).fold(0, |counter, depth| {
            counter * k + self.indices.get(depth).copied().unwrap_or(0) as u64
        })
    }
}

/// Converts an index of the charset to its symbol.
#[inline]
pub fn charset_to_symbol(n: usize, charset: &[char]) -> char {
    charset[n]
}

/// Converts a symbol to its index in the charset.
#[inline]
pub fn symbol_to_charset(c: char, charset: &[char]) -> Option<usize> {
    charset.iter().position(|x| *x == c)
}

/// Creates a candidate from its rank in the emission order.
/// The counter should be lower than `ctx.n`.
pub fn counter_to_candidate(mut counter: u64, ctx: &EnumerationCtx) -> String {
    let k = ctx.charset.len() as u64;
    let mut symbols = vec![ctx.charset[0]; ctx.length as usize];

    for symbol in symbols.iter_mut().rev() {
        *symbol = charset_to_symbol((counter % k) as usize, &ctx.charset);
        counter /= k;
    }

    symbols.into_iter().collect()
}

/// Creates the rank of a candidate in the emission order.
pub fn candidate_to_counter(candidate: &str, ctx: &EnumerationCtx) -> PreimageResult<u64> {
    let cursor = ResumeCursor::from_candidate(candidate, ctx)?;
    if cursor.len() != ctx.length as usize {
        return Err(PreimageError::InvalidCursor(format!(
            "{candidate:?} is not {} symbols long",
            ctx.length
        )));
    }

    Ok(cursor.counter(ctx))
}

/// A resume cursor saved to the disk along with the context it belongs to.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Checkpoint {
    pub ctx: EnumerationCtx,
    pub cursor: ResumeCursor,
}

impl Checkpoint {
    pub fn new(ctx: EnumerationCtx, cursor: ResumeCursor) -> Self {
        Self { ctx, cursor }
    }

    /// Stores this checkpoint to the given path.
    /// The previous checkpoint is only replaced once the new one is fully written.
    pub fn store(&self, path: &Path) -> PreimageResult<()> {
        let mut tmp_path = path.as_os_str().to_owned();
        tmp_path.push(".tmp");
        let tmp_path = PathBuf::from(tmp_path);
        let file = File::options()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)?;

        let mut buf_writer = BufWriter::new(file);
        bincode::serialize_into(&mut buf_writer, self).map_err(|_| PreimageError::Serialize)?;
        buf_writer
            .into_inner()
            .map_err(|e| e.into_error())?
            .sync_all()?;

        fs::rename(tmp_path, path)?;

        Ok(())
    }

    /// Loads a checkpoint from the given path.
    pub fn load(path: &Path) -> PreimageResult<Self> {
        let file = File::open(path)?;
        let buf_reader = BufReader::new(file);
        let checkpoint: Checkpoint =
            bincode::deserialize_from(buf_reader).map_err(|_| PreimageError::Deserialize)?;

        Ok(checkpoint)
    }

    /// Loads a checkpoint and returns its cursor if it was written for the given context.
    pub fn load_for(path: &Path, ctx: &EnumerationCtx) -> PreimageResult<ResumeCursor> {
        let checkpoint = Self::load(path)?;
        if &checkpoint.ctx != ctx {
            return Err(PreimageError::CheckpointMismatch);
        }

        ResumeCursor::new(checkpoint.cursor.indices, ctx)
    }
}

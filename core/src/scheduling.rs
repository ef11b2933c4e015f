use std::ops::Range;

use crate::{ctx::EnumerationCtx, cursor::ResumeCursor};

/// A set of candidates sharing the same `length - 1` prefix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeafGroup {
    /// The alphabet indices of the shared prefix.
    pub prefix: Vec<usize>,
    /// The alphabet indices of the last symbol to emit.
    pub leaves: Range<usize>,
}

/// An iterator over the leaf groups, in lexicographic order of the charset indices.
///
/// The traversal is depth-first, but instead of recursing, the current index of every
/// level above the leaves is kept on an explicit stack, incremented like an odometer.
#[derive(Clone)]
pub struct LeafGroupIterator {
    stack: Vec<usize>,
    first_leaf: usize,
    charset_len: usize,
    remaining: u64,
    done: bool,
}

impl LeafGroupIterator {
    /// Creates an iterator over all the leaf groups.
    pub fn new(ctx: &EnumerationCtx) -> Self {
        Self {
            stack: vec![0; ctx.length as usize - 1],
            first_leaf: 0,
            charset_len: ctx.charset.len(),
            remaining: ctx.group_count(),
            done: false,
        }
    }

    /// Creates an iterator starting at the position of the cursor, inclusively.
    ///
    /// Each level starts at its cursor index the first time it is visited, then goes
    /// over the full charset. If the cursor covers the leaf level too, only the first
    /// group starts at that leaf.
    pub fn resume(ctx: &EnumerationCtx, cursor: &ResumeCursor) -> Self {
        let mut iter = Self::new(ctx);
        let depth = iter.stack.len();

        for (level, &index) in cursor.indices().iter().enumerate() {
            if level < depth {
                iter.stack[level] = index;
            } else {
                iter.first_leaf = index;
            }
        }

        let k = iter.charset_len as u64;
        let skipped = iter
            .stack
            .iter()
            .fold(0, |rank, &index| rank * k + index as u64);
        iter.remaining -= skipped;

        iter
    }

    /// Returns the number of groups left to visit.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }
}

impl Iterator for LeafGroupIterator {
    type Item = LeafGroup;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let group = LeafGroup {
            prefix: self.stack.clone(),
            leaves: self.first_leaf..self.charset_len,
        };
        self.first_leaf = 0;
        self.remaining -= 1;

        // move to the next prefix, carrying to the upper levels when a level wraps around
        let mut level = self.stack.len();
        loop {
            if level == 0 {
                self.done = true;
                break;
            }
            level -= 1;

            self.stack[level] += 1;
            if self.stack[level] < self.charset_len {
                break;
            }
            self.stack[level] = 0;
        }

        Some(group)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match usize::try_from(self.remaining) {
            Ok(remaining) => (remaining, Some(remaining)),
            Err(_) => (usize::MAX, None),
        }
    }
}

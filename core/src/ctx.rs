use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{
    error::{PreimageError, PreimageResult},
    hash::HashFunction,
    DEFAULT_CHARSET, DEFAULT_PASSWORD_LENGTH, MAX_PASSWORD_LENGTH_ALLOWED,
};

/// A builder for an enumeration context.
#[derive(Clone)]
pub struct EnumerationCtxBuilder {
    hash_function: HashFunction,
    charset: Vec<char>,
    length: u8,
}

impl Default for EnumerationCtxBuilder {
    fn default() -> Self {
        Self {
            hash_function: HashFunction::default(),
            charset: DEFAULT_CHARSET.chars().collect(),
            length: DEFAULT_PASSWORD_LENGTH,
        }
    }
}

impl EnumerationCtxBuilder {
    /// Creates a new EnumerationCtxBuilder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the hash function of the context.
    pub fn hash(mut self, hash_function: HashFunction) -> Self {
        self.hash_function = hash_function;

        self
    }

    /// Sets the charset of the context.
    /// The order of the symbols defines the traversal order, so it is kept as is.
    pub fn charset(mut self, charset: &str) -> Self {
        self.charset = charset.chars().collect();

        self
    }

    /// Sets the length of the candidates.
    pub fn length(mut self, length: u8) -> Self {
        self.length = length;

        self
    }

    /// Builds an EnumerationCtx with the specified parameters.
    pub fn build(self) -> PreimageResult<EnumerationCtx> {
        if self.charset.is_empty() {
            return Err(PreimageError::InvalidAlphabet(
                "the alphabet is empty".to_owned(),
            ));
        }

        let mut seen = HashSet::with_capacity(self.charset.len());
        if let Some(duplicate) = self.charset.iter().find(|c| !seen.insert(**c)) {
            return Err(PreimageError::InvalidAlphabet(format!(
                "the symbol {duplicate:?} appears more than once"
            )));
        }

        if self.length == 0 || self.length > MAX_PASSWORD_LENGTH_ALLOWED {
            return Err(PreimageError::InvalidLength {
                length: self.length,
                max: MAX_PASSWORD_LENGTH_ALLOWED,
            });
        }

        // make sure the search space is <= 2^64
        let k = self.charset.len() as u64;
        let Some(n) = k.checked_pow(self.length as u32) else {
            let bits = (self.length as f64 * (k as f64).log2()).ceil() as u32;
            return Err(PreimageError::Space(bits));
        };

        Ok(EnumerationCtx {
            n,
            hash_function: self.hash_function,
            charset: self.charset,
            length: self.length,
        })
    }
}

/// Context used to store all parameters used to enumerate a digest table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumerationCtx {
    /// The hash function used.
    pub hash_function: HashFunction,
    /// The charset used, in traversal order.
    pub charset: Vec<char>,
    /// The length of every candidate.
    pub length: u8,
    /// The size of the total search space.
    pub n: u64,
}

impl EnumerationCtx {
    /// Returns the number of leaf groups, that is the number of batches of a full run.
    pub fn group_count(&self) -> u64 {
        self.n / self.charset.len() as u64
    }

    /// Returns the maximum number of records in a batch.
    pub fn batch_capacity(&self) -> usize {
        self.charset.len()
    }
}

#[cfg(test)]
pub fn build_test_ctx() -> EnumerationCtx {
    EnumerationCtxBuilder::new()
        .charset("ab")
        .length(3)
        .build()
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::EnumerationCtxBuilder;
    use crate::{error::PreimageError, HashFunction, DEFAULT_CHARSET};

    #[test]
    fn test_defaults() {
        let ctx = EnumerationCtxBuilder::new().build().unwrap();

        assert_eq!(HashFunction::Sha1, ctx.hash_function);
        assert_eq!(DEFAULT_CHARSET.chars().collect::<Vec<_>>(), ctx.charset);
        assert_eq!(62u64.pow(4), ctx.n);
        assert_eq!(62u64.pow(3), ctx.group_count());
    }

    #[test]
    fn test_charset_order_is_kept() {
        let ctx = EnumerationCtxBuilder::new()
            .charset("cba")
            .length(1)
            .build()
            .unwrap();

        assert_eq!(vec!['c', 'b', 'a'], ctx.charset);
        assert_eq!(1, ctx.group_count());
        assert_eq!(3, ctx.batch_capacity());
    }

    #[test]
    fn test_empty_alphabet() {
        let err = EnumerationCtxBuilder::new()
            .charset("")
            .length(2)
            .build()
            .unwrap_err();

        assert!(matches!(err, PreimageError::InvalidAlphabet(_)));
    }

    #[test]
    fn test_duplicate_symbol() {
        let err = EnumerationCtxBuilder::new()
            .charset("abca")
            .build()
            .unwrap_err();

        assert!(matches!(err, PreimageError::InvalidAlphabet(_)));
    }

    #[test]
    fn test_invalid_length() {
        let err = EnumerationCtxBuilder::new().length(0).build().unwrap_err();
        assert!(matches!(err, PreimageError::InvalidLength { length: 0, .. }));

        let err = EnumerationCtxBuilder::new().length(200).build().unwrap_err();
        assert!(matches!(err, PreimageError::InvalidLength { length: 200, .. }));
    }

    #[test]
    fn test_search_space_overflow() {
        // 62^10 fits in a u64, 62^12 does not
        assert!(EnumerationCtxBuilder::new().length(10).build().is_ok());

        let err = EnumerationCtxBuilder::new().length(12).build().unwrap_err();
        assert!(matches!(err, PreimageError::Space(72)));
    }

    #[test]
    fn test_huge_charset_overflow() {
        let charset: String = ('\u{100}'..).take(300).collect();

        let err = EnumerationCtxBuilder::new()
            .charset(&charset)
            .length(16)
            .build()
            .unwrap_err();
        assert!(matches!(err, PreimageError::Space(132)));

        // 256^8 is exactly one past u64::MAX
        let charset: String = ('\u{100}'..).take(256).collect();
        let err = EnumerationCtxBuilder::new()
            .charset(&charset)
            .length(8)
            .build()
            .unwrap_err();
        assert!(matches!(err, PreimageError::Space(64)));

        let ctx = EnumerationCtxBuilder::new()
            .charset(&charset)
            .length(7)
            .build()
            .unwrap();
        assert_eq!(1 << 56, ctx.n);
        assert_eq!(1 << 48, ctx.group_count());
    }
}

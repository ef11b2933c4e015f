use std::{fmt::Display, str::FromStr};

use digest::{Digest as _, DynDigest};
use md4::Md4;
use md5::Md5;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Sha224, Sha256, Sha384, Sha512};
use sha3::{Sha3_224, Sha3_256, Sha3_384, Sha3_512};

/// All the supported hash functions.
#[derive(Copy, Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub enum HashFunction {
    Md4,
    Md5,
    #[default]
    Sha1,
    Sha2_224,
    Sha2_256,
    Sha2_384,
    Sha2_512,
    Sha3_224,
    Sha3_256,
    Sha3_384,
    Sha3_512,
}

impl HashFunction {
    /// Every supported hash function, in declaration order.
    pub const ALL: [HashFunction; 11] = [
        Self::Md4,
        Self::Md5,
        Self::Sha1,
        Self::Sha2_224,
        Self::Sha2_256,
        Self::Sha2_384,
        Self::Sha2_512,
        Self::Sha3_224,
        Self::Sha3_256,
        Self::Sha3_384,
        Self::Sha3_512,
    ];

    /// Returns the CPU implementation of this hash.
    pub fn cpu(&self) -> Box<dyn DynDigest> {
        match self {
            Self::Md4 => Box::new(Md4::new()),
            Self::Md5 => Box::new(Md5::new()),
            Self::Sha1 => Box::new(Sha1::new()),
            Self::Sha2_224 => Box::new(Sha224::new()),
            Self::Sha2_256 => Box::new(Sha256::new()),
            Self::Sha2_384 => Box::new(Sha384::new()),
            Self::Sha2_512 => Box::new(Sha512::new()),
            Self::Sha3_224 => Box::new(Sha3_224::new()),
            Self::Sha3_256 => Box::new(Sha3_256::new()),
            Self::Sha3_384 => Box::new(Sha3_384::new()),
            Self::Sha3_512 => Box::new(Sha3_512::new()),
        }
    }

    /// Returns the size of a digest in bytes.
    pub fn digest_size(&self) -> usize {
        match self {
            Self::Md4 | Self::Md5 => 16,
            Self::Sha1 => 20,
            Self::Sha2_224 | Self::Sha3_224 => 28,
            Self::Sha2_256 | Self::Sha3_256 => 32,
            Self::Sha2_384 | Self::Sha3_384 => 48,
            Self::Sha2_512 | Self::Sha3_512 => 64,
        }
    }
}

impl Display for HashFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl FromStr for HashFunction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.to_ascii_lowercase().replace(['-', '_'], "");
        Self::ALL
            .into_iter()
            .find(|hash| hash.to_string().to_ascii_lowercase().replace('_', "") == normalized)
            .ok_or_else(|| format!("unknown hash function `{s}`"))
    }
}

/// Turns candidates into hex digests, reusing the same hasher between calls.
pub struct Digester {
    hasher: Box<dyn DynDigest>,
}

impl Digester {
    pub fn new(hash_function: HashFunction) -> Self {
        Self {
            hasher: hash_function.cpu(),
        }
    }

    /// Hashes the UTF-8 bytes of the candidate and renders the digest as lowercase hexadecimal.
    #[inline]
    pub fn digest_hex(&mut self, candidate: &str) -> String {
        self.hasher.update(candidate.as_bytes());
        hex::encode(self.hasher.finalize_reset())
    }
}

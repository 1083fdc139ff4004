//! Seeded streaming content hasher.
//!
//! # Overview
//!
//! [`ContentHasher`] feeds a file through a [`ChunkedReader`] into xxh3, a
//! seeded non-cryptographic hash. The hash is only a filter: equal hashes
//! mean "maybe equal", never "equal". The byte verifier has the final word.
//!
//! A hasher draws a fresh random seed when it is created. Hashes are only
//! comparable between files hashed with the same seed, which is why the hash
//! stage builds one hasher per candidate group.

use std::path::Path;

use xxhash_rust::xxh3::Xxh3;

use super::reader::ChunkedReader;
use super::ReadError;
use crate::signal::CancelToken;

/// Hash of a file's full content under one [`ContentHasher`] seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash(pub u64);

/// Streaming hasher over fixed-size chunks.
#[derive(Debug, Clone)]
pub struct ContentHasher {
    seed: u64,
    chunk_size: usize,
}

impl ContentHasher {
    /// Create a hasher with a fresh random seed.
    #[must_use]
    pub fn new(chunk_size: usize) -> Self {
        Self::with_seed(chunk_size, rand::random())
    }

    /// Create a hasher with a fixed seed.
    #[must_use]
    pub fn with_seed(chunk_size: usize, seed: u64) -> Self {
        Self { seed, chunk_size }
    }

    /// Seed of this hasher.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Hash the full content of `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError`] if the file cannot be opened or read, or if
    /// `cancel` is raised while reading.
    pub fn hash_file(&self, path: &Path, cancel: &CancelToken) -> Result<ContentHash, ReadError> {
        let mut reader = ChunkedReader::open(path, self.chunk_size)?;
        let mut hasher = Xxh3::with_seed(self.seed);
        let mut len: u64 = 0;

        while let Some(chunk) = reader.next_chunk(cancel)? {
            len += chunk.len() as u64;
            hasher.update(&chunk);
        }
        hasher.update(&len.to_le_bytes());

        Ok(ContentHash(hasher.digest()))
    }

    /// Hash an in-memory buffer the way [`hash_file`](Self::hash_file) would
    /// hash a file with the same content.
    #[must_use]
    pub fn hash_bytes(&self, data: &[u8]) -> ContentHash {
        let mut hasher = Xxh3::with_seed(self.seed);
        for chunk in data.chunks(self.chunk_size.max(1)) {
            hasher.update(chunk);
        }
        hasher.update(&(data.len() as u64).to_le_bytes());
        ContentHash(hasher.digest())
    }
}

//! Key-to-bucket mapping.
//!
//! The default mapping hashes the key's UTF-8 bytes with XXH3-64 (seed 0)
//! and reduces the hash modulo the bucket count. Buckets are 1-based, so a
//! cluster with `N` buckets hashes keys into `1..=N` and its configuration
//! ranges should cover `[1, N + 1)`.

use shardroute_types::{Bucket, FIRST_BUCKET};
use std::num::NonZeroU32;
use xxhash_rust::xxh3::xxh3_64;

/// Determines the bucket of a key. Must be pure and deterministic.
pub trait KeyToBucket: Send + Sync {
    fn bucket_of(&self, key: &str) -> Bucket;
}

impl<F> KeyToBucket for F
where
    F: Fn(&str) -> Bucket + Send + Sync,
{
    fn bucket_of(&self, key: &str) -> Bucket {
        self(key)
    }
}

/// Standard hashing [`KeyToBucket`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashingKeyToBucket {
    bucket_count: NonZeroU32,
}

impl HashingKeyToBucket {
    pub const fn new(bucket_count: NonZeroU32) -> Self {
        Self { bucket_count }
    }

    /// `None` when `bucket_count` is zero.
    pub fn with_bucket_count(bucket_count: u32) -> Option<Self> {
        NonZeroU32::new(bucket_count).map(Self::new)
    }

    pub fn bucket_count(&self) -> u32 {
        self.bucket_count.get()
    }
}

impl KeyToBucket for HashingKeyToBucket {
    fn bucket_of(&self, key: &str) -> Bucket {
        let hash = xxh3_64(key.as_bytes());
        let offset = (hash % u64::from(self.bucket_count.get())) as u32;
        Bucket::new(FIRST_BUCKET.get() + offset)
    }
}
